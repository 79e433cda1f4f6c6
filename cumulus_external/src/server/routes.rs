//! HTTP routes of the sample external system.

use crate::models::{
    ExternalAccessPolicy, ExternalOfferingItem, ExternalTenant, ExternalUsage, ExternalUser,
};
use crate::server::store::Store;
use axum::extract::{Path, Query};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Extension, Json};
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    #[serde(default)]
    pub offset: usize,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    100
}

pub fn router(store: Arc<Store>) -> axum::Router {
    axum::Router::new()
        .route("/tenants", get(list_tenants).post(upsert_tenant))
        .route("/tenants/{id}", get(get_tenant).delete(delete_tenant))
        .route("/offering_items", get(list_offering_items))
        .route(
            "/tenants/{tenant_id}/offering_items",
            post(upsert_offering_item),
        )
        .route(
            "/tenants/{tenant_id}/offering_items/{name}",
            get(get_offering_item).delete(delete_offering_item),
        )
        .route("/users", get(list_users).post(upsert_user))
        .route("/users/{id}", get(get_user).delete(delete_user))
        .route(
            "/access_policies",
            get(list_access_policies).post(upsert_access_policy),
        )
        .route(
            "/access_policies/{id}",
            get(get_access_policy).delete(delete_access_policy),
        )
        .route("/usages", get(list_usages).post(add_usage))
        .layer(Extension(store))
}

fn upsert_status(created: bool) -> StatusCode {
    if created {
        StatusCode::CREATED
    } else {
        StatusCode::NO_CONTENT
    }
}

async fn list_tenants(
    Extension(store): Extension<Arc<Store>>,
    Query(page): Query<PageQuery>,
) -> Json<Vec<ExternalTenant>> {
    Json(store.tenants(page.offset, page.limit).await)
}

async fn upsert_tenant(
    Extension(store): Extension<Arc<Store>>,
    Json(tenant): Json<ExternalTenant>,
) -> impl IntoResponse {
    if tenant.id.is_empty() {
        return StatusCode::BAD_REQUEST;
    }
    upsert_status(store.upsert_tenant(tenant).await)
}

async fn get_tenant(
    Extension(store): Extension<Arc<Store>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match store.tenant(&id).await {
        Some(tenant) => Json(tenant).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn delete_tenant(
    Extension(store): Extension<Arc<Store>>,
    Path(id): Path<String>,
) -> StatusCode {
    store.delete_tenant(&id).await;
    StatusCode::NO_CONTENT
}

async fn list_offering_items(
    Extension(store): Extension<Arc<Store>>,
    Query(page): Query<PageQuery>,
) -> Json<Vec<ExternalOfferingItem>> {
    Json(store.offering_items(page.offset, page.limit).await)
}

async fn upsert_offering_item(
    Extension(store): Extension<Arc<Store>>,
    Path(tenant_id): Path<String>,
    Json(mut item): Json<ExternalOfferingItem>,
) -> impl IntoResponse {
    if item.name.is_empty() {
        return StatusCode::BAD_REQUEST;
    }
    item.tenant_id = tenant_id;
    upsert_status(store.upsert_offering_item(item).await)
}

async fn get_offering_item(
    Extension(store): Extension<Arc<Store>>,
    Path((tenant_id, name)): Path<(String, String)>,
) -> impl IntoResponse {
    match store.offering_item(&tenant_id, &name).await {
        Some(item) => Json(item).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn delete_offering_item(
    Extension(store): Extension<Arc<Store>>,
    Path((tenant_id, name)): Path<(String, String)>,
) -> StatusCode {
    store.delete_offering_item(&tenant_id, &name).await;
    StatusCode::NO_CONTENT
}

async fn list_users(
    Extension(store): Extension<Arc<Store>>,
    Query(page): Query<PageQuery>,
) -> Json<Vec<ExternalUser>> {
    Json(store.users(page.offset, page.limit).await)
}

async fn upsert_user(
    Extension(store): Extension<Arc<Store>>,
    Json(user): Json<ExternalUser>,
) -> impl IntoResponse {
    if user.id.is_empty() {
        return StatusCode::BAD_REQUEST;
    }
    upsert_status(store.upsert_user(user).await)
}

async fn get_user(
    Extension(store): Extension<Arc<Store>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match store.user(&id).await {
        Some(user) => Json(user).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn delete_user(
    Extension(store): Extension<Arc<Store>>,
    Path(id): Path<String>,
) -> StatusCode {
    store.delete_user(&id).await;
    StatusCode::NO_CONTENT
}

async fn list_access_policies(
    Extension(store): Extension<Arc<Store>>,
    Query(page): Query<PageQuery>,
) -> Json<Vec<ExternalAccessPolicy>> {
    Json(store.access_policies(page.offset, page.limit).await)
}

async fn upsert_access_policy(
    Extension(store): Extension<Arc<Store>>,
    Json(policy): Json<ExternalAccessPolicy>,
) -> impl IntoResponse {
    if policy.id.is_empty() {
        return StatusCode::BAD_REQUEST;
    }
    upsert_status(store.upsert_access_policy(policy).await)
}

async fn get_access_policy(
    Extension(store): Extension<Arc<Store>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match store.access_policy(&id).await {
        Some(policy) => Json(policy).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn delete_access_policy(
    Extension(store): Extension<Arc<Store>>,
    Path(id): Path<String>,
) -> StatusCode {
    store.delete_access_policy(&id).await;
    StatusCode::NO_CONTENT
}

async fn list_usages(
    Extension(store): Extension<Arc<Store>>,
    Query(page): Query<PageQuery>,
) -> Json<Vec<ExternalUsage>> {
    Json(store.usages(page.offset, page.limit).await)
}

async fn add_usage(
    Extension(store): Extension<Arc<Store>>,
    Json(usage): Json<ExternalUsage>,
) -> impl IntoResponse {
    let stored = store.add_usage(usage).await;
    (StatusCode::CREATED, Json(stored))
}
