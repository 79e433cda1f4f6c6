#![cfg(test)]

//! Shared fixtures for the engine tests: a scriptable cloud fake and DTO
//! builders.

use crate::cloud::CloudApi;
use crate::{Error, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use cumulus_cloud::{
    AccessPolicy, OfferingItem, Tenant, TenantListRequest, TenantListResponse, Usage,
    UsagePushRequest, UsagePushResponse, User, UserListRequest, UserListResponse,
};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

pub(crate) fn tenant(id: &str, parent_id: &str) -> Tenant {
    Tenant {
        id: id.into(),
        parent_id: parent_id.into(),
        name: format!("tenant {id}"),
        ..Default::default()
    }
}

pub(crate) fn offering_item(tenant_id: &str, name: &str, status: i64) -> OfferingItem {
    OfferingItem {
        tenant_id: tenant_id.into(),
        name: name.into(),
        status,
        ..Default::default()
    }
}

pub(crate) fn user(id: &str, tenant_id: &str) -> User {
    User {
        id: id.into(),
        tenant_id: tenant_id.into(),
        login: format!("user-{id}"),
        ..Default::default()
    }
}

pub(crate) fn access_policy(id: &str, trustee_id: &str) -> AccessPolicy {
    AccessPolicy {
        id: id.into(),
        trustee_id: trustee_id.into(),
        role_id: "backup_admin".into(),
        ..Default::default()
    }
}

pub(crate) fn tenant_page(
    items: Vec<Tenant>,
    timestamp: Option<DateTime<Utc>>,
    after: Option<&str>,
) -> TenantListResponse {
    let mut response = TenantListResponse {
        items,
        timestamp,
        ..Default::default()
    };
    response.pagination.paging.cursors.after = after.unwrap_or_default().to_string();
    response
}

pub(crate) fn user_page(
    items: Vec<User>,
    timestamp: Option<DateTime<Utc>>,
    after: Option<&str>,
) -> UserListResponse {
    let mut response = UserListResponse {
        items,
        timestamp,
        ..Default::default()
    };
    response.pagination.paging.cursors.after = after.unwrap_or_default().to_string();
    response
}

/// Cloud fake driven by scripted page queues.
///
/// `list_tenants` / `list_users` pop the next queued page (or error marker)
/// regardless of the request; an empty queue yields an empty page. Lookups by
/// uuid resolve against a seeded map, and usage pushes are recorded.
#[derive(Default)]
pub(crate) struct FakeCloud {
    tenant_pages: Mutex<VecDeque<Result<TenantListResponse>>>,
    user_pages: Mutex<VecDeque<Result<UserListResponse>>>,
    tenants_by_uuid: Mutex<HashMap<String, Tenant>>,
    pub(crate) uuid_lookups: Mutex<Vec<String>>,
    pub(crate) pushed_usages: Mutex<Vec<Vec<Usage>>>,
    usage_push_errors: Mutex<VecDeque<bool>>,
    tenant_requests: Mutex<Vec<TenantListRequest>>,
    user_requests: Mutex<Vec<UserListRequest>>,
}

impl FakeCloud {
    pub(crate) fn push_tenant_page(&self, page: TenantListResponse) {
        self.tenant_pages.lock().unwrap().push_back(Ok(page));
    }

    pub(crate) fn push_tenant_error(&self) {
        self.tenant_pages
            .lock()
            .unwrap()
            .push_back(Err(Error::InvalidInput("scripted tenant failure".into())));
    }

    pub(crate) fn push_user_page(&self, page: UserListResponse) {
        self.user_pages.lock().unwrap().push_back(Ok(page));
    }

    pub(crate) fn push_user_error(&self) {
        self.user_pages
            .lock()
            .unwrap()
            .push_back(Err(Error::InvalidInput("scripted user failure".into())));
    }

    pub(crate) fn seed_tenant(&self, tenant: Tenant) {
        self.tenants_by_uuid
            .lock()
            .unwrap()
            .insert(tenant.id.clone(), tenant);
    }

    /// Queue a failure for the next usage push.
    pub(crate) fn fail_next_usage_push(&self) {
        self.usage_push_errors.lock().unwrap().push_back(true);
    }

    pub(crate) fn tenant_requests(&self) -> Vec<TenantListRequest> {
        self.tenant_requests.lock().unwrap().clone()
    }

    pub(crate) fn user_requests(&self) -> Vec<UserListRequest> {
        self.user_requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl CloudApi for FakeCloud {
    async fn list_tenants(&self, request: &TenantListRequest) -> Result<TenantListResponse> {
        self.tenant_requests.lock().unwrap().push(request.clone());
        self.tenant_pages
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(TenantListResponse::default()))
    }

    async fn list_users(&self, request: &UserListRequest) -> Result<UserListResponse> {
        self.user_requests.lock().unwrap().push(request.clone());
        self.user_pages
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(UserListResponse::default()))
    }

    async fn get_tenants_by_uuids(&self, uuids: &[String]) -> Result<TenantListResponse> {
        self.uuid_lookups.lock().unwrap().extend_from_slice(uuids);
        let tenants = self.tenants_by_uuid.lock().unwrap();
        let items = uuids
            .iter()
            .filter_map(|id| tenants.get(id).cloned())
            .collect();
        Ok(TenantListResponse {
            items,
            ..Default::default()
        })
    }

    async fn put_usages(&self, request: &UsagePushRequest) -> Result<UsagePushResponse> {
        if self.usage_push_errors.lock().unwrap().pop_front() == Some(true) {
            return Err(Error::InvalidInput("scripted usage push failure".into()));
        }
        self.pushed_usages
            .lock()
            .unwrap()
            .push(request.items.clone());
        Ok(UsagePushResponse::default())
    }
}
