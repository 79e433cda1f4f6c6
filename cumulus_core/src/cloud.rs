//! Cloud-side seam: the operations the engine consumes, plus the paged
//! reader used by reconciliation.

use crate::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use cumulus_cloud::{
    Tenant, TenantListRequest, TenantListResponse, UsagePushRequest, UsagePushResponse, User,
    UserListRequest, UserListResponse,
};
use std::collections::HashMap;

/// Items requested per page from the cloud.
pub const CLOUD_PAGE_SIZE: u32 = 100;

/// The narrow slice of the control-plane API the engine uses. Implemented by
/// [`cumulus_cloud::Client`] and by in-memory fakes in tests.
#[async_trait]
pub trait CloudApi: Send + Sync {
    async fn list_tenants(&self, request: &TenantListRequest) -> Result<TenantListResponse>;

    async fn list_users(&self, request: &UserListRequest) -> Result<UserListResponse>;

    /// Point lookup used by the upsert helpers to repair missing parents.
    async fn get_tenants_by_uuids(&self, uuids: &[String]) -> Result<TenantListResponse>;

    async fn put_usages(&self, request: &UsagePushRequest) -> Result<UsagePushResponse>;
}

#[async_trait]
impl CloudApi for cumulus_cloud::Client {
    async fn list_tenants(&self, request: &TenantListRequest) -> Result<TenantListResponse> {
        Ok(cumulus_cloud::Client::list_tenants(self, request).await?)
    }

    async fn list_users(&self, request: &UserListRequest) -> Result<UserListResponse> {
        Ok(cumulus_cloud::Client::list_users(self, request).await?)
    }

    async fn get_tenants_by_uuids(&self, uuids: &[String]) -> Result<TenantListResponse> {
        let request = TenantListRequest {
            uuids: uuids.to_vec(),
            ..Default::default()
        };
        Ok(cumulus_cloud::Client::list_tenants(self, &request).await?)
    }

    async fn put_usages(&self, request: &UsagePushRequest) -> Result<UsagePushResponse> {
        Ok(cumulus_cloud::Client::put_usages(self, request).await?)
    }
}

/// Materialise every page of a tenant listing into an id-keyed map, returning
/// the first page's timestamp as the next-cycle watermark candidate.
///
/// Carrier rows (empty id) and soft-deleted rows are skipped; duplicate ids
/// across pages are last-write-wins.
pub async fn collect_tenants(
    cloud: &dyn CloudApi,
    request: TenantListRequest,
) -> Result<(HashMap<String, Tenant>, Option<DateTime<Utc>>)> {
    let mut response = cloud.list_tenants(&request).await?;
    let timestamp = response.timestamp;

    let mut tenants = HashMap::with_capacity(response.items.len());
    accumulate_tenants(&mut tenants, std::mem::take(&mut response.items));

    while let Some(after) = response.after().map(str::to_owned) {
        response = cloud
            .list_tenants(&TenantListRequest::next_page(after))
            .await?;
        accumulate_tenants(&mut tenants, std::mem::take(&mut response.items));
    }

    Ok((tenants, timestamp))
}

fn accumulate_tenants(map: &mut HashMap<String, Tenant>, items: Vec<Tenant>) {
    for tenant in items {
        if !tenant.id.is_empty() && tenant.deleted_at.is_none() {
            map.insert(tenant.id.clone(), tenant);
        }
    }
}

/// User-side counterpart of [`collect_tenants`].
pub async fn collect_users(
    cloud: &dyn CloudApi,
    request: UserListRequest,
) -> Result<(HashMap<String, User>, Option<DateTime<Utc>>)> {
    let mut response = cloud.list_users(&request).await?;
    let timestamp = response.timestamp;

    let mut users = HashMap::with_capacity(response.items.len());
    accumulate_users(&mut users, std::mem::take(&mut response.items));

    while let Some(after) = response.after().map(str::to_owned) {
        response = cloud
            .list_users(&UserListRequest::next_page(after))
            .await?;
        accumulate_users(&mut users, std::mem::take(&mut response.items));
    }

    Ok((users, timestamp))
}

fn accumulate_users(map: &mut HashMap<String, User>, items: Vec<User>) {
    for user in items {
        if !user.id.is_empty() && user.deleted_at.is_none() {
            map.insert(user.id.clone(), user);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{tenant, tenant_page, FakeCloud};
    use chrono::TimeZone;

    #[tokio::test]
    async fn collects_union_across_pages_with_last_write_wins() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap();
        let mut first = tenant("A", "R");
        first.name = "old".into();
        let mut second = tenant("A", "R");
        second.name = "new".into();

        let cloud = FakeCloud::default();
        cloud.push_tenant_page(tenant_page(
            vec![first, tenant("B", "R")],
            Some(ts),
            Some("page2"),
        ));
        cloud.push_tenant_page(tenant_page(vec![second], None, None));

        let (tenants, timestamp) =
            collect_tenants(&cloud, TenantListRequest::default()).await.unwrap();

        assert_eq!(timestamp, Some(ts));
        assert_eq!(tenants.len(), 2);
        assert_eq!(tenants["A"].name, "new");
    }

    #[tokio::test]
    async fn skips_carriers_and_tombstones() {
        let mut carrier = tenant("", "");
        carrier.offering_items.push(cumulus_cloud::OfferingItem {
            tenant_id: "T1".into(),
            name: "storage".into(),
            status: 0,
            ..Default::default()
        });
        let mut deleted = tenant("D", "R");
        deleted.deleted_at = Some(Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap());

        let cloud = FakeCloud::default();
        cloud.push_tenant_page(tenant_page(
            vec![carrier, deleted, tenant("A", "R")],
            None,
            None,
        ));

        let (tenants, _) = collect_tenants(&cloud, TenantListRequest::default()).await.unwrap();
        assert_eq!(tenants.len(), 1);
        assert!(tenants.contains_key("A"));
    }

    #[tokio::test]
    async fn page_failure_aborts_the_collection() {
        let cloud = FakeCloud::default();
        cloud.push_tenant_page(tenant_page(vec![tenant("A", "R")], None, Some("page2")));
        cloud.push_tenant_error();

        assert!(collect_tenants(&cloud, TenantListRequest::default()).await.is_err());
    }
}
