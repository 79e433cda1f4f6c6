//! Reconciliation: full enumeration plus set-difference deletion.
//!
//! Runs once on startup (returning the watermark that seeds the incremental
//! loops) and periodically after that. Cloud reads use the bounded retry
//! primitive; external writes are per-entity non-fatal.

use crate::cloud::{collect_tenants, collect_users, CloudApi, CLOUD_PAGE_SIZE};
use crate::external::{walk_pages, ExternalSystem, OfferingItemKey};
use crate::retry::with_retries;
use crate::upsert::{upsert_tenant, upsert_user};
use chrono::{DateTime, Utc};
use cumulus_cloud::{Tenant, TenantListRequest, User, UserListRequest};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub struct ReconcileLoop {
    cloud: Arc<dyn CloudApi>,
    external: Arc<dyn ExternalSystem>,
    subtree_root_id: String,
    interval: Duration,
}

impl ReconcileLoop {
    pub fn new(
        cloud: Arc<dyn CloudApi>,
        external: Arc<dyn ExternalSystem>,
        subtree_root_id: impl Into<String>,
        interval: Duration,
    ) -> Self {
        Self {
            cloud,
            external,
            subtree_root_id: subtree_root_id.into(),
            interval,
        }
    }

    /// Periodic mode: sleep `interval`, reconcile, forever. The startup pass
    /// is a direct call to [`Self::reconcile_tenants`] instead.
    #[tracing::instrument(name = "tenants_reconcile", skip_all)]
    pub async fn run_tenants(self: Arc<Self>, cancel: CancellationToken) {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = tokio::time::sleep(self.interval) => {}
            }
            self.reconcile_tenants(&cancel).await;
        }
    }

    #[tracing::instrument(name = "users_reconcile", skip_all)]
    pub async fn run_users(self: Arc<Self>, cancel: CancellationToken) {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = tokio::time::sleep(self.interval) => {}
            }
            self.reconcile_users(&cancel).await;
        }
    }

    /// One full tenant + offering-item pass. Returns the cloud timestamp to
    /// use as the next incremental watermark; the timestamp is considered
    /// consumed as soon as the cloud read succeeds, because every later step
    /// only reports errors without advancing further.
    pub async fn reconcile_tenants(
        &self,
        cancel: &CancellationToken,
    ) -> Option<DateTime<Utc>> {
        // 1. Current cloud state, children embedded, soft-deleted excluded.
        let read = with_retries(cancel, || {
            collect_tenants(self.cloud.as_ref(), self.tenant_request())
        })
        .await;
        let (cloud_tenants, next_watermark) = match read {
            Ok(result) => result,
            Err(err) => {
                tracing::warn!(error = %err, "failed to get cloud tenants");
                return None;
            }
        };

        // 2. Ids currently present externally.
        let read = with_retries(cancel, || {
            walk_pages(|offset, limit| self.external.get_active_tenant_ids(offset, limit))
        })
        .await;
        let external_ids: HashSet<String> = match read {
            Ok(ids) => ids.into_iter().collect(),
            Err(err) => {
                tracing::warn!(error = %err, "failed to get external tenants");
                return next_watermark;
            }
        };

        // 3.-4. Remove whatever the cloud no longer reports.
        for tenant_id in &external_ids {
            if !cloud_tenants.contains_key(tenant_id) {
                tracing::info!(tenant_id = %tenant_id, "removing tenant");
                if let Err(err) = self.external.delete_tenant(tenant_id).await {
                    tracing::warn!(tenant_id = %tenant_id, error = %err, "failed to delete tenant");
                }
            }
        }

        // 5. Same for offering items, before any upserts land.
        let read = with_retries(cancel, || {
            walk_pages(|offset, limit| self.external.get_active_offering_item_ids(offset, limit))
        })
        .await;
        let external_items = match read {
            Ok(items) => items,
            Err(err) => {
                tracing::warn!(error = %err, "failed to get external offering items");
                return next_watermark;
            }
        };
        self.delete_inactive_offering_items(&cloud_tenants, &external_items)
            .await;

        // 6. Upsert the surviving tenants.
        for (tenant_id, tenant) in &cloud_tenants {
            tracing::info!(tenant_id = %tenant_id, "updating tenant");
            if let Err(err) =
                upsert_tenant(self.cloud.as_ref(), self.external.as_ref(), tenant).await
            {
                tracing::warn!(tenant_id = %tenant_id, error = %err, "failed to update tenant");
            }
        }

        // 7. Upsert the offering items still turned on.
        self.upsert_active_offering_items(&cloud_tenants).await;

        next_watermark
    }

    /// One full user + access-policy pass; shape mirrors
    /// [`Self::reconcile_tenants`].
    pub async fn reconcile_users(&self, cancel: &CancellationToken) -> Option<DateTime<Utc>> {
        let read = with_retries(cancel, || {
            collect_users(self.cloud.as_ref(), self.user_request())
        })
        .await;
        let (cloud_users, next_watermark) = match read {
            Ok(result) => result,
            Err(err) => {
                tracing::warn!(error = %err, "failed to get cloud users");
                return None;
            }
        };

        let read = with_retries(cancel, || {
            walk_pages(|offset, limit| self.external.get_active_user_ids(offset, limit))
        })
        .await;
        let external_ids: HashSet<String> = match read {
            Ok(ids) => ids.into_iter().collect(),
            Err(err) => {
                tracing::warn!(error = %err, "failed to get external users");
                return next_watermark;
            }
        };

        for user_id in &external_ids {
            if !cloud_users.contains_key(user_id) {
                tracing::info!(user_id = %user_id, "removing user");
                if let Err(err) = self.external.delete_user(user_id).await {
                    tracing::warn!(user_id = %user_id, error = %err, "failed to delete user");
                }
            }
        }

        let read = with_retries(cancel, || {
            walk_pages(|offset, limit| self.external.get_active_access_policy_ids(offset, limit))
        })
        .await;
        let external_policies: HashSet<String> = match read {
            Ok(ids) => ids.into_iter().collect(),
            Err(err) => {
                tracing::warn!(error = %err, "failed to get external access policies");
                return next_watermark;
            }
        };
        self.delete_inactive_access_policies(&cloud_users, external_policies)
            .await;

        for (user_id, user) in &cloud_users {
            tracing::info!(user_id = %user_id, "updating user");
            if let Err(err) = upsert_user(self.cloud.as_ref(), self.external.as_ref(), user).await
            {
                tracing::warn!(user_id = %user_id, error = %err, "failed to update user");
            }
        }

        self.upsert_active_access_policies(&cloud_users).await;

        next_watermark
    }

    fn tenant_request(&self) -> TenantListRequest {
        // No updated_since filter: reconciliation needs the current full
        // state. Soft-deleted tenants may already be hard-deleted by
        // retention, so they are treated as absent and removed.
        TenantListRequest {
            subtree_root_id: Some(self.subtree_root_id.clone()),
            limit: Some(CLOUD_PAGE_SIZE),
            with_contacts: Some(true),
            with_offering_items: Some(true),
            allow_deleted: false,
            ..Default::default()
        }
    }

    fn user_request(&self) -> UserListRequest {
        UserListRequest {
            subtree_root_tenant_id: Some(self.subtree_root_id.clone()),
            limit: Some(CLOUD_PAGE_SIZE),
            with_access_policies: Some(true),
            allow_deleted: false,
            ..Default::default()
        }
    }

    /// An external offering item goes away when its tenant is gone from the
    /// cloud, when the tenant no longer lists it, or when the listing shows
    /// it turned off.
    async fn delete_inactive_offering_items(
        &self,
        cloud_tenants: &HashMap<String, Tenant>,
        external_items: &[OfferingItemKey],
    ) {
        for key in external_items {
            let mut delete = true;
            if let Some(tenant) = cloud_tenants.get(&key.tenant_id) {
                if let Some(item) = tenant
                    .offering_items
                    .iter()
                    .find(|item| item.name == key.name)
                {
                    delete = item.status == 0;
                }
            }

            if delete {
                if let Err(err) = self.external.delete_offering_item(key).await {
                    tracing::warn!(offering_item = %key, error = %err, "failed to delete offering item");
                }
            }
        }
    }

    async fn upsert_active_offering_items(&self, cloud_tenants: &HashMap<String, Tenant>) {
        for tenant in cloud_tenants.values() {
            for item in &tenant.offering_items {
                if item.status > 0 {
                    if let Err(err) = self.external.create_or_update_offering_item(item).await {
                        tracing::warn!(
                            offering_item = %OfferingItemKey::of(item),
                            error = %err,
                            "failed to upsert offering item"
                        );
                    }
                }
            }
        }
    }

    /// Any external policy id outside the set of currently-alive cloud
    /// policies is deleted.
    async fn delete_inactive_access_policies(
        &self,
        cloud_users: &HashMap<String, User>,
        mut external_policies: HashSet<String>,
    ) {
        for user in cloud_users.values() {
            for policy in &user.access_policies {
                if policy.deleted_at.is_none() {
                    external_policies.remove(&policy.id);
                }
            }
        }

        for policy_id in &external_policies {
            if let Err(err) = self.external.delete_access_policy(policy_id).await {
                tracing::warn!(policy_id = %policy_id, error = %err, "failed to delete access policy");
            }
        }
    }

    async fn upsert_active_access_policies(&self, cloud_users: &HashMap<String, User>) {
        for user in cloud_users.values() {
            for policy in &user.access_policies {
                if policy.deleted_at.is_none() {
                    if let Err(err) = self.external.create_or_update_access_policy(policy).await {
                        tracing::warn!(
                            policy_id = %policy.id,
                            error = %err,
                            "failed to upsert access policy"
                        );
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{
        access_policy, offering_item, tenant, tenant_page, user, user_page, FakeCloud,
    };
    use crate::MemoryExternalSystem;
    use chrono::TimeZone;

    fn reconciler(cloud: Arc<FakeCloud>, external: Arc<MemoryExternalSystem>) -> ReconcileLoop {
        ReconcileLoop::new(cloud, external, "root-1", Duration::from_secs(3600))
    }

    fn ts(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 10, minute, 0).unwrap()
    }

    #[tokio::test]
    async fn deletes_exactly_the_orphans_and_upserts_survivors() {
        // External has {A, B, C}; cloud reports {A, B}.
        let cloud = Arc::new(FakeCloud::default());
        cloud.push_tenant_page(tenant_page(
            vec![tenant("A", "A"), tenant("B", "B")],
            Some(ts(0)),
            None,
        ));

        let external = Arc::new(MemoryExternalSystem::new());
        for id in ["A", "B", "C"] {
            external.create_or_update_tenant(&tenant(id, id)).await.unwrap();
        }
        external.clear_ops().await;

        let cancel = CancellationToken::new();
        let watermark = reconciler(cloud, external.clone())
            .reconcile_tenants(&cancel)
            .await;

        assert_eq!(watermark, Some(ts(0)));
        assert_eq!(external.tenant_ids().await, vec!["A", "B"]);
        let deletes: Vec<String> = external
            .ops()
            .await
            .into_iter()
            .filter(|op| op.starts_with("delete_tenant"))
            .collect();
        assert_eq!(deletes, vec!["delete_tenant C"]);
    }

    #[tokio::test]
    async fn offering_item_reconcile_mixes_statuses() {
        // Cloud tenant T has items {x on, y off}; external has {x, y, z}.
        let cloud = Arc::new(FakeCloud::default());
        let mut t = tenant("T", "T");
        t.offering_items.push(offering_item("T", "x", 1));
        t.offering_items.push(offering_item("T", "y", 0));
        cloud.push_tenant_page(tenant_page(vec![t], Some(ts(0)), None));

        let external = Arc::new(MemoryExternalSystem::new());
        external.create_or_update_tenant(&tenant("T", "T")).await.unwrap();
        for name in ["x", "y", "z"] {
            external
                .create_or_update_offering_item(&offering_item("T", name, 1))
                .await
                .unwrap();
        }
        external.clear_ops().await;

        let cancel = CancellationToken::new();
        reconciler(cloud, external.clone())
            .reconcile_tenants(&cancel)
            .await;

        let keys = external.offering_item_keys().await;
        assert_eq!(keys.len(), 1);
        assert_eq!(keys[0].name, "x");
    }

    #[tokio::test]
    async fn cloud_read_failure_returns_no_watermark() {
        let cloud = Arc::new(FakeCloud::default());
        for _ in 0..5 {
            cloud.push_tenant_error();
        }

        let external = Arc::new(MemoryExternalSystem::new());
        external.create_or_update_tenant(&tenant("A", "A")).await.unwrap();
        external.clear_ops().await;

        let cancel = CancellationToken::new();
        cancel.cancel();
        let watermark = reconciler(cloud, external.clone())
            .reconcile_tenants(&cancel)
            .await;

        assert_eq!(watermark, None);
        // Nothing was touched externally.
        assert!(external.ops().await.is_empty());
        assert_eq!(external.tenant_ids().await, vec!["A"]);
    }

    #[tokio::test]
    async fn external_read_failure_still_returns_the_watermark() {
        let cloud = Arc::new(FakeCloud::default());
        cloud.push_tenant_page(tenant_page(vec![tenant("A", "A")], Some(ts(7)), None));

        let external = Arc::new(MemoryExternalSystem::new());
        external.fail_operation("get_active_tenant_ids").await;

        let cancel = CancellationToken::new();
        cancel.cancel();
        let watermark = reconciler(cloud, external.clone())
            .reconcile_tenants(&cancel)
            .await;

        assert_eq!(watermark, Some(ts(7)));
        // The cycle stopped before any writes.
        assert!(external.tenant_ids().await.is_empty());
    }

    #[tokio::test]
    async fn delete_failures_do_not_abort_the_cycle() {
        let cloud = Arc::new(FakeCloud::default());
        cloud.push_tenant_page(tenant_page(vec![tenant("A", "A")], Some(ts(0)), None));

        let external = Arc::new(MemoryExternalSystem::new());
        for id in ["A", "B", "C"] {
            external.create_or_update_tenant(&tenant(id, id)).await.unwrap();
        }
        external.fail_operation("delete_tenant").await;
        external.clear_ops().await;

        let cancel = CancellationToken::new();
        reconciler(cloud, external.clone())
            .reconcile_tenants(&cancel)
            .await;

        // Upserts still happened after the failed deletes.
        let upserts: Vec<String> = external
            .ops()
            .await
            .into_iter()
            .filter(|op| op.starts_with("create_or_update_tenant"))
            .collect();
        assert_eq!(upserts, vec!["create_or_update_tenant A"]);
    }

    #[tokio::test]
    async fn user_reconcile_applies_alive_policy_set_rule() {
        let cloud = Arc::new(FakeCloud::default());
        let mut u = user("U1", "T1");
        u.access_policies.push(access_policy("AP1", "U1"));
        let mut revoked = access_policy("AP2", "U1");
        revoked.deleted_at = Some(ts(0));
        u.access_policies.push(revoked);
        cloud.push_user_page(user_page(vec![u], Some(ts(1)), None));

        let external = Arc::new(MemoryExternalSystem::new());
        external.create_or_update_tenant(&tenant("T1", "T1")).await.unwrap();
        external.create_or_update_user(&user("U1", "T1")).await.unwrap();
        external.create_or_update_user(&user("U2", "T1")).await.unwrap();
        for id in ["AP1", "AP2", "AP3"] {
            external
                .create_or_update_access_policy(&access_policy(id, "U1"))
                .await
                .unwrap();
        }
        external.clear_ops().await;

        let cancel = CancellationToken::new();
        let watermark = reconciler(cloud, external.clone())
            .reconcile_users(&cancel)
            .await;

        assert_eq!(watermark, Some(ts(1)));
        // U2 was an orphan; AP2 (revoked) and AP3 (unknown) were removed.
        assert_eq!(external.user_ids().await, vec!["U1"]);
        assert_eq!(external.access_policy_ids().await, vec!["AP1"]);
    }

    #[tokio::test]
    async fn reconcile_skips_carrier_rows_in_accumulation() {
        let cloud = Arc::new(FakeCloud::default());
        let mut carrier = tenant("", "");
        carrier.offering_items.push(offering_item("T9", "x", 1));
        cloud.push_tenant_page(tenant_page(vec![carrier, tenant("A", "A")], Some(ts(0)), None));

        let external = Arc::new(MemoryExternalSystem::new());
        let cancel = CancellationToken::new();
        reconciler(cloud, external.clone())
            .reconcile_tenants(&cancel)
            .await;

        // Only the real tenant was upserted; the carrier contributed nothing.
        assert_eq!(external.tenant_ids().await, vec!["A"]);
        assert!(external.offering_item_keys().await.is_empty());
    }
}
