//! Incremental sync: pull deltas since a watermark and apply them.
//!
//! Two independent loops share this implementation: tenants + offering items
//! and users + access policies. Each cycle lists changes with
//! `allow_deleted=true` and `updated_since=watermark`, applies every row
//! (including tombstones and carrier rows), and follows the cursor through
//! the remaining pages. Errors never stop the loop; the next cycle retries.

use crate::cloud::{CloudApi, CLOUD_PAGE_SIZE};
use crate::config::WatermarkPolicy;
use crate::external::{ExternalSystem, OfferingItemKey};
use crate::upsert::{upsert_tenant, upsert_user};
use chrono::{DateTime, Utc};
use cumulus_cloud::{
    AccessPolicy, OfferingItem, Tenant, TenantListRequest, User, UserListRequest,
};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// What a composite-API row asks the engine to do.
///
/// Rows with an id are full records (alive or tombstoned); rows without one
/// are carriers for standalone child deltas and imply the deletion of the
/// parent named by their first child.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RowChange<'a> {
    Upsert,
    Tombstone { delete_id: &'a str },
    CarrierTombstone { delete_id: &'a str },
    Skip,
}

impl<'a> RowChange<'a> {
    fn delete_id(self) -> Option<&'a str> {
        match self {
            RowChange::Tombstone { delete_id } | RowChange::CarrierTombstone { delete_id } => {
                Some(delete_id)
            }
            _ => None,
        }
    }
}

fn classify_tenant(row: &Tenant) -> RowChange<'_> {
    if !row.id.is_empty() {
        if row.deleted_at.is_none() {
            RowChange::Upsert
        } else {
            RowChange::Tombstone { delete_id: &row.id }
        }
    } else if let Some(first) = row.offering_items.first() {
        RowChange::CarrierTombstone {
            delete_id: &first.tenant_id,
        }
    } else {
        RowChange::Skip
    }
}

fn classify_user(row: &User) -> RowChange<'_> {
    if !row.id.is_empty() {
        if row.deleted_at.is_none() {
            RowChange::Upsert
        } else {
            RowChange::Tombstone { delete_id: &row.id }
        }
    } else if let Some(first) = row.access_policies.first() {
        RowChange::CarrierTombstone {
            delete_id: &first.trustee_id,
        }
    } else {
        RowChange::Skip
    }
}

/// Advance the watermark, never letting it regress.
fn advance(watermark: &mut Option<DateTime<Utc>>, candidate: Option<DateTime<Utc>>) {
    if let Some(ts) = candidate {
        *watermark = Some(watermark.map_or(ts, |current| current.max(ts)));
    }
}

pub struct SyncLoop {
    cloud: Arc<dyn CloudApi>,
    external: Arc<dyn ExternalSystem>,
    subtree_root_id: String,
    update_interval: Duration,
    watermark_policy: WatermarkPolicy,
}

impl SyncLoop {
    pub fn new(
        cloud: Arc<dyn CloudApi>,
        external: Arc<dyn ExternalSystem>,
        subtree_root_id: impl Into<String>,
        update_interval: Duration,
        watermark_policy: WatermarkPolicy,
    ) -> Self {
        Self {
            cloud,
            external,
            subtree_root_id: subtree_root_id.into(),
            update_interval,
            watermark_policy,
        }
    }

    /// Run tenant + offering-item cycles forever. The first cycle starts
    /// immediately; later ones follow every `update_interval`.
    #[tracing::instrument(name = "tenants_sync", skip_all)]
    pub async fn run_tenants(
        self: Arc<Self>,
        seed: Option<DateTime<Utc>>,
        cancel: CancellationToken,
    ) {
        let mut watermark = seed;
        loop {
            self.tenants_cycle(&mut watermark).await;
            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = tokio::time::sleep(self.update_interval) => {}
            }
        }
    }

    /// Run user + access-policy cycles forever.
    #[tracing::instrument(name = "users_sync", skip_all)]
    pub async fn run_users(
        self: Arc<Self>,
        seed: Option<DateTime<Utc>>,
        cancel: CancellationToken,
    ) {
        let mut watermark = seed;
        loop {
            self.users_cycle(&mut watermark).await;
            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = tokio::time::sleep(self.update_interval) => {}
            }
        }
    }

    pub(crate) async fn tenants_cycle(&self, watermark: &mut Option<DateTime<Utc>>) {
        let request = TenantListRequest {
            subtree_root_id: Some(self.subtree_root_id.clone()),
            limit: Some(CLOUD_PAGE_SIZE),
            with_contacts: Some(true),
            with_offering_items: Some(true),
            allow_deleted: true,
            updated_since: *watermark,
            ..Default::default()
        };

        let mut response = match self.cloud.list_tenants(&request).await {
            Ok(response) => response,
            Err(err) => {
                tracing::warn!(error = %err, "failed to get tenants");
                return;
            }
        };

        let cycle_timestamp = response.timestamp;
        if self.watermark_policy == WatermarkPolicy::Eager {
            advance(watermark, cycle_timestamp);
        }

        let mut tenants = response.items.len();
        let mut offering_items = count_offering_items(&response.items);
        self.apply_tenant_rows(&response.items).await;

        let mut all_pages_decoded = true;
        while let Some(after) = response.after().map(str::to_owned) {
            match self
                .cloud
                .list_tenants(&TenantListRequest::next_page(after))
                .await
            {
                Ok(next) => {
                    response = next;
                    tenants += response.items.len();
                    offering_items += count_offering_items(&response.items);
                    self.apply_tenant_rows(&response.items).await;
                }
                Err(err) => {
                    tracing::warn!(error = %err, "failed to get tenants next page");
                    all_pages_decoded = false;
                    break;
                }
            }
        }

        if self.watermark_policy == WatermarkPolicy::Deferred && all_pages_decoded {
            advance(watermark, cycle_timestamp);
        }

        if tenants > 0 {
            tracing::info!(tenants, offering_items, "synced tenant changes");
        } else {
            tracing::debug!("update cycle succeeded, no tenant changes reported");
        }
    }

    pub(crate) async fn users_cycle(&self, watermark: &mut Option<DateTime<Utc>>) {
        let request = UserListRequest {
            subtree_root_tenant_id: Some(self.subtree_root_id.clone()),
            limit: Some(CLOUD_PAGE_SIZE),
            with_access_policies: Some(true),
            allow_deleted: true,
            updated_since: *watermark,
            ..Default::default()
        };

        let mut response = match self.cloud.list_users(&request).await {
            Ok(response) => response,
            Err(err) => {
                tracing::warn!(error = %err, "failed to get users");
                return;
            }
        };

        let cycle_timestamp = response.timestamp;
        if self.watermark_policy == WatermarkPolicy::Eager {
            advance(watermark, cycle_timestamp);
        }

        let mut users = response.items.len();
        let mut access_policies = count_access_policies(&response.items);
        self.apply_user_rows(&response.items).await;

        let mut all_pages_decoded = true;
        while let Some(after) = response.after().map(str::to_owned) {
            match self
                .cloud
                .list_users(&UserListRequest::next_page(after))
                .await
            {
                Ok(next) => {
                    response = next;
                    users += response.items.len();
                    access_policies += count_access_policies(&response.items);
                    self.apply_user_rows(&response.items).await;
                }
                Err(err) => {
                    tracing::warn!(error = %err, "failed to get users next page");
                    all_pages_decoded = false;
                    break;
                }
            }
        }

        if self.watermark_policy == WatermarkPolicy::Deferred && all_pages_decoded {
            advance(watermark, cycle_timestamp);
        }

        if users > 0 {
            tracing::info!(users, access_policies, "synced user changes");
        } else {
            tracing::debug!("update cycle succeeded, no user changes reported");
        }
    }

    /// Apply one page of tenant rows.
    ///
    /// Upserts happen before the row's offering items so children never
    /// precede their parent; deletions happen after them so dependent rows
    /// vanish first.
    async fn apply_tenant_rows(&self, rows: &[Tenant]) {
        for row in rows {
            let change = classify_tenant(row);

            if change == RowChange::Upsert {
                if let Err(err) =
                    upsert_tenant(self.cloud.as_ref(), self.external.as_ref(), row).await
                {
                    tracing::warn!(tenant_id = %row.id, error = %err, "failed to update tenant");
                }
            }

            self.apply_offering_items(&row.offering_items).await;

            if let Some(delete_id) = change.delete_id() {
                if let Err(err) = self.external.delete_tenant(delete_id).await {
                    tracing::warn!(tenant_id = %delete_id, error = %err, "failed to push tenant deletion");
                }
            }
        }
    }

    async fn apply_offering_items(&self, items: &[OfferingItem]) {
        for item in items {
            if item.status == 0 {
                let key = OfferingItemKey::of(item);
                if let Err(err) = self.external.delete_offering_item(&key).await {
                    tracing::warn!(offering_item = %key, error = %err, "failed to delete offering item");
                }
            } else if let Err(err) = self.external.create_or_update_offering_item(item).await {
                tracing::warn!(
                    offering_item = %OfferingItemKey::of(item),
                    error = %err,
                    "failed to upsert offering item"
                );
            }
        }
    }

    async fn apply_user_rows(&self, rows: &[User]) {
        for row in rows {
            let change = classify_user(row);

            if change == RowChange::Upsert {
                if let Err(err) =
                    upsert_user(self.cloud.as_ref(), self.external.as_ref(), row).await
                {
                    tracing::warn!(user_id = %row.id, error = %err, "failed to update user");
                }
            }

            self.apply_access_policies(&row.access_policies).await;

            if let Some(delete_id) = change.delete_id() {
                if let Err(err) = self.external.delete_user(delete_id).await {
                    tracing::warn!(user_id = %delete_id, error = %err, "failed to push user deletion");
                }
            }
        }
    }

    async fn apply_access_policies(&self, policies: &[AccessPolicy]) {
        for policy in policies {
            if policy.deleted_at.is_some() {
                if let Err(err) = self.external.delete_access_policy(&policy.id).await {
                    tracing::warn!(policy_id = %policy.id, error = %err, "failed to delete access policy");
                }
            } else if let Err(err) = self.external.create_or_update_access_policy(policy).await {
                tracing::warn!(policy_id = %policy.id, error = %err, "failed to upsert access policy");
            }
        }
    }
}

fn count_offering_items(rows: &[Tenant]) -> usize {
    rows.iter().map(|row| row.offering_items.len()).sum()
}

fn count_access_policies(rows: &[User]) -> usize {
    rows.iter().map(|row| row.access_policies.len()).sum()
}
