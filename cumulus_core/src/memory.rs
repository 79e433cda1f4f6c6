//! In-memory external system for local development and unit tests.

use crate::external::{ExternalSystem, OfferingItemKey};
use crate::{Error, Result};
use async_trait::async_trait;
use cumulus_cloud::{AccessPolicy, OfferingItem, Tenant, Usage, User};
use std::collections::{HashMap, HashSet};
use tokio::sync::Mutex;

/// In-memory [`ExternalSystem`].
///
/// Semantics match the REST adapter: create-or-update is keyed by the natural
/// identity of each record, deletes of absent records are no-ops, and the
/// `get_active_*` listings page deterministically (sorted by key).
///
/// Every call is appended to an operation journal so tests can assert call
/// ordering; individual operations can be made to fail by name.
#[derive(Default)]
pub struct MemoryExternalSystem {
    tenants: Mutex<HashMap<String, Tenant>>,
    offering_items: Mutex<HashMap<OfferingItemKey, OfferingItem>>,
    users: Mutex<HashMap<String, User>>,
    access_policies: Mutex<HashMap<String, AccessPolicy>>,
    usages: Mutex<Vec<Usage>>,
    ops: Mutex<Vec<String>>,
    failing: Mutex<HashSet<String>>,
}

impl MemoryExternalSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Journal of every operation performed, in order (e.g.
    /// `"delete_offering_item T1/storage"`).
    pub async fn ops(&self) -> Vec<String> {
        self.ops.lock().await.clone()
    }

    pub async fn clear_ops(&self) {
        self.ops.lock().await.clear();
    }

    /// Make every subsequent call to `operation` fail.
    pub async fn fail_operation(&self, operation: &str) {
        self.failing.lock().await.insert(operation.to_string());
    }

    pub async fn tenant_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.tenants.lock().await.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub async fn offering_item_keys(&self) -> Vec<OfferingItemKey> {
        let mut keys: Vec<OfferingItemKey> =
            self.offering_items.lock().await.keys().cloned().collect();
        keys.sort_by(|a, b| (&a.tenant_id, &a.name).cmp(&(&b.tenant_id, &b.name)));
        keys
    }

    pub async fn user_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.users.lock().await.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub async fn access_policy_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.access_policies.lock().await.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Seed usage samples returned by `get_usages`.
    pub async fn set_usages(&self, usages: Vec<Usage>) {
        *self.usages.lock().await = usages;
    }

    async fn record(&self, op: String) -> Result<()> {
        let name = op.split(' ').next().unwrap_or_default().to_string();
        self.ops.lock().await.push(op.clone());
        if self.failing.lock().await.contains(&name) {
            return Err(Error::external(
                op,
                std::io::Error::other("injected failure"),
            ));
        }
        Ok(())
    }

    fn slice_sorted<T: Clone>(mut items: Vec<T>, offset: usize, limit: usize) -> Vec<T> {
        if offset >= items.len() {
            return Vec::new();
        }
        let end = (offset + limit).min(items.len());
        items.drain(offset..end).collect()
    }
}

#[async_trait]
impl ExternalSystem for MemoryExternalSystem {
    async fn create_or_update_tenant(&self, tenant: &Tenant) -> Result<bool> {
        self.record(format!("create_or_update_tenant {}", tenant.id))
            .await?;
        let mut tenants = self.tenants.lock().await;
        Ok(tenants.insert(tenant.id.clone(), tenant.clone()).is_none())
    }

    async fn delete_tenant(&self, tenant_id: &str) -> Result<()> {
        self.record(format!("delete_tenant {tenant_id}")).await?;
        self.tenants.lock().await.remove(tenant_id);
        Ok(())
    }

    async fn get_active_tenant_ids(&self, offset: usize, limit: usize) -> Result<Vec<String>> {
        self.record(format!("get_active_tenant_ids {offset}")).await?;
        Ok(Self::slice_sorted(self.tenant_ids().await, offset, limit))
    }

    async fn tenant_exists(&self, tenant_id: &str) -> Result<bool> {
        self.record(format!("tenant_exists {tenant_id}")).await?;
        Ok(self.tenants.lock().await.contains_key(tenant_id))
    }

    async fn create_or_update_offering_item(&self, item: &OfferingItem) -> Result<bool> {
        let key = OfferingItemKey::of(item);
        self.record(format!("create_or_update_offering_item {key}"))
            .await?;
        let mut items = self.offering_items.lock().await;
        Ok(items.insert(key, item.clone()).is_none())
    }

    async fn delete_offering_item(&self, key: &OfferingItemKey) -> Result<()> {
        self.record(format!("delete_offering_item {key}")).await?;
        self.offering_items.lock().await.remove(key);
        Ok(())
    }

    async fn get_active_offering_item_ids(
        &self,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<OfferingItemKey>> {
        self.record(format!("get_active_offering_item_ids {offset}"))
            .await?;
        Ok(Self::slice_sorted(
            self.offering_item_keys().await,
            offset,
            limit,
        ))
    }

    async fn create_or_update_user(&self, user: &User) -> Result<bool> {
        self.record(format!("create_or_update_user {}", user.id)).await?;
        let mut users = self.users.lock().await;
        Ok(users.insert(user.id.clone(), user.clone()).is_none())
    }

    async fn delete_user(&self, user_id: &str) -> Result<()> {
        self.record(format!("delete_user {user_id}")).await?;
        self.users.lock().await.remove(user_id);
        Ok(())
    }

    async fn get_active_user_ids(&self, offset: usize, limit: usize) -> Result<Vec<String>> {
        self.record(format!("get_active_user_ids {offset}")).await?;
        Ok(Self::slice_sorted(self.user_ids().await, offset, limit))
    }

    async fn create_or_update_access_policy(&self, policy: &AccessPolicy) -> Result<bool> {
        self.record(format!("create_or_update_access_policy {}", policy.id))
            .await?;
        let mut policies = self.access_policies.lock().await;
        Ok(policies.insert(policy.id.clone(), policy.clone()).is_none())
    }

    async fn delete_access_policy(&self, policy_id: &str) -> Result<()> {
        self.record(format!("delete_access_policy {policy_id}")).await?;
        self.access_policies.lock().await.remove(policy_id);
        Ok(())
    }

    async fn get_active_access_policy_ids(
        &self,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<String>> {
        self.record(format!("get_active_access_policy_ids {offset}"))
            .await?;
        Ok(Self::slice_sorted(
            self.access_policy_ids().await,
            offset,
            limit,
        ))
    }

    async fn get_usages(&self, offset: usize, limit: usize) -> Result<Vec<Usage>> {
        self.record(format!("get_usages {offset}")).await?;
        Ok(Self::slice_sorted(
            self.usages.lock().await.clone(),
            offset,
            limit,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::tenant;

    #[tokio::test]
    async fn upsert_reports_created_then_updated() {
        let external = MemoryExternalSystem::new();
        assert!(external.create_or_update_tenant(&tenant("A", "A")).await.unwrap());
        assert!(!external.create_or_update_tenant(&tenant("A", "A")).await.unwrap());
    }

    #[tokio::test]
    async fn delete_of_absent_record_is_a_noop() {
        let external = MemoryExternalSystem::new();
        external.delete_tenant("missing").await.unwrap();
        external.delete_access_policy("missing").await.unwrap();
    }

    #[tokio::test]
    async fn listings_page_deterministically() {
        let external = MemoryExternalSystem::new();
        for id in ["c", "a", "b"] {
            external.create_or_update_tenant(&tenant(id, id)).await.unwrap();
        }
        let first = external.get_active_tenant_ids(0, 2).await.unwrap();
        let second = external.get_active_tenant_ids(2, 2).await.unwrap();
        assert_eq!(first, vec!["a", "b"]);
        assert_eq!(second, vec!["c"]);
    }

    #[tokio::test]
    async fn injected_failures_surface_by_operation_name() {
        let external = MemoryExternalSystem::new();
        external.fail_operation("delete_tenant").await;
        assert!(external.delete_tenant("A").await.is_err());
        assert!(external.create_or_update_tenant(&tenant("A", "A")).await.is_ok());
    }
}
