//! In-memory store behind the sample server.
//!
//! Listings are sorted by natural key so offset/limit walks are stable while
//! the connector pages through them.

use crate::models::{
    ExternalAccessPolicy, ExternalOfferingItem, ExternalTenant, ExternalUsage, ExternalUser,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;

#[derive(Default)]
pub struct Store {
    tenants: RwLock<HashMap<String, ExternalTenant>>,
    offering_items: RwLock<HashMap<(String, String), ExternalOfferingItem>>,
    users: RwLock<HashMap<String, ExternalUser>>,
    access_policies: RwLock<HashMap<String, ExternalAccessPolicy>>,
    usages: RwLock<Vec<ExternalUsage>>,
    next_usage_id: AtomicU64,
}

fn page<T>(mut items: Vec<T>, offset: usize, limit: usize) -> Vec<T> {
    if offset >= items.len() {
        return Vec::new();
    }
    let end = (offset + limit).min(items.len());
    items.drain(offset..end).collect()
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` when the tenant was newly created.
    pub async fn upsert_tenant(&self, tenant: ExternalTenant) -> bool {
        let mut tenants = self.tenants.write().await;
        tenants.insert(tenant.id.clone(), tenant).is_none()
    }

    pub async fn delete_tenant(&self, tenant_id: &str) {
        self.tenants.write().await.remove(tenant_id);
    }

    pub async fn tenant(&self, tenant_id: &str) -> Option<ExternalTenant> {
        self.tenants.read().await.get(tenant_id).cloned()
    }

    pub async fn tenants(&self, offset: usize, limit: usize) -> Vec<ExternalTenant> {
        let mut all: Vec<ExternalTenant> = self.tenants.read().await.values().cloned().collect();
        all.sort_by(|a, b| a.id.cmp(&b.id));
        page(all, offset, limit)
    }

    pub async fn upsert_offering_item(&self, item: ExternalOfferingItem) -> bool {
        let key = (item.tenant_id.clone(), item.name.clone());
        let mut items = self.offering_items.write().await;
        items.insert(key, item).is_none()
    }

    pub async fn delete_offering_item(&self, tenant_id: &str, name: &str) {
        self.offering_items
            .write()
            .await
            .remove(&(tenant_id.to_string(), name.to_string()));
    }

    pub async fn offering_item(&self, tenant_id: &str, name: &str) -> Option<ExternalOfferingItem> {
        self.offering_items
            .read()
            .await
            .get(&(tenant_id.to_string(), name.to_string()))
            .cloned()
    }

    pub async fn offering_items(&self, offset: usize, limit: usize) -> Vec<ExternalOfferingItem> {
        let mut all: Vec<ExternalOfferingItem> =
            self.offering_items.read().await.values().cloned().collect();
        all.sort_by(|a, b| (&a.tenant_id, &a.name).cmp(&(&b.tenant_id, &b.name)));
        page(all, offset, limit)
    }

    pub async fn upsert_user(&self, user: ExternalUser) -> bool {
        let mut users = self.users.write().await;
        users.insert(user.id.clone(), user).is_none()
    }

    pub async fn delete_user(&self, user_id: &str) {
        self.users.write().await.remove(user_id);
    }

    pub async fn user(&self, user_id: &str) -> Option<ExternalUser> {
        self.users.read().await.get(user_id).cloned()
    }

    pub async fn users(&self, offset: usize, limit: usize) -> Vec<ExternalUser> {
        let mut all: Vec<ExternalUser> = self.users.read().await.values().cloned().collect();
        all.sort_by(|a, b| a.id.cmp(&b.id));
        page(all, offset, limit)
    }

    pub async fn upsert_access_policy(&self, policy: ExternalAccessPolicy) -> bool {
        let mut policies = self.access_policies.write().await;
        policies.insert(policy.id.clone(), policy).is_none()
    }

    pub async fn delete_access_policy(&self, policy_id: &str) {
        self.access_policies.write().await.remove(policy_id);
    }

    pub async fn access_policy(&self, policy_id: &str) -> Option<ExternalAccessPolicy> {
        self.access_policies.read().await.get(policy_id).cloned()
    }

    pub async fn access_policies(&self, offset: usize, limit: usize) -> Vec<ExternalAccessPolicy> {
        let mut all: Vec<ExternalAccessPolicy> =
            self.access_policies.read().await.values().cloned().collect();
        all.sort_by(|a, b| a.id.cmp(&b.id));
        page(all, offset, limit)
    }

    /// Store a usage sample, assigning it a fresh row id.
    pub async fn add_usage(&self, mut usage: ExternalUsage) -> ExternalUsage {
        usage.id = self.next_usage_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.usages.write().await.push(usage.clone());
        usage
    }

    pub async fn usages(&self, offset: usize, limit: usize) -> Vec<ExternalUsage> {
        page(self.usages.read().await.clone(), offset, limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tenant(id: &str) -> ExternalTenant {
        ExternalTenant {
            id: id.into(),
            parent_id: id.into(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn upsert_distinguishes_create_from_update() {
        let store = Store::new();
        assert!(store.upsert_tenant(tenant("A")).await);
        assert!(!store.upsert_tenant(tenant("A")).await);
    }

    #[tokio::test]
    async fn listings_walk_stably_with_offset_and_limit() {
        let store = Store::new();
        for id in ["c", "a", "b", "d"] {
            store.upsert_tenant(tenant(id)).await;
        }
        let first = store.tenants(0, 3).await;
        let second = store.tenants(3, 3).await;
        let ids: Vec<&str> = first.iter().chain(second.iter()).map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c", "d"]);
        assert!(store.tenants(10, 3).await.is_empty());
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let store = Store::new();
        store.upsert_tenant(tenant("A")).await;
        store.delete_tenant("A").await;
        store.delete_tenant("A").await;
        assert!(store.tenant("A").await.is_none());
    }

    #[tokio::test]
    async fn usages_receive_sequential_ids() {
        let store = Store::new();
        let first = store.add_usage(ExternalUsage::default()).await;
        let second = store.add_usage(ExternalUsage::default()).await;
        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);
        assert_eq!(store.usages(0, 10).await.len(), 2);
    }
}
