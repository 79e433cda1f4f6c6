//! Adapter implementing the engine's `ExternalSystem` trait over the REST
//! client.

use crate::client::Client;
use crate::models::{
    ExternalAccessPolicy, ExternalOfferingItem, ExternalTenant, ExternalUser,
};
use async_trait::async_trait;
use cumulus_cloud::{AccessPolicy, OfferingItem, Tenant, Usage, User};
use cumulus_core::{Error, ExternalSystem, OfferingItemKey, Result};

pub struct RestExternalSystem {
    client: Client,
}

impl RestExternalSystem {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ExternalSystem for RestExternalSystem {
    async fn create_or_update_tenant(&self, tenant: &Tenant) -> Result<bool> {
        self.client
            .create_or_update_tenant(&ExternalTenant::from(tenant))
            .await
            .map_err(|e| Error::external("create_or_update_tenant", e))
    }

    async fn delete_tenant(&self, tenant_id: &str) -> Result<()> {
        self.client
            .delete_tenant(tenant_id)
            .await
            .map_err(|e| Error::external("delete_tenant", e))
    }

    async fn get_active_tenant_ids(&self, offset: usize, limit: usize) -> Result<Vec<String>> {
        let tenants = self
            .client
            .get_tenants(offset, limit)
            .await
            .map_err(|e| Error::external("get_active_tenant_ids", e))?;
        Ok(tenants.into_iter().map(|t| t.id).collect())
    }

    async fn tenant_exists(&self, tenant_id: &str) -> Result<bool> {
        self.client
            .check_tenant_exists(tenant_id)
            .await
            .map_err(|e| Error::external("tenant_exists", e))
    }

    async fn create_or_update_offering_item(&self, item: &OfferingItem) -> Result<bool> {
        self.client
            .create_or_update_offering_item(&ExternalOfferingItem::from(item))
            .await
            .map_err(|e| Error::external("create_or_update_offering_item", e))
    }

    async fn delete_offering_item(&self, key: &OfferingItemKey) -> Result<()> {
        self.client
            .delete_offering_item(&key.tenant_id, &key.name)
            .await
            .map_err(|e| Error::external("delete_offering_item", e))
    }

    async fn get_active_offering_item_ids(
        &self,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<OfferingItemKey>> {
        let items = self
            .client
            .get_offering_items(offset, limit)
            .await
            .map_err(|e| Error::external("get_active_offering_item_ids", e))?;
        // Items already turned off externally need no reconcile delete.
        Ok(items
            .into_iter()
            .filter(|item| item.status > 0)
            .map(|item| OfferingItemKey {
                tenant_id: item.tenant_id,
                name: item.name,
            })
            .collect())
    }

    async fn create_or_update_user(&self, user: &User) -> Result<bool> {
        self.client
            .create_or_update_user(&ExternalUser::from(user))
            .await
            .map_err(|e| Error::external("create_or_update_user", e))
    }

    async fn delete_user(&self, user_id: &str) -> Result<()> {
        self.client
            .delete_user(user_id)
            .await
            .map_err(|e| Error::external("delete_user", e))
    }

    async fn get_active_user_ids(&self, offset: usize, limit: usize) -> Result<Vec<String>> {
        let users = self
            .client
            .get_users(offset, limit)
            .await
            .map_err(|e| Error::external("get_active_user_ids", e))?;
        Ok(users.into_iter().map(|u| u.id).collect())
    }

    async fn create_or_update_access_policy(&self, policy: &AccessPolicy) -> Result<bool> {
        self.client
            .create_or_update_access_policy(&ExternalAccessPolicy::from(policy))
            .await
            .map_err(|e| Error::external("create_or_update_access_policy", e))
    }

    async fn delete_access_policy(&self, policy_id: &str) -> Result<()> {
        self.client
            .delete_access_policy(policy_id)
            .await
            .map_err(|e| Error::external("delete_access_policy", e))
    }

    async fn get_active_access_policy_ids(
        &self,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<String>> {
        let policies = self
            .client
            .get_access_policies(offset, limit)
            .await
            .map_err(|e| Error::external("get_active_access_policy_ids", e))?;
        Ok(policies.into_iter().map(|p| p.id).collect())
    }

    async fn get_usages(&self, offset: usize, limit: usize) -> Result<Vec<Usage>> {
        let usages = self
            .client
            .get_usages(offset, limit)
            .await
            .map_err(|e| Error::external("get_usages", e))?;
        Ok(usages.into_iter().map(Usage::from).collect())
    }
}
