//! REST client for the external system's CRUD façade.
//!
//! Create-or-update is a `POST` answered with 201 (created) or 204 (updated);
//! listings are classic `offset`/`limit` pages; deletes are idempotent.

use crate::models::{
    ExternalAccessPolicy, ExternalOfferingItem, ExternalTenant, ExternalUsage, ExternalUser,
};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Serialize;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("error connecting to external system: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("external system returned status {status} for {path}")]
    Status { status: u16, path: String },
}

pub type Result<T> = std::result::Result<T, Error>;

pub struct Client {
    http: reqwest::Client,
    base_url: String,
}

impl Client {
    pub fn new(base_url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub async fn create_or_update_tenant(&self, tenant: &ExternalTenant) -> Result<bool> {
        self.post_upsert("/tenants", tenant).await
    }

    pub async fn delete_tenant(&self, tenant_id: &str) -> Result<()> {
        self.delete(&format!("/tenants/{tenant_id}")).await
    }

    pub async fn get_tenants(&self, offset: usize, limit: usize) -> Result<Vec<ExternalTenant>> {
        self.get_page("/tenants", offset, limit).await
    }

    /// Existence by status: 200 present, 404 absent, anything else an error.
    pub async fn check_tenant_exists(&self, tenant_id: &str) -> Result<bool> {
        let path = format!("/tenants/{tenant_id}");
        let response = self
            .http
            .get(format!("{}{}", self.base_url, path))
            .send()
            .await?;
        match response.status() {
            StatusCode::OK => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            status => Err(Error::Status {
                status: status.as_u16(),
                path,
            }),
        }
    }

    pub async fn create_or_update_offering_item(
        &self,
        item: &ExternalOfferingItem,
    ) -> Result<bool> {
        self.post_upsert(&format!("/tenants/{}/offering_items", item.tenant_id), item)
            .await
    }

    pub async fn delete_offering_item(&self, tenant_id: &str, name: &str) -> Result<()> {
        self.delete(&format!("/tenants/{tenant_id}/offering_items/{name}"))
            .await
    }

    pub async fn get_offering_items(
        &self,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<ExternalOfferingItem>> {
        self.get_page("/offering_items", offset, limit).await
    }

    pub async fn create_or_update_user(&self, user: &ExternalUser) -> Result<bool> {
        self.post_upsert("/users", user).await
    }

    pub async fn delete_user(&self, user_id: &str) -> Result<()> {
        self.delete(&format!("/users/{user_id}")).await
    }

    pub async fn get_users(&self, offset: usize, limit: usize) -> Result<Vec<ExternalUser>> {
        self.get_page("/users", offset, limit).await
    }

    pub async fn create_or_update_access_policy(
        &self,
        policy: &ExternalAccessPolicy,
    ) -> Result<bool> {
        self.post_upsert("/access_policies", policy).await
    }

    pub async fn delete_access_policy(&self, policy_id: &str) -> Result<()> {
        self.delete(&format!("/access_policies/{policy_id}")).await
    }

    pub async fn get_access_policies(
        &self,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<ExternalAccessPolicy>> {
        self.get_page("/access_policies", offset, limit).await
    }

    pub async fn get_usages(&self, offset: usize, limit: usize) -> Result<Vec<ExternalUsage>> {
        self.get_page("/usages", offset, limit).await
    }

    async fn post_upsert<T: Serialize>(&self, path: &str, body: &T) -> Result<bool> {
        let response = self
            .http
            .post(format!("{}{}", self.base_url, path))
            .json(body)
            .send()
            .await?;
        let status = response.status();
        if status.as_u16() >= 400 {
            return Err(Error::Status {
                status: status.as_u16(),
                path: path.to_string(),
            });
        }
        Ok(status == StatusCode::CREATED)
    }

    async fn delete(&self, path: &str) -> Result<()> {
        let response = self
            .http
            .delete(format!("{}{}", self.base_url, path))
            .send()
            .await?;
        let status = response.status();
        if status.as_u16() >= 400 {
            return Err(Error::Status {
                status: status.as_u16(),
                path: path.to_string(),
            });
        }
        Ok(())
    }

    async fn get_page<T: DeserializeOwned>(
        &self,
        path: &str,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<T>> {
        let response = self
            .http
            .get(format!("{}{}", self.base_url, path))
            .query(&[("offset", offset), ("limit", limit)])
            .send()
            .await?;
        let status = response.status();
        if status.as_u16() >= 400 {
            return Err(Error::Status {
                status: status.as_u16(),
                path: path.to_string(),
            });
        }
        Ok(response.json().await?)
    }
}
