//! HTTP client for the control-plane API.

use crate::auth::TokenSource;
use crate::error::{Error, Result};
use crate::tenant::{TenantListRequest, TenantListResponse};
use crate::usage::{UsagePushRequest, UsagePushResponse};
use crate::user::{UserListRequest, UserListResponse};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;

/// Per-call timeout carried by the underlying HTTP client.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

pub struct Client {
    http: reqwest::Client,
    api_url: String,
    auth: TokenSource,
}

impl Client {
    /// Build a client for `{base_url}/api/2`, acquiring tokens from the
    /// platform's own token endpoint with the given client credentials.
    pub fn new(
        base_url: &str,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        let api_url = format!("{}/api/2", base_url.trim_end_matches('/'));
        let auth = TokenSource::new(
            http.clone(),
            format!("{api_url}/idp/token"),
            client_id,
            client_secret,
        );
        Ok(Self {
            http,
            api_url,
            auth,
        })
    }

    /// Subtree root tenant the API client was registered under. Resolved once
    /// at startup.
    pub async fn get_registration_tenant_id(&self, client_id: &str) -> Result<String> {
        #[derive(Debug, Deserialize)]
        struct RegistrationInfo {
            #[serde(default)]
            tenant_id: Option<String>,
        }

        let info: RegistrationInfo = self.get_json(&format!("/clients/{client_id}"), &[]).await?;
        info.tenant_id
            .filter(|id| !id.is_empty())
            .ok_or(Error::MissingRegistrationTenantId)
    }

    pub async fn list_tenants(&self, request: &TenantListRequest) -> Result<TenantListResponse> {
        self.get_json("/tenants", &request.query()).await
    }

    pub async fn list_users(&self, request: &UserListRequest) -> Result<UserListResponse> {
        self.get_json("/users", &request.query()).await
    }

    pub async fn put_usages(&self, request: &UsagePushRequest) -> Result<UsagePushResponse> {
        let token = self.auth.bearer().await?;
        let response = self
            .http
            .put(format!("{}/tenants/usages", self.api_url))
            .bearer_auth(token)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if status.as_u16() >= 400 {
            let body = response.bytes().await.unwrap_or_default();
            return Err(Error::from_response(status, &body));
        }
        Ok(response.json().await?)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&'static str, String)],
    ) -> Result<T> {
        let token = self.auth.bearer().await?;
        tracing::debug!(path, "cloud api request");
        let response = self
            .http
            .get(format!("{}{}", self.api_url, path))
            .query(query)
            .bearer_auth(token)
            .send()
            .await?;

        let status = response.status();
        if status.as_u16() >= 400 {
            // Consuming the body on the error path keeps the connection
            // reusable and yields the structured envelope when one is present.
            let body = response.bytes().await.unwrap_or_default();
            return Err(Error::from_response(status, &body));
        }
        Ok(response.json().await?)
    }
}
