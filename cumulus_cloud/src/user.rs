//! User records and the composite user list endpoint types.

use crate::access_policy::AccessPolicy;
use crate::paging::Pagination;
use crate::tenant::Contact;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct User {
    pub id: String,
    pub version: i64,

    /// Tenant this user belongs to.
    pub tenant_id: String,

    pub login: String,
    pub contact: Contact,
    pub activated: bool,
    pub enabled: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,

    /// Soft-deletion timestamp; `None` means the user is alive.
    pub deleted_at: Option<DateTime<Utc>>,

    pub language: String,
    pub idp_id: String,
    pub external_id: String,
    pub personal_tenant_id: Option<String>,
    pub mfa_status: String,

    /// Embedded access policies; populated when `with_access_policies` is set.
    pub access_policies: Vec<AccessPolicy>,
}

/// Parameters for `GET /api/2/users`.
#[derive(Debug, Clone, Default)]
pub struct UserListRequest {
    pub uuids: Vec<String>,
    pub subtree_root_tenant_id: Option<String>,
    pub updated_since: Option<DateTime<Utc>>,
    pub limit: Option<u32>,
    pub after: Option<String>,
    pub with_access_policies: Option<bool>,
    pub allow_deleted: bool,
}

impl UserListRequest {
    /// Follow-up request for the next page of a previous response.
    pub fn next_page(after: impl Into<String>) -> Self {
        Self {
            after: Some(after.into()),
            ..Default::default()
        }
    }

    pub(crate) fn query(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if !self.uuids.is_empty() {
            params.push(("uuids", self.uuids.join(",")));
        }
        if let Some(root) = &self.subtree_root_tenant_id {
            params.push(("subtree_root_tenant_id", root.clone()));
        }
        if let Some(since) = &self.updated_since {
            params.push((
                "updated_since",
                since.to_rfc3339_opts(SecondsFormat::Secs, true),
            ));
        }
        if let Some(limit) = self.limit {
            params.push(("limit", limit.to_string()));
        }
        if let Some(after) = &self.after {
            params.push(("after", after.clone()));
        }
        if let Some(with_access_policies) = self.with_access_policies {
            params.push(("with_access_policies", with_access_policies.to_string()));
        }
        params.push(("allow_deleted", self.allow_deleted.to_string()));
        params
    }
}

/// Response of `GET /api/2/users`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct UserListResponse {
    pub items: Vec<User>,

    /// Server-side clock at response time; carried forward by callers as the
    /// next `updated_since` watermark.
    pub timestamp: Option<DateTime<Utc>>,

    #[serde(flatten)]
    pub pagination: Pagination,
}

impl UserListResponse {
    pub fn after(&self) -> Option<&str> {
        self.pagination.after()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_always_carries_allow_deleted() {
        let req = UserListRequest::default();
        assert_eq!(req.query(), vec![("allow_deleted", "false".to_string())]);
    }

    #[test]
    fn decodes_user_with_embedded_policies() {
        let raw = r#"{
            "items": [{
                "id": "U1",
                "tenant_id": "T1",
                "login": "jsmith",
                "access_policies": [
                    {"id": "AP1", "trustee_id": "U1", "role_id": "backup_admin"},
                    {"id": "AP2", "trustee_id": "U1", "role_id": "backup_user",
                     "deleted_at": "2024-03-01T10:00:00Z"}
                ]
            }],
            "timestamp": "2024-03-01T10:05:00Z",
            "paging": {"cursors": {"after": "next"}}
        }"#;
        let resp: UserListResponse = serde_json::from_str(raw).unwrap();
        let user = &resp.items[0];
        assert_eq!(user.access_policies.len(), 2);
        assert!(user.access_policies[0].deleted_at.is_none());
        assert!(user.access_policies[1].deleted_at.is_some());
        assert_eq!(resp.after(), Some("next"));
    }
}
