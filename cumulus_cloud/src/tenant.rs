//! Tenant records and the composite tenant list endpoint types.

use crate::offering_item::OfferingItem;
use crate::paging::Pagination;
use crate::time;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// A node in the customer hierarchy. Roots are self-parented
/// (`parent_id == id`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tenant {
    pub id: String,

    /// Auto-incremented entity version.
    pub version: i64,

    #[serde(with = "time::flexible")]
    pub created_at: Option<DateTime<Utc>>,

    /// Equals `created_at` right after creation and `deleted_at` right after
    /// deletion.
    #[serde(with = "time::flexible")]
    pub updated_at: Option<DateTime<Utc>>,

    /// Soft-deletion timestamp; `None` means the tenant is alive.
    #[serde(with = "time::flexible")]
    pub deleted_at: Option<DateTime<Utc>>,

    pub name: String,
    pub customer_type: String,
    pub parent_id: String,
    pub kind: String,
    pub contact: Contact,
    pub contacts: Vec<Contact>,

    /// Embedded offering items; populated when `with_offering_items` is set.
    pub offering_items: Vec<OfferingItem>,

    pub enabled: bool,
    pub customer_id: Option<String>,
    pub brand_uuid: String,
    pub internal_tag: Option<String>,
    pub language: String,
    pub owner_id: Option<String>,
    pub has_children: bool,
    pub default_idp_id: Option<String>,
    pub update_lock: UpdateLock,
    pub ancestral_access: bool,
    pub mfa_status: String,
    pub pricing_mode: String,
}

impl Tenant {
    /// Roots carry themselves as parent and have no parent dependency.
    pub fn is_root(&self) -> bool {
        self.parent_id == self.id
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Contact {
    pub id: String,
    pub types: Vec<String>,
    pub email: Option<String>,
    pub firstname: Option<String>,
    pub lastname: Option<String>,
    pub address1: Option<String>,
    pub address2: Option<String>,
    pub country: Option<String>,
    pub state: Option<String>,
    pub city: Option<String>,
    pub zipcode: Option<String>,
    pub phone: Option<String>,
    pub title: Option<String>,
    pub website: Option<String>,
    pub industry: Option<String>,
    pub organization_size: Option<String>,
    pub email_confirmed: Option<bool>,
    pub external_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdateLock {
    pub enabled: bool,
    pub owner_id: Option<String>,
}

/// Parameters for `GET /api/2/tenants`.
///
/// `uuids` and `subtree_root_id` are mutually exclusive filters; a request
/// built from a cursor carries neither (the cursor encodes the original
/// filters).
#[derive(Debug, Clone, Default)]
pub struct TenantListRequest {
    pub uuids: Vec<String>,
    pub subtree_root_id: Option<String>,
    pub updated_since: Option<DateTime<Utc>>,
    pub limit: Option<u32>,
    pub after: Option<String>,
    pub with_contacts: Option<bool>,
    pub with_offering_items: Option<bool>,
    pub allow_deleted: bool,
}

impl TenantListRequest {
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
        if let Some(root) = &self.subtree_root_id {
            params.push(("subtree_root_id", root.clone()));
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
        if let Some(with_contacts) = self.with_contacts {
            params.push(("with_contacts", with_contacts.to_string()));
        }
        if let Some(with_offering_items) = self.with_offering_items {
            params.push(("with_offering_items", with_offering_items.to_string()));
        }
        params.push(("allow_deleted", self.allow_deleted.to_string()));
        params
    }
}

/// Response of `GET /api/2/tenants`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TenantListResponse {
    pub items: Vec<Tenant>,

    /// Server-side clock at response time; carried forward by callers as the
    /// next `updated_since` watermark.
    #[serde(with = "time::flexible")]
    pub timestamp: Option<DateTime<Utc>>,

    #[serde(flatten)]
    pub pagination: Pagination,
}

impl TenantListResponse {
    pub fn after(&self) -> Option<&str> {
        self.pagination.after()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn query_always_carries_allow_deleted() {
        let req = TenantListRequest::default();
        let query = req.query();
        assert_eq!(query, vec![("allow_deleted", "false".to_string())]);
    }

    #[test]
    fn query_renders_all_filters() {
        let req = TenantListRequest {
            uuids: vec!["a".into(), "b".into()],
            subtree_root_id: Some("root-1".into()),
            updated_since: Some(Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap()),
            limit: Some(100),
            after: Some("cur".into()),
            with_contacts: Some(true),
            with_offering_items: Some(true),
            allow_deleted: true,
        };
        let query = req.query();
        assert!(query.contains(&("uuids", "a,b".to_string())));
        assert!(query.contains(&("subtree_root_id", "root-1".to_string())));
        assert!(query.contains(&("updated_since", "2024-03-01T10:00:00Z".to_string())));
        assert!(query.contains(&("limit", "100".to_string())));
        assert!(query.contains(&("after", "cur".to_string())));
        assert!(query.contains(&("with_contacts", "true".to_string())));
        assert!(query.contains(&("with_offering_items", "true".to_string())));
        assert!(query.contains(&("allow_deleted", "true".to_string())));
    }

    #[test]
    fn decodes_carrier_row() {
        let raw = r#"{
            "items": [{
                "id": "",
                "deleted_at": "null",
                "offering_items": [{"tenant_id": "T1", "name": "storage", "status": 0}]
            }],
            "timestamp": "2024-03-01T10:00:00Z",
            "paging": {"cursors": {"after": ""}}
        }"#;
        let resp: TenantListResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(resp.items.len(), 1);
        let row = &resp.items[0];
        assert!(row.id.is_empty());
        assert!(row.deleted_at.is_none());
        assert_eq!(row.offering_items[0].tenant_id, "T1");
        assert_eq!(resp.after(), None);
        assert!(resp.timestamp.is_some());
    }

    #[test]
    fn decodes_bare_layout_deleted_at() {
        let raw = r#"{"items":[{"id":"T1","deleted_at":"2024-03-01T10:00:00"}]}"#;
        let resp: TenantListResponse = serde_json::from_str(raw).unwrap();
        assert!(resp.items[0].deleted_at.is_some());
    }

    #[test]
    fn self_parented_tenant_is_root() {
        let tenant = Tenant {
            id: "R".into(),
            parent_id: "R".into(),
            ..Default::default()
        };
        assert!(tenant.is_root());
    }
}
