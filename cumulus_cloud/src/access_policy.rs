//! Access policies: role bindings between a trustee (user) and a tenant.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccessPolicy {
    pub id: String,
    pub version: i64,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,

    /// Set when the policy has been revoked.
    pub deleted_at: Option<DateTime<Utc>>,

    /// The user this policy is granted to.
    pub trustee_id: String,
    pub trustee_type: String,
    pub issuer_id: String,
    pub tenant_id: String,

    /// Role name, e.g. `partner_admin`, `backup_user`.
    pub role_id: String,

    pub resource: Option<PolicyResource>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyResource {
    pub resource_id: String,
    pub resource_server_id: String,
    pub scope_type: String,
}
