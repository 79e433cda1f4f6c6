//! Usage reporting: per-resource or per-tenant samples pushed to the cloud.

use crate::error::ApiErrorBody;
use serde::{Deserialize, Serialize};

/// A single usage sample. Per-resource samples carry `resource_id` +
/// `usage_type`; per-tenant samples carry `tenant_id` + `offering_item`
/// (+ `infra_id` for infra offering items).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Usage {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub resource_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub usage_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub tenant_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub offering_item: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub infra_id: Option<String>,
    pub usage_value: i64,
}

/// Body of `PUT /api/2/tenants/usages`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct UsagePushRequest {
    pub items: Vec<Usage>,
}

/// Per-item acknowledgement returned by the usage endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct UsageAck {
    pub resource_id: Option<String>,
    pub usage_type: Option<String>,
    pub tenant_id: Option<String>,
    pub offering_item: Option<String>,
    pub infra_id: Option<String>,
    pub error: Option<ApiErrorBody>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct UsagePushResponse {
    pub items: Vec<UsageAck>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_only_set_identity_fields() {
        let usage = Usage {
            tenant_id: Some("T1".into()),
            offering_item: Some("storage".into()),
            usage_value: 42,
            ..Default::default()
        };
        let raw = serde_json::to_string(&usage).unwrap();
        assert!(raw.contains("tenant_id"));
        assert!(!raw.contains("resource_id"));
        assert!(raw.contains("\"usage_value\":42"));
    }
}
