//! Offering items: tenant-scoped feature/quota records.

use serde::{Deserialize, Serialize};

/// Identified by `(tenant_id, name)`. `status` is 1 when the item is turned
/// on and 0 when it is turned off.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OfferingItem {
    pub application_id: String,
    pub name: String,
    pub edition: Option<String>,
    pub usage_name: String,
    pub tenant_id: String,
    pub updated_at: Option<String>,
    pub status: i64,
    pub locked: bool,
    pub quota: Quota,
    #[serde(rename = "type")]
    pub kind: String,
    pub infra_id: String,
    /// Measurement unit usages are kept in (e.g. `bytes`, `quantity`).
    pub measurement_unit: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Quota {
    pub value: Option<f64>,
    pub overage: Option<f64>,
    pub version: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_with_type_field() {
        let raw = r#"{
            "tenant_id": "T1",
            "name": "storage",
            "status": 1,
            "type": "infra",
            "quota": {"value": 10.0, "version": 2.0}
        }"#;
        let item: OfferingItem = serde_json::from_str(raw).unwrap();
        assert_eq!(item.kind, "infra");
        assert_eq!(item.quota.value, Some(10.0));
        assert_eq!(item.status, 1);
    }
}
