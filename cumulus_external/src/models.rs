//! Records as the external system stores them.
//!
//! Tenants and their children keep the upstream snake_case field names; users
//! and usages use the camelCase names the external system's own API defines.

use chrono::{DateTime, Utc};
use cumulus_cloud::{AccessPolicy, OfferingItem, Tenant, Usage, User};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExternalTenant {
    pub id: String,
    pub parent_id: String,
    pub version: i64,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub name: String,
    pub kind: String,
    pub enabled: bool,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub customer_type: String,
    pub customer_id: String,
    pub brand_uuid: String,
    pub internal_flag: Option<String>,
    pub language: String,
    pub owner_id: String,
    pub has_children: bool,
    pub default_idp_id: Option<String>,
    /// Opaque lock descriptor, stored as JSON.
    pub update_lock: serde_json::Value,
    pub ancestral_access: bool,
    pub mfa_status: String,
    pub pricing_mode: String,
    /// Contact details, stored as JSON blobs.
    pub contact: serde_json::Value,
    pub contacts: serde_json::Value,
}

impl From<&Tenant> for ExternalTenant {
    fn from(tenant: &Tenant) -> Self {
        Self {
            id: tenant.id.clone(),
            parent_id: tenant.parent_id.clone(),
            version: tenant.version,
            created_at: tenant.created_at,
            updated_at: tenant.updated_at,
            name: tenant.name.clone(),
            kind: tenant.kind.clone(),
            enabled: tenant.enabled,
            customer_type: tenant.customer_type.clone(),
            customer_id: tenant.customer_id.clone().unwrap_or_default(),
            brand_uuid: tenant.brand_uuid.clone(),
            internal_flag: tenant.internal_tag.clone(),
            language: tenant.language.clone(),
            owner_id: tenant.owner_id.clone().unwrap_or_default(),
            has_children: tenant.has_children,
            default_idp_id: tenant.default_idp_id.clone(),
            update_lock: serde_json::to_value(&tenant.update_lock)
                .unwrap_or(serde_json::Value::Null),
            ancestral_access: tenant.ancestral_access,
            mfa_status: tenant.mfa_status.clone(),
            pricing_mode: tenant.pricing_mode.clone(),
            contact: serde_json::to_value(&tenant.contact).unwrap_or(serde_json::Value::Null),
            contacts: serde_json::to_value(&tenant.contacts).unwrap_or(serde_json::Value::Null),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExternalOfferingItem {
    pub application_id: String,
    pub name: String,
    pub edition: Option<String>,
    pub usage_name: String,
    pub tenant_id: String,
    pub updated_at: Option<String>,
    pub status: i64,
    pub locked: bool,
    #[serde(rename = "type")]
    pub kind: String,
    pub infra_id: String,
    pub measurement_unit: String,
    pub value: Option<f64>,
    pub overage: Option<f64>,
    pub quota_version: f64,
}

impl From<&OfferingItem> for ExternalOfferingItem {
    fn from(item: &OfferingItem) -> Self {
        Self {
            application_id: item.application_id.clone(),
            name: item.name.clone(),
            edition: item.edition.clone(),
            usage_name: item.usage_name.clone(),
            tenant_id: item.tenant_id.clone(),
            updated_at: item.updated_at.clone(),
            status: item.status,
            locked: item.locked,
            kind: item.kind.clone(),
            infra_id: item.infra_id.clone(),
            measurement_unit: item.measurement_unit.clone(),
            value: item.quota.value,
            overage: item.quota.overage,
            quota_version: item.quota.version,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExternalUser {
    pub id: String,
    pub tenant_id: String,
    pub login: String,
    /// Contact details, stored as a JSON blob.
    pub contact: serde_json::Value,
    #[serde(rename = "isActivated")]
    pub activated: bool,
    #[serde(rename = "isEnabled")]
    pub enabled: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<&User> for ExternalUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            tenant_id: user.tenant_id.clone(),
            login: user.login.clone(),
            contact: serde_json::to_value(&user.contact).unwrap_or(serde_json::Value::Null),
            activated: user.activated,
            enabled: user.enabled,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExternalAccessPolicy {
    pub id: String,
    pub version: i64,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub trustee_id: String,
    pub trustee_type: String,
    pub issuer_id: String,
    pub tenant_id: String,
    pub role_id: String,
}

impl From<&AccessPolicy> for ExternalAccessPolicy {
    fn from(policy: &AccessPolicy) -> Self {
        Self {
            id: policy.id.clone(),
            version: policy.version,
            created_at: policy.created_at,
            updated_at: policy.updated_at,
            trustee_id: policy.trustee_id.clone(),
            trustee_type: policy.trustee_type.clone(),
            issuer_id: policy.issuer_id.clone(),
            tenant_id: policy.tenant_id.clone(),
            role_id: policy.role_id.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExternalUsage {
    pub id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offering_item: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub infra_id: Option<String>,
    pub usage_value: i64,
}

impl From<ExternalUsage> for Usage {
    fn from(usage: ExternalUsage) -> Self {
        Self {
            resource_id: usage.resource_id,
            usage_type: usage.usage_type,
            tenant_id: usage.tenant_id,
            offering_item: usage.offering_item,
            infra_id: usage.infra_id,
            usage_value: usage.usage_value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tenant_mapping_carries_identity_and_blobs() {
        let mut tenant = Tenant {
            id: "T1".into(),
            parent_id: "R".into(),
            version: 4,
            name: "Acme".into(),
            customer_id: Some("ext-9".into()),
            ..Default::default()
        };
        tenant.contact.email = Some("ops@acme.test".into());

        let record = ExternalTenant::from(&tenant);
        assert_eq!(record.id, "T1");
        assert_eq!(record.parent_id, "R");
        assert_eq!(record.version, 4);
        assert_eq!(record.customer_id, "ext-9");
        assert_eq!(record.contact["email"], "ops@acme.test");
    }

    #[test]
    fn usage_mapping_drops_the_row_id() {
        let usage = ExternalUsage {
            id: 7,
            tenant_id: Some("T1".into()),
            offering_item: Some("storage".into()),
            usage_value: 42,
            ..Default::default()
        };
        let mapped: Usage = usage.into();
        assert_eq!(mapped.tenant_id.as_deref(), Some("T1"));
        assert_eq!(mapped.usage_value, 42);
        let raw = serde_json::to_string(&mapped).unwrap();
        assert!(!raw.contains("\"id\""));
    }

    #[test]
    fn user_serializes_with_external_field_names() {
        let user = ExternalUser {
            id: "U1".into(),
            tenant_id: "T1".into(),
            activated: true,
            ..Default::default()
        };
        let raw = serde_json::to_string(&user).unwrap();
        assert!(raw.contains("\"tenantId\""));
        assert!(raw.contains("\"isActivated\""));
    }
}
