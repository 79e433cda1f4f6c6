//! Upsert helpers that repair missing ancestry before writing.
//!
//! A tenant may only be created externally once its whole ancestor path
//! exists there; a user only once its tenant does. Missing ancestors are
//! fetched from the cloud and created root-first.

use crate::cloud::CloudApi;
use crate::external::ExternalSystem;
use crate::{Error, Result};
use cumulus_cloud::{Tenant, User};

/// Ancestors fetched per upsert before the chain is considered malformed
/// (a forest whose climb never reaches a root or a known tenant).
const MAX_ANCESTRY_DEPTH: usize = 64;

/// Ensure `tenant`'s ancestors exist externally, then create-or-update the
/// tenant itself.
///
/// The climb asks the external system about each parent in turn and fetches
/// missing ones from the cloud; the descend then creates the collected chain
/// starting at the topmost ancestor. Self-parented tenants are roots and skip
/// the climb entirely.
pub async fn upsert_tenant(
    cloud: &dyn CloudApi,
    external: &dyn ExternalSystem,
    tenant: &Tenant,
) -> Result<()> {
    let mut missing: Vec<Tenant> = Vec::new();
    let mut child_id = tenant.id.clone();
    let mut parent_id = tenant.parent_id.clone();

    while parent_id != child_id {
        if external.tenant_exists(&parent_id).await? {
            break;
        }
        if missing.len() >= MAX_ANCESTRY_DEPTH {
            return Err(Error::InvalidInput(format!(
                "tenant ancestry for {} exceeds {MAX_ANCESTRY_DEPTH} levels without reaching a root",
                tenant.id
            )));
        }

        let response = cloud
            .get_tenants_by_uuids(std::slice::from_ref(&parent_id))
            .await?;
        let parent = response
            .items
            .into_iter()
            .next()
            .ok_or_else(|| Error::InvalidInput(format!("empty tenant response for {parent_id}")))?;

        child_id = parent.id.clone();
        parent_id = parent.parent_id.clone();
        missing.push(parent);
    }

    for ancestor in missing.iter().rev() {
        let created = external.create_or_update_tenant(ancestor).await?;
        tracing::debug!(tenant_id = %ancestor.id, created, "parent tenant upserted");
    }

    let created = external.create_or_update_tenant(tenant).await?;
    tracing::debug!(tenant_id = %tenant.id, created, "tenant upserted");
    Ok(())
}

/// Ensure `user`'s tenant exists externally (creating its ancestry if
/// needed), then create-or-update the user.
pub async fn upsert_user(
    cloud: &dyn CloudApi,
    external: &dyn ExternalSystem,
    user: &User,
) -> Result<()> {
    if !external.tenant_exists(&user.tenant_id).await? {
        let response = cloud
            .get_tenants_by_uuids(std::slice::from_ref(&user.tenant_id))
            .await?;
        let tenant = response.items.into_iter().next().ok_or_else(|| {
            Error::InvalidInput(format!("empty tenant response for {}", user.tenant_id))
        })?;
        upsert_tenant(cloud, external, &tenant).await?;
    }

    let created = external.create_or_update_user(user).await?;
    tracing::debug!(user_id = %user.id, created, "user upserted");
    Ok(())
}
