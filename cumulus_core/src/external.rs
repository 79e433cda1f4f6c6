//! External-system seam: the capability bundle the engine writes through,
//! and the offset/limit page walker used by reconciliation.

use crate::Result;
use async_trait::async_trait;
use cumulus_cloud::{AccessPolicy, OfferingItem, Tenant, Usage, User};
use std::fmt;
use std::future::Future;

/// Items requested per page from the external system.
pub const EXTERNAL_PAGE_SIZE: usize = 100;

/// Composite identity of an offering item on the external side.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OfferingItemKey {
    pub tenant_id: String,
    pub name: String,
}

impl OfferingItemKey {
    pub fn of(item: &OfferingItem) -> Self {
        Self {
            tenant_id: item.tenant_id.clone(),
            name: item.name.clone(),
        }
    }
}

impl fmt::Display for OfferingItemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.tenant_id, self.name)
    }
}

/// Everything the engine needs from the downstream system.
///
/// Writes must be idempotent: create-or-update of the same record twice and
/// delete of an absent id are both fine, because the incremental and
/// reconciliation loops run concurrently and re-apply work on every cycle.
/// An implementation can also be an in-memory fake for tests
/// ([`crate::MemoryExternalSystem`]).
#[async_trait]
pub trait ExternalSystem: Send + Sync {
    /// Returns `true` when a new record was created (as opposed to updated).
    async fn create_or_update_tenant(&self, tenant: &Tenant) -> Result<bool>;

    async fn delete_tenant(&self, tenant_id: &str) -> Result<()>;

    /// Page of tenant ids currently present, for reconciliation.
    async fn get_active_tenant_ids(&self, offset: usize, limit: usize) -> Result<Vec<String>>;

    /// Existence check backing the parent-before-child guarantee.
    async fn tenant_exists(&self, tenant_id: &str) -> Result<bool>;

    async fn create_or_update_offering_item(&self, item: &OfferingItem) -> Result<bool>;

    async fn delete_offering_item(&self, key: &OfferingItemKey) -> Result<()>;

    async fn get_active_offering_item_ids(
        &self,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<OfferingItemKey>>;

    async fn create_or_update_user(&self, user: &User) -> Result<bool>;

    async fn delete_user(&self, user_id: &str) -> Result<()>;

    async fn get_active_user_ids(&self, offset: usize, limit: usize) -> Result<Vec<String>>;

    async fn create_or_update_access_policy(&self, policy: &AccessPolicy) -> Result<bool>;

    async fn delete_access_policy(&self, policy_id: &str) -> Result<()>;

    async fn get_active_access_policy_ids(
        &self,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<String>>;

    /// Usage samples to report upstream, in pages.
    async fn get_usages(&self, offset: usize, limit: usize) -> Result<Vec<Usage>>;
}

/// Walk an offset/limit listing until a short page, accumulating every item.
///
/// A failure mid-walk aborts the whole walk; the caller retries on its own
/// cadence.
pub async fn walk_pages<T, F, Fut>(mut fetch_page: F) -> Result<Vec<T>>
where
    F: FnMut(usize, usize) -> Fut,
    Fut: Future<Output = Result<Vec<T>>>,
{
    let mut items = Vec::new();
    let mut offset = 0;
    loop {
        let page = fetch_page(offset, EXTERNAL_PAGE_SIZE).await?;
        let short = page.len() < EXTERNAL_PAGE_SIZE;
        items.extend(page);
        if short {
            return Ok(items);
        }
        offset += EXTERNAL_PAGE_SIZE;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn stops_on_short_page() {
        let calls = AtomicUsize::new(0);
        let ids = walk_pages(|offset, limit| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move {
                let end = (offset + limit).min(150);
                Ok((offset..end).collect::<Vec<_>>())
            }
        })
        .await
        .unwrap();

        assert_eq!(ids.len(), 150);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn empty_first_page_yields_empty_set() {
        let ids: Vec<String> = walk_pages(|_, _| async { Ok(Vec::new()) }).await.unwrap();
        assert!(ids.is_empty());
    }

    #[tokio::test]
    async fn mid_walk_failure_aborts() {
        let calls = AtomicUsize::new(0);
        let result: crate::Result<Vec<usize>> = walk_pages(|offset, limit| {
            let call = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if call == 0 {
                    Ok((offset..offset + limit).collect())
                } else {
                    Err(Error::InvalidInput("boom".into()))
                }
            }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
