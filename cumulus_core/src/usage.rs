//! Usage push: report external-system usage samples to the cloud.

use crate::cloud::CloudApi;
use crate::external::{ExternalSystem, EXTERNAL_PAGE_SIZE};
use cumulus_cloud::UsagePushRequest;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub struct UsageLoop {
    cloud: Arc<dyn CloudApi>,
    external: Arc<dyn ExternalSystem>,
    interval: Duration,
}

impl UsageLoop {
    pub fn new(
        cloud: Arc<dyn CloudApi>,
        external: Arc<dyn ExternalSystem>,
        interval: Duration,
    ) -> Self {
        Self {
            cloud,
            external,
            interval,
        }
    }

    /// Push usage reports forever, one pass per `interval`.
    #[tracing::instrument(name = "usage_report", skip_all)]
    pub async fn run(self: Arc<Self>, cancel: CancellationToken) {
        loop {
            self.tick().await;
            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = tokio::time::sleep(self.interval) => {}
            }
        }
    }

    /// One pass: page usages out of the external system and submit each page
    /// as a single batch. A read failure ends the pass; a failed batch is
    /// skipped without retrying (the next pass re-reads everything).
    pub(crate) async fn tick(&self) {
        let mut offset = 0;
        loop {
            let page = match self.external.get_usages(offset, EXTERNAL_PAGE_SIZE).await {
                Ok(page) => page,
                Err(err) => {
                    tracing::warn!(error = %err, "failed to get external usages");
                    break;
                }
            };

            if page.is_empty() {
                tracing::info!("no usages to push");
                break;
            }

            let count = page.len();
            tracing::info!(count, "pushing usages");
            match self.cloud.put_usages(&UsagePushRequest { items: page }).await {
                Ok(response) => {
                    tracing::info!(acknowledged = response.items.len(), "pushed usages");
                }
                Err(err) => {
                    tracing::warn!(error = %err, "failed to push usages");
                }
            }

            if count < EXTERNAL_PAGE_SIZE {
                break;
            }
            offset += EXTERNAL_PAGE_SIZE;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FakeCloud;
    use crate::MemoryExternalSystem;
    use cumulus_cloud::Usage;

    fn sample(n: usize) -> Vec<Usage> {
        (0..n)
            .map(|i| Usage {
                tenant_id: Some(format!("T{i}")),
                offering_item: Some("storage".into()),
                usage_value: i as i64,
                ..Default::default()
            })
            .collect()
    }

    fn usage_loop(cloud: Arc<FakeCloud>, external: Arc<MemoryExternalSystem>) -> UsageLoop {
        UsageLoop::new(cloud, external, Duration::from_secs(60))
    }

    #[tokio::test]
    async fn pushes_each_page_as_one_batch() {
        let cloud = Arc::new(FakeCloud::default());
        let external = Arc::new(MemoryExternalSystem::new());
        external.set_usages(sample(150)).await;

        usage_loop(cloud.clone(), external).tick().await;

        let batches = cloud.pushed_usages.lock().unwrap();
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].len(), 100);
        assert_eq!(batches[1].len(), 50);
    }

    #[tokio::test]
    async fn empty_page_ends_the_pass() {
        let cloud = Arc::new(FakeCloud::default());
        let external = Arc::new(MemoryExternalSystem::new());

        usage_loop(cloud.clone(), external.clone()).tick().await;

        assert!(cloud.pushed_usages.lock().unwrap().is_empty());
        assert_eq!(external.ops().await, vec!["get_usages 0"]);
    }

    #[tokio::test]
    async fn failed_batch_is_skipped_not_retried() {
        let cloud = Arc::new(FakeCloud::default());
        cloud.fail_next_usage_push();
        let external = Arc::new(MemoryExternalSystem::new());
        external.set_usages(sample(150)).await;

        usage_loop(cloud.clone(), external).tick().await;

        // First batch failed and was dropped; only the second arrived.
        let batches = cloud.pushed_usages.lock().unwrap();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].len(), 50);
    }

    #[tokio::test]
    async fn read_failure_ends_the_pass() {
        let cloud = Arc::new(FakeCloud::default());
        let external = Arc::new(MemoryExternalSystem::new());
        external.fail_operation("get_usages").await;

        usage_loop(cloud.clone(), external).tick().await;

        assert!(cloud.pushed_usages.lock().unwrap().is_empty());
    }
}
