//! Supervisor: one startup reconciliation pass, then five concurrent loops.

use crate::cloud::CloudApi;
use crate::config::Config;
use crate::external::ExternalSystem;
use crate::reconcile::ReconcileLoop;
use crate::sync::SyncLoop;
use crate::usage::UsageLoop;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Owns the three loop families and starts them as independent tasks.
///
/// No state is shared between loops beyond the `Arc`ed collaborators; each
/// loop owns its watermark and buffers, so their interleaving needs no
/// locking.
pub struct Updater {
    sync: Arc<SyncLoop>,
    reconcile: Arc<ReconcileLoop>,
    usage: Arc<UsageLoop>,
}

impl Updater {
    pub fn new(
        config: &Config,
        cloud: Arc<dyn CloudApi>,
        external: Arc<dyn ExternalSystem>,
        subtree_root_id: impl Into<String>,
    ) -> Self {
        let subtree_root_id = subtree_root_id.into();
        let sync = Arc::new(SyncLoop::new(
            cloud.clone(),
            external.clone(),
            subtree_root_id.clone(),
            Duration::from_secs(config.update_interval),
            config.watermark_policy,
        ));
        let reconcile = Arc::new(ReconcileLoop::new(
            cloud.clone(),
            external.clone(),
            subtree_root_id,
            Duration::from_secs(config.reconciliation_interval),
        ));
        let usage = Arc::new(UsageLoop::new(
            cloud,
            external,
            Duration::from_secs(config.usage_report_interval),
        ));
        Self {
            sync,
            reconcile,
            usage,
        }
    }

    /// Reconcile both composite views once to seed the incremental
    /// watermarks, then spawn the five long-running tasks. The tasks run
    /// until `cancel` fires; there is no further shutdown protocol.
    pub async fn start(&self, cancel: CancellationToken) -> Vec<JoinHandle<()>> {
        let tenants_watermark = self.reconcile.reconcile_tenants(&cancel).await;
        let users_watermark = self.reconcile.reconcile_users(&cancel).await;

        vec![
            tokio::spawn(
                self.sync
                    .clone()
                    .run_tenants(tenants_watermark, cancel.clone()),
            ),
            tokio::spawn(self.sync.clone().run_users(users_watermark, cancel.clone())),
            tokio::spawn(self.reconcile.clone().run_tenants(cancel.clone())),
            tokio::spawn(self.reconcile.clone().run_users(cancel.clone())),
            tokio::spawn(self.usage.clone().run(cancel)),
        ]
    }
}
