//! Synchronization engine mirroring control-plane state into an external
//! system.
//!
//! Four entity kinds flow one way, cloud to external: tenants, offering
//! items, users and access policies. Usage samples flow the other way. The
//! engine runs three loop families over those flows:
//!
//! - incremental sync: pull deltas since a watermark and apply them;
//! - reconciliation: full enumeration plus set-difference deletion, run once
//!   on startup (seeding the watermarks) and periodically after that;
//! - usage push: page external usage samples into the cloud in batches.
//!
//! The external system is reached through the [`ExternalSystem`] trait; the
//! cloud through [`CloudApi`]. Both sides must be idempotent under repeated
//! create-or-update and tolerate deletes of absent records, because the loops
//! run concurrently and re-apply work on every cycle.

pub mod cloud;
pub mod config;
pub mod error;
pub mod external;
pub mod memory;
pub mod reconcile;
pub mod retry;
pub mod supervisor;
pub mod sync;
pub mod upsert;
pub mod usage;

mod test_support;

pub use cloud::CloudApi;
pub use config::{Config, WatermarkPolicy};
pub use error::{Error, Result};
pub use external::{ExternalSystem, OfferingItemKey};
pub use memory::MemoryExternalSystem;
pub use supervisor::Updater;
