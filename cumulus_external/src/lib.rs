//! External-system surface: the REST client the connector writes through,
//! the adapter implementing the engine's `ExternalSystem` trait over it, and
//! a sample in-memory server exposing the same API.

pub mod adapter;
pub mod client;
pub mod models;
pub mod server;

pub use adapter::RestExternalSystem;
pub use client::{Client, Error};
pub use models::{
    ExternalAccessPolicy, ExternalOfferingItem, ExternalTenant, ExternalUsage, ExternalUser,
};
