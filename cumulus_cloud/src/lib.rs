//! Typed client for the cumulus control-plane API.
//!
//! The control plane serves cursor-paginated composite list endpoints for
//! tenants (with embedded offering items) and users (with embedded access
//! policies), plus a usage-report endpoint. All requests carry an OAuth2
//! client-credentials bearer token acquired from the platform's token
//! endpoint.

pub mod access_policy;
pub mod auth;
pub mod client;
pub mod error;
pub mod offering_item;
pub mod paging;
pub mod tenant;
pub mod time;
pub mod usage;
pub mod user;

pub use access_policy::{AccessPolicy, PolicyResource};
pub use client::Client;
pub use error::{ApiErrorBody, Error, Result};
pub use offering_item::{OfferingItem, Quota};
pub use paging::Pagination;
pub use tenant::{Contact, Tenant, TenantListRequest, TenantListResponse, UpdateLock};
pub use usage::{Usage, UsageAck, UsagePushRequest, UsagePushResponse};
pub use user::{User, UserListRequest, UserListResponse};
