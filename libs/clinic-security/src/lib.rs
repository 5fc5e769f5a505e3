#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
pub mod access_scope;
pub mod context;
pub mod error;
pub mod ip_hash;
pub mod permission;
pub mod rate_limit;
pub mod role;

pub use access_scope::AccessScope;
pub use context::{Actor, SecurityContext, SecurityContextBuilder};
pub use error::SecurityError;
pub use ip_hash::{client_ip_hash, hash_value, mask_ip};
pub use permission::Permission;
pub use rate_limit::SlidingWindowLimiter;
pub use role::Role;
