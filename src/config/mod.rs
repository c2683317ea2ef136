// Configuration modules for the Contact Tables backend

pub mod permissions;
pub mod rate_limit;

pub use permissions::PermissionConfig;
pub use rate_limit::{GlobalRateLimitSettings, RateLimitingConfig};
