// Services module - business logic layer

pub mod contact_table;
pub mod contract;
pub mod email;
pub mod jwt;
pub mod password_reset;
pub mod plans;
pub mod rate_limit;
pub mod restaurant;
pub mod slug;
pub mod storage;
pub mod verification;

// Re-export commonly used services
pub use contact_table::ContactTableService;
pub use contract::ContractService;
pub use email::{EmailError, EmailService};
pub use jwt::{JwtConfig, JwtError, JwtService};
pub use password_reset::{PasswordResetService, PasswordResetTokenInfo};
pub use plans::PlanDefinition;
pub use rate_limit::{RateLimitConfig, RateLimitError, RateLimitResult, RateLimitService};
pub use restaurant::RestaurantService;
pub use storage::StorageService;
pub use verification::{VerificationError, VerificationService};
