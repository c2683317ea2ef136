// Middleware modules

pub mod auth;
pub mod auth_middleware;
pub mod cors;

pub use auth::AuthenticatedUser;
pub use auth_middleware::{auth_middleware, require_admin, require_restaurant_owner};
pub use cors::dynamic_cors_middleware;
