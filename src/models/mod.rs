pub mod auth;
pub mod contact_message;
pub mod contact_table;
pub mod contract;
pub mod password_reset;
pub mod payment;
pub mod refresh_token;
pub mod restaurant;
pub mod restaurant_image;
pub mod user;

// Re-export common types
pub use auth::{AccessTokenClaims, RefreshTokenClaims};
pub use contact_message::{ContactMessage, MessageStatus, NewContactMessage};
pub use contact_table::{
    ContactTable, ContactTableError, ContactTableUpdate, NewContactTable, NewTableParticipant,
    ParticipantStatus, TableParticipant,
};
pub use contract::{Contract, ContractState, NewContract, CURRENT_TERMS_VERSION};
pub use password_reset::{
    ForgotPasswordRequest, ForgotPasswordResponse, NewPasswordResetToken, PasswordResetToken,
    ResetPasswordRequest, ResetPasswordResponse,
};
pub use payment::{NewPayment, Payment, PaymentStatus};
pub use refresh_token::{DeviceInfo, RefreshToken, RefreshTokenError};
pub use restaurant::{
    ContractStatus, NewRestaurant, Plan, Restaurant, RestaurantError, RestaurantUpdate,
};
pub use restaurant_image::{NewRestaurantImage, RestaurantImage};
pub use user::{NewUser, Role, User, UserError, UserUpdate};
