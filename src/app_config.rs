// Centralized configuration for the Contact Tables backend
// All environment variables are loaded ONCE at startup into a Lazy static

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(String),
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

/// Global application configuration loaded once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(|| {
    // For tests, load .env file first
    #[cfg(test)]
    dotenv::dotenv().ok();

    AppConfig::from_env().expect("Failed to load configuration")
});

/// Accessor so call sites don't have to deref the Lazy directly
pub fn config() -> &'static AppConfig {
    &CONFIG
}

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub jwt: JwtConfig,
    pub security: SecurityConfig,
    pub email: EmailConfig,
    pub storage: StorageConfig,
    pub features: FeatureConfig,

    // Frontend base URL used in email links (verification, password reset)
    pub frontend_url: String,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub environment: Environment,
    pub rust_log: String,
}

/// Environment type
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Environment {
    Development,
    Test,
    Staging,
    Production,
}

impl From<String> for Environment {
    fn from(s: String) -> Self {
        match s.to_lowercase().as_str() {
            "development" | "dev" => Environment::Development,
            "test" => Environment::Test,
            "staging" | "stage" => Environment::Staging,
            "production" | "prod" => Environment::Production,
            _ => Environment::Development,
        }
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Staging => write!(f, "staging"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout: u64,
    pub idle_timeout: u64,
    pub max_lifetime: u64,
}

/// Redis configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    pub url: String,
    pub pool_size: u32,
    pub connection_timeout: u64,
    pub command_timeout: u64,
    pub retry_attempts: u32,
    pub retry_delay_ms: u64,
}

/// JWT configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    pub access_secret: String,
    pub refresh_secret: String,
    pub access_expiry: u64,
    pub refresh_expiry: u64,
    pub audience: String,
    pub issuer: String,
    pub key_version: u32,
}

/// Security configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub cors_allowed_origins: Vec<String>,
    pub jti_hash_salt: Option<String>,

    // Login hardening
    pub login_rate_limit_per_ip: u32, // Max login attempts per IP per minute
    pub login_rate_limit_per_email: u32, // Max login attempts per email per hour
    pub login_lockout_threshold: u32, // Failed attempts before lockout
    pub login_lockout_duration_seconds: u32, // Account lockout duration
    pub remember_me_duration_days: u32, // Extended refresh token duration
    pub failed_login_expiry_seconds: usize, // Failed login tracking expiry for email
    pub failed_login_ip_expiry_seconds: usize, // Failed login tracking expiry for IP
    pub require_email_verification: bool,

    // Refresh endpoint rate limiting
    pub refresh_rate_limit_max_requests: u32,
    pub refresh_rate_limit_window_seconds: u32,
    pub refresh_rate_limit_block_duration: u32,

    // Contact form rate limiting
    pub contact_rate_limit_per_ip: u32, // Messages per IP per hour

    // Email verification codes
    pub verification_code_ttl: u64,
    pub verification_max_attempts: u32,
    pub verification_resend_limit: u32,
    pub verification_resend_window: u64,
    pub verification_resend_cooldown: u64,
}

/// Email configuration (Resend HTTP API)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    pub api_key: String,
    pub api_url: String,
    pub from_email: String,
    pub from_name: String,
    pub support_email: String,
    pub send_emails: bool, // false in dev/test: log instead of calling the API
}

/// Uploaded image storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub root_dir: String,        // Local directory for uploaded files
    pub public_base_url: String, // URL prefix the files are served under
    pub max_upload_bytes: u64,
}

/// Feature flags
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureConfig {
    pub enable_rate_limiting: bool,
    pub enable_swagger_ui: bool,
    pub disable_embedded_migrations: bool,
}

impl AppConfig {
    pub fn is_production(&self) -> bool {
        self.server.environment == Environment::Production
    }

    /// Rate limit settings for the refresh endpoint, shared across handlers
    pub fn refresh_rate_limit_config(&self) -> crate::services::rate_limit::RateLimitConfig {
        crate::services::rate_limit::RateLimitConfig {
            max_requests: self.security.refresh_rate_limit_max_requests,
            window_seconds: self.security.refresh_rate_limit_window_seconds,
            burst_limit: None,
            block_duration: self.security.refresh_rate_limit_block_duration,
            distributed: true,
        }
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let get_required = |key: &str| -> Result<String, ConfigError> {
            env::var(key).map_err(|_| ConfigError::MissingVar(key.to_string()))
        };

        let get_or_default = |key: &str, default: &str| -> String {
            env::var(key).unwrap_or_else(|_| default.to_string())
        };

        let parse_or_default = |key: &str, default: &str| -> Result<u32, ConfigError> {
            get_or_default(key, default).parse().map_err(|_| {
                ConfigError::InvalidValue(key.to_string(), "not a valid u32".to_string())
            })
        };

        let parse_u64_or_default = |key: &str, default: &str| -> Result<u64, ConfigError> {
            get_or_default(key, default).parse().map_err(|_| {
                ConfigError::InvalidValue(key.to_string(), "not a valid u64".to_string())
            })
        };

        let parse_bool_or_default = |key: &str, default: &str| -> bool {
            get_or_default(key, default).to_lowercase() == "true"
        };

        let bind_address = get_or_default("BIND_ADDRESS", "0.0.0.0:8080");
        let port = bind_address
            .rsplit(':')
            .next()
            .and_then(|p| p.parse().ok())
            .unwrap_or(8080);

        let environment = Environment::from(get_or_default("ENVIRONMENT", "development"));

        let jwt_access_secret = get_required("JWT_ACCESS_SECRET")?;
        if jwt_access_secret.len() < 32 {
            return Err(ConfigError::InvalidValue(
                "JWT_ACCESS_SECRET".to_string(),
                "Secret must be at least 32 characters long".to_string(),
            ));
        }

        let jwt_refresh_secret = get_required("JWT_REFRESH_SECRET")?;
        if jwt_refresh_secret.len() < 32 {
            return Err(ConfigError::InvalidValue(
                "JWT_REFRESH_SECRET".to_string(),
                "Secret must be at least 32 characters long".to_string(),
            ));
        }

        let jti_hash_salt = env::var("JTI_HASH_SALT").ok();
        if environment == Environment::Production {
            match jti_hash_salt {
                Some(ref salt) if salt.len() < 32 => {
                    return Err(ConfigError::InvalidValue(
                        "JTI_HASH_SALT".to_string(),
                        format!(
                            "Salt must be at least 32 bytes in production (current: {} bytes)",
                            salt.len()
                        ),
                    ));
                },
                None => return Err(ConfigError::MissingVar("JTI_HASH_SALT".to_string())),
                _ => {},
            }
        }

        let server = ServerConfig {
            bind_address: bind_address.clone(),
            port,
            environment: environment.clone(),
            rust_log: get_or_default("RUST_LOG", "info"),
        };

        let database = DatabaseConfig {
            url: get_required("DATABASE_URL")?,
            max_connections: parse_or_default("DATABASE_MAX_CONNECTIONS", "50")?,
            min_connections: parse_or_default("DATABASE_MIN_CONNECTIONS", "5")?,
            connect_timeout: parse_u64_or_default("DATABASE_CONNECT_TIMEOUT", "30")?,
            idle_timeout: parse_u64_or_default("DATABASE_IDLE_TIMEOUT", "600")?,
            max_lifetime: parse_u64_or_default("DATABASE_MAX_LIFETIME", "1800")?,
        };

        let redis = RedisConfig {
            url: get_or_default("REDIS_URL", "redis://localhost:6379"),
            pool_size: parse_or_default("REDIS_POOL_SIZE", "16")?,
            connection_timeout: parse_u64_or_default("REDIS_CONNECTION_TIMEOUT", "5")?,
            command_timeout: parse_u64_or_default("REDIS_COMMAND_TIMEOUT", "5")?,
            retry_attempts: parse_or_default("REDIS_RETRY_ATTEMPTS", "3")?,
            retry_delay_ms: parse_u64_or_default("REDIS_RETRY_DELAY_MS", "100")?,
        };

        let jwt = JwtConfig {
            access_secret: jwt_access_secret,
            refresh_secret: jwt_refresh_secret,
            access_expiry: parse_u64_or_default("JWT_ACCESS_EXPIRY", "3600")?,
            refresh_expiry: parse_u64_or_default("JWT_REFRESH_EXPIRY", "604800")?,
            audience: get_or_default("JWT_AUDIENCE", "contact-tables.app"),
            issuer: get_or_default("JWT_ISSUER", "contact-tables.app"),
            key_version: parse_or_default("JWT_KEY_VERSION", "1")?,
        };

        let security = SecurityConfig {
            cors_allowed_origins: get_or_default("CORS_ALLOWED_ORIGINS", "*")
                .split(',')
                .map(|s| s.trim().to_string())
                .collect(),
            jti_hash_salt,
            login_rate_limit_per_ip: parse_or_default("LOGIN_RATE_LIMIT_PER_IP", "5")?,
            login_rate_limit_per_email: parse_or_default("LOGIN_RATE_LIMIT_PER_EMAIL", "10")?,
            login_lockout_threshold: parse_or_default("LOGIN_LOCKOUT_THRESHOLD", "5")?,
            login_lockout_duration_seconds: parse_or_default(
                "LOGIN_LOCKOUT_DURATION_SECONDS",
                "1800",
            )?,
            remember_me_duration_days: parse_or_default("REMEMBER_ME_DURATION_DAYS", "30")?,
            failed_login_expiry_seconds: parse_or_default("FAILED_LOGIN_EXPIRY_SECONDS", "3600")?
                as usize,
            failed_login_ip_expiry_seconds: parse_or_default(
                "FAILED_LOGIN_IP_EXPIRY_SECONDS",
                "300",
            )? as usize,
            require_email_verification: parse_bool_or_default("REQUIRE_EMAIL_VERIFICATION", "true"),
            refresh_rate_limit_max_requests: parse_or_default(
                "REFRESH_RATE_LIMIT_MAX_REQUESTS",
                "10",
            )?,
            refresh_rate_limit_window_seconds: parse_or_default(
                "REFRESH_RATE_LIMIT_WINDOW_SECONDS",
                "60",
            )?,
            refresh_rate_limit_block_duration: parse_or_default(
                "REFRESH_RATE_LIMIT_BLOCK_DURATION",
                "300",
            )?,
            contact_rate_limit_per_ip: parse_or_default("CONTACT_RATE_LIMIT_PER_IP", "5")?,
            verification_code_ttl: parse_u64_or_default("VERIFICATION_CODE_TTL", "1800")?,
            verification_max_attempts: parse_or_default("VERIFICATION_MAX_ATTEMPTS", "5")?,
            verification_resend_limit: parse_or_default("VERIFICATION_RESEND_LIMIT", "5")?,
            verification_resend_window: parse_u64_or_default(
                "VERIFICATION_RESEND_WINDOW",
                "86400",
            )?,
            verification_resend_cooldown: parse_u64_or_default(
                "VERIFICATION_RESEND_COOLDOWN",
                "60",
            )?,
        };

        let email = EmailConfig {
            api_key: get_or_default("RESEND_API_KEY", ""),
            api_url: get_or_default("RESEND_API_URL", "https://api.resend.com/emails"),
            from_email: get_or_default("EMAIL_FROM", "no-reply@contact-tables.app"),
            from_name: get_or_default("EMAIL_FROM_NAME", "Contact Tables"),
            support_email: get_or_default("SUPPORT_EMAIL", "support@contact-tables.app"),
            send_emails: parse_bool_or_default(
                "SEND_EMAILS",
                if environment == Environment::Production {
                    "true"
                } else {
                    "false"
                },
            ),
        };

        let storage = StorageConfig {
            root_dir: get_or_default("UPLOAD_ROOT_DIR", "./uploads"),
            public_base_url: get_or_default("UPLOAD_PUBLIC_BASE_URL", "/uploads"),
            max_upload_bytes: parse_u64_or_default("UPLOAD_MAX_BYTES", "5242880")?,
        };

        let features = FeatureConfig {
            enable_rate_limiting: parse_bool_or_default("ENABLE_RATE_LIMITING", "true"),
            enable_swagger_ui: parse_bool_or_default("ENABLE_SWAGGER_UI", "false"),
            disable_embedded_migrations: parse_bool_or_default(
                "DISABLE_EMBEDDED_MIGRATIONS",
                "false",
            ),
        };

        Ok(AppConfig {
            server,
            database,
            redis,
            jwt,
            security,
            email,
            storage,
            features,
            frontend_url: get_or_default("FRONTEND_URL", "http://localhost:3000"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_parsing() {
        assert_eq!(
            Environment::from("production".to_string()),
            Environment::Production
        );
        assert_eq!(Environment::from("prod".to_string()), Environment::Production);
        assert_eq!(Environment::from("test".to_string()), Environment::Test);
        assert_eq!(
            Environment::from("anything-else".to_string()),
            Environment::Development
        );
    }

    #[test]
    fn test_environment_display() {
        assert_eq!(Environment::Production.to_string(), "production");
        assert_eq!(Environment::Development.to_string(), "development");
    }
}
