// Migration orchestration. Migrations are embedded in the binary so
// distroless containers can run them at startup.

pub mod diesel;

use crate::db::DieselPool;
use std::error::Error;
use tracing::{error, info};

#[derive(Debug, Clone)]
pub struct MigrationConfig {
    pub skip_diesel: bool,
    pub environment: String,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        let config = crate::app_config::config();

        Self {
            skip_diesel: false,
            environment: config.server.environment.to_string(),
        }
    }
}

/// Run all pending migrations
pub async fn run_all_migrations(
    diesel_pool: &DieselPool,
    config: MigrationConfig,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    info!(
        "[MIGRATIONS] Starting migration process for environment: {}",
        config.environment
    );

    if config.skip_diesel {
        info!("[MIGRATIONS] Skipping Diesel migrations (disabled in config)");
        return Ok(());
    }

    match diesel::run_migrations(diesel_pool).await {
        Ok(applied) => {
            if applied > 0 {
                info!("[MIGRATIONS] Applied {} Diesel migrations", applied);
            } else {
                info!("[MIGRATIONS] Diesel migrations up to date");
            }
            Ok(())
        },
        Err(e) => {
            error!("[MIGRATIONS] Diesel migration failed: {}", e);
            Err(format!("Diesel migration failed: {}", e).into())
        },
    }
}

/// Whether startup should run migrations
pub fn should_run_migrations() -> bool {
    !crate::app_config::config().features.disable_embedded_migrations
}
