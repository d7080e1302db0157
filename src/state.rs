use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::env;
use std::time::Duration;

use crate::api::comprobantes::autorizacion_service::SriConfig;

/// Estado compartido de la aplicación: el pool de base de datos y la
/// configuración del servicio de autorización.
#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub sri_config: SriConfig,
}

impl AppState {
    pub async fn new() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL")
            .map_err(|e| anyhow::anyhow!("DATABASE_URL must be set: {}", e))?;

        let max_connections = env::var("DATABASE_MAX_CONNECTIONS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(20);

        let db_pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(10))
            .connect(&database_url)
            .await?;

        Ok(AppState {
            db_pool,
            sri_config: SriConfig::from_env(),
        })
    }
}
