use core_config::{app_info, env_parse_or, server::ServerConfig, AppInfo, ConfigError, FromEnv};
use database::postgres::PostgresConfig;
use domain_inventory::InventoryConfig;

// Re-export Environment for use in other modules
pub use core_config::Environment;

/// Application-specific configuration
/// Composes shared config components from the `core_config` and `database`
/// libraries plus the inventory engine's own knobs.
#[derive(Clone, Debug)]
pub struct Config {
    pub app: AppInfo,
    pub database: PostgresConfig,
    pub server: ServerConfig,
    pub inventory: InventoryConfig,
    pub environment: Environment,
}

impl Config {
    pub fn from_env() -> eyre::Result<Self> {
        let environment = Environment::from_env();
        let database = PostgresConfig::from_env()?; // Required - will fail if DATABASE_URL is not set
        let server = ServerConfig::from_env()?; // Uses defaults: HOST=0.0.0.0, PORT=8080
        let inventory = inventory_config_from_env()?;

        Ok(Self {
            app: app_info!(),
            database,
            server,
            inventory,
            environment,
        })
    }
}

fn inventory_config_from_env() -> Result<InventoryConfig, ConfigError> {
    let defaults = InventoryConfig::default();
    Ok(InventoryConfig {
        products_per_page: env_parse_or("PRODUCTS_PER_PAGE", defaults.products_per_page)?,
        logs_per_page: env_parse_or("LOGS_PER_PAGE", defaults.logs_per_page)?,
        max_per_page: env_parse_or("MAX_PER_PAGE", defaults.max_per_page)?,
        default_low_stock_threshold: env_parse_or(
            "LOW_STOCK_THRESHOLD",
            defaults.default_low_stock_threshold,
        )?,
        export_limit: env_parse_or("EXPORT_LIMIT", defaults.export_limit)?,
    })
}
