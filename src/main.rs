//! Coffee POS gateway
//!
//! ```text
//! cargo run -- --env dev --port 8080
//! ```
//!
//! Uses PostgreSQL when `postgres_url` (or `POSTGRES_URL`) is set, otherwise
//! the in-memory store seeded from `seed_file`.

use std::sync::Arc;

use anyhow::Context;
use coffee_pos::config::AppConfig;
use coffee_pos::db::Database;
use coffee_pos::gateway::{self, AppState};
use coffee_pos::inventory::{InventoryRepository, InventorySeed, MemoryInventory, PgInventory};

/// Value following the first of `names` on the command line
fn flag_value<'a>(args: &'a [String], names: &[&str]) -> Option<&'a str> {
    args.windows(2)
        .find(|pair| names.contains(&pair[0].as_str()))
        .map(|pair| pair[1].as_str())
}

async fn build_inventory(config: &AppConfig) -> anyhow::Result<Arc<dyn InventoryRepository>> {
    if let Some(url) = &config.postgres_url {
        let db = Database::connect(url, config.db_max_connections)
            .await
            .context("Failed to connect to PostgreSQL")?;
        return Ok(Arc::new(PgInventory::new(db.pool().clone())));
    }

    let seed = match &config.seed_file {
        Some(path) => InventorySeed::from_yaml_file(path)?,
        None => InventorySeed::default(),
    };
    tracing::warn!(
        products = seed.products.len(),
        stock = seed.stock.len(),
        "No postgres_url configured, using in-memory inventory"
    );
    Ok(Arc::new(MemoryInventory::from_seed(seed)))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let env = flag_value(&args, &["--env", "-e"]).unwrap_or("dev");
    let app_config = AppConfig::load(env)?;
    let _log_guard = coffee_pos::logging::init_logging(&app_config.logging)?;

    tracing::info!(version = env!("GIT_HASH"), "Starting Coffee POS in {} mode", env);

    let port = match flag_value(&args, &["--port", "-p"]) {
        Some(raw) => raw
            .parse()
            .with_context(|| format!("Invalid --port value: {}", raw))?,
        None => app_config.gateway.port,
    };
    let inventory = build_inventory(&app_config).await?;
    let state = Arc::new(AppState::new(inventory));

    gateway::run_server(&app_config.gateway.host, port, state).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_value() {
        let args: Vec<String> = ["coffee_pos", "-e", "prod", "--port", "9090"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(flag_value(&args, &["--env", "-e"]), Some("prod"));
        assert_eq!(flag_value(&args, &["--port", "-p"]), Some("9090"));
        assert_eq!(flag_value(&args[..4], &["--port", "-p"]), None);
    }
}
