//! Fund Ledger service
//!
//! ```text
//! ┌──────────┐    ┌──────────┐    ┌───────────────┐    ┌────────────┐
//! │  Config  │───▶│ Gateway  │───▶│ LedgerService │───▶│ PostgreSQL │
//! │  (YAML)  │    │  (axum)  │    │ (one tx/op)   │    │ or memory  │
//! └──────────┘    └──────────┘    └───────────────┘    └────────────┘
//! ```
//!
//! Flags: `--env/-e <name>` (config/<name>.yaml, default `dev`),
//! `--port <port>`, `--memory` (in-process store, no database).

use std::sync::Arc;

use anyhow::Context;

use fund_ledger::config::AppConfig;
use fund_ledger::db::Database;
use fund_ledger::gateway;
use fund_ledger::ledger::{LedgerService, MemoryStore, PgStore, TransactionalStore};
use fund_ledger::logging::init_logging;

/// Value following `--name` (or its short alias) on the command line
fn flag_value(names: &[&str]) -> Option<String> {
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        if names.contains(&arg.as_str()) {
            return args.next();
        }
    }
    None
}

fn has_flag(name: &str) -> bool {
    std::env::args().skip(1).any(|a| a == name)
}

async fn open_store(config: &AppConfig) -> anyhow::Result<Arc<dyn TransactionalStore>> {
    if has_flag("--memory") {
        tracing::warn!("Running on the in-process store; nothing is persisted");
        return Ok(Arc::new(MemoryStore::new()));
    }

    let url = config
        .postgres_url
        .as_deref()
        .context("postgres_url is not configured (use --memory to run without a database)")?;
    let db = Database::connect(url, &config.database)
        .await
        .context("Failed to connect to PostgreSQL")?;
    db.migrate().await.context("Failed to apply migrations")?;
    Ok(Arc::new(PgStore::new(db.pool().clone())))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env = flag_value(&["--env", "-e"]).unwrap_or_else(|| "dev".to_string());
    let mut config = AppConfig::load(&env)?;
    if let Some(port) = flag_value(&["--port"]) {
        config.gateway.port = port
            .parse::<u16>()
            .with_context(|| format!("Invalid --port value: {}", port))?;
    }
    let _log_guard = init_logging(&config);

    tracing::info!(
        env = %env,
        version = env!("GIT_HASH"),
        "Starting fund ledger"
    );

    let store = open_store(&config).await?;
    let root = tracing::info_span!("fund_ledger", env = %env);
    let ledger = LedgerService::new(store, config.ledger.clone(), &root)
        .context("Invalid ledger.default_currency")?;

    gateway::run_server(&config.gateway.host, config.gateway.port, Arc::new(ledger)).await
}
