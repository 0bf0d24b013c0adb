pub mod catalog;
pub mod config;
pub mod decide;
pub mod report;
pub mod stats;

use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use mindgate_core::{
    ContentCatalog, Database, EngineConfig, InterventionEngine, StaticUsageHistory,
};

/// The configured catalog, or the built-in one when no path is set.
pub fn load_catalog(
    config: &EngineConfig,
    path: Option<&Path>,
) -> Result<ContentCatalog, Box<dyn std::error::Error>> {
    match path.or(config.catalog_path.as_deref()) {
        Some(p) => Ok(ContentCatalog::load(p)?),
        None => Ok(ContentCatalog::builtin()),
    }
}

/// Usage snapshot from a JSON file. The install date falls back to the one
/// recorded in the database on first use.
fn load_usage(
    usage: Option<&Path>,
    db: &Database,
) -> Result<StaticUsageHistory, Box<dyn std::error::Error>> {
    let mut history: StaticUsageHistory = match usage {
        Some(p) => serde_json::from_str(&std::fs::read_to_string(p)?)?,
        None => StaticUsageHistory::default(),
    };
    if history.install_date.is_none() {
        history.install_date = Some(db.ensure_install_date(Utc::now())?);
    }
    Ok(history)
}

/// Open the database and build an engine from the stored configuration.
pub fn open_engine(
    usage: Option<&Path>,
) -> Result<InterventionEngine, Box<dyn std::error::Error>> {
    let config = EngineConfig::load()?;
    let catalog = load_catalog(&config, None)?;
    tracing::debug!(
        "Loaded catalog v{} with {} instances",
        catalog.version,
        catalog.len()
    );
    let db = Arc::new(Database::open()?);
    let history = load_usage(usage, &db)?;
    Ok(InterventionEngine::new(
        catalog,
        Arc::new(history),
        db,
        &config,
    )?)
}
