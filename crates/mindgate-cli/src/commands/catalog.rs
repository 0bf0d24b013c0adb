use std::path::PathBuf;

use clap::Subcommand;
use mindgate_core::EngineConfig;

#[derive(Subcommand)]
pub enum CatalogAction {
    /// Print the active catalog as JSON
    Show {
        /// Catalog TOML file (defaults to the configured or built-in catalog)
        #[arg(long)]
        path: Option<PathBuf>,
    },
    /// Check a catalog and print per-category instance counts
    Validate {
        #[arg(long)]
        path: Option<PathBuf>,
    },
}

pub fn run(action: CatalogAction) -> Result<(), Box<dyn std::error::Error>> {
    let config = EngineConfig::load()?;

    match action {
        CatalogAction::Show { path } => {
            let catalog = super::load_catalog(&config, path.as_deref())?;
            println!("{}", serde_json::to_string_pretty(&catalog)?);
        }
        CatalogAction::Validate { path } => {
            let catalog = super::load_catalog(&config, path.as_deref())?;
            catalog.validate()?;
            println!(
                "{}",
                serde_json::to_string_pretty(&serde_json::json!({
                    "valid": true,
                    "version": catalog.version,
                    "instances": catalog.len(),
                    "categories": catalog.category_counts(),
                }))?
            );
        }
    }
    Ok(())
}
