use clap::Subcommand;

#[derive(Subcommand)]
pub enum StatsAction {
    /// Per-category and per-instance went-back rates
    Effectiveness {
        /// Only count outcomes from the last N days
        #[arg(long)]
        window_days: Option<u32>,
    },
    /// Categories below the configured went-back floor
    Underperforming,
}

pub fn run(action: StatsAction) -> Result<(), Box<dyn std::error::Error>> {
    let engine = super::open_engine(None)?;

    match action {
        StatsAction::Effectiveness { window_days } => {
            let report = engine.get_effectiveness_report(window_days)?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        StatsAction::Underperforming => {
            let categories = engine.get_underperforming_categories()?;
            println!("{}", serde_json::to_string_pretty(&categories)?);
        }
    }
    Ok(())
}
