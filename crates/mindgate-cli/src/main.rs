use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "mindgate", version, about = "Mindgate intervention engine CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Pick the intervention to show for an app launch or long session
    Decide(commands::decide::DecideArgs),
    /// Report what the user did after an intervention
    Report {
        #[command(subcommand)]
        action: commands::report::ReportAction,
    },
    /// Effectiveness statistics
    Stats {
        #[command(subcommand)]
        action: commands::stats::StatsAction,
    },
    /// Content catalog inspection
    Catalog {
        #[command(subcommand)]
        action: commands::catalog::CatalogAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

/// Logs go to stderr so JSON on stdout stays parseable. Filter with
/// MINDGATE_LOG (e.g. `MINDGATE_LOG=mindgate_core=debug`).
fn init_tracing() {
    let filter = EnvFilter::try_from_env("MINDGATE_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    init_tracing();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Decide(args) => commands::decide::run(args),
        Commands::Report { action } => commands::report::run(action),
        Commands::Stats { action } => commands::stats::run(action),
        Commands::Catalog { action } => commands::catalog::run(action),
        Commands::Config { action } => commands::config::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
