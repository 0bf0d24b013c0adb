use std::path::PathBuf;

use clap::Args;
use mindgate_core::InterventionKind;

#[derive(Args)]
pub struct DecideArgs {
    /// Target app identifier
    #[arg(long)]
    app: String,
    /// Session id used to match the later decision report
    #[arg(long)]
    session: String,
    /// What triggered the intervention: launch or extended-session
    #[arg(long, default_value = "launch")]
    kind: InterventionKind,
    /// JSON usage snapshot (fields of StaticUsageHistory)
    #[arg(long)]
    usage: Option<PathBuf>,
}

pub fn run(args: DecideArgs) -> Result<(), Box<dyn std::error::Error>> {
    let engine = super::open_engine(args.usage.as_deref())?;
    let decision = engine.decide(&args.app, &args.session, args.kind)?;
    println!("{}", serde_json::to_string_pretty(&decision)?);
    Ok(())
}
