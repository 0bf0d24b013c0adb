use clap::Subcommand;
use mindgate_core::UserDecision;

#[derive(Subcommand)]
pub enum ReportAction {
    /// Record the user's choice on the last intervention of a session
    Decision {
        #[arg(long)]
        session: String,
        /// Instance id that was shown
        #[arg(long)]
        instance: String,
        /// proceeded or went-back
        #[arg(long)]
        choice: UserDecision,
        /// Time from display to choice
        #[arg(long)]
        latency_ms: u64,
    },
    /// Record how the session ended
    SessionEnd {
        #[arg(long)]
        session: String,
        #[arg(long)]
        duration_ms: u64,
        /// The session was cut short (crash, force-close)
        #[arg(long)]
        abnormal: bool,
    },
}

pub fn run(action: ReportAction) -> Result<(), Box<dyn std::error::Error>> {
    let engine = super::open_engine(None)?;

    match action {
        ReportAction::Decision {
            session,
            instance,
            choice,
            latency_ms,
        } => {
            let outcome = engine.report_decision(&session, &instance, choice, latency_ms)?;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }
        ReportAction::SessionEnd {
            session,
            duration_ms,
            abnormal,
        } => {
            let status = engine.report_session_end(&session, duration_ms, !abnormal)?;
            println!(
                "{}",
                serde_json::to_string_pretty(&serde_json::json!({
                    "session_id": session,
                    "status": status,
                }))?
            );
        }
    }
    Ok(())
}
