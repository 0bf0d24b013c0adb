//! Show and outcome records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::content::ContentCategory;
use crate::context::InterventionContext;
use crate::friction::FrictionTier;

/// What triggered the intervention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterventionKind {
    /// The user is opening a tracked app.
    Launch,
    /// The user crossed the elapsed-time threshold in a running session.
    ExtendedSession,
}

impl InterventionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            InterventionKind::Launch => "launch",
            InterventionKind::ExtendedSession => "extended_session",
        }
    }
}

impl std::str::FromStr for InterventionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "launch" => Ok(InterventionKind::Launch),
            "extended_session" | "extended-session" => Ok(InterventionKind::ExtendedSession),
            other => Err(format!("unknown intervention kind: {other}")),
        }
    }
}

/// The user's answer to a shown intervention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserDecision {
    Proceeded,
    WentBack,
}

impl UserDecision {
    pub fn as_str(self) -> &'static str {
        match self {
            UserDecision::Proceeded => "proceeded",
            UserDecision::WentBack => "went_back",
        }
    }
}

impl std::str::FromStr for UserDecision {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "proceeded" => Ok(UserDecision::Proceeded),
            "went_back" | "went-back" => Ok(UserDecision::WentBack),
            other => Err(format!("unknown decision: {other}")),
        }
    }
}

/// One presentation of content, written at show time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShowRecord {
    pub id: String,
    pub session_id: String,
    pub target_app: String,
    pub kind: InterventionKind,
    pub category: ContentCategory,
    pub instance_id: String,
    pub friction_tier: FrictionTier,
    pub context: InterventionContext,
    pub shown_at: DateTime<Utc>,
    /// Version of the catalog the instance was drawn from.
    pub catalog_version: u32,
}

/// One decision, appended once and patched at most once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterventionOutcome {
    pub id: String,
    pub show_id: String,
    pub session_id: String,
    pub recorded_at: DateTime<Utc>,
    pub target_app: String,
    pub kind: InterventionKind,
    pub category: ContentCategory,
    pub instance_id: String,
    pub friction_tier: FrictionTier,
    pub context: InterventionContext,
    pub decision: UserDecision,
    pub latency_ms: u64,
    /// Filled by the session-end patch.
    pub final_session_ms: Option<u64>,
    pub ended_normally: Option<bool>,
}

impl InterventionOutcome {
    /// Build the outcome for a decision on `show`.
    pub fn from_show(
        show: &ShowRecord,
        decision: UserDecision,
        latency_ms: u64,
        recorded_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            show_id: show.id.clone(),
            session_id: show.session_id.clone(),
            recorded_at,
            target_app: show.target_app.clone(),
            kind: show.kind,
            category: show.category,
            instance_id: show.instance_id.clone(),
            friction_tier: show.friction_tier,
            context: show.context.clone(),
            decision,
            latency_ms,
            final_session_ms: None,
            ended_normally: None,
        }
    }

    pub fn went_back(&self) -> bool {
        self.decision == UserDecision::WentBack
    }

    pub fn is_patched(&self) -> bool {
        self.final_session_ms.is_some()
    }
}

/// Result of a session-end patch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatchStatus {
    Applied,
    NotFound,
    AlreadyPatched,
}
