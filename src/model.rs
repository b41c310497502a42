//! Typed wire schema and domain types.
//!
//! Raw Discord payloads are deserialized into these structs at the transport
//! boundary; a shape mismatch surfaces as a parse error instead of silently
//! defaulting.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ── Discord wire types ──────────────────────────────────────────────

/// Subset of Discord embed fields we care about.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Embed {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

/// Message author.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Author {
    pub id: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub global_name: Option<String>,
}

/// Subset of emoji metadata used for component interactions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Emoji {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

/// Discord message component (action rows, buttons).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Component {
    /// Component type: 1 = action row, 2 = button.
    #[serde(rename = "type")]
    pub kind: u8,
    #[serde(default)]
    pub custom_id: Option<String>,
    #[serde(default)]
    pub emoji: Option<Emoji>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub components: Vec<Component>,
}

/// Typed representation of a Discord channel message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    #[serde(default)]
    pub content: String,
    pub author: Author,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub embeds: Vec<Embed>,
    #[serde(default)]
    pub components: Vec<Component>,
}

/// A resolved slash-command definition, as returned by command discovery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandDefinition {
    pub id: String,
    pub application_id: String,
    pub name: String,
    pub version: String,
}

// ── Domain types ────────────────────────────────────────────────────

/// Severity of an operator-facing log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// Runtime log entry displayed on the operator console.
#[derive(Debug, Clone)]
pub struct LogEntry {
    pub level: LogLevel,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

impl LogEntry {
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            created_at: Utc::now(),
        }
    }
}

/// A clickable kakera button extracted from a card message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KakeraButton {
    pub custom_id: String,
    /// Emoji name, e.g. `kakeraP`.
    pub emoji_name: String,
}

/// A detected card drop. Unique per `message_id` within a session.
#[derive(Debug, Clone)]
pub struct CardEvent {
    pub message_id: String,
    pub title: String,
    pub detected_at: DateTime<Utc>,
    /// Kakera buttons present on the card, if any.
    pub kakera: Vec<KakeraButton>,
}

/// User-selectable strategy for kakera button reactions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KakeraReactionMode {
    /// Only react to the purple `kakeraP` button.
    PurpleOnly,
    /// React to the first button matching the configured preference order.
    #[default]
    Preferred,
}

/// Parameters for one rolling session.
#[derive(Debug, Clone, Default)]
pub struct SessionParams {
    /// Number of standalone rolls to send before boosting.
    pub roll_count: u32,
    /// Total `$us` boost uses to spend.
    pub boost_total: u32,
    /// Invoke the roll as a slash command instead of a text command.
    pub use_slash: bool,
    /// How to react to kakera buttons while rolling via slash commands.
    pub kakera_mode: KakeraReactionMode,
}

/// Lifecycle of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No session has run yet, or the coordinator was reset.
    Idle,
    /// A worker task is executing the plan.
    Running,
    /// The plan finished without a fatal error.
    Completed,
    /// A fatal error (authorization rejection) aborted the session.
    Failed,
}

impl SessionState {
    /// Terminal states never re-enter Running without a fresh session.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

/// Aggregate result captured from a rolling session.
#[derive(Debug, Clone)]
pub struct RollSummary {
    pub messages_sent: u64,
    pub cards_detected: u64,
    pub last_card_title: Option<String>,
    pub started_at: DateTime<Utc>,
    /// Set only once the session reaches a terminal state.
    pub ended_at: Option<DateTime<Utc>>,
}

impl RollSummary {
    pub fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            messages_sent: 0,
            cards_detected: 0,
            last_card_title: None,
            started_at,
            ended_at: None,
        }
    }

    /// Session duration. Undefined (None) while the session is running.
    pub fn duration(&self) -> Option<chrono::Duration> {
        self.ended_at.map(|end| end - self.started_at)
    }
}
