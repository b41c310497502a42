//! Configuration types, loaded once from the environment.
//!
//! Every field is validated at construction so a bad value fails fast,
//! before any session can start.

use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;

/// Default kakera button emoji names, in preference order.
pub const DEFAULT_KAKERA_TYPES: &[&str] =
    &["kakeraP", "kakeraO", "kakeraR", "kakeraW", "kakeraL"];

/// Runtime configuration for Discord API access.
#[derive(Debug, Clone)]
pub struct DiscordSettings {
    /// Token for authenticating with Discord (bot or user).
    pub token: SecretString,
    /// Target channel ID where commands are sent.
    pub channel_id: String,
    /// Guild (server) ID for slash-command context.
    pub guild_id: String,
    /// Discord user ID of the Mudae bot.
    pub mudae_user_id: String,
    /// Prefix used for text commands when not relying on slash commands.
    pub command_prefix: String,
    /// Slash command path (space-separated) used to perform rolls.
    pub slash_roll_command: String,
}

impl DiscordSettings {
    /// The slash roll command split into path segments (e.g. `"wa"` → `["wa"]`).
    pub fn slash_roll_command_path(&self) -> Vec<String> {
        self.slash_roll_command
            .split_whitespace()
            .map(str::to_string)
            .collect()
    }
}

/// User-tunable runtime parameters.
#[derive(Debug, Clone)]
pub struct TuningSettings {
    /// Default number of rolls suggested for batch operations.
    pub roll_batch_size: u32,
    /// How frequently to poll Discord for new Mudae responses.
    pub poll_interval: Duration,
    /// Number of recent messages to request when polling Discord.
    pub message_history_limit: u8,
    /// Delay between roll commands to avoid hitting rate limits.
    pub roll_delay: Duration,
    /// Upper bound for any single transport request.
    pub request_timeout: Duration,
}

/// Configuration for kakera reaction behavior.
#[derive(Debug, Clone)]
pub struct KakeraSettings {
    /// Ordered list of kakera emoji names to react to when enabled.
    pub preferred_types: Vec<String>,
}

impl Default for KakeraSettings {
    fn default() -> Self {
        Self {
            preferred_types: DEFAULT_KAKERA_TYPES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Aggregated application configuration.
#[derive(Debug, Clone)]
pub struct AppSettings {
    pub discord: DiscordSettings,
    pub tuning: TuningSettings,
    pub kakera: KakeraSettings,
}

impl AppSettings {
    /// Load settings from environment variables.
    ///
    /// `DISCORD_TOKEN`, `DISCORD_CHANNEL_ID` and `DISCORD_GUILD_ID` are
    /// required; everything else has a default.
    pub fn from_env() -> Result<Self, ConfigError> {
        let discord = DiscordSettings {
            token: SecretString::from(require_env("DISCORD_TOKEN")?),
            channel_id: require_env("DISCORD_CHANNEL_ID")?,
            guild_id: require_env("DISCORD_GUILD_ID")?,
            mudae_user_id: env_or("MUDAE_USER_ID", "432610292342587392"),
            command_prefix: env_or("DISCORD_COMMAND_PREFIX", "$"),
            slash_roll_command: env_or("SLASH_ROLL_COMMAND", "wa"),
        };

        let tuning = TuningSettings {
            roll_batch_size: parse_env("ROLL_BATCH_SIZE", 10, |v| *v >= 1, "must be >= 1")?,
            poll_interval: Duration::from_secs_f64(parse_env(
                "POLL_INTERVAL_SECONDS",
                1.5,
                |v| *v >= 0.1,
                "must be >= 0.1",
            )?),
            message_history_limit: parse_env(
                "MESSAGE_HISTORY_LIMIT",
                50,
                |v| (1..=100).contains(v),
                "must be in 1..=100",
            )?,
            roll_delay: Duration::from_secs_f64(parse_env(
                "ROLL_DELAY_SECONDS",
                1.0,
                |v| *v >= 0.1,
                "must be >= 0.1",
            )?),
            request_timeout: Duration::from_secs_f64(parse_env(
                "REQUEST_TIMEOUT_SECONDS",
                10.0,
                |v| *v > 0.0,
                "must be positive",
            )?),
        };

        let preferred: Vec<String> = std::env::var("KAKERA_PREFERRED_TYPES")
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        let kakera = if preferred.is_empty() {
            KakeraSettings::default()
        } else {
            KakeraSettings {
                preferred_types: preferred,
            }
        };

        Ok(Self {
            discord,
            tuning,
            kakera,
        })
    }
}

fn require_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn parse_env<T>(
    key: &str,
    default: T,
    valid: impl Fn(&T) -> bool,
    hint: &str,
) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
{
    let value = match std::env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => {
            raw.trim().parse::<T>().map_err(|_| ConfigError::InvalidValue {
                key: key.to_string(),
                message: format!("cannot parse {raw:?}"),
            })?
        }
        _ => default,
    };
    if !valid(&value) {
        return Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: hint.to_string(),
        });
    }
    Ok(value)
}
