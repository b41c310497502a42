//! Discord REST transport.
//!
//! Thin wrapper around the Discord HTTP API using reqwest. The orchestration
//! core talks to the [`Transport`] trait so it can be driven by a scripted
//! mock in tests; [`DiscordHttp`] is the real implementation.

use async_trait::async_trait;
use secrecy::ExposeSecret;

use crate::config::{DiscordSettings, TuningSettings};
use crate::error::TransportError;
use crate::model::{CommandDefinition, Message};

const API_BASE: &str = "https://discord.com/api/v10";
const USER_AGENT: &str = concat!("mudae-assist/", env!("CARGO_PKG_VERSION"));

/// Channel operations consumed by the orchestration core.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Post a plain text message to the configured channel.
    async fn send_text(&self, content: &str) -> Result<Message, TransportError>;

    /// Invoke a resolved slash command in the configured channel.
    async fn invoke_slash(
        &self,
        definition: &CommandDefinition,
        path: &[String],
    ) -> Result<(), TransportError>;

    /// Fetch up to `limit` most recent channel messages, newest first.
    async fn fetch_history(&self, limit: u8) -> Result<Vec<Message>, TransportError>;

    /// Discover the slash-command definition for a command path.
    async fn resolve_command(&self, path: &[String]) -> Result<CommandDefinition, TransportError>;

    /// Click a message component (button) by custom id.
    async fn click_component(
        &self,
        message_id: &str,
        custom_id: &str,
    ) -> Result<(), TransportError>;
}

/// Real Discord HTTP transport.
pub struct DiscordHttp {
    client: reqwest::Client,
    channel_id: String,
    guild_id: String,
    session_id: String,
}

impl DiscordHttp {
    pub fn new(
        discord: &DiscordSettings,
        tuning: &TuningSettings,
    ) -> Result<Self, TransportError> {
        let authorization = resolve_authorization_header(discord.token.expose_secret());

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::AUTHORIZATION,
            authorization
                .parse()
                .map_err(|_| TransportError::Http("invalid authorization header".into()))?,
        );

        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .timeout(tuning.request_timeout)
            .build()
            .map_err(|e| TransportError::Http(e.to_string()))?;

        Ok(Self {
            client,
            channel_id: discord.channel_id.clone(),
            guild_id: discord.guild_id.clone(),
            // Opaque per-process id required by the interactions endpoint.
            session_id: format!("mudae-assist-{}", chrono::Utc::now().timestamp_millis()),
        })
    }

    fn channel_url(&self, suffix: &str) -> String {
        format!("{API_BASE}/channels/{}{suffix}", self.channel_id)
    }

    /// Map a non-success response to the error taxonomy.
    async fn classify(resp: reqwest::Response) -> TransportError {
        let status = resp.status().as_u16();
        match status {
            401 | 403 => TransportError::Unauthorized { status },
            429 => {
                let retry_after = resp
                    .json::<serde_json::Value>()
                    .await
                    .ok()
                    .and_then(|v| v.get("retry_after").and_then(serde_json::Value::as_f64));
                TransportError::RateLimited { retry_after }
            }
            _ => {
                let body = resp.text().await.unwrap_or_default();
                TransportError::Http(format!("status {status}: {body}"))
            }
        }
    }

    async fn check(resp: reqwest::Response) -> Result<reqwest::Response, TransportError> {
        if resp.status().is_success() {
            Ok(resp)
        } else {
            Err(Self::classify(resp).await)
        }
    }
}

#[async_trait]
impl Transport for DiscordHttp {
    async fn send_text(&self, content: &str) -> Result<Message, TransportError> {
        let resp = self
            .client
            .post(self.channel_url("/messages"))
            .json(&serde_json::json!({ "content": content, "tts": false }))
            .send()
            .await
            .map_err(|e| TransportError::Http(e.to_string()))?;
        let resp = Self::check(resp).await?;
        resp.json::<Message>()
            .await
            .map_err(|e| TransportError::Parse(e.to_string()))
    }

    async fn invoke_slash(
        &self,
        definition: &CommandDefinition,
        path: &[String],
    ) -> Result<(), TransportError> {
        // Subcommand segments after the root become nested type-1 options.
        let mut options = serde_json::json!([]);
        for segment in path.iter().skip(1).rev() {
            options = serde_json::json!([{ "type": 1, "name": segment, "options": options }]);
        }

        let payload = serde_json::json!({
            "type": 2,
            "application_id": definition.application_id,
            "guild_id": self.guild_id,
            "channel_id": self.channel_id,
            "session_id": self.session_id,
            "data": {
                "version": definition.version,
                "id": definition.id,
                "name": definition.name,
                "type": 1,
                "options": options,
            },
        });

        let resp = self
            .client
            .post(format!("{API_BASE}/interactions"))
            .json(&payload)
            .send()
            .await
            .map_err(|e| TransportError::Http(e.to_string()))?;
        Self::check(resp).await.map(|_| ())
    }

    async fn fetch_history(&self, limit: u8) -> Result<Vec<Message>, TransportError> {
        let resp = self
            .client
            .get(self.channel_url("/messages"))
            .query(&[("limit", limit.to_string())])
            .send()
            .await
            .map_err(|e| TransportError::Http(e.to_string()))?;
        let resp = Self::check(resp).await?;
        resp.json::<Vec<Message>>()
            .await
            .map_err(|e| TransportError::Parse(e.to_string()))
    }

    async fn resolve_command(&self, path: &[String]) -> Result<CommandDefinition, TransportError> {
        let root = path
            .first()
            .ok_or_else(|| TransportError::Parse("empty slash command path".into()))?;

        let resp = self
            .client
            .get(self.channel_url("/application-commands/search"))
            .query(&[("type", "1"), ("query", root), ("limit", "7")])
            .send()
            .await
            .map_err(|e| TransportError::Http(e.to_string()))?;
        let resp = Self::check(resp).await?;

        let body: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| TransportError::Parse(e.to_string()))?;
        let commands = body
            .get("application_commands")
            .and_then(serde_json::Value::as_array)
            .ok_or_else(|| TransportError::Parse("missing application_commands".into()))?;

        commands
            .iter()
            .find(|c| c.get("name").and_then(serde_json::Value::as_str) == Some(root))
            .map(|c| {
                serde_json::from_value::<CommandDefinition>(c.clone())
                    .map_err(|e| TransportError::Parse(e.to_string()))
            })
            .transpose()?
            .ok_or_else(|| TransportError::Parse(format!("command {root:?} not found")))
    }

    async fn click_component(
        &self,
        message_id: &str,
        custom_id: &str,
    ) -> Result<(), TransportError> {
        let payload = serde_json::json!({
            "type": 3,
            "guild_id": self.guild_id,
            "channel_id": self.channel_id,
            "message_id": message_id,
            "session_id": self.session_id,
            "data": { "component_type": 2, "custom_id": custom_id },
        });

        let resp = self
            .client
            .post(format!("{API_BASE}/interactions"))
            .json(&payload)
            .send()
            .await
            .map_err(|e| TransportError::Http(e.to_string()))?;
        Self::check(resp).await.map(|_| ())
    }
}

/// Normalize the authorization header for both bot and user tokens.
///
/// User tokens contain two dots; Discord bot tokens typically do not and
/// need a `Bot ` prefix unless one is already present.
fn resolve_authorization_header(token: &str) -> String {
    let trimmed = token.trim();
    let lowered = trimmed.to_lowercase();
    if lowered.starts_with("bot ") || lowered.starts_with("bearer ") {
        return trimmed.to_string();
    }
    if trimmed.matches('.').count() == 2 {
        return trimmed.to_string();
    }
    format!("Bot {trimmed}")
}

/// Inert transport and settings fixtures shared by unit tests.
#[cfg(test)]
pub(crate) mod tests_support {
    use std::time::Duration;

    use secrecy::SecretString;

    use super::*;
    use crate::config::{AppSettings, KakeraSettings, TuningSettings};

    pub(crate) struct NullTransport;

    #[async_trait]
    impl Transport for NullTransport {
        async fn send_text(&self, _: &str) -> Result<Message, TransportError> {
            Err(TransportError::Http("null transport".into()))
        }
        async fn invoke_slash(
            &self,
            _: &CommandDefinition,
            _: &[String],
        ) -> Result<(), TransportError> {
            Err(TransportError::Http("null transport".into()))
        }
        async fn fetch_history(&self, _: u8) -> Result<Vec<Message>, TransportError> {
            Ok(Vec::new())
        }
        async fn resolve_command(
            &self,
            _: &[String],
        ) -> Result<CommandDefinition, TransportError> {
            Err(TransportError::Http("null transport".into()))
        }
        async fn click_component(&self, _: &str, _: &str) -> Result<(), TransportError> {
            Err(TransportError::Http("null transport".into()))
        }
    }

    pub(crate) fn test_settings() -> AppSettings {
        AppSettings {
            discord: DiscordSettings {
                token: SecretString::from("test-token"),
                channel_id: "100".into(),
                guild_id: "200".into(),
                mudae_user_id: "432610292342587392".into(),
                command_prefix: "$".into(),
                slash_roll_command: "wa".into(),
            },
            tuning: TuningSettings {
                roll_batch_size: 10,
                poll_interval: Duration::from_millis(10),
                message_history_limit: 50,
                roll_delay: Duration::from_millis(1),
                request_timeout: Duration::from_millis(100),
            },
            kakera: KakeraSettings::default(),
        }
    }
}
