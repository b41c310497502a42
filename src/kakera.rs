//! Kakera button reactions.
//!
//! While rolling in slash mode, Mudae attaches kakera buttons to card drops.
//! This module picks the preferred button, clicks it through the transport,
//! and watches the bot's feedback messages for energy depletion. Once energy
//! is depleted the session stops reacting.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::error::TransportError;
use crate::model::{CardEvent, Component, KakeraButton, KakeraReactionMode};
use crate::transport::Transport;

/// How long to watch for Mudae's reaction feedback after a click.
const FEEDBACK_TIMEOUT: Duration = Duration::from_secs(6);
/// Messages fetched per feedback check.
const FEEDBACK_HISTORY_LIMIT: u8 = 5;

/// Flatten a component tree into the kakera buttons it contains.
///
/// Action rows (type 1) are descended into; buttons (type 2) qualify when
/// they carry both a custom id and an emoji name.
pub fn extract_buttons(components: &[Component]) -> Vec<KakeraButton> {
    let mut buttons = Vec::new();
    collect_buttons(components, &mut buttons);
    buttons
}

fn collect_buttons(components: &[Component], out: &mut Vec<KakeraButton>) {
    for component in components {
        match component.kind {
            1 => collect_buttons(&component.components, out),
            2 => {
                let custom_id = component.custom_id.as_deref();
                let emoji_name = component.emoji.as_ref().and_then(|e| e.name.as_deref());
                if let (Some(custom_id), Some(emoji_name)) = (custom_id, emoji_name) {
                    out.push(KakeraButton {
                        custom_id: custom_id.to_string(),
                        emoji_name: emoji_name.to_string(),
                    });
                }
            }
            _ => {}
        }
    }
}

/// Resolve the kakera names to react to for a reaction mode.
///
/// Preserves the user-defined order while removing duplicates.
pub fn resolve_targets(mode: KakeraReactionMode, preferred: &[String]) -> Vec<String> {
    match mode {
        KakeraReactionMode::PurpleOnly => vec!["kakeraP".to_string()],
        KakeraReactionMode::Preferred => {
            let mut seen = std::collections::HashSet::new();
            preferred
                .iter()
                .filter(|name| !name.is_empty() && seen.insert(name.as_str()))
                .cloned()
                .collect()
        }
    }
}

/// First button matching the target preference order.
pub fn select_button<'a>(
    buttons: &'a [KakeraButton],
    targets: &[String],
) -> Option<&'a KakeraButton> {
    targets
        .iter()
        .find_map(|target| buttons.iter().find(|b| &b.emoji_name == target))
}

/// Whether a Mudae feedback message reports depleted kakera energy.
pub fn is_energy_depleted(content: &str) -> bool {
    let lowered = content.to_lowercase();
    ["out of energy", "don't have enough energy", "no energy left"]
        .iter()
        .any(|phrase| lowered.contains(phrase))
}

/// Whether a Mudae feedback message reports a successful reaction.
pub fn is_successful_reaction(content: &str) -> bool {
    let lowered = content.to_lowercase();
    lowered.contains("react") && lowered.contains("success")
}

/// Outcome of one reaction attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReactionOutcome {
    /// No target button on the card; nothing clicked.
    NoButton,
    /// Button clicked; energy still available (or feedback inconclusive).
    Reacted,
    /// Mudae reported depleted energy; stop reacting this session.
    EnergyDepleted,
}

/// Clicks kakera buttons and interprets Mudae's feedback.
pub struct KakeraReactor {
    transport: Arc<dyn Transport>,
    mudae_user_id: String,
    targets: Vec<String>,
    poll_interval: Duration,
}

impl KakeraReactor {
    pub fn new(
        transport: Arc<dyn Transport>,
        mudae_user_id: String,
        mode: KakeraReactionMode,
        preferred: &[String],
        poll_interval: Duration,
    ) -> Self {
        Self {
            transport,
            mudae_user_id,
            targets: resolve_targets(mode, preferred),
            poll_interval: poll_interval.min(Duration::from_millis(600)),
        }
    }

    pub fn has_targets(&self) -> bool {
        !self.targets.is_empty()
    }

    /// React to one detected card. A failed click is not fatal to the
    /// session; it only skips this card.
    pub async fn react(&self, event: &CardEvent) -> ReactionOutcome {
        let Some(button) = select_button(&event.kakera, &self.targets) else {
            return ReactionOutcome::NoButton;
        };

        if let Err(e) = self
            .transport
            .click_component(&event.message_id, &button.custom_id)
            .await
        {
            warn!(error = %e, card = %event.title, "Kakera click failed");
            return ReactionOutcome::NoButton;
        }
        debug!(card = %event.title, emoji = %button.emoji_name, "Kakera button clicked");

        if self.await_depletion_feedback(event.detected_at).await {
            ReactionOutcome::EnergyDepleted
        } else {
            ReactionOutcome::Reacted
        }
    }

    /// Watch feedback messages newer than `since` until the timeout.
    /// Returns true when Mudae reports depleted energy.
    async fn await_depletion_feedback(&self, since: DateTime<Utc>) -> bool {
        let deadline = tokio::time::Instant::now() + FEEDBACK_TIMEOUT;

        while tokio::time::Instant::now() < deadline {
            match self.transport.fetch_history(FEEDBACK_HISTORY_LIMIT).await {
                Ok(messages) => {
                    for message in messages {
                        if message.author.id != self.mudae_user_id
                            || message.timestamp <= since
                        {
                            continue;
                        }
                        if is_energy_depleted(&message.content) {
                            return true;
                        }
                        if is_successful_reaction(&message.content) {
                            return false;
                        }
                    }
                }
                Err(e) => {
                    warn!(error = %e, "Kakera feedback poll failed");
                    return false;
                }
            }
            tokio::time::sleep(self.poll_interval).await;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Emoji;

    fn button(custom_id: &str, emoji: &str) -> Component {
        Component {
            kind: 2,
            custom_id: Some(custom_id.into()),
            emoji: Some(Emoji {
                id: None,
                name: Some(emoji.into()),
            }),
            label: None,
            components: Vec::new(),
        }
    }

    fn row(children: Vec<Component>) -> Component {
        Component {
            kind: 1,
            custom_id: None,
            emoji: None,
            label: None,
            components: children,
        }
    }

    #[test]
    fn extract_buttons_descends_action_rows() {
        let tree = vec![row(vec![button("a", "kakeraP"), button("b", "kakeraR")])];
        let buttons = extract_buttons(&tree);
        assert_eq!(buttons.len(), 2);
        assert_eq!(buttons[0].emoji_name, "kakeraP");
        assert_eq!(buttons[1].custom_id, "b");
    }

    #[test]
    fn extract_buttons_skips_incomplete_buttons() {
        let mut no_emoji = button("a", "kakeraP");
        no_emoji.emoji = None;
        let mut no_id = button("b", "kakeraR");
        no_id.custom_id = None;

        assert!(extract_buttons(&[no_emoji, no_id]).is_empty());
    }

    #[test]
    fn resolve_targets_purple_only() {
        let preferred = vec!["kakeraW".to_string(), "kakeraL".to_string()];
        assert_eq!(
            resolve_targets(KakeraReactionMode::PurpleOnly, &preferred),
            ["kakeraP"]
        );
    }

    #[test]
    fn resolve_targets_dedups_preserving_order() {
        let preferred: Vec<String> = ["kakeraO", "kakeraP", "kakeraO", "", "kakeraP"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(
            resolve_targets(KakeraReactionMode::Preferred, &preferred),
            ["kakeraO", "kakeraP"]
        );
    }

    #[test]
    fn select_button_respects_preference_order() {
        let buttons = vec![
            KakeraButton {
                custom_id: "1".into(),
                emoji_name: "kakeraR".into(),
            },
            KakeraButton {
                custom_id: "2".into(),
                emoji_name: "kakeraP".into(),
            },
        ];
        let targets = vec!["kakeraP".to_string(), "kakeraR".to_string()];
        assert_eq!(select_button(&buttons, &targets).unwrap().custom_id, "2");
    }

    #[test]
    fn select_button_none_when_no_match() {
        let buttons = vec![KakeraButton {
            custom_id: "1".into(),
            emoji_name: "kakeraL".into(),
        }];
        let targets = vec!["kakeraP".to_string()];
        assert!(select_button(&buttons, &targets).is_none());
    }

    #[test]
    fn energy_depletion_phrases() {
        assert!(is_energy_depleted("You are OUT OF ENERGY, come back later"));
        assert!(is_energy_depleted("you don't have enough energy"));
        assert!(is_energy_depleted("no energy left!"));
        assert!(!is_energy_depleted("kakera reaction success"));
    }

    #[test]
    fn successful_reaction_phrases() {
        assert!(is_successful_reaction("Reacted with success! +51 kakera"));
        assert!(!is_successful_reaction("reaction failed"));
        assert!(!is_successful_reaction("success"));
    }
}
