//! Card drop detection.
//!
//! Polls recent channel history, filters to embed messages authored by the
//! Mudae bot, and extracts card events. A monotonic [`Cursor`] marks the
//! newest message already accounted for, so no message is ever counted twice
//! across polls.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::error::TransportError;
use crate::kakera;
use crate::model::{CardEvent, Message};
use crate::transport::Transport;

/// Messages fetched by the baseline sync pass.
const BASELINE_HISTORY_LIMIT: u8 = 5;

/// Position of the newest history message already processed.
///
/// Monotonically non-decreasing within a session. `None` means nothing has
/// been observed yet; every message then counts as new.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Cursor(Option<DateTime<Utc>>);

impl Cursor {
    pub fn position(&self) -> Option<DateTime<Utc>> {
        self.0
    }

    /// True when `at` has not been covered by this cursor yet.
    fn admits(&self, at: DateTime<Utc>) -> bool {
        match self.0 {
            Some(seen) => at > seen,
            None => true,
        }
    }

    /// Move forward to `at` if it is newer. Never moves backwards.
    fn advance(&mut self, at: DateTime<Utc>) {
        if self.admits(at) {
            self.0 = Some(at);
        }
    }
}

/// Polls channel history for new Mudae card drops.
pub struct CardDetector {
    transport: Arc<dyn Transport>,
    mudae_user_id: String,
    history_limit: u8,
}

impl CardDetector {
    pub fn new(transport: Arc<dyn Transport>, mudae_user_id: String, history_limit: u8) -> Self {
        Self {
            transport,
            mudae_user_id,
            history_limit,
        }
    }

    /// One detection pass.
    ///
    /// Returns the advanced cursor and the card events strictly newer than
    /// `cursor`, ordered oldest first. The cursor advances to the newest
    /// message observed in the fetch whether or not it matched the embed
    /// filters, so nothing is re-scanned on the next poll.
    pub async fn poll(
        &self,
        cursor: &Cursor,
    ) -> Result<(Cursor, Vec<CardEvent>), TransportError> {
        let messages = self.transport.fetch_history(self.history_limit).await?;
        Ok(self.scan(cursor, &messages))
    }

    /// Establish the session baseline: advance the cursor over everything
    /// currently in history without producing any events, so pre-existing
    /// cards are never attributed to the new session.
    pub async fn sync_baseline(&self) -> Result<Cursor, TransportError> {
        let messages = self.transport.fetch_history(BASELINE_HISTORY_LIMIT).await?;
        let (cursor, _) = self.scan(&Cursor::default(), &messages);
        debug!(position = ?cursor.position(), "Baseline cursor synchronized");
        Ok(cursor)
    }

    fn scan(&self, cursor: &Cursor, messages: &[Message]) -> (Cursor, Vec<CardEvent>) {
        let mut next = *cursor;
        let mut events = Vec::new();

        for message in messages {
            let is_new = cursor.admits(message.timestamp);
            next.advance(message.timestamp);

            if !is_new
                || message.author.id != self.mudae_user_id
                || message.embeds.is_empty()
            {
                continue;
            }

            match extract_title(message) {
                Some(title) => events.push(CardEvent {
                    message_id: message.id.clone(),
                    title,
                    detected_at: message.timestamp,
                    kakera: kakera::extract_buttons(&message.components),
                }),
                // Titleless embed: not a card, skip without error.
                None => debug!(message_id = %message.id, "Embed without title skipped"),
            }
        }

        events.sort_by_key(|e| e.detected_at);
        (next, events)
    }
}

/// Title of the first embed that carries one.
fn extract_title(message: &Message) -> Option<String> {
    message
        .embeds
        .iter()
        .find_map(|embed| embed.title.clone().filter(|title| !title.is_empty()))
}
