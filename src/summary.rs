//! Session summary aggregation.

use std::collections::HashSet;

use chrono::{DateTime, Utc};

use crate::model::{CardEvent, RollSummary};

/// Accumulates counters and the most recent detected card for one session.
///
/// Card events are deduplicated by message id: a message counted once is
/// never counted again, no matter how often polls return it.
pub struct SummaryAggregator {
    summary: RollSummary,
    seen: HashSet<String>,
    last_card_at: Option<DateTime<Utc>>,
}

impl SummaryAggregator {
    pub fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            summary: RollSummary::new(started_at),
            seen: HashSet::new(),
            last_card_at: None,
        }
    }

    /// Count one issued action.
    pub fn record_action(&mut self) {
        self.summary.messages_sent += 1;
    }

    /// Merge detected card events, ignoring message ids already seen.
    /// `last_card_title` tracks the event with the greatest `detected_at`
    /// across the whole session.
    pub fn record_cards(&mut self, events: &[CardEvent]) {
        for event in events {
            if !self.seen.insert(event.message_id.clone()) {
                continue;
            }
            self.summary.cards_detected += 1;
            if self.last_card_at.is_none_or(|at| event.detected_at >= at) {
                self.last_card_at = Some(event.detected_at);
                self.summary.last_card_title = Some(event.title.clone());
            }
        }
    }

    /// Stamp `ended_at`. Idempotent: a second call never moves the stamp.
    pub fn finalize(&mut self) {
        if self.summary.ended_at.is_none() {
            self.summary.ended_at = Some(Utc::now());
        }
    }

    pub fn snapshot(&self) -> RollSummary {
        self.summary.clone()
    }
}
