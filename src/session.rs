//! Session execution.
//!
//! The coordinator owns all mutable session state (state machine, summary,
//! event log) behind a single lock. A dedicated worker task drives the roll
//! plan; the operator console only ever reads cloned snapshots. At most one
//! session runs per process: a second `start` while one is Running is
//! rejected synchronously.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use chrono::Utc;
use tracing::{error, info, warn};

use crate::config::AppSettings;
use crate::detector::CardDetector;
use crate::error::{SessionError, TransportError};
use crate::kakera::{KakeraReactor, ReactionOutcome};
use crate::model::{LogEntry, LogLevel, RollSummary, SessionParams, SessionState};
use crate::plan::{self, Action, ActionKind, RollPlan};
use crate::slash::SlashCommandCache;
use crate::summary::SummaryAggregator;
use crate::transport::Transport;

/// Bound on the operator-facing event log.
const MAX_LOG_ENTRIES: usize = 200;

/// State shared between the worker task and the console, guarded by one lock.
/// Written exclusively by the worker (and `start`/`request_stop`).
struct Shared {
    state: SessionState,
    summary: Option<RollSummary>,
    logs: VecDeque<LogEntry>,
}

/// Public surface for running sessions and reading their progress.
pub struct SessionCoordinator {
    transport: Arc<dyn Transport>,
    settings: AppSettings,
    shared: Arc<Mutex<Shared>>,
    cancel: Arc<AtomicBool>,
}

impl SessionCoordinator {
    pub fn new(transport: Arc<dyn Transport>, settings: AppSettings) -> Self {
        Self {
            transport,
            settings,
            shared: Arc::new(Mutex::new(Shared {
                state: SessionState::Idle,
                summary: None,
                logs: VecDeque::new(),
            })),
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Start a session executing `params` on a background task.
    ///
    /// Fails with [`SessionError::AlreadyRunning`] while a session is
    /// Running; the running session's state is left untouched.
    pub fn start(
        &self,
        params: SessionParams,
    ) -> Result<tokio::task::JoinHandle<()>, SessionError> {
        let started_at = Utc::now();
        {
            let mut shared = self.shared.lock().expect("session lock poisoned");
            if shared.state == SessionState::Running {
                return Err(SessionError::AlreadyRunning);
            }
            shared.state = SessionState::Running;
            shared.summary = Some(RollSummary::new(started_at));

            let mode = if params.use_slash { "slash" } else { "text" };
            push_log(
                &mut shared.logs,
                LogLevel::Success,
                format!(
                    "Launching session: {} rolls, then {} boosted uses via {mode} commands",
                    params.roll_count, params.boost_total
                ),
            );
        }
        self.cancel.store(false, Ordering::SeqCst);

        let worker = SessionWorker {
            transport: Arc::clone(&self.transport),
            settings: self.settings.clone(),
            shared: Arc::clone(&self.shared),
            cancel: Arc::clone(&self.cancel),
            aggregator: SummaryAggregator::new(started_at),
            plan: plan::build(params.roll_count, params.boost_total, plan::MAX_BOOST_CHUNK),
            params,
        };
        Ok(tokio::spawn(worker.run()))
    }

    /// Request a cooperative stop. The worker observes the flag between
    /// actions; nothing in flight is interrupted.
    pub fn request_stop(&self) {
        if self.current_state() != SessionState::Running {
            return;
        }
        self.cancel.store(true, Ordering::SeqCst);
        let mut shared = self.shared.lock().expect("session lock poisoned");
        push_log(
            &mut shared.logs,
            LogLevel::Warning,
            "Stop requested; finishing the current action".to_string(),
        );
    }

    pub fn current_state(&self) -> SessionState {
        self.shared.lock().expect("session lock poisoned").state
    }

    /// Snapshot of the running (or last) session summary.
    pub fn summary_snapshot(&self) -> Option<RollSummary> {
        self.shared
            .lock()
            .expect("session lock poisoned")
            .summary
            .clone()
    }

    /// The most recent `n` log entries, oldest first.
    pub fn recent_log(&self, n: usize) -> Vec<LogEntry> {
        let shared = self.shared.lock().expect("session lock poisoned");
        let skip = shared.logs.len().saturating_sub(n);
        shared.logs.iter().skip(skip).cloned().collect()
    }
}

fn push_log(logs: &mut VecDeque<LogEntry>, level: LogLevel, message: String) {
    match level {
        LogLevel::Info | LogLevel::Success => info!("{message}"),
        LogLevel::Warning => warn!("{message}"),
        LogLevel::Error => error!("{message}"),
    }
    logs.push_back(LogEntry::new(level, message));
    while logs.len() > MAX_LOG_ENTRIES {
        logs.pop_front();
    }
}

/// Executes one roll plan to a terminal state.
struct SessionWorker {
    transport: Arc<dyn Transport>,
    settings: AppSettings,
    shared: Arc<Mutex<Shared>>,
    cancel: Arc<AtomicBool>,
    aggregator: SummaryAggregator,
    plan: RollPlan,
    params: SessionParams,
}

impl SessionWorker {
    async fn run(mut self) {
        let detector = CardDetector::new(
            Arc::clone(&self.transport),
            self.settings.discord.mudae_user_id.clone(),
            self.settings.tuning.message_history_limit,
        );

        // Baseline sync: cards already in history belong to no session.
        let mut cursor = match detector.sync_baseline().await {
            Ok(cursor) => cursor,
            Err(e) => {
                self.log(LogLevel::Error, format!("Baseline sync failed: {e}"));
                self.finish(SessionState::Failed);
                return;
            }
        };

        let slash = self.params.use_slash.then(|| {
            SlashCommandCache::new(
                Arc::clone(&self.transport),
                self.settings.discord.slash_roll_command_path(),
            )
        });
        let reactor = self.params.use_slash.then(|| {
            KakeraReactor::new(
                Arc::clone(&self.transport),
                self.settings.discord.mudae_user_id.clone(),
                self.params.kakera_mode,
                &self.settings.kakera.preferred_types,
                self.settings.tuning.poll_interval,
            )
        });
        let mut energy_depleted = false;

        let total = self.plan.len();
        for action in self.plan.actions().to_vec() {
            if self.cancel.load(Ordering::SeqCst) {
                self.log(
                    LogLevel::Warning,
                    format!("Session stopped after action {}/{total}", action.index),
                );
                self.finish(SessionState::Completed);
                return;
            }

            if action.kind == ActionKind::Sentinel {
                // Bookkeeping entry: counted, never sent.
                self.aggregator.record_action();
                let summary = self.aggregator.snapshot();
                self.log(
                    LogLevel::Success,
                    format!(
                        "Session complete: {} messages sent, {} cards detected",
                        summary.messages_sent, summary.cards_detected
                    ),
                );
                self.finish(SessionState::Completed);
                return;
            }

            match self.issue(&action, slash.as_ref()).await {
                Ok(()) => {
                    self.aggregator.record_action();
                    self.publish_summary();
                    self.log(
                        LogLevel::Info,
                        format!(
                            "{} {}/{total} sent",
                            describe(&action.kind),
                            action.index + 1
                        ),
                    );
                    tokio::time::sleep(self.settings.tuning.roll_delay).await;
                }
                Err(e) if e.is_fatal() => {
                    self.log(LogLevel::Error, format!("Session aborted: {e}"));
                    self.finish(SessionState::Failed);
                    return;
                }
                Err(e) => {
                    // Non-fatal: skip this action, no retry.
                    self.log(
                        LogLevel::Warning,
                        format!(
                            "{} {}/{total} failed, skipping: {e}",
                            describe(&action.kind),
                            action.index + 1
                        ),
                    );
                    continue;
                }
            }

            match detector.poll(&cursor).await {
                Ok((next, events)) => {
                    cursor = next;
                    if !events.is_empty() {
                        self.aggregator.record_cards(&events);
                        self.publish_summary();
                        for event in &events {
                            self.log(
                                LogLevel::Success,
                                format!("Card detected: {}", event.title),
                            );
                        }
                        // React to the newest card only.
                        if let (Some(reactor), Some(newest)) = (&reactor, events.last()) {
                            if !energy_depleted
                                && reactor.has_targets()
                                && reactor.react(newest).await
                                    == ReactionOutcome::EnergyDepleted
                            {
                                energy_depleted = true;
                                self.log(
                                    LogLevel::Warning,
                                    "Kakera energy depleted; reactions disabled".to_string(),
                                );
                            }
                        }
                    }
                }
                Err(e) if e.is_fatal() => {
                    self.log(LogLevel::Error, format!("Session aborted: {e}"));
                    self.finish(SessionState::Failed);
                    return;
                }
                Err(e) => {
                    self.log(LogLevel::Warning, format!("Card poll failed: {e}"));
                }
            }
        }

        // Plans always end with a sentinel; reaching here means the plan was
        // somehow empty. Close the session anyway.
        self.finish(SessionState::Completed);
    }

    async fn issue(
        &self,
        action: &Action,
        slash: Option<&SlashCommandCache>,
    ) -> Result<(), TransportError> {
        let prefix = &self.settings.discord.command_prefix;
        match action.kind {
            ActionKind::Roll => {
                if let Some(cache) = slash {
                    if let Some(definition) = cache.resolve().await {
                        return self.transport.invoke_slash(definition, cache.path()).await;
                    }
                    // Discovery failed earlier: text fallback for the session.
                }
                let command = format!("{prefix}{}", self.settings.discord.slash_roll_command);
                self.transport.send_text(&command).await.map(|_| ())
            }
            ActionKind::Boost { amount } => {
                let command = format!("{prefix}us {amount}");
                self.transport.send_text(&command).await.map(|_| ())
            }
            ActionKind::Sentinel => Ok(()),
        }
    }

    fn publish_summary(&self) {
        let mut shared = self.shared.lock().expect("session lock poisoned");
        shared.summary = Some(self.aggregator.snapshot());
    }

    fn log(&self, level: LogLevel, message: String) {
        let mut shared = self.shared.lock().expect("session lock poisoned");
        push_log(&mut shared.logs, level, message);
    }

    /// Stamp the summary and enter a terminal state.
    fn finish(&mut self, state: SessionState) {
        debug_assert!(state.is_terminal());
        self.aggregator.finalize();
        let mut shared = self.shared.lock().expect("session lock poisoned");
        shared.summary = Some(self.aggregator.snapshot());
        shared.state = state;
    }
}

fn describe(kind: &ActionKind) -> &'static str {
    match kind {
        ActionKind::Roll => "Roll",
        ActionKind::Boost { .. } => "Boost",
        ActionKind::Sentinel => "Sentinel",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recent_log_returns_last_entries_oldest_first() {
        let mut logs = VecDeque::new();
        for i in 0..10 {
            push_log(&mut logs, LogLevel::Info, format!("entry {i}"));
        }
        let shared = Shared {
            state: SessionState::Idle,
            summary: None,
            logs,
        };
        let coordinator = SessionCoordinator {
            transport: Arc::new(crate::transport::tests_support::NullTransport),
            settings: crate::transport::tests_support::test_settings(),
            shared: Arc::new(Mutex::new(shared)),
            cancel: Arc::new(AtomicBool::new(false)),
        };

        let tail = coordinator.recent_log(3);
        let messages: Vec<_> = tail.iter().map(|e| e.message.as_str()).collect();
        assert_eq!(messages, ["entry 7", "entry 8", "entry 9"]);
    }

    #[test]
    fn log_ring_is_bounded() {
        let mut logs = VecDeque::new();
        for i in 0..(MAX_LOG_ENTRIES + 50) {
            push_log(&mut logs, LogLevel::Info, format!("entry {i}"));
        }
        assert_eq!(logs.len(), MAX_LOG_ENTRIES);
        assert_eq!(logs.front().unwrap().message, "entry 50");
    }

    #[test]
    fn request_stop_outside_running_is_a_noop() {
        let coordinator = SessionCoordinator::new(
            Arc::new(crate::transport::tests_support::NullTransport),
            crate::transport::tests_support::test_settings(),
        );
        coordinator.request_stop();
        assert_eq!(coordinator.current_state(), SessionState::Idle);
        assert!(coordinator.recent_log(10).is_empty());
    }
}
