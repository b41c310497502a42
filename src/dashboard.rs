//! Operator console — stdin/stdout command loop.
//!
//! A thin surface over the session coordinator: it edits session parameters,
//! starts/stops sessions, and prints read-only snapshots. All session state
//! lives in the coordinator; the console never mutates it directly.

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};

use crate::model::{KakeraReactionMode, LogLevel, SessionParams, SessionState};
use crate::session::SessionCoordinator;

pub struct Dashboard {
    coordinator: Arc<SessionCoordinator>,
    params: SessionParams,
}

impl Dashboard {
    pub fn new(coordinator: Arc<SessionCoordinator>, default_boost: u32) -> Self {
        Self {
            coordinator,
            params: SessionParams {
                boost_total: default_boost,
                ..Default::default()
            },
        }
    }

    /// Run the console until `quit` or EOF.
    pub async fn run(mut self) -> anyhow::Result<()> {
        println!("Mudae Assist — type 'help' for commands.");
        self.print_params();
        print_prompt();

        let stdin = tokio::io::stdin();
        let reader = BufReader::new(stdin);
        let mut lines = reader.lines();

        while let Some(line) = lines.next_line().await? {
            let line = line.trim();
            if line.is_empty() {
                print_prompt();
                continue;
            }
            if !self.handle(line) {
                break;
            }
            print_prompt();
        }

        self.coordinator.request_stop();
        Ok(())
    }

    /// Handle one command line. Returns false to exit.
    fn handle(&mut self, line: &str) -> bool {
        let mut parts = line.split_whitespace();
        let command = parts.next().unwrap_or_default();
        let arg = parts.next();

        match command {
            "help" => print_help(),
            "roll" => match arg.and_then(|a| a.parse::<u32>().ok()) {
                Some(n) => {
                    self.params.roll_count = n;
                    println!("Rolls set to {n}");
                }
                None => println!("Usage: roll <count>"),
            },
            "boost" => match arg.and_then(|a| a.parse::<u32>().ok()) {
                Some(n) => {
                    self.params.boost_total = n;
                    println!("Boost uses set to {n}");
                }
                None => println!("Usage: boost <uses>"),
            },
            "slash" => match arg {
                Some("on") => {
                    self.params.use_slash = true;
                    println!("Rolling via slash commands");
                }
                Some("off") => {
                    self.params.use_slash = false;
                    println!("Rolling via text commands");
                }
                _ => println!("Usage: slash on|off"),
            },
            "kakera" => match arg {
                Some("p") => {
                    self.params.kakera_mode = KakeraReactionMode::PurpleOnly;
                    println!("Kakera mode: purple only");
                }
                Some("preferred") => {
                    self.params.kakera_mode = KakeraReactionMode::Preferred;
                    println!("Kakera mode: preferred order");
                }
                _ => println!("Usage: kakera p|preferred"),
            },
            "start" => match self.coordinator.start(self.params.clone()) {
                Ok(_) => println!("Session started"),
                Err(e) => println!("{e}"),
            },
            "stop" => {
                self.coordinator.request_stop();
                println!("Stop requested");
            }
            "status" => self.print_status(),
            "log" => {
                let n = arg.and_then(|a| a.parse::<usize>().ok()).unwrap_or(10);
                self.print_log(n);
            }
            "quit" | "q" => return false,
            other => println!("Unknown command: {other} (try 'help')"),
        }
        true
    }

    fn print_params(&self) {
        let mode = if self.params.use_slash { "slash" } else { "text" };
        println!(
            "Plan: {} rolls, {} boost uses, {mode} mode",
            self.params.roll_count, self.params.boost_total
        );
    }

    fn print_status(&self) {
        let state = self.coordinator.current_state();
        println!("State: {state}");
        self.print_params();

        if let Some(summary) = self.coordinator.summary_snapshot() {
            println!("  Messages sent:  {}", summary.messages_sent);
            println!("  Cards detected: {}", summary.cards_detected);
            println!(
                "  Last card:      {}",
                summary.last_card_title.as_deref().unwrap_or("-")
            );
            match summary.duration() {
                Some(d) => println!("  Duration:       {:.1}s", d.num_milliseconds() as f64 / 1000.0),
                None if state == SessionState::Running => println!("  Duration:       running"),
                None => {}
            }
        }
    }

    fn print_log(&self, n: usize) {
        for entry in self.coordinator.recent_log(n) {
            let marker = match entry.level {
                LogLevel::Info => " ",
                LogLevel::Success => "+",
                LogLevel::Warning => "!",
                LogLevel::Error => "x",
            };
            println!(
                "[{}] {marker} {}",
                entry.created_at.format("%H:%M:%S"),
                entry.message
            );
        }
    }
}

fn print_prompt() {
    eprint!("> ");
}

fn print_help() {
    println!("Commands:");
    println!("  roll <n>            rolls to send before boosting");
    println!("  boost <n>           total $us boost uses to spend");
    println!("  slash on|off        roll via slash or text commands");
    println!("  kakera p|preferred  kakera reaction strategy");
    println!("  start               launch a session");
    println!("  stop                cooperatively stop the running session");
    println!("  status              session state and summary");
    println!("  log [n]             recent event log entries");
    println!("  quit                exit");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::tests_support::{test_settings, NullTransport};

    fn dashboard() -> Dashboard {
        let coordinator = Arc::new(SessionCoordinator::new(
            Arc::new(NullTransport),
            test_settings(),
        ));
        Dashboard::new(coordinator, 5)
    }

    #[test]
    fn default_params_use_configured_boost() {
        let d = dashboard();
        assert_eq!(d.params.boost_total, 5);
        assert_eq!(d.params.roll_count, 0);
        assert!(!d.params.use_slash);
    }

    #[test]
    fn handle_updates_parameters() {
        let mut d = dashboard();
        assert!(d.handle("roll 12"));
        assert!(d.handle("boost 40"));
        assert!(d.handle("slash on"));
        assert!(d.handle("kakera p"));

        assert_eq!(d.params.roll_count, 12);
        assert_eq!(d.params.boost_total, 40);
        assert!(d.params.use_slash);
        assert_eq!(d.params.kakera_mode, KakeraReactionMode::PurpleOnly);
    }

    #[test]
    fn handle_rejects_garbage_without_mutating() {
        let mut d = dashboard();
        assert!(d.handle("roll banana"));
        assert!(d.handle("slash maybe"));
        assert_eq!(d.params.roll_count, 0);
        assert!(!d.params.use_slash);
    }

    #[test]
    fn quit_ends_the_loop() {
        let mut d = dashboard();
        assert!(!d.handle("quit"));
        assert!(!d.handle("q"));
    }
}
