//! Slash command discovery and memoization.
//!
//! Resolving a slash command requires a remote lookup that can be slow or
//! fail outright. The cache performs discovery once per session; on failure
//! it logs once and keeps returning `None`, which the executor treats as
//! "fall back to text commands" for the rest of the session.

use std::sync::Arc;

use tokio::sync::OnceCell;
use tracing::{error, info};

use crate::model::CommandDefinition;
use crate::transport::Transport;

pub struct SlashCommandCache {
    transport: Arc<dyn Transport>,
    path: Vec<String>,
    cell: OnceCell<Option<CommandDefinition>>,
}

impl SlashCommandCache {
    pub fn new(transport: Arc<dyn Transport>, path: Vec<String>) -> Self {
        Self {
            transport,
            path,
            cell: OnceCell::new(),
        }
    }

    pub fn path(&self) -> &[String] {
        &self.path
    }

    /// The memoized command definition.
    ///
    /// The first call performs remote discovery; every later call returns
    /// the cached result, including a cached failure. Discovery is never
    /// retried within one cache lifetime.
    pub async fn resolve(&self) -> Option<&CommandDefinition> {
        self.cell
            .get_or_init(|| async {
                match self.transport.resolve_command(&self.path).await {
                    Ok(definition) => {
                        info!(command = %self.path.join(" "), id = %definition.id,
                            "Slash command resolved");
                        Some(definition)
                    }
                    Err(e) => {
                        error!(command = %self.path.join(" "), error = %e,
                            "Slash command discovery failed; falling back to text commands");
                        None
                    }
                }
            })
            .await
            .as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;
    use crate::model::Message;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingTransport {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait::async_trait]
    impl Transport for CountingTransport {
        async fn send_text(&self, _: &str) -> Result<Message, TransportError> {
            unreachable!()
        }
        async fn invoke_slash(
            &self,
            _: &CommandDefinition,
            _: &[String],
        ) -> Result<(), TransportError> {
            unreachable!()
        }
        async fn fetch_history(&self, _: u8) -> Result<Vec<Message>, TransportError> {
            unreachable!()
        }
        async fn resolve_command(
            &self,
            path: &[String],
        ) -> Result<CommandDefinition, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(TransportError::Http("boom".into()));
            }
            Ok(CommandDefinition {
                id: "9000".into(),
                application_id: "app".into(),
                name: path[0].clone(),
                version: "1".into(),
            })
        }
        async fn click_component(&self, _: &str, _: &str) -> Result<(), TransportError> {
            unreachable!()
        }
    }

    #[tokio::test]
    async fn resolve_performs_discovery_once() {
        let transport = Arc::new(CountingTransport {
            calls: AtomicUsize::new(0),
            fail: false,
        });
        let cache = SlashCommandCache::new(transport.clone(), vec!["wa".into()]);

        let first = cache.resolve().await.expect("definition");
        assert_eq!(first.name, "wa");
        let second = cache.resolve().await.expect("definition");
        assert_eq!(second.id, "9000");

        assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn resolve_caches_failure_without_retry() {
        let transport = Arc::new(CountingTransport {
            calls: AtomicUsize::new(0),
            fail: true,
        });
        let cache = SlashCommandCache::new(transport.clone(), vec!["wa".into()]);

        assert!(cache.resolve().await.is_none());
        assert!(cache.resolve().await.is_none());
        assert!(cache.resolve().await.is_none());

        assert_eq!(
            transport.calls.load(Ordering::SeqCst),
            1,
            "discovery must not be retried within a session"
        );
    }
}
