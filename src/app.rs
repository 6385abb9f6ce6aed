//! Application wiring.
//!
//! `Helpdesk` owns one shared store, runs the resolution trigger on that
//! store's change feed, and hands out the client-side pieces: request intake,
//! the resolution transaction, and live views.

use std::sync::Arc;

use crate::config::{Config, ReactorConfig, StoreConfig};
use crate::core::{HelpRequest, NewHelpRequest};
use crate::error::{HelpdeskError, Result};
use crate::notify::{notifier_from_config, Notifier};
use crate::reactor::{ResolutionReactor, RetryPolicy, RuntimeStats, TriggerRuntime};
use crate::resolve::Resolver;
use crate::store::{FileStore, KnowledgeStore, MemoryStore, RequestStore};
use crate::views::LiveViews;

/// A store engine holding both collections.
pub trait HelpdeskStore: RequestStore + KnowledgeStore {}

impl<T: RequestStore + KnowledgeStore + ?Sized> HelpdeskStore for T {}

/// Open the store engine named by configuration.
pub fn open_store(config: &StoreConfig) -> Result<Arc<dyn HelpdeskStore>> {
    match config.backend.as_str() {
        "memory" => Ok(Arc::new(MemoryStore::new())),
        "file" => {
            let dir = config
                .resolved_data_dir()
                .ok_or_else(|| HelpdeskError::config("could not determine data directory"))?;
            tracing::debug!(data_dir = %dir.display(), "opening file store");
            Ok(Arc::new(FileStore::with_dir(dir)?))
        }
        other => Err(HelpdeskError::config(format!(
            "unknown store backend '{other}'"
        ))),
    }
}

/// A running helpdesk: one store plus its resolution trigger.
pub struct Helpdesk<S: ?Sized> {
    store: Arc<S>,
    trigger: Option<TriggerRuntime>,
}

impl Helpdesk<dyn HelpdeskStore> {
    /// Open the configured store and start the trigger if enabled.
    ///
    /// Must be called inside a tokio runtime.
    pub fn from_config(config: &Config) -> Result<Self> {
        let store = open_store(&config.store)?;
        Ok(Self::start(
            store,
            &config.reactor,
            notifier_from_config(&config.notifier),
        ))
    }
}

impl<S: HelpdeskStore + ?Sized + 'static> Helpdesk<S> {
    /// Wire a store to a notifier.
    ///
    /// Must be called inside a tokio runtime when `reactor.enabled` is set.
    pub fn start(store: Arc<S>, reactor: &ReactorConfig, notifier: Arc<dyn Notifier>) -> Self {
        let trigger = if reactor.enabled {
            Some(TriggerRuntime::spawn(
                store.changes(),
                ResolutionReactor::new(Arc::clone(&store), notifier),
                RetryPolicy::from_config(reactor),
            ))
        } else {
            tracing::debug!("resolution trigger disabled");
            None
        };
        Self { store, trigger }
    }

    /// The shared store.
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Whether the resolution trigger runs in this process.
    pub fn is_reacting(&self) -> bool {
        self.trigger.is_some()
    }

    /// Record a new customer question as a pending request.
    pub fn submit(&self, customer_id: &str, question_text: &str) -> Result<HelpRequest> {
        let customer_id = customer_id.trim();
        let question_text = question_text.trim();
        if customer_id.is_empty() {
            return Err(HelpdeskError::invalid_input("customer_id"));
        }
        if question_text.is_empty() {
            return Err(HelpdeskError::invalid_input("question_text"));
        }

        let request = self
            .store
            .create(NewHelpRequest::new(customer_id, question_text))?;
        tracing::info!(request_id = %request.id, customer_id, "help request received");
        Ok(request)
    }

    /// A resolver bound to this store.
    pub fn resolver(&self) -> Resolver<Arc<S>, Arc<S>> {
        Resolver::new(Arc::clone(&self.store), Arc::clone(&self.store))
    }

    /// Open the pending and resolved live views.
    pub fn live_views(&self) -> LiveViews {
        LiveViews::open(&self.store)
    }

    /// Stop the trigger after it has handled every write made so far.
    pub async fn shutdown(self) -> Option<RuntimeStats> {
        match self.trigger {
            Some(trigger) => Some(trigger.shutdown().await),
            None => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{KnowledgeOrigin, RequestStatus};
    use crate::notify::tests::RecordingNotifier;
    use std::collections::BTreeSet;
    use tempfile::TempDir;

    fn start_memory(reactor: ReactorConfig) -> (Helpdesk<MemoryStore>, Arc<RecordingNotifier>) {
        let notifier = Arc::new(RecordingNotifier::default());
        let helpdesk = Helpdesk::start(
            Arc::new(MemoryStore::new()),
            &reactor,
            Arc::clone(&notifier) as Arc<dyn Notifier>,
        );
        (helpdesk, notifier)
    }

    #[tokio::test]
    async fn test_resolution_writes_both_knowledge_entries() {
        let (helpdesk, notifier) = start_memory(ReactorConfig::default());
        let store = Arc::clone(helpdesk.store());

        let request = helpdesk
            .submit("simulated_customer_123", "How do I reset my password?")
            .unwrap();
        let resolution = helpdesk
            .resolver()
            .resolve(&request.id, "Use the 'forgot password' link", "Account")
            .unwrap();
        assert_eq!(resolution.request.status, RequestStatus::Resolved);

        let stats = helpdesk.shutdown().await.unwrap();
        assert_eq!(stats.fired, 1);
        assert_eq!(notifier.sent_count(), 1);

        let entries = store.list_knowledge().unwrap();
        assert_eq!(entries.len(), 2);

        let client: Vec<_> = entries.iter().filter(|e| !e.is_trigger_authored()).collect();
        let trigger: Vec<_> = entries.iter().filter(|e| e.is_trigger_authored()).collect();
        assert_eq!(client.len(), 1);
        assert_eq!(trigger.len(), 1);

        assert_eq!(client[0].category(), Some("Account"));
        let expected: BTreeSet<String> = ["do", "i", "reset", "my", "password"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(client[0].question_keywords(), Some(&expected));

        assert_eq!(trigger[0].category(), None);
        assert_eq!(trigger[0].question_keywords(), None);
        assert!(matches!(trigger[0].origin, KnowledgeOrigin::Trigger { .. }));
        assert_eq!(trigger[0].answer_text, client[0].answer_text);
    }

    #[tokio::test]
    async fn test_disabled_trigger_records_only_client_entry() {
        let (helpdesk, notifier) = start_memory(ReactorConfig {
            enabled: false,
            ..Default::default()
        });
        assert!(!helpdesk.is_reacting());
        let store = Arc::clone(helpdesk.store());

        let request = helpdesk.submit("cust", "Is parking free?").unwrap();
        helpdesk
            .resolver()
            .resolve(&request.id, "Yes", "Facilities")
            .unwrap();

        assert!(helpdesk.shutdown().await.is_none());
        assert_eq!(notifier.sent_count(), 0);
        assert_eq!(store.list_knowledge().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_submit_rejects_blank_input() {
        let (helpdesk, _) = start_memory(ReactorConfig::default());

        let err = helpdesk.submit("  ", "Is parking free?").unwrap_err();
        assert!(matches!(err, HelpdeskError::InvalidInput { field: "customer_id" }));
        let err = helpdesk.submit("cust", "\n").unwrap_err();
        assert!(matches!(err, HelpdeskError::InvalidInput { field: "question_text" }));

        assert!(helpdesk.store().is_empty());
        helpdesk.shutdown().await;
    }

    #[tokio::test]
    async fn test_submit_trims_input() {
        let (helpdesk, _) = start_memory(ReactorConfig::default());
        let request = helpdesk.submit(" cust-7 ", "  Any refunds?  ").unwrap();
        assert_eq!(request.customer_id, "cust-7");
        assert_eq!(request.question_text, "Any refunds?");
        assert_eq!(request.status, RequestStatus::Pending);
        helpdesk.shutdown().await;
    }

    #[tokio::test]
    async fn test_from_config_opens_file_store() {
        let temp = TempDir::new().unwrap();
        let config = Config {
            store: StoreConfig {
                data_dir: temp.path().display().to_string(),
                ..Default::default()
            },
            ..Default::default()
        };

        let helpdesk = Helpdesk::from_config(&config).unwrap();
        let request = helpdesk.submit("cust", "Do you sell gift cards?").unwrap();
        helpdesk.shutdown().await;

        assert!(temp
            .path()
            .join("help_requests")
            .join(format!("{}.json", request.id))
            .exists());
    }

    #[test]
    fn test_open_store_rejects_unknown_backend() {
        let config = StoreConfig {
            backend: "postgres".to_string(),
            ..Default::default()
        };
        let err = open_store(&config).err().unwrap();
        assert!(matches!(err, HelpdeskError::Config { .. }));
    }
}
