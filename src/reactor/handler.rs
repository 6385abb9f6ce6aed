//! The resolution-trigger reactor.
//!
//! Runs once per help request write. On the `Pending -> Resolved` edge it
//! notifies the customer and appends a trigger-authored knowledge entry. The
//! two side effects are attempted independently; if either fails the whole
//! reaction is reported as a `ReactorFailure` so the hosting runtime can
//! redeliver. Redelivery repeats both side effects.

use crate::core::KnowledgeEntry;
use crate::error::{HelpdeskError, Result};
use crate::notify::Notifier;
use crate::reactor::reaction::plan_reaction;
use crate::store::{ChangeEvent, KnowledgeStore};

/// Outcome of handling one change event.
#[derive(Debug, Clone, PartialEq)]
pub enum Reaction {
    /// The write was not a resolution.
    Ignored,
    /// The resolution side effects completed.
    Resolved {
        /// Id of the resolved request.
        request_id: String,
        /// The trigger-authored entry that was appended.
        knowledge: KnowledgeEntry,
    },
}

/// Server-side callback invoked once per write to the request collection.
pub trait ChangeHandler: Send + Sync {
    /// Handle one change event.
    fn handle(&self, event: &ChangeEvent) -> Result<Reaction>;
}

/// Reacts to resolved help requests.
#[derive(Debug, Clone)]
pub struct ResolutionReactor<K, N> {
    knowledge: K,
    notifier: N,
}

impl<K: KnowledgeStore, N: Notifier> ResolutionReactor<K, N> {
    /// Create a reactor writing to `knowledge` and notifying through `notifier`.
    pub fn new(knowledge: K, notifier: N) -> Self {
        Self {
            knowledge,
            notifier,
        }
    }
}

impl<K: KnowledgeStore, N: Notifier> ChangeHandler for ResolutionReactor<K, N> {
    fn handle(&self, event: &ChangeEvent) -> Result<Reaction> {
        let action = match plan_reaction(event) {
            Ok(Some(action)) => action,
            Ok(None) => return Ok(Reaction::Ignored),
            Err(err) => return Err(HelpdeskError::reactor(&event.document_id, err.to_string())),
        };
        tracing::info!(request_id = %action.request_id, "help request was resolved");

        let notified = self.notifier.notify(&action.notification);
        if let Err(err) = &notified {
            tracing::error!(
                request_id = %action.request_id,
                notifier = self.notifier.name(),
                error = %err,
                "failed to notify customer"
            );
        }

        let recorded = self.knowledge.append(action.knowledge);
        match &recorded {
            Ok(entry) => tracing::info!(
                request_id = %action.request_id,
                knowledge_id = %entry.id,
                "updated the knowledge base"
            ),
            Err(err) => tracing::error!(
                request_id = %action.request_id,
                error = %err,
                "failed to update the knowledge base"
            ),
        }

        match (notified, recorded) {
            (Ok(()), Ok(knowledge)) => Ok(Reaction::Resolved {
                request_id: action.request_id,
                knowledge,
            }),
            (notified, recorded) => {
                let failures: Vec<String> = [
                    notified.err().map(|e| format!("notify: {e}")),
                    recorded.err().map(|e| format!("knowledge: {e}")),
                ]
                .into_iter()
                .flatten()
                .collect();
                Err(HelpdeskError::reactor(action.request_id, failures.join("; ")))
            }
        }
    }
}
