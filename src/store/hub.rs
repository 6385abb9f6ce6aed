//! Live query and change feed fan-out.
//!
//! Every store engine owns a `ChangeHub`. After each write the engine hands the
//! hub the before/after snapshots plus a way to compute the current result set
//! for a status; the hub re-emits the full set to every live query touching
//! that status and queues one change event per registered change stream.

use std::collections::HashMap;
use std::sync::Mutex;

use tokio::sync::{mpsc, watch};

use crate::core::{HelpRequest, RequestStatus};

/// One write to the help request collection.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeEvent {
    /// Id of the written document.
    pub document_id: String,
    /// Snapshot before the write; `None` on create.
    pub before: Option<HelpRequest>,
    /// Snapshot after the write; `None` on delete.
    pub after: Option<HelpRequest>,
}

impl ChangeEvent {
    /// Event for a newly created document.
    pub fn created(after: HelpRequest) -> Self {
        Self {
            document_id: after.id.clone(),
            before: None,
            after: Some(after),
        }
    }

    /// Event for an updated document.
    pub fn updated(before: HelpRequest, after: HelpRequest) -> Self {
        Self {
            document_id: after.id.clone(),
            before: Some(before),
            after: Some(after),
        }
    }

    /// Event for a deleted document.
    pub fn deleted(before: HelpRequest) -> Self {
        Self {
            document_id: before.id.clone(),
            before: Some(before),
            after: None,
        }
    }

    /// Statuses whose result sets this write may have changed.
    pub fn touched_statuses(&self) -> Vec<RequestStatus> {
        let mut statuses: Vec<RequestStatus> = self
            .before
            .iter()
            .chain(self.after.iter())
            .map(|r| r.status)
            .collect();
        statuses.sort();
        statuses.dedup();
        statuses
    }
}

/// A live, push-based query over one status.
///
/// Each delivery is the complete current result set, never a diff. Dropping
/// the query releases the subscription.
#[derive(Debug)]
pub struct LiveQuery {
    status: RequestStatus,
    rx: watch::Receiver<Vec<HelpRequest>>,
}

impl LiveQuery {
    /// The status this query filters on.
    pub fn status(&self) -> RequestStatus {
        self.status
    }

    /// The last delivered result set, marking it as seen.
    pub fn current(&mut self) -> Vec<HelpRequest> {
        self.rx.borrow_and_update().clone()
    }

    /// Wait for the next result set.
    ///
    /// Returns `None` once the store has gone away.
    pub async fn next(&mut self) -> Option<Vec<HelpRequest>> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }
}

/// Receiving half of the change feed.
#[derive(Debug)]
pub struct ChangeStream {
    rx: mpsc::UnboundedReceiver<ChangeEvent>,
}

impl ChangeStream {
    /// Wait for the next change event.
    pub async fn recv(&mut self) -> Option<ChangeEvent> {
        self.rx.recv().await
    }

    /// Take a queued change event without waiting.
    pub fn try_recv(&mut self) -> Option<ChangeEvent> {
        self.rx.try_recv().ok()
    }
}

/// Fan-out point shared by the store engines.
#[derive(Debug)]
pub struct ChangeHub {
    views: HashMap<RequestStatus, watch::Sender<Vec<HelpRequest>>>,
    listeners: Mutex<Vec<mpsc::UnboundedSender<ChangeEvent>>>,
}

impl ChangeHub {
    /// Create a hub seeded with the documents already in the store.
    pub fn new(existing: &[HelpRequest]) -> Self {
        let views = RequestStatus::all()
            .iter()
            .map(|status| {
                let (tx, _) = watch::channel(filter_sorted(existing.iter(), *status));
                (*status, tx)
            })
            .collect();
        Self {
            views,
            listeners: Mutex::new(Vec::new()),
        }
    }

    /// Open a live query for a status.
    pub fn subscribe(&self, status: RequestStatus) -> LiveQuery {
        LiveQuery {
            status,
            rx: self.sender(status).subscribe(),
        }
    }

    /// Register a change stream. Only writes after this call are delivered.
    pub fn changes(&self) -> ChangeStream {
        let (tx, rx) = mpsc::unbounded_channel();
        self.lock_listeners().push(tx);
        ChangeStream { rx }
    }

    /// Number of open live queries for a status.
    pub fn active_subscriptions(&self, status: RequestStatus) -> usize {
        self.sender(status).receiver_count()
    }

    /// Publish one write.
    ///
    /// `documents` must be the full collection after the write. Engines call
    /// this while still holding their write lock so that deliveries follow
    /// write order.
    pub fn publish<'a>(
        &self,
        event: ChangeEvent,
        documents: impl Iterator<Item = &'a HelpRequest> + Clone,
    ) {
        for status in event.touched_statuses() {
            let set = filter_sorted(documents.clone(), status);
            self.sender(status).send_replace(set);
        }

        tracing::debug!(
            request_id = %event.document_id,
            before = ?event.before.as_ref().map(|r| r.status),
            after = ?event.after.as_ref().map(|r| r.status),
            "published help request change"
        );
        self.lock_listeners()
            .retain(|tx| tx.send(event.clone()).is_ok());
    }

    /// Re-emit every result set that differs from the last delivery.
    pub fn refresh<'a>(&self, documents: impl Iterator<Item = &'a HelpRequest> + Clone) {
        for status in RequestStatus::all() {
            let set = filter_sorted(documents.clone(), *status);
            self.sender(*status).send_if_modified(|current| {
                if *current == set {
                    false
                } else {
                    *current = set;
                    true
                }
            });
        }
    }

    fn sender(&self, status: RequestStatus) -> &watch::Sender<Vec<HelpRequest>> {
        // Both statuses are inserted in `new`.
        &self.views[&status]
    }

    fn lock_listeners(&self) -> std::sync::MutexGuard<'_, Vec<mpsc::UnboundedSender<ChangeEvent>>> {
        self.listeners
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Matching documents ordered by arrival, then id.
fn filter_sorted<'a>(
    documents: impl Iterator<Item = &'a HelpRequest>,
    status: RequestStatus,
) -> Vec<HelpRequest> {
    let mut set: Vec<HelpRequest> = documents.filter(|r| r.status == status).cloned().collect();
    set.sort_by(|a, b| a.received_at.cmp(&b.received_at).then_with(|| a.id.cmp(&b.id)));
    set
}
