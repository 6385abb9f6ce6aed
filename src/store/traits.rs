//! Store engine traits for helpdesk.
//!
//! `RequestStore` and `KnowledgeStore` are the typed adapters the rest of the
//! crate depends on. Engines implement both over their own collections.

use std::sync::Arc;

use crate::core::{
    HelpRequest, KnowledgeDraft, KnowledgeEntry, NewHelpRequest, RequestPatch, RequestStatus,
};
use crate::error::Result;
use crate::store::hub::{ChangeStream, LiveQuery};

/// Typed access to the help request collection.
pub trait RequestStore: Send + Sync {
    /// Create a pending request with a store-assigned id and timestamp.
    fn create(&self, request: NewHelpRequest) -> Result<HelpRequest>;

    /// Retrieve a request by ID.
    ///
    /// Returns `Ok(None)` if the request doesn't exist.
    fn get(&self, id: &str) -> Result<Option<HelpRequest>>;

    /// Apply a conditional single-document write.
    ///
    /// Fails with `NotFound` if the document is missing and with
    /// `AlreadyResolved` if the patch's status precondition no longer holds.
    fn update(&self, id: &str, patch: &RequestPatch) -> Result<HelpRequest>;

    /// Delete a request.
    ///
    /// Returns `Ok(None)` if the request doesn't exist.
    fn delete(&self, id: &str) -> Result<Option<HelpRequest>>;

    /// Current requests with the given status, oldest first.
    fn list_by_status(&self, status: RequestStatus) -> Result<Vec<HelpRequest>>;

    /// Open a live query re-delivering the full set for `status` on every
    /// relevant write.
    fn subscribe(&self, status: RequestStatus) -> LiveQuery;

    /// Register for one change event per write to the collection.
    fn changes(&self) -> ChangeStream;

    /// Number of open live queries for a status.
    fn active_subscriptions(&self, status: RequestStatus) -> usize;

    /// Re-read persisted state and republish result sets that changed.
    fn reload(&self) -> Result<()> {
        Ok(())
    }
}

/// Append-only access to the knowledge collection.
pub trait KnowledgeStore: Send + Sync {
    /// Append an entry, assigning its id and timestamp.
    fn append(&self, draft: KnowledgeDraft) -> Result<KnowledgeEntry>;

    /// All entries, oldest first.
    fn list_knowledge(&self) -> Result<Vec<KnowledgeEntry>>;
}

/// Blanket implementation of RequestStore for Arc-wrapped stores.
///
/// This allows sharing one engine between the resolver, the reactor, and
/// the live views.
impl<T: RequestStore + ?Sized> RequestStore for Arc<T> {
    fn create(&self, request: NewHelpRequest) -> Result<HelpRequest> {
        (**self).create(request)
    }

    fn get(&self, id: &str) -> Result<Option<HelpRequest>> {
        (**self).get(id)
    }

    fn update(&self, id: &str, patch: &RequestPatch) -> Result<HelpRequest> {
        (**self).update(id, patch)
    }

    fn delete(&self, id: &str) -> Result<Option<HelpRequest>> {
        (**self).delete(id)
    }

    fn list_by_status(&self, status: RequestStatus) -> Result<Vec<HelpRequest>> {
        (**self).list_by_status(status)
    }

    fn subscribe(&self, status: RequestStatus) -> LiveQuery {
        (**self).subscribe(status)
    }

    fn changes(&self) -> ChangeStream {
        (**self).changes()
    }

    fn active_subscriptions(&self, status: RequestStatus) -> usize {
        (**self).active_subscriptions(status)
    }

    fn reload(&self) -> Result<()> {
        (**self).reload()
    }
}

/// Blanket implementation of KnowledgeStore for Arc-wrapped stores.
impl<T: KnowledgeStore + ?Sized> KnowledgeStore for Arc<T> {
    fn append(&self, draft: KnowledgeDraft) -> Result<KnowledgeEntry> {
        (**self).append(draft)
    }

    fn list_knowledge(&self) -> Result<Vec<KnowledgeEntry>> {
        (**self).list_knowledge()
    }
}
