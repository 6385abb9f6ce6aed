//! In-memory store engine.
//!
//! Thread-safe implementation of both collections using `RwLock<HashMap>`.
//! Documents are lost when the store is dropped.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::Utc;
use uuid::Uuid;

use crate::core::{
    HelpRequest, KnowledgeDraft, KnowledgeEntry, NewHelpRequest, RequestPatch, RequestStatus,
};
use crate::error::{HelpdeskError, Result};
use crate::store::hub::{ChangeEvent, ChangeHub, ChangeStream, LiveQuery};
use crate::store::{KnowledgeStore, RequestStore};

/// In-memory store engine.
#[derive(Debug)]
pub struct MemoryStore {
    requests: RwLock<HashMap<String, HelpRequest>>,
    knowledge: RwLock<Vec<KnowledgeEntry>>,
    hub: ChangeHub,
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            requests: RwLock::new(HashMap::new()),
            knowledge: RwLock::new(Vec::new()),
            hub: ChangeHub::new(&[]),
        }
    }

    /// Check if the store holds no help requests.
    pub fn is_empty(&self) -> bool {
        self.read_requests().is_empty()
    }

    fn read_requests(&self) -> RwLockReadGuard<'_, HashMap<String, HelpRequest>> {
        self.requests
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_requests(&self) -> RwLockWriteGuard<'_, HashMap<String, HelpRequest>> {
        self.requests
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestStore for MemoryStore {
    fn create(&self, request: NewHelpRequest) -> Result<HelpRequest> {
        let created = request.into_request(Uuid::new_v4().to_string());
        let mut requests = self.write_requests();
        requests.insert(created.id.clone(), created.clone());
        self.hub
            .publish(ChangeEvent::created(created.clone()), requests.values());
        Ok(created)
    }

    fn get(&self, id: &str) -> Result<Option<HelpRequest>> {
        Ok(self.read_requests().get(id).cloned())
    }

    fn update(&self, id: &str, patch: &RequestPatch) -> Result<HelpRequest> {
        let mut requests = self.write_requests();
        let before = requests
            .get(id)
            .cloned()
            .ok_or_else(|| HelpdeskError::not_found(id))?;
        let after = before.apply(patch, Utc::now())?;
        requests.insert(id.to_string(), after.clone());
        self.hub
            .publish(ChangeEvent::updated(before, after.clone()), requests.values());
        Ok(after)
    }

    fn delete(&self, id: &str) -> Result<Option<HelpRequest>> {
        let mut requests = self.write_requests();
        let Some(removed) = requests.remove(id) else {
            return Ok(None);
        };
        self.hub
            .publish(ChangeEvent::deleted(removed.clone()), requests.values());
        Ok(Some(removed))
    }

    fn list_by_status(&self, status: RequestStatus) -> Result<Vec<HelpRequest>> {
        let mut result: Vec<HelpRequest> = self
            .read_requests()
            .values()
            .filter(|r| r.status == status)
            .cloned()
            .collect();
        result.sort_by(|a, b| a.received_at.cmp(&b.received_at).then_with(|| a.id.cmp(&b.id)));
        Ok(result)
    }

    fn subscribe(&self, status: RequestStatus) -> LiveQuery {
        self.hub.subscribe(status)
    }

    fn changes(&self) -> ChangeStream {
        self.hub.changes()
    }

    fn active_subscriptions(&self, status: RequestStatus) -> usize {
        self.hub.active_subscriptions(status)
    }
}

impl KnowledgeStore for MemoryStore {
    fn append(&self, draft: KnowledgeDraft) -> Result<KnowledgeEntry> {
        let entry = draft.into_entry(Uuid::new_v4().to_string(), Utc::now());
        self.knowledge
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(entry.clone());
        Ok(entry)
    }

    fn list_knowledge(&self) -> Result<Vec<KnowledgeEntry>> {
        Ok(self
            .knowledge
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone())
    }
}
