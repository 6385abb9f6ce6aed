//! File-based store engine.
//!
//! Each document is a JSON file: help requests live in
//! `<data_dir>/help_requests/<id>.json`, knowledge entries in
//! `<data_dir>/knowledge_base/<id>.json`. Writes go through a temp file and a
//! rename. Conditional writes to the request collection hold an exclusive
//! lock on `help_requests/.lock`, so handles in different processes see each
//! other's commits. Live queries and change events are delivered in-process
//! only; `reload` picks up documents written by other processes.

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockWriteGuard};

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use uuid::Uuid;

use crate::core::{
    HelpRequest, KnowledgeDraft, KnowledgeEntry, NewHelpRequest, RequestPatch, RequestStatus,
};
use crate::error::{HelpdeskError, Result};
use crate::store::hub::{ChangeEvent, ChangeHub, ChangeStream, LiveQuery};
use crate::store::{KnowledgeStore, RequestStore};

/// Directory name of the help request collection.
pub const REQUESTS_COLLECTION: &str = "help_requests";

/// Directory name of the knowledge collection.
pub const KNOWLEDGE_COLLECTION: &str = "knowledge_base";

/// Lock file guarding read-modify-write on the request collection.
const LOCK_FILE: &str = ".lock";

/// File-based store engine.
#[derive(Debug)]
pub struct FileStore {
    requests_dir: PathBuf,
    knowledge_dir: PathBuf,
    /// Last known state of the request collection; also the write lock.
    cache: RwLock<HashMap<String, HelpRequest>>,
    hub: ChangeHub,
}

impl FileStore {
    /// Open the store in a custom directory, creating it if needed.
    pub fn with_dir(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        let requests_dir = dir.join(REQUESTS_COLLECTION);
        let knowledge_dir = dir.join(KNOWLEDGE_COLLECTION);
        for collection in [&requests_dir, &knowledge_dir] {
            if !collection.exists() {
                fs::create_dir_all(collection)
                    .map_err(|e| HelpdeskError::storage(collection, e))?;
            }
        }

        let existing: Vec<HelpRequest> = read_collection(&requests_dir)?;
        let hub = ChangeHub::new(&existing);
        let cache = existing.into_iter().map(|r| (r.id.clone(), r)).collect();

        Ok(Self {
            requests_dir,
            knowledge_dir,
            cache: RwLock::new(cache),
            hub,
        })
    }

    fn request_path(&self, id: &str) -> PathBuf {
        self.requests_dir.join(format!("{}.json", id))
    }

    fn write_cache(&self) -> RwLockWriteGuard<'_, HashMap<String, HelpRequest>> {
        self.cache
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Take the cross-process write lock. Released when the file is dropped.
    fn lock_requests(&self) -> Result<fs::File> {
        let path = self.requests_dir.join(LOCK_FILE);
        let file = fs::OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)
            .map_err(|e| HelpdeskError::storage(&path, e))?;
        file.lock().map_err(|e| HelpdeskError::storage(&path, e))?;
        Ok(file)
    }

    /// Read a request straight from disk.
    fn read_request(&self, id: &str) -> Result<Option<HelpRequest>> {
        let path = self.request_path(id);
        if !path.exists() {
            return Ok(None);
        }
        read_document(&path).map(Some)
    }
}

impl RequestStore for FileStore {
    fn create(&self, request: NewHelpRequest) -> Result<HelpRequest> {
        let created = request.into_request(Uuid::new_v4().to_string());
        let mut cache = self.write_cache();
        atomic_write(&self.requests_dir, &created.id, &created)?;
        cache.insert(created.id.clone(), created.clone());
        self.hub
            .publish(ChangeEvent::created(created.clone()), cache.values());
        Ok(created)
    }

    fn get(&self, id: &str) -> Result<Option<HelpRequest>> {
        self.read_request(id)
    }

    fn update(&self, id: &str, patch: &RequestPatch) -> Result<HelpRequest> {
        let mut cache = self.write_cache();
        let _lock = self.lock_requests()?;
        let before = self
            .read_request(id)?
            .ok_or_else(|| HelpdeskError::not_found(id))?;
        let after = before.apply(patch, Utc::now())?;
        atomic_write(&self.requests_dir, id, &after)?;
        cache.insert(id.to_string(), after.clone());
        self.hub
            .publish(ChangeEvent::updated(before, after.clone()), cache.values());
        Ok(after)
    }

    fn delete(&self, id: &str) -> Result<Option<HelpRequest>> {
        let mut cache = self.write_cache();
        let _lock = self.lock_requests()?;
        let Some(removed) = self.read_request(id)? else {
            cache.remove(id);
            return Ok(None);
        };
        let path = self.request_path(id);
        fs::remove_file(&path).map_err(|e| HelpdeskError::storage(&path, e))?;
        cache.remove(id);
        self.hub
            .publish(ChangeEvent::deleted(removed.clone()), cache.values());
        Ok(Some(removed))
    }

    fn list_by_status(&self, status: RequestStatus) -> Result<Vec<HelpRequest>> {
        let mut result: Vec<HelpRequest> = read_collection::<HelpRequest>(&self.requests_dir)?
            .into_iter()
            .filter(|r| r.status == status)
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

    fn reload(&self) -> Result<()> {
        let mut cache = self.write_cache();
        let documents: Vec<HelpRequest> = read_collection(&self.requests_dir)?;
        *cache = documents.into_iter().map(|r| (r.id.clone(), r)).collect();
        self.hub.refresh(cache.values());
        Ok(())
    }
}

impl KnowledgeStore for FileStore {
    fn append(&self, draft: KnowledgeDraft) -> Result<KnowledgeEntry> {
        let entry = draft.into_entry(Uuid::new_v4().to_string(), Utc::now());
        atomic_write(&self.knowledge_dir, &entry.id, &entry)?;
        Ok(entry)
    }

    fn list_knowledge(&self) -> Result<Vec<KnowledgeEntry>> {
        let mut entries: Vec<KnowledgeEntry> = read_collection(&self.knowledge_dir)?;
        entries.sort_by(|a, b| {
            a.recorded_at()
                .cmp(&b.recorded_at())
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(entries)
    }
}

/// Write a document atomically using temp file + rename.
///
/// Every write gets its own temp file, so concurrent writers never share one.
fn atomic_write<T: Serialize>(dir: &Path, id: &str, document: &T) -> Result<()> {
    let final_path = dir.join(format!("{}.json", id));
    let temp_path = dir.join(format!(".{}.{}.tmp", id, Uuid::new_v4()));

    let json = serde_json::to_string_pretty(document)?;

    let written = write_synced(&temp_path, json.as_bytes()).and_then(|()| {
        // Rename temp file to final path (atomic on POSIX)
        fs::rename(&temp_path, &final_path).map_err(|e| HelpdeskError::storage(&final_path, e))
    });
    if written.is_err() {
        let _ = fs::remove_file(&temp_path);
    }
    written
}

fn write_synced(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut file = fs::File::create(path).map_err(|e| HelpdeskError::storage(path, e))?;
    file.write_all(bytes)
        .map_err(|e| HelpdeskError::storage(path, e))?;
    file.sync_all().map_err(|e| HelpdeskError::storage(path, e))
}

fn read_document<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = fs::read_to_string(path).map_err(|e| HelpdeskError::storage(path, e))?;
    Ok(serde_json::from_str(&content)?)
}

/// Read every document in a collection directory.
///
/// Temp files and documents that fail to parse are skipped.
fn read_collection<T: DeserializeOwned>(dir: &Path) -> Result<Vec<T>> {
    let entries = fs::read_dir(dir).map_err(|e| HelpdeskError::storage(dir, e))?;

    let mut documents = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| HelpdeskError::storage(dir, e))?;
        let path = entry.path();

        // Skip non-JSON files and temp files
        if path.extension().map(|e| e != "json").unwrap_or(true) {
            continue;
        }
        if path
            .file_name()
            .map(|n| n.to_string_lossy().starts_with('.'))
            .unwrap_or(true)
        {
            continue;
        }

        match read_document(&path) {
            Ok(document) => documents.push(document),
            Err(err) => tracing::warn!(path = %path.display(), error = %err, "skipping unreadable document"),
        }
    }

    Ok(documents)
}
