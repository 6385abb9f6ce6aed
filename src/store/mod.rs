//! Document store engines for helpdesk.
//!
//! This module defines the store contract (typed adapters over the help
//! request and knowledge collections), the live query and change feed
//! plumbing, and two engines: in-memory and JSON-file-backed.

pub mod file;
pub mod hub;
pub mod memory;
pub mod traits;

pub use file::FileStore;
pub use hub::{ChangeEvent, ChangeHub, ChangeStream, LiveQuery};
pub use memory::MemoryStore;
pub use traits::{KnowledgeStore, RequestStore};
