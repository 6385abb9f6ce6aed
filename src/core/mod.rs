//! Core types for helpdesk.
//!
//! Help requests and their resolution state machine, the two knowledge entry
//! shapes, and keyword extraction.

pub mod keywords;
pub mod knowledge;
pub mod request;

pub use keywords::{extract_keywords, STOP_WORDS};
pub use knowledge::{KnowledgeDraft, KnowledgeEntry, KnowledgeOrigin, KNOWLEDGE_SCHEMA_VERSION};
pub use request::{HelpRequest, NewHelpRequest, RequestPatch, RequestStatus};
