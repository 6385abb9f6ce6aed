//! Helpdesk - help request resolution and knowledge sync
//!
//! Tracks customer help requests from Pending to Resolved, folds every
//! supervisor answer into a knowledge base with derived keywords, and reacts
//! to each resolution by notifying the customer and recording a second,
//! trigger-authored knowledge entry. Live views keep pending and resolved
//! panes current as writes land.

pub mod app;
pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod notify;
pub mod reactor;
pub mod resolve;
pub mod store;
pub mod views;

pub use app::{open_store, Helpdesk, HelpdeskStore};
pub use config::Config;
pub use core::{
    extract_keywords, HelpRequest, KnowledgeDraft, KnowledgeEntry, KnowledgeOrigin,
    NewHelpRequest, RequestPatch, RequestStatus,
};
pub use error::{HelpdeskError, Result};
pub use notify::{LogNotifier, Notification, Notifier, SilentNotifier};
pub use reactor::{ChangeHandler, Reaction, ResolutionReactor, RetryPolicy, TriggerRuntime};
pub use resolve::{Resolution, Resolver};
pub use store::{
    ChangeEvent, ChangeStream, FileStore, KnowledgeStore, LiveQuery, MemoryStore, RequestStore,
};
pub use views::{LiveViewHandle, LiveViews, ViewRenderer};

// CLI commands
pub use cli::{KnowledgeCommand, ListCommand, ResolveCommand, SubmitCommand, WatchCommand};
