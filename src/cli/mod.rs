//! CLI commands for helpdesk.
//!
//! - **Write commands**: submit, resolve (run the resolution trigger in-process)
//! - **Read commands**: list, knowledge, watch

// Write commands
pub mod resolve;
pub mod submit;

// Read commands
pub mod knowledge;
pub mod list;
pub mod watch;

pub use knowledge::KnowledgeCommand;
pub use list::ListCommand;
pub use resolve::ResolveCommand;
pub use submit::SubmitCommand;
pub use watch::{TerminalRenderer, WatchCommand};
