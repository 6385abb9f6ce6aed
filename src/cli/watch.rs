//! Watch command for helpdesk.
//!
//! Runs the live views in the terminal until interrupted. The file engine only
//! publishes writes made in its own process, so the command re-reads the data
//! directory every `poll_interval` to pick up writes from other processes.

use std::future::Future;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use crate::cli::list::RequestInfo;
use crate::core::{HelpRequest, RequestStatus};
use crate::error::{FailOpen, HelpdeskError, Result};
use crate::store::RequestStore;
use crate::views::{LiveViews, ViewRenderer};

/// Pane heading for a status.
pub fn pane_heading(status: RequestStatus) -> &'static str {
    match status {
        RequestStatus::Pending => "Pending Help Requests",
        RequestStatus::Resolved => "Resolved Requests",
    }
}

/// Text shown when a pane has no requests.
pub fn empty_pane_text(status: RequestStatus) -> &'static str {
    match status {
        RequestStatus::Pending => "No pending requests found. Great job!",
        RequestStatus::Resolved => "No resolved requests yet.",
    }
}

/// Format one pane as human-readable text.
pub fn format_pane(status: RequestStatus, requests: &[RequestInfo]) -> String {
    let mut lines = vec![format!("{} ({})", pane_heading(status), requests.len())];

    if requests.is_empty() {
        lines.push(format!("  {}", empty_pane_text(status)));
    }
    for request in requests {
        lines.push(format!("  [{}] {}", request.id, request.question_text));
        lines.push(format!(
            "      From: {} | Received: {}",
            request.customer_id, request.received_at
        ));
        if let Some(response) = &request.supervisor_response {
            lines.push(format!("      Answer: {response}"));
        }
    }

    lines.push(String::new());
    lines.join("\n")
}

/// Options for the watch command.
#[derive(Debug, Clone, Default)]
pub struct WatchOptions {
    /// Emit one JSON object per render.
    pub json: bool,
    /// Render nothing.
    pub quiet: bool,
}

#[derive(Serialize)]
struct PaneOutput<'a> {
    status: &'static str,
    count: usize,
    requests: &'a [RequestInfo],
}

/// Renders live view panes to a writer.
pub struct TerminalRenderer<W> {
    out: W,
    options: WatchOptions,
}

impl<W: Write + Send> TerminalRenderer<W> {
    /// Create a renderer writing to `out`.
    pub fn new(out: W, options: WatchOptions) -> Self {
        Self { out, options }
    }

    /// Take back the writer.
    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write + Send> ViewRenderer for TerminalRenderer<W> {
    fn render(&mut self, status: RequestStatus, requests: &[HelpRequest]) -> Result<()> {
        if self.options.quiet {
            return Ok(());
        }

        let infos: Vec<RequestInfo> = requests.iter().map(RequestInfo::from_request).collect();
        let text = if self.options.json {
            serde_json::to_string(&PaneOutput {
                status: status.as_str(),
                count: infos.len(),
                requests: &infos,
            })?
        } else {
            format_pane(status, &infos)
        };

        writeln!(self.out, "{text}")
            .and_then(|()| self.out.flush())
            .map_err(|e| HelpdeskError::render(e.to_string()))
    }
}

/// The watch command implementation.
pub struct WatchCommand<S: ?Sized> {
    store: Arc<S>,
    poll_interval: Duration,
}

impl<S: RequestStore + ?Sized + 'static> WatchCommand<S> {
    /// Create a new watch command.
    pub fn new(store: Arc<S>, poll_interval: Duration) -> Self {
        Self {
            store,
            poll_interval,
        }
    }

    /// Render live views until `shutdown` completes or rendering fails.
    pub async fn run<R, F>(&self, renderer: R, shutdown: F) -> Result<()>
    where
        R: ViewRenderer + 'static,
        F: Future<Output = ()>,
    {
        let handle = LiveViews::open(&self.store).spawn(renderer);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => break,
                _ = tokio::time::sleep(self.poll_interval) => {
                    if handle.is_finished() {
                        break;
                    }
                    self.store.reload().fail_open_default("reloading store");
                }
            }
        }

        handle.close().await
    }
}
