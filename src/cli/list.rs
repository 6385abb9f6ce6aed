//! List command for helpdesk.
//!
//! Prints the current pending and resolved requests once, using the same
//! panes the live views draw.

use serde::{Deserialize, Serialize};

use crate::cli::watch::format_pane;
use crate::core::{HelpRequest, RequestStatus};
use crate::store::RequestStore;

/// Options for the list command.
#[derive(Debug, Clone, Default)]
pub struct ListOptions {
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
    /// Only this status. Both panes when unset.
    pub status: Option<RequestStatus>,
    /// Maximum number of requests per status.
    pub limit: Option<usize>,
}

/// Output format for the list command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListOutput {
    /// Whether the list was successful.
    pub success: bool,
    /// Pending requests, oldest first.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending: Option<Vec<RequestInfo>>,
    /// Resolved requests, oldest first.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved: Option<Vec<RequestInfo>>,
    /// Error message if listing failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// A help request as printed by the CLI.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RequestInfo {
    pub id: String,
    pub customer_id: String,
    pub question_text: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supervisor_response: Option<String>,
    pub received_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<String>,
}

impl RequestInfo {
    /// Create from a stored request.
    pub fn from_request(request: &HelpRequest) -> Self {
        Self {
            id: request.id.clone(),
            customer_id: request.customer_id.clone(),
            question_text: request.question_text.clone(),
            status: request.status.as_str().to_string(),
            supervisor_response: request.supervisor_response.clone(),
            received_at: request.received_at.to_rfc3339(),
            resolved_at: request.resolved_at.map(|t| t.to_rfc3339()),
        }
    }
}

impl ListOutput {
    /// Create a successful output.
    pub fn success(pending: Option<Vec<RequestInfo>>, resolved: Option<Vec<RequestInfo>>) -> Self {
        Self {
            success: true,
            pending,
            resolved,
            error: None,
        }
    }

    /// Create a failed output.
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            pending: None,
            resolved: None,
            error: Some(error.into()),
        }
    }
}

/// The list command implementation.
pub struct ListCommand<S> {
    store: S,
}

impl<S: RequestStore> ListCommand<S> {
    /// Create a new list command.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Run the list command.
    pub fn run(&self, options: &ListOptions) -> ListOutput {
        let wants = |status| options.status.is_none() || options.status == Some(status);

        let mut panes = Vec::with_capacity(2);
        for status in [RequestStatus::Pending, RequestStatus::Resolved] {
            if !wants(status) {
                panes.push(None);
                continue;
            }
            match self.store.list_by_status(status) {
                Ok(mut requests) => {
                    if let Some(limit) = options.limit {
                        requests.truncate(limit);
                    }
                    panes.push(Some(requests.iter().map(RequestInfo::from_request).collect()));
                }
                Err(e) => return ListOutput::failure(e.to_string()),
            }
        }

        let resolved = panes.pop().flatten();
        let pending = panes.pop().flatten();
        ListOutput::success(pending, resolved)
    }

    /// Format output based on options.
    pub fn format_output(&self, output: &ListOutput, options: &ListOptions) -> String {
        if options.quiet {
            return String::new();
        }

        if options.json {
            serde_json::to_string_pretty(output).unwrap_or_else(|_| "{}".to_string())
        } else {
            self.format_human_readable(output)
        }
    }

    /// Format output as human-readable text.
    fn format_human_readable(&self, output: &ListOutput) -> String {
        if !output.success {
            return format!(
                "List failed: {}\n",
                output.error.as_deref().unwrap_or("unknown error")
            );
        }

        let mut sections = Vec::new();
        if let Some(pending) = &output.pending {
            sections.push(format_pane(RequestStatus::Pending, pending));
        }
        if let Some(resolved) = &output.resolved {
            sections.push(format_pane(RequestStatus::Resolved, resolved));
        }
        sections.join("\n")
    }
}
