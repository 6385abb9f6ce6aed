//! Submit command for helpdesk.
//!
//! Records a customer question as a new pending request.

use serde::{Deserialize, Serialize};

use crate::app::{Helpdesk, HelpdeskStore};
use crate::cli::list::RequestInfo;

/// Options for the submit command.
#[derive(Debug, Clone, Default)]
pub struct SubmitOptions {
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
}

/// Output format for the submit command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitOutput {
    /// Whether the request was recorded.
    pub success: bool,
    /// The new request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request: Option<RequestInfo>,
    /// Error message if submission failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SubmitOutput {
    /// Create a successful output.
    pub fn success(request: RequestInfo) -> Self {
        Self {
            success: true,
            request: Some(request),
            error: None,
        }
    }

    /// Create a failed output.
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            request: None,
            error: Some(error.into()),
        }
    }
}

/// The submit command implementation.
pub struct SubmitCommand<'a, S: ?Sized> {
    helpdesk: &'a Helpdesk<S>,
}

impl<'a, S: HelpdeskStore + ?Sized + 'static> SubmitCommand<'a, S> {
    /// Create a new submit command.
    pub fn new(helpdesk: &'a Helpdesk<S>) -> Self {
        Self { helpdesk }
    }

    /// Run the submit command.
    pub fn run(&self, customer_id: &str, question_text: &str) -> SubmitOutput {
        match self.helpdesk.submit(customer_id, question_text) {
            Ok(request) => SubmitOutput::success(RequestInfo::from_request(&request)),
            Err(e) => SubmitOutput::failure(e.to_string()),
        }
    }

    /// Format output based on options.
    pub fn format_output(&self, output: &SubmitOutput, options: &SubmitOptions) -> String {
        if options.quiet {
            return String::new();
        }

        if options.json {
            return serde_json::to_string_pretty(output).unwrap_or_else(|_| "{}".to_string());
        }

        match &output.request {
            Some(request) if output.success => {
                format!("Request {} recorded as Pending.", request.id)
            }
            _ => format!(
                "Submit failed: {}",
                output.error.as_deref().unwrap_or("unknown error")
            ),
        }
    }
}
