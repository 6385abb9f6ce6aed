//! Resolve command for helpdesk.
//!
//! Runs the resolution transaction for one request. A resolution whose
//! knowledge entry could not be written is reported as partial: the answer is
//! saved and the customer will still be notified.

use serde::{Deserialize, Serialize};

use crate::app::{Helpdesk, HelpdeskStore};
use crate::cli::list::RequestInfo;
use crate::error::HelpdeskError;

/// Options for the resolve command.
#[derive(Debug, Clone, Default)]
pub struct ResolveOptions {
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
}

/// Output format for the resolve command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolveOutput {
    /// Whether both writes succeeded.
    pub success: bool,
    /// Whether the request was resolved but the knowledge write failed.
    pub partial: bool,
    /// The request after the transition.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request: Option<RequestInfo>,
    /// Id of the supervisor-authored knowledge entry.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub knowledge_id: Option<String>,
    /// Keywords recorded with the entry.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<String>,
    /// Error message if resolution failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Whether the failure was a store error worth retrying.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub retryable: bool,
}

impl ResolveOutput {
    /// Create a successful output.
    pub fn success(request: RequestInfo, knowledge_id: String, keywords: Vec<String>) -> Self {
        Self {
            success: true,
            partial: false,
            request: Some(request),
            knowledge_id: Some(knowledge_id),
            keywords,
            error: None,
            retryable: false,
        }
    }

    /// Create a partial output: the answer was saved, the entry was not.
    pub fn partial(request: RequestInfo, error: impl Into<String>) -> Self {
        Self {
            success: false,
            partial: true,
            request: Some(request),
            knowledge_id: None,
            keywords: Vec::new(),
            error: Some(error.into()),
            retryable: false,
        }
    }

    /// Create a failed output.
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            partial: false,
            request: None,
            knowledge_id: None,
            keywords: Vec::new(),
            error: Some(error.into()),
            retryable: false,
        }
    }

    /// Create a failed output from the error that caused it.
    pub fn from_error(error: &HelpdeskError) -> Self {
        Self {
            retryable: error.is_retryable(),
            ..Self::failure(error.to_string())
        }
    }
}

/// The resolve command implementation.
pub struct ResolveCommand<'a, S: ?Sized> {
    helpdesk: &'a Helpdesk<S>,
}

impl<'a, S: HelpdeskStore + ?Sized + 'static> ResolveCommand<'a, S> {
    /// Create a new resolve command.
    pub fn new(helpdesk: &'a Helpdesk<S>) -> Self {
        Self { helpdesk }
    }

    /// Run the resolve command.
    pub fn run(&self, request_id: &str, answer_text: &str, category: &str) -> ResolveOutput {
        match self
            .helpdesk
            .resolver()
            .resolve(request_id, answer_text, category)
        {
            Ok(resolution) => ResolveOutput::success(
                RequestInfo::from_request(&resolution.request),
                resolution.knowledge.id.clone(),
                resolution
                    .knowledge
                    .question_keywords()
                    .map(|k| k.iter().cloned().collect())
                    .unwrap_or_default(),
            ),
            Err(HelpdeskError::PartialFailure { request, source }) => {
                ResolveOutput::partial(RequestInfo::from_request(&request), source.to_string())
            }
            Err(e) => ResolveOutput::from_error(&e),
        }
    }

    /// Format output based on options.
    pub fn format_output(&self, output: &ResolveOutput, options: &ResolveOptions) -> String {
        if options.quiet {
            return String::new();
        }

        if options.json {
            return serde_json::to_string_pretty(output).unwrap_or_else(|_| "{}".to_string());
        }

        let error = output.error.as_deref().unwrap_or("unknown error");
        match &output.request {
            Some(request) if output.success => {
                let mut text = format!("Request {} resolved.", request.id);
                if !output.keywords.is_empty() {
                    text.push_str(&format!("\nKeywords: {}", output.keywords.join(", ")));
                }
                text
            }
            Some(request) if output.partial => format!(
                "Request {} resolved, but the knowledge base was not updated: {}",
                request.id, error
            ),
            _ if output.retryable => {
                format!("Resolve failed: {error}\nNothing was saved. Retrying may succeed.")
            }
            _ => format!("Resolve failed: {error}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReactorConfig;
    use crate::core::{
        HelpRequest, KnowledgeDraft, KnowledgeEntry, NewHelpRequest, RequestPatch, RequestStatus,
    };
    use crate::error::Result;
    use crate::notify::SilentNotifier;
    use crate::store::{ChangeStream, KnowledgeStore, LiveQuery, MemoryStore, RequestStore};
    use std::sync::Arc;

    /// Store that can reject request updates or knowledge appends.
    #[derive(Default)]
    struct FaultyStore {
        inner: MemoryStore,
        fail_updates: bool,
        fail_appends: bool,
    }

    impl RequestStore for FaultyStore {
        fn create(&self, request: NewHelpRequest) -> Result<HelpRequest> {
            self.inner.create(request)
        }

        fn get(&self, id: &str) -> Result<Option<HelpRequest>> {
            self.inner.get(id)
        }

        fn update(&self, id: &str, patch: &RequestPatch) -> Result<HelpRequest> {
            if self.fail_updates {
                return Err(HelpdeskError::transient("store unavailable"));
            }
            self.inner.update(id, patch)
        }

        fn delete(&self, id: &str) -> Result<Option<HelpRequest>> {
            self.inner.delete(id)
        }

        fn list_by_status(&self, status: RequestStatus) -> Result<Vec<HelpRequest>> {
            self.inner.list_by_status(status)
        }

        fn subscribe(&self, status: RequestStatus) -> LiveQuery {
            self.inner.subscribe(status)
        }

        fn changes(&self) -> ChangeStream {
            self.inner.changes()
        }

        fn active_subscriptions(&self, status: RequestStatus) -> usize {
            self.inner.active_subscriptions(status)
        }
    }

    impl KnowledgeStore for FaultyStore {
        fn append(&self, draft: KnowledgeDraft) -> Result<KnowledgeEntry> {
            if self.fail_appends {
                return Err(HelpdeskError::transient("knowledge base is read-only"));
            }
            self.inner.append(draft)
        }

        fn list_knowledge(&self) -> Result<Vec<KnowledgeEntry>> {
            self.inner.list_knowledge()
        }
    }

    fn no_trigger() -> ReactorConfig {
        ReactorConfig {
            enabled: false,
            ..Default::default()
        }
    }

    #[test]
    fn test_resolve_success() {
        let helpdesk = Helpdesk::start(
            Arc::new(MemoryStore::new()),
            &no_trigger(),
            Arc::new(SilentNotifier),
        );
        let request = helpdesk
            .submit("cust", "What is the price of widgets?")
            .unwrap();

        let cmd = ResolveCommand::new(&helpdesk);
        let output = cmd.run(&request.id, "$5 each", "Pricing");

        assert!(output.success);
        assert!(!output.partial);
        assert_eq!(output.request.as_ref().unwrap().status, "Resolved");
        assert_eq!(output.keywords, vec!["price", "widgets"]);

        let text = cmd.format_output(&output, &ResolveOptions::default());
        assert!(text.contains("resolved."));
        assert!(text.contains("Keywords: price, widgets"));
    }

    #[test]
    fn test_resolve_twice_fails() {
        let helpdesk = Helpdesk::start(
            Arc::new(MemoryStore::new()),
            &no_trigger(),
            Arc::new(SilentNotifier),
        );
        let request = helpdesk.submit("cust", "Do you ship abroad?").unwrap();
        let cmd = ResolveCommand::new(&helpdesk);

        assert!(cmd.run(&request.id, "No", "Shipping").success);
        let second = cmd.run(&request.id, "Yes", "Shipping");

        assert!(!second.success);
        assert!(!second.partial);
        assert!(second.error.as_deref().unwrap().contains("already resolved"));
        assert_eq!(helpdesk.store().list_knowledge().unwrap().len(), 1);
    }

    #[test]
    fn test_resolve_blank_answer_fails() {
        let helpdesk = Helpdesk::start(
            Arc::new(MemoryStore::new()),
            &no_trigger(),
            Arc::new(SilentNotifier),
        );
        let request = helpdesk.submit("cust", "Do you ship abroad?").unwrap();
        let output = ResolveCommand::new(&helpdesk).run(&request.id, " ", "Shipping");

        assert!(!output.success);
        assert!(output.error.unwrap().contains("answer_text"));
        let stored = helpdesk.store().get(&request.id).unwrap().unwrap();
        assert_eq!(stored.status, RequestStatus::Pending);
    }

    #[test]
    fn test_resolve_partial_failure() {
        let helpdesk = Helpdesk::start(
            Arc::new(FaultyStore {
                fail_appends: true,
                ..Default::default()
            }),
            &no_trigger(),
            Arc::new(SilentNotifier),
        );
        let request = helpdesk.submit("cust", "Is there a kids menu?").unwrap();

        let cmd = ResolveCommand::new(&helpdesk);
        let output = cmd.run(&request.id, "Yes", "Menu");

        assert!(!output.success);
        assert!(output.partial);
        assert_eq!(output.request.as_ref().unwrap().status, "Resolved");
        assert!(output.knowledge_id.is_none());

        let text = cmd.format_output(&output, &ResolveOptions::default());
        assert!(text.contains("knowledge base was not updated"));
    }

    #[test]
    fn test_resolve_store_failure_is_retryable() {
        let helpdesk = Helpdesk::start(
            Arc::new(FaultyStore {
                fail_updates: true,
                ..Default::default()
            }),
            &no_trigger(),
            Arc::new(SilentNotifier),
        );
        let request = helpdesk.submit("cust", "Do you validate parking?").unwrap();

        let cmd = ResolveCommand::new(&helpdesk);
        let output = cmd.run(&request.id, "Yes", "Parking");

        assert!(!output.success);
        assert!(!output.partial);
        assert!(output.retryable);
        assert!(output.request.is_none());

        let text = cmd.format_output(&output, &ResolveOptions::default());
        assert!(text.contains("store unavailable"));
        assert!(text.contains("Retrying may succeed"));

        let json = cmd.format_output(
            &output,
            &ResolveOptions {
                json: true,
                quiet: false,
            },
        );
        assert!(json.contains("\"retryable\": true"));
    }

    #[test]
    fn test_conflict_is_not_retryable() {
        let helpdesk = Helpdesk::start(
            Arc::new(MemoryStore::new()),
            &no_trigger(),
            Arc::new(SilentNotifier),
        );
        let request = helpdesk.submit("cust", "Are pets allowed?").unwrap();
        let cmd = ResolveCommand::new(&helpdesk);

        cmd.run(&request.id, "On the patio", "Policy");
        let second = cmd.run(&request.id, "No", "Policy");

        assert!(!second.retryable);
        let json = serde_json::to_string(&second).unwrap();
        assert!(!json.contains("retryable"));
    }
}
