//! The resolution transaction.
//!
//! Resolving a request is two sequential writes to independent collections:
//! the conditional request update, then the supervisor-authored knowledge
//! append. There is no cross-collection transaction. If the append fails after
//! the update committed, the caller gets `PartialFailure` carrying the resolved
//! request and can retry just the append with `record_knowledge`.

use crate::core::{HelpRequest, KnowledgeDraft, KnowledgeEntry, RequestPatch};
use crate::error::{HelpdeskError, Result};
use crate::store::{KnowledgeStore, RequestStore};

/// Result of a fully successful resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    /// The request after the transition.
    pub request: HelpRequest,
    /// The supervisor-authored knowledge entry.
    pub knowledge: KnowledgeEntry,
}

/// Runs resolution transactions against a pair of stores.
#[derive(Debug, Clone)]
pub struct Resolver<R, K> {
    requests: R,
    knowledge: K,
}

impl<R: RequestStore, K: KnowledgeStore> Resolver<R, K> {
    /// Create a resolver over the given stores.
    pub fn new(requests: R, knowledge: K) -> Self {
        Self {
            requests,
            knowledge,
        }
    }

    /// Resolve a pending request with the supervisor's answer.
    ///
    /// Both `answer_text` and `category` must be non-empty after trimming;
    /// otherwise nothing is written. Resolving an already-resolved request
    /// fails with `AlreadyResolved` and appends nothing.
    pub fn resolve(&self, request_id: &str, answer_text: &str, category: &str) -> Result<Resolution> {
        let answer_text = answer_text.trim();
        let category = category.trim();
        if answer_text.is_empty() {
            return Err(HelpdeskError::invalid_input("answer_text"));
        }
        if category.is_empty() {
            return Err(HelpdeskError::invalid_input("category"));
        }

        let request = self
            .requests
            .update(request_id, &RequestPatch::resolve(answer_text))?;
        tracing::info!(request_id, "help request resolved");

        match self.record_knowledge(&request, category) {
            Ok(knowledge) => Ok(Resolution { request, knowledge }),
            Err(err) => {
                tracing::warn!(
                    request_id,
                    error = %err,
                    "request resolved but knowledge entry was not recorded"
                );
                Err(HelpdeskError::partial_failure(request, err))
            }
        }
    }

    /// Append the supervisor-authored knowledge entry for a resolved request.
    ///
    /// This is the second half of `resolve`, exposed so a caller holding a
    /// `PartialFailure` can retry only the missing write.
    pub fn record_knowledge(&self, request: &HelpRequest, category: &str) -> Result<KnowledgeEntry> {
        let category = category.trim();
        if category.is_empty() {
            return Err(HelpdeskError::invalid_input("category"));
        }
        let answer = request.supervisor_response.as_deref().ok_or_else(|| {
            HelpdeskError::invalid_transition(&request.id, "request has not been resolved")
        })?;

        let entry = self.knowledge.append(KnowledgeDraft::supervisor(
            &request.question_text,
            answer,
            category,
        ))?;
        tracing::debug!(
            request_id = %request.id,
            knowledge_id = %entry.id,
            "recorded knowledge entry"
        );
        Ok(entry)
    }
}
