//! Help request types and the resolution state machine.
//!
//! A help request moves along exactly one edge, `Pending -> Resolved`. The
//! supervisor response and the resolution timestamp are written together with
//! that edge and never change afterwards.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{HelpdeskError, Result};

/// A customer question awaiting or having received a supervisor answer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HelpRequest {
    /// Store-assigned identifier.
    pub id: String,
    /// Customer who asked the question.
    pub customer_id: String,
    /// Original question, never edited.
    pub question_text: String,
    /// Current lifecycle status.
    pub status: RequestStatus,
    /// Supervisor answer, present only once resolved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supervisor_response: Option<String>,
    /// When the store accepted the request.
    pub received_at: DateTime<Utc>,
    /// When the request was resolved, assigned by the store.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime<Utc>>,
}

impl HelpRequest {
    /// Check if this request has been answered.
    pub fn is_resolved(&self) -> bool {
        self.status == RequestStatus::Resolved
    }

    /// Verify the status/response invariant.
    ///
    /// `supervisor_response` and `resolved_at` are present exactly when the
    /// status is `Resolved`.
    pub fn check_invariant(&self) -> Result<()> {
        let resolved = self.is_resolved();
        if self.supervisor_response.is_some() != resolved {
            return Err(HelpdeskError::invalid_transition(
                &self.id,
                format!(
                    "supervisor_response must be present iff resolved (status {})",
                    self.status
                ),
            ));
        }
        if self.resolved_at.is_some() != resolved {
            return Err(HelpdeskError::invalid_transition(
                &self.id,
                format!(
                    "resolved_at must be present iff resolved (status {})",
                    self.status
                ),
            ));
        }
        Ok(())
    }

    /// Apply a patch, producing the next version of this request.
    ///
    /// `now` is the store's clock and becomes `resolved_at` when the patch
    /// performs the `Pending -> Resolved` transition.
    pub fn apply(&self, patch: &RequestPatch, now: DateTime<Utc>) -> Result<HelpRequest> {
        if let Some(expected) = patch.expect_status {
            if self.status != expected {
                return Err(match self.status {
                    RequestStatus::Resolved => HelpdeskError::already_resolved(&self.id),
                    RequestStatus::Pending => HelpdeskError::invalid_transition(
                        &self.id,
                        format!("expected status {expected}, found {}", self.status),
                    ),
                });
            }
        }

        let mut next = self.clone();
        match (self.status, patch.status) {
            (_, None) => {
                if patch.supervisor_response.is_some() {
                    return Err(HelpdeskError::invalid_transition(
                        &self.id,
                        "supervisor_response can only be set with the resolution",
                    ));
                }
            }
            (RequestStatus::Pending, Some(RequestStatus::Resolved)) => {
                let response = patch.supervisor_response.clone().ok_or_else(|| {
                    HelpdeskError::invalid_transition(
                        &self.id,
                        "resolution requires a supervisor_response",
                    )
                })?;
                next.status = RequestStatus::Resolved;
                next.supervisor_response = Some(response);
                next.resolved_at = Some(now);
            }
            (RequestStatus::Resolved, Some(RequestStatus::Resolved)) => {
                return Err(HelpdeskError::already_resolved(&self.id));
            }
            (from, Some(to)) => {
                return Err(HelpdeskError::invalid_transition(
                    &self.id,
                    format!("{from} -> {to} is not allowed"),
                ));
            }
        }

        next.check_invariant()?;
        Ok(next)
    }
}

/// Input for creating a help request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewHelpRequest {
    /// Customer who asked the question.
    pub customer_id: String,
    /// The question as received.
    pub question_text: String,
}

impl NewHelpRequest {
    /// Create a new request input.
    pub fn new(customer_id: impl Into<String>, question_text: impl Into<String>) -> Self {
        Self {
            customer_id: customer_id.into(),
            question_text: question_text.into(),
        }
    }

    /// Materialize a pending request with a store-assigned id.
    pub fn into_request(self, id: impl Into<String>) -> HelpRequest {
        HelpRequest {
            id: id.into(),
            customer_id: self.customer_id,
            question_text: self.question_text,
            status: RequestStatus::Pending,
            supervisor_response: None,
            received_at: Utc::now(),
            resolved_at: None,
        }
    }
}

/// Lifecycle status of a help request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RequestStatus {
    /// Waiting for a supervisor.
    Pending,
    /// Answered; terminal.
    Resolved,
}

impl RequestStatus {
    /// Get all status variants.
    pub fn all() -> &'static [RequestStatus] {
        &[RequestStatus::Pending, RequestStatus::Resolved]
    }

    /// Get the display name for this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "Pending",
            RequestStatus::Resolved => "Resolved",
        }
    }
}

impl std::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A conditional single-document write.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestPatch {
    /// Required current status; the write is rejected otherwise.
    pub expect_status: Option<RequestStatus>,
    /// New status, if changing.
    pub status: Option<RequestStatus>,
    /// Supervisor answer; only valid together with the resolution.
    pub supervisor_response: Option<String>,
}

impl RequestPatch {
    /// The resolution patch: `Pending -> Resolved` with the given answer.
    pub fn resolve(answer: impl Into<String>) -> Self {
        Self {
            expect_status: Some(RequestStatus::Pending),
            status: Some(RequestStatus::Resolved),
            supervisor_response: Some(answer.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending(id: &str) -> HelpRequest {
        NewHelpRequest::new("cust-1", "Do you offer student discounts?").into_request(id)
    }

    #[test]
    fn test_new_request_is_pending() {
        let request = pending("r1");
        assert_eq!(request.status, RequestStatus::Pending);
        assert!(request.supervisor_response.is_none());
        assert!(request.resolved_at.is_none());
        request.check_invariant().unwrap();
    }

    #[test]
    fn test_resolve_sets_response_and_timestamp() {
        let now = Utc::now();
        let resolved = pending("r1")
            .apply(&RequestPatch::resolve("Yes, 10% off"), now)
            .unwrap();

        assert!(resolved.is_resolved());
        assert_eq!(resolved.supervisor_response.as_deref(), Some("Yes, 10% off"));
        assert_eq!(resolved.resolved_at, Some(now));
        assert_eq!(resolved.question_text, "Do you offer student discounts?");
        resolved.check_invariant().unwrap();
    }

    #[test]
    fn test_resolve_twice_is_rejected() {
        let resolved = pending("r1")
            .apply(&RequestPatch::resolve("first"), Utc::now())
            .unwrap();

        let err = resolved
            .apply(&RequestPatch::resolve("second"), Utc::now())
            .unwrap_err();
        assert!(matches!(err, HelpdeskError::AlreadyResolved { .. }));
    }

    #[test]
    fn test_unconditional_resolve_of_resolved_is_rejected() {
        let resolved = pending("r1")
            .apply(&RequestPatch::resolve("first"), Utc::now())
            .unwrap();

        let patch = RequestPatch {
            expect_status: None,
            ..RequestPatch::resolve("second")
        };
        let err = resolved.apply(&patch, Utc::now()).unwrap_err();
        assert!(matches!(err, HelpdeskError::AlreadyResolved { .. }));
    }

    #[test]
    fn test_reverse_edge_is_rejected() {
        let resolved = pending("r1")
            .apply(&RequestPatch::resolve("answer"), Utc::now())
            .unwrap();

        let patch = RequestPatch {
            status: Some(RequestStatus::Pending),
            ..Default::default()
        };
        let err = resolved.apply(&patch, Utc::now()).unwrap_err();
        assert!(matches!(err, HelpdeskError::InvalidTransition { .. }));
    }

    #[test]
    fn test_response_without_transition_is_rejected() {
        let patch = RequestPatch {
            supervisor_response: Some("sneaky".to_string()),
            ..Default::default()
        };
        let err = pending("r1").apply(&patch, Utc::now()).unwrap_err();
        assert!(matches!(err, HelpdeskError::InvalidTransition { .. }));
    }

    #[test]
    fn test_resolution_without_response_is_rejected() {
        let patch = RequestPatch {
            status: Some(RequestStatus::Resolved),
            ..Default::default()
        };
        let err = pending("r1").apply(&patch, Utc::now()).unwrap_err();
        assert!(matches!(err, HelpdeskError::InvalidTransition { .. }));
    }

    #[test]
    fn test_invariant_detects_orphan_response() {
        let mut request = pending("r1");
        request.supervisor_response = Some("answer".to_string());
        assert!(request.check_invariant().is_err());
    }

    #[test]
    fn test_status_serialization() {
        assert_eq!(
            serde_json::to_string(&RequestStatus::Pending).unwrap(),
            "\"Pending\""
        );
        assert_eq!(
            serde_json::to_string(&RequestStatus::Resolved).unwrap(),
            "\"Resolved\""
        );
    }

    #[test]
    fn test_pending_request_omits_resolution_fields() {
        let json = serde_json::to_value(pending("r1")).unwrap();
        assert!(json.get("supervisor_response").is_none());
        assert!(json.get("resolved_at").is_none());
        assert_eq!(json["status"], "Pending");
    }
}
