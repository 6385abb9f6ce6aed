//! Pure resolution-edge detection.
//!
//! Everything here is free of I/O so the guard can be tested on hand-built
//! change events.

use crate::core::{HelpRequest, KnowledgeDraft, RequestStatus};
use crate::error::{HelpdeskError, Result};
use crate::notify::Notification;
use crate::store::ChangeEvent;

/// Side effects owed for one observed resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolutionAction {
    /// Id of the resolved request.
    pub request_id: String,
    /// Message for the customer.
    pub notification: Notification,
    /// Trigger-authored knowledge entry to append.
    pub knowledge: KnowledgeDraft,
}

/// Check for the `Pending -> Resolved` edge.
///
/// Creates, deletes, and writes to already-resolved requests never match.
pub fn is_resolution_edge(before: Option<&HelpRequest>, after: Option<&HelpRequest>) -> bool {
    matches!(
        (before.map(|r| r.status), after.map(|r| r.status)),
        (Some(RequestStatus::Pending), Some(RequestStatus::Resolved))
    )
}

/// Plan the reaction to one change event.
///
/// Returns `Ok(None)` when the event is not a resolution. A resolution whose
/// snapshot lacks a supervisor response is reported as an error.
pub fn plan_reaction(event: &ChangeEvent) -> Result<Option<ResolutionAction>> {
    if !is_resolution_edge(event.before.as_ref(), event.after.as_ref()) {
        return Ok(None);
    }
    let Some(after) = event.after.as_ref() else {
        return Ok(None);
    };

    let answer = after.supervisor_response.clone().ok_or_else(|| {
        HelpdeskError::invalid_transition(&after.id, "resolved snapshot has no supervisor_response")
    })?;

    Ok(Some(ResolutionAction {
        request_id: after.id.clone(),
        notification: Notification {
            recipient_id: after.customer_id.clone(),
            question_text: after.question_text.clone(),
            answer_text: answer.clone(),
        },
        knowledge: KnowledgeDraft::trigger(after.question_text.clone(), answer),
    }))
}
