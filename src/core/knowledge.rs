//! Knowledge base entries.
//!
//! Entries are append-only facts pairing a question with its answer. They are
//! denormalized copies and never point back at the help request they came
//! from. Two producers write them with different shapes: the supervisor's
//! resolution transaction and the server-side resolution trigger.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::keywords::extract_keywords;

/// Schema version written on supervisor-authored entries.
pub const KNOWLEDGE_SCHEMA_VERSION: u8 = 2;

/// A stored knowledge base entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct KnowledgeEntry {
    /// Store-assigned identifier.
    pub id: String,
    /// Question that was answered.
    pub question_text: String,
    /// The supervisor's answer.
    pub answer_text: String,
    /// Shape-specific fields.
    #[serde(flatten)]
    pub origin: KnowledgeOrigin,
}

impl KnowledgeEntry {
    /// Category, for supervisor-authored entries.
    pub fn category(&self) -> Option<&str> {
        match &self.origin {
            KnowledgeOrigin::Supervisor { category, .. } => Some(category),
            KnowledgeOrigin::Trigger { .. } => None,
        }
    }

    /// Keyword set, for supervisor-authored entries.
    pub fn question_keywords(&self) -> Option<&BTreeSet<String>> {
        match &self.origin {
            KnowledgeOrigin::Supervisor {
                question_keywords, ..
            } => Some(question_keywords),
            KnowledgeOrigin::Trigger { .. } => None,
        }
    }

    /// When the store recorded this entry.
    pub fn recorded_at(&self) -> DateTime<Utc> {
        match &self.origin {
            KnowledgeOrigin::Supervisor { created_at, .. } => *created_at,
            KnowledgeOrigin::Trigger { learned_at } => *learned_at,
        }
    }

    /// Check if this entry was written by the resolution trigger.
    pub fn is_trigger_authored(&self) -> bool {
        matches!(self.origin, KnowledgeOrigin::Trigger { .. })
    }
}

/// Which producer wrote an entry, with that producer's fields.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "origin", rename_all = "snake_case")]
pub enum KnowledgeOrigin {
    /// Written by the supervisor's resolution transaction.
    Supervisor {
        /// Free-text classification.
        category: String,
        /// Normalized tokens from the question.
        question_keywords: BTreeSet<String>,
        /// Insertion time.
        created_at: DateTime<Utc>,
        /// Record schema version.
        schema_version: u8,
        /// Times the entry has been reused.
        usage_count: u32,
        /// Whether the entry needs a human look.
        flagged_for_review: bool,
    },
    /// Written by the resolution trigger.
    Trigger {
        /// Insertion time.
        learned_at: DateTime<Utc>,
    },
}

/// An entry before the store has assigned its id and timestamp.
#[derive(Debug, Clone, PartialEq)]
pub enum KnowledgeDraft {
    /// Supervisor-authored shape.
    Supervisor {
        question_text: String,
        answer_text: String,
        category: String,
        question_keywords: BTreeSet<String>,
    },
    /// Trigger-authored shape.
    Trigger {
        question_text: String,
        answer_text: String,
    },
}

impl KnowledgeDraft {
    /// Build a supervisor-authored draft, deriving keywords from the question.
    pub fn supervisor(
        question_text: impl Into<String>,
        answer_text: impl Into<String>,
        category: impl Into<String>,
    ) -> Self {
        let question_text = question_text.into();
        let question_keywords = extract_keywords(&question_text);
        Self::Supervisor {
            question_text,
            answer_text: answer_text.into(),
            category: category.into(),
            question_keywords,
        }
    }

    /// Build a trigger-authored draft.
    pub fn trigger(question_text: impl Into<String>, answer_text: impl Into<String>) -> Self {
        Self::Trigger {
            question_text: question_text.into(),
            answer_text: answer_text.into(),
        }
    }

    /// Materialize the entry with the store's id and clock.
    pub fn into_entry(self, id: impl Into<String>, now: DateTime<Utc>) -> KnowledgeEntry {
        match self {
            Self::Supervisor {
                question_text,
                answer_text,
                category,
                question_keywords,
            } => KnowledgeEntry {
                id: id.into(),
                question_text,
                answer_text,
                origin: KnowledgeOrigin::Supervisor {
                    category,
                    question_keywords,
                    created_at: now,
                    schema_version: KNOWLEDGE_SCHEMA_VERSION,
                    usage_count: 0,
                    flagged_for_review: false,
                },
            },
            Self::Trigger {
                question_text,
                answer_text,
            } => KnowledgeEntry {
                id: id.into(),
                question_text,
                answer_text,
                origin: KnowledgeOrigin::Trigger { learned_at: now },
            },
        }
    }
}
