//! Knowledge command for helpdesk.
//!
//! Lists knowledge base entries from both producers, newest first.

use serde::{Deserialize, Serialize};

use crate::core::KnowledgeEntry;
use crate::store::KnowledgeStore;

/// Options for the knowledge command.
#[derive(Debug, Clone, Default)]
pub struct KnowledgeOptions {
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
    /// Maximum number of entries.
    pub limit: Option<usize>,
}

/// Output format for the knowledge command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeOutput {
    /// Whether the listing was successful.
    pub success: bool,
    /// Number of entries returned.
    pub count: usize,
    /// The entries, newest first.
    pub entries: Vec<KnowledgeEntry>,
    /// Error message if listing failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl KnowledgeOutput {
    /// Create a successful output.
    pub fn success(entries: Vec<KnowledgeEntry>) -> Self {
        Self {
            success: true,
            count: entries.len(),
            entries,
            error: None,
        }
    }

    /// Create a failed output.
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            count: 0,
            entries: Vec::new(),
            error: Some(error.into()),
        }
    }
}

/// The knowledge command implementation.
pub struct KnowledgeCommand<K> {
    store: K,
}

impl<K: KnowledgeStore> KnowledgeCommand<K> {
    /// Create a new knowledge command.
    pub fn new(store: K) -> Self {
        Self { store }
    }

    /// Run the knowledge command.
    pub fn run(&self, options: &KnowledgeOptions) -> KnowledgeOutput {
        match self.store.list_knowledge() {
            Ok(mut entries) => {
                entries.reverse();
                if let Some(limit) = options.limit {
                    entries.truncate(limit);
                }
                KnowledgeOutput::success(entries)
            }
            Err(e) => KnowledgeOutput::failure(e.to_string()),
        }
    }

    /// Format output based on options.
    pub fn format_output(&self, output: &KnowledgeOutput, options: &KnowledgeOptions) -> String {
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
    fn format_human_readable(&self, output: &KnowledgeOutput) -> String {
        if !output.success {
            return format!(
                "Knowledge listing failed: {}\n",
                output.error.as_deref().unwrap_or("unknown error")
            );
        }

        if output.entries.is_empty() {
            return "No knowledge entries yet.\n".to_string();
        }

        let mut lines = vec![format!("Found {} knowledge entry(s):\n", output.count)];
        for (i, entry) in output.entries.iter().enumerate() {
            let source = match entry.category() {
                Some(category) => format!("[{category}]"),
                None => "[trigger]".to_string(),
            };
            lines.push(format!("{}. {} {}", i + 1, source, entry.question_text));
            lines.push(format!("   Answer: {}", entry.answer_text));
            if let Some(keywords) = entry.question_keywords() {
                if !keywords.is_empty() {
                    let keywords: Vec<&str> = keywords.iter().map(String::as_str).collect();
                    lines.push(format!("   Keywords: {}", keywords.join(", ")));
                }
            }
            lines.push(format!(
                "   Recorded: {} | ID: {}",
                entry.recorded_at().format("%Y-%m-%d %H:%M:%S"),
                entry.id
            ));
            lines.push(String::new());
        }

        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::KnowledgeDraft;
    use crate::store::MemoryStore;

    fn seeded_store() -> MemoryStore {
        let store = MemoryStore::new();
        store
            .append(KnowledgeDraft::supervisor(
                "How do I reset my password?",
                "Use the forgot password link",
                "Account",
            ))
            .unwrap();
        store
            .append(KnowledgeDraft::trigger(
                "How do I reset my password?",
                "Use the forgot password link",
            ))
            .unwrap();
        store
    }

    #[test]
    fn test_knowledge_newest_first() {
        let cmd = KnowledgeCommand::new(seeded_store());
        let output = cmd.run(&KnowledgeOptions::default());

        assert!(output.success);
        assert_eq!(output.count, 2);
        assert!(output.entries[0].is_trigger_authored());
        assert!(!output.entries[1].is_trigger_authored());
    }

    #[test]
    fn test_knowledge_limit() {
        let cmd = KnowledgeCommand::new(seeded_store());
        let options = KnowledgeOptions {
            limit: Some(1),
            ..Default::default()
        };
        assert_eq!(cmd.run(&options).count, 1);
    }

    #[test]
    fn test_knowledge_human_format() {
        let cmd = KnowledgeCommand::new(seeded_store());
        let options = KnowledgeOptions::default();
        let text = cmd.format_output(&cmd.run(&options), &options);

        assert!(text.contains("Found 2 knowledge entry(s)"));
        assert!(text.contains("[trigger] How do I reset my password?"));
        assert!(text.contains("[Account] How do I reset my password?"));
        assert!(text.contains("Keywords: do, i, my, password, reset"));
    }

    #[test]
    fn test_knowledge_json_keeps_entry_shapes() {
        let cmd = KnowledgeCommand::new(seeded_store());
        let options = KnowledgeOptions {
            json: true,
            ..Default::default()
        };
        let parsed: serde_json::Value =
            serde_json::from_str(&cmd.format_output(&cmd.run(&options), &options)).unwrap();

        assert_eq!(parsed["entries"][0]["origin"], "trigger");
        assert!(parsed["entries"][0].get("category").is_none());
        assert_eq!(parsed["entries"][1]["origin"], "supervisor");
        assert_eq!(parsed["entries"][1]["schema_version"], 2);
        assert_eq!(parsed["entries"][1]["usage_count"], 0);
        assert_eq!(parsed["entries"][1]["flagged_for_review"], false);
    }

    #[test]
    fn test_knowledge_empty() {
        let cmd = KnowledgeCommand::new(MemoryStore::new());
        let options = KnowledgeOptions::default();
        assert_eq!(
            cmd.format_output(&cmd.run(&options), &options),
            "No knowledge entries yet.\n"
        );
    }
}
