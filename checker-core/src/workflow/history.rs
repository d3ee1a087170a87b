//! Conversation history entries.

use serde::{Deserialize, Serialize};

/// Who produced a history entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// An answer written (or accepted) by the learner.
    User,
    /// A practice question.
    Assistant,
}

/// One turn of the practice conversation.
///
/// Entries are identified by their `contents`: a history never holds two
/// entries with the same contents, and removal matches on contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub role: Role,
    pub contents: String,
}

impl HistoryEntry {
    /// A learner answer.
    pub fn user(contents: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            contents: contents.into(),
        }
    }

    /// A practice question.
    pub fn assistant(contents: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            contents: contents.into(),
        }
    }

    /// Whether this entry is a posed question.
    pub fn is_question(&self) -> bool {
        self.role == Role::Assistant
    }
}

/// Append `entry` unless an entry with the same contents exists. Returns
/// whether it was appended.
pub(crate) fn push_unique(history: &mut Vec<HistoryEntry>, entry: HistoryEntry) -> bool {
    if history.iter().any(|e| e.contents == entry.contents) {
        return false;
    }
    history.push(entry);
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_lowercase_roles() {
        let json = serde_json::to_string(&HistoryEntry::assistant("Hoe gaat het?")).unwrap();
        assert_eq!(json, r#"{"role":"assistant","contents":"Hoe gaat het?"}"#);

        let parsed: HistoryEntry =
            serde_json::from_str(r#"{"role":"user","contents":"Goed"}"#).unwrap();
        assert_eq!(parsed, HistoryEntry::user("Goed"));
    }

    #[test]
    fn push_unique_matches_on_contents() {
        let mut history = vec![HistoryEntry::assistant("Wat eet je graag?")];

        assert!(!push_unique(&mut history, HistoryEntry::user("Wat eet je graag?")));
        assert!(push_unique(&mut history, HistoryEntry::user("Ik eet graag kaas.")));
        assert_eq!(history.len(), 2);
    }
}
