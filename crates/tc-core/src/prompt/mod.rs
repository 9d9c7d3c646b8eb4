//! Prompt transcript — the ordered section history sent to a language model.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Role
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    System,
    User,
    Assistant,
}

// ---------------------------------------------------------------------------
// PromptSection
// ---------------------------------------------------------------------------

/// One role-tagged entry in a prompt transcript.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PromptSection {
    pub role: Role,
    pub content: String,
}

impl PromptSection {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Prompt
// ---------------------------------------------------------------------------

/// An ordered, append-only-by-default sequence of prompt sections.
///
/// Sections keep chronological order. A repair round appends the raw model
/// response followed by a repair instruction; later rounds may drop the pair
/// appended by the round before so the transcript stays bounded. A `Prompt`
/// is owned by a single in-flight translation call and never shared.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Prompt {
    sections: Vec<PromptSection>,
}

impl Prompt {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a section at the end of the transcript.
    pub fn push(&mut self, section: PromptSection) {
        self.sections.push(section);
    }

    /// Remove the `n` most recently appended sections.
    pub fn drop_last(&mut self, n: usize) {
        let keep = self.sections.len().saturating_sub(n);
        self.sections.truncate(keep);
    }

    pub fn sections(&self) -> &[PromptSection] {
        &self.sections
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }
}

impl FromIterator<PromptSection> for Prompt {
    fn from_iter<I: IntoIterator<Item = PromptSection>>(iter: I) -> Self {
        Self {
            sections: iter.into_iter().collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_preserves_order() {
        let mut prompt = Prompt::new();
        prompt.push(PromptSection::system("rules"));
        prompt.push(PromptSection::user("request"));
        prompt.push(PromptSection::assistant("reply"));

        let roles: Vec<Role> = prompt.sections().iter().map(|s| s.role).collect();
        assert_eq!(roles, vec![Role::System, Role::User, Role::Assistant]);
    }

    #[test]
    fn drop_last_removes_tail_only() {
        let mut prompt = Prompt::new();
        prompt.push(PromptSection::system("rules"));
        prompt.push(PromptSection::user("request"));
        prompt.push(PromptSection::assistant("bad reply"));
        prompt.push(PromptSection::user("fix it"));

        prompt.drop_last(2);
        assert_eq!(prompt.len(), 2);
        assert_eq!(prompt.sections()[1].content, "request");
    }

    #[test]
    fn drop_last_saturates() {
        let mut prompt = Prompt::new();
        prompt.push(PromptSection::user("request"));
        prompt.drop_last(5);
        assert!(prompt.is_empty());
    }

    #[test]
    fn round_trip_prompt() {
        let prompt: Prompt = [
            PromptSection::system("rules"),
            PromptSection::user("request"),
        ]
        .into_iter()
        .collect();

        let json = serde_json::to_string(&prompt).unwrap();
        let back: Prompt = serde_json::from_str(&json).unwrap();
        assert_eq!(back.len(), 2);
        assert_eq!(back.sections()[0].role, Role::System);
    }
}
