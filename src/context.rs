//! Conversation context: the per-kind extracted text merged into prompts.
//!
//! Each content kind holds at most one text blob; writing a kind that
//! already has one replaces it (last-write-wins). Every write is stamped
//! with a monotonically increasing epoch so prompt assembly has a
//! deterministic order: least-recently-updated first, most-recently-updated
//! last, each section prefixed by its kind label to keep provenance
//! inspectable.

use crate::models::SourceKind;

#[derive(Debug, Clone)]
struct Slot {
    kind: SourceKind,
    text: String,
    epoch: u64,
}

/// Accumulated per-kind context, merged into every subsequent prompt.
#[derive(Debug, Default)]
pub struct ConversationContext {
    slots: Vec<Slot>,
    epoch: u64,
}

impl ConversationContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the text for a kind, replacing any previous blob for that kind.
    pub fn set(&mut self, kind: SourceKind, text: impl Into<String>) {
        self.slots.retain(|slot| slot.kind != kind);
        self.epoch += 1;
        self.slots.push(Slot {
            kind,
            text: text.into(),
            epoch: self.epoch,
        });
    }

    /// Drop the blob for a kind, if any. Returns whether one was present.
    pub fn clear(&mut self, kind: SourceKind) -> bool {
        let before = self.slots.len();
        self.slots.retain(|slot| slot.kind != kind);
        self.slots.len() != before
    }

    pub fn get(&self, kind: SourceKind) -> Option<&str> {
        self.slots
            .iter()
            .find(|slot| slot.kind == kind)
            .map(|slot| slot.text.as_str())
    }

    /// Kinds with an active blob, in write order (oldest first).
    pub fn kinds(&self) -> Vec<SourceKind> {
        let mut slots: Vec<&Slot> = self.slots.iter().collect();
        slots.sort_by_key(|slot| slot.epoch);
        slots.into_iter().map(|slot| slot.kind).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Compose the prompt for one user turn: the user content, followed by
    /// each active context section in epoch order under its kind label.
    ///
    /// With no active context the prompt is the user content unchanged.
    pub fn assemble_prompt(&self, content: &str) -> String {
        if self.slots.is_empty() {
            return content.to_string();
        }

        let mut slots: Vec<&Slot> = self.slots.iter().collect();
        slots.sort_by_key(|slot| slot.epoch);

        let mut prompt = String::from(content);
        for slot in slots {
            prompt.push_str("\n\n[");
            prompt.push_str(slot.kind.context_label());
            prompt.push_str("]\n");
            prompt.push_str(&slot.text);
        }
        prompt
    }
}
