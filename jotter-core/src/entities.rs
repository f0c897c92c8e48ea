//! Note entity and the validated create request.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::identity::{NoteId, Timestamp};

/// Prefix for note entries in the key-value cache.
pub const CACHE_KEY_PREFIX: &str = "note:";

/// Build the cache key for a note, e.g. `note:42`.
pub fn cache_key(id: NoteId) -> String {
    format!("{}{}", CACHE_KEY_PREFIX, id)
}

/// A persisted note.
///
/// Only stores construct these, from a row that already carries the
/// generated id and creation time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub id: NoteId,
    pub title: String,
    pub content: String,
    pub created_at: Timestamp,
}

impl Note {
    pub fn cache_key(&self) -> String {
        cache_key(self.id)
    }
}

/// Title and content that passed request validation.
///
/// Holding a `NoteDraft` is proof that neither field is empty, so the store
/// port never sees an invalid create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteDraft {
    title: String,
    content: String,
}

impl NoteDraft {
    /// Validate a create request. The title is checked first.
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Result<Self, ValidationError> {
        let title = title.into();
        let content = content.into();

        if title.is_empty() {
            return Err(ValidationError::RequiredFieldMissing {
                field: "title".to_string(),
            });
        }
        if content.is_empty() {
            return Err(ValidationError::RequiredFieldMissing {
                field: "content".to_string(),
            });
        }

        Ok(Self { title, content })
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    /// Attach the store-assigned identity.
    pub fn into_note(self, id: NoteId, created_at: Timestamp) -> Note {
        Note {
            id,
            title: self.title,
            content: self.content,
            created_at,
        }
    }
}
