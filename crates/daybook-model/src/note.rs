//! Composite note field codec.
//!
//! Remark columns store a category selection plus free-text detail as a
//! single text value, e.g. `"returned: wrong size"`. The decoder must keep
//! legacy free-text remarks intact, so unknown text without a category
//! prefix decodes as pure detail.

use serde::{Deserialize, Serialize};

/// Separator between the category and the detail text.
pub const NOTE_SEPARATOR: &str = ": ";

/// Category list used by the built-in daily sales schema.
pub const DEFAULT_NOTE_CATEGORIES: [&str; 4] =
    ["returned", "failed delivery", "cancelled", "other"];

/// A decoded note: an optional category from a fixed list plus free text.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteParts {
    /// Selected category, or empty when none applies.
    pub category: String,
    /// Free-text detail.
    pub detail: String,
}

impl NoteParts {
    pub fn new(category: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            detail: detail.into(),
        }
    }
}

/// Encode a (category, detail) pair into the stored text value.
///
/// An empty category yields empty text regardless of `detail`; a non-empty
/// category always includes the separator, even with empty detail
/// (`"returned: "`), so the decoder can tell category-only notes apart from
/// legacy free text.
pub fn encode_note(category: &str, detail: &str) -> String {
    if category.is_empty() {
        return String::new();
    }
    format!("{category}{NOTE_SEPARATOR}{detail}")
}

/// Decode a stored note value against a list of known categories.
///
/// Splits on the first separator occurrence. Text without a separator is a
/// bare category only if it matches `categories` exactly; otherwise the
/// whole text is preserved as detail so legacy remarks survive a load/edit
/// cycle.
pub fn decode_note(text: &str, categories: &[String]) -> NoteParts {
    if text.is_empty() {
        return NoteParts::default();
    }

    if let Some((head, rest)) = text.split_once(NOTE_SEPARATOR) {
        if categories.iter().any(|c| c == head) {
            return NoteParts::new(head, rest);
        }
        return NoteParts::new("", text);
    }

    if categories.iter().any(|c| c == text) {
        return NoteParts::new(text, "");
    }
    NoteParts::new("", text)
}
