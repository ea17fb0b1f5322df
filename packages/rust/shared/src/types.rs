//! Core domain types for the adopted-texts dataset.

use serde::{Deserialize, Serialize};

/// First table-of-contents page of the adopted texts chain (5th term, July 1999).
pub const SEED_TOC_URL: &str =
    "https://www.europarl.europa.eu/doceo/document/TA-5-1999-07-21-TOC_NL.html";

/// Name of the remote dataset repository.
pub const DEFAULT_DATASET_NAME: &str = "Dutch-European-Parliament-Adopted-Texts";

/// Namespace used for the dataset repository when `HF_USERNAME` is not set.
pub const DEFAULT_NAMESPACE: &str = "vGassen";

// ---------------------------------------------------------------------------
// DocumentRecord
// ---------------------------------------------------------------------------

/// One adopted-text document: the content page URL and its cleaned text.
///
/// Records are created once per fetched content page and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRecord {
    /// Content page URL (the TOC URL with its `-TOC` marker removed).
    pub url: String,
    /// Extracted plain text; empty when the text container was missing.
    pub text: String,
}

impl DocumentRecord {
    pub fn new(url: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            text: text.into(),
        }
    }

    /// Whether extraction produced no text for this page.
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}
