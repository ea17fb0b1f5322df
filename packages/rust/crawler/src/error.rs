//! Traversal failures of the link walk.

/// Why a link walk stopped early.
///
/// Every variant carries the URL the walk was working on, so a failed run can
/// report exactly where traversal stopped.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CrawlError {
    /// Page missing, and the single term correction did not help.
    #[error("page not found: {url}")]
    NotFound { url: String },

    /// The year embedded in the URL has no parliamentary term.
    #[error("no parliamentary term known for year {year} ({url})")]
    UnmappedYear { url: String, year: i32 },

    /// Any other HTTP status or transport failure.
    #[error("fetch failed for {url}: {message}")]
    Transient { url: String, message: String },

    /// A table-of-contents URL without its `-TOC` marker.
    #[error("URL has no -TOC marker: {url}")]
    MissingTocMarker { url: String },

    /// A not-found URL without a `TA-<term>-<yyyy>-<mm>-<dd>` token to correct.
    #[error("URL has no TA-<term>-<date> token: {url}")]
    NoTermToken { url: String },
}

impl CrawlError {
    /// The URL the walk was processing when it failed.
    pub fn url(&self) -> &str {
        match self {
            Self::NotFound { url }
            | Self::UnmappedYear { url, .. }
            | Self::Transient { url, .. }
            | Self::MissingTocMarker { url }
            | Self::NoTermToken { url } => url,
        }
    }
}
