//! Traversal of the European Parliament adopted-texts TOC chain.
//!
//! This crate provides:
//! - [`urls`]: TOC → content URL derivation and term-number correction
//! - [`fetcher`]: the [`PageFetcher`] seam and its HTTP implementation
//! - [`links`]: "Volgende" link discovery
//! - [`walker`]: the sequential link-walk state machine

pub mod error;
pub mod fetcher;
pub mod links;
pub mod urls;
pub mod walker;

pub use error::CrawlError;
pub use fetcher::{FetchError, HttpFetcher, PageFetcher};
pub use links::find_next_link;
pub use urls::{
    Correction, TermPeriod, TermTable, TermToken, correct_term, derive_content_url, is_toc_url,
    strip_toc_marker,
};
pub use walker::{
    DoneReason, LinkWalker, SilentProgress, TocPage, WalkEnd, WalkOutcome, WalkProgress,
    WalkState,
};
