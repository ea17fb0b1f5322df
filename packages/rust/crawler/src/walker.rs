//! Link walker: the sequential traversal of the TOC chain.
//!
//! The walk is an explicit state machine. Each TOC page is fetched, its
//! content URL derived and fetched, the text extracted into a
//! [`DocumentRecord`], and the "Volgende" link followed, until no next link
//! exists (`Done`) or a fetch/URL failure ends the walk (`Failed`). Records
//! gathered before a failure are always returned.

use std::collections::HashSet;

use tracing::{debug, error, info, instrument, warn};
use url::Url;

use adoptedtexts_extract::{Extraction, TextExtractor};
use adoptedtexts_shared::DocumentRecord;

use crate::error::CrawlError;
use crate::fetcher::{FetchError, PageFetcher};
use crate::links::find_next_link;
use crate::urls::{Correction, TermTable, correct_term, derive_content_url};

// ---------------------------------------------------------------------------
// States
// ---------------------------------------------------------------------------

/// A fetched table-of-contents page.
#[derive(Debug, Clone)]
pub struct TocPage {
    /// Final URL (after any term correction).
    pub url: Url,
    pub html: String,
}

/// States of the link walk. `Done` and `Failed` are terminal.
#[derive(Debug, Clone)]
pub enum WalkState {
    Start,
    FetchingToc { url: Url },
    DerivingContent { toc: TocPage },
    FetchingContent { toc: TocPage, content_url: Url },
    Extracting { toc: TocPage, content_url: Url, html: String },
    AdvancingLink { toc: TocPage },
    Done { reason: DoneReason },
    Failed { error: CrawlError },
}

impl WalkState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done { .. } | Self::Failed { .. })
    }
}

/// Why a walk completed normally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DoneReason {
    /// The last TOC page has no "Volgende" link.
    NoNextLink,
    /// The next link points back to a page already visited.
    Revisited { url: String },
    /// The configured page cap was reached.
    PageLimit { limit: usize },
}

impl std::fmt::Display for DoneReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoNextLink => write!(f, "no next link"),
            Self::Revisited { url } => write!(f, "next link revisits {url}"),
            Self::PageLimit { limit } => write!(f, "page limit of {limit} reached"),
        }
    }
}

/// How a walk ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalkEnd {
    Done { reason: DoneReason },
    Failed { error: CrawlError },
}

impl WalkEnd {
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// Everything a finished walk produced.
#[derive(Debug, Clone)]
pub struct WalkOutcome {
    /// Records in chain order, including those gathered before a failure.
    pub records: Vec<DocumentRecord>,
    /// Number of TOC pages fetched successfully.
    pub pages_visited: usize,
    /// Number of content pages that yielded no text.
    pub extraction_misses: usize,
    /// Last TOC page fetched successfully.
    pub last_toc: Option<Url>,
    pub end: WalkEnd,
}

// ---------------------------------------------------------------------------
// Progress
// ---------------------------------------------------------------------------

/// Progress callback for the walk.
pub trait WalkProgress: Send + Sync {
    /// Called after a TOC page was fetched.
    fn toc_visited(&self, url: &Url, count: usize);
    /// Called after a record was appended.
    fn record_collected(&self, record: &DocumentRecord, total: usize);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl WalkProgress for SilentProgress {
    fn toc_visited(&self, _url: &Url, _count: usize) {}
    fn record_collected(&self, _record: &DocumentRecord, _total: usize) {}
}

// ---------------------------------------------------------------------------
// Walker
// ---------------------------------------------------------------------------

/// Mutable state owned by one walk: cursor history and accumulated records.
#[derive(Default)]
struct WalkContext {
    records: Vec<DocumentRecord>,
    visited: HashSet<String>,
    pages_visited: usize,
    extraction_misses: usize,
    last_toc: Option<Url>,
}

/// Drives the traversal from a seed TOC URL.
pub struct LinkWalker<'a, F: PageFetcher + ?Sized> {
    fetcher: &'a F,
    extractor: &'a TextExtractor,
    terms: TermTable,
    seed: Url,
    max_pages: Option<usize>,
}

impl<'a, F: PageFetcher + ?Sized> LinkWalker<'a, F> {
    pub fn new(fetcher: &'a F, extractor: &'a TextExtractor, seed: Url) -> Self {
        Self {
            fetcher,
            extractor,
            terms: TermTable::default(),
            seed,
            max_pages: None,
        }
    }

    /// Stop after `limit` TOC pages.
    pub fn max_pages(mut self, limit: Option<usize>) -> Self {
        self.max_pages = limit;
        self
    }

    /// Use a different term table.
    pub fn terms(mut self, terms: TermTable) -> Self {
        self.terms = terms;
        self
    }

    /// Run the walk to a terminal state.
    #[instrument(skip_all, fields(seed = %self.seed))]
    pub async fn run(&self, progress: &dyn WalkProgress) -> WalkOutcome {
        let mut ctx = WalkContext::default();
        let mut state = WalkState::Start;

        info!(max_pages = ?self.max_pages, "starting link walk");

        while !state.is_terminal() {
            state = self.step(state, &mut ctx, progress).await;
        }

        let end = match state {
            WalkState::Done { reason } => {
                info!(
                    pages = ctx.pages_visited,
                    records = ctx.records.len(),
                    %reason,
                    "link walk done"
                );
                WalkEnd::Done { reason }
            }
            WalkState::Failed { error } => {
                error!(
                    pages = ctx.pages_visited,
                    records = ctx.records.len(),
                    url = error.url(),
                    %error,
                    "link walk failed"
                );
                WalkEnd::Failed { error }
            }
            _ => unreachable!("loop exits on terminal states only"),
        };

        WalkOutcome {
            records: ctx.records,
            pages_visited: ctx.pages_visited,
            extraction_misses: ctx.extraction_misses,
            last_toc: ctx.last_toc,
            end,
        }
    }

    /// Perform one transition.
    async fn step(
        &self,
        state: WalkState,
        ctx: &mut WalkContext,
        progress: &dyn WalkProgress,
    ) -> WalkState {
        match state {
            WalkState::Start => match self.max_pages {
                Some(0) => WalkState::Done {
                    reason: DoneReason::PageLimit { limit: 0 },
                },
                _ => WalkState::FetchingToc {
                    url: self.seed.clone(),
                },
            },

            WalkState::FetchingToc { url } => {
                ctx.visited.insert(visit_key(&url));
                match self.fetch_with_correction(&url).await {
                    Ok((url, html)) => {
                        ctx.visited.insert(visit_key(&url));
                        ctx.pages_visited += 1;
                        ctx.last_toc = Some(url.clone());
                        progress.toc_visited(&url, ctx.pages_visited);
                        WalkState::DerivingContent {
                            toc: TocPage { url, html },
                        }
                    }
                    Err(error) => WalkState::Failed { error },
                }
            }

            WalkState::DerivingContent { toc } => match derive_content_url(&toc.url) {
                Ok(content_url) => WalkState::FetchingContent { toc, content_url },
                Err(error) => WalkState::Failed { error },
            },

            WalkState::FetchingContent { toc, content_url } => {
                match self.fetch_with_correction(&content_url).await {
                    Ok((content_url, html)) => WalkState::Extracting {
                        toc,
                        content_url,
                        html,
                    },
                    Err(error) => WalkState::Failed { error },
                }
            }

            WalkState::Extracting {
                toc,
                content_url,
                html,
            } => {
                let extraction = self.extractor.extract(&html);
                if let Extraction::Miss(reason) = &extraction {
                    warn!(url = %content_url, %reason, "no text extracted");
                    ctx.extraction_misses += 1;
                }

                let record = DocumentRecord::new(content_url.as_str(), extraction.into_text());
                ctx.records.push(record);
                if let Some(record) = ctx.records.last() {
                    progress.record_collected(record, ctx.records.len());
                }

                WalkState::AdvancingLink { toc }
            }

            WalkState::AdvancingLink { toc } => {
                let Some(mut next) = find_next_link(&toc.html, &toc.url) else {
                    return WalkState::Done {
                        reason: DoneReason::NoNextLink,
                    };
                };
                next.set_fragment(None);

                if let Some(limit) = self.max_pages {
                    if ctx.pages_visited >= limit {
                        return WalkState::Done {
                            reason: DoneReason::PageLimit { limit },
                        };
                    }
                }

                if ctx.visited.contains(next.as_str()) {
                    warn!(url = %next, "next link points to a visited page");
                    return WalkState::Done {
                        reason: DoneReason::Revisited {
                            url: next.to_string(),
                        },
                    };
                }

                debug!(from = %toc.url, to = %next, "following next link");
                WalkState::FetchingToc { url: next }
            }

            terminal @ (WalkState::Done { .. } | WalkState::Failed { .. }) => terminal,
        }
    }

    /// Fetch `url`; on not-found, retry exactly once with a corrected term.
    ///
    /// Returns the URL that actually served the page.
    async fn fetch_with_correction(&self, url: &Url) -> Result<(Url, String), CrawlError> {
        match self.fetcher.fetch(url).await {
            Ok(html) => return Ok((url.clone(), html)),
            Err(FetchError::Transient(message)) => {
                return Err(CrawlError::Transient {
                    url: url.to_string(),
                    message,
                });
            }
            Err(FetchError::NotFound) => {}
        }

        let corrected = match correct_term(url, &self.terms)? {
            Correction::Rewritten(corrected) => corrected,
            Correction::AlreadyCorrect => {
                return Err(CrawlError::NotFound {
                    url: url.to_string(),
                });
            }
        };

        warn!(from = %url, to = %corrected, "page not found, retrying with corrected term");

        match self.fetcher.fetch(&corrected).await {
            Ok(html) => Ok((corrected, html)),
            Err(FetchError::NotFound) => Err(CrawlError::NotFound {
                url: corrected.to_string(),
            }),
            Err(FetchError::Transient(message)) => Err(CrawlError::Transient {
                url: corrected.to_string(),
                message,
            }),
        }
    }
}

/// Key for the visited set: the URL without its fragment.
fn visit_key(url: &Url) -> String {
    let mut key = url.clone();
    key.set_fragment(None);
    key.to_string()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
