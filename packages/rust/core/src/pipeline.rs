//! End-to-end harvest: seed TOC → link walk → empty-record policy → sinks.

use std::time::{Duration, Instant};

use tracing::{info, instrument, warn};
use url::Url;

use adoptedtexts_crawler::{LinkWalker, PageFetcher, WalkEnd, WalkProgress};
use adoptedtexts_dataset::{DatasetSink, SinkReceipt};
use adoptedtexts_extract::TextExtractor;
use adoptedtexts_shared::{AppConfig, DocumentRecord, Result};

/// Result of [`run_harvest`].
#[derive(Debug)]
pub struct HarvestReport {
    /// Records produced by the walk, before the empty-record policy.
    pub records_collected: usize,
    /// Records handed to every sink (0 when nothing was sunk).
    pub records_sunk: usize,
    /// Empty records dropped before sinking.
    pub empty_filtered: usize,
    /// TOC pages fetched.
    pub pages_visited: usize,
    /// Last TOC page reached.
    pub last_toc: Option<Url>,
    /// Why traversal stopped.
    pub end: WalkEnd,
    /// One receipt per sink that completed.
    pub receipts: Vec<SinkReceipt>,
    /// Total elapsed time.
    pub elapsed: Duration,
}

/// Progress callback for reporting harvest status.
pub trait HarvestProgress: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called after each TOC page fetch.
    fn toc_visited(&self, url: &Url, count: usize);
    /// Called after each record.
    fn record_collected(&self, record: &DocumentRecord, total: usize);
    /// Called when the harvest completes.
    fn done(&self, report: &HarvestReport);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl HarvestProgress for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn toc_visited(&self, _url: &Url, _count: usize) {}
    fn record_collected(&self, _record: &DocumentRecord, _total: usize) {}
    fn done(&self, _report: &HarvestReport) {}
}

/// Run the harvest.
///
/// 1. Walk the TOC chain from the configured seed
/// 2. Drop empty records unless `keep_empty_records` is set
/// 3. Push the records to every sink, in order
///
/// A traversal failure is not an error here: records gathered before it are
/// still flushed and the failure is reported in [`HarvestReport::end`]. Setup
/// and sink failures are returned as errors.
#[instrument(skip_all, fields(seed = %config.crawl.seed_url))]
pub async fn run_harvest(
    config: &AppConfig,
    fetcher: &dyn PageFetcher,
    sinks: &[Box<dyn DatasetSink>],
    progress: &dyn HarvestProgress,
) -> Result<HarvestReport> {
    let start = Instant::now();
    let seed = config.crawl.seed()?;
    let extractor = TextExtractor::new(&config.extract)?;

    info!("starting harvest");

    // --- Phase 1: Walk ---
    progress.phase("Walking table of contents");
    let outcome = LinkWalker::new(fetcher, &extractor, seed)
        .max_pages(config.crawl.max_pages)
        .run(&WalkProgressAdapter { inner: progress })
        .await;

    match &outcome.end {
        WalkEnd::Done { reason } => {
            info!(%reason, pages = outcome.pages_visited, "traversal finished")
        }
        WalkEnd::Failed { error } => warn!(
            %error,
            last_toc = ?outcome.last_toc.as_ref().map(Url::as_str),
            records = outcome.records.len(),
            "traversal failed, flushing collected records"
        ),
    }

    // --- Phase 2: Empty-record policy ---
    let records_collected = outcome.records.len();
    let records = apply_empty_policy(outcome.records, config.extract.keep_empty_records);
    let empty_filtered = records_collected - records.len();
    if empty_filtered > 0 {
        info!(empty_filtered, "dropped records without text");
    }

    // --- Phase 3: Sinks ---
    let mut receipts = Vec::with_capacity(sinks.len());
    if records.is_empty() {
        info!("No data scraped");
    } else {
        for sink in sinks {
            progress.phase(&format!("Pushing {} records to {}", records.len(), sink.name()));
            let receipt = sink.push(&records).await?;
            info!(sink = %receipt.sink, location = %receipt.location, "records sunk");
            receipts.push(receipt);
        }
    }

    let report = HarvestReport {
        records_collected,
        records_sunk: if receipts.is_empty() { 0 } else { records.len() },
        empty_filtered,
        pages_visited: outcome.pages_visited,
        last_toc: outcome.last_toc,
        end: outcome.end,
        receipts,
        elapsed: start.elapsed(),
    };

    progress.done(&report);

    info!(
        records = report.records_sunk,
        pages = report.pages_visited,
        elapsed_ms = report.elapsed.as_millis(),
        "harvest complete"
    );

    Ok(report)
}

fn apply_empty_policy(records: Vec<DocumentRecord>, keep_empty: bool) -> Vec<DocumentRecord> {
    if keep_empty {
        records
    } else {
        records.into_iter().filter(|r| !r.is_empty()).collect()
    }
}

// ---------------------------------------------------------------------------
// Walk progress adapter
// ---------------------------------------------------------------------------

/// Adapts a `HarvestProgress` to the walker's `WalkProgress` interface.
struct WalkProgressAdapter<'a> {
    inner: &'a dyn HarvestProgress,
}

impl WalkProgress for WalkProgressAdapter<'_> {
    fn toc_visited(&self, url: &Url, count: usize) {
        self.inner.toc_visited(url, count);
    }

    fn record_collected(&self, record: &DocumentRecord, total: usize) {
        self.inner.record_collected(record, total);
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;

    use adoptedtexts_crawler::{CrawlError, DoneReason, FetchError};
    use adoptedtexts_shared::AdoptedTextsError;

    use super::*;

    const BASE: &str = "https://www.europarl.europa.eu/doceo/document/";

    #[derive(Default)]
    struct ScriptedFetcher {
        pages: HashMap<String, std::result::Result<String, FetchError>>,
    }

    impl ScriptedFetcher {
        fn page(mut self, name: &str, html: String) -> Self {
            self.pages.insert(format!("{BASE}{name}"), Ok(html));
            self
        }

        fn failing(mut self, name: &str, error: FetchError) -> Self {
            self.pages.insert(format!("{BASE}{name}"), Err(error));
            self
        }
    }

    #[async_trait]
    impl PageFetcher for ScriptedFetcher {
        async fn fetch(&self, url: &Url) -> std::result::Result<String, FetchError> {
            self.pages
                .get(url.as_str())
                .cloned()
                .unwrap_or(Err(FetchError::NotFound))
        }
    }

    /// Records every push; optionally rejects them.
    struct MemorySink {
        name: String,
        reject: bool,
        pushes: Arc<Mutex<Vec<(String, usize)>>>,
    }

    impl MemorySink {
        fn boxed(name: &str, reject: bool, log: &Arc<Mutex<Vec<(String, usize)>>>) -> Box<dyn DatasetSink> {
            Box::new(Self {
                name: name.to_string(),
                reject,
                pushes: Arc::clone(log),
            })
        }
    }

    #[async_trait]
    impl DatasetSink for MemorySink {
        fn name(&self) -> &str {
            &self.name
        }

        async fn push(&self, records: &[DocumentRecord]) -> Result<SinkReceipt> {
            self.pushes
                .lock()
                .unwrap()
                .push((self.name.clone(), records.len()));
            if self.reject {
                return Err(AdoptedTextsError::upload("HTTP 401"));
            }
            Ok(SinkReceipt {
                sink: self.name.clone(),
                records: records.len(),
                location: format!("memory://{}", self.name),
            })
        }
    }

    fn toc(next: Option<&str>) -> String {
        let link = next
            .map(|n| format!(r#"<a href="{n}" title="Volgende">&gt;</a>"#))
            .unwrap_or_default();
        format!("<html><body><h1>Inhoudsopgave</h1>{link}</body></html>")
    }

    fn content(label: &str) -> String {
        format!(
            "<html><body><p>Het Europees Parlement neemt de resolutie over {label} aan \
             en verzoekt de Commissie om verslag uit te brengen.</p></body></html>"
        )
    }

    fn config(keep_empty: bool) -> AppConfig {
        let mut config = AppConfig::default();
        config.crawl.seed_url = format!("{BASE}TA-5-1999-07-21-TOC_NL.html");
        config.extract.keep_empty_records = keep_empty;
        config
    }

    /// Three sittings; the middle content page has no text.
    fn three_sittings() -> ScriptedFetcher {
        ScriptedFetcher::default()
            .page("TA-5-1999-07-21-TOC_NL.html", toc(Some("TA-5-1999-07-22-TOC_NL.html")))
            .page("TA-5-1999-07-21_NL.html", content("visserij"))
            .page("TA-5-1999-07-22-TOC_NL.html", toc(Some("TA-5-1999-07-23-TOC_NL.html")))
            .page("TA-5-1999-07-22_NL.html", "<html><body></body></html>".to_string())
            .page("TA-5-1999-07-23-TOC_NL.html", toc(None))
            .page("TA-5-1999-07-23_NL.html", content("landbouw"))
    }

    #[tokio::test]
    async fn pushes_to_every_sink_in_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let sinks = vec![
            MemorySink::boxed("local", false, &log),
            MemorySink::boxed("remote", false, &log),
        ];

        let report = run_harvest(&config(false), &three_sittings(), &sinks, &SilentProgress)
            .await
            .unwrap();

        assert_eq!(report.pages_visited, 3);
        assert_eq!(report.records_collected, 3);
        assert_eq!(report.empty_filtered, 1);
        assert_eq!(report.records_sunk, 2);
        assert_eq!(
            report.end,
            WalkEnd::Done {
                reason: DoneReason::NoNextLink
            }
        );
        assert_eq!(report.receipts.len(), 2);
        assert_eq!(
            *log.lock().unwrap(),
            vec![("local".to_string(), 2), ("remote".to_string(), 2)]
        );
    }

    #[tokio::test]
    async fn keep_empty_records_sinks_everything() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let sinks = vec![MemorySink::boxed("local", false, &log)];

        let report = run_harvest(&config(true), &three_sittings(), &sinks, &SilentProgress)
            .await
            .unwrap();

        assert_eq!(report.empty_filtered, 0);
        assert_eq!(report.records_sunk, 3);
    }

    #[tokio::test]
    async fn nothing_scraped_skips_sinks() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let sinks = vec![MemorySink::boxed("local", false, &log)];
        let fetcher = ScriptedFetcher::default().failing(
            "TA-5-1999-07-21-TOC_NL.html",
            FetchError::Transient("HTTP 503".into()),
        );

        let report = run_harvest(&config(false), &fetcher, &sinks, &SilentProgress)
            .await
            .unwrap();

        assert_eq!(report.records_sunk, 0);
        assert!(report.receipts.is_empty());
        assert!(report.end.is_failed());
        assert!(log.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn traversal_failure_still_flushes_records() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let sinks = vec![MemorySink::boxed("local", false, &log)];
        let fetcher = ScriptedFetcher::default()
            .page("TA-5-1999-07-21-TOC_NL.html", toc(Some("TA-5-1999-07-22-TOC_NL.html")))
            .page("TA-5-1999-07-21_NL.html", content("visserij"))
            .failing(
                "TA-5-1999-07-22-TOC_NL.html",
                FetchError::Transient("connection reset".into()),
            );

        let report = run_harvest(&config(false), &fetcher, &sinks, &SilentProgress)
            .await
            .unwrap();

        assert_eq!(report.records_sunk, 1);
        assert!(matches!(
            report.end,
            WalkEnd::Failed {
                error: CrawlError::Transient { .. }
            }
        ));
        assert_eq!(*log.lock().unwrap(), vec![("local".to_string(), 1)]);
    }

    #[tokio::test]
    async fn sink_failure_stops_later_sinks() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let sinks = vec![
            MemorySink::boxed("remote", true, &log),
            MemorySink::boxed("never", false, &log),
        ];

        let err = run_harvest(&config(false), &three_sittings(), &sinks, &SilentProgress)
            .await
            .unwrap_err();

        assert!(matches!(err, AdoptedTextsError::Upload(_)));
        assert_eq!(*log.lock().unwrap(), vec![("remote".to_string(), 2)]);
    }

    #[tokio::test]
    async fn max_pages_limits_the_walk() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let sinks = vec![MemorySink::boxed("local", false, &log)];
        let mut config = config(false);
        config.crawl.max_pages = Some(1);

        let report = run_harvest(&config, &three_sittings(), &sinks, &SilentProgress)
            .await
            .unwrap();

        assert_eq!(report.pages_visited, 1);
        assert_eq!(report.records_sunk, 1);
        assert_eq!(
            report.end,
            WalkEnd::Done {
                reason: DoneReason::PageLimit { limit: 1 }
            }
        );
    }

    #[test]
    fn empty_policy_filters_only_when_asked() {
        let records = vec![
            DocumentRecord::new("https://example.test/a", "tekst"),
            DocumentRecord::new("https://example.test/b", ""),
        ];
        assert_eq!(apply_empty_policy(records.clone(), true).len(), 2);
        assert_eq!(apply_empty_policy(records, false).len(), 1);
    }
}
