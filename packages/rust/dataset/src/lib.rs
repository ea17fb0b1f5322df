//! Dataset sinks for harvested adopted texts.
//!
//! A [`DatasetSink`] receives the full list of records once, at the end of a
//! run. Two sinks exist:
//! - [`JsonlSink`]: local JSON Lines file, always written
//! - [`HubSink`]: Hugging Face Hub dataset repository, when credentials are present

mod card;
mod hub;
mod jsonl;

use async_trait::async_trait;

use adoptedtexts_shared::{DocumentRecord, Result};

pub use card::render_dataset_card;
pub use hub::{HubClient, HubCredentials, HubSink, UploadFile, UploadMode};
pub use jsonl::JsonlSink;

/// Where a sink put the records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkReceipt {
    /// Sink name, for reporting.
    pub sink: String,
    /// Number of records written.
    pub records: usize,
    /// File path or remote URL of the written dataset.
    pub location: String,
}

/// Destination for the collected records.
#[async_trait]
pub trait DatasetSink: Send + Sync {
    /// Human-readable sink name for tracing.
    fn name(&self) -> &str;

    /// Write (or replace) the dataset with `records`.
    async fn push(&self, records: &[DocumentRecord]) -> Result<SinkReceipt>;
}

/// Serialize records as JSON Lines: one `{"url", "text"}` object per line.
pub fn to_jsonl(records: &[DocumentRecord]) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    for record in records {
        serde_json::to_writer(&mut out, record)?;
        out.push(b'\n');
    }
    Ok(out)
}
