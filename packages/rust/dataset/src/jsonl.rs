//! Local JSON Lines sink.

use std::path::PathBuf;

use async_trait::async_trait;
use tracing::{info, instrument};

use adoptedtexts_shared::{AdoptedTextsError, DocumentRecord, Result};

use crate::{DatasetSink, SinkReceipt, to_jsonl};

/// Writes records to a local `.jsonl` file, replacing any previous run.
pub struct JsonlSink {
    path: PathBuf,
}

impl JsonlSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl DatasetSink for JsonlSink {
    fn name(&self) -> &str {
        "jsonl"
    }

    #[instrument(skip_all, fields(path = %self.path.display(), records = records.len()))]
    async fn push(&self, records: &[DocumentRecord]) -> Result<SinkReceipt> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| AdoptedTextsError::io(parent, e))?;
        }

        let bytes = to_jsonl(records)?;
        std::fs::write(&self.path, &bytes).map_err(|e| AdoptedTextsError::io(&self.path, e))?;

        info!(bytes = bytes.len(), "records written");

        Ok(SinkReceipt {
            sink: self.name().to_string(),
            records: records.len(),
            location: self.path.display().to_string(),
        })
    }
}
