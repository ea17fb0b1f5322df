//! Shared types, error model, and configuration for the adopted-texts harvester.
//!
//! This crate is the foundation depended on by all other workspace crates.
//! It provides:
//! - [`AdoptedTextsError`]: the unified error type
//! - Domain types ([`DocumentRecord`])
//! - Configuration ([`AppConfig`], [`CrawlConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, CrawlConfig, DatasetConfig, ExtractConfig, HubConfig, config_dir,
    config_file_path, init_config, load_config, load_config_from,
};
pub use error::{AdoptedTextsError, Result};
pub use types::{DEFAULT_DATASET_NAME, DEFAULT_NAMESPACE, DocumentRecord, SEED_TOC_URL};
