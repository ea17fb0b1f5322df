//! Harvest orchestration for the adopted-texts crawler.
//!
//! This crate ties together the link walk, text extraction and the dataset
//! sinks into one end-to-end run (`run_harvest`).

pub mod pipeline;

pub use pipeline::{HarvestProgress, HarvestReport, SilentProgress, run_harvest};
