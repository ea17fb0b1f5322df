//! Application configuration for the harvester.
//!
//! User config lives at `~/.adoptedtexts/adoptedtexts.toml` and is optional.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{AdoptedTextsError, Result};
use crate::types::{DEFAULT_DATASET_NAME, DEFAULT_NAMESPACE, SEED_TOC_URL};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "adoptedtexts.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".adoptedtexts";

// ---------------------------------------------------------------------------
// Config structs (matching adoptedtexts.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Link walk settings.
    #[serde(default)]
    pub crawl: CrawlConfig,

    /// Text extraction settings.
    #[serde(default)]
    pub extract: ExtractConfig,

    /// Output dataset settings.
    #[serde(default)]
    pub dataset: DatasetConfig,

    /// Remote dataset host settings.
    #[serde(default)]
    pub hub: HubConfig,
}

/// `[crawl]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlConfig {
    /// First table-of-contents page of the chain.
    #[serde(default = "default_seed_url")]
    pub seed_url: String,

    /// Pause in ms before every request.
    #[serde(default = "default_rate_limit")]
    pub rate_limit_ms: u64,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Stop after this many TOC pages (unbounded when absent).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_pages: Option<usize>,

    /// User-Agent header sent with every request.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            seed_url: default_seed_url(),
            rate_limit_ms: default_rate_limit(),
            timeout_secs: default_timeout(),
            max_pages: None,
            user_agent: default_user_agent(),
        }
    }
}

impl CrawlConfig {
    /// Parse the configured seed URL.
    pub fn seed(&self) -> Result<Url> {
        Url::parse(&self.seed_url).map_err(|e| {
            AdoptedTextsError::config(format!("invalid seed_url '{}': {e}", self.seed_url))
        })
    }
}

fn default_seed_url() -> String {
    SEED_TOC_URL.into()
}
fn default_rate_limit() -> u64 {
    200
}
fn default_timeout() -> u64 {
    20
}
fn default_user_agent() -> String {
    concat!("AdoptedTexts/", env!("CARGO_PKG_VERSION")).into()
}

/// `[extract]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractConfig {
    /// CSS selector of the region holding the adopted text.
    #[serde(default = "default_container")]
    pub container_selector: String,

    /// Cleaned text at or below this many characters counts as missing.
    #[serde(default = "default_min_text_len")]
    pub min_text_len: usize,

    /// Keep records whose text came out empty instead of dropping them before sinking.
    #[serde(default)]
    pub keep_empty_records: bool,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            container_selector: default_container(),
            min_text_len: default_min_text_len(),
            keep_empty_records: false,
        }
    }
}

fn default_container() -> String {
    "body".into()
}
fn default_min_text_len() -> usize {
    50
}

/// `[dataset]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetConfig {
    /// Dataset repository name (without namespace).
    #[serde(default = "default_dataset_name")]
    pub name: String,

    /// Namespace used when the username env var is unset.
    #[serde(default = "default_namespace")]
    pub default_namespace: String,

    /// Local JSON Lines output file.
    #[serde(default = "default_output_path")]
    pub output_path: PathBuf,

    /// Path of the records file inside the remote repository.
    #[serde(default = "default_data_file")]
    pub data_file: String,

    /// Create the remote repository as private.
    #[serde(default)]
    pub private: bool,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            name: default_dataset_name(),
            default_namespace: default_namespace(),
            output_path: default_output_path(),
            data_file: default_data_file(),
            private: false,
        }
    }
}

fn default_dataset_name() -> String {
    DEFAULT_DATASET_NAME.into()
}
fn default_namespace() -> String {
    DEFAULT_NAMESPACE.into()
}
fn default_output_path() -> PathBuf {
    PathBuf::from("output").join("adopted-texts.jsonl")
}
fn default_data_file() -> String {
    "data/train.jsonl".into()
}

/// `[hub]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HubConfig {
    /// Base URL of the dataset host API.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Name of the env var holding the username (never store the value itself).
    #[serde(default = "default_username_env")]
    pub username_env: String,

    /// Name of the env var holding the access token (never store the token itself).
    #[serde(default = "default_token_env")]
    pub token_env: String,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            username_env: default_username_env(),
            token_env: default_token_env(),
        }
    }
}

fn default_endpoint() -> String {
    "https://huggingface.co".into()
}
fn default_username_env() -> String {
    "HF_USERNAME".into()
}
fn default_token_env() -> String {
    "HF_TOKEN".into()
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.adoptedtexts/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| AdoptedTextsError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.adoptedtexts/adoptedtexts.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| AdoptedTextsError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        AdoptedTextsError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| AdoptedTextsError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| AdoptedTextsError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| AdoptedTextsError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}
