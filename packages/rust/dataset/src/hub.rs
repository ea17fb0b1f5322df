//! Hugging Face Hub dataset sink.
//!
//! Speaks the Hub's HTTP API directly: create the repository, ask which files
//! need Git LFS, upload LFS objects, then commit everything in one NDJSON
//! commit on `main`. Each push replaces the previous files.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::Utc;
use reqwest::header::{ACCEPT, CONTENT_TYPE, ETAG};
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use serde_json::json;
use sha2::{Digest, Sha256};
use tracing::{debug, info, instrument};

use adoptedtexts_shared::{
    AdoptedTextsError, DatasetConfig, DocumentRecord, HubConfig, Result,
};

use crate::card::render_dataset_card;
use crate::{DatasetSink, SinkReceipt, to_jsonl};

const LFS_CONTENT_TYPE: &str = "application/vnd.git-lfs+json";
const SAMPLE_LEN: usize = 512;

// ---------------------------------------------------------------------------
// Credentials
// ---------------------------------------------------------------------------

/// Hub namespace and access token.
#[derive(Clone)]
pub struct HubCredentials {
    pub namespace: String,
    token: String,
}

impl HubCredentials {
    /// Read the token and username from the environment variables named in
    /// `hub`. Returns `None` when no token is set.
    pub fn from_env(hub: &HubConfig, dataset: &DatasetConfig) -> Option<Self> {
        Self::from_values(
            std::env::var(&hub.token_env).ok(),
            std::env::var(&hub.username_env).ok(),
            &dataset.default_namespace,
        )
    }

    /// Build credentials from raw values. Blank values count as unset; a
    /// missing username falls back to `default_namespace`.
    pub fn from_values(
        token: Option<String>,
        username: Option<String>,
        default_namespace: &str,
    ) -> Option<Self> {
        let token = token.map(|t| t.trim().to_string()).filter(|t| !t.is_empty())?;
        let namespace = username
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| default_namespace.to_string());
        Some(Self { namespace, token })
    }

    pub fn token(&self) -> &str {
        &self.token
    }
}

impl fmt::Debug for HubCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HubCredentials")
            .field("namespace", &self.namespace)
            .field("token", &"<redacted>")
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Files and upload modes
// ---------------------------------------------------------------------------

/// How the Hub wants a file transferred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadMode {
    /// Inline, base64 in the commit body.
    Regular,
    /// Stored through Git LFS, referenced by SHA-256 in the commit.
    Lfs,
}

/// A file to place in the dataset repository.
#[derive(Debug, Clone)]
pub struct UploadFile {
    /// Path inside the repository, e.g. `data/train.jsonl`.
    pub path: String,
    pub content: Vec<u8>,
}

impl UploadFile {
    pub fn new(path: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }

    pub fn size(&self) -> usize {
        self.content.len()
    }

    /// Lowercase hex SHA-256 of the content (the LFS object id).
    pub fn oid(&self) -> String {
        let digest = Sha256::digest(&self.content);
        digest.iter().map(|b| format!("{b:02x}")).collect()
    }

    /// Base64 of the first bytes, sent to the preupload endpoint.
    pub fn sample(&self) -> String {
        let end = self.content.len().min(SAMPLE_LEN);
        BASE64.encode(&self.content[..end])
    }
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct PreuploadResponse {
    files: Vec<PreuploadFile>,
}

#[derive(Debug, Deserialize)]
struct PreuploadFile {
    path: String,
    #[serde(rename = "uploadMode")]
    upload_mode: UploadMode,
}

#[derive(Debug, Deserialize)]
struct BatchResponse {
    objects: Vec<BatchObject>,
}

#[derive(Debug, Deserialize)]
struct BatchObject {
    oid: String,
    #[serde(default)]
    actions: Option<BatchActions>,
    #[serde(default)]
    error: Option<BatchError>,
}

#[derive(Debug, Deserialize)]
struct BatchActions {
    upload: Option<LfsAction>,
    verify: Option<LfsAction>,
}

#[derive(Debug, Deserialize)]
struct LfsAction {
    href: String,
    #[serde(default)]
    header: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct BatchError {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct CommitResponse {
    #[serde(rename = "commitUrl", default)]
    commit_url: Option<String>,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Thin client for one dataset repository on the Hub.
pub struct HubClient {
    client: Client,
    endpoint: String,
    repo_id: String,
    token: String,
}

impl HubClient {
    pub fn new(endpoint: &str, repo_id: impl Into<String>, token: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("AdoptedTexts/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| AdoptedTextsError::Network(format!("failed to build HTTP client: {e}")))?;

        let repo_id = repo_id.into();
        if repo_id.trim().is_empty() || !repo_id.contains('/') {
            return Err(AdoptedTextsError::validation(format!(
                "invalid dataset repo id '{repo_id}'"
            )));
        }

        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            repo_id,
            token: token.into(),
        })
    }

    pub fn repo_id(&self) -> &str {
        &self.repo_id
    }

    /// Public URL of the dataset page.
    pub fn dataset_url(&self) -> String {
        format!("{}/datasets/{}", self.endpoint, self.repo_id)
    }

    /// Create the dataset repository. An existing repository is not an error.
    #[instrument(skip(self), fields(repo = %self.repo_id))]
    pub async fn create_dataset_repo(&self, private: bool) -> Result<()> {
        let (organization, name) = self
            .repo_id
            .split_once('/')
            .unwrap_or(("", self.repo_id.as_str()));

        let response = self
            .client
            .post(format!("{}/api/repos/create", self.endpoint))
            .bearer_auth(&self.token)
            .json(&json!({
                "name": name,
                "organization": organization,
                "type": "dataset",
                "private": private,
            }))
            .send()
            .await
            .map_err(network)?;

        if response.status() == StatusCode::CONFLICT {
            debug!("dataset repository already exists");
            return Ok(());
        }
        ensure_success(response, "create repository").await?;
        info!("dataset repository created");
        Ok(())
    }

    /// Ask the Hub how each file should be uploaded. Files the response does
    /// not mention are treated as regular.
    #[instrument(skip_all, fields(repo = %self.repo_id, files = files.len()))]
    pub async fn preupload(&self, files: &[UploadFile]) -> Result<Vec<UploadMode>> {
        let body = json!({
            "files": files
                .iter()
                .map(|f| json!({ "path": f.path, "size": f.size(), "sample": f.sample() }))
                .collect::<Vec<_>>(),
        });

        let response = self
            .client
            .post(format!(
                "{}/api/datasets/{}/preupload/main",
                self.endpoint, self.repo_id
            ))
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await
            .map_err(network)?;
        let response = ensure_success(response, "preupload").await?;

        let parsed: PreuploadResponse = response
            .json()
            .await
            .map_err(|e| AdoptedTextsError::parse(format!("invalid preupload response: {e}")))?;

        let modes = files
            .iter()
            .map(|f| {
                parsed
                    .files
                    .iter()
                    .find(|p| p.path == f.path)
                    .map(|p| p.upload_mode)
                    .unwrap_or(UploadMode::Regular)
            })
            .collect();
        Ok(modes)
    }

    /// Store `file` as a Git LFS object.
    #[instrument(skip_all, fields(repo = %self.repo_id, path = %file.path, size = file.size()))]
    pub async fn upload_lfs(&self, file: &UploadFile) -> Result<()> {
        let oid = file.oid();
        let response = self
            .client
            .post(format!(
                "{}/datasets/{}.git/info/lfs/objects/batch",
                self.endpoint, self.repo_id
            ))
            .bearer_auth(&self.token)
            .header(ACCEPT, LFS_CONTENT_TYPE)
            .header(CONTENT_TYPE, LFS_CONTENT_TYPE)
            .body(
                json!({
                    "operation": "upload",
                    "transfers": ["basic", "multipart"],
                    "objects": [{ "oid": oid, "size": file.size() }],
                    "hash_algo": "sha256",
                })
                .to_string(),
            )
            .send()
            .await
            .map_err(network)?;
        let response = ensure_success(response, "LFS batch").await?;

        let text = response.text().await.map_err(network)?;
        let batch: BatchResponse = serde_json::from_str(&text)
            .map_err(|e| AdoptedTextsError::parse(format!("invalid LFS batch response: {e}")))?;

        let object = batch
            .objects
            .into_iter()
            .find(|o| o.oid == oid)
            .ok_or_else(|| AdoptedTextsError::upload(format!("LFS batch response lacks object {oid}")))?;

        if let Some(err) = object.error {
            return Err(AdoptedTextsError::upload(format!(
                "LFS batch rejected {}: {} {}",
                file.path, err.code, err.message
            )));
        }

        let Some(actions) = object.actions else {
            debug!("LFS object already stored");
            return Ok(());
        };

        if let Some(upload) = &actions.upload {
            if upload.header.contains_key("chunk_size") {
                self.upload_multipart(file, &oid, upload).await?;
            } else {
                self.upload_single(file, upload).await?;
            }
        }

        if let Some(verify) = &actions.verify {
            let response = self
                .client
                .post(&verify.href)
                .bearer_auth(&self.token)
                .headers(header_map(&verify.header))
                .header(CONTENT_TYPE, LFS_CONTENT_TYPE)
                .body(json!({ "oid": oid, "size": file.size() }).to_string())
                .send()
                .await
                .map_err(network)?;
            ensure_success(response, "LFS verify").await?;
        }

        info!("LFS object uploaded");
        Ok(())
    }

    async fn upload_single(&self, file: &UploadFile, action: &LfsAction) -> Result<()> {
        let response = self
            .client
            .put(&action.href)
            .headers(header_map(&action.header))
            .body(file.content.clone())
            .send()
            .await
            .map_err(network)?;
        ensure_success(response, "LFS upload").await?;
        Ok(())
    }

    /// Upload in parts. The action header maps `chunk_size` to the part size
    /// and each part number to its presigned URL.
    async fn upload_multipart(&self, file: &UploadFile, oid: &str, action: &LfsAction) -> Result<()> {
        let chunk_size: usize = action
            .header
            .get("chunk_size")
            .and_then(|v| v.parse().ok())
            .filter(|&n| n > 0)
            .ok_or_else(|| AdoptedTextsError::upload("LFS multipart action has no valid chunk_size"))?;

        let mut parts: Vec<(usize, &str)> = action
            .header
            .iter()
            .filter_map(|(k, v)| k.parse::<usize>().ok().map(|n| (n, v.as_str())))
            .collect();
        parts.sort_by_key(|(n, _)| *n);

        let expected = file.size().div_ceil(chunk_size);
        if parts.len() != expected {
            return Err(AdoptedTextsError::upload(format!(
                "LFS multipart action lists {} parts, expected {expected}",
                parts.len()
            )));
        }

        let mut completed = Vec::with_capacity(parts.len());
        for (index, (number, href)) in parts.into_iter().enumerate() {
            let start = index * chunk_size;
            let end = (start + chunk_size).min(file.size());
            debug!(part = number, bytes = end - start, "uploading part");

            let response = self
                .client
                .put(href)
                .body(file.content[start..end].to_vec())
                .send()
                .await
                .map_err(network)?;
            let response = ensure_success(response, "LFS part upload").await?;

            let etag = response
                .headers()
                .get(ETAG)
                .and_then(|v| v.to_str().ok())
                .ok_or_else(|| AdoptedTextsError::upload(format!("LFS part {number} returned no ETag")))?
                .to_string();
            completed.push(json!({ "partNumber": number, "etag": etag }));
        }

        let response = self
            .client
            .post(&action.href)
            .header(ACCEPT, LFS_CONTENT_TYPE)
            .header(CONTENT_TYPE, LFS_CONTENT_TYPE)
            .body(json!({ "oid": oid, "parts": completed }).to_string())
            .send()
            .await
            .map_err(network)?;
        ensure_success(response, "LFS multipart completion").await?;
        Ok(())
    }

    /// Commit `files` to `main` in one NDJSON request. Returns the commit URL
    /// when the Hub reports one.
    #[instrument(skip_all, fields(repo = %self.repo_id, files = files.len()))]
    pub async fn commit(
        &self,
        summary: &str,
        description: &str,
        files: &[(UploadFile, UploadMode)],
    ) -> Result<Option<String>> {
        let body = commit_body(summary, description, files)?;

        let response = self
            .client
            .post(format!(
                "{}/api/datasets/{}/commit/main",
                self.endpoint, self.repo_id
            ))
            .bearer_auth(&self.token)
            .header(CONTENT_TYPE, "application/x-ndjson")
            .body(body)
            .send()
            .await
            .map_err(network)?;
        let response = ensure_success(response, "commit").await?;

        let text = response.text().await.map_err(network)?;
        let commit_url = serde_json::from_str::<CommitResponse>(&text)
            .ok()
            .and_then(|c| c.commit_url);
        info!(commit = ?commit_url, "commit created");
        Ok(commit_url)
    }
}

fn commit_body(summary: &str, description: &str, files: &[(UploadFile, UploadMode)]) -> Result<String> {
    let mut lines = Vec::with_capacity(files.len() + 1);
    lines.push(json!({
        "key": "header",
        "value": { "summary": summary, "description": description },
    }));

    for (file, mode) in files {
        let line = match mode {
            UploadMode::Regular => json!({
                "key": "file",
                "value": {
                    "content": BASE64.encode(&file.content),
                    "path": file.path,
                    "encoding": "base64",
                },
            }),
            UploadMode::Lfs => json!({
                "key": "lfsFile",
                "value": { "path": file.path, "algo": "sha256", "oid": file.oid() },
            }),
        };
        lines.push(line);
    }

    let mut body = String::new();
    for line in &lines {
        body.push_str(&serde_json::to_string(line)?);
        body.push('\n');
    }
    Ok(body)
}

fn header_map(headers: &HashMap<String, String>) -> reqwest::header::HeaderMap {
    headers
        .iter()
        .filter_map(|(k, v)| {
            let name = reqwest::header::HeaderName::from_bytes(k.as_bytes()).ok()?;
            let value = reqwest::header::HeaderValue::from_str(v).ok()?;
            Some((name, value))
        })
        .collect()
}

fn network(e: reqwest::Error) -> AdoptedTextsError {
    AdoptedTextsError::Network(e.to_string())
}

async fn ensure_success(response: Response, step: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(AdoptedTextsError::upload(format!(
        "{step} failed with HTTP {status}: {}",
        body.trim()
    )))
}

// ---------------------------------------------------------------------------
// Sink
// ---------------------------------------------------------------------------

/// Pushes `data/train.jsonl` and a dataset card to `<namespace>/<name>`.
pub struct HubSink {
    client: HubClient,
    dataset: DatasetConfig,
}

impl HubSink {
    pub fn new(hub: &HubConfig, dataset: &DatasetConfig, credentials: &HubCredentials) -> Result<Self> {
        let repo_id = format!("{}/{}", credentials.namespace, dataset.name);
        let client = HubClient::new(&hub.endpoint, repo_id, credentials.token())?;
        Ok(Self {
            client,
            dataset: dataset.clone(),
        })
    }

    pub fn repo_id(&self) -> &str {
        self.client.repo_id()
    }
}

#[async_trait]
impl DatasetSink for HubSink {
    fn name(&self) -> &str {
        "huggingface"
    }

    #[instrument(skip_all, fields(repo = %self.client.repo_id(), records = records.len()))]
    async fn push(&self, records: &[DocumentRecord]) -> Result<SinkReceipt> {
        let card = render_dataset_card(
            &self.dataset.name,
            &self.dataset.data_file,
            records.len(),
            Utc::now(),
        );
        let files = vec![
            UploadFile::new("README.md", card),
            UploadFile::new(self.dataset.data_file.clone(), to_jsonl(records)?),
        ];

        self.client.create_dataset_repo(self.dataset.private).await?;
        let modes = self.client.preupload(&files).await?;

        for (file, mode) in files.iter().zip(&modes) {
            if *mode == UploadMode::Lfs {
                self.client.upload_lfs(file).await?;
            }
        }

        let summary = format!("Upload {} adopted texts", records.len());
        let staged: Vec<(UploadFile, UploadMode)> = files.into_iter().zip(modes).collect();
        self.client
            .commit(&summary, "Harvested from the European Parliament plenary TOC chain.", &staged)
            .await?;

        Ok(SinkReceipt {
            sink: self.name().to_string(),
            records: records.len(),
            location: self.client.dataset_url(),
        })
    }
}
