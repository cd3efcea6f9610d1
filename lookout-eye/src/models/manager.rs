//! Model manager with auto-download functionality

use crate::config::VisionConfig;
use crate::error::VisionError;
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Largest model accepted
const MAX_MODEL_SIZE: u64 = 2_000_000_000;
/// Anything smaller is a truncated or error page download
const MIN_MODEL_SIZE: u64 = 1024;
const DOWNLOAD_TIMEOUT_SECS: u64 = 3600;

/// Model manager for downloading and locating vision models
pub struct ModelManager {
    config: Arc<VisionConfig>,
}

impl ModelManager {
    pub fn new(config: Arc<VisionConfig>) -> Self {
        Self { config }
    }

    /// Ensure model directory exists
    pub fn ensure_model_dir(&self) -> Result<PathBuf, VisionError> {
        let model_path = &self.config.model_path;
        if !model_path.exists() {
            fs::create_dir_all(model_path).map_err(|e| {
                VisionError::Io(std::io::Error::new(
                    e.kind(),
                    format!("Failed to create model directory {:?}: {}", model_path, e),
                ))
            })?;
            info!("Created model directory: {:?}", model_path);
        }
        Ok(model_path.clone())
    }

    /// Return the path of `model_name`, downloading it from `url` first if missing
    ///
    /// When `checksum` is given the download must match it (hex SHA-256).
    pub async fn ensure_model(
        &self,
        model_name: &str,
        url: &str,
        checksum: Option<&str>,
    ) -> Result<PathBuf, VisionError> {
        if model_name.is_empty() || model_name.len() > 255 {
            return Err(VisionError::Model("Invalid model name".to_string()));
        }

        if model_name.contains("..") || model_name.contains('/') || model_name.contains('\\') {
            return Err(VisionError::Model("Model name contains invalid characters".to_string()));
        }

        if url.is_empty() || url.len() > 2048 {
            return Err(VisionError::Model("Invalid URL".to_string()));
        }

        if !url.starts_with("https://") {
            return Err(VisionError::Model(
                "Only HTTPS URLs are allowed for model downloads".to_string(),
            ));
        }

        let model_dir = self.ensure_model_dir()?;
        let model_path = model_dir.join(model_name);
        if !model_path.starts_with(&model_dir) {
            return Err(VisionError::Model("Path traversal detected".to_string()));
        }

        if model_path.is_file() {
            debug!("Model {} already present at {:?}", model_name, model_path);
            return Ok(model_path);
        }

        info!("Downloading model {} from {}", model_name, url);
        // Partial downloads live under a separate name until verified
        let temp_path = model_dir.join(format!("{}.part", model_name));
        let size = self.download(url, temp_path, &model_path, checksum).await?;

        info!("Model {} saved to {:?} ({} bytes)", model_name, model_path, size);
        Ok(model_path)
    }

    async fn download(
        &self,
        url: &str,
        temp_path: PathBuf,
        target: &Path,
        checksum: Option<&str>,
    ) -> Result<u64, VisionError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(DOWNLOAD_TIMEOUT_SECS))
            .build()?;

        let mut response = client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(VisionError::Model(format!(
                "Failed to download model: HTTP {}",
                response.status()
            )));
        }

        if let Some(content_length) = response.content_length() {
            if content_length > MAX_MODEL_SIZE {
                return Err(VisionError::Model(format!(
                    "Model too large: {} bytes (max {} bytes)",
                    content_length, MAX_MODEL_SIZE
                )));
            }
        }

        let mut partial = PartialDownload::create(temp_path, MAX_MODEL_SIZE)?;
        while let Some(chunk) = response.chunk().await? {
            partial.write_chunk(&chunk)?;
        }
        partial.persist(target, checksum)
    }

    /// Path of the configured YOLO model, downloading it if needed
    pub async fn get_yolo_model(&self) -> Result<PathBuf, VisionError> {
        self.ensure_model(
            &self.config.model_file,
            &self.config.model_url,
            self.config.model_sha256.as_deref(),
        )
        .await
    }
}

/// Download in progress, written to a temp file that is removed on drop unless persisted
struct PartialDownload {
    path: PathBuf,
    file: Option<File>,
    hasher: Sha256,
    written: u64,
    max_size: u64,
    persisted: bool,
}

impl PartialDownload {
    fn create(path: PathBuf, max_size: u64) -> Result<Self, VisionError> {
        let file = File::create(&path)?;
        Ok(Self {
            path,
            file: Some(file),
            hasher: Sha256::new(),
            written: 0,
            max_size,
            persisted: false,
        })
    }

    fn write_chunk(&mut self, chunk: &[u8]) -> Result<(), VisionError> {
        if self.written + chunk.len() as u64 > self.max_size {
            return Err(VisionError::Model(format!(
                "Downloaded model exceeds {} bytes",
                self.max_size
            )));
        }

        let file = self
            .file
            .as_mut()
            .ok_or_else(|| VisionError::Model("Download already closed".to_string()))?;
        file.write_all(chunk)?;
        self.hasher.update(chunk);
        self.written += chunk.len() as u64;
        Ok(())
    }

    /// Check size and checksum, then move the file to `target`
    fn persist(mut self, target: &Path, checksum: Option<&str>) -> Result<u64, VisionError> {
        if self.written < MIN_MODEL_SIZE {
            return Err(VisionError::Model(
                "Downloaded file too small, likely corrupted".to_string(),
            ));
        }

        let computed = hex::encode(self.hasher.clone().finalize());
        verify_checksum(&computed, checksum)?;

        if let Some(file) = self.file.take() {
            file.sync_all()?;
        }
        fs::rename(&self.path, target)?;
        self.persisted = true;
        Ok(self.written)
    }
}

impl Drop for PartialDownload {
    fn drop(&mut self) {
        if !self.persisted {
            self.file.take();
            if fs::remove_file(&self.path).is_ok() {
                debug!("Removed partial download {:?}", self.path);
            }
        }
    }
}

fn verify_checksum(computed: &str, expected: Option<&str>) -> Result<(), VisionError> {
    match expected {
        Some(expected) if !computed.eq_ignore_ascii_case(expected) => Err(VisionError::Model(format!(
            "Checksum mismatch: expected {}, got {}",
            expected, computed
        ))),
        Some(_) => {
            info!("Verified model checksum");
            Ok(())
        }
        None => {
            info!("Model checksum not configured, verification skipped");
            Ok(())
        }
    }
}
