//! Document routing: file each processed document into exactly one of three
//! destinations.
//!
//! The pipeline's [`ProcessedInvoice`] is the sole input contract here.
//! Already-processed and successful documents land under
//! `finished/{invoiceNumber}/`; failed documents land under
//! `failed/{folder}/`, where the folder falls back to the source filename
//! stem when no invoice number was ever resolved. Runs that produced any
//! parsed chunks leave an `ocr_invoice_chunks.json` artifact next to the
//! moved original so downstream consumers can read the raw annotations
//! without re-incurring OCR cost. No document is left behind without a
//! routing decision.

use crate::config::{IngestConfig, CHUNK_ARTIFACT_NAME};
use crate::error::IngestError;
use crate::invoice::ProcessedInvoice;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::info;

/// Object storage as consumed by the router: the trigger source and the
/// move/save operations.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Read an object's bytes.
    async fn read(&self, path: &str) -> Result<Vec<u8>, IngestError>;

    /// Create or overwrite an object.
    async fn save(&self, path: &str, content: &[u8]) -> Result<(), IngestError>;

    /// Move an object, returning the new path.
    async fn move_object(&self, from: &str, to: &str) -> Result<String, IngestError>;
}

/// Where a document ended up after routing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutedDocument {
    /// Final path of the moved original.
    pub destination: String,
    /// Path of the chunk-annotation artifact, when one was written.
    pub artifact: Option<String>,
}

/// Route one processed document and write its artifact.
///
/// `source_path` is the object's current location; `blob_name` its filename.
pub async fn route_processed(
    store: &dyn ObjectStore,
    outcome: &ProcessedInvoice,
    source_path: &str,
    blob_name: &str,
    config: &IngestConfig,
) -> Result<RoutedDocument, IngestError> {
    let folder = destination_folder(outcome, blob_name, config);

    let artifact = if outcome.already_processed || outcome.parsed_chunk_count() == 0 {
        None
    } else {
        let artifact_path = format!("{folder}/{CHUNK_ARTIFACT_NAME}");
        let payload = serde_json::to_vec_pretty(&outcome.chunk_artifact())
            .map_err(|e| IngestError::Internal(format!("artifact encoding failed: {e}")))?;
        store.save(&artifact_path, &payload).await?;
        Some(artifact_path)
    };

    let destination = store
        .move_object(source_path, &format!("{folder}/{blob_name}"))
        .await?;

    info!("Routed '{}' to '{}'", blob_name, destination);
    Ok(RoutedDocument {
        destination,
        artifact,
    })
}

/// Destination folder for a processed document.
fn destination_folder(outcome: &ProcessedInvoice, blob_name: &str, config: &IngestConfig) -> String {
    let success = outcome.already_processed || outcome.processed_successfully;
    match (&outcome.invoice_number, success) {
        (Some(number), true) => format!("{}/{}", config.finished_dir, number),
        (Some(number), false) => format!("{}/{}", config.failed_dir, number),
        // No invoice number was ever resolved; fall back to the filename stem
        // so the failed document still gets its own folder.
        (None, _) => format!("{}/{}", config.failed_dir, file_stem(blob_name)),
    }
}

/// Filename without its final extension.
fn file_stem(blob_name: &str) -> &str {
    Path::new(blob_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(blob_name)
}

// ── Local filesystem store ───────────────────────────────────────────────

/// Filesystem-backed [`ObjectStore`] rooted at a directory; the standalone
/// deployment's stand-in for blob storage.
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, path: &str) -> PathBuf {
        self.root.join(path)
    }

    async fn ensure_parent(&self, path: &Path) -> Result<(), IngestError> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| IngestError::ObjectStore {
                    path: parent.display().to_string(),
                    detail: e.to_string(),
                })?;
        }
        Ok(())
    }
}

#[async_trait]
impl ObjectStore for LocalStore {
    async fn read(&self, path: &str) -> Result<Vec<u8>, IngestError> {
        let full = self.resolve(path);
        tokio::fs::read(&full)
            .await
            .map_err(|e| IngestError::ObjectStore {
                path: full.display().to_string(),
                detail: e.to_string(),
            })
    }

    async fn save(&self, path: &str, content: &[u8]) -> Result<(), IngestError> {
        let full = self.resolve(path);
        self.ensure_parent(&full).await?;
        tokio::fs::write(&full, content)
            .await
            .map_err(|e| IngestError::ObjectStore {
                path: full.display().to_string(),
                detail: e.to_string(),
            })
    }

    async fn move_object(&self, from: &str, to: &str) -> Result<String, IngestError> {
        let src = self.resolve(from);
        let dst = self.resolve(to);
        self.ensure_parent(&dst).await?;
        tokio::fs::rename(&src, &dst)
            .await
            .map_err(|e| IngestError::ObjectStore {
                path: src.display().to_string(),
                detail: format!("move to '{}' failed: {e}", dst.display()),
            })?;
        Ok(to.to_string())
    }
}
