//! Error types for the invoice-ingest library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`IngestError`] — **Fatal**: the document cannot be processed at all
//!   (malformed PDF, document store unreachable, artifact write failed).
//!   Returned as `Err(IngestError)` from the top-level pipeline functions.
//!
//! * [`ChunkFailure`] — **Non-fatal**: a single chunk failed (provider call
//!   error, missing or invalid annotation) but other chunks may be fine.
//!   Stored inside [`crate::invoice::ChunkOutcome`] so callers can inspect
//!   partial success rather than losing the whole document to one bad chunk.
//!
//! Storage errors are deliberately on the fatal side: treating an unknown
//! store state as "not a duplicate" or "not inserted" risks skipped
//! processing or silent data loss, so dedup checks and batch inserts fail
//! loud instead of degrading.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// All fatal errors returned by the invoice-ingest library.
///
/// Chunk-level failures use [`ChunkFailure`] and are stored in
/// [`crate::invoice::ChunkOutcome`] rather than propagated here.
#[derive(Debug, Error)]
pub enum IngestError {
    // ── Source document errors ────────────────────────────────────────────
    /// The source bytes could not be parsed as a PDF. Fatal for the whole
    /// document; no chunks are produced.
    #[error("Failed to load PDF '{name}': {detail}")]
    DocumentLoad { name: String, detail: String },

    /// The source PDF parsed but contains no pages.
    #[error("PDF '{name}' contains no pages")]
    EmptyDocument { name: String },

    // ── External collaborator errors ──────────────────────────────────────
    /// The OCR provider call failed (network, quota, malformed request).
    ///
    /// Raised by [`crate::pipeline::ocr::OcrProvider`] implementations and
    /// converted to a [`ChunkFailure::Provider`] at the per-chunk boundary;
    /// it never crosses into the pipeline as an `Err`.
    #[error("OCR provider error: {detail}")]
    Provider { detail: String },

    /// The document store is unavailable or rejected an operation.
    /// Propagated: the caller must treat this as a fatal run failure.
    #[error("Document store error during {operation}: {detail}")]
    Storage {
        operation: &'static str,
        detail: String,
    },

    /// An object storage operation (read/save/move) failed.
    #[error("Object storage error for '{path}': {detail}")]
    ObjectStore { path: String, detail: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal failure for a single chunk.
///
/// Stored in [`crate::invoice::ChunkOutcome::Failed`]. The overall run
/// continues past a failed chunk unless it is the first one (the invoice
/// number is expected there when the filename carries none).
#[derive(Debug, Clone, Error, Serialize, Deserialize)]
pub enum ChunkFailure {
    /// The provider call itself failed; the chunk was never annotated.
    #[error("Chunk {chunk}: OCR provider call failed: {detail}")]
    Provider { chunk: usize, detail: String },

    /// The provider answered but returned no document annotation.
    #[error("Chunk {chunk}: OCR response carried no document annotation")]
    MissingAnnotation { chunk: usize },

    /// The document annotation did not validate against the invoice schema.
    #[error("Chunk {chunk}: document annotation failed validation: {}", errors.join("; "))]
    InvalidAnnotation { chunk: usize, errors: Vec<String> },
}

impl ChunkFailure {
    /// 1-based index of the chunk this failure belongs to.
    pub fn chunk(&self) -> usize {
        match self {
            ChunkFailure::Provider { chunk, .. }
            | ChunkFailure::MissingAnnotation { chunk }
            | ChunkFailure::InvalidAnnotation { chunk, .. } => *chunk,
        }
    }
}
