//! Configuration for the ingestion pipeline.
//!
//! All behaviour is controlled through [`IngestConfig`], built via its
//! [`IngestConfigBuilder`] or loaded from the environment with
//! [`IngestConfig::from_env`]. Keeping every knob in one struct makes it
//! trivial to share configs across tasks and to diff two runs.

use crate::error::IngestError;
use serde::{Deserialize, Serialize};

/// Hard ceiling the OCR provider enforces on schema-guided document
/// annotation requests. Chunking exists because of this limit.
pub const PROVIDER_PAGE_CEILING: u32 = 8;

/// File name of the per-document chunk-annotation artifact written next to
/// routed originals.
pub const CHUNK_ARTIFACT_NAME: &str = "ocr_invoice_chunks.json";

/// Configuration for invoice ingestion.
///
/// Built via [`IngestConfig::builder()`], [`IngestConfig::from_env()`], or
/// [`IngestConfig::default()`].
///
/// # Example
/// ```rust
/// use invoice_ingest::IngestConfig;
///
/// let config = IngestConfig::builder()
///     .max_pages_per_chunk(6)
///     .reprocess_existing(true)
///     .build()
///     .unwrap();
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Maximum pages per OCR chunk. Range: 1–8. Default: 4.
    ///
    /// The provider rejects document-annotation requests beyond
    /// [`PROVIDER_PAGE_CEILING`] pages, so the source PDF is split into
    /// page-bounded sub-documents before any OCR call. Lower values reduce
    /// the blast radius of a failed chunk at the cost of more provider calls.
    pub max_pages_per_chunk: u32,

    /// Process documents whose invoice number already has persisted records.
    /// Default: false.
    ///
    /// When enabled the dedup gate is bypassed: OCR cost is re-incurred and
    /// records are re-inserted. Idempotency is not enforced at the storage
    /// layer, so duplicates are the caller's accepted risk in this mode.
    pub reprocess_existing: bool,

    /// OCR model identifier. Default: `mistral-ocr-latest`.
    pub ocr_model: String,

    /// Base URL of the OCR provider API. Default: `https://api.mistral.ai`.
    pub ocr_base_url: String,

    /// Per-OCR-call timeout in seconds. Default: 300.
    ///
    /// Structured annotation of a dense 8-page chunk routinely takes more
    /// than a minute; the timeout has to cover the slow tail without letting
    /// a hung connection stall the whole queue.
    pub api_timeout_secs: u64,

    /// Request page images back from the provider. Default: false.
    /// The pipeline only consumes the document annotation.
    pub include_image_base64: bool,

    /// Folder documents are picked up from.
    pub queue_dir: String,

    /// Folder successfully processed documents are moved to, one
    /// subfolder per invoice number.
    pub finished_dir: String,

    /// Folder failed documents are moved to, one subfolder per document.
    pub failed_dir: String,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            max_pages_per_chunk: 4,
            reprocess_existing: false,
            ocr_model: "mistral-ocr-latest".to_string(),
            ocr_base_url: "https://api.mistral.ai".to_string(),
            api_timeout_secs: 300,
            include_image_base64: false,
            queue_dir: "queue".to_string(),
            finished_dir: "finished".to_string(),
            failed_dir: "failed".to_string(),
        }
    }
}

impl IngestConfig {
    /// Create a new builder for `IngestConfig`.
    pub fn builder() -> IngestConfigBuilder {
        IngestConfigBuilder {
            config: Self::default(),
        }
    }

    /// Load configuration from the environment.
    ///
    /// * `MISTRAL_MAX_PAGES_PER_CHUNK` — pages per chunk; falls back to 4
    ///   when unset, non-numeric, zero, or above the provider ceiling.
    /// * `OCR_PROCESS_ALREADY_PROCESSED_FILES` — `true` enables reprocessing.
    /// * `MISTRAL_OCR_MODEL`, `MISTRAL_BASE_URL` — provider overrides.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(raw) = std::env::var("MISTRAL_MAX_PAGES_PER_CHUNK") {
            if let Ok(n) = raw.trim().parse::<u32>() {
                if n >= 1 && n <= PROVIDER_PAGE_CEILING {
                    config.max_pages_per_chunk = n;
                }
            }
        }

        config.reprocess_existing = std::env::var("OCR_PROCESS_ALREADY_PROCESSED_FILES")
            .map(|v| v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        if let Ok(model) = std::env::var("MISTRAL_OCR_MODEL") {
            if !model.is_empty() {
                config.ocr_model = model;
            }
        }
        if let Ok(url) = std::env::var("MISTRAL_BASE_URL") {
            if !url.is_empty() {
                config.ocr_base_url = url;
            }
        }

        config
    }
}

/// Builder for [`IngestConfig`].
#[derive(Debug)]
pub struct IngestConfigBuilder {
    config: IngestConfig,
}

impl IngestConfigBuilder {
    pub fn max_pages_per_chunk(mut self, n: u32) -> Self {
        self.config.max_pages_per_chunk = n;
        self
    }

    pub fn reprocess_existing(mut self, v: bool) -> Self {
        self.config.reprocess_existing = v;
        self
    }

    pub fn ocr_model(mut self, model: impl Into<String>) -> Self {
        self.config.ocr_model = model.into();
        self
    }

    pub fn ocr_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.ocr_base_url = url.into();
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn include_image_base64(mut self, v: bool) -> Self {
        self.config.include_image_base64 = v;
        self
    }

    pub fn queue_dir(mut self, dir: impl Into<String>) -> Self {
        self.config.queue_dir = dir.into();
        self
    }

    pub fn finished_dir(mut self, dir: impl Into<String>) -> Self {
        self.config.finished_dir = dir.into();
        self
    }

    pub fn failed_dir(mut self, dir: impl Into<String>) -> Self {
        self.config.failed_dir = dir.into();
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<IngestConfig, IngestError> {
        let c = &self.config;
        if c.max_pages_per_chunk == 0 || c.max_pages_per_chunk > PROVIDER_PAGE_CEILING {
            return Err(IngestError::InvalidConfig(format!(
                "max_pages_per_chunk must be 1–{PROVIDER_PAGE_CEILING}, got {}",
                c.max_pages_per_chunk
            )));
        }
        if c.ocr_base_url.is_empty() {
            return Err(IngestError::InvalidConfig("ocr_base_url must not be empty".into()));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        let config = IngestConfig::builder().build().expect("default must build");
        assert_eq!(config.max_pages_per_chunk, 4);
        assert!(!config.reprocess_existing);
    }

    #[test]
    fn rejects_chunk_size_above_provider_ceiling() {
        let err = IngestConfig::builder().max_pages_per_chunk(9).build();
        assert!(err.is_err());
        let err = IngestConfig::builder().max_pages_per_chunk(0).build();
        assert!(err.is_err());
    }

    #[test]
    fn ceiling_itself_is_accepted() {
        let config = IngestConfig::builder()
            .max_pages_per_chunk(PROVIDER_PAGE_CEILING)
            .build()
            .expect("8 pages is the provider maximum, not beyond it");
        assert_eq!(config.max_pages_per_chunk, 8);
    }
}
