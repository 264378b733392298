//! OCR provider boundary: drive one structured-extraction call per chunk.
//!
//! The provider accepts a base64 data-URI of the chunk plus two schema
//! descriptors (image annotation and document annotation) and returns a
//! document annotation as a JSON string. This module is the error boundary
//! for that call: provider failures of any kind (network, quota, malformed
//! request) are caught here and converted into a [`ChunkFailure`], never
//! propagated into the pipeline as an `Err`. A provider that answers but
//! omits the document annotation is treated the same way; the chunk is
//! unusable, not an error.
//!
//! Retries are deliberately absent. The three outbound calls of this
//! pipeline (OCR, store read, store write) are each a single awaited
//! operation; retry policy belongs to the collaborator behind the
//! interface, not to the orchestration.

use crate::config::IngestConfig;
use crate::error::{ChunkFailure, IngestError};
use crate::invoice::ChunkOutcome;
use crate::pipeline::validate;
use crate::schema::{self, ResponseFormat};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{info, warn};

/// One structured-extraction request, minus the document payload.
#[derive(Debug, Clone, Serialize)]
pub struct AnnotationRequest {
    /// 0-indexed pages of the chunk to annotate.
    pub pages: Vec<u32>,
    /// Schema for per-image bbox annotations.
    pub bbox_annotation_format: ResponseFormat,
    /// Schema for the document annotation (the invoice shape).
    pub document_annotation_format: ResponseFormat,
    /// Request page images back in the response.
    pub include_image_base64: bool,
}

impl AnnotationRequest {
    /// Build the standard invoice-extraction request for a chunk of at most
    /// `max_pages_per_chunk` pages.
    pub fn for_invoice(config: &IngestConfig) -> Self {
        Self {
            pages: (0..config.max_pages_per_chunk).collect(),
            bbox_annotation_format: schema::image_annotation_format(),
            document_annotation_format: schema::document_annotation_format(),
            include_image_base64: config.include_image_base64,
        }
    }
}

/// Structured OCR response, reduced to the fields this pipeline consumes.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OcrResponse {
    /// The document annotation as a JSON string, absent when the provider
    /// could not produce one.
    #[serde(default)]
    pub document_annotation: Option<String>,
    /// Model that served the request.
    #[serde(default)]
    pub model: Option<String>,
    /// Provider-reported usage, if any.
    #[serde(default)]
    pub usage_info: Option<UsageInfo>,
}

/// Provider-reported usage counters.
#[derive(Debug, Clone, Deserialize)]
pub struct UsageInfo {
    #[serde(default)]
    pub pages_processed: Option<u32>,
    #[serde(default)]
    pub doc_size_bytes: Option<u64>,
}

/// External OCR/document-AI provider.
///
/// Implementations perform exactly one extraction attempt per call and
/// surface every failure as an `Err`; [`extract_chunk`] converts those into
/// per-chunk outcomes.
#[async_trait]
pub trait OcrProvider: Send + Sync {
    /// Annotate one chunk, supplied as a base64-encoded PDF.
    async fn process(
        &self,
        document_base64: &str,
        request: &AnnotationRequest,
    ) -> Result<OcrResponse, IngestError>;
}

/// Run OCR + validation for one chunk and classify the outcome.
///
/// `chunk_index` is 1-based and only used for logging and failure tagging.
pub async fn extract_chunk(
    provider: &dyn OcrProvider,
    chunk_bytes: &[u8],
    chunk_index: usize,
    config: &IngestConfig,
) -> ChunkOutcome {
    let start = Instant::now();
    info!("OCR processing chunk {}", chunk_index);

    let encoded = STANDARD.encode(chunk_bytes);
    let request = AnnotationRequest::for_invoice(config);

    let response = match provider.process(&encoded, &request).await {
        Ok(response) => response,
        Err(e) => {
            warn!("OCR processing failed for chunk {}. Skipping: {}", chunk_index, e);
            return ChunkOutcome::Failed(ChunkFailure::Provider {
                chunk: chunk_index,
                detail: e.to_string(),
            });
        }
    };

    info!(
        "OCR completed for chunk {} in {:.1}s",
        chunk_index,
        start.elapsed().as_secs_f64()
    );

    let Some(annotation) = response.document_annotation.as_deref() else {
        warn!("OCR response for chunk {} carried no document annotation", chunk_index);
        return ChunkOutcome::Failed(ChunkFailure::MissingAnnotation { chunk: chunk_index });
    };

    match validate::parse_document_annotation(annotation) {
        Ok(invoice) => ChunkOutcome::Parsed(invoice),
        Err(errors) => {
            warn!(
                "Failed to parse document annotation for chunk {} into an invoice. Skipping: {}",
                chunk_index,
                errors.join("; ")
            );
            ChunkOutcome::Failed(ChunkFailure::InvalidAnnotation {
                chunk: chunk_index,
                errors,
            })
        }
    }
}

// ── Mistral OCR client ───────────────────────────────────────────────────

/// Request body for the provider's `/v1/ocr` endpoint.
#[derive(Debug, Serialize)]
struct OcrRequestBody<'a> {
    model: &'a str,
    document: DocumentUrl,
    pages: &'a [u32],
    bbox_annotation_format: &'a ResponseFormat,
    document_annotation_format: &'a ResponseFormat,
    include_image_base64: bool,
}

#[derive(Debug, Serialize)]
struct DocumentUrl {
    #[serde(rename = "type")]
    kind: &'static str,
    document_url: String,
}

/// Reqwest-backed client for the Mistral OCR API.
///
/// Constructed explicitly and passed by reference into the pipeline; there
/// is no process-wide client state.
pub struct MistralOcr {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl MistralOcr {
    /// Create a client against the configured endpoint.
    pub fn new(api_key: impl Into<String>, config: &IngestConfig) -> Result<Self, IngestError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.api_timeout_secs))
            .build()
            .map_err(|e| IngestError::Provider {
                detail: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            base_url: config.ocr_base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: config.ocr_model.clone(),
        })
    }

    /// Create a client with the API key from `MISTRAL_API_KEY`.
    pub fn from_env(config: &IngestConfig) -> Result<Self, IngestError> {
        let api_key = std::env::var("MISTRAL_API_KEY").map_err(|_| IngestError::Provider {
            detail: "MISTRAL_API_KEY is not set in environment variables".into(),
        })?;
        Self::new(api_key, config)
    }
}

#[async_trait]
impl OcrProvider for MistralOcr {
    async fn process(
        &self,
        document_base64: &str,
        request: &AnnotationRequest,
    ) -> Result<OcrResponse, IngestError> {
        let body = OcrRequestBody {
            model: &self.model,
            document: DocumentUrl {
                kind: "document_url",
                document_url: format!("data:application/pdf;base64,{document_base64}"),
            },
            pages: &request.pages,
            bbox_annotation_format: &request.bbox_annotation_format,
            document_annotation_format: &request.document_annotation_format,
            include_image_base64: request.include_image_base64,
        };

        let response = self
            .client
            .post(format!("{}/v1/ocr", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| IngestError::Provider {
                detail: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(IngestError::Provider {
                detail: format!("HTTP {status}: {detail}"),
            });
        }

        response.json().await.map_err(|e| IngestError::Provider {
            detail: format!("failed to decode OCR response: {e}"),
        })
    }
}
