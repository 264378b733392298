//! # invoice-ingest
//!
//! Ingest scanned invoice/timesheet PDFs through a structured OCR provider,
//! reconcile the extracted work-time entries against business rules, and
//! persist normalized records to a document store, without paying for the
//! same invoice twice.
//!
//! ## Why chunking?
//!
//! The OCR provider caps schema-guided document annotation at eight pages
//! per request. Oversized PDFs are split into page-bounded chunks before the
//! first provider call; extraction correctness is always scoped to a chunk,
//! never the whole document at once. The provider is honest but imperfect,
//! so a chunk whose annotation fails is recorded and skipped rather than
//! aborting the rest of a multi-chunk document.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Dedup    skip when the invoice number already has records
//!  ├─ 2. Chunk    split into ≤ N-page sub-documents (lopdf, spawn_blocking)
//!  ├─ 3. OCR      one structured-annotation call per chunk, sequential
//!  ├─ 4. Validate parse the document annotation into the invoice model
//!  ├─ 5. Reconcile derive authoritative elapsed hours per work entry
//!  ├─ 6. Persist  one record batch per chunk
//!  └─ 7. Route    move to finished/ or failed/, write the chunk artifact
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use invoice_ingest::{process_invoice, IngestConfig, MistralOcr, JsonlStore};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = IngestConfig::from_env();
//!     let provider = MistralOcr::from_env(&config)?;
//!     let store = JsonlStore::new("work_items.jsonl");
//!
//!     let bytes = std::fs::read("queue/778899_scan.pdf")?;
//!     let outcome = process_invoice("778899_scan.pdf", bytes, &provider, &store, &config).await?;
//!
//!     println!(
//!         "invoice {:?}: success = {}, chunks = {}",
//!         outcome.invoice_number,
//!         outcome.processed_successfully,
//!         outcome.parsed_invoice_chunks.len()
//!     );
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `invoice-ingest` binary (clap + anyhow + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! invoice-ingest = { version = "0.4", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod invoice;
pub mod pipeline;
pub mod process;
pub mod routing;
pub mod schema;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{IngestConfig, IngestConfigBuilder, CHUNK_ARTIFACT_NAME, PROVIDER_PAGE_CEILING};
pub use error::{ChunkFailure, IngestError};
pub use invoice::{ChunkOutcome, Invoice, ProcessedInvoice, WorkItem, WorkItemRecord};
pub use pipeline::chunk::chunk_pdf;
pub use pipeline::ocr::{AnnotationRequest, MistralOcr, OcrProvider, OcrResponse};
pub use pipeline::persist::{InsertOutcome, JsonlStore, MemoryStore, WorkItemStore};
pub use pipeline::reconcile::{reconcile_hours, ReconcileError};
pub use process::{invoice_number_from_name, process_invoice};
pub use routing::{route_processed, LocalStore, ObjectStore, RoutedDocument};
