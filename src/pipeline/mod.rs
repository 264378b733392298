//! Pipeline stages for invoice ingestion.
//!
//! Each submodule implements exactly one transformation step. Keeping stages
//! separate makes each independently testable and lets us swap
//! implementations (e.g. a different OCR provider) without touching other
//! stages.
//!
//! ## Data Flow
//!
//! ```text
//! chunk ──▶ ocr ──▶ validate ──▶ reconcile ──▶ persist
//! (lopdf)  (provider) (schema)   (hours)       (store)
//! ```
//!
//! 1. [`chunk`]     — split the source PDF into page-bounded sub-documents;
//!    runs in `spawn_blocking` because lopdf parsing is CPU-bound
//! 2. [`ocr`]       — drive the provider call per chunk; the only stage with
//!    network I/O, and the boundary where provider errors become
//!    per-chunk failures instead of exceptions
//! 3. [`validate`]  — parse and validate the document annotation into the
//!    typed invoice model
//! 4. [`reconcile`] — derive the authoritative elapsed-hours value per
//!    work entry
//! 5. [`persist`]   — build persisted records and insert them, one batch
//!    per chunk

pub mod chunk;
pub mod ocr;
pub mod persist;
pub mod reconcile;
pub mod validate;
