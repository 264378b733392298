//! The invoice pipeline: dedup check, chunking, per-chunk OCR, invoice
//! number resolution, persistence, and outcome classification.
//!
//! ## Sequencing
//!
//! Chunks are processed strictly sequentially. Invoice-number resolution
//! from the first chunk gates the interpretation of every later chunk, and
//! the OCR provider carries per-request and aggregate quota limits that make
//! serialisation the safer default. The three suspension points are the
//! outbound calls: OCR extraction, the store existence check, and the batch
//! insert.
//!
//! ## Failure policy
//!
//! A failed first chunk aborts the document: when the filename carries no
//! invoice number it must come from chunk one, and without a number the
//! document has no destination. A failed later chunk records its failure
//! slot and processing continues; later chunks' work items are independent
//! of earlier ones. There is no cross-chunk transaction, so an interrupted
//! run leaves already-inserted batches committed.

use crate::config::IngestConfig;
use crate::error::IngestError;
use crate::invoice::{ChunkOutcome, ProcessedInvoice};
use crate::pipeline::ocr::{self, OcrProvider};
use crate::pipeline::{chunk, persist};
use crate::pipeline::persist::WorkItemStore;
use std::time::Instant;
use tracing::{error, info};

/// Invoice number parsed from a source filename.
///
/// The convention is `<invoiceNumber>_<anything>.pdf`; without a `_` (or
/// with nothing before it) the number stays unresolved until the first
/// chunk's OCR result supplies one.
pub fn invoice_number_from_name(blob_name: &str) -> Option<String> {
    let idx = blob_name.find('_')?;
    let prefix = &blob_name[..idx];
    if prefix.is_empty() {
        None
    } else {
        Some(prefix.to_string())
    }
}

/// Process one source document end to end.
///
/// # Arguments
/// * `blob_name` — source filename, used for invoice-number resolution
/// * `bytes`     — the complete PDF document
/// * `provider`  — OCR provider handle
/// * `store`     — work-item document store
///
/// # Errors
/// Only fatal conditions surface as `Err`: a malformed source PDF, or a
/// store that fails during the dedup check or a batch insert. Everything
/// else, including a failed run, is reported inside the returned
/// [`ProcessedInvoice`] so the routing layer can still file the document.
pub async fn process_invoice(
    blob_name: &str,
    bytes: Vec<u8>,
    provider: &dyn OcrProvider,
    store: &dyn WorkItemStore,
    config: &IngestConfig,
) -> Result<ProcessedInvoice, IngestError> {
    let mut invoice_number = invoice_number_from_name(blob_name);

    info!(
        "Invoice processing started for '{}' with max pages per chunk {} and reprocess existing: {}",
        blob_name, config.max_pages_per_chunk, config.reprocess_existing
    );

    // ── Dedup gate (pre-OCR, only when the filename carries a number) ────
    if let Some(number) = invoice_number.as_deref() {
        let existing = store.count_by_invoice_number(number).await?;
        if existing > 0 {
            if !config.reprocess_existing {
                info!(
                    "Invoice number '{}' already processed. Skipping OCR processing for this pdf",
                    number
                );
                return Ok(ProcessedInvoice::skipped(number.to_string()));
            }
            info!(
                "Invoice number '{}' already processed, but reprocessing is enabled; processing again",
                number
            );
        }
    }

    // ── Chunking ─────────────────────────────────────────────────────────
    let chunks = chunk::chunk_pdf(bytes, config.max_pages_per_chunk, blob_name).await?;
    info!("Is pdf chunked? {}. Chunks: {}", chunks.len() > 1, chunks.len());

    // ── Per-chunk OCR, resolution, persistence ───────────────────────────
    let started = Instant::now();
    let mut parsed_invoice_chunks: Vec<ChunkOutcome> = Vec::with_capacity(chunks.len());
    let mut persisted_chunks = 0usize;

    for (i, chunk_bytes) in chunks.iter().enumerate() {
        let chunk_index = i + 1;
        let outcome = ocr::extract_chunk(provider, chunk_bytes, chunk_index, config).await;
        let mut abort = false;

        match &outcome {
            ChunkOutcome::Failed(reason) => {
                if i == 0 {
                    error!(
                        "First chunk produced no usable invoice ({}). Aborting document '{}'",
                        reason, blob_name
                    );
                    abort = true;
                }
            }
            ChunkOutcome::Parsed(invoice) => {
                if invoice_number.is_none() && i == 0 {
                    invoice_number = invoice.invoice_number().map(str::to_string);
                    match invoice_number.as_deref() {
                        Some(number) => {
                            info!("Invoice number '{}' extracted from OCR of first chunk", number)
                        }
                        None => {
                            error!(
                                "No invoice number found from blob name, and OCR did not find an \
                                 invoice number on extraction. Aborting document '{}'",
                                blob_name
                            );
                            abort = true;
                        }
                    }
                }

                if !abort {
                    let number = invoice_number
                        .as_deref()
                        .expect("invoice number resolved before persistence");
                    let inserted = persist::persist_chunk(
                        store,
                        &invoice.work_lists,
                        number,
                        chunk_index as u32,
                        config.max_pages_per_chunk,
                    )
                    .await?;
                    if inserted {
                        persisted_chunks += 1;
                    }
                }
            }
        }

        parsed_invoice_chunks.push(outcome);
        if abort {
            break;
        }
    }

    info!(
        "Chunk processing for {} PDF chunks completed in {:.1}s",
        parsed_invoice_chunks.len(),
        started.elapsed().as_secs_f64()
    );

    // ── Outcome classification ───────────────────────────────────────────
    let attempted = parsed_invoice_chunks.len();
    let processed_successfully = attempted > 0 && attempted == persisted_chunks;

    Ok(ProcessedInvoice {
        invoice_number,
        already_processed: false,
        processed_successfully,
        parsed_invoice_chunks,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filename_prefix_up_to_first_separator() {
        assert_eq!(invoice_number_from_name("778899_scan.pdf"), Some("778899".into()));
        assert_eq!(
            invoice_number_from_name("12345_a_b_c.pdf"),
            Some("12345".into())
        );
    }

    #[test]
    fn filename_without_separator_yields_none() {
        assert_eq!(invoice_number_from_name("scan.pdf"), None);
        assert_eq!(invoice_number_from_name(""), None);
    }

    #[test]
    fn empty_prefix_counts_as_unresolved() {
        assert_eq!(invoice_number_from_name("_scan.pdf"), None);
    }
}
