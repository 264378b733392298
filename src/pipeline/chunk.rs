//! PDF chunking: split a source document into page-bounded sub-documents.
//!
//! The OCR provider caps schema-guided document annotation at eight pages
//! per request, so any larger PDF must be partitioned before the first
//! provider call. Boundaries are purely page-count driven, never
//! content-aware: pages are grouped into consecutive runs of at most
//! `max_pages_per_chunk`, the last run possibly shorter.
//!
//! ## Why spawn_blocking?
//!
//! lopdf parses and re-serialises whole documents in memory, which is
//! CPU-bound. `tokio::task::spawn_blocking` keeps that work off the async
//! worker threads, the same wrapper this pipeline uses for every
//! synchronous PDF operation.

use crate::error::IngestError;
use lopdf::Document;
use tracing::{debug, info};

/// Split `bytes` into sub-documents of at most `max_pages_per_chunk` pages.
///
/// A document already within the limit is returned as a single-element
/// sequence containing the original bytes unmodified (no re-serialisation,
/// no recompression). Larger documents yield `ceil(pages / limit)` chunks
/// in original page order.
///
/// # Errors
/// [`IngestError::DocumentLoad`] if the bytes are not a parseable PDF;
/// fatal for the whole document, no partial chunking.
pub async fn chunk_pdf(
    bytes: Vec<u8>,
    max_pages_per_chunk: u32,
    name: &str,
) -> Result<Vec<Vec<u8>>, IngestError> {
    let name = name.to_string();
    tokio::task::spawn_blocking(move || chunk_pdf_blocking(&bytes, max_pages_per_chunk, &name))
        .await
        .map_err(|e| IngestError::Internal(format!("Chunking task panicked: {e}")))?
}

/// Blocking implementation of [`chunk_pdf`].
fn chunk_pdf_blocking(
    bytes: &[u8],
    max_pages_per_chunk: u32,
    name: &str,
) -> Result<Vec<Vec<u8>>, IngestError> {
    let doc = Document::load_mem(bytes).map_err(|e| IngestError::DocumentLoad {
        name: name.to_string(),
        detail: e.to_string(),
    })?;

    let page_count = doc.get_pages().len() as u32;
    if page_count == 0 {
        return Err(IngestError::EmptyDocument {
            name: name.to_string(),
        });
    }

    if page_count <= max_pages_per_chunk {
        info!(
            "PDF has {} pages which is within the chunk limit ({}). Chunking not needed",
            page_count, max_pages_per_chunk
        );
        return Ok(vec![bytes.to_vec()]);
    }

    info!(
        "PDF has {} pages which is more than the chunk limit ({}). Chunking...",
        page_count, max_pages_per_chunk
    );

    let mut chunks = Vec::new();
    let mut start = 1u32;
    while start <= page_count {
        let end = (start + max_pages_per_chunk - 1).min(page_count);

        // Carve the chunk out of a fresh copy by deleting every page
        // outside [start, end]; lopdf page numbers are 1-based.
        let mut chunk_doc = doc.clone();
        let delete: Vec<u32> = (1..=page_count)
            .filter(|p| *p < start || *p > end)
            .collect();
        chunk_doc.delete_pages(&delete);
        chunk_doc.prune_objects();
        chunk_doc.renumber_objects();

        let mut buf = Vec::new();
        chunk_doc
            .save_to(&mut buf)
            .map_err(|e| IngestError::Internal(format!("Failed to serialise chunk: {e}")))?;

        debug!(
            "Created chunk {} with pages {}-{} ({} bytes)",
            chunks.len() + 1,
            start,
            end,
            buf.len()
        );
        chunks.push(buf);
        start = end + 1;
    }

    Ok(chunks)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_pdf_bytes() {
        let err = chunk_pdf_blocking(b"definitely not a pdf", 4, "junk.pdf");
        assert!(matches!(err, Err(IngestError::DocumentLoad { .. })));
    }

    // Chunk-count and page-order invariants are covered by the integration
    // tests in tests/chunker.rs, which build multi-page PDFs with lopdf.
}
