//! Chunking invariants: chunk counts and page-order preservation over
//! real multi-page PDFs built in memory.

mod common;

use common::{page_markers, sample_pdf};
use invoice_ingest::{chunk_pdf, IngestError};

#[tokio::test]
async fn document_within_limit_passes_through_unmodified() {
    let pdf = sample_pdf(4);
    let chunks = chunk_pdf(pdf.clone(), 4, "small.pdf").await.expect("chunking");

    assert_eq!(chunks.len(), 1);
    // Not re-serialised: byte-for-byte the original document.
    assert_eq!(chunks[0], pdf);
}

#[tokio::test]
async fn single_page_document_with_limit_one() {
    let pdf = sample_pdf(1);
    let chunks = chunk_pdf(pdf.clone(), 1, "one.pdf").await.expect("chunking");
    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0], pdf);
}

#[tokio::test]
async fn chunk_count_is_ceil_of_pages_over_limit() {
    // 10 pages with a limit of 4 -> chunks of 4, 4, 2.
    let pdf = sample_pdf(10);
    let chunks = chunk_pdf(pdf, 4, "ten.pdf").await.expect("chunking");

    assert_eq!(chunks.len(), 3);
    assert_eq!(page_markers(&chunks[0]).len(), 4);
    assert_eq!(page_markers(&chunks[1]).len(), 4);
    assert_eq!(page_markers(&chunks[2]).len(), 2);
}

#[tokio::test]
async fn exact_multiple_has_no_trailing_runt() {
    let pdf = sample_pdf(8);
    let chunks = chunk_pdf(pdf, 4, "eight.pdf").await.expect("chunking");
    assert_eq!(chunks.len(), 2);
    assert_eq!(page_markers(&chunks[1]).len(), 4);
}

#[tokio::test]
async fn limit_plus_one_splits_into_two() {
    let pdf = sample_pdf(5);
    let chunks = chunk_pdf(pdf, 4, "five.pdf").await.expect("chunking");
    assert_eq!(chunks.len(), 2);
    assert_eq!(page_markers(&chunks[1]).len(), 1);
}

#[tokio::test]
async fn concatenated_chunks_reproduce_original_page_order() {
    let pdf = sample_pdf(10);
    let chunks = chunk_pdf(pdf, 4, "ten.pdf").await.expect("chunking");

    let mut seen: Vec<String> = Vec::new();
    for chunk in &chunks {
        seen.extend(page_markers(chunk));
    }

    let expected: Vec<String> = (1..=10).map(|p| format!("Page {p}")).collect();
    assert_eq!(seen, expected, "no reordering, duplication, or omission");
}

#[tokio::test]
async fn malformed_source_is_fatal() {
    let err = chunk_pdf(b"not a pdf at all".to_vec(), 4, "junk.pdf")
        .await
        .expect_err("must fail");
    assert!(matches!(err, IngestError::DocumentLoad { .. }));
}
