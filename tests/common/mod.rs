//! Shared helpers for the integration tests: an in-memory multi-page PDF
//! builder and a scripted OCR provider.
//!
//! Each integration test binary compiles its own copy, so helpers unused by
//! one binary are expected.
#![allow(dead_code)]

use async_trait::async_trait;
use invoice_ingest::{AnnotationRequest, IngestError, OcrProvider, OcrResponse};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Build a valid in-memory PDF with `pages` pages, each carrying a unique
/// "Page N" text marker so page order survives round trips.
pub fn sample_pdf(pages: usize) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids: Vec<Object> = Vec::with_capacity(pages);
    for page in 1..=pages {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 24.into()]),
                Operation::new("Td", vec![72.into(), 720.into()]),
                Operation::new("Tj", vec![Object::string_literal(format!("Page {page}"))]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(
            dictionary! {},
            content.encode().expect("content stream encodes"),
        ));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        });
        kids.push(page_id.into());
    }

    let kid_count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => kid_count,
            "Resources" => resources_id,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buf = Vec::new();
    doc.save_to(&mut buf).expect("pdf serialises");
    buf
}

/// The text markers ("Page N") of every page of a PDF, in page order.
pub fn page_markers(bytes: &[u8]) -> Vec<String> {
    let doc = Document::load_mem(bytes).expect("pdf loads");
    let mut page_numbers: Vec<u32> = doc.get_pages().keys().copied().collect();
    page_numbers.sort_unstable();

    page_numbers
        .iter()
        .map(|p| {
            doc.extract_text(&[*p])
                .expect("page text extracts")
                .trim()
                .to_string()
        })
        .collect()
}

/// One scripted reply of the [`MockOcr`] provider.
pub enum OcrScript {
    /// The provider call itself fails.
    Fail(&'static str),
    /// The call succeeds but carries no document annotation.
    NoAnnotation,
    /// The call succeeds with this document-annotation JSON string.
    Annotation(String),
}

/// Scripted OCR provider: replays a fixed sequence of replies and counts
/// how many calls were made.
pub struct MockOcr {
    script: Mutex<VecDeque<OcrScript>>,
    calls: AtomicUsize,
}

impl MockOcr {
    pub fn new(script: Vec<OcrScript>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of provider calls made so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OcrProvider for MockOcr {
    async fn process(
        &self,
        _document_base64: &str,
        _request: &AnnotationRequest,
    ) -> Result<OcrResponse, IngestError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self
            .script
            .lock()
            .expect("script poisoned")
            .pop_front()
            .expect("MockOcr called more times than scripted");

        match next {
            OcrScript::Fail(detail) => Err(IngestError::Provider {
                detail: detail.to_string(),
            }),
            OcrScript::NoAnnotation => Ok(OcrResponse::default()),
            OcrScript::Annotation(json) => Ok(OcrResponse {
                document_annotation: Some(json),
                model: Some("mistral-ocr-latest".to_string()),
                usage_info: None,
            }),
        }
    }
}

/// Document-annotation JSON for an invoice with the given header number and
/// work items, each item given as `(id, page_number, total)`.
pub fn invoice_annotation(number: Option<&str>, work_items: &[(u32, u32, &str)]) -> String {
    let items: Vec<serde_json::Value> = work_items
        .iter()
        .map(|(id, page, total)| {
            serde_json::json!({
                "id": id,
                "employee": "Kari Nordmann",
                "department": "Drift",
                "project": null,
                "activity": "Vintervedlikehold",
                "payType": null,
                "extras": "",
                "fromDate": "03.02.2025",
                "toDate": "03.02.2025",
                "fromPeriod": "07:00",
                "toPeriod": "15:00",
                "total": total,
                "machineHours": "",
                "pageNumber": page,
            })
        })
        .collect();

    let invoice_block = number.map(|n| {
        serde_json::json!({
            "number": n,
            "date": "01.02.2025",
            "dueDate": "01.03.2025",
            "kid": "0123456789",
        })
    });

    serde_json::json!({
        "workLists": items,
        "lineItems": null,
        "invoice": invoice_block,
        "recipient": null,
        "reference": null,
        "totals": null,
        "sender": null,
    })
    .to_string()
}
