//! Extraction data model: the structured result the OCR provider returns for
//! one PDF chunk, the persisted work-item form, and the run-level outcome.
//!
//! The wire format is camelCase JSON produced by the provider's
//! schema-guided document annotation. Field-level conventions follow the
//! annotation schema in [`crate::schema`]: blocks such as `invoice`,
//! `sender`, `recipient`, `reference`, and `totals` are wholly absent unless
//! the provider recognised at least one of their sub-fields, while
//! `workLists` is always present (possibly empty).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ChunkFailure;

/// Root extraction result for one PDF chunk.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    /// Timesheet rows attached to the invoice. Always a list, possibly empty.
    pub work_lists: Vec<WorkItem>,

    /// Invoice line items (products/services). `None` when the provider found none.
    pub line_items: Option<Vec<LineItem>>,

    /// Invoice header block (number, dates, KID reference).
    pub invoice: Option<InvoiceHeader>,

    /// Recipient (customer) block.
    pub recipient: Option<Recipient>,

    /// Our/their reference block.
    pub reference: Option<Reference>,

    /// Totals block (amounts excluding/including VAT).
    pub totals: Option<Totals>,

    /// Sender (issuing company) block.
    pub sender: Option<Sender>,
}

impl Invoice {
    /// The invoice number from the header block, if the provider extracted one.
    ///
    /// Empty strings count as absent: an OCR model instructed to emit empty
    /// strings for unknown fields must not produce a usable invoice number
    /// by accident.
    pub fn invoice_number(&self) -> Option<&str> {
        self.invoice
            .as_ref()
            .and_then(|h| h.number.as_deref())
            .filter(|n| !n.trim().is_empty())
    }
}

/// One timesheet row extracted from an invoice's attached time list.
///
/// `total` and `machine_hours` are free-text decimal strings as read off the
/// page (comma or period separator, empty when the column was blank). At most
/// one of them is treated as authoritative per entry; see
/// [`crate::pipeline::reconcile`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkItem {
    /// 1-based running number, unique within the chunk.
    pub id: u32,
    /// Name of the employee or contractor who performed the work.
    pub employee: String,
    /// Department, unit, or team.
    pub department: Option<String>,
    /// Project name, number, or description.
    pub project: Option<String>,
    /// Activity type or work description.
    pub activity: Option<String>,
    /// Pay type or pay code.
    pub pay_type: Option<String>,
    /// Supplement codes and descriptions; empty string when unavailable.
    pub extras: String,
    /// Work period start date, `DD.MM.YYYY`.
    pub from_date: String,
    /// Work period end date, `DD.MM.YYYY`.
    pub to_date: String,
    /// Work period start time, `HH:mm`.
    pub from_period: String,
    /// Work period end time, `HH:mm`.
    pub to_period: String,
    /// Total hours as read by the OCR; empty string when unavailable.
    pub total: String,
    /// Machine hours with equipment codes; empty string when unavailable.
    pub machine_hours: String,
    /// Page within the chunk (1-based) where this entry was found.
    pub page_number: u32,
}

/// One invoice line item (product or service).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub product_number: String,
    pub description: String,
    pub quantity: String,
    pub unit: String,
    pub unit_price: String,
    pub total_price: String,
}

/// Invoice header block.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceHeader {
    pub number: Option<String>,
    /// Invoice date, `DD.MM.YYYY`.
    pub date: Option<String>,
    /// Due date, `DD.MM.YYYY`.
    pub due_date: Option<String>,
    /// KID payment reference, usually 10 digits; empty string when unavailable.
    pub kid: String,
}

/// Recipient (customer) block.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipient {
    pub name: Option<String>,
    pub street_address: Option<String>,
    pub postal_code: Option<String>,
    pub city: Option<String>,
}

/// Reference block.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reference {
    pub our_reference: String,
    pub their_reference: String,
}

/// Totals block. Amounts are decimal strings with a period separator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Totals {
    pub excluding_mva: String,
    pub mva_amount: String,
    pub including_mva: String,
}

/// Sender (issuing company) block. Fields are empty strings when unavailable.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sender {
    pub name: String,
    pub street_address: String,
    pub org_number: String,
    pub business_registration: String,
    pub eu_registration: String,
    pub mva_registration: String,
    pub postal_code: String,
    pub city: String,
    pub phone_number: String,
    pub email: String,
    pub website: String,
}

/// The persisted form of one work item, owned by the persistence layer once
/// inserted and never mutated afterward.
///
/// Constructed per [`WorkItem`] immediately before a batch insert; one batch
/// per chunk. `pdf_original_page_number` maps the chunk-relative page back to
/// the source document: `(pdf_chunk - 1) * max_pages_per_chunk + page_number`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkItemRecord {
    pub id: u32,
    pub employee: String,
    pub department: Option<String>,
    pub project: Option<String>,
    pub activity: Option<String>,
    pub extras: Option<String>,
    pub from_date: String,
    pub to_date: String,
    pub from_period: String,
    pub to_period: String,
    /// Reconciled elapsed hours; see [`crate::pipeline::reconcile`].
    pub total_hour: f64,
    pub invoice_number: String,
    /// 1-based chunk index within the source document.
    pub pdf_chunk: u32,
    /// Page within the chunk (1-based).
    pub pdf_chunk_page_number: u32,
    /// Page within the original, unchunked document (1-based).
    pub pdf_original_page_number: u32,
    /// Server-assigned insertion timestamp.
    pub inserted_date: DateTime<Utc>,
}

/// Per-chunk extraction outcome, preserving chunk order in
/// [`ProcessedInvoice::parsed_invoice_chunks`].
///
/// Failures carry their reason instead of collapsing to an absent value, so
/// callers (and tests) can distinguish a provider outage from a schema
/// violation.
#[derive(Debug, Clone)]
pub enum ChunkOutcome {
    /// The chunk produced a schema-valid invoice annotation.
    Parsed(Invoice),
    /// OCR or validation failed; the chunk contributed no data.
    Failed(ChunkFailure),
}

impl ChunkOutcome {
    /// The parsed invoice, if this chunk succeeded.
    pub fn invoice(&self) -> Option<&Invoice> {
        match self {
            ChunkOutcome::Parsed(invoice) => Some(invoice),
            ChunkOutcome::Failed(_) => None,
        }
    }

    /// The failure reason, if this chunk failed.
    pub fn failure(&self) -> Option<&ChunkFailure> {
        match self {
            ChunkOutcome::Parsed(_) => None,
            ChunkOutcome::Failed(reason) => Some(reason),
        }
    }

    pub fn is_parsed(&self) -> bool {
        matches!(self, ChunkOutcome::Parsed(_))
    }
}

/// Run-level outcome for one source document, handed to the routing layer.
///
/// `parsed_invoice_chunks` has one slot per attempted chunk, in chunk order.
/// Processing that terminates early (dedup skip, first-chunk failure) leaves
/// the remaining chunks unattempted and unrepresented.
#[derive(Debug, Clone)]
pub struct ProcessedInvoice {
    /// Resolved invoice number, or `None` if resolution failed.
    pub invoice_number: Option<String>,
    /// The document's invoice number already had persisted records and
    /// reprocessing was disabled; no OCR work was performed.
    pub already_processed: bool,
    /// Every attempted chunk parsed and every work-item batch was accepted
    /// by the persistence layer.
    pub processed_successfully: bool,
    /// Per-chunk outcomes in chunk order.
    pub parsed_invoice_chunks: Vec<ChunkOutcome>,
}

impl ProcessedInvoice {
    /// Outcome for a document skipped by the dedup gate.
    pub fn skipped(invoice_number: String) -> Self {
        Self {
            invoice_number: Some(invoice_number),
            already_processed: true,
            processed_successfully: true,
            parsed_invoice_chunks: Vec::new(),
        }
    }

    /// Count of chunks that produced a parsed invoice.
    pub fn parsed_chunk_count(&self) -> usize {
        self.parsed_invoice_chunks
            .iter()
            .filter(|c| c.is_parsed())
            .count()
    }

    /// Serialise the per-chunk annotations for the routing artifact.
    ///
    /// Failed chunks serialise as `null`, keeping the artifact format stable
    /// for downstream consumers that only care about the extracted data.
    pub fn chunk_artifact(&self) -> serde_json::Value {
        let chunks: Vec<Option<&Invoice>> = self
            .parsed_invoice_chunks
            .iter()
            .map(|c| c.invoice())
            .collect();
        serde_json::json!({
            "invoiceNumber": self.invoice_number,
            "processedSuccessfully": self.processed_successfully,
            "chunks": chunks,
        })
    }
}
