//! Persistence gateway: build persisted work-item records and insert them,
//! one batch per chunk.
//!
//! Record construction applies the hour reconciliation from
//! [`crate::pipeline::reconcile`]; an item whose hours cannot be reconciled
//! is a per-item validation failure. It is excluded from the batch and
//! logged with its raw source values, and the rest of the batch proceeds.
//!
//! Store errors are not softened here. A dedup check or batch insert that
//! fails because the store is unreachable propagates as
//! [`IngestError::Storage`]; see [`crate::error`].

use crate::error::IngestError;
use crate::invoice::{WorkItem, WorkItemRecord};
use async_trait::async_trait;
use chrono::Utc;
use tracing::{error, info, warn};

/// Result of a batch insert, mirroring the document store's acknowledgement.
#[derive(Debug, Clone, Default)]
pub struct InsertOutcome {
    /// The store acknowledged the write.
    pub acknowledged: bool,
    /// Number of records the store reports as inserted.
    pub inserted_count: usize,
    /// Store-assigned identifiers, in batch order.
    pub inserted_ids: Vec<String>,
}

/// Document store holding normalized work-item records, keyed by invoice
/// number.
#[async_trait]
pub trait WorkItemStore: Send + Sync {
    /// Insert a batch of records.
    async fn insert_many(&self, records: Vec<WorkItemRecord>) -> Result<InsertOutcome, IngestError>;

    /// Number of persisted records carrying this invoice number.
    async fn count_by_invoice_number(&self, invoice_number: &str) -> Result<u64, IngestError>;
}

/// Map the chunk-relative page number back into the original document.
///
/// `pdf_chunk` is 1-based; with a chunk limit of 4, page 1 of chunk 3 is
/// original page `(3-1)*4 + 1 = 9`.
pub fn original_page_number(pdf_chunk: u32, max_pages_per_chunk: u32, page_in_chunk: u32) -> u32 {
    (pdf_chunk - 1) * max_pages_per_chunk + page_in_chunk
}

/// Build the persisted records for one chunk's work items.
///
/// Items that fail hour reconciliation are skipped and logged with their raw
/// period and hour fields; they never abort the batch.
pub fn build_records(
    work_items: &[WorkItem],
    invoice_number: &str,
    pdf_chunk: u32,
    max_pages_per_chunk: u32,
) -> Vec<WorkItemRecord> {
    let mut records = Vec::with_capacity(work_items.len());

    for item in work_items {
        let total_hour = match super::reconcile::reconcile_hours(item) {
            Ok(hours) => hours,
            Err(e) => {
                error!(
                    "Skipping work item {}: {}. From: {} {} <-> {} {} ({}) ({})",
                    item.id,
                    e,
                    item.from_date,
                    item.from_period,
                    item.to_date,
                    item.to_period,
                    raw_hours(item),
                    item.employee
                );
                continue;
            }
        };

        records.push(WorkItemRecord {
            id: item.id,
            employee: item.employee.clone(),
            department: item.department.clone(),
            project: item.project.clone(),
            activity: item.activity.clone(),
            extras: Some(item.extras.clone()),
            from_date: item.from_date.clone(),
            to_date: item.to_date.clone(),
            from_period: item.from_period.clone(),
            to_period: item.to_period.clone(),
            total_hour,
            invoice_number: invoice_number.to_string(),
            pdf_chunk,
            pdf_chunk_page_number: item.page_number,
            pdf_original_page_number: original_page_number(
                pdf_chunk,
                max_pages_per_chunk,
                item.page_number,
            ),
            inserted_date: Utc::now(),
        });
    }

    records
}

/// Persist one chunk's work items as a single batch.
///
/// Returns whether the batch counts as inserted: a chunk with no work items
/// is vacuously successful (absence of work items is valid data, not an
/// error), otherwise the store must acknowledge at least one insert.
pub async fn persist_chunk(
    store: &dyn WorkItemStore,
    work_items: &[WorkItem],
    invoice_number: &str,
    pdf_chunk: u32,
    max_pages_per_chunk: u32,
) -> Result<bool, IngestError> {
    if work_items.is_empty() {
        info!("No work items found in document annotation");
        return Ok(true);
    }

    info!(
        "Preparing {} work items for insertion from chunk {}",
        work_items.len(),
        pdf_chunk
    );
    let records = build_records(work_items, invoice_number, pdf_chunk, max_pages_per_chunk);
    info!("Prepared {} work items for insertion", records.len());

    if records.is_empty() {
        // Every item failed reconciliation; nothing reached the store.
        return Ok(false);
    }

    let record_count = records.len();
    let outcome = store.insert_many(records).await?;

    if !outcome.acknowledged {
        error!(
            "Store did not acknowledge insertion of {} work items for invoice '{}'",
            record_count, invoice_number
        );
        return Ok(false);
    }

    if outcome.inserted_count != record_count {
        warn!(
            "Inserted count {} does not match prepared batch size {} for invoice '{}'",
            outcome.inserted_count, record_count, invoice_number
        );
    } else {
        info!(
            "Successfully inserted {} work items for invoice '{}'",
            outcome.inserted_count, invoice_number
        );
    }

    Ok(outcome.inserted_count > 0)
}

fn raw_hours(item: &WorkItem) -> &str {
    if !item.total.trim().is_empty() {
        &item.total
    } else if !item.machine_hours.trim().is_empty() {
        &item.machine_hours
    } else {
        "0"
    }
}

// ── Store implementations ────────────────────────────────────────────────

/// In-memory store for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: std::sync::Mutex<Vec<WorkItemRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every record inserted so far.
    pub fn records(&self) -> Vec<WorkItemRecord> {
        self.records.lock().expect("store poisoned").clone()
    }
}

#[async_trait]
impl WorkItemStore for MemoryStore {
    async fn insert_many(&self, records: Vec<WorkItemRecord>) -> Result<InsertOutcome, IngestError> {
        let mut guard = self.records.lock().expect("store poisoned");
        let start = guard.len();
        let inserted_ids = (start..start + records.len())
            .map(|i| format!("mem-{i:06x}"))
            .collect();
        let inserted_count = records.len();
        guard.extend(records);
        Ok(InsertOutcome {
            acknowledged: true,
            inserted_count,
            inserted_ids,
        })
    }

    async fn count_by_invoice_number(&self, invoice_number: &str) -> Result<u64, IngestError> {
        let guard = self.records.lock().expect("store poisoned");
        Ok(guard
            .iter()
            .filter(|r| r.invoice_number == invoice_number)
            .count() as u64)
    }
}

/// Append-only JSON-lines store backing the CLI's standalone mode.
///
/// One record per line. Counting scans the file; fine at queue scale, and
/// it keeps the standalone mode free of any database server.
pub struct JsonlStore {
    path: std::path::PathBuf,
    write_lock: tokio::sync::Mutex<()>,
}

impl JsonlStore {
    pub fn new(path: impl Into<std::path::PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: tokio::sync::Mutex::new(()),
        }
    }

    async fn read_lines(&self) -> Result<Vec<String>, IngestError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => Ok(content.lines().map(str::to_string).collect()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(IngestError::Storage {
                operation: "read",
                detail: format!("{}: {e}", self.path.display()),
            }),
        }
    }
}

#[async_trait]
impl WorkItemStore for JsonlStore {
    async fn insert_many(&self, records: Vec<WorkItemRecord>) -> Result<InsertOutcome, IngestError> {
        use tokio::io::AsyncWriteExt;

        let _guard = self.write_lock.lock().await;

        let existing = self.read_lines().await?.len();
        let mut payload = String::new();
        let mut inserted_ids = Vec::with_capacity(records.len());
        for (i, record) in records.iter().enumerate() {
            let line = serde_json::to_string(record).map_err(|e| IngestError::Storage {
                operation: "insertMany",
                detail: format!("failed to encode record: {e}"),
            })?;
            payload.push_str(&line);
            payload.push('\n');
            inserted_ids.push(format!("jsonl-{:06}", existing + i + 1));
        }

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| IngestError::Storage {
                operation: "insertMany",
                detail: format!("{}: {e}", self.path.display()),
            })?;
        file.write_all(payload.as_bytes())
            .await
            .map_err(|e| IngestError::Storage {
                operation: "insertMany",
                detail: format!("{}: {e}", self.path.display()),
            })?;
        file.flush().await.map_err(|e| IngestError::Storage {
            operation: "insertMany",
            detail: format!("{}: {e}", self.path.display()),
        })?;

        Ok(InsertOutcome {
            acknowledged: true,
            inserted_count: inserted_ids.len(),
            inserted_ids,
        })
    }

    async fn count_by_invoice_number(&self, invoice_number: &str) -> Result<u64, IngestError> {
        let lines = self.read_lines().await?;
        let mut count = 0u64;
        for line in lines {
            if line.trim().is_empty() {
                continue;
            }
            let record: WorkItemRecord =
                serde_json::from_str(&line).map_err(|e| IngestError::Storage {
                    operation: "countDocuments",
                    detail: format!("corrupt record in {}: {e}", self.path.display()),
                })?;
            if record.invoice_number == invoice_number {
                count += 1;
            }
        }
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invoice::WorkItem;

    fn work_item(id: u32, page: u32, total: &str) -> WorkItem {
        WorkItem {
            id,
            employee: "Per Olsen".into(),
            department: Some("Drift".into()),
            project: None,
            activity: None,
            pay_type: None,
            extras: String::new(),
            from_date: "03.02.2025".into(),
            to_date: "03.02.2025".into(),
            from_period: "07:00".into(),
            to_period: "15:00".into(),
            total: total.into(),
            machine_hours: String::new(),
            page_number: page,
        }
    }

    #[test]
    fn original_page_number_matches_chunk_arithmetic() {
        // Page 1 of chunk 3 with a 4-page limit is original page 9.
        assert_eq!(original_page_number(3, 4, 1), 9);
        assert_eq!(original_page_number(1, 4, 1), 1);
        assert_eq!(original_page_number(2, 8, 3), 11);
    }

    #[test]
    fn build_records_carries_chunk_positions() {
        let items = vec![work_item(1, 1, "7.5"), work_item(2, 2, "8")];
        let records = build_records(&items, "778899", 3, 4);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].invoice_number, "778899");
        assert_eq!(records[0].pdf_chunk, 3);
        assert_eq!(records[0].pdf_chunk_page_number, 1);
        assert_eq!(records[0].pdf_original_page_number, 9);
        assert_eq!(records[0].total_hour, 7.5);
        assert_eq!(records[1].pdf_original_page_number, 10);
    }

    #[test]
    fn build_records_skips_unreconcilable_items() {
        let mut broken = work_item(2, 1, "");
        broken.from_date = "garbage".into();
        let items = vec![work_item(1, 1, "7.5"), broken, work_item(3, 1, "6")];

        let records = build_records(&items, "778899", 1, 4);
        let ids: Vec<u32> = records.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[tokio::test]
    async fn persist_chunk_empty_batch_is_success() {
        let store = MemoryStore::new();
        let inserted = persist_chunk(&store, &[], "778899", 1, 4).await.unwrap();
        assert!(inserted);
        assert!(store.records().is_empty());
    }

    #[tokio::test]
    async fn persist_chunk_all_items_invalid_is_failure() {
        let store = MemoryStore::new();
        let mut broken = work_item(1, 1, "");
        broken.from_period = "??".into();
        let inserted = persist_chunk(&store, &[broken], "778899", 1, 4).await.unwrap();
        assert!(!inserted);
    }

    #[tokio::test]
    async fn memory_store_counts_by_invoice_number() {
        let store = MemoryStore::new();
        let records = build_records(&[work_item(1, 1, "8")], "111", 1, 4);
        store.insert_many(records).await.unwrap();

        assert_eq!(store.count_by_invoice_number("111").await.unwrap(), 1);
        assert_eq!(store.count_by_invoice_number("222").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn jsonl_store_round_trips_and_counts() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonlStore::new(dir.path().join("work_items.jsonl"));

        let batch1 = build_records(&[work_item(1, 1, "8"), work_item(2, 1, "7")], "111", 1, 4);
        let outcome = store.insert_many(batch1).await.unwrap();
        assert!(outcome.acknowledged);
        assert_eq!(outcome.inserted_count, 2);
        assert_eq!(outcome.inserted_ids.len(), 2);

        let batch2 = build_records(&[work_item(1, 1, "6")], "222", 1, 4);
        store.insert_many(batch2).await.unwrap();

        assert_eq!(store.count_by_invoice_number("111").await.unwrap(), 2);
        assert_eq!(store.count_by_invoice_number("222").await.unwrap(), 1);
        assert_eq!(store.count_by_invoice_number("333").await.unwrap(), 0);
    }
}
