//! CLI binary for invoice-ingest.
//!
//! A thin shim over the library crate: scans a queue directory for PDFs,
//! drives each one through the ingestion pipeline, and routes originals to
//! finished/failed folders.

use anyhow::{Context, Result};
use clap::Parser;
use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use invoice_ingest::{
    invoice_number_from_name, process_invoice, route_processed, IngestConfig, IngestError,
    JsonlStore, LocalStore, MemoryStore, MistralOcr, ObjectStore, ProcessedInvoice, WorkItemStore,
};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Process every PDF waiting in ./queue
  invoice-ingest

  # Different working root, bigger chunks
  invoice-ingest /srv/invoices --max-pages 8

  # Re-run invoices that already have persisted records
  invoice-ingest --reprocess

  # See what would happen without touching files or the store
  invoice-ingest --dry-run

FOLDER LAYOUT (relative to ROOT):
  queue/                    PDFs waiting for ingestion, <invoiceNumber>_<anything>.pdf
  finished/<invoice>/       successfully processed originals + ocr_invoice_chunks.json
  failed/<folder>/          failed originals (+ partial artifact when chunks parsed)
  work_items.jsonl          persisted work-item records (JSON lines)

ENVIRONMENT VARIABLES:
  MISTRAL_API_KEY                        OCR provider API key (required)
  MISTRAL_MAX_PAGES_PER_CHUNK            Pages per OCR chunk, 1-8 (default 4)
  MISTRAL_OCR_MODEL                      Model override (default mistral-ocr-latest)
  MISTRAL_BASE_URL                       Provider endpoint override
  OCR_PROCESS_ALREADY_PROCESSED_FILES    "true" re-processes known invoice numbers
"#;

/// Ingest scanned invoice/timesheet PDFs through structured OCR.
#[derive(Parser, Debug)]
#[command(
    name = "invoice-ingest",
    version,
    about = "Ingest scanned invoice/timesheet PDFs through structured OCR",
    long_about = "Scan a queue directory for invoice PDFs, extract structured data per \
page-bounded chunk through the OCR provider, reconcile work-time entries, persist them, \
and route each original to a finished or failed folder.",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Working root containing the queue/finished/failed folders.
    #[arg(default_value = ".")]
    root: PathBuf,

    /// Maximum pages per OCR chunk (1-8).
    #[arg(long, env = "MISTRAL_MAX_PAGES_PER_CHUNK", default_value_t = 4)]
    max_pages: u32,

    /// Process invoices whose number already has persisted records.
    #[arg(long, env = "OCR_PROCESS_ALREADY_PROCESSED_FILES")]
    reprocess: bool,

    /// OCR model identifier.
    #[arg(long, env = "MISTRAL_OCR_MODEL", default_value = "mistral-ocr-latest")]
    model: String,

    /// OCR provider base URL.
    #[arg(long, env = "MISTRAL_BASE_URL", default_value = "https://api.mistral.ai")]
    base_url: String,

    /// Per-OCR-call timeout in seconds.
    #[arg(long, default_value_t = 300)]
    api_timeout: u64,

    /// Path of the JSON-lines work-item store. Default: ROOT/work_items.jsonl
    #[arg(long)]
    store: Option<PathBuf>,

    /// Number of documents processed concurrently. Chunks within one
    /// document always run sequentially.
    #[arg(short, long, default_value_t = 2)]
    concurrency: usize,

    /// Process without persisting records or moving files.
    #[arg(long)]
    dry_run: bool,

    /// Disable the progress bar.
    #[arg(long)]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long)]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long)]
    quiet: bool,
}

/// Per-document result row for the end-of-run summary.
struct DocumentReport {
    result: Result<ProcessedInvoice>,
    routed_to: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar provides the per-document feedback; keep library
    // logs quiet unless the user asks for them.
    let show_progress = !cli.quiet && !cli.no_progress;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_writer(io::stderr)
        .init();

    // ── Configuration ────────────────────────────────────────────────────
    let config = IngestConfig::builder()
        .max_pages_per_chunk(cli.max_pages)
        .reprocess_existing(cli.reprocess)
        .ocr_model(&cli.model)
        .ocr_base_url(&cli.base_url)
        .api_timeout_secs(cli.api_timeout)
        .build()
        .context("invalid configuration")?;

    let provider = Arc::new(
        MistralOcr::from_env(&config).context("OCR provider is not configured")?,
    );

    let store: Arc<dyn WorkItemStore> = if cli.dry_run {
        Arc::new(MemoryStore::new())
    } else {
        let store_path = cli
            .store
            .clone()
            .unwrap_or_else(|| cli.root.join("work_items.jsonl"));
        Arc::new(JsonlStore::new(store_path))
    };

    let objects = Arc::new(LocalStore::new(&cli.root));

    // ── Collect queue entries ────────────────────────────────────────────
    let queue_path = cli.root.join(&config.queue_dir);
    let mut blob_names: Vec<String> = std::fs::read_dir(&queue_path)
        .with_context(|| format!("cannot read queue directory '{}'", queue_path.display()))?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
        .filter_map(|entry| entry.file_name().into_string().ok())
        .filter(|name| name.to_lowercase().ends_with(".pdf"))
        .collect();
    blob_names.sort();

    if blob_names.is_empty() {
        eprintln!("{} no PDFs waiting in {}", cyan("◆"), queue_path.display());
        return Ok(());
    }

    let bar = if show_progress {
        let bar = ProgressBar::new(blob_names.len() as u64);
        bar.set_style(
            ProgressStyle::with_template(
                "{spinner:.cyan} {prefix:.bold}  [{bar:42.green/238}] {pos:>3}/{len} documents  ⏱ {elapsed_precise}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▉▊▋▌▍▎▏  "),
        );
        bar.set_prefix("Ingesting");
        bar.enable_steady_tick(Duration::from_millis(80));
        bar
    } else {
        ProgressBar::hidden()
    };

    // ── Process the queue ────────────────────────────────────────────────
    let queue_dir = config.queue_dir.clone();
    let reports: Vec<DocumentReport> = stream::iter(blob_names.into_iter().map(|blob_name| {
        let provider = Arc::clone(&provider);
        let store = Arc::clone(&store);
        let objects = Arc::clone(&objects);
        let config = config.clone();
        let queue_dir = queue_dir.clone();
        let bar = bar.clone();
        let dry_run = cli.dry_run;

        async move {
            let report = ingest_document(
                &blob_name, &queue_dir, &*provider, &*store, &*objects, &config, dry_run,
            )
            .await;

            match (&report.result, &report.routed_to) {
                (Ok(outcome), _) if outcome.already_processed => {
                    bar.println(format!(
                        "  {} {}  {}",
                        cyan("↷"),
                        blob_name,
                        dim("already processed, skipped")
                    ));
                }
                (Ok(outcome), Some(destination)) if outcome.processed_successfully => {
                    bar.println(format!("  {} {}  {}", green("✓"), blob_name, dim(destination)));
                }
                (Ok(_), Some(destination)) => {
                    bar.println(format!("  {} {}  {}", red("✗"), blob_name, dim(destination)));
                }
                (Ok(outcome), None) => {
                    // Dry run: nothing moved.
                    let glyph = if outcome.processed_successfully {
                        green("✓")
                    } else {
                        red("✗")
                    };
                    bar.println(format!("  {glyph} {blob_name}  {}", dim("(dry run)")));
                }
                (Err(e), _) => {
                    bar.println(format!("  {} {}  {}", red("✗"), blob_name, red(&format!("{e:#}"))));
                }
            }
            bar.inc(1);
            report
        }
    }))
    .buffer_unordered(cli.concurrency.max(1))
    .collect()
    .await;

    bar.finish_and_clear();

    // ── Summary ──────────────────────────────────────────────────────────
    let total = reports.len();
    let skipped = reports
        .iter()
        .filter(|r| matches!(&r.result, Ok(o) if o.already_processed))
        .count();
    let succeeded = reports
        .iter()
        .filter(|r| matches!(&r.result, Ok(o) if !o.already_processed && o.processed_successfully))
        .count();
    let failed = total - skipped - succeeded;

    if !cli.quiet {
        if failed == 0 {
            eprintln!(
                "{} {} documents ingested ({} skipped as already processed)",
                green("✔"),
                bold(&succeeded.to_string()),
                skipped
            );
        } else {
            eprintln!(
                "{} {}/{} documents ingested  ({} failed, {} skipped)",
                if succeeded == 0 { red("✘") } else { cyan("⚠") },
                bold(&succeeded.to_string()),
                total,
                red(&failed.to_string()),
                skipped
            );
        }
    }

    Ok(())
}

/// Run one document through the pipeline and, outside dry runs, route it.
#[allow(clippy::too_many_arguments)]
async fn ingest_document(
    blob_name: &str,
    queue_dir: &str,
    provider: &dyn invoice_ingest::OcrProvider,
    store: &dyn WorkItemStore,
    objects: &LocalStore,
    config: &IngestConfig,
    dry_run: bool,
) -> DocumentReport {
    let source_path = format!("{queue_dir}/{blob_name}");

    let bytes = match objects.read(&source_path).await {
        Ok(bytes) => bytes,
        Err(e) => {
            return DocumentReport {
                result: Err(anyhow::Error::from(e).context(format!("cannot read '{source_path}'"))),
                routed_to: None,
            }
        }
    };

    let result = process_invoice(blob_name, bytes, provider, store, config).await;

    // Already-processed documents are routed too: a skipped original left in
    // the queue would be picked up again on the next run.
    let routed_to = if dry_run {
        None
    } else {
        match &result {
            Ok(outcome) => route(objects, outcome, &source_path, blob_name, config).await,
            // A malformed source can never succeed; file it under failed/
            // instead of leaving it to be retried forever.
            Err(IngestError::DocumentLoad { .. }) | Err(IngestError::EmptyDocument { .. }) => {
                let outcome = ProcessedInvoice {
                    invoice_number: invoice_number_from_name(blob_name),
                    already_processed: false,
                    processed_successfully: false,
                    parsed_invoice_chunks: Vec::new(),
                };
                route(objects, &outcome, &source_path, blob_name, config).await
            }
            // Storage and other run failures stay in the queue for a retry.
            Err(_) => None,
        }
    };

    DocumentReport {
        result: result.map_err(|e| anyhow::Error::from(e).context("pipeline failed")),
        routed_to,
    }
}

async fn route(
    objects: &LocalStore,
    outcome: &ProcessedInvoice,
    source_path: &str,
    blob_name: &str,
    config: &IngestConfig,
) -> Option<String> {
    match route_processed(objects, outcome, source_path, blob_name, config).await {
        Ok(routed) => Some(routed.destination),
        Err(e) => Some(format!("routing failed: {e}")),
    }
}
