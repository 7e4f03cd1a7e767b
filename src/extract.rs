//! Top-level extraction entry points.
//!
//! The full chain is ingest → five merge passes → line merge → field scan.
//! Each step is pure over its input, so the intermediate documents can be
//! taken at any point — [`reassemble`] stops after the line merge for
//! callers that want the annotated document itself (visualisation,
//! debugging), while the `extract_invoice*` family runs through to the
//! [`InvoiceRecord`].

use crate::error::InvoiceError;
use crate::ingest;
use crate::model::{Document, InvoiceRecord};
use crate::pipeline::{fields, lines, sequence};
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info};

/// Reassemble a raw extractor document into its merged, line-annotated form.
///
/// Runs the fixed five-pass merge sequence followed by the final line
/// bucketing. The result carries merge tags, column stamps, and per-line
/// joined views; it is the shape a renderer consumes.
pub fn reassemble(doc: &Document) -> Document {
    let start = Instant::now();
    let merged = sequence::integrate(doc);
    let lined = lines::merge_lines(&merged);
    debug!(
        fragments_in = doc.fragment_count(),
        fragments_out = lined.fragment_count(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "reassembly complete"
    );
    lined
}

/// Reassemble a raw extractor document and pull the invoice fields from it.
pub fn extract_invoice(doc: &Document) -> InvoiceRecord {
    let start = Instant::now();
    let record = fields::extract_fields(&reassemble(doc));
    info!(
        pages = doc.pages.len(),
        matched = !record.is_empty(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "invoice extraction complete"
    );
    record
}

/// Parse extractor JSON and extract the invoice fields.
pub fn extract_invoice_from_json(json: &str) -> Result<InvoiceRecord, InvoiceError> {
    Ok(extract_invoice(&ingest::document_from_json(json)?))
}

/// Read extractor JSON from a file and extract the invoice fields.
pub fn extract_invoice_from_path(path: impl AsRef<Path>) -> Result<InvoiceRecord, InvoiceError> {
    let path = path.as_ref();
    info!("Extracting invoice fields from {}", path.display());
    Ok(extract_invoice(&ingest::document_from_path(path)?))
}

// ── Tests ────────────────────────────────────────────────────────────────────
