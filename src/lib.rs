//! # pdf2invoice
//!
//! Reassemble fragmented PDF invoice text and extract structured fields.
//!
//! ## Why this crate?
//!
//! PDF text extractors report positioned boxes, not reading order. On
//! Chinese VAT invoices the damage is typical and severe: a label like
//! 发票号码 arrives split across several boxes, vertically-set seller
//! blocks arrive one glyph per box, and naive concatenation produces
//! garbage no pattern can match. This crate re-groups the raw boxes with a
//! sequence of geometric heuristics — row clustering, column clustering
//! for vertical text, and pitch-based gap rules — until each visual line
//! is one string again, then pulls the invoice fields out with labelled
//! patterns.
//!
//! PDF byte-level parsing is not done here: the input is the JSON a
//! pdf.js-extract style collaborator produces (positioned text boxes with
//! pre-computed font size and rotation), and the output is a flat record
//! plus, optionally, the merged document for visualisation.
//!
//! ## Pipeline Overview
//!
//! ```text
//! extractor JSON
//!  │
//!  ├─ 1. Ingest   validate the extractor shape into the typed model
//!  ├─ 2. Merge    five fixed passes: rows → columns ×2 → rows ×2
//!  ├─ 3. Lines    bucket per visual line, build the two joined views
//!  └─ 4. Fields   labelled patterns → InvoiceRecord
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use pdf2invoice::extract_invoice_from_json;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let json = r#"{"pages": [{
//!     "pageInfo": { "num": 1, "width": 595, "height": 842 },
//!     "content": [
//!         { "str": "发票号码：", "x": 100, "y": 780, "width": 50, "height": 10 },
//!         { "str": "98765432",   "x": 151, "y": 780, "width": 40, "height": 10 }
//!     ]
//! }]}"#;
//!
//! let record = extract_invoice_from_json(json)?;
//! assert_eq!(record.invoice_number.as_deref(), Some("98765432"));
//! # Ok(())
//! # }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf2invoice` binary (clap + anyhow + tracing-subscriber) |
//!
//! Disable `cli` when using only the library to avoid pulling in CLI-only deps:
//! ```toml
//! pdf2invoice = { version = "0.3", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod error;
pub mod extract;
pub mod ingest;
pub mod model;
pub mod pipeline;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use error::InvoiceError;
pub use extract::{
    extract_invoice, extract_invoice_from_json, extract_invoice_from_path, reassemble,
};
pub use ingest::{document_from_json, document_from_path};
pub use model::{Document, Fragment, FragmentKind, InvoiceRecord, Page};
