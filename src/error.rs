//! Error types for the pdf2invoice library.
//!
//! Only fatal conditions appear here. Two situations the pipeline handles
//! routinely are deliberately *not* errors:
//!
//! * fragments whose text is empty after trimming are silently filtered at
//!   each horizontal-merge pass entry;
//! * an invoice field with no matching pattern anywhere in the document
//!   simply stays unset in the [`crate::model::InvoiceRecord`].
//!
//! A fatal error aborts the pipeline run for that document only. Callers
//! processing a batch are expected to report the failure and continue with
//! the remaining documents.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the pdf2invoice library.
#[derive(Debug, Error)]
pub enum InvoiceError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("extractor JSON not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file exists but could not be read.
    #[error("Failed to read '{path}': {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The input bytes are not valid extractor JSON.
    #[error("Input is not valid extractor JSON: {source}\nExpected the pdf.js-extract shape: {{\"pages\": [{{\"pageInfo\": …, \"content\": […]}}]}}")]
    InvalidJson {
        #[source]
        source: serde_json::Error,
    },

    // ── Shape errors ──────────────────────────────────────────────────────
    /// A page or fragment is missing required geometry fields.
    #[error("Malformed extractor data on page {page}: {detail}")]
    InputShape { page: usize, detail: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl InvoiceError {
    /// Map an io error from reading `path` to the most specific variant.
    pub(crate) fn from_read_error(path: PathBuf, source: std::io::Error) -> Self {
        match source.kind() {
            std::io::ErrorKind::NotFound => InvoiceError::FileNotFound { path },
            std::io::ErrorKind::PermissionDenied => InvoiceError::PermissionDenied { path },
            _ => InvoiceError::ReadFailed { path, source },
        }
    }
}
