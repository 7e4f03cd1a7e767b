//! Ingestion of the upstream extractor's JSON shape.
//!
//! The PDF text extractor (a pdf.js-extract style collaborator) hands over
//! `{"pages": [{"pageInfo": {...}, "content": [...], "links": [...]}]}`
//! with per-item `str`/`x`/`y`/`width`/`height` plus the pre-computed
//! `fontSize`/`angle`/`hasEOL` enrichments. The core trusts those derived
//! values and never re-computes them from transform matrices.
//!
//! Deserialization is deliberately two-step: a lenient raw shape in which
//! every leaf is optional, then validation into the typed model. Collapsing
//! the two would turn a missing `x` on page 4, fragment 17 into an opaque
//! serde error; the split lets [`InvoiceError::InputShape`] name the exact
//! offender.

use crate::error::InvoiceError;
use crate::model::{Document, Fragment, FragmentKind, Page};
use serde::Deserialize;
use std::path::Path;
use tracing::debug;

// ── Raw wire shape ───────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct RawDocument {
    #[serde(default)]
    pages: Vec<RawPage>,
}

#[derive(Debug, Deserialize)]
struct RawPage {
    #[serde(rename = "pageInfo")]
    page_info: Option<RawPageInfo>,
    #[serde(default)]
    content: Vec<RawItem>,
    #[serde(default)]
    links: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RawPageInfo {
    num: Option<usize>,
    width: Option<f64>,
    height: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct RawItem {
    #[serde(rename = "str")]
    text: Option<String>,
    x: Option<f64>,
    y: Option<f64>,
    width: Option<f64>,
    height: Option<f64>,
    #[serde(rename = "fontSize")]
    font_size: Option<f64>,
    angle: Option<f64>,
    #[serde(rename = "hasEOL")]
    has_eol: Option<bool>,
}

// ── Entry points ─────────────────────────────────────────────────────────

/// Parse and validate extractor JSON into a [`Document`].
pub fn document_from_json(json: &str) -> Result<Document, InvoiceError> {
    let raw: RawDocument =
        serde_json::from_str(json).map_err(|source| InvoiceError::InvalidJson { source })?;
    validate(raw)
}

/// Read, parse, and validate extractor JSON from a file.
pub fn document_from_path(path: impl AsRef<Path>) -> Result<Document, InvoiceError> {
    let path = path.as_ref();
    let json = std::fs::read_to_string(path)
        .map_err(|e| InvoiceError::from_read_error(path.to_path_buf(), e))?;
    document_from_json(&json)
}

// ── Validation ───────────────────────────────────────────────────────────

fn validate(raw: RawDocument) -> Result<Document, InvoiceError> {
    let mut pages = Vec::with_capacity(raw.pages.len());

    for (i, raw_page) in raw.pages.into_iter().enumerate() {
        let fallback_number = i + 1;
        let info = raw_page
            .page_info
            .ok_or_else(|| InvoiceError::InputShape {
                page: fallback_number,
                detail: "missing 'pageInfo'".into(),
            })?;
        let number = info.num.unwrap_or(fallback_number);
        let width = require_page_dim(number, "width", info.width)?;
        let height = require_page_dim(number, "height", info.height)?;

        let mut fragments = Vec::with_capacity(raw_page.content.len());
        for (index, item) in raw_page.content.into_iter().enumerate() {
            fragments.push(validate_item(number, index, item)?);
        }

        pages.push(Page {
            number,
            width,
            height,
            links: raw_page.links,
            fragments,
        });
    }

    let doc = Document { pages };
    debug!(
        pages = doc.pages.len(),
        fragments = doc.fragment_count(),
        "ingested extractor document"
    );
    Ok(doc)
}

fn require_page_dim(page: usize, name: &str, value: Option<f64>) -> Result<f64, InvoiceError> {
    match value {
        Some(v) if v.is_finite() => Ok(v),
        Some(v) => Err(InvoiceError::InputShape {
            page,
            detail: format!("pageInfo.{name} is not finite ({v})"),
        }),
        None => Err(InvoiceError::InputShape {
            page,
            detail: format!("pageInfo is missing '{name}'"),
        }),
    }
}

fn validate_item(page: usize, index: usize, item: RawItem) -> Result<Fragment, InvoiceError> {
    let shape_err = |detail: String| InvoiceError::InputShape { page, detail };

    let text = item
        .text
        .ok_or_else(|| shape_err(format!("fragment {index}: missing 'str'")))?;
    let x = require_coord(page, index, "x", item.x)?;
    let y = require_coord(page, index, "y", item.y)?;
    let width = require_coord(page, index, "width", item.width)?;
    let height = require_coord(page, index, "height", item.height)?;

    if width < 0.0 || height < 0.0 {
        return Err(shape_err(format!(
            "fragment {index}: negative extent ({width} × {height})"
        )));
    }

    Ok(Fragment {
        text,
        x,
        y,
        width,
        height,
        font_size: item.font_size,
        angle: item.angle,
        has_eol: item.has_eol,
        base_y: None,
        column_key: None,
        column_index: None,
        direct_concat: None,
        semicolon_joined: None,
        kind: FragmentKind::Plain,
    })
}

fn require_coord(
    page: usize,
    index: usize,
    name: &str,
    value: Option<f64>,
) -> Result<f64, InvoiceError> {
    match value {
        Some(v) if v.is_finite() => Ok(v),
        Some(v) => Err(InvoiceError::InputShape {
            page,
            detail: format!("fragment {index}: '{name}' is not finite ({v})"),
        }),
        None => Err(InvoiceError::InputShape {
            page,
            detail: format!("fragment {index}: missing '{name}'"),
        }),
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────
