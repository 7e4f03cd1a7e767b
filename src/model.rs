//! Core data model: fragments, pages, documents, and the extracted record.
//!
//! A [`Fragment`] is one positioned text run as reported by the upstream PDF
//! extractor. The pipeline never mutates a document in place — every pass
//! clones its input and produces a new [`Document`] — so these types are
//! plain owned data with no interior mutability.
//!
//! Wire shape: fragments serialize with the extractor's field names
//! (`str`, `fontSize`, `baseY`, `columnKey`, `directConcat`, …) so the
//! merged document can be handed straight back to a renderer that already
//! understands the extractor output.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Rotation magnitude (degrees) below which a fragment counts as unrotated.
pub const ROTATION_EPSILON_DEGREES: f64 = 0.1;

/// Provenance tag for a fragment.
///
/// The passes select on this tag: column-merged fragments are excluded from
/// row clustering, and a renderer can colour-code the three kinds. Exactly
/// one tag applies at a time — a column-merged fragment is multi-character
/// and therefore never re-enters a row merge, and vice versa.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FragmentKind {
    /// Straight from the extractor, untouched by any merge.
    #[default]
    Plain,
    /// Produced by a horizontal (same-row) merge.
    RowMerged,
    /// Produced by a vertical (same-column) merge.
    ColumnMerged,
}

impl FragmentKind {
    pub fn is_plain(&self) -> bool {
        matches!(self, FragmentKind::Plain)
    }

    pub fn is_row_merged(&self) -> bool {
        matches!(self, FragmentKind::RowMerged)
    }

    pub fn is_column_merged(&self) -> bool {
        matches!(self, FragmentKind::ColumnMerged)
    }
}

/// One positioned text run, before or after merging.
///
/// Coordinates are in page space: origin bottom-left, y increasing upward,
/// as delivered by the extractor. `width`/`height` span the bounding box.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fragment {
    /// The text content. Never empty or whitespace-only once a pass has run.
    #[serde(rename = "str")]
    pub text: String,
    /// Left edge of the bounding box.
    pub x: f64,
    /// Bottom edge of the bounding box.
    pub y: f64,
    pub width: f64,
    pub height: f64,
    /// Font size derived by the extractor from the text transform matrix.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f64>,
    /// Rotation in degrees, derived by the extractor. `None` means unrotated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub angle: Option<f64>,
    /// End-of-line marker reported by the extractor, carried through verbatim.
    #[serde(rename = "hasEOL", default, skip_serializing_if = "Option::is_none")]
    pub has_eol: Option<bool>,
    /// Anchor y of the bottom-most character of a vertically merged chain,
    /// captured at the first merge and preserved across further merges.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_y: Option<f64>,
    /// Quantized x bucket this fragment was assigned to during column
    /// clustering.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column_key: Option<f64>,
    /// 0-based position within its column, ordered bottom-to-top.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column_index: Option<usize>,
    /// Concatenation of all line members in x order. Populated by the line
    /// merge stage on the x-first fragment of each line bucket only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direct_concat: Option<String>,
    /// Same members joined with `;`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub semicolon_joined: Option<String>,
    /// Merge provenance tag.
    #[serde(default, skip_serializing_if = "FragmentKind::is_plain")]
    pub kind: FragmentKind,
}

impl Fragment {
    /// Plain fragment with the given text and geometry, everything else unset.
    pub fn new(text: impl Into<String>, x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            text: text.into(),
            x,
            y,
            width,
            height,
            font_size: None,
            angle: None,
            has_eol: None,
            base_y: None,
            column_key: None,
            column_index: None,
            direct_concat: None,
            semicolon_joined: None,
            kind: FragmentKind::Plain,
        }
    }

    /// Right edge of the bounding box.
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    /// Whether the fragment carries a non-negligible rotation.
    pub fn is_rotated(&self) -> bool {
        self.angle
            .is_some_and(|a| a.abs() > ROTATION_EPSILON_DEGREES)
    }

    /// Whether the text is exactly one character (untrimmed).
    pub fn is_single_char(&self) -> bool {
        let mut chars = self.text.chars();
        chars.next().is_some() && chars.next().is_none()
    }
}

/// One page of extracted fragments plus page metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    /// 1-based page number.
    pub number: usize,
    pub width: f64,
    pub height: f64,
    /// Hyperlink targets from the page's link annotations.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<String>,
    pub fragments: Vec<Fragment>,
}

impl Page {
    /// Copy of this page's metadata with an empty fragment list.
    pub(crate) fn with_fragments(&self, fragments: Vec<Fragment>) -> Self {
        Self {
            number: self.number,
            width: self.width,
            height: self.height,
            links: self.links.clone(),
            fragments,
        }
    }
}

/// An ordered sequence of pages.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Document {
    pub pages: Vec<Page>,
}

impl Document {
    /// Total fragment count across all pages.
    pub fn fragment_count(&self) -> usize {
        self.pages.iter().map(|p| p.fragments.len()).sum()
    }
}

/// The structured invoice fields pulled from a reassembled document.
///
/// Each field is first-match-wins: once populated it is never overwritten
/// by a later match. Fields serialize as string-or-empty — the flat shape
/// downstream consumers expect.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceRecord {
    /// 发票号码 — invoice number, digits and/or letters as printed.
    #[serde(
        default,
        serialize_with = "string_or_empty",
        deserialize_with = "empty_as_none"
    )]
    pub invoice_number: Option<String>,
    /// 开票日期 — issue date, kept in its `YYYY年MM月DD日` textual form.
    #[serde(
        default,
        serialize_with = "string_or_empty",
        deserialize_with = "empty_as_none"
    )]
    pub invoice_date: Option<String>,
    /// 不含税金额 — amount excluding tax, as matched (no numeric coercion).
    #[serde(
        default,
        serialize_with = "string_or_empty",
        deserialize_with = "empty_as_none"
    )]
    pub amount_excluding_tax: Option<String>,
    /// 税额 — tax amount, as matched.
    #[serde(
        default,
        serialize_with = "string_or_empty",
        deserialize_with = "empty_as_none"
    )]
    pub tax_amount: Option<String>,
    /// 价税合计 — amount including tax, as matched.
    #[serde(
        default,
        serialize_with = "string_or_empty",
        deserialize_with = "empty_as_none"
    )]
    pub amount_including_tax: Option<String>,
}

impl InvoiceRecord {
    /// True when no field matched anywhere in the document.
    pub fn is_empty(&self) -> bool {
        self.invoice_number.is_none()
            && self.invoice_date.is_none()
            && self.amount_excluding_tax.is_none()
            && self.tax_amount.is_none()
            && self.amount_including_tax.is_none()
    }
}

fn string_or_empty<S: Serializer>(v: &Option<String>, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(v.as_deref().unwrap_or(""))
}

fn empty_as_none<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    let s = String::deserialize(d)?;
    Ok(if s.is_empty() { None } else { Some(s) })
}

// ── Tests ────────────────────────────────────────────────────────────────────
