//! Labelled-pattern extraction of invoice fields.
//!
//! Operates on the `direct_concat` line views produced by the line-merge
//! stage. Each field has a dedicated label+value pattern; labels tolerate
//! arbitrary whitespace between their characters because the reassembled
//! lines often interleave stray spaces from the extractor.
//!
//! Assignment is first-match-wins per field across the whole document, in
//! page/array scan order. Extraction is best-effort: a line that matches
//! nothing contributes nothing, and a field with no match anywhere simply
//! stays unset.
//!
//! Values are stored as matched — no numeric coercion, and the date keeps
//! its `YYYY年MM月DD日` textual form.

use crate::model::{Document, InvoiceRecord};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

// ── Patterns ─────────────────────────────────────────────────────────────
//
// The currency class in the amount patterns is the fullwidth ￥ (U+FFE5);
// the 合计 pair rule uses the halfwidth ¥ (U+00A5). Both occur in the wild
// and the distinction is intentional.

static RE_INVOICE_NUMBER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:发\s*票\s*号\s*码|发\s*票\s*号|票\s*号)\s*[:：]?\s*([A-Za-z0-9]+)").unwrap()
});

static RE_INVOICE_DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:开\s*票\s*日\s*期|开\s*票\s*时\s*间|日\s*期)\s*[:：]?\s*(\d{4}年\d{1,2}月\d{1,2}日)")
        .unwrap()
});

static RE_AMOUNT_EXCLUDING_TAX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:不含税金额|不含税价|金额)[:：]?\s*[￥$]?\s*(\d+(?:\.\d{2})?)").unwrap()
});

static RE_TAX_AMOUNT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:税额|增值税)[:：]?\s*[￥$]?\s*(\d+(?:\.\d{2})?)").unwrap());

/// `合计¥<net>¥<tax>` with nothing else on the line — the summary row of
/// the itemised table, where the two amounts carry no individual labels.
static RE_TOTAL_PAIR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^合计¥(\d+(?:\.\d{2})?)¥(\d+(?:\.\d{2})?)$").unwrap());

static RE_AMOUNT_INCLUDING_TAX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:含\s*税\s*金\s*额|价\s*税\s*合\s*计).*?[￥$]?\s*(\d+(?:\.\d{2})?)").unwrap()
});

// ── Extraction ───────────────────────────────────────────────────────────

/// Scan a line-merged document and assemble the invoice record.
pub fn extract_fields(doc: &Document) -> InvoiceRecord {
    let mut record = InvoiceRecord::default();
    for page in &doc.pages {
        for fragment in &page.fragments {
            let Some(line) = fragment.direct_concat.as_deref() else {
                continue;
            };
            apply_rules(&mut record, line);
        }
    }
    debug!(empty = record.is_empty(), "field extraction complete");
    record
}

/// Apply every field rule to one line, filling only still-unset fields.
fn apply_rules(record: &mut InvoiceRecord, line: &str) {
    if record.invoice_number.is_none() {
        if let Some(caps) = RE_INVOICE_NUMBER.captures(line) {
            record.invoice_number = Some(caps[1].to_string());
        }
    }

    if record.invoice_date.is_none() {
        if let Some(caps) = RE_INVOICE_DATE.captures(line) {
            record.invoice_date = Some(caps[1].to_string());
        }
    }

    if record.amount_excluding_tax.is_none() {
        if let Some(caps) = RE_AMOUNT_EXCLUDING_TAX.captures(line) {
            record.amount_excluding_tax = Some(caps[1].to_string());
        }
    }

    if record.tax_amount.is_none() {
        if let Some(caps) = RE_TAX_AMOUNT.captures(line) {
            record.tax_amount = Some(caps[1].to_string());
        }
    }

    // The unlabelled 合计 pair backfills whichever of the two amounts the
    // labelled rules have not found yet.
    if record.amount_excluding_tax.is_none() || record.tax_amount.is_none() {
        if let Some(caps) = RE_TOTAL_PAIR.captures(line) {
            if record.amount_excluding_tax.is_none() {
                record.amount_excluding_tax = Some(caps[1].to_string());
            }
            if record.tax_amount.is_none() {
                record.tax_amount = Some(caps[2].to_string());
            }
        }
    }

    if record.amount_including_tax.is_none() {
        if let Some(caps) = RE_AMOUNT_INCLUDING_TAX.captures(line) {
            record.amount_including_tax = Some(caps[1].to_string());
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────
