//! Column clustering and vertical merge of single characters.
//!
//! Vertically-set labels (common on Chinese invoices: seller blocks, stub
//! headers) reach the extractor as one box per glyph, stacked along x.
//! This stage selects single-character fragments only, groups them into
//! columns by quantized `x`, sorts bottom-to-top, and merges consecutive
//! glyphs whose spacing satisfies the pass's [`ColumnRule`].
//!
//! The first merge of a chain captures the bottom glyph's `y` as the
//! chain's baseline anchor; later merges extend `y`/`height` upward from
//! that anchor. After merging, every fragment in a column — merged or
//! singleton — is stamped with its column key and 0-based position so a
//! renderer can recover the column structure.

use crate::model::{Document, Fragment, FragmentKind, Page};
use crate::pipeline::bucket_key;
use std::collections::BTreeMap;
use tracing::trace;

/// Pass-specific rule for stacking fragment `b` on top of the chain ending
/// in `a`. Spacing is the signed distance from `b`'s bottom edge to `a`'s
/// anchor: `(b.y − b.height) − a.y`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnRule {
    /// Stack when the spacing is under 2 units (strict, signed).
    Touching,
    /// Stack when the spacing magnitude is within 120% of the upper
    /// glyph's height.
    NearPitch,
}

impl ColumnRule {
    fn allows(self, a: &Fragment, b: &Fragment) -> bool {
        let spacing = (b.y - b.height) - a.y;
        match self {
            ColumnRule::Touching => spacing < 2.0,
            ColumnRule::NearPitch => spacing.abs() <= b.height * 1.2,
        }
    }
}

/// Run one vertical-merge pass over a whole document.
pub fn merge_columns(doc: &Document, bucket: f64, rule: ColumnRule) -> Document {
    Document {
        pages: doc
            .pages
            .iter()
            .map(|page| merge_page_columns(page, bucket, rule))
            .collect(),
    }
}

fn merge_page_columns(page: &Page, bucket: f64, rule: ColumnRule) -> Page {
    // Only single-character fragments enter column clustering; everything
    // else rides along unmodified and untouched by column stamping.
    let (singles, mut fragments): (Vec<Fragment>, Vec<Fragment>) = page
        .fragments
        .iter()
        .cloned()
        .partition(|f| f.is_single_char());

    let mut columns: BTreeMap<i64, Vec<Fragment>> = BTreeMap::new();
    for fragment in singles {
        // A lone whitespace glyph has nothing to stack; drop it here.
        if fragment.text.trim().is_empty() {
            continue;
        }
        columns
            .entry(bucket_key(fragment.x, bucket))
            .or_default()
            .push(fragment);
    }

    for (key, mut column) in columns {
        column.sort_by(|a, b| a.y.total_cmp(&b.y));
        let before = column.len();
        let mut column = merge_chain(column, rule);
        trace!(column = key, before, after = column.len(), "column merged");

        let column_key = key as f64 * bucket;
        for (index, fragment) in column.iter_mut().enumerate() {
            fragment.column_key = Some(column_key);
            fragment.column_index = Some(index);
        }
        fragments.append(&mut column);
    }

    page.with_fragments(fragments)
}

/// Greedy bottom-to-top merge of one sorted column.
fn merge_chain(column: Vec<Fragment>, rule: ColumnRule) -> Vec<Fragment> {
    if column.len() < 2 {
        return column;
    }
    // A column of zero-height glyphs is grouped and stamped, never merged.
    let mean_height = column.iter().map(|f| f.height).sum::<f64>() / column.len() as f64;
    if mean_height <= 0.0 {
        return column;
    }

    let mut merged = Vec::with_capacity(column.len());
    let mut iter = column.into_iter();
    let Some(mut current) = iter.next() else {
        return merged;
    };
    for next in iter {
        if rule.allows(&current, &next) {
            // The chain's anchor is the bottom-most glyph's y, captured
            // once and carried through every later merge.
            let base_y = current.base_y.unwrap_or(current.y);
            current.text.push_str(&next.text);
            current.width = next.right() - current.x;
            current.y = next.y;
            current.height = next.y - base_y;
            current.base_y = Some(base_y);
            current.kind = FragmentKind::ColumnMerged;
        } else {
            merged.push(std::mem::replace(&mut current, next));
        }
    }
    merged.push(current);
    merged
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn page(fragments: Vec<Fragment>) -> Page {
        Page {
            number: 1,
            width: 595.0,
            height: 842.0,
            links: Vec::new(),
            fragments,
        }
    }

    fn doc(fragments: Vec<Fragment>) -> Document {
        Document {
            pages: vec![page(fragments)],
        }
    }

    #[test]
    fn touching_rule_stacks_adjacent_glyphs() {
        // spacing = (21 - 10) - 10 = 1 < 2
        let d = doc(vec![
            Fragment::new("壹", 50.0, 10.0, 10.0, 10.0),
            Fragment::new("佰", 50.0, 21.0, 10.0, 10.0),
        ]);
        let merged = merge_columns(&d, 2.0, ColumnRule::Touching);
        let frags = &merged.pages[0].fragments;
        assert_eq!(frags.len(), 1);
        let f = &frags[0];
        assert_eq!(f.text, "壹佰");
        assert_eq!(f.base_y, Some(10.0));
        assert_eq!(f.y, 21.0);
        assert_eq!(f.height, 11.0);
        assert_eq!(f.width, 10.0);
        assert!(f.kind.is_column_merged());
    }

    #[test]
    fn touching_rule_rejects_wide_spacing() {
        // spacing = (40 - 10) - 10 = 20
        let d = doc(vec![
            Fragment::new("壹", 50.0, 10.0, 10.0, 10.0),
            Fragment::new("佰", 50.0, 40.0, 10.0, 10.0),
        ]);
        let merged = merge_columns(&d, 2.0, ColumnRule::Touching);
        assert_eq!(merged.pages[0].fragments.len(), 2);
    }

    #[test]
    fn near_pitch_accepts_what_touching_rejects() {
        // spacing = (32 - 10) - 10 = 12 ≤ 1.2·10
        let bottom = Fragment::new("壹", 50.0, 10.0, 10.0, 10.0);
        let top = Fragment::new("佰", 50.0, 32.0, 10.0, 10.0);

        let strict = merge_columns(&doc(vec![bottom.clone(), top.clone()]), 2.0, ColumnRule::Touching);
        assert_eq!(strict.pages[0].fragments.len(), 2);

        let relative = merge_columns(&doc(vec![bottom, top]), 5.0, ColumnRule::NearPitch);
        assert_eq!(relative.pages[0].fragments.len(), 1);
        assert_eq!(relative.pages[0].fragments[0].text, "壹佰");
    }

    #[test]
    fn baseline_survives_a_three_glyph_chain() {
        let d = doc(vec![
            Fragment::new("壹", 50.0, 10.0, 10.0, 10.0),
            Fragment::new("佰", 50.0, 21.0, 10.0, 10.0),
            Fragment::new("元", 50.0, 32.0, 10.0, 10.0),
        ]);
        let merged = merge_columns(&d, 2.0, ColumnRule::Touching);
        let frags = &merged.pages[0].fragments;
        assert_eq!(frags.len(), 1);
        let f = &frags[0];
        assert_eq!(f.text, "壹佰元");
        assert_eq!(f.base_y, Some(10.0), "anchor is the bottom glyph's y");
        assert_eq!(f.y, 32.0);
        assert_eq!(f.height, 22.0);
    }

    #[test]
    fn multi_char_fragments_pass_through_unstamped() {
        let d = doc(vec![
            Fragment::new("发票", 50.0, 10.0, 20.0, 10.0),
            Fragment::new("壹", 50.0, 30.0, 10.0, 10.0),
        ]);
        let merged = merge_columns(&d, 2.0, ColumnRule::Touching);
        let untouched = merged.pages[0]
            .fragments
            .iter()
            .find(|f| f.text == "发票")
            .unwrap();
        assert_eq!(untouched.column_key, None);
        assert_eq!(untouched.column_index, None);
        assert!(untouched.kind.is_plain());
    }

    #[test]
    fn singletons_are_stamped_with_column_position() {
        // Two glyphs in the same column but too far apart to merge.
        let d = doc(vec![
            Fragment::new("壹", 50.0, 10.0, 10.0, 10.0),
            Fragment::new("佰", 50.0, 60.0, 10.0, 10.0),
        ]);
        let merged = merge_columns(&d, 2.0, ColumnRule::Touching);
        let mut frags = merged.pages[0].fragments.clone();
        frags.sort_by(|a, b| a.y.total_cmp(&b.y));
        assert_eq!(frags[0].column_key, Some(50.0));
        assert_eq!(frags[0].column_index, Some(0));
        assert_eq!(frags[1].column_key, Some(50.0));
        assert_eq!(frags[1].column_index, Some(1));
        assert!(frags.iter().all(|f| f.kind.is_plain()));
    }

    #[test]
    fn whitespace_single_chars_are_dropped() {
        let d = doc(vec![
            Fragment::new(" ", 50.0, 10.0, 5.0, 10.0),
            Fragment::new("壹", 50.0, 30.0, 10.0, 10.0),
        ]);
        let merged = merge_columns(&d, 2.0, ColumnRule::Touching);
        let frags = &merged.pages[0].fragments;
        assert_eq!(frags.len(), 1);
        assert_eq!(frags[0].text, "壹");
    }

    #[test]
    fn nearby_x_coordinates_share_a_column() {
        // 50.0 and 50.8 both quantize to the same bucket of width 2.
        let d = doc(vec![
            Fragment::new("壹", 50.0, 10.0, 10.0, 10.0),
            Fragment::new("佰", 50.8, 21.0, 10.0, 10.0),
        ]);
        let merged = merge_columns(&d, 2.0, ColumnRule::Touching);
        let frags = &merged.pages[0].fragments;
        assert_eq!(frags.len(), 1);
        assert_eq!(frags[0].text, "壹佰");
        assert!(
            (frags[0].width - 10.8).abs() < 1e-9,
            "width spans to the top glyph's right edge, got {}",
            frags[0].width
        );
    }

    #[test]
    fn zero_height_column_is_stamped_but_not_merged() {
        let d = doc(vec![
            Fragment::new("壹", 50.0, 10.0, 10.0, 0.0),
            Fragment::new("佰", 50.0, 11.0, 10.0, 0.0),
        ]);
        let merged = merge_columns(&d, 2.0, ColumnRule::Touching);
        let frags = &merged.pages[0].fragments;
        assert_eq!(frags.len(), 2);
        assert!(frags.iter().all(|f| f.column_key.is_some()));
    }

    #[test]
    fn input_document_is_not_mutated() {
        let d = doc(vec![
            Fragment::new("壹", 50.0, 10.0, 10.0, 10.0),
            Fragment::new("佰", 50.0, 21.0, 10.0, 10.0),
        ]);
        let snapshot = d.clone();
        let _ = merge_columns(&d, 2.0, ColumnRule::Touching);
        assert_eq!(d, snapshot);
    }
}
