//! Row clustering and greedy horizontal merge.
//!
//! A PDF extractor frequently reports one visual line of text as many
//! separate boxes — per word, per glyph run, sometimes per glyph. This
//! stage re-groups fragments into rows by quantized `y`, sorts each row
//! left-to-right, and merges neighbours whose gap satisfies the pass's
//! [`RowRule`].
//!
//! Three invariants hold for every horizontal pass:
//!
//! * whitespace-only fragments are dropped at pass entry;
//! * column-merged fragments never re-enter row clustering — they are
//!   re-appended verbatim;
//! * a rotated fragment is bucketed with its row but never combined, so it
//!   terminates any merge chain that reaches it.

use crate::model::{Document, Fragment, FragmentKind, Page};
use crate::pipeline::bucket_key;
use std::collections::BTreeMap;
use tracing::trace;

/// Pass-specific rule for joining fragment `b` onto the chain ending in `a`.
///
/// All three rules also require the two heights to differ by less than half
/// of the larger one; glyphs from different text sizes that merely happen
/// to share a baseline bucket must not fuse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowRule {
    /// Join when the signed gap is under 2 units, whatever the glyph size.
    LooseGap,
    /// Join two single characters whose gap is within 120% of one
    /// character pitch. Aimed at the single-glyph leftovers the vertical
    /// passes create or leave behind.
    SingleCharPitch,
    /// Join when the gap is within 20% of one character pitch.
    TightPitch,
}

impl RowRule {
    fn allows(self, a: &Fragment, b: &Fragment) -> bool {
        if a.is_rotated() || b.is_rotated() {
            return false;
        }
        let height_delta = (a.height - b.height).abs();
        if height_delta >= a.height.max(b.height) * 0.5 {
            return false;
        }
        // Signed distance from a's right edge to b's left edge; negative
        // means the boxes overlap.
        let gap = b.x - a.right();
        match self {
            RowRule::LooseGap => gap < 2.0,
            RowRule::SingleCharPitch => {
                let pitch = reference_pitch(a);
                a.is_single_char() && b.is_single_char() && (gap - pitch).abs() < pitch * 1.2
            }
            RowRule::TightPitch => {
                let pitch = reference_pitch(a);
                (gap - pitch).abs() < pitch * 0.2
            }
        }
    }
}

/// One character pitch, read off the chain head's glyph height.
fn reference_pitch(a: &Fragment) -> f64 {
    if a.height > 0.0 {
        a.height
    } else {
        1.0
    }
}

/// Run one horizontal-merge pass over a whole document.
pub fn merge_rows(doc: &Document, bucket: f64, rule: RowRule) -> Document {
    Document {
        pages: doc
            .pages
            .iter()
            .map(|page| merge_page_rows(page, bucket, rule))
            .collect(),
    }
}

fn merge_page_rows(page: &Page, bucket: f64, rule: RowRule) -> Page {
    // Empty-after-trim fragments are dropped for good at pass entry.
    let kept = page
        .fragments
        .iter()
        .filter(|f| !f.text.trim().is_empty())
        .cloned();

    // Column-merged fragments ride along unmodified.
    let (skipped, candidates): (Vec<Fragment>, Vec<Fragment>) =
        kept.partition(|f| f.kind.is_column_merged());

    let mut rows: BTreeMap<i64, Vec<Fragment>> = BTreeMap::new();
    for fragment in candidates {
        rows.entry(bucket_key(fragment.y, bucket))
            .or_default()
            .push(fragment);
    }

    let mut fragments = skipped;
    for (key, mut row) in rows {
        row.sort_by(|a, b| a.x.total_cmp(&b.x));
        let before = row.len();
        merge_chain(&mut fragments, row, rule);
        trace!(row = key, before, "row merged");
    }

    page.with_fragments(fragments)
}

/// Greedy left-to-right merge of one sorted row, appending results to `out`.
///
/// A chain grows as long as the rule admits the next fragment against the
/// accumulated head; the first refusal seals the chain and the refused
/// fragment starts the next one. Chains of three or more therefore merge
/// transitively in a single sweep.
fn merge_chain(out: &mut Vec<Fragment>, row: Vec<Fragment>, rule: RowRule) {
    let mut iter = row.into_iter();
    let Some(mut current) = iter.next() else {
        return;
    };
    for next in iter {
        if rule.allows(&current, &next) {
            current.text.push_str(&next.text);
            current.width = next.right() - current.x;
            current.kind = FragmentKind::RowMerged;
        } else {
            out.push(std::mem::replace(&mut current, next));
        }
    }
    out.push(current);
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
    fn loose_gap_merges_adjacent_fragments() {
        let d = doc(vec![
            Fragment::new("发", 100.0, 200.0, 10.0, 10.0),
            Fragment::new("票", 111.0, 200.0, 10.0, 10.0),
        ]);
        let merged = merge_rows(&d, 5.0, RowRule::LooseGap);
        let frags = &merged.pages[0].fragments;
        assert_eq!(frags.len(), 1);
        assert_eq!(frags[0].text, "发票");
        assert_eq!(frags[0].width, 21.0);
        assert_eq!(frags[0].x, 100.0);
        assert!(frags[0].kind.is_row_merged());
    }

    #[test]
    fn loose_gap_respects_distance() {
        // gap = 122 - (100 + 10) = 12, too far for pass 1
        let d = doc(vec![
            Fragment::new("发", 100.0, 200.0, 10.0, 10.0),
            Fragment::new("票", 122.0, 200.0, 10.0, 10.0),
        ]);
        let merged = merge_rows(&d, 5.0, RowRule::LooseGap);
        assert_eq!(merged.pages[0].fragments.len(), 2);
    }

    #[test]
    fn overlapping_boxes_merge_under_loose_gap() {
        let d = doc(vec![
            Fragment::new("ab", 100.0, 200.0, 10.0, 10.0),
            Fragment::new("cd", 105.0, 200.0, 10.0, 10.0),
        ]);
        let merged = merge_rows(&d, 5.0, RowRule::LooseGap);
        let frags = &merged.pages[0].fragments;
        assert_eq!(frags.len(), 1);
        assert_eq!(frags[0].text, "abcd");
        assert_eq!(frags[0].width, 15.0);
    }

    #[test]
    fn dissimilar_heights_never_merge() {
        // Touching boxes, but 4.0 vs 10.0 differ by more than half of 10.0.
        let d = doc(vec![
            Fragment::new("合", 100.0, 200.0, 10.0, 10.0),
            Fragment::new("计", 110.5, 200.0, 4.0, 4.0),
        ]);
        let merged = merge_rows(&d, 5.0, RowRule::LooseGap);
        assert_eq!(merged.pages[0].fragments.len(), 2);
    }

    #[test]
    fn rotated_fragment_is_never_combined() {
        let mut rotated = Fragment::new("章", 111.0, 200.0, 10.0, 10.0);
        rotated.angle = Some(45.0);
        let d = doc(vec![
            Fragment::new("发", 100.0, 200.0, 10.0, 10.0),
            rotated.clone(),
            Fragment::new("票", 122.0, 200.0, 10.0, 10.0),
        ]);
        let merged = merge_rows(&d, 5.0, RowRule::LooseGap);
        let frags = &merged.pages[0].fragments;
        assert_eq!(frags.len(), 3);
        let kept = frags.iter().find(|f| f.text == "章").unwrap();
        assert_eq!((kept.x, kept.y, kept.width, kept.height), (111.0, 200.0, 10.0, 10.0));
        assert!(kept.kind.is_plain());
    }

    #[test]
    fn rotated_fragment_seals_the_chain() {
        // 发 | rotated 章 | 票 all touching: the rotated glyph in the middle
        // keeps its neighbours apart even though 发→票 alone would qualify
        // by distance.
        let mut rotated = Fragment::new("章", 110.0, 200.0, 10.0, 10.0);
        rotated.angle = Some(90.0);
        let d = doc(vec![
            Fragment::new("发", 100.0, 200.0, 10.0, 10.0),
            rotated,
            Fragment::new("票", 120.0, 200.0, 10.0, 10.0),
        ]);
        let merged = merge_rows(&d, 5.0, RowRule::LooseGap);
        assert_eq!(merged.pages[0].fragments.len(), 3);
    }

    #[test]
    fn whitespace_fragments_are_filtered_at_entry() {
        let d = doc(vec![
            Fragment::new("  ", 50.0, 200.0, 5.0, 10.0),
            Fragment::new("发", 100.0, 200.0, 10.0, 10.0),
        ]);
        let merged = merge_rows(&d, 5.0, RowRule::LooseGap);
        let frags = &merged.pages[0].fragments;
        assert_eq!(frags.len(), 1);
        assert_eq!(frags[0].text, "发");
    }

    #[test]
    fn column_merged_fragments_ride_along() {
        let mut vertical = Fragment::new("壹佰", 100.0, 200.0, 10.0, 21.0);
        vertical.kind = FragmentKind::ColumnMerged;
        let d = doc(vec![
            vertical.clone(),
            // Same row bucket and touching, yet excluded from clustering.
            Fragment::new("元", 110.0, 200.0, 10.0, 10.0),
        ]);
        let merged = merge_rows(&d, 5.0, RowRule::LooseGap);
        let frags = &merged.pages[0].fragments;
        assert_eq!(frags.len(), 2);
        assert!(frags.contains(&vertical));
    }

    #[test]
    fn chain_of_three_merges_in_one_sweep() {
        let d = doc(vec![
            Fragment::new("发", 100.0, 200.0, 10.0, 10.0),
            Fragment::new("票", 111.0, 200.0, 10.0, 10.0),
            Fragment::new("号", 122.0, 200.0, 10.0, 10.0),
        ]);
        let merged = merge_rows(&d, 5.0, RowRule::LooseGap);
        let frags = &merged.pages[0].fragments;
        assert_eq!(frags.len(), 1);
        assert_eq!(frags[0].text, "发票号");
        assert_eq!(frags[0].width, 32.0);
    }

    #[test]
    fn single_char_pitch_requires_single_characters() {
        // One pitch (10) apart, but the left side is multi-character.
        let d = doc(vec![
            Fragment::new("发票", 100.0, 200.0, 20.0, 10.0),
            Fragment::new("号", 130.0, 200.0, 10.0, 10.0),
        ]);
        let merged = merge_rows(&d, 5.0, RowRule::SingleCharPitch);
        assert_eq!(merged.pages[0].fragments.len(), 2);
    }

    #[test]
    fn single_char_pitch_merges_spread_glyphs() {
        // gap = 10 = one pitch, well inside the 120% window.
        let d = doc(vec![
            Fragment::new("发", 100.0, 200.0, 10.0, 10.0),
            Fragment::new("票", 120.0, 200.0, 10.0, 10.0),
        ]);
        let merged = merge_rows(&d, 5.0, RowRule::SingleCharPitch);
        let frags = &merged.pages[0].fragments;
        assert_eq!(frags.len(), 1);
        assert_eq!(frags[0].text, "发票");
        assert_eq!(frags[0].width, 30.0);
    }

    #[test]
    fn tight_pitch_rejects_what_single_char_pitch_accepts() {
        // gap = 15, |15 - 10| = 5: inside 1.2·pitch but outside 0.2·pitch.
        let left = Fragment::new("发", 100.0, 200.0, 10.0, 10.0);
        let right = Fragment::new("票", 125.0, 200.0, 10.0, 10.0);

        let loosened = merge_rows(&doc(vec![left.clone(), right.clone()]), 5.0, RowRule::SingleCharPitch);
        assert_eq!(loosened.pages[0].fragments.len(), 1);

        let tight = merge_rows(&doc(vec![left, right]), 2.5, RowRule::TightPitch);
        assert_eq!(tight.pages[0].fragments.len(), 2);
    }

    #[test]
    fn tight_pitch_accepts_exact_pitch() {
        let d = doc(vec![
            Fragment::new("金", 100.0, 200.0, 10.0, 10.0),
            Fragment::new("额", 120.5, 200.0, 10.0, 10.0),
        ]);
        let merged = merge_rows(&d, 2.5, RowRule::TightPitch);
        assert_eq!(merged.pages[0].fragments.len(), 1);
        assert_eq!(merged.pages[0].fragments[0].text, "金额");
    }

    #[test]
    fn rows_are_separated_by_bucket() {
        // y 200 vs 230 land in different buckets; no cross-row merging.
        let d = doc(vec![
            Fragment::new("发", 100.0, 200.0, 10.0, 10.0),
            Fragment::new("票", 111.0, 230.0, 10.0, 10.0),
        ]);
        let merged = merge_rows(&d, 5.0, RowRule::LooseGap);
        assert_eq!(merged.pages[0].fragments.len(), 2);
    }

    #[test]
    fn input_document_is_not_mutated() {
        let d = doc(vec![
            Fragment::new("发", 100.0, 200.0, 10.0, 10.0),
            Fragment::new("票", 111.0, 200.0, 10.0, 10.0),
        ]);
        let snapshot = d.clone();
        let _ = merge_rows(&d, 5.0, RowRule::LooseGap);
        assert_eq!(d, snapshot);
    }
}
