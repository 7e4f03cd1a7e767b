//! Final line bucketing: the two joined strings per visual line.
//!
//! After the merge passes, one visual line may still consist of several
//! fragments (label box, value box, rotated stamp). This stage buckets ALL
//! fragments — merge tags no longer matter — on a coarse quantized `y`,
//! and writes two joined views onto the x-first fragment of each bucket:
//!
//! * `direct_concat`   — member texts concatenated in x order
//! * `semicolon_joined` — the same members joined with `;`
//!
//! Fragments are annotated in place: page order is preserved, which the
//! field-extraction stage relies on for its first-match-wins scan.

use crate::model::{Document, Page};
use crate::pipeline::bucket_key;
use std::collections::BTreeMap;
use tracing::debug;

/// Bucket width for the final line grouping. Coarser than the merge
/// passes: at this point a whole line should collapse to one string even
/// when its boxes sit on slightly different baselines.
const LINE_BUCKET: f64 = 8.0;

/// Annotate every page with per-line joined strings.
pub fn merge_lines(doc: &Document) -> Document {
    let doc = Document {
        pages: doc.pages.iter().map(merge_page_lines).collect(),
    };
    debug!(
        lines = doc
            .pages
            .iter()
            .flat_map(|p| &p.fragments)
            .filter(|f| f.direct_concat.is_some())
            .count(),
        "line merge complete"
    );
    doc
}

fn merge_page_lines(page: &Page) -> Page {
    let mut page = page.clone();

    let mut buckets: BTreeMap<i64, Vec<usize>> = BTreeMap::new();
    for (i, fragment) in page.fragments.iter().enumerate() {
        buckets
            .entry(bucket_key(fragment.y, LINE_BUCKET))
            .or_default()
            .push(i);
    }

    for (_, mut members) in buckets {
        members.sort_by(|&a, &b| page.fragments[a].x.total_cmp(&page.fragments[b].x));

        let direct: String = members
            .iter()
            .map(|&i| page.fragments[i].text.as_str())
            .collect();
        let joined = members
            .iter()
            .map(|&i| page.fragments[i].text.as_str())
            .collect::<Vec<_>>()
            .join(";");

        let first = &mut page.fragments[members[0]];
        first.direct_concat = Some(direct);
        first.semicolon_joined = Some(joined);
    }

    page
}

// ── Tests ────────────────────────────────────────────────────────────────────
