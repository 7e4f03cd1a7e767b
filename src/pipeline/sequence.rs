//! The fixed five-pass merge orchestration.
//!
//! ```text
//! rows(5.0, loose) ─▶ columns(2.0, touching) ─▶ columns(5.0, near-pitch)
//!                  ─▶ rows(5.0, single-char-pitch) ─▶ rows(2.5, tight-pitch)
//! ```
//!
//! The first pass joins loosely-spaced same-row glyph runs. The two
//! vertical passes reconstruct stacked single characters at two
//! granularities. The last two horizontal passes re-merge the
//! single-character leftovers the vertical passes created or left behind.
//!
//! Order and bucket widths are load-bearing: every pass's predicate
//! depends on which fragments already carry a merge tag from an earlier
//! pass, so reordering the table changes the output. Each pass consumes
//! the previous pass's full document and produces a new one; no state is
//! shared between passes.

use crate::model::Document;
use crate::pipeline::columns::{merge_columns, ColumnRule};
use crate::pipeline::rows::{merge_rows, RowRule};
use tracing::debug;

#[derive(Debug, Clone, Copy)]
enum Pass {
    Rows { bucket: f64, rule: RowRule },
    Columns { bucket: f64, rule: ColumnRule },
}

const PASSES: [Pass; 5] = [
    Pass::Rows {
        bucket: 5.0,
        rule: RowRule::LooseGap,
    },
    Pass::Columns {
        bucket: 2.0,
        rule: ColumnRule::Touching,
    },
    Pass::Columns {
        bucket: 5.0,
        rule: ColumnRule::NearPitch,
    },
    Pass::Rows {
        bucket: 5.0,
        rule: RowRule::SingleCharPitch,
    },
    Pass::Rows {
        bucket: 2.5,
        rule: RowRule::TightPitch,
    },
];

/// Run the five merge passes in their fixed order.
pub fn integrate(doc: &Document) -> Document {
    let mut current = doc.clone();
    for (i, pass) in PASSES.iter().enumerate() {
        let before = current.fragment_count();
        current = match *pass {
            Pass::Rows { bucket, rule } => merge_rows(&current, bucket, rule),
            Pass::Columns { bucket, rule } => merge_columns(&current, bucket, rule),
        };
        debug!(
            pass = i + 1,
            before,
            after = current.fragment_count(),
            "merge pass complete"
        );
    }
    current
}

// ── Tests ────────────────────────────────────────────────────────────────────
