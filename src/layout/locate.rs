//! Stage one: resolve each target's search string to a rectangle on the
//! page. Targets whose needle never occurs are dropped here and never
//! reach the placer.

use crate::job::{Side, TargetSpec};
use crate::layout::Rect;
use crate::text_index::TextIndex;

/// A target that survived lookup: its caption, side, and the union
/// rectangle of the first occurrence of its needle.
#[derive(Debug, Clone, PartialEq)]
pub struct LocatedTarget {
    pub caption: String,
    pub rect: Rect,
    pub side: Side,
}

/// Look every target up in the page index, preserving input order.
///
/// Empty needles are skipped before any search. A miss is not an error;
/// the target simply contributes nothing downstream.
pub fn locate_targets(index: &TextIndex, targets: &[TargetSpec]) -> Vec<LocatedTarget> {
    let mut located = Vec::with_capacity(targets.len());
    for target in targets {
        if target.needle.is_empty() {
            continue;
        }
        match index.find_first(&target.needle) {
            Some(rect) => located.push(LocatedTarget {
                caption: target.caption.clone(),
                rect,
                side: target.side,
            }),
            None => {
                tracing::debug!(caption = %target.caption, "target text not found, dropping");
            }
        }
    }
    located
}
