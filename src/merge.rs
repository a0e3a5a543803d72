//! Collapsing chains of adjacent, same-author operations.
//!
//! Used by the automatic-merge resolution strategy, and available to callers
//! that want to compact their in-flight operation chains before submission.
//! The reduction is pure and order-preserving: calling it on its own output
//! returns the same sequence.

use crate::{Operation, OperationKind, Span};
use tracing::trace;

/// Operations from the same author within this window of each other are
/// candidates for merging.
pub const MERGE_WINDOW_MS: u64 = 1000;

/// Collapse chains of adjacent, same-author, same-kind operations into
/// single equivalent operations.
///
/// Sorts by timestamp ascending, then folds each operation into the last
/// accumulated one whenever [`can_merge`] holds. Cross-kind pairs are never
/// merged.
pub fn merge_operations(ops: Vec<Operation>) -> Vec<Operation> {
    let mut sorted = ops;
    sorted.sort_by(|a, b| {
        a.timestamp
            .cmp(&b.timestamp)
            .then_with(|| a.id.cmp(&b.id))
    });

    let mut merged: Vec<Operation> = Vec::with_capacity(sorted.len());
    for op in sorted {
        match merged.last_mut() {
            Some(prev) if can_merge(prev, &op) => {
                trace!(into = %prev.id, from = %op.id, "merging adjacent operations");
                *prev = merge_pair(prev, &op);
            }
            _ => merged.push(op),
        }
    }
    merged
}

/// Whether `next` can fold into the accumulated `prev`: same author, same
/// kind, timestamps within [`MERGE_WINDOW_MS`], and the two are adjacent
/// (`next` starts where `prev` ends, or at the same position).
pub fn can_merge(prev: &Operation, next: &Operation) -> bool {
    prev.author == next.author
        && prev.kind == next.kind
        && next.timestamp.abs_diff(prev.timestamp) <= MERGE_WINDOW_MS
        && (prev.end() == next.position || next.position == prev.position)
}

fn merge_pair(prev: &Operation, next: &Operation) -> Operation {
    let mut out = prev.clone();
    // keep the earliest timestamp so window checks stay stable across passes
    out.timestamp = prev.timestamp.min(next.timestamp);
    match prev.kind {
        OperationKind::Insert | OperationKind::Replace => {
            let mut content = prev.content.clone().unwrap_or_default();
            content.push_str(next.content.as_deref().unwrap_or(""));
            out.content = Some(content);
            out.length = sum_lengths(prev.length, next.length);
        }
        OperationKind::Delete | OperationKind::Move => {
            out.length = sum_lengths(prev.length, next.length);
        }
    }
    out
}

fn sum_lengths(a: Option<Span>, b: Option<Span>) -> Option<Span> {
    match (a, b) {
        (None, None) => None,
        (a, b) => Some(a.unwrap_or(0) + b.unwrap_or(0)),
    }
}
