//! Operational transformation over an append-only operation log.
//!
//! This is the core of convergence. Each incoming operation is transformed
//! rightward against every causally-prior log entry it overlaps with, so its
//! position and length reflect the effects of operations that already landed.
//! Transformation is deterministic given a fixed log order, which is the
//! property the engine relies on: all parties must apply operations in the
//! same order to converge. It is not guaranteed commutative across arbitrary
//! orderings.

use crate::error::Result;
use crate::{Operation, OperationId, OperationKind, Timestamp, Version};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, trace};

/// Operations within this window of each other are transformed against one
/// another when their ranges overlap.
pub const TRANSFORM_WINDOW_MS: u64 = 1000;

/// The transformer's persistent state: the applied-operation log, a version
/// counter incremented once per applied operation, and the timestamp of the
/// most recent apply.
///
/// Owned exclusively by one [`Transformer`]; mutated only through
/// [`Transformer::apply`]. The log is retained forever — compaction and
/// snapshotting belong to the surrounding application, which is why the
/// state serializes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OtState {
    log: Vec<Operation>,
    version: Version,
    last_applied: Timestamp,
}

impl OtState {
    /// The applied-operation log, in apply order.
    pub fn log(&self) -> &[Operation] {
        &self.log
    }

    /// Number of operations applied so far.
    pub fn version(&self) -> Version {
        self.version
    }

    /// Timestamp of the most recently applied operation.
    pub fn last_applied(&self) -> Timestamp {
        self.last_applied
    }
}

/// Result of applying an operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyOutcome {
    /// The operation as appended, possibly transformed
    pub operation: Operation,
    /// Whether any transform adjusted the operation
    pub transformed: bool,
    /// Pending operations whose ranges overlap the incoming one
    pub conflicts: Vec<Operation>,
}

/// Transforms incoming operations against the applied log and appends them.
#[derive(Debug, Clone, Default)]
pub struct Transformer {
    state: OtState,
    pending: BTreeMap<OperationId, Operation>,
}

impl Transformer {
    /// Create a transformer with an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// The versioned state snapshot view.
    pub fn state(&self) -> &OtState {
        &self.state
    }

    /// The applied-operation log, in apply order.
    pub fn log(&self) -> &[Operation] {
        self.state.log()
    }

    /// Number of operations applied so far.
    pub fn version(&self) -> Version {
        self.state.version()
    }

    /// Register an in-flight operation for conflict reporting.
    ///
    /// Pending operations never block an apply; they only surface in
    /// [`ApplyOutcome::conflicts`] when an incoming operation overlaps them.
    pub fn add_pending(&mut self, op: Operation) {
        self.pending.insert(op.id.clone(), op);
    }

    /// Remove a pending operation once it has been reconciled.
    pub fn remove_pending(&mut self, id: &str) -> Option<Operation> {
        self.pending.remove(id)
    }

    /// Pending operations, in id order.
    pub fn pending(&self) -> impl Iterator<Item = &Operation> {
        self.pending.values()
    }

    /// Number of pending operations.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Transform `op` against every causally-prior log entry and append it.
    ///
    /// Malformed operations are rejected atomically: the log, version, and
    /// pending set are left unchanged.
    pub fn apply(&mut self, op: Operation) -> Result<ApplyOutcome> {
        op.validate()?;

        let conflicts: Vec<Operation> = self
            .pending
            .values()
            .filter(|pending| pending.id != op.id && pending.overlaps(&op))
            .cloned()
            .collect();

        let mut current = op;
        let mut transformed = false;
        for applied in &self.state.log {
            if should_transform(&current, applied) {
                trace!(op = %current.id, against = %applied.id, "transforming");
                current = transform(&current, applied);
                transformed = true;
            }
        }

        if transformed {
            debug!(
                op = %current.id,
                position = current.position,
                "operation transformed against log"
            );
        }

        self.state.last_applied = current.timestamp;
        self.state.log.push(current.clone());
        self.state.version += 1;

        Ok(ApplyOutcome {
            operation: current,
            transformed,
            conflicts,
        })
    }
}

/// Whether `incoming` must be adjusted for `applied` having already landed:
/// the two are within [`TRANSFORM_WINDOW_MS`] of each other and their ranges
/// overlap.
pub fn should_transform(incoming: &Operation, applied: &Operation) -> bool {
    incoming.timestamp.abs_diff(applied.timestamp) <= TRANSFORM_WINDOW_MS
        && incoming.overlaps(applied)
}

/// Shift or resize `op` to account for `against` having already been applied.
///
/// Returns a new operation carrying the same identity (id, author,
/// timestamp, metadata). Position and length are clamped non-negative, so
/// the range invariant holds after any transform.
pub fn transform(op: &Operation, against: &Operation) -> Operation {
    let mut out = op.clone();
    match op.kind {
        OperationKind::Insert | OperationKind::Move => transform_point(&mut out, against),
        OperationKind::Delete | OperationKind::Replace => transform_span(&mut out, against),
    }
    out.position = out.position.max(0);
    if let Some(length) = out.length {
        out.length = Some(length.max(0));
    }
    out
}

/// Position-only adjustment for operations with no resizable range
/// (insert, move).
fn transform_point(op: &mut Operation, against: &Operation) {
    match against.kind {
        OperationKind::Insert => {
            if against.position <= op.position {
                op.position += against.content_len();
            }
        }
        OperationKind::Delete => {
            if against.position < op.position {
                op.position -= against.length.unwrap_or(0);
            } else if against.position == op.position {
                // the insert lands after the already-applied delete
                op.position += against.length.unwrap_or(0);
            }
        }
        OperationKind::Replace => {
            if against.position < op.position {
                op.position += against.content_len() - against.length.unwrap_or(0);
            }
        }
        OperationKind::Move => {}
    }
}

/// Shift-and-shrink adjustment for range operations (delete, replace).
fn transform_span(op: &mut Operation, against: &Operation) {
    match against.kind {
        OperationKind::Insert => {
            if against.position <= op.position {
                op.position += against.content_len();
            } else if against.position < op.end() {
                // insert landed inside the range; shrink to the part before it
                let offset = against.position - op.position;
                op.length = op.length.map(|l| (l - offset).max(0));
            }
        }
        OperationKind::Delete | OperationKind::Replace => {
            let against_len = against.length.unwrap_or(0);
            let against_end = against.position + against_len;
            // a preceding replace shifts by its net length delta, a preceding
            // delete by its full length
            let shift = match against.kind {
                OperationKind::Replace => against.content_len() - against_len,
                _ => -against_len,
            };

            if against.position == op.position {
                // same start: left untouched, conflict resolution decides
            } else if against_end <= op.position {
                op.position += shift;
            } else if against.position < op.position {
                // head overlap: the prior edit consumed the front of this range
                let overlap = (against_end.min(op.end()) - op.position).max(0);
                op.length = op.length.map(|l| (l - overlap).max(0));
                op.position = match against.kind {
                    OperationKind::Replace => against.position + against.content_len(),
                    _ => against.position,
                };
            } else if against.position < op.end() {
                // tail overlap: shrink by the shared span
                let overlap = (op.end() - against.position).min(against_len);
                op.length = op.length.map(|l| (l - overlap).max(0));
            }
        }
        OperationKind::Move => {}
    }
}
