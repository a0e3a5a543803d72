//! Conflict detection: partitioning operation batches into conflict groups.
//!
//! Two operations conflict when they come from different authors, land
//! within [`CONFLICT_WINDOW_MS`] of each other, and their ranges spatially
//! overlap. Detection is symmetric and O(n²) in the batch size; callers
//! should bound batch size rather than scanning an unbounded log.

use crate::{AuthorId, ConflictId, Operation, Position, Timestamp};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Operations from different authors within this window of each other are
/// conflict candidates.
pub const CONFLICT_WINDOW_MS: u64 = 5000;

/// How the members of a conflict group relate to each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConflictKind {
    /// Members' ranges overlap but their kinds differ
    Overlap,
    /// All members perform the same kind of edit
    Concurrent,
    /// Some member starts exactly where an earlier one ends
    Dependency,
    /// None of the above; needs human judgement
    Semantic,
}

/// How disruptive a conflict group is, derived from participant count and
/// the time span its members cover.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

/// Min/max extent across a conflict's members.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AffectedRange {
    pub start: Position,
    pub end: Position,
}

/// A detected group of mutually conflicting operations.
///
/// Conflicts are ephemeral: created on detection, removed on resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conflict {
    pub id: ConflictId,
    /// Member operations, in batch order
    pub operations: Vec<Operation>,
    pub severity: Severity,
    pub kind: ConflictKind,
    pub affected_range: AffectedRange,
    /// Distinct authors involved, in first-seen order
    pub participants: Vec<AuthorId>,
    /// Timestamp of the latest member
    pub timestamp: Timestamp,
    /// Whether the resolver may close this group without a human decision
    pub auto_resolvable: bool,
}

/// Scans operation batches for conflicting groups.
#[derive(Debug, Clone)]
pub struct ConflictDetector {
    window_ms: u64,
}

impl Default for ConflictDetector {
    fn default() -> Self {
        Self {
            window_ms: CONFLICT_WINDOW_MS,
        }
    }
}

impl ConflictDetector {
    /// Create a detector with the default conflict window.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a detector with a custom conflict window.
    pub fn with_window(window_ms: u64) -> Self {
        Self { window_ms }
    }

    /// Whether two operations pairwise conflict: different authors, within
    /// the time window, spatially overlapping. Symmetric.
    pub fn in_conflict(&self, a: &Operation, b: &Operation) -> bool {
        a.author != b.author
            && a.timestamp.abs_diff(b.timestamp) <= self.window_ms
            && a.overlaps(b)
    }

    /// Partition a batch into conflict groups.
    ///
    /// Grouping is single-pass: each unprocessed operation seeds a group
    /// containing every later unprocessed operation it pairwise conflicts
    /// with. Groups are stars around their seed, not full connected
    /// components, which keeps detection O(n²) without union-find. Every
    /// operation lands in at most one group.
    pub fn detect(&self, ops: &[Operation]) -> Vec<Conflict> {
        let mut processed = vec![false; ops.len()];
        let mut conflicts = Vec::new();

        for i in 0..ops.len() {
            if processed[i] {
                continue;
            }
            let mut members = vec![i];
            for j in (i + 1)..ops.len() {
                if !processed[j] && self.in_conflict(&ops[i], &ops[j]) {
                    members.push(j);
                }
            }
            if members.len() < 2 {
                continue;
            }
            for &m in &members {
                processed[m] = true;
            }
            let group: Vec<Operation> = members.iter().map(|&m| ops[m].clone()).collect();
            let conflict = build_conflict(group);
            debug!(
                conflict = %conflict.id,
                members = conflict.operations.len(),
                kind = ?conflict.kind,
                severity = ?conflict.severity,
                "conflict detected"
            );
            conflicts.push(conflict);
        }
        conflicts
    }
}

fn build_conflict(operations: Vec<Operation>) -> Conflict {
    let kind = classify_kind(&operations);
    let severity = classify_severity(&operations);

    let start = operations.iter().map(|o| o.position).min().unwrap_or(0);
    let end = operations.iter().map(|o| o.end()).max().unwrap_or(0);

    let mut participants: Vec<AuthorId> = Vec::new();
    for op in &operations {
        if !participants.contains(&op.author) {
            participants.push(op.author.clone());
        }
    }

    let timestamp = operations.iter().map(|o| o.timestamp).max().unwrap_or(0);

    Conflict {
        id: uuid::Uuid::new_v4().to_string(),
        auto_resolvable: matches!(kind, ConflictKind::Concurrent | ConflictKind::Dependency),
        operations,
        severity,
        kind,
        affected_range: AffectedRange { start, end },
        participants,
        timestamp,
    }
}

fn classify_kind(ops: &[Operation]) -> ConflictKind {
    let first = ops[0].kind;
    if ops.iter().all(|o| o.kind == first) {
        return ConflictKind::Concurrent;
    }

    let any_overlap = ops
        .iter()
        .enumerate()
        .any(|(i, a)| ops.iter().skip(i + 1).any(|b| a.overlaps(b)));
    if any_overlap {
        return ConflictKind::Overlap;
    }

    let mut by_time: Vec<&Operation> = ops.iter().collect();
    by_time.sort_by_key(|o| o.timestamp);
    if by_time.windows(2).any(|w| w[1].position == w[0].end()) {
        return ConflictKind::Dependency;
    }

    ConflictKind::Semantic
}

fn classify_severity(ops: &[Operation]) -> Severity {
    let mut authors: Vec<&AuthorId> = ops.iter().map(|o| &o.author).collect();
    authors.sort();
    authors.dedup();
    let participant_count = authors.len();

    let newest = ops.iter().map(|o| o.timestamp).max().unwrap_or(0);
    let oldest = ops.iter().map(|o| o.timestamp).min().unwrap_or(0);
    let time_span = newest - oldest;

    if participant_count >= 4 || time_span > 10_000 {
        Severity::Critical
    } else if participant_count >= 3 || time_span > 5_000 {
        Severity::High
    } else if participant_count >= 2 || time_span > 2_000 {
        Severity::Medium
    } else {
        Severity::Low
    }
}
