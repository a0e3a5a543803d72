//! Conflict resolution strategies and the resolution audit history.
//!
//! The resolver owns the active conflict set. Resolving a conflict is
//! atomic from the caller's perspective: the conflict leaves the active set
//! and exactly one [`ConflictResolution`] record lands in the append-only
//! history. The history is never mutated or pruned.

use crate::merge::merge_operations;
use crate::operation::now_ms;
use crate::{
    AuthorId, Conflict, ConflictDetector, ConflictId, Operation, OperationId, Timestamp,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Resolver identity recorded for automatic resolutions.
pub const AUTO_RESOLVER: &str = "auto";

/// The policy used to collapse a conflict into an accepted operation set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ResolutionStrategy {
    /// Members ordered newest first; the caller treats order as priority
    LastWriteWins,
    /// Members ordered oldest first
    FirstWriteWins,
    /// Exactly the caller-selected members survive
    Manual,
    /// Adjacent same-author chains are merged into equivalent operations
    AutomaticMerge,
}

/// Caller input to a resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionRequest {
    pub strategy: ResolutionStrategy,
    /// Member ids to keep under [`ResolutionStrategy::Manual`]; ids that are
    /// not members of the conflict are silently dropped
    #[serde(default)]
    pub selected_operation_ids: Vec<OperationId>,
    /// Opaque payload the caller wants recorded alongside the resolution
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_resolution: Option<serde_json::Value>,
    /// Who decided
    pub resolved_by: AuthorId,
}

impl ResolutionRequest {
    /// A request with no manual selection and no custom payload.
    pub fn new(strategy: ResolutionStrategy, resolved_by: impl Into<AuthorId>) -> Self {
        Self {
            strategy,
            selected_operation_ids: Vec::new(),
            custom_resolution: None,
            resolved_by: resolved_by.into(),
        }
    }

    /// A manual-selection request.
    pub fn manual(
        selected_operation_ids: Vec<OperationId>,
        resolved_by: impl Into<AuthorId>,
    ) -> Self {
        Self {
            strategy: ResolutionStrategy::Manual,
            selected_operation_ids,
            custom_resolution: None,
            resolved_by: resolved_by.into(),
        }
    }

    /// Attach a custom payload.
    pub fn with_custom(mut self, custom: serde_json::Value) -> Self {
        self.custom_resolution = Some(custom);
        self
    }
}

/// Permanent record of how a conflict was closed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictResolution {
    pub conflict_id: ConflictId,
    pub strategy: ResolutionStrategy,
    /// Ids of the effective operation set, in priority order
    pub selected_operation_ids: Vec<OperationId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_resolution: Option<serde_json::Value>,
    pub resolved_at: Timestamp,
    pub resolved_by: AuthorId,
    /// The reduced operation set the strategy produced
    pub operations: Vec<Operation>,
}

/// Applies resolution strategies to detected conflicts.
#[derive(Debug, Clone)]
pub struct ConflictResolver {
    detector: ConflictDetector,
    active: Vec<Conflict>,
    history: Vec<ConflictResolution>,
}

impl ConflictResolver {
    /// Create a resolver around a detector.
    pub fn new(detector: ConflictDetector) -> Self {
        Self {
            detector,
            active: Vec::new(),
            history: Vec::new(),
        }
    }

    /// The detector this resolver scans with.
    pub fn detector(&self) -> &ConflictDetector {
        &self.detector
    }

    /// Detect conflicts in a batch and track the new ones.
    ///
    /// Groups whose member set matches an already-active conflict are
    /// skipped, so re-scanning the same batch does not double-track. Returns
    /// the number of newly tracked conflicts.
    pub fn scan(&mut self, ops: &[Operation]) -> usize {
        let mut added = 0;
        for conflict in self.detector.detect(ops) {
            if self.active.iter().any(|c| same_members(c, &conflict)) {
                continue;
            }
            self.active.push(conflict);
            added += 1;
        }
        added
    }

    /// Track a conflict detected elsewhere.
    pub fn track(&mut self, conflict: Conflict) {
        if !self.active.iter().any(|c| same_members(c, &conflict)) {
            self.active.push(conflict);
        }
    }

    /// Conflicts awaiting resolution, in detection order.
    pub fn active_conflicts(&self) -> &[Conflict] {
        &self.active
    }

    /// Look up an active conflict by id.
    pub fn get_conflict(&self, id: &str) -> Option<&Conflict> {
        self.active.iter().find(|c| c.id == id)
    }

    /// The append-only resolution history.
    pub fn history(&self) -> &[ConflictResolution] {
        &self.history
    }

    /// Apply a strategy to an active conflict.
    ///
    /// Returns `false` without side effects when the id is unknown — the
    /// conflict may already have been resolved elsewhere, which callers
    /// should treat as a no-op, not a failure.
    pub fn resolve(&mut self, conflict_id: &str, request: ResolutionRequest) -> bool {
        let Some(index) = self.active.iter().position(|c| c.id == conflict_id) else {
            return false;
        };
        let conflict = self.active.remove(index);
        let operations = effective_operations(&conflict, &request);
        debug!(
            conflict = %conflict.id,
            strategy = ?request.strategy,
            kept = operations.len(),
            "conflict resolved"
        );
        self.history.push(ConflictResolution {
            conflict_id: conflict.id,
            strategy: request.strategy,
            selected_operation_ids: operations.iter().map(|o| o.id.clone()).collect(),
            custom_resolution: request.custom_resolution,
            resolved_at: now_ms(),
            resolved_by: request.resolved_by,
            operations,
        });
        true
    }

    /// Resolve every active conflict with one strategy. Returns how many
    /// were resolved.
    pub fn resolve_all(
        &mut self,
        strategy: ResolutionStrategy,
        resolved_by: impl Into<AuthorId>,
    ) -> usize {
        let resolved_by = resolved_by.into();
        let ids: Vec<ConflictId> = self.active.iter().map(|c| c.id.clone()).collect();
        ids.into_iter()
            .filter(|id| self.resolve(id, ResolutionRequest::new(strategy, resolved_by.clone())))
            .count()
    }

    /// Resolve every active conflict a given author participates in,
    /// recording that author as the resolver. Returns how many were
    /// resolved.
    pub fn resolve_for_author(&mut self, author: &str, strategy: ResolutionStrategy) -> usize {
        let ids: Vec<ConflictId> = self
            .active
            .iter()
            .filter(|c| c.participants.iter().any(|p| p == author))
            .map(|c| c.id.clone())
            .collect();
        ids.into_iter()
            .filter(|id| self.resolve(id, ResolutionRequest::new(strategy, author)))
            .count()
    }

    /// Resolve every auto-resolvable conflict by automatic merge, leaving
    /// the rest for a human decision. Returns how many were resolved.
    pub fn auto_resolve(&mut self) -> usize {
        let ids: Vec<ConflictId> = self
            .active
            .iter()
            .filter(|c| c.auto_resolvable)
            .map(|c| c.id.clone())
            .collect();
        ids.into_iter()
            .filter(|id| {
                self.resolve(
                    id,
                    ResolutionRequest::new(ResolutionStrategy::AutomaticMerge, AUTO_RESOLVER),
                )
            })
            .count()
    }
}

fn same_members(a: &Conflict, b: &Conflict) -> bool {
    a.operations.len() == b.operations.len()
        && a.operations
            .iter()
            .all(|op| b.operations.iter().any(|other| other.id == op.id))
}

fn effective_operations(conflict: &Conflict, request: &ResolutionRequest) -> Vec<Operation> {
    match request.strategy {
        ResolutionStrategy::LastWriteWins => {
            let mut ops = conflict.operations.clone();
            ops.sort_by(|a, b| {
                b.timestamp
                    .cmp(&a.timestamp)
                    .then_with(|| a.id.cmp(&b.id))
            });
            ops
        }
        ResolutionStrategy::FirstWriteWins => {
            let mut ops = conflict.operations.clone();
            ops.sort_by(|a, b| {
                a.timestamp
                    .cmp(&b.timestamp)
                    .then_with(|| a.id.cmp(&b.id))
            });
            ops
        }
        ResolutionStrategy::Manual => conflict
            .operations
            .iter()
            .filter(|op| request.selected_operation_ids.contains(&op.id))
            .cloned()
            .collect(),
        ResolutionStrategy::AutomaticMerge => merge_operations(conflict.operations.clone()),
    }
}
