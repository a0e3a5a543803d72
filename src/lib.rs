//! # Coedit Engine
//!
//! An operational transformation (OT) and conflict resolution engine for
//! concurrent, multi-party edits against a shared linear edit space.
//!
//! The engine is domain-agnostic: it reasons purely about position-addressed
//! operations. The surrounding application delivers well-formed [`Operation`]
//! values over its own transport and consumes the transformed operations and
//! conflict resolutions this crate produces. Transport, persistence, and UI
//! live outside this crate.
//!
//! ## Design Principles
//!
//! - **No IO**: the engine has no knowledge of files, network, or platform
//! - **Deterministic**: the same operations applied in the same order always
//!   produce the same log and version
//! - **Single writer**: each [`Transformer`] / [`ConflictResolver`] instance
//!   is owned by one logical editing session; callers needing multi-threaded
//!   access must serialize calls themselves
//!
//! ## Core Concepts
//!
//! ### Operations
//!
//! Changes are expressed as immutable [`Operation`] values: a kind
//! (insert/delete/replace/move), a position, an optional content payload or
//! affected length, an author, and a timestamp. Transforms never mutate an
//! operation; they produce a new value with adjusted position/length carrying
//! the same identity.
//!
//! ### Transformation
//!
//! The [`Transformer`] keeps an append-only log and a version counter. Each
//! incoming operation is transformed against every causally-prior log entry
//! it overlaps with (within a short time window), then appended. All parties
//! applying the same operations in the same order converge on the same state.
//!
//! ### Conflicts
//!
//! The [`ConflictDetector`] partitions an operation batch into groups of
//! spatially-overlapping, temporally-close operations from different authors,
//! and classifies each group's kind and severity. The [`ConflictResolver`]
//! closes detected conflicts with a [`ResolutionStrategy`] and keeps an
//! append-only audit history of [`ConflictResolution`] records.
//!
//! ## Quick Start
//!
//! ```rust
//! use coedit_engine::{Operation, Transformer};
//!
//! let mut transformer = Transformer::new();
//!
//! let first = Operation::insert(5, "XY", "alice").with_timestamp(0);
//! transformer.apply(first).unwrap();
//!
//! // A concurrent insert at the same position lands after the first one.
//! let second = Operation::insert(5, "Z", "bob").with_timestamp(10);
//! let outcome = transformer.apply(second).unwrap();
//!
//! assert!(outcome.transformed);
//! assert_eq!(outcome.operation.position, 7);
//! assert_eq!(transformer.version(), 2);
//! ```

pub mod detect;
pub mod error;
pub mod merge;
pub mod operation;
pub mod resolve;
pub mod transform;

// Re-export main types at crate root
pub use detect::{
    AffectedRange, Conflict, ConflictDetector, ConflictKind, Severity, CONFLICT_WINDOW_MS,
};
pub use error::Error;
pub use merge::{can_merge, merge_operations, MERGE_WINDOW_MS};
pub use operation::{MetadataValue, Operation, OperationKind};
pub use resolve::{
    ConflictResolution, ConflictResolver, ResolutionRequest, ResolutionStrategy, AUTO_RESOLVER,
};
pub use transform::{
    should_transform, transform, ApplyOutcome, OtState, Transformer, TRANSFORM_WINDOW_MS,
};

/// Type aliases for clarity
pub type OperationId = String;
pub type ConflictId = String;
pub type AuthorId = String;
pub type Timestamp = u64;
pub type Position = i64;
pub type Span = i64;
pub type Version = u64;
