//! Error types for schema evolution.
//!
//! Planning errors (`ChainIntegrity`, `UnknownMarker`, `UnknownRevision`,
//! `InvalidTarget`, `NotReversible`, `UnsupportedOperation`) are raised before
//! any statement runs. `ActionExecution` is raised per step and aborts the rest
//! of the plan; the store is left at the last revision whose marker advanced.

use thiserror::Error;

use crate::chain::Direction;

/// Failures reported by a [`StoreDriver`](crate::store::StoreDriver).
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("{0}")]
    Driver(#[source] Box<dyn std::error::Error + Send + Sync + 'static>),

    #[error("version table {table} holds {rows} rows; expected at most one")]
    CorruptMarker { table: String, rows: usize },

    #[error("advisory lock {0} could not be acquired")]
    LockUnavailable(String),

    #[error("{0}")]
    Other(String),
}

impl StoreError {
    pub fn driver(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        StoreError::Driver(Box::new(err))
    }
}

/// The revision set does not form a single linear chain.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChainIntegrityError {
    #[error("revision id {0} is declared more than once")]
    DuplicateRevision(String),

    #[error("revisions {} all declare down_revision {parent}", children.join(", "))]
    Fork {
        parent: String,
        children: Vec<String>,
    },

    #[error("multiple root revisions: {}", .0.join(", "))]
    MultipleRoots(Vec<String>),

    #[error("revision {revision} points at unknown down_revision {down_revision}")]
    Dangling {
        revision: String,
        down_revision: String,
    },

    #[error("no root revision: every revision declares a down_revision")]
    NoRoot,

    #[error("revisions unreachable from the root (cycle): {}", .0.join(", "))]
    Cycle(Vec<String>),
}

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("chain integrity: {0}")]
    ChainIntegrity(#[from] ChainIntegrityError),

    #[error("marker {marker} does not match any revision in the chain; stamp a known revision")]
    UnknownMarker { marker: String },

    #[error("unknown revision: {0}")]
    UnknownRevision(String),

    #[error("invalid target {target}: {reason}")]
    InvalidTarget { target: String, reason: String },

    #[error("revision {0} is not reversible")]
    NotReversible(String),

    #[error("revision {revision} expects marker {expected}, found {found}")]
    MarkerMismatch {
        revision: String,
        expected: String,
        found: String,
    },

    #[error("revision {revision}: {operation} is not supported on {dialect}")]
    UnsupportedOperation {
        revision: String,
        operation: String,
        dialect: &'static str,
    },

    #[error("{direction} of {revision} failed: {error}{}", completed_suffix(.completed))]
    ActionExecution {
        revision: String,
        direction: Direction,
        error: String,
        /// Revisions that finished before the failure, in execution order.
        completed: Vec<String>,
    },

    #[error("store: {0}")]
    Store(#[from] StoreError),
}

fn completed_suffix(completed: &[String]) -> String {
    if completed.is_empty() {
        String::new()
    } else {
        format!(" (completed: {})", completed.join(", "))
    }
}

/// Renders a marker for messages; the absent marker reads as `<base>`.
pub(crate) fn marker_label(marker: Option<&str>) -> String {
    marker.unwrap_or("<base>").to_string()
}

impl EngineError {
    /// Process exit code for the CLI.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            EngineError::Store(_) => 2,
            EngineError::ChainIntegrity(_) => 3,
            EngineError::UnknownMarker { .. }
            | EngineError::UnknownRevision(_)
            | EngineError::InvalidTarget { .. }
            | EngineError::MarkerMismatch { .. } => 4,
            EngineError::ActionExecution { .. } => 5,
            EngineError::NotReversible(_) | EngineError::UnsupportedOperation { .. } => 1,
        }
    }
}
