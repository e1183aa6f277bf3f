//! Error types for loading and indexing decision tables

use crate::model::{ColumnId, PatternId};
use thiserror::Error;

/// Contract violations found while indexing a table.
///
/// Every variant means the model is inconsistent; no fact is produced for the
/// offending column.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IndexError {
    /// A condition column has no owning pattern in the table.
    #[error("Condition column '{label}' ({column}) is not owned by any pattern")]
    UnboundCondition { column: ColumnId, label: String },

    /// The condition section refers to a pattern the table does not hold.
    #[error("Condition section refers to pattern {pattern}, which the table does not hold")]
    UnknownPattern { pattern: PatternId },

    /// A set-field action refers to a name no pattern binds.
    #[error("Action column '{column}' sets a field on '{bound_name}', but no pattern binds that name")]
    UnboundAction { column: String, bound_name: String },
}

/// Errors building or loading a table model.
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unknown pattern {0}")]
    UnknownPattern(PatternId),

    #[error("Unknown condition column {0}")]
    UnknownColumn(ColumnId),
}
