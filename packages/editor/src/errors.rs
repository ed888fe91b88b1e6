//! Error types for the editor

use thiserror::Error;
use triogui_dataset::DatasetError;
use triogui_schema::SchemaError;

use crate::path::PathError;

pub type EditorResult<T> = Result<T, EditorError>;

#[derive(Error, Debug)]
pub enum EditorError {
    #[error("Path error: {0}")]
    Path(#[from] PathError),

    #[error("Dataset error: {0}")]
    Dataset(#[from] DatasetError),

    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    /// Text typed into a numeric field did not parse
    #[error("Cannot read '{input}' as {expected}")]
    MalformedScalarInput { input: String, expected: &'static str },

    #[error("Registry out of sync: {0}")]
    InvalidRegistrySync(#[from] SyncViolation),

    #[error("Action {action} is not available on a {mode} node")]
    ActionNotAvailable {
        action: &'static str,
        mode: &'static str,
    },

    #[error("{value} is not one of the types allowed for {base}")]
    UnknownChoice { value: String, base: String },

    #[error("No anchor {0} in the dataset")]
    UnknownAnchor(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl EditorError {
    pub fn malformed(input: impl Into<String>, expected: &'static str) -> Self {
        Self::MalformedScalarInput {
            input: input.into(),
            expected,
        }
    }

    pub fn not_available(action: &'static str, mode: &'static str) -> Self {
        Self::ActionNotAvailable { action, mode }
    }
}

/// Precondition failures of registry and association transitions
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SyncViolation {
    #[error("no {kind} at index {index}")]
    NoSuchEntity { kind: &'static str, index: usize },

    #[error("identifier '{0}' is already declared")]
    DuplicateIdentifier(String),

    #[error("{kind} at index {index} is not declared")]
    NotDeclared { kind: &'static str, index: usize },

    #[error("type {0} has no explicit read form")]
    ExplicitEntryUnsupported(String),

    #[error("type {type_name} does not belong to {kind}")]
    TypeOutsideKind {
        kind: &'static str,
        type_name: String,
    },

    #[error("{kind} type is fixed to {fixed}")]
    FixedType {
        kind: &'static str,
        fixed: String,
    },

    #[error("the document no longer holds the entry for {0}")]
    MissingEntry(String),
}
