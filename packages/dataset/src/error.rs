use thiserror::Error;

use crate::dataset::EntryId;

pub type DatasetResult<T> = Result<T, DatasetError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DatasetError {
    #[error("Unknown declaration: {0}")]
    UnknownDeclaration(String),

    #[error("Identifier already declared: {0}")]
    DuplicateDeclaration(String),

    #[error("Entry not found in dataset")]
    EntryNotFound,

    #[error("Entry {0:?} no longer exists")]
    StaleEntry(EntryId),

    #[error("Entry index {index} out of range (len {len})")]
    EntryIndexOutOfRange { index: usize, len: usize },

    #[error("Declared object must be an object value, got {0}")]
    NotAnObject(&'static str),
}

impl DatasetError {
    pub fn out_of_range(index: usize, len: usize) -> Self {
        Self::EntryIndexOutOfRange { index, len }
    }
}
