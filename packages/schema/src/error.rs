use thiserror::Error;

pub type SchemaResult<T> = Result<T, SchemaError>;

#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("Unknown type: {0}")]
    UnknownType(String),

    #[error("Type {type_name} has no field '{field}'")]
    UnknownField { type_name: String, field: String },

    #[error("Class {class} extends unknown parent {parent}")]
    UnknownParent { class: String, parent: String },

    #[error("Class defined twice: {0}")]
    DuplicateClass(String),

    #[error("Inheritance cycle through {0}")]
    InheritanceCycle(String),

    #[error("Cannot instantiate abstract type {0}")]
    AbstractType(String),

    #[error("Invalid catalog JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SchemaError {
    pub fn unknown_field(type_name: impl Into<String>, field: impl Into<String>) -> Self {
        Self::UnknownField {
            type_name: type_name.into(),
            field: field.into(),
        }
    }
}
