//! Schema validation errors.

use std::fmt;

/// Result type for schema operations.
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Errors that can occur when building or validating a schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// Two leaves share a name.
    DuplicateField { name: String },

    /// A leaf has an empty name.
    EmptyFieldName { index: usize },

    /// The schema declares more leaves than a field mask can carry.
    TooManyFields { count: usize, max: usize },

    /// An enum declares no variants.
    InvalidEnum { name: String },

    /// A string field has a zero length bound.
    InvalidStringBound { name: String },
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateField { name } => write!(f, "duplicate field name '{name}'"),
            Self::EmptyFieldName { index } => write!(f, "field {index} has an empty name"),
            Self::TooManyFields { count, max } => {
                write!(f, "schema has {count} fields, maximum is {max}")
            }
            Self::InvalidEnum { name } => write!(f, "enum field '{name}' has no variants"),
            Self::InvalidStringBound { name } => {
                write!(f, "string field '{name}' has a zero length bound")
            }
        }
    }
}

impl std::error::Error for SchemaError {}
