//! Error types for pointnest.
//!
//! This module provides a unified error handling approach using `thiserror`.
//! Every error belongs to one [`ErrorKind`] so callers can decide whether to
//! retry a read with different arguments or abandon the dataset.

use thiserror::Error;

/// Result type alias for pointnest operations.
pub type Result<T> = std::result::Result<T, PointNestError>;

/// Which part of the system an error came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The dataset layout cannot be resolved. Fatal for the whole graph.
    Structural,
    /// An operation was used on the wrong kind of cursor or relationship.
    Schema,
    /// An index or slice fell outside the data.
    Bounds,
    /// The backing store or a configuration source failed.
    Backing,
}

/// Errors that can occur in pointnest.
#[derive(Debug, Error)]
pub enum PointNestError {
    /// A table would receive a second parent.
    #[error("Table '{table}' has multiple parents: '{existing}' and '{requested}'")]
    MultipleParents {
        table: String,
        existing: String,
        requested: String,
    },

    /// A dimension named by a convention or marker variable is unknown.
    #[error("Dimension not found: {name}")]
    DimensionNotFound { name: String },

    /// More than one variable is explicitly tagged with the same axis in one table.
    #[error("Table '{table}' has more than one {axis} axis: '{first}' and '{second}'")]
    AmbiguousAxis {
        table: String,
        axis: String,
        first: String,
        second: String,
    },

    /// A marker variable has no dimension, so no table can own it.
    #[error("Marker variable '{variable}' has no dimension")]
    MarkerNotDimensioned { variable: String },

    /// Linking a join would make a table its own ancestor.
    #[error("Join from '{parent}' to '{child}' would create a cycle")]
    CyclicJoin { parent: String, child: String },

    /// A nested table chain is deeper than any known feature type.
    #[error("Cannot classify table '{table}' with nesting depth {depth}")]
    UnclassifiedDepth { table: String, depth: usize },

    /// A linked list holds a negative link other than the terminator.
    #[error("Invalid link value {value} in '{variable}'")]
    InvalidLink { variable: String, value: i64 },

    /// A linked list visits more rows than the child table holds.
    #[error("Linked list through '{variable}' does not terminate after {steps} rows")]
    LinkCycle { variable: String, steps: usize },

    /// A container operation was called on an atomic cursor.
    #[error("'{name}' is not a container")]
    NotAContainer { name: String },

    /// No join connects the cursor's table to the requested child.
    #[error("'{child}' is not a collection of '{parent}'")]
    NotACollection { parent: String, child: String },

    /// A row has no field with the given name or index.
    #[error("Field not found: {name}")]
    FieldNotFound { name: String },

    /// An embedded table can only be read through a parent row.
    #[error("Table '{table}' is embedded and needs a parent row")]
    EmbeddedWithoutParent { table: String },

    /// A value could not be read as the requested type.
    #[error("'{name}' holds {found} values, expected {expected}")]
    TypeMismatch {
        name: String,
        expected: String,
        found: String,
    },

    /// An index fell outside `[0, len)`.
    #[error("Index {index} out of bounds for '{name}' with length {len}")]
    IndexOutOfBounds {
        name: String,
        index: usize,
        len: usize,
    },

    /// A slice list does not match the rank of the data.
    #[error("'{name}' has rank {rank} but {given} slices were given")]
    RankMismatch {
        name: String,
        rank: usize,
        given: usize,
    },

    /// A slice is malformed.
    #[error("Invalid slice: {0}")]
    InvalidSlice(String),

    /// Variable not present in the backing store.
    #[error("Variable not found: {name}")]
    VariableNotFound { name: String },

    /// Data handed to a store does not match its description.
    #[error("Invalid data for '{name}': {reason}")]
    InvalidData { name: String, reason: String },

    /// Failed to read NetCDF file.
    #[error("NetCDF error: {0}")]
    NetCdf(String),

    /// Convention configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PointNestError {
    /// The taxonomy bucket this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MultipleParents { .. }
            | Self::DimensionNotFound { .. }
            | Self::AmbiguousAxis { .. }
            | Self::MarkerNotDimensioned { .. }
            | Self::CyclicJoin { .. }
            | Self::UnclassifiedDepth { .. }
            | Self::InvalidLink { .. }
            | Self::LinkCycle { .. } => ErrorKind::Structural,
            Self::NotAContainer { .. }
            | Self::NotACollection { .. }
            | Self::FieldNotFound { .. }
            | Self::EmbeddedWithoutParent { .. }
            | Self::TypeMismatch { .. } => ErrorKind::Schema,
            Self::IndexOutOfBounds { .. } | Self::RankMismatch { .. } | Self::InvalidSlice(_) => {
                ErrorKind::Bounds
            },
            Self::VariableNotFound { .. }
            | Self::InvalidData { .. }
            | Self::NetCdf(_)
            | Self::Config(_)
            | Self::Io(_) => {
                ErrorKind::Backing
            },
        }
    }

    /// Create a DimensionNotFound error.
    pub fn dimension_not_found(name: impl Into<String>) -> Self {
        Self::DimensionNotFound { name: name.into() }
    }

    /// Create a VariableNotFound error.
    pub fn variable_not_found(name: impl Into<String>) -> Self {
        Self::VariableNotFound { name: name.into() }
    }

    /// Create a FieldNotFound error.
    pub fn field_not_found(name: impl Into<String>) -> Self {
        Self::FieldNotFound { name: name.into() }
    }

    /// Create a NotAContainer error.
    pub fn not_a_container(name: impl Into<String>) -> Self {
        Self::NotAContainer { name: name.into() }
    }

    /// Create an IndexOutOfBounds error.
    pub fn out_of_bounds(name: impl Into<String>, index: usize, len: usize) -> Self {
        Self::IndexOutOfBounds {
            name: name.into(),
            index,
            len,
        }
    }
}

impl From<netcdf::Error> for PointNestError {
    fn from(err: netcdf::Error) -> Self {
        Self::NetCdf(err.to_string())
    }
}

impl From<toml::de::Error> for PointNestError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(err.to_string())
    }
}
