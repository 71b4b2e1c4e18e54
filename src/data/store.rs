//! The backing store interface.

use std::ops::Range;

use super::{AttrValue, Dimension, Values, VariableInfo};
use crate::error::Result;

/// Read access to a dataset's dimensions, variables and raw data.
///
/// Implementations decide how bytes are fetched; callers only ever ask for
/// whole rows of a variable's outer dimension.
pub trait BackingStore {
    /// All dimensions, in declaration order.
    fn dimensions(&self) -> Vec<Dimension>;

    /// All variables, in declaration order.
    fn variables(&self) -> Vec<VariableInfo>;

    /// Read the outer-dimension rows `rows` of a variable as one flat
    /// row-major buffer, inner dimensions included.
    ///
    /// A variable without dimensions accepts `0..1`.
    fn read_raw(&self, variable: &str, rows: Range<usize>) -> Result<Values>;

    /// Look up a variable by name.
    fn variable(&self, name: &str) -> Option<VariableInfo> {
        self.variables().into_iter().find(|v| v.name == name)
    }

    /// Look up an attribute of a variable.
    fn attribute(&self, variable: &str, name: &str) -> Option<AttrValue> {
        self.variable(variable)
            .and_then(|v| v.attributes.get(name).cloned())
    }

    /// The outer dimension of a variable, if it has one.
    fn first_dimension(&self, variable: &str) -> Option<Dimension> {
        self.variable(variable)
            .and_then(|v| v.dims.first().cloned())
    }

    /// Look up a dimension by name.
    fn dimension(&self, name: &str) -> Option<Dimension> {
        self.dimensions().into_iter().find(|d| d.name == name)
    }
}
