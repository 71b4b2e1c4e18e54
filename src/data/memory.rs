//! In-memory backing store.

use std::ops::Range;

use super::{BackingStore, Dimension, Values, VariableInfo};
use crate::error::{PointNestError, Result};

/// A backing store holding every variable in memory.
///
/// Useful for building datasets by hand and for data that has already been
/// decoded, including structure and sequence variables that netCDF classic
/// files cannot express.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    dimensions: Vec<Dimension>,
    variables: Vec<(VariableInfo, Values)>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a dimension, replacing any dimension with the same name.
    pub fn add_dimension(&mut self, dim: Dimension) -> &mut Self {
        match self.dimensions.iter_mut().find(|d| d.name == dim.name) {
            Some(existing) => *existing = dim,
            None => self.dimensions.push(dim),
        }
        self
    }

    /// Add a variable with its data in row-major order.
    ///
    /// Every dimension of the variable must already be registered, and the
    /// data must match the variable's type and element count.
    pub fn add_variable(&mut self, info: VariableInfo, values: Values) -> Result<&mut Self> {
        for dim in &info.dims {
            match self.dimensions.iter().find(|d| d.name == dim.name) {
                Some(known) if known.len == dim.len => {},
                Some(known) => {
                    return Err(PointNestError::InvalidData {
                        name: info.name.clone(),
                        reason: format!(
                            "dimension '{}' has length {}, variable expects {}",
                            dim.name, known.len, dim.len
                        ),
                    })
                },
                None => return Err(PointNestError::dimension_not_found(&dim.name)),
            }
        }

        if info.data_type != values.data_type() {
            return Err(PointNestError::InvalidData {
                name: info.name.clone(),
                reason: format!(
                    "declared {} but given {} values",
                    info.data_type,
                    values.data_type()
                ),
            });
        }

        let expected = info.element_count();
        if values.len() != expected {
            return Err(PointNestError::InvalidData {
                name: info.name.clone(),
                reason: format!("expected {} values, given {}", expected, values.len()),
            });
        }

        self.variables.retain(|(v, _)| v.name != info.name);
        self.variables.push((info, values));
        Ok(self)
    }

    fn entry(&self, name: &str) -> Result<&(VariableInfo, Values)> {
        self.variables
            .iter()
            .find(|(v, _)| v.name == name)
            .ok_or_else(|| PointNestError::variable_not_found(name))
    }
}

impl BackingStore for MemoryStore {
    fn dimensions(&self) -> Vec<Dimension> {
        self.dimensions.clone()
    }

    fn variables(&self) -> Vec<VariableInfo> {
        self.variables.iter().map(|(v, _)| v.clone()).collect()
    }

    fn variable(&self, name: &str) -> Option<VariableInfo> {
        self.entry(name).ok().map(|(v, _)| v.clone())
    }

    fn read_raw(&self, variable: &str, rows: Range<usize>) -> Result<Values> {
        let (info, values) = self.entry(variable)?;
        let outer_len = info.dims.first().map_or(1, |d| d.len);
        if rows.start > rows.end || rows.end > outer_len {
            let bad = if rows.start > rows.end { rows.start } else { rows.end - 1 };
            return Err(PointNestError::out_of_bounds(variable, bad, outer_len));
        }
        let row_len: usize = info.dims.iter().skip(1).map(|d| d.len).product();
        tracing::trace!(variable, start = rows.start, end = rows.end, "memory read");
        values.slice(rows.start * row_len..rows.end * row_len)
    }
}
