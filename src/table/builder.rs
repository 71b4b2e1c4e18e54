//! Groups dataset variables into tables.

use std::sync::Arc;

use super::join::{JoinKind, PendingJoin};
use super::{CoordAxis, Table, TableId, TableOrigin};
use crate::axis::{classify, explicit_axis};
use crate::data::{BackingStore, DataType, Dimension, VariableInfo};
use crate::error::{PointNestError, Result};

/// Build one stored table per outer dimension, then one embedded table per
/// structure or sequence member, recursively.
///
/// Returns the tables and the nested-structure joins linking embedded tables
/// to their parents.
pub(crate) fn build_tables(store: &dyn BackingStore) -> Result<(Vec<Table>, Vec<PendingJoin>)> {
    let variables = store.variables();
    let mut tables = Vec::new();

    for dim in store.dimensions() {
        let vars: Vec<&VariableInfo> = variables
            .iter()
            .filter(|v| v.first_dimension().map_or(false, |d| d.name == dim.name))
            .collect();
        if vars.is_empty() {
            continue;
        }
        let members = vars.iter().map(|v| v.row_member()).collect();
        let table = Table::new(dim.name.clone(), dim, TableOrigin::Stored, members)?;
        tracing::debug!(
            table = %table.name,
            axes = table.axes.len(),
            columns = table.columns.len(),
            "built table"
        );
        tables.push(table);
    }

    // Tables are appended while walking, so embedded tables get their own turn.
    let mut pending = Vec::new();
    let mut next = 0;
    while next < tables.len() {
        let parent = TableId(next);
        let structured: Vec<VariableInfo> = tables[next]
            .members
            .iter()
            .filter(|m| m.data_type.is_structured())
            .cloned()
            .collect();
        for field in structured {
            let name = format!("{}.{}", tables[next].name, field.name);
            let origin = TableOrigin::Embedded {
                field: field.name.clone(),
            };
            let dim = embedded_dimension(&field);
            let table = Table::new(name, dim, origin, field.members.clone())?;
            tracing::debug!(table = %table.name, "built embedded table");
            pending.push(PendingJoin {
                parent,
                child: TableId(tables.len()),
                kind: JoinKind::NestedStructure { field: field.name },
            });
            tables.push(table);
        }
        next += 1;
    }

    Ok((tables, pending))
}

/// The stored table over a dimension.
pub(crate) fn stored_table_for(tables: &[Table], dim: &str) -> Option<TableId> {
    tables
        .iter()
        .position(|t| !t.is_embedded() && t.dim.name == dim)
        .map(TableId)
}

// Sequences have no fixed length; structures span their own dimensions.
fn embedded_dimension(field: &VariableInfo) -> Dimension {
    if field.data_type == DataType::Sequence {
        return Dimension::unlimited(field.name.clone(), 0);
    }
    match field.first_dimension() {
        Some(first) => Dimension::new(first.name.clone(), field.element_count()),
        None => Dimension::new(field.name.clone(), 1),
    }
}

impl Table {
    fn new(
        name: String,
        dim: Dimension,
        origin: TableOrigin,
        members: Vec<VariableInfo>,
    ) -> Result<Self> {
        let mut axes: Vec<CoordAxis> = Vec::new();
        let mut columns = Vec::new();

        for member in &members {
            if member.data_type.is_structured() {
                continue;
            }
            let Some(axis) = classify(member) else {
                columns.push(member.clone());
                continue;
            };
            let explicit = explicit_axis(member) == Some(axis);
            if explicit {
                if let Some(first) = axes.iter().find(|a| a.axis == axis && a.explicit) {
                    return Err(PointNestError::AmbiguousAxis {
                        table: name,
                        axis: axis.to_string(),
                        first: first.variable.name.clone(),
                        second: member.name.clone(),
                    });
                }
            }
            axes.push(CoordAxis {
                axis,
                variable: member.clone(),
                explicit,
            });
        }

        Ok(Self {
            name,
            dim,
            origin,
            axes,
            columns,
            members: Arc::from(members),
            markers: Vec::new(),
            parent: None,
            join: None,
            children: Vec::new(),
        })
    }
}
