//! Walking the child rows of one parent row.

use std::fmt;
use std::sync::Arc;

use super::{DataCursor, RowSource};
use crate::data::{BackingStore, StructData};
use crate::error::{PointNestError, Result};
use crate::odometer::{Odometer, Slice};
use crate::table::{JoinId, JoinKind, TableGraph, TableId, LINK_SENTINEL};

enum Walk {
    /// A contiguous block of stored rows.
    Range(Odometer),
    /// Stored rows listed up front.
    Listed(std::vec::IntoIter<usize>),
    /// Stored rows chained through a link variable.
    Linked {
        variable: String,
        next: i64,
        steps: usize,
    },
    /// Rows decoded from a parent field.
    Embedded { rows: Arc<[StructData]>, next: usize },
}

/// Iterator over the child rows of one parent row, as single-row cursors.
///
/// Linked lists are followed one row at a time. The iterator ends after the
/// first error.
pub struct ChildRows<'a> {
    graph: &'a TableGraph,
    store: &'a dyn BackingStore,
    table: TableId,
    walk: Walk,
    done: bool,
}

impl fmt::Debug for ChildRows<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let walk = match &self.walk {
            Walk::Range(_) => "range",
            Walk::Listed(_) => "listed",
            Walk::Linked { .. } => "linked",
            Walk::Embedded { .. } => "embedded",
        };
        f.debug_struct("ChildRows")
            .field("table", &self.table)
            .field("walk", &walk)
            .field("done", &self.done)
            .finish()
    }
}

impl<'a> ChildRows<'a> {
    /// Every row of a stored table.
    pub fn all(graph: &'a TableGraph, store: &'a dyn BackingStore, table: TableId) -> Result<Self> {
        let t = graph.table(table);
        if t.is_embedded() {
            return Err(PointNestError::EmbeddedWithoutParent {
                table: t.name().to_string(),
            });
        }
        let rows = Odometer::new(vec![Slice::full(t.len())])?;
        Ok(Self::new(graph, store, table, Walk::Range(rows)))
    }

    fn new(graph: &'a TableGraph, store: &'a dyn BackingStore, table: TableId, walk: Walk) -> Self {
        Self {
            graph,
            store,
            table,
            walk,
            done: false,
        }
    }

    /// The child rows of `parent` through `join`.
    pub(super) fn for_row(parent: &DataCursor<'a>, join: JoinId) -> Result<Self> {
        let graph = parent.graph;
        let join = graph.join(join);
        let child = join.child();
        let child_len = graph.table(child).len();
        let row = parent.row()?;

        let walk = match join.useable() {
            JoinKind::ContiguousList { start, count } => {
                let n = as_row(count, row.scalar_i64(count)?)?;
                let first = match start {
                    Some(start) => as_row(start, row.scalar_i64(start)?)?,
                    None => {
                        let index = parent_index(parent)?;
                        let starts = join.derived_starts(parent.store, count)?;
                        *starts.get(index).ok_or_else(|| {
                            PointNestError::out_of_bounds(count, index, starts.len())
                        })?
                    },
                };
                let block = Slice::range(first, n);
                block.check_bounds(graph.table(child).name(), child_len)?;
                Walk::Range(Odometer::new(vec![block])?)
            },
            JoinKind::ForwardLinkedList { start, next: link }
            | JoinKind::BackwardLinkedList { start, prev: link } => Walk::Linked {
                variable: link.clone(),
                next: row.scalar_i64(start)?,
                steps: 0,
            },
            JoinKind::NestedStructure { field } => {
                let values = row
                    .field(field)
                    .ok_or_else(|| PointNestError::field_not_found(field))?;
                let rows = values.records().ok_or_else(|| PointNestError::TypeMismatch {
                    name: field.clone(),
                    expected: "structure".to_string(),
                    found: values.data_type().to_string(),
                })?;
                Walk::Embedded {
                    rows: Arc::from(rows),
                    next: 0,
                }
            },
            JoinKind::ParentIndex { index } => {
                let parent_row = parent_index(parent)?;
                let rows = join
                    .rows_by_parent(parent.store, index)?
                    .get(&parent_row)
                    .cloned()
                    .unwrap_or_default();
                Walk::Listed(rows.into_iter())
            },
        };

        tracing::trace!(
            parent = %parent.name,
            kind = join.useable().name(),
            "iterating child rows"
        );
        Ok(Self::new(graph, parent.store, child, walk))
    }

    fn stored(&self, index: usize) -> DataCursor<'a> {
        DataCursor::table_row(self.graph, self.store, self.table, RowSource::Stored, index)
    }

    fn step_link(&mut self) -> Option<Result<DataCursor<'a>>> {
        let len = self.graph.table(self.table).len();
        let Walk::Linked {
            variable,
            next,
            steps,
        } = &mut self.walk
        else {
            return None;
        };

        if *next == LINK_SENTINEL {
            return None;
        }
        let index = match usize::try_from(*next) {
            Ok(i) if i < len => i,
            Ok(i) => return Some(Err(PointNestError::out_of_bounds(variable.as_str(), i, len))),
            Err(_) => {
                return Some(Err(PointNestError::InvalidLink {
                    variable: variable.clone(),
                    value: *next,
                }))
            },
        };
        *steps += 1;
        if *steps > len {
            return Some(Err(PointNestError::LinkCycle {
                variable: variable.clone(),
                steps: *steps,
            }));
        }

        let link = self
            .store
            .read_raw(variable, index..index + 1)
            .and_then(|v| crate::table::index_at(variable, &v, 0));
        match link {
            Ok(link) => *next = link,
            Err(e) => return Some(Err(e)),
        }
        Some(Ok(DataCursor::table_row(
            self.graph,
            self.store,
            self.table,
            RowSource::Stored,
            index,
        )))
    }
}

impl<'a> Iterator for ChildRows<'a> {
    type Item = Result<DataCursor<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let item = match &mut self.walk {
            Walk::Range(odometer) => odometer.next().map(|idx| Ok(self.stored(idx[0]))),
            Walk::Listed(rows) => rows.next().map(|i| Ok(self.stored(i))),
            Walk::Linked { .. } => self.step_link(),
            Walk::Embedded { rows, next } => {
                let index = *next;
                *next += 1;
                (index < rows.len()).then(|| {
                    let source = RowSource::Embedded(Arc::clone(rows));
                    Ok(DataCursor::table_row(self.graph, self.store, self.table, source, index))
                })
            },
        };
        match &item {
            None | Some(Err(_)) => self.done = true,
            Some(Ok(_)) => {},
        }
        item
    }
}

fn as_row(name: &str, value: i64) -> Result<usize> {
    usize::try_from(value).map_err(|_| PointNestError::InvalidLink {
        variable: name.to_string(),
        value,
    })
}

fn parent_index(parent: &DataCursor<'_>) -> Result<usize> {
    parent
        .row_index()
        .ok_or_else(|| PointNestError::not_a_container(&parent.name))
}
