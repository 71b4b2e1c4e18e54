//! Lazy, scheme-dispatching cursors over tables, rows and fields.
//!
//! A [`DataCursor`] points at atomic data, at one row, or at an array of
//! rows. Nothing is read until [`DataCursor::read`], [`DataCursor::row`],
//! [`DataCursor::read_field`] or [`DataCursor::iterate_child_rows`] is
//! called, and a row once read is cached on the cursor.
//!
//! Cursors borrow the table graph and the backing store. They are cheap to
//! create and meant to be used by one reader at a time.

mod child_rows;

use std::fmt;
use std::sync::Arc;

use ndarray::ArrayD;
use once_cell::sync::OnceCell;

use crate::data::{BackingStore, DataType, StructData, Values, VariableInfo};
use crate::error::{PointNestError, Result};
use crate::odometer::{flat_offset, Odometer, Slice};
use crate::table::{JoinKind, TableGraph, TableId};

pub use child_rows::ChildRows;

/// What a cursor points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scheme {
    /// Typed values of one atomic variable or field.
    Atomic,
    /// One fixed-shape row.
    Struct,
    /// An array of fixed-shape rows.
    StructArray,
    /// One row of a variable-length table.
    Sequence,
    /// An array of rows of a variable-length table.
    SeqArray,
}

impl Scheme {
    /// True for the array schemes.
    pub fn is_array(self) -> bool {
        matches!(self, Scheme::StructArray | Scheme::SeqArray)
    }

    /// True for the single-row schemes.
    pub fn is_row(self) -> bool {
        matches!(self, Scheme::Struct | Scheme::Sequence)
    }

    /// The scheme of one element of an array scheme.
    pub fn item(self) -> Option<Scheme> {
        match self {
            Scheme::StructArray => Some(Scheme::Struct),
            Scheme::SeqArray => Some(Scheme::Sequence),
            Scheme::Atomic | Scheme::Struct | Scheme::Sequence => None,
        }
    }
}

/// The outcome of [`DataCursor::read`].
#[derive(Debug)]
pub enum ReadResult<'a> {
    /// Atomic values in row-major order, with the shape of the selection.
    Values {
        /// The values.
        values: Values,
        /// Count along each selected dimension.
        shape: Vec<usize>,
    },
    /// One cursor per selected row.
    Rows(Vec<DataCursor<'a>>),
    /// A single row.
    Row(StructData),
}

impl<'a> ReadResult<'a> {
    /// The values, if this is an atomic result.
    pub fn into_values(self) -> Option<Values> {
        match self {
            ReadResult::Values { values, .. } => Some(values),
            _ => None,
        }
    }

    /// The values as an n-dimensional array, if this is a numeric result.
    pub fn into_array(self) -> Result<ArrayD<f64>> {
        match self {
            ReadResult::Values { values, shape } => values.to_array(&shape),
            _ => Err(PointNestError::TypeMismatch {
                name: "read result".to_string(),
                expected: "values".to_string(),
                found: "rows".to_string(),
            }),
        }
    }

    /// The row cursors, if this is an array result.
    pub fn into_rows(self) -> Option<Vec<DataCursor<'a>>> {
        match self {
            ReadResult::Rows(rows) => Some(rows),
            _ => None,
        }
    }

    /// The row, if this is a single-row result.
    pub fn into_row(self) -> Option<StructData> {
        match self {
            ReadResult::Row(row) => Some(row),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) enum RowSource {
    /// Rows are read from the store by outer index.
    Stored,
    /// Rows were already decoded from a parent field.
    Embedded(Arc<[StructData]>),
}

#[derive(Debug)]
struct RowSet {
    table: Option<TableId>,
    members: Arc<[VariableInfo]>,
    source: RowSource,
    shape: Vec<usize>,
    index: Option<usize>,
    row: OnceCell<StructData>,
}

#[derive(Debug)]
enum Target {
    /// Atomic data already in memory.
    Values { values: Values, shape: Vec<usize> },
    /// An atomic variable in the store.
    Variable(VariableInfo),
    Rows(RowSet),
}

/// A lazy handle over atomic data, one row, or an array of rows.
pub struct DataCursor<'a> {
    graph: &'a TableGraph,
    store: &'a dyn BackingStore,
    scheme: Scheme,
    name: String,
    target: Target,
}

impl fmt::Debug for DataCursor<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataCursor")
            .field("scheme", &self.scheme)
            .field("name", &self.name)
            .field("target", &self.target)
            .finish()
    }
}

impl<'a> DataCursor<'a> {
    /// A cursor over every row of a stored table.
    ///
    /// Tables over an unlimited dimension give a [`Scheme::SeqArray`],
    /// others a [`Scheme::StructArray`].
    pub fn table(graph: &'a TableGraph, store: &'a dyn BackingStore, id: TableId) -> Result<Self> {
        let table = graph.table(id);
        if table.is_embedded() {
            return Err(PointNestError::EmbeddedWithoutParent {
                table: table.name().to_string(),
            });
        }
        let scheme = if table.is_variable_length() {
            Scheme::SeqArray
        } else {
            Scheme::StructArray
        };
        Ok(Self {
            graph,
            store,
            scheme,
            name: table.name().to_string(),
            target: Target::Rows(RowSet {
                table: Some(id),
                members: table.members_arc(),
                source: RowSource::Stored,
                shape: vec![table.len()],
                index: None,
                row: OnceCell::new(),
            }),
        })
    }

    /// A cursor over a whole variable of the store.
    ///
    /// Atomic variables are read lazily through [`read`](Self::read).
    /// Structure and sequence variables are decoded and exposed as row arrays.
    pub fn variable(
        graph: &'a TableGraph,
        store: &'a dyn BackingStore,
        name: &str,
    ) -> Result<Self> {
        let info = store
            .variable(name)
            .ok_or_else(|| PointNestError::variable_not_found(name))?;
        if !info.data_type.is_structured() {
            return Ok(Self {
                graph,
                store,
                scheme: Scheme::Atomic,
                name: info.name.clone(),
                target: Target::Variable(info),
            });
        }

        let rows = info.first_dimension().map_or(1, |d| d.len);
        let values = store.read_raw(name, 0..rows)?;
        let owner = info
            .first_dimension()
            .and_then(|d| graph.table_for_dimension(&d.name));
        let table = owner.and_then(|t| embedded_child(graph, t, name));
        Self::structured(graph, store, &info, &values, table)
    }

    /// A cursor over one row of a table.
    pub(crate) fn table_row(
        graph: &'a TableGraph,
        store: &'a dyn BackingStore,
        id: TableId,
        source: RowSource,
        index: usize,
    ) -> Self {
        let table = graph.table(id);
        let scheme = if table.is_variable_length() {
            Scheme::Sequence
        } else {
            Scheme::Struct
        };
        Self {
            graph,
            store,
            scheme,
            name: format!("{}[{}]", table.name(), index),
            target: Target::Rows(RowSet {
                table: Some(id),
                members: table.members_arc(),
                source,
                shape: Vec::new(),
                index: Some(index),
                row: OnceCell::new(),
            }),
        }
    }

    // Struct or sequence data decoded from a field or variable.
    fn structured(
        graph: &'a TableGraph,
        store: &'a dyn BackingStore,
        info: &VariableInfo,
        values: &Values,
        table: Option<TableId>,
    ) -> Result<Self> {
        let records = values.records().ok_or_else(|| PointNestError::TypeMismatch {
            name: info.name.clone(),
            expected: info.data_type.to_string(),
            found: values.data_type().to_string(),
        })?;
        let (scheme, shape, index) = match info.data_type {
            DataType::Sequence => (Scheme::SeqArray, vec![records.len()], None),
            _ if info.rank() == 0 => (Scheme::Struct, Vec::new(), Some(0)),
            _ => (Scheme::StructArray, info.shape(), None),
        };
        Ok(Self {
            graph,
            store,
            scheme,
            name: info.name.clone(),
            target: Target::Rows(RowSet {
                table,
                members: Arc::from(info.members.clone()),
                source: RowSource::Embedded(Arc::from(records)),
                shape,
                index,
                row: OnceCell::new(),
            }),
        })
    }

    /// The scheme.
    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    /// Name of the variable, field or row.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The table this cursor reads rows of, if known.
    pub fn table_id(&self) -> Option<TableId> {
        match &self.target {
            Target::Rows(rows) => rows.table,
            Target::Values { .. } | Target::Variable(_) => None,
        }
    }

    /// Index of the row within its table or field, for single-row cursors.
    pub fn row_index(&self) -> Option<usize> {
        match &self.target {
            Target::Rows(rows) => rows.index,
            Target::Values { .. } | Target::Variable(_) => None,
        }
    }

    /// Shape addressed by [`read`](Self::read). Empty for single rows.
    pub fn shape(&self) -> Vec<usize> {
        match &self.target {
            Target::Values { shape, .. } => shape.clone(),
            Target::Variable(info) => info.shape(),
            Target::Rows(rows) => rows.shape.clone(),
        }
    }

    /// Read a selection.
    ///
    /// Atomic cursors return the selected values in row-major order. Array
    /// cursors return one row cursor per selected index. Single-row cursors
    /// take an empty selection and return the row.
    pub fn read(&self, slices: &[Slice]) -> Result<ReadResult<'a>> {
        match &self.target {
            Target::Values { values, shape } => {
                check_selection(&self.name, shape, slices)?;
                Ok(ReadResult::Values {
                    values: gather(values, shape, slices, 0)?,
                    shape: counts(slices),
                })
            },
            Target::Variable(info) => self.read_variable(info, slices),
            Target::Rows(rows) if self.scheme.is_array() => {
                check_selection(&self.name, &rows.shape, slices)?;
                let cursors = Odometer::new(slices.to_vec())?
                    .map(|idx| self.item(rows, flat_offset(&idx, &rows.shape)))
                    .collect();
                Ok(ReadResult::Rows(cursors))
            },
            Target::Rows(_) => {
                if !slices.is_empty() {
                    return Err(PointNestError::RankMismatch {
                        name: self.name.clone(),
                        rank: 0,
                        given: slices.len(),
                    });
                }
                Ok(ReadResult::Row(self.row()?.clone()))
            },
        }
    }

    /// Read everything the cursor addresses.
    pub fn read_all(&self) -> Result<ReadResult<'a>> {
        let slices: Vec<Slice> = match self.scheme {
            Scheme::Struct | Scheme::Sequence => Vec::new(),
            _ => self.shape().into_iter().map(Slice::full).collect(),
        };
        self.read(&slices)
    }

    fn read_variable(&self, info: &VariableInfo, slices: &[Slice]) -> Result<ReadResult<'a>> {
        let shape = info.shape();
        check_selection(&self.name, &shape, slices)?;

        // Only the outer rows spanned by the selection are fetched.
        let (first, last) = match slices.first() {
            Some(outer) => {
                let first = outer.start.min(shape[0]);
                (first, outer.last_index().map_or(first, |i| i + 1))
            },
            None => (0, 1),
        };
        let raw = self.store.read_raw(&info.name, first..last)?;
        let mut local = shape.clone();
        if let Some(outer) = local.first_mut() {
            *outer = last - first;
        }
        tracing::trace!(variable = %info.name, first, last, "atomic read");

        Ok(ReadResult::Values {
            values: gather(&raw, &local, slices, first)?,
            shape: counts(slices),
        })
    }

    fn item(&self, rows: &RowSet, index: usize) -> DataCursor<'a> {
        let scheme = self.scheme.item().unwrap_or(self.scheme);
        DataCursor {
            graph: self.graph,
            store: self.store,
            scheme,
            name: format!("{}[{}]", self.name, index),
            target: Target::Rows(RowSet {
                table: rows.table,
                members: Arc::clone(&rows.members),
                source: rows.source.clone(),
                shape: Vec::new(),
                index: Some(index),
                row: OnceCell::new(),
            }),
        }
    }

    /// The row of a single-row cursor, read on first use.
    ///
    /// A failed read leaves nothing cached, so it can be retried.
    pub fn row(&self) -> Result<&StructData> {
        match &self.target {
            Target::Rows(rows) if self.scheme.is_row() => {
                rows.row.get_or_try_init(|| self.load_row(rows))
            },
            _ => Err(PointNestError::not_a_container(&self.name)),
        }
    }

    fn load_row(&self, rows: &RowSet) -> Result<StructData> {
        let index = rows.index.unwrap_or(0);
        match &rows.source {
            RowSource::Embedded(data) => data
                .get(index)
                .cloned()
                .ok_or_else(|| PointNestError::out_of_bounds(&self.name, index, data.len())),
            RowSource::Stored => {
                let len = rows.table.map_or(0, |t| self.graph.table(t).len());
                if index >= len {
                    return Err(PointNestError::out_of_bounds(&self.name, index, len));
                }
                let fields = rows
                    .members
                    .iter()
                    .map(|m| self.store.read_raw(&m.name, index..index + 1))
                    .collect::<Result<Vec<_>>>()?;
                tracing::trace!(row = %self.name, "read row");
                Ok(StructData::new(Arc::clone(&rows.members), fields))
            },
        }
    }

    /// Project a named field of the row into a new cursor.
    pub fn read_field(&self, name: &str) -> Result<DataCursor<'a>> {
        let row = self.row()?;
        let index = row
            .member_index(name)
            .ok_or_else(|| PointNestError::field_not_found(name))?;
        self.read_field_at(index)
    }

    /// Project the field at a position of the row into a new cursor.
    ///
    /// Atomic fields give [`Scheme::Atomic`]. Structure fields give
    /// [`Scheme::Struct`] when scalar and [`Scheme::StructArray`] otherwise.
    /// Sequence fields give a [`Scheme::SeqArray`] over all their rows.
    pub fn read_field_at(&self, index: usize) -> Result<DataCursor<'a>> {
        let row = self.row()?;
        let (member, values) = row
            .field_at(index)
            .ok_or_else(|| PointNestError::field_not_found(index.to_string()))?;

        if member.data_type.is_structured() {
            let table = self
                .table_id()
                .and_then(|t| embedded_child(self.graph, t, &member.name));
            return Self::structured(self.graph, self.store, member, values, table);
        }

        Ok(DataCursor {
            graph: self.graph,
            store: self.store,
            scheme: Scheme::Atomic,
            name: member.name.clone(),
            target: Target::Values {
                values: values.clone(),
                shape: member.shape(),
            },
        })
    }

    /// Walk the rows of `child` that belong to this row, following the join
    /// between this cursor's table and `child`.
    pub fn iterate_child_rows(&self, child: TableId) -> Result<ChildRows<'a>> {
        if self.scheme == Scheme::Atomic {
            return Err(PointNestError::not_a_container(&self.name));
        }
        let not_a_collection = || PointNestError::NotACollection {
            parent: self.name.clone(),
            child: self.graph.table(child).name().to_string(),
        };
        let parent = self.table_id().ok_or_else(not_a_collection)?;
        let join = self
            .graph
            .join_between(parent, child)
            .ok_or_else(not_a_collection)?;
        ChildRows::for_row(self, join)
    }
}

/// The embedded table holding the rows of `field` of `parent`'s rows.
fn embedded_child(graph: &TableGraph, parent: TableId, field: &str) -> Option<TableId> {
    graph.table(parent).children().iter().find_map(|&j| {
        let join = graph.join(j);
        match join.useable() {
            JoinKind::NestedStructure { field: f } if f == field => Some(join.child()),
            _ => None,
        }
    })
}

fn check_selection(name: &str, shape: &[usize], slices: &[Slice]) -> Result<()> {
    if slices.len() != shape.len() {
        return Err(PointNestError::RankMismatch {
            name: name.to_string(),
            rank: shape.len(),
            given: slices.len(),
        });
    }
    slices
        .iter()
        .zip(shape)
        .try_for_each(|(s, &len)| s.check_bounds(name, len))
}

fn counts(slices: &[Slice]) -> Vec<usize> {
    slices.iter().map(|s| s.count).collect()
}

// `first_row` is the outer index of the first row held in `values`.
fn gather(values: &Values, shape: &[usize], slices: &[Slice], first_row: usize) -> Result<Values> {
    let offsets: Vec<usize> = Odometer::new(slices.to_vec())?
        .map(|mut idx| {
            if let Some(outer) = idx.first_mut() {
                *outer -= first_row;
            }
            flat_offset(&idx, shape)
        })
        .collect();
    values.gather(&offsets)
}
