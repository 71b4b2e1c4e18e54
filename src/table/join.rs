//! Joins between parent and child tables, and their detection from
//! convention marker variables.

use std::collections::HashMap;

use once_cell::sync::OnceCell;

use super::{Table, TableId};
use crate::convention::ConventionConfig;
use crate::data::{BackingStore, Dimension, Values, VariableInfo};
use crate::error::{PointNestError, Result};

/// Link value that ends a linked list.
pub const LINK_SENTINEL: i64 = -1;

/// Index of a join within its [`TableGraph`](super::TableGraph).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JoinId(pub(crate) usize);

impl JoinId {
    /// Position in [`TableGraph::joins`](super::TableGraph::joins).
    pub fn index(self) -> usize {
        self.0
    }
}

/// How child rows correspond to a parent row.
///
/// Variants are declared in tie-break order: when several kinds apply to the
/// same pair of tables, the first one is used.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum JoinKind {
    /// Child rows `[start, start + count)` belong to one parent row.
    ContiguousList {
        /// Parent variable holding the first child row. When absent, starts
        /// are the running sum of the counts.
        start: Option<String>,
        /// Parent variable holding the number of child rows.
        count: String,
    },
    /// Child rows are chained from the first through a `next` link.
    ForwardLinkedList {
        /// Parent variable holding the first child row.
        start: String,
        /// Child variable holding the next row.
        next: String,
    },
    /// Child rows are chained from the last through a `prev` link.
    BackwardLinkedList {
        /// Parent variable holding the last child row.
        start: String,
        /// Child variable holding the previous row.
        prev: String,
    },
    /// Child rows are a structure or sequence field of the parent row.
    NestedStructure {
        /// The field.
        field: String,
    },
    /// Each child row names its parent row.
    ParentIndex {
        /// Child variable holding the parent row index.
        index: String,
    },
}

impl JoinKind {
    /// Tie-break rank; lower wins.
    pub fn ordinal(&self) -> u8 {
        match self {
            JoinKind::ContiguousList { .. } => 0,
            JoinKind::ForwardLinkedList { .. } => 1,
            JoinKind::BackwardLinkedList { .. } => 2,
            JoinKind::NestedStructure { .. } => 3,
            JoinKind::ParentIndex { .. } => 4,
        }
    }

    /// Short name for display.
    pub fn name(&self) -> &'static str {
        match self {
            JoinKind::ContiguousList { .. } => "contiguous",
            JoinKind::ForwardLinkedList { .. } => "forward-linked",
            JoinKind::BackwardLinkedList { .. } => "backward-linked",
            JoinKind::NestedStructure { .. } => "nested",
            JoinKind::ParentIndex { .. } => "parent-index",
        }
    }

    /// Names of the marker variables this join reads.
    pub fn marker_variables(&self) -> Vec<&str> {
        match self {
            JoinKind::ContiguousList { start, count } => {
                start.iter().map(String::as_str).chain([count.as_str()]).collect()
            },
            JoinKind::ForwardLinkedList { start, next } => vec![start.as_str(), next.as_str()],
            JoinKind::BackwardLinkedList { start, prev } => vec![start.as_str(), prev.as_str()],
            JoinKind::NestedStructure { .. } => Vec::new(),
            JoinKind::ParentIndex { index } => vec![index.as_str()],
        }
    }
}

/// The relationship between one parent table and one child table.
#[derive(Debug)]
pub struct Join {
    parent: TableId,
    child: TableId,
    kinds: Vec<JoinKind>,
    starts: OnceCell<Vec<usize>>,
    rows_by_parent: OnceCell<HashMap<usize, Vec<usize>>>,
}

impl Join {
    pub(crate) fn new(parent: TableId, child: TableId, kind: JoinKind) -> Self {
        Self {
            parent,
            child,
            kinds: vec![kind],
            starts: OnceCell::new(),
            rows_by_parent: OnceCell::new(),
        }
    }

    /// The parent table.
    pub fn parent(&self) -> TableId {
        self.parent
    }

    /// The child table.
    pub fn child(&self) -> TableId {
        self.child
    }

    /// Every kind detected for this pair, in tie-break order.
    pub fn kinds(&self) -> &[JoinKind] {
        &self.kinds
    }

    /// The kind used to read child rows.
    pub fn useable(&self) -> &JoinKind {
        // a join is always created with one kind and kinds are never removed
        &self.kinds[0]
    }

    pub(crate) fn add_kind(&mut self, kind: JoinKind) {
        if !self.kinds.contains(&kind) {
            self.kinds.push(kind);
            self.kinds.sort_by_key(JoinKind::ordinal);
        }
    }

    /// Start offsets of each parent's child rows, computed from the counts on
    /// first use.
    pub(crate) fn derived_starts(&self, store: &dyn BackingStore, count: &str) -> Result<&[usize]> {
        self.starts
            .get_or_try_init(|| {
                let counts = read_whole(store, count)?;
                let mut starts = Vec::with_capacity(counts.len());
                let mut offset: usize = 0;
                for i in 0..counts.len() {
                    starts.push(offset);
                    let n = index_at(count, &counts, i)?;
                    let n = usize::try_from(n).map_err(|_| PointNestError::InvalidData {
                        name: count.to_string(),
                        reason: format!("negative count {} at row {}", n, i),
                    })?;
                    offset = offset.checked_add(n).ok_or_else(|| PointNestError::InvalidData {
                        name: count.to_string(),
                        reason: format!("counts overflow at row {}", i),
                    })?;
                }
                tracing::debug!(
                    variable = count,
                    parents = starts.len(),
                    "derived contiguous starts"
                );
                Ok(starts)
            })
            .map(Vec::as_slice)
    }

    /// Child rows of each parent row, computed from the parent index on first use.
    pub(crate) fn rows_by_parent(
        &self,
        store: &dyn BackingStore,
        index: &str,
    ) -> Result<&HashMap<usize, Vec<usize>>> {
        self.rows_by_parent.get_or_try_init(|| {
            let parents = read_whole(store, index)?;
            let mut map: HashMap<usize, Vec<usize>> = HashMap::new();
            for row in 0..parents.len() {
                let parent = index_at(index, &parents, row)?;
                match usize::try_from(parent) {
                    Ok(p) => map.entry(p).or_default().push(row),
                    Err(_) => tracing::trace!(variable = index, row, "child row without parent"),
                }
            }
            tracing::debug!(variable = index, parents = map.len(), "built parent index");
            Ok(map)
        })
    }
}

/// Read every row of a variable.
pub(crate) fn read_whole(store: &dyn BackingStore, variable: &str) -> Result<Values> {
    let info = store
        .variable(variable)
        .ok_or_else(|| PointNestError::variable_not_found(variable))?;
    let rows = info.first_dimension().map_or(1, |d| d.len);
    store.read_raw(variable, 0..rows)
}

/// Element `i` of an index-valued buffer.
pub(crate) fn index_at(name: &str, values: &Values, i: usize) -> Result<i64> {
    values.get_i64(i).ok_or_else(|| PointNestError::TypeMismatch {
        name: name.to_string(),
        expected: "integer".to_string(),
        found: values.data_type().to_string(),
    })
}

/// A join found by detection, not yet linked into the graph.
#[derive(Debug)]
pub(crate) struct PendingJoin {
    pub(crate) parent: TableId,
    pub(crate) child: TableId,
    pub(crate) kind: JoinKind,
}

/// Find the joins one convention's marker variables describe.
///
/// Missing markers disable the kinds that need them. Linked lists take
/// precedence over contiguous lists, and both over a parent index.
pub(crate) fn detect(
    tables: &[Table],
    store: &dyn BackingStore,
    convention: &ConventionConfig,
) -> Result<Vec<PendingJoin>> {
    let marker = |name: &Option<String>| name.as_deref().and_then(|n| store.variable(n));
    let first = marker(&convention.first_child);
    let next = marker(&convention.next_child);
    let last = marker(&convention.last_child);
    let prev = marker(&convention.prev_child);
    let num = marker(&convention.num_children);
    let index = marker(&convention.parent_index);

    let station_dim = known_dimension(store, convention.station_dim.as_deref())?;
    let obs_dim = known_dimension(store, convention.obs_dim.as_deref())?;

    let mut found: Vec<(String, String, JoinKind)> = Vec::new();

    let forward = first.as_ref().zip(next.as_ref());
    if let Some((first, next)) = forward {
        found.push((
            parent_dimension(&station_dim, first)?,
            child_dimension(&obs_dim, next)?,
            JoinKind::ForwardLinkedList {
                start: first.name.clone(),
                next: next.name.clone(),
            },
        ));
    }

    let backward = last.as_ref().zip(prev.as_ref());
    if let Some((last, prev)) = backward {
        found.push((
            parent_dimension(&station_dim, last)?,
            child_dimension(&obs_dim, prev)?,
            JoinKind::BackwardLinkedList {
                start: last.name.clone(),
                prev: prev.name.clone(),
            },
        ));
    }

    if forward.is_none() && backward.is_none() {
        match (&num, &obs_dim) {
            (Some(num), Some(obs)) => {
                let start_var = first.as_ref().unwrap_or(num);
                found.push((
                    parent_dimension(&station_dim, start_var)?,
                    obs.name.clone(),
                    JoinKind::ContiguousList {
                        start: first.as_ref().map(|f| f.name.clone()),
                        count: num.name.clone(),
                    },
                ));
            },
            (Some(num), None) => {
                tracing::debug!(
                    convention = convention.label(),
                    variable = %num.name,
                    "contiguous list disabled without an obs dimension"
                );
            },
            (None, _) => {},
        }
    }

    if found.is_empty() {
        if let (Some(index), Some(station)) = (&index, &station_dim) {
            found.push((
                station.name.clone(),
                child_dimension(&obs_dim, index)?,
                JoinKind::ParentIndex {
                    index: index.name.clone(),
                },
            ));
        }
    }

    if found.is_empty() {
        tracing::debug!(convention = convention.label(), "no join markers found");
    }

    found
        .into_iter()
        .map(|(parent, child, kind)| {
            tracing::debug!(
                convention = convention.label(),
                parent = %parent,
                child = %child,
                kind = kind.name(),
                "detected join"
            );
            Ok(PendingJoin {
                parent: table_over(tables, &parent)?,
                child: table_over(tables, &child)?,
                kind,
            })
        })
        .collect()
}

fn known_dimension(store: &dyn BackingStore, name: Option<&str>) -> Result<Option<Dimension>> {
    name.map(|n| {
        store
            .dimension(n)
            .ok_or_else(|| PointNestError::dimension_not_found(n))
    })
    .transpose()
}

fn marker_dimension(marker: &VariableInfo) -> Result<String> {
    marker
        .first_dimension()
        .map(|d| d.name.clone())
        .ok_or_else(|| PointNestError::MarkerNotDimensioned {
            variable: marker.name.clone(),
        })
}

fn parent_dimension(station_dim: &Option<Dimension>, marker: &VariableInfo) -> Result<String> {
    match station_dim {
        Some(dim) => Ok(dim.name.clone()),
        None => marker_dimension(marker),
    }
}

fn child_dimension(obs_dim: &Option<Dimension>, marker: &VariableInfo) -> Result<String> {
    match obs_dim {
        Some(dim) => Ok(dim.name.clone()),
        None => marker_dimension(marker),
    }
}

fn table_over(tables: &[Table], dim: &str) -> Result<TableId> {
    super::builder::stored_table_for(tables, dim)
        .ok_or_else(|| PointNestError::dimension_not_found(dim))
}
