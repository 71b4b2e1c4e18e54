//! Tables and the joins between them.
//!
//! A [`Table`] is the set of variables sharing one outer dimension. Tables are
//! linked into a forest by [`Join`]s: each table has at most one parent, and
//! the graph owns every table and join so links are plain indices.

mod builder;
mod join;

use std::sync::Arc;

use crate::axis::AxisType;
use crate::convention::ConventionConfig;
use crate::data::{BackingStore, Dimension, VariableInfo};
use crate::error::{PointNestError, Result};

pub use join::{Join, JoinId, JoinKind, LINK_SENTINEL};
pub(crate) use join::index_at;

/// Index of a table within its [`TableGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TableId(pub(crate) usize);

impl TableId {
    /// Position in [`TableGraph::tables`].
    pub fn index(self) -> usize {
        self.0
    }
}

/// Where a table's rows come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableOrigin {
    /// Rows are read from the backing store by outer index.
    Stored,
    /// Rows live inside a structure or sequence field of the parent row.
    Embedded {
        /// Field of the parent row holding the rows.
        field: String,
    },
}

/// A variable tagged with its coordinate role.
#[derive(Debug, Clone, PartialEq)]
pub struct CoordAxis {
    /// The role.
    pub axis: AxisType,
    /// The variable, as seen from inside one row.
    pub variable: VariableInfo,
    /// Whether the role was declared with `_CoordinateAxisType`.
    pub explicit: bool,
}

/// A logical record set over one outer dimension.
#[derive(Debug)]
pub struct Table {
    name: String,
    dim: Dimension,
    origin: TableOrigin,
    axes: Vec<CoordAxis>,
    columns: Vec<VariableInfo>,
    members: Arc<[VariableInfo]>,
    markers: Vec<String>,
    parent: Option<TableId>,
    join: Option<JoinId>,
    children: Vec<JoinId>,
}

impl Table {
    /// Table name, derived from its dimension (or `parent.field` when embedded).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The outer dimension.
    pub fn dim(&self) -> &Dimension {
        &self.dim
    }

    /// Number of rows, for stored tables.
    pub fn len(&self) -> usize {
        self.dim.len
    }

    /// True if the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.dim.len == 0
    }

    /// Where rows come from.
    pub fn origin(&self) -> &TableOrigin {
        &self.origin
    }

    /// True if rows live inside the parent's rows.
    pub fn is_embedded(&self) -> bool {
        matches!(self.origin, TableOrigin::Embedded { .. })
    }

    /// True if rows vary in number (unlimited or sequence dimension).
    pub fn is_variable_length(&self) -> bool {
        self.dim.unlimited
    }

    /// Coordinate axes, in declaration order.
    pub fn axes(&self) -> &[CoordAxis] {
        &self.axes
    }

    /// The axis with a given role. Explicitly tagged axes win over inferred ones.
    pub fn axis(&self, axis: AxisType) -> Option<&CoordAxis> {
        let mut matching = self.axes.iter().filter(|a| a.axis == axis);
        let first = matching.next()?;
        if first.explicit {
            return Some(first);
        }
        matching.find(|a| a.explicit).or(Some(first))
    }

    /// Non-coordinate atomic variables.
    pub fn columns(&self) -> &[VariableInfo] {
        &self.columns
    }

    /// Columns that are not join markers.
    pub fn data_columns(&self) -> impl Iterator<Item = &VariableInfo> {
        self.columns
            .iter()
            .filter(move |c| !self.markers.contains(&c.name))
    }

    /// Names of marker variables used by joins.
    pub fn markers(&self) -> &[String] {
        &self.markers
    }

    /// Layout of one row: every variable of the table, outer dimension removed.
    pub fn members(&self) -> &[VariableInfo] {
        &self.members
    }

    pub(crate) fn members_arc(&self) -> Arc<[VariableInfo]> {
        Arc::clone(&self.members)
    }

    /// The parent table.
    pub fn parent(&self) -> Option<TableId> {
        self.parent
    }

    /// The join to the parent.
    pub fn join(&self) -> Option<JoinId> {
        self.join
    }

    /// Joins to child tables.
    pub fn children(&self) -> &[JoinId] {
        &self.children
    }

    /// True if no table hangs below this one.
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// The forest of tables and joins built from one dataset.
///
/// Built once and read-only afterwards; any number of cursors may share it.
#[derive(Debug, Default)]
pub struct TableGraph {
    tables: Vec<Table>,
    joins: Vec<Join>,
    conventions: Vec<ConventionConfig>,
}

/// Build the table graph for a dataset using one convention.
pub fn build_tables(store: &dyn BackingStore, convention: &ConventionConfig) -> Result<TableGraph> {
    TableGraph::build(store, std::slice::from_ref(convention))
}

impl TableGraph {
    /// Build the table graph for a dataset.
    ///
    /// Tables are built first, then every convention contributes joins, then
    /// all joins are linked. Any structural error aborts the whole build.
    pub fn build(store: &dyn BackingStore, conventions: &[ConventionConfig]) -> Result<Self> {
        let (tables, mut pending) = builder::build_tables(store)?;
        let mut graph = TableGraph {
            tables,
            joins: Vec::new(),
            conventions: conventions.to_vec(),
        };

        for convention in conventions {
            pending.extend(join::detect(&graph.tables, store, convention)?);
        }
        for p in pending {
            graph.link(p)?;
        }

        tracing::debug!(
            tables = graph.tables.len(),
            joins = graph.joins.len(),
            "built table graph"
        );
        Ok(graph)
    }

    /// The conventions the graph was built with.
    pub fn conventions(&self) -> &[ConventionConfig] {
        &self.conventions
    }

    /// All tables.
    pub fn tables(&self) -> &[Table] {
        &self.tables
    }

    /// Ids of all tables.
    pub fn table_ids(&self) -> impl Iterator<Item = TableId> {
        (0..self.tables.len()).map(TableId)
    }

    /// A table by id.
    pub fn table(&self, id: TableId) -> &Table {
        &self.tables[id.0]
    }

    /// Find a table by name.
    pub fn find_table(&self, name: &str) -> Option<TableId> {
        self.tables.iter().position(|t| t.name == name).map(TableId)
    }

    /// The stored table over a dimension.
    pub fn table_for_dimension(&self, dim: &str) -> Option<TableId> {
        builder::stored_table_for(&self.tables, dim)
    }

    /// All joins.
    pub fn joins(&self) -> &[Join] {
        &self.joins
    }

    /// A join by id.
    pub fn join(&self, id: JoinId) -> &Join {
        &self.joins[id.0]
    }

    /// The join linking `parent` to `child`, if any.
    pub fn join_between(&self, parent: TableId, child: TableId) -> Option<JoinId> {
        self.tables[parent.0]
            .children
            .iter()
            .copied()
            .find(|&j| self.joins[j.0].child() == child)
    }

    /// Tables without children.
    pub fn leaves(&self) -> Vec<TableId> {
        self.table_ids().filter(|&id| self.table(id).is_leaf()).collect()
    }

    /// Tables without a parent.
    pub fn roots(&self) -> Vec<TableId> {
        self.table_ids()
            .filter(|&id| self.table(id).parent.is_none())
            .collect()
    }

    /// The table followed by its parent, grandparent and so on up to the root.
    pub fn ancestry(&self, id: TableId) -> Vec<TableId> {
        let mut chain = vec![id];
        let mut current = self.tables[id.0].parent;
        // the graph is acyclic, so the chain is never longer than the table count
        while let Some(parent) = current {
            if chain.len() > self.tables.len() {
                break;
            }
            chain.push(parent);
            current = self.tables[parent.0].parent;
        }
        chain
    }

    fn is_ancestor(&self, candidate: TableId, of: TableId) -> bool {
        self.ancestry(of).contains(&candidate)
    }

    fn link(&mut self, pending: join::PendingJoin) -> Result<()> {
        let join::PendingJoin {
            parent,
            child,
            kind,
        } = pending;

        if self.is_ancestor(child, parent) {
            return Err(PointNestError::CyclicJoin {
                parent: self.tables[parent.0].name.clone(),
                child: self.tables[child.0].name.clone(),
            });
        }

        self.mark(parent, child, &kind);

        if let Some(existing) = self.join_between(parent, child) {
            self.joins[existing.0].add_kind(kind);
            return Ok(());
        }

        if let Some(existing) = self.tables[child.0].parent {
            return Err(PointNestError::MultipleParents {
                table: self.tables[child.0].name.clone(),
                existing: self.tables[existing.0].name.clone(),
                requested: self.tables[parent.0].name.clone(),
            });
        }

        let id = JoinId(self.joins.len());
        tracing::debug!(
            parent = %self.tables[parent.0].name,
            child = %self.tables[child.0].name,
            kind = kind.name(),
            "linked tables"
        );
        self.joins.push(Join::new(parent, child, kind));
        self.tables[child.0].parent = Some(parent);
        self.tables[child.0].join = Some(id);
        self.tables[parent.0].children.push(id);
        Ok(())
    }

    fn mark(&mut self, parent: TableId, child: TableId, kind: &JoinKind) {
        for name in kind.marker_variables() {
            let owner = if self.tables[parent.0].members.iter().any(|m| m.name == name) {
                parent
            } else {
                child
            };
            let markers = &mut self.tables[owner.0].markers;
            if !markers.iter().any(|m| m == name) {
                markers.push(name.to_string());
            }
        }
    }
}
