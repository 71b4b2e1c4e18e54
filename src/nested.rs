//! Flattening a leaf table and its ancestors into one feature.
//!
//! A [`NestedTable`] is anchored at a leaf of the table forest. Coordinates
//! are searched from the leaf towards the root and the closest table carrying
//! an axis wins. Leaves that cannot be geolocated in time and space are not
//! features and are left out.

use std::fmt;

use once_cell::sync::OnceCell;

use crate::axis::AxisType;
use crate::convention::StationField;
use crate::cursor::{ChildRows, DataCursor};
use crate::data::{BackingStore, StructData, Values, VariableInfo};
use crate::error::{PointNestError, Result};
use crate::table::{CoordAxis, JoinId, JoinKind, TableGraph, TableId};

/// Feature type, a function of the nesting depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeatureType {
    /// Single table of observations.
    Point,
    /// Observations grouped under stations.
    Station,
    /// Profiles grouped under stations.
    StationProfile,
}

impl FeatureType {
    /// Classify a nesting depth. Depths outside 1..=3 have no feature type.
    pub fn from_depth(depth: usize) -> Option<Self> {
        match depth {
            1 => Some(FeatureType::Point),
            2 => Some(FeatureType::Station),
            3 => Some(FeatureType::StationProfile),
            _ => None,
        }
    }

    /// Display name.
    pub fn name(self) -> &'static str {
        match self {
            FeatureType::Point => "point",
            FeatureType::Station => "station",
            FeatureType::StationProfile => "stationProfile",
        }
    }
}

impl fmt::Display for FeatureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Attributes whose numbers mark a value as missing.
const MISSING_ATTRIBUTES: [&str; 2] = ["_FillValue", "missing_value"];

/// Reads one coordinate out of the row at a fixed nesting level.
///
/// The field position is bound the first time a row is read and reused for
/// every later row. Binding happens at most once, even under concurrent use.
#[derive(Debug)]
pub struct CoordVarExtractor {
    axis: Option<AxisType>,
    name: String,
    units: Option<String>,
    missing: Vec<f64>,
    level: usize,
    table: TableId,
    field: OnceCell<usize>,
}

impl CoordVarExtractor {
    fn new(axis: Option<AxisType>, variable: &VariableInfo, level: usize, table: TableId) -> Self {
        let missing = MISSING_ATTRIBUTES
            .iter()
            .filter_map(|a| variable.attribute(a))
            .flat_map(|v| v.as_f64s().iter().copied())
            .collect();
        Self {
            axis,
            name: variable.name.clone(),
            units: variable.units().map(str::to_string),
            missing,
            level,
            table,
            field: OnceCell::new(),
        }
    }

    /// The axis role, or `None` for the feature id and station metadata.
    pub fn axis(&self) -> Option<AxisType> {
        self.axis
    }

    /// The `units` attribute of the variable.
    pub fn units(&self) -> Option<&str> {
        self.units.as_deref()
    }

    /// Values declared missing through `_FillValue` or `missing_value`.
    pub fn missing_values(&self) -> &[f64] {
        &self.missing
    }

    /// True for NaN and for the declared missing values.
    pub fn is_missing_value(&self, value: f64) -> bool {
        value.is_nan() || self.missing.contains(&value)
    }

    /// True if the value in a leaf-first list of rows is missing. Text is
    /// missing when empty.
    pub fn is_missing(&self, rows: &[StructData]) -> Result<bool> {
        let values = self.values(self.row(rows)?)?;
        if let Some(v) = values.get_f64(0) {
            return Ok(self.is_missing_value(v));
        }
        match values.get_string(0) {
            Some(text) => Ok(text.trim().is_empty()),
            None => Err(PointNestError::TypeMismatch {
                name: self.name.clone(),
                expected: "text or number".to_string(),
                found: values.data_type().to_string(),
            }),
        }
    }

    /// Name of the variable.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Nesting level holding the variable; 0 is the leaf.
    pub fn level(&self) -> usize {
        self.level
    }

    /// Table holding the variable.
    pub fn table(&self) -> TableId {
        self.table
    }

    /// True once a row has been read through this extractor.
    pub fn is_bound(&self) -> bool {
        self.field.get().is_some()
    }

    fn field_index(&self, row: &StructData) -> Result<usize> {
        let index = *self.field.get_or_try_init(|| {
            row.member_index(&self.name)
                .ok_or_else(|| PointNestError::field_not_found(&self.name))
        })?;
        match row.field_at(index) {
            Some((member, _)) if member.name == self.name => Ok(index),
            // rows of another layout; look the field up again without rebinding
            _ => row
                .member_index(&self.name)
                .ok_or_else(|| PointNestError::field_not_found(&self.name)),
        }
    }

    fn values<'r>(&self, row: &'r StructData) -> Result<&'r Values> {
        let index = self.field_index(row)?;
        row.field_at(index)
            .map(|(_, values)| values)
            .ok_or_else(|| PointNestError::field_not_found(&self.name))
    }

    fn row<'r>(&self, rows: &'r [StructData]) -> Result<&'r StructData> {
        rows.get(self.level)
            .ok_or_else(|| PointNestError::out_of_bounds(&self.name, self.level, rows.len()))
    }

    /// The coordinate as a float, from a leaf-first list of rows.
    pub fn value_f64(&self, rows: &[StructData]) -> Result<f64> {
        let values = self.values(self.row(rows)?)?;
        values.get_f64(0).ok_or_else(|| PointNestError::TypeMismatch {
            name: self.name.clone(),
            expected: "numeric".to_string(),
            found: values.data_type().to_string(),
        })
    }

    /// The value as text, from a leaf-first list of rows.
    pub fn value_string(&self, rows: &[StructData]) -> Result<String> {
        let values = self.values(self.row(rows)?)?;
        values
            .get_string(0)
            .or_else(|| values.get_i64(0).map(|v| v.to_string()))
            .or_else(|| values.get_f64(0).map(|v| v.to_string()))
            .ok_or_else(|| PointNestError::TypeMismatch {
                name: self.name.clone(),
                expected: "text or number".to_string(),
                found: values.data_type().to_string(),
            })
    }
}

/// A leaf table plus its ancestors, addressable as one feature.
#[derive(Debug)]
pub struct NestedTable<'g> {
    graph: &'g TableGraph,
    chain: Vec<TableId>,
    joins: Vec<JoinId>,
    feature_type: FeatureType,
    time: CoordVarExtractor,
    lat: CoordVarExtractor,
    lon: CoordVarExtractor,
    height: Option<CoordVarExtractor>,
    feature_id: Option<CoordVarExtractor>,
    station: Vec<(StationField, CoordVarExtractor)>,
}

/// Resolve every geolocated leaf of the graph into a [`NestedTable`].
///
/// Leaves without time, latitude and longitude are skipped. A leaf nested
/// deeper than any feature type is an error.
pub fn resolve_nested_tables(graph: &TableGraph) -> Result<Vec<NestedTable<'_>>> {
    let mut nested = Vec::new();
    for leaf in graph.leaves() {
        if let Some(table) = NestedTable::resolve(graph, leaf)? {
            nested.push(table);
        }
    }
    tracing::debug!(count = nested.len(), "resolved nested tables");
    Ok(nested)
}

impl<'g> NestedTable<'g> {
    /// Resolve one leaf. Returns `None` when time, latitude or longitude is
    /// missing from the whole chain.
    pub fn resolve(graph: &'g TableGraph, leaf: TableId) -> Result<Option<Self>> {
        let chain = graph.ancestry(leaf);
        let name = graph.table(leaf).name();

        let find = |axis| find_axis(graph, &chain, axis);
        let (Some(time), Some(lat), Some(lon)) =
            (find(AxisType::Time), find(AxisType::Lat), find(AxisType::Lon))
        else {
            tracing::debug!(table = %name, "leaf has no time/lat/lon, not a feature");
            return Ok(None);
        };

        let feature_type =
            FeatureType::from_depth(chain.len()).ok_or_else(|| PointNestError::UnclassifiedDepth {
                table: name.to_string(),
                depth: chain.len(),
            })?;

        let joins = chain
            .iter()
            .filter_map(|&t| graph.table(t).join())
            .collect();

        let nested = Self {
            graph,
            joins,
            feature_type,
            time,
            lat,
            lon,
            height: find(AxisType::Height),
            feature_id: find_feature_id(graph, &chain),
            station: StationField::ALL
                .into_iter()
                .filter_map(|f| find_station_field(graph, &chain, f).map(|e| (f, e)))
                .collect(),
            chain,
        };
        tracing::debug!(
            table = %name,
            feature_type = %nested.feature_type,
            depth = nested.depth(),
            "resolved feature"
        );
        Ok(Some(nested))
    }

    /// The table graph.
    pub fn graph(&self) -> &'g TableGraph {
        self.graph
    }

    /// The leaf table.
    pub fn leaf(&self) -> TableId {
        self.chain[0]
    }

    /// The outermost ancestor.
    pub fn root(&self) -> TableId {
        self.chain[self.chain.len() - 1]
    }

    /// Leaf first, root last.
    pub fn chain(&self) -> &[TableId] {
        &self.chain
    }

    /// Number of nesting levels; 1 means the leaf has no parent.
    pub fn depth(&self) -> usize {
        self.chain.len()
    }

    /// Feature type.
    pub fn feature_type(&self) -> FeatureType {
        self.feature_type
    }

    /// The join used to read level `level` rows from level `level + 1` rows.
    pub fn join_at(&self, level: usize) -> Option<&'g JoinKind> {
        self.joins.get(level).map(|&j| self.graph.join(j).useable())
    }

    /// Time extractor.
    pub fn time(&self) -> &CoordVarExtractor {
        &self.time
    }

    /// Latitude extractor.
    pub fn lat(&self) -> &CoordVarExtractor {
        &self.lat
    }

    /// Longitude extractor.
    pub fn lon(&self) -> &CoordVarExtractor {
        &self.lon
    }

    /// Height extractor, if any table in the chain has a height axis.
    pub fn height(&self) -> Option<&CoordVarExtractor> {
        self.height.as_ref()
    }

    /// Feature id extractor, for a variable whose `cf_role` ends in `_id`.
    pub fn feature_id(&self) -> Option<&CoordVarExtractor> {
        self.feature_id.as_ref()
    }

    /// Extractor for one kind of station metadata, if a convention names a
    /// variable for it that some table in the chain holds.
    pub fn station_field(&self, field: StationField) -> Option<&CoordVarExtractor> {
        self.station
            .iter()
            .find(|(f, _)| *f == field)
            .map(|(_, e)| e)
    }

    /// Units of the vertical coordinate: the height axis, else the station
    /// altitude.
    pub fn alt_units(&self) -> Option<&str> {
        self.height
            .as_ref()
            .or_else(|| self.station_field(StationField::Alt))
            .and_then(CoordVarExtractor::units)
    }

    /// Coordinate axes in the chain other than the ones extracted.
    pub fn extra_axes(&self) -> Vec<&'g CoordAxis> {
        let used: Vec<&str> = [&self.time, &self.lat, &self.lon]
            .into_iter()
            .chain(self.height.as_ref())
            .map(|e| e.name())
            .collect();
        self.chain
            .iter()
            .flat_map(|&t| self.graph.table(t).axes())
            .filter(|a| !used.contains(&a.variable.name.as_str()))
            .collect()
    }

    /// A cursor over the rows of the outermost table.
    pub fn open_cursor<'s>(&'s self, store: &'s dyn BackingStore) -> Result<DataCursor<'s>> {
        DataCursor::table(self.graph, store, self.root())
    }

    /// Every leaf row together with its ancestor rows, walking down from the
    /// root table through the joins.
    pub fn rows<'s>(&'s self, store: &'s dyn BackingStore) -> Result<FeatureRows<'s>> {
        let roots = ChildRows::all(self.graph, store, self.root())?;
        Ok(FeatureRows {
            nested: self,
            stack: vec![roots],
            ancestors: Vec::new(),
        })
    }
}

fn find_axis(graph: &TableGraph, chain: &[TableId], axis: AxisType) -> Option<CoordVarExtractor> {
    chain.iter().enumerate().find_map(|(level, &t)| {
        graph
            .table(t)
            .axis(axis)
            .map(|a| CoordVarExtractor::new(Some(axis), &a.variable, level, t))
    })
}

fn find_feature_id(graph: &TableGraph, chain: &[TableId]) -> Option<CoordVarExtractor> {
    chain.iter().enumerate().find_map(|(level, &t)| {
        graph
            .table(t)
            .members()
            .iter()
            .filter(|m| !m.data_type.is_structured())
            .find(|m| m.attribute_str("cf_role").map_or(false, |r| r.ends_with("_id")))
            .map(|m| CoordVarExtractor::new(None, m, level, t))
    })
}

fn find_station_field(
    graph: &TableGraph,
    chain: &[TableId],
    field: StationField,
) -> Option<CoordVarExtractor> {
    let names: Vec<&str> = graph
        .conventions()
        .iter()
        .filter_map(|c| c.station_variable(field))
        .collect();
    chain.iter().enumerate().find_map(|(level, &t)| {
        graph
            .table(t)
            .members()
            .iter()
            .find(|m| names.contains(&m.name.as_str()))
            .map(|m| CoordVarExtractor::new(None, m, level, t))
    })
}

/// Depth-first walk over the rows of a [`NestedTable`].
///
/// `stack[k]` walks the rows of level `depth - 1 - k`, and `ancestors[k]` is
/// the current row of that level, so `ancestors` is always one shorter than
/// `stack`. An error ends the current subtree only.
#[derive(Debug)]
pub struct FeatureRows<'s> {
    nested: &'s NestedTable<'s>,
    stack: Vec<ChildRows<'s>>,
    ancestors: Vec<StructData>,
}

impl<'s> Iterator for FeatureRows<'s> {
    type Item = Result<FeatureRow<'s>>;

    fn next(&mut self) -> Option<Self::Item> {
        let depth = self.nested.depth();
        loop {
            let top = self.stack.last_mut()?;
            let cursor = match top.next() {
                Some(Ok(cursor)) => cursor,
                Some(Err(e)) => return Some(Err(e)),
                None => {
                    self.stack.pop();
                    self.ancestors.pop();
                    continue;
                },
            };

            let row = match cursor.row() {
                Ok(row) => row.clone(),
                Err(e) => return Some(Err(e)),
            };

            let level = depth - self.stack.len();
            if level == 0 {
                let rows = std::iter::once(row)
                    .chain(self.ancestors.iter().rev().cloned())
                    .collect();
                return Some(Ok(FeatureRow {
                    nested: self.nested,
                    rows,
                }));
            }

            match cursor.iterate_child_rows(self.nested.chain[level - 1]) {
                Ok(children) => {
                    self.ancestors.push(row);
                    self.stack.push(children);
                },
                Err(e) => return Some(Err(e)),
            }
        }
    }
}

/// One leaf row with its ancestor rows.
#[derive(Debug, Clone)]
pub struct FeatureRow<'s> {
    nested: &'s NestedTable<'s>,
    rows: Vec<StructData>,
}

impl FeatureRow<'_> {
    /// Rows, leaf first.
    pub fn rows(&self) -> &[StructData] {
        &self.rows
    }

    /// The row at a nesting level; 0 is the leaf.
    pub fn row(&self, level: usize) -> Option<&StructData> {
        self.rows.get(level)
    }

    /// Time coordinate.
    pub fn time(&self) -> Result<f64> {
        self.nested.time.value_f64(&self.rows)
    }

    /// Latitude.
    pub fn lat(&self) -> Result<f64> {
        self.nested.lat.value_f64(&self.rows)
    }

    /// Longitude.
    pub fn lon(&self) -> Result<f64> {
        self.nested.lon.value_f64(&self.rows)
    }

    /// Height, if the feature has a height axis and the value is not missing.
    pub fn height(&self) -> Result<Option<f64>> {
        self.present_f64(self.nested.height.as_ref())
    }

    /// Feature id, if the feature has one.
    pub fn feature_id(&self) -> Result<Option<String>> {
        self.nested
            .feature_id
            .as_ref()
            .map(|f| f.value_string(&self.rows))
            .transpose()
    }

    /// True if the time coordinate is missing.
    pub fn is_time_missing(&self) -> Result<bool> {
        self.nested.time.is_missing(&self.rows)
    }

    /// True if time, latitude or longitude is missing.
    pub fn is_missing(&self) -> Result<bool> {
        for e in [&self.nested.time, &self.nested.lat, &self.nested.lon] {
            if e.is_missing(&self.rows)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// True if the feature id is present in the layout but missing in this row.
    pub fn is_feature_missing(&self) -> Result<bool> {
        match &self.nested.feature_id {
            Some(id) => id.is_missing(&self.rows),
            None => Ok(false),
        }
    }

    /// Station metadata as text, if the feature has it.
    pub fn station_text(&self, field: StationField) -> Result<Option<String>> {
        self.nested
            .station_field(field)
            .map(|e| e.value_string(&self.rows))
            .transpose()
    }

    /// Station altitude, if the feature has one and it is not missing.
    pub fn station_alt(&self) -> Result<Option<f64>> {
        self.present_f64(self.nested.station_field(StationField::Alt))
    }

    fn present_f64(&self, extractor: Option<&CoordVarExtractor>) -> Result<Option<f64>> {
        let Some(e) = extractor else {
            return Ok(None);
        };
        let value = e.value_f64(&self.rows)?;
        Ok((!e.is_missing_value(value)).then_some(value))
    }
}
