//! NetCDF backing store.

use std::collections::BTreeMap;
use std::fmt;
use std::ops::Range;
use std::path::{Path, PathBuf};

use netcdf::types::{FloatType, IntType, NcVariableType};

use super::{AttrValue, BackingStore, DataType, Dimension, Values, VariableInfo};
use crate::error::{PointNestError, Result};
use crate::odometer::{Odometer, Slice};

/// A backing store reading from an open netCDF file.
pub struct NetcdfStore {
    path: PathBuf,
    file: netcdf::File,
}

impl fmt::Debug for NetcdfStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NetcdfStore").field("path", &self.path).finish()
    }
}

impl NetcdfStore {
    /// Open a netCDF file.
    pub fn open(path: &Path) -> Result<Self> {
        let file = netcdf::open(path).map_err(|e| {
            PointNestError::NetCdf(format!("Failed to open {}: {}", path.display(), e))
        })?;
        tracing::debug!(path = %path.display(), "opened netCDF file");
        Ok(Self {
            path: path.to_path_buf(),
            file,
        })
    }

    /// Path of the underlying file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn describe(var: &netcdf::Variable<'_>) -> Option<VariableInfo> {
        let data_type = match data_type_of(&var.vartype()) {
            Some(t) => t,
            None => {
                tracing::debug!(
                    variable = %var.name(),
                    vartype = ?var.vartype(),
                    "skipping variable of unsupported type"
                );
                return None;
            },
        };

        let dims = var
            .dimensions()
            .iter()
            .map(|d: &netcdf::Dimension<'_>| Dimension {
                name: d.name().to_string(),
                len: d.len(),
                unlimited: d.is_unlimited(),
            })
            .collect();

        let mut attributes = BTreeMap::new();
        for attr in var.attributes() {
            if let Some(value) = attr_value(&attr) {
                attributes.insert(attr.name().to_string(), value);
            }
        }

        Some(VariableInfo {
            name: var.name().to_string(),
            dims,
            data_type,
            attributes,
            members: Vec::new(),
        })
    }
}

fn data_type_of(vartype: &NcVariableType) -> Option<DataType> {
    match vartype {
        NcVariableType::Int(IntType::I8) => Some(DataType::I8),
        NcVariableType::Int(IntType::U8) => Some(DataType::U8),
        NcVariableType::Int(IntType::I16) => Some(DataType::I16),
        NcVariableType::Int(IntType::U16) => Some(DataType::U16),
        NcVariableType::Int(IntType::I32) => Some(DataType::I32),
        NcVariableType::Int(IntType::U32) => Some(DataType::U32),
        NcVariableType::Int(IntType::I64) => Some(DataType::I64),
        NcVariableType::Int(IntType::U64) => Some(DataType::U64),
        NcVariableType::Float(FloatType::F32) => Some(DataType::F32),
        NcVariableType::Float(FloatType::F64) => Some(DataType::F64),
        NcVariableType::Char => Some(DataType::Char),
        NcVariableType::String => Some(DataType::String),
        _ => None,
    }
}

fn attr_value(attr: &netcdf::Attribute<'_>) -> Option<AttrValue> {
    use netcdf::AttributeValue;

    let value = match attr.value().ok()? {
        AttributeValue::Uchar(v) => AttrValue::Number(v as f64),
        AttributeValue::Schar(v) => AttrValue::Number(v as f64),
        AttributeValue::Ushort(v) => AttrValue::Number(v as f64),
        AttributeValue::Short(v) => AttrValue::Number(v as f64),
        AttributeValue::Uint(v) => AttrValue::Number(v as f64),
        AttributeValue::Int(v) => AttrValue::Number(v as f64),
        AttributeValue::Ulonglong(v) => AttrValue::Number(v as f64),
        AttributeValue::Longlong(v) => AttrValue::Number(v as f64),
        AttributeValue::Float(v) => AttrValue::Number(v as f64),
        AttributeValue::Double(v) => AttrValue::Number(v),
        AttributeValue::Str(v) => AttrValue::Text(v),
        AttributeValue::Uchars(v) => AttrValue::Numbers(v.into_iter().map(f64::from).collect()),
        AttributeValue::Schars(v) => AttrValue::Numbers(v.into_iter().map(f64::from).collect()),
        AttributeValue::Ushorts(v) => AttrValue::Numbers(v.into_iter().map(f64::from).collect()),
        AttributeValue::Shorts(v) => AttrValue::Numbers(v.into_iter().map(f64::from).collect()),
        AttributeValue::Uints(v) => AttrValue::Numbers(v.into_iter().map(f64::from).collect()),
        AttributeValue::Ints(v) => AttrValue::Numbers(v.into_iter().map(f64::from).collect()),
        AttributeValue::Ulonglongs(v) => {
            AttrValue::Numbers(v.into_iter().map(|x| x as f64).collect())
        },
        AttributeValue::Longlongs(v) => {
            AttrValue::Numbers(v.into_iter().map(|x| x as f64).collect())
        },
        AttributeValue::Floats(v) => AttrValue::Numbers(v.into_iter().map(f64::from).collect()),
        AttributeValue::Doubles(v) => AttrValue::Numbers(v),
        AttributeValue::Strs(v) => AttrValue::Text(v.join(", ")),
    };
    Some(value)
}

// The library reads strings one element at a time.
fn read_strings(
    var: &netcdf::Variable<'_>,
    shape: &[usize],
    rows: Range<usize>,
) -> Result<Vec<String>> {
    let selection = if shape.is_empty() {
        Vec::new()
    } else {
        std::iter::once(Slice::range(rows.start, rows.len()))
            .chain(shape.iter().skip(1).map(|&len| Slice::full(len)))
            .collect()
    };
    Odometer::new(selection)?
        .map(|index| {
            var.get_string(index.as_slice()).map_err(|e| {
                PointNestError::NetCdf(format!(
                    "Failed to read string {:?} from '{}': {}",
                    index,
                    var.name(),
                    e
                ))
            })
        })
        .collect()
}

// Reads the selected extents of `$var` as `$t` and wraps them in `Values::$variant`.
macro_rules! read_as {
    ($var:expr, $extents:expr, $t:ty, $variant:ident) => {{
        let values: Vec<$t> = $var.get_values::<$t, _>($extents).map_err(|e| {
            PointNestError::NetCdf(format!(
                "Failed to read {} data from '{}': {}",
                stringify!($t),
                $var.name(),
                e
            ))
        })?;
        Values::$variant(values)
    }};
}

impl BackingStore for NetcdfStore {
    fn dimensions(&self) -> Vec<Dimension> {
        self.file
            .dimensions()
            .map(|d| Dimension {
                name: d.name().to_string(),
                len: d.len(),
                unlimited: d.is_unlimited(),
            })
            .collect()
    }

    fn variables(&self) -> Vec<VariableInfo> {
        self.file.variables().filter_map(|v| Self::describe(&v)).collect()
    }

    fn variable(&self, name: &str) -> Option<VariableInfo> {
        self.file.variable(name).and_then(|v| Self::describe(&v))
    }

    fn read_raw(&self, variable: &str, rows: Range<usize>) -> Result<Values> {
        let var = self
            .file
            .variable(variable)
            .ok_or_else(|| PointNestError::variable_not_found(variable))?;

        let shape: Vec<usize> = var.dimensions().iter().map(|d| d.len()).collect();
        let outer_len = shape.first().copied().unwrap_or(1);
        if rows.start > rows.end || rows.end > outer_len {
            let bad = if rows.start > rows.end { rows.start } else { rows.end - 1 };
            return Err(PointNestError::out_of_bounds(variable, bad, outer_len));
        }

        let extents: Vec<netcdf::Extent> = if shape.is_empty() {
            Vec::new()
        } else {
            std::iter::once(rows.clone())
                .chain(shape.iter().skip(1).map(|&len| 0..len))
                .map(netcdf::Extent::from)
                .collect()
        };
        tracing::trace!(variable, start = rows.start, end = rows.end, "netCDF read");

        let values = match var.vartype() {
            NcVariableType::Int(IntType::I8) => read_as!(var, extents, i8, I8),
            NcVariableType::Int(IntType::U8) => read_as!(var, extents, u8, U8),
            NcVariableType::Int(IntType::I16) => read_as!(var, extents, i16, I16),
            NcVariableType::Int(IntType::U16) => read_as!(var, extents, u16, U16),
            NcVariableType::Int(IntType::I32) => read_as!(var, extents, i32, I32),
            NcVariableType::Int(IntType::U32) => read_as!(var, extents, u32, U32),
            NcVariableType::Int(IntType::I64) => read_as!(var, extents, i64, I64),
            NcVariableType::Int(IntType::U64) => read_as!(var, extents, u64, U64),
            NcVariableType::Float(FloatType::F32) => read_as!(var, extents, f32, F32),
            NcVariableType::Float(FloatType::F64) => read_as!(var, extents, f64, F64),
            NcVariableType::Char => {
                let bytes = var.get_raw_values(extents).map_err(|e| {
                    PointNestError::NetCdf(format!(
                        "Failed to read char data from '{}': {}",
                        variable, e
                    ))
                })?;
                Values::Char(bytes)
            },
            NcVariableType::String => Values::Str(read_strings(&var, &shape, rows)?),
            other => {
                return Err(PointNestError::NetCdf(format!(
                    "Unsupported variable type: {:?}",
                    other
                )))
            },
        };
        Ok(values)
    }
}
