//! Typed flat buffers and structure rows.

use std::ops::Range;
use std::sync::Arc;

use ndarray::{ArrayD, IxDyn};

use super::{DataType, VariableInfo};
use crate::error::{PointNestError, Result};

/// A flat, row-major buffer of values of one type.
#[derive(Debug, Clone, PartialEq)]
pub enum Values {
    /// Signed 8-bit integers.
    I8(Vec<i8>),
    /// Unsigned 8-bit integers.
    U8(Vec<u8>),
    /// Signed 16-bit integers.
    I16(Vec<i16>),
    /// Unsigned 16-bit integers.
    U16(Vec<u16>),
    /// Signed 32-bit integers.
    I32(Vec<i32>),
    /// Unsigned 32-bit integers.
    U32(Vec<u32>),
    /// Signed 64-bit integers.
    I64(Vec<i64>),
    /// Unsigned 64-bit integers.
    U64(Vec<u64>),
    /// 32-bit floats.
    F32(Vec<f32>),
    /// 64-bit floats.
    F64(Vec<f64>),
    /// Characters, one byte each.
    Char(Vec<u8>),
    /// Strings.
    Str(Vec<String>),
    /// Structure rows.
    Struct(Vec<StructData>),
    /// Sequences, each a variable-length list of rows.
    Seq(Vec<Vec<StructData>>),
}

// Runs `$body` with `$v` bound to the inner vector, whatever its type.
macro_rules! with_vec {
    ($values:expr, $v:ident => $body:expr) => {
        match $values {
            Values::I8($v) => $body,
            Values::U8($v) => $body,
            Values::I16($v) => $body,
            Values::U16($v) => $body,
            Values::I32($v) => $body,
            Values::U32($v) => $body,
            Values::I64($v) => $body,
            Values::U64($v) => $body,
            Values::F32($v) => $body,
            Values::F64($v) => $body,
            Values::Char($v) => $body,
            Values::Str($v) => $body,
            Values::Struct($v) => $body,
            Values::Seq($v) => $body,
        }
    };
}

// Like `with_vec!`, but wraps the result back into the same variant.
macro_rules! map_vec {
    ($values:expr, $v:ident => $body:expr) => {
        match $values {
            Values::I8($v) => Values::I8($body),
            Values::U8($v) => Values::U8($body),
            Values::I16($v) => Values::I16($body),
            Values::U16($v) => Values::U16($body),
            Values::I32($v) => Values::I32($body),
            Values::U32($v) => Values::U32($body),
            Values::I64($v) => Values::I64($body),
            Values::U64($v) => Values::U64($body),
            Values::F32($v) => Values::F32($body),
            Values::F64($v) => Values::F64($body),
            Values::Char($v) => Values::Char($body),
            Values::Str($v) => Values::Str($body),
            Values::Struct($v) => Values::Struct($body),
            Values::Seq($v) => Values::Seq($body),
        }
    };
}

impl Values {
    /// Number of elements.
    pub fn len(&self) -> usize {
        with_vec!(self, v => v.len())
    }

    /// True if there are no elements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Element type of the buffer.
    pub fn data_type(&self) -> DataType {
        match self {
            Values::I8(_) => DataType::I8,
            Values::U8(_) => DataType::U8,
            Values::I16(_) => DataType::I16,
            Values::U16(_) => DataType::U16,
            Values::I32(_) => DataType::I32,
            Values::U32(_) => DataType::U32,
            Values::I64(_) => DataType::I64,
            Values::U64(_) => DataType::U64,
            Values::F32(_) => DataType::F32,
            Values::F64(_) => DataType::F64,
            Values::Char(_) => DataType::Char,
            Values::Str(_) => DataType::String,
            Values::Struct(_) => DataType::Structure,
            Values::Seq(_) => DataType::Sequence,
        }
    }

    /// Copy the elements at `offsets`, in order, into a new buffer.
    pub fn gather(&self, offsets: &[usize]) -> Result<Values> {
        let len = self.len();
        if let Some(&bad) = offsets.iter().find(|&&o| o >= len) {
            return Err(PointNestError::out_of_bounds("buffer", bad, len));
        }
        Ok(map_vec!(self, v => offsets.iter().map(|&o| v[o].clone()).collect()))
    }

    /// Copy a contiguous range of elements.
    pub fn slice(&self, range: Range<usize>) -> Result<Values> {
        let len = self.len();
        if range.start > range.end || range.end > len {
            return Err(PointNestError::out_of_bounds("buffer", range.end, len));
        }
        Ok(map_vec!(self, v => v[range.clone()].to_vec()))
    }

    /// Element `i` as a float, for numeric buffers.
    pub fn get_f64(&self, i: usize) -> Option<f64> {
        match self {
            Values::I8(v) => v.get(i).map(|&x| x as f64),
            Values::U8(v) => v.get(i).map(|&x| x as f64),
            Values::I16(v) => v.get(i).map(|&x| x as f64),
            Values::U16(v) => v.get(i).map(|&x| x as f64),
            Values::I32(v) => v.get(i).map(|&x| x as f64),
            Values::U32(v) => v.get(i).map(|&x| x as f64),
            Values::I64(v) => v.get(i).map(|&x| x as f64),
            Values::U64(v) => v.get(i).map(|&x| x as f64),
            Values::F32(v) => v.get(i).map(|&x| x as f64),
            Values::F64(v) => v.get(i).copied(),
            Values::Char(_) | Values::Str(_) | Values::Struct(_) | Values::Seq(_) => None,
        }
    }

    /// Element `i` as an integer, for integer buffers and integral floats.
    pub fn get_i64(&self, i: usize) -> Option<i64> {
        match self {
            Values::I8(v) => v.get(i).map(|&x| x as i64),
            Values::U8(v) => v.get(i).map(|&x| x as i64),
            Values::I16(v) => v.get(i).map(|&x| x as i64),
            Values::U16(v) => v.get(i).map(|&x| x as i64),
            Values::I32(v) => v.get(i).map(|&x| x as i64),
            Values::U32(v) => v.get(i).map(|&x| x as i64),
            Values::I64(v) => v.get(i).copied(),
            Values::U64(v) => v.get(i).and_then(|&x| i64::try_from(x).ok()),
            Values::F32(_) | Values::F64(_) => self
                .get_f64(i)
                .filter(|x| x.fract() == 0.0 && x.is_finite())
                .map(|x| x as i64),
            Values::Char(_) | Values::Str(_) | Values::Struct(_) | Values::Seq(_) => None,
        }
    }

    /// Element `i` as text. A char buffer is read as one string.
    pub fn get_string(&self, i: usize) -> Option<String> {
        match self {
            Values::Str(v) => v.get(i).cloned(),
            Values::Char(v) => {
                let end = v.iter().position(|&c| c == 0).unwrap_or(v.len());
                Some(String::from_utf8_lossy(&v[..end]).into_owned())
            },
            _ => None,
        }
    }

    /// All rows held by a structure or sequence buffer, in element order.
    pub fn records(&self) -> Option<Vec<StructData>> {
        match self {
            Values::Struct(rows) => Some(rows.clone()),
            Values::Seq(lists) => Some(lists.iter().flatten().cloned().collect()),
            _ => None,
        }
    }

    /// All elements as floats, for numeric buffers.
    pub fn to_f64_vec(&self) -> Option<Vec<f64>> {
        (0..self.len()).map(|i| self.get_f64(i)).collect()
    }

    /// Reshape a numeric buffer into an n-dimensional array.
    pub fn to_array(&self, shape: &[usize]) -> Result<ArrayD<f64>> {
        let values = self.to_f64_vec().ok_or_else(|| PointNestError::TypeMismatch {
            name: "buffer".to_string(),
            expected: "numeric".to_string(),
            found: self.data_type().to_string(),
        })?;
        ArrayD::from_shape_vec(IxDyn(shape), values)
            .map_err(|e| PointNestError::InvalidSlice(format!("Invalid shape/data size: {}", e)))
    }
}

/// One row of a table or structure: member descriptors plus one buffer per member.
#[derive(Debug, Clone, PartialEq)]
pub struct StructData {
    members: Arc<[VariableInfo]>,
    fields: Vec<Values>,
}

impl StructData {
    /// Create a row. `fields[i]` holds the data of `members[i]`.
    pub fn new(members: Arc<[VariableInfo]>, fields: Vec<Values>) -> Self {
        debug_assert_eq!(members.len(), fields.len());
        Self { members, fields }
    }

    /// Member descriptors.
    pub fn members(&self) -> &[VariableInfo] {
        &self.members
    }

    /// Shared handle to the member descriptors.
    pub fn members_arc(&self) -> Arc<[VariableInfo]> {
        Arc::clone(&self.members)
    }

    /// Position of a member.
    pub fn member_index(&self, name: &str) -> Option<usize> {
        self.members.iter().position(|m| m.name == name)
    }

    /// Member descriptor and data at a position.
    pub fn field_at(&self, index: usize) -> Option<(&VariableInfo, &Values)> {
        Some((self.members.get(index)?, self.fields.get(index)?))
    }

    /// Data of a member by name.
    pub fn field(&self, name: &str) -> Option<&Values> {
        self.member_index(name).and_then(|i| self.fields.get(i))
    }

    /// First element of a numeric member, as a float.
    pub fn scalar_f64(&self, name: &str) -> Result<f64> {
        let values = self
            .field(name)
            .ok_or_else(|| PointNestError::field_not_found(name))?;
        values.get_f64(0).ok_or_else(|| PointNestError::TypeMismatch {
            name: name.to_string(),
            expected: "numeric".to_string(),
            found: values.data_type().to_string(),
        })
    }

    /// First element of an integer member.
    pub fn scalar_i64(&self, name: &str) -> Result<i64> {
        let values = self
            .field(name)
            .ok_or_else(|| PointNestError::field_not_found(name))?;
        values.get_i64(0).ok_or_else(|| PointNestError::TypeMismatch {
            name: name.to_string(),
            expected: "integer".to_string(),
            found: values.data_type().to_string(),
        })
    }
}
