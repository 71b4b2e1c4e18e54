//! Dimension and variable descriptors.

use std::collections::BTreeMap;
use std::fmt;

/// A named axis of variation in a dataset.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Dimension {
    /// Dimension name.
    pub name: String,
    /// Current length.
    pub len: usize,
    /// Whether the dimension can grow (record or variable-length dimension).
    pub unlimited: bool,
}

impl Dimension {
    /// Create a fixed-length dimension.
    pub fn new(name: impl Into<String>, len: usize) -> Self {
        Self {
            name: name.into(),
            len,
            unlimited: false,
        }
    }

    /// Create an unlimited dimension with its current length.
    pub fn unlimited(name: impl Into<String>, len: usize) -> Self {
        Self {
            name: name.into(),
            len,
            unlimited: true,
        }
    }
}

/// Element type of a variable or structure member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    /// Signed 8-bit integer.
    I8,
    /// Unsigned 8-bit integer.
    U8,
    /// Signed 16-bit integer.
    I16,
    /// Unsigned 16-bit integer.
    U16,
    /// Signed 32-bit integer.
    I32,
    /// Unsigned 32-bit integer.
    U32,
    /// Signed 64-bit integer.
    I64,
    /// Unsigned 64-bit integer.
    U64,
    /// 32-bit float.
    F32,
    /// 64-bit float.
    F64,
    /// Single character.
    Char,
    /// Variable-length string.
    String,
    /// Fixed-shape record with named members.
    Structure,
    /// Variable-length list of records with named members.
    Sequence,
}

impl DataType {
    /// True for structure and sequence types.
    pub fn is_structured(self) -> bool {
        matches!(self, DataType::Structure | DataType::Sequence)
    }

    /// Lower-case type name.
    pub fn name(self) -> &'static str {
        match self {
            DataType::I8 => "i8",
            DataType::U8 => "u8",
            DataType::I16 => "i16",
            DataType::U16 => "u16",
            DataType::I32 => "i32",
            DataType::U32 => "u32",
            DataType::I64 => "i64",
            DataType::U64 => "u64",
            DataType::F32 => "f32",
            DataType::F64 => "f64",
            DataType::Char => "char",
            DataType::String => "string",
            DataType::Structure => "structure",
            DataType::Sequence => "sequence",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Attribute value, reduced to text or numbers.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    /// Text attribute.
    Text(String),
    /// Single numeric attribute.
    Number(f64),
    /// Numeric array attribute.
    Numbers(Vec<f64>),
}

impl AttrValue {
    /// The text, if this is a text attribute.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Every number, empty for text.
    pub fn as_f64s(&self) -> &[f64] {
        match self {
            AttrValue::Number(v) => std::slice::from_ref(v),
            AttrValue::Numbers(v) => v,
            AttrValue::Text(_) => &[],
        }
    }

    /// The first number, if this is numeric.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttrValue::Number(v) => Some(*v),
            AttrValue::Numbers(v) => v.first().copied(),
            AttrValue::Text(_) => None,
        }
    }
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrValue::Text(s) => f.write_str(s),
            AttrValue::Number(v) => write!(f, "{}", v),
            AttrValue::Numbers(v) => write!(f, "{:?}", v),
        }
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        AttrValue::Text(value.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        AttrValue::Text(value)
    }
}

impl From<f64> for AttrValue {
    fn from(value: f64) -> Self {
        AttrValue::Number(value)
    }
}

/// Description of a variable or of a structure member.
///
/// For a member, `dims` holds only the member's own shape; the outer
/// dimension belongs to the enclosing table.
#[derive(Debug, Clone, PartialEq)]
pub struct VariableInfo {
    /// Short name.
    pub name: String,
    /// Dimensions, outermost first.
    pub dims: Vec<Dimension>,
    /// Element type.
    pub data_type: DataType,
    /// Attributes by name.
    pub attributes: BTreeMap<String, AttrValue>,
    /// Members, for structure and sequence types.
    pub members: Vec<VariableInfo>,
}

impl VariableInfo {
    /// Create a variable without attributes or members.
    pub fn new(name: impl Into<String>, data_type: DataType, dims: Vec<Dimension>) -> Self {
        Self {
            name: name.into(),
            dims,
            data_type,
            attributes: BTreeMap::new(),
            members: Vec::new(),
        }
    }

    /// Add an attribute.
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Set the members of a structure or sequence.
    pub fn with_members(mut self, members: Vec<VariableInfo>) -> Self {
        self.members = members;
        self
    }

    /// Number of dimensions.
    pub fn rank(&self) -> usize {
        self.dims.len()
    }

    /// Dimension lengths.
    pub fn shape(&self) -> Vec<usize> {
        self.dims.iter().map(|d| d.len).collect()
    }

    /// Number of elements in the whole variable.
    pub fn element_count(&self) -> usize {
        self.dims.iter().map(|d| d.len).product()
    }

    /// The outer dimension, if any.
    pub fn first_dimension(&self) -> Option<&Dimension> {
        self.dims.first()
    }

    /// Look up an attribute.
    pub fn attribute(&self, name: &str) -> Option<&AttrValue> {
        self.attributes.get(name)
    }

    /// Look up a text attribute.
    pub fn attribute_str(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).and_then(AttrValue::as_str)
    }

    /// The units attribute.
    pub fn units(&self) -> Option<&str> {
        self.attribute_str("units")
    }

    /// This variable as seen from inside one row of its outer dimension.
    pub fn row_member(&self) -> VariableInfo {
        let mut member = self.clone();
        if !member.dims.is_empty() {
            member.dims.remove(0);
        }
        member
    }
}
