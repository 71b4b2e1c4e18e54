//! Data access and representation.
//!
//! This module defines what the rest of the crate needs from a dataset:
//! dimensions, variable descriptors, typed buffers and a [`BackingStore`]
//! to read them from. Two stores are provided, one over netCDF files and one
//! over in-memory data.

mod memory;
mod reader;
mod store;
mod values;
mod variable;

pub use memory::MemoryStore;
pub use reader::NetcdfStore;
pub use store::BackingStore;
pub use values::{StructData, Values};
pub use variable::{AttrValue, DataType, Dimension, VariableInfo};
