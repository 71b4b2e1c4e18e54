//! Pointnest - nested point-feature tables over scientific datasets.
//!
//! Pointnest groups the variables of a dataset into tables, one per outer
//! dimension, links the tables into a forest using convention marker
//! variables, and flattens each leaf with its ancestors into a feature whose
//! rows can be read lazily.
//!
//! # Features
//!
//! - Contiguous, linked-list, parent-index and nested-structure joins
//! - Coordinate search from the leaf outwards, closest table wins
//! - Point, station and station-profile classification
//! - Scheme-dispatching cursors over atomic data, rows and row arrays
//! - NetCDF and in-memory backing stores
//!
//! # Example
//!
//! ```ignore
//! use pointnest::{ConventionConfig, NetcdfStore, TableGraph};
//! use std::path::Path;
//!
//! let store = NetcdfStore::open(Path::new("stations.nc"))?;
//! let graph = TableGraph::build(&store, &[ConventionConfig::linked_station_obs()])?;
//!
//! for feature in pointnest::resolve_nested_tables(&graph)? {
//!     for row in feature.rows(&store)? {
//!         let row = row?;
//!         println!("{} {} {}", row.time()?, row.lat()?, row.lon()?);
//!     }
//! }
//! ```

#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub
)]
#![deny(unsafe_code)]

pub mod axis;
pub mod convention;
pub mod cursor;
pub mod data;
pub mod error;
pub mod nested;
pub mod odometer;
mod report;
pub mod table;

pub use axis::{classify, AxisType};
pub use convention::{ConventionConfig, ConventionSet, StationField};
pub use cursor::{ChildRows, DataCursor, ReadResult, Scheme};
pub use data::{BackingStore, MemoryStore, NetcdfStore};
pub use error::{ErrorKind, PointNestError, Result};
pub use nested::{resolve_nested_tables, FeatureRow, FeatureType, NestedTable};
pub use odometer::{Odometer, Slice};
pub use table::{build_tables, Join, JoinKind, Table, TableGraph, TableId};
