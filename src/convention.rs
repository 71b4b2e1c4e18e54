//! Convention configuration.
//!
//! A convention names the marker variables that link a parent table to a
//! child table, and optionally the dimensions of both. Omitted names simply
//! disable the join kinds that need them.

use std::path::Path;

use serde::Deserialize;

use crate::error::Result;

/// Names of marker variables and dimensions for one parent/child relationship.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConventionConfig {
    /// Label used in logs.
    pub name: Option<String>,
    /// Parent variable holding the first child row.
    pub first_child: Option<String>,
    /// Child variable holding the next row of the same parent.
    pub next_child: Option<String>,
    /// Parent variable holding the last child row.
    pub last_child: Option<String>,
    /// Child variable holding the previous row of the same parent.
    pub prev_child: Option<String>,
    /// Parent variable holding the number of child rows.
    pub num_children: Option<String>,
    /// Child variable holding the row index of its parent.
    pub parent_index: Option<String>,
    /// Parent (station) dimension.
    pub station_dim: Option<String>,
    /// Child (observation) dimension.
    pub obs_dim: Option<String>,
    /// Station description variable.
    pub station_desc: Option<String>,
    /// Station WMO id variable.
    pub wmo_id: Option<String>,
    /// Station altitude variable.
    pub station_alt: Option<String>,
}

/// Station metadata that a convention can name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StationField {
    /// Free-text description.
    Desc,
    /// WMO station number.
    WmoId,
    /// Altitude of the station.
    Alt,
}

impl StationField {
    /// Every station field.
    pub const ALL: [StationField; 3] = [StationField::Desc, StationField::WmoId, StationField::Alt];
}

impl ConventionConfig {
    /// Create an empty convention with a label.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// The classic station/record layout with linked and counted children.
    pub fn linked_station_obs() -> Self {
        Self {
            name: Some("linked-station-obs".to_string()),
            first_child: Some("firstChild".to_string()),
            next_child: Some("nextChild".to_string()),
            last_child: Some("lastChild".to_string()),
            prev_child: Some("prevChild".to_string()),
            num_children: Some("numChildren".to_string()),
            parent_index: Some("parent_index".to_string()),
            station_dim: Some("station".to_string()),
            obs_dim: Some("record".to_string()),
            station_desc: Some("station_description".to_string()),
            wmo_id: Some("wmo_id".to_string()),
            station_alt: Some("altitude".to_string()),
        }
    }

    /// Set the first-child variable.
    pub fn first_child(mut self, name: impl Into<String>) -> Self {
        self.first_child = Some(name.into());
        self
    }

    /// Set the next-child variable.
    pub fn next_child(mut self, name: impl Into<String>) -> Self {
        self.next_child = Some(name.into());
        self
    }

    /// Set the last-child variable.
    pub fn last_child(mut self, name: impl Into<String>) -> Self {
        self.last_child = Some(name.into());
        self
    }

    /// Set the previous-child variable.
    pub fn prev_child(mut self, name: impl Into<String>) -> Self {
        self.prev_child = Some(name.into());
        self
    }

    /// Set the child-count variable.
    pub fn num_children(mut self, name: impl Into<String>) -> Self {
        self.num_children = Some(name.into());
        self
    }

    /// Set the parent-index variable.
    pub fn parent_index(mut self, name: impl Into<String>) -> Self {
        self.parent_index = Some(name.into());
        self
    }

    /// Set the parent dimension.
    pub fn station_dim(mut self, name: impl Into<String>) -> Self {
        self.station_dim = Some(name.into());
        self
    }

    /// Set the child dimension.
    pub fn obs_dim(mut self, name: impl Into<String>) -> Self {
        self.obs_dim = Some(name.into());
        self
    }

    /// Set the variable holding one kind of station metadata.
    pub fn station_field(mut self, field: StationField, name: impl Into<String>) -> Self {
        let name = Some(name.into());
        match field {
            StationField::Desc => self.station_desc = name,
            StationField::WmoId => self.wmo_id = name,
            StationField::Alt => self.station_alt = name,
        }
        self
    }

    /// The variable named for one kind of station metadata.
    pub fn station_variable(&self, field: StationField) -> Option<&str> {
        match field {
            StationField::Desc => self.station_desc.as_deref(),
            StationField::WmoId => self.wmo_id.as_deref(),
            StationField::Alt => self.station_alt.as_deref(),
        }
    }

    /// Label for logs.
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or("unnamed")
    }

    /// Parse a single convention from TOML.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }
}

/// Several conventions, one per parent/child relationship.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ConventionSet {
    /// The conventions, applied in order.
    #[serde(default, rename = "convention")]
    pub conventions: Vec<ConventionConfig>,
}

impl ConventionSet {
    /// Parse `[[convention]]` tables from TOML.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Load conventions from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let set = Self::from_toml_str(&text)?;
        tracing::debug!(
            path = %path.display(),
            count = set.conventions.len(),
            "loaded conventions"
        );
        Ok(set)
    }
}
