//! Coordinate axis classification.
//!
//! Tags a variable with the role it plays as a coordinate, using, in order,
//! an explicit `_CoordinateAxisType` attribute, the CF `axis` attribute, the
//! `standard_name`, the units, and finally the variable name.

use std::fmt;
use std::str::FromStr;

use crate::data::VariableInfo;

/// Attribute naming the axis role explicitly.
pub const COORDINATE_AXIS_TYPE: &str = "_CoordinateAxisType";

/// Semantic role of a coordinate variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AxisType {
    /// Time of the observation.
    Time,
    /// Latitude.
    Lat,
    /// Longitude.
    Lon,
    /// Height or altitude.
    Height,
    /// Projection x coordinate.
    GeoX,
    /// Projection y coordinate.
    GeoY,
    /// Vertical coordinate of unknown kind.
    GeoZ,
    /// Pressure used as a vertical coordinate.
    Pressure,
    /// Radial azimuth angle.
    RadialAzimuth,
    /// Radial elevation angle.
    RadialElevation,
    /// Radial distance.
    RadialDistance,
    /// Ensemble member.
    Ensemble,
    /// Model run time.
    RunTime,
}

impl AxisType {
    /// All axis types.
    pub const ALL: [AxisType; 13] = [
        AxisType::Time,
        AxisType::Lat,
        AxisType::Lon,
        AxisType::Height,
        AxisType::GeoX,
        AxisType::GeoY,
        AxisType::GeoZ,
        AxisType::Pressure,
        AxisType::RadialAzimuth,
        AxisType::RadialElevation,
        AxisType::RadialDistance,
        AxisType::Ensemble,
        AxisType::RunTime,
    ];

    /// The name used in `_CoordinateAxisType` attributes.
    pub fn name(self) -> &'static str {
        match self {
            AxisType::Time => "Time",
            AxisType::Lat => "Lat",
            AxisType::Lon => "Lon",
            AxisType::Height => "Height",
            AxisType::GeoX => "GeoX",
            AxisType::GeoY => "GeoY",
            AxisType::GeoZ => "GeoZ",
            AxisType::Pressure => "Pressure",
            AxisType::RadialAzimuth => "RadialAzimuth",
            AxisType::RadialElevation => "RadialElevation",
            AxisType::RadialDistance => "RadialDistance",
            AxisType::Ensemble => "Ensemble",
            AxisType::RunTime => "RunTime",
        }
    }
}

impl fmt::Display for AxisType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for AxisType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        AxisType::ALL
            .iter()
            .copied()
            .find(|a| a.name().eq_ignore_ascii_case(s))
            .ok_or(())
    }
}

/// The axis role a variable declares through `_CoordinateAxisType`, if any.
pub fn explicit_axis(var: &VariableInfo) -> Option<AxisType> {
    var.attribute_str(COORDINATE_AXIS_TYPE)
        .and_then(|s| s.parse().ok())
}

/// Classify a variable as a coordinate axis.
///
/// Returns `None` for variables that are not recognisably coordinates;
/// that is not an error.
pub fn classify(var: &VariableInfo) -> Option<AxisType> {
    if var.data_type.is_structured() {
        return None;
    }
    explicit_axis(var)
        .or_else(|| from_axis_attribute(var))
        .or_else(|| from_standard_name(var))
        .or_else(|| from_units(var))
        .or_else(|| from_name(&var.name))
}

fn from_axis_attribute(var: &VariableInfo) -> Option<AxisType> {
    let axis = var.attribute_str("axis")?.trim().to_ascii_uppercase();
    let units = var.units().map(str::trim).unwrap_or("");
    match axis.as_str() {
        "T" => Some(AxisType::Time),
        "X" if is_lon_units(units) => Some(AxisType::Lon),
        "X" => Some(AxisType::GeoX),
        "Y" if is_lat_units(units) => Some(AxisType::Lat),
        "Y" => Some(AxisType::GeoY),
        "Z" if is_pressure_units(units) => Some(AxisType::Pressure),
        "Z" if var.attribute_str("positive").is_some() || is_length_units(units) => {
            Some(AxisType::Height)
        },
        "Z" => Some(AxisType::GeoZ),
        _ => None,
    }
}

fn from_standard_name(var: &VariableInfo) -> Option<AxisType> {
    match var.attribute_str("standard_name")?.trim() {
        "time" => Some(AxisType::Time),
        "latitude" => Some(AxisType::Lat),
        "longitude" => Some(AxisType::Lon),
        "altitude" | "height" | "height_above_mean_sea_level" | "surface_altitude" => {
            Some(AxisType::Height)
        },
        "air_pressure" => Some(AxisType::Pressure),
        "projection_x_coordinate" => Some(AxisType::GeoX),
        "projection_y_coordinate" => Some(AxisType::GeoY),
        "forecast_reference_time" => Some(AxisType::RunTime),
        "realization" => Some(AxisType::Ensemble),
        _ => None,
    }
}

fn from_units(var: &VariableInfo) -> Option<AxisType> {
    let units = var.units()?.trim();
    if is_lat_units(units) {
        Some(AxisType::Lat)
    } else if is_lon_units(units) {
        Some(AxisType::Lon)
    } else if units.to_ascii_lowercase().contains(" since ") {
        Some(AxisType::Time)
    } else if var.attribute_str("positive").is_some() {
        if is_pressure_units(units) {
            Some(AxisType::Pressure)
        } else {
            Some(AxisType::Height)
        }
    } else {
        None
    }
}

fn from_name(name: &str) -> Option<AxisType> {
    match name.to_ascii_lowercase().as_str() {
        "time" => Some(AxisType::Time),
        "lat" | "latitude" => Some(AxisType::Lat),
        "lon" | "longitude" => Some(AxisType::Lon),
        "alt" | "altitude" | "height" | "elevation" | "z" => Some(AxisType::Height),
        _ => None,
    }
}

fn is_lat_units(units: &str) -> bool {
    matches!(
        units,
        "degrees_north" | "degree_north" | "degree_N" | "degrees_N" | "degreeN" | "degreesN"
    )
}

fn is_lon_units(units: &str) -> bool {
    matches!(
        units,
        "degrees_east" | "degree_east" | "degree_E" | "degrees_E" | "degreeE" | "degreesE"
    )
}

fn is_pressure_units(units: &str) -> bool {
    matches!(
        units.to_ascii_lowercase().as_str(),
        "pa" | "hpa" | "kpa" | "mb" | "mbar" | "millibar" | "millibars" | "bar" | "dbar" | "decibar"
    )
}

fn is_length_units(units: &str) -> bool {
    matches!(
        units.to_ascii_lowercase().as_str(),
        "m" | "meter" | "meters" | "metre" | "metres" | "km" | "ft" | "feet"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{DataType, Dimension};

    fn var(name: &str) -> VariableInfo {
        VariableInfo::new(name, DataType::F64, vec![Dimension::new("obs", 4)])
    }

    #[test]
    fn explicit_attribute_wins() {
        let v = var("lat").with_attribute(COORDINATE_AXIS_TYPE, "Height");
        assert_eq!(classify(&v), Some(AxisType::Height));
    }

    #[test]
    fn units_identify_geolocation() {
        assert_eq!(
            classify(&var("y").with_attribute("units", "degrees_north")),
            Some(AxisType::Lat)
        );
        assert_eq!(
            classify(&var("x").with_attribute("units", "degree_east")),
            Some(AxisType::Lon)
        );
        assert_eq!(
            classify(&var("t").with_attribute("units", "seconds since 1970-01-01")),
            Some(AxisType::Time)
        );
        assert_eq!(
            classify(&var("p").with_attribute("units", "hPa").with_attribute("positive", "down")),
            Some(AxisType::Pressure)
        );
    }

    #[test]
    fn cf_axis_attribute() {
        let k = var("k").with_attribute("axis", "Z").with_attribute("units", "m");
        assert_eq!(classify(&k), Some(AxisType::Height));
        assert_eq!(classify(&var("xc").with_attribute("axis", "X")), Some(AxisType::GeoX));
    }

    #[test]
    fn unrecognised_is_none() {
        assert_eq!(classify(&var("temperature").with_attribute("units", "K")), None);
        let seq = VariableInfo::new("time", DataType::Sequence, vec![]);
        assert_eq!(classify(&seq), None);
    }

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!("geox".parse::<AxisType>(), Ok(AxisType::GeoX));
        assert!("Depth".parse::<AxisType>().is_err());
    }
}
