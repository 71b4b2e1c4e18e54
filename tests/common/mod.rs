//! Datasets shared by the integration tests.

#![allow(dead_code)]

use pointnest::data::{DataType, Dimension, MemoryStore, Values, VariableInfo};
use pointnest::ConventionConfig;

pub fn var(name: &str, data_type: DataType, dims: &[&Dimension]) -> VariableInfo {
    VariableInfo::new(name, data_type, dims.iter().map(|&d| d.clone()).collect())
}

pub fn lat(name: &str, dim: &Dimension) -> VariableInfo {
    var(name, DataType::F64, &[dim]).with_attribute("units", "degrees_north")
}

pub fn lon(name: &str, dim: &Dimension) -> VariableInfo {
    var(name, DataType::F64, &[dim]).with_attribute("units", "degrees_east")
}

pub fn time(name: &str, dim: &Dimension) -> VariableInfo {
    var(name, DataType::F64, &[dim]).with_attribute("units", "seconds since 1970-01-01")
}

pub fn index(name: &str, dim: &Dimension) -> VariableInfo {
    var(name, DataType::I32, &[dim])
}

/// Two stations over twenty observations linked through `next`.
///
/// Station 0 owns rows 10, 12, 15; station 1 owns rows 0, 1, 2.
pub fn linked_stations() -> MemoryStore {
    linked_stations_with(|next| {
        next[10] = 12;
        next[12] = 15;
        next[0] = 1;
        next[1] = 2;
    })
}

/// Like [`linked_stations`] but with the `next` links edited by `edit`.
pub fn linked_stations_with(edit: impl FnOnce(&mut Vec<i32>)) -> MemoryStore {
    let station = Dimension::new("station", 2);
    let obs = Dimension::unlimited("obs", 20);
    let mut next = vec![-1; 20];
    edit(&mut next);

    let mut store = MemoryStore::new();
    store.add_dimension(station.clone()).add_dimension(obs.clone());
    store
        .add_variable(lat("lat", &station), Values::F64(vec![40.0, 41.0]))
        .unwrap()
        .add_variable(lon("lon", &station), Values::F64(vec![-105.0, -104.0]))
        .unwrap()
        .add_variable(index("firstChild", &station), Values::I32(vec![10, 0]))
        .unwrap()
        .add_variable(time("time", &obs), Values::F64((0..20).map(f64::from).collect()))
        .unwrap()
        .add_variable(index("next", &obs), Values::I32(next))
        .unwrap()
        .add_variable(
            var("temp", DataType::F32, &[&obs]),
            Values::F32((0..20).map(|i| 270.0 + i as f32).collect()),
        )
        .unwrap();
    store
}

pub fn linked_convention() -> ConventionConfig {
    ConventionConfig::new("linked")
        .first_child("firstChild")
        .next_child("next")
        .station_dim("station")
        .obs_dim("obs")
}

/// Two stations over five observations, with row counts `[2, 3]`.
pub fn counted_stations() -> MemoryStore {
    let station = Dimension::new("station", 2);
    let obs = Dimension::new("obs", 5);

    let mut store = MemoryStore::new();
    store.add_dimension(station.clone()).add_dimension(obs.clone());
    store
        .add_variable(lat("lat", &station), Values::F64(vec![40.0, 41.0]))
        .unwrap()
        .add_variable(lon("lon", &station), Values::F64(vec![-105.0, -104.0]))
        .unwrap()
        .add_variable(index("rowSize", &station), Values::I32(vec![2, 3]))
        .unwrap()
        .add_variable(index("firstObs", &station), Values::I32(vec![3, 0]))
        .unwrap()
        .add_variable(index("stationIndex", &obs), Values::I32(vec![1, 0, 1, -1, 0]))
        .unwrap()
        .add_variable(time("time", &obs), Values::F64(vec![0.0, 1.0, 2.0, 3.0, 4.0]))
        .unwrap();
    store
}

/// Stations over profiles over observations, joined by counts.
///
/// Latitude is on both the stations and the observations.
pub fn station_profiles() -> MemoryStore {
    let station = Dimension::new("station", 2);
    let profile = Dimension::new("profile", 3);
    let obs = Dimension::new("obs", 6);

    let mut store = MemoryStore::new();
    store
        .add_dimension(station.clone())
        .add_dimension(profile.clone())
        .add_dimension(obs.clone());
    store
        .add_variable(lat("station_lat", &station), Values::F64(vec![40.0, 41.0]))
        .unwrap()
        .add_variable(lon("station_lon", &station), Values::F64(vec![-105.0, -104.0]))
        .unwrap()
        .add_variable(index("numProfiles", &station), Values::I32(vec![1, 2]))
        .unwrap()
        .add_variable(time("profile_time", &profile), Values::F64(vec![100.0, 200.0, 300.0]))
        .unwrap()
        .add_variable(index("numObs", &profile), Values::I32(vec![2, 1, 3]))
        .unwrap()
        .add_variable(lat("obs_lat", &obs), Values::F64(vec![40.1, 40.2, 41.1, 41.2, 41.3, 41.4]))
        .unwrap()
        .add_variable(
            var("z", DataType::F32, &[&obs])
                .with_attribute("units", "m")
                .with_attribute("positive", "up"),
            Values::F32(vec![10.0, 20.0, 10.0, 10.0, 20.0, 30.0]),
        )
        .unwrap();
    store
}

pub fn profile_conventions() -> Vec<ConventionConfig> {
    vec![
        ConventionConfig::new("profiles")
            .num_children("numProfiles")
            .station_dim("station")
            .obs_dim("profile"),
        ConventionConfig::new("obs")
            .num_children("numObs")
            .station_dim("profile")
            .obs_dim("obs"),
    ]
}

/// Two stations, each with a sequence of observations embedded in its row.
pub fn embedded_stations() -> MemoryStore {
    let station = Dimension::new("station", 2);
    let members = vec![
        VariableInfo::new("time", DataType::F64, vec![])
            .with_attribute("units", "seconds since 1970-01-01"),
        VariableInfo::new("temp", DataType::F32, vec![]),
    ];
    let shared: std::sync::Arc<[VariableInfo]> = members.clone().into();
    let row = |t: f64, temp: f32| {
        pointnest::data::StructData::new(
            shared.clone(),
            vec![Values::F64(vec![t]), Values::F32(vec![temp])],
        )
    };
    let obs = Values::Seq(vec![
        vec![row(0.0, 280.0), row(60.0, 281.0)],
        vec![row(0.0, 290.0)],
    ]);

    let mut store = MemoryStore::new();
    store.add_dimension(station.clone());
    store
        .add_variable(lat("lat", &station), Values::F64(vec![40.0, 41.0]))
        .unwrap()
        .add_variable(lon("lon", &station), Values::F64(vec![-105.0, -104.0]))
        .unwrap()
        .add_variable(
            var("obs", DataType::Sequence, &[&station]).with_members(members),
            obs,
        )
        .unwrap();
    store
}

/// Write a netCDF file of two stations over six records, linked through
/// `firstChild` and `nextChild`.
///
/// Station 0 owns records 0, 1, 2; station 1 owns records 3, 4, 5.
pub fn write_linked_netcdf(path: &std::path::Path) {
    let mut file = netcdf::create(path).unwrap();
    file.add_dimension("station", 2).unwrap();
    file.add_dimension("record", 6).unwrap();

    {
        let mut lat = file.add_variable::<f64>("lat", &["station"]).unwrap();
        lat.put_attribute("units", "degrees_north").unwrap();
        lat.put_values(&[40.0, 41.0], ..).unwrap();
    }
    {
        let mut lon = file.add_variable::<f64>("lon", &["station"]).unwrap();
        lon.put_attribute("units", "degrees_east").unwrap();
        lon.put_values(&[-105.0, -104.0], ..).unwrap();
    }
    {
        let mut id = file.add_variable::<i32>("station_id", &["station"]).unwrap();
        id.put_attribute("cf_role", "timeseries_id").unwrap();
        id.put_values(&[725, 726], ..).unwrap();
    }
    {
        let mut first = file.add_variable::<i32>("firstChild", &["station"]).unwrap();
        first.put_values(&[0, 3], ..).unwrap();
    }
    {
        let mut time = file.add_variable::<f64>("time", &["record"]).unwrap();
        time.put_attribute("units", "seconds since 1970-01-01").unwrap();
        time.put_values(&[0.0, 60.0, 120.0, 0.0, 30.0, 90.0], ..).unwrap();
    }
    {
        let mut next = file.add_variable::<i32>("nextChild", &["record"]).unwrap();
        next.put_values(&[1, 2, -1, 4, 5, -1], ..).unwrap();
    }
    {
        let mut temp = file.add_variable::<f32>("temp", &["record"]).unwrap();
        temp.put_values(&[280.0, 281.0, 282.0, 290.0, 291.0, 292.0], ..).unwrap();
    }
}

/// Single-byte text, written as netCDF `char`.
#[repr(transparent)]
#[derive(Clone, Copy)]
struct NcChar(u8);

unsafe impl netcdf::types::NcTypeDescriptor for NcChar {
    fn type_descriptor() -> netcdf::types::NcVariableType {
        netcdf::types::NcVariableType::Char
    }
}

/// Write a netCDF file like [`write_linked_netcdf`] whose stations are named
/// by a char variable and carry text and numeric metadata.
///
/// Station 1 has a fill-valued altitude and record 4 a missing time.
pub fn write_named_netcdf(path: &std::path::Path) {
    let mut file = netcdf::create(path).unwrap();
    file.add_dimension("station", 2).unwrap();
    file.add_dimension("name_strlen", 4).unwrap();
    file.add_dimension("record", 6).unwrap();

    {
        let mut lat = file.add_variable::<f64>("lat", &["station"]).unwrap();
        lat.put_attribute("units", "degrees_north").unwrap();
        lat.put_values(&[40.0, 41.0], ..).unwrap();
    }
    {
        let mut lon = file.add_variable::<f64>("lon", &["station"]).unwrap();
        lon.put_attribute("units", "degrees_east").unwrap();
        lon.put_values(&[-105.0, -104.0], ..).unwrap();
    }
    {
        let mut name = file
            .add_variable::<NcChar>("station_name", &["station", "name_strlen"])
            .unwrap();
        name.put_attribute("cf_role", "timeseries_id").unwrap();
        let chars: Vec<NcChar> = b"KDENKBO\0".iter().map(|&c| NcChar(c)).collect();
        name.put_values(&chars, ..).unwrap();
    }
    {
        let mut desc = file.add_string_variable("station_description", &["station"]).unwrap();
        desc.put_string("Denver", 0usize).unwrap();
        desc.put_string("Boulder", 1usize).unwrap();
    }
    {
        let mut wmo = file.add_variable::<i32>("wmo_id", &["station"]).unwrap();
        wmo.put_values(&[72469, 72468], ..).unwrap();
    }
    {
        let mut elev = file.add_variable::<f32>("stn_elev", &["station"]).unwrap();
        elev.put_attribute("units", "m").unwrap();
        elev.put_attribute("_FillValue", -9999.0f32).unwrap();
        elev.put_values(&[1609.0f32, -9999.0], ..).unwrap();
    }
    {
        let mut first = file.add_variable::<i32>("firstChild", &["station"]).unwrap();
        first.put_values(&[0, 3], ..).unwrap();
    }
    {
        let mut time = file.add_variable::<f64>("time", &["record"]).unwrap();
        time.put_attribute("units", "seconds since 1970-01-01").unwrap();
        time.put_attribute("missing_value", -1.0f64).unwrap();
        time.put_values(&[0.0, 60.0, 120.0, 0.0, -1.0, 90.0], ..).unwrap();
    }
    {
        let mut next = file.add_variable::<i32>("nextChild", &["record"]).unwrap();
        next.put_values(&[1, 2, -1, 4, 5, -1], ..).unwrap();
    }
}
