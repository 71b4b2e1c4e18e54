mod common;

use common::{write_linked_netcdf, write_named_netcdf};
use pointnest::data::{BackingStore, DataType, Values};
use pointnest::{
    resolve_nested_tables, ConventionConfig, ErrorKind, FeatureType, JoinKind, NetcdfStore,
    StationField, TableGraph,
};
use tempfile::TempDir;

fn open_fixture() -> (TempDir, NetcdfStore) {
    open_written(write_linked_netcdf)
}

fn open_written(write: fn(&std::path::Path)) -> (TempDir, NetcdfStore) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("stations.nc");
    write(&path);
    let store = NetcdfStore::open(&path).unwrap();
    (dir, store)
}

#[test]
fn describes_dimensions_and_variables() {
    let (_dir, store) = open_fixture();

    let dims: Vec<(String, usize)> = store
        .dimensions()
        .into_iter()
        .map(|d| (d.name, d.len))
        .collect();
    assert_eq!(dims, vec![("station".to_string(), 2), ("record".to_string(), 6)]);

    let lat = store.variable("lat").unwrap();
    assert_eq!(lat.data_type, DataType::F64);
    assert_eq!(lat.units(), Some("degrees_north"));
    assert_eq!(lat.shape(), vec![2]);
    assert_eq!(
        store.attribute("station_id", "cf_role").unwrap().as_str(),
        Some("timeseries_id")
    );
    assert!(store.variable("missing").is_none());
}

#[test]
fn reads_outer_row_ranges() {
    let (_dir, store) = open_fixture();
    assert_eq!(store.read_raw("nextChild", 2..4).unwrap(), Values::I32(vec![-1, 4]));
    assert_eq!(store.read_raw("temp", 5..6).unwrap(), Values::F32(vec![292.0]));

    let err = store.read_raw("time", 4..7).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Bounds);
    let err = store.read_raw("nope", 0..1).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Backing);
}

#[test]
fn linked_preset_resolves_station_features() {
    let (_dir, store) = open_fixture();
    let graph = TableGraph::build(&store, &[ConventionConfig::linked_station_obs()]).unwrap();

    let station = graph.find_table("station").unwrap();
    let record = graph.find_table("record").unwrap();
    assert!(matches!(
        graph.join(graph.join_between(station, record).unwrap()).useable(),
        JoinKind::ForwardLinkedList { .. }
    ));

    let nested = resolve_nested_tables(&graph).unwrap();
    assert_eq!(nested.len(), 1);
    assert_eq!(nested[0].feature_type(), FeatureType::Station);

    let rows: Vec<(String, f64, f64)> = nested[0]
        .rows(&store)
        .unwrap()
        .map(|r| {
            let r = r.unwrap();
            (r.feature_id().unwrap().unwrap(), r.time().unwrap(), r.lon().unwrap())
        })
        .collect();
    assert_eq!(rows.len(), 6);
    assert_eq!(rows[1], ("725".to_string(), 60.0, -105.0));
    assert_eq!(rows[5], ("726".to_string(), 90.0, -104.0));
}

#[test]
fn reads_char_and_string_variables() {
    let (_dir, store) = open_written(write_named_netcdf);

    let name = store.variable("station_name").unwrap();
    assert_eq!(name.data_type, DataType::Char);
    assert_eq!(name.shape(), vec![2, 4]);
    assert_eq!(
        store.read_raw("station_name", 0..2).unwrap(),
        Values::Char(b"KDENKBO\0".to_vec())
    );
    let second = store.read_raw("station_name", 1..2).unwrap();
    assert_eq!(second.get_string(0).as_deref(), Some("KBO"));

    assert_eq!(
        store.variable("station_description").unwrap().data_type,
        DataType::String
    );
    assert_eq!(
        store.read_raw("station_description", 0..2).unwrap(),
        Values::Str(vec!["Denver".to_string(), "Boulder".to_string()])
    );
    assert_eq!(
        store.read_raw("station_description", 1..2).unwrap(),
        Values::Str(vec!["Boulder".to_string()])
    );
}

#[test]
fn char_station_names_identify_features() {
    let (_dir, store) = open_written(write_named_netcdf);
    let convention =
        ConventionConfig::linked_station_obs().station_field(StationField::Alt, "stn_elev");
    let graph = TableGraph::build(&store, &[convention]).unwrap();
    let nested = resolve_nested_tables(&graph).unwrap();
    assert_eq!(nested.len(), 1);
    let feature = &nested[0];
    assert_eq!(feature.feature_id().unwrap().name(), "station_name");
    assert_eq!(feature.station_field(StationField::Desc).unwrap().name(), "station_description");
    assert_eq!(feature.alt_units(), Some("m"));

    let rows: Vec<_> = feature.rows(&store).unwrap().map(|r| r.unwrap()).collect();
    assert_eq!(rows.len(), 6);

    assert_eq!(rows[0].feature_id().unwrap().as_deref(), Some("KDEN"));
    assert_eq!(
        rows[0].station_text(StationField::Desc).unwrap().as_deref(),
        Some("Denver")
    );
    assert_eq!(
        rows[0].station_text(StationField::WmoId).unwrap().as_deref(),
        Some("72469")
    );
    assert_eq!(rows[0].station_alt().unwrap(), Some(1609.0));

    assert_eq!(rows[3].feature_id().unwrap().as_deref(), Some("KBO"));
    assert_eq!(rows[3].station_alt().unwrap(), None);
    assert!(!rows[3].is_missing().unwrap());
    assert!(rows[4].is_time_missing().unwrap());
}
