mod common;

use common::*;
use pointnest::data::{DataType, Dimension, MemoryStore, Values};
use pointnest::{
    build_tables, AxisType, ConventionConfig, ErrorKind, JoinKind, PointNestError, TableGraph,
};

#[test]
fn tables_follow_outer_dimensions() {
    let store = linked_stations();
    let graph = TableGraph::build(&store, &[]).unwrap();

    let names: Vec<&str> = graph.tables().iter().map(|t| t.name()).collect();
    assert_eq!(names, vec!["station", "obs"]);

    let station = graph.table(graph.find_table("station").unwrap());
    assert_eq!(station.len(), 2);
    assert_eq!(station.axis(AxisType::Lat).unwrap().variable.name, "lat");
    assert_eq!(station.axis(AxisType::Lon).unwrap().variable.name, "lon");
    assert!(station.axis(AxisType::Time).is_none());

    let obs = graph.table(graph.find_table("obs").unwrap());
    assert!(obs.is_variable_length());
    let columns: Vec<&str> = obs.columns().iter().map(|c| c.name.as_str()).collect();
    assert_eq!(columns, vec!["next", "temp"]);
    assert!(graph.joins().is_empty());
}

#[test]
fn scalar_variables_belong_to_no_table() {
    let mut store = linked_stations();
    store
        .add_variable(
            var("version", DataType::I32, &[]),
            Values::I32(vec![3]),
        )
        .unwrap();
    let graph = TableGraph::build(&store, &[]).unwrap();
    assert_eq!(graph.tables().len(), 2);
    assert!(graph
        .tables()
        .iter()
        .all(|t| t.members().iter().all(|m| m.name != "version")));
}

#[test]
fn forward_list_links_station_to_obs() {
    let store = linked_stations();
    let graph = build_tables(&store, &linked_convention()).unwrap();

    let station = graph.find_table("station").unwrap();
    let obs = graph.find_table("obs").unwrap();
    assert_eq!(graph.table(obs).parent(), Some(station));
    let join = graph.join(graph.join_between(station, obs).unwrap());
    assert_eq!(
        join.useable(),
        &JoinKind::ForwardLinkedList {
            start: "firstChild".to_string(),
            next: "next".to_string(),
        }
    );
    assert_eq!(graph.leaves(), vec![obs]);
    assert_eq!(graph.roots(), vec![station]);
    assert_eq!(graph.ancestry(obs), vec![obs, station]);

    // markers are kept but are not data
    assert_eq!(graph.table(station).markers().to_vec(), vec!["firstChild".to_string()]);
    let data: Vec<&str> = graph.table(obs).data_columns().map(|c| c.name.as_str()).collect();
    assert_eq!(data, vec!["temp"]);
}

#[test]
fn linked_list_takes_precedence_over_counts() {
    let mut store = linked_stations();
    store
        .add_variable(index("rowSize", &Dimension::new("station", 2)), Values::I32(vec![3, 3]))
        .unwrap();
    let convention = linked_convention().num_children("rowSize");
    let graph = build_tables(&store, &convention).unwrap();

    assert_eq!(graph.joins().len(), 1);
    let join = &graph.joins()[0];
    assert_eq!(join.kinds().len(), 1);
    assert!(matches!(join.useable(), JoinKind::ForwardLinkedList { .. }));
}

#[test]
fn backward_list() {
    let mut store = linked_stations();
    store
        .add_variable(index("lastChild", &Dimension::new("station", 2)), Values::I32(vec![15, 2]))
        .unwrap();
    let convention = ConventionConfig::new("backward")
        .last_child("lastChild")
        .prev_child("next")
        .station_dim("station")
        .obs_dim("obs");
    let graph = build_tables(&store, &convention).unwrap();
    assert!(matches!(
        graph.joins()[0].useable(),
        JoinKind::BackwardLinkedList { .. }
    ));
}

#[test]
fn both_list_directions_are_recorded_on_one_join() {
    let mut store = linked_stations();
    store
        .add_variable(index("lastChild", &Dimension::new("station", 2)), Values::I32(vec![15, 2]))
        .unwrap();
    let convention = linked_convention().last_child("lastChild").prev_child("next");
    let graph = build_tables(&store, &convention).unwrap();

    assert_eq!(graph.joins().len(), 1);
    let kinds: Vec<&str> = graph.joins()[0].kinds().iter().map(|k| k.name()).collect();
    assert_eq!(kinds, vec!["forward-linked", "backward-linked"]);
}

#[test]
fn contiguous_with_and_without_start() {
    let store = counted_stations();

    let explicit = ConventionConfig::new("explicit")
        .first_child("firstObs")
        .num_children("rowSize")
        .obs_dim("obs");
    let graph = build_tables(&store, &explicit).unwrap();
    assert_eq!(
        graph.joins()[0].useable(),
        &JoinKind::ContiguousList {
            start: Some("firstObs".to_string()),
            count: "rowSize".to_string(),
        }
    );

    let derived = ConventionConfig::new("derived").num_children("rowSize").obs_dim("obs");
    let graph = build_tables(&store, &derived).unwrap();
    assert_eq!(
        graph.joins()[0].useable(),
        &JoinKind::ContiguousList {
            start: None,
            count: "rowSize".to_string(),
        }
    );
}

#[test]
fn counts_without_obs_dimension_disable_contiguous() {
    let store = counted_stations();
    let convention = ConventionConfig::new("counts")
        .first_child("firstObs")
        .num_children("rowSize");
    let graph = build_tables(&store, &convention).unwrap();
    assert!(graph.joins().is_empty());
}

#[test]
fn parent_index_join() {
    let store = counted_stations();
    let convention = ConventionConfig::new("indexed")
        .parent_index("stationIndex")
        .station_dim("station")
        .obs_dim("obs");
    let graph = build_tables(&store, &convention).unwrap();
    assert_eq!(
        graph.joins()[0].useable(),
        &JoinKind::ParentIndex {
            index: "stationIndex".to_string(),
        }
    );
}

#[test]
fn missing_markers_disable_joins() {
    let store = linked_stations();
    let convention = ConventionConfig::new("absent")
        .first_child("nope")
        .next_child("next")
        .num_children("alsoNope");
    let graph = build_tables(&store, &convention).unwrap();
    assert!(graph.joins().is_empty());
}

#[test]
fn unknown_dimension_is_structural() {
    let store = linked_stations();
    let err = build_tables(&store, &linked_convention().station_dim("stations")).unwrap_err();
    assert!(matches!(err, PointNestError::DimensionNotFound { ref name } if name == "stations"));
    assert_eq!(err.kind(), ErrorKind::Structural);
}

#[test]
fn second_parent_is_rejected() {
    let mut store = counted_stations();
    let network = Dimension::new("network", 1);
    store.add_dimension(network.clone());
    store
        .add_variable(index("networkSize", &network), Values::I32(vec![5]))
        .unwrap();

    let conventions = [
        ConventionConfig::new("stations").num_children("rowSize").obs_dim("obs"),
        ConventionConfig::new("network").num_children("networkSize").obs_dim("obs"),
    ];
    let err = TableGraph::build(&store, &conventions).unwrap_err();
    match err {
        PointNestError::MultipleParents {
            table,
            existing,
            requested,
        } => {
            assert_eq!(table, "obs");
            assert_eq!(existing, "station");
            assert_eq!(requested, "network");
        },
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn self_join_is_a_cycle() {
    let store = linked_stations();
    let convention = linked_convention().station_dim("obs");
    let err = build_tables(&store, &convention).unwrap_err();
    assert!(matches!(err, PointNestError::CyclicJoin { .. }));
    assert_eq!(err.kind(), ErrorKind::Structural);
}

#[test]
fn scalar_marker_is_rejected() {
    let mut store = linked_stations();
    store
        .add_variable(var("first", DataType::I32, &[]), Values::I32(vec![0]))
        .unwrap();
    let convention = ConventionConfig::new("scalar")
        .first_child("first")
        .next_child("next");
    let err = build_tables(&store, &convention).unwrap_err();
    assert!(matches!(
        err,
        PointNestError::MarkerNotDimensioned { ref variable } if variable == "first"
    ));
}

#[test]
fn two_explicit_axes_of_one_kind_are_ambiguous() {
    let obs = Dimension::new("obs", 2);
    let mut store = MemoryStore::new();
    store.add_dimension(obs.clone());
    store
        .add_variable(
            var("t1", DataType::F64, &[&obs]).with_attribute("_CoordinateAxisType", "Time"),
            Values::F64(vec![0.0, 1.0]),
        )
        .unwrap()
        .add_variable(
            var("t2", DataType::F64, &[&obs]).with_attribute("_CoordinateAxisType", "Time"),
            Values::F64(vec![0.0, 1.0]),
        )
        .unwrap();
    let err = TableGraph::build(&store, &[]).unwrap_err();
    assert!(matches!(err, PointNestError::AmbiguousAxis { .. }));
    assert_eq!(err.kind(), ErrorKind::Structural);
}

#[test]
fn explicit_axis_beats_inferred_one() {
    let obs = Dimension::new("obs", 2);
    let mut store = MemoryStore::new();
    store.add_dimension(obs.clone());
    store
        .add_variable(time("time", &obs), Values::F64(vec![0.0, 1.0]))
        .unwrap()
        .add_variable(time("time_bis", &obs), Values::F64(vec![0.0, 1.0]))
        .unwrap()
        .add_variable(
            var("valid", DataType::F64, &[&obs]).with_attribute("_CoordinateAxisType", "Time"),
            Values::F64(vec![0.0, 1.0]),
        )
        .unwrap();
    let graph = TableGraph::build(&store, &[]).unwrap();
    let table = graph.table(graph.find_table("obs").unwrap());
    assert_eq!(table.axis(AxisType::Time).unwrap().variable.name, "valid");
}

#[test]
fn structured_members_become_embedded_tables() {
    let store = embedded_stations();
    let graph = TableGraph::build(&store, &[]).unwrap();

    let station = graph.find_table("station").unwrap();
    let embedded = graph.find_table("station.obs").unwrap();
    assert!(graph.table(embedded).is_embedded());
    assert!(graph.table(embedded).is_variable_length());
    assert_eq!(graph.table(embedded).parent(), Some(station));
    assert_eq!(
        graph.join(graph.table(embedded).join().unwrap()).useable(),
        &JoinKind::NestedStructure {
            field: "obs".to_string(),
        }
    );
    assert!(graph.table(embedded).axis(AxisType::Time).is_some());
}

#[test]
fn describe_renders_the_forest() {
    let store = linked_stations();
    let graph = build_tables(&store, &linked_convention()).unwrap();
    let text = graph.describe();
    assert!(text.starts_with("station (2 rows)\n"));
    assert!(text.contains("├── axes: lat=Lat, lon=Lon"));
    assert!(text.contains("└── obs (20 rows, unlimited) via forward-linked"));
    assert!(text.contains("    ├── axes: time=Time"));
}
