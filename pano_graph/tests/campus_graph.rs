use std::fs;
use std::path::PathBuf;

use pano_graph::{Direction, EnvironmentGraph, GraphError};
use tempfile::tempdir;

fn campus_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("assets")
        .join("campus.json")
}

#[test]
fn bundled_campus_graph_loads() {
    let graph = EnvironmentGraph::load(&campus_path()).expect("campus graph loads");
    assert_eq!(graph.len(), 10);
    assert_eq!(graph.first().name(), "Parking E");
    assert!(graph.dangling_edges().is_empty());

    // Edges are directed: Smart Building -> Block A exists without a return
    // edge pointing the opposite way.
    assert_eq!(
        graph.neighbor_of("Smart Building", Direction::Behind),
        Ok(Some("Block A"))
    );
    assert_eq!(graph.neighbor_of("Block A", Direction::Front), Ok(None));
}

#[test]
fn load_reports_missing_file() {
    let temp = tempdir().expect("temp dir");
    let err = EnvironmentGraph::load(&temp.path().join("missing.json"))
        .expect_err("missing file is an error");
    assert!(matches!(err, GraphError::Io { .. }));
}

#[test]
fn load_reads_graph_from_disk() {
    let temp = tempdir().expect("temp dir");
    let path = temp.path().join("graph.json");
    fs::write(
        &path,
        r#"{ "Hall": { "asset": "hall.jpg", "right": "Pond" }, "Pond": { "asset": "pond.jpg" } }"#,
    )
    .expect("write graph");

    let graph = EnvironmentGraph::load(&path).expect("graph loads");
    let hall = graph.lookup("Hall").expect("hall present");
    assert_eq!(
        hall.neighbors().collect::<Vec<_>>(),
        vec![(Direction::Right, "Pond")]
    );
}
