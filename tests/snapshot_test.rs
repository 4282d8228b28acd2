use gpxdoc_wasm::workflow::*;
use std::path::Path;

const SCHEMA: &str = "tests/fixtures/gpx.xsd";

fn fixture(path: &str) -> String {
    format!("tests/fixtures/{path}")
}

/// Compare actual JSON output against the expected snapshot file.
/// When `UPDATE_SNAPSHOTS=1` is set, write/overwrite the expected file instead.
fn assert_snapshot(actual: &str, expected_path: &str) {
    let path = format!("tests/fixtures/expected/{expected_path}");
    let actual: serde_json::Value = serde_json::from_str(actual)
        .unwrap_or_else(|e| panic!("Output for {path} is not JSON: {e}\n{actual}"));

    if matches!(std::env::var("UPDATE_SNAPSHOTS").as_deref(), Ok("1")) {
        let dir = Path::new(&path).parent().unwrap();
        std::fs::create_dir_all(dir).unwrap();
        let pretty = serde_json::to_string_pretty(&actual).unwrap();
        std::fs::write(&path, pretty.as_bytes()).unwrap();
        eprintln!("Updated snapshot: {path}");
        return;
    }

    let expected_str = std::fs::read_to_string(&path).unwrap_or_else(|_| {
        panic!("Expected file not found: {path}. Run with UPDATE_SNAPSHOTS=1 to generate.")
    });
    let expected: serde_json::Value = serde_json::from_str(&expected_str)
        .unwrap_or_else(|e| panic!("Failed to parse {path}: {e}"));

    assert_eq!(
        actual, expected,
        "Snapshot mismatch for {path}.\nRun with UPDATE_SNAPSHOTS=1 to update."
    );
}

#[test]
fn snapshot_summary() {
    let json = file_to_json(fixture("simple.gpx"), SCHEMA).unwrap();
    assert_snapshot(&json, "simple.summary.json");
}

#[test]
fn snapshot_route_list() {
    let json = file_to_route_list_json(fixture("simple.gpx"), SCHEMA).unwrap();
    assert_snapshot(&json, "simple.routes.json");
}

#[test]
fn snapshot_track_list() {
    let json = file_to_track_list_json(fixture("simple.gpx"), SCHEMA).unwrap();
    assert_snapshot(&json, "simple.tracks.json");
}

#[test]
fn snapshot_route_extensions() {
    let json = file_route_extensions_json(fixture("simple.gpx"), SCHEMA).unwrap();
    assert_snapshot(&json, "simple.route_extensions.json");
}

#[test]
fn snapshot_track_extensions() {
    let json = file_track_extensions_json(fixture("simple.gpx"), SCHEMA).unwrap();
    assert_snapshot(&json, "simple.track_extensions.json");
}

#[test]
fn summary_is_compact() {
    let json = file_to_json(fixture("simple.gpx"), SCHEMA).unwrap();
    assert_eq!(
        json,
        r#"{"version":1.1,"creator":"gpxdoc fixtures","numWaypoints":2,"numRoutes":2,"numTracks":1}"#
    );
}
