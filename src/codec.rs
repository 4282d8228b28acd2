//! Fixed-shape JSON summaries of documents, routes, tracks and extension fields,
//! and the three small shapes accepted back.
//!
//! Encoding is deterministic: keys are written in declaration order with no
//! whitespace. Decoding only accepts the exact shapes listed on each function;
//! unknown or missing keys are rejected.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{GpxError, Result};
use crate::geometry::{is_loop_route, is_loop_track, round10, route_len, track_len};
use crate::gpx_types::*;

/// Loop tolerance used by the summaries, independent of any caller tolerance.
pub const CODEC_LOOP_TOLERANCE_M: f64 = 10.0;

const UNNAMED: &str = "None";

#[derive(Debug, Serialize)]
struct PathSummary<'a> {
    name: &'a str,
    #[serde(rename = "numPoints")]
    num_points: usize,
    len: f64,
    #[serde(rename = "loop")]
    is_loop: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DocumentSummary<'a> {
    version: f64,
    creator: &'a str,
    num_waypoints: usize,
    num_routes: usize,
    num_tracks: usize,
}

fn display_name(name: &str) -> &str {
    if name.is_empty() { UNNAMED } else { name }
}

/// Keep one decimal digit so the number prints as `%.1f` would.
fn one_decimal(value: f64) -> f64 {
    format!("{value:.1}").parse().unwrap_or(value)
}

fn encode<T: Serialize + ?Sized>(value: &T, empty: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| empty.to_string())
}

fn route_summary(route: &Route) -> PathSummary<'_> {
    PathSummary {
        name: display_name(&route.name),
        num_points: route.waypoints.len(),
        len: one_decimal(round10(route_len(route))),
        is_loop: is_loop_route(route, CODEC_LOOP_TOLERANCE_M),
    }
}

fn track_summary(track: &Track) -> PathSummary<'_> {
    PathSummary {
        name: display_name(&track.name),
        num_points: track.num_points(),
        len: one_decimal(round10(track_len(track))),
        is_loop: is_loop_track(track, CODEC_LOOP_TOLERANCE_M),
    }
}

/// `{"name":"R1","numPoints":3,"len":222390.0,"loop":false}`
pub fn route_to_json(route: &Route) -> String {
    encode(&route_summary(route), "{}")
}

/// Same shape as [`route_to_json`]; `numPoints` counts points over all segments.
pub fn track_to_json(track: &Track) -> String {
    encode(&track_summary(track), "{}")
}

pub fn route_list_to_json<'a>(routes: impl IntoIterator<Item = &'a Route>) -> String {
    let items: Vec<_> = routes.into_iter().map(route_summary).collect();
    encode(&items, "[]")
}

pub fn track_list_to_json<'a>(tracks: impl IntoIterator<Item = &'a Track>) -> String {
    let items: Vec<_> = tracks.into_iter().map(track_summary).collect();
    encode(&items, "[]")
}

/// `{"version":1.1,"creator":"x","numWaypoints":0,"numRoutes":0,"numTracks":0}`
pub fn gpx_to_json(doc: &GpxDocument) -> String {
    let summary = DocumentSummary {
        version: one_decimal(doc.version),
        creator: &doc.creator,
        num_waypoints: doc.num_waypoints(),
        num_routes: doc.num_routes(),
        num_tracks: doc.num_tracks(),
    };
    encode(&summary, "{}")
}

fn extension_object(field: &ExtensionField) -> Map<String, Value> {
    let mut obj = Map::new();
    if field.is_valid() {
        obj.insert(field.name.clone(), Value::String(field.value.clone()));
    }
    obj
}

/// `{"desc":"value"}`, or `{}` when the name or value is empty.
pub fn extension_to_json(field: &ExtensionField) -> String {
    encode(&extension_object(field), "{}")
}

pub fn extension_list_to_json(fields: &[ExtensionField]) -> String {
    let items: Vec<_> = fields.iter().map(extension_object).collect();
    encode(&items, "[]")
}

/// One extension list per route: `[[{"desc":"a"}],[]]`.
pub fn route_extensions_to_json(routes: &[Route]) -> String {
    nested_extensions(routes.iter().map(|r| r.extensions.as_slice()))
}

/// One extension list per track.
pub fn track_extensions_to_json(tracks: &[Track]) -> String {
    nested_extensions(tracks.iter().map(|t| t.extensions.as_slice()))
}

fn nested_extensions<'a>(lists: impl Iterator<Item = &'a [ExtensionField]>) -> String {
    let items: Vec<Vec<_>> = lists
        .map(|fields| fields.iter().map(extension_object).collect())
        .collect();
    encode(&items, "[]")
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct DocumentShape {
    version: f64,
    creator: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct WaypointShape {
    lat: Coord,
    lon: Coord,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RouteShape {
    name: String,
}

/// Coordinates arrive either as numbers or as numeric strings.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Coord {
    Number(f64),
    Text(String),
}

impl Coord {
    fn value(&self, key: &str) -> Result<f64> {
        match self {
            Self::Number(n) => Ok(*n),
            Self::Text(s) => s
                .trim()
                .parse()
                .map_err(|_| GpxError::Decode(format!("{key} '{s}' is not a number"))),
        }
    }
}

fn decode<'a, T: Deserialize<'a>>(json: &'a str) -> Result<T> {
    serde_json::from_str(json).map_err(|e| GpxError::Decode(e.to_string()))
}

/// `{"version":1.1,"creator":"me"}` to an empty document in the GPX 1.1 namespace.
pub fn json_to_gpx(json: &str) -> Result<GpxDocument> {
    let shape: DocumentShape = decode(json)?;
    if shape.creator.is_empty() {
        return Err(GpxError::Decode("creator is empty".into()));
    }
    Ok(GpxDocument::new(GPX_NAMESPACE, shape.version, shape.creator))
}

/// `{"lat":43.5,"lon":"-80.2"}` to an unnamed waypoint.
pub fn json_to_waypoint(json: &str) -> Result<Waypoint> {
    let shape: WaypointShape = decode(json)?;
    Ok(Waypoint::new(shape.lat.value("lat")?, shape.lon.value("lon")?))
}

/// `{"name":"Loop"}` to an empty route.
pub fn json_to_route(json: &str) -> Result<Route> {
    let shape: RouteShape = decode(json)?;
    Ok(Route::new(shape.name))
}
