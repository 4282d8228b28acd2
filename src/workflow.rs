//! File-level operations: load a schema-valid file, query or change it, and
//! write it back only if the result still validates.

use std::path::Path;

use tracing::{debug, warn};

use crate::codec::*;
use crate::error::{GpxError, Result};
use crate::gpx_types::*;
use crate::parser::read_valid_document;
use crate::session::MarkupSession;
use crate::validator::check_document_in;
use crate::writer::write_document_in;

/// Which collection [`rename_component`] addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentKind {
    Route,
    Track,
}

/// Parse with schema validation, then run the document checks again on the model.
fn load(session: &mut MarkupSession, file: &Path, schema: &Path) -> Result<GpxDocument> {
    let doc = read_valid_document(session, file, schema)?;
    check_document_in(session, &doc, schema)?;
    Ok(doc)
}

fn save(session: &mut MarkupSession, doc: &GpxDocument, file: &Path, schema: &Path) -> Result<()> {
    if let Err(e) = check_document_in(session, doc, schema) {
        warn!(file = %file.display(), error = %e, "refusing to write invalid document");
        return Err(e);
    }
    write_document_in(session, doc, file)?;
    debug!(file = %file.display(), "wrote GPX file");
    Ok(())
}

fn with_document<T>(
    file: impl AsRef<Path>,
    schema: impl AsRef<Path>,
    f: impl FnOnce(&GpxDocument) -> Result<T>,
) -> Result<T> {
    let mut session = MarkupSession::default();
    let doc = load(&mut session, file.as_ref(), schema.as_ref())?;
    f(&doc)
}

/// Load, apply `f`, and write back to the same file.
fn update_document(
    file: impl AsRef<Path>,
    schema: impl AsRef<Path>,
    f: impl FnOnce(&mut GpxDocument) -> Result<()>,
) -> Result<()> {
    let (file, schema) = (file.as_ref(), schema.as_ref());
    let mut session = MarkupSession::default();
    let mut doc = load(&mut session, file, schema)?;
    f(&mut doc)?;
    save(&mut session, &doc, file, schema)
}

/// Document summary of a file.
pub fn file_to_json(file: impl AsRef<Path>, schema: impl AsRef<Path>) -> Result<String> {
    with_document(file, schema, |doc| Ok(gpx_to_json(doc)))
}

pub fn file_to_route_list_json(file: impl AsRef<Path>, schema: impl AsRef<Path>) -> Result<String> {
    with_document(file, schema, |doc| Ok(route_list_to_json(&doc.routes)))
}

pub fn file_to_track_list_json(file: impl AsRef<Path>, schema: impl AsRef<Path>) -> Result<String> {
    with_document(file, schema, |doc| Ok(track_list_to_json(&doc.tracks)))
}

pub fn file_route_extensions_json(
    file: impl AsRef<Path>,
    schema: impl AsRef<Path>,
) -> Result<String> {
    with_document(file, schema, |doc| Ok(route_extensions_to_json(&doc.routes)))
}

pub fn file_track_extensions_json(
    file: impl AsRef<Path>,
    schema: impl AsRef<Path>,
) -> Result<String> {
    with_document(file, schema, |doc| Ok(track_extensions_to_json(&doc.tracks)))
}

/// Rename the `index`-th (0-based) route or track and write the file back.
pub fn rename_component(
    file: impl AsRef<Path>,
    schema: impl AsRef<Path>,
    kind: ComponentKind,
    index: usize,
    new_name: &str,
) -> Result<()> {
    update_document(file, schema, |doc| {
        let target: Option<&mut dyn Named> = match kind {
            ComponentKind::Route => doc.routes.get_mut(index).map(|r| r as &mut dyn Named),
            ComponentKind::Track => doc.tracks.get_mut(index).map(|t| t as &mut dyn Named),
        };
        let target = target.ok_or_else(|| {
            GpxError::Usage(format!("no {kind:?} at index {index}").to_lowercase())
        })?;
        target.rename(new_name);
        Ok(())
    })
}

/// Create a new empty GPX file from a `{"version":..,"creator":".."}` summary.
pub fn create_gpx_file(json: &str, file: impl AsRef<Path>, schema: impl AsRef<Path>) -> Result<()> {
    let doc = json_to_gpx(json)?;
    let mut session = MarkupSession::default();
    save(&mut session, &doc, file.as_ref(), schema.as_ref())
}

/// Append a route built from `{"name":".."}` to the file.
pub fn add_route_to_file(
    file: impl AsRef<Path>,
    schema: impl AsRef<Path>,
    route_json: &str,
) -> Result<()> {
    let route = json_to_route(route_json)?;
    update_document(file, schema, |doc| {
        doc.add_route(route);
        Ok(())
    })
}

/// Append a waypoint built from `{"lat":..,"lon":..}` to the file's last route.
pub fn add_waypoint_to_last_route(
    file: impl AsRef<Path>,
    schema: impl AsRef<Path>,
    waypoint_json: &str,
) -> Result<()> {
    let waypoint = json_to_waypoint(waypoint_json)?;
    update_document(file, schema, |doc| {
        let route = doc
            .routes
            .last_mut()
            .ok_or_else(|| GpxError::Usage("document has no route".into()))?;
        route.add_waypoint(waypoint);
        Ok(())
    })
}

pub fn routes_between_json(
    file: impl AsRef<Path>,
    schema: impl AsRef<Path>,
    source: Coordinate,
    dest: Coordinate,
    delta: f64,
) -> Result<String> {
    with_document(file, schema, |doc| {
        Ok(route_list_to_json(doc.routes_between(source, dest, delta)?))
    })
}

pub fn tracks_between_json(
    file: impl AsRef<Path>,
    schema: impl AsRef<Path>,
    source: Coordinate,
    dest: Coordinate,
    delta: f64,
) -> Result<String> {
    with_document(file, schema, |doc| {
        Ok(track_list_to_json(doc.tracks_between(source, dest, delta)?))
    })
}

pub fn count_routes_with_length(
    file: impl AsRef<Path>,
    schema: impl AsRef<Path>,
    len: f64,
    delta: f64,
) -> Result<usize> {
    with_document(file, schema, |doc| Ok(doc.num_routes_with_length(len, delta)))
}

pub fn count_tracks_with_length(
    file: impl AsRef<Path>,
    schema: impl AsRef<Path>,
    len: f64,
    delta: f64,
) -> Result<usize> {
    with_document(file, schema, |doc| Ok(doc.num_tracks_with_length(len, delta)))
}
