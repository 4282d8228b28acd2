use std::path::Path;

use tracing::warn;

use crate::error::{GpxError, Result};
use crate::gpx_types::*;
use crate::options::GpxOptions;
use crate::session::MarkupSession;
use crate::writer::to_gpx_string_with_indent;

/// Validate `doc` against the schema at `schema`, then against the document rules.
///
/// Returns `false` on the first violation; the reason is logged.
pub fn validate_document(doc: &GpxDocument, schema: impl AsRef<Path>) -> bool {
    let mut session = MarkupSession::new(GpxOptions::default());
    match check_document_in(&mut session, doc, schema.as_ref()) {
        Ok(()) => true,
        Err(e) => {
            warn!(error = %e, "GPX document failed validation");
            false
        }
    }
}

/// Like [`validate_document`], but returns the first violation.
pub fn check_document(doc: &GpxDocument, schema: impl AsRef<Path>) -> Result<()> {
    let mut session = MarkupSession::new(GpxOptions::default());
    check_document_in(&mut session, doc, schema.as_ref())
}

pub fn check_document_in(session: &mut MarkupSession, doc: &GpxDocument, schema: &Path) -> Result<()> {
    let xml = to_gpx_string_with_indent(doc, session.options().indent_width)?;
    session.validate_against_schema(&xml, schema)?;
    check_constraints(doc)
}

/// Document-level rules that the schema cannot express.
pub fn check_constraints(doc: &GpxDocument) -> Result<()> {
    if doc.namespace.is_empty() {
        return Err(GpxError::Parse("namespace is empty".into()));
    }
    if doc.creator.is_empty() {
        return Err(GpxError::Parse("creator is empty".into()));
    }

    for wpt in &doc.waypoints {
        check_fields("wpt", &wpt.extensions)?;
    }
    for rte in &doc.routes {
        check_fields("rte", &rte.extensions)?;
        for pt in &rte.waypoints {
            check_fields("rtept", &pt.extensions)?;
        }
    }
    for trk in &doc.tracks {
        check_fields("trk", &trk.extensions)?;
        for pt in trk.segments.iter().flat_map(|s| &s.waypoints) {
            check_fields("trkpt", &pt.extensions)?;
        }
    }
    Ok(())
}

fn check_fields(owner: &str, fields: &[ExtensionField]) -> Result<()> {
    match fields.iter().find(|f| !f.is_valid()) {
        Some(field) if field.name.is_empty() => Err(GpxError::constraint(
            owner,
            "extension field has an empty name",
        )),
        Some(field) => Err(GpxError::constraint(
            owner,
            format!("extension field <{}> has an empty value", field.name),
        )),
        None => Ok(()),
    }
}
