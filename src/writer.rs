use std::fmt::Display;
use std::path::Path;

use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use tracing::debug;

use crate::error::{GpxError, Result};
use crate::gpx_types::*;
use crate::session::MarkupSession;

/// File extension required by [`write_document`].
pub const GPX_EXTENSION: &str = "gpx";

/// Serialize a document to GPX markup with two-space indentation.
pub fn to_gpx_string(doc: &GpxDocument) -> Result<String> {
    to_gpx_string_with_indent(doc, 2)
}

/// Serialize a document to GPX markup.
///
/// Children are written as `name`, then extension fields in stored order, then
/// points (`rtept`, `trkseg`/`trkpt`). A `name` child is only written for a
/// non-empty name.
pub fn to_gpx_string_with_indent(doc: &GpxDocument, indent: usize) -> Result<String> {
    let mut gpx = GpxWriter::new(indent);

    gpx.event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    let version = format!("{:.1}", doc.version);
    let mut root = BytesStart::new("gpx");
    root.push_attribute(("xmlns", doc.namespace.as_str()));
    root.push_attribute(("version", version.as_str()));
    root.push_attribute(("creator", doc.creator.as_str()));
    gpx.event(Event::Start(root))?;

    for wpt in &doc.waypoints {
        gpx.point("wpt", wpt)?;
    }
    for rte in &doc.routes {
        gpx.route(rte)?;
    }
    for trk in &doc.tracks {
        gpx.track(trk)?;
    }

    gpx.event(Event::End(BytesEnd::new("gpx")))?;

    let xml = gpx.finish()?;
    debug!(bytes = xml.len(), "serialized GPX document");
    Ok(xml)
}

/// Serialize `doc` and write it to `path`, which must end in `.gpx`.
pub fn write_document(doc: &GpxDocument, path: impl AsRef<Path>) -> Result<()> {
    let session = MarkupSession::default();
    write_document_in(&session, doc, path.as_ref())
}

pub fn write_document_in(session: &MarkupSession, doc: &GpxDocument, path: &Path) -> Result<()> {
    if path.as_os_str().is_empty() {
        return Err(GpxError::Input("destination path is empty".into()));
    }
    if path.extension().and_then(|e| e.to_str()) != Some(GPX_EXTENSION) {
        return Err(GpxError::Input(format!(
            "{} does not have a .{GPX_EXTENSION} extension",
            path.display()
        )));
    }
    let xml = to_gpx_string_with_indent(doc, session.options().indent_width)?;
    session.write_tree(&xml, path)
}

struct GpxWriter {
    inner: Writer<Vec<u8>>,
}

impl GpxWriter {
    fn new(indent: usize) -> Self {
        let inner = if indent == 0 {
            Writer::new(Vec::new())
        } else {
            Writer::new_with_indent(Vec::new(), b' ', indent)
        };
        Self { inner }
    }

    fn event(&mut self, event: Event<'_>) -> Result<()> {
        self.inner.write_event(event).map_err(write_err)
    }

    fn text_element(&mut self, tag: &str, text: &str) -> Result<()> {
        self.event(Event::Start(BytesStart::new(tag)))?;
        self.event(Event::Text(BytesText::new(text)))?;
        self.event(Event::End(BytesEnd::new(tag)))
    }

    /// `name` (when non-empty) followed by extension fields.
    fn header(&mut self, name: &str, extensions: &[ExtensionField]) -> Result<()> {
        if !name.is_empty() {
            self.text_element("name", name)?;
        }
        for field in extensions {
            self.text_element(&field.name, &field.value)?;
        }
        Ok(())
    }

    fn point(&mut self, tag: &str, wpt: &Waypoint) -> Result<()> {
        let lat = wpt.latitude.to_string();
        let lon = wpt.longitude.to_string();
        let mut start = BytesStart::new(tag);
        start.push_attribute(("lat", lat.as_str()));
        start.push_attribute(("lon", lon.as_str()));

        if wpt.name.is_empty() && wpt.extensions.is_empty() {
            return self.event(Event::Empty(start));
        }

        self.event(Event::Start(start))?;
        self.header(&wpt.name, &wpt.extensions)?;
        self.event(Event::End(BytesEnd::new(tag)))
    }

    fn route(&mut self, rte: &Route) -> Result<()> {
        if rte.name.is_empty() && rte.extensions.is_empty() && rte.waypoints.is_empty() {
            return self.event(Event::Empty(BytesStart::new("rte")));
        }

        self.event(Event::Start(BytesStart::new("rte")))?;
        self.header(&rte.name, &rte.extensions)?;
        for pt in &rte.waypoints {
            self.point("rtept", pt)?;
        }
        self.event(Event::End(BytesEnd::new("rte")))
    }

    fn track(&mut self, trk: &Track) -> Result<()> {
        if trk.name.is_empty() && trk.extensions.is_empty() && trk.segments.is_empty() {
            return self.event(Event::Empty(BytesStart::new("trk")));
        }

        self.event(Event::Start(BytesStart::new("trk")))?;
        self.header(&trk.name, &trk.extensions)?;
        for seg in &trk.segments {
            if seg.waypoints.is_empty() {
                self.event(Event::Empty(BytesStart::new("trkseg")))?;
                continue;
            }
            self.event(Event::Start(BytesStart::new("trkseg")))?;
            for pt in &seg.waypoints {
                self.point("trkpt", pt)?;
            }
            self.event(Event::End(BytesEnd::new("trkseg")))?;
        }
        self.event(Event::End(BytesEnd::new("trk")))
    }

    fn finish(self) -> Result<String> {
        String::from_utf8(self.inner.into_inner()).map_err(write_err)
    }
}

fn write_err(e: impl Display) -> GpxError {
    GpxError::Write(e.to_string())
}
