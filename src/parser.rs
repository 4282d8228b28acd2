use std::path::Path;

use roxmltree::{Document as XmlDocument, Node};
use tracing::debug;

use crate::error::{GpxError, Result};
use crate::gpx_types::*;
use crate::options::{GpxOptions, NestingMode};
use crate::schema::text_content;
use crate::session::MarkupSession;

/// Parse a GPX XML string into a [`GpxDocument`] with default options.
pub fn parse_gpx(xml: &str) -> Result<GpxDocument> {
    let session = MarkupSession::new(GpxOptions::default());
    parse_gpx_in(&session, xml)
}

/// Parse a GPX XML string using an existing session.
pub fn parse_gpx_in(session: &MarkupSession, xml: &str) -> Result<GpxDocument> {
    let tree = session.parse(xml)?;
    build_document(&tree, session.options().nesting)
}

/// Parse and build a document from a file. No schema check.
pub fn create_document(path: impl AsRef<Path>) -> Result<GpxDocument> {
    let session = MarkupSession::new(GpxOptions::default());
    read_document(&session, path.as_ref())
}

/// Parse a file, validate it against `schema`, then build the document.
pub fn create_valid_document(
    path: impl AsRef<Path>,
    schema: impl AsRef<Path>,
) -> Result<GpxDocument> {
    let mut session = MarkupSession::new(GpxOptions::default());
    read_valid_document(&mut session, path.as_ref(), schema.as_ref())
}

pub fn read_document(session: &MarkupSession, path: &Path) -> Result<GpxDocument> {
    let text = session.read_source(path)?;
    parse_gpx_in(session, &text)
}

pub fn read_valid_document(
    session: &mut MarkupSession,
    path: &Path,
    schema: &Path,
) -> Result<GpxDocument> {
    let text = session.read_source(path)?;
    let tree = session.parse(&text)?;
    session.validate_tree(&tree, schema)?;
    build_document(&tree, session.options().nesting)
}

/// Build the document model from a parsed markup tree.
///
/// Either the whole document is built or an error is returned; a rejected
/// waypoint, route or track never leaves a partial document behind.
pub fn build_document(tree: &XmlDocument, nesting: NestingMode) -> Result<GpxDocument> {
    let root = tree.root_element();

    let namespace = root.tag_name().namespace().unwrap_or_default();
    if namespace.is_empty() {
        return Err(GpxError::Parse("root element has no namespace".into()));
    }

    let creator = root.attribute("creator").unwrap_or_default();
    if creator.is_empty() {
        return Err(GpxError::Parse("creator attribute is missing or empty".into()));
    }

    let version = root
        .attribute("version")
        .and_then(|v| v.trim().parse::<f64>().ok())
        .unwrap_or(0.0);

    let mut doc = GpxDocument::new(namespace, version, creator);

    match nesting {
        // pre-order over every element below the root, however deep
        NestingMode::Anywhere => {
            for node in root.descendants().skip(1) {
                dispatch(&node, &mut doc)?;
            }
        }
        NestingMode::Schema => {
            for node in root.children() {
                dispatch(&node, &mut doc)?;
            }
        }
    }

    debug!(
        waypoints = doc.num_waypoints(),
        routes = doc.num_routes(),
        tracks = doc.num_tracks(),
        "parsed GPX document"
    );

    Ok(doc)
}

fn dispatch(node: &Node, doc: &mut GpxDocument) -> Result<()> {
    if !node.is_element() {
        return Ok(());
    }
    match node.tag_name().name() {
        "wpt" => doc.waypoints.push(extract_waypoint(node)?),
        "rte" => doc.routes.push(extract_route(node)?),
        "trk" => doc.tracks.push(extract_track(node)?),
        _ => {}
    }
    Ok(())
}

/// Extract a point element (wpt, rtept, trkpt).
fn extract_waypoint(node: &Node) -> Result<Waypoint> {
    let mut point = Waypoint::new(coord_attr(node, "lat"), coord_attr(node, "lon"));

    for child in node.children().filter(|n| n.is_element()) {
        match child.tag_name().name() {
            "name" => point.name = text_content(&child),
            tag => point.extensions.push(extension(&child, tag)?),
        }
    }

    Ok(point)
}

/// Extract a `<rte>` element.
fn extract_route(node: &Node) -> Result<Route> {
    let mut route = Route::default();

    for child in node.children().filter(|n| n.is_element()) {
        match child.tag_name().name() {
            "name" => route.name = text_content(&child),
            "rtept" => route.waypoints.push(extract_waypoint(&child)?),
            tag => route.extensions.push(extension(&child, tag)?),
        }
    }

    Ok(route)
}

/// Extract a `<trk>` element.
fn extract_track(node: &Node) -> Result<Track> {
    let mut track = Track::default();

    for child in node.children().filter(|n| n.is_element()) {
        match child.tag_name().name() {
            "name" => track.name = text_content(&child),
            "trkseg" => track.segments.push(extract_segment(&child)?),
            tag => track.extensions.push(extension(&child, tag)?),
        }
    }

    Ok(track)
}

/// Extract a `<trkseg>` element. Only its `trkpt` children are kept.
fn extract_segment(node: &Node) -> Result<TrackSegment> {
    let waypoints = node
        .children()
        .filter(|n| n.is_element() && n.tag_name().name() == "trkpt")
        .map(|n| extract_waypoint(&n))
        .collect::<Result<Vec<_>>>()?;
    Ok(TrackSegment { waypoints })
}

fn extension(node: &Node, tag: &str) -> Result<ExtensionField> {
    ExtensionField::new(tag, text_content(node))
}

/// Concatenated text of every text node below `node`, entities and CDATA resolved.
fn coord_attr(node: &Node, name: &str) -> f64 {
    node.attribute(name)
        .and_then(|v| v.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    const HEADER: &str = r#"<?xml version="1.0"?>
<gpx xmlns="http://www.topografix.com/GPX/1/1" version="1.1" creator="test">"#;

    fn gpx(body: &str) -> String {
        format!("{HEADER}\n{body}\n</gpx>")
    }

    #[test]
    fn test_minimal_waypoint() {
        let data = parse_gpx(&gpx(r#"<wpt lat="35.6762" lon="139.6503"/>"#)).unwrap();
        assert_eq!(data.waypoints.len(), 1);
        assert!((data.waypoints[0].latitude - 35.6762).abs() < 1e-10);
        assert!((data.waypoints[0].longitude - 139.6503).abs() < 1e-10);
        assert_eq!(data.waypoints[0].name, "");
    }

    #[test]
    fn test_document_attributes() {
        let data = parse_gpx(&gpx("")).unwrap();
        assert_eq!(data.namespace, GPX_NAMESPACE);
        assert_eq!(data.version, 1.1);
        assert_eq!(data.creator, "test");
        assert_eq!(data.num_gpx_data(), 0);
    }

    #[test]
    fn test_waypoint_children_become_extensions() {
        let xml = gpx(r#"<wpt lat="35.6762" lon="139.6503">
    <ele>40.5</ele>
    <name>Tokyo Tower</name>
    <desc>A &amp; B</desc>
    <cmt><![CDATA[<raw>]]></cmt>
  </wpt>"#);
        let data = parse_gpx(&xml).unwrap();
        let pt = &data.waypoints[0];
        assert_eq!(pt.name, "Tokyo Tower");
        assert_eq!(
            pt.extensions,
            vec![
                ExtensionField::new("ele", "40.5").unwrap(),
                ExtensionField::new("desc", "A & B").unwrap(),
                ExtensionField::new("cmt", "<raw>").unwrap(),
            ]
        );
    }

    #[test]
    fn test_missing_or_bad_coordinates_default_to_zero() {
        let data = parse_gpx(&gpx(r#"<wpt lon="abc"/>"#)).unwrap();
        assert_eq!(data.waypoints[0].latitude, 0.0);
        assert_eq!(data.waypoints[0].longitude, 0.0);
    }

    #[test]
    fn test_simple_route() {
        let xml = gpx(r#"<rte>
    <name>Test Route</name>
    <desc>scenic</desc>
    <rtept lat="35.0" lon="139.0"/>
    <rtept lat="36.0" lon="140.0"><ele>5</ele></rtept>
    <rtept lat="37.0" lon="141.0"/>
  </rte>"#);
        let data = parse_gpx(&xml).unwrap();
        assert_eq!(data.routes.len(), 1);
        let route = &data.routes[0];
        assert_eq!(route.name, "Test Route");
        assert_eq!(route.waypoints.len(), 3);
        assert_eq!(route.extensions, vec![ExtensionField::new("desc", "scenic").unwrap()]);
        assert_eq!(route.waypoints[1].extensions.len(), 1);
    }

    #[test]
    fn test_multi_segment_track() {
        let xml = gpx(r#"<trk>
    <name>Morning Run</name>
    <type>running</type>
    <trkseg>
      <trkpt lat="35.0" lon="139.0"/>
      <trkpt lat="35.1" lon="139.1"/>
    </trkseg>
    <trkseg></trkseg>
    <trkseg>
      <trkpt lat="36.0" lon="140.0"/>
    </trkseg>
  </trk>"#);
        let data = parse_gpx(&xml).unwrap();
        let track = &data.tracks[0];
        assert_eq!(track.name, "Morning Run");
        assert_eq!(track.segments.len(), 3);
        assert_eq!(track.segments[1].waypoints.len(), 0);
        assert_eq!(track.num_points(), 3);
        assert_eq!(track.extensions, vec![ExtensionField::new("type", "running").unwrap()]);
    }

    #[test]
    fn test_empty_extension_fails_whole_parse() {
        let xml = gpx(r#"<wpt lat="1" lon="1"><name>ok</name></wpt>
  <wpt lat="2" lon="2"><ele></ele></wpt>"#);
        let err = parse_gpx(&xml).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Constraint);

        let xml = gpx(r#"<trk><trkseg><trkpt lat="0" lon="0"><sym/></trkpt></trkseg></trk>"#);
        assert_eq!(parse_gpx(&xml).unwrap_err().kind(), ErrorKind::Constraint);
    }

    #[test]
    fn test_whitespace_extension_is_kept() {
        let data = parse_gpx(&gpx(r#"<wpt lat="0" lon="0"><desc> </desc></wpt>"#)).unwrap();
        assert_eq!(data.waypoints[0].extensions[0].value, " ");
    }

    #[test]
    fn test_missing_namespace_or_creator() {
        let no_ns = r#"<gpx version="1.1" creator="x"><wpt lat="0" lon="0"/></gpx>"#;
        assert_eq!(parse_gpx(no_ns).unwrap_err().kind(), ErrorKind::Parse);

        let no_creator = r#"<gpx xmlns="http://www.topografix.com/GPX/1/1" version="1.1"/>"#;
        assert_eq!(parse_gpx(no_creator).unwrap_err().kind(), ErrorKind::Parse);

        let empty_creator =
            r#"<gpx xmlns="http://www.topografix.com/GPX/1/1" version="1.1" creator=""/>"#;
        assert_eq!(parse_gpx(empty_creator).unwrap_err().kind(), ErrorKind::Parse);
    }

    #[test]
    fn test_malformed_xml() {
        assert_eq!(parse_gpx("<gpx").unwrap_err().kind(), ErrorKind::Parse);
    }

    #[test]
    fn test_nested_entities_found_anywhere() {
        let xml = gpx(r#"<metadata><wpt lat="1" lon="2"/></metadata>
  <wpt lat="3" lon="4"/>"#);
        let data = parse_gpx(&xml).unwrap();
        assert_eq!(data.waypoints.len(), 2);
        // document order is preserved
        assert_eq!(data.waypoints[0].latitude, 1.0);
    }

    #[test]
    fn test_schema_nesting_only_reads_root_children() {
        let xml = gpx(r#"<metadata><wpt lat="1" lon="2"/></metadata>
  <wpt lat="3" lon="4"/>"#);
        let tree = XmlDocument::parse(&xml).unwrap();
        let data = build_document(&tree, NestingMode::Schema).unwrap();
        assert_eq!(data.waypoints.len(), 1);
        assert_eq!(data.waypoints[0].latitude, 3.0);
    }

    #[test]
    fn test_prefixed_root() {
        let xml = r#"<g:gpx xmlns:g="http://www.topografix.com/GPX/1/1" version="1.1" creator="p">
  <g:wpt lat="1" lon="1"><g:name>A</g:name></g:wpt>
</g:gpx>"#;
        let data = parse_gpx(xml).unwrap();
        assert_eq!(data.waypoints[0].name, "A");
    }
}
