use geojson::{Feature, FeatureCollection, Geometry, Value};
use serde_json::{Map, Value as JsonValue};

use crate::codec::CODEC_LOOP_TOLERANCE_M;
use crate::geometry::{is_loop_route, is_loop_track, route_len, track_len};
use crate::gpx_types::*;
use crate::options::{GeoJsonOptions, GpxElementType};

type Props = Map<String, JsonValue>;

/// Convert a GPX document to a GeoJSON FeatureCollection.
pub fn to_feature_collection(doc: &GpxDocument, opts: &GeoJsonOptions) -> FeatureCollection {
    let mut features = Vec::new();

    if opts.should_include(GpxElementType::Waypoint) {
        for wpt in &doc.waypoints {
            features.push(point_feature(wpt, point_props(wpt, "waypoint", opts)));
        }
    }

    if opts.should_include(GpxElementType::Route) {
        for rte in &doc.routes {
            let props = route_props(rte, opts);
            match rte.waypoints.as_slice() {
                [] => {}
                [only] => features.push(point_feature(only, props)),
                points => features.push(feature(Value::LineString(line(points)), props)),
            }
        }
    }

    if opts.should_include(GpxElementType::Track) {
        for trk in &doc.tracks {
            features.extend(track_to_features(trk, opts));
        }
    }

    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

fn track_to_features(trk: &Track, opts: &GeoJsonOptions) -> Vec<Feature> {
    let segments: Vec<&TrackSegment> = trk
        .segments
        .iter()
        .filter(|s| !s.waypoints.is_empty())
        .collect();

    // Single point across all segments → Point Feature
    if trk.num_points() == 1 {
        return segments
            .first()
            .and_then(|s| s.waypoints.first())
            .map(|pt| vec![point_feature(pt, track_props(trk, opts))])
            .unwrap_or_default();
    }

    let lines: Vec<Vec<Vec<f64>>> = segments
        .iter()
        .filter(|s| s.waypoints.len() >= 2)
        .map(|s| line(&s.waypoints))
        .collect();

    match lines.len() {
        0 => Vec::new(),
        1 => lines
            .into_iter()
            .map(|l| feature(Value::LineString(l), track_props(trk, opts)))
            .collect(),
        _ if opts.join_track_segments => {
            vec![feature(Value::MultiLineString(lines), track_props(trk, opts))]
        }
        _ => lines
            .into_iter()
            .map(|l| feature(Value::LineString(l), track_props(trk, opts)))
            .collect(),
    }
}

fn feature(value: Value, props: Props) -> Feature {
    Feature {
        bbox: None,
        geometry: Some(Geometry::new(value)),
        id: None,
        properties: Some(props),
        foreign_members: None,
    }
}

fn point_feature(pt: &Waypoint, props: Props) -> Feature {
    feature(Value::Point(coords(pt)), props)
}

/// GeoJSON positions are [lon, lat].
fn coords(pt: &Waypoint) -> Vec<f64> {
    vec![pt.longitude, pt.latitude]
}

fn line(points: &[Waypoint]) -> Vec<Vec<f64>> {
    points.iter().map(coords).collect()
}

fn base_props(gpx_type: &str, name: &str, extensions: &[ExtensionField], opts: &GeoJsonOptions) -> Props {
    let mut props = Map::new();
    props.insert("gpxType".to_string(), JsonValue::String(gpx_type.to_string()));

    if opts.include_metadata {
        if !name.is_empty() {
            props.insert("name".to_string(), JsonValue::String(name.to_string()));
        }
        for field in extensions {
            props
                .entry(field.name.clone())
                .or_insert_with(|| JsonValue::String(field.value.clone()));
        }
    }

    props
}

fn point_props(pt: &Waypoint, gpx_type: &str, opts: &GeoJsonOptions) -> Props {
    base_props(gpx_type, &pt.name, &pt.extensions, opts)
}

fn insert_measure(props: &mut Props, len: f64, is_loop: bool) {
    if let Some(n) = serde_json::Number::from_f64(len) {
        props.insert("len".to_string(), JsonValue::Number(n));
    }
    props.insert("loop".to_string(), JsonValue::Bool(is_loop));
}

fn route_props(rte: &Route, opts: &GeoJsonOptions) -> Props {
    let mut props = base_props("route", &rte.name, &rte.extensions, opts);
    insert_measure(
        &mut props,
        route_len(rte),
        is_loop_route(rte, CODEC_LOOP_TOLERANCE_M),
    );
    props
}

fn track_props(trk: &Track, opts: &GeoJsonOptions) -> Props {
    let mut props = base_props("track", &trk.name, &trk.extensions, opts);
    insert_measure(
        &mut props,
        track_len(trk),
        is_loop_track(trk, CODEC_LOOP_TOLERANCE_M),
    );
    props
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_gpx;

    fn gpx(body: &str) -> String {
        format!(
            r#"<?xml version="1.0"?>
<gpx xmlns="http://www.topografix.com/GPX/1/1" version="1.1" creator="test">
{body}
</gpx>"#
        )
    }

    #[test]
    fn test_waypoint_conversion() {
        let xml = gpx(r#"<wpt lat="35.6762" lon="139.6503">
    <ele>40.5</ele>
    <name>Tokyo</name>
  </wpt>"#);
        let data = parse_gpx(&xml).unwrap();
        let fc = to_feature_collection(&data, &GeoJsonOptions::default());

        assert_eq!(fc.features.len(), 1);
        let f = &fc.features[0];
        let geom = f.geometry.as_ref().unwrap();

        // Check [lon, lat] order
        if let Value::Point(coords) = &geom.value {
            assert!((coords[0] - 139.6503).abs() < 1e-10);
            assert!((coords[1] - 35.6762).abs() < 1e-10);
        } else {
            panic!("Expected Point geometry");
        }

        let props = f.properties.as_ref().unwrap();
        assert_eq!(props["gpxType"], "waypoint");
        assert_eq!(props["name"], "Tokyo");
        assert_eq!(props["ele"], "40.5");
    }

    #[test]
    fn test_route_measures() {
        let xml = gpx(r#"<rte><name>R1</name>
    <rtept lat="0" lon="0"/><rtept lat="0" lon="1"/><rtept lat="0" lon="2"/>
  </rte>"#);
        let data = parse_gpx(&xml).unwrap();
        let fc = to_feature_collection(&data, &GeoJsonOptions::default());

        let props = fc.features[0].properties.as_ref().unwrap();
        assert_eq!(props["gpxType"], "route");
        let len = props["len"].as_f64().unwrap();
        assert!((len - 222_389.853).abs() < 1e-2);
        assert_eq!(props["loop"], false);
    }

    #[test]
    fn test_multi_segment_join() {
        let xml = gpx(r#"<trk>
    <trkseg><trkpt lat="35.0" lon="139.0"/><trkpt lat="35.001" lon="139.001"/></trkseg>
    <trkseg><trkpt lat="36.0" lon="140.0"/><trkpt lat="36.001" lon="140.001"/></trkseg>
  </trk>"#);
        let data = parse_gpx(&xml).unwrap();
        let opts = GeoJsonOptions {
            join_track_segments: true,
            ..Default::default()
        };
        let fc = to_feature_collection(&data, &opts);

        assert_eq!(fc.features.len(), 1);
        match &fc.features[0].geometry.as_ref().unwrap().value {
            Value::MultiLineString(lines) => assert_eq!(lines.len(), 2),
            _ => panic!("Expected MultiLineString"),
        }

        let fc = to_feature_collection(&data, &GeoJsonOptions::default());
        assert_eq!(fc.features.len(), 2);
    }

    #[test]
    fn test_single_point_track() {
        let xml = gpx(r#"<trk><name>Single</name><trkseg></trkseg>
    <trkseg><trkpt lat="35.0" lon="139.0"/></trkseg></trk>"#);
        let data = parse_gpx(&xml).unwrap();
        let fc = to_feature_collection(&data, &GeoJsonOptions::default());

        assert_eq!(fc.features.len(), 1);
        match &fc.features[0].geometry.as_ref().unwrap().value {
            Value::Point(_) => {}
            _ => panic!("Expected Point geometry for single-point track"),
        }
    }

    #[test]
    fn test_without_metadata() {
        let xml = gpx(r#"<wpt lat="1" lon="1"><name>A</name><sym>Flag</sym></wpt>"#);
        let data = parse_gpx(&xml).unwrap();
        let opts = GeoJsonOptions {
            include_metadata: false,
            ..Default::default()
        };
        let fc = to_feature_collection(&data, &opts);
        let props = fc.features[0].properties.as_ref().unwrap();
        assert_eq!(props.len(), 1);
    }

    #[test]
    fn test_type_filter() {
        let xml = gpx(r#"<wpt lat="35.0" lon="139.0"/>
  <rte><rtept lat="35.0" lon="139.0"/><rtept lat="36.0" lon="140.0"/></rte>
  <trk><trkseg><trkpt lat="35.0" lon="139.0"/><trkpt lat="36.0" lon="140.0"/></trkseg></trk>"#);
        let data = parse_gpx(&xml).unwrap();
        let opts = GeoJsonOptions {
            types: Some(vec![GpxElementType::Waypoint]),
            ..Default::default()
        };
        let fc = to_feature_collection(&data, &opts);

        assert_eq!(fc.features.len(), 1);
        let props = fc.features[0].properties.as_ref().unwrap();
        assert_eq!(props["gpxType"], "waypoint");
    }
}
