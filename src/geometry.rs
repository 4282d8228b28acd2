//! Great-circle geometry over waypoints.
//!
//! All distances are in meters on a sphere of radius [`EARTH_RADIUS_M`].

use tracing::warn;

use crate::gpx_types::{Coordinate, Route, Track, Waypoint};

/// Mean Earth radius in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Haversine distance between two coordinates.
pub fn haversine(a: Coordinate, b: Coordinate) -> f64 {
    let phi1 = a.latitude.to_radians();
    let phi2 = b.latitude.to_radians();
    let half_dphi = (phi2 - phi1) / 2.0;
    let half_dlambda = (b.longitude.to_radians() - a.longitude.to_radians()) / 2.0;

    // rounding can push h just past 1 for antipodal points
    let h = (half_dphi.sin().powi(2) + phi1.cos() * phi2.cos() * half_dlambda.sin().powi(2))
        .min(1.0);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
    c * EARTH_RADIUS_M
}

/// Great-circle distance between two waypoints.
pub fn distance(a: &Waypoint, b: &Waypoint) -> f64 {
    haversine(a.coordinate(), b.coordinate())
}

/// Sum of distances between consecutive waypoints.
pub fn path_length(points: &[Waypoint]) -> f64 {
    points.windows(2).map(|w| distance(&w[0], &w[1])).sum()
}

pub fn route_len(route: &Route) -> f64 {
    path_length(&route.waypoints)
}

/// Segments are measured independently; gaps between segments are not counted.
pub fn track_len(track: &Track) -> f64 {
    track
        .segments
        .iter()
        .map(|s| path_length(&s.waypoints))
        .sum()
}

/// A route is a loop when it has at least four points and its ends are within `delta`.
pub fn is_loop_route(route: &Route, delta: f64) -> bool {
    if delta < 0.0 {
        warn!(delta, "negative loop tolerance");
        return false;
    }
    match (route.waypoints.first(), route.waypoints.last()) {
        (Some(first), Some(last)) if route.waypoints.len() >= 4 => distance(first, last) <= delta,
        _ => false,
    }
}

/// A track is a loop when it has at least four points over all segments and the
/// first point of the first segment is within `delta` of the last point of the last.
pub fn is_loop_track(track: &Track, delta: f64) -> bool {
    if delta < 0.0 {
        warn!(delta, "negative loop tolerance");
        return false;
    }
    match (track.first_point(), track.last_point()) {
        (Some(first), Some(last)) if track.num_points() >= 4 => distance(first, last) <= delta,
        _ => false,
    }
}

/// Truncate to whole meters, then round to the nearest ten (a remainder of 5 rounds up).
pub fn round10(len: f64) -> f64 {
    if len < 0.0 || !len.is_finite() {
        warn!(len, "cannot round a negative or non-finite length");
        return 0.0;
    }
    let whole = len.trunc();
    let rem = whole % 10.0;
    if rem < 5.0 {
        whole - rem
    } else {
        whole + (10.0 - rem)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpx_types::TrackSegment;

    fn pt(lat: f64, lon: f64) -> Waypoint {
        Waypoint::new(lat, lon)
    }

    fn route(points: &[(f64, f64)]) -> Route {
        let mut r = Route::new("r");
        for &(lat, lon) in points {
            r.add_waypoint(pt(lat, lon));
        }
        r
    }

    #[test]
    fn test_one_degree_on_equator() {
        let d = distance(&pt(0.0, 0.0), &pt(0.0, 1.0));
        assert!((d - 111_194.926_644).abs() < 1e-3, "{d}");
    }

    #[test]
    fn test_path_length() {
        assert_eq!(path_length(&[]), 0.0);
        assert_eq!(path_length(&[pt(1.0, 1.0)]), 0.0);
        let r = route(&[(0.0, 0.0), (0.0, 1.0), (0.0, 2.0)]);
        let expected = 2.0 * distance(&pt(0.0, 0.0), &pt(0.0, 1.0));
        assert!((route_len(&r) - expected).abs() < 1e-6);
    }

    #[test]
    fn test_track_segments_not_chained() {
        let mut t = Track::new("t");
        t.segments.push(TrackSegment {
            waypoints: vec![pt(0.0, 0.0), pt(0.0, 0.01)],
        });
        t.segments.push(TrackSegment {
            waypoints: vec![pt(10.0, 10.0), pt(10.0, 10.0)],
        });
        let expected = distance(&pt(0.0, 0.0), &pt(0.0, 0.01));
        assert!((track_len(&t) - expected).abs() < 1e-9);
    }

    #[test]
    fn test_loop_route() {
        let square = route(&[
            (0.0, 0.0),
            (0.0, 0.01),
            (0.01, 0.01),
            (0.01, 0.0),
            (0.0, 0.000_05),
        ]);
        // closing gap is about 5.56 m
        assert!(is_loop_route(&square, 10.0));
        assert!(!is_loop_route(&square, 5.0));
        assert!(!is_loop_route(&square, -1.0));

        let triangle = route(&[(0.0, 0.0), (0.0, 0.01), (0.0, 0.0)]);
        assert!(!is_loop_route(&triangle, 1000.0));
    }

    #[test]
    fn test_loop_track_spans_segments() {
        let mut t = Track::new("t");
        t.segments.push(TrackSegment {
            waypoints: vec![pt(0.0, 0.0), pt(0.0, 0.01)],
        });
        t.segments.push(TrackSegment::default());
        t.segments.push(TrackSegment {
            waypoints: vec![pt(0.01, 0.01), pt(0.0, 0.0)],
        });
        assert!(is_loop_track(&t, 0.0));
        assert!(!is_loop_track(&Track::new("empty"), 100.0));
    }

    #[test]
    fn test_round10() {
        assert_eq!(round10(12.9), 10.0);
        assert_eq!(round10(15.0), 20.0);
        assert_eq!(round10(24.0), 20.0);
        assert_eq!(round10(0.0), 0.0);
        assert_eq!(round10(222_389.853), 222_390.0);
        assert_eq!(round10(-3.0), 0.0);
    }
}
