use tracing::{info, warn};

use crate::error::{GpxError, Result};
use crate::geometry::{haversine, route_len, track_len};
use crate::gpx_types::*;

/// First item (in list order) whose name equals `name` exactly.
pub fn find_by_name<'a, T: Named>(items: &'a [T], name: &str) -> Option<&'a T> {
    items.iter().find(|item| item.name() == name)
}

/// Routes and tracks: things with a length and two ends.
pub trait Measured {
    fn length(&self) -> f64;

    /// First and last point, or `None` when there are no points.
    fn endpoints(&self) -> Option<(&Waypoint, &Waypoint)>;
}

impl Measured for Route {
    fn length(&self) -> f64 {
        route_len(self)
    }

    fn endpoints(&self) -> Option<(&Waypoint, &Waypoint)> {
        Some((self.waypoints.first()?, self.waypoints.last()?))
    }
}

impl Measured for Track {
    fn length(&self) -> f64 {
        track_len(self)
    }

    fn endpoints(&self) -> Option<(&Waypoint, &Waypoint)> {
        Some((self.first_point()?, self.last_point()?))
    }
}

/// Number of items whose length is within `delta` of `target`.
/// Negative arguments count nothing.
pub fn count_by_length<T: Measured>(items: &[T], target: f64, delta: f64) -> usize {
    if target < 0.0 || delta < 0.0 {
        warn!(target, delta, "length and tolerance must not be negative");
        return 0;
    }
    items
        .iter()
        .filter(|item| (item.length() - target).abs() <= delta)
        .count()
}

/// Items that start within `delta` of `source` and end within `delta` of `dest`,
/// in list order.
///
/// `Ok` with an empty list means nothing matched; a negative tolerance is an error.
pub fn find_between<'a, T: Measured>(
    items: &'a [T],
    source: Coordinate,
    dest: Coordinate,
    delta: f64,
) -> Result<Vec<&'a T>> {
    if delta < 0.0 {
        return Err(GpxError::Usage(format!("tolerance {delta} is negative")));
    }

    let found: Vec<&T> = items
        .iter()
        .filter(|item| match item.endpoints() {
            Some((first, last)) => {
                haversine(first.coordinate(), source) <= delta
                    && haversine(last.coordinate(), dest) <= delta
            }
            None => false,
        })
        .collect();

    if found.is_empty() {
        info!(delta, "no matches between the given points");
    }
    Ok(found)
}

impl GpxDocument {
    pub fn num_routes_with_length(&self, len: f64, delta: f64) -> usize {
        count_by_length(&self.routes, len, delta)
    }

    pub fn num_tracks_with_length(&self, len: f64, delta: f64) -> usize {
        count_by_length(&self.tracks, len, delta)
    }

    pub fn routes_between(
        &self,
        source: Coordinate,
        dest: Coordinate,
        delta: f64,
    ) -> Result<Vec<&Route>> {
        find_between(&self.routes, source, dest, delta)
    }

    pub fn tracks_between(
        &self,
        source: Coordinate,
        dest: Coordinate,
        delta: f64,
    ) -> Result<Vec<&Track>> {
        find_between(&self.tracks, source, dest, delta)
    }
}
