use crate::error::{GpxError, Result};

/// Namespace given to documents that are created without a source file.
pub const GPX_NAMESPACE: &str = "http://www.topografix.com/GPX/1/1";

/// A parsed GPX document. Owns every waypoint, route and track it contains.
#[derive(Debug, Clone, PartialEq)]
pub struct GpxDocument {
    pub namespace: String,
    pub version: f64,
    pub creator: String,
    pub waypoints: Vec<Waypoint>,
    pub routes: Vec<Route>,
    pub tracks: Vec<Track>,
}

impl GpxDocument {
    pub fn new(namespace: impl Into<String>, version: f64, creator: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            version,
            creator: creator.into(),
            waypoints: Vec::new(),
            routes: Vec::new(),
            tracks: Vec::new(),
        }
    }

    pub fn num_waypoints(&self) -> usize {
        self.waypoints.len()
    }

    pub fn num_routes(&self) -> usize {
        self.routes.len()
    }

    pub fn num_tracks(&self) -> usize {
        self.tracks.len()
    }

    /// Total number of segments across all tracks.
    pub fn num_segments(&self) -> usize {
        self.tracks.iter().map(|t| t.segments.len()).sum()
    }

    /// Number of named entities plus extension fields anywhere in the document.
    pub fn num_gpx_data(&self) -> usize {
        let waypoints = data_in_points(&self.waypoints);
        let routes: usize = self
            .routes
            .iter()
            .map(|r| r.extensions.len() + named(&r.name) + data_in_points(&r.waypoints))
            .sum();
        let tracks: usize = self
            .tracks
            .iter()
            .map(|t| {
                t.extensions.len()
                    + named(&t.name)
                    + t.segments
                        .iter()
                        .map(|s| data_in_points(&s.waypoints))
                        .sum::<usize>()
            })
            .sum();
        waypoints + routes + tracks
    }

    pub fn get_waypoint(&self, name: &str) -> Option<&Waypoint> {
        crate::query::find_by_name(&self.waypoints, name)
    }

    pub fn get_route(&self, name: &str) -> Option<&Route> {
        crate::query::find_by_name(&self.routes, name)
    }

    pub fn get_track(&self, name: &str) -> Option<&Track> {
        crate::query::find_by_name(&self.tracks, name)
    }

    /// Append a route after the existing ones.
    pub fn add_route(&mut self, route: Route) {
        self.routes.push(route);
    }
}

fn named(name: &str) -> usize {
    usize::from(!name.is_empty())
}

fn data_in_points(points: &[Waypoint]) -> usize {
    points
        .iter()
        .map(|p| p.extensions.len() + named(&p.name))
        .sum()
}

/// A single point: a standalone `wpt`, a route's `rtept` or a segment's `trkpt`.
#[derive(Debug, Clone, PartialEq)]
pub struct Waypoint {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub extensions: Vec<ExtensionField>,
}

impl Waypoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            name: String::new(),
            latitude,
            longitude,
            extensions: Vec::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.latitude, self.longitude)
    }
}

/// A latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// A GPX route (`<rte>`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Route {
    pub name: String,
    pub waypoints: Vec<Waypoint>,
    pub extensions: Vec<ExtensionField>,
}

impl Route {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Append a waypoint after the existing ones.
    pub fn add_waypoint(&mut self, waypoint: Waypoint) {
        self.waypoints.push(waypoint);
    }
}

/// A GPX track (`<trk>`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Track {
    pub name: String,
    pub segments: Vec<TrackSegment>,
    pub extensions: Vec<ExtensionField>,
}

impl Track {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Number of waypoints across all segments.
    pub fn num_points(&self) -> usize {
        self.segments.iter().map(|s| s.waypoints.len()).sum()
    }

    /// First waypoint of the first segment.
    pub fn first_point(&self) -> Option<&Waypoint> {
        self.segments.first().and_then(|s| s.waypoints.first())
    }

    /// Last waypoint of the last segment.
    pub fn last_point(&self) -> Option<&Waypoint> {
        self.segments.last().and_then(|s| s.waypoints.last())
    }
}

/// A GPX track segment (`<trkseg>`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackSegment {
    pub waypoints: Vec<Waypoint>,
}

/// An unmodeled child element kept as its tag name and text content.
///
/// Equality is structural over name and value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionField {
    pub name: String,
    pub value: String,
}

impl ExtensionField {
    /// Build a field, rejecting an empty name or value.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Result<Self> {
        let name = name.into();
        let value = value.into();
        if name.is_empty() {
            return Err(GpxError::constraint("extension", "element name is empty"));
        }
        if value.is_empty() {
            return Err(GpxError::constraint(&name, "extension value is empty"));
        }
        Ok(Self { name, value })
    }

    pub fn is_valid(&self) -> bool {
        !self.name.is_empty() && !self.value.is_empty()
    }
}

/// Entities that carry a replaceable display name.
pub trait Named {
    fn name(&self) -> &str;

    /// Replace the whole name.
    fn rename(&mut self, new_name: &str);
}

macro_rules! impl_named {
    ($($ty:ty),*) => {
        $(impl Named for $ty {
            fn name(&self) -> &str {
                &self.name
            }

            fn rename(&mut self, new_name: &str) {
                self.name = new_name.to_string();
            }
        })*
    };
}

impl_named!(Waypoint, Route, Track);
