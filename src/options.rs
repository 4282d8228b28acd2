use serde::Deserialize;

/// Options carried by a [`MarkupSession`](crate::session::MarkupSession).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GpxOptions {
    /// Where `wpt`/`rte`/`trk` elements are recognised (default: anywhere)
    #[serde(default)]
    pub nesting: NestingMode,

    /// Indentation used when serializing (default: 2)
    #[serde(default = "default_indent_width")]
    pub indent_width: usize,

    /// Maximum number of markup nodes accepted by the parser (default: unlimited)
    #[serde(default = "default_nodes_limit")]
    pub nodes_limit: u32,

    /// Parsed schemas kept per session (default: 8)
    #[serde(default = "default_schema_cache_size")]
    pub schema_cache_size: usize,
}

impl Default for GpxOptions {
    fn default() -> Self {
        Self {
            nesting: NestingMode::default(),
            indent_width: default_indent_width(),
            nodes_limit: default_nodes_limit(),
            schema_cache_size: default_schema_cache_size(),
        }
    }
}

/// How deep the tree walker looks for waypoints, routes and tracks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NestingMode {
    /// Every element in the document is inspected, however deeply nested.
    #[default]
    Anywhere,
    /// Only direct children of the root element are inspected.
    Schema,
}

/// Options for the GeoJSON export.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeoJsonOptions {
    /// Include name and extension fields in properties (default: true)
    #[serde(default = "default_true")]
    pub include_metadata: bool,

    /// Which GPX element types to convert (default: all)
    #[serde(default)]
    pub types: Option<Vec<GpxElementType>>,

    /// Join track segments into a single MultiLineString (default: false)
    #[serde(default)]
    pub join_track_segments: bool,
}

impl Default for GeoJsonOptions {
    fn default() -> Self {
        Self {
            include_metadata: true,
            types: None,
            join_track_segments: false,
        }
    }
}

impl GeoJsonOptions {
    pub fn should_include(&self, element_type: GpxElementType) -> bool {
        match &self.types {
            None => true,
            Some(types) => types.contains(&element_type),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GpxElementType {
    Waypoint,
    Route,
    Track,
}

fn default_true() -> bool {
    true
}

fn default_indent_width() -> usize {
    2
}

fn default_nodes_limit() -> u32 {
    u32::MAX
}

fn default_schema_cache_size() -> usize {
    8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_object() {
        let opts: GpxOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(opts.nesting, NestingMode::Anywhere);
        assert_eq!(opts.indent_width, 2);
        assert_eq!(opts.nodes_limit, u32::MAX);
        assert_eq!(opts.schema_cache_size, 8);
    }

    #[test]
    fn test_camel_case_fields() {
        let opts: GpxOptions =
            serde_json::from_str(r#"{"nesting":"schema","indentWidth":4}"#).unwrap();
        assert_eq!(opts.nesting, NestingMode::Schema);
        assert_eq!(opts.indent_width, 4);
    }

    #[test]
    fn test_type_filter() {
        let opts: GeoJsonOptions = serde_json::from_str(r#"{"types":["route"]}"#).unwrap();
        assert!(opts.should_include(GpxElementType::Route));
        assert!(!opts.should_include(GpxElementType::Track));
        assert!(opts.include_metadata);
    }
}
