pub mod codec;
pub mod converter;
pub mod error;
pub mod geometry;
pub mod gpx_types;
pub mod options;
pub mod parser;
pub mod query;
pub mod schema;
pub mod session;
pub mod validator;
pub mod workflow;
pub mod writer;

use wasm_bindgen::prelude::*;

pub use crate::error::{ErrorKind, GpxError};
pub use crate::gpx_types::*;
pub use crate::options::{GeoJsonOptions, GpxElementType, GpxOptions, NestingMode};
pub use crate::parser::{create_document, create_valid_document, parse_gpx};
pub use crate::query::{Measured, count_by_length, find_between, find_by_name};
pub use crate::session::MarkupSession;
pub use crate::validator::{check_document, validate_document};
pub use crate::writer::{GPX_EXTENSION, to_gpx_string, write_document};

/// Document summary (`{"version":..,"creator":..,...}`) of a GPX string.
#[wasm_bindgen(js_name = gpxSummaryJson)]
pub fn gpx_summary_json(gpx_string: &str) -> std::result::Result<String, JsValue> {
    console_error_panic_hook::set_once();

    let doc = parser::parse_gpx(gpx_string)?;
    Ok(codec::gpx_to_json(&doc))
}

/// Route summaries of a GPX string as a JSON array.
#[wasm_bindgen(js_name = gpxRouteListJson)]
pub fn gpx_route_list_json(gpx_string: &str) -> std::result::Result<String, JsValue> {
    console_error_panic_hook::set_once();

    let doc = parser::parse_gpx(gpx_string)?;
    Ok(codec::route_list_to_json(&doc.routes))
}

/// Track summaries of a GPX string as a JSON array.
#[wasm_bindgen(js_name = gpxTrackListJson)]
pub fn gpx_track_list_json(gpx_string: &str) -> std::result::Result<String, JsValue> {
    console_error_panic_hook::set_once();

    let doc = parser::parse_gpx(gpx_string)?;
    Ok(codec::track_list_to_json(&doc.tracks))
}

/// Convert GPX string to GeoJSON, returned as a JS object.
#[wasm_bindgen(js_name = gpxToGeoJson)]
pub fn gpx_to_geojson(gpx_string: &str, options: JsValue) -> std::result::Result<JsValue, JsValue> {
    console_error_panic_hook::set_once();

    let opts = parse_options(options)?;
    let doc = parser::parse_gpx(gpx_string)?;
    let fc = converter::to_feature_collection(&doc, &opts);
    serde_wasm_bindgen::to_value(&fc).map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Convert GPX string to GeoJSON, returned as a JSON string.
#[wasm_bindgen(js_name = gpxToGeoJsonString)]
pub fn gpx_to_geojson_string(
    gpx_string: &str,
    options: JsValue,
) -> std::result::Result<String, JsValue> {
    console_error_panic_hook::set_once();

    let opts = parse_options(options)?;
    let doc = parser::parse_gpx(gpx_string)?;
    let fc = converter::to_feature_collection(&doc, &opts);
    serde_json::to_string(&fc).map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Parse and re-serialize, keeping only the modeled subset of the markup.
#[wasm_bindgen(js_name = normalizeGpx)]
pub fn normalize_gpx(gpx_string: &str) -> std::result::Result<String, JsValue> {
    console_error_panic_hook::set_once();

    let doc = parser::parse_gpx(gpx_string)?;
    Ok(writer::to_gpx_string(&doc)?)
}

fn parse_options(options: JsValue) -> std::result::Result<GeoJsonOptions, JsValue> {
    if options.is_undefined() || options.is_null() {
        Ok(GeoJsonOptions::default())
    } else {
        serde_wasm_bindgen::from_value(options).map_err(|e| JsValue::from_str(&e.to_string()))
    }
}
