pub mod converter;
pub mod error;
pub mod geometry;
pub mod gpx_types;
pub mod options;
pub mod parser;
pub mod xml_tree;

use serde::Serialize;
use wasm_bindgen::prelude::*;

use crate::error::GpxError;
use crate::options::ExportOptions;

pub use crate::converter::to_feature_collection;
pub use crate::gpx_types::GpxData;
pub use crate::parser::parse_gpx;

/// Parse a GPX string, returned as a JS object with `metadata`, `waypoints`,
/// `tracks` and `routes`.
#[wasm_bindgen(js_name = parseGpx)]
pub fn parse_gpx_js(gpx_string: &str) -> Result<JsValue, JsValue> {
    console_error_panic_hook::set_once();

    let gpx_data = parser::parse_gpx(gpx_string)?;
    Ok(to_js(&gpx_data)?)
}

/// Convert GPX string to GeoJSON, returned as a JS object.
#[wasm_bindgen(js_name = gpxToGeoJson)]
pub fn gpx_to_geojson(gpx_string: &str, options: JsValue) -> Result<JsValue, JsValue> {
    console_error_panic_hook::set_once();

    let opts = parse_options(options)?;
    let gpx_data = parser::parse_gpx(gpx_string)?;
    let fc = converter::to_feature_collection(&gpx_data, &opts);
    Ok(to_js(&fc)?)
}

/// Convert GPX string to GeoJSON, returned as a JSON string.
#[wasm_bindgen(js_name = gpxToGeoJsonString)]
pub fn gpx_to_geojson_string(gpx_string: &str, options: JsValue) -> Result<String, JsValue> {
    console_error_panic_hook::set_once();

    let opts = parse_options(options)?;
    let gpx_data = parser::parse_gpx(gpx_string)?;
    let fc = converter::to_feature_collection(&gpx_data, &opts);
    Ok(serde_json::to_string(&fc).map_err(GpxError::from)?)
}

fn parse_options(options: JsValue) -> Result<ExportOptions, GpxError> {
    if options.is_undefined() || options.is_null() {
        Ok(ExportOptions::default())
    } else {
        Ok(serde_wasm_bindgen::from_value(options)?)
    }
}

/// Plain JS objects with `null` for missing values, matching the JSON output.
fn to_js<T: Serialize>(value: &T) -> Result<JsValue, GpxError> {
    let serializer = serde_wasm_bindgen::Serializer::json_compatible();
    Ok(value.serialize(&serializer)?)
}
