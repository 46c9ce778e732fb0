use std::str::Utf8Error;

use quick_xml::events::attributes::AttrError;
use wasm_bindgen::JsValue;

/// Failures that abort a whole parse or export call.
///
/// Everything short of an unreadable document is tolerated by the parser:
/// missing elements become `None` and bad coordinates become `NaN`.
#[derive(Debug, thiserror::Error)]
pub enum GpxError {
    #[error("XML parse error: {0}")]
    XmlParse(#[from] quick_xml::Error),

    #[error("XML attribute error: {0}")]
    XmlAttribute(#[from] AttrError),

    #[error("invalid UTF-8 in document: {0}")]
    Encoding(#[from] Utf8Error),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for GpxError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

impl From<serde_wasm_bindgen::Error> for GpxError {
    fn from(e: serde_wasm_bindgen::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

impl From<GpxError> for JsValue {
    fn from(e: GpxError) -> Self {
        JsValue::from_str(&e.to_string())
    }
}
