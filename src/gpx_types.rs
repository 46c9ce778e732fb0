use chrono::{DateTime, FixedOffset};
use serde::Serialize;

pub type Timestamp = DateTime<FixedOffset>;

/// Everything extracted from one GPX document.
#[derive(Debug, Default, Serialize)]
pub struct GpxData {
    pub metadata: Metadata,
    pub waypoints: Vec<Waypoint>,
    pub tracks: Vec<Track>,
    pub routes: Vec<Route>,
}

/// Document-level `<metadata>`. All fields stay `None` when the element is absent.
///
/// `time` is the element's text as written; point times are parsed.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Metadata {
    pub name: Option<String>,
    pub desc: Option<String>,
    pub time: Option<String>,
    pub author: Option<Author>,
    pub link: Option<GpxLink>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Author {
    pub name: Option<String>,
    pub email: Option<Email>,
    pub link: Option<GpxLink>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Email {
    pub id: Option<String>,
    pub domain: Option<String>,
}

/// A GPX link element.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GpxLink {
    pub href: Option<String>,
    pub text: Option<String>,
    #[serde(rename = "type")]
    pub link_type: Option<String>,
}

/// A `<wpt>`. Coordinates are `NaN` when the attribute is missing or not a number.
#[derive(Debug, Clone, Serialize)]
pub struct Waypoint {
    pub name: Option<String>,
    pub sym: Option<String>,
    pub cmt: Option<String>,
    pub desc: Option<String>,
    pub lat: f64,
    pub lon: f64,
    pub ele: Option<f64>,
    pub time: Option<Timestamp>,
}

/// A single `<trkpt>` or `<rtept>`.
#[derive(Debug, Clone, Serialize)]
pub struct GpxPoint {
    pub lat: f64,
    pub lon: f64,
    pub ele: Option<f64>,
    pub time: Option<Timestamp>,
}

impl GpxPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self {
            lat,
            lon,
            ele: None,
            time: None,
        }
    }

    pub fn with_ele(mut self, ele: f64) -> Self {
        self.ele = Some(ele);
        self
    }
}

/// Distance along a point sequence, in meters.
///
/// `cumul` has one entry per point and its last entry equals `total`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Distance {
    pub total: f64,
    pub cumul: Vec<f64>,
}

/// Elevation summary of a point sequence, in meters.
///
/// Any aggregate that comes out as exactly zero is reported as `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Elevation {
    pub max: Option<f64>,
    pub min: Option<f64>,
    pub pos: Option<f64>,
    pub neg: Option<f64>,
    pub avg: Option<f64>,
}

/// A `<trk>` or `<rte>` with its points flattened and its derived statistics.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PointSequence {
    pub name: Option<String>,
    pub cmt: Option<String>,
    pub desc: Option<String>,
    pub src: Option<String>,
    pub number: Option<String>,
    pub link: Option<GpxLink>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub points: Vec<GpxPoint>,
    pub distance: Distance,
    pub elevation: Elevation,
    pub slopes: Vec<f64>,
}

pub type Track = PointSequence;
pub type Route = PointSequence;
