use chrono::DateTime;
use tracing::{debug, instrument};

use crate::error::GpxError;
use crate::geometry::{accumulate_distance, aggregate_elevation, compute_slopes};
use crate::gpx_types::*;
use crate::xml_tree::{Element, TreeQuery, parse_document};

type Result<T> = std::result::Result<T, GpxError>;

/// Parse a GPX XML string into GpxData.
///
/// This is a best-effort extractor: missing elements become `None` and
/// missing or non-numeric `lat`/`lon` attributes become `NaN`, so callers must
/// validate coordinates before use. Only unreadable XML is an error.
#[instrument(skip_all, fields(len = xml.len()))]
pub fn parse_gpx(xml: &str) -> Result<GpxData> {
    let root = parse_document(xml)?;

    let metadata = root
        .first_descendant("metadata")
        .map(parse_metadata)
        .unwrap_or_default();
    let waypoints: Vec<Waypoint> = root.descendants_named("wpt").map(parse_waypoint).collect();
    let routes: Vec<Route> = root
        .descendants_named("rte")
        .map(|rte| parse_sequence(rte, "rtept"))
        .collect();
    let tracks: Vec<Track> = root
        .descendants_named("trk")
        .map(|trk| parse_sequence(trk, "trkpt"))
        .collect();

    debug!(
        waypoints = waypoints.len(),
        routes = routes.len(),
        tracks = tracks.len(),
        "parsed GPX document"
    );

    Ok(GpxData {
        metadata,
        waypoints,
        tracks,
        routes,
    })
}

/// Parse a `<metadata>` element.
fn parse_metadata(metadata: &Element) -> Metadata {
    Metadata {
        name: text(metadata, "name"),
        desc: text(metadata, "desc"),
        time: text(metadata, "time"),
        author: metadata.first_descendant("author").map(parse_author),
        // <author> carries its own <link>, so only a direct child counts here
        link: metadata.direct_child("link").map(parse_link),
    }
}

fn parse_author(author: &Element) -> Author {
    Author {
        name: text(author, "name"),
        email: author.first_descendant("email").map(|email| Email {
            id: email.attribute("id").map(str::to_string),
            domain: email.attribute("domain").map(str::to_string),
        }),
        link: author.first_descendant("link").map(parse_link),
    }
}

/// Parse a `<link>` element.
fn parse_link(link: &Element) -> GpxLink {
    GpxLink {
        href: link.attribute("href").map(str::to_string),
        text: text(link, "text"),
        link_type: text(link, "type"),
    }
}

/// Parse a `<wpt>` element.
fn parse_waypoint(wpt: &Element) -> Waypoint {
    let point = parse_point(wpt);
    Waypoint {
        name: text(wpt, "name"),
        sym: text(wpt, "sym"),
        cmt: text(wpt, "cmt"),
        desc: text(wpt, "desc"),
        lat: point.lat,
        lon: point.lon,
        ele: point.ele,
        time: point.time,
    }
}

/// Parse a `<trk>` or `<rte>` element along with every `point_tag`
/// descendant, then derive its distance, elevation and slope statistics.
///
/// Track segments are flattened into one point sequence.
fn parse_sequence(element: &Element, point_tag: &str) -> PointSequence {
    let points: Vec<GpxPoint> = element.descendants_named(point_tag).map(parse_point).collect();

    let distance = accumulate_distance(&points);
    let elevation = aggregate_elevation(&points);
    let slopes = compute_slopes(&points, &distance.cumul);

    PointSequence {
        name: text(element, "name"),
        cmt: text(element, "cmt"),
        desc: text(element, "desc"),
        src: text(element, "src"),
        number: text(element, "number"),
        link: element.first_descendant("link").map(parse_link),
        // Nested links carry <type> too
        kind: element.direct_child("type").map(|t| t.text.clone()),
        points,
        distance,
        elevation,
        slopes,
    }
}

/// Parse the coordinates, elevation and time of a point element.
fn parse_point(element: &Element) -> GpxPoint {
    GpxPoint {
        lat: parse_coordinate(element, "lat"),
        lon: parse_coordinate(element, "lon"),
        ele: element
            .text_of("ele")
            .and_then(|ele| ele.trim().parse::<f64>().ok())
            .filter(|ele| ele.is_finite()),
        time: element.text_of("time").and_then(parse_time),
    }
}

fn parse_coordinate(element: &Element, attribute: &'static str) -> f64 {
    let raw = element.attribute(attribute).unwrap_or_default();
    raw.trim().parse::<f64>().unwrap_or_else(|_| {
        debug!(element = %element.name, attribute, value = raw, "invalid coordinate");
        f64::NAN
    })
}

/// Parse an RFC 3339 timestamp, assuming UTC when the zone is missing.
fn parse_time(raw: &str) -> Option<Timestamp> {
    let raw = raw.trim();
    DateTime::parse_from_rfc3339(raw)
        .or_else(|e| DateTime::parse_from_rfc3339(&format!("{raw}Z")).map_err(|_| e))
        .map_err(|e| debug!(value = raw, error = %e, "invalid timestamp"))
        .ok()
}

fn text(element: &Element, tag: &str) -> Option<String> {
    element.text_of(tag).map(str::to_string)
}
