use geojson::{Feature, FeatureCollection, Geometry, JsonObject, Value};
use serde_json::{Map, Value as JsonValue};
use tracing::debug;

use crate::gpx_types::*;
use crate::options::{ExportOptions, GpxElementType};

/// Convert parsed GPX data to a GeoJSON FeatureCollection.
///
/// Features come out as tracks, then routes, then waypoints, each in document
/// order. Missing elevations serialize as `null` in the coordinate triples.
pub fn to_feature_collection(data: &GpxData, opts: &ExportOptions) -> FeatureCollection {
    let mut features = Vec::new();

    if opts.should_include(GpxElementType::Track) {
        features.extend(data.tracks.iter().map(sequence_to_feature));
    }

    if opts.should_include(GpxElementType::Route) {
        features.extend(data.routes.iter().map(sequence_to_feature));
    }

    if opts.should_include(GpxElementType::Waypoint) {
        features.extend(data.waypoints.iter().map(waypoint_to_feature));
    }

    let mut foreign_members = JsonObject::new();
    foreign_members.insert(
        "properties".to_string(),
        JsonValue::Object(metadata_props(&data.metadata)),
    );

    FeatureCollection {
        bbox: None,
        features,
        foreign_members: Some(foreign_members),
    }
}

fn metadata_props(metadata: &Metadata) -> Map<String, JsonValue> {
    let mut props = Map::new();
    insert_optional(&mut props, "name", &metadata.name);
    insert_optional(&mut props, "desc", &metadata.desc);
    insert_optional(&mut props, "time", &metadata.time);
    props.insert("author".to_string(), to_json(&metadata.author));
    props.insert("link".to_string(), to_json(&metadata.link));
    props
}

fn sequence_to_feature(seq: &PointSequence) -> Feature {
    let coords: Vec<Vec<f64>> = seq
        .points
        .iter()
        .map(|pt| point_coords(pt.lon, pt.lat, pt.ele))
        .collect();

    let mut props = Map::new();
    insert_optional(&mut props, "name", &seq.name);
    insert_optional(&mut props, "cmt", &seq.cmt);
    insert_optional(&mut props, "desc", &seq.desc);
    insert_optional(&mut props, "src", &seq.src);
    insert_optional(&mut props, "number", &seq.number);
    props.insert("link".to_string(), to_json(&seq.link));
    insert_optional(&mut props, "type", &seq.kind);

    feature(Value::LineString(coords), props)
}

fn waypoint_to_feature(wpt: &Waypoint) -> Feature {
    let mut props = Map::new();
    insert_optional(&mut props, "name", &wpt.name);
    insert_optional(&mut props, "sym", &wpt.sym);
    insert_optional(&mut props, "cmt", &wpt.cmt);
    insert_optional(&mut props, "desc", &wpt.desc);

    feature(Value::Point(point_coords(wpt.lon, wpt.lat, wpt.ele)), props)
}

fn feature(value: Value, props: Map<String, JsonValue>) -> Feature {
    Feature {
        bbox: None,
        geometry: Some(Geometry::new(value)),
        id: None,
        properties: Some(props),
        foreign_members: None,
    }
}

/// Build a [lon, lat, ele] position; a missing elevation is `NaN`, which
/// serializes as `null`.
fn point_coords(lon: f64, lat: f64, ele: Option<f64>) -> Vec<f64> {
    vec![lon, lat, ele.unwrap_or(f64::NAN)]
}

fn insert_optional(props: &mut Map<String, JsonValue>, key: &str, value: &Option<String>) {
    let value = value.clone().map_or(JsonValue::Null, JsonValue::String);
    props.insert(key.to_string(), value);
}

fn to_json<T: serde::Serialize>(value: &T) -> JsonValue {
    serde_json::to_value(value).unwrap_or_else(|e| {
        debug!(error = %e, "failed to serialize property");
        JsonValue::Null
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_gpx;

    fn convert(xml: &str) -> FeatureCollection {
        let data = parse_gpx(xml).unwrap();
        to_feature_collection(&data, &ExportOptions::default())
    }

    #[test]
    fn test_waypoint_conversion() {
        let xml = r#"<?xml version="1.0"?>
<gpx version="1.1">
  <wpt lat="35.6762" lon="139.6503">
    <ele>40.5</ele>
    <name>Tokyo</name>
    <sym>Flag</sym>
  </wpt>
</gpx>"#;
        let fc = convert(xml);

        assert_eq!(fc.features.len(), 1);
        let f = &fc.features[0];
        let geom = f.geometry.as_ref().unwrap();

        // Check [lon, lat, ele] order
        if let Value::Point(coords) = &geom.value {
            assert!((coords[0] - 139.6503).abs() < 1e-10); // lon
            assert!((coords[1] - 35.6762).abs() < 1e-10); // lat
            assert!((coords[2] - 40.5).abs() < 1e-10); // ele
        } else {
            panic!("Expected Point geometry");
        }

        let props = f.properties.as_ref().unwrap();
        assert_eq!(props["name"], "Tokyo");
        assert_eq!(props["sym"], "Flag");
        assert!(props["cmt"].is_null());
        assert!(props["desc"].is_null());
        assert_eq!(props.len(), 4);
    }

    #[test]
    fn test_missing_elevation_serializes_null() {
        let fc = convert(r#"<gpx><wpt lat="48.8566" lon="2.3522"/></gpx>"#);
        let json = serde_json::to_value(&fc).unwrap();
        let coords = &json["features"][0]["geometry"]["coordinates"];
        assert_eq!(coords[0], 2.3522);
        assert_eq!(coords[1], 48.8566);
        assert!(coords[2].is_null());
    }

    #[test]
    fn test_feature_order_tracks_routes_waypoints() {
        let xml = r#"<?xml version="1.0"?>
<gpx version="1.1">
  <wpt lat="35.0" lon="139.0"><name>W</name></wpt>
  <rte><name>R</name><rtept lat="35.0" lon="139.0"/><rtept lat="36.0" lon="140.0"/></rte>
  <trk><name>T</name><trkseg><trkpt lat="35.0" lon="139.0"/></trkseg></trk>
</gpx>"#;
        let fc = convert(xml);
        let names: Vec<&str> = fc
            .features
            .iter()
            .map(|f| f.properties.as_ref().unwrap()["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["T", "R", "W"]);

        let json = serde_json::to_value(&fc).unwrap();
        let kinds: Vec<&str> = json["features"]
            .as_array()
            .unwrap()
            .iter()
            .map(|f| f["geometry"]["type"].as_str().unwrap())
            .collect();
        assert_eq!(kinds, vec!["LineString", "LineString", "Point"]);
    }

    #[test]
    fn test_track_properties() {
        let xml = r#"<?xml version="1.0"?>
<gpx version="1.1">
  <trk>
    <name>Run</name>
    <src>Watch</src>
    <number>3</number>
    <link href="https://example.com/run"><text>Run</text></link>
    <type>running</type>
    <trkseg>
      <trkpt lat="35.0" lon="139.0"><ele>10</ele></trkpt>
      <trkpt lat="35.001" lon="139.001"><ele>12</ele></trkpt>
    </trkseg>
  </trk>
</gpx>"#;
        let fc = convert(xml);
        let f = &fc.features[0];
        let props = f.properties.as_ref().unwrap();
        assert_eq!(props["name"], "Run");
        assert_eq!(props["src"], "Watch");
        assert_eq!(props["number"], "3");
        assert_eq!(props["type"], "running");
        assert_eq!(props["link"]["href"], "https://example.com/run");
        assert_eq!(props["link"]["text"], "Run");
        assert!(props["link"]["type"].is_null());
        assert!(props["cmt"].is_null());

        if let Value::LineString(coords) = &f.geometry.as_ref().unwrap().value {
            assert_eq!(coords.len(), 2);
            assert!((coords[1][0] - 139.001).abs() < 1e-10);
            assert!((coords[1][1] - 35.001).abs() < 1e-10);
            assert!((coords[1][2] - 12.0).abs() < 1e-10);
        } else {
            panic!("Expected LineString");
        }
    }

    #[test]
    fn test_empty_model() {
        let fc = to_feature_collection(&GpxData::default(), &ExportOptions::default());
        assert!(fc.features.is_empty());

        let json = serde_json::to_value(&fc).unwrap();
        assert_eq!(json["type"], "FeatureCollection");
        let props = json["properties"].as_object().unwrap();
        for key in ["name", "desc", "time", "author", "link"] {
            assert!(props[key].is_null(), "{key} should be null");
        }
    }

    #[test]
    fn test_metadata_properties() {
        let xml = r#"<gpx>
  <metadata>
    <name>Outing</name>
    <author><name>Jo</name><email id="jo" domain="example.com"/></author>
    <link href="https://example.com"/>
    <time>2025-03-01T10:00:00Z</time>
  </metadata>
</gpx>"#;
        let json = serde_json::to_value(convert(xml)).unwrap();
        let props = &json["properties"];
        assert_eq!(props["name"], "Outing");
        assert_eq!(props["time"], "2025-03-01T10:00:00Z");
        assert_eq!(props["author"]["name"], "Jo");
        assert_eq!(props["author"]["email"]["domain"], "example.com");
        assert_eq!(props["link"]["href"], "https://example.com");
    }

    #[test]
    fn test_type_filter() {
        let xml = r#"<?xml version="1.0"?>
<gpx version="1.1">
  <wpt lat="35.0" lon="139.0"/>
  <rte><rtept lat="35.0" lon="139.0"/><rtept lat="36.0" lon="140.0"/></rte>
  <trk><trkseg><trkpt lat="35.0" lon="139.0"/><trkpt lat="36.0" lon="140.0"/></trkseg></trk>
</gpx>"#;
        let data = parse_gpx(xml).unwrap();
        let opts = ExportOptions {
            types: Some(vec![GpxElementType::Waypoint]),
            ..Default::default()
        };
        let fc = to_feature_collection(&data, &opts);

        assert_eq!(fc.features.len(), 1);
        let geom = fc.features[0].geometry.as_ref().unwrap();
        assert!(matches!(geom.value, Value::Point(_)));
    }

    #[test]
    fn test_metadata_emitted_with_type_filter() {
        let data = parse_gpx("<gpx><metadata><name>X</name></metadata></gpx>").unwrap();
        let opts: ExportOptions =
            serde_json::from_str(r#"{"types": ["route"], "includeMetadata": false}"#).unwrap();
        let json = serde_json::to_value(to_feature_collection(&data, &opts)).unwrap();
        assert_eq!(json["properties"]["name"], "X");
        assert!(json["features"].as_array().unwrap().is_empty());
    }

    struct Unserializable;

    impl serde::Serialize for Unserializable {
        fn serialize<S: serde::Serializer>(&self, _: S) -> Result<S::Ok, S::Error> {
            Err(serde::ser::Error::custom("refused"))
        }
    }

    #[test]
    fn test_to_json_failure_is_null() {
        assert_eq!(to_json(&Unserializable), JsonValue::Null);
        assert_eq!(to_json(&Some("x")), JsonValue::String("x".to_string()));
    }
}
