use geojson::{Feature, FeatureCollection, Geometry, Value};
use serde_json::{Map, Value as JsonValue};

use crate::error::{Gpx2GeoJsonError, Result};
use crate::gpx_types::*;
use crate::options::{ConvertOptions, Dimensions};

/// Convert a parsed GPX document to a GeoJSON FeatureCollection.
///
/// Every track becomes exactly one LineString feature built from its first
/// segment, so the output has as many features as the input has tracks.
pub fn to_feature_collection(
    doc: &GpxDocument,
    opts: &ConvertOptions,
) -> Result<FeatureCollection> {
    let features = doc
        .tracks
        .iter()
        .enumerate()
        .map(|(index, trk)| track_to_feature(index, trk, opts))
        .collect::<Result<Vec<_>>>()?;

    log::debug!(
        "converted {} track(s) with {:?} coordinates",
        features.len(),
        opts.dimensions
    );

    Ok(FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    })
}

fn track_to_feature(index: usize, trk: &GpxTrack, opts: &ConvertOptions) -> Result<Feature> {
    let segment = trk
        .first_segment()
        .ok_or(Gpx2GeoJsonError::MissingSegment { track: index })?;

    if trk.segments.len() > 1 {
        log::warn!(
            "track #{index} ({:?}) has {} segments, only the first is converted",
            trk.name.as_deref().unwrap_or_default(),
            trk.segments.len()
        );
    }

    let coords = segment
        .points
        .iter()
        .enumerate()
        .map(|(point, pt)| {
            point_coords(pt, opts.dimensions).ok_or(Gpx2GeoJsonError::MissingTime {
                track: index,
                point,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let geometry = Geometry::new(Value::LineString(coords));

    Ok(Feature {
        bbox: None,
        geometry: Some(geometry),
        id: None,
        properties: Some(build_track_props(trk, opts)),
        foreign_members: None,
    })
}

/// Build `[lon, lat]` or `[lon, lat, ele, unix_seconds]`.
///
/// Missing elevation maps to 0. Returns `None` when the XYZM layout needs a
/// timestamp the point does not have.
pub fn point_coords(pt: &GpxTrackPoint, dimensions: Dimensions) -> Option<Vec<f64>> {
    match dimensions {
        Dimensions::Xy => Some(vec![pt.lon, pt.lat]),
        Dimensions::Xyzm => {
            let time = pt.time?;
            Some(vec![
                pt.lon,
                pt.lat,
                pt.ele.unwrap_or(0.0),
                time.unix_timestamp() as f64,
            ])
        }
    }
}

fn build_track_props(trk: &GpxTrack, opts: &ConvertOptions) -> Map<String, JsonValue> {
    let mut props = Map::new();
    props.insert(
        "name".to_string(),
        JsonValue::String(trk.name.clone().unwrap_or_default()),
    );

    if opts.include_metadata {
        insert_optional(&mut props, "cmt", &trk.cmt);
        insert_optional(&mut props, "desc", &trk.desc);
        insert_optional(&mut props, "src", &trk.src);
        insert_optional(&mut props, "type", &trk.track_type);
        if let Some(n) = trk.number {
            props.insert("number".to_string(), JsonValue::Number(n.into()));
        }
        insert_link(&mut props, &trk.link);
    }

    props
}

fn insert_optional(props: &mut Map<String, JsonValue>, key: &str, value: &Option<String>) {
    if let Some(v) = value {
        props.insert(key.to_string(), JsonValue::String(v.clone()));
    }
}

fn insert_link(props: &mut Map<String, JsonValue>, link: &Option<GpxLink>) {
    if let Some(link) = link {
        let mut link_obj = Map::new();
        link_obj.insert("href".to_string(), JsonValue::String(link.href.clone()));
        if let Some(ref t) = link.text {
            link_obj.insert("text".to_string(), JsonValue::String(t.clone()));
        }
        if let Some(ref lt) = link.link_type {
            link_obj.insert("type".to_string(), JsonValue::String(lt.clone()));
        }
        props.insert("link".to_string(), JsonValue::Object(link_obj));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_gpx;

    const TWO_TRACKS: &str = r#"<?xml version="1.0"?>
<gpx version="1.1">
  <trk>
    <name>Morning Run</name>
    <type>running</type>
    <trkseg>
      <trkpt lat="50.1" lon="14.4"><ele>300</ele><time>2020-01-01T00:00:00Z</time></trkpt>
      <trkpt lat="50.2" lon="14.5"><ele>310</ele><time>2020-01-01T00:05:00Z</time></trkpt>
    </trkseg>
  </trk>
  <trk>
    <trkseg>
      <trkpt lat="1.0" lon="2.0"><time>2020-01-01T00:00:00Z</time></trkpt>
      <trkpt lat="3.0" lon="4.0"><time>2020-01-01T00:00:01Z</time></trkpt>
      <trkpt lat="5.0" lon="6.0"><time>2020-01-01T00:00:02Z</time></trkpt>
    </trkseg>
  </trk>
</gpx>"#;

    fn line_string(feature: &Feature) -> &Vec<Vec<f64>> {
        match &feature.geometry.as_ref().unwrap().value {
            Value::LineString(coords) => coords,
            other => panic!("Expected LineString, got {other:?}"),
        }
    }

    fn convert(xml: &str, opts: &ConvertOptions) -> Result<FeatureCollection> {
        to_feature_collection(&parse_gpx(xml)?, opts)
    }

    #[test]
    fn test_xyzm_coordinates() {
        let fc = convert(TWO_TRACKS, &ConvertOptions::default()).unwrap();
        assert_eq!(fc.features.len(), 2);

        let coords = line_string(&fc.features[0]);
        assert_eq!(
            coords,
            &vec![
                vec![14.4, 50.1, 300.0, 1_577_836_800.0],
                vec![14.5, 50.2, 310.0, 1_577_837_100.0],
            ]
        );

        let props = fc.features[0].properties.as_ref().unwrap();
        assert_eq!(props["name"], "Morning Run");
        assert!(!props.contains_key("type"));
    }

    #[test]
    fn test_xy_coordinates() {
        let opts = ConvertOptions {
            dimensions: Dimensions::Xy,
            ..Default::default()
        };
        let fc = convert(TWO_TRACKS, &opts).unwrap();

        for feature in &fc.features {
            assert!(line_string(feature).iter().all(|c| c.len() == 2));
        }
        assert_eq!(
            line_string(&fc.features[1]),
            &vec![vec![2.0, 1.0], vec![4.0, 3.0], vec![6.0, 5.0]]
        );
    }

    #[test]
    fn test_point_order_and_count_preserved() {
        let fc = convert(TWO_TRACKS, &ConvertOptions::default()).unwrap();
        let coords = line_string(&fc.features[1]);
        assert_eq!(coords.len(), 3);
        let times: Vec<f64> = coords.iter().map(|c| c[3]).collect();
        assert_eq!(times, vec![1_577_836_800.0, 1_577_836_801.0, 1_577_836_802.0]);
        // missing <ele> becomes 0
        assert!(coords.iter().all(|c| c[2] == 0.0));
    }

    #[test]
    fn test_missing_name_is_empty_string() {
        let fc = convert(TWO_TRACKS, &ConvertOptions::default()).unwrap();
        let props = fc.features[1].properties.as_ref().unwrap();
        assert_eq!(props["name"], "");
    }

    #[test]
    fn test_only_first_segment_converted() {
        let xml = r#"<gpx><trk>
  <trkseg><trkpt lat="1" lon="2"/><trkpt lat="3" lon="4"/></trkseg>
  <trkseg><trkpt lat="5" lon="6"/></trkseg>
</trk></gpx>"#;
        let opts = ConvertOptions {
            dimensions: Dimensions::Xy,
            ..Default::default()
        };
        let fc = convert(xml, &opts).unwrap();
        assert_eq!(fc.features.len(), 1);
        assert_eq!(
            line_string(&fc.features[0]),
            &vec![vec![2.0, 1.0], vec![4.0, 3.0]]
        );
    }

    #[test]
    fn test_empty_first_segment_gives_empty_line() {
        let xml = r#"<gpx><trk><name>Nothing</name><trkseg/></trk></gpx>"#;
        let fc = convert(xml, &ConvertOptions::default()).unwrap();
        assert_eq!(fc.features.len(), 1);
        assert!(line_string(&fc.features[0]).is_empty());
    }

    #[test]
    fn test_track_without_segment_is_error() {
        let xml = r#"<gpx>
  <trk><trkseg><trkpt lat="1" lon="2"><time>2020-01-01T00:00:00Z</time></trkpt></trkseg></trk>
  <trk><name>Empty</name></trk>
</gpx>"#;
        let err = convert(xml, &ConvertOptions::default()).unwrap_err();
        assert!(matches!(err, Gpx2GeoJsonError::MissingSegment { track: 1 }));
    }

    #[test]
    fn test_missing_time_is_error_for_xyzm_only() {
        let xml = r#"<gpx><trk><trkseg>
  <trkpt lat="1" lon="2"><time>2020-01-01T00:00:00Z</time></trkpt>
  <trkpt lat="3" lon="4"/>
</trkseg></trk></gpx>"#;
        let err = convert(xml, &ConvertOptions::default()).unwrap_err();
        assert!(matches!(
            err,
            Gpx2GeoJsonError::MissingTime { track: 0, point: 1 }
        ));

        let opts = ConvertOptions {
            dimensions: Dimensions::Xy,
            ..Default::default()
        };
        assert!(convert(xml, &opts).is_ok());
    }

    #[test]
    fn test_coordinates_not_validated() {
        let pt = GpxTrackPoint::new(123.0, -500.0);
        assert_eq!(
            point_coords(&pt, Dimensions::Xy),
            Some(vec![-500.0, 123.0])
        );
    }

    #[test]
    fn test_metadata_included_on_request() {
        let xml = r#"<gpx><trk>
  <name>Trail</name>
  <desc>Up the hill</desc>
  <type>hiking</type>
  <number>3</number>
  <link href="https://example.com/trail"><text>Trail page</text></link>
  <trkseg/>
</trk></gpx>"#;
        let opts = ConvertOptions {
            include_metadata: true,
            ..Default::default()
        };
        let fc = convert(xml, &opts).unwrap();
        let props = fc.features[0].properties.as_ref().unwrap();
        assert_eq!(props["name"], "Trail");
        assert_eq!(props["desc"], "Up the hill");
        assert_eq!(props["type"], "hiking");
        assert_eq!(props["number"], 3);
        assert!(!props.contains_key("cmt"));

        let link = props["link"].as_object().unwrap();
        assert_eq!(link["href"], "https://example.com/trail");
        assert_eq!(link["text"], "Trail page");
        assert!(!link.contains_key("type"));
    }

    #[test]
    fn test_empty_gpx_conversion() {
        let fc = convert("<gpx></gpx>", &ConvertOptions::default()).unwrap();
        assert!(fc.features.is_empty());
    }
}
