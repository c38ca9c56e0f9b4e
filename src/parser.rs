use quick_xml::Reader;
use quick_xml::encoding::Decoder;
use quick_xml::events::{BytesStart, Event};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::error::{Gpx2GeoJsonError, Result};
use crate::gpx_types::*;

/// Parse a GPX XML string into a GpxDocument.
///
/// The root element must be `<gpx>`; anything after it is ignored.
pub fn parse_gpx(xml: &str) -> Result<GpxDocument> {
    let mut reader = Reader::from_str(xml);

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                check_root(&e)?;
                let doc = parse_root(&mut reader)?;
                log::debug!("parsed GPX document with {} track(s)", doc.tracks.len());
                return Ok(doc);
            }
            Event::Empty(e) => {
                check_root(&e)?;
                return Ok(GpxDocument::default());
            }
            Event::Eof => return Err(Gpx2GeoJsonError::MissingRoot),
            _ => {}
        }
    }
}

fn check_root(e: &BytesStart<'_>) -> Result<()> {
    if e.local_name().as_ref() == b"gpx" {
        Ok(())
    } else {
        Err(Gpx2GeoJsonError::UnexpectedRoot(
            String::from_utf8_lossy(e.name().as_ref()).into_owned(),
        ))
    }
}

/// Read the direct children of <gpx>. Only tracks are kept.
fn parse_root<'a>(reader: &mut Reader<&'a [u8]>) -> Result<GpxDocument> {
    let mut doc = GpxDocument::default();

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"trk" => doc.tracks.push(parse_track(reader)?),
                _ => {
                    // wpt, rte, metadata, extensions
                    reader.read_to_end(e.name())?;
                }
            },
            Event::Empty(e) => {
                if e.local_name().as_ref() == b"trk" {
                    doc.tracks.push(GpxTrack::default());
                }
            }
            Event::End(_) => break,
            Event::Eof => return Err(Gpx2GeoJsonError::UnexpectedEof("gpx".into())),
            _ => {}
        }
    }

    Ok(doc)
}

/// Parse lat/lon attributes from a <trkpt> start tag. Both are required.
fn parse_lat_lon(e: &BytesStart<'_>, decoder: Decoder) -> Result<(f64, f64)> {
    let mut lat: Option<f64> = None;
    let mut lon: Option<f64> = None;

    for attr_result in e.attributes() {
        let attr = attr_result?;
        let key = attr.key.local_name();
        let val = attr
            .decode_and_unescape_value(decoder)
            .map_err(quick_xml::Error::from)?;
        match key.as_ref() {
            b"lat" => lat = Some(parse_coordinate("lat", &val)?),
            b"lon" => lon = Some(parse_coordinate("lon", &val)?),
            _ => {}
        }
    }

    let lat = lat.ok_or(Gpx2GeoJsonError::MissingAttribute {
        element: "trkpt",
        attribute: "lat",
    })?;
    let lon = lon.ok_or(Gpx2GeoJsonError::MissingAttribute {
        element: "trkpt",
        attribute: "lon",
    })?;

    Ok((lat, lon))
}

/// NaN and infinities are rejected: they have no GeoJSON representation.
fn parse_coordinate(attribute: &'static str, val: &str) -> Result<f64> {
    val.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| Gpx2GeoJsonError::InvalidAttribute {
            element: "trkpt",
            attribute,
            value: val.to_string(),
        })
}

/// Parse a <trkpt> element and its children.
/// Called after receiving Event::Start for the point element.
fn parse_point<'a>(
    start: &BytesStart<'a>,
    reader: &mut Reader<&'a [u8]>,
) -> Result<GpxTrackPoint> {
    let (lat, lon) = parse_lat_lon(start, reader.decoder())?;
    let mut point = GpxTrackPoint::new(lat, lon);

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"ele" => {
                    let text = read_text_owned(reader, &e)?;
                    point.ele = parse_elevation(&text)?;
                }
                b"time" => {
                    let text = read_text_owned(reader, &e)?;
                    point.time = parse_time(&text)?;
                }
                _ => {
                    // extensions, GPX 1.0 speed/course, etc.
                    reader.read_to_end(e.name())?;
                }
            },
            Event::End(_) => break,
            Event::Eof => return Err(Gpx2GeoJsonError::UnexpectedEof("trkpt".into())),
            _ => {}
        }
    }

    Ok(point)
}

/// Empty <ele/> counts as absent.
fn parse_elevation(text: &str) -> Result<Option<f64>> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(None);
    }
    text.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .map(Some)
        .ok_or_else(|| Gpx2GeoJsonError::InvalidElement {
            element: "ele",
            value: text.to_string(),
        })
}

fn parse_time(text: &str) -> Result<Option<OffsetDateTime>> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(None);
    }
    OffsetDateTime::parse(text, &Rfc3339)
        .map(Some)
        .map_err(|source| Gpx2GeoJsonError::InvalidTime {
            value: text.to_string(),
            source,
        })
}

/// Parse a <link> element.
fn parse_link<'a>(start: &BytesStart<'a>, reader: &mut Reader<&'a [u8]>) -> Result<GpxLink> {
    let mut href = String::new();
    for attr_result in start.attributes() {
        let attr = attr_result?;
        if attr.key.local_name().as_ref() == b"href" {
            href = attr
                .decode_and_unescape_value(reader.decoder())
                .map_err(quick_xml::Error::from)?
                .into_owned();
        }
    }

    let mut text: Option<String> = None;
    let mut link_type: Option<String> = None;

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"text" => text = Some(read_text_owned(reader, &e)?),
                b"type" => link_type = Some(read_text_owned(reader, &e)?),
                _ => {
                    reader.read_to_end(e.name())?;
                }
            },
            Event::End(_) => break,
            Event::Eof => return Err(Gpx2GeoJsonError::UnexpectedEof("link".into())),
            _ => {}
        }
    }

    Ok(GpxLink {
        href,
        text,
        link_type,
    })
}

/// Parse a <trk> element.
fn parse_track<'a>(reader: &mut Reader<&'a [u8]>) -> Result<GpxTrack> {
    let mut track = GpxTrack::default();

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"name" => track.name = Some(read_text_owned(reader, &e)?),
                b"cmt" => track.cmt = Some(read_text_owned(reader, &e)?),
                b"desc" => track.desc = Some(read_text_owned(reader, &e)?),
                b"src" => track.src = Some(read_text_owned(reader, &e)?),
                b"type" => track.track_type = Some(read_text_owned(reader, &e)?),
                b"number" => {
                    let text = read_text_owned(reader, &e)?;
                    track.number = text.trim().parse::<u32>().ok();
                }
                b"link" => track.link = Some(parse_link(&e, reader)?),
                b"trkseg" => track.segments.push(parse_segment(reader)?),
                _ => {
                    reader.read_to_end(e.name())?;
                }
            },
            Event::Empty(e) => {
                if e.local_name().as_ref() == b"trkseg" {
                    track.segments.push(GpxSegment::default());
                }
            }
            Event::End(_) => break,
            Event::Eof => return Err(Gpx2GeoJsonError::UnexpectedEof("trk".into())),
            _ => {}
        }
    }

    Ok(track)
}

/// Parse a <trkseg> element. Points are kept in document order.
fn parse_segment<'a>(reader: &mut Reader<&'a [u8]>) -> Result<GpxSegment> {
    let mut segment = GpxSegment::default();

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"trkpt" => segment.points.push(parse_point(&e, reader)?),
                _ => {
                    reader.read_to_end(e.name())?;
                }
            },
            Event::Empty(e) => {
                if e.local_name().as_ref() == b"trkpt" {
                    let (lat, lon) = parse_lat_lon(&e, reader.decoder())?;
                    segment.points.push(GpxTrackPoint::new(lat, lon));
                }
            }
            Event::End(_) => break,
            Event::Eof => return Err(Gpx2GeoJsonError::UnexpectedEof("trkseg".into())),
            _ => {}
        }
    }

    Ok(segment)
}

/// Read text content of an element as an owned String.
/// Handles regular text, CDATA sections, and entity references (Event::GeneralRef).
fn read_text_owned<'a>(reader: &mut Reader<&'a [u8]>, start: &BytesStart<'_>) -> Result<String> {
    let mut text = String::new();

    loop {
        match reader.read_event()? {
            Event::Text(e) => {
                let raw = std::str::from_utf8(e.as_ref()).unwrap_or_default();
                text.push_str(raw);
            }
            Event::CData(e) => {
                let s = std::str::from_utf8(e.as_ref()).unwrap_or_default();
                text.push_str(s);
            }
            Event::GeneralRef(e) => {
                let name = std::str::from_utf8(e.as_ref()).unwrap_or_default();
                let ch = match e.resolve_char_ref() {
                    Ok(Some(ch)) => ch,
                    // only the predefined XML entities exist without a DTD
                    _ => match name {
                        "amp" => '&',
                        "lt" => '<',
                        "gt" => '>',
                        "quot" => '"',
                        "apos" => '\'',
                        _ => return Err(Gpx2GeoJsonError::UnknownEntity(name.to_string())),
                    },
                };
                text.push(ch);
            }
            Event::Start(e) => {
                // markup inside a text element carries no text we use
                reader.read_to_end(e.name())?;
            }
            Event::End(_) => break,
            Event::Eof => {
                return Err(Gpx2GeoJsonError::UnexpectedEof(
                    String::from_utf8_lossy(start.local_name().as_ref()).into_owned(),
                ));
            }
            _ => {}
        }
    }

    Ok(text)
}
