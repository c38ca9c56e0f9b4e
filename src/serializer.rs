use std::io::{self, Write};

use geojson::FeatureCollection;
use serde::Serialize;
use serde_json::ser::{CompactFormatter, Formatter};

use crate::error::{Gpx2GeoJsonError, Result};

/// Compact JSON that prints integral floats without a fractional part,
/// so elevations and timestamps come out as `300` and `1577836800`.
#[derive(Debug, Default, Clone, Copy)]
struct GeoJsonFormatter;

impl Formatter for GeoJsonFormatter {
    fn write_f64<W>(&mut self, writer: &mut W, value: f64) -> io::Result<()>
    where
        W: ?Sized + Write,
    {
        if value.fract() == 0.0 && value.abs() < 1e21 {
            write!(writer, "{value}")
        } else {
            CompactFormatter.write_f64(writer, value)
        }
    }
}

fn serialize_into<W: Write>(writer: W, fc: &FeatureCollection) -> Result<()> {
    let mut ser = serde_json::Serializer::with_formatter(writer, GeoJsonFormatter);
    fc.serialize(&mut ser).map_err(|e| {
        if e.is_io() {
            Gpx2GeoJsonError::Output(e.into())
        } else {
            Gpx2GeoJsonError::Serialization(e)
        }
    })
}

/// Write the collection as one line of JSON followed by a newline.
pub fn write_feature_collection<W: Write>(mut writer: W, fc: &FeatureCollection) -> Result<()> {
    serialize_into(&mut writer, fc)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}

/// Serialize the collection to a JSON string (no trailing newline).
pub fn to_geojson_string(fc: &FeatureCollection) -> Result<String> {
    let mut buf = Vec::new();
    serialize_into(&mut buf, fc)?;
    String::from_utf8(buf)
        .map_err(|e| Gpx2GeoJsonError::Output(io::Error::new(io::ErrorKind::InvalidData, e)))
}
