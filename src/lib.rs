//! Convert GPX tracks into GeoJSON feature collections.
//!
//! Each `<trk>` becomes one `LineString` feature built from its first
//! `<trkseg>`, with either `[lon, lat]` or `[lon, lat, ele, unix_seconds]`
//! coordinates depending on [`Dimensions`].

pub mod converter;
pub mod error;
pub mod gpx_types;
pub mod options;
pub mod parser;
pub mod serializer;

pub use crate::error::{Gpx2GeoJsonError, Result};
pub use crate::options::{ConvertOptions, Dimensions};

/// Convert a GPX string to a GeoJSON string.
pub fn gpx_to_geojson_string(gpx_string: &str, opts: &ConvertOptions) -> Result<String> {
    let doc = parser::parse_gpx(gpx_string)?;
    let fc = converter::to_feature_collection(&doc, opts)?;
    serializer::to_geojson_string(&fc)
}
