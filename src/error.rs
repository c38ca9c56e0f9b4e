use std::path::PathBuf;

use thiserror::Error;

/// Everything that can go wrong between reading a GPX file and writing GeoJSON.
#[derive(Debug, Error)]
pub enum Gpx2GeoJsonError {
    /// The input file could not be read.
    #[error("cannot read '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Writing the output failed.
    #[error("cannot write output: {0}")]
    Output(#[from] std::io::Error),

    #[error("XML parse error: {0}")]
    XmlParse(#[from] quick_xml::Error),
    #[error("document has no root element")]
    MissingRoot,
    #[error("expected root element <gpx>, found <{0}>")]
    UnexpectedRoot(String),
    #[error("unexpected end of document inside <{0}>")]
    UnexpectedEof(String),
    #[error("unknown entity reference '&{0};'")]
    UnknownEntity(String),
    #[error("Missing attribute '{attribute}' on <{element}>")]
    MissingAttribute {
        element: &'static str,
        attribute: &'static str,
    },
    #[error("Invalid value '{value}' for attribute '{attribute}' on <{element}>")]
    InvalidAttribute {
        element: &'static str,
        attribute: &'static str,
        value: String,
    },
    #[error("Invalid value '{value}' in <{element}>")]
    InvalidElement {
        element: &'static str,
        value: String,
    },
    #[error("Invalid timestamp '{value}': {source}")]
    InvalidTime {
        value: String,
        #[source]
        source: time::error::Parse,
    },

    #[error("track #{track} has no <trkseg>")]
    MissingSegment { track: usize },
    #[error("point #{point} of track #{track} has no <time>")]
    MissingTime { track: usize, point: usize },

    #[error("JSON serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Gpx2GeoJsonError>;

impl From<quick_xml::events::attributes::AttrError> for Gpx2GeoJsonError {
    fn from(e: quick_xml::events::attributes::AttrError) -> Self {
        Self::XmlParse(e.into())
    }
}
