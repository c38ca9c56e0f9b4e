use time::OffsetDateTime;

/// Parsed GPX document: the tracks in document order.
#[derive(Debug, Default)]
pub struct GpxDocument {
    pub tracks: Vec<GpxTrack>,
}

/// A single track point (<trkpt>).
#[derive(Debug, Clone, PartialEq)]
pub struct GpxTrackPoint {
    pub lat: f64,
    pub lon: f64,
    pub ele: Option<f64>,
    pub time: Option<OffsetDateTime>,
}

impl GpxTrackPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self {
            lat,
            lon,
            ele: None,
            time: None,
        }
    }
}

/// A GPX link element.
#[derive(Debug, Clone, PartialEq)]
pub struct GpxLink {
    pub href: String,
    pub text: Option<String>,
    pub link_type: Option<String>,
}

/// A GPX track (<trk>).
#[derive(Debug, Default)]
pub struct GpxTrack {
    pub name: Option<String>,
    pub cmt: Option<String>,
    pub desc: Option<String>,
    pub src: Option<String>,
    pub link: Option<GpxLink>,
    pub number: Option<u32>,
    pub track_type: Option<String>,
    pub segments: Vec<GpxSegment>,
}

impl GpxTrack {
    /// The segment that gets converted. Later segments are ignored.
    pub fn first_segment(&self) -> Option<&GpxSegment> {
        self.segments.first()
    }
}

/// A GPX track segment (<trkseg>).
#[derive(Debug, Default)]
pub struct GpxSegment {
    pub points: Vec<GpxTrackPoint>,
}
