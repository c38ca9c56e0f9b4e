/// Options for GPX to GeoJSON conversion.
#[derive(Debug, Clone, Default)]
pub struct ConvertOptions {
    /// Coordinate layout of every position in the output (default: XYZM)
    pub dimensions: Dimensions,

    /// Include track metadata (cmt, desc, etc.) next to the name (default: false)
    pub include_metadata: bool,
}

/// Coordinate dimensionality policy. Fixed for a whole document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum Dimensions {
    /// `[lon, lat]`
    Xy,
    /// `[lon, lat, ele, unix_seconds]`
    #[default]
    Xyzm,
}
