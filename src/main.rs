//! Command-line interface: `gpx2geojson <infile.gpx>` writes GeoJSON to stdout.

use std::io::{self, BufWriter};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use gpx2geojson::{
    ConvertOptions, Dimensions, Gpx2GeoJsonError, Result, converter, parser, serializer,
};

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Convert the tracks of a GPX file to a GeoJSON FeatureCollection"
)]
struct Cli {
    /// GPX file to convert
    infile: PathBuf,

    /// Coordinate layout of every output position
    #[arg(short, long, value_enum, default_value_t = Dimensions::Xyzm)]
    dimensions: Dimensions,

    /// Add cmt, desc, src, type, number and link to the feature properties
    #[arg(short, long)]
    metadata: bool,
}

impl From<&Cli> for ConvertOptions {
    fn from(cli: &Cli) -> Self {
        Self {
            dimensions: cli.dimensions,
            include_metadata: cli.metadata,
        }
    }
}

fn main() -> ExitCode {
    // Respects RUST_LOG, warnings only by default
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .target(env_logger::Target::Stderr)
        .init();

    let cli = Cli::parse();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    let opts = ConvertOptions::from(cli);
    log::info!(
        "converting {} ({:?} coordinates)",
        cli.infile.display(),
        opts.dimensions
    );

    let xml = std::fs::read_to_string(&cli.infile).map_err(|source| Gpx2GeoJsonError::Io {
        path: cli.infile.clone(),
        source,
    })?;

    let doc = parser::parse_gpx(&xml)?;
    let fc = converter::to_feature_collection(&doc, &opts)?;

    let stdout = io::stdout();
    serializer::write_feature_collection(BufWriter::new(stdout.lock()), &fc)
}
