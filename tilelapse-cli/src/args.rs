//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{ArgAction, Parser, ValueEnum};
use tilelapse::output::OutputFormat;
use tilelapse::projection::ViewDirection;

use crate::error::CliError;

/// Timelapses of historical satellite imagery for one spot on earth.
///
/// `-h` is the height of the depicted area, so help is `--help` only.
#[derive(Debug, Parser)]
#[command(name = "tilelapse", version, disable_help_flag = true)]
pub struct CliArgs {
    /// A point given as a latitude-longitude pair, e.g. '37.453896,126.446829'
    #[arg(value_name = "LAT,LON")]
    pub point: String,

    /// Width of the depicted area in meters
    #[arg(short = 'w', long, value_name = "N")]
    pub width: f64,

    /// Height of the depicted area in meters
    #[arg(short = 'h', long, value_name = "N")]
    pub height: f64,

    /// Maximum meters per pixel; the tile zoom level is picked so the
    /// imagery is at least this detailed. Required unless an image size
    /// constrains the resolution instead.
    #[arg(short = 'm', long, value_name = "N")]
    pub max_meters_per_pixel: Option<f64>,

    /// Width of the result images in pixels
    #[arg(long, value_name = "N")]
    pub image_width: Option<u32>,

    /// Height of the result images in pixels
    #[arg(long, value_name = "N")]
    pub image_height: Option<u32>,

    /// Viewing direction of the imagery
    #[arg(long, value_enum, default_value_t = DirectionArg::Down)]
    pub direction: DirectionArg,

    /// Which artifacts to produce
    #[arg(long, value_enum, default_value_t = FormatArg::Both)]
    pub format: FormatArg,

    /// JPEG quality of still images, 1-100
    #[arg(long, default_value_t = 90, value_name = "N")]
    pub quality: u8,

    /// Display duration of each animation frame in milliseconds
    #[arg(long, default_value_t = 200, value_name = "MS")]
    pub frame_interval_ms: u64,

    /// Directory the output files are written into
    #[arg(long, default_value = ".", value_name = "DIR")]
    pub output_dir: PathBuf,

    /// Base of the output file names; derived from the request if omitted
    #[arg(long, value_name = "NAME")]
    pub basename: Option<String>,

    /// Retry failed tiles only when fewer than this fraction of a grid failed
    #[arg(long, default_value_t = 0.2, value_name = "F")]
    pub retry_fraction: f64,

    #[arg(long, action = ArgAction::Help, help = "Print help")]
    help: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DirectionArg {
    Down,
    North,
    East,
    South,
    West,
}

impl From<DirectionArg> for ViewDirection {
    fn from(arg: DirectionArg) -> Self {
        match arg {
            DirectionArg::Down => ViewDirection::Downward,
            DirectionArg::North => ViewDirection::Northward,
            DirectionArg::East => ViewDirection::Eastward,
            DirectionArg::South => ViewDirection::Southward,
            DirectionArg::West => ViewDirection::Westward,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FormatArg {
    Stills,
    Animation,
    Both,
}

impl From<FormatArg> for OutputFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Stills => OutputFormat::Stills,
            FormatArg::Animation => OutputFormat::Animation,
            FormatArg::Both => OutputFormat::Both,
        }
    }
}

/// Parses the positional `LAT,LON` argument. A space after the comma is
/// tolerated so quoted pairs copied from map websites work as-is.
pub fn parse_point(raw: &str) -> Result<(f64, f64), CliError> {
    let mut parts = raw.split(',').map(str::trim);
    let (lat, lon) = match (parts.next(), parts.next(), parts.next()) {
        (Some(lat), Some(lon), None) => (lat, lon),
        _ => {
            return Err(CliError::Options(format!(
                "expected a 'LAT,LON' pair, got '{}'",
                raw
            )))
        }
    };
    let lat = lat
        .parse()
        .map_err(|_| CliError::Options(format!("invalid latitude '{}'", lat)))?;
    let lon = lon
        .parse()
        .map_err(|_| CliError::Options(format!("invalid longitude '{}'", lon)))?;
    Ok((lat, lon))
}
