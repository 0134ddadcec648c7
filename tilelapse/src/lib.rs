//! Tilelapse - historical satellite imagery timelapses
//!
//! This library walks a tile server's imagery version history backwards for
//! one geographic area, skips versions whose imagery is unchanged by probing
//! the grid's corner tiles, and assembles every changed version into a
//! mosaic for still and animation output.

pub mod config;
pub mod crawler;
pub mod fetch;
pub mod geo;
pub mod grid;
pub mod mosaic;
pub mod output;
pub mod projection;
pub mod version;

pub use config::ServerConfig;
pub use crawler::{CrawlError, CrawlSummary, VersionCrawler};
pub use fetch::{FetchPolicy, HttpClient, ProgressObserver, ReqwestClient, TileFetcher};
pub use geo::{GeoPoint, GeoRect};
pub use grid::MapTileGrid;
pub use mosaic::MosaicImage;
pub use output::{MosaicSink, OutputFormat, SequenceConfig, SequenceRecorder};
pub use projection::ViewDirection;
pub use version::detect_current_version;
