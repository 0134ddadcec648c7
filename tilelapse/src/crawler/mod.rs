//! Version crawler
//!
//! Walks the tile server's version history backwards from the current
//! version. For every version after the first it downloads only the grid's
//! four corner tiles and compares them pixel-exactly against the corners of
//! the last fully fetched grid; unchanged corners mean unchanged imagery, so
//! the version is skipped without a full download. Changed corners trigger a
//! full grid download, mosaic assembly and emission.
//!
//! The same download failure means different things depending on where it
//! happens: the current version must always be reachable, a later version
//! whose tiles are all gone marks the end of the retained history, and a
//! partial failure anywhere is a connectivity problem rather than history
//! exhaustion.

use thiserror::Error;
use tracing::{debug, info};

use crate::fetch::{FetchError, HttpClient, ProgressObserver, TileFetcher};
use crate::geo::GeoRect;
use crate::grid::{GridError, MapTileGrid};
use crate::mosaic::{MosaicError, MosaicImage};
use crate::output::{MosaicSink, OutputError};
use crate::projection::ViewDirection;

/// Errors that abort a crawl. History exhaustion is not an error; the crawl
/// finalizes normally with whatever it collected.
#[derive(Debug, Error)]
pub enum CrawlError {
    /// The supposedly current version could not be downloaded. Something is
    /// wrong with the configuration or the connection, not the history.
    #[error("current version {version} unreachable: {missing} of {total} tiles missing")]
    CurrentVersionUnreachable {
        version: u32,
        missing: usize,
        total: usize,
    },

    /// A non-first version failed partially: some tiles exist, some don't.
    /// That is a transient connectivity problem, not history exhaustion.
    #[error("transient failure at version {version}: {missing} of {total} tiles missing")]
    TransientCrawlFailure {
        version: u32,
        missing: usize,
        total: usize,
    },

    #[error(transparent)]
    Grid(#[from] GridError),

    #[error(transparent)]
    Mosaic(#[from] MosaicError),

    #[error(transparent)]
    Output(#[from] OutputError),
}

/// What a finished crawl collected.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlSummary {
    /// Versions that produced a mosaic, in emission order (newest first).
    pub emitted: Vec<u32>,
    /// Versions skipped because their corner imagery was unchanged.
    pub skipped: usize,
}

/// Drives the backward walk over imagery versions for one area of interest.
pub struct VersionCrawler<C: HttpClient> {
    fetcher: TileFetcher<C>,
    rect: GeoRect,
    zoom: u8,
    direction: ViewDirection,
    /// Target dimensions every emitted mosaic is rescaled to, if any.
    target_size: Option<(u32, u32)>,
}

impl<C: HttpClient> VersionCrawler<C> {
    pub fn new(
        fetcher: TileFetcher<C>,
        rect: GeoRect,
        zoom: u8,
        direction: ViewDirection,
        target_size: Option<(u32, u32)>,
    ) -> Self {
        Self {
            fetcher,
            rect,
            zoom,
            direction,
            target_size,
        }
    }

    /// Crawls from `start_version` down to 0, emitting one mosaic per
    /// version whose imagery differs from the previously retained one.
    ///
    /// Versions are processed strictly sequentially: each comparison depends
    /// on the last successfully fetched grid.
    pub async fn run(
        &self,
        start_version: u32,
        sink: &mut dyn MosaicSink,
        observer: &dyn ProgressObserver,
    ) -> Result<CrawlSummary, CrawlError> {
        let mut reference: Option<MapTileGrid> = None;
        let mut summary = CrawlSummary::default();

        for version in (0..=start_version).rev() {
            let mut grid =
                MapTileGrid::from_rect(&self.rect, self.zoom, self.direction, version)?;

            if let Some(reference_grid) = &reference {
                debug!(version, "probing corner tiles");
                match self.fetcher.download_corners(&mut grid, observer).await {
                    Ok(()) => {}
                    Err(FetchError::IncompleteGrid { missing, total }) if missing == total => {
                        info!(version, "corner tiles gone, history exhausted");
                        break;
                    }
                    Err(FetchError::IncompleteGrid { missing, total }) => {
                        return Err(CrawlError::TransientCrawlFailure {
                            version,
                            missing,
                            total,
                        });
                    }
                }

                if grid.corners_identical_to(reference_grid) {
                    debug!(version, "imagery unchanged, skipping version");
                    summary.skipped += 1;
                    continue;
                }
                info!(version, "imagery differs, downloading full grid");
            } else {
                info!(version, "downloading current version");
            }

            match self.fetcher.download_grid(&mut grid, observer).await {
                Ok(()) => {}
                Err(FetchError::IncompleteGrid { missing, total }) => {
                    if reference.is_none() {
                        return Err(CrawlError::CurrentVersionUnreachable {
                            version,
                            missing,
                            total,
                        });
                    }
                    if missing == total {
                        info!(version, "version purged from history, finishing crawl");
                        break;
                    }
                    return Err(CrawlError::TransientCrawlFailure {
                        version,
                        missing,
                        total,
                    });
                }
            }

            let mut mosaic = MosaicImage::stitch(&grid)?;
            mosaic.crop(self.zoom, self.direction, &self.rect)?;
            if let Some((width, height)) = self.target_size {
                mosaic.scale(width, height);
            }
            sink.emit(&mosaic)?;

            summary.emitted.push(version);
            reference = Some(grid);
        }

        info!(
            emitted = summary.emitted.len(),
            skipped = summary.skipped,
            "crawl finished"
        );
        Ok(summary)
    }
}
