//! Concurrent tile acquisition
//!
//! The `TileFetcher` downloads a grid's tiles across a bounded worker pool
//! sized to the grid's longer dimension, reports every tile state transition
//! to a `ProgressObserver`, and retries a small number of failures serially
//! before declaring the grid incomplete. Tile loads are idempotent: a tile
//! that is already downloaded is never fetched again, which is what makes
//! corner probes and full downloads compose.

mod http;

pub use http::{HttpClient, HttpError, ReqwestClient};

use futures::StreamExt;
use image::RgbImage;
use rand::seq::SliceRandom;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::config::ServerConfig;
use crate::geo::TILE_SIZE;
use crate::grid::{GridCounts, MapTileGrid, TileAddress, TileStateKind};

/// Per-tile download failure. These are absorbed by retry logic and surface
/// only as log warnings; callers see grid-level results.
#[derive(Debug, Clone, Error)]
pub enum TileFetchError {
    #[error(transparent)]
    Http(#[from] HttpError),

    #[error("failed to decode tile image: {0}")]
    Decode(String),

    #[error("tile raster is {width}x{height}, expected {TILE_SIZE}x{TILE_SIZE}")]
    UnexpectedShape { width: u32, height: u32 },

    #[error("tile raster is not 3-channel RGB ({0})")]
    UnexpectedFormat(String),
}

/// Grid-level download outcome. Whether an incomplete grid is recoverable is
/// decided by the crawler, not here.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("grid download incomplete: {missing} of {total} tiles missing")]
    IncompleteGrid { missing: usize, total: usize },
}

/// Tuning knobs for grid downloads.
#[derive(Debug, Clone)]
pub struct FetchPolicy {
    /// Failed tiles are retried serially only when they amount to less than
    /// this fraction of the grid. Heuristic carried over from the original
    /// tool; kept configurable.
    pub retry_fraction: f64,
}

impl Default for FetchPolicy {
    fn default() -> Self {
        Self { retry_fraction: 0.2 }
    }
}

/// One observed tile state transition plus a snapshot of the grid tallies.
#[derive(Debug, Clone)]
pub struct ProgressUpdate {
    pub address: TileAddress,
    pub state: TileStateKind,
    pub counts: GridCounts,
}

/// Observer invoked synchronously on every tile state transition by the
/// single consumer that applies worker results to the grid.
pub trait ProgressObserver: Send + Sync {
    fn tile_transition(&self, update: &ProgressUpdate);
}

/// Observer that ignores all updates.
pub struct NoopProgress;

impl ProgressObserver for NoopProgress {
    fn tile_transition(&self, _update: &ProgressUpdate) {}
}

enum TileEvent {
    Started {
        x: usize,
        y: usize,
    },
    Finished {
        x: usize,
        y: usize,
        address: TileAddress,
        outcome: Result<RgbImage, TileFetchError>,
    },
}

/// Downloads tiles for one configured tile server.
pub struct TileFetcher<C: HttpClient> {
    client: C,
    server: ServerConfig,
    policy: FetchPolicy,
}

impl<C: HttpClient> TileFetcher<C> {
    pub fn new(client: C, server: ServerConfig, policy: FetchPolicy) -> Self {
        Self {
            client,
            server,
            policy,
        }
    }

    pub fn server(&self) -> &ServerConfig {
        &self.server
    }

    /// Fetches and decodes a single tile. The raster must be exactly
    /// 256x256 RGB.
    pub async fn fetch_tile(&self, address: &TileAddress) -> Result<RgbImage, TileFetchError> {
        let url = self.server.tile_url(address);
        let bytes = self.client.get(&url).await?;

        let decoded = image::load_from_memory(&bytes)
            .map_err(|e| TileFetchError::Decode(e.to_string()))?;
        let (width, height) = (decoded.width(), decoded.height());
        if (width, height) != (TILE_SIZE, TILE_SIZE) {
            return Err(TileFetchError::UnexpectedShape { width, height });
        }
        match decoded {
            image::DynamicImage::ImageRgb8(raster) => Ok(raster),
            other => Err(TileFetchError::UnexpectedFormat(format!(
                "{:?}",
                other.color()
            ))),
        }
    }

    /// Downloads every not-yet-downloaded tile of the grid.
    ///
    /// Tiles are dispatched in randomized order across `max(width, height)`
    /// concurrent workers. After the pool drains, if fewer than
    /// `retry_fraction` of the tiles failed they are retried serially once.
    /// Any tile still missing afterwards makes the whole grid
    /// `FetchError::IncompleteGrid`.
    pub async fn download_grid(
        &self,
        grid: &mut MapTileGrid,
        observer: &dyn ProgressObserver,
    ) -> Result<(), FetchError> {
        let total = grid.len();
        let mut queue = grid.undownloaded();
        // Randomized order has no correctness effect; it just makes the
        // progress display livelier.
        queue.shuffle(&mut rand::thread_rng());

        let workers = grid.width().max(grid.height());
        self.run_pool(grid, queue, workers, observer).await;

        let failed = grid.failed();
        if !failed.is_empty() && (failed.len() as f64) < self.policy.retry_fraction * total as f64
        {
            debug!(count = failed.len(), "retrying failed tiles serially");
            for (x, y, address) in failed {
                grid.tile_mut(x, y).begin_download();
                notify(grid, x, y, observer);
                match self.fetch_tile(&address).await {
                    Ok(raster) => grid.tile_mut(x, y).complete(raster),
                    Err(error) => {
                        warn!(error = %error, tile = ?address, "tile retry failed");
                        grid.tile_mut(x, y).fail();
                    }
                }
                notify(grid, x, y, observer);
            }
        }

        let missing = grid.failed().len();
        if missing > 0 {
            return Err(FetchError::IncompleteGrid { missing, total });
        }
        Ok(())
    }

    /// Downloads only the grid's corner tiles, serially with one retry each.
    /// Already-downloaded corners are skipped. `missing == total` in the
    /// returned error means every corner tile is gone from the server.
    pub async fn download_corners(
        &self,
        grid: &mut MapTileGrid,
        observer: &dyn ProgressObserver,
    ) -> Result<(), FetchError> {
        let corners = grid.corner_coords();
        let total = corners.len();
        let mut missing = 0;

        for (x, y) in corners {
            if grid.at(x as i64, y as i64).is_downloaded() {
                continue;
            }
            let address = grid.at(x as i64, y as i64).address();

            for attempt in 0..2 {
                grid.tile_mut(x, y).begin_download();
                notify(grid, x, y, observer);
                match self.fetch_tile(&address).await {
                    Ok(raster) => grid.tile_mut(x, y).complete(raster),
                    Err(error) => {
                        warn!(error = %error, tile = ?address, attempt, "corner tile download failed");
                        grid.tile_mut(x, y).fail();
                    }
                }
                notify(grid, x, y, observer);
                if grid.at(x as i64, y as i64).is_downloaded() {
                    break;
                }
            }
            if !grid.at(x as i64, y as i64).is_downloaded() {
                missing += 1;
            }
        }

        if missing > 0 {
            return Err(FetchError::IncompleteGrid { missing, total });
        }
        Ok(())
    }

    /// Dispatches the queued tiles across a bounded pool and applies results
    /// to the grid from a single consumer, so tile state is never written
    /// from two places at once.
    async fn run_pool(
        &self,
        grid: &mut MapTileGrid,
        queue: Vec<(usize, usize, TileAddress)>,
        workers: usize,
        observer: &dyn ProgressObserver,
    ) {
        let (tx, mut rx) = mpsc::unbounded_channel();

        let producer = {
            let tx = tx.clone();
            async move {
                futures::stream::iter(queue)
                    .map(|(x, y, address)| {
                        let tx = tx.clone();
                        async move {
                            let _ = tx.send(TileEvent::Started { x, y });
                            let outcome = self.fetch_tile(&address).await;
                            let _ = tx.send(TileEvent::Finished {
                                x,
                                y,
                                address,
                                outcome,
                            });
                        }
                    })
                    .buffer_unordered(workers.max(1))
                    .collect::<()>()
                    .await;
            }
        };
        drop(tx);

        let consumer = async {
            while let Some(event) = rx.recv().await {
                match event {
                    TileEvent::Started { x, y } => {
                        grid.tile_mut(x, y).begin_download();
                        notify(grid, x, y, observer);
                    }
                    TileEvent::Finished {
                        x,
                        y,
                        address,
                        outcome,
                    } => {
                        match outcome {
                            Ok(raster) => grid.tile_mut(x, y).complete(raster),
                            Err(error) => {
                                // A single missing tile is expected, not fatal.
                                warn!(error = %error, tile = ?address, "tile download failed");
                                grid.tile_mut(x, y).fail();
                            }
                        }
                        notify(grid, x, y, observer);
                    }
                }
            }
        };

        futures::join!(producer, consumer);
    }
}

fn notify(grid: &MapTileGrid, x: usize, y: usize, observer: &dyn ProgressObserver) {
    let tile = grid.at(x as i64, y as i64);
    observer.tile_transition(&ProgressUpdate {
        address: tile.address(),
        state: tile.state_kind(),
        counts: grid.counts(),
    });
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::HashMap;
    use std::io::Cursor;
    use std::sync::Mutex;

    use futures::future::BoxFuture;
    use image::RgbImage;

    use super::{HttpClient, HttpError};

    type Responder = Box<dyn Fn(&str, usize) -> Result<Vec<u8>, HttpError> + Send + Sync>;

    /// Scripted HTTP client: the responder sees the URL and how many times
    /// that URL has been requested before.
    pub struct MockHttpClient {
        responder: Responder,
        calls: Mutex<HashMap<String, usize>>,
    }

    impl MockHttpClient {
        pub fn new(
            responder: impl Fn(&str, usize) -> Result<Vec<u8>, HttpError> + Send + Sync + 'static,
        ) -> Self {
            Self {
                responder: Box::new(responder),
                calls: Mutex::new(HashMap::new()),
            }
        }

        /// Number of requests whose URL contains `pattern`.
        pub fn calls_matching(&self, pattern: &str) -> usize {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .filter(|(url, _)| url.contains(pattern))
                .map(|(_, count)| count)
                .sum()
        }
    }

    impl HttpClient for MockHttpClient {
        fn get<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<Vec<u8>, HttpError>> {
            Box::pin(async move {
                let previous = {
                    let mut calls = self.calls.lock().unwrap();
                    let count = calls.entry(url.to_string()).or_insert(0);
                    let previous = *count;
                    *count += 1;
                    previous
                };
                (self.responder)(url, previous)
            })
        }
    }

    /// Encodes a uniformly colored 256x256 RGB tile as PNG bytes.
    pub fn tile_png(pixel: [u8; 3]) -> Vec<u8> {
        sized_tile_png(256, 256, pixel)
    }

    pub fn sized_tile_png(width: u32, height: u32, pixel: [u8; 3]) -> Vec<u8> {
        let raster = RgbImage::from_pixel(width, height, image::Rgb(pixel));
        let mut bytes = Vec::new();
        image::DynamicImage::ImageRgb8(raster)
            .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        bytes
    }
}
