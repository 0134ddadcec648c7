//! Tile and grid model
//!
//! A `MapTileGrid` is the 2-D collection of `MapTile`s covering a geographic
//! rectangle at one zoom level, one view direction and one imagery version.
//! Tiles carry their own download state; the fetcher drives the transitions.

use image::RgbImage;
use thiserror::Error;

use crate::geo::GeoRect;
use crate::projection::{project, ViewDirection};

/// Errors from grid construction.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GridError {
    /// The projected rectangle collapsed to zero tiles in one axis.
    #[error("degenerate area: grid would be {width}x{height} tiles")]
    DegenerateArea { width: i64, height: i64 },
}

/// Identity of a single map tile on the remote server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileAddress {
    /// Imagery version (epoch identifier; lower is older).
    pub version: u32,
    /// Zoom level, 0..=23.
    pub zoom: u8,
    /// View direction the tile was rendered for.
    pub direction: ViewDirection,
    /// Tile-space x, increasing eastward.
    pub x: u32,
    /// Tile-space y, increasing southward.
    pub y: u32,
}

/// Download state of a tile. `Downloaded` owns the decoded raster and is
/// terminal; a failed tile may re-enter `Downloading` on retry.
#[derive(Debug, Clone, PartialEq)]
pub enum TileState {
    Pending,
    Downloading,
    Downloaded(RgbImage),
    Error,
}

/// Discriminant of `TileState`, used in progress reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileStateKind {
    Pending,
    Downloading,
    Downloaded,
    Error,
}

/// A map tile: its address plus download state and, once downloaded, the
/// owned 256x256 RGB raster.
#[derive(Debug, Clone)]
pub struct MapTile {
    address: TileAddress,
    state: TileState,
}

impl MapTile {
    fn new(address: TileAddress) -> Self {
        Self {
            address,
            state: TileState::Pending,
        }
    }

    pub fn address(&self) -> TileAddress {
        self.address
    }

    pub fn state_kind(&self) -> TileStateKind {
        match self.state {
            TileState::Pending => TileStateKind::Pending,
            TileState::Downloading => TileStateKind::Downloading,
            TileState::Downloaded(_) => TileStateKind::Downloaded,
            TileState::Error => TileStateKind::Error,
        }
    }

    pub fn is_downloaded(&self) -> bool {
        matches!(self.state, TileState::Downloaded(_))
    }

    /// The decoded raster, if the tile has been downloaded.
    pub fn raster(&self) -> Option<&RgbImage> {
        match &self.state {
            TileState::Downloaded(raster) => Some(raster),
            _ => None,
        }
    }

    /// Enters `Downloading` from `Pending` or `Error`. A tile that is
    /// already downloaded stays downloaded (loads are idempotent).
    pub(crate) fn begin_download(&mut self) {
        if !self.is_downloaded() {
            self.state = TileState::Downloading;
        }
    }

    pub(crate) fn complete(&mut self, raster: RgbImage) {
        if !self.is_downloaded() {
            self.state = TileState::Downloaded(raster);
        }
    }

    pub(crate) fn fail(&mut self) {
        if !self.is_downloaded() {
            self.state = TileState::Error;
        }
    }
}

/// Per-state tile counts for one grid, as seen by progress observers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GridCounts {
    pub pending: usize,
    pub downloading: usize,
    pub downloaded: usize,
    pub errors: usize,
    pub total: usize,
}

/// A 2-D grid of map tiles indexed `[x][y]`, x increasing eastward and
/// y increasing southward, all tagged with the same version, zoom and
/// direction.
#[derive(Debug, Clone)]
pub struct MapTileGrid {
    tiles: Vec<Vec<MapTile>>,
    version: u32,
    zoom: u8,
    direction: ViewDirection,
}

impl MapTileGrid {
    /// Divides a geographic rectangle into the inclusive range of tiles
    /// covering it.
    ///
    /// Both corners are projected and floored; because the oblique rotation
    /// can invert axis order, the corner coordinates are normalized per axis
    /// before the ranges are enumerated.
    pub fn from_rect(
        rect: &GeoRect,
        zoom: u8,
        direction: ViewDirection,
        version: u32,
    ) -> Result<Self, GridError> {
        let (sw_x, sw_y) = project(rect.southwest(), zoom, direction);
        let (ne_x, ne_y) = project(rect.northeast(), zoom, direction);

        let (mut x0, mut x1) = (sw_x.floor() as i64, ne_x.floor() as i64);
        let (mut y0, mut y1) = (ne_y.floor() as i64, sw_y.floor() as i64);
        if x0 > x1 {
            std::mem::swap(&mut x0, &mut x1);
        }
        if y0 > y1 {
            std::mem::swap(&mut y0, &mut y1);
        }

        let width = x1 - x0 + 1;
        let height = y1 - y0 + 1;
        if width <= 0 || height <= 0 || x0 < 0 || y0 < 0 {
            return Err(GridError::DegenerateArea { width, height });
        }

        let tiles = (x0..=x1)
            .map(|x| {
                (y0..=y1)
                    .map(|y| {
                        MapTile::new(TileAddress {
                            version,
                            zoom,
                            direction,
                            x: x as u32,
                            y: y as u32,
                        })
                    })
                    .collect()
            })
            .collect();

        Ok(Self {
            tiles,
            version,
            zoom,
            direction,
        })
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn zoom(&self) -> u8 {
        self.zoom
    }

    pub fn direction(&self) -> ViewDirection {
        self.direction
    }

    pub fn width(&self) -> usize {
        self.tiles.len()
    }

    pub fn height(&self) -> usize {
        self.tiles[0].len()
    }

    pub fn len(&self) -> usize {
        self.width() * self.height()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    fn wrap(&self, x: i64, y: i64) -> (usize, usize) {
        let x = if x < 0 { x + self.width() as i64 } else { x };
        let y = if y < 0 { y + self.height() as i64 } else { y };
        (x as usize, y as usize)
    }

    /// Accessor with wraparound for negative indices, so `at(-1, -1)` is the
    /// southeastern corner tile.
    pub fn at(&self, x: i64, y: i64) -> &MapTile {
        let (x, y) = self.wrap(x, y);
        &self.tiles[x][y]
    }

    pub(crate) fn tile_mut(&mut self, x: usize, y: usize) -> &mut MapTile {
        &mut self.tiles[x][y]
    }

    /// Iterates all tiles column by column.
    pub fn flat(&self) -> impl Iterator<Item = &MapTile> {
        self.tiles.iter().flat_map(|col| col.iter())
    }

    /// The four extreme tiles. When the grid is a single row or column, some
    /// corners alias the same tile.
    pub fn corners(&self) -> [&MapTile; 4] {
        [self.at(0, 0), self.at(0, -1), self.at(-1, 0), self.at(-1, -1)]
    }

    /// Deduplicated coordinates of the corner tiles.
    pub fn corner_coords(&self) -> Vec<(usize, usize)> {
        let xs = [0, self.width() - 1];
        let ys = [0, self.height() - 1];
        let mut coords = Vec::with_capacity(4);
        for x in xs {
            for y in ys {
                if !coords.contains(&(x, y)) {
                    coords.push((x, y));
                }
            }
        }
        coords
    }

    /// Coordinates and addresses of every tile not yet downloaded.
    pub(crate) fn undownloaded(&self) -> Vec<(usize, usize, TileAddress)> {
        self.coords_where(|tile| !tile.is_downloaded())
    }

    /// Coordinates and addresses of every tile currently in error state.
    pub(crate) fn failed(&self) -> Vec<(usize, usize, TileAddress)> {
        self.coords_where(|tile| tile.state_kind() == TileStateKind::Error)
    }

    fn coords_where(
        &self,
        predicate: impl Fn(&MapTile) -> bool,
    ) -> Vec<(usize, usize, TileAddress)> {
        let mut coords = Vec::new();
        for (x, col) in self.tiles.iter().enumerate() {
            for (y, tile) in col.iter().enumerate() {
                if predicate(tile) {
                    coords.push((x, y, tile.address));
                }
            }
        }
        coords
    }

    /// Current per-state tallies.
    pub fn counts(&self) -> GridCounts {
        let mut counts = GridCounts {
            total: self.len(),
            ..GridCounts::default()
        };
        for tile in self.flat() {
            match tile.state_kind() {
                TileStateKind::Pending => counts.pending += 1,
                TileStateKind::Downloading => counts.downloading += 1,
                TileStateKind::Downloaded => counts.downloaded += 1,
                TileStateKind::Error => counts.errors += 1,
            }
        }
        counts
    }

    /// Exact per-pixel, per-channel comparison of the four corner rasters
    /// against another grid's. Corners that are not downloaded on either
    /// side compare unequal.
    pub fn corners_identical_to(&self, other: &MapTileGrid) -> bool {
        self.corners()
            .iter()
            .zip(other.corners().iter())
            .all(|(a, b)| match (a.raster(), b.raster()) {
                (Some(ra), Some(rb)) => {
                    ra.dimensions() == rb.dimensions() && ra.as_raw() == rb.as_raw()
                }
                _ => false,
            })
    }
}
