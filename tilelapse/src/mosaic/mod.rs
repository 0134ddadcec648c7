//! Mosaic assembly
//!
//! Stitches a fully downloaded grid into one raster, crops it to the exact
//! requested geographic rectangle using the fractional parts of the
//! projected corners, and optionally rescales it.

use image::imageops::{self, FilterType};
use image::RgbImage;
use thiserror::Error;

use crate::geo::{GeoRect, TILE_SIZE};
use crate::grid::MapTileGrid;
use crate::projection::{project, ViewDirection};

/// Errors from mosaic assembly.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MosaicError {
    /// `stitch` requires every tile of the grid to be downloaded.
    #[error("cannot stitch: {missing} of {total} tiles not downloaded")]
    IncompleteGrid { missing: usize, total: usize },

    /// `crop` trims against the original tile boundaries and must therefore
    /// only run once per mosaic.
    #[error("mosaic has already been cropped")]
    AlreadyCropped,

    /// The crop margins left no pixels.
    #[error("crop produced an empty raster")]
    EmptyCrop,
}

/// One assembled raster tagged with the imagery version it came from.
#[derive(Debug, Clone)]
pub struct MosaicImage {
    raster: RgbImage,
    version: u32,
    cropped: bool,
}

impl MosaicImage {
    /// Pastes every tile raster of the grid into one
    /// `(width * 256) x (height * 256)` image.
    ///
    /// # Errors
    ///
    /// `MosaicError::IncompleteGrid` if any tile is not downloaded.
    pub fn stitch(grid: &MapTileGrid) -> Result<Self, MosaicError> {
        let counts = grid.counts();
        if counts.downloaded != counts.total {
            return Err(MosaicError::IncompleteGrid {
                missing: counts.total - counts.downloaded,
                total: counts.total,
            });
        }

        let mut raster = RgbImage::new(
            grid.width() as u32 * TILE_SIZE,
            grid.height() as u32 * TILE_SIZE,
        );
        for x in 0..grid.width() {
            for y in 0..grid.height() {
                let tile = grid
                    .at(x as i64, y as i64)
                    .raster()
                    .ok_or(MosaicError::IncompleteGrid {
                        missing: 1,
                        total: counts.total,
                    })?;
                imageops::replace(
                    &mut raster,
                    tile,
                    x as i64 * TILE_SIZE as i64,
                    y as i64 * TILE_SIZE as i64,
                );
            }
        }

        Ok(Self {
            raster,
            version: grid.version(),
            cropped: false,
        })
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn raster(&self) -> &RgbImage {
        &self.raster
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.raster.dimensions()
    }

    /// Crops the mosaic so it covers exactly `rect`.
    ///
    /// The rectangle's corners are reprojected with the same projection used
    /// for grid construction; the fractional parts of the projected
    /// coordinates are the per-edge pixel trims. Corner ordering is
    /// normalized the same way grid construction normalizes it.
    pub fn crop(
        &mut self,
        zoom: u8,
        direction: ViewDirection,
        rect: &GeoRect,
    ) -> Result<(), MosaicError> {
        if self.cropped {
            return Err(MosaicError::AlreadyCropped);
        }

        let (sw_x, sw_y) = project(rect.southwest(), zoom, direction);
        let (ne_x, ne_y) = project(rect.northeast(), zoom, direction);
        let (x0, x1) = if sw_x <= ne_x { (sw_x, ne_x) } else { (ne_x, sw_x) };
        let (y0, y1) = if ne_y <= sw_y { (ne_y, sw_y) } else { (sw_y, ne_y) };

        let tile = TILE_SIZE as f64;
        let left = (tile * x0.fract()).round() as u32;
        let top = (tile * y0.fract()).round() as u32;
        let right = (tile * (1.0 - x1.fract())).round() as u32;
        let bottom = (tile * (1.0 - y1.fract())).round() as u32;

        let (width, height) = self.raster.dimensions();
        let new_width = width
            .checked_sub(left + right)
            .filter(|w| *w > 0)
            .ok_or(MosaicError::EmptyCrop)?;
        let new_height = height
            .checked_sub(top + bottom)
            .filter(|h| *h > 0)
            .ok_or(MosaicError::EmptyCrop)?;

        self.raster = imageops::crop_imm(&self.raster, left, top, new_width, new_height).to_image();
        self.cropped = true;
        Ok(())
    }

    /// Resamples the mosaic to the given dimensions with a Lanczos filter.
    /// The aspect ratio is not preserved; distortion is the caller's choice.
    pub fn scale(&mut self, width: u32, height: u32) {
        self.raster = imageops::resize(&self.raster, width, height, FilterType::Lanczos3);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::GeoPoint;
    use crate::grid::MapTileGrid;
    use crate::projection::meters_per_pixel;

    fn rect_around(width_m: f64, height_m: f64) -> GeoRect {
        let center = GeoPoint::new(48.0, 9.0).unwrap();
        GeoRect::around(center, width_m, height_m).unwrap()
    }

    /// Builds a grid whose tile rasters encode their grid position in the
    /// red/green channels.
    fn loaded_grid(rect: &GeoRect, zoom: u8) -> MapTileGrid {
        let mut grid =
            MapTileGrid::from_rect(rect, zoom, ViewDirection::Downward, 1).unwrap();
        for x in 0..grid.width() {
            for y in 0..grid.height() {
                let raster =
                    RgbImage::from_pixel(256, 256, image::Rgb([x as u8, y as u8, 0]));
                let tile = grid.tile_mut(x, y);
                tile.begin_download();
                tile.complete(raster);
            }
        }
        grid
    }

    #[test]
    fn test_stitch_dimensions_and_placement() {
        let rect = rect_around(800.0, 400.0);
        let grid = loaded_grid(&rect, 17);
        let mosaic = MosaicImage::stitch(&grid).unwrap();

        let (w, h) = mosaic.dimensions();
        assert_eq!(w, grid.width() as u32 * 256);
        assert_eq!(h, grid.height() as u32 * 256);
        assert_eq!(mosaic.version(), 1);

        // A pixel in the middle of tile (x, y) carries that tile's marker.
        for x in 0..grid.width() as u32 {
            for y in 0..grid.height() as u32 {
                let pixel = mosaic.raster().get_pixel(x * 256 + 128, y * 256 + 128);
                assert_eq!(pixel.0, [x as u8, y as u8, 0]);
            }
        }
    }

    #[test]
    fn test_stitch_rejects_incomplete_grid() {
        let rect = rect_around(800.0, 400.0);
        let grid = MapTileGrid::from_rect(&rect, 17, ViewDirection::Downward, 1).unwrap();
        assert!(matches!(
            MosaicImage::stitch(&grid),
            Err(MosaicError::IncompleteGrid { .. })
        ));
    }

    #[test]
    fn test_crop_matches_projected_extent() {
        let zoom = 18;
        let rect = rect_around(300.0, 300.0);
        let grid = loaded_grid(&rect, zoom);
        let mut mosaic = MosaicImage::stitch(&grid).unwrap();
        mosaic.crop(zoom, ViewDirection::Downward, &rect).unwrap();

        // The cropped width must match the rectangle's physical width at
        // this zoom's ground resolution, within a pixel of rounding.
        let expected = 300.0 / meters_per_pixel(48.0, zoom);
        let (w, h) = mosaic.dimensions();
        assert!(
            (w as f64 - expected).abs() <= 1.5,
            "width {} should be about {}",
            w,
            expected
        );
        // Mercator is conformal, so the height matches at small extents too.
        assert!((h as f64 - expected).abs() <= 1.5);
    }

    #[test]
    fn test_crop_is_single_use() {
        let zoom = 17;
        let rect = rect_around(500.0, 500.0);
        let grid = loaded_grid(&rect, zoom);
        let mut mosaic = MosaicImage::stitch(&grid).unwrap();

        mosaic.crop(zoom, ViewDirection::Downward, &rect).unwrap();
        assert_eq!(
            mosaic.crop(zoom, ViewDirection::Downward, &rect),
            Err(MosaicError::AlreadyCropped)
        );
    }

    #[test]
    fn test_crop_oblique_normalizes_corners() {
        let zoom = 16;
        let rect = rect_around(1000.0, 1000.0);
        for direction in [
            ViewDirection::Eastward,
            ViewDirection::Southward,
            ViewDirection::Westward,
        ] {
            let mut grid = MapTileGrid::from_rect(&rect, zoom, direction, 1).unwrap();
            for x in 0..grid.width() {
                for y in 0..grid.height() {
                    let tile = grid.tile_mut(x, y);
                    tile.begin_download();
                    tile.complete(RgbImage::new(256, 256));
                }
            }
            let mut mosaic = MosaicImage::stitch(&grid).unwrap();
            mosaic.crop(zoom, direction, &rect).unwrap();
            let (w, h) = mosaic.dimensions();
            assert!(w > 0 && h > 0);
        }
    }

    #[test]
    fn test_scale_distorts_freely() {
        let rect = rect_around(500.0, 500.0);
        let grid = loaded_grid(&rect, 17);
        let mut mosaic = MosaicImage::stitch(&grid).unwrap();

        mosaic.scale(300, 120);
        assert_eq!(mosaic.dimensions(), (300, 120));
    }
}
