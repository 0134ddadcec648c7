//! Geographic primitives
//!
//! Provides latitude/longitude points and rectangles plus the two pieces of
//! geodesy the crawler needs: turning a physical width/height in meters into
//! a degree span around a point, and picking the coarsest zoom level that
//! still satisfies a ground-resolution constraint.

use thiserror::Error;

/// Side length of a map tile in pixels.
pub const TILE_SIZE: u32 = 256;

/// Earth circumference at the equator, in meters.
pub const EARTH_CIRCUMFERENCE: f64 = 40_075_016.686;

/// Highest zoom level the tile server is known to carry anywhere.
pub const MAX_ZOOM: u8 = 23;

/// Errors from geographic construction and zoom derivation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeoError {
    /// Latitude or longitude outside the valid range.
    #[error("invalid coordinate ({lat}, {lon}): latitude must be in [-90, 90], longitude in [-180, 180]")]
    InvalidCoordinate { lat: f64, lon: f64 },

    /// Requested area width or height is not positive.
    #[error("invalid area {width}m x {height}m: width and height must be positive")]
    InvalidArea { width: f64, height: f64 },

    /// The resolution constraint cannot be met even at the finest zoom level.
    #[error("{max_meters_per_pixel} m/px requires a zoom level beyond {MAX_ZOOM}")]
    ZoomOutOfRange { max_meters_per_pixel: f64 },

    /// Rectangle corners are out of order.
    #[error("rectangle corners out of order: southwest latitude {sw_lat} exceeds northeast latitude {ne_lat}")]
    InvalidRect { sw_lat: f64, ne_lat: f64 },
}

/// A latitude/longitude pair, in that order (ISO 6709).
///
/// The range invariant is enforced at construction; a `GeoPoint` that exists
/// is always valid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    lat: f64,
    lon: f64,
}

impl GeoPoint {
    /// Creates a point, validating latitude ∈ [-90, 90] and
    /// longitude ∈ [-180, 180].
    pub fn new(lat: f64, lon: f64) -> Result<Self, GeoError> {
        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
            return Err(GeoError::InvalidCoordinate { lat, lon });
        }
        Ok(Self { lat, lon })
    }

    pub fn lat(&self) -> f64 {
        self.lat
    }

    pub fn lon(&self) -> f64 {
        self.lon
    }

    /// Computes the lowest (coarsest) zoom level whose ground resolution at
    /// this latitude still satisfies `max_meters_per_pixel`.
    ///
    /// Resolution at zoom 0 is `(EARTH_CIRCUMFERENCE / TILE_SIZE) * cos(lat)`
    /// and halves per level. Levels are scanned from finest (23) to coarsest;
    /// the first level that violates the constraint pins the answer to the
    /// level just above it.
    ///
    /// # Errors
    ///
    /// `GeoError::ZoomOutOfRange` if even zoom 23 is too coarse.
    pub fn required_zoom(&self, max_meters_per_pixel: f64) -> Result<u8, GeoError> {
        let meters_per_pixel_at_zoom_0 =
            (EARTH_CIRCUMFERENCE / TILE_SIZE as f64) * self.lat.to_radians().cos();

        for zoom in (0..=MAX_ZOOM).rev() {
            let meters_per_pixel = meters_per_pixel_at_zoom_0 / 2f64.powi(zoom as i32);
            if meters_per_pixel > max_meters_per_pixel {
                return if zoom == MAX_ZOOM {
                    Err(GeoError::ZoomOutOfRange {
                        max_meters_per_pixel,
                    })
                } else {
                    Ok(zoom + 1)
                };
            }
        }

        // Even the coarsest level satisfies the constraint.
        Ok(0)
    }
}

/// A rectangle between a southwestern and a northeastern corner:
///
/// ```text
///    +---+ ne
///    |   |
/// sw +---+
/// ```
///
/// Latitude ordering is enforced; the longitude span may cross the
/// antimeridian, so there is no ordering invariant on longitude.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoRect {
    sw: GeoPoint,
    ne: GeoPoint,
}

impl GeoRect {
    /// Creates a rectangle from its southwestern and northeastern corners.
    pub fn new(sw: GeoPoint, ne: GeoPoint) -> Result<Self, GeoError> {
        if sw.lat > ne.lat {
            return Err(GeoError::InvalidRect {
                sw_lat: sw.lat,
                ne_lat: ne.lat,
            });
        }
        Ok(Self { sw, ne })
    }

    /// Creates a rectangle of the given physical size centered on `center`.
    ///
    /// The longitude span is corrected by `1/cos(lat)` since meridians
    /// converge toward the poles. Longitudes that leave [-180, 180] wrap
    /// across the antimeridian.
    ///
    /// # Errors
    ///
    /// `GeoError::InvalidArea` if `width_m` or `height_m` is not positive.
    pub fn around(center: GeoPoint, width_m: f64, height_m: f64) -> Result<Self, GeoError> {
        if width_m <= 0.0 || height_m <= 0.0 {
            return Err(GeoError::InvalidArea {
                width: width_m,
                height: height_m,
            });
        }

        let meters_per_degree = EARTH_CIRCUMFERENCE / 360.0;
        let width_deg = width_m / (meters_per_degree * center.lat.to_radians().cos());
        let height_deg = height_m / meters_per_degree;

        let sw = GeoPoint::new(
            center.lat - height_deg / 2.0,
            wrap_longitude(center.lon - width_deg / 2.0),
        )?;
        let ne = GeoPoint::new(
            center.lat + height_deg / 2.0,
            wrap_longitude(center.lon + width_deg / 2.0),
        )?;
        Self::new(sw, ne)
    }

    pub fn southwest(&self) -> GeoPoint {
        self.sw
    }

    pub fn northeast(&self) -> GeoPoint {
        self.ne
    }
}

fn wrap_longitude(lon: f64) -> f64 {
    if lon < -180.0 {
        lon + 360.0
    } else if lon > 180.0 {
        lon - 360.0
    } else {
        lon
    }
}
