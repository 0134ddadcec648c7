//! Tile-space projection
//!
//! The Web Mercator projection and its oblique variant. All functions here
//! are pure math: they return fractional tile coordinates without flooring,
//! which lets the mosaic cropper recover sub-tile pixel offsets later.

use std::f64::consts::{PI, SQRT_2};

use crate::geo::GeoPoint;

/// Viewing direction of the requested imagery.
///
/// `Downward` is the ordinary top-down view. The four compass directions are
/// the 45° oblique ("bird's eye") variants; `Northward` shares the top-down
/// tile layout, while east/south/west rotate the tile axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewDirection {
    Downward,
    Northward,
    Eastward,
    Southward,
    Westward,
}

impl ViewDirection {
    /// Camera angle parameter for the oblique endpoint, `None` for the
    /// top-down view.
    pub fn oblique_angle(&self) -> Option<u16> {
        match self {
            ViewDirection::Downward => None,
            ViewDirection::Northward => Some(0),
            ViewDirection::Eastward => Some(90),
            ViewDirection::Southward => Some(180),
            ViewDirection::Westward => Some(270),
        }
    }

    /// Whether projecting in this direction rotates the tile axes.
    /// North-facing oblique imagery keeps the standard layout.
    pub fn rotates_axes(&self) -> bool {
        matches!(
            self,
            ViewDirection::Eastward | ViewDirection::Southward | ViewDirection::Westward
        )
    }
}

/// Projects a point into fractional tile coordinates at the given zoom.
///
/// Downward/northward use the standard cylindrical projection:
/// `x = (2^zoom / 2π)(λ + π)`, `y = (2^zoom / 2π)(π − ln tan(π/4 + φ/2))`.
/// The rotated directions first remap the axes (with `W = 2^zoom`):
/// east `(y0, W−x0)`, south `(W−x0, W−y0)`, west `(W−y0, x0)`, then
/// compress the distance from the line `y = W/2` by √2 to account for the
/// oblique foreshortening.
pub fn project(point: GeoPoint, zoom: u8, direction: ViewDirection) -> (f64, f64) {
    let factor = 2f64.powi(zoom as i32) / (2.0 * PI);
    let x0 = factor * (point.lon().to_radians() + PI);
    let y0 = factor * (PI - (PI / 4.0 + point.lat().to_radians() / 2.0).tan().ln());

    if !direction.rotates_axes() {
        return (x0, y0);
    }

    let w = 2f64.powi(zoom as i32);
    let (x, y) = match direction {
        ViewDirection::Eastward => (y0, w - x0),
        ViewDirection::Southward => (w - x0, w - y0),
        ViewDirection::Westward => (w - y0, x0),
        _ => unreachable!("non-rotating direction"),
    };
    (x, w / 2.0 + (y - w / 2.0) / SQRT_2)
}

/// Inverse of the downward projection.
pub fn unproject(x: f64, y: f64, zoom: u8) -> Result<GeoPoint, crate::geo::GeoError> {
    let factor = 2f64.powi(zoom as i32) / (2.0 * PI);
    let lon = (x / factor - PI).to_degrees();
    let lat = (2.0 * ((PI - y / factor).exp().atan() - PI / 4.0)).to_degrees();
    GeoPoint::new(lat, lon)
}

/// Ground resolution in meters per pixel at the given latitude and zoom.
pub fn meters_per_pixel(lat: f64, zoom: u8) -> f64 {
    (crate::geo::EARTH_CIRCUMFERENCE / crate::geo::TILE_SIZE as f64) * lat.to_radians().cos()
        / 2f64.powi(zoom as i32)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(lat: f64, lon: f64) -> GeoPoint {
        GeoPoint::new(lat, lon).unwrap()
    }

    #[test]
    fn test_origin_projects_to_tile_space_center() {
        let (x, y) = project(point(0.0, 0.0), 0, ViewDirection::Downward);
        assert!((x - 0.5).abs() < 1e-12);
        assert!((y - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_zoom_doubles_coordinates() {
        let p = point(37.0, -122.0);
        let (x1, y1) = project(p, 5, ViewDirection::Downward);
        let (x2, y2) = project(p, 6, ViewDirection::Downward);
        assert!((x2 - 2.0 * x1).abs() < 1e-9);
        assert!((y2 - 2.0 * y1).abs() < 1e-9);
    }

    #[test]
    fn test_northward_matches_downward() {
        let p = point(48.0, 9.0);
        assert_eq!(
            project(p, 12, ViewDirection::Downward),
            project(p, 12, ViewDirection::Northward)
        );
    }

    #[test]
    fn test_eastward_rotation_and_foreshortening() {
        // At zoom 1, W = 2. Standard projection of (0°, 90°E) is (1.5, 1.0).
        let p = point(0.0, 90.0);
        let (x, y) = project(p, 1, ViewDirection::Eastward);
        // east: x = y0 = 1.0, y = W - x0 = 0.5, then y' = 1 + (0.5 - 1)/√2
        assert!((x - 1.0).abs() < 1e-9);
        assert!((y - (1.0 - 0.5 / SQRT_2)).abs() < 1e-9);
    }

    #[test]
    fn test_southward_keeps_equator_line_fixed() {
        // Points on the equator project onto y0 = W/2, which the southward
        // remap sends back to W/2; foreshortening leaves that line in place.
        let p = point(0.0, 45.0);
        let (_, y) = project(p, 4, ViewDirection::Southward);
        assert!((y - 8.0).abs() < 1e-9);
    }

    #[test]
    fn test_westward_remap() {
        let p = point(0.0, 90.0);
        let w = 2.0;
        let (x, y) = project(p, 1, ViewDirection::Westward);
        // west: x = W - y0 = 1.0, y = x0 = 1.5, foreshortened toward 1.0
        assert!((x - (w - 1.0)).abs() < 1e-9);
        assert!((y - (1.0 + 0.5 / SQRT_2)).abs() < 1e-9);
    }

    #[test]
    fn test_meters_per_pixel_halves_per_zoom() {
        let a = meters_per_pixel(48.0, 10);
        let b = meters_per_pixel(48.0, 11);
        assert!((a / b - 2.0).abs() < 1e-9);
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn test_project_unproject_roundtrip(
                lat in -85.0..85.0_f64,
                lon in -179.9..179.9_f64,
                zoom in 0u8..=23
            ) {
                let p = GeoPoint::new(lat, lon).unwrap();
                let (x, y) = project(p, zoom, ViewDirection::Downward);
                let back = unproject(x, y, zoom).unwrap();

                prop_assert!((back.lat() - lat).abs() < 1e-6,
                    "latitude roundtrip {} -> {}", lat, back.lat());
                prop_assert!((back.lon() - lon).abs() < 1e-6,
                    "longitude roundtrip {} -> {}", lon, back.lon());
            }

            #[test]
            fn test_projection_stays_in_tile_space(
                lat in -85.0..85.0_f64,
                lon in -180.0..180.0_f64,
                zoom in 0u8..=23,
                dir_idx in 0usize..5
            ) {
                let directions = [
                    ViewDirection::Downward,
                    ViewDirection::Northward,
                    ViewDirection::Eastward,
                    ViewDirection::Southward,
                    ViewDirection::Westward,
                ];
                let p = GeoPoint::new(lat, lon).unwrap();
                let w = 2f64.powi(zoom as i32);
                let (x, y) = project(p, zoom, directions[dir_idx]);
                prop_assert!((0.0..=w).contains(&x), "x = {} out of [0, {}]", x, w);
                prop_assert!((0.0..=w).contains(&y), "y = {} out of [0, {}]", y, w);
            }
        }
    }
}
