//! Render planning
//!
//! Reconciles the resolution constraint (`--max-meters-per-pixel`) with the
//! requested result image size. An image size implies a resolution: a
//! 300 m wide area rendered 600 px wide needs at most 0.5 m/px. Both
//! constraints may be given; the tighter one wins. With no image size at
//! all, the resolution constraint is mandatory.

use crate::error::CliError;

/// Resolved rendering parameters for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderPlan {
    /// Effective resolution constraint driving zoom level selection.
    pub max_meters_per_pixel: f64,
    /// Final image dimensions, if the mosaics are to be rescaled.
    pub target_size: Option<(u32, u32)>,
}

/// Derives the effective resolution constraint and target image size from
/// the area dimensions (meters) and the user's options.
///
/// A single given image dimension fixes that axis; the other follows from
/// the area's aspect ratio.
pub fn plan_render(
    area_width: f64,
    area_height: f64,
    max_meters_per_pixel: Option<f64>,
    image_width: Option<u32>,
    image_height: Option<u32>,
) -> Result<RenderPlan, CliError> {
    if area_width <= 0.0 || area_height <= 0.0 {
        return Err(CliError::Options(
            "area width and height must be positive".to_string(),
        ));
    }
    if let Some(mpp) = max_meters_per_pixel {
        if mpp <= 0.0 {
            return Err(CliError::Options(
                "max meters per pixel must be positive".to_string(),
            ));
        }
    }
    if image_width == Some(0) || image_height == Some(0) {
        return Err(CliError::Options(
            "image width and height must be positive".to_string(),
        ));
    }

    let (effective_mpp, target_size) = match (image_width, image_height) {
        (None, None) => {
            let mpp = max_meters_per_pixel.ok_or_else(|| {
                CliError::Options(
                    "either --max-meters-per-pixel or an image size is required".to_string(),
                )
            })?;
            (mpp, None)
        }
        (Some(iw), None) => {
            let mpp = max_meters_per_pixel.unwrap_or(1.0) * (area_width / iw as f64);
            let ih = (area_height * (iw as f64 / area_width)).round() as u32;
            (mpp, Some((iw, ih.max(1))))
        }
        (None, Some(ih)) => {
            let mpp = max_meters_per_pixel.unwrap_or(1.0) * (area_height / ih as f64);
            let iw = (area_width * (ih as f64 / area_height)).round() as u32;
            (mpp, Some((iw.max(1), ih)))
        }
        (Some(iw), Some(ih)) => {
            // Both axes given: whichever implies the finer resolution wins,
            // so neither axis comes out blurrier than requested.
            let ratio = (area_width / iw as f64).min(area_height / ih as f64);
            let mpp = max_meters_per_pixel.unwrap_or(1.0) * ratio;
            (mpp, Some((iw, ih)))
        }
    };

    Ok(RenderPlan {
        max_meters_per_pixel: effective_mpp,
        target_size,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolution_only() {
        let plan = plan_render(300.0, 300.0, Some(0.5), None, None).unwrap();
        assert_eq!(plan.max_meters_per_pixel, 0.5);
        assert_eq!(plan.target_size, None);
    }

    #[test]
    fn test_no_constraint_at_all_is_an_error() {
        assert!(plan_render(300.0, 300.0, None, None, None).is_err());
    }

    #[test]
    fn test_image_width_implies_resolution_and_height() {
        let plan = plan_render(300.0, 150.0, None, Some(600), None).unwrap();
        assert_eq!(plan.max_meters_per_pixel, 0.5);
        assert_eq!(plan.target_size, Some((600, 300)));
    }

    #[test]
    fn test_image_height_implies_resolution_and_width() {
        let plan = plan_render(300.0, 150.0, None, None, Some(300)).unwrap();
        assert_eq!(plan.max_meters_per_pixel, 0.5);
        assert_eq!(plan.target_size, Some((600, 300)));
    }

    #[test]
    fn test_both_dimensions_tighter_axis_wins() {
        // 500 px over 300 m is 0.6 m/px; the width axis is tighter.
        let plan = plan_render(300.0, 300.0, None, Some(500), Some(100)).unwrap();
        assert_eq!(plan.max_meters_per_pixel, 0.6);
        assert_eq!(plan.target_size, Some((500, 100)));
    }

    #[test]
    fn test_explicit_resolution_scales_the_implied_one() {
        // As in: render 300 m at 500 px, but with imagery twice as detailed
        // as the output, for a sharper downscale.
        let plan = plan_render(300.0, 300.0, Some(0.5), Some(500), Some(500)).unwrap();
        assert_eq!(plan.max_meters_per_pixel, 0.5 * (300.0 / 500.0));
        assert_eq!(plan.target_size, Some((500, 500)));
    }

    #[test]
    fn test_rejects_nonpositive_inputs() {
        assert!(plan_render(0.0, 300.0, Some(1.0), None, None).is_err());
        assert!(plan_render(300.0, 300.0, Some(0.0), None, None).is_err());
    }

    #[test]
    fn test_rejects_zero_image_dimensions() {
        assert!(plan_render(300.0, 300.0, None, Some(0), None).is_err());
        assert!(plan_render(300.0, 300.0, None, None, Some(0)).is_err());
        assert!(plan_render(300.0, 300.0, Some(1.0), Some(500), Some(0)).is_err());
    }
}
