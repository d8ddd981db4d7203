//! Eye and mouth aspect ratios from landmark contours

use serde::{Deserialize, Serialize};

use crate::landmarks::Point;
use crate::DmsError;

/// Points in a single eye contour
pub const EYE_CONTOUR_POINTS: usize = 6;

/// Minimum points in a mouth contour (outer lip up to the far corner)
pub const MOUTH_CONTOUR_MIN_POINTS: usize = 11;

/// Per-face ratios for one frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AspectMetrics {
    /// Eye aspect ratio, averaged over both eyes (lower = more closed)
    pub ear: f32,
    /// Mouth aspect ratio (higher = wider open)
    pub mar: f32,
}

/// Eye aspect ratio of a 6-point eye contour.
///
/// `(|p1-p5| + |p2-p4|) / (2 * |p0-p3|)`. Returns `Ok(None)` when the
/// horizontal reference distance collapses to zero.
pub fn eye_aspect_ratio(eye: &[Point]) -> Result<Option<f32>, DmsError> {
    if eye.len() != EYE_CONTOUR_POINTS {
        return Err(DmsError::InvalidInput {
            region: "eye",
            expected: EYE_CONTOUR_POINTS,
            actual: eye.len(),
        });
    }

    let a = eye[1].distance(&eye[5]);
    let b = eye[2].distance(&eye[4]);
    let c = eye[0].distance(&eye[3]);
    Ok(ratio(a + b, c))
}

/// Mouth aspect ratio of a mouth contour (at least 11 points).
///
/// `(|p2-p10| + |p4-p8|) / (2 * |p0-p6|)`.
pub fn mouth_aspect_ratio(mouth: &[Point]) -> Result<Option<f32>, DmsError> {
    if mouth.len() < MOUTH_CONTOUR_MIN_POINTS {
        return Err(DmsError::InvalidInput {
            region: "mouth",
            expected: MOUTH_CONTOUR_MIN_POINTS,
            actual: mouth.len(),
        });
    }

    let a = mouth[2].distance(&mouth[10]);
    let b = mouth[4].distance(&mouth[8]);
    let c = mouth[0].distance(&mouth[6]);
    Ok(ratio(a + b, c))
}

fn ratio(vertical: f32, horizontal: f32) -> Option<f32> {
    if !horizontal.is_finite() || horizontal <= f32::EPSILON {
        return None;
    }
    let value = vertical / (2.0 * horizontal);
    value.is_finite().then_some(value)
}

/// Mean EAR of both eyes; not computable if either eye is degenerate
pub fn combined_eye_ratio(left: &[Point], right: &[Point]) -> Result<Option<f32>, DmsError> {
    let left = eye_aspect_ratio(left)?;
    let right = eye_aspect_ratio(right)?;
    Ok(match (left, right) {
        (Some(l), Some(r)) => Some((l + r) / 2.0),
        _ => None,
    })
}
