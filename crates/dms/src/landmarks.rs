//! Facial landmark sets (iBUG 68-point layout)

use serde::{Deserialize, Serialize};
use std::ops::Range;

use crate::DmsError;

/// Number of points produced by the landmark model
pub const NUM_FACIAL_LANDMARKS: usize = 68;

/// 2-D landmark coordinate in image space, serialized as `[x, y]`
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "[f32; 2]", into = "[f32; 2]")]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point
    pub fn distance(&self, other: &Point) -> f32 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

impl From<[f32; 2]> for Point {
    fn from([x, y]: [f32; 2]) -> Self {
        Self { x, y }
    }
}

impl From<Point> for [f32; 2] {
    fn from(p: Point) -> Self {
        [p.x, p.y]
    }
}

impl From<(f32, f32)> for Point {
    fn from((x, y): (f32, f32)) -> Self {
        Self { x, y }
    }
}

/// Named contour inside a landmark set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaceRegion {
    RightEye,
    LeftEye,
    Mouth,
}

impl FaceRegion {
    /// Index range of the region within a 68-point set
    pub fn range(&self) -> Range<usize> {
        match self {
            FaceRegion::RightEye => 36..42,
            FaceRegion::LeftEye => 42..48,
            FaceRegion::Mouth => 48..68,
        }
    }

    /// Number of points the region is expected to hold
    pub fn len(&self) -> usize {
        self.range().len()
    }

    pub fn name(&self) -> &'static str {
        match self {
            FaceRegion::RightEye => "right_eye",
            FaceRegion::LeftEye => "left_eye",
            FaceRegion::Mouth => "mouth",
        }
    }
}

/// Landmarks for one detected face in one frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Point>", into = "Vec<Point>")]
pub struct LandmarkSet {
    points: Vec<Point>,
}

impl LandmarkSet {
    /// Build a landmark set, rejecting anything but a full 68-point layout
    pub fn new(points: Vec<Point>) -> Result<Self, DmsError> {
        if points.len() != NUM_FACIAL_LANDMARKS {
            return Err(DmsError::InvalidInput {
                region: "face",
                expected: NUM_FACIAL_LANDMARKS,
                actual: points.len(),
            });
        }
        Ok(Self { points })
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// Borrow the contour for a region
    pub fn region(&self, region: FaceRegion) -> Result<&[Point], DmsError> {
        let range = region.range();
        match self.points.get(range) {
            Some(points) => Ok(points),
            None => Err(DmsError::InvalidInput {
                region: region.name(),
                expected: region.len(),
                actual: self.points.len().saturating_sub(region.range().start),
            }),
        }
    }
}

impl TryFrom<Vec<Point>> for LandmarkSet {
    type Error = DmsError;

    fn try_from(points: Vec<Point>) -> Result<Self, Self::Error> {
        Self::new(points)
    }
}

impl From<LandmarkSet> for Vec<Point> {
    fn from(set: LandmarkSet) -> Self {
        set.points
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(count: usize) -> Vec<Point> {
        (0..count).map(|i| Point::new(i as f32, (i * 2) as f32)).collect()
    }

    #[test]
    fn test_regions_cover_expected_points() {
        let set = LandmarkSet::new(grid(68)).unwrap();

        let right = set.region(FaceRegion::RightEye).unwrap();
        assert_eq!(right.len(), 6);
        assert_eq!(right[0], Point::new(36.0, 72.0));

        let left = set.region(FaceRegion::LeftEye).unwrap();
        assert_eq!(left.len(), 6);
        assert_eq!(left[0].x, 42.0);

        let mouth = set.region(FaceRegion::Mouth).unwrap();
        assert_eq!(mouth.len(), 20);
        assert_eq!(mouth[19].x, 67.0);
    }

    #[test]
    fn test_wrong_point_count_rejected() {
        let err = LandmarkSet::new(grid(5)).unwrap_err();
        assert!(matches!(
            err,
            DmsError::InvalidInput { expected: 68, actual: 5, .. }
        ));
    }

    #[test]
    fn test_deserialize_validates_length() {
        let ok: Result<LandmarkSet, _> =
            serde_json::from_str(&serde_json::to_string(&grid(68)).unwrap());
        assert!(ok.is_ok());

        let short: Result<LandmarkSet, _> =
            serde_json::from_str(&serde_json::to_string(&grid(10)).unwrap());
        assert!(short.is_err());
    }

    #[test]
    fn test_distance() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(3.0, 4.0);
        assert!((a.distance(&b) - 5.0).abs() < f32::EPSILON);
    }
}
