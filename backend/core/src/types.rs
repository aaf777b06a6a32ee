use serde::{Deserialize, Serialize};

/// A vertex of a text region, as `[x, y]` in image pixel coordinates.
pub type Point = [f64; 2];

/// Polygon enclosing one run of recognized text, in the order the worker
/// reports the corners.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Region {
    pub points: Vec<Point>,
}

impl Region {
    pub fn new(points: Vec<Point>) -> Self {
        Self { points }
    }

    /// Axis-aligned bounding box as `(min_x, min_y, max_x, max_y)`.
    pub fn bounds(&self) -> Option<(f64, f64, f64, f64)> {
        let first = self.points.first()?;
        let init = (first[0], first[1], first[0], first[1]);
        Some(self.points.iter().fold(init, |(x0, y0, x1, y1), p| {
            (x0.min(p[0]), y0.min(p[1]), x1.max(p[0]), y1.max(p[1]))
        }))
    }
}

/// One item of a recognition result: a text run, the worker's confidence in
/// it, and where it sits in the image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognizedText {
    pub text: String,
    pub confidence: f64,
    #[serde(default, alias = "bbox")]
    pub region: Region,
}
