//! # Perception Interface
//!
//! Outputs of the vision models consumed by the cruise controller: the road-following target
//! estimate and the object detections used in fleet mode.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// The road-following target predicted by the vision model for one frame.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq)]
pub struct TargetEstimate {
    /// Lateral offset of the target from the image centre, in [-1, 1]. Positive is to the
    /// right.
    pub x: f64,

    /// Vertical position of the target in the image, in [0, 1].
    pub y: f64,

    /// Confidence of the estimate, in [0, 1].
    pub confidence: f64,

    /// Timestamp of the frame this estimate was produced from
    pub timestamp: DateTime<Utc>
}

/// A normalised bounding box, `(x0, y0)` top left and `(x1, y1)` bottom right, all in [0, 1].
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq)]
pub struct BBox {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64
}

/// A single object detection.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq)]
pub struct Detection {
    /// Index of the detected class in the detector's label space
    pub label: u32,

    /// Detector confidence, in [0, 1]
    pub confidence: f64,

    /// Bounding box of the object
    pub bbox: BBox
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl TargetEstimate {
    /// Build an estimate with its position clamped into the valid ranges.
    pub fn new(x: f64, y: f64, confidence: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            x: x.clamp(-1.0, 1.0),
            y: y.clamp(0.0, 1.0),
            confidence: confidence.clamp(0.0, 1.0),
            timestamp
        }
    }
}

impl BBox {
    pub fn new(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self { x0, y0, x1, y1 }
    }

    /// Area of the box as a fraction of the frame. Inverted boxes have zero area.
    pub fn area(&self) -> f64 {
        (self.x1 - self.x0).max(0.0) * (self.y1 - self.y0).max(0.0)
    }

    /// Centre of the box, `(x, y)`, in normalised frame coordinates.
    pub fn centre(&self) -> (f64, f64) {
        ((self.x0 + self.x1) * 0.5, (self.y0 + self.y1) * 0.5)
    }
}

impl Detection {
    pub fn new(label: u32, confidence: f64, bbox: BBox) -> Self {
        Self { label, confidence, bbox }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_bbox_geometry() {
        let b = BBox::new(0.2, 0.4, 0.6, 0.9);
        assert!((b.area() - 0.2).abs() < 1e-12);
        let (cx, cy) = b.centre();
        assert!((cx - 0.4).abs() < 1e-12);
        assert!((cy - 0.65).abs() < 1e-12);

        // Inverted boxes are degenerate rather than negative
        assert_eq!(BBox::new(0.6, 0.2, 0.2, 0.4).area(), 0.0);
    }

    #[test]
    fn test_estimate_clamped() {
        let e = TargetEstimate::new(1.5, -0.2, 2.0, Utc::now());
        assert_eq!(e.x, 1.0);
        assert_eq!(e.y, 0.0);
        assert_eq!(e.confidence, 1.0);
    }
}
