//! # Camera Equipment Communications Module

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use chrono::{DateTime, Utc};
use image::{DynamicImage, GenericImageView};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A single frame acquired from the robot's camera.
#[derive(Clone)]
pub struct Frame {
    /// UTC timestamp at which the frame was acquired
    pub timestamp: DateTime<Utc>,

    /// The image itself
    pub image: DynamicImage
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Frame {
    /// Create a new frame from an image and its acquisition time.
    pub fn new(timestamp: DateTime<Utc>, image: DynamicImage) -> Self {
        Self { timestamp, image }
    }

    /// Returns true if this frame was acquired strictly after the given instant.
    ///
    /// Frames with a duplicate timestamp are not considered new.
    pub fn is_newer_than(&self, other: Option<DateTime<Utc>>) -> bool {
        match other {
            Some(t) => self.timestamp > t,
            None => true
        }
    }
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("timestamp", &self.timestamp)
            .field("width", &self.image.width())
            .field("height", &self.image.height())
            .finish()
    }
}
