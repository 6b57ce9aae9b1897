//! # Simulated equipment
//!
//! Stand-ins for the camera, the vision models and the motors, used to run the cruise loop
//! headless. The road target drifts smoothly using Perlin noise, and in fleet mode an object
//! periodically comes into view.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use chrono::{DateTime, Duration, Utc};
use color_eyre::Result;
use image::DynamicImage;
use log::{debug, trace};
use noise::{NoiseFn, Perlin, Seedable};
use serde::Deserialize;

// Internal
use crate::interfaces::{FrameSource, MotorSink, TargetEstimator};
use comms_if::eqpt::{BBox, Detection, Frame, MotorDems, TargetEstimate};
use util::{maths::clamp_unit, time::seconds_between};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Size of the simulated images. The simulated estimator does not look at the pixels.
const SIM_IMAGE_SIZE: (u32, u32) = (32, 24);

/// Perlin y-offsets that decorrelate the simulated signals.
const NOISE_OFFSET_Y: f64 = 17.3;
const NOISE_OFFSET_CONF: f64 = 41.9;
const NOISE_OFFSET_BLOCKED: f64 = 73.1;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters of the simulated equipment. Missing values take their defaults.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct SimParams {
    /// Rate at which the camera produces frames.
    ///
    /// Units: hertz
    pub frame_rate_hz: f64,

    /// Seed of the noise generator
    pub seed: u32,

    /// Rate at which the road target drifts, higher is a twistier road.
    pub road_drift_rate: f64,

    /// Confidence of the road estimate in good conditions
    pub road_confidence: f64,

    /// Confidence noise below which the estimate degrades to a low confidence dropout
    pub dropout_level: f64,

    /// Period of the object's appearances.
    ///
    /// Units: seconds
    pub object_period_s: f64,

    /// How long the object stays in view on each appearance.
    ///
    /// Units: seconds
    pub object_duration_s: f64,

    /// Label of the simulated object
    pub object_label: u32,

    /// Confidence of the object's detections
    pub object_confidence: f64,

    /// Scale of the obstacle score, zero for a clear path
    pub blocked_scale: f64
}

/// A camera producing blank frames at a fixed rate.
pub struct SimCamera {
    frame_period: Duration,
    latest: Option<Frame>
}

/// Vision models producing a synthetic road target and object.
pub struct SimEstimator {
    params: SimParams,
    perlin: Perlin,

    /// Timestamp of the first frame seen
    t0: Option<DateTime<Utc>>
}

/// A motor sink which logs the demands it is given.
#[derive(Debug, Default)]
pub struct LogMotorSink {
    num_dems: u64,
    last_dems: MotorDems
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for SimParams {
    fn default() -> Self {
        Self {
            frame_rate_hz: 30.0,
            seed: 0,
            road_drift_rate: 0.2,
            road_confidence: 0.9,
            dropout_level: -0.5,
            object_period_s: 10.0,
            object_duration_s: 4.0,
            object_label: 1,
            object_confidence: 0.8,
            blocked_scale: 0.5
        }
    }
}

impl SimCamera {
    pub fn new(params: &SimParams) -> Self {
        let period_us = (1e6 / params.frame_rate_hz.max(1.0)) as i64;

        Self {
            frame_period: Duration::microseconds(period_us),
            latest: None
        }
    }

    fn capture(now: DateTime<Utc>) -> Frame {
        Frame::new(
            now,
            DynamicImage::new_rgb8(SIM_IMAGE_SIZE.0, SIM_IMAGE_SIZE.1)
        )
    }
}

impl FrameSource for SimCamera {
    fn latest_frame(&mut self) -> Result<Option<Frame>> {
        let now = Utc::now();

        // Frames between polls are dropped, only the newest is kept
        let due = match &self.latest {
            Some(f) => now - f.timestamp >= self.frame_period,
            None => true
        };

        if due {
            self.latest = Some(Self::capture(now));
        }

        Ok(self.latest.clone())
    }
}

impl SimEstimator {
    pub fn new(params: SimParams) -> Self {
        let perlin = Perlin::new().set_seed(params.seed);

        Self {
            params,
            perlin,
            t0: None
        }
    }

    /// Seconds since the first frame.
    fn sim_time(&mut self, frame: &Frame) -> f64 {
        let t0 = *self.t0.get_or_insert(frame.timestamp);
        seconds_between(t0, frame.timestamp).unwrap_or(0.0)
    }

    fn noise(&self, t: f64, offset: f64) -> f64 {
        self.perlin.get([t * self.params.road_drift_rate, offset])
    }

    /// True if the object is in view at the given time.
    fn object_in_view(&self, t: f64) -> bool {
        self.params.object_period_s > 0.0
            && t % self.params.object_period_s < self.params.object_duration_s
    }
}

impl TargetEstimator for SimEstimator {
    fn estimate(&mut self, frame: &Frame) -> Result<TargetEstimate> {
        let t = self.sim_time(frame);

        let x = 1.5 * self.noise(t, 0.0);
        let y = 0.5 + 0.4 * self.noise(t, NOISE_OFFSET_Y);

        let confidence = if self.noise(t, NOISE_OFFSET_CONF) < self.params.dropout_level {
            0.1
        }
        else {
            self.params.road_confidence
        };

        trace!("SimEstimator: t = {:.2}, x = {:.3}, conf = {:.2}", t, x, confidence);

        Ok(TargetEstimate::new(x, y, confidence, frame.timestamp))
    }

    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>> {
        let t = self.sim_time(frame);

        if !self.object_in_view(t) {
            return Ok(Vec::new())
        }

        // The object wanders across the view and approaches over the appearance
        let phase = (t % self.params.object_period_s) / self.params.object_duration_s;
        let cx = 0.5 + 0.3 * self.noise(t, 0.5);
        let half_w = 0.1 + 0.2 * phase;
        let half_h = 0.15 + 0.25 * phase;

        let bbox = BBox::new(cx - half_w, 0.5 - half_h, cx + half_w, 0.5 + half_h);

        Ok(vec![Detection::new(self.params.object_label, self.params.object_confidence, bbox)])
    }

    fn blocked(&mut self, frame: &Frame) -> Result<f64> {
        let t = self.sim_time(frame);

        Ok(clamp_unit(self.params.blocked_scale * (1.0 + self.noise(t, NOISE_OFFSET_BLOCKED))))
    }
}

impl LogMotorSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of demands received.
    pub fn num_dems(&self) -> u64 {
        self.num_dems
    }

    pub fn last_dems(&self) -> MotorDems {
        self.last_dems
    }
}

impl MotorSink for LogMotorSink {
    fn drive(&mut self, dems: MotorDems) -> Result<()> {
        self.num_dems += 1;

        if dems != self.last_dems {
            debug!("Motors: left = {:+.3}, right = {:+.3}", dems.left, dems.right);
        }
        self.last_dems = dems;

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn frame_at(t0: DateTime<Utc>, secs: f64) -> Frame {
        SimCamera::capture(t0 + Duration::milliseconds((secs * 1000.0) as i64))
    }

    #[test]
    fn test_camera_returns_newest_only() {
        let mut cam = SimCamera::new(&SimParams { frame_rate_hz: 1.0, ..Default::default() });

        let first = cam.latest_frame().unwrap().unwrap();
        let again = cam.latest_frame().unwrap().unwrap();

        // Well within the frame period the same frame is returned
        assert_eq!(first.timestamp, again.timestamp);
        assert!(!again.is_newer_than(Some(first.timestamp)));
    }

    #[test]
    fn test_estimates_in_range() {
        let mut est = SimEstimator::new(SimParams::default());
        let t0 = Utc::now();

        for i in 0..200 {
            let f = frame_at(t0, i as f64 * 0.1);
            let e = est.estimate(&f).unwrap();
            assert!(e.x >= -1.0 && e.x <= 1.0);
            assert!(e.y >= 0.0 && e.y <= 1.0);
            assert!(e.confidence == 0.1 || e.confidence == 0.9);

            let b = est.blocked(&f).unwrap();
            assert!(b >= 0.0 && b <= 1.0);
        }
    }

    #[test]
    fn test_object_appears_periodically() {
        let mut est = SimEstimator::new(SimParams::default());
        let t0 = Utc::now();

        // Prime the time base on the first frame
        est.estimate(&frame_at(t0, 0.0)).unwrap();

        let seen = est.detect(&frame_at(t0, 1.0)).unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].label, 1);
        assert!(seen[0].bbox.area() > 0.0);

        assert!(est.detect(&frame_at(t0, 6.0)).unwrap().is_empty());
        assert_eq!(est.detect(&frame_at(t0, 11.0)).unwrap().len(), 1);
    }

    #[test]
    fn test_log_sink_counts() {
        let mut sink = LogMotorSink::new();
        sink.drive(MotorDems::from_speed_steering(0.2, 0.1)).unwrap();
        sink.drive(MotorDems::STOP).unwrap();

        assert_eq!(sink.num_dems(), 2);
        assert!(sink.last_dems().is_stop());
    }
}
