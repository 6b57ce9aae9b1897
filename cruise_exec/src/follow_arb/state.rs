//! Object follow arbiter state

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, info, warn};
use ordered_float::OrderedFloat;
use serde::Serialize;

// Internal
use super::{FollowMode, Params};
use comms_if::eqpt::{Detection, TargetEstimate};
use util::maths::lin_map;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The object follow arbiter.
#[derive(Debug, Clone)]
pub struct FollowArb {
    params: Params,

    /// Current mode
    mode: FollowMode,

    /// Label tracked on the previous call, changing it restarts arbitration
    prev_label: Option<u32>,

    /// Number of consecutive frames without a match while following an object
    num_consec_misses: usize,

    /// The last object target matched
    last_target: Option<ObjectTarget>,

    /// Out of range label that has already been reported
    reported_label: Option<u32>
}

/// A target derived from a detected object.
#[derive(Debug, Serialize, Copy, Clone, PartialEq)]
pub struct ObjectTarget {
    pub label: u32,
    pub x: f64,
    pub y: f64,
    pub view: f64,
    pub confidence: f64
}

/// The outcome of arbitration for one frame.
#[derive(Debug, Serialize, Copy, Clone, PartialEq)]
pub struct ArbResult {
    /// The objective driving the robot
    pub mode: FollowMode,

    /// Lateral target in [-1, 1]
    pub target_x: f64,

    /// Vertical target in [0, 1]
    pub target_y: f64,

    /// View fraction of the followed object, zero while following the road
    pub mean_view: f64,

    /// Forwarded obstacle score
    pub blocked: f64,

    /// Confidence of the chosen target
    pub confidence: f64,

    /// Label being followed, if any
    pub label: Option<u32>,

    /// True if the object target was reused from a previous frame
    pub reused: bool
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl FollowArb {
    pub fn new(params: Params) -> Self {
        Self {
            params,
            mode: FollowMode::RoadFollow,
            prev_label: None,
            num_consec_misses: 0,
            last_target: None,
            reported_label: None
        }
    }

    /// Return to road following and clear the hysteresis counter.
    pub fn reset(&mut self) {
        self.mode = FollowMode::RoadFollow;
        self.num_consec_misses = 0;
        self.last_target = None;
    }

    pub fn mode(&self) -> FollowMode {
        self.mode
    }

    /// Name of a label, if it is in the label space.
    pub fn label_name(&self, label: u32) -> Option<&str> {
        self.params.labels.get(label as usize).map(|s| s.as_str())
    }

    /// Returns true if the label is in the detector's label space.
    pub fn is_known_label(&self, label: u32) -> bool {
        (label as usize) < self.params.labels.len()
    }

    /// Decide which objective drives the robot for this frame.
    ///
    /// `road` is the road-following estimate for the same frame, used verbatim when no object
    /// is followed. Detections are only matched if their confidence is at least
    /// `confidence_threshold`.
    pub fn arbitrate(
        &mut self,
        detections: &[Detection],
        tracked_label: Option<u32>,
        road: &TargetEstimate,
        blocked: f64,
        confidence_threshold: f64
    ) -> ArbResult {
        if tracked_label != self.prev_label {
            debug!("Tracked label changed from {:?} to {:?}", self.prev_label, tracked_label);
            self.prev_label = tracked_label;
            self.reset();
        }

        let label = match tracked_label {
            Some(l) if self.is_known_label(l) => l,
            Some(l) => {
                if self.reported_label != Some(l) {
                    warn!(
                        "Tracked label {} is outside the detector's {} labels, following the road",
                        l,
                        self.params.labels.len()
                    );
                    self.reported_label = Some(l);
                }
                return self.road_result(road, blocked)
            },
            None => return self.road_result(road, blocked)
        };

        // Largest matching box, confidence breaks ties
        let best = detections
            .iter()
            .filter(|d| d.label == label && d.confidence >= confidence_threshold)
            .max_by_key(|d| (OrderedFloat(d.bbox.area()), OrderedFloat(d.confidence)));

        match best {
            Some(det) => {
                if self.mode == FollowMode::RoadFollow {
                    info!("Following object with label {}", label);
                }

                let target = Self::object_target(det);
                self.mode = FollowMode::ObjectFollow;
                self.num_consec_misses = 0;
                self.last_target = Some(target);

                Self::object_result(&target, blocked, false)
            },
            None => {
                // Hold the object through short dropouts
                if let (FollowMode::ObjectFollow, Some(target)) = (self.mode, self.last_target) {
                    self.num_consec_misses += 1;

                    if self.num_consec_misses < self.params.hysteresis_frames {
                        return Self::object_result(&target, blocked, true)
                    }

                    info!(
                        "Object with label {} lost for {} frames, following the road",
                        label, self.num_consec_misses
                    );
                }

                self.reset();
                self.road_result(road, blocked)
            }
        }
    }

    /// Build the target for a detected object.
    fn object_target(det: &Detection) -> ObjectTarget {
        let (cx, cy) = det.bbox.centre();

        ObjectTarget {
            label: det.label,
            x: lin_map((0.0, 1.0), (-1.0, 1.0), cx).clamp(-1.0, 1.0),
            y: cy.clamp(0.0, 1.0),
            view: det.bbox.area(),
            confidence: det.confidence
        }
    }

    fn object_result(target: &ObjectTarget, blocked: f64, reused: bool) -> ArbResult {
        ArbResult {
            mode: FollowMode::ObjectFollow,
            target_x: target.x,
            target_y: target.y,
            mean_view: target.view,
            blocked,
            confidence: target.confidence,
            label: Some(target.label),
            reused
        }
    }

    fn road_result(&self, road: &TargetEstimate, blocked: f64) -> ArbResult {
        ArbResult {
            mode: FollowMode::RoadFollow,
            target_x: road.x,
            target_y: road.y,
            mean_view: 0.0,
            blocked,
            confidence: road.confidence,
            label: None,
            reused: false
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use chrono::Utc;
    use comms_if::eqpt::BBox;

    fn arb(hysteresis_frames: usize) -> FollowArb {
        FollowArb::new(Params {
            hysteresis_frames,
            labels: vec!["background".into(), "person".into(), "car".into()]
        })
    }

    fn road() -> TargetEstimate {
        TargetEstimate::new(-0.2, 0.6, 0.9, Utc::now())
    }

    /// A detection whose box has the given area, centred at `cx`.
    fn det(label: u32, confidence: f64, cx: f64, area: f64) -> Detection {
        let half = area.sqrt() * 0.5;
        Detection::new(label, confidence, BBox::new(cx - half, 0.5 - half, cx + half, 0.5 + half))
    }

    #[test]
    fn test_no_match_follows_road() {
        let mut a = arb(3);
        let r = road();

        let res = a.arbitrate(&[], Some(1), &r, 0.4, 0.5);
        assert_eq!(res.mode, FollowMode::RoadFollow);
        assert_eq!(res.target_x, r.x);
        assert_eq!(res.target_y, r.y);
        assert_eq!(res.confidence, r.confidence);
        assert_eq!(res.blocked, 0.4);

        // Wrong label or too low confidence are not matches
        let dets = [det(2, 0.9, 0.5, 0.3), det(1, 0.2, 0.5, 0.3)];
        let res = a.arbitrate(&dets, Some(1), &r, 0.0, 0.5);
        assert_eq!(res.mode, FollowMode::RoadFollow);
    }

    #[test]
    fn test_largest_match_followed() {
        let mut a = arb(3);

        let dets = [
            det(1, 0.95, 0.25, 0.05),
            det(1, 0.6, 0.75, 0.3),
            det(2, 0.99, 0.5, 0.5),
        ];
        let res = a.arbitrate(&dets, Some(1), &road(), 0.0, 0.5);

        assert_eq!(res.mode, FollowMode::ObjectFollow);
        assert_eq!(res.label, Some(1));
        assert!((res.target_x - 0.5).abs() < 1e-9);
        assert!((res.mean_view - 0.3).abs() < 1e-9);
        assert_eq!(res.confidence, 0.6);
        assert!(!res.reused);
    }

    #[test]
    fn test_hysteresis_sequence() {
        let mut a = arb(3);
        let hit = [det(1, 0.8, 0.6, 0.3)];

        let frames: [&[Detection]; 5] = [&hit, &[], &[], &[], &hit];
        let modes: Vec<FollowMode> = frames
            .iter()
            .map(|d| a.arbitrate(d, Some(1), &road(), 0.0, 0.3).mode)
            .collect();

        assert_eq!(modes, vec![
            FollowMode::ObjectFollow,
            FollowMode::ObjectFollow,
            FollowMode::ObjectFollow,
            FollowMode::RoadFollow,
            FollowMode::ObjectFollow,
        ]);
    }

    #[test]
    fn test_held_target_reused() {
        let mut a = arb(3);
        let first = a.arbitrate(&[det(1, 0.8, 0.6, 0.3)], Some(1), &road(), 0.0, 0.3);
        let held = a.arbitrate(&[], Some(1), &road(), 0.7, 0.3);

        assert!(held.reused);
        assert_eq!(held.target_x, first.target_x);
        assert_eq!(held.mean_view, first.mean_view);
        assert_eq!(held.blocked, 0.7);
    }

    #[test]
    fn test_unknown_label_always_road() {
        let mut a = arb(3);
        let dets = [det(7, 0.99, 0.5, 0.3)];

        for _ in 0..5 {
            let res = a.arbitrate(&dets, Some(7), &road(), 0.0, 0.3);
            assert_eq!(res.mode, FollowMode::RoadFollow);
        }

        let res = a.arbitrate(&dets, None, &road(), 0.0, 0.3);
        assert_eq!(res.mode, FollowMode::RoadFollow);
    }

    #[test]
    fn test_label_change_restarts() {
        let mut a = arb(3);
        a.arbitrate(&[det(1, 0.8, 0.6, 0.3)], Some(1), &road(), 0.0, 0.3);
        assert_eq!(a.mode(), FollowMode::ObjectFollow);

        let res = a.arbitrate(&[], Some(2), &road(), 0.0, 0.3);
        assert_eq!(res.mode, FollowMode::RoadFollow);
    }
}
