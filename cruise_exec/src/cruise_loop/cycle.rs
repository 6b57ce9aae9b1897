//! # Cruise loop cycle processing
//!
//! [`CruiseCore`] holds everything computed from one frame to the next: the steering
//! controller state, the arbiter's hysteresis and the last demands sent. It does not touch any
//! equipment, the runner feeds it with the outputs of the vision models and sends the demands
//! it returns.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use chrono::{DateTime, Utc};
use log::{debug, trace};
use std::sync::Arc;

// Internal
use super::{CruiseError, Params, Telemetry, ROAD_LABEL_TEXT};
use crate::{
    follow_arb::{ArbResult, FollowArb, FollowMode},
    speed_policy::SpeedPolicy,
    steer_ctrl::{SteerCtrl, SteerGains},
};
use comms_if::{
    eqpt::{Detection, Frame, MotorDems, TargetEstimate},
    tc::CruiseConfig,
};
use util::{maths::saturate, module::State, time::seconds_between};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Per-frame processing of the cruise loop.
pub struct CruiseCore {
    params: Params,

    steer_ctrl: SteerCtrl,

    /// Present in fleet mode only
    follow_arb: Option<FollowArb>,

    /// Mode of the previous processed frame
    prev_mode: FollowMode,

    /// Timestamp of the last processed frame
    last_frame_time: Option<DateTime<Utc>>,

    /// Timestamp of the last steering controller update
    last_steer_time: Option<DateTime<Utc>>,

    /// The controller must be primed with the road target before its next update
    needs_prime: bool,

    /// Demands sent on the last cycle
    last_dems: MotorDems,

    telemetry: Telemetry
}

/// Data for one cycle of processing.
#[derive(Debug, Clone)]
pub struct CycleInput {
    /// Timestamp of the frame
    pub timestamp: DateTime<Utc>,

    /// Road following estimate for the frame
    pub estimate: TargetEstimate,

    /// Detections in the frame, `Some` only in fleet mode
    pub detections: Option<Vec<Detection>>,

    /// Obstacle score for the frame
    pub blocked: f64,

    /// Configuration snapshot for this cycle
    pub config: Arc<CruiseConfig>
}

/// Data produced by one cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleOutput {
    /// Demands to send to the motors
    pub dems: MotorDems,

    /// Snapshot to publish once the demands have been sent
    pub telemetry: Telemetry
}

/// Status report for a cycle.
#[derive(Debug, Default, Copy, Clone, PartialEq)]
pub struct CycleReport {
    /// The estimate was below the confidence threshold, previous demands were held
    pub held: bool,

    /// The obstacle score was over the stop threshold
    pub blocked_stop: bool,

    /// The follow mode changed on this cycle
    pub mode_changed: bool,

    /// Time step used by the steering controller, if it was updated
    pub steer_dt_s: Option<f64>
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl CruiseCore {
    /// Create the core. The arbiter is only built in fleet mode.
    pub fn new(params: Params, config: &CruiseConfig, fleet: bool) -> Self {
        let follow_arb = match fleet {
            true => Some(FollowArb::new(params.follow.clone())),
            false => None
        };

        Self {
            params,
            steer_ctrl: SteerCtrl::new(SteerGains::from(config)),
            follow_arb,
            prev_mode: FollowMode::RoadFollow,
            last_frame_time: None,
            last_steer_time: None,
            needs_prime: false,
            last_dems: MotorDems::STOP,
            telemetry: Telemetry::default()
        }
    }

    /// Returns true if the frame has not been processed yet.
    pub fn is_new_frame(&self, frame: &Frame) -> bool {
        frame.is_newer_than(self.last_frame_time)
    }

    /// Mark a frame as seen without processing it, so a frame the vision models failed on is
    /// not retried.
    pub fn skip_frame(&mut self, frame: &Frame) {
        if self.is_new_frame(frame) {
            self.last_frame_time = Some(frame.timestamp);
        }
    }

    /// True if running in fleet mode (object following enabled).
    pub fn is_fleet(&self) -> bool {
        self.follow_arb.is_some()
    }

    /// The latest telemetry snapshot.
    pub fn telemetry(&self) -> &Telemetry {
        &self.telemetry
    }

    /// Time step for the next steering update.
    fn steer_dt_s(&self, timestamp: DateTime<Utc>) -> f64 {
        self.last_steer_time
            .and_then(|t| seconds_between(t, timestamp))
            .unwrap_or(self.params.nominal_dt_s)
    }

    /// Arbitrate between road and object following. Without an arbiter the road is followed.
    fn arbitrate(&mut self, input: &CycleInput) -> ArbResult {
        match (self.follow_arb.as_mut(), input.detections.as_ref()) {
            (Some(arb), Some(dets)) => arb.arbitrate(
                dets,
                input.config.tracked_label,
                &input.estimate,
                input.blocked,
                input.config.confidence_threshold
            ),
            _ => ArbResult {
                mode: FollowMode::RoadFollow,
                target_x: input.estimate.x,
                target_y: input.estimate.y,
                mean_view: 0.0,
                blocked: input.blocked,
                confidence: input.estimate.confidence,
                label: None,
                reused: false
            }
        }
    }

    fn label_text(&self, arb: &ArbResult) -> String {
        match (arb.label, self.follow_arb.as_ref()) {
            (Some(l), Some(fa)) => fa
                .label_name(l)
                .map(String::from)
                .unwrap_or_else(|| format!("label {}", l)),
            _ => ROAD_LABEL_TEXT.to_string()
        }
    }
}

impl State for CruiseCore {
    type InputData = CycleInput;
    type OutputData = CycleOutput;
    type StatusReport = CycleReport;
    type ProcError = CruiseError;

    /// Process one frame.
    ///
    /// Returns `CruiseError::StaleFrame` if the frame is not newer than the last one processed,
    /// in which case nothing is updated.
    fn proc(&mut self, input: &CycleInput)
        -> Result<(CycleOutput, CycleReport), CruiseError>
    {
        if let Some(t) = self.last_frame_time {
            if input.timestamp <= t {
                return Err(CruiseError::StaleFrame)
            }
        }
        self.last_frame_time = Some(input.timestamp);

        let cfg = input.config.as_ref();
        let mut report = CycleReport::default();

        let arb = self.arbitrate(input);

        // A change of objective restarts the steering time base. On returning to the road the
        // controller is primed with the first road target it acts on, so the derivative does not
        // see a jump.
        if arb.mode != self.prev_mode {
            debug!("Follow mode changed from {:?} to {:?}", self.prev_mode, arb.mode);
            report.mode_changed = true;
            self.prev_mode = arb.mode;
            self.last_steer_time = None;
            self.needs_prime = arb.mode == FollowMode::RoadFollow;
        }

        // Observable values refreshed on every processed frame
        self.telemetry.cycle += 1;
        self.telemetry.timestamp = Some(input.timestamp);
        self.telemetry.mode = arb.mode;
        self.telemetry.label_text = self.label_text(&arb);
        self.telemetry.blocked = arb.blocked;
        self.telemetry.mean_view = arb.mean_view;

        let blocked_stop = self.params.blocked_stop_threshold
            .map(|t| arb.blocked >= t)
            .unwrap_or(false);

        let dems = if blocked_stop {
            report.blocked_stop = true;
            self.telemetry.steering = 0.0;
            self.telemetry.speed = 0.0;
            MotorDems::STOP
        }
        else if !(arb.confidence >= cfg.confidence_threshold) {
            report.held = true;
            self.last_dems
        }
        else {
            let steering = match arb.mode {
                FollowMode::RoadFollow => {
                    let dt_s = self.steer_dt_s(input.timestamp);
                    report.steer_dt_s = Some(dt_s);
                    self.last_steer_time = Some(input.timestamp);

                    if self.needs_prime {
                        self.steer_ctrl.prime(arb.target_x);
                        self.needs_prime = false;
                    }

                    self.steer_ctrl.set_gains(SteerGains::from(cfg));
                    self.steer_ctrl.compute(arb.target_x, dt_s)
                },
                FollowMode::ObjectFollow => saturate(cfg.turn_gain * arb.target_x, 1.0)
            };

            // While following the road the target is always at its nominal view
            let view_fraction = match arb.mode {
                FollowMode::RoadFollow => cfg.target_view,
                FollowMode::ObjectFollow => arb.mean_view
            };
            let speed = SpeedPolicy::from(cfg).compute(arb.confidence, view_fraction);

            self.telemetry.x = arb.target_x;
            self.telemetry.y = arb.target_y;
            self.telemetry.steering = steering;
            self.telemetry.speed = speed;

            MotorDems::from_speed_steering(speed, steering)
        };

        self.last_dems = dems;
        self.telemetry.left = dems.left;
        self.telemetry.right = dems.right;
        self.telemetry.held = report.held;

        trace!("CruiseCore: {:?} -> {:?}", arb, dems);

        Ok((
            CycleOutput {
                dems,
                telemetry: self.telemetry.clone()
            },
            report
        ))
    }

    /// Reset the controllers for a new run.
    ///
    /// The last processed frame time is kept so that a frame seen before the reset is not
    /// acted on again.
    fn reset(&mut self) {
        self.steer_ctrl.reset();
        if let Some(arb) = self.follow_arb.as_mut() {
            arb.reset();
        }
        self.prev_mode = FollowMode::RoadFollow;
        self.last_steer_time = None;
        self.needs_prime = false;
        self.last_dems = MotorDems::STOP;
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use chrono::Duration;
    use comms_if::eqpt::BBox;

    fn config() -> Arc<CruiseConfig> {
        Arc::new(CruiseConfig {
            speed_gain: 0.3,
            steering_gain: 0.08,
            steering_dgain: 0.82,
            steering_bias: -0.01,
            speed_dev: 1.0,
            turn_gain: 0.5,
            target_view: 0.3,
            confidence_threshold: 0.3,
            tracked_label: Some(1)
        })
    }

    fn params() -> Params {
        let mut p = Params::default();
        p.nominal_dt_s = 0.1;
        p.follow.labels = vec!["background".into(), "person".into()];
        p
    }

    struct Feed {
        t0: DateTime<Utc>,
        n: i64
    }

    impl Feed {
        fn new() -> Self {
            Self { t0: Utc::now(), n: 0 }
        }

        /// Input for the next frame, 100 ms after the previous one
        fn next(
            &mut self,
            x: f64,
            confidence: f64,
            detections: Option<Vec<Detection>>,
            config: &Arc<CruiseConfig>
        ) -> CycleInput {
            let timestamp = self.t0 + Duration::milliseconds(100 * self.n);
            self.n += 1;
            CycleInput {
                timestamp,
                estimate: TargetEstimate::new(x, 0.5, confidence, timestamp),
                detections,
                blocked: 0.0,
                config: config.clone()
            }
        }
    }

    #[test]
    fn test_road_follow_steering() {
        let cfg = config();
        let mut core = CruiseCore::new(params(), &cfg, false);
        let mut feed = Feed::new();

        let (out, report) = core.proc(&feed.next(0.5, 0.9, None, &cfg)).unwrap();
        assert_eq!(report.steer_dt_s, Some(0.1));
        assert_eq!(out.telemetry.steering, 1.0);
        assert_eq!(out.telemetry.speed, 0.3);
        assert_eq!(out.dems, MotorDems { left: 1.0, right: -0.7 });

        for _ in 0..4 {
            let (out, report) = core.proc(&feed.next(0.5, 0.9, None, &cfg)).unwrap();
            assert!((report.steer_dt_s.unwrap() - 0.1).abs() < 1e-9);
            assert!((out.telemetry.steering - 0.03).abs() < 1e-9);
        }
    }

    #[test]
    fn test_low_confidence_holds_demands() {
        let cfg = config();
        let mut core = CruiseCore::new(params(), &cfg, false);
        let mut feed = Feed::new();

        let (first, _) = core.proc(&feed.next(0.2, 0.9, None, &cfg)).unwrap();

        for _ in 0..10 {
            let (out, report) = core.proc(&feed.next(0.0, 0.1, None, &cfg)).unwrap();
            assert!(report.held);
            assert_eq!(out.dems, first.dems);
            assert_eq!(out.telemetry.x, first.telemetry.x);
            assert_eq!(out.telemetry.steering, first.telemetry.steering);
        }

        // The controller was not updated while held
        assert_eq!(core.steer_ctrl.prev_error(), 0.2);
    }

    #[test]
    fn test_stale_frame_rejected() {
        let cfg = config();
        let mut core = CruiseCore::new(params(), &cfg, false);
        let mut feed = Feed::new();

        let input = feed.next(0.2, 0.9, None, &cfg);
        let (out, _) = core.proc(&input).unwrap();

        assert!(matches!(core.proc(&input), Err(CruiseError::StaleFrame)));
        assert_eq!(core.telemetry(), &out.telemetry);
    }

    #[test]
    fn test_object_follow_in_fleet_mode() {
        let cfg = config();
        let mut core = CruiseCore::new(params(), &cfg, true);
        let mut feed = Feed::new();

        // Object right of centre at the desired view
        let bbox = BBox::new(0.55, 0.2, 0.95, 0.95);
        let dets = vec![Detection::new(1, 0.8, bbox)];
        let (out, report) = core.proc(&feed.next(-0.5, 0.9, Some(dets), &cfg)).unwrap();

        assert!(report.mode_changed);
        assert_eq!(out.telemetry.mode, FollowMode::ObjectFollow);
        assert_eq!(out.telemetry.label_text, "person");
        assert!((out.telemetry.x - 0.5).abs() < 1e-9);
        assert!((out.telemetry.steering - 0.25).abs() < 1e-9);
        assert!((out.telemetry.mean_view - 0.3).abs() < 1e-9);
        assert!((out.telemetry.speed - 0.3).abs() < 1e-9);

        // Three misses fall back to the road
        let mut modes = vec![];
        for _ in 0..3 {
            let (out, _) = core.proc(&feed.next(-0.5, 0.9, Some(vec![]), &cfg)).unwrap();
            modes.push(out.telemetry.mode);
        }
        assert_eq!(modes, vec![
            FollowMode::ObjectFollow,
            FollowMode::ObjectFollow,
            FollowMode::RoadFollow
        ]);
        assert_eq!(core.telemetry().label_text, ROAD_LABEL_TEXT);
    }

    #[test]
    fn test_held_road_fallback_leaves_controller() {
        let cfg = config();
        let mut core = CruiseCore::new(params(), &cfg, true);
        let mut feed = Feed::new();

        core.proc(&feed.next(0.5, 0.9, Some(vec![]), &cfg)).unwrap();
        assert_eq!(core.steer_ctrl.prev_error(), 0.5);

        let hit = vec![Detection::new(1, 0.8, BBox::new(0.55, 0.2, 0.95, 0.95))];
        core.proc(&feed.next(0.5, 0.9, Some(hit), &cfg)).unwrap();

        // The fallback to the road happens on a frame too uncertain to act on
        let mut last = None;
        for _ in 0..3 {
            last = Some(core.proc(&feed.next(0.0, 0.1, Some(vec![]), &cfg)).unwrap());
        }
        let (out, report) = last.unwrap();
        assert_eq!(out.telemetry.mode, FollowMode::RoadFollow);
        assert!(report.held);
        assert_eq!(core.steer_ctrl.prev_error(), 0.5);

        // The first confident road frame primes the controller, no derivative kick
        let (out, report) = core.proc(&feed.next(0.2, 0.9, Some(vec![]), &cfg)).unwrap();
        assert!(!report.held);
        assert!((out.telemetry.steering - (0.08 * 0.2 - 0.01)).abs() < 1e-9);
    }

    #[test]
    fn test_blocked_stop() {
        let cfg = config();
        let mut p = params();
        p.blocked_stop_threshold = Some(0.5);
        let mut core = CruiseCore::new(p, &cfg, true);
        let mut feed = Feed::new();

        core.proc(&feed.next(0.1, 0.9, Some(vec![]), &cfg)).unwrap();

        let mut input = feed.next(0.1, 0.9, Some(vec![]), &cfg);
        input.blocked = 0.7;
        let (out, report) = core.proc(&input).unwrap();

        assert!(report.blocked_stop);
        assert!(out.dems.is_stop());
        assert_eq!(out.telemetry.blocked, 0.7);
    }

    #[test]
    fn test_reset_restarts_controller() {
        let cfg = config();
        let mut core = CruiseCore::new(params(), &cfg, false);
        let mut feed = Feed::new();

        core.proc(&feed.next(0.5, 0.9, None, &cfg)).unwrap();
        core.proc(&feed.next(0.5, 0.9, None, &cfg)).unwrap();
        core.reset();

        // Same kick as the very first cycle
        let (out, report) = core.proc(&feed.next(0.5, 0.9, None, &cfg)).unwrap();
        assert_eq!(report.steer_dt_s, Some(0.1));
        assert_eq!(out.telemetry.steering, 1.0);

        // Held demands after a reset are the stop command
        core.reset();
        let (out, _) = core.proc(&feed.next(0.5, 0.1, None, &cfg)).unwrap();
        assert!(out.dems.is_stop());
    }
}
