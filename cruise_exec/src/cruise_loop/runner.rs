//! # Cruise loop runner
//!
//! Owns the equipment and the worker thread, and implements the lifecycle, configuration and
//! telemetry surfaces of the loop.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, error, info, trace, warn};
use std::{
    any::Any,
    panic::{self, AssertUnwindSafe},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex, MutexGuard, PoisonError, RwLock
    },
    thread::{self, JoinHandle},
    time::{Duration, Instant}
};

// Internal
use super::{CruiseCore, CruiseError, CycleInput, Params, RunState, Telemetry};
use crate::interfaces::{FrameSource, MotorSink, TargetEstimator};
use comms_if::{
    eqpt::{Frame, MotorDems},
    tc::{CruiseConfig, Tunable}
};
use util::module::State;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The equipment driven by the loop.
pub struct Equipment {
    pub source: Box<dyn FrameSource>,
    pub estimator: Box<dyn TargetEstimator>,
    pub sink: Box<dyn MotorSink>
}

/// The cruise loop.
///
/// All methods take `&self` and may be called from any thread. Dropping the loop stops it.
pub struct CruiseLoop {
    shared: Arc<Shared>,

    /// Handle to the worker of the current or last run. Holding this lock serialises `start`
    /// and `stop`.
    worker: Mutex<Option<JoinHandle<()>>>
}

/// Data shared between the loop's owner and its worker.
struct Shared {
    params: Params,

    state: Mutex<RunState>,

    /// Cleared by `stop` or a fatal error, checked under the sink lock before every write.
    armed: AtomicBool,

    config: RwLock<Arc<CruiseConfig>>,

    telemetry: RwLock<Telemetry>,

    /// Reason of the last fatal stop
    failure: Mutex<Option<String>>,

    sensing: Mutex<Sensing>,

    core: Mutex<CruiseCore>,

    sink: Mutex<Box<dyn MotorSink>>
}

struct Sensing {
    source: Box<dyn FrameSource>,
    estimator: Box<dyn TargetEstimator>
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl CruiseLoop {
    /// Create a new loop in the `Idle` state, commanding the motors to stop.
    ///
    /// `fleet` enables object following, in which case the estimator's detector and blocked
    /// scores are used each cycle.
    pub fn new(
        eqpt: Equipment,
        params: Params,
        config: CruiseConfig,
        fleet: bool
    ) -> Result<Self, CruiseError> {
        params.check().map_err(CruiseError::InvalidParams)?;
        config.validate()?;

        let core = CruiseCore::new(params.clone(), &config, fleet);

        let shared = Arc::new(Shared {
            params,
            state: Mutex::new(RunState::Idle),
            armed: AtomicBool::new(false),
            config: RwLock::new(Arc::new(config)),
            telemetry: RwLock::new(Telemetry::default()),
            failure: Mutex::new(None),
            sensing: Mutex::new(Sensing {
                source: eqpt.source,
                estimator: eqpt.estimator
            }),
            core: Mutex::new(core),
            sink: Mutex::new(eqpt.sink)
        });

        shared.drive_stop()?;

        info!("Cruise loop created (fleet mode: {})", fleet);

        Ok(Self {
            shared,
            worker: Mutex::new(None)
        })
    }

    /// Start driving.
    ///
    /// Resets the steering controller and the arbiter. Does nothing if already running.
    pub fn start(&self) -> Result<(), CruiseError> {
        let mut worker = lock(&self.worker);
        let mut state = lock(&self.shared.state);

        match *state {
            RunState::Running => {
                debug!("Cruise loop already running");
                return Ok(())
            },
            // Stopping is only ever set under the worker or state lock held here
            RunState::Idle | RunState::Stopping => ()
        }

        // The previous worker has exited, either after a stop or a fatal error
        if let Some(jh) = worker.take() {
            if jh.join().is_err() {
                warn!("Previous cruise loop worker panicked");
            }
        }

        lock(&self.shared.core).reset();
        *lock(&self.shared.failure) = None;
        self.shared.armed.store(true, Ordering::SeqCst);
        *state = RunState::Running;

        let shared = self.shared.clone();
        let jh = thread::Builder::new()
            .name("cruise_loop".into())
            .spawn(move || worker_thread(shared));

        match jh {
            Ok(jh) => *worker = Some(jh),
            Err(e) => {
                self.shared.armed.store(false, Ordering::SeqCst);
                *state = RunState::Idle;
                return Err(CruiseError::SpawnError(e))
            }
        }

        info!("Cruise loop started");

        Ok(())
    }

    /// Stop driving.
    ///
    /// Once this returns the motors have been commanded to stop and no other demand will be
    /// sent. Does nothing if already idle. The error is the failure to send the final stop
    /// command, the loop is idle in either case.
    pub fn stop(&self) -> Result<(), CruiseError> {
        let mut worker = lock(&self.worker);

        {
            let mut state = lock(&self.shared.state);
            if *state == RunState::Idle {
                return Ok(())
            }
            *state = RunState::Stopping;
            self.shared.armed.store(false, Ordering::SeqCst);
        }

        let res = self.shared.drive_stop();

        if let Some(jh) = worker.take() {
            if jh.thread().id() == thread::current().id() {
                // Called from the worker's own callbacks, it exits on its next check
                debug!("Cruise loop stopped from its worker");
            }
            else if jh.join().is_err() {
                warn!("Cruise loop worker panicked");
            }
        }

        *lock(&self.shared.state) = RunState::Idle;
        info!("Cruise loop stopped");

        res
    }

    /// Replace the whole configuration. An invalid configuration is rejected and the current
    /// one kept.
    pub fn set_config(&self, config: CruiseConfig) -> Result<(), CruiseError> {
        config.validate()?;

        *self.shared.config.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(config);
        info!("Cruise config replaced");

        Ok(())
    }

    /// Set a single tunable by name.
    pub fn tune(&self, name: &str, value: f64) -> Result<(), CruiseError> {
        let tunable: Tunable = name.parse()?;

        let mut cfg = self.shared.config.write().unwrap_or_else(PoisonError::into_inner);
        *cfg = Arc::new(cfg.with_tunable(tunable, value)?);
        info!("Tunable {} set to {}", tunable.name(), value);

        Ok(())
    }

    /// Select the label to follow in fleet mode, `None` to follow the road only.
    pub fn set_tracked_label(&self, label: Option<u32>) {
        let mut cfg = self.shared.config.write().unwrap_or_else(PoisonError::into_inner);
        let mut new_cfg = CruiseConfig::clone(&cfg);
        new_cfg.tracked_label = label;
        *cfg = Arc::new(new_cfg);
        info!("Tracked label set to {:?}", label);
    }

    /// The current configuration.
    pub fn config(&self) -> Arc<CruiseConfig> {
        self.shared.config()
    }

    /// The latest telemetry snapshot.
    pub fn telemetry(&self) -> Telemetry {
        self.shared.telemetry.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn run_state(&self) -> RunState {
        *lock(&self.shared.state)
    }

    /// Reason for the last fatal stop, cleared on `start`.
    pub fn failure(&self) -> Option<String> {
        lock(&self.shared.failure).clone()
    }
}

impl Drop for CruiseLoop {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            error!("Could not stop the cruise loop: {}", e);
        }
    }
}

impl Shared {
    fn config(&self) -> Arc<CruiseConfig> {
        self.config.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Send the stop command, regardless of the armed flag. A panicking sink is reported as an
    /// actuation failure.
    fn drive_stop(&self) -> Result<(), CruiseError> {
        let res = panic::catch_unwind(AssertUnwindSafe(|| {
            lock(&self.sink).drive(MotorDems::STOP)
        }));

        match res {
            Ok(r) => r.map_err(|e| CruiseError::Actuation(format!("{:#}", e))),
            Err(p) => Err(CruiseError::Actuation(panic_message(p.as_ref())))
        }
    }

    /// Execute one cycle.
    ///
    /// Only actuation failures are returned, sensing failures are logged and the cycle skipped.
    fn cycle(&self) -> Result<(), CruiseError> {
        let mut sensing = lock(&self.sensing);

        let frame = match sensing.source.latest_frame() {
            Ok(Some(f)) => f,
            Ok(None) => return Ok(()),
            Err(e) => {
                warn!("Could not get a frame: {:#}", e);
                return Ok(())
            }
        };

        let mut core = lock(&self.core);

        if !core.is_new_frame(&frame) {
            return Ok(())
        }

        let input = match sensing.sense(&frame, self.config(), core.is_fleet()) {
            Ok(i) => i,
            Err(e) => {
                warn!("Vision models failed on frame at {}: {:#}", frame.timestamp, e);
                core.skip_frame(&frame);
                return Ok(())
            }
        };
        drop(sensing);

        let (output, report) = match core.proc(&input) {
            Ok(o) => o,
            Err(CruiseError::StaleFrame) => return Ok(()),
            Err(e) => return Err(e)
        };

        if report.held {
            trace!("Estimate below confidence threshold, holding demands");
        }
        if report.blocked_stop {
            debug!("Path blocked ({:.2}), stopping", output.telemetry.blocked);
        }

        let mut sink = lock(&self.sink);

        if !self.armed.load(Ordering::SeqCst) {
            return Ok(())
        }

        sink.drive(output.dems)
            .map_err(|e| CruiseError::Actuation(format!("{:#}", e)))?;

        *self.telemetry.write().unwrap_or_else(PoisonError::into_inner) = output.telemetry;

        Ok(())
    }

    /// Stop the current run after an actuation failure or an equipment panic.
    fn fail(&self, err: CruiseError) {
        error!("Cruise loop stopping on failure: {}", err);

        let mut state = lock(&self.state);

        // A concurrent stop already owns the transition
        if *state != RunState::Running {
            return
        }

        *state = RunState::Stopping;
        self.armed.store(false, Ordering::SeqCst);
        *lock(&self.failure) = Some(err.to_string());

        if let Err(e) = self.drive_stop() {
            error!("Could not send the stop command: {}", e);
        }

        *state = RunState::Idle;
    }
}

impl Sensing {
    /// Run the vision models on a frame.
    fn sense(
        &mut self,
        frame: &Frame,
        config: Arc<CruiseConfig>,
        fleet: bool
    ) -> color_eyre::Result<CycleInput> {
        let estimate = self.estimator.estimate(frame)?;

        let (detections, blocked) = match fleet {
            true => (
                Some(self.estimator.detect(frame)?),
                self.estimator.blocked(frame)?
            ),
            false => (None, 0.0)
        };

        Ok(CycleInput {
            timestamp: frame.timestamp,
            estimate,
            detections,
            blocked,
            config
        })
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

fn lock<T: ?Sized>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Text of a panic payload.
fn panic_message(payload: &(dyn Any + Send)) -> String {
    match (payload.downcast_ref::<&str>(), payload.downcast_ref::<String>()) {
        (Some(s), _) => s.to_string(),
        (None, Some(s)) => s.clone(),
        (None, None) => "unknown panic".to_string()
    }
}

/// Worker thread, polls for frames until disarmed.
fn worker_thread(shared: Arc<Shared>) {
    let poll_period = Duration::from_secs_f64(shared.params.poll_period_s);
    let frame_period = Duration::from_secs_f64(shared.params.nominal_dt_s);

    while shared.armed.load(Ordering::SeqCst) {
        let cycle_start = Instant::now();

        // A panicking collaborator ends the run like an actuation failure
        let res = panic::catch_unwind(AssertUnwindSafe(|| shared.cycle()))
            .unwrap_or_else(|p| Err(CruiseError::EquipmentPanic(panic_message(p.as_ref()))));

        if let Err(e) = res {
            shared.fail(e);
            break
        }

        let cycle_dur = cycle_start.elapsed();

        if cycle_dur > frame_period {
            warn!(
                "Cycle overran: took {:.3} s, frames arrive every {:.3} s",
                cycle_dur.as_secs_f64(),
                frame_period.as_secs_f64()
            );
        }

        if let Some(remaining) = poll_period.checked_sub(cycle_dur) {
            thread::sleep(remaining);
        }
    }

    debug!("Cruise loop worker exiting");
}
