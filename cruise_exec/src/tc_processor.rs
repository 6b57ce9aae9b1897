//! # Telecommand processor module
//!
//! The telecommand processor applies TCs from any source to the cruise loop.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, info, warn};

// Internal
use comms_if::tc::Tc;
use cruise_lib::cruise_loop::CruiseLoop;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// What the executable should do after a TC.
#[derive(Debug, Copy, Clone, PartialEq)]
pub(crate) enum TcOutcome {
    Continue,
    Shutdown
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Execute a telecommand.
///
/// Rejected TCs are reported and otherwise ignored, the loop keeps its previous state.
pub(crate) fn exec(cl: &CruiseLoop, tc: &Tc) -> TcOutcome {
    debug!("Executing TC: {:?}", tc);

    let result = match tc {
        Tc::Start => cl.start(),
        Tc::Stop => cl.stop(),
        Tc::SetConfig(cfg) => cl.set_config(cfg.clone()),
        Tc::Tune { name, value } => cl.tune(name, *value),
        Tc::Track { label } => {
            cl.set_tracked_label(*label);
            Ok(())
        },
        Tc::Shutdown => {
            info!("Shutdown requested");
            return TcOutcome::Shutdown
        }
    };

    if let Err(e) = result {
        warn!("Could not execute {:?}: {}", tc, e);
    }

    TcOutcome::Continue
}

#[cfg(test)]
mod test {
    use super::*;
    use comms_if::tc::CruiseConfig;
    use cruise_lib::{
        cruise_loop::{Equipment, Params, RunState},
        sim::{LogMotorSink, SimCamera, SimEstimator, SimParams}
    };

    fn sim_loop() -> CruiseLoop {
        let sim = SimParams::default();
        CruiseLoop::new(
            Equipment {
                source: Box::new(SimCamera::new(&sim)),
                estimator: Box::new(SimEstimator::new(sim)),
                sink: Box::new(LogMotorSink::new())
            },
            Params::default(),
            CruiseConfig::default(),
            true
        ).unwrap()
    }

    #[test]
    fn test_exec_tcs() {
        let cl = sim_loop();

        assert_eq!(exec(&cl, &Tc::Start), TcOutcome::Continue);
        assert_eq!(cl.run_state(), RunState::Running);

        exec(&cl, &Tc::Tune { name: "turn_gain".into(), value: 0.4 });
        assert_eq!(cl.config().turn_gain, 0.4);

        // Rejected, the previous value stays
        exec(&cl, &Tc::Tune { name: "turn_gain".into(), value: -0.4 });
        assert_eq!(cl.config().turn_gain, 0.4);

        exec(&cl, &Tc::Track { label: Some(1) });
        assert_eq!(cl.config().tracked_label, Some(1));

        exec(&cl, &Tc::Stop);
        assert_eq!(cl.run_state(), RunState::Idle);

        assert_eq!(exec(&cl, &Tc::Shutdown), TcOutcome::Shutdown);
    }
}
