//! Main cruise executable entry point.
//!
//! # Architecture
//!
//! The cruise loop runs on its own worker thread. The main thread:
//!
//!     - Initialises the session, logging and parameters
//!     - Builds the (simulated) equipment and the cruise loop
//!     - Main loop:
//!         - Telecommand processing, from a script or a fixed-duration run
//!         - Telemetry archiving and monitoring
//!     - Stops the loop, leaving the motors commanded to stop
//!
//! # Usage
//!
//! `cruise_exec [--fleet] [--duration-s <secs>] [script]`
//!
//! Parameters are read from `$CRUISE_SW_ROOT/params/cruise_exec.toml` and
//! `$CRUISE_SW_ROOT/params/cruise.toml`.

// ---------------------------------------------------------------------------
// USE MODULES FROM LIBRARY
// ---------------------------------------------------------------------------

use comms_if::tc::CruiseConfig;
use cruise_lib::{
    cruise_loop::{CruiseLoop, Equipment, RunState},
    params::ExecParams,
    sim::{LogMotorSink, SimCamera, SimEstimator}
};

mod tc_processor;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{eyre::WrapErr, Report};
use log::{info, warn};
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};
use structopt::StructOpt;

// Internal
use tc_processor::TcOutcome;
use util::{
    archive::Archiver,
    host,
    logger::{logger_init, LevelFilter},
    script_interpreter::{PendingTcs, ScriptInterpreter},
    session::Session
};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Target period of one main loop cycle.
const CYCLE_PERIOD_S: f64 = 0.02;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Command line options.
#[derive(Debug, StructOpt)]
#[structopt(name = "cruise_exec", about = "Vision-guided cruise control")]
struct Opt {
    /// Enable object following (fleet mode)
    #[structopt(long)]
    fleet: bool,

    /// How long to cruise for when no script is given
    #[structopt(short, long, default_value = "30")]
    duration_s: f64,

    /// Path to a TC script to execute instead of a fixed-duration run
    #[structopt(parse(from_os_str))]
    script: Option<PathBuf>
}

/// Where telecommands come from.
enum TcSource {
    /// Start immediately and stop after the given time
    Timed(Instant, Duration),

    Script(ScriptInterpreter)
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    color_eyre::install()?;

    let opt = Opt::from_args();

    // ---- EARLY INITIALISATION ----

    let session = Session::new(
        "cruise_exec",
        "sessions"
    ).wrap_err("Failed to create the session")?;

    logger_init(LevelFilter::Debug, &session)
        .wrap_err("Failed to initialise logging")?;

    info!("Cruise Executable\n");
    info!(
        "Software root: {:?}",
        host::get_sw_root().wrap_err("Failed to get the software root")?
    );
    info!("Session directory: {:?}", session.session_root);
    info!("Options: {:?}\n", opt);

    // ---- LOAD PARAMETERS ----

    let exec_params: ExecParams = util::params::load("cruise_exec.toml")
        .wrap_err("Could not load exec params")?;

    let cruise_config: CruiseConfig = util::params::load("cruise.toml")
        .wrap_err("Could not load the initial cruise config")?;

    info!("Exec parameters loaded");

    // ---- INITIALISE TC SOURCE ----

    let mut tc_source = match opt.script {
        Some(ref path) => {
            info!("Loading script from {:?}", path);

            let si = ScriptInterpreter::new(path).wrap_err("Failed to load script")?;

            info!(
                "Loaded script lasts {:.02} s and contains {} TCs\n",
                si.get_duration(),
                si.get_num_tcs()
            );

            TcSource::Script(si)
        },
        None => {
            info!("No script provided, cruising for {:.1} s\n", opt.duration_s);
            TcSource::Timed(Instant::now(), Duration::from_secs_f64(opt.duration_s.max(0.0)))
        }
    };

    // ---- INITIALISE CRUISE LOOP ----

    info!("Initialising the cruise loop...");

    let eqpt = Equipment {
        source: Box::new(SimCamera::new(&exec_params.sim)),
        estimator: Box::new(SimEstimator::new(exec_params.sim.clone())),
        sink: Box::new(LogMotorSink::new())
    };

    let cruise_loop = CruiseLoop::new(
        eqpt,
        exec_params.cruise_loop.clone(),
        cruise_config,
        opt.fleet
    ).wrap_err("Failed to initialise the cruise loop")?;

    let mut archiver = match exec_params.archive_telemetry {
        true => Some(
            Archiver::from_path(&session, "telemetry.csv")
                .wrap_err("Failed to create the telemetry archive")?
        ),
        false => None
    };

    if let TcSource::Timed(..) = tc_source {
        cruise_loop.start().wrap_err("Failed to start the cruise loop")?;
    }

    // ---- MAIN LOOP ----

    info!("Begining main loop\n");

    let mut last_cycle = 0;
    let mut failure_reported = false;

    loop {
        let cycle_start_instant = Instant::now();

        // ---- TELECOMMAND PROCESSING ----

        let outcome = match tc_source {
            TcSource::Timed(start, duration) => match start.elapsed() >= duration {
                true => {
                    info!("Run duration elapsed, stopping");
                    TcOutcome::Shutdown
                },
                false => TcOutcome::Continue
            },
            TcSource::Script(ref mut si) => match si.get_pending_tcs() {
                PendingTcs::None => TcOutcome::Continue,
                PendingTcs::Some(tcs) => tcs
                    .iter()
                    .map(|tc| tc_processor::exec(&cruise_loop, tc))
                    .fold(TcOutcome::Continue, |acc, o| match o {
                        TcOutcome::Shutdown => TcOutcome::Shutdown,
                        TcOutcome::Continue => acc
                    }),
                PendingTcs::EndOfScript => {
                    info!("End of TC script reached, stopping");
                    TcOutcome::Shutdown
                }
            }
        };

        if outcome == TcOutcome::Shutdown {
            break
        }

        // ---- TELEMETRY ----

        let tm = cruise_loop.telemetry();

        if tm.cycle != last_cycle {
            last_cycle = tm.cycle;

            if let Some(ref mut a) = archiver {
                if let Err(e) = a.serialise(&tm) {
                    warn!("Could not archive telemetry: {}", e);
                }
            }
        }

        match (cruise_loop.failure(), cruise_loop.run_state()) {
            (Some(reason), RunState::Idle) if !failure_reported => {
                warn!("Cruise loop stopped on a failure: {}", reason);
                failure_reported = true;
            },
            (None, _) => failure_reported = false,
            _ => ()
        }

        // ---- CYCLE MANAGEMENT ----

        let cycle_dur = Instant::now() - cycle_start_instant;

        match Duration::from_secs_f64(CYCLE_PERIOD_S).checked_sub(cycle_dur) {
            Some(d) => thread::sleep(d),
            None => warn!(
                "Main loop cycle overran by {:.06} s",
                cycle_dur.as_secs_f64() - CYCLE_PERIOD_S
            )
        }
    }

    // ---- SHUTDOWN ----

    cruise_loop.stop().wrap_err("Failed to stop the cruise loop")?;

    info!(
        "Final telemetry:\n{}",
        serde_json::to_string_pretty(&cruise_loop.telemetry())
            .wrap_err("Failed to serialise the final telemetry")?
    );

    if let Some(a) = archiver {
        info!("{} telemetry records archived", a.num_records());
    }

    info!("End of execution");

    Ok(())
}
