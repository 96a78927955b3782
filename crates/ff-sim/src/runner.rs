//! Headless match loop
//!
//! Fixed-step frames: the autoplayer acts, the session ticks, the focus
//! director catches up on the signals of that frame.

use nalgebra::{Point3, Vector3};

use ff_line::{GameConfig, MatchState, Session};
use ff_signal::{SignalRecorder, SignalTrace};

use crate::autoplayer::{AutoPlayer, Policy};
use crate::focus::{FocusConfig, FocusDirector};

/// Camera offset from a lane's inspection point
fn focus_offset() -> Vector3<f32> {
    Vector3::new(0.0, 3.0, -2.0)
}

/// Run limits
#[derive(Debug, Clone)]
pub struct SimOptions {
    /// Stop after this many completed waves
    pub waves: u32,
    pub max_seconds: f32,
    pub fps: u32,
    pub policy: Policy,
}

impl Default for SimOptions {
    fn default() -> Self {
        Self {
            waves: 3,
            max_seconds: 300.0,
            fps: 60,
            policy: Policy::Perfect,
        }
    }
}

/// Everything a finished run produced
#[derive(Debug)]
pub struct SimReport {
    pub seed: u64,
    pub frames: u64,
    pub seconds: f32,
    pub waves_completed: u32,
    pub final_state: MatchState,
    pub player_actions: u32,
    pub focus_moves: u32,
    pub focus_preempted: u32,
    pub trace: SignalTrace,
}

/// Play one match to its end or to the run limits
pub fn run(mut config: GameConfig, options: &SimOptions) -> SimReport {
    let seed = *config.seed.get_or_insert_with(rand::random);
    let dt = 1.0 / options.fps.max(1) as f32;

    let director_config = FocusConfig::new(
        Point3::new(0.0, 6.0, -8.0),
        config
            .lanes
            .layouts
            .iter()
            .filter_map(|layout| layout.inspection)
            .map(|point| point + focus_offset())
            .collect(),
    );
    let mut director = FocusDirector::new(director_config, config.lanes.layouts.len());

    let name = config.name.clone();
    let mut session = Session::new(config);
    let mut player = AutoPlayer::new(options.policy, seed);

    let trace_recorder = SignalRecorder::without_timer_updates();
    trace_recorder.attach(session.bus_mut());
    let director_feed = SignalRecorder::without_timer_updates();
    let feed_id = director_feed.attach(session.bus_mut());

    log::info!(
        "Running '{name}' with seed {seed}, policy {}, {} fps",
        options.policy.name(),
        options.fps
    );
    session.start();

    let mut frames = 0u64;
    let mut seconds = 0.0f32;
    let mut waves_completed = 0u32;
    while seconds < options.max_seconds {
        let input = player.step(&mut session, dt);
        session.tick(dt, input);
        frames += 1;
        seconds += dt;

        for event in director_feed.drain() {
            if event.type_name() == "wave_completed" {
                waves_completed += 1;
            }
            director.handle(&event.signal);
        }
        director.tick(dt);

        if session.state().is_game_over() {
            break;
        }
        if waves_completed >= options.waves {
            break;
        }
    }
    session.bus_mut().unsubscribe(feed_id);
    if director.is_enabled() {
        log::debug!(
            "Focus ended on {:?} at {:?}, in flight: {:?}",
            director.target(),
            director.position(),
            director.moving_to()
        );
    }

    let trace = SignalTrace::from_events(format!("sim-{seed}"), trace_recorder.drain())
        .with_session(name)
        .with_metadata("seed", serde_json::json!(seed))
        .with_metadata("policy", serde_json::json!(options.policy.name()))
        .with_metadata("fps", serde_json::json!(options.fps));

    SimReport {
        seed,
        frames,
        seconds,
        waves_completed,
        final_state: session.state().clone(),
        player_actions: player.actions(),
        focus_moves: director.moves_started(),
        focus_preempted: director.moves_preempted(),
        trace,
    }
}
