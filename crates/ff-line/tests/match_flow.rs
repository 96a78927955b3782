//! End-to-end match scenarios driven through `Session`

use approx::assert_relative_eq;

use ff_core::{ActionRejected, DefectId, LaneId, ProductId};
use ff_line::{
    FORCED_FAIL_REASON, GameConfig, InspectionInput, LaneLayout, MatchPhase, ResolutionOutcome,
    SelectOutcome, Session,
};
use ff_signal::{GameOverReason, Signal, SignalRecorder};

const DT: f32 = 1.0 / 60.0;

// ═══════════════════════════════════════════════════════════════════════════════
// HELPERS
// ═══════════════════════════════════════════════════════════════════════════════

/// `lanes` straight conveyors, every unit defective or every unit fixable
fn config(lanes: usize, defective: bool) -> GameConfig {
    let chance = if defective { 1.0 } else { 0.0 };
    let mut config = GameConfig::seeded(1234).with_layouts(
        (0..lanes)
            .map(|i| LaneLayout::straight(i as f32 * 2.5, 2.0))
            .collect(),
    );
    config.waves.defect_chance_base = chance;
    config.waves.defect_chance_step = 0.0;
    config
}

fn start(config: GameConfig) -> (Session, SignalRecorder) {
    let mut session = Session::new(config);
    let recorder = SignalRecorder::without_timer_updates();
    recorder.attach(session.bus_mut());
    session.start();
    (session, recorder)
}

/// Tick idle until `cond` holds; false if `max_s` ran out first
fn tick_until(session: &mut Session, max_s: f32, mut cond: impl FnMut(&Session) -> bool) -> bool {
    let mut t = 0.0;
    while t < max_s {
        if cond(session) {
            return true;
        }
        session.tick(DT, InspectionInput::idle());
        t += DT;
    }
    cond(session)
}

fn tick_for(session: &mut Session, seconds: f32) {
    tick_until(session, seconds, |_| false);
}

fn all_arrived(session: &Session) -> bool {
    session
        .orchestrator()
        .lanes()
        .iter()
        .filter(|lane| lane.is_occupied())
        .all(|lane| lane.awaits_decision())
}

fn product_on(session: &Session, lane: usize) -> ProductId {
    session.orchestrator().lanes()[lane]
        .product()
        .map(|p| p.id)
        .expect("lane is occupied")
}

fn defects_of(session: &Session, product: ProductId) -> Vec<DefectId> {
    session
        .orchestrator()
        .find_product(product)
        .map(|(_, p)| p.active_defects.iter().copied().collect())
        .expect("product exists")
}

fn mistakes(recorder: &SignalRecorder) -> Vec<(u32, String)> {
    recorder
        .signals()
        .into_iter()
        .filter_map(|s| match s {
            Signal::MistakeMade { damage, reason, .. } => Some((damage, reason)),
            _ => None,
        })
        .collect()
}

// ═══════════════════════════════════════════════════════════════════════════════
// HEALTH / GAME OVER
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_two_weighted_mistakes_end_the_game() {
    let mut config = config(2, false);
    config.rules.wrong_fix_damage = 2;
    let (mut session, recorder) = start(config);
    assert!(tick_until(&mut session, 3.0, all_arrived));

    let a = product_on(&session, 0);
    let b = product_on(&session, 1);

    // One missing defect at weight 2
    let mut chosen = defects_of(&session, a);
    chosen.pop();
    let first = session.fix(a, &chosen).unwrap();
    assert_eq!(
        first.outcome,
        ResolutionOutcome::Mistake {
            damage: 2,
            reason: "Missing 1 Fixes.".into()
        }
    );
    assert_eq!(session.state().health, 1);
    assert!(!session.state().is_game_over());

    // One extra defect on top of a correct set
    let mut chosen = defects_of(&session, b);
    chosen.push(DefectId::new(999));
    let second = session.fix(b, &chosen).unwrap();
    assert_eq!(
        second.outcome,
        ResolutionOutcome::GameOver(GameOverReason::TooManyMistakes)
    );
    assert_eq!(session.state().health, 0);
    assert_eq!(
        session.state().phase,
        MatchPhase::GameOver(GameOverReason::TooManyMistakes)
    );
    assert_eq!(recorder.count("game_over"), 1);
    // The last resolution left no lane pending, but a lost match never completes its wave
    assert_eq!(recorder.count("wave_completed"), 0);
    assert!(session.orchestrator().lanes().iter().all(|l| l.speed() == 0.0));

    tick_for(&mut session, 3.0);
    assert_eq!(recorder.count("wave_started"), 1);
}

#[test]
fn test_fixing_a_defective_unit_is_fatal() {
    let (mut session, recorder) = start(config(1, true));
    assert!(tick_until(&mut session, 3.0, all_arrived));
    let product = product_on(&session, 0);

    let resolution = session.fix(product, &[]).unwrap();
    assert_eq!(
        resolution.outcome,
        ResolutionOutcome::GameOver(GameOverReason::FixedDefectiveUnit)
    );
    assert_eq!(recorder.count("product_resolved"), 1);
    assert_eq!(
        session.reject(product),
        Err(ActionRejected::WaveInactive)
    );
}

#[test]
fn test_reject_rules() {
    let (mut session, recorder) = start(config(1, true));
    assert!(tick_until(&mut session, 3.0, all_arrived));
    let product = product_on(&session, 0);
    let resolution = session.reject(product).unwrap();
    assert_eq!(resolution.outcome, ResolutionOutcome::Success);
    assert_eq!(recorder.count("product_success"), 1);

    let (mut session, _) = start(config(1, false));
    assert!(tick_until(&mut session, 3.0, all_arrived));
    let product = product_on(&session, 0);
    let resolution = session.reject(product).unwrap();
    assert_eq!(
        resolution.outcome,
        ResolutionOutcome::GameOver(GameOverReason::RejectedValidUnit)
    );
}

#[test]
fn test_wave_timer_runs_out() {
    let (mut session, recorder) = start(config(1, false));
    assert_relative_eq!(session.state().wave_time_remaining, 29.0);
    tick_for(&mut session, 30.0);
    assert_eq!(
        session.state().game_over_reason(),
        Some(GameOverReason::TimeExpired)
    );
    assert_eq!(recorder.count("game_over"), 1);
}

#[test]
fn test_restart_after_game_over() {
    let (mut session, recorder) = start(config(2, false));
    tick_for(&mut session, 30.0);
    assert!(session.state().is_game_over());

    session.restart();
    let state = session.state();
    assert_eq!(state.wave, 1);
    assert_eq!(state.health, 3);
    assert_eq!(state.score, 0);
    assert!(state.wave_active());
    assert_eq!(recorder.count("wave_started"), 2);
    assert!(session.orchestrator().lanes().iter().all(|l| l.is_occupied()));
}

// ═══════════════════════════════════════════════════════════════════════════════
// WAVES
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_wave_completion_and_next_wave() {
    let (mut session, recorder) = start(config(2, false));
    assert!(tick_until(&mut session, 3.0, all_arrived));

    let a = product_on(&session, 0);
    let mut wrong = defects_of(&session, a);
    wrong.pop();
    session.fix(a, &wrong).unwrap();
    assert_eq!(session.state().health, 2);

    let b = product_on(&session, 1);
    let chosen = defects_of(&session, b);
    session.fix(b, &chosen).unwrap();

    // Bonus once, health back to max
    assert_eq!(session.state().phase, MatchPhase::WaveEnding);
    assert_eq!(session.state().score, 100 + 500);
    assert_eq!(session.state().health, 3);
    assert_eq!(recorder.count("wave_completed"), 1);

    // Actions between waves are rejected
    assert_eq!(session.reject(b), Err(ActionRejected::WaveInactive));

    tick_for(&mut session, 1.6);
    let state = session.state();
    assert_eq!(state.wave, 2);
    assert!(state.wave_active());
    assert_relative_eq!(state.wave_time_total, 28.0);
    assert_eq!(recorder.count("wave_started"), 2);
    assert_eq!(recorder.count("product_spawned"), 4);
    assert_eq!(recorder.count("wave_completed"), 1);
}

#[test]
fn test_failing_lane_does_not_block_siblings() {
    let mut config = config(3, false);
    config.lanes.layouts[1].spawn = None;
    let (mut session, recorder) = start(config);

    assert_eq!(recorder.count("product_spawned"), 2);
    assert_eq!(recorder.count("wave_started"), 1);
    assert!(!session.orchestrator().lanes()[1].is_enabled());

    assert!(tick_until(&mut session, 3.0, all_arrived));
    for lane in [0, 2] {
        let product = product_on(&session, lane);
        let chosen = defects_of(&session, product);
        session.fix(product, &chosen).unwrap();
    }
    assert_eq!(recorder.count("wave_completed"), 1);
}

#[test]
fn test_empty_catalog_starts_empty_wave() {
    let mut config = config(2, false);
    config.catalog.products.clear();
    let (session, recorder) = start(config);
    assert!(session.state().wave_active());
    assert_eq!(recorder.count("wave_started"), 1);
    assert_eq!(recorder.count("product_spawned"), 0);
}

// ═══════════════════════════════════════════════════════════════════════════════
// INSPECTION
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_qte_reward_applied_exactly_once() {
    let (mut session, recorder) = start(config(1, false));
    assert!(tick_until(&mut session, 3.0, all_arrived));
    let product = product_on(&session, 0);
    assert_eq!(session.inspection().awaiting(), Some(product));

    assert_eq!(session.select(product), Ok(SelectOutcome::RotationStarted));
    assert_eq!(recorder.count("product_selected"), 1);

    // 4.5s in the sweet spot, then swing out for the rest of the window
    let dt = 0.05;
    for _ in 0..90 {
        session.tick(dt, InspectionInput::drag(0.0));
    }
    session.tick(dt, InspectionInput::drag(-30.0));
    let mut guard = 0;
    while session.inspection().is_rotating() && guard < 200 {
        session.tick(dt, InspectionInput::drag(0.0));
        guard += 1;
    }

    assert_relative_eq!(session.inspection().success_ratio(), 0.9, epsilon = 0.02);
    assert_eq!(recorder.count("inspection_rewarded"), 1);
    assert_eq!(recorder.count("product_ready_for_fix"), 1);
    assert_eq!(session.state().score, 50);

    let (_, p) = session.orchestrator().find_product(product).unwrap();
    assert!(p.inspection_complete);
    assert_relative_eq!(p.damage_timer.max, 15.0);
    assert_relative_eq!(p.damage_timer.current, 15.0, epsilon = 0.1);

    tick_for(&mut session, 1.0);
    assert_eq!(recorder.count("inspection_rewarded"), 1);

    // Re-selecting the inspected product is a no-op
    assert_eq!(session.select(product), Ok(SelectOutcome::Unchanged));
}

#[test]
fn test_arrival_cancels_rotation_without_reward() {
    let mut config = config(2, false);
    config.lanes.layouts = vec![LaneLayout::straight(0.0, 1.0), LaneLayout::straight(2.5, 4.0)];
    let (mut session, recorder) = start(config);

    assert!(tick_until(&mut session, 2.0, |s| s.inspection().is_locked()));
    let first = product_on(&session, 0);
    session.select(first).unwrap();
    assert!(session.inspection().is_rotating());

    let second = product_on(&session, 1);
    assert!(tick_until(&mut session, 3.0, |s| s.inspection().awaiting() == Some(second)));
    assert!(!session.inspection().is_rotating());
    assert_eq!(session.selected(), None);
    assert_eq!(session.select(first), Err(ActionRejected::SelectionLocked));

    tick_for(&mut session, 6.0);
    assert_eq!(recorder.count("inspection_rewarded"), 0);
    assert_eq!(recorder.count("product_ready_for_fix"), 0);
    let (_, p) = session.orchestrator().find_product(first).unwrap();
    assert!(!p.inspection_complete);
}

#[test]
fn test_resolution_unlocks_selection() {
    let (mut session, _) = start(config(2, false));
    assert!(tick_until(&mut session, 3.0, all_arrived));
    let locked = session.inspection().awaiting().unwrap();
    session.select(locked).unwrap();

    let chosen = defects_of(&session, locked);
    session.submit_fix(&chosen).unwrap();
    assert!(!session.inspection().is_locked());
    assert!(!session.inspection().is_rotating());
    assert_eq!(session.selected(), None);
    assert_eq!(session.submit_reject(), Err(ActionRejected::NothingSelected));
}

// ═══════════════════════════════════════════════════════════════════════════════
// DAMAGE TIMER / TOOLS
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_expired_timer_forces_one_failure() {
    let (mut session, recorder) = start(config(1, false));
    assert!(tick_until(&mut session, 3.0, all_arrived));
    let product = product_on(&session, 0);
    session.select(product).unwrap();
    session.use_quickscan().unwrap();
    assert!(!session.inspection().is_rotating());

    assert!(tick_until(&mut session, 11.0, |_| recorder.count("mistake_made") > 0));
    assert_eq!(mistakes(&recorder), vec![(2, FORCED_FAIL_REASON.to_string())]);
    assert_eq!(recorder.count("product_resolved"), 1);

    // Single lane resolved, so the wave is over and health restored
    assert_eq!(recorder.count("wave_completed"), 1);
    assert_eq!(session.state().health, 3);

    tick_for(&mut session, 1.0);
    assert_eq!(recorder.count("mistake_made"), 1);
}

#[test]
fn test_damage_timer_waits_for_inspection() {
    let (mut session, recorder) = start(config(1, false));
    tick_for(&mut session, 15.0);
    let (_, p) = session
        .orchestrator()
        .find_product(product_on(&session, 0))
        .unwrap();
    assert_relative_eq!(p.damage_timer.current, 10.0);
    assert_eq!(recorder.count("mistake_made"), 0);
}

#[test]
fn test_freeze_halts_decay() {
    let (mut session, recorder) = start(config(1, false));
    assert!(tick_until(&mut session, 3.0, all_arrived));
    let product = product_on(&session, 0);
    session.select(product).unwrap();
    session.use_quickscan().unwrap();
    tick_for(&mut session, 1.0);
    session.use_freeze().unwrap();
    assert_eq!(session.use_freeze(), Err(ActionRejected::AlreadyFrozen));

    let before = session.orchestrator().find_product(product).unwrap().1.damage_timer.current;
    tick_for(&mut session, 15.0);
    let after = session.orchestrator().find_product(product).unwrap().1.damage_timer.current;
    assert_relative_eq!(before, after);
    assert_eq!(recorder.count("mistake_made"), 0);
    assert_eq!(session.state().freeze_charges, 2);
}

#[test]
fn test_quickscan_skips_reward() {
    let (mut session, recorder) = start(config(1, false));
    assert!(tick_until(&mut session, 3.0, all_arrived));
    let product = product_on(&session, 0);
    session.select(product).unwrap();
    for _ in 0..60 {
        session.tick(DT, InspectionInput::drag(0.0));
    }
    session.use_quickscan().unwrap();
    for _ in 0..300 {
        session.tick(DT, InspectionInput::drag(0.0));
    }
    assert_eq!(recorder.count("inspection_rewarded"), 0);
    assert_eq!(recorder.count("product_ready_for_fix"), 1);
    assert_eq!(session.use_quickscan(), Err(ActionRejected::AlreadyInspected));
}

#[test]
fn test_tool_charges_persist_across_waves() {
    let (mut session, _) = start(config(1, false));
    assert!(tick_until(&mut session, 3.0, all_arrived));
    let product = product_on(&session, 0);
    session.select(product).unwrap();
    session.use_quickscan().unwrap();
    session.use_freeze().unwrap();

    let chosen = defects_of(&session, product);
    session.submit_fix(&chosen).unwrap();
    tick_for(&mut session, 2.0);

    let state = session.state();
    assert_eq!(state.wave, 2);
    assert_eq!(state.quickscan_charges, 2);
    assert_eq!(state.freeze_charges, 2);

    session.restart();
    assert_eq!(session.state().quickscan_charges, 3);
    assert_eq!(session.state().freeze_charges, 3);
}

#[test]
fn test_no_charges_left() {
    let mut config = config(1, false);
    config.rules.freeze_charges = 0;
    let (mut session, _) = start(config);
    assert!(tick_until(&mut session, 3.0, all_arrived));
    session.select(product_on(&session, 0)).unwrap();
    assert_eq!(session.use_freeze(), Err(ActionRejected::NoCharges));
}

// ═══════════════════════════════════════════════════════════════════════════════
// DETERMINISM
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_same_seed_same_spawns() {
    let spawns = |seed: u64| {
        let mut config = GameConfig::seeded(seed);
        config.waves.defect_chance_base = 0.5;
        let (session, recorder) = start(config);
        let lanes: Vec<LaneId> = session.orchestrator().lanes().iter().map(|l| l.id()).collect();
        let products: Vec<_> = lanes
            .iter()
            .filter_map(|id| session.orchestrator().lane(*id).and_then(|l| l.product()))
            .map(|p| (p.type_id, p.is_defective, p.active_defects.clone()))
            .collect();
        (products, recorder.count("product_spawned"))
    };
    assert_eq!(spawns(77), spawns(77));
}
