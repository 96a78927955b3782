//! Scripted players
//!
//! Drive a [`Session`] through its public player API only, the same calls
//! a UI would make. Every policy is deterministic for a given seed.

use clap::ValueEnum;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use ff_core::{DefectId, ProductId};
use ff_line::{Countdown, InspectionInput, Product, Session};

/// How the scripted player behaves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Policy {
    /// Holds every QTE, never misjudges a product
    #[default]
    Perfect,
    /// Shaky rotations, occasional wrong fixes, liberal tool use
    Sloppy,
    /// Never touches anything
    Idle,
}

impl Policy {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Perfect => "perfect",
            Self::Sloppy => "sloppy",
            Self::Idle => "idle",
        }
    }
}

/// Seconds between noticing something and acting on it
const THINK_TIME: f32 = 0.25;
/// Chance the sloppy player drops one defect from a fix
const SLOPPY_MISS_CHANCE: f64 = 0.25;
/// Chance the sloppy player quick-scans instead of rotating
const SLOPPY_SCAN_CHANCE: f64 = 0.3;
/// Drag noise per tick for the sloppy player (input units)
const SLOPPY_JITTER: f32 = 4.0;

/// Scripted player bound to one policy
#[derive(Debug)]
pub struct AutoPlayer {
    policy: Policy,
    rng: StdRng,
    think: Countdown,
    actions: u32,
}

impl AutoPlayer {
    pub fn new(policy: Policy, seed: u64) -> Self {
        Self {
            policy,
            rng: StdRng::seed_from_u64(seed),
            think: Countdown::new(THINK_TIME),
            actions: 0,
        }
    }

    /// Accepted player calls so far
    pub fn actions(&self) -> u32 {
        self.actions
    }

    /// Look at the session, maybe act, and return this tick's drag input
    pub fn step(&mut self, session: &mut Session, dt: f32) -> InspectionInput {
        if self.policy == Policy::Idle || !session.state().wave_active() {
            return InspectionInput::idle();
        }
        if session.inspection().is_rotating() {
            return self.rotation_input();
        }
        if !self.think.tick(dt) {
            return InspectionInput::idle();
        }
        self.think = Countdown::new(THINK_TIME);

        if let Some(product) = ready_product(session) {
            self.decide(session, &product);
        } else if let Some(product) = next_target(session) {
            self.pick(session, product);
        }
        InspectionInput::idle()
    }

    fn rotation_input(&mut self) -> InspectionInput {
        match self.policy {
            Policy::Sloppy => {
                InspectionInput::drag(self.rng.random_range(-SLOPPY_JITTER..SLOPPY_JITTER))
            }
            _ => InspectionInput::drag(0.0),
        }
    }

    /// Select a product and, for the sloppy player, sometimes skip the QTE
    fn pick(&mut self, session: &mut Session, product: ProductId) {
        if session.select(product).is_err() {
            return;
        }
        self.actions += 1;

        if self.policy == Policy::Sloppy
            && session.state().quickscan_charges > 0
            && self.rng.random_bool(SLOPPY_SCAN_CHANCE)
            && session.use_quickscan().is_ok()
        {
            self.actions += 1;
        }
    }

    /// Fix or reject the selected, inspected product
    fn decide(&mut self, session: &mut Session, product: &Product) {
        let critical_ratio = session.orchestrator().config().products.critical_ratio;
        if product.is_critical(critical_ratio) && !product.frozen && session.use_freeze().is_ok() {
            self.actions += 1;
        }

        let result = if product.is_defective {
            session.submit_reject()
        } else {
            let mut chosen: Vec<DefectId> = product.active_defects.iter().copied().collect();
            if self.policy == Policy::Sloppy && self.rng.random_bool(SLOPPY_MISS_CHANCE) {
                chosen.pop();
            }
            session.submit_fix(&chosen)
        };

        match result {
            Ok(resolution) => {
                self.actions += 1;
                log::debug!("{}: {:?}", resolution.product, resolution.outcome);
            }
            Err(e) => log::debug!("Autoplayer decision rejected: {e}"),
        }
    }
}

/// Selected product that passed inspection and still awaits a decision
fn ready_product(session: &Session) -> Option<Product> {
    let selected = session.selected()?;
    session
        .orchestrator()
        .pending_products()
        .find(|(_, p)| p.id == selected && p.inspection_complete)
        .map(|(_, p)| p.clone())
}

/// Locked product first, otherwise any product parked at inspection
fn next_target(session: &Session) -> Option<ProductId> {
    if let Some(waiting) = session.inspection().awaiting() {
        return Some(waiting);
    }
    session
        .orchestrator()
        .lanes()
        .iter()
        .filter(|lane| lane.awaits_decision())
        .find_map(|lane| lane.product().map(|p| p.id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ff_line::GameConfig;

    fn play(policy: Policy, seconds: f32) -> Session {
        let mut session = Session::new(GameConfig::seeded(21));
        let mut player = AutoPlayer::new(policy, 21);
        session.start();
        let dt = 1.0 / 60.0;
        let mut t = 0.0;
        while t < seconds && !session.state().is_game_over() {
            let input = player.step(&mut session, dt);
            session.tick(dt, input);
            t += dt;
        }
        session
    }

    #[test]
    fn test_perfect_player_clears_waves() {
        let session = play(Policy::Perfect, 60.0);
        let state = session.state();
        assert!(!state.is_game_over(), "lost: {:?}", state.phase);
        assert!(state.wave >= 2);
        assert_eq!(state.health, state.max_health);
        assert!(state.score >= 500);
    }

    #[test]
    fn test_idle_player_times_out() {
        let session = play(Policy::Idle, 40.0);
        assert_eq!(
            session.state().game_over_reason(),
            Some(ff_signal::GameOverReason::TimeExpired)
        );
    }

    #[test]
    fn test_sloppy_player_is_deterministic() {
        let a = play(Policy::Sloppy, 45.0);
        let b = play(Policy::Sloppy, 45.0);
        assert_eq!(a.state(), b.state());
    }
}
