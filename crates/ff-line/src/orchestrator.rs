//! Match orchestrator — waves, health, score, tools and resolution rules
//!
//! ```text
//! NotStarted ─► WaveActive ─► WaveEnding ─► WaveActive (next) ─► …
//!                   │
//!                   └──────────────► GameOver (terminal until start_new_game)
//! ```
//!
//! Every public operation is total: an invalid request comes back as
//! `Err(ActionRejected)` with no state change. Rule violations that end
//! the match are state transitions, reported through [`ResolutionOutcome`]
//! and the `GameOver` signal.

use std::collections::BTreeSet;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use ff_core::{ActionRejected, DefectId, FfResult, LaneId, ProductId};
use ff_signal::{GameOverReason, Signal, SignalBus};

use crate::config::GameConfig;
use crate::factory::{PooledFactory, ProductFactory};
use crate::lane::{Lane, LaneTransition};
use crate::product::Product;
use crate::timing::TaskScheduler;

/// Reason text for a forced failure
pub const FORCED_FAIL_REASON: &str = "Product stability failed and exploded!";

// ═══════════════════════════════════════════════════════════════════════════════
// STATE
// ═══════════════════════════════════════════════════════════════════════════════

/// Match lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "phase", content = "reason", rename_all = "snake_case")]
pub enum MatchPhase {
    NotStarted,
    WaveActive,
    /// Wave cleared, next wave scheduled
    WaveEnding,
    GameOver(GameOverReason),
}

/// Orchestrator-owned match state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchState {
    pub health: u32,
    pub max_health: u32,
    pub score: u32,
    pub wave: u32,
    pub wave_time_remaining: f32,
    pub wave_time_total: f32,
    /// Reset per new game only, never per wave
    pub freeze_charges: u32,
    pub quickscan_charges: u32,
    pub phase: MatchPhase,
}

impl MatchState {
    fn new(config: &GameConfig) -> Self {
        Self {
            health: config.rules.max_health,
            max_health: config.rules.max_health,
            score: 0,
            wave: 0,
            wave_time_remaining: 0.0,
            wave_time_total: 0.0,
            freeze_charges: config.rules.freeze_charges,
            quickscan_charges: config.rules.quickscan_charges,
            phase: MatchPhase::NotStarted,
        }
    }

    pub fn wave_active(&self) -> bool {
        self.phase == MatchPhase::WaveActive
    }

    pub fn is_game_over(&self) -> bool {
        matches!(self.phase, MatchPhase::GameOver(_))
    }

    pub fn game_over_reason(&self) -> Option<GameOverReason> {
        match self.phase {
            MatchPhase::GameOver(reason) => Some(reason),
            _ => None,
        }
    }

    /// Remaining wave time, 0..1
    pub fn wave_time_normalized(&self) -> f32 {
        if self.wave_time_total > 0.0 {
            (self.wave_time_remaining / self.wave_time_total).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}

/// How a product decision ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionOutcome {
    /// Correct fix or correct reject
    Success,
    /// Health lost, match continues
    Mistake { damage: u32, reason: String },
    /// Decision ended the match
    GameOver(GameOverReason),
}

/// A resolved product
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub product: ProductId,
    pub lane: LaneId,
    pub outcome: ResolutionOutcome,
}

/// Delayed orchestrator work
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchTask {
    /// Clear lingering lanes and spawn the next wave
    NextWave,
}

// ═══════════════════════════════════════════════════════════════════════════════
// ORCHESTRATOR
// ═══════════════════════════════════════════════════════════════════════════════

/// Owns lanes, factory and match state
pub struct MatchOrchestrator {
    config: GameConfig,
    lanes: Vec<Lane>,
    factory: Box<dyn ProductFactory>,
    rng: StdRng,
    state: MatchState,
    scheduler: TaskScheduler<MatchTask>,
}

impl MatchOrchestrator {
    /// Build with the pooled factory
    pub fn new(config: GameConfig) -> Self {
        let factory = PooledFactory::new(config.catalog.clone(), config.products.clone());
        Self::with_factory(config, Box::new(factory))
    }

    /// Build with a custom product factory
    ///
    /// Config problems are logged and degrade the affected subsystem; they
    /// never prevent construction.
    pub fn with_factory(config: GameConfig, factory: Box<dyn ProductFactory>) -> Self {
        if let Err(e) = config.validate() {
            log::error!("Invalid match config '{}': {e}", config.name);
        }

        let lanes: Vec<Lane> = config
            .lanes
            .layouts
            .iter()
            .take(u8::MAX as usize)
            .enumerate()
            .map(|(i, layout)| Lane::new(LaneId::new(i as u8), layout, &config.lanes))
            .collect();

        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        Self {
            state: MatchState::new(&config),
            config,
            lanes,
            factory,
            rng,
            scheduler: TaskScheduler::new(),
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // LIFECYCLE
    // ═══════════════════════════════════════════════════════════════════════════

    /// Reset everything and begin wave 1
    pub fn start_new_game(&mut self, bus: &mut SignalBus) {
        self.scheduler.clear();
        for lane in &mut self.lanes {
            lane.clear_immediate(self.factory.as_mut());
        }
        self.state = MatchState::new(&self.config);

        log::info!("New game: {}", self.config.name);
        bus.emit(Signal::HealthUpdated {
            current: self.state.health,
            max: self.state.max_health,
        });
        bus.emit(Signal::ScoreUpdated { total: 0 });
        self.emit_charges(bus);
        self.start_next_wave(bus);
    }

    /// Advance the wave counter and spawn into every lane
    pub fn start_next_wave(&mut self, bus: &mut SignalBus) {
        let wave = self.state.wave + 1;
        let total = self.config.waves.wave_time(wave);
        self.state.wave = wave;
        self.state.wave_time_total = total;
        self.state.wave_time_remaining = total;
        self.state.phase = MatchPhase::WaveActive;

        let products = &self.config.catalog.products;
        if products.is_empty() {
            log::warn!("Wave {wave}: product pool is empty, nothing spawned");
        } else if !self.factory.is_ready() {
            log::warn!("Wave {wave}: product factory not ready, nothing spawned");
        } else {
            let speed = self.config.lanes.speed_for_wave(wave);
            let chance = self.config.waves.defect_chance(wave);
            for lane in &mut self.lanes {
                let type_id = products[self.rng.random_range(0..products.len())].id;
                let is_defective = self.rng.random::<f64>() < chance;
                match lane.spawn(self.factory.as_mut(), type_id, is_defective, speed, &mut self.rng) {
                    Ok(product) => bus.emit(Signal::ProductSpawned {
                        product,
                        lane: lane.id(),
                        defective: is_defective,
                    }),
                    Err(e) => log::warn!("Wave {wave}: {} left empty: {e}", lane.id()),
                }
            }
        }

        log::info!("Wave {wave} started ({total:.0}s)");
        bus.emit(Signal::WaveStarted { wave });
    }

    /// Terminal until `start_new_game`
    pub fn game_over(&mut self, reason: GameOverReason, bus: &mut SignalBus) {
        if self.state.is_game_over() {
            return;
        }
        self.state.phase = MatchPhase::GameOver(reason);
        self.scheduler.clear();
        for lane in &mut self.lanes {
            lane.stop();
        }
        log::info!(
            "Game over at wave {} with {} points: {reason}",
            self.state.wave,
            self.state.score
        );
        bus.emit(Signal::GameOver { reason });
    }

    /// Bonus, health restore, then the next wave after a delay
    pub fn end_wave(&mut self, bus: &mut SignalBus) {
        if !self.state.wave_active() {
            return;
        }
        self.state.phase = MatchPhase::WaveEnding;
        let bonus = self.config.rules.wave_complete_bonus;
        self.add_score(bonus, bus);
        self.state.health = self.state.max_health;
        bus.emit(Signal::HealthUpdated {
            current: self.state.health,
            max: self.state.max_health,
        });
        bus.emit(Signal::WaveCompleted {
            wave: self.state.wave,
            bonus,
        });
        log::info!("Wave {} complete", self.state.wave);
        self.scheduler
            .schedule(MatchTask::NextWave, self.config.rules.time_between_waves);
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // PER-TICK
    // ═══════════════════════════════════════════════════════════════════════════

    /// Step every lane; returns first arrivals at inspection
    pub fn advance_lanes(&mut self, dt: f32, bus: &mut SignalBus) -> Vec<(ProductId, LaneId)> {
        let mut arrivals = Vec::new();
        for lane in &mut self.lanes {
            match lane.advance(dt, self.factory.as_mut()) {
                Some(LaneTransition::Arrived(product)) => {
                    bus.emit(Signal::ProductArrivedAtInspection {
                        product,
                        lane: lane.id(),
                    });
                    arrivals.push((product, lane.id()));
                }
                Some(LaneTransition::Cleared(product)) => {
                    log::trace!("{product} left {}", lane.id());
                }
                None => {}
            }
        }
        arrivals
    }

    /// Run due tasks, then count the wave timer down
    pub fn tick_wave(&mut self, dt: f32, bus: &mut SignalBus) {
        for task in self.scheduler.advance(dt) {
            match task {
                MatchTask::NextWave => {
                    for lane in &mut self.lanes {
                        lane.clear_immediate(self.factory.as_mut());
                    }
                    self.start_next_wave(bus);
                }
            }
        }

        if !self.state.wave_active() {
            return;
        }
        self.state.wave_time_remaining -= dt;
        bus.emit(Signal::WaveTimerUpdated {
            normalized: self.state.wave_time_normalized(),
        });
        if self.state.wave_time_remaining <= 0.0 {
            self.state.wave_time_remaining = 0.0;
            self.game_over(GameOverReason::TimeExpired, bus);
        }
    }

    /// Decay damage timers; expired products are force-failed
    pub fn tick_damage_timers(&mut self, dt: f32, bus: &mut SignalBus) -> Vec<Resolution> {
        if !self.state.wave_active() {
            return Vec::new();
        }

        let mut expired = Vec::new();
        for lane in &mut self.lanes {
            if lane.is_exiting() {
                continue;
            }
            if let Some(product) = lane.product_mut() {
                if product.damage_timer_running() && product.damage_timer.tick(dt) {
                    expired.push(product.id);
                }
            }
        }

        expired
            .into_iter()
            .filter_map(|product| self.force_fail(product, bus).ok())
            .collect()
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // RESOLUTION
    // ═══════════════════════════════════════════════════════════════════════════

    /// Submit a fix; success iff `chosen` set-equals the active defects
    pub fn attempt_fix(
        &mut self,
        product: ProductId,
        chosen: &[DefectId],
        bus: &mut SignalBus,
    ) -> FfResult<Resolution> {
        let idx = self.resolvable(product)?;
        let lane = self.lanes[idx].id();
        let chosen: BTreeSet<DefectId> = chosen.iter().copied().collect();

        let (is_defective, verification) = {
            let p = self.product_at_mut(idx)?;
            p.frozen = false;
            (p.is_defective, p.verify_fixes(&chosen))
        };

        let outcome = if is_defective {
            self.game_over(GameOverReason::FixedDefectiveUnit, bus);
            ResolutionOutcome::GameOver(GameOverReason::FixedDefectiveUnit)
        } else if verification.is_success() {
            self.product_at_mut(idx)?.clear_defects();
            self.add_score(self.config.rules.fix_score, bus);
            bus.emit(Signal::ProductSuccess { product });
            ResolutionOutcome::Success
        } else {
            let damage = verification.mistake_count() * self.config.rules.wrong_fix_damage;
            let reason = verification.reason();
            self.apply_damage(damage as i64, product, &reason, bus);
            self.mistake_outcome(damage, reason)
        };

        self.complete_product_flow(idx, bus);
        Ok(Resolution {
            product,
            lane,
            outcome,
        })
    }

    /// Reject a product; only defective units may be rejected
    pub fn attempt_reject(&mut self, product: ProductId, bus: &mut SignalBus) -> FfResult<Resolution> {
        let idx = self.resolvable(product)?;
        let lane = self.lanes[idx].id();

        let is_defective = {
            let p = self.product_at_mut(idx)?;
            p.frozen = false;
            p.is_defective
        };

        let outcome = if is_defective {
            self.add_score(self.config.rules.fix_score, bus);
            bus.emit(Signal::ProductSuccess { product });
            ResolutionOutcome::Success
        } else {
            self.game_over(GameOverReason::RejectedValidUnit, bus);
            ResolutionOutcome::GameOver(GameOverReason::RejectedValidUnit)
        };

        self.complete_product_flow(idx, bus);
        Ok(Resolution {
            product,
            lane,
            outcome,
        })
    }

    /// Damage timer ran out: fixed-weight mistake, product leaves regardless
    pub fn force_fail(&mut self, product: ProductId, bus: &mut SignalBus) -> FfResult<Resolution> {
        let idx = self.resolvable(product)?;
        let lane = self.lanes[idx].id();
        let damage = self.config.rules.forced_fail_damage;

        log::debug!("{product} damage timer expired");
        self.apply_damage(damage as i64, product, FORCED_FAIL_REASON, bus);
        let outcome = self.mistake_outcome(damage, FORCED_FAIL_REASON.to_string());

        self.complete_product_flow(idx, bus);
        Ok(Resolution {
            product,
            lane,
            outcome,
        })
    }

    /// Subtract health; zero or negative amounts are ignored
    pub fn apply_damage(&mut self, amount: i64, product: ProductId, reason: &str, bus: &mut SignalBus) {
        if amount <= 0 {
            return;
        }
        let damage = u32::try_from(amount).unwrap_or(u32::MAX);
        self.state.health = self.state.health.saturating_sub(damage);
        bus.emit(Signal::HealthUpdated {
            current: self.state.health,
            max: self.state.max_health,
        });
        bus.emit(Signal::MistakeMade {
            product,
            reason: reason.to_string(),
            damage,
        });
        log::debug!("{product}: {reason} (-{damage}, health {})", self.state.health);

        if self.state.health == 0 {
            self.game_over(GameOverReason::TooManyMistakes, bus);
        }
    }

    pub fn add_score(&mut self, amount: u32, bus: &mut SignalBus) {
        self.state.score = self.state.score.saturating_add(amount);
        bus.emit(Signal::ScoreUpdated {
            total: self.state.score,
        });
    }

    /// Send the product out, announce it, and end the wave once every lane
    /// is clear or exiting
    fn complete_product_flow(&mut self, idx: usize, bus: &mut SignalBus) {
        let lane = &mut self.lanes[idx];
        let Some(product) = lane.product().map(|p| p.id) else {
            return;
        };
        lane.send_to_exit();
        if self.state.is_game_over() {
            lane.stop();
        }
        bus.emit(Signal::ProductResolved {
            product,
            lane: lane.id(),
        });

        if self.state.is_game_over() {
            return;
        }
        if self.lanes.iter().all(Lane::is_clear_or_exiting) {
            self.end_wave(bus);
        }
    }

    fn mistake_outcome(&self, damage: u32, reason: String) -> ResolutionOutcome {
        match self.state.game_over_reason() {
            Some(reason) => ResolutionOutcome::GameOver(reason),
            None => ResolutionOutcome::Mistake { damage, reason },
        }
    }

    /// Lane index of a product that can still be decided on
    fn resolvable(&self, product: ProductId) -> FfResult<usize> {
        if !self.state.wave_active() {
            return Err(ActionRejected::WaveInactive);
        }
        let idx = self.lane_index(product).ok_or(ActionRejected::UnknownProduct)?;
        if self.lanes[idx].is_exiting() {
            return Err(ActionRejected::AlreadyResolved);
        }
        Ok(idx)
    }

    fn product_at_mut(&mut self, idx: usize) -> FfResult<&mut Product> {
        self.lanes[idx]
            .product_mut()
            .ok_or(ActionRejected::UnknownProduct)
    }

    fn lane_index(&self, product: ProductId) -> Option<usize> {
        self.lanes.iter().position(|lane| lane.holds(product))
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // INSPECTION HOOKS
    // ═══════════════════════════════════════════════════════════════════════════

    /// QTE passed: stretch the damage timer and award the bonus
    pub fn reward_inspection(&mut self, product: ProductId, bus: &mut SignalBus) -> FfResult<()> {
        let idx = self.resolvable(product)?;
        let multiplier = self.config.inspection.reward_multiplier;
        let bonus = self.config.inspection.reward_score;
        self.product_at_mut(idx)?.apply_inspection_reward(multiplier);
        self.add_score(bonus, bus);
        bus.emit(Signal::InspectionRewarded { product, bonus });
        Ok(())
    }

    /// Mark the inspection gate passed and announce ready-for-fix
    pub fn complete_inspection(&mut self, product: ProductId, bus: &mut SignalBus) -> FfResult<LaneId> {
        let idx = self
            .lane_index(product)
            .ok_or(ActionRejected::UnknownProduct)?;
        let lane = self.lanes[idx].id();
        self.product_at_mut(idx)?.inspection_complete = true;
        bus.emit(Signal::ProductReadyForFix { product, lane });
        Ok(lane)
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // TOOLS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Halt a product's damage timer until it is resolved
    pub fn use_freeze(&mut self, product: ProductId, bus: &mut SignalBus) -> FfResult<()> {
        if self.state.freeze_charges == 0 {
            return Err(ActionRejected::NoCharges);
        }
        let idx = self.resolvable(product)?;
        let p = self.product_at_mut(idx)?;
        if p.frozen {
            return Err(ActionRejected::AlreadyFrozen);
        }
        p.frozen = true;
        self.state.freeze_charges -= 1;
        log::debug!("{product} frozen ({} left)", self.state.freeze_charges);
        self.emit_charges(bus);
        Ok(())
    }

    /// Skip the rotation QTE (no reward)
    pub fn use_quickscan(&mut self, product: ProductId, bus: &mut SignalBus) -> FfResult<LaneId> {
        if self.state.quickscan_charges == 0 {
            return Err(ActionRejected::NoCharges);
        }
        let idx = self.resolvable(product)?;
        let lane = self.lanes[idx].id();
        let p = self.product_at_mut(idx)?;
        if p.inspection_complete {
            return Err(ActionRejected::AlreadyInspected);
        }
        p.inspection_complete = true;
        bus.emit(Signal::ProductReadyForFix { product, lane });
        self.state.quickscan_charges -= 1;
        log::debug!("{product} quick-scanned ({} left)", self.state.quickscan_charges);
        self.emit_charges(bus);
        Ok(lane)
    }

    fn emit_charges(&self, bus: &mut SignalBus) {
        bus.emit(Signal::ToolChargesUpdated {
            freeze: self.state.freeze_charges,
            quickscan: self.state.quickscan_charges,
        });
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // QUERIES
    // ═══════════════════════════════════════════════════════════════════════════

    pub fn state(&self) -> &MatchState {
        &self.state
    }

    pub fn phase(&self) -> MatchPhase {
        self.state.phase
    }

    pub fn lanes(&self) -> &[Lane] {
        &self.lanes
    }

    pub fn lane(&self, id: LaneId) -> Option<&Lane> {
        self.lanes.get(id.index())
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    /// Product and the lane carrying it
    pub fn find_product(&self, product: ProductId) -> Option<(LaneId, &Product)> {
        self.lanes
            .iter()
            .find_map(|lane| lane.product().filter(|p| p.id == product).map(|p| (lane.id(), p)))
    }

    /// Products still waiting for a decision (not exiting)
    pub fn pending_products(&self) -> impl Iterator<Item = (LaneId, &Product)> {
        self.lanes
            .iter()
            .filter(|lane| !lane.is_exiting())
            .filter_map(|lane| lane.product().map(|p| (lane.id(), p)))
    }

    /// Presentation hint: damage timer in its critical band
    pub fn is_critical(&self, product: ProductId) -> bool {
        self.find_product(product)
            .is_some_and(|(_, p)| p.is_critical(self.config.products.critical_ratio))
    }

    /// Scheduled tasks not yet run
    pub fn pending_tasks(&self) -> usize {
        self.scheduler.pending()
    }
}

impl std::fmt::Debug for MatchOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MatchOrchestrator")
            .field("config", &self.config.name)
            .field("lanes", &self.lanes.len())
            .field("state", &self.state)
            .field("pending_tasks", &self.scheduler.pending())
            .finish()
    }
}
