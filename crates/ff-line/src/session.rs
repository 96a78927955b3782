//! Session — the services of one match wired together
//!
//! Owns the orchestrator, the inspection controller and the signal bus,
//! and routes the return values between them: arrivals lock selection,
//! resolutions unlock it, QTE results feed back into the orchestrator.
//!
//! ## Tick order
//!
//! 1. bus clock
//! 2. lanes (arrivals)
//! 3. wave timer and scheduled tasks
//! 4. product damage timers (forced failures)
//! 5. inspection QTE
//!
//! Player calls run synchronously between ticks.

use ff_core::{ActionRejected, DefectId, FfResult, ProductId};
use ff_signal::{Signal, SignalBus};

use crate::config::GameConfig;
use crate::factory::ProductFactory;
use crate::inspection::{InspectionController, InspectionEvent, InspectionInput, SelectOutcome};
use crate::orchestrator::{MatchOrchestrator, MatchState, Resolution};

/// One running match
#[derive(Debug)]
pub struct Session {
    orchestrator: MatchOrchestrator,
    inspection: InspectionController,
    bus: SignalBus,
}

impl Session {
    /// Wire the services; call [`Session::start`] once subscribers are attached
    pub fn new(config: GameConfig) -> Self {
        let inspection = InspectionController::new(config.inspection.clone());
        Self {
            orchestrator: MatchOrchestrator::new(config),
            inspection,
            bus: SignalBus::new(),
        }
    }

    pub fn with_factory(config: GameConfig, factory: Box<dyn ProductFactory>) -> Self {
        let inspection = InspectionController::new(config.inspection.clone());
        Self {
            orchestrator: MatchOrchestrator::with_factory(config, factory),
            inspection,
            bus: SignalBus::new(),
        }
    }

    /// Begin wave 1
    pub fn start(&mut self) {
        self.orchestrator.start_new_game(&mut self.bus);
    }

    /// Throw the current match away and start over
    pub fn restart(&mut self) {
        self.inspection.on_resolved();
        self.orchestrator.start_new_game(&mut self.bus);
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // FRAME
    // ═══════════════════════════════════════════════════════════════════════════

    /// Advance the whole match by `dt` seconds
    pub fn tick(&mut self, dt: f32, input: InspectionInput) {
        self.bus.advance_clock(dt);

        for (product, _) in self.orchestrator.advance_lanes(dt, &mut self.bus) {
            self.inspection.on_arrival(product);
        }

        let was_over = self.orchestrator.state().is_game_over();
        self.orchestrator.tick_wave(dt, &mut self.bus);

        let failures = self.orchestrator.tick_damage_timers(dt, &mut self.bus);
        if !failures.is_empty() {
            self.inspection.on_resolved();
        }

        if self.orchestrator.state().is_game_over() {
            if !was_over {
                self.inspection.on_resolved();
            }
            return;
        }
        if !self.orchestrator.state().wave_active() {
            return;
        }

        for event in self.inspection.tick(dt, input) {
            let result = match event {
                InspectionEvent::Rewarded(product) => {
                    self.orchestrator.reward_inspection(product, &mut self.bus)
                }
                InspectionEvent::ReadyForFix(product) => self
                    .orchestrator
                    .complete_inspection(product, &mut self.bus)
                    .map(|_| ()),
            };
            if let Err(e) = result {
                log::debug!("Inspection result dropped: {e}");
            }
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // PLAYER ACTIONS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Click on a product
    pub fn select(&mut self, product: ProductId) -> FfResult<SelectOutcome> {
        let result = self.try_select(product);
        logged("select", product, result)
    }

    fn try_select(&mut self, product: ProductId) -> FfResult<SelectOutcome> {
        if !self.orchestrator.state().wave_active() {
            return Err(ActionRejected::WaveInactive);
        }
        let (lane, inspected) = self
            .orchestrator
            .find_product(product)
            .map(|(lane, p)| (lane, p.inspection_complete))
            .ok_or(ActionRejected::UnknownProduct)?;
        if self
            .orchestrator
            .lane(lane)
            .is_some_and(|l| l.is_exiting())
        {
            return Err(ActionRejected::AlreadyResolved);
        }

        let outcome = self.inspection.select(product, inspected)?;
        if outcome != SelectOutcome::Unchanged {
            self.bus.emit(Signal::ProductSelected { product, lane });
        }
        if outcome == SelectOutcome::ReadyForFix {
            self.bus.emit(Signal::ProductReadyForFix { product, lane });
        }
        Ok(outcome)
    }

    /// Fix the selected product
    pub fn submit_fix(&mut self, chosen: &[DefectId]) -> FfResult<Resolution> {
        let product = self.selected().ok_or(ActionRejected::NothingSelected)?;
        self.fix(product, chosen)
    }

    /// Reject the selected product
    pub fn submit_reject(&mut self) -> FfResult<Resolution> {
        let product = self.selected().ok_or(ActionRejected::NothingSelected)?;
        self.reject(product)
    }

    pub fn fix(&mut self, product: ProductId, chosen: &[DefectId]) -> FfResult<Resolution> {
        let result = self.orchestrator.attempt_fix(product, chosen, &mut self.bus);
        if result.is_ok() {
            self.inspection.on_resolved();
        }
        logged("fix", product, result)
    }

    pub fn reject(&mut self, product: ProductId) -> FfResult<Resolution> {
        let result = self.orchestrator.attempt_reject(product, &mut self.bus);
        if result.is_ok() {
            self.inspection.on_resolved();
        }
        logged("reject", product, result)
    }

    /// Freeze the selected product's damage timer
    pub fn use_freeze(&mut self) -> FfResult<()> {
        let product = self.selected().ok_or(ActionRejected::NothingSelected)?;
        let result = self.orchestrator.use_freeze(product, &mut self.bus);
        logged("freeze", product, result)
    }

    /// Skip the selected product's rotation QTE
    pub fn use_quickscan(&mut self) -> FfResult<()> {
        let product = self.selected().ok_or(ActionRejected::NothingSelected)?;
        let result = self
            .orchestrator
            .use_quickscan(product, &mut self.bus)
            .map(|_| self.inspection.unlock_selection());
        logged("quickscan", product, result)
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // ACCESS
    // ═══════════════════════════════════════════════════════════════════════════

    pub fn selected(&self) -> Option<ProductId> {
        self.inspection.selected()
    }

    pub fn state(&self) -> &MatchState {
        self.orchestrator.state()
    }

    pub fn orchestrator(&self) -> &MatchOrchestrator {
        &self.orchestrator
    }

    pub fn inspection(&self) -> &InspectionController {
        &self.inspection
    }

    pub fn bus(&self) -> &SignalBus {
        &self.bus
    }

    /// Attach or detach presentation subscribers
    pub fn bus_mut(&mut self) -> &mut SignalBus {
        &mut self.bus
    }
}

fn logged<T>(action: &str, product: ProductId, result: FfResult<T>) -> FfResult<T> {
    if let Err(e) = &result {
        log::debug!("{action} on {product} rejected: {e}");
    }
    result
}
