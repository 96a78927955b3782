//! Inspection controller — selection gate and rotation QTE
//!
//! A single focus slot. Arrivals lock selection onto the product that just
//! stopped; a click on the locked product either re-opens its fix panel or
//! starts the rotation QTE. The QTE measures how long the player keeps the
//! item within the sweet spot of its original orientation while dragging.
//!
//! The controller never touches products directly. It returns
//! [`InspectionEvent`]s and the session applies them.

use serde::{Deserialize, Serialize};

use ff_core::{ActionRejected, FfResult, ProductId};

use crate::config::InspectionConfig;
use crate::timing::Countdown;

/// Player input sampled for one tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct InspectionInput {
    /// Drag button held
    pub held: bool,
    /// Horizontal drag this tick (input units)
    pub yaw_delta: f32,
}

impl InspectionInput {
    pub fn idle() -> Self {
        Self::default()
    }

    pub fn drag(yaw_delta: f32) -> Self {
        Self {
            held: true,
            yaw_delta,
        }
    }
}

/// Rotation state of the focus slot
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RotationPhase {
    Idle,
    /// QTE window running
    Rotating {
        product: ProductId,
        window: Countdown,
        /// Seconds spent inside the sweet spot
        success_accum: f32,
        /// Degrees away from the original orientation
        yaw: f32,
    },
    /// Easing back to the original orientation
    Returning {
        product: ProductId,
        countdown: Countdown,
        from_yaw: f32,
    },
}

/// Effect the session must apply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InspectionEvent {
    /// QTE met its threshold (fires at most once per QTE)
    Rewarded(ProductId),
    /// Inspection gate passed, product awaits a decision
    ReadyForFix(ProductId),
}

/// Result of an accepted selection click
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectOutcome {
    /// Same inspected product clicked again, nothing to do
    Unchanged,
    /// Product already inspected, open its fix panel
    ReadyForFix,
    /// Rotation QTE started
    RotationStarted,
    /// Clicked the product that is already being rotated
    AlreadyRotating,
}

/// Selection gate plus rotation QTE
#[derive(Debug)]
pub struct InspectionController {
    config: InspectionConfig,
    selected: Option<ProductId>,
    /// Product the next accepted click must target
    awaiting: Option<ProductId>,
    phase: RotationPhase,
    last_ratio: Option<f32>,
}

impl InspectionController {
    pub fn new(config: InspectionConfig) -> Self {
        Self {
            config,
            selected: None,
            awaiting: None,
            phase: RotationPhase::Idle,
            last_ratio: None,
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // LANE / RESOLUTION HOOKS
    // ═══════════════════════════════════════════════════════════════════════════

    /// A product stopped at inspection: drop any prior focus and lock onto it
    pub fn on_arrival(&mut self, product: ProductId) {
        if self.is_rotating() || self.selected.is_some() {
            self.unlock_selection();
            self.selected = None;
        }
        self.awaiting = Some(product);
        log::debug!("Selection locked on {product}");
    }

    /// A product was fixed, rejected or failed
    pub fn on_resolved(&mut self) {
        self.unlock_selection();
        self.selected = None;
    }

    /// Cancel rotation or return, clear the lock. No reward is granted.
    pub fn unlock_selection(&mut self) {
        if let RotationPhase::Rotating { product, .. } | RotationPhase::Returning { product, .. } =
            self.phase
        {
            log::debug!("Inspection of {product} cancelled");
        }
        self.phase = RotationPhase::Idle;
        self.awaiting = None;
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // PLAYER INPUT
    // ═══════════════════════════════════════════════════════════════════════════

    /// Handle a click on `product`
    pub fn select(&mut self, product: ProductId, inspection_complete: bool) -> FfResult<SelectOutcome> {
        if self.is_rotating() && self.selected != Some(product) {
            return Err(ActionRejected::RotationInProgress);
        }
        if let Some(waiting) = self.awaiting {
            if waiting != product {
                return Err(ActionRejected::SelectionLocked);
            }
            self.awaiting = None;
        }
        if self.selected == Some(product) && inspection_complete {
            return Ok(SelectOutcome::Unchanged);
        }

        self.selected = Some(product);
        if inspection_complete {
            return Ok(SelectOutcome::ReadyForFix);
        }
        if self.is_rotating() {
            return Ok(SelectOutcome::AlreadyRotating);
        }

        self.phase = RotationPhase::Rotating {
            product,
            window: Countdown::new(self.config.rotation_duration),
            success_accum: 0.0,
            yaw: 0.0,
        };
        self.last_ratio = None;
        log::debug!("Rotation QTE started for {product}");
        Ok(SelectOutcome::RotationStarted)
    }

    /// Step the QTE; input is applied before the window advances
    pub fn tick(&mut self, dt: f32, input: InspectionInput) -> Vec<InspectionEvent> {
        let mut events = Vec::new();

        match self.phase {
            RotationPhase::Idle => {}
            RotationPhase::Rotating {
                product,
                mut window,
                mut success_accum,
                mut yaw,
            } => {
                if input.held {
                    yaw = wrap_degrees(yaw - input.yaw_delta * self.config.rotation_speed);
                    if yaw.abs() < self.config.sweet_spot_degrees {
                        success_accum += dt.min(window.remaining());
                    }
                }

                if !window.tick(dt) {
                    self.phase = RotationPhase::Rotating {
                        product,
                        window,
                        success_accum,
                        yaw,
                    };
                    return events;
                }

                let ratio = success_accum / window.duration();
                self.last_ratio = Some(ratio);
                if ratio >= self.config.success_threshold {
                    log::debug!("{product} passed the QTE ({:.0}%)", ratio * 100.0);
                    events.push(InspectionEvent::Rewarded(product));
                }
                self.phase = RotationPhase::Returning {
                    product,
                    countdown: Countdown::new(self.config.return_duration),
                    from_yaw: yaw,
                };
            }
            RotationPhase::Returning {
                product,
                mut countdown,
                from_yaw,
            } => {
                if countdown.tick(dt) {
                    self.phase = RotationPhase::Idle;
                    if self.selected == Some(product) {
                        events.push(InspectionEvent::ReadyForFix(product));
                    }
                } else {
                    self.phase = RotationPhase::Returning {
                        product,
                        countdown,
                        from_yaw,
                    };
                }
            }
        }

        events
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // QUERIES
    // ═══════════════════════════════════════════════════════════════════════════

    pub fn selected(&self) -> Option<ProductId> {
        self.selected
    }

    pub fn awaiting(&self) -> Option<ProductId> {
        self.awaiting
    }

    pub fn is_locked(&self) -> bool {
        self.awaiting.is_some()
    }

    /// Rotating or easing back
    pub fn is_rotating(&self) -> bool {
        !matches!(self.phase, RotationPhase::Idle)
    }

    pub fn phase(&self) -> RotationPhase {
        self.phase
    }

    /// Current yaw of the focused item (degrees)
    pub fn yaw(&self) -> f32 {
        match self.phase {
            RotationPhase::Idle => 0.0,
            RotationPhase::Rotating { yaw, .. } => yaw,
            RotationPhase::Returning {
                countdown,
                from_yaw,
                ..
            } => from_yaw * (1.0 - countdown.progress()),
        }
    }

    /// Live ratio while rotating, otherwise the last finished QTE's ratio
    pub fn success_ratio(&self) -> f32 {
        match self.phase {
            RotationPhase::Rotating {
                window,
                success_accum,
                ..
            } => success_accum / window.duration(),
            _ => self.last_ratio.unwrap_or(0.0),
        }
    }

    pub fn config(&self) -> &InspectionConfig {
        &self.config
    }
}

/// Map degrees into (-180, 180]
fn wrap_degrees(deg: f32) -> f32 {
    let wrapped = deg.rem_euclid(360.0);
    if wrapped > 180.0 { wrapped - 360.0 } else { wrapped }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 0.1;

    fn controller() -> InspectionController {
        InspectionController::new(InspectionConfig::default())
    }

    fn p(id: u64) -> ProductId {
        ProductId::new(id)
    }

    /// Hold still for `in_spot` seconds, then drag far outside the sweet spot
    /// until the QTE window closes
    fn run_qte(ctrl: &mut InspectionController, in_spot: f32) -> Vec<InspectionEvent> {
        let mut events = Vec::new();
        let in_steps = (in_spot / DT).round() as usize;
        let mut i = 0;
        while matches!(ctrl.phase(), RotationPhase::Rotating { .. }) && i < 100 {
            let input = if i == in_steps {
                InspectionInput::drag(-30.0)
            } else {
                InspectionInput::drag(0.0)
            };
            events.extend(ctrl.tick(DT, input));
            i += 1;
        }
        events
    }

    #[test]
    fn test_arrival_locks_selection() {
        let mut ctrl = controller();
        ctrl.on_arrival(p(1));
        assert!(ctrl.is_locked());
        assert_eq!(ctrl.select(p(2), false), Err(ActionRejected::SelectionLocked));
        assert_eq!(ctrl.select(p(1), false), Ok(SelectOutcome::RotationStarted));
        assert!(!ctrl.is_locked());
        assert_eq!(ctrl.selected(), Some(p(1)));
    }

    #[test]
    fn test_rotation_blocks_other_products() {
        let mut ctrl = controller();
        ctrl.select(p(1), false).unwrap();
        assert_eq!(ctrl.select(p(2), false), Err(ActionRejected::RotationInProgress));
        assert_eq!(ctrl.select(p(1), false), Ok(SelectOutcome::AlreadyRotating));
    }

    #[test]
    fn test_reselect_inspected_is_noop() {
        let mut ctrl = controller();
        assert_eq!(ctrl.select(p(1), true), Ok(SelectOutcome::ReadyForFix));
        assert_eq!(ctrl.select(p(1), true), Ok(SelectOutcome::Unchanged));
        assert_eq!(ctrl.select(p(2), true), Ok(SelectOutcome::ReadyForFix));
    }

    #[test]
    fn test_qte_success_rewards_once() {
        let mut ctrl = controller();
        ctrl.select(p(1), false).unwrap();
        let events = run_qte(&mut ctrl, 4.5);
        assert_eq!(events, vec![InspectionEvent::Rewarded(p(1))]);
        assert!((ctrl.success_ratio() - 0.9).abs() < 1e-3);

        // Return animation, then ready-for-fix
        let mut rest = Vec::new();
        for _ in 0..5 {
            rest.extend(ctrl.tick(DT, InspectionInput::idle()));
        }
        assert_eq!(rest, vec![InspectionEvent::ReadyForFix(p(1))]);
        assert!(!ctrl.is_rotating());
        assert!(ctrl.tick(DT, InspectionInput::idle()).is_empty());
    }

    #[test]
    fn test_qte_below_threshold_no_reward() {
        let mut ctrl = controller();
        ctrl.select(p(1), false).unwrap();
        let events = run_qte(&mut ctrl, 3.0);
        assert!(events.is_empty());
        assert!((ctrl.success_ratio() - 0.6).abs() < 1e-3);
        let mut rest = Vec::new();
        for _ in 0..5 {
            rest.extend(ctrl.tick(DT, InspectionInput::idle()));
        }
        assert_eq!(rest, vec![InspectionEvent::ReadyForFix(p(1))]);
    }

    #[test]
    fn test_released_input_does_not_accumulate() {
        let mut ctrl = controller();
        ctrl.select(p(1), false).unwrap();
        for _ in 0..50 {
            ctrl.tick(DT, InspectionInput::idle());
        }
        assert_eq!(ctrl.success_ratio(), 0.0);
    }

    #[test]
    fn test_unlock_resets_everything() {
        let mut ctrl = controller();
        ctrl.on_arrival(p(1));
        ctrl.select(p(1), false).unwrap();
        for _ in 0..20 {
            ctrl.tick(DT, InspectionInput::drag(0.0));
        }
        ctrl.on_arrival(p(2));
        ctrl.unlock_selection();

        assert!(!ctrl.is_rotating());
        assert!(!ctrl.is_locked());
        assert_eq!(ctrl.awaiting(), None);
        assert_eq!(ctrl.phase(), RotationPhase::Idle);
        for _ in 0..60 {
            assert!(ctrl.tick(DT, InspectionInput::drag(0.0)).is_empty());
        }
    }

    #[test]
    fn test_arrival_aborts_running_qte() {
        let mut ctrl = controller();
        ctrl.select(p(1), false).unwrap();
        for _ in 0..45 {
            ctrl.tick(DT, InspectionInput::drag(0.0));
        }
        ctrl.on_arrival(p(2));
        assert_eq!(ctrl.selected(), None);
        assert_eq!(ctrl.awaiting(), Some(p(2)));
        for _ in 0..60 {
            assert!(ctrl.tick(DT, InspectionInput::drag(0.0)).is_empty());
        }
    }

    #[test]
    fn test_wrap_degrees() {
        assert_eq!(wrap_degrees(190.0), -170.0);
        assert_eq!(wrap_degrees(-190.0), 170.0);
        assert_eq!(wrap_degrees(180.0), 180.0);
        assert_eq!(wrap_degrees(20.0), 20.0);
    }
}
