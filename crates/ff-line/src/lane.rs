//! Conveyor lane
//!
//! ```text
//! Empty ─spawn─► ToInspection ─arrive─► Stopped ─send_to_exit─► ToVerified
//!   ▲                                                               │
//!   └──────────── Draining (exit delay) ◄────────── reach verified ─┘
//! ```
//!
//! A lane carries at most one product. Speed is non-zero only while in
//! transit.

use nalgebra::{Point3, Vector3};
use rand::rngs::StdRng;

use ff_core::{LaneId, ProductId, ProductTypeId, SpawnError};

use crate::config::{LaneConfig, LaneLayout};
use crate::factory::ProductFactory;
use crate::product::Product;
use crate::timing::Countdown;

/// Where the lane's occupant is in its journey
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LaneStage {
    Empty,
    /// Moving toward the inspection point
    ToInspection,
    /// Parked at inspection, awaiting a decision
    Stopped,
    /// Resolved, moving toward the verified point
    ToVerified,
    /// At the verified point, waiting out the exit delay
    Draining(Countdown),
}

impl LaneStage {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::ToInspection => "to_inspection",
            Self::Stopped => "stopped",
            Self::ToVerified => "to_verified",
            Self::Draining(_) => "draining",
        }
    }
}

/// Notable change produced by [`Lane::advance`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaneTransition {
    /// First arrival at the inspection point
    Arrived(ProductId),
    /// Exit delay finished, product returned to the factory
    Cleared(ProductId),
}

#[derive(Debug, Clone, Copy)]
struct LanePoints {
    spawn: Point3<f32>,
    inspection: Point3<f32>,
    verified: Point3<f32>,
}

/// One conveyor slot
#[derive(Debug)]
pub struct Lane {
    id: LaneId,
    points: Option<LanePoints>,
    slot: Option<Product>,
    stage: LaneStage,
    speed: f32,
    position: Point3<f32>,
    /// Arrival already reported for the current occupant
    arrived: bool,
    exit_speed: f32,
    exit_delay: f32,
    epsilon: f32,
}

impl Lane {
    /// Build a lane; a layout missing any point yields a disabled lane
    pub fn new(id: LaneId, layout: &LaneLayout, config: &LaneConfig) -> Self {
        let points = match (layout.spawn, layout.inspection, layout.verified) {
            (Some(spawn), Some(inspection), Some(verified)) => Some(LanePoints {
                spawn,
                inspection,
                verified,
            }),
            _ => {
                log::warn!("{id}: layout is missing a point, lane disabled");
                None
            }
        };

        Self {
            id,
            position: points.map(|p| p.spawn).unwrap_or_else(Point3::origin),
            points,
            slot: None,
            stage: LaneStage::Empty,
            speed: 0.0,
            arrived: false,
            exit_speed: config.exit_speed,
            exit_delay: config.exit_delay,
            epsilon: config.arrival_epsilon,
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // COMMANDS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Place a fresh product at the spawn point and start it moving
    pub fn spawn(
        &mut self,
        factory: &mut dyn ProductFactory,
        type_id: ProductTypeId,
        is_defective: bool,
        speed: f32,
        rng: &mut StdRng,
    ) -> Result<ProductId, SpawnError> {
        let points = self.points.ok_or(SpawnError::LaneDisabled)?;
        if self.slot.is_some() {
            return Err(SpawnError::Occupied);
        }
        if !factory.is_ready() {
            return Err(SpawnError::FactoryUnavailable);
        }

        let product = factory.acquire(type_id, is_defective, rng)?;
        let id = product.id;
        self.slot = Some(product);
        self.position = points.spawn;
        self.stage = LaneStage::ToInspection;
        self.speed = speed;
        self.arrived = false;
        Ok(id)
    }

    /// Step transport by `dt`
    pub fn advance(&mut self, dt: f32, factory: &mut dyn ProductFactory) -> Option<LaneTransition> {
        let points = self.points?;
        match self.stage {
            LaneStage::Empty | LaneStage::Stopped => None,
            LaneStage::ToInspection => {
                if !self.move_toward(points.inspection, dt) {
                    return None;
                }
                self.stage = LaneStage::Stopped;
                self.speed = 0.0;
                if self.arrived {
                    return None;
                }
                self.arrived = true;
                self.slot.as_ref().map(|p| LaneTransition::Arrived(p.id))
            }
            LaneStage::ToVerified => {
                if self.move_toward(points.verified, dt) {
                    self.stage = LaneStage::Draining(Countdown::new(self.exit_delay));
                    self.speed = 0.0;
                }
                None
            }
            LaneStage::Draining(mut countdown) => {
                if !countdown.tick(dt) {
                    self.stage = LaneStage::Draining(countdown);
                    return None;
                }
                self.stage = LaneStage::Empty;
                self.arrived = false;
                let product = self.slot.take()?;
                let id = product.id;
                factory.release(product);
                Some(LaneTransition::Cleared(id))
            }
        }
    }

    /// Start the exit transit; false when the lane is empty
    pub fn send_to_exit(&mut self) -> bool {
        if self.slot.is_none() {
            return false;
        }
        self.stage = LaneStage::ToVerified;
        self.speed = self.exit_speed;
        true
    }

    /// Force-empty the lane, returning its occupant to the factory
    pub fn clear_immediate(&mut self, factory: &mut dyn ProductFactory) -> Option<ProductId> {
        self.stage = LaneStage::Empty;
        self.speed = 0.0;
        self.arrived = false;
        if let Some(points) = self.points {
            self.position = points.spawn;
        }
        let product = self.slot.take()?;
        let id = product.id;
        factory.release(product);
        Some(id)
    }

    /// Halt transport in place
    pub fn stop(&mut self) {
        self.speed = 0.0;
    }

    /// Move toward `target`; true once within the arrival epsilon
    fn move_toward(&mut self, target: Point3<f32>, dt: f32) -> bool {
        let to_target: Vector3<f32> = target - self.position;
        let distance = to_target.norm();
        let step = self.speed * dt;
        if distance <= step {
            self.position = target;
        } else if distance > 0.0 {
            self.position += to_target * (step / distance);
        }
        nalgebra::distance(&self.position, &target) < self.epsilon
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // QUERIES
    // ═══════════════════════════════════════════════════════════════════════════

    pub fn id(&self) -> LaneId {
        self.id
    }

    pub fn is_enabled(&self) -> bool {
        self.points.is_some()
    }

    pub fn stage(&self) -> LaneStage {
        self.stage
    }

    pub fn speed(&self) -> f32 {
        self.speed
    }

    pub fn position(&self) -> Point3<f32> {
        self.position
    }

    pub fn is_occupied(&self) -> bool {
        self.slot.is_some()
    }

    pub fn is_exiting(&self) -> bool {
        matches!(self.stage, LaneStage::ToVerified | LaneStage::Draining(_))
    }

    /// Counts toward wave completion
    pub fn is_clear_or_exiting(&self) -> bool {
        !self.is_occupied() || self.is_exiting()
    }

    /// Occupant is parked at inspection awaiting a decision
    pub fn awaits_decision(&self) -> bool {
        self.slot.is_some() && self.stage == LaneStage::Stopped
    }

    pub fn product(&self) -> Option<&Product> {
        self.slot.as_ref()
    }

    pub fn product_mut(&mut self) -> Option<&mut Product> {
        self.slot.as_mut()
    }

    pub fn holds(&self, product: ProductId) -> bool {
        self.slot.as_ref().is_some_and(|p| p.id == product)
    }
}
