//! Product — one item riding a lane
//!
//! Holds the unresolved defect set, the inspection gate and the damage
//! timer. The orchestrator and the inspection controller mutate it; the
//! lane owns it; the factory recycles it.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use ff_core::{DefectId, ProductId, ProductTypeId};

// ═══════════════════════════════════════════════════════════════════════════════
// DAMAGE TIMER
// ═══════════════════════════════════════════════════════════════════════════════

/// Count-down urgency timer
///
/// Reaching zero fires exactly once: after that the timer is latched
/// until it is reset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DamageTimer {
    pub current: f32,
    pub max: f32,
    expired: bool,
}

impl DamageTimer {
    pub fn new(max: f32) -> Self {
        Self {
            current: max,
            max,
            expired: false,
        }
    }

    /// Count down by `dt`; returns true on the tick that reaches zero
    pub fn tick(&mut self, dt: f32) -> bool {
        if self.expired {
            return false;
        }
        self.current = (self.current - dt).max(0.0);
        if self.current <= 0.0 {
            self.expired = true;
            return true;
        }
        false
    }

    pub fn is_expired(&self) -> bool {
        self.expired
    }

    /// Remaining fraction, 0..1
    pub fn normalized(&self) -> f32 {
        if self.max > 0.0 {
            (self.current / self.max).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }

    /// `current <= ratio * max`
    pub fn is_critical(&self, ratio: f32) -> bool {
        self.current <= ratio * self.max
    }

    /// Stretch the timer: `max *= m`, `current = min(current * m, max)`
    pub fn extend(&mut self, multiplier: f32) {
        if self.expired {
            return;
        }
        self.max *= multiplier;
        self.current = (self.current * multiplier).min(self.max);
    }

    pub fn reset(&mut self, max: f32) {
        *self = Self::new(max);
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// VERIFICATION
// ═══════════════════════════════════════════════════════════════════════════════

/// Outcome of comparing a fix submission with the product's defects
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Verification {
    /// Active defects the player did not pick
    pub missing: Vec<DefectId>,
    /// Picked defects the product does not have
    pub extra: Vec<DefectId>,
}

impl Verification {
    pub fn is_success(&self) -> bool {
        self.missing.is_empty() && self.extra.is_empty()
    }

    /// `|missing| + |extra|`
    pub fn mistake_count(&self) -> u32 {
        (self.missing.len() + self.extra.len()) as u32
    }

    /// "Missing N Fixes. Wrong M Fixes." with zero parts left out
    pub fn reason(&self) -> String {
        let mut parts = Vec::with_capacity(2);
        if !self.missing.is_empty() {
            parts.push(format!("Missing {} Fixes.", self.missing.len()));
        }
        if !self.extra.is_empty() {
            parts.push(format!("Wrong {} Fixes.", self.extra.len()));
        }
        parts.join(" ")
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// PRODUCT
// ═══════════════════════════════════════════════════════════════════════════════

/// A product instance on a lane
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub type_id: ProductTypeId,
    /// Display name of the product type
    pub name: String,
    /// Only a reject resolves a defective unit
    pub is_defective: bool,
    /// Unresolved defects (empty = fully fixed)
    pub active_defects: BTreeSet<DefectId>,
    /// Rotation QTE (or quick scan) passed
    pub inspection_complete: bool,
    pub damage_timer: DamageTimer,
    /// Damage timer halted by the freeze tool
    pub frozen: bool,
}

impl Product {
    pub fn new(
        id: ProductId,
        type_id: ProductTypeId,
        name: impl Into<String>,
        is_defective: bool,
        defects: impl IntoIterator<Item = DefectId>,
        damage_timer: f32,
    ) -> Self {
        Self {
            id,
            type_id,
            name: name.into(),
            is_defective,
            active_defects: defects.into_iter().collect(),
            inspection_complete: false,
            damage_timer: DamageTimer::new(damage_timer),
            frozen: false,
        }
    }

    pub fn is_fully_fixed(&self) -> bool {
        self.active_defects.is_empty()
    }

    /// Presentation hint only, never drives a transition
    pub fn is_critical(&self, ratio: f32) -> bool {
        self.damage_timer.is_critical(ratio)
    }

    /// Set comparison of a submission against the active defects
    pub fn verify_fixes(&self, chosen: &BTreeSet<DefectId>) -> Verification {
        Verification {
            missing: self.active_defects.difference(chosen).copied().collect(),
            extra: chosen.difference(&self.active_defects).copied().collect(),
        }
    }

    pub fn clear_defects(&mut self) {
        self.active_defects.clear();
    }

    /// Damage timer only runs once inspection passed and while unfrozen
    pub fn damage_timer_running(&self) -> bool {
        self.inspection_complete && !self.frozen
    }

    pub fn apply_inspection_reward(&mut self, multiplier: f32) {
        self.damage_timer.extend(multiplier);
    }

    /// Wipe every per-run field before the shell goes back to the pool
    pub fn reset_for_pool(&mut self) {
        self.is_defective = false;
        self.active_defects.clear();
        self.inspection_complete = false;
        self.frozen = false;
        let max = self.damage_timer.max;
        self.damage_timer.reset(max);
    }
}
