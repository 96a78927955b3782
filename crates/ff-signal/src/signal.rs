//! Signal — the semantic moments of a match
//!
//! A Signal is NOT a UI command. It states what happened in the simulation;
//! presentation decides what that looks and sounds like.

use serde::{Deserialize, Serialize};

use ff_core::{LaneId, ProductId};

/// Why a match ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameOverReason {
    /// Wave timer ran out
    TimeExpired,
    /// Player tried to fix a defective unit
    FixedDefectiveUnit,
    /// Player rejected a valid unit
    RejectedValidUnit,
    /// Health reached zero
    TooManyMistakes,
}

impl GameOverReason {
    /// Player-facing reason text
    pub fn message(&self) -> &'static str {
        match self {
            Self::TimeExpired => "Time Expired!",
            Self::FixedDefectiveUnit => "CRITICAL FAILURE: Attempted to fix a defective unit!",
            Self::RejectedValidUnit => "CRITICAL FAILURE: Rejected a valid or fixable unit!",
            Self::TooManyMistakes => "Too many mistakes!",
        }
    }
}

impl std::fmt::Display for GameOverReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message())
    }
}

/// Signal raised by the simulation core
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Signal {
    // ═══════════════════════════════════════════════════════════════════════
    // WAVE LIFECYCLE
    // ═══════════════════════════════════════════════════════════════════════
    /// New wave spawned into the lanes
    WaveStarted { wave: u32 },

    /// Remaining wave time, normalized to 0..1
    WaveTimerUpdated { normalized: f32 },

    /// Every lane cleared or exiting, bonus awarded
    WaveCompleted { wave: u32, bonus: u32 },

    // ═══════════════════════════════════════════════════════════════════════
    // SCORE / HEALTH / TOOLS
    // ═══════════════════════════════════════════════════════════════════════
    ScoreUpdated { total: u32 },

    HealthUpdated { current: u32, max: u32 },

    ToolChargesUpdated { freeze: u32, quickscan: u32 },

    // ═══════════════════════════════════════════════════════════════════════
    // PRODUCT FLOW
    // ═══════════════════════════════════════════════════════════════════════
    ProductSpawned {
        product: ProductId,
        lane: LaneId,
        defective: bool,
    },

    /// Product stopped at its lane's inspection point
    ProductArrivedAtInspection { product: ProductId, lane: LaneId },

    ProductSelected { product: ProductId, lane: LaneId },

    /// Inspection gate passed, fix/reject decision may be submitted
    ProductReadyForFix { product: ProductId, lane: LaneId },

    /// Rotation QTE passed its success threshold
    InspectionRewarded { product: ProductId, bonus: u32 },

    /// Product left the decision point (fixed, rejected or failed)
    ProductResolved { product: ProductId, lane: LaneId },

    // ═══════════════════════════════════════════════════════════════════════
    // OUTCOMES
    // ═══════════════════════════════════════════════════════════════════════
    ProductSuccess { product: ProductId },

    MistakeMade {
        product: ProductId,
        reason: String,
        damage: u32,
    },

    /// Terminal until a new game is started
    GameOver { reason: GameOverReason },
}

impl Signal {
    /// Get the signal category for grouping
    pub fn category(&self) -> SignalCategory {
        match self {
            Signal::WaveStarted { .. }
            | Signal::WaveTimerUpdated { .. }
            | Signal::WaveCompleted { .. } => SignalCategory::Wave,

            Signal::ScoreUpdated { .. }
            | Signal::HealthUpdated { .. }
            | Signal::ToolChargesUpdated { .. } => SignalCategory::Hud,

            Signal::ProductSpawned { .. }
            | Signal::ProductArrivedAtInspection { .. }
            | Signal::ProductResolved { .. } => SignalCategory::Product,

            Signal::ProductSelected { .. }
            | Signal::ProductReadyForFix { .. }
            | Signal::InspectionRewarded { .. } => SignalCategory::Inspection,

            Signal::ProductSuccess { .. }
            | Signal::MistakeMade { .. }
            | Signal::GameOver { .. } => SignalCategory::Outcome,
        }
    }

    /// Get a simple string name for this signal type
    pub fn type_name(&self) -> &'static str {
        match self {
            Signal::WaveStarted { .. } => "wave_started",
            Signal::WaveTimerUpdated { .. } => "wave_timer_updated",
            Signal::WaveCompleted { .. } => "wave_completed",
            Signal::ScoreUpdated { .. } => "score_updated",
            Signal::HealthUpdated { .. } => "health_updated",
            Signal::ToolChargesUpdated { .. } => "tool_charges_updated",
            Signal::ProductSpawned { .. } => "product_spawned",
            Signal::ProductArrivedAtInspection { .. } => "product_arrived_at_inspection",
            Signal::ProductSelected { .. } => "product_selected",
            Signal::ProductReadyForFix { .. } => "product_ready_for_fix",
            Signal::InspectionRewarded { .. } => "inspection_rewarded",
            Signal::ProductResolved { .. } => "product_resolved",
            Signal::ProductSuccess { .. } => "product_success",
            Signal::MistakeMade { .. } => "mistake_made",
            Signal::GameOver { .. } => "game_over",
        }
    }

    /// Product this signal is about, if any
    pub fn product(&self) -> Option<ProductId> {
        match self {
            Signal::ProductSpawned { product, .. }
            | Signal::ProductArrivedAtInspection { product, .. }
            | Signal::ProductSelected { product, .. }
            | Signal::ProductReadyForFix { product, .. }
            | Signal::InspectionRewarded { product, .. }
            | Signal::ProductResolved { product, .. }
            | Signal::ProductSuccess { product }
            | Signal::MistakeMade { product, .. } => Some(*product),
            _ => None,
        }
    }

    /// Emitted every tick; traces usually drop these
    pub fn is_high_frequency(&self) -> bool {
        matches!(self, Signal::WaveTimerUpdated { .. })
    }
}

/// Signal category for grouping and filtered subscriptions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalCategory {
    Wave,
    Hud,
    Product,
    Inspection,
    Outcome,
}

impl SignalCategory {
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Wave => "Wave Lifecycle",
            Self::Hud => "Score/Health/Tools",
            Self::Product => "Product Flow",
            Self::Inspection => "Inspection",
            Self::Outcome => "Outcomes",
        }
    }
}
