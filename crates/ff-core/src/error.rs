//! Error types for FactoryFloor
//!
//! Three families, none of which ever escalates past the component that
//! raised it:
//! - [`ConfigError`]: detected at setup, the affected subsystem degrades
//! - [`SpawnError`]: per-lane, isolated from sibling lanes
//! - [`ActionRejected`]: invalid player/tool request, no state change
//!
//! Game-ending violations are state transitions, not errors.

use thiserror::Error;

use crate::ids::{DefectId, ProductTypeId};

/// Configuration error (detected while loading or validating setup)
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("No conveyor lanes configured")]
    NoLanes,

    #[error("Product pool is empty")]
    EmptyProductPool,

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("Product type {product} references unknown defect {defect}")]
    UnknownDefect {
        product: ProductTypeId,
        defect: DefectId,
    },

    #[error("Unsupported config format: {0}")]
    UnsupportedFormat(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ConfigError {
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field,
            reason: reason.into(),
        }
    }
}

/// Lane spawn failure (leaves that lane empty for the wave)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SpawnError {
    #[error("Lane already occupied")]
    Occupied,

    #[error("Lane disabled by configuration")]
    LaneDisabled,

    #[error("Product factory not ready")]
    FactoryUnavailable,

    #[error("Product pool exhausted")]
    PoolExhausted,

    #[error("Unknown product type: {0}")]
    UnknownProductType(ProductTypeId),
}

/// Invalid operation request, rejected by the core without a state change
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionRejected {
    #[error("No active wave")]
    WaveInactive,

    #[error("Product is not on any lane")]
    UnknownProduct,

    #[error("Product already resolved")]
    AlreadyResolved,

    #[error("No tool charges left")]
    NoCharges,

    #[error("Product timer already frozen")]
    AlreadyFrozen,

    #[error("Product already inspected")]
    AlreadyInspected,

    #[error("Selection locked on another product")]
    SelectionLocked,

    #[error("Another product is being rotated")]
    RotationInProgress,

    #[error("No product selected")]
    NothingSelected,
}

/// Result type alias
pub type FfResult<T> = Result<T, ActionRejected>;
