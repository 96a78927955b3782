//! Match configuration
//!
//! Every tunable of the game loop lives here. Configs load from YAML or
//! JSON (picked by file extension) and every section falls back to the
//! shipped defaults field by field.

use std::path::Path;

use nalgebra::Point3;
use serde::{Deserialize, Serialize};

use ff_core::ConfigError;

use crate::catalog::ProductCatalog;

/// Health, scoring, tools and mistake weights
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    pub max_health: u32,
    /// Score for a correct fix or a correct reject
    pub fix_score: u32,
    /// Flat bonus when every lane is cleared
    pub wave_complete_bonus: u32,
    /// Delay between wave completion and the next spawn (s)
    pub time_between_waves: f32,
    /// Freeze charges granted per new game (not per wave)
    pub freeze_charges: u32,
    /// Quick-scan charges granted per new game (not per wave)
    pub quickscan_charges: u32,
    /// Damage per missing or extra defect in a fix attempt
    pub wrong_fix_damage: u32,
    /// Damage when a product's damage timer runs out
    pub forced_fail_damage: u32,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            max_health: 3,
            fix_score: 100,
            wave_complete_bonus: 500,
            time_between_waves: 1.5,
            freeze_charges: 3,
            quickscan_charges: 3,
            wrong_fix_damage: 1,
            forced_fail_damage: 2,
        }
    }
}

/// Wave pacing (linear scaling by wave number)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WaveConfig {
    pub base_wave_time: f32,
    /// Seconds removed per wave number
    pub wave_time_step: f32,
    pub wave_time_floor: f32,
    pub defect_chance_base: f64,
    pub defect_chance_step: f64,
}

impl Default for WaveConfig {
    fn default() -> Self {
        Self {
            base_wave_time: 30.0,
            wave_time_step: 1.0,
            wave_time_floor: 10.0,
            defect_chance_base: 0.10,
            defect_chance_step: 0.05,
        }
    }
}

impl WaveConfig {
    /// Wave duration: `max(base - wave * step, floor)`
    pub fn wave_time(&self, wave: u32) -> f32 {
        (self.base_wave_time - wave as f32 * self.wave_time_step).max(self.wave_time_floor)
    }

    /// Chance that a spawned unit is defective. Values above 1 simply
    /// mean "always".
    pub fn defect_chance(&self, wave: u32) -> f64 {
        self.defect_chance_base + self.defect_chance_step * wave as f64
    }
}

/// Spawn, inspection and exit points of one lane
///
/// A layout missing any point builds a disabled lane.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LaneLayout {
    pub spawn: Option<Point3<f32>>,
    pub inspection: Option<Point3<f32>>,
    pub verified: Option<Point3<f32>>,
}

impl LaneLayout {
    /// Straight conveyor along +z at the given x offset
    pub fn straight(x: f32, length: f32) -> Self {
        Self {
            spawn: Some(Point3::new(x, 0.0, -length)),
            inspection: Some(Point3::new(x, 0.0, 0.0)),
            verified: Some(Point3::new(x, 0.0, length)),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.spawn.is_some() && self.inspection.is_some() && self.verified.is_some()
    }
}

/// Conveyor transport
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LaneConfig {
    pub base_speed: f32,
    /// Speed added per wave number
    pub speed_step: f32,
    /// Speed used after a product is resolved
    pub exit_speed: f32,
    /// Dwell at the verified point before the slot is freed (s)
    pub exit_delay: f32,
    /// Distance at which a target point counts as reached
    pub arrival_epsilon: f32,
    pub layouts: Vec<LaneLayout>,
}

impl Default for LaneConfig {
    fn default() -> Self {
        Self {
            base_speed: 2.0,
            speed_step: 0.1,
            exit_speed: 4.0,
            exit_delay: 0.5,
            arrival_epsilon: 0.05,
            layouts: vec![
                LaneLayout::straight(-2.5, 6.0),
                LaneLayout::straight(0.0, 6.0),
                LaneLayout::straight(2.5, 6.0),
            ],
        }
    }
}

impl LaneConfig {
    /// Transit speed for a wave: `base + wave * step`
    pub fn speed_for_wave(&self, wave: u32) -> f32 {
        self.base_speed + wave as f32 * self.speed_step
    }
}

/// Rotation QTE
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InspectionConfig {
    /// QTE window (s)
    pub rotation_duration: f32,
    /// Max yaw away from the original orientation that still counts
    pub sweet_spot_degrees: f32,
    /// Required `time in sweet spot / duration`
    pub success_threshold: f32,
    /// Damage timer multiplier granted on success
    pub reward_multiplier: f32,
    pub reward_score: u32,
    /// Return-to-origin animation after the window (s)
    pub return_duration: f32,
    /// Degrees of yaw per unit of drag input
    pub rotation_speed: f32,
}

impl Default for InspectionConfig {
    fn default() -> Self {
        Self {
            rotation_duration: 5.0,
            sweet_spot_degrees: 30.0,
            success_threshold: 0.8,
            reward_multiplier: 1.5,
            reward_score: 50,
            return_duration: 0.3,
            rotation_speed: 3.0,
        }
    }
}

/// Per-product generation and urgency
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProductConfig {
    /// Damage timer length (s)
    pub damage_timer: f32,
    /// `current <= ratio * max` counts as critical
    pub critical_ratio: f32,
    pub min_defects: usize,
    pub max_defects: usize,
    /// Recycled product shells kept by the factory
    pub pool_capacity: usize,
}

impl Default for ProductConfig {
    fn default() -> Self {
        Self {
            damage_timer: 10.0,
            critical_ratio: 0.3,
            min_defects: 4,
            max_defects: 5,
            pool_capacity: 16,
        }
    }
}

/// Complete match configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub name: String,
    /// Fixed RNG seed (None = entropy)
    pub seed: Option<u64>,
    pub rules: MatchConfig,
    pub waves: WaveConfig,
    pub lanes: LaneConfig,
    pub inspection: InspectionConfig,
    pub products: ProductConfig,
    pub catalog: ProductCatalog,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            name: "Standard Shift".into(),
            seed: None,
            rules: MatchConfig::default(),
            waves: WaveConfig::default(),
            lanes: LaneConfig::default(),
            inspection: InspectionConfig::default(),
            products: ProductConfig::default(),
            catalog: ProductCatalog::standard(),
        }
    }
}

impl GameConfig {
    /// Default config with a fixed seed
    pub fn seeded(seed: u64) -> Self {
        Self {
            seed: Some(seed),
            ..Default::default()
        }
    }

    /// Builder: replace lane layouts
    pub fn with_layouts(mut self, layouts: Vec<LaneLayout>) -> Self {
        self.lanes.layouts = layouts;
        self
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // LOADING
    // ═══════════════════════════════════════════════════════════════════════════

    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yml::from_str(yaml)?)
    }

    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load and validate a config file (`.yaml`, `.yml` or `.json`)
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();

        let config = match ext.as_str() {
            "yaml" | "yml" => Self::from_yaml_str(&text)?,
            "json" => Self::from_json_str(&text)?,
            other => return Err(ConfigError::UnsupportedFormat(other.to_string())),
        };
        config.validate()?;
        log::info!("Loaded config '{}' from {}", config.name, path.display());
        Ok(config)
    }

    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        Ok(serde_yml::to_string(self)?)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // VALIDATION
    // ═══════════════════════════════════════════════════════════════════════════

    /// Check every value a match depends on
    ///
    /// Incomplete lane layouts are not reported here; they only disable
    /// their own lane.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.lanes.layouts.is_empty() {
            return Err(ConfigError::NoLanes);
        }
        if self.lanes.layouts.len() > u8::MAX as usize {
            return Err(ConfigError::invalid("lanes.layouts", "at most 255 lanes"));
        }
        if self.rules.max_health == 0 {
            return Err(ConfigError::invalid("rules.max_health", "must be at least 1"));
        }
        positive("waves.base_wave_time", self.waves.base_wave_time)?;
        non_negative("waves.wave_time_floor", self.waves.wave_time_floor)?;
        non_negative("rules.time_between_waves", self.rules.time_between_waves)?;
        positive("lanes.base_speed", self.lanes.base_speed)?;
        positive("lanes.exit_speed", self.lanes.exit_speed)?;
        non_negative("lanes.exit_delay", self.lanes.exit_delay)?;
        positive("lanes.arrival_epsilon", self.lanes.arrival_epsilon)?;
        positive("inspection.rotation_duration", self.inspection.rotation_duration)?;
        non_negative("inspection.return_duration", self.inspection.return_duration)?;
        if !(0.0..=1.0).contains(&self.inspection.success_threshold) {
            return Err(ConfigError::invalid(
                "inspection.success_threshold",
                "must be within 0..=1",
            ));
        }
        if !(self.inspection.sweet_spot_degrees > 0.0 && self.inspection.sweet_spot_degrees <= 180.0)
        {
            return Err(ConfigError::invalid(
                "inspection.sweet_spot_degrees",
                "must be within (0, 180]",
            ));
        }
        if self.inspection.reward_multiplier < 1.0 {
            return Err(ConfigError::invalid(
                "inspection.reward_multiplier",
                "must be at least 1",
            ));
        }
        positive("products.damage_timer", self.products.damage_timer)?;
        if !(0.0..=1.0).contains(&self.products.critical_ratio) {
            return Err(ConfigError::invalid(
                "products.critical_ratio",
                "must be within 0..=1",
            ));
        }
        if self.products.min_defects > self.products.max_defects {
            return Err(ConfigError::invalid(
                "products.min_defects",
                "must not exceed max_defects",
            ));
        }
        self.catalog.validate()
    }
}

fn positive(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::invalid(field, format!("must be positive, got {value}")))
    }
}

fn non_negative(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::invalid(field, format!("must not be negative, got {value}")))
    }
}
