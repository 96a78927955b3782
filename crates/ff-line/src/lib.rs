//! FactoryFloor line simulation
//!
//! The game-state core of the inspection game: conveyor lanes, the
//! rotation QTE, and the wave/health/score loop.
//!
//! ## Architecture
//!
//! ```text
//!                    ┌────────────────────┐
//!   player input ──► │      Session       │ ──► SignalBus ──► presentation
//!                    └─────────┬──────────┘
//!              ┌───────────────┴───────────────┐
//!              ▼                               ▼
//!   ┌─────────────────────┐        ┌──────────────────────┐
//!   │  MatchOrchestrator  │        │ InspectionController │
//!   │  waves · health ·   │        │  selection lock ·    │
//!   │  score · tools      │        │  rotation QTE        │
//!   └──────────┬──────────┘        └──────────────────────┘
//!              ▼
//!   ┌─────────────────────┐        ┌──────────────────────┐
//!   │   Lane × N          │ ◄────► │   ProductFactory     │
//!   └─────────────────────┘        └──────────────────────┘
//! ```
//!
//! Everything runs on one cooperative tick; timed sequences are plain
//! state ([`timing`]) so any of them can be cancelled mid-flight.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use ff_line::{GameConfig, InspectionInput, Session};
//!
//! let mut session = Session::new(GameConfig::seeded(7));
//! session.start();
//! for _ in 0..600 {
//!     session.tick(1.0 / 60.0, InspectionInput::idle());
//! }
//! println!("score: {}", session.state().score);
//! ```

pub mod catalog;
pub mod config;
pub mod factory;
pub mod inspection;
pub mod lane;
pub mod orchestrator;
pub mod product;
pub mod session;
pub mod timing;

pub use catalog::*;
pub use config::*;
pub use factory::*;
pub use inspection::*;
pub use lane::*;
pub use orchestrator::*;
pub use product::*;
pub use session::*;
pub use timing::*;
