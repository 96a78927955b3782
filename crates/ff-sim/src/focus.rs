//! Focus director — camera stand-in
//!
//! Follows the action the way the in-game camera does: an arrival swings
//! focus to that lane, a resolution drifts back to the idle point after a
//! short pause. Moves are cancellable state; a new arrival takes over
//! whatever move is in flight.

use nalgebra::Point3;

use ff_core::LaneId;
use ff_line::{Countdown, TaskScheduler};
use ff_signal::Signal;

/// Director tuning and focus points
#[derive(Debug, Clone)]
pub struct FocusConfig {
    /// Seconds to swing onto a lane
    pub focus_duration: f32,
    /// Seconds to swing back to idle
    pub idle_duration: f32,
    /// Pause after a resolution before heading back
    pub return_delay: f32,
    pub idle_point: Point3<f32>,
    /// One per lane, in lane order
    pub focus_points: Vec<Point3<f32>>,
}

impl FocusConfig {
    pub fn new(idle_point: Point3<f32>, focus_points: Vec<Point3<f32>>) -> Self {
        Self {
            focus_duration: 1.0,
            idle_duration: 0.8,
            return_delay: 0.2,
            idle_point,
            focus_points,
        }
    }
}

/// Where focus is headed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusTarget {
    Idle,
    Lane(LaneId),
}

#[derive(Debug, Clone, Copy)]
struct FocusMove {
    from: Point3<f32>,
    to: Point3<f32>,
    target: FocusTarget,
    countdown: Countdown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FocusTask {
    ReturnToIdle,
}

/// Signal-driven focus state
#[derive(Debug)]
pub struct FocusDirector {
    config: FocusConfig,
    enabled: bool,
    position: Point3<f32>,
    target: FocusTarget,
    current: Option<FocusMove>,
    scheduler: TaskScheduler<FocusTask>,
    /// Moves started, for the run summary
    moves_started: u32,
    moves_preempted: u32,
}

impl FocusDirector {
    /// Disabled (with an error log) when focus points don't match the lanes
    pub fn new(config: FocusConfig, lane_count: usize) -> Self {
        let enabled = if lane_count == 0 {
            log::error!("Focus director: no lanes to follow, disabled");
            false
        } else if config.focus_points.len() != lane_count {
            log::error!(
                "Focus director: {} focus points for {} lanes, disabled",
                config.focus_points.len(),
                lane_count
            );
            false
        } else {
            true
        };

        Self {
            position: config.idle_point,
            config,
            enabled,
            target: FocusTarget::Idle,
            current: None,
            scheduler: TaskScheduler::new(),
            moves_started: 0,
            moves_preempted: 0,
        }
    }

    /// React to one signal
    pub fn handle(&mut self, signal: &Signal) {
        if !self.enabled {
            return;
        }
        match signal {
            Signal::ProductArrivedAtInspection { lane, .. } => {
                let Some(point) = self.config.focus_points.get(lane.index()).copied() else {
                    return;
                };
                self.scheduler.clear();
                self.begin(point, FocusTarget::Lane(*lane), self.config.focus_duration);
            }
            Signal::ProductResolved { .. } => {
                // Stop where we are, then head home
                if self.current.take().is_some() {
                    self.moves_preempted += 1;
                }
                self.scheduler.clear();
                self.scheduler
                    .schedule(FocusTask::ReturnToIdle, self.config.return_delay);
            }
            Signal::GameOver { .. } => {
                self.scheduler.clear();
                self.current = None;
            }
            _ => {}
        }
    }

    /// Step scheduled returns and the active move
    pub fn tick(&mut self, dt: f32) {
        if !self.enabled {
            return;
        }
        for task in self.scheduler.advance(dt) {
            match task {
                FocusTask::ReturnToIdle => {
                    self.begin(self.config.idle_point, FocusTarget::Idle, self.config.idle_duration)
                }
            }
        }

        let Some(mut current) = self.current else {
            return;
        };
        if current.countdown.tick(dt) {
            self.position = current.to;
            self.current = None;
        } else {
            let t = smoothstep(current.countdown.progress());
            self.position = current.from + (current.to - current.from) * t;
            self.current = Some(current);
        }
    }

    fn begin(&mut self, to: Point3<f32>, target: FocusTarget, duration: f32) {
        if self.current.is_some() {
            self.moves_preempted += 1;
        }
        self.current = Some(FocusMove {
            from: self.position,
            to,
            target,
            countdown: Countdown::new(duration),
        });
        self.target = target;
        self.moves_started += 1;
        log::trace!("Focus moving to {target:?}");
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn position(&self) -> Point3<f32> {
        self.position
    }

    pub fn target(&self) -> FocusTarget {
        self.target
    }

    pub fn moving_to(&self) -> Option<FocusTarget> {
        self.current.map(|m| m.target)
    }

    pub fn moves_started(&self) -> u32 {
        self.moves_started
    }

    pub fn moves_preempted(&self) -> u32 {
        self.moves_preempted
    }
}

fn smoothstep(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ff_core::ProductId;

    fn director() -> FocusDirector {
        FocusDirector::new(
            FocusConfig::new(
                Point3::new(0.0, 5.0, -5.0),
                vec![Point3::new(-2.0, 3.0, -2.0), Point3::new(2.0, 3.0, -2.0)],
            ),
            2,
        )
    }

    fn arrived(lane: u8) -> Signal {
        Signal::ProductArrivedAtInspection {
            product: ProductId::new(lane as u64 + 1),
            lane: LaneId::new(lane),
        }
    }

    fn run(director: &mut FocusDirector, seconds: f32) {
        let steps = (seconds / 0.05).round() as usize;
        for _ in 0..steps {
            director.tick(0.05);
        }
    }

    #[test]
    fn test_mismatched_focus_points_disable() {
        let mut director = FocusDirector::new(
            FocusConfig::new(Point3::origin(), vec![Point3::origin()]),
            3,
        );
        assert!(!director.is_enabled());
        director.handle(&arrived(0));
        assert_eq!(director.moving_to(), None);
    }

    #[test]
    fn test_arrival_moves_to_lane() {
        let mut director = director();
        director.handle(&arrived(1));
        assert_eq!(director.moving_to(), Some(FocusTarget::Lane(LaneId::new(1))));
        run(&mut director, 1.1);
        assert_eq!(director.moving_to(), None);
        assert_relative_eq!(director.position(), Point3::new(2.0, 3.0, -2.0));
    }

    #[test]
    fn test_new_arrival_preempts() {
        let mut director = director();
        director.handle(&arrived(0));
        run(&mut director, 0.5);
        director.handle(&arrived(1));
        assert_eq!(director.moves_preempted(), 1);
        assert_eq!(director.target(), FocusTarget::Lane(LaneId::new(1)));
        run(&mut director, 1.1);
        assert_relative_eq!(director.position(), Point3::new(2.0, 3.0, -2.0));
    }

    #[test]
    fn test_resolution_returns_to_idle_after_delay() {
        let mut director = director();
        director.handle(&arrived(0));
        run(&mut director, 1.1);
        director.handle(&Signal::ProductResolved {
            product: ProductId::new(1),
            lane: LaneId::new(0),
        });
        run(&mut director, 0.1);
        assert_eq!(director.moving_to(), None);
        run(&mut director, 0.2);
        assert_eq!(director.moving_to(), Some(FocusTarget::Idle));
        run(&mut director, 1.0);
        assert_relative_eq!(director.position(), Point3::new(0.0, 5.0, -5.0));
    }

    #[test]
    fn test_arrival_cancels_pending_return() {
        let mut director = director();
        director.handle(&Signal::ProductResolved {
            product: ProductId::new(1),
            lane: LaneId::new(0),
        });
        director.handle(&arrived(1));
        run(&mut director, 1.5);
        assert_eq!(director.target(), FocusTarget::Lane(LaneId::new(1)));
        assert_relative_eq!(director.position(), Point3::new(2.0, 3.0, -2.0));
    }
}
