//! The two-axis motion coordinator.
//!
//! We call the marker carriage the "head". The [`Head`] owns the
//! logical position: single guarded unit steps, straight-ish walks
//! between device points, and the homing sweep all go through it, and
//! nothing else touches the coordinate pair.

use std::thread;
use std::time::Duration;

use log::{trace, warn};
use thiserror::Error;

use crate::io::{Gpio, SetupError};
use crate::pins::PinMap;

/// One of the two motion axes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
}

/// The sign of a unit step along an axis. Which rotation that level
/// produces is a wiring question; see [`MotionConfig::reverse_x`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Positive,
    Negative,
}

impl Direction {
    fn delta(self) -> i32 {
        match self {
            Direction::Positive => 1,
            Direction::Negative => -1,
        }
    }

    fn toward(from: i32, to: i32) -> Direction {
        if to > from {
            Direction::Positive
        } else {
            Direction::Negative
        }
    }
}

/// What became of one attempted unit step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepOutcome {
    /// The pulse was issued.
    Stepped,
    /// The destination-side limit switch is engaged; no pulse went out.
    /// This is ordinary control flow, not an error.
    Blocked,
}

/// The head's logical location, in device steps from the origin.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub fn new(x: i32, y: i32) -> Position {
        Position { x, y }
    }

    /// Euclidean distance to `other`, in steps.
    pub fn distance(&self, other: Position) -> f64 {
        kurbo::Point::from(*self).distance(other.into())
    }
}

impl From<Position> for kurbo::Point {
    fn from(p: Position) -> kurbo::Point {
        kurbo::Point::new(f64::from(p.x), f64::from(p.y))
    }
}

/// Timing and tracking knobs for the motion coordinator.
#[derive(Clone, Copy, Debug)]
pub struct MotionConfig {
    /// Width of each half of a step pulse; the line is held high and
    /// then low for this long.
    pub pulse_width: Duration,
    /// Pause between latching a direction level and pulsing, so the
    /// driver sees the level settle first.
    pub direction_settle: Duration,
    /// Half-width of the band around the master slope within which an
    /// oblique walk keeps feeding X steps. Smaller tracks the ideal
    /// line more tightly at the cost of more alternation.
    pub slope_tolerance: f64,
    /// Invert the direction level driven for positive X steps.
    pub reverse_x: bool,
    /// Invert the direction level driven for positive Y steps.
    pub reverse_y: bool,
}

impl Default for MotionConfig {
    fn default() -> MotionConfig {
        MotionConfig {
            pulse_width: Duration::from_micros(500),
            direction_settle: Duration::from_millis(1),
            slope_tolerance: 0.15,
            reverse_x: false,
            reverse_y: false,
        }
    }
}

/// Homing sweeps toward the negative extremes until the switches there
/// answer; without both bound it would never terminate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
#[error("homing requires both negative-extreme limit switches to be bound")]
pub struct HomingError;

pub struct Head<G> {
    gpio: G,
    pins: PinMap,
    config: MotionConfig,
    position: Position,
}

impl<G: Gpio> Head<G> {
    /// Claim the motor outputs and any bound switch inputs.
    pub fn new(mut gpio: G, pins: PinMap, config: MotionConfig) -> Result<Head<G>, SetupError> {
        let outputs = [
            ("x direction", pins.x_dir),
            ("x step", pins.x_step),
            ("y direction", pins.y_dir),
            ("y step", pins.y_step),
        ];
        for (role, line) in outputs {
            gpio.request_output(line)
                .map_err(|source| SetupError::Claim { role, source })?;
        }
        for (role, line) in pins.switches.labelled() {
            if let Some(line) = line {
                gpio.request_input(line)
                    .map_err(|source| SetupError::Claim { role, source })?;
            }
        }
        Ok(Head {
            gpio,
            pins,
            config,
            position: Position::default(),
        })
    }

    pub fn position(&self) -> Position {
        self.position
    }

    fn dir_level(&self, axis: Axis, direction: Direction) -> bool {
        let positive = direction == Direction::Positive;
        match axis {
            Axis::X => positive != self.config.reverse_x,
            Axis::Y => positive != self.config.reverse_y,
        }
    }

    /// Drive an output, degrading a failure to "level unchanged".
    fn drive(&mut self, line: u32, value: bool) {
        if let Err(err) = self.gpio.set_value(line, value) {
            warn!("write to line {line} failed, leaving its level unchanged: {err}");
        }
    }

    /// Read a switch, degrading a failure to "not engaged".
    fn engaged(&mut self, line: u32) -> bool {
        match self.gpio.get_value(line) {
            Ok(level) => level,
            Err(err) => {
                warn!("read of line {line} failed, treating the switch as open: {err}");
                false
            }
        }
    }

    /// Attempt one unit step along `axis`.
    ///
    /// Latches the direction level, waits out the settle delay, then
    /// checks the destination-side switch (when bound) before pulsing.
    /// Does not touch the logical position; walking operations own that
    /// bookkeeping.
    pub fn step(&mut self, axis: Axis, direction: Direction) -> StepOutcome {
        let (dir_line, step_line) = self.pins.motor(axis);
        let level = self.dir_level(axis, direction);
        self.drive(dir_line, level);
        thread::sleep(self.config.direction_settle);

        if let Some(switch) = self.pins.switches.guarding(axis, direction) {
            if self.engaged(switch) {
                trace!("{axis:?} {direction:?}: blocked by the switch on line {switch}");
                return StepOutcome::Blocked;
            }
        }

        trace!("pulse {axis:?} {direction:?}");
        self.drive(step_line, true);
        thread::sleep(self.config.pulse_width);
        self.drive(step_line, false);
        thread::sleep(self.config.pulse_width);
        StepOutcome::Stepped
    }

    /// One step plus bookkeeping: the coordinate moves only when the
    /// pulse actually went out.
    fn step_tracked(&mut self, axis: Axis, direction: Direction) -> StepOutcome {
        let outcome = self.step(axis, direction);
        if outcome == StepOutcome::Stepped {
            match axis {
                Axis::X => self.position.x += direction.delta(),
                Axis::Y => self.position.y += direction.delta(),
            }
        }
        outcome
    }

    /// Walk the head to `target` one unit step at a time and return the
    /// position actually reached.
    ///
    /// An axis that runs into its limit switch stops contributing for
    /// the rest of the call while the other walks out its balance, so
    /// the result can fall short of `target` on either coordinate.
    /// Callers must not assume arrival.
    pub fn move_to(&mut self, target: Position) -> Position {
        let start = self.position;
        if start == target {
            return start;
        }
        trace!("moving from {start:?} to {target:?}");
        if start.x == target.x {
            self.walk_axis(Axis::Y, target.y);
        } else if start.y == target.y {
            self.walk_axis(Axis::X, target.x);
        } else {
            self.walk_oblique(target);
        }
        self.position
    }

    fn walk_axis(&mut self, axis: Axis, to: i32) {
        let coord = |position: Position| match axis {
            Axis::X => position.x,
            Axis::Y => position.y,
        };
        let direction = Direction::toward(coord(self.position), to);
        while coord(self.position) != to {
            if self.step_tracked(axis, direction) == StepOutcome::Blocked {
                break;
            }
        }
    }

    /// Both coordinates change: track the straight line by slope.
    ///
    /// The master slope is fixed from the start and target; after every
    /// step the slope of what is left is recomputed. X keeps stepping
    /// while that live slope hugs the master slope and X has distance
    /// left, otherwise Y catches up. An axis that finishes or blocks
    /// drops out and the other walks the rest alone.
    fn walk_oblique(&mut self, target: Position) {
        let start = self.position;
        let master = f64::from(target.y - start.y) / f64::from(target.x - start.x);
        let x_dir = Direction::toward(start.x, target.x);
        let y_dir = Direction::toward(start.y, target.y);
        let mut x_blocked = false;
        let mut y_blocked = false;

        loop {
            let x_pending = !x_blocked && self.position.x != target.x;
            let y_pending = !y_blocked && self.position.y != target.y;
            if !x_pending && !y_pending {
                break;
            }

            let live = f64::from(target.y - self.position.y)
                / f64::from(target.x - self.position.x);
            let take_x =
                x_pending && (!y_pending || (live - master).abs() <= self.config.slope_tolerance);

            let (axis, direction) = if take_x {
                (Axis::X, x_dir)
            } else {
                (Axis::Y, y_dir)
            };
            if self.step_tracked(axis, direction) == StepOutcome::Blocked {
                match axis {
                    Axis::X => x_blocked = true,
                    Axis::Y => y_blocked = true,
                }
            }
        }
    }

    /// Sweep both axes toward their negative extremes and declare the
    /// spot where both switches answer in the same iteration to be
    /// (0, 0).
    ///
    /// A switch that engages early just keeps its axis still while the
    /// other finishes. This is the only operation that resynchronizes
    /// the logical position with the machine, so a fresh powered-up rig
    /// must home before its coordinates mean anything.
    pub fn home(&mut self) -> Result<Position, HomingError> {
        if self.pins.switches.x_min.is_none() || self.pins.switches.y_min.is_none() {
            return Err(HomingError);
        }
        loop {
            let x = self.step(Axis::X, Direction::Negative);
            let y = self.step(Axis::Y, Direction::Negative);
            if x == StepOutcome::Blocked && y == StepOutcome::Blocked {
                break;
            }
        }
        self.position = Position::default();
        Ok(self.position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::pins::LimitSwitches;
    use crate::sim::{SimBench, SimEvent};

    fn quick() -> MotionConfig {
        MotionConfig {
            pulse_width: Duration::ZERO,
            direction_settle: Duration::ZERO,
            ..MotionConfig::default()
        }
    }

    fn bench(start: (i32, i32)) -> SimBench {
        SimBench::new(PinMap::default(), (20, 20), start)
    }

    fn head(bench: &SimBench) -> Head<SimBench> {
        Head::new(bench.clone(), PinMap::default(), quick()).unwrap()
    }

    #[test]
    fn horizontal_move_pulses_one_axis() {
        let bench = bench((0, 0));
        let mut head = head(&bench);
        let reached = head.move_to(Position::new(5, 0));
        assert_eq!(reached, Position::new(5, 0));
        assert_eq!(bench.step_count(Axis::X), 5);
        assert_eq!(bench.step_count(Axis::Y), 0);
        assert_eq!(bench.position(), (5, 0));
    }

    #[test]
    fn oblique_move_arrives_with_exact_pulse_counts() {
        let bench = bench((0, 0));
        let mut head = head(&bench);
        let reached = head.move_to(Position::new(5, 10));
        assert_eq!(reached, Position::new(5, 10));
        assert_eq!(bench.step_count(Axis::X), 5);
        assert_eq!(bench.step_count(Axis::Y), 10);
    }

    #[test]
    fn oblique_walk_interleaves_axes() {
        let bench = bench((0, 0));
        let mut head = head(&bench);
        head.move_to(Position::new(6, 6));
        // A 45 degree line alternates rather than running one axis dry
        // first.
        let first_three: Vec<Axis> = bench
            .events()
            .iter()
            .filter_map(|e| match e {
                SimEvent::Step { axis, .. } => Some(*axis),
                _ => None,
            })
            .take(3)
            .collect();
        assert!(first_three.contains(&Axis::X));
        assert!(first_three.contains(&Axis::Y));
    }

    #[test]
    fn blocked_axis_leaves_its_coordinate_alone() {
        // The bench starts at the negative X extreme, so the first X
        // step is refused and only Y makes progress.
        let bench = bench((0, 5));
        let mut head = head(&bench);
        let reached = head.move_to(Position::new(-3, 2));
        assert_eq!(reached, Position::new(0, 2));
        assert_eq!(bench.step_count(Axis::X), 0);
        assert_eq!(bench.step_count(Axis::Y), 2);
    }

    #[test]
    fn move_can_stop_short_at_the_far_extreme() {
        let bench = bench((18, 0));
        let mut head = head(&bench);
        // The bench travel ends at 20, two steps away; the logical
        // coordinate starts at zero wherever the head happens to sit.
        let reached = head.move_to(Position::new(10, 0));
        assert_eq!(reached, Position::new(2, 0));
        assert_eq!(bench.position(), (20, 0));
    }

    #[test]
    fn homing_finds_the_origin() {
        let bench = bench((7, 4));
        let mut head = head(&bench);
        let origin = head.home().unwrap();
        assert_eq!(origin, Position::default());
        assert_eq!(bench.position(), (0, 0));
        assert_eq!(bench.step_count(Axis::X), 7);
        assert_eq!(bench.step_count(Axis::Y), 4);
    }

    #[test]
    fn homing_needs_the_negative_switches() {
        let pins = PinMap {
            switches: LimitSwitches {
                x_min: None,
                ..PinMap::default().switches
            },
            ..PinMap::default()
        };
        let bench = SimBench::new(pins, (20, 20), (3, 3));
        let mut head = Head::new(bench.clone(), pins, quick()).unwrap();
        assert_eq!(head.home(), Err(HomingError));
        assert_eq!(bench.step_count(Axis::X), 0);
    }

    #[test]
    fn failed_switch_reads_degrade_to_open() {
        let bench = bench((0, 0));
        bench.fail_reads(true);
        let mut head = head(&bench);
        // x_min would normally refuse this, but with the read degraded
        // to "open" the pulse goes out.
        assert_eq!(head.step(Axis::X, Direction::Negative), StepOutcome::Stepped);
        assert_eq!(bench.position(), (-1, 0));
    }

    #[test]
    fn failed_line_writes_degrade_to_level_unchanged() {
        let bench = bench((2, 2));
        let mut head = head(&bench);
        bench.fail_writes(true);
        // Every pulse write fails, so the wire never sees an edge; the
        // walk still finishes and keeps its own bookkeeping.
        let reached = head.move_to(Position::new(4, 2));
        assert_eq!(reached, Position::new(4, 2));
        assert_eq!(bench.position(), (2, 2));
        assert_eq!(bench.step_count(Axis::X), 0);

        bench.fail_writes(false);
        assert_eq!(head.step(Axis::X, Direction::Positive), StepOutcome::Stepped);
        assert_eq!(bench.position(), (3, 2));
    }

    #[test]
    fn reversed_wiring_flips_the_direction_level() {
        let bench = bench((5, 5));
        let mut head = Head::new(
            bench.clone(),
            PinMap::default(),
            MotionConfig {
                reverse_x: true,
                ..quick()
            },
        )
        .unwrap();
        head.step(Axis::X, Direction::Positive);
        // The bench interprets a low direction level as negative travel.
        assert_eq!(bench.position(), (4, 5));
        assert_eq!(head.position(), Position::new(0, 0));
    }
}
