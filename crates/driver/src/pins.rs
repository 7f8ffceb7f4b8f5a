//! Line assignments for the plotter's wiring.

use crate::head::{Axis, Direction};

/// Travel-limit switch inputs, one optional binding per axis extreme.
///
/// An unbound extreme is never consulted: motion toward it is taken on
/// faith. The default is a bare rig with no switches at all; note that
/// homing needs both negative extremes bound.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LimitSwitches {
    pub x_min: Option<u32>,
    pub x_max: Option<u32>,
    pub y_min: Option<u32>,
    pub y_max: Option<u32>,
}

impl LimitSwitches {
    /// The switch guarding motion along `axis` toward `direction`, when
    /// one is bound. Only the destination side of a move is guarded;
    /// a step never consults the switch behind it.
    pub fn guarding(&self, axis: Axis, direction: Direction) -> Option<u32> {
        match (axis, direction) {
            (Axis::X, Direction::Negative) => self.x_min,
            (Axis::X, Direction::Positive) => self.x_max,
            (Axis::Y, Direction::Negative) => self.y_min,
            (Axis::Y, Direction::Positive) => self.y_max,
        }
    }

    /// The bound switches with their wiring roles, for claiming.
    pub fn labelled(&self) -> [(&'static str, Option<u32>); 4] {
        [
            ("x min switch", self.x_min),
            ("x max switch", self.x_max),
            ("y min switch", self.y_min),
            ("y max switch", self.y_max),
        ]
    }
}

/// GPIO lines for the two stepper drivers, the limit switches, and the
/// pen's PWM channel.
///
/// The defaults are the original board wiring: direction and step for X
/// on lines 0 and 1, for Y on 2 and 3, the four switches on 4 through
/// 7, and the pen on channel 0.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PinMap {
    pub x_dir: u32,
    pub x_step: u32,
    pub y_dir: u32,
    pub y_step: u32,
    pub switches: LimitSwitches,
    pub pen_channel: u32,
}

impl Default for PinMap {
    fn default() -> PinMap {
        PinMap {
            x_dir: 0,
            x_step: 1,
            y_dir: 2,
            y_step: 3,
            switches: LimitSwitches {
                x_min: Some(4),
                x_max: Some(5),
                y_min: Some(6),
                y_max: Some(7),
            },
            pen_channel: 0,
        }
    }
}

impl PinMap {
    /// The direction and step lines for `axis`.
    pub fn motor(&self, axis: Axis) -> (u32, u32) {
        match axis {
            Axis::X => (self.x_dir, self.x_step),
            Axis::Y => (self.y_dir, self.y_step),
        }
    }
}
