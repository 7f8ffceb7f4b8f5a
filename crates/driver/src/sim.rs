//! An in-memory stand-in for the GPIO and PWM collaborators.
//!
//! The bench watches the step lines the way the motor drivers would: a
//! rising edge on a step line moves the simulated head one step in
//! whichever direction the axis's direction line holds at that moment.
//! Switch inputs answer engaged exactly at the travel extremes (0 and
//! the configured extent). Every pulse and pen setpoint lands in one
//! ordered trace so tests can assert sequencing, and pen-down motion
//! accumulates into polylines for preview rendering.
//!
//! Handles are cheap clones sharing one state, so the same bench can be
//! handed to a [`crate::Plotter`] as both its GPIO and its PWM and then
//! inspected afterwards.

use std::cell::RefCell;
use std::collections::HashMap;
use std::io;
use std::rc::Rc;

use kurbo::Point;

use crate::head::{Axis, Direction};
use crate::io::{Gpio, IoError, Pwm};
use crate::pen::{duty_for_angle, PenConfig};
use crate::pins::PinMap;

/// One observed hardware interaction.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SimEvent {
    /// A step pulse, with the direction latched at the time.
    Step { axis: Axis, direction: Direction },
    /// A pen channel setpoint.
    PenDuty { duty_pct: f32 },
    /// The pen channel was stopped.
    PenOff,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Claim {
    Output,
    Input,
}

struct BenchState {
    pins: PinMap,
    extents: (i32, i32),
    position: (i32, i32),
    claims: HashMap<u32, Claim>,
    levels: HashMap<u32, bool>,
    events: Vec<SimEvent>,
    polylines: Vec<Vec<Point>>,
    pen_down: bool,
    fail_reads: bool,
    fail_writes: bool,
    fail_pen: bool,
    pen_threshold: f32,
}

impl BenchState {
    fn point(&self) -> Point {
        Point::new(f64::from(self.position.0), f64::from(self.position.1))
    }

    fn rising_edge(&mut self, line: u32) {
        let axis = if line == self.pins.x_step {
            Axis::X
        } else if line == self.pins.y_step {
            Axis::Y
        } else {
            return;
        };
        let (dir_line, _) = self.pins.motor(axis);
        let direction = if self.levels.get(&dir_line).copied().unwrap_or(false) {
            Direction::Positive
        } else {
            Direction::Negative
        };
        let delta = match direction {
            Direction::Positive => 1,
            Direction::Negative => -1,
        };
        match axis {
            Axis::X => self.position.0 += delta,
            Axis::Y => self.position.1 += delta,
        }
        self.events.push(SimEvent::Step { axis, direction });
        if self.pen_down {
            let point = self.point();
            if let Some(trail) = self.polylines.last_mut() {
                trail.push(point);
            }
        }
    }

    fn switch_level(&self, line: u32) -> Option<bool> {
        let switches = self.pins.switches;
        if switches.x_min == Some(line) {
            Some(self.position.0 <= 0)
        } else if switches.x_max == Some(line) {
            Some(self.position.0 >= self.extents.0)
        } else if switches.y_min == Some(line) {
            Some(self.position.1 <= 0)
        } else if switches.y_max == Some(line) {
            Some(self.position.1 >= self.extents.1)
        } else {
            None
        }
    }
}

/// A cloneable handle onto one simulated rig.
#[derive(Clone)]
pub struct SimBench {
    state: Rc<RefCell<BenchState>>,
}

impl SimBench {
    /// A rig wired as `pins` with travel from (0, 0) to `extents`,
    /// powered up with the head parked at `start`.
    pub fn new(pins: PinMap, extents: (i32, i32), start: (i32, i32)) -> SimBench {
        let pen = PenConfig::default();
        SimBench {
            state: Rc::new(RefCell::new(BenchState {
                pins,
                extents,
                position: start,
                claims: HashMap::new(),
                levels: HashMap::new(),
                events: Vec::new(),
                polylines: Vec::new(),
                pen_down: false,
                fail_reads: false,
                fail_writes: false,
                fail_pen: false,
                pen_threshold: (duty_for_angle(pen.up_angle) + duty_for_angle(pen.down_angle))
                    / 2.0,
            })),
        }
    }

    /// Where the simulated head actually is.
    pub fn position(&self) -> (i32, i32) {
        self.state.borrow().position
    }

    /// Every interaction so far, in order.
    pub fn events(&self) -> Vec<SimEvent> {
        self.state.borrow().events.clone()
    }

    /// How many pulses went out along `axis`.
    pub fn step_count(&self, axis: Axis) -> usize {
        self.state
            .borrow()
            .events
            .iter()
            .filter(|e| matches!(e, SimEvent::Step { axis: a, .. } if *a == axis))
            .count()
    }

    /// The pen-down trails, one polyline per stretch of lowered pen.
    pub fn polylines(&self) -> Vec<Vec<Point>> {
        self.state.borrow().polylines.clone()
    }

    /// Make every input read fail until turned off again.
    pub fn fail_reads(&self, fail: bool) {
        self.state.borrow_mut().fail_reads = fail;
    }

    /// Make every output write fail until turned off again. Failed
    /// writes leave the line's level exactly as it was.
    pub fn fail_writes(&self, fail: bool) {
        self.state.borrow_mut().fail_writes = fail;
    }

    /// Make every pen channel start fail until turned off again.
    pub fn fail_pen(&self, fail: bool) {
        self.state.borrow_mut().fail_pen = fail;
    }
}

impl Gpio for SimBench {
    fn request_output(&mut self, line: u32) -> Result<(), IoError> {
        let mut state = self.state.borrow_mut();
        state.claims.insert(line, Claim::Output);
        state.levels.insert(line, false);
        Ok(())
    }

    fn request_input(&mut self, line: u32) -> Result<(), IoError> {
        self.state.borrow_mut().claims.insert(line, Claim::Input);
        Ok(())
    }

    fn set_value(&mut self, line: u32, value: bool) -> Result<(), IoError> {
        let mut state = self.state.borrow_mut();
        if state.fail_writes {
            return Err(IoError::Gpio {
                line,
                source: io::Error::new(io::ErrorKind::Other, "injected write fault"),
            });
        }
        if state.claims.get(&line) != Some(&Claim::Output) {
            return Err(IoError::NotClaimed { line });
        }
        let was = state.levels.insert(line, value).unwrap_or(false);
        if value && !was {
            state.rising_edge(line);
        }
        Ok(())
    }

    fn get_value(&mut self, line: u32) -> Result<bool, IoError> {
        let state = self.state.borrow();
        if state.fail_reads {
            return Err(IoError::Gpio {
                line,
                source: io::Error::new(io::ErrorKind::Other, "injected read fault"),
            });
        }
        if state.claims.get(&line) != Some(&Claim::Input) {
            return Err(IoError::NotClaimed { line });
        }
        match state.switch_level(line) {
            Some(level) => Ok(level),
            None => Ok(false),
        }
    }

    fn release(&mut self, line: u32) -> Result<(), IoError> {
        self.state.borrow_mut().claims.remove(&line);
        Ok(())
    }
}

impl Pwm for SimBench {
    fn start(&mut self, channel: u32, _frequency_hz: u32, duty_pct: f32) -> Result<(), IoError> {
        let mut state = self.state.borrow_mut();
        if state.fail_pen {
            return Err(IoError::Pwm {
                channel,
                source: io::Error::new(io::ErrorKind::Other, "injected channel fault"),
            });
        }
        state.events.push(SimEvent::PenDuty { duty_pct });
        let down = duty_pct >= state.pen_threshold;
        if down && !state.pen_down {
            let start = state.point();
            state.polylines.push(vec![start]);
        }
        state.pen_down = down;
        Ok(())
    }

    fn stop(&mut self, _channel: u32) -> Result<(), IoError> {
        let mut state = self.state.borrow_mut();
        state.events.push(SimEvent::PenOff);
        state.pen_down = false;
        Ok(())
    }
}
