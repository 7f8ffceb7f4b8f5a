//! The hardware side of the plotter: I/O seams, the two-axis motion
//! coordinator, the pen actuator, and the orchestrator that walks a
//! sampled curve.
//!
//! Everything below [`plotter::Plotter`] talks to hardware exclusively
//! through the [`io::Gpio`] and [`io::Pwm`] traits. [`sysfs`] implements
//! them against the Linux sysfs interface; [`sim::SimBench`] implements
//! them in memory for tests and dry runs.

pub mod head;
pub mod io;
pub mod pen;
pub mod pins;
pub mod plotter;
pub mod sim;
pub mod sysfs;

pub use head::{Axis, Direction, Head, HomingError, MotionConfig, Position, StepOutcome};
pub use io::{Gpio, IoError, Pwm, SetupError};
pub use pen::{Pen, PenConfig};
pub use pins::{LimitSwitches, PinMap};
pub use plotter::{PlotStats, Plotter};
