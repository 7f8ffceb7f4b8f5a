//! Seams between the plotter core and the board's I/O.
//!
//! Backends claim lines before driving them and release everything they
//! still hold when dropped. Claim failures are fatal (another process
//! may own the line); read and write failures during motion are
//! degraded by the caller instead of aborting a half-drawn plot.

use thiserror::Error;

/// A bank of numbered digital I/O lines.
pub trait Gpio {
    /// Claim `line` and configure it as an output driving low.
    fn request_output(&mut self, line: u32) -> Result<(), IoError>;

    /// Claim `line` and configure it as an input.
    fn request_input(&mut self, line: u32) -> Result<(), IoError>;

    /// Drive a claimed output high or low.
    fn set_value(&mut self, line: u32, value: bool) -> Result<(), IoError>;

    /// Read the current level of a claimed input.
    fn get_value(&mut self, line: u32) -> Result<bool, IoError>;

    /// Release a claimed line. Releasing an unclaimed line is a no-op.
    fn release(&mut self, line: u32) -> Result<(), IoError>;
}

/// A bank of PWM channels.
pub trait Pwm {
    /// Start `channel` at `frequency_hz` with the given duty percentage,
    /// retuning it if it is already running.
    fn start(&mut self, channel: u32, frequency_hz: u32, duty_pct: f32) -> Result<(), IoError>;

    /// Stop `channel`, leaving the line idle.
    fn stop(&mut self, channel: u32) -> Result<(), IoError>;
}

/// A failed interaction with an I/O backend.
#[derive(Debug, Error)]
pub enum IoError {
    #[error("gpio line {line}: {source}")]
    Gpio {
        line: u32,
        #[source]
        source: std::io::Error,
    },
    #[error("pwm channel {channel}: {source}")]
    Pwm {
        channel: u32,
        #[source]
        source: std::io::Error,
    },
    #[error("line {line} is not claimed")]
    NotClaimed { line: u32 },
}

/// A hardware acquisition failure. These can only surface while lines
/// are being claimed and the pen channel brought up; a run that hits
/// one must not start moving.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("claiming the {role} line failed: {source}")]
    Claim {
        role: &'static str,
        #[source]
        source: IoError,
    },
    #[error("starting the pen channel failed: {source}")]
    Pen {
        #[source]
        source: IoError,
    },
}
