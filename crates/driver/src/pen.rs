//! Pen lift and lower sequencing over the PWM seam.
//!
//! The pen rides a hobby servo driven at 50 Hz. Lift and lower push
//! fixed angle setpoints and then block while the arm physically
//! settles; repeating a setpoint is harmless, the arm just stays put.

use std::thread;
use std::time::Duration;

use log::{trace, warn};

use crate::io::{Pwm, SetupError};

/// Servo timing and setpoints for the pen actuator.
#[derive(Clone, Copy, Debug)]
pub struct PenConfig {
    /// PWM carrier frequency. Hobby servos expect 50 Hz.
    pub frequency_hz: u32,
    /// Arm angle with the pen off the paper, in degrees.
    pub up_angle: u8,
    /// Arm angle with the pen on the paper, in degrees.
    pub down_angle: u8,
    /// How long the arm needs to finish moving after a setpoint change.
    pub settle: Duration,
}

impl Default for PenConfig {
    fn default() -> PenConfig {
        PenConfig {
            frequency_hz: 50,
            up_angle: 90,
            down_angle: 180,
            settle: Duration::from_millis(300),
        }
    }
}

/// Duty percentage for a servo angle. 0 degrees is 4% duty; 180 degrees
/// is 12% duty.
pub fn duty_for_angle(degrees: u8) -> f32 {
    4.0 + f32::from(degrees.min(180)) * 8.0 / 180.0
}

pub struct Pen<P> {
    pwm: P,
    channel: u32,
    config: PenConfig,
}

impl<P: Pwm> Pen<P> {
    /// Bring the channel up at the lifted setpoint. A failure here is a
    /// setup failure; nothing should move without a working pen.
    pub fn new(mut pwm: P, channel: u32, config: PenConfig) -> Result<Pen<P>, SetupError> {
        pwm.start(channel, config.frequency_hz, duty_for_angle(config.up_angle))
            .map_err(|source| SetupError::Pen { source })?;
        thread::sleep(config.settle);
        Ok(Pen {
            pwm,
            channel,
            config,
        })
    }

    fn set_angle(&mut self, degrees: u8) {
        trace!("pen to {degrees} degrees");
        let duty = duty_for_angle(degrees);
        if let Err(err) = self
            .pwm
            .start(self.channel, self.config.frequency_hz, duty)
        {
            warn!("pen channel write failed, leaving the setpoint unchanged: {err}");
        }
        thread::sleep(self.config.settle);
    }

    /// Raise the pen off the paper.
    pub fn lift(&mut self) {
        self.set_angle(self.config.up_angle);
    }

    /// Put the pen onto the paper.
    pub fn lower(&mut self) {
        self.set_angle(self.config.down_angle);
    }
}
