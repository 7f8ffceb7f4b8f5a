//! Linux sysfs backends for the GPIO and PWM seams.
//!
//! Thin wrappers over `/sys/class/gpio` and `/sys/class/pwm/pwmchip0`:
//! export a line, set its direction, read and write its value file, and
//! unexport it again when the backend drops. Nothing is cached beyond
//! the set of claimed lines.

use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;

use log::{debug, warn};

use crate::io::{Gpio, IoError, Pwm};

pub struct SysfsGpio {
    root: PathBuf,
    claimed: HashSet<u32>,
}

impl SysfsGpio {
    pub fn new() -> SysfsGpio {
        SysfsGpio::with_root("/sys/class/gpio")
    }

    /// A bank rooted somewhere else, for tests.
    pub fn with_root(root: impl Into<PathBuf>) -> SysfsGpio {
        SysfsGpio {
            root: root.into(),
            claimed: HashSet::new(),
        }
    }

    fn line_dir(&self, line: u32) -> PathBuf {
        self.root.join(format!("gpio{line}"))
    }

    fn write(&self, line: u32, path: PathBuf, contents: &str) -> Result<(), IoError> {
        fs::write(path, contents).map_err(|source| IoError::Gpio { line, source })
    }

    fn claim(&mut self, line: u32, direction: &str) -> Result<(), IoError> {
        // A line left exported by an earlier unclean exit is fine; the
        // kernel refuses a second export, so probe first.
        if !self.line_dir(line).exists() {
            self.write(line, self.root.join("export"), &line.to_string())?;
        }
        self.write(line, self.line_dir(line).join("direction"), direction)?;
        self.claimed.insert(line);
        debug!("claimed gpio{line} as {direction}");
        Ok(())
    }
}

impl Default for SysfsGpio {
    fn default() -> SysfsGpio {
        SysfsGpio::new()
    }
}

impl Gpio for SysfsGpio {
    fn request_output(&mut self, line: u32) -> Result<(), IoError> {
        // "low" latches the output direction and a low level in one
        // write.
        self.claim(line, "low")
    }

    fn request_input(&mut self, line: u32) -> Result<(), IoError> {
        self.claim(line, "in")
    }

    fn set_value(&mut self, line: u32, value: bool) -> Result<(), IoError> {
        if !self.claimed.contains(&line) {
            return Err(IoError::NotClaimed { line });
        }
        self.write(
            line,
            self.line_dir(line).join("value"),
            if value { "1" } else { "0" },
        )
    }

    fn get_value(&mut self, line: u32) -> Result<bool, IoError> {
        if !self.claimed.contains(&line) {
            return Err(IoError::NotClaimed { line });
        }
        let raw = fs::read_to_string(self.line_dir(line).join("value"))
            .map_err(|source| IoError::Gpio { line, source })?;
        Ok(raw.trim_end() == "1")
    }

    fn release(&mut self, line: u32) -> Result<(), IoError> {
        if !self.claimed.remove(&line) {
            return Ok(());
        }
        debug!("released gpio{line}");
        self.write(line, self.root.join("unexport"), &line.to_string())
    }
}

impl Drop for SysfsGpio {
    fn drop(&mut self) {
        for line in self.claimed.clone() {
            if let Err(err) = self.release(line) {
                warn!("releasing gpio{line} on drop failed: {err}");
            }
        }
    }
}

pub struct SysfsPwm {
    root: PathBuf,
    exported: HashSet<u32>,
}

impl SysfsPwm {
    pub fn new() -> SysfsPwm {
        SysfsPwm::with_root("/sys/class/pwm/pwmchip0")
    }

    /// A chip rooted somewhere else, for tests.
    pub fn with_root(root: impl Into<PathBuf>) -> SysfsPwm {
        SysfsPwm {
            root: root.into(),
            exported: HashSet::new(),
        }
    }

    fn channel_dir(&self, channel: u32) -> PathBuf {
        self.root.join(format!("pwm{channel}"))
    }

    fn write(&self, channel: u32, path: PathBuf, contents: &str) -> Result<(), IoError> {
        fs::write(path, contents).map_err(|source| IoError::Pwm { channel, source })
    }
}

impl Default for SysfsPwm {
    fn default() -> SysfsPwm {
        SysfsPwm::new()
    }
}

impl Pwm for SysfsPwm {
    fn start(&mut self, channel: u32, frequency_hz: u32, duty_pct: f32) -> Result<(), IoError> {
        if !self.exported.contains(&channel) {
            if !self.channel_dir(channel).exists() {
                self.write(channel, self.root.join("export"), &channel.to_string())?;
            }
            self.exported.insert(channel);
        }
        let dir = self.channel_dir(channel);
        let period_ns = 1_000_000_000u64 / u64::from(frequency_hz.max(1));
        let duty_ns = (period_ns as f64 * f64::from(duty_pct) / 100.0) as u64;
        // The kernel refuses a duty cycle longer than the period, so the
        // period goes first.
        self.write(channel, dir.join("period"), &period_ns.to_string())?;
        self.write(channel, dir.join("duty_cycle"), &duty_ns.to_string())?;
        self.write(channel, dir.join("enable"), "1")?;
        debug!("pwm{channel} running at {frequency_hz} Hz, {duty_pct}% duty");
        Ok(())
    }

    fn stop(&mut self, channel: u32) -> Result<(), IoError> {
        self.write(channel, self.channel_dir(channel).join("enable"), "0")
    }
}

impl Drop for SysfsPwm {
    fn drop(&mut self) {
        for channel in self.exported.clone() {
            let _ = self.stop(channel);
            if let Err(err) = self.write(channel, self.root.join("unexport"), &channel.to_string())
            {
                warn!("unexporting pwm{channel} on drop failed: {err}");
            }
        }
    }
}
