//! The append-only run log.
//!
//! One line per event, prefixed with a local timestamp. The file is
//! opened for append so successive runs accumulate into a history.

use std::fs::{File, OpenOptions};
use std::io::Write as _;
use std::path::Path;

use chrono::Local;
use log::warn;

pub struct RunLog {
    file: File,
}

impl RunLog {
    pub fn open(path: &Path) -> std::io::Result<RunLog> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(RunLog { file })
    }

    /// Append one record. A write failure is reported but never aborts
    /// a run that is already moving hardware.
    pub fn line(&mut self, text: &str) {
        let stamp = Local::now().format("%Y-%m-%d %H:%M:%S");
        if let Err(err) = writeln!(self.file, "{stamp} | {text}") {
            warn!("run log write failed: {err}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn appends_across_reopens() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("runs.log");
        {
            let mut log = RunLog::open(&path).unwrap();
            log.line("first");
        }
        {
            let mut log = RunLog::open(&path).unwrap();
            log.line("second");
        }
        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("| first"));
        assert!(lines[1].ends_with("| second"));
    }
}
