//! Dated audit logs for the tools that move files around
//!
//! Each run appends to its own timestamped file so a sorting mistake can be
//! traced afterwards. Messages also echo to the terminal in color.

use crate::errors::Result;
use chrono::Local;
use colored::Colorize;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

pub struct RunLog {
    file: File,
    path: PathBuf,
}

impl RunLog {
    /// Create `{dir}/{prefix}_{YYYYMMDD_HHMMSS}.log`, creating the directory on demand
    pub fn create(dir: &Path, prefix: &str) -> Result<Self> {
        std::fs::create_dir_all(dir)?;
        let stamp = Local::now().format("%Y%m%d_%H%M%S");
        let path = dir.join(format!("{}_{}.log", prefix, stamp));
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self { file, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn info(&mut self, message: &str) {
        println!("   {} {}", "[INFO]".cyan(), message);
        self.append("INFO", message);
    }

    pub fn warn(&mut self, message: &str) {
        println!("   {} {}", "[WARN]".yellow(), message);
        self.append("WARN", message);
    }

    fn append(&mut self, level: &str, message: &str) {
        let stamp = Local::now().format("%Y-%m-%d %H:%M:%S");
        // A failed log write must not abort the run it documents
        let _ = writeln!(self.file, "{} - {} - {}", stamp, level, message);
    }
}
