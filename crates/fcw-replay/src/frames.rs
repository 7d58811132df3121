//! Detection log input and per-frame reports
//!
//! The log is JSON lines, one frame per line:
//!
//! ```text
//! {"frame": 12, "rectified": false, "detections": {"3": [610, 300, 690, 420]}}
//! ```

use anyhow::Context;
use fcw_core::{ImageBox, TrackId};
use fcw_tracker::{DangerousObject, TrackChanges};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::io::{BufRead, Lines};

/// One frame of image tracker output
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Frame {
    pub frame: u64,
    /// Overrides the configured default when present
    #[serde(default)]
    pub rectified: Option<bool>,
    #[serde(default)]
    pub detections: HashMap<TrackId, ImageBox>,
}

/// Reads frames from a JSON-lines source, skipping blank lines
pub struct FrameReader<R> {
    lines: Lines<R>,
    line_number: usize,
}

impl<R: BufRead> FrameReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line_number: 0,
        }
    }
}

impl<R: BufRead> Iterator for FrameReader<R> {
    type Item = anyhow::Result<Frame>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = self.lines.next()?;
            self.line_number += 1;
            let line_number = self.line_number;
            let line = match line.with_context(|| format!("Failed to read line {}", line_number)) {
                Ok(line) => line,
                Err(e) => return Some(Err(e)),
            };
            if line.trim().is_empty() {
                continue;
            }
            return Some(
                serde_json::from_str(&line)
                    .with_context(|| format!("Malformed frame on line {}", self.line_number)),
            );
        }
    }
}

/// Output record for one processed frame
#[derive(Debug, Clone, Serialize)]
pub struct FrameReport {
    pub frame: u64,
    /// Objects tracked after this frame
    pub tracked: usize,
    pub started: Vec<TrackId>,
    pub lost: Vec<TrackId>,
    pub dangerous: Vec<DangerousObject>,
}

impl FrameReport {
    pub fn new(
        frame: u64,
        tracked: usize,
        changes: TrackChanges,
        dangerous: BTreeMap<TrackId, DangerousObject>,
    ) -> Self {
        Self {
            frame,
            tracked,
            started: changes.started,
            lost: changes.lost,
            dangerous: dangerous.into_values().collect(),
        }
    }
}
