//! Snapshot discovery under a simulation directory.

use crate::error::{MeraError, Result};
use serde::Serialize;
use std::path::Path;
use tracing::debug;
use walkdir::WalkDir;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OutputsReport {
    /// Every `output_NNNNN` directory, ascending.
    pub outputs: Vec<u32>,
    /// Those without their `info_NNNNN.txt`.
    pub missing_info: Vec<u32>,
}

impl OutputsReport {
    pub fn complete(&self) -> impl Iterator<Item = u32> + '_ {
        self.outputs
            .iter()
            .copied()
            .filter(|o| !self.missing_info.contains(o))
    }
}

fn output_number(name: &str) -> Option<u32> {
    let digits = name.strip_prefix("output_")?;
    if digits.len() != 5 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

pub fn check_outputs(base: &Path) -> Result<OutputsReport> {
    if !base.is_dir() {
        return Err(MeraError::missing(format!(
            "simulation directory {} does not exist",
            base.display()
        )));
    }
    let mut report = OutputsReport::default();
    for e in WalkDir::new(base).min_depth(1).max_depth(1) {
        let e = e.map_err(|e| std::io::Error::other(e.to_string()))?;
        if !e.file_type().is_dir() {
            continue;
        }
        let Some(n) = e.file_name().to_str().and_then(output_number) else {
            continue;
        };
        report.outputs.push(n);
        if !e.path().join(format!("info_{n:05}.txt")).is_file() {
            report.missing_info.push(n);
        }
    }
    report.outputs.sort_unstable();
    report.missing_info.sort_unstable();
    debug!(found = report.outputs.len(), incomplete = report.missing_info.len(), "scanned outputs");
    Ok(report)
}
