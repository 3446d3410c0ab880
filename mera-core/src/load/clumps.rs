//! Clump finder tables: whitespace separated text, one header row naming the
//! columns, one row per clump.

use super::{LoadOptions, finish, plan, run_shards};
use crate::dataset::{CLUMP_POS, CPU, Dataset, DatasetKind};
use crate::error::{MeraError, Result};
use crate::info::{Component, InfoRecord};
use crate::table::{ColumnKind, Schema, ShardRows};
use std::path::Path;
use std::sync::Arc;

/// Column names from the first non-empty line.
pub fn read_header(path: &Path) -> Result<Vec<String>> {
    let text = std::fs::read_to_string(path)?;
    let header = text
        .lines()
        .find(|l| !l.trim().is_empty())
        .ok_or_else(|| MeraError::format(format!("{}: empty clump table", path.display())))?;
    let names: Vec<String> = header.split_whitespace().map(String::from).collect();
    for p in CLUMP_POS {
        if !names.iter().any(|n| n == p) {
            return Err(MeraError::format(format!(
                "{}: clump table has no {p} column",
                path.display()
            )));
        }
    }
    Ok(names)
}

fn parse_rows(path: &Path, ncols: usize) -> Result<Vec<Vec<f64>>> {
    let text = std::fs::read_to_string(path)?;
    let mut out = Vec::new();
    for (n, line) in text.lines().filter(|l| !l.trim().is_empty()).enumerate().skip(1) {
        let row = line
            .split_whitespace()
            .map(|t| t.replace(['D', 'd'], "E").parse::<f64>())
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| MeraError::format(format!("{}: row {n}: {e}", path.display())))?;
        if row.len() != ncols {
            return Err(MeraError::format(format!(
                "{}: row {n} has {} columns, header has {ncols}",
                path.display(),
                row.len()
            )));
        }
        out.push(row);
    }
    Ok(out)
}

pub fn getclumps(info: &Arc<InfoRecord>, opts: &LoadOptions) -> Result<Dataset> {
    let plan = plan(info, DatasetKind::Clumps, opts)?;
    let header = &info.clump_vars;

    let mut schema = Schema::new();
    let mut sources: Vec<(usize, usize)> = Vec::new();
    for p in CLUMP_POS {
        let col = schema.push(p, ColumnKind::Float);
        if let Some(i) = header.iter().position(|h| h == p) {
            sources.push((i, col));
        }
    }
    let cpu = schema.push(CPU, ColumnKind::Int);
    for (i, h) in header.iter().enumerate() {
        if plan.vars.contains(h) {
            sources.push((i, schema.push(h.as_str(), ColumnKind::Float)));
        }
    }
    let pos_at = CLUMP_POS.map(|p| header.iter().position(|h| h == p).unwrap_or(0));
    let extent = plan.extent;

    let table = run_shards(info, &schema, opts.threads, |icpu| -> Result<ShardRows> {
        let path = info.shard_path(Component::Clumps, icpu);
        let mut rows = schema.shard(icpu);
        for row in parse_rows(&path, header.len())? {
            if !extent.contains(pos_at.map(|i| row[i])) {
                continue;
            }
            for &(i, col) in &sources {
                rows.push_f64(col, row[i]);
            }
            rows.push_i64(cpu, icpu as i64);
        }
        Ok(rows)
    })?;
    Ok(finish(DatasetKind::Clumps, Arc::clone(info), table, plan))
}
