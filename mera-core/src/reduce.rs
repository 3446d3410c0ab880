//! Whole-dataset reductions.

use crate::dataset::Dataset;
use crate::error::{MeraError, Result};

/// Total mass in `unit`; zero for an empty dataset.
pub fn msum(ds: &Dataset, unit: &str) -> Result<f64> {
    Ok(ds.getvar("mass", unit)?.iter().sum())
}

/// Code-unit masses and their total, which must be positive.
fn masses(ds: &Dataset, what: &str) -> Result<(Vec<f64>, f64)> {
    let m = ds.getvar("mass", "")?;
    let total: f64 = m.iter().sum();
    if ds.is_empty() || total == 0.0 {
        return Err(MeraError::EmptySelection(format!(
            "{what} of {} rows with total mass {total}",
            ds.len()
        )));
    }
    Ok((m, total))
}

fn weighted_mean(m: &[f64], total: f64, v: &[f64]) -> f64 {
    m.iter().zip(v).map(|(a, b)| a * b).sum::<f64>() / total
}

/// Mass-weighted mean position, absolute, in length `unit`.
pub fn center_of_mass(ds: &Dataset, unit: &str) -> Result<[f64; 3]> {
    let factor = ds.scale().resolve(unit)?;
    let (m, total) = masses(ds, "center of mass")?;
    let pos = ds.positions()?;
    Ok(pos.map(|p| weighted_mean(&m, total, &p) * factor))
}

/// Mass-weighted mean velocity in velocity `unit`.
pub fn bulk_velocity(ds: &Dataset, unit: &str) -> Result<[f64; 3]> {
    let factor = ds.scale().resolve(unit)?;
    let (m, total) = masses(ds, "bulk velocity")?;
    let mut out = [0.0; 3];
    for (k, c) in ["vx", "vy", "vz"].iter().enumerate() {
        out[k] = weighted_mean(&m, total, &ds.getvar(c, "")?) * factor;
    }
    Ok(out)
}
