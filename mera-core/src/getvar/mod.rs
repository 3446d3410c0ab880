//! Stored and derived quantities, unit aware.

pub mod mask;
pub mod query;
pub mod registry;

pub use mask::Mask;
pub use query::VarQuery;
pub use registry::{Derived, VarSource, VariableInfo, derived_keys, known_variables};

use crate::dataset::Dataset;
use crate::error::{MeraError, Result};
use registry::Frame;

/// Resolve every variable of `q` against `ds`.
///
/// All arguments are checked before anything is computed. The returned
/// vectors are row aligned with each other.
pub fn getvar(ds: &Dataset, q: &VarQuery) -> Result<Vec<Vec<f64>>> {
    if q.vars.is_empty() {
        return Err(MeraError::usage("no variable requested"));
    }
    if !q.units.is_empty() && q.units.len() != q.vars.len() {
        return Err(MeraError::usage(format!(
            "{} units given for {} variables",
            q.units.len(),
            q.vars.len()
        )));
    }
    for v in &q.vars {
        let known = ds.table().has(v)
            || Derived::from_key(v).is_some_and(|d| d.kinds().contains(&ds.kind()));
        if !known {
            return Err(MeraError::unknown_variable(v.as_str()));
        }
        if let Some(d) = Derived::from_key(v) {
            if let Some(col) = d.requires(ds.kind()).iter().find(|c| !ds.table().has(c)) {
                if !ds.table().has(v) {
                    return Err(MeraError::unknown_variable(format!("{col} (needed by {v})")));
                }
            }
        }
    }
    let factors = if q.units.is_empty() {
        vec![1.0; q.vars.len()]
    } else {
        q.units
            .iter()
            .map(|u| ds.scale().resolve(u))
            .collect::<Result<Vec<_>>>()?
    };
    if let Some(rows) = &q.rows {
        if let Some(&bad) = rows.iter().find(|&&r| r >= ds.len()) {
            return Err(MeraError::usage(format!(
                "row {bad} out of range for {} rows",
                ds.len()
            )));
        }
    }
    let frame = Frame::new(ds, q.rows.as_deref(), q.center.resolve(ds.boxlen(), ds.scale())?);
    if let Some(m) = &q.mask {
        m.check_len(frame.len())?;
    }

    q.vars
        .iter()
        .zip(factors)
        .map(|(v, f)| {
            let mut values = frame.var(v)?;
            if f != 1.0 {
                values.iter_mut().for_each(|x| *x *= f);
            }
            Ok(match &q.mask {
                Some(m) => m.apply(&values),
                None => values,
            })
        })
        .collect()
}

impl Dataset {
    /// One variable over all rows, in `unit` (`""` or `"standard"` for code units).
    pub fn getvar(&self, var: &str, unit: &str) -> Result<Vec<f64>> {
        let mut out = getvar(self, &VarQuery::new(var).unit(unit))?;
        Ok(out.remove(0))
    }
}
