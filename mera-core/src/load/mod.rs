//! Shard-parallel loaders.
//!
//! Every loader follows the same shape: validate the request against the
//! [`InfoRecord`] (no file is opened before this succeeds), decode each domain
//! file into its own [`ShardRows`] on the rayon pool, then concatenate in
//! domain order. The thread count therefore never changes the result.

pub mod amr;
pub mod clumps;
pub mod gravity;
pub mod hydro;
pub mod particles;

use crate::dataset::{Dataset, DatasetKind};
use crate::error::{MeraError, Result};
use crate::family::Family;
use crate::geometry::{Extent, SpatialRange};
use crate::info::InfoRecord;
use crate::table::{Schema, ShardRows};
use rayon::prelude::*;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

pub use clumps::getclumps;
pub use gravity::getgravity;
pub use hydro::gethydro;
pub use particles::getparticles;

#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Stored variables to materialize; all of the component when `None`.
    pub vars: Option<Vec<String>>,
    pub lmin: Option<u8>,
    pub lmax: Option<u8>,
    pub range: SpatialRange,
    /// Worker threads; the global rayon pool when `None`.
    pub threads: Option<usize>,
    /// Particle families to keep; all when `None`.
    pub families: Option<Vec<i64>>,
}

impl LoadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn vars<I, S>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.vars = Some(vars.into_iter().map(Into::into).collect());
        self
    }

    pub fn lmin(mut self, lmin: u8) -> Self {
        self.lmin = Some(lmin);
        self
    }

    pub fn lmax(mut self, lmax: u8) -> Self {
        self.lmax = Some(lmax);
        self
    }

    pub fn range(mut self, range: SpatialRange) -> Self {
        self.range = range;
        self
    }

    pub fn threads(mut self, n: usize) -> Self {
        self.threads = Some(n);
        self
    }

    pub fn families(mut self, families: impl IntoIterator<Item = i64>) -> Self {
        self.families = Some(families.into_iter().collect());
        self
    }
}

/// A request checked against the snapshot.
#[derive(Debug, Clone)]
pub(crate) struct Plan {
    /// Requested stored variables, in the component's file order.
    pub vars: Vec<String>,
    pub lmin: u8,
    pub lmax: u8,
    pub extent: Extent,
}

pub(crate) fn plan(info: &InfoRecord, kind: DatasetKind, opts: &LoadOptions) -> Result<Plan> {
    if opts.threads == Some(0) {
        return Err(MeraError::usage("thread count must be positive"));
    }
    info.require(kind.component())?;

    let lmin = opts.lmin.unwrap_or(info.levelmin);
    let lmax = opts.lmax.unwrap_or(info.levelmax);
    if lmin > lmax {
        return Err(MeraError::usage(format!("lmin {lmin} is above lmax {lmax}")));
    }
    for l in [lmin, lmax] {
        if l < info.levelmin || l > info.levelmax {
            return Err(MeraError::usage(format!(
                "level {l} outside the snapshot's [{}, {}]",
                info.levelmin, info.levelmax
            )));
        }
    }

    let available = info.variables(kind.component());
    let vars = match &opts.vars {
        None => available
            .iter()
            .filter(|v| !kind.bookkeeping().contains(&v.as_str()))
            .cloned()
            .collect(),
        Some(req) => {
            for v in req {
                if !available.contains(v) {
                    return Err(MeraError::unknown_variable(v.as_str()));
                }
            }
            available
                .iter()
                .filter(|v| req.contains(v) && !kind.bookkeeping().contains(&v.as_str()))
                .cloned()
                .collect()
        }
    };

    if let Some(ids) = &opts.families {
        if kind != DatasetKind::Particles {
            return Err(MeraError::usage("family filter applies to particles only"));
        }
        Family::check_ids(ids)?;
    }

    let extent = opts.range.resolve(info.boxlen, &info.scale)?;
    Ok(Plan {
        vars,
        lmin,
        lmax,
        extent,
    })
}

/// Decode every domain with `decode` and merge in domain order.
pub(crate) fn run_shards<F>(
    info: &InfoRecord,
    schema: &Schema,
    threads: Option<usize>,
    decode: F,
) -> Result<crate::table::Table>
where
    F: Fn(u32) -> Result<ShardRows> + Sync + Send,
{
    let started = Instant::now();
    let job = || {
        (1..=info.ncpu)
            .into_par_iter()
            .map(|icpu| {
                let rows = decode(icpu)?;
                debug!(icpu, rows = rows.len(), "decoded shard");
                Ok(rows)
            })
            .collect::<Result<Vec<_>>>()
    };
    let shards = match threads {
        Some(n) => rayon::ThreadPoolBuilder::new()
            .num_threads(n)
            .build()
            .map_err(|e| MeraError::usage(format!("cannot build thread pool: {e}")))?
            .install(job)?,
        None => job()?,
    };
    let table = schema.concat(shards)?;
    info!(
        output = info.output,
        shards = info.ncpu,
        rows = table.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "merged shards"
    );
    Ok(table)
}

pub(crate) fn finish(
    kind: DatasetKind,
    info: Arc<InfoRecord>,
    table: crate::table::Table,
    plan: Plan,
) -> Dataset {
    Dataset::new(kind, info, table, plan.vars, (plan.lmin, plan.lmax), plan.extent)
}

/// Load any component.
pub fn load(info: &Arc<InfoRecord>, kind: DatasetKind, opts: &LoadOptions) -> Result<Dataset> {
    match kind {
        DatasetKind::Hydro => gethydro(info, opts),
        DatasetKind::Gravity => getgravity(info, opts),
        DatasetKind::Particles => getparticles(info, opts),
        DatasetKind::Clumps => getclumps(info, opts),
    }
}
