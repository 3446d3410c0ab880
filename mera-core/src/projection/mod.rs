//! Rasterization of cells and particles onto a uniform map.

pub mod grid;
pub mod options;

pub use grid::PixelGrid;
pub use options::{Mode, ProjectionOptions, Resolution, SURFACE_DENSITY, Weighting};

use crate::dataset::{Dataset, FAMILY};
use crate::error::{MeraError, Result};
use crate::geometry::{Axis, Extent};
use crate::getvar::{VarQuery, getvar};
use grid::Accum;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectionMap {
    pub var: String,
    /// Unit symbol the values are expressed in; empty for code units.
    pub unit: String,
    pub nx: usize,
    pub ny: usize,
    /// Row-major: pixel `(i, j)` lives at `j * nx + i`.
    pub data: Vec<f64>,
}

impl ProjectionMap {
    pub fn at(&self, i: usize, j: usize) -> f64 {
        self.data[j * self.nx + i]
    }

    pub fn total(&self) -> f64 {
        self.data.iter().sum()
    }

    pub fn max(&self) -> f64 {
        self.data.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectionResult {
    pub maps: Vec<ProjectionMap>,
    pub grid: PixelGrid,
    pub direction: Axis,
    /// Selection box in code length; the direction axis range was a pre-filter.
    pub extent: Extent,
    pub mode: Mode,
    pub lmax: u8,
    /// Rows deposited.
    pub rows: usize,
}

impl ProjectionResult {
    pub fn get(&self, var: &str) -> Option<&ProjectionMap> {
        self.maps.iter().find(|m| m.var == var)
    }
}

/// Project the variables of `opts` along `opts.direction`.
pub fn projection(ds: &Dataset, opts: &ProjectionOptions) -> Result<ProjectionResult> {
    opts.validate()?;
    let info = ds.info();
    let lmax = opts.lmax.unwrap_or(ds.lmax());
    if lmax < info.levelmin || lmax > info.levelmax {
        return Err(MeraError::usage(format!(
            "lmax {lmax} outside the snapshot's [{}, {}]",
            info.levelmin, info.levelmax
        )));
    }
    if let Some(m) = &opts.mask {
        m.check_len(ds.len())?;
    }
    if opts.families.is_some() && !ds.table().has(FAMILY) {
        return Err(MeraError::usage("family filter applies to particles only"));
    }
    let has_sd = opts.vars.iter().any(|v| v == SURFACE_DENSITY);
    if has_sd && opts.mode != Mode::Sum {
        return Err(MeraError::usage("surface density is only defined for sum projections"));
    }
    if opts.mode == Mode::WeightedMean(Weighting::Volume) && !ds.kind().is_cells() {
        return Err(MeraError::usage("volume weighting needs cell data"));
    }
    let units: Vec<&str> = if opts.units.is_empty() {
        vec![""; opts.vars.len()]
    } else {
        opts.units.iter().map(String::as_str).collect()
    };

    let extent = opts.range.resolve(ds.boxlen(), ds.scale())?;
    let res = opts.resolution.clone().unwrap_or_else(|| {
        let p = info.cellsize(lmax);
        let (a, b) = opts.direction.plane();
        Resolution::Dims(
            ((extent.width(a) / p) - 1e-9).ceil().max(1.0) as usize,
            ((extent.width(b) / p) - 1e-9).ceil().max(1.0) as usize,
        )
    });
    let grid = PixelGrid::new(&extent, opts.direction, &res, ds.boxlen(), ds.scale())?;

    // Per variable values in their output unit; sd carries code mass for now.
    let mut columns = Vec::with_capacity(opts.vars.len());
    let mut sd_factors = Vec::with_capacity(opts.vars.len());
    for (v, u) in opts.vars.iter().zip(&units) {
        if v == SURFACE_DENSITY {
            let factor = ds.scale().resolve(u)?;
            columns.push(getvar(ds, &VarQuery::new("mass"))?.remove(0));
            sd_factors.push(Some(factor));
        } else {
            columns.push(getvar(ds, &VarQuery::new(v.as_str()).unit(*u))?.remove(0));
            sd_factors.push(None);
        }
    }
    let weights: Option<Vec<f64>> = match opts.mode {
        Mode::WeightedMean(Weighting::Mass) => Some(ds.getvar("mass", "")?),
        Mode::WeightedMean(Weighting::Volume) => Some(ds.getvar("volume", "")?),
        _ => None,
    };

    let [px, py, pz] = ds.positions()?;
    let halves: Option<Vec<f64>> = if ds.kind().is_cells() {
        Some(ds.cellsizes()?.into_iter().map(|d| 0.5 * d).collect())
    } else {
        None
    };
    let families = match &opts.families {
        Some(_) => Some(ds.table().i64s(FAMILY)?),
        None => None,
    };
    let selected: Vec<usize> = (0..ds.len())
        .filter(|&i| opts.mask.as_ref().is_none_or(|m| m.as_slice()[i]))
        .filter(|&i| match (&opts.families, families) {
            (Some(keep), Some(fam)) => keep.contains(&fam[i]),
            _ => true,
        })
        .filter(|&i| extent.contains([px[i], py[i], pz[i]]))
        .collect();

    debug!(
        nx = grid.nx,
        ny = grid.ny,
        pixel = grid.pixel[0],
        rows = selected.len(),
        "projection grid"
    );

    let (a, b) = opts.direction.plane();
    let pos = [&px, &py, &pz];
    let (pa, pb) = (pos[a.index()], pos[b.index()]);
    let nvars = columns.len();
    let npix = grid.len();
    let mode = opts.mode;

    let acc = selected
        .par_iter()
        .fold(
            || Accum::new(mode, nvars, npix),
            |mut acc, &i| {
                let vals: Vec<f64> = columns.iter().map(|c| c[i]).collect();
                let w = weights.as_ref().map_or(1.0, |w| w[i]);
                match &halves {
                    Some(h) => {
                        let mut sa = std::mem::take(&mut acc.scratch.0);
                        let mut sb = std::mem::take(&mut acc.scratch.1);
                        grid.overlaps(0, pa[i], h[i], &mut sa);
                        grid.overlaps(1, pb[i], h[i], &mut sb);
                        for &(jb, fb) in &sb {
                            for &(ia, fa) in &sa {
                                acc.deposit(jb * grid.nx + ia, fa * fb, w, &vals);
                            }
                        }
                        acc.scratch = (sa, sb);
                    }
                    None => {
                        if let Some((ia, ja)) = grid.locate([pa[i], pb[i]]) {
                            acc.deposit(ja * grid.nx + ia, 1.0, w, &vals);
                        }
                    }
                }
                acc
            },
        )
        .reduce(|| Accum::new(mode, nvars, npix), Accum::merge);

    let area = grid.pixel_area();
    let maps = acc
        .finish()
        .into_iter()
        .zip(opts.vars.iter().zip(&units))
        .zip(sd_factors)
        .map(|((mut data, (v, u)), sd)| {
            if let Some(f) = sd {
                data.iter_mut().for_each(|x| *x *= f / area);
            }
            ProjectionMap {
                var: v.clone(),
                unit: u.to_string(),
                nx: grid.nx,
                ny: grid.ny,
                data,
            }
        })
        .collect();

    info!(
        vars = ?opts.vars,
        direction = ?opts.direction,
        nx = grid.nx,
        ny = grid.ny,
        rows = selected.len(),
        "projection done"
    );
    Ok(ProjectionResult {
        maps,
        grid,
        direction: opts.direction,
        extent,
        mode,
        lmax,
        rows: selected.len(),
    })
}
