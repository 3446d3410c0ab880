//! Loaded snapshot data: a row [`Table`] plus the metadata it was built from.

use crate::error::{MeraError, Result};
use crate::geometry::{Extent, cell_center};
use crate::info::{Component, InfoRecord};
use crate::table::Table;
use crate::units::ScaleSet;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

pub const LEVEL: &str = "level";
pub const CPU: &str = "cpu";
pub const FAMILY: &str = "family";
pub const CELL_INDEX: [&str; 3] = ["cx", "cy", "cz"];
pub const PARTICLE_POS: [&str; 3] = ["x", "y", "z"];
pub const CLUMP_POS: [&str; 3] = ["peak_x", "peak_y", "peak_z"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DatasetKind {
    Hydro,
    Gravity,
    Particles,
    Clumps,
}

impl DatasetKind {
    pub const ALL: [DatasetKind; 4] = [Self::Hydro, Self::Gravity, Self::Particles, Self::Clumps];

    pub fn component(self) -> Component {
        match self {
            Self::Hydro => Component::Hydro,
            Self::Gravity => Component::Gravity,
            Self::Particles => Component::Particles,
            Self::Clumps => Component::Clumps,
        }
    }

    /// Rows are AMR cells with integer grid indices.
    pub fn is_cells(self) -> bool {
        matches!(self, Self::Hydro | Self::Gravity)
    }

    /// Columns every dataset of this kind carries regardless of the request.
    pub fn bookkeeping(self) -> &'static [&'static str] {
        match self {
            Self::Hydro | Self::Gravity => &[LEVEL, "cx", "cy", "cz", CPU],
            Self::Particles => &["x", "y", "z", LEVEL, FAMILY, CPU],
            Self::Clumps => &["peak_x", "peak_y", "peak_z", CPU],
        }
    }
}

impl fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Hydro => "hydro",
            Self::Gravity => "gravity",
            Self::Particles => "particles",
            Self::Clumps => "clumps",
        })
    }
}

impl FromStr for DatasetKind {
    type Err = MeraError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "hydro" => Ok(Self::Hydro),
            "gravity" => Ok(Self::Gravity),
            "particles" => Ok(Self::Particles),
            "clumps" => Ok(Self::Clumps),
            other => Err(MeraError::usage(format!("unknown data kind {other:?}"))),
        }
    }
}

/// Immutable loaded data. Selections produce new datasets sharing the
/// snapshot metadata.
#[derive(Debug, Clone)]
pub struct Dataset {
    kind: DatasetKind,
    info: Arc<InfoRecord>,
    scale: Arc<ScaleSet>,
    table: Table,
    variables: Vec<String>,
    lmin: u8,
    lmax: u8,
    bounds: Extent,
}

impl Dataset {
    pub(crate) fn new(
        kind: DatasetKind,
        info: Arc<InfoRecord>,
        table: Table,
        variables: Vec<String>,
        (lmin, lmax): (u8, u8),
        bounds: Extent,
    ) -> Self {
        let scale = Arc::new(info.scale.clone());
        Self {
            kind,
            info,
            scale,
            table,
            variables,
            lmin,
            lmax,
            bounds,
        }
    }

    /// Same metadata, different rows.
    pub(crate) fn with_table(&self, table: Table) -> Self {
        Self {
            kind: self.kind,
            info: Arc::clone(&self.info),
            scale: Arc::clone(&self.scale),
            table,
            variables: self.variables.clone(),
            lmin: self.lmin,
            lmax: self.lmax,
            bounds: self.bounds,
        }
    }

    pub fn kind(&self) -> DatasetKind {
        self.kind
    }

    pub fn info(&self) -> &Arc<InfoRecord> {
        &self.info
    }

    pub fn scale(&self) -> &ScaleSet {
        &self.scale
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    /// Stored variables materialized at load time, bookkeeping excluded.
    pub fn variables(&self) -> &[String] {
        &self.variables
    }

    pub fn lmin(&self) -> u8 {
        self.lmin
    }

    pub fn lmax(&self) -> u8 {
        self.lmax
    }

    /// Spatial bounds applied while loading, in code length.
    pub fn bounds(&self) -> Extent {
        self.bounds
    }

    pub fn boxlen(&self) -> f64 {
        self.info.boxlen
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Keep rows whose flag is true.
    pub fn filter(&self, keep: &[bool]) -> Result<Dataset> {
        if keep.len() != self.len() {
            return Err(MeraError::usage(format!(
                "mask has {} entries, dataset has {} rows",
                keep.len(),
                self.len()
            )));
        }
        Ok(self.with_table(self.table.filter(keep)))
    }

    /// Cell size in code length per row. Cells only.
    pub fn cellsizes(&self) -> Result<Vec<f64>> {
        if !self.kind.is_cells() {
            return Err(MeraError::unknown_variable(format!("cellsize for {}", self.kind)));
        }
        let boxlen = self.boxlen();
        Ok(self
            .table
            .i64s(LEVEL)?
            .iter()
            .map(|&l| boxlen / 2f64.powi(l as i32))
            .collect())
    }

    /// Absolute row positions in code length, one vector per axis.
    pub fn positions(&self) -> Result<[Vec<f64>; 3]> {
        match self.kind {
            DatasetKind::Hydro | DatasetKind::Gravity => {
                let boxlen = self.boxlen();
                let level = self.table.i64s(LEVEL)?;
                let mut out: [Vec<f64>; 3] = Default::default();
                for (k, name) in CELL_INDEX.iter().enumerate() {
                    let idx = self.table.i64s(name)?;
                    out[k] = idx
                        .iter()
                        .zip(level)
                        .map(|(&i, &l)| cell_center(i, l, boxlen))
                        .collect();
                }
                Ok(out)
            }
            DatasetKind::Particles => self.float_triplet(PARTICLE_POS),
            DatasetKind::Clumps => self.float_triplet(CLUMP_POS),
        }
    }

    fn float_triplet(&self, names: [&str; 3]) -> Result<[Vec<f64>; 3]> {
        Ok([
            self.table.f64s(names[0])?.into_owned(),
            self.table.f64s(names[1])?.into_owned(),
            self.table.f64s(names[2])?.into_owned(),
        ])
    }
}
