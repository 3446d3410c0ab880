use crate::error::{MeraError, Result};
use crate::family::Family;
use crate::geometry::{Axis, RangeUnit, SpatialRange};
use crate::getvar::Mask;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Surface density: summed mass over pixel area.
pub const SURFACE_DENSITY: &str = "sd";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Resolution {
    /// Pixels along the longer side of the map; square pixels.
    Pixels(usize),
    Dims(usize, usize),
    /// Square pixels of this edge length.
    PixelSize { size: f64, unit: RangeUnit },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Weighting {
    Mass,
    Volume,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mode {
    Sum,
    Mean,
    WeightedMean(Weighting),
    Max,
}

impl FromStr for Weighting {
    type Err = MeraError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "mass" => Ok(Self::Mass),
            "volume" => Ok(Self::Volume),
            other => Err(MeraError::usage(format!("unknown weighting {other:?}"))),
        }
    }
}

impl FromStr for Mode {
    type Err = MeraError;

    /// `sum`, `mean`, `max`, or `weighted:<mass|volume>`.
    fn from_str(s: &str) -> Result<Self> {
        match s {
            "sum" => Ok(Self::Sum),
            "mean" => Ok(Self::Mean),
            "max" => Ok(Self::Max),
            other => match other.strip_prefix("weighted:") {
                Some(w) => Ok(Self::WeightedMean(w.parse()?)),
                None => Err(MeraError::usage(format!("unknown projection mode {other:?}"))),
            },
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProjectionOptions {
    pub vars: Vec<String>,
    /// Empty, or one unit per variable.
    pub units: Vec<String>,
    /// Defaults to one pixel per `lmax` cell across the map.
    pub resolution: Option<Resolution>,
    pub direction: Axis,
    pub range: SpatialRange,
    /// Finest level used for the default resolution; the dataset's lmax when `None`.
    pub lmax: Option<u8>,
    pub mode: Mode,
    pub mask: Option<Mask>,
    pub families: Option<Vec<i64>>,
}

impl Default for ProjectionOptions {
    fn default() -> Self {
        Self {
            vars: Vec::new(),
            units: Vec::new(),
            resolution: None,
            direction: Axis::Z,
            range: SpatialRange::default(),
            lmax: None,
            mode: Mode::Sum,
            mask: None,
            families: None,
        }
    }
}

impl ProjectionOptions {
    pub fn new<I, S>(vars: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            vars: vars.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    pub fn units<I, S>(mut self, units: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.units = units.into_iter().map(Into::into).collect();
        self
    }

    pub fn resolution(mut self, r: Resolution) -> Self {
        self.resolution = Some(r);
        self
    }

    pub fn pixels(self, n: usize) -> Self {
        self.resolution(Resolution::Pixels(n))
    }

    pub fn direction(mut self, axis: Axis) -> Self {
        self.direction = axis;
        self
    }

    pub fn range(mut self, range: SpatialRange) -> Self {
        self.range = range;
        self
    }

    pub fn lmax(mut self, lmax: u8) -> Self {
        self.lmax = Some(lmax);
        self
    }

    pub fn mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    pub fn mask(mut self, mask: impl Into<Mask>) -> Self {
        self.mask = Some(mask.into());
        self
    }

    pub fn families(mut self, families: impl IntoIterator<Item = i64>) -> Self {
        self.families = Some(families.into_iter().collect());
        self
    }

    /// Checks that need no data.
    pub fn validate(&self) -> Result<()> {
        if self.vars.is_empty() {
            return Err(MeraError::usage("no variable to project"));
        }
        if !self.units.is_empty() && self.units.len() != self.vars.len() {
            return Err(MeraError::usage(format!(
                "{} units given for {} variables",
                self.units.len(),
                self.vars.len()
            )));
        }
        match &self.resolution {
            Some(Resolution::Pixels(0)) | Some(Resolution::Dims(0, _)) | Some(Resolution::Dims(_, 0)) => {
                return Err(MeraError::usage("resolution must be positive"));
            }
            Some(Resolution::PixelSize { size, .. }) if !(*size > 0.0) => {
                return Err(MeraError::usage(format!("pixel size must be positive, got {size}")));
            }
            _ => {}
        }
        if let Some(ids) = &self.families {
            Family::check_ids(ids)?;
        }
        self.range.validate()
    }
}
