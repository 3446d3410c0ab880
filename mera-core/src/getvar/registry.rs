//! Closed catalogue of derived quantities.
//!
//! Each entry names the stored columns it needs per dataset kind and computes
//! its value in code units from a [`Frame`]. Unit conversion happens later.

use crate::dataset::{Dataset, DatasetKind};
use crate::error::{MeraError, Result};
use serde::Serialize;

/// A dataset restricted to an optional row subset, seen from a centre.
pub(crate) struct Frame<'a> {
    ds: &'a Dataset,
    rows: Option<&'a [usize]>,
    center: [f64; 3],
}

impl<'a> Frame<'a> {
    pub fn new(ds: &'a Dataset, rows: Option<&'a [usize]>, center: [f64; 3]) -> Self {
        Self { ds, rows, center }
    }

    pub fn len(&self) -> usize {
        self.rows.map_or(self.ds.len(), <[usize]>::len)
    }

    fn gather(&self, full: &[f64]) -> Vec<f64> {
        match self.rows {
            Some(rows) => rows.iter().map(|&i| full[i]).collect(),
            None => full.to_vec(),
        }
    }

    pub fn stored(&self, name: &str) -> Result<Vec<f64>> {
        Ok(self.gather(&self.ds.table().f64s(name)?))
    }

    /// Positions relative to the frame centre, code length.
    pub fn positions(&self) -> Result<[Vec<f64>; 3]> {
        let abs = self.ds.positions()?;
        let mut out: [Vec<f64>; 3] = Default::default();
        for k in 0..3 {
            out[k] = self.gather(&abs[k]).into_iter().map(|x| x - self.center[k]).collect();
        }
        Ok(out)
    }

    fn velocities(&self) -> Result<[Vec<f64>; 3]> {
        Ok([self.stored("vx")?, self.stored("vy")?, self.stored("vz")?])
    }

    /// Value of `key` in code units: position keys and registry entries are
    /// computed, other stored columns are read as is.
    pub fn var(&self, key: &str) -> Result<Vec<f64>> {
        if let Some(d) = Derived::from_key(key) {
            if d.is_positional() || !self.ds.table().has(key) {
                return d.compute(self);
            }
        }
        if self.ds.table().has(key) {
            return self.stored(key);
        }
        Err(MeraError::unknown_variable(key))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Derived {
    CellSize,
    Volume,
    Mass,
    V,
    V2,
    Ekin,
    Etherm,
    Cs,
    Mach,
    T,
    RSphere,
    RCylinder,
    VrSphere,
    VrCylinder,
    VphiCylinder,
    X,
    Y,
    Z,
    AMagnitude,
    Age,
}

const CELLS: &[DatasetKind] = &[DatasetKind::Hydro, DatasetKind::Gravity];
const HYDRO: &[DatasetKind] = &[DatasetKind::Hydro];
const MOVING: &[DatasetKind] = &[DatasetKind::Hydro, DatasetKind::Particles];
const ANY: &[DatasetKind] = &DatasetKind::ALL;

impl Derived {
    pub const ALL: [Derived; 20] = [
        Self::CellSize,
        Self::Volume,
        Self::Mass,
        Self::V,
        Self::V2,
        Self::Ekin,
        Self::Etherm,
        Self::Cs,
        Self::Mach,
        Self::T,
        Self::RSphere,
        Self::RCylinder,
        Self::VrSphere,
        Self::VrCylinder,
        Self::VphiCylinder,
        Self::X,
        Self::Y,
        Self::Z,
        Self::AMagnitude,
        Self::Age,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Self::CellSize => "cellsize",
            Self::Volume => "volume",
            Self::Mass => "mass",
            Self::V => "v",
            Self::V2 => "v2",
            Self::Ekin => "ekin",
            Self::Etherm => "etherm",
            Self::Cs => "cs",
            Self::Mach => "mach",
            Self::T => "T",
            Self::RSphere => "r_sphere",
            Self::RCylinder => "r_cylinder",
            Self::VrSphere => "vr_sphere",
            Self::VrCylinder => "vr_cylinder",
            Self::VphiCylinder => "vphi_cylinder",
            Self::X => "x",
            Self::Y => "y",
            Self::Z => "z",
            Self::AMagnitude => "a_magnitude",
            Self::Age => "age",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|d| d.key() == key)
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::CellSize => "cell edge length",
            Self::Volume => "cell volume",
            Self::Mass => "gas mass of the cell",
            Self::V => "speed",
            Self::V2 => "squared speed",
            Self::Ekin => "kinetic energy",
            Self::Etherm => "thermal energy of the cell",
            Self::Cs => "adiabatic sound speed",
            Self::Mach => "Mach number",
            Self::T => "temperature (p/rho)",
            Self::RSphere => "distance to the centre",
            Self::RCylinder => "distance to the centre in the xy plane",
            Self::VrSphere => "radial velocity",
            Self::VrCylinder => "cylindrical radial velocity",
            Self::VphiCylinder => "azimuthal velocity",
            Self::X | Self::Y | Self::Z => "position relative to the centre",
            Self::AMagnitude => "acceleration magnitude",
            Self::Age => "particle age",
        }
    }

    fn is_positional(self) -> bool {
        matches!(self, Self::X | Self::Y | Self::Z)
    }

    pub fn kinds(self) -> &'static [DatasetKind] {
        match self {
            Self::CellSize | Self::Volume => CELLS,
            Self::Mass | Self::Etherm | Self::Cs | Self::Mach | Self::T => HYDRO,
            Self::V | Self::V2 | Self::Ekin => MOVING,
            Self::VrSphere | Self::VrCylinder | Self::VphiCylinder => MOVING,
            Self::RSphere | Self::RCylinder | Self::X | Self::Y | Self::Z => ANY,
            Self::AMagnitude => &[DatasetKind::Gravity],
            Self::Age => &[DatasetKind::Particles],
        }
    }

    /// Stored columns the computation reads for `kind`.
    pub fn requires(self, kind: DatasetKind) -> &'static [&'static str] {
        match (self, kind) {
            (Self::Mass, _) => &["rho"],
            (Self::Ekin, DatasetKind::Hydro) => &["rho", "vx", "vy", "vz"],
            (Self::Ekin, _) => &["mass", "vx", "vy", "vz"],
            (Self::V | Self::V2 | Self::VrSphere | Self::VrCylinder | Self::VphiCylinder, _) => {
                &["vx", "vy", "vz"]
            }
            (Self::Etherm, _) => &["p"],
            (Self::Cs | Self::T, _) => &["rho", "p"],
            (Self::Mach, _) => &["rho", "vx", "vy", "vz", "p"],
            (Self::AMagnitude, _) => &["ax", "ay", "az"],
            (Self::Age, _) => &["birth"],
            _ => &[],
        }
    }

    pub fn available_for(self, ds: &Dataset) -> bool {
        self.kinds().contains(&ds.kind())
            && self.requires(ds.kind()).iter().all(|c| ds.table().has(c))
    }

    pub(crate) fn compute(self, f: &Frame<'_>) -> Result<Vec<f64>> {
        if !self.kinds().contains(&f.ds.kind()) {
            return Err(MeraError::unknown_variable(format!(
                "{} for {} data",
                self.key(),
                f.ds.kind()
            )));
        }
        let gamma = f.ds.info().gamma;
        let out = match self {
            Self::CellSize => f.gather(&f.ds.cellsizes()?),
            Self::Volume => f.gather(&f.ds.cellsizes()?).into_iter().map(|d| d * d * d).collect(),
            Self::Mass => zip_map(&f.stored("rho")?, &Self::Volume.compute(f)?, |r, v| r * v),
            Self::V2 => {
                let [vx, vy, vz] = f.velocities()?;
                (0..vx.len()).map(|i| vx[i] * vx[i] + vy[i] * vy[i] + vz[i] * vz[i]).collect()
            }
            Self::V => Self::V2.compute(f)?.into_iter().map(f64::sqrt).collect(),
            Self::Ekin => zip_map(&f.var("mass")?, &Self::V2.compute(f)?, |m, v2| 0.5 * m * v2),
            Self::Etherm => zip_map(&f.stored("p")?, &Self::Volume.compute(f)?, |p, v| {
                p / (gamma - 1.0) * v
            }),
            Self::Cs => zip_map(&f.stored("p")?, &f.stored("rho")?, |p, r| (gamma * p / r).sqrt()),
            Self::Mach => zip_map(&Self::V.compute(f)?, &Self::Cs.compute(f)?, |v, c| v / c),
            Self::T => zip_map(&f.stored("p")?, &f.stored("rho")?, |p, r| p / r),
            Self::RSphere => {
                let [x, y, z] = f.positions()?;
                (0..x.len()).map(|i| (x[i] * x[i] + y[i] * y[i] + z[i] * z[i]).sqrt()).collect()
            }
            Self::RCylinder => {
                let [x, y, _] = f.positions()?;
                zip_map(&x, &y, f64::hypot)
            }
            Self::VrSphere => {
                let [x, y, z] = f.positions()?;
                let [vx, vy, vz] = f.velocities()?;
                (0..x.len())
                    .map(|i| {
                        let r = (x[i] * x[i] + y[i] * y[i] + z[i] * z[i]).sqrt();
                        if r == 0.0 {
                            0.0
                        } else {
                            (x[i] * vx[i] + y[i] * vy[i] + z[i] * vz[i]) / r
                        }
                    })
                    .collect()
            }
            Self::VrCylinder | Self::VphiCylinder => {
                let [x, y, _] = f.positions()?;
                let [vx, vy, _] = f.velocities()?;
                let radial = self == Self::VrCylinder;
                (0..x.len())
                    .map(|i| {
                        let rc = x[i].hypot(y[i]);
                        if rc == 0.0 {
                            0.0
                        } else if radial {
                            (x[i] * vx[i] + y[i] * vy[i]) / rc
                        } else {
                            (x[i] * vy[i] - y[i] * vx[i]) / rc
                        }
                    })
                    .collect()
            }
            Self::X | Self::Y | Self::Z => {
                let [x, y, z] = f.positions()?;
                match self {
                    Self::X => x,
                    Self::Y => y,
                    _ => z,
                }
            }
            Self::AMagnitude => {
                let (ax, ay, az) = (f.stored("ax")?, f.stored("ay")?, f.stored("az")?);
                (0..ax.len())
                    .map(|i| (ax[i] * ax[i] + ay[i] * ay[i] + az[i] * az[i]).sqrt())
                    .collect()
            }
            Self::Age => {
                let now = f.ds.info().time;
                f.stored("birth")?.into_iter().map(|b| now - b).collect()
            }
        };
        Ok(out)
    }
}

fn zip_map(a: &[f64], b: &[f64], op: impl Fn(f64, f64) -> f64) -> Vec<f64> {
    a.iter().zip(b).map(|(&x, &y)| op(x, y)).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum VarSource {
    Stored,
    Derived,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VariableInfo {
    pub key: String,
    pub source: VarSource,
    pub description: &'static str,
}

/// Every key [`super::getvar`] accepts for this dataset.
pub fn known_variables(ds: &Dataset) -> Vec<VariableInfo> {
    let mut out: Vec<VariableInfo> = ds
        .table()
        .names()
        .iter()
        .filter(|n| Derived::from_key(n).is_none_or(|d| !d.is_positional()))
        .map(|n| VariableInfo {
            key: n.clone(),
            source: VarSource::Stored,
            description: "",
        })
        .collect();
    for d in Derived::ALL {
        if d.available_for(ds) && !out.iter().any(|v| v.key == d.key()) {
            out.push(VariableInfo {
                key: d.key().to_string(),
                source: VarSource::Derived,
                description: d.description(),
            });
        }
    }
    out
}

/// Registry keys per dataset kind, independent of loaded columns.
pub fn derived_keys(kind: DatasetKind) -> Vec<&'static str> {
    Derived::ALL
        .into_iter()
        .filter(|d| d.kinds().contains(&kind))
        .map(Derived::key)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_round_trip() {
        for d in Derived::ALL {
            assert_eq!(Derived::from_key(d.key()), Some(d));
        }
        assert_eq!(Derived::from_key("nope"), None);
    }

    #[test]
    fn per_kind_registry() {
        let hydro = derived_keys(DatasetKind::Hydro);
        assert!(hydro.contains(&"mach") && hydro.contains(&"cellsize"));
        assert!(!hydro.contains(&"age"));
        let parts = derived_keys(DatasetKind::Particles);
        assert!(parts.contains(&"age") && !parts.contains(&"volume"));
        assert!(derived_keys(DatasetKind::Gravity).contains(&"a_magnitude"));
    }
}
