use crate::error::{MeraError, Result};
use crate::units::ScaleSet;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub fn index(self) -> usize {
        match self {
            Self::X => 0,
            Self::Y => 1,
            Self::Z => 2,
        }
    }

    /// The two axes spanning the plane perpendicular to `self`.
    pub fn plane(self) -> (Axis, Axis) {
        match self {
            Self::X => (Self::Y, Self::Z),
            Self::Y => (Self::X, Self::Z),
            Self::Z => (Self::X, Self::Y),
        }
    }
}

impl FromStr for Axis {
    type Err = MeraError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "x" | "X" => Ok(Self::X),
            "y" | "Y" => Ok(Self::Y),
            "z" | "Z" => Ok(Self::Z),
            other => Err(MeraError::usage(format!("unknown direction {other:?}"))),
        }
    }
}

/// How lengths in ranges, radii and centres are expressed.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum RangeUnit {
    /// Fractions of the box length.
    #[default]
    BoxFraction,
    /// Code length units.
    Code,
    /// A length unit of the [`ScaleSet`] (`kpc`, `pc`, ...).
    Named(String),
}

impl RangeUnit {
    pub fn named(unit: &str) -> Self {
        Self::Named(unit.to_string())
    }

    /// Multiplier turning a length in this unit into code length.
    pub fn to_code(&self, boxlen: f64, scale: &ScaleSet) -> Result<f64> {
        match self {
            Self::BoxFraction => Ok(boxlen),
            Self::Code => Ok(1.0),
            Self::Named(u) => Ok(1.0 / scale.resolve(u)?),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum Center {
    #[default]
    Origin,
    BoxCenter,
    At { coords: [f64; 3], unit: RangeUnit },
}

impl Center {
    pub fn at(coords: [f64; 3], unit: RangeUnit) -> Self {
        Self::At { coords, unit }
    }

    /// Centre in code length.
    pub fn resolve(&self, boxlen: f64, scale: &ScaleSet) -> Result<[f64; 3]> {
        match self {
            Self::Origin => Ok([0.0; 3]),
            Self::BoxCenter => Ok([boxlen / 2.0; 3]),
            Self::At { coords, unit } => {
                let f = unit.to_code(boxlen, scale)?;
                Ok(coords.map(|c| c * f))
            }
        }
    }
}

/// Axis-aligned box in code length, bounds inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Extent {
    pub lo: [f64; 3],
    pub hi: [f64; 3],
}

impl Extent {
    pub fn full(boxlen: f64) -> Self {
        Self {
            lo: [0.0; 3],
            hi: [boxlen; 3],
        }
    }

    #[inline]
    pub fn contains(&self, p: [f64; 3]) -> bool {
        (0..3).all(|k| self.lo[k] <= p[k] && p[k] <= self.hi[k])
    }

    pub fn width(&self, axis: Axis) -> f64 {
        self.hi[axis.index()] - self.lo[axis.index()]
    }

    pub fn intersect(&self, other: &Extent) -> Extent {
        let mut out = *self;
        for k in 0..3 {
            out.lo[k] = out.lo[k].max(other.lo[k]);
            out.hi[k] = out.hi[k].min(other.hi[k]);
        }
        out
    }
}

/// Optional per-axis ranges relative to a centre. Missing axes span the box.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SpatialRange {
    pub x: Option<[f64; 2]>,
    pub y: Option<[f64; 2]>,
    pub z: Option<[f64; 2]>,
    pub center: Center,
    pub unit: RangeUnit,
}

impl SpatialRange {
    pub fn is_unbounded(&self) -> bool {
        self.x.is_none() && self.y.is_none() && self.z.is_none()
    }

    pub fn axis(&self, axis: Axis) -> Option<[f64; 2]> {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
            Axis::Z => self.z,
        }
    }

    /// Check ordering of every given range. Needs no snapshot.
    pub fn validate(&self) -> Result<()> {
        for (name, r) in [("x", self.x), ("y", self.y), ("z", self.z)] {
            if let Some([a, b]) = r {
                if !(a <= b) {
                    return Err(MeraError::usage(format!(
                        "inverted {name} range: [{a}, {b}]"
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn resolve(&self, boxlen: f64, scale: &ScaleSet) -> Result<Extent> {
        self.validate()?;
        let c = self.center.resolve(boxlen, scale)?;
        let f = self.unit.to_code(boxlen, scale)?;
        let mut ext = Extent::full(boxlen);
        for axis in [Axis::X, Axis::Y, Axis::Z] {
            if let Some([a, b]) = self.axis(axis) {
                let k = axis.index();
                ext.lo[k] = c[k] + a * f;
                ext.hi[k] = c[k] + b * f;
            }
        }
        Ok(ext)
    }
}

/// Centre of a cell with integer index `idx` at `level`, in code length.
#[inline]
pub fn cell_center(idx: i64, level: i64, boxlen: f64) -> f64 {
    (idx as f64 + 0.5) * boxlen / 2f64.powi(level as i32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::{BaseUnits, ScaleParams};

    fn scale() -> ScaleSet {
        ScaleSet::new(BaseUnits::new(3.085_677_581_28e21, 1e-24, 1e15), ScaleParams::default())
    }

    #[test]
    fn axis_parsing_and_planes() {
        assert_eq!("y".parse::<Axis>().unwrap(), Axis::Y);
        assert!(matches!("w".parse::<Axis>(), Err(MeraError::Usage(_))));
        assert_eq!(Axis::Y.plane(), (Axis::X, Axis::Z));
    }

    #[test]
    fn ranges_are_relative_to_the_center() {
        let r = SpatialRange {
            x: Some([-0.25, 0.25]),
            center: Center::BoxCenter,
            ..Default::default()
        };
        let e = r.resolve(100.0, &scale()).unwrap();
        assert_eq!(e.lo, [25.0, 0.0, 0.0]);
        assert_eq!(e.hi, [75.0, 100.0, 100.0]);
    }

    #[test]
    fn named_units_convert_through_the_scale() {
        // code length is 1 kpc here
        let r = SpatialRange {
            z: Some([0.0, 500.0]),
            unit: RangeUnit::named("pc"),
            ..Default::default()
        };
        let e = r.resolve(10.0, &scale()).unwrap();
        assert!((e.hi[2] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn inverted_range_is_a_usage_error() {
        let r = SpatialRange {
            y: Some([0.6, 0.4]),
            ..Default::default()
        };
        assert!(matches!(r.validate(), Err(MeraError::Usage(_))));
    }

    #[test]
    fn cell_centers() {
        assert_eq!(cell_center(0, 1, 1.0), 0.25);
        assert_eq!(cell_center(3, 2, 8.0), 7.0);
    }
}
