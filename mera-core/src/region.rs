//! Geometric row selection.
//!
//! A [`Region`] is what the caller describes (in any length unit); it resolves
//! to a [`RegionPredicate`] in code length that is evaluated on each row's
//! position. Selection never touches metadata, only row membership.

use crate::dataset::Dataset;
use crate::error::{MeraError, Result};
use crate::geometry::{Axis, Center, Extent, RangeUnit, SpatialRange};
use crate::units::ScaleSet;
use tracing::debug;

#[derive(Debug, Clone, PartialEq)]
pub enum RegionPredicate {
    Cuboid(Extent),
    Sphere {
        center: [f64; 3],
        radius: f64,
    },
    Cylinder {
        center: [f64; 3],
        radius: f64,
        half_height: f64,
        axis: Axis,
    },
    Not(Box<RegionPredicate>),
    And(Box<RegionPredicate>, Box<RegionPredicate>),
}

impl RegionPredicate {
    pub fn contains(&self, p: [f64; 3]) -> bool {
        match self {
            Self::Cuboid(e) => e.contains(p),
            Self::Sphere { center, radius } => {
                let d2: f64 = (0..3).map(|k| (p[k] - center[k]).powi(2)).sum();
                d2 <= radius * radius
            }
            Self::Cylinder {
                center,
                radius,
                half_height,
                axis,
            } => {
                let (a, b) = axis.plane();
                let da = p[a.index()] - center[a.index()];
                let db = p[b.index()] - center[b.index()];
                let dz = p[axis.index()] - center[axis.index()];
                dz.abs() <= *half_height && da * da + db * db <= radius * radius
            }
            Self::Not(inner) => !inner.contains(p),
            Self::And(l, r) => l.contains(p) && r.contains(p),
        }
    }

    pub fn not(p: RegionPredicate) -> Self {
        Self::Not(Box::new(p))
    }

    /// Inside `outer` and outside `inner`.
    pub fn band(inner: RegionPredicate, outer: RegionPredicate) -> Self {
        Self::And(Box::new(Self::not(inner)), Box::new(outer))
    }
}

/// Shape of a selection, lengths in `unit`.
#[derive(Debug, Clone, PartialEq)]
pub enum Region {
    Cuboid(SpatialRange),
    Sphere {
        center: Center,
        radius: f64,
        unit: RangeUnit,
    },
    Cylinder {
        center: Center,
        radius: f64,
        /// Half the cylinder length along `axis`.
        height: f64,
        axis: Axis,
        unit: RangeUnit,
    },
}

impl Region {
    pub fn sphere(center: Center, radius: f64, unit: RangeUnit) -> Self {
        Self::Sphere {
            center,
            radius,
            unit,
        }
    }

    pub fn cylinder(center: Center, radius: f64, height: f64, axis: Axis, unit: RangeUnit) -> Self {
        Self::Cylinder {
            center,
            radius,
            height,
            axis,
            unit,
        }
    }

    /// Argument checks that need no snapshot.
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::Cuboid(r) => r.validate(),
            Self::Sphere { radius, .. } => non_negative("radius", *radius),
            Self::Cylinder { radius, height, .. } => {
                non_negative("radius", *radius)?;
                non_negative("height", *height)
            }
        }
    }

    pub fn predicate(&self, boxlen: f64, scale: &ScaleSet) -> Result<RegionPredicate> {
        self.validate()?;
        Ok(match self {
            Self::Cuboid(r) => RegionPredicate::Cuboid(r.resolve(boxlen, scale)?),
            Self::Sphere {
                center,
                radius,
                unit,
            } => RegionPredicate::Sphere {
                center: center.resolve(boxlen, scale)?,
                radius: radius * unit.to_code(boxlen, scale)?,
            },
            Self::Cylinder {
                center,
                radius,
                height,
                axis,
                unit,
            } => {
                let f = unit.to_code(boxlen, scale)?;
                RegionPredicate::Cylinder {
                    center: center.resolve(boxlen, scale)?,
                    radius: radius * f,
                    half_height: height * f,
                    axis: *axis,
                }
            }
        })
    }
}

/// Hollow sphere or cylinder between two radii.
#[derive(Debug, Clone, PartialEq)]
pub enum Shell {
    Sphere {
        center: Center,
        inner: f64,
        outer: f64,
        unit: RangeUnit,
    },
    Cylinder {
        center: Center,
        inner: f64,
        outer: f64,
        height: f64,
        axis: Axis,
        unit: RangeUnit,
    },
}

impl Shell {
    fn bounds(&self) -> Result<(Region, Region)> {
        let (inner, outer) = match self {
            Self::Sphere { inner, outer, .. } | Self::Cylinder { inner, outer, .. } => (*inner, *outer),
        };
        non_negative("inner radius", inner)?;
        if inner >= outer {
            return Err(MeraError::usage(format!(
                "inner radius {inner} must be below outer radius {outer}"
            )));
        }
        Ok(match self {
            Self::Sphere {
                center,
                unit,
                inner,
                outer,
            } => (
                Region::sphere(center.clone(), *inner, unit.clone()),
                Region::sphere(center.clone(), *outer, unit.clone()),
            ),
            Self::Cylinder {
                center,
                inner,
                outer,
                height,
                axis,
                unit,
            } => (
                Region::cylinder(center.clone(), *inner, *height, *axis, unit.clone()),
                Region::cylinder(center.clone(), *outer, *height, *axis, unit.clone()),
            ),
        })
    }

    pub fn predicate(&self, boxlen: f64, scale: &ScaleSet) -> Result<RegionPredicate> {
        let (inner, outer) = self.bounds()?;
        Ok(RegionPredicate::band(
            inner.predicate(boxlen, scale)?,
            outer.predicate(boxlen, scale)?,
        ))
    }
}

fn non_negative(what: &str, v: f64) -> Result<()> {
    if !(v >= 0.0) {
        return Err(MeraError::usage(format!("{what} must be non-negative, got {v}")));
    }
    Ok(())
}

/// Rows of `ds` for which `pred` holds.
pub fn select(ds: &Dataset, pred: &RegionPredicate) -> Result<Dataset> {
    let [x, y, z] = ds.positions()?;
    let keep: Vec<bool> = (0..ds.len()).map(|i| pred.contains([x[i], y[i], z[i]])).collect();
    let out = ds.filter(&keep)?;
    debug!(before = ds.len(), after = out.len(), "region selection");
    Ok(out)
}

pub fn subregion(ds: &Dataset, region: &Region, inverse: bool) -> Result<Dataset> {
    let mut pred = region.predicate(ds.boxlen(), ds.scale())?;
    if inverse {
        pred = RegionPredicate::not(pred);
    }
    select(ds, &pred)
}

pub fn shellregion(ds: &Dataset, shell: &Shell, inverse: bool) -> Result<Dataset> {
    let mut pred = shell.predicate(ds.boxlen(), ds.scale())?;
    if inverse {
        pred = RegionPredicate::not(pred);
    }
    select(ds, &pred)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sphere_and_band() {
        let c = [0.5; 3];
        let inner = RegionPredicate::Sphere { center: c, radius: 0.1 };
        let outer = RegionPredicate::Sphere { center: c, radius: 0.3 };
        let shell = RegionPredicate::band(inner.clone(), outer);
        assert!(inner.contains([0.55, 0.5, 0.5]));
        assert!(!shell.contains([0.55, 0.5, 0.5]));
        assert!(shell.contains([0.7, 0.5, 0.5]));
        assert!(!shell.contains([0.9, 0.5, 0.5]));
    }

    #[test]
    fn cylinder_respects_axis() {
        let cyl = RegionPredicate::Cylinder {
            center: [0.5; 3],
            radius: 0.1,
            half_height: 0.2,
            axis: Axis::X,
        };
        assert!(cyl.contains([0.69, 0.55, 0.5]));
        assert!(!cyl.contains([0.71, 0.5, 0.5]));
        assert!(!cyl.contains([0.5, 0.62, 0.5]));
    }

    #[test]
    fn inverse_is_a_complement() {
        let p = RegionPredicate::Cuboid(Extent {
            lo: [0.0; 3],
            hi: [0.5; 3],
        });
        let n = RegionPredicate::not(p.clone());
        for q in [[0.1, 0.2, 0.3], [0.6, 0.1, 0.1], [0.5, 0.5, 0.5]] {
            assert_ne!(p.contains(q), n.contains(q));
        }
    }

    #[test]
    fn argument_checks() {
        let bad = Region::sphere(Center::BoxCenter, -1.0, RangeUnit::BoxFraction);
        assert!(matches!(bad.validate(), Err(MeraError::Usage(_))));
        let shell = Shell::Sphere {
            center: Center::BoxCenter,
            inner: 0.3,
            outer: 0.2,
            unit: RangeUnit::BoxFraction,
        };
        assert!(matches!(shell.bounds(), Err(MeraError::Usage(_))));
    }
}
