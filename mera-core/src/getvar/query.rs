use super::mask::Mask;
use crate::geometry::Center;

/// Arguments of [`super::getvar`].
///
/// `units` is either empty (everything in code units) or one symbol per
/// variable. `rows` restricts the computation to a subset of row indices; the
/// mask, when given, then applies to that subset.
#[derive(Debug, Clone, Default)]
pub struct VarQuery {
    pub vars: Vec<String>,
    pub units: Vec<String>,
    pub mask: Option<Mask>,
    pub rows: Option<Vec<usize>>,
    pub center: Center,
}

impl VarQuery {
    pub fn new(var: impl Into<String>) -> Self {
        Self {
            vars: vec![var.into()],
            ..Default::default()
        }
    }

    pub fn vars<I, S>(vars: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            vars: vars.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    pub fn unit(mut self, unit: impl Into<String>) -> Self {
        self.units.push(unit.into());
        self
    }

    pub fn units<I, S>(mut self, units: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.units = units.into_iter().map(Into::into).collect();
        self
    }

    pub fn mask(mut self, mask: impl Into<Mask>) -> Self {
        self.mask = Some(mask.into());
        self
    }

    pub fn rows(mut self, rows: Vec<usize>) -> Self {
        self.rows = Some(rows);
        self
    }

    pub fn center(mut self, center: Center) -> Self {
        self.center = center;
        self
    }
}
