use crate::error::{MeraError, Result};

/// Row mask. Built only from booleans or from numeric data holding 0/1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mask(Vec<bool>);

impl Mask {
    pub fn new(flags: Vec<bool>) -> Self {
        Self(flags)
    }

    /// Numeric masks must hold only 0 and 1.
    pub fn from_numeric(values: &[f64]) -> Result<Self> {
        values
            .iter()
            .map(|&v| {
                if v == 0.0 {
                    Ok(false)
                } else if v == 1.0 {
                    Ok(true)
                } else {
                    Err(MeraError::usage(format!("mask value {v} is not boolean")))
                }
            })
            .collect::<Result<Vec<_>>>()
            .map(Self)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[bool] {
        &self.0
    }

    pub fn count(&self) -> usize {
        self.0.iter().filter(|&&b| b).count()
    }

    pub fn check_len(&self, rows: usize) -> Result<()> {
        if self.0.len() != rows {
            return Err(MeraError::usage(format!(
                "mask has {} entries for {rows} rows",
                self.0.len()
            )));
        }
        Ok(())
    }

    pub fn apply(&self, values: &[f64]) -> Vec<f64> {
        values
            .iter()
            .zip(&self.0)
            .filter_map(|(&v, &keep)| keep.then_some(v))
            .collect()
    }
}

impl From<Vec<bool>> for Mask {
    fn from(flags: Vec<bool>) -> Self {
        Self(flags)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_masks_must_be_zero_or_one() {
        assert_eq!(Mask::from_numeric(&[0.0, 1.0, 1.0]).unwrap().count(), 2);
        assert!(matches!(Mask::from_numeric(&[0.0, 2.0]), Err(MeraError::Usage(_))));
    }

    #[test]
    fn apply_and_length_check() {
        let m = Mask::new(vec![true, false, true]);
        assert_eq!(m.apply(&[1.0, 2.0, 3.0]), [1.0, 3.0]);
        assert!(m.check_len(3).is_ok());
        assert!(matches!(m.check_len(4), Err(MeraError::Usage(_))));
    }
}
