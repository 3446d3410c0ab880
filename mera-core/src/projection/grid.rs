//! Pixel geometry and per-worker accumulators.
//!
//! Pixels are half-open intervals `[lo + i·p, lo + (i+1)·p)`. A cell footprint
//! `[c - h, c + h]` contributes to pixel `i` the fraction
//! `|footprint ∩ pixel| / 2h`, so the fractions of a footprint lying inside the
//! grid add up to one and sums are conserved at any resolution.

use super::options::{Mode, Resolution};
use crate::error::Result;
use crate::geometry::{Axis, Extent};
use crate::units::ScaleSet;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PixelGrid {
    pub nx: usize,
    pub ny: usize,
    /// Lower corner along the two map axes, code length.
    pub lo: [f64; 2],
    /// Pixel edge lengths, code length.
    pub pixel: [f64; 2],
}

fn count(width: f64, pixel: f64) -> usize {
    ((width / pixel) - 1e-9).ceil().max(1.0) as usize
}

impl PixelGrid {
    /// Grid covering `ext` seen along `direction`. Square-pixel resolutions
    /// round the pixel count up, so the grid may extend past the upper edge.
    pub fn new(
        ext: &Extent,
        direction: Axis,
        res: &Resolution,
        boxlen: f64,
        scale: &ScaleSet,
    ) -> Result<Self> {
        let (a, b) = direction.plane();
        let (wa, wb) = (ext.width(a), ext.width(b));
        let lo = [ext.lo[a.index()], ext.lo[b.index()]];
        let grid = match res {
            Resolution::Dims(nx, ny) => Self {
                nx: *nx,
                ny: *ny,
                lo,
                pixel: [wa / *nx as f64, wb / *ny as f64],
            },
            Resolution::Pixels(n) => {
                let p = wa.max(wb) / *n as f64;
                Self::square(lo, wa, wb, p)
            }
            Resolution::PixelSize { size, unit } => {
                let p = size * unit.to_code(boxlen, scale)?;
                Self::square(lo, wa, wb, p)
            }
        };
        Ok(grid)
    }

    pub(crate) fn square(lo: [f64; 2], wa: f64, wb: f64, p: f64) -> Self {
        Self {
            nx: count(wa, p),
            ny: count(wb, p),
            lo,
            pixel: [p, p],
        }
    }

    pub fn len(&self) -> usize {
        self.nx * self.ny
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn hi(&self) -> [f64; 2] {
        [
            self.lo[0] + self.nx as f64 * self.pixel[0],
            self.lo[1] + self.ny as f64 * self.pixel[1],
        ]
    }

    pub fn pixel_area(&self) -> f64 {
        self.pixel[0] * self.pixel[1]
    }

    fn cells(&self, d: usize) -> usize {
        if d == 0 { self.nx } else { self.ny }
    }

    /// Pixel containing point `p`; the upper grid edge belongs to the last pixel.
    pub fn locate(&self, p: [f64; 2]) -> Option<(usize, usize)> {
        let mut ij = [0usize; 2];
        for d in 0..2 {
            let n = self.cells(d);
            let t = (p[d] - self.lo[d]) / self.pixel[d];
            if !(t >= 0.0) || t > n as f64 {
                return None;
            }
            ij[d] = (t.floor() as usize).min(n - 1);
        }
        Some((ij[0], ij[1]))
    }

    /// Fractions of `[c - h, c + h]` falling into each pixel along axis `d`.
    pub fn overlaps(&self, d: usize, c: f64, h: f64, out: &mut Vec<(usize, f64)>) {
        out.clear();
        let (lo, p, n) = (self.lo[d], self.pixel[d], self.cells(d));
        let (a, b) = (c - h, c + h);
        let first = ((a - lo) / p).floor().max(0.0) as usize;
        let last = (((b - lo) / p).ceil().max(0.0) as usize).min(n);
        for i in first..last {
            let plo = lo + i as f64 * p;
            let phi = lo + (i + 1) as f64 * p;
            let ov = b.min(phi) - a.max(plo);
            if ov > 0.0 {
                out.push((i, ov / (2.0 * h)));
            }
        }
    }
}

/// Partial sums of one worker.
pub(crate) struct Accum {
    mode: Mode,
    npix: usize,
    /// `nvars × npix`, variable-major.
    pub values: Vec<f64>,
    /// Accumulated weight per pixel (mean modes only).
    pub weights: Vec<f64>,
    pub scratch: (Vec<(usize, f64)>, Vec<(usize, f64)>),
}

impl Accum {
    pub fn new(mode: Mode, nvars: usize, npix: usize) -> Self {
        let init = if mode == Mode::Max { f64::NEG_INFINITY } else { 0.0 };
        let weighted = matches!(mode, Mode::Mean | Mode::WeightedMean(_));
        Self {
            mode,
            npix,
            values: vec![init; nvars * npix],
            weights: if weighted { vec![0.0; npix] } else { Vec::new() },
            scratch: (Vec::new(), Vec::new()),
        }
    }

    /// Add `vals` (one per variable) with overlap fraction `frac` and row weight `w`.
    #[inline]
    pub fn deposit(&mut self, pix: usize, frac: f64, w: f64, vals: &[f64]) {
        match self.mode {
            Mode::Sum => {
                for (v, x) in vals.iter().enumerate() {
                    self.values[v * self.npix + pix] += x * frac;
                }
            }
            Mode::Mean | Mode::WeightedMean(_) => {
                let wf = w * frac;
                self.weights[pix] += wf;
                for (v, x) in vals.iter().enumerate() {
                    self.values[v * self.npix + pix] += x * wf;
                }
            }
            Mode::Max => {
                for (v, x) in vals.iter().enumerate() {
                    let slot = &mut self.values[v * self.npix + pix];
                    *slot = slot.max(*x);
                }
            }
        }
    }

    pub fn merge(mut self, other: Accum) -> Accum {
        match self.mode {
            Mode::Max => {
                for (a, b) in self.values.iter_mut().zip(&other.values) {
                    *a = a.max(*b);
                }
            }
            _ => {
                for (a, b) in self.values.iter_mut().zip(&other.values) {
                    *a += b;
                }
                for (a, b) in self.weights.iter_mut().zip(&other.weights) {
                    *a += b;
                }
            }
        }
        self
    }

    /// Final per-variable maps. Empty pixels are zero in every mode.
    pub fn finish(self) -> Vec<Vec<f64>> {
        let npix = self.npix;
        if npix == 0 {
            return Vec::new();
        }
        self.values
            .chunks(npix)
            .map(|map| match self.mode {
                Mode::Sum => map.to_vec(),
                Mode::Mean | Mode::WeightedMean(_) => map
                    .iter()
                    .zip(&self.weights)
                    .map(|(&s, &w)| if w > 0.0 { s / w } else { 0.0 })
                    .collect(),
                Mode::Max => map
                    .iter()
                    .map(|&m| if m.is_finite() { m } else { 0.0 })
                    .collect(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(n: usize) -> PixelGrid {
        PixelGrid::square([0.0, 0.0], 1.0, 1.0, 1.0 / n as f64)
    }

    #[test]
    fn fractions_sum_to_one_inside_the_grid() {
        let g = grid(7);
        let mut out = Vec::new();
        for &(c, h) in &[(0.5, 0.25), (0.13, 0.01), (0.0625, 0.0625), (0.9, 0.1)] {
            g.overlaps(0, c, h, &mut out);
            let s: f64 = out.iter().map(|(_, f)| f).sum();
            assert!((s - 1.0).abs() < 1e-12, "c={c} h={h} sum={s}");
        }
    }

    #[test]
    fn footprint_leaving_the_grid_loses_the_outside_part() {
        let g = grid(4);
        let mut out = Vec::new();
        g.overlaps(1, 1.0, 0.1, &mut out);
        let s: f64 = out.iter().map(|(_, f)| f).sum();
        assert!((s - 0.5).abs() < 1e-12);
    }

    #[test]
    fn locate_uses_half_open_pixels() {
        let g = grid(4);
        assert_eq!(g.locate([0.25, 0.0]), Some((1, 0)));
        assert_eq!(g.locate([1.0, 1.0]), Some((3, 3)));
        assert_eq!(g.locate([1.01, 0.5]), None);
        assert_eq!(g.locate([-0.01, 0.5]), None);
    }

    #[test]
    fn square_pixels_round_up() {
        let g = PixelGrid::square([0.0, 0.0], 1.0, 0.5, 0.3);
        assert_eq!((g.nx, g.ny), (4, 2));
        assert!(g.hi()[0] >= 1.0 && g.hi()[1] >= 0.5);
    }

    #[test]
    fn max_and_mean_finish() {
        let mut a = Accum::new(Mode::Max, 1, 2);
        a.deposit(0, 1.0, 1.0, &[-3.0]);
        assert_eq!(a.finish(), vec![vec![-3.0, 0.0]]);

        let mut m = Accum::new(Mode::Mean, 1, 1);
        m.deposit(0, 0.5, 1.0, &[2.0]);
        m.deposit(0, 0.5, 1.0, &[4.0]);
        assert_eq!(m.finish(), vec![vec![3.0]]);
    }
}
