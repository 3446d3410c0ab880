//! AMR tree traversal for one domain file, read in lockstep with a companion
//! cell-variable file (hydro or gravity).
//!
//! Both files walk the same `(level, boundary)` blocks. For each block the AMR
//! file holds, per grid: index, next/prev links, 3 centre coordinates, father,
//! 6 neighbours, then 8 records each of `son`, `cpu_map` and `flag1`. The
//! companion file starts every block with `ilevel` and `ncache` records and
//! then writes `8 × nvar` value records.

use crate::error::{MeraError, Result};
use crate::fortran::RecordReader;
use crate::geometry::{Extent, cell_center};
use crate::info::{Component, InfoRecord};
use crate::table::ShardRows;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::trace;

const TWOTONDIM: usize = 8;
/// next, prev and index records preceding the centre coordinates
const GRID_LINKS: usize = 3;
/// father + 6 neighbours
const GRID_FAMILY: usize = 7;
/// cpu_map + flag1, 8 records each
const GRID_TRAILER: usize = 2 * TWOTONDIM;
const GRID_RECORDS: usize = GRID_LINKS + 3 + GRID_FAMILY + TWOTONDIM + GRID_TRAILER;

type Reader = RecordReader<BufReader<File>>;

pub(crate) struct AmrHeader {
    pub ncpu: usize,
    pub nlevelmax: usize,
    pub nboundary: usize,
    numbl: Vec<i32>,
    numbb: Vec<i32>,
}

impl AmrHeader {
    /// Read the header of a domain file written by a run with `expect_ncpu`
    /// domains.
    pub fn read(r: &mut Reader, expect_ncpu: usize) -> Result<Self> {
        let ncpu = r.read_count("ncpu")?;
        if ncpu != expect_ncpu {
            return Err(MeraError::format(format!(
                "{}: {ncpu} domains in file, {expect_ncpu} in info",
                r.path().display()
            )));
        }
        r.skip(1)?; // ndim
        let nx = r.read_i32_exact(3)?;
        if nx != [1, 1, 1] {
            return Err(MeraError::format(format!(
                "{}: coarse grid {nx:?} is not a single cell",
                r.path().display()
            )));
        }
        let nlevelmax = r.read_count("nlevelmax")?;
        r.skip(1)?; // ngridmax
        let nboundary = r.read_count("nboundary")?;
        let table_len = |n: usize| {
            n.checked_mul(nlevelmax).ok_or_else(|| {
                MeraError::format(format!(
                    "{}: block table of {n} x {nlevelmax} overflows",
                    r.path().display()
                ))
            })
        };
        let (nl, nb) = (table_len(ncpu)?, table_len(nboundary)?);
        // ngrid_current, boxlen, output times, time steps, cosmology, headl, taill
        r.skip(15)?;
        let numbl = r.read_i32_exact(nl)?;
        r.skip(1)?; // numbtot
        let numbb = if nboundary > 0 {
            r.skip(2)?; // headb, tailb
            r.read_i32_exact(nb)?
        } else {
            Vec::new()
        };
        r.skip(1)?; // free-list bookkeeping
        let ordering = r.read_record()?;
        if String::from_utf8_lossy(&ordering).trim() == "hilbert" {
            r.skip(1)?; // bound_key
        }
        r.skip(3)?; // coarse son, flag1, cpu_map
        if numbl.iter().chain(&numbb).any(|&n| n < 0) {
            return Err(MeraError::format(format!(
                "{}: negative grid count in block table",
                r.path().display()
            )));
        }
        Ok(Self {
            ncpu,
            nlevelmax,
            nboundary,
            numbl,
            numbb,
        })
    }

    /// Grids stored for `(ilevel, ibound)`, both 1-based.
    pub fn ncache(&self, ilevel: usize, ibound: usize) -> usize {
        let n = if ibound <= self.ncpu {
            self.numbl[(ilevel - 1) * self.ncpu + ibound - 1]
        } else {
            self.numbb[(ilevel - 1) * self.nboundary + ibound - self.ncpu - 1]
        };
        n as usize
    }
}

/// Hydro or gravity values stored per cell, block by block.
pub(crate) struct CellVarFile {
    reader: Reader,
    nvar: usize,
    /// Output slot for every file variable, `None` when not requested.
    wanted: Vec<Option<usize>>,
    nwanted: usize,
}

impl CellVarFile {
    /// `header_after_nvar` counts header records following the `nvar` record.
    pub fn open(path: &Path, header_after_nvar: usize, wanted: Vec<Option<usize>>) -> Result<Self> {
        let mut reader = RecordReader::open(path)?;
        reader.skip(1)?; // ncpu
        let nvar = reader.read_count("nvar")?;
        reader.skip(header_after_nvar)?;
        if nvar != wanted.len() {
            return Err(MeraError::format(format!(
                "{}: header lists {nvar} variables, expected {}",
                path.display(),
                wanted.len()
            )));
        }
        let nwanted = wanted.iter().flatten().count();
        Ok(Self {
            reader,
            nvar,
            wanted,
            nwanted,
        })
    }

    /// Read one block. Values come back per requested variable, laid out as
    /// `[slot * ncache + grid]`; nothing is decoded when `decode` is false.
    fn read_block(&mut self, ilevel: usize, ncache: usize, decode: bool) -> Result<Vec<Vec<f64>>> {
        let lev = self.reader.read_count("ilevel")?;
        let n = self.reader.read_count("ncache")?;
        if lev != ilevel || n != ncache {
            return Err(MeraError::format(format!(
                "{}: block (level {lev}, {n} grids) does not match amr block (level {ilevel}, {ncache} grids)",
                self.reader.path().display()
            )));
        }
        if ncache == 0 {
            return Ok(Vec::new());
        }
        if !decode {
            self.reader.skip(TWOTONDIM * self.nvar)?;
            return Ok(Vec::new());
        }
        let mut out = vec![Vec::with_capacity(TWOTONDIM * ncache); self.nwanted];
        for _slot in 0..TWOTONDIM {
            for ivar in 0..self.nvar {
                match self.wanted[ivar] {
                    Some(j) => out[j].extend(self.reader.read_f64_exact(ncache)?),
                    None => self.reader.skip(1)?,
                }
            }
        }
        Ok(out)
    }
}

/// Level window and box a cell centre must fall in.
#[derive(Debug, Clone, Copy)]
pub(crate) struct CellFilter {
    pub lmin: u8,
    pub lmax: u8,
    pub extent: Extent,
    pub boxlen: f64,
}

/// Column positions in the shard accumulator.
pub(crate) struct CellColumns {
    pub level: usize,
    pub index: [usize; 3],
    pub cpu: usize,
    /// One per requested variable, in output-slot order.
    pub vars: Vec<usize>,
}

/// Decode the cells owned by domain `icpu` into `rows`.
pub(crate) fn decode_cells(
    info: &InfoRecord,
    icpu: u32,
    filter: &CellFilter,
    vars: &mut CellVarFile,
    cols: &CellColumns,
    rows: &mut ShardRows,
) -> Result<()> {
    let mut amr = RecordReader::open(&info.shard_path(Component::Amr, icpu))?;
    let header = AmrHeader::read(&mut amr, info.ncpu as usize)?;
    let owner = icpu as usize;

    for ilevel in 1..=header.nlevelmax {
        let level = ilevel as u8;
        if level > filter.lmax {
            break;
        }
        let scale = 2f64.powi(ilevel as i32);
        let dx = 1.0 / scale;
        for ibound in 1..=header.ncpu + header.nboundary {
            let ncache = header.ncache(ilevel, ibound);
            if ncache == 0 {
                vars.read_block(ilevel, 0, false)?;
                continue;
            }
            if ibound != owner || level < filter.lmin {
                amr.skip(GRID_RECORDS)?;
                vars.read_block(ilevel, ncache, false)?;
                continue;
            }

            amr.skip(GRID_LINKS)?;
            let xg = [
                amr.read_f64_exact(ncache)?,
                amr.read_f64_exact(ncache)?,
                amr.read_f64_exact(ncache)?,
            ];
            amr.skip(GRID_FAMILY)?;
            let mut son = Vec::with_capacity(TWOTONDIM);
            for _ in 0..TWOTONDIM {
                son.push(amr.read_i32_exact(ncache)?);
            }
            amr.skip(GRID_TRAILER)?;

            // (slot, grid, integer index)
            let mut kept: Vec<(usize, usize, [i64; 3])> = Vec::new();
            for (slot, sons) in son.iter().enumerate() {
                let offset = [slot & 1, (slot >> 1) & 1, (slot >> 2) & 1];
                for (igrid, &s) in sons.iter().enumerate() {
                    if s != 0 && level != filter.lmax {
                        continue;
                    }
                    let idx: [i64; 3] = std::array::from_fn(|k| {
                        ((xg[k][igrid] + (offset[k] as f64 - 0.5) * dx) * scale).floor() as i64
                    });
                    let center = idx.map(|i| cell_center(i, ilevel as i64, filter.boxlen));
                    if filter.extent.contains(center) {
                        kept.push((slot, igrid, idx));
                    }
                }
            }

            let values = vars.read_block(ilevel, ncache, !kept.is_empty())?;
            trace!(icpu, ilevel, ncache, kept = kept.len(), "amr block");
            for (slot, igrid, idx) in kept {
                rows.push_i64(cols.level, ilevel as i64);
                for k in 0..3 {
                    rows.push_i64(cols.index[k], idx[k]);
                }
                rows.push_i64(cols.cpu, icpu as i64);
                let at = slot * ncache + igrid;
                for (j, &col) in cols.vars.iter().enumerate() {
                    rows.push_f64(col, values[j][at]);
                }
            }
        }
    }
    Ok(())
}
