//! Fixed-size trailer closing every archive.
//!
//! ```text
//! magic(8) | manifest b3(32) | chunk table b3(32) | data b3(32) | total_u | total_c | rows
//! ```

use crate::error::{MeraError, Result};
use std::io::{Read, Seek, SeekFrom};

pub const TAIL_MAGIC: [u8; 8] = *b"MERATAIL";
pub const TAIL_LEN: usize = 8 + 3 * 32 + 3 * 8;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TailSummary {
    pub manifest_blake3: [u8; 32],
    pub chunktab_blake3: [u8; 32],
    pub data_blake3: [u8; 32],
    pub total_u: u64,
    pub total_c: u64,
    pub rows: u64,
}

impl TailSummary {
    pub fn to_bytes(&self) -> [u8; TAIL_LEN] {
        let mut b = [0u8; TAIL_LEN];
        b[..8].copy_from_slice(&TAIL_MAGIC);
        for (i, h) in [&self.manifest_blake3, &self.chunktab_blake3, &self.data_blake3]
            .into_iter()
            .enumerate()
        {
            b[8 + 32 * i..40 + 32 * i].copy_from_slice(h);
        }
        for (i, v) in [self.total_u, self.total_c, self.rows].into_iter().enumerate() {
            b[104 + 8 * i..112 + 8 * i].copy_from_slice(&v.to_le_bytes());
        }
        b
    }

    pub fn from_bytes(b: &[u8; TAIL_LEN]) -> Result<Self> {
        if b[..8] != TAIL_MAGIC {
            return Err(MeraError::format("bad tail magic"));
        }
        let hash = |i: usize| -> [u8; 32] {
            let mut h = [0u8; 32];
            h.copy_from_slice(&b[8 + 32 * i..40 + 32 * i]);
            h
        };
        let word = |i: usize| -> u64 {
            let mut w = [0u8; 8];
            w.copy_from_slice(&b[104 + 8 * i..112 + 8 * i]);
            u64::from_le_bytes(w)
        };
        Ok(Self {
            manifest_blake3: hash(0),
            chunktab_blake3: hash(1),
            data_blake3: hash(2),
            total_u: word(0),
            total_c: word(1),
            rows: word(2),
        })
    }
}

/// Trailer of the file behind `f`; leaves the cursor at end of file.
pub fn read_tail<F: Read + Seek>(f: &mut F) -> Result<TailSummary> {
    let len = f.seek(SeekFrom::End(0))?;
    if len < TAIL_LEN as u64 {
        return Err(MeraError::format("file too small for an archive tail"));
    }
    f.seek(SeekFrom::End(-(TAIL_LEN as i64)))?;
    let mut b = [0u8; TAIL_LEN];
    f.read_exact(&mut b)?;
    TailSummary::from_bytes(&b)
}
