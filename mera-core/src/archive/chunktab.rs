use crate::error::{MeraError, Result};
use std::io::Write;

/// codec(1) + pad(7) + u_size + c_size + data_off + blake3 of the raw bytes
pub const ENTRY_SIZE: usize = 8 + 3 * 8 + 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkEntry {
    pub codec: u8,
    pub u_size: u64,
    pub c_size: u64,
    pub data_off: u64,
    pub hash: [u8; 32],
}

pub fn write_table(mut w: impl Write, entries: &[ChunkEntry]) -> Result<()> {
    let mut buf = [0u8; ENTRY_SIZE];
    for e in entries {
        buf.fill(0);
        buf[0] = e.codec;
        buf[8..16].copy_from_slice(&e.u_size.to_le_bytes());
        buf[16..24].copy_from_slice(&e.c_size.to_le_bytes());
        buf[24..32].copy_from_slice(&e.data_off.to_le_bytes());
        buf[32..64].copy_from_slice(&e.hash);
        w.write_all(&buf)?;
    }
    Ok(())
}

#[inline]
fn le64(x: &[u8]) -> u64 {
    let mut b = [0u8; 8];
    b.copy_from_slice(x);
    u64::from_le_bytes(b)
}

pub fn read_table_from_slice(buf: &[u8], count: u64) -> Result<Vec<ChunkEntry>> {
    let need = (count as usize)
        .checked_mul(ENTRY_SIZE)
        .ok_or_else(|| MeraError::format("chunk table size overflow"))?;
    if buf.len() != need {
        return Err(MeraError::format(format!(
            "chunk table size mismatch: got {} bytes, expected {need}",
            buf.len()
        )));
    }
    Ok(buf
        .chunks_exact(ENTRY_SIZE)
        .map(|e| {
            let mut hash = [0u8; 32];
            hash.copy_from_slice(&e[32..64]);
            ChunkEntry {
                codec: e[0],
                u_size: le64(&e[8..16]),
                c_size: le64(&e[16..24]),
                data_off: le64(&e[24..32]),
                hash,
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_round_trip() {
        let entries = vec![
            ChunkEntry {
                codec: 1,
                u_size: 800,
                c_size: 120,
                data_off: 4096,
                hash: [7; 32],
            },
            ChunkEntry {
                codec: 0,
                u_size: 16,
                c_size: 16,
                data_off: 4216,
                hash: [9; 32],
            },
        ];
        let mut buf = Vec::new();
        write_table(&mut buf, &entries).unwrap();
        assert_eq!(buf.len(), 2 * ENTRY_SIZE);
        assert_eq!(read_table_from_slice(&buf, 2).unwrap(), entries);
        assert!(read_table_from_slice(&buf[1..], 2).is_err());
    }
}
