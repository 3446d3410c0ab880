use crate::error::{MeraError, Result};
use std::io::{Read, Write};

pub const MAGIC: &[u8; 6] = b"MERADS";
pub const VERSION: u16 = 1;
/// magic + version + 4 × u64
pub const HEADER_LEN: u64 = 6 + 2 + 4 * 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Superblock {
    pub version: u16,
    /// Byte length of the CBOR manifest following the header.
    pub manifest_len: u64,
    pub chunk_table_off: u64,
    pub chunk_count: u64,
    /// Absolute offset of the first column chunk.
    pub data_off: u64,
}

impl Superblock {
    pub fn write_to(&self, mut w: impl Write) -> std::io::Result<()> {
        w.write_all(MAGIC)?;
        w.write_all(&self.version.to_le_bytes())?;
        w.write_all(&self.manifest_len.to_le_bytes())?;
        w.write_all(&self.chunk_table_off.to_le_bytes())?;
        w.write_all(&self.chunk_count.to_le_bytes())?;
        w.write_all(&self.data_off.to_le_bytes())?;
        Ok(())
    }

    pub fn read_from(mut r: impl Read) -> Result<Self> {
        let mut magic = [0u8; 6];
        r.read_exact(&mut magic)?;
        if &magic != MAGIC {
            return Err(MeraError::format("not a dataset archive (bad magic)"));
        }
        let mut v = [0u8; 2];
        r.read_exact(&mut v)?;
        let version = u16::from_le_bytes(v);
        if version != VERSION {
            return Err(MeraError::format(format!("unsupported archive version {version}")));
        }
        let mut u = [0u64; 4];
        for x in &mut u {
            let mut b = [0u8; 8];
            r.read_exact(&mut b)?;
            *x = u64::from_le_bytes(b);
        }
        let sb = Self {
            version,
            manifest_len: u[0],
            chunk_table_off: u[1],
            chunk_count: u[2],
            data_off: u[3],
        };
        if sb.chunk_table_off != HEADER_LEN + sb.manifest_len || sb.data_off < sb.chunk_table_off {
            return Err(MeraError::format("inconsistent archive header offsets"));
        }
        Ok(sb)
    }
}
