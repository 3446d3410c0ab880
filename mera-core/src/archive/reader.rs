use super::chunktab::{ChunkEntry, read_table_from_slice};
use super::codec::CodecId;
use super::manifest::Manifest;
use super::superblock::{HEADER_LEN, Superblock};
use super::tail::{TAIL_LEN, TailSummary, read_tail};
use crate::dataset::Dataset;
use crate::error::{MeraError, Result};
use crate::table::{Column, ColumnKind, Table};
use serde::Serialize;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

pub struct Opened {
    f: File,
    pub sb: Superblock,
    pub manifest: Manifest,
    pub table: Vec<ChunkEntry>,
    pub tail: TailSummary,
}

impl Opened {
    pub fn open(path: &Path) -> Result<Self> {
        let mut f = File::open(path)?;
        let file_len = f.metadata()?.len();
        let sb = Superblock::read_from(&mut f)?;
        let tail = read_tail(&mut f)?;
        let data_end = file_len - TAIL_LEN as u64;
        if sb.data_off > data_end {
            return Err(MeraError::format("archive truncated before its data section"));
        }

        f.seek(SeekFrom::Start(HEADER_LEN))?;
        let mut manifest_bytes = vec![0u8; sb.manifest_len as usize];
        f.read_exact(&mut manifest_bytes)?;
        if blake3::hash(&manifest_bytes).as_bytes() != &tail.manifest_blake3 {
            return Err(MeraError::format("manifest checksum mismatch"));
        }
        let manifest: Manifest = ciborium::de::from_reader(&manifest_bytes[..])
            .map_err(|e| MeraError::format(format!("manifest decode: {e}")))?;

        let mut table_bytes = vec![0u8; (sb.data_off - sb.chunk_table_off) as usize];
        f.read_exact(&mut table_bytes)?;
        if blake3::hash(&table_bytes).as_bytes() != &tail.chunktab_blake3 {
            return Err(MeraError::format("chunk table checksum mismatch"));
        }
        let table = read_table_from_slice(&table_bytes, sb.chunk_count)?;

        for (i, ce) in table.iter().enumerate() {
            if ce.data_off < sb.data_off || ce.data_off.saturating_add(ce.c_size) > data_end {
                return Err(MeraError::format(format!("chunk[{i}] out of bounds")));
            }
        }
        if tail.rows != manifest.rows {
            return Err(MeraError::format("tail row count disagrees with the manifest"));
        }
        if manifest.columns.iter().any(|c| c.chunk >= sb.chunk_count) {
            return Err(MeraError::format("manifest references a missing chunk"));
        }
        // every column holds one 8-byte word per row
        let column_bytes = manifest
            .rows
            .checked_mul(8)
            .ok_or_else(|| MeraError::format("row count overflows"))?;
        for c in &manifest.columns {
            let ce = &table[c.chunk as usize];
            if ce.u_size != column_bytes {
                return Err(MeraError::format(format!(
                    "column {} claims {} bytes, {} rows need {column_bytes}",
                    c.name, ce.u_size, manifest.rows
                )));
            }
        }

        Ok(Self {
            f,
            sb,
            manifest,
            table,
            tail,
        })
    }

    fn read_stored(&mut self, ce: &ChunkEntry) -> Result<Vec<u8>> {
        self.f.seek(SeekFrom::Start(ce.data_off))?;
        let mut buf = vec![0u8; ce.c_size as usize];
        self.f.read_exact(&mut buf)?;
        Ok(buf)
    }

    /// Decompressed chunk `id`, checked against its content hash.
    pub fn read_chunk(&mut self, id: usize) -> Result<Vec<u8>> {
        let ce = self.table[id];
        let stored = self.read_stored(&ce)?;
        let raw = CodecId::from_u8(ce.codec)?
            .compressor()
            .decompress(&stored, ce.u_size as usize)?;
        if blake3::hash(&raw).as_bytes() != &ce.hash {
            return Err(MeraError::format(format!("chunk[{id}] content hash mismatch")));
        }
        Ok(raw)
    }
}

fn decode_column(raw: &[u8], kind: ColumnKind) -> Result<Column> {
    if raw.len() % 8 != 0 {
        return Err(MeraError::format("column byte length is not a multiple of 8"));
    }
    let words = raw.chunks_exact(8).map(|b| {
        let mut w = [0u8; 8];
        w.copy_from_slice(b);
        w
    });
    Ok(match kind {
        ColumnKind::Float => Column::Float(words.map(f64::from_le_bytes).collect()),
        ColumnKind::Int => Column::Int(words.map(i64::from_le_bytes).collect()),
    })
}

/// Rebuild a dataset saved with [`super::save_dataset`].
pub fn load_dataset(path: &Path) -> Result<Dataset> {
    let mut o = Opened::open(path)?;
    let entries = o.manifest.columns.clone();
    let mut names = Vec::with_capacity(entries.len());
    let mut columns = Vec::with_capacity(entries.len());
    for c in &entries {
        let raw = o.read_chunk(c.chunk as usize)?;
        let col = decode_column(&raw, c.kind)?;
        if col.len() as u64 != o.manifest.rows {
            return Err(MeraError::format(format!(
                "column {} holds {} rows, manifest says {}",
                c.name,
                col.len(),
                o.manifest.rows
            )));
        }
        names.push(c.name.clone());
        columns.push(col);
    }
    let m = o.manifest;
    let table = Table::from_parts(names, columns, m.spans)?;
    info!(path = %path.display(), kind = %m.kind, rows = table.len(), "loaded dataset");
    Ok(Dataset::new(
        m.kind,
        Arc::new(m.info),
        table,
        m.variables,
        (m.lmin, m.lmax),
        m.bounds,
    ))
}

#[derive(Debug, Clone, Serialize)]
pub struct ColumnSummary {
    pub name: String,
    pub kind: ColumnKind,
    pub codec: CodecId,
    pub u_size: u64,
    pub c_size: u64,
    /// blake3 of the uncompressed column, lowercase hex.
    pub blake3: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ArchiveSummary {
    pub kind: String,
    pub output: u32,
    pub rows: u64,
    pub lmin: u8,
    pub lmax: u8,
    pub shards: usize,
    pub created: i64,
    pub tool: String,
    pub columns: Vec<ColumnSummary>,
    pub total_u: u64,
    pub total_c: u64,
}

/// Manifest and chunk layout, without reading column data.
pub fn inspect(path: &Path) -> Result<ArchiveSummary> {
    let o = Opened::open(path)?;
    let m = &o.manifest;
    let columns = m
        .columns
        .iter()
        .map(|c| {
            let ce = &o.table[c.chunk as usize];
            Ok(ColumnSummary {
                name: c.name.clone(),
                kind: c.kind,
                codec: CodecId::from_u8(ce.codec)?,
                u_size: ce.u_size,
                c_size: ce.c_size,
                blake3: hex::encode(ce.hash),
            })
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(ArchiveSummary {
        kind: m.kind.to_string(),
        output: m.info.output,
        rows: m.rows,
        lmin: m.lmin,
        lmax: m.lmax,
        shards: m.spans.len(),
        created: m.meta.created,
        tool: m.meta.tool.clone(),
        columns,
        total_u: o.tail.total_u,
        total_c: o.tail.total_c,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VerifyReport {
    pub chunks: u64,
    pub bytes: u64,
}

/// Check every region checksum in the tail and every chunk's content hash.
pub fn verify(path: &Path) -> Result<VerifyReport> {
    let mut o = Opened::open(path)?;
    let mut data = blake3::Hasher::new();
    let mut bytes = 0u64;
    for i in 0..o.table.len() {
        let ce = o.table[i];
        data.update(&o.read_stored(&ce)?);
        o.read_chunk(i)?;
        bytes += ce.u_size;
        debug!(chunk = i, u_size = ce.u_size, "verified chunk");
    }
    if data.finalize().as_bytes() != &o.tail.data_blake3 {
        return Err(MeraError::format("data checksum mismatch"));
    }
    if bytes != o.tail.total_u {
        return Err(MeraError::format("uncompressed total mismatch"));
    }
    info!(path = %path.display(), chunks = o.sb.chunk_count, "archive verified");
    Ok(VerifyReport {
        chunks: o.sb.chunk_count,
        bytes,
    })
}
