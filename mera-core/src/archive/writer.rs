use super::chunktab::{ChunkEntry, ENTRY_SIZE, write_table};
use super::codec::{CodecId, Compressor};
use super::codec::zstdc::ZstdCompressor;
use super::manifest::{ColumnEntry, Manifest, Meta};
use super::superblock::{HEADER_LEN, Superblock, VERSION};
use super::tail::TailSummary;
use crate::dataset::Dataset;
use crate::error::{MeraError, Result};
use crate::table::Column;
use rayon::prelude::*;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use time::OffsetDateTime;
use tracing::info;

#[derive(Debug, Clone)]
pub struct SaveOptions {
    /// When true, zero timestamps in the manifest for reproducible files.
    pub deterministic: bool,
    /// Only accept compression if it saves at least this fraction.
    /// e.g. 0.05 means "compress only if >=5% smaller than STORE".
    pub min_gain: f32,
    pub level: i32,
}

impl Default for SaveOptions {
    fn default() -> Self {
        Self {
            deterministic: false,
            min_gain: 0.05,
            level: 3,
        }
    }
}

impl SaveOptions {
    pub fn deterministic(mut self, on: bool) -> Self {
        self.deterministic = on;
        self
    }

    pub fn min_gain(mut self, gain: f32) -> Self {
        self.min_gain = gain;
        self
    }
}

fn should_compress(u: usize, c: usize, min_gain: f32) -> bool {
    // true if (u - c) >= u * min_gain  ⇔  c <= u * (1 - min_gain)
    (u as f64 - c as f64) >= (u as f64 * min_gain as f64)
}

fn column_bytes(col: &Column) -> Vec<u8> {
    match col {
        Column::Float(v) => v.iter().flat_map(|x| x.to_le_bytes()).collect(),
        Column::Int(v) => v.iter().flat_map(|x| x.to_le_bytes()).collect(),
    }
}

struct EncodedColumn {
    hash: [u8; 32],
    u_size: u64,
    codec: CodecId,
    payload: Vec<u8>,
}

/// Write `ds` to a single archive file at `out`.
pub fn save_dataset(ds: &Dataset, out: &Path, opts: &SaveOptions) -> Result<()> {
    if !(0.0..1.0).contains(&opts.min_gain) {
        return Err(MeraError::usage(format!("min_gain {} not in [0, 1)", opts.min_gain)));
    }
    let table = ds.table();

    let encoded: Vec<EncodedColumn> = table
        .columns()
        .par_iter() // In parallel, each column independent
        .map(|col| -> Result<EncodedColumn> {
            let raw = column_bytes(col);
            let hash = *blake3::hash(&raw).as_bytes();
            let z = ZstdCompressor.compress(&raw, opts.level)?;
            let (codec, payload) = if should_compress(raw.len(), z.len(), opts.min_gain) {
                (CodecId::Zstd, z)
            } else {
                (CodecId::Store, raw)
            };
            Ok(EncodedColumn {
                hash,
                u_size: (col.len() * 8) as u64,
                codec,
                payload,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let created = if opts.deterministic {
        0
    } else {
        OffsetDateTime::now_utc().unix_timestamp()
    };
    let manifest = Manifest {
        kind: ds.kind(),
        info: ds.info().as_ref().clone(),
        variables: ds.variables().to_vec(),
        lmin: ds.lmin(),
        lmax: ds.lmax(),
        bounds: ds.bounds(),
        rows: table.len() as u64,
        spans: table.spans().to_vec(),
        columns: table
            .names()
            .iter()
            .zip(table.columns())
            .enumerate()
            .map(|(i, (name, col))| ColumnEntry {
                name: name.clone(),
                kind: col.kind(),
                chunk: i as u64,
            })
            .collect(),
        meta: Meta {
            created,
            tool: format!("mera-core/{}", env!("CARGO_PKG_VERSION")),
        },
    };
    let mut manifest_buf = Vec::new();
    ciborium::ser::into_writer(&manifest, &mut manifest_buf)
        .map_err(|e| MeraError::format(format!("manifest encode: {e}")))?;
    let manifest_len = manifest_buf.len() as u64;

    let chunk_table_off = HEADER_LEN + manifest_len;
    let chunk_count = encoded.len() as u64;
    let data_off = chunk_table_off + chunk_count * ENTRY_SIZE as u64;
    let mut cursor = data_off;
    let entries: Vec<ChunkEntry> = encoded
        .iter()
        .map(|e| {
            let ce = ChunkEntry {
                codec: e.codec as u8,
                u_size: e.u_size,
                c_size: e.payload.len() as u64,
                data_off: cursor,
                hash: e.hash,
            };
            cursor += ce.c_size;
            ce
        })
        .collect();
    let mut table_buf = Vec::with_capacity(entries.len() * ENTRY_SIZE);
    write_table(&mut table_buf, &entries)?;

    let mut data_hasher = blake3::Hasher::new();
    let mut out_f = BufWriter::new(File::create(out)?);
    Superblock {
        version: VERSION,
        manifest_len,
        chunk_table_off,
        chunk_count,
        data_off,
    }
    .write_to(&mut out_f)?;
    out_f.write_all(&manifest_buf)?;
    out_f.write_all(&table_buf)?;
    for e in &encoded {
        data_hasher.update(&e.payload);
        out_f.write_all(&e.payload)?;
    }
    let tail = TailSummary {
        manifest_blake3: *blake3::hash(&manifest_buf).as_bytes(),
        chunktab_blake3: *blake3::hash(&table_buf).as_bytes(),
        data_blake3: *data_hasher.finalize().as_bytes(),
        total_u: entries.iter().map(|e| e.u_size).sum(),
        total_c: entries.iter().map(|e| e.c_size).sum(),
        rows: table.len() as u64,
    };
    out_f.write_all(&tail.to_bytes())?;
    out_f.flush()?;

    info!(
        path = %out.display(),
        kind = %ds.kind(),
        rows = table.len(),
        columns = entries.len(),
        total_u = tail.total_u,
        total_c = tail.total_c,
        "saved dataset"
    );
    Ok(())
}
