//! Sequential reader for Fortran unformatted files.
//!
//! Every record is framed as `[u32 len][payload][u32 len]`, little endian.
//! Markers that disagree, or a file that ends inside a record, are treated as
//! a corrupt shard: the caller gets a [`MeraError::Format`] naming the file and
//! the record number and nothing is retried.

use crate::error::{MeraError, Result};
use std::fs::File;
use std::io::{BufReader, ErrorKind, Read, Seek};
use std::path::{Path, PathBuf};

const MARKER_LEN: usize = 4;

/// Element type of a record, as spelled in RAMSES file descriptors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum FieldType {
    F64,
    F32,
    I32,
    I64,
    I8,
}

impl FieldType {
    pub fn from_code(code: &str) -> Result<Self> {
        match code.trim() {
            "d" => Ok(Self::F64),
            "f" => Ok(Self::F32),
            "i" => Ok(Self::I32),
            "l" | "q" => Ok(Self::I64),
            "b" => Ok(Self::I8),
            other => Err(MeraError::format(format!("unknown field type code {other:?}"))),
        }
    }

    pub fn width(self) -> usize {
        match self {
            Self::F64 | Self::I64 => 8,
            Self::F32 | Self::I32 => 4,
            Self::I8 => 1,
        }
    }
}

pub struct RecordReader<R> {
    inner: R,
    path: PathBuf,
    record: u64,
}

impl RecordReader<BufReader<File>> {
    pub fn open(path: &Path) -> Result<Self> {
        let f = File::open(path)?;
        Ok(Self::new(BufReader::with_capacity(1 << 16, f), path))
    }
}

impl<R: Read + Seek> RecordReader<R> {
    pub fn new(inner: R, path: &Path) -> Self {
        Self {
            inner,
            path: path.to_path_buf(),
            record: 0,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn corrupt(&self, what: impl std::fmt::Display) -> MeraError {
        MeraError::format(format!(
            "{}: record #{}: {what}",
            self.path.display(),
            self.record
        ))
    }

    fn read_marker(&mut self) -> Result<usize> {
        let mut m = [0u8; MARKER_LEN];
        match self.inner.read_exact(&mut m) {
            Ok(()) => Ok(u32::from_le_bytes(m) as usize),
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => Err(self.corrupt("truncated marker")),
            Err(e) => Err(e.into()),
        }
    }

    fn close_record(&mut self, head: usize) -> Result<()> {
        let tail = self.read_marker()?;
        if tail != head {
            return Err(self.corrupt(format!("marker mismatch: head={head} tail={tail}")));
        }
        self.record += 1;
        Ok(())
    }

    /// Read one record's raw payload.
    pub fn read_record(&mut self) -> Result<Vec<u8>> {
        let len = self.read_marker()?;
        let mut buf = vec![0u8; len];
        match self.inner.read_exact(&mut buf) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => {
                return Err(self.corrupt(format!("truncated payload of {len} bytes")));
            }
            Err(e) => return Err(e.into()),
        }
        self.close_record(len)?;
        Ok(buf)
    }

    /// Skip `n` records without decoding them.
    pub fn skip(&mut self, n: usize) -> Result<()> {
        for _ in 0..n {
            let len = self.read_marker()?;
            self.inner.seek_relative(len as i64)?;
            self.close_record(len)?;
        }
        Ok(())
    }

    fn typed<const W: usize, T>(&mut self, decode: fn([u8; W]) -> T) -> Result<Vec<T>> {
        let raw = self.read_record()?;
        if raw.len() % W != 0 {
            return Err(self.corrupt(format!(
                "payload of {} bytes is not a multiple of {W}",
                raw.len()
            )));
        }
        Ok(raw
            .chunks_exact(W)
            .map(|c| {
                let mut a = [0u8; W];
                a.copy_from_slice(c);
                decode(a)
            })
            .collect())
    }

    pub fn read_i32s(&mut self) -> Result<Vec<i32>> {
        self.typed(i32::from_le_bytes)
    }

    pub fn read_i64s(&mut self) -> Result<Vec<i64>> {
        self.typed(i64::from_le_bytes)
    }

    pub fn read_f64s(&mut self) -> Result<Vec<f64>> {
        self.typed(f64::from_le_bytes)
    }

    pub fn read_f32s(&mut self) -> Result<Vec<f32>> {
        self.typed(f32::from_le_bytes)
    }

    pub fn read_i8s(&mut self) -> Result<Vec<i8>> {
        self.typed(i8::from_le_bytes)
    }

    /// Read a record that must hold exactly `n` values of `i32`.
    pub fn read_i32_exact(&mut self, n: usize) -> Result<Vec<i32>> {
        let v = self.read_i32s()?;
        if v.len() != n {
            return Err(self.corrupt(format!("expected {n} int32 values, found {}", v.len())));
        }
        Ok(v)
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        Ok(self.read_i32_exact(1)?[0])
    }

    /// Read a single non-negative `i32` used as a size or count.
    pub fn read_count(&mut self, what: &str) -> Result<usize> {
        let v = self.read_i32()?;
        usize::try_from(v).map_err(|_| self.corrupt(format!("negative {what}: {v}")))
    }

    pub fn read_f64_exact(&mut self, n: usize) -> Result<Vec<f64>> {
        let v = self.read_f64s()?;
        if v.len() != n {
            return Err(self.corrupt(format!("expected {n} float64 values, found {}", v.len())));
        }
        Ok(v)
    }

    pub fn read_f64(&mut self) -> Result<f64> {
        Ok(self.read_f64_exact(1)?[0])
    }

    /// Read a record of the given element type, widened to `f64`.
    pub fn read_as_f64(&mut self, ty: FieldType) -> Result<Vec<f64>> {
        Ok(match ty {
            FieldType::F64 => self.read_f64s()?,
            FieldType::F32 => self.read_f32s()?.into_iter().map(f64::from).collect(),
            FieldType::I32 => self.read_i32s()?.into_iter().map(f64::from).collect(),
            FieldType::I64 => self.read_i64s()?.into_iter().map(|x| x as f64).collect(),
            FieldType::I8 => self.read_i8s()?.into_iter().map(f64::from).collect(),
        })
    }

    /// Read a record of the given element type, narrowed to `i64`.
    pub fn read_as_i64(&mut self, ty: FieldType) -> Result<Vec<i64>> {
        Ok(match ty {
            FieldType::I32 => self.read_i32s()?.into_iter().map(i64::from).collect(),
            FieldType::I64 => self.read_i64s()?,
            FieldType::I8 => self.read_i8s()?.into_iter().map(i64::from).collect(),
            FieldType::F64 | FieldType::F32 => {
                return Err(self.corrupt("floating point record where an integer was expected"));
            }
        })
    }
}
