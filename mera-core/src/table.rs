//! Columnar, append-only row store.
//!
//! Every shard decodes into its own [`ShardRows`] without touching shared
//! state; [`Schema::concat`] stitches them together in shard order and records
//! which row range came from which shard. Tables are never mutated after that:
//! selections build new tables.

use crate::error::{MeraError, Result};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnKind {
    Float,
    Int,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Column {
    Float(Vec<f64>),
    Int(Vec<i64>),
}

impl Column {
    pub fn empty(kind: ColumnKind) -> Self {
        match kind {
            ColumnKind::Float => Self::Float(Vec::new()),
            ColumnKind::Int => Self::Int(Vec::new()),
        }
    }

    pub fn kind(&self) -> ColumnKind {
        match self {
            Self::Float(_) => ColumnKind::Float,
            Self::Int(_) => ColumnKind::Int,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Float(v) => v.len(),
            Self::Int(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_f64(&self) -> Cow<'_, [f64]> {
        match self {
            Self::Float(v) => Cow::Borrowed(v),
            Self::Int(v) => Cow::Owned(v.iter().map(|&x| x as f64).collect()),
        }
    }

    pub fn as_i64(&self) -> Option<&[i64]> {
        match self {
            Self::Int(v) => Some(v),
            Self::Float(_) => None,
        }
    }

    fn take(&self, rows: &[usize]) -> Self {
        match self {
            Self::Float(v) => Self::Float(rows.iter().map(|&i| v[i]).collect()),
            Self::Int(v) => Self::Int(rows.iter().map(|&i| v[i]).collect()),
        }
    }

    fn append(&mut self, other: Column) -> Result<()> {
        match (self, other) {
            (Self::Float(a), Self::Float(b)) => a.extend(b),
            (Self::Int(a), Self::Int(b)) => a.extend(b),
            _ => return Err(MeraError::format("column kind mismatch while merging shards")),
        }
        Ok(())
    }
}

/// Ordered column names and kinds shared by all shards of one load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    fields: Vec<(String, ColumnKind)>,
}

impl Schema {
    pub fn new() -> Self {
        Self { fields: Vec::new() }
    }

    /// Add a column and return its position.
    pub fn push(&mut self, name: impl Into<String>, kind: ColumnKind) -> usize {
        self.fields.push((name.into(), kind));
        self.fields.len() - 1
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|(n, _)| n == name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(n, _)| n.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn shard(&self, shard: u32) -> ShardRows {
        ShardRows {
            shard,
            columns: self.fields.iter().map(|(_, k)| Column::empty(*k)).collect(),
        }
    }

    /// Concatenate shard accumulators in the order given.
    pub fn concat(&self, shards: Vec<ShardRows>) -> Result<Table> {
        let mut columns: Vec<Column> = self.fields.iter().map(|(_, k)| Column::empty(*k)).collect();
        let mut spans = Vec::with_capacity(shards.len());
        let mut len = 0usize;
        for s in shards {
            let n = s.len();
            if s.columns.len() != columns.len() {
                return Err(MeraError::format(format!(
                    "shard {} has {} columns, schema has {}",
                    s.shard,
                    s.columns.len(),
                    columns.len()
                )));
            }
            if n == 0 {
                continue;
            }
            for (dst, src) in columns.iter_mut().zip(s.columns) {
                if src.len() != n {
                    return Err(MeraError::format(format!("ragged columns in shard {}", s.shard)));
                }
                dst.append(src)?;
            }
            spans.push(ShardSpan {
                shard: s.shard,
                start: len,
                end: len + n,
            });
            len += n;
        }
        Ok(Table {
            names: self.fields.iter().map(|(n, _)| n.clone()).collect(),
            columns,
            spans,
            len,
        })
    }
}

impl Default for Schema {
    fn default() -> Self {
        Self::new()
    }
}

/// Rows decoded from one shard.
#[derive(Debug)]
pub struct ShardRows {
    pub shard: u32,
    columns: Vec<Column>,
}

impl ShardRows {
    pub fn len(&self) -> usize {
        self.columns.first().map_or(0, Column::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn push_f64(&mut self, col: usize, v: f64) {
        match &mut self.columns[col] {
            Column::Float(c) => c.push(v),
            Column::Int(c) => c.push(v as i64),
        }
    }

    #[inline]
    pub fn push_i64(&mut self, col: usize, v: i64) {
        match &mut self.columns[col] {
            Column::Int(c) => c.push(v),
            Column::Float(c) => c.push(v as f64),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardSpan {
    pub shard: u32,
    pub start: usize,
    pub end: usize,
}

impl ShardSpan {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    names: Vec<String>,
    columns: Vec<Column>,
    spans: Vec<ShardSpan>,
    len: usize,
}

impl Table {
    /// Assemble from parts, checking that every column has `len` rows and the
    /// spans tile `0..len`.
    pub fn from_parts(names: Vec<String>, columns: Vec<Column>, spans: Vec<ShardSpan>) -> Result<Self> {
        if names.len() != columns.len() {
            return Err(MeraError::format("column name/data count mismatch"));
        }
        let len = columns.first().map_or(0, Column::len);
        if columns.iter().any(|c| c.len() != len) {
            return Err(MeraError::format("ragged table columns"));
        }
        let mut cursor = 0;
        for s in &spans {
            if s.start != cursor || s.end < s.start {
                return Err(MeraError::format("shard spans do not tile the table"));
            }
            cursor = s.end;
        }
        if cursor != len {
            return Err(MeraError::format("shard spans do not cover the table"));
        }
        Ok(Self {
            names,
            columns,
            spans,
            len,
        })
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn spans(&self) -> &[ShardSpan] {
        &self.spans
    }

    pub fn has(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|i| &self.columns[i])
    }

    pub fn f64s(&self, name: &str) -> Result<Cow<'_, [f64]>> {
        self.column(name)
            .map(Column::as_f64)
            .ok_or_else(|| MeraError::unknown_variable(name))
    }

    pub fn i64s(&self, name: &str) -> Result<&[i64]> {
        match self.column(name) {
            Some(c) => c
                .as_i64()
                .ok_or_else(|| MeraError::format(format!("column {name} is not integer"))),
            None => Err(MeraError::unknown_variable(name)),
        }
    }

    /// New table holding `rows` (ascending, in range) of this one.
    pub fn select(&self, rows: &[usize]) -> Table {
        let columns = self.columns.iter().map(|c| c.take(rows)).collect();
        let mut spans = Vec::new();
        let mut k = 0usize;
        for s in &self.spans {
            let start = k;
            while k < rows.len() && rows[k] < s.end {
                k += 1;
            }
            if k > start {
                spans.push(ShardSpan {
                    shard: s.shard,
                    start,
                    end: k,
                });
            }
        }
        Table {
            names: self.names.clone(),
            columns,
            spans,
            len: rows.len(),
        }
    }

    /// Rows where `keep` is true. `keep` must have one entry per row.
    pub fn filter(&self, keep: &[bool]) -> Table {
        debug_assert_eq!(keep.len(), self.len);
        let rows: Vec<usize> = keep
            .iter()
            .enumerate()
            .filter_map(|(i, &k)| k.then_some(i))
            .collect();
        self.select(&rows)
    }

    /// Row index → shard id.
    pub fn shard_of(&self, row: usize) -> Option<u32> {
        self.spans
            .iter()
            .find(|s| s.start <= row && row < s.end)
            .map(|s| s.shard)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_shards() -> Table {
        let mut schema = Schema::new();
        let rho = schema.push("rho", ColumnKind::Float);
        let lvl = schema.push("level", ColumnKind::Int);
        let mut a = schema.shard(1);
        for i in 0..3 {
            a.push_f64(rho, i as f64);
            a.push_i64(lvl, 5);
        }
        let empty = schema.shard(2);
        let mut b = schema.shard(3);
        b.push_f64(rho, 10.0);
        b.push_i64(lvl, 6);
        schema.concat(vec![a, empty, b]).unwrap()
    }

    #[test]
    fn concat_records_spans_and_skips_empty_shards() {
        let t = two_shards();
        assert_eq!(t.len(), 4);
        assert_eq!(
            t.spans(),
            &[
                ShardSpan { shard: 1, start: 0, end: 3 },
                ShardSpan { shard: 3, start: 3, end: 4 }
            ]
        );
        assert_eq!(t.f64s("rho").unwrap().as_ref(), &[0.0, 1.0, 2.0, 10.0]);
        assert_eq!(t.i64s("level").unwrap(), &[5, 5, 5, 6]);
        assert_eq!(t.shard_of(3), Some(3));
    }

    #[test]
    fn filter_rebuilds_spans() {
        let t = two_shards();
        let f = t.filter(&[false, true, false, true]);
        assert_eq!(f.len(), 2);
        assert_eq!(f.f64s("rho").unwrap().as_ref(), &[1.0, 10.0]);
        assert_eq!(f.spans().len(), 2);
        assert_eq!(f.spans()[1], ShardSpan { shard: 3, start: 1, end: 2 });
    }

    #[test]
    fn unknown_column_is_key_not_found() {
        let t = two_shards();
        assert!(matches!(t.f64s("zz"), Err(MeraError::KeyNotFound { .. })));
        assert!(t.i64s("rho").is_err());
    }

    #[test]
    fn from_parts_validates_layout() {
        let ok = Table::from_parts(
            vec!["a".into()],
            vec![Column::Float(vec![1.0, 2.0])],
            vec![ShardSpan { shard: 1, start: 0, end: 2 }],
        );
        assert!(ok.is_ok());
        let bad = Table::from_parts(
            vec!["a".into()],
            vec![Column::Float(vec![1.0, 2.0])],
            vec![ShardSpan { shard: 1, start: 0, end: 1 }],
        );
        assert!(bad.is_err());
    }
}
