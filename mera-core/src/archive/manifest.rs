use crate::dataset::DatasetKind;
use crate::geometry::Extent;
use crate::info::InfoRecord;
use crate::table::{ColumnKind, ShardSpan};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ColumnEntry {
    pub name: String,
    pub kind: ColumnKind,
    /// Index into the chunk table.
    pub chunk: u64,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Meta {
    pub created: i64,
    pub tool: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Manifest {
    pub kind: DatasetKind,
    pub info: InfoRecord,
    pub variables: Vec<String>,
    pub lmin: u8,
    pub lmax: u8,
    pub bounds: Extent,
    pub rows: u64,
    pub spans: Vec<ShardSpan>,
    pub columns: Vec<ColumnEntry>,
    pub meta: Meta,
}
