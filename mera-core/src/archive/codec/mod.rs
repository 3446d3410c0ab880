use crate::error::{MeraError, Result};

#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, serde::Serialize)]
pub enum CodecId {
    Store = 0,
    Zstd = 1,
}

impl CodecId {
    pub fn from_u8(v: u8) -> Result<Self> {
        match v {
            0 => Ok(Self::Store),
            1 => Ok(Self::Zstd),
            other => Err(MeraError::format(format!("unknown codec id {other}"))),
        }
    }

    pub fn compressor(self) -> &'static dyn Compressor {
        match self {
            Self::Store => &store::Store,
            Self::Zstd => &zstdc::ZstdCompressor,
        }
    }
}

pub trait Compressor: Send + Sync {
    fn id(&self) -> CodecId;
    fn compress(&self, src: &[u8], level: i32) -> Result<Vec<u8>>;
    /// `u_size` is the expected decompressed length.
    fn decompress(&self, src: &[u8], u_size: usize) -> Result<Vec<u8>>;
}

pub mod store;
pub mod zstdc;
