use super::{CodecId, Compressor};
use crate::error::{MeraError, Result};

pub struct ZstdCompressor;

impl Compressor for ZstdCompressor {
    fn id(&self) -> CodecId {
        CodecId::Zstd
    }

    fn compress(&self, src: &[u8], level: i32) -> Result<Vec<u8>> {
        Ok(zstd::bulk::compress(src, level.max(1))?)
    }

    fn decompress(&self, src: &[u8], u_size: usize) -> Result<Vec<u8>> {
        let out = zstd::bulk::decompress(src, u_size)
            .map_err(|e| MeraError::format(format!("zstd frame: {e}")))?;
        if out.len() != u_size {
            return Err(MeraError::format(format!(
                "zstd frame decoded to {} bytes, expected {u_size}",
                out.len()
            )));
        }
        Ok(out)
    }
}
