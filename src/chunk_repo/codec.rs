// Chunk blob format: [version: u8][wincode payload].
// Version 1 = Chunk with frontier ids. Unknown versions are rejected rather than guessed at.

use crate::models::Chunk;

pub const CHUNK_FORMAT_VERSION: u8 = 1;

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("empty chunk blob")]
    Empty,
    #[error("unknown chunk format version {0}")]
    UnknownVersion(u8),
    #[error("wincode encode: {0}")]
    Encode(String),
    #[error("wincode decode: {0}")]
    Decode(String),
}

pub fn encode(chunk: &Chunk) -> Result<Vec<u8>, CodecError> {
    let payload = wincode::serialize(chunk).map_err(|e| CodecError::Encode(e.to_string()))?;
    let mut out = Vec::with_capacity(1 + payload.len());
    out.push(CHUNK_FORMAT_VERSION);
    out.extend_from_slice(&payload);
    Ok(out)
}

pub fn decode(bytes: &[u8]) -> Result<Chunk, CodecError> {
    let (&version, payload) = bytes.split_first().ok_or(CodecError::Empty)?;
    if version != CHUNK_FORMAT_VERSION {
        return Err(CodecError::UnknownVersion(version));
    }
    wincode::deserialize(payload).map_err(|e| CodecError::Decode(e.to_string()))
}
