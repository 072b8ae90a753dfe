use bincode::Options;

use super::{Codec, Fields};
use crate::utils::{Error, Result};

// A body can never exceed what a u16 frame length describes.
const BODY_LIMIT: u64 = u16::MAX as u64;

/// `bincode` encoding of the field map.
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeCodec;

fn options() -> impl Options {
    bincode::DefaultOptions::new().with_limit(BODY_LIMIT)
}

impl Codec for NativeCodec {
    fn encode(&self, fields: &Fields) -> Result<Vec<u8>> {
        options()
            .serialize(fields)
            .map_err(|e| Error::format(format!("native encode: {e}")))
    }

    fn decode(&self, bytes: &[u8]) -> Result<Fields> {
        options()
            .deserialize(bytes)
            .map_err(|e| Error::format(format!("native decode: {e}")))
    }
}
