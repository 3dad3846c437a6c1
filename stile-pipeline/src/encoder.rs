use bytes::Bytes;
use serde::Serialize;
use std::sync::{Arc, OnceLock};
use stile_core::AccessRecord;
use thiserror::Error;

/// Serialization failure, cached alongside the encoder.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("encode failed: {0}")]
pub struct EncodeError(String);

impl From<serde_json::Error> for EncodeError {
    fn from(e: serde_json::Error) -> Self {
        EncodeError(e.to_string())
    }
}

/// Serializes a value to JSON at most once.
///
/// The broker client asks for the length before the bytes; both come from
/// the same cached result. A failure is cached too and never retried.
pub struct LazyEncoder<T> {
    value: Arc<T>,
    encoded: OnceLock<Result<Bytes, EncodeError>>,
}

pub type AccessEncoder = LazyEncoder<AccessRecord>;

impl<T: Serialize> LazyEncoder<T> {
    pub fn new(value: Arc<T>) -> Self {
        Self {
            value,
            encoded: OnceLock::new(),
        }
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    /// Encoded length in bytes; 0 when encoding failed.
    pub fn len(&self) -> usize {
        match self.encoded() {
            Ok(bytes) => bytes.len(),
            Err(_) => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn encode(&self) -> Result<Bytes, EncodeError> {
        self.encoded().clone()
    }

    fn encoded(&self) -> &Result<Bytes, EncodeError> {
        self.encoded.get_or_init(|| {
            serde_json::to_vec(&*self.value)
                .map(Bytes::from)
                .map_err(EncodeError::from)
        })
    }
}
