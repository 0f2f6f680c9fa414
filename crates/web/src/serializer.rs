//! Typed message encoding for code that passes objects over a connection.
//!
//! The HTTP and WebSocket core never serializes anything itself; a [`Serializer`] is
//! handed to the handlers that need one.

use bytes::{BufMut, BytesMut};
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SerializeError {
    #[error("json error: {source}")]
    Json {
        #[from]
        source: serde_json::Error,
    },
}

/// Converts values to bytes and back.
pub trait Serializer: Send + Sync {
    /// Appends the encoding of `value` to `dst`.
    fn write<T: Serialize + ?Sized>(&self, value: &T, dst: &mut BytesMut) -> Result<(), SerializeError>;

    fn read<T: DeserializeOwned>(&self, src: &[u8]) -> Result<T, SerializeError>;
}

/// JSON text, one value per call.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonSerializer;

impl Serializer for JsonSerializer {
    fn write<T: Serialize + ?Sized>(&self, value: &T, dst: &mut BytesMut) -> Result<(), SerializeError> {
        serde_json::to_writer(dst.writer(), value)?;
        Ok(())
    }

    fn read<T: DeserializeOwned>(&self, src: &[u8]) -> Result<T, SerializeError> {
        Ok(serde_json::from_slice(src)?)
    }
}
