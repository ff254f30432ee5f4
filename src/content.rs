//! Content-type encoders and decoders
//!
//! Objects stored through the JSON-aware facade are encoded with the function
//! registered for their content type. Lookup is two-level: the bucket's own
//! registry first, then the client's.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::error::{Result, RiakError};

pub const JSON: &str = "application/json";
pub const TEXT: &str = "text/plain";
pub const BINARY: &str = "application/octet-stream";

/// Turns a value into stored bytes
pub type Encoder = Arc<dyn Fn(&Value) -> Result<Vec<u8>> + Send + Sync>;

/// Turns stored bytes back into a value
pub type Decoder = Arc<dyn Fn(&[u8]) -> Result<Value> + Send + Sync>;

/// Encoders and decoders by content type
#[derive(Clone, Default)]
pub struct ContentCodecs {
    encoders: HashMap<String, Encoder>,
    decoders: HashMap<String, Decoder>,
}

impl ContentCodecs {
    /// Empty registry (what a bucket starts with)
    pub fn new() -> Self {
        Self::default()
    }

    /// JSON and plain text (what a client starts with)
    pub fn with_defaults() -> Self {
        let mut codecs = Self::new();
        codecs.set_encoder(JSON, |value: &Value| {
            serde_json::to_vec(value).map_err(|e| RiakError::Codec(e.to_string()))
        });
        codecs.set_decoder(JSON, |bytes: &[u8]| {
            serde_json::from_slice(bytes).map_err(|e| RiakError::Codec(e.to_string()))
        });
        codecs.set_encoder(TEXT, |value: &Value| match value {
            Value::String(s) => Ok(s.as_bytes().to_vec()),
            other => Ok(other.to_string().into_bytes()),
        });
        codecs.set_decoder(TEXT, |bytes: &[u8]| {
            String::from_utf8(bytes.to_vec())
                .map(Value::String)
                .map_err(|e| RiakError::Codec(e.to_string()))
        });
        codecs
    }

    pub fn set_encoder<F>(&mut self, content_type: &str, encoder: F)
    where
        F: Fn(&Value) -> Result<Vec<u8>> + Send + Sync + 'static,
    {
        self.encoders.insert(content_type.to_string(), Arc::new(encoder));
    }

    pub fn set_decoder<F>(&mut self, content_type: &str, decoder: F)
    where
        F: Fn(&[u8]) -> Result<Value> + Send + Sync + 'static,
    {
        self.decoders.insert(content_type.to_string(), Arc::new(decoder));
    }

    pub fn encoder(&self, content_type: &str) -> Option<Encoder> {
        self.encoders.get(content_type).cloned()
    }

    pub fn decoder(&self, content_type: &str) -> Option<Decoder> {
        self.decoders.get(content_type).cloned()
    }
}

impl fmt::Debug for ContentCodecs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut encoders: Vec<_> = self.encoders.keys().collect();
        let mut decoders: Vec<_> = self.decoders.keys().collect();
        encoders.sort();
        decoders.sort();
        f.debug_struct("ContentCodecs")
            .field("encoders", &encoders)
            .field("decoders", &decoders)
            .finish()
    }
}
