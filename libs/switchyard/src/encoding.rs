// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! Response body decoders, resolved by name.
//!
//! A [`Decoder`] reads a byte stream and merges what it finds into a value
//! map. Only the trivial codecs live here; anything heavier (XML, RSS, ...)
//! is registered by the composition root. Unknown names decode as JSON.

use std::io::Read;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::error::DecodeError;
use crate::registry::Registry;

/// Decodes a stream into `out`.
pub type Decoder = Arc<
    dyn Fn(&mut dyn Read, &mut Map<String, Value>) -> Result<(), DecodeError> + Send + Sync,
>;

/// Builds a decoder. The flag asks for array payloads to be accepted and
/// wrapped under [`COLLECTION_KEY`].
pub type DecoderFactory = Arc<dyn Fn(bool) -> Decoder + Send + Sync>;

pub const JSON: &str = "json";
pub const JSON_COLLECTION: &str = "json-collection";
pub const STRING: &str = "string";
pub const NOOP: &str = "no-op";
pub const RAW: &str = "raw";

/// Key holding array payloads.
pub const COLLECTION_KEY: &str = "collection";

/// Key holding string payloads.
pub const CONTENT_KEY: &str = "content";

/// JSON object decoder; arrays are accepted when `is_collection` is set.
pub fn json(is_collection: bool) -> Decoder {
    Arc::new(move |reader: &mut dyn Read, out: &mut Map<String, Value>| {
        let value: Value = serde_json::from_reader(reader)?;
        match value {
            Value::Object(map) if !is_collection => {
                out.extend(map);
                Ok(())
            }
            Value::Array(items) if is_collection => {
                out.insert(COLLECTION_KEY.to_string(), Value::Array(items));
                Ok(())
            }
            _ => Err(DecodeError::UnexpectedShape {
                expected: if is_collection { "array" } else { "object" },
            }),
        }
    })
}

/// Stores the whole payload as text under [`CONTENT_KEY`].
pub fn string(_is_collection: bool) -> Decoder {
    Arc::new(|reader: &mut dyn Read, out: &mut Map<String, Value>| {
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf)?;
        let text = String::from_utf8(buf).map_err(|_| DecodeError::Utf8)?;
        out.insert(CONTENT_KEY.to_string(), Value::String(text));
        Ok(())
    })
}

/// Leaves `out` untouched and does not read the stream.
pub fn noop(_is_collection: bool) -> Decoder {
    Arc::new(|_: &mut dyn Read, _: &mut Map<String, Value>| Ok(()))
}

/// Decoder factories keyed by name.
pub struct DecoderRegistry {
    factories: Registry<DecoderFactory>,
}

impl Default for DecoderRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl DecoderRegistry {
    /// A registry holding the built-in `json`, `json-collection`, `string`,
    /// `no-op` and `raw` decoders.
    pub fn with_defaults() -> Self {
        let registry = Self {
            factories: Registry::new(),
        };
        registry.register(JSON, Arc::new(json));
        registry.register(JSON_COLLECTION, Arc::new(|_: bool| json(true)));
        registry.register(STRING, Arc::new(string));
        registry.register(NOOP, Arc::new(noop));
        registry.register(RAW, Arc::new(noop));
        registry
    }

    pub fn register(&self, name: &str, factory: DecoderFactory) {
        self.factories.register(name, factory);
    }

    /// Returns the decoder called `name`, falling back to JSON.
    pub fn resolve(&self, name: &str, is_collection: bool) -> Decoder {
        match self.factories.get(name) {
            Some(factory) => factory(is_collection),
            None => {
                tracing::debug!(encoding = %name, "Unknown encoding, decoding as JSON");
                json(is_collection)
            }
        }
    }
}
