//! Configuration for bulk reads.

use serde::{Deserialize, Serialize};

use crate::types::ByteOrder;

/// Configuration for the bulk reader and structure layouts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReaderConfig {
    /// Largest destination array, in elements, a read may allocate.
    pub max_request_elems: u64,

    /// Byte order used when a read does not specify one.
    pub byte_order: ByteOrder,

    /// Store nested structure members on the heap instead of inline.
    pub structures_on_heap: bool,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            max_request_elems: i32::MAX as u64,
            byte_order: ByteOrder::BigEndian,
            structures_on_heap: false,
        }
    }
}

impl ReaderConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("ARRAY_IO_MAX_REQUEST_ELEMS") {
            if let Ok(limit) = val.parse() {
                config.max_request_elems = limit;
            }
        }

        if let Ok(val) = std::env::var("ARRAY_IO_BYTE_ORDER") {
            config.byte_order = ByteOrder::from_str(&val);
        }

        if let Ok(val) = std::env::var("ARRAY_IO_STRUCTURES_ON_HEAP") {
            config.structures_on_heap = val.to_lowercase() == "true" || val == "1";
        }

        config
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_request_elems == 0 {
            return Err("max_request_elems must be > 0".to_string());
        }

        if self.max_request_elems > i32::MAX as u64 {
            return Err(format!(
                "max_request_elems must be <= {}",
                i32::MAX
            ));
        }

        Ok(())
    }
}
