use serde::{Deserialize, Serialize};

use crate::DEFAULT_ARENA_LIMIT;

/// What the codec emits when compressing a field wouldn't make it smaller.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackMode {
    /// Emit the field exactly as it was, with no extension wrapper. This is the authoritative
    /// behavior: wrapping never makes a field larger.
    #[default]
    Unwrapped,
    /// Keep the extension wrapper, but tag the payload as [`Algorithm::None`][crate::Algorithm]
    /// and store the raw field inside it. The field grows by the wrapper's size.
    TaggedNone,
}

/// Codec settings. Every field is optional when deserializing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CompressionConfig {
    /// zstd compression level.
    pub zstd_level: i32,
    /// Behavior when compression doesn't help.
    pub fallback: FallbackMode,
    /// Scratch memory limit for arenas created from this configuration.
    pub arena_limit: usize,
}

impl CompressionConfig {
    /// Create a new arena sized by this configuration.
    pub fn new_arena(&self) -> crate::Arena {
        crate::Arena::with_limit(self.arena_limit)
    }
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            zstd_level: 5,
            fallback: FallbackMode::Unwrapped,
            arena_limit: DEFAULT_ARENA_LIMIT,
        }
    }
}
