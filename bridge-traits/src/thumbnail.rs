//! Thumbnail decode bridge.

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::Result;

/// Decoded artwork ready for a notification or list row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Thumbnail {
    pub width: u32,
    pub height: u32,
    /// Encoded or raw pixel payload, as the host's image layer expects it.
    pub pixels: Bytes,
}

impl Thumbnail {
    pub fn new(width: u32, height: u32, pixels: Bytes) -> Self {
        Self {
            width,
            height,
            pixels,
        }
    }

    /// Size of the pixel payload in bytes.
    pub fn byte_len(&self) -> usize {
        self.pixels.len()
    }
}

/// Extracts embedded artwork for an audio file.
#[async_trait]
pub trait ThumbnailLoader: Send + Sync {
    /// Decode the thumbnail for `path`. `Ok(None)` means the file carries no
    /// artwork.
    async fn load(&self, path: &str) -> Result<Option<Thumbnail>>;
}
