//! Profile Image Type - validated image bytes for the profile picture
//!
//! Accepts PNG, JPEG and WebP. The format is sniffed from the magic bytes,
//! the payload itself is kept exactly as given.

use image::ImageFormat;
use serde::{Deserialize, Serialize};

use crate::error::ImageError;

/// Profile picture bytes with their detected format
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileImage {
    data: Vec<u8>,
    mime_type: String,
}

impl ProfileImage {
    /// Validate raw bytes as a profile image.
    ///
    /// `limit` caps the payload size in bytes.
    pub fn from_bytes(data: Vec<u8>, limit: usize) -> Result<Self, ImageError> {
        if data.is_empty() {
            return Err(ImageError::Empty);
        }
        if data.len() > limit {
            return Err(ImageError::TooLarge {
                size: data.len(),
                limit,
            });
        }

        let format =
            image::guess_format(&data).map_err(|e| ImageError::UnsupportedFormat(e.to_string()))?;
        let mime_type = match format {
            ImageFormat::Png => "image/png",
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::WebP => "image/webp",
            other => return Err(ImageError::UnsupportedFormat(format!("{:?}", other))),
        };

        Ok(Self {
            data,
            mime_type: mime_type.to_string(),
        })
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// BLAKE3 content hash (hex), used to address the stored asset
    pub fn content_hash(&self) -> String {
        blake3::hash(&self.data).to_hex().to_string()
    }
}

// Image payloads can be large; keep Debug output readable.
impl std::fmt::Debug for ProfileImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProfileImage")
            .field("mime_type", &self.mime_type)
            .field("len", &self.data.len())
            .finish()
    }
}

/// Minimal PNG header, enough for format detection in tests
#[cfg(test)]
pub(crate) fn test_png_bytes() -> Vec<u8> {
    let mut bytes = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
    bytes.extend_from_slice(&[0u8; 24]);
    bytes
}
