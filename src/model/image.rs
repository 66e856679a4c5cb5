//! Uploaded image bytes plus the content type sent upstream

use base64::{engine::general_purpose::STANDARD, Engine as _};
use bytes::Bytes;

/// Content type assumed when neither the upload nor the bytes say otherwise
pub const FALLBACK_MIME: &str = "image/jpeg";

/// An uploaded image, immutable once stored
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageData {
    bytes: Bytes,
    mime: String,
}

impl ImageData {
    /// Wrap raw bytes. A declared `image/*` type is trusted; anything else
    /// falls back to sniffing the leading bytes.
    pub fn new(bytes: impl Into<Bytes>, declared_mime: Option<&str>) -> Self {
        let bytes = bytes.into();
        let mime = declared_mime
            .map(str::trim)
            .filter(|m| m.starts_with("image/"))
            .map(str::to_string)
            .unwrap_or_else(|| sniff_mime(&bytes).to_string());
        Self { bytes, mime }
    }

    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    pub fn mime(&self) -> &str {
        &self.mime
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// `data:` URL suitable for an `image_url` content part
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime, STANDARD.encode(&self.bytes))
    }
}

/// Guess an image content type from magic bytes
pub fn sniff_mime(bytes: &[u8]) -> &'static str {
    if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        "image/jpeg"
    } else if bytes.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]) {
        "image/png"
    } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        "image/gif"
    } else if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        "image/webp"
    } else {
        FALLBACK_MIME
    }
}
