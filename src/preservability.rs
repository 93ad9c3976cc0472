//! Preservability classification, run after identification.
//!
//! Raster images are checked against a minimum pixel count; other binary files are
//! checked against a minimum size; everything else is preservable by default.
use std::{
    path::Path,
    sync::Mutex,
};

use memchr::memchr;

use crate::logger::warn;

/// The set of PUIDs that denote raster image formats subject to pixel-count probing.
const RASTER_IMAGE_PUIDS: &[&str] = &[
    "fmt/3", "fmt/4", "fmt/11", "fmt/13", "fmt/41", "fmt/42", "fmt/43", "fmt/44", "fmt/115",
    "fmt/116", "fmt/124", "fmt/353", "fmt/645", "x-fmt/390", "x-fmt/391",
];

/// Minimum pixel count (width * height) for a raster image to be considered preservable.
const MIN_PIXEL_COUNT: u64 = 20_000;

/// Minimum size, in bytes, for a binary file (that is not a raster image) to be
/// considered preservable.
const MIN_BINARY_SIZE: u64 = 1024;

/// The PDF magic number `%PDF`, as hex.
const PDF_MAGIC_HEX: &str = "25504446";

/// Serializes access to the underlying image-decoding library's global decompression-bomb
/// threshold, which is process-wide state.
static IMAGE_DECODE_LOCK: Mutex<()> = Mutex::new(());

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Preservability {
    Preservable,
    NotPreservable(String),
}

/// Determine whether `content` looks binary: contains a null byte, contains the PDF
/// magic number, or is already identified as Microsoft Word markup (`aca-fmt/2`).
pub fn is_binary(content: &[u8], puid: Option<&str>) -> bool {
    if memchr(0, content).is_some() {
        return true;
    }
    if puid == Some("aca-fmt/2") {
        return true;
    }
    let hex = data_encoding::HEXLOWER.encode(content);
    hex.contains(PDF_MAGIC_HEX)
}

/// Probe the pixel dimensions of an image file, serialized behind [`IMAGE_DECODE_LOCK`]
/// since the underlying decoder's decompression-bomb threshold is global state.
fn probe_pixel_count(path: &Path) -> Result<u64, image::ImageError> {
    let _guard = IMAGE_DECODE_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let (width, height) = image::image_dimensions(path)?;
    Ok(u64::from(width) * u64::from(height))
}

/// Classify a file's preservability, given its identified PUID, raw content, size, and
/// filesystem path (used only for the image pixel probe).
pub fn classify(path: &Path, content: &[u8], size: u64, puid: Option<&str>) -> Preservability {
    if let Some(puid) = puid
        && RASTER_IMAGE_PUIDS.contains(&puid)
    {
        return match probe_pixel_count(path) {
            Ok(pixels) if pixels < MIN_PIXEL_COUNT => {
                Preservability::NotPreservable("Image contains less than 20000 pixels.".into())
            }
            Ok(_) => Preservability::Preservable,
            Err(err) => {
                warn!(
                    "Could not determine pixel count for '{}': {err}; treating as preservable",
                    path.display()
                );
                Preservability::Preservable
            }
        };
    }

    if is_binary(content, puid) && size < MIN_BINARY_SIZE {
        return Preservability::NotPreservable("Binary file is less than 1 kb.".into());
    }

    Preservability::Preservable
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_null_byte() {
        assert!(is_binary(b"abc\0def", None));
    }

    #[test]
    fn detects_pdf_magic() {
        assert!(is_binary(b"%PDF-1.4 rest of file", None));
    }

    #[test]
    fn aca_fmt_2_is_binary() {
        assert!(is_binary(b"plain text", Some("aca-fmt/2")));
    }

    #[test]
    fn plain_text_is_not_binary() {
        assert!(!is_binary(b"hello world", None));
    }
}
