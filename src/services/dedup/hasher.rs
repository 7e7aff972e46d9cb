//! Content and perceptual hashing.
//!
//! [`ContentHasher`] produces exact SHA256 digests of raw payloads and text.
//! [`PerceptualHasher`] produces a 64-bit difference hash (dHash) of a decoded
//! image. A dHash survives re-encoding and small resizes, so the same picture
//! posted twice at different JPEG qualities still lands in one group.

use image::imageops::FilterType;
use image::{DynamicImage, GrayImage};
use sha2::{Digest, Sha256};

/// Width of the downscaled grid; one extra column yields 8 comparisons per row.
const DHASH_WIDTH: u32 = 9;
/// Height of the downscaled grid.
const DHASH_HEIGHT: u32 = 8;
/// Largest luminance spread across the downscaled grid that still counts as flat.
const FLAT_SPREAD: u8 = 2;

/// Exact content hasher.
///
/// # Example
///
/// ```rust
/// use chatdedup::services::dedup::ContentHasher;
///
/// let hash = ContentHasher::hash_bytes(b"\x89PNG...");
/// assert_eq!(hash.len(), 64); // SHA256 produces 64 hex chars
/// ```
pub struct ContentHasher;

impl ContentHasher {
    /// Computes the lowercase hex SHA256 of raw bytes.
    #[must_use]
    pub fn hash_bytes(bytes: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        hex::encode(hasher.finalize())
    }

    /// Computes the lowercase hex SHA256 of a sequence of parts.
    ///
    /// Parts are separated by a unit separator byte so that `("ab", "c")`
    /// and `("a", "bc")` hash differently.
    #[must_use]
    pub fn hash_parts(parts: &[&[u8]]) -> String {
        let mut hasher = Sha256::new();
        for (i, part) in parts.iter().enumerate() {
            if i > 0 {
                hasher.update([0x1f]);
            }
            hasher.update(part);
        }
        hex::encode(hasher.finalize())
    }

    /// Computes the SHA256 of text, optionally normalizing it first.
    #[must_use]
    pub fn hash_text(text: &str, normalize: bool) -> String {
        if normalize {
            Self::hash_bytes(Self::normalize(text).as_bytes())
        } else {
            Self::hash_bytes(text.as_bytes())
        }
    }

    /// Normalizes text for hashing.
    ///
    /// Normalization steps:
    /// 1. Trim leading/trailing whitespace
    /// 2. Convert to lowercase
    /// 3. Collapse multiple whitespace to single space
    ///
    /// # Example
    ///
    /// ```rust
    /// use chatdedup::services::dedup::ContentHasher;
    ///
    /// let normalized = ContentHasher::normalize("  Hello   WORLD  ");
    /// assert_eq!(normalized, "hello world");
    /// ```
    #[must_use]
    pub fn normalize(content: &str) -> String {
        content
            .trim()
            .to_lowercase()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Perceptual hasher for decoded images.
pub struct PerceptualHasher;

impl PerceptualHasher {
    /// Computes the 64-bit difference hash of an image.
    ///
    /// The image is converted to grayscale and shrunk to 9x8. Each bit is set
    /// when a pixel is darker than its right-hand neighbour, scanning rows top
    /// to bottom.
    #[must_use]
    pub fn dhash(image: &DynamicImage) -> u64 {
        Self::difference_bits(&Self::grid(image))
    }

    /// Computes the dHash and renders it as 16 lowercase hex chars.
    ///
    /// Returns `None` for flat images. Every flat image hashes to zero
    /// whatever its brightness, so the hash cannot tell them apart.
    #[must_use]
    pub fn dhash_hex(image: &DynamicImage) -> Option<String> {
        let grid = Self::grid(image);
        if Self::is_flat(&grid) {
            return None;
        }
        Some(format!("{:016x}", Self::difference_bits(&grid)))
    }

    fn grid(image: &DynamicImage) -> GrayImage {
        image
            .grayscale()
            .resize_exact(DHASH_WIDTH, DHASH_HEIGHT, FilterType::Triangle)
            .to_luma8()
    }

    fn difference_bits(grid: &GrayImage) -> u64 {
        let mut bits = 0u64;
        for y in 0..DHASH_HEIGHT {
            for x in 0..DHASH_WIDTH - 1 {
                let left = grid.get_pixel(x, y)[0];
                let right = grid.get_pixel(x + 1, y)[0];
                bits = (bits << 1) | u64::from(left < right);
            }
        }
        bits
    }

    fn is_flat(grid: &GrayImage) -> bool {
        let (min, max) = grid
            .pixels()
            .fold((u8::MAX, u8::MIN), |(min, max), p| (min.min(p[0]), max.max(p[0])));
        max.saturating_sub(min) <= FLAT_SPREAD
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};

    fn gradient(width: u32, height: u32, rising: bool) -> DynamicImage {
        let img = GrayImage::from_fn(width, height, |x, _| {
            let step = u8::try_from(x * 255 / (width - 1)).unwrap_or(u8::MAX);
            Luma([if rising { step } else { 255 - step }])
        });
        DynamicImage::ImageLuma8(img)
    }

    #[test]
    fn test_hash_produces_64_char_hex() {
        let hash = ContentHasher::hash_bytes(b"test content");
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_same_bytes_same_hash() {
        assert_eq!(
            ContentHasher::hash_bytes(b"payload"),
            ContentHasher::hash_bytes(b"payload")
        );
        assert_ne!(
            ContentHasher::hash_bytes(b"payload"),
            ContentHasher::hash_bytes(b"payload2")
        );
    }

    #[test]
    fn test_hash_parts_is_separator_aware() {
        assert_ne!(
            ContentHasher::hash_parts(&[b"ab", b"c"]),
            ContentHasher::hash_parts(&[b"a", b"bc"])
        );
        assert_eq!(
            ContentHasher::hash_parts(&[b"abc"]),
            ContentHasher::hash_bytes(b"abc")
        );
    }

    #[test]
    fn test_hash_text_normalization_is_opt_in() {
        assert_ne!(
            ContentHasher::hash_text("Hello  World", false),
            ContentHasher::hash_text("hello world", false)
        );
        assert_eq!(
            ContentHasher::hash_text("  Hello  World ", true),
            ContentHasher::hash_text("hello world", true)
        );
    }

    #[test]
    fn test_normalize_function() {
        assert_eq!(ContentHasher::normalize("  Hello  "), "hello");
        assert_eq!(ContentHasher::normalize("Hello   World"), "hello world");
        assert_eq!(ContentHasher::normalize("line one\nline\ttwo"), "line one line two");
    }

    #[test]
    fn test_dhash_of_gradients() {
        assert_eq!(PerceptualHasher::dhash(&gradient(90, 40, true)), u64::MAX);
        assert_eq!(PerceptualHasher::dhash(&gradient(90, 40, false)), 0);
    }

    #[test]
    fn test_dhash_survives_resize() {
        let large = gradient(180, 80, true);
        let small = gradient(45, 20, true);
        assert_eq!(PerceptualHasher::dhash(&large), PerceptualHasher::dhash(&small));
    }

    #[test]
    fn test_dhash_hex_width() {
        let hex = PerceptualHasher::dhash_hex(&gradient(90, 40, false));
        assert_eq!(hex.as_deref(), Some("0000000000000000"));
    }

    #[test]
    fn test_flat_images_have_no_dhash() {
        for level in [0u8, 128, 255] {
            let flat = DynamicImage::ImageLuma8(GrayImage::from_pixel(32, 32, Luma([level])));
            assert_eq!(PerceptualHasher::dhash(&flat), 0);
            assert!(PerceptualHasher::dhash_hex(&flat).is_none());
        }
    }
}
