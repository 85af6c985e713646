//! Average hash ("aHash") fingerprints.
//!
//! # Algorithm
//!
//! 1. Decode the image and resample it to a fixed grid (32x32 by default)
//!    with nearest-neighbour sampling.
//! 2. Convert the grid to single-channel grayscale.
//! 3. Compute the arithmetic mean of every sample.
//! 4. Emit one bit per sample in row-major order: `1` when the sample is
//!    greater than or equal to the mean, `0` otherwise.
//!
//! Bits are packed most-significant first, so the hex form reads left to
//! right in the same order as the grid.
//!
//! # Usage
//!
//! ```no_run
//! use lookalike_core::fingerprint::AverageHasher;
//!
//! let bytes = std::fs::read("product.jpg").unwrap();
//! let hasher = AverageHasher::default();
//! let fingerprint = hasher.hash_bytes(&bytes).unwrap();
//! println!("{}", fingerprint.to_hex());
//! ```

use image::imageops::FilterType;
use image::DynamicImage;
use serde::{Deserialize, Serialize};

use crate::error::{ImageError, ScoreError};
use crate::similarity;

/// Side length of the default hashing grid.
pub const HASH_GRID_SIZE: u32 = 32;

/// Number of bits in a default fingerprint (32 x 32).
pub const FINGERPRINT_BITS: usize = (HASH_GRID_SIZE * HASH_GRID_SIZE) as usize;

/// A packed average-hash bit vector.
///
/// Serialized as its lowercase hex string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Fingerprint {
    bytes: Vec<u8>,
}

impl Fingerprint {
    /// Wrap already-packed fingerprint bytes.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    /// Parse a fingerprint from its hex form.
    pub fn from_hex(hex_str: &str) -> Result<Self, ScoreError> {
        let bytes = hex::decode(hex_str)
            .map_err(|e| ScoreError::InvalidEncoding(format!("Invalid hex string: {e}")))?;
        if bytes.is_empty() {
            return Err(ScoreError::Empty);
        }
        Ok(Self { bytes })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Length of the fingerprint in bits.
    pub fn bit_len(&self) -> usize {
        self.bytes.len() * 8
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.bytes)
    }

    /// Number of differing bits. Fails when the lengths differ.
    pub fn hamming_distance(&self, other: &Self) -> Result<u32, ScoreError> {
        similarity::hamming_distance(&self.bytes, &other.bytes)
    }

    /// Similarity percentage in `[0, 100]`, rounded to two decimals.
    pub fn similarity(&self, other: &Self) -> Result<f64, ScoreError> {
        let distance = self.hamming_distance(other)?;
        Ok(similarity::distance_to_percent(distance, self.bit_len()))
    }
}

impl TryFrom<String> for Fingerprint {
    type Error = ScoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_hex(&value)
    }
}

impl From<Fingerprint> for String {
    fn from(fingerprint: Fingerprint) -> Self {
        fingerprint.to_hex()
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Average hash computation over a configurable grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AverageHasher {
    grid_width: u32,
    grid_height: u32,
    filter: FilterType,
}

impl Default for AverageHasher {
    fn default() -> Self {
        Self {
            grid_width: HASH_GRID_SIZE,
            grid_height: HASH_GRID_SIZE,
            filter: FilterType::Nearest,
        }
    }
}

impl AverageHasher {
    /// Create a hasher with a custom grid.
    ///
    /// The grid area must be a non-zero multiple of 8 so fingerprints pack
    /// into whole bytes.
    pub fn new(grid_width: u32, grid_height: u32) -> Result<Self, ImageError> {
        let area = grid_width as usize * grid_height as usize;
        if area == 0 || area % 8 != 0 {
            return Err(ImageError::InvalidDimensions {
                width: grid_width,
                height: grid_height,
            });
        }
        Ok(Self {
            grid_width,
            grid_height,
            ..Self::default()
        })
    }

    /// Number of bits this hasher produces.
    pub fn bit_len(&self) -> usize {
        self.grid_width as usize * self.grid_height as usize
    }

    /// Compute the fingerprint of raw image bytes.
    pub fn hash_bytes(&self, image_data: &[u8]) -> Result<Fingerprint, ImageError> {
        let image = decode_image(image_data)?;
        self.hash_image(&image)
    }

    /// Compute the fingerprint of a decoded image.
    pub fn hash_image(&self, image: &DynamicImage) -> Result<Fingerprint, ImageError> {
        ensure_dimensions(image)?;

        let grid = image
            .resize_exact(self.grid_width, self.grid_height, self.filter)
            .to_luma8();
        let samples = grid.as_raw();

        // Integer comparison against n * mean keeps the threshold exact and
        // independent of summation order.
        let count = samples.len() as u64;
        let sum: u64 = samples.iter().map(|&s| u64::from(s)).sum();

        let mut bytes = vec![0u8; samples.len().div_ceil(8)];
        for (i, &sample) in samples.iter().enumerate() {
            if u64::from(sample) * count >= sum {
                bytes[i / 8] |= 0x80 >> (i % 8);
            }
        }

        Ok(Fingerprint::from_bytes(bytes))
    }
}

/// Decode image bytes, rejecting zero-area images.
pub(crate) fn decode_image(image_data: &[u8]) -> Result<DynamicImage, ImageError> {
    let image =
        image::load_from_memory(image_data).map_err(|e| ImageError::Decode(e.to_string()))?;
    ensure_dimensions(&image)?;
    Ok(image)
}

pub(crate) fn ensure_dimensions(image: &DynamicImage) -> Result<(), ImageError> {
    if image.width() == 0 || image.height() == 0 {
        return Err(ImageError::InvalidDimensions {
            width: image.width(),
            height: image.height(),
        });
    }
    Ok(())
}

/// Compute the standard-orientation fingerprint with default settings.
pub fn generate_fingerprint(image_data: &[u8]) -> Result<Fingerprint, ImageError> {
    AverageHasher::default().hash_bytes(image_data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};

    fn split_image() -> DynamicImage {
        // Left half black, right half white.
        let img = GrayImage::from_fn(64, 64, |x, _| if x < 32 { Luma([0]) } else { Luma([255]) });
        DynamicImage::ImageLuma8(img)
    }

    #[test]
    fn test_default_grid() {
        let hasher = AverageHasher::default();
        assert_eq!(hasher.bit_len(), FINGERPRINT_BITS);
        assert_eq!(FINGERPRINT_BITS, 1024);
    }

    #[test]
    fn test_custom_grid_must_pack_into_bytes() {
        assert!(AverageHasher::new(8, 8).is_ok());
        assert!(AverageHasher::new(3, 3).is_err());
        assert!(AverageHasher::new(0, 16).is_err());
    }

    #[test]
    fn test_split_image_bits() {
        let fingerprint = AverageHasher::default().hash_image(&split_image()).unwrap();
        assert_eq!(fingerprint.bit_len(), 1024);

        // Each row is 16 dark samples then 16 bright ones: 0x0000ffff.
        let hex = fingerprint.to_hex();
        assert_eq!(hex.len(), 256);
        assert_eq!(&hex[..8], "0000ffff");
        assert_eq!(hex, "0000ffff".repeat(32));
    }

    #[test]
    fn test_uniform_image_sets_every_bit() {
        // Every sample equals the mean, and `>=` sets the bit.
        let img = DynamicImage::ImageLuma8(GrayImage::from_pixel(10, 10, Luma([77])));
        let fingerprint = AverageHasher::default().hash_image(&img).unwrap();
        assert!(fingerprint.as_bytes().iter().all(|&b| b == 0xFF));
    }

    #[test]
    fn test_zero_area_image_rejected() {
        let img = DynamicImage::ImageLuma8(GrayImage::new(0, 5));
        let result = AverageHasher::default().hash_image(&img);
        assert_eq!(
            result,
            Err(ImageError::InvalidDimensions {
                width: 0,
                height: 5
            })
        );
    }

    #[test]
    fn test_corrupt_bytes_rejected() {
        let result = generate_fingerprint(b"definitely not an image");
        assert!(matches!(result, Err(ImageError::Decode(_))));
    }

    #[test]
    fn test_fingerprint_hex_roundtrip() {
        let original = Fingerprint::from_bytes(vec![0xDE, 0xAD, 0xBE, 0xEF]);
        assert_eq!(original.to_hex(), "deadbeef");

        let restored = Fingerprint::from_hex("deadbeef").unwrap();
        assert_eq!(restored, original);
        assert_eq!(restored.bit_len(), 32);
    }

    #[test]
    fn test_fingerprint_from_invalid_hex() {
        assert!(matches!(
            Fingerprint::from_hex("xyz"),
            Err(ScoreError::InvalidEncoding(_))
        ));
        assert_eq!(Fingerprint::from_hex(""), Err(ScoreError::Empty));
    }

    #[test]
    fn test_fingerprint_serializes_as_hex() {
        let fingerprint = Fingerprint::from_bytes(vec![0x0F, 0xF0]);
        let json = serde_json::to_string(&fingerprint).unwrap();
        assert_eq!(json, "\"0ff0\"");

        let parsed: Fingerprint = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, fingerprint);
    }

    #[test]
    fn test_fingerprint_similarity_method() {
        let a = Fingerprint::from_bytes(vec![0x00, 0x00]);
        let b = Fingerprint::from_bytes(vec![0x0F, 0x00]);
        assert_eq!(a.hamming_distance(&b), Ok(4));
        assert_eq!(a.similarity(&b), Ok(75.0));
    }
}
