//! Image fingerprinting.
//!
//! # Components
//!
//! - **Average hash**: a 1024-bit grayscale fingerprint, see [`average`].
//! - **Orientation variants**: the same fingerprint computed on rotated and
//!   mirrored copies of the image, see [`variants`].
//! - **Color histogram**: a coarse per-channel intensity signal, see
//!   [`histogram`].
//!
//! [`analyze_image`] decodes an image once and produces all three together
//! with descriptive [`ImageMetadata`].

pub mod average;
pub mod histogram;
pub mod variants;

pub use average::{
    generate_fingerprint, AverageHasher, Fingerprint, FINGERPRINT_BITS, HASH_GRID_SIZE,
};
pub use histogram::{compute_histogram, ColorHistogram, HISTOGRAM_BINS, HISTOGRAM_GRID_SIZE};
pub use variants::{generate_fingerprint_set, FingerprintSet, Variant};

use image::DynamicImage;
use serde::{Deserialize, Serialize};

use crate::error::ImageError;
use average::decode_image;

/// Descriptive facts about an encoded image. Not used in scoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageMetadata {
    pub width: u32,
    pub height: u32,
    /// Encoded format, e.g. `jpeg` or `png`.
    pub format: String,
    /// `width / height`, rounded to 4 decimals.
    pub aspect_ratio: f64,
}

impl ImageMetadata {
    fn describe(image: &DynamicImage, image_data: &[u8]) -> Self {
        let format = image::guess_format(image_data)
            .map(|f| format!("{f:?}").to_lowercase())
            .unwrap_or_else(|_| "unknown".to_string());
        let aspect_ratio = f64::from(image.width()) / f64::from(image.height());

        Self {
            width: image.width(),
            height: image.height(),
            format,
            aspect_ratio: (aspect_ratio * 10_000.0).round() / 10_000.0,
        }
    }
}

/// Everything derived from one catalog image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageAnalysis {
    pub fingerprints: FingerprintSet,
    pub histogram: ColorHistogram,
    pub metadata: ImageMetadata,
}

/// Decode an image once and derive its fingerprints, histogram and metadata.
pub fn analyze_image(image_data: &[u8]) -> Result<ImageAnalysis, ImageError> {
    let image = decode_image(image_data)?;

    Ok(ImageAnalysis {
        fingerprints: AverageHasher::default().hash_variants(&image)?,
        histogram: ColorHistogram::from_image(&image)?,
        metadata: ImageMetadata::describe(&image, image_data),
    })
}

/// Read the dimensions and format of an encoded image.
pub fn image_metadata(image_data: &[u8]) -> Result<ImageMetadata, ImageError> {
    let image = decode_image(image_data)?;
    Ok(ImageMetadata::describe(&image, image_data))
}

/// Check if the provided bytes appear to be a supported image format.
pub fn is_supported_format(data: &[u8]) -> bool {
    image::guess_format(data).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb, RgbImage};
    use std::io::Cursor;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x * 4) as u8, (y * 4) as u8, 128])
        });
        let mut buffer = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(img)
            .write_to(&mut buffer, ImageFormat::Png)
            .unwrap();
        buffer.into_inner()
    }

    #[test]
    fn test_image_metadata() {
        let metadata = image_metadata(&png_bytes(60, 40)).unwrap();
        assert_eq!(metadata.width, 60);
        assert_eq!(metadata.height, 40);
        assert_eq!(metadata.format, "png");
        assert_eq!(metadata.aspect_ratio, 1.5);
    }

    #[test]
    fn test_analyze_image_produces_everything() {
        let analysis = analyze_image(&png_bytes(48, 48)).unwrap();
        assert_eq!(analysis.fingerprints.len(), 6);
        assert_eq!(analysis.histogram.sample_count(), 256);
        assert_eq!(analysis.metadata.aspect_ratio, 1.0);
    }

    #[test]
    fn test_is_supported_format() {
        // PNG magic bytes
        assert!(is_supported_format(&[
            0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A
        ]));

        // JPEG magic bytes
        assert!(is_supported_format(&[0xFF, 0xD8, 0xFF]));

        // Invalid
        assert!(!is_supported_format(&[0x00, 0x00, 0x00]));
    }
}
