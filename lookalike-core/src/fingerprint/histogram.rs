//! Per-channel color histograms.
//!
//! The image is downsampled to a fixed 16x16 grid before counting, so every
//! histogram holds the same total number of samples regardless of the source
//! resolution and two histograms compare directly without normalization.

use image::imageops::FilterType;
use image::DynamicImage;
use serde::{Deserialize, Serialize};

use super::average::{decode_image, ensure_dimensions};
use crate::error::ImageError;

/// Side length of the histogram sampling grid.
pub const HISTOGRAM_GRID_SIZE: u32 = 16;

/// Buckets per channel, one per 8-bit intensity.
pub const HISTOGRAM_BINS: usize = 256;

/// Red, green and blue intensity counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorHistogram {
    pub red: Vec<u32>,
    pub green: Vec<u32>,
    pub blue: Vec<u32>,
}

impl Default for ColorHistogram {
    fn default() -> Self {
        Self {
            red: vec![0; HISTOGRAM_BINS],
            green: vec![0; HISTOGRAM_BINS],
            blue: vec![0; HISTOGRAM_BINS],
        }
    }
}

impl ColorHistogram {
    /// Count channel intensities over the downsampled grid of a decoded image.
    pub fn from_image(image: &DynamicImage) -> Result<Self, ImageError> {
        ensure_dimensions(image)?;

        let grid = image
            .resize_exact(HISTOGRAM_GRID_SIZE, HISTOGRAM_GRID_SIZE, FilterType::Nearest)
            .to_rgb8();

        let mut histogram = Self::default();
        for pixel in grid.pixels() {
            let [r, g, b] = pixel.0;
            histogram.red[r as usize] += 1;
            histogram.green[g as usize] += 1;
            histogram.blue[b as usize] += 1;
        }
        Ok(histogram)
    }

    /// The three channels in red, green, blue order.
    pub fn channels(&self) -> [&[u32]; 3] {
        [
            self.red.as_slice(),
            self.green.as_slice(),
            self.blue.as_slice(),
        ]
    }

    /// Total samples counted in the red channel.
    pub fn sample_count(&self) -> u64 {
        self.red.iter().map(|&c| u64::from(c)).sum()
    }

    /// Whether every channel has exactly [`HISTOGRAM_BINS`] buckets.
    pub fn is_well_formed(&self) -> bool {
        self.channels().iter().all(|c| c.len() == HISTOGRAM_BINS)
    }
}

/// Compute the color histogram of raw image bytes.
pub fn compute_histogram(image_data: &[u8]) -> Result<ColorHistogram, ImageError> {
    let image = decode_image(image_data)?;
    ColorHistogram::from_image(&image)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    #[test]
    fn test_solid_color_counts() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(40, 30, Rgb([10, 20, 30])));
        let histogram = ColorHistogram::from_image(&img).unwrap();

        assert!(histogram.is_well_formed());
        assert_eq!(histogram.red[10], 256);
        assert_eq!(histogram.green[20], 256);
        assert_eq!(histogram.blue[30], 256);
        assert_eq!(histogram.red.iter().sum::<u32>(), 256);
    }

    #[test]
    fn test_sample_count_fixed_by_grid() {
        let small = DynamicImage::ImageRgb8(RgbImage::from_pixel(4, 4, Rgb([1, 2, 3])));
        let large = DynamicImage::ImageRgb8(RgbImage::from_pixel(500, 300, Rgb([1, 2, 3])));

        let a = ColorHistogram::from_image(&small).unwrap();
        let b = ColorHistogram::from_image(&large).unwrap();
        assert_eq!(a.sample_count(), 256);
        assert_eq!(a.sample_count(), b.sample_count());
    }

    #[test]
    fn test_two_tone_image() {
        let img = RgbImage::from_fn(32, 32, |x, _| {
            if x < 16 {
                Rgb([255, 0, 0])
            } else {
                Rgb([0, 0, 255])
            }
        });
        let histogram = ColorHistogram::from_image(&DynamicImage::ImageRgb8(img)).unwrap();
        assert_eq!(histogram.red[255], 128);
        assert_eq!(histogram.red[0], 128);
        assert_eq!(histogram.green[0], 256);
        assert_eq!(histogram.blue[255], 128);
    }

    #[test]
    fn test_malformed_histogram_detected() {
        let histogram = ColorHistogram {
            red: vec![0; 10],
            ..ColorHistogram::default()
        };
        assert!(!histogram.is_well_formed());
    }

    #[test]
    fn test_compute_histogram_rejects_garbage() {
        assert!(matches!(
            compute_histogram(b"GIF89a-truncated"),
            Err(ImageError::Decode(_))
        ));
    }
}
