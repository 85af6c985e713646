//! Orientation variants of a fingerprint.
//!
//! Catalog images are fingerprinted once per orientation so that a query
//! photographed rotated or mirrored still lines up with one of the stored
//! variants. Queries themselves only ever use [`Variant::Standard`].

use image::DynamicImage;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::average::{decode_image, AverageHasher};
use crate::error::ImageError;

/// A named geometric transform applied before hashing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Variant {
    #[serde(rename = "standard")]
    Standard,
    /// Rotated 90 degrees clockwise.
    #[serde(rename = "rotated_90")]
    Rotated90,
    #[serde(rename = "rotated_180")]
    Rotated180,
    /// Rotated 270 degrees clockwise.
    #[serde(rename = "rotated_270")]
    Rotated270,
    /// Mirrored top to bottom.
    #[serde(rename = "flipped")]
    Flipped,
    /// Mirrored left to right.
    #[serde(rename = "flopped")]
    Flopped,
}

impl Variant {
    /// Every variant, in the order they are generated and compared.
    pub const ALL: [Variant; 6] = [
        Variant::Standard,
        Variant::Rotated90,
        Variant::Rotated180,
        Variant::Rotated270,
        Variant::Flipped,
        Variant::Flopped,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Rotated90 => "rotated_90",
            Self::Rotated180 => "rotated_180",
            Self::Rotated270 => "rotated_270",
            Self::Flipped => "flipped",
            Self::Flopped => "flopped",
        }
    }

    /// Apply this transform to a decoded image.
    pub fn apply(&self, image: &DynamicImage) -> DynamicImage {
        match self {
            Self::Standard => image.clone(),
            Self::Rotated90 => image.rotate90(),
            Self::Rotated180 => image.rotate180(),
            Self::Rotated270 => image.rotate270(),
            Self::Flipped => image.flipv(),
            Self::Flopped => image.fliph(),
        }
    }
}

impl std::fmt::Display for Variant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The fingerprints of one image, one optional hex string per variant.
///
/// Stored values are kept as hex strings so a malformed record can still be
/// loaded and simply scores zero.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FingerprintSet {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub standard: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotated_90: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotated_180: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotated_270: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flipped: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flopped: Option<String>,
}

impl FingerprintSet {
    /// A set holding only the standard orientation.
    pub fn standard_only(hex: impl Into<String>) -> Self {
        Self {
            standard: Some(hex.into()),
            ..Self::default()
        }
    }

    pub fn get(&self, variant: Variant) -> Option<&str> {
        self.slot(variant).as_deref()
    }

    pub fn set(&mut self, variant: Variant, hex: impl Into<String>) {
        *self.slot_mut(variant) = Some(hex.into());
    }

    /// Populated variants in [`Variant::ALL`] order.
    pub fn iter(&self) -> impl Iterator<Item = (Variant, &str)> + '_ {
        Variant::ALL
            .into_iter()
            .filter_map(move |variant| self.get(variant).map(|hex| (variant, hex)))
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn slot(&self, variant: Variant) -> &Option<String> {
        match variant {
            Variant::Standard => &self.standard,
            Variant::Rotated90 => &self.rotated_90,
            Variant::Rotated180 => &self.rotated_180,
            Variant::Rotated270 => &self.rotated_270,
            Variant::Flipped => &self.flipped,
            Variant::Flopped => &self.flopped,
        }
    }

    fn slot_mut(&mut self, variant: Variant) -> &mut Option<String> {
        match variant {
            Variant::Standard => &mut self.standard,
            Variant::Rotated90 => &mut self.rotated_90,
            Variant::Rotated180 => &mut self.rotated_180,
            Variant::Rotated270 => &mut self.rotated_270,
            Variant::Flipped => &mut self.flipped,
            Variant::Flopped => &mut self.flopped,
        }
    }
}

impl AverageHasher {
    /// Fingerprint every orientation variant of a decoded image.
    ///
    /// A variant that fails is logged and left empty; the others are still
    /// populated. Only when no variant succeeds is an error returned.
    pub fn hash_variants(&self, image: &DynamicImage) -> Result<FingerprintSet, ImageError> {
        self.hash_transformed(image, |variant, image| Ok(variant.apply(image)))
    }

    fn hash_transformed<F>(
        &self,
        image: &DynamicImage,
        transform: F,
    ) -> Result<FingerprintSet, ImageError>
    where
        F: Fn(Variant, &DynamicImage) -> Result<DynamicImage, ImageError>,
    {
        let mut set = FingerprintSet::default();
        let mut first_error = None;

        for variant in Variant::ALL {
            let hashed =
                transform(variant, image).and_then(|transformed| self.hash_image(&transformed));
            match hashed {
                Ok(fingerprint) => set.set(variant, fingerprint.to_hex()),
                Err(e) => {
                    warn!(variant = %variant, error = %e, "Variant fingerprint failed");
                    first_error.get_or_insert(ImageError::TransformFailed {
                        variant: variant.to_string(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        match first_error {
            Some(err) if set.is_empty() => Err(err),
            _ => Ok(set),
        }
    }
}

/// Fingerprint all orientation variants of raw image bytes.
pub fn generate_fingerprint_set(image_data: &[u8]) -> Result<FingerprintSet, ImageError> {
    let image = decode_image(image_data)?;
    AverageHasher::default().hash_variants(&image)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};

    /// Bright top-left quadrant on a dark background.
    fn corner_image() -> DynamicImage {
        let img = GrayImage::from_fn(64, 64, |x, y| {
            if x < 32 && y < 32 {
                Luma([230])
            } else {
                Luma([20])
            }
        });
        DynamicImage::ImageLuma8(img)
    }

    #[test]
    fn test_variant_names() {
        let names: Vec<_> = Variant::ALL.iter().map(Variant::as_str).collect();
        assert_eq!(
            names,
            [
                "standard",
                "rotated_90",
                "rotated_180",
                "rotated_270",
                "flipped",
                "flopped"
            ]
        );
        assert_eq!(
            serde_json::to_string(&Variant::Rotated270).unwrap(),
            "\"rotated_270\""
        );
    }

    #[test]
    fn test_hash_variants_populates_all() {
        let set = AverageHasher::default()
            .hash_variants(&corner_image())
            .unwrap();
        assert_eq!(set.len(), 6);
        assert!(set.iter().all(|(_, hex)| hex.len() == 256));
    }

    #[test]
    fn test_failing_variant_leaves_others_populated() {
        let hasher = AverageHasher::default();
        let set = hasher
            .hash_transformed(&corner_image(), |variant, image| match variant {
                // A zero-sized result cannot be hashed.
                Variant::Rotated90 => Ok(DynamicImage::new_luma8(0, 0)),
                _ => Ok(variant.apply(image)),
            })
            .unwrap();

        assert_eq!(set.len(), 5);
        assert_eq!(set.get(Variant::Rotated90), None);
        assert_eq!(set, {
            let mut all = hasher.hash_variants(&corner_image()).unwrap();
            all.rotated_90 = None;
            all
        });
    }

    #[test]
    fn test_all_variants_failing_is_an_error() {
        let result = AverageHasher::default().hash_transformed(&corner_image(), |variant, _| {
            Err(ImageError::TransformFailed {
                variant: variant.to_string(),
                reason: "unsupported".to_string(),
            })
        });

        match result {
            Err(ImageError::TransformFailed { variant, .. }) => assert_eq!(variant, "standard"),
            other => panic!("expected TransformFailed, got {other:?}"),
        }
    }

    #[test]
    fn test_variants_follow_geometry() {
        let hasher = AverageHasher::default();
        let image = corner_image();
        let set = hasher.hash_variants(&image).unwrap();

        // Rotating the corner 180 degrees moves it bottom-right, the same
        // place two mirrors put it.
        let twice_mirrored = hasher.hash_image(&image.fliph().flipv()).unwrap();
        assert_eq!(set.rotated_180.as_deref(), Some(twice_mirrored.to_hex().as_str()));

        // Rotating clockwise moves the top-left corner top-right, the same
        // place a left-right mirror puts it.
        assert_eq!(set.rotated_90, set.flopped);
        assert_ne!(set.standard, set.rotated_90);
    }

    #[test]
    fn test_set_get_and_iter_order() {
        let mut set = FingerprintSet::standard_only("aa");
        set.set(Variant::Flopped, "bb");
        set.set(Variant::Rotated90, "cc");

        assert_eq!(set.get(Variant::Standard), Some("aa"));
        assert_eq!(set.get(Variant::Rotated180), None);

        let order: Vec<_> = set.iter().map(|(variant, _)| variant).collect();
        assert_eq!(
            order,
            [Variant::Standard, Variant::Rotated90, Variant::Flopped]
        );
    }

    #[test]
    fn test_empty_variants_omitted_from_json() {
        let set = FingerprintSet::standard_only("ff00");
        let json = serde_json::to_value(&set).unwrap();
        assert_eq!(json, serde_json::json!({ "standard": "ff00" }));

        let parsed: FingerprintSet = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, set);
    }

    #[test]
    fn test_generate_fingerprint_set_rejects_garbage() {
        assert!(matches!(
            generate_fingerprint_set(&[0x00, 0x01, 0x02]),
            Err(ImageError::Decode(_))
        ));
    }
}
