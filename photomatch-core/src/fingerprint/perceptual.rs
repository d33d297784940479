//! Perceptual hashing for catalog and query images.
//!
//! # Algorithm
//!
//! The default is a DCT perceptual hash (pHash): the image is normalized to a
//! 300x300 RGB bitmap, reduced to a 16x16 luma plane, transformed with a DCT,
//! and the 8x8 lowest frequencies are thresholded against their median. The
//! result is a 64-bit fingerprint that survives re-encoding, resizing and
//! mild compression.
//!
//! Difference hash (dHash) and Blockhash are available as alternatives. pHash
//! and dHash come from `image_hasher`, Blockhash from `blockhash`. All three
//! emit 64 bits, but fingerprints from different algorithms are never
//! comparable.
//!
//! # Usage
//!
//! ```no_run
//! use photomatch_core::fingerprint::{HashAlgorithm, PerceptualHasher};
//!
//! let query = std::fs::read("query.jpg").unwrap();
//! let hasher = PerceptualHasher::new(HashAlgorithm::Phash);
//! let a = hasher.fingerprint_bytes(&query).unwrap();
//!
//! let other = std::fs::read("product.jpg").unwrap();
//! let b = hasher.fingerprint_bytes(&other).unwrap();
//! let distance = a.hamming_distance(&b).unwrap();
//! let similar = distance <= 30;
//! ```

use std::fmt;
use std::str::FromStr;

use blockhash::{blockhash64, Blockhash64};
use image::imageops::FilterType;
use image::DynamicImage;
use image_hasher::{HashAlg, HasherConfig};
use serde::{Deserialize, Serialize};

use crate::error::{PhotomatchError, Result};

/// Fixed fingerprint size in bytes.
pub const FINGERPRINT_BYTES: usize = 8;

/// Fixed fingerprint size in bits; also the largest possible distance.
pub const FINGERPRINT_BITS: u32 = (FINGERPRINT_BYTES * 8) as u32;

/// Side of the square every image is resized to before hashing.
pub const CANONICAL_SIZE: u32 = 300;

/// Smallest canonical size accepted.
pub const MIN_CANONICAL_SIZE: u32 = 32;

/// Side of the pHash / dHash bit grid.
const HASH_GRID: u32 = 8;

/// Perceptual hash algorithm selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    /// DCT perceptual hash over the 8x8 lowest frequencies, median threshold.
    #[default]
    Phash,
    /// Horizontal gradient hash on a 9x8 luma grid.
    Dhash,
    /// Grid-based Blockhash.
    Blockhash,
}

impl HashAlgorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Phash => "phash",
            Self::Dhash => "dhash",
            Self::Blockhash => "blockhash",
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HashAlgorithm {
    type Err = PhotomatchError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "phash" => Ok(Self::Phash),
            "dhash" => Ok(Self::Dhash),
            "blockhash" => Ok(Self::Blockhash),
            other => Err(PhotomatchError::Config(format!(
                "Unknown hash algorithm '{}' (expected phash, dhash or blockhash)",
                other
            ))),
        }
    }
}

/// A 64-bit perceptual fingerprint tagged with the algorithm that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fingerprint {
    bits: [u8; FINGERPRINT_BYTES],
    algorithm: HashAlgorithm,
}

impl Fingerprint {
    pub fn new(bits: [u8; FINGERPRINT_BYTES], algorithm: HashAlgorithm) -> Self {
        Self { bits, algorithm }
    }

    pub fn as_bytes(&self) -> &[u8; FINGERPRINT_BYTES] {
        &self.bits
    }

    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    /// Number of differing bits between two fingerprints.
    ///
    /// # Errors
    ///
    /// Returns `IncomparableFingerprints` when the two fingerprints were
    /// produced by different algorithms.
    pub fn hamming_distance(&self, other: &Self) -> Result<u32> {
        if self.algorithm != other.algorithm {
            return Err(PhotomatchError::IncomparableFingerprints {
                left: self.algorithm,
                right: other.algorithm,
            });
        }

        Ok(self
            .bits
            .iter()
            .zip(other.bits.iter())
            .map(|(a, b)| (a ^ b).count_ones())
            .sum())
    }

    /// Get the fingerprint as a hexadecimal string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.bits)
    }

    /// Parse a fingerprint from 16 hexadecimal characters.
    pub fn from_hex(hex_str: &str, algorithm: HashAlgorithm) -> Result<Self> {
        let bytes = hex::decode(hex_str)
            .map_err(|e| PhotomatchError::InvalidFingerprint(format!("Invalid hex string: {}", e)))?;

        let bits: [u8; FINGERPRINT_BYTES] = bytes.try_into().map_err(|v: Vec<u8>| {
            PhotomatchError::InvalidFingerprint(format!(
                "Expected {} bytes, got {}",
                FINGERPRINT_BYTES,
                v.len()
            ))
        })?;

        Ok(Self::new(bits, algorithm))
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.algorithm, self.to_hex())
    }
}

/// Compute the Hamming distance between two fingerprints.
pub fn hamming_distance(a: &Fingerprint, b: &Fingerprint) -> Result<u32> {
    a.hamming_distance(b)
}

/// An RGB bitmap resized to the canonical square.
///
/// Only [`PerceptualHasher::decode`] and [`NormalizedImage::from_image`]
/// produce these, so every fingerprinted image has been through the same
/// normalization.
#[derive(Debug, Clone)]
pub struct NormalizedImage {
    image: DynamicImage,
}

impl NormalizedImage {
    pub fn from_image(image: &DynamicImage, size: u32) -> Self {
        let rgb = DynamicImage::ImageRgb8(image.to_rgb8());
        Self {
            image: rgb.resize_exact(size, size, FilterType::CatmullRom),
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn as_image(&self) -> &DynamicImage {
        &self.image
    }
}

/// Perceptual hasher configuration and computation.
#[derive(Debug, Clone, Copy)]
pub struct PerceptualHasher {
    algorithm: HashAlgorithm,
    canonical_size: u32,
}

impl Default for PerceptualHasher {
    fn default() -> Self {
        Self::new(HashAlgorithm::default())
    }
}

impl PerceptualHasher {
    pub fn new(algorithm: HashAlgorithm) -> Self {
        Self {
            algorithm,
            canonical_size: CANONICAL_SIZE,
        }
    }

    /// Override the canonical size (clamped to [`MIN_CANONICAL_SIZE`]).
    pub fn with_canonical_size(mut self, size: u32) -> Self {
        self.canonical_size = size.max(MIN_CANONICAL_SIZE);
        self
    }

    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    pub fn canonical_size(&self) -> u32 {
        self.canonical_size
    }

    /// Decode raw image bytes and normalize them.
    ///
    /// Supports JPEG, PNG, GIF, and WebP formats.
    pub fn decode(&self, image_data: &[u8]) -> Result<NormalizedImage> {
        if image_data.is_empty() {
            return Err(PhotomatchError::UndecodableImage("empty payload".into()));
        }

        let image = image::load_from_memory(image_data)
            .map_err(|e| PhotomatchError::UndecodableImage(e.to_string()))?;

        Ok(NormalizedImage::from_image(&image, self.canonical_size))
    }

    /// Compute the fingerprint of a normalized image.
    pub fn fingerprint(&self, image: &NormalizedImage) -> Fingerprint {
        let bits = match self.algorithm {
            HashAlgorithm::Phash => grid_hash(
                HasherConfig::new().hash_alg(HashAlg::Median).preproc_dct(),
                image.as_image(),
            ),
            HashAlgorithm::Dhash => grid_hash(
                HasherConfig::new().hash_alg(HashAlg::Gradient),
                image.as_image(),
            ),
            HashAlgorithm::Blockhash => {
                let hash: Blockhash64 = blockhash64(image.as_image());
                let bytes: [u8; FINGERPRINT_BYTES] = hash.into();
                bytes
            }
        };

        Fingerprint::new(bits, self.algorithm)
    }

    /// Decode, normalize and fingerprint raw image bytes.
    pub fn fingerprint_bytes(&self, image_data: &[u8]) -> Result<Fingerprint> {
        let image = self.decode(image_data)?;
        Ok(self.fingerprint(&image))
    }
}

/// Run an 8x8 `image_hasher` configuration and copy out its 64 bits.
fn grid_hash(config: HasherConfig, image: &DynamicImage) -> [u8; FINGERPRINT_BYTES] {
    let hash = config
        .hash_size(HASH_GRID, HASH_GRID)
        .to_hasher()
        .hash_image(image);

    let mut bits = [0u8; FINGERPRINT_BYTES];
    for (dst, src) in bits.iter_mut().zip(hash.as_bytes()) {
        *dst = *src;
    }
    bits
}
