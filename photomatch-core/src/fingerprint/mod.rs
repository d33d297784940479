//! Perceptual fingerprints for catalog images.
//!
//! A fingerprint is a 64-bit summary of an image's coarse visual structure.
//! Images that look alike produce fingerprints with a small Hamming distance,
//! which is what the similarity search ranks on.
//!
//! # Components
//!
//! - **Normalization**: every image is converted to RGB and resized to a fixed
//!   canonical square before hashing, so query and catalog images go through
//!   the exact same pipeline.
//! - **Hashing**: DCT perceptual hash (default), difference hash, or Blockhash.

pub mod perceptual;

pub use perceptual::*;
