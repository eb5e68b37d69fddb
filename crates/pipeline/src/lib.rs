use image::{imageops, imageops::FilterType, DynamicImage, RgbImage};
use sha2::{Digest, Sha256};
use thiserror::Error;

pub use shared::domain::EMBEDDING_DIM;

/// Side length of an aligned face crop, in pixels.
pub const FACE_SIZE: u32 = 112;

/// Faces are downscaled to this side length before hashing, so small
/// re-encodes of the same photo land on nearby digest inputs.
const DIGEST_SOURCE_SIZE: u32 = 64;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("image payload is empty")]
    EmptyImage,
    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),
}

/// A face crop normalized to `FACE_SIZE` x `FACE_SIZE` RGB pixels.
#[derive(Debug, Clone)]
pub struct AlignedFace {
    pixels: RgbImage,
}

impl AlignedFace {
    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }
}

/// An L2-normalized `EMBEDDING_DIM`-dimensional face vector.
#[derive(Debug, Clone, PartialEq)]
pub struct Embedding(Vec<f32>);

impl Embedding {
    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<f32> {
        self.0
    }
}

/// Turns raw image bytes into comparable face embeddings.
///
/// Alignment is a centered square crop resized to `FACE_SIZE`; a face
/// detector can slot in front of that crop later without changing the
/// contract. The embedding is a SHA-256 digest of a 64x64 downscale tiled out
/// to `EMBEDDING_DIM` f32 components, then L2-normalized so inner products
/// behave as cosine similarity. Equal inputs always produce equal embeddings.
#[derive(Debug, Clone, Copy, Default)]
pub struct FacePipeline;

impl FacePipeline {
    pub fn new() -> Self {
        Self
    }

    pub fn prepare(&self, bytes: &[u8]) -> Result<AlignedFace, PipelineError> {
        if bytes.is_empty() {
            return Err(PipelineError::EmptyImage);
        }
        let decoded = image::load_from_memory(bytes)?;
        Ok(align(decoded))
    }

    pub fn embed(&self, face: &AlignedFace) -> Embedding {
        let small = imageops::resize(
            &face.pixels,
            DIGEST_SOURCE_SIZE,
            DIGEST_SOURCE_SIZE,
            FilterType::Triangle,
        );
        let digest = Sha256::digest(small.as_raw());
        let mut components: Vec<f32> = (0..EMBEDDING_DIM)
            .map(|i| f32::from(digest[i % digest.len()]))
            .collect();
        l2_normalize(&mut components);
        Embedding(components)
    }
}

fn align(decoded: DynamicImage) -> AlignedFace {
    let rgb = decoded.to_rgb8();
    let (width, height) = rgb.dimensions();
    let side = width.min(height);
    let x = (width - side) / 2;
    let y = (height - side) / 2;
    let square = imageops::crop_imm(&rgb, x, y, side, side).to_image();
    let pixels = imageops::resize(&square, FACE_SIZE, FACE_SIZE, FilterType::Triangle);
    AlignedFace { pixels }
}

fn l2_normalize(components: &mut [f32]) {
    let norm = components.iter().map(|c| c * c).sum::<f32>().sqrt();
    if norm > 0.0 {
        for component in components.iter_mut() {
            *component /= norm;
        }
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
