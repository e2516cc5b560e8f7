//! Image staging area
//!
//! Uploaded inspection images are copied into a named stage directory under a
//! content-addressed name (`IMG_<sha256 prefix>.<ext>`). A staged file is
//! immutable: the same content always maps to the same name, and an existing
//! file is never rewritten. Generative requests reference images by their
//! staged name only.

use crate::error::{Result, SafetyAiError};
use crate::scanner::ImageInfo;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

/// An image placed in the stage, as referenced by generative requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StagedImage {
    /// Content-addressed name within the stage, e.g. `IMG_3fa94c1b.jpg`.
    pub file_name: String,
    pub path: PathBuf,
    /// Original upload name, kept for display.
    pub source_name: String,
    pub captured_at: Option<String>,
}

pub struct Stage {
    dir: PathBuf,
    max_bytes: u64,
    max_dimension: u32,
}

impl Stage {
    pub fn open(dir: &Path, max_bytes: u64, max_dimension: u32) -> Result<Self> {
        std::fs::create_dir_all(dir)?;
        Ok(Self {
            dir: dir.to_path_buf(),
            max_bytes,
            max_dimension,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Validate and stage one image. Fails per-image on vendor limits; the
    /// caller decides whether to continue with the rest of the batch.
    pub fn put(&self, image: &ImageInfo) -> Result<StagedImage> {
        let metadata = std::fs::metadata(&image.path)
            .map_err(|_| SafetyAiError::FileNotFound(image.path.display().to_string()))?;

        if metadata.len() > self.max_bytes {
            return Err(SafetyAiError::ImageRejected(format!(
                "{} is {} bytes, exceeds the {} byte per-image limit",
                image.file_name,
                metadata.len(),
                self.max_bytes
            )));
        }

        // Header-only dimension probe, no full decode
        let (width, height) = image::image_dimensions(&image.path).map_err(|e| {
            SafetyAiError::ImageRejected(format!("{}: unreadable image: {}", image.file_name, e))
        })?;

        if width > self.max_dimension || height > self.max_dimension {
            return Err(SafetyAiError::ImageRejected(format!(
                "{} is {}x{}, exceeds the {}px per-side limit",
                image.file_name, width, height, self.max_dimension
            )));
        }

        let staged_name = staged_file_name(&image.path, &image.file_name)?;
        let dest = self.dir.join(&staged_name);

        // Same hash, same content: never rewrite a staged file
        if !dest.exists() {
            std::fs::copy(&image.path, &dest)?;
        }

        Ok(StagedImage {
            file_name: staged_name,
            path: dest,
            source_name: image.file_name.clone(),
            captured_at: image.captured_at.clone(),
        })
    }
}

/// Content hash of an image file, also used as the cache key.
pub fn compute_file_hash(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path)?;
    let digest = Sha256::digest(&bytes);
    Ok(hex::encode(digest))
}

fn staged_file_name(path: &Path, file_name: &str) -> Result<String> {
    let hash = compute_file_hash(path)?;
    let ext = file_name
        .rsplit('.')
        .next()
        .unwrap_or("jpg")
        .to_ascii_lowercase();
    Ok(format!("IMG_{}.{}", &hash[..8], ext))
}
