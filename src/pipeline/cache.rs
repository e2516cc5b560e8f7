//! Analysis result cache
//!
//! Keyed by the image content hash so unchanged images skip the generative
//! calls entirely on re-inspection.

use super::types::ImageAssessment;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

const CACHE_FILE_NAME: &str = ".analysis-cache.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheFile {
    /// Version, for compatibility checks.
    version: u32,
    /// Content hash -> cached assessment.
    entries: HashMap<String, CacheEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub file_name: String,
    pub file_size: u64,
    pub result: ImageAssessment,
}

impl CacheFile {
    const CURRENT_VERSION: u32 = 1;

    pub fn cache_path(folder: &Path) -> PathBuf {
        folder.join(CACHE_FILE_NAME)
    }

    pub fn load(folder: &Path) -> Self {
        let cache_path = Self::cache_path(folder);
        if !cache_path.exists() {
            return Self::default();
        }

        let file = match File::open(&cache_path) {
            Ok(f) => f,
            Err(_) => return Self::default(),
        };

        let reader = BufReader::new(file);
        match serde_json::from_reader::<_, CacheFile>(reader) {
            Ok(cache) => {
                if cache.version != Self::CURRENT_VERSION {
                    eprintln!("cache version mismatch, rebuilding");
                    return Self::default();
                }
                cache
            }
            Err(_) => Self::default(),
        }
    }

    pub fn save(&self, folder: &Path) -> Result<()> {
        let cache_path = Self::cache_path(folder);
        let file = File::create(cache_path)?;
        let writer = BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    pub fn get(&self, hash: &str) -> Option<&ImageAssessment> {
        self.entries.get(hash).map(|e| &e.result)
    }

    pub fn insert(
        &mut self,
        hash: String,
        file_name: String,
        file_size: u64,
        result: ImageAssessment,
    ) {
        self.entries.insert(
            hash,
            CacheEntry {
                file_name,
                file_size,
                result,
            },
        );
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Delete the cache file. Returns whether a file existed.
    pub fn clear(folder: &Path) -> Result<bool> {
        let cache_path = Self::cache_path(folder);
        if cache_path.exists() {
            std::fs::remove_file(cache_path)?;
            Ok(true)
        } else {
            Ok(false)
        }
    }
}

impl Default for CacheFile {
    fn default() -> Self {
        Self {
            version: Self::CURRENT_VERSION,
            entries: HashMap::new(),
        }
    }
}
