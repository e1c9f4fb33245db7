//! Incremental extraction state persisted between runs in `.eonix/cache.json`.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::info;

use crate::uas::ExtractionResult;

/// Extraction result of one file together with the digest of the content it came from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedFileResult {
    pub hash: String,
    pub result: ExtractionResult,
}

/// Results of earlier runs over one checkout, keyed by repository-relative path.
///
/// Node file paths and ids embed the absolute root, so the cache is only valid
/// for the root it was written under.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionCache {
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub root: PathBuf,
    pub files: BTreeMap<String, CachedFileResult>,
}

pub const CACHE_DIR: &str = ".eonix";
const CACHE_FILE: &str = "cache.json";

impl ExtractionCache {
    pub fn new(root: &Path) -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            root: root.to_path_buf(),
            files: BTreeMap::new(),
        }
    }

    /// Read `<root>/.eonix/cache.json`.
    ///
    /// Starts empty when the file is missing, was written by another eonix
    /// version, or belongs to another root (the repository was moved or copied).
    pub fn load(root: &Path) -> Result<Self> {
        let cache_path = root.join(CACHE_DIR).join(CACHE_FILE);
        if !cache_path.exists() {
            return Ok(Self::new(root));
        }
        let content =
            std::fs::read_to_string(&cache_path).context("failed to read extraction cache")?;
        let cache: Self =
            serde_json::from_str(&content).context("failed to parse extraction cache")?;
        if cache.version != env!("CARGO_PKG_VERSION") {
            return Ok(Self::new(root));
        }
        if cache.root != root {
            info!(
                cached = %cache.root.display(),
                root = %root.display(),
                "extraction cache was written for another location, starting over"
            );
            return Ok(Self::new(root));
        }
        Ok(cache)
    }

    /// Write the cache into the `.eonix` directory under its root.
    pub fn save(&self) -> Result<()> {
        let cache_dir = self.root.join(CACHE_DIR);
        std::fs::create_dir_all(&cache_dir).context("failed to create .eonix directory")?;
        let content =
            serde_json::to_string(self).context("failed to serialize extraction cache")?;
        std::fs::write(cache_dir.join(CACHE_FILE), content)
            .context("failed to write extraction cache")?;
        Ok(())
    }

    pub fn get(&self, path: &str, content: &str) -> Option<&ExtractionResult> {
        let cached = self.files.get(path)?;
        (cached.hash == compute_hash(content)).then_some(&cached.result)
    }

    /// Remember a clean result. Results carrying errors or warnings evict the
    /// entry instead, so a missing parser or a timeout is retried next run.
    pub fn insert(&mut self, path: String, content: &str, result: &ExtractionResult) -> bool {
        if !result.errors.is_empty() || !result.warnings.is_empty() {
            self.files.remove(&path);
            return false;
        }
        self.files.insert(
            path,
            CachedFileResult {
                hash: compute_hash(content),
                result: result.clone(),
            },
        );
        true
    }

    /// Keep only the entries whose path is in `scanned`.
    pub fn prune(&mut self, scanned: &[String]) {
        let scanned: HashSet<&str> = scanned.iter().map(|s| s.as_str()).collect();
        self.files.retain(|path, _| scanned.contains(path.as_str()));
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Hex SHA-256 of a file's content.
pub fn compute_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}
