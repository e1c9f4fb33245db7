//! Bounded repository walk with static and user-supplied ignore rules.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::config::ScanConfig;

/// Name of the per-repository ignore file.
pub const IGNORE_FILE: &str = ".eonixignore";

/// Directories never descended into.
pub const IGNORED_DIRS: &[&str] = &[
    // Version control
    ".git", ".svn", ".hg", ".bzr",
    // Dependencies
    "node_modules", "bower_components",
    // Python
    "venv", "env", ".venv", ".env", "__pycache__", ".pytest_cache", ".mypy_cache", "*.egg-info", ".eggs",
    // Build outputs
    "dist", "build", "target", "out", ".next", ".nuxt", ".output", "bin", "obj",
    // IDEs
    ".idea", ".vscode", ".vs", ".eclipse", ".settings",
    // OS
    ".DS_Store", "Thumbs.db",
    // Other
    "coverage", ".coverage", "htmlcov", ".tox", ".nox",
];

/// Hidden directories that are still scanned (CI configuration).
pub const ALLOWED_HIDDEN_DIRS: &[&str] = &[".github", ".gitlab"];

/// File name suffixes that are never processed.
pub const IGNORED_FILE_SUFFIXES: &[&str] = &[
    ".pyc", ".pyo", ".pyd", ".class", ".jar", ".war", ".so", ".dylib", ".dll", ".exe", ".dmg",
    ".pkg", ".log", ".tmp", ".temp", ".swp", ".swo", ".DS_Store", "Thumbs.db",
];

/// Broad classification of a scanned file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileCategory {
    Python,
    Javascript,
    Typescript,
    Java,
    Go,
    Config,
    Unknown,
}

impl FileCategory {
    /// Category for a lower-cased extension without the leading dot.
    pub fn from_extension(ext: &str) -> Option<Self> {
        let category = match ext {
            "py" | "pyi" => FileCategory::Python,
            "js" | "jsx" | "mjs" | "cjs" => FileCategory::Javascript,
            "ts" | "tsx" => FileCategory::Typescript,
            "java" => FileCategory::Java,
            "go" => FileCategory::Go,
            "json" | "yaml" | "yml" | "toml" | "ini" | "xml" => FileCategory::Config,
            _ => return None,
        };
        Some(category)
    }
}

impl fmt::Display for FileCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FileCategory::Python => "python",
            FileCategory::Javascript => "javascript",
            FileCategory::Typescript => "typescript",
            FileCategory::Java => "java",
            FileCategory::Go => "go",
            FileCategory::Config => "config",
            FileCategory::Unknown => "unknown",
        };
        write!(f, "{name}")
    }
}

/// A file selected for processing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileInfo {
    pub path: PathBuf,
    pub relative_path: PathBuf,
    /// Lower-cased extension without the leading dot
    pub extension: String,
    pub category: FileCategory,
    pub size_bytes: u64,
}

/// Running totals collected while scanning.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanStatistics {
    pub total_files: usize,
    pub total_size_bytes: u64,
    pub files_by_category: BTreeMap<FileCategory, usize>,
    pub files_by_extension: BTreeMap<String, usize>,
    pub directories_scanned: usize,
    pub directories_ignored: usize,
}

impl ScanStatistics {
    fn record(&mut self, file: &FileInfo) {
        self.total_size_bytes += file.size_bytes;
        *self.files_by_category.entry(file.category).or_default() += 1;
        *self
            .files_by_extension
            .entry(file.extension.clone())
            .or_default() += 1;
    }
}

/// Directory and file filters shared by the scanner and the language detector.
#[derive(Debug, Clone)]
pub struct IgnoreRules {
    dirs: BTreeSet<String>,
}

impl Default for IgnoreRules {
    fn default() -> Self {
        Self {
            dirs: IGNORED_DIRS.iter().map(|d| d.to_string()).collect(),
        }
    }
}

impl IgnoreRules {
    /// Static rules plus additional directory names.
    pub fn with_extra<I, S>(extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut rules = Self::default();
        rules.extend(extra);
        rules
    }

    pub fn extend<I, S>(&mut self, extra: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for name in extra {
            let name = name.into();
            let name = name.trim();
            if !name.is_empty() {
                self.dirs.insert(name.trim_end_matches('/').to_string());
            }
        }
    }

    /// Read `.eonixignore` from `root` if present. Returns the number of entries added.
    ///
    /// One directory name per line; `#` comments and blank lines are skipped.
    pub fn load_ignore_file(&mut self, root: &Path) -> usize {
        let path = root.join(IGNORE_FILE);
        if !path.is_file() {
            return 0;
        }

        let content = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "cannot read ignore file");
                return 0;
            }
        };

        let entries = parse_ignore_file(&content);
        let added = entries.len();
        self.extend(entries);
        debug!(path = %path.display(), added, "loaded ignore file");
        added
    }

    /// Whether a directory with this name should be pruned.
    pub fn is_ignored_dir(&self, name: &str) -> bool {
        if self.dirs.iter().any(|pattern| matches_name(pattern, name)) {
            return true;
        }
        name.starts_with('.') && !ALLOWED_HIDDEN_DIRS.contains(&name)
    }

    /// Whether a file with this name is excluded regardless of its extension.
    pub fn is_ignored_file(&self, name: &str) -> bool {
        if name.starts_with('.') {
            return true;
        }
        IGNORED_FILE_SUFFIXES
            .iter()
            .any(|suffix| name.ends_with(suffix))
    }
}

/// Parse the body of an ignore file into directory names.
pub fn parse_ignore_file(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

fn matches_name(pattern: &str, name: &str) -> bool {
    match pattern.strip_prefix('*') {
        Some(suffix) => name.ends_with(suffix),
        None => pattern == name,
    }
}

/// Lower-cased extension of a path, without the dot.
pub fn normalized_extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

/// Walks a repository and selects files with known extensions.
pub struct RepositoryScanner {
    rules: IgnoreRules,
    stats: ScanStatistics,
}

impl RepositoryScanner {
    pub fn new(config: &ScanConfig) -> Self {
        Self {
            rules: IgnoreRules::with_extra(config.extra_ignores.iter().cloned()),
            stats: ScanStatistics::default(),
        }
    }

    pub fn rules(&self) -> &IgnoreRules {
        &self.rules
    }

    /// Add the entries of `root/.eonixignore` to the ignore set.
    pub fn load_ignore_file(&mut self, root: &Path) -> usize {
        self.rules.load_ignore_file(root)
    }

    /// Scan `root` and return processable files in a stable, name-sorted order.
    ///
    /// Unreadable entries are logged and skipped. Statistics accumulate across calls.
    pub fn scan(&mut self, root: &Path) -> Vec<FileInfo> {
        let root = root.canonicalize().unwrap_or_else(|_| root.to_path_buf());
        let mut files = Vec::new();
        let mut dirs_ignored = 0usize;
        let mut dirs_scanned = 0usize;

        let rules = &self.rules;
        let walker = WalkDir::new(&root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| {
                if entry.depth() == 0 || !entry.file_type().is_dir() {
                    return true;
                }
                let name = entry.file_name().to_string_lossy();
                if rules.is_ignored_dir(&name) {
                    dirs_ignored += 1;
                    false
                } else {
                    true
                }
            });

        for entry in walker {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    warn!(error = %e, "skipping unreadable entry");
                    continue;
                }
            };

            if entry.file_type().is_dir() {
                if entry.depth() > 0 {
                    dirs_scanned += 1;
                }
                continue;
            }
            if !entry.file_type().is_file() {
                continue;
            }

            let name = entry.file_name().to_string_lossy();
            if rules.is_ignored_file(&name) {
                continue;
            }
            let Some(extension) = normalized_extension(entry.path()) else {
                continue;
            };
            let Some(category) = FileCategory::from_extension(&extension) else {
                continue;
            };

            let size_bytes = match entry.metadata() {
                Ok(m) => m.len(),
                Err(e) => {
                    warn!(path = %entry.path().display(), error = %e, "cannot read file metadata");
                    continue;
                }
            };

            let relative_path = entry
                .path()
                .strip_prefix(&root)
                .unwrap_or(entry.path())
                .to_path_buf();

            files.push(FileInfo {
                path: entry.path().to_path_buf(),
                relative_path,
                extension,
                category,
                size_bytes,
            });
        }

        for file in &files {
            self.stats.record(file);
        }
        self.stats.total_files += files.len();
        self.stats.directories_ignored += dirs_ignored;
        self.stats.directories_scanned += dirs_scanned;

        info!(
            root = %root.display(),
            files = files.len(),
            dirs_scanned,
            dirs_ignored,
            "repository scan complete"
        );
        files
    }

    pub fn statistics(&self) -> &ScanStatistics {
        &self.stats
    }

    pub fn into_statistics(self) -> ScanStatistics {
        self.stats
    }
}

/// Load `.eonixignore`, scan `root` and return the files with their statistics.
pub fn scan_repository(root: &Path, config: &ScanConfig) -> (Vec<FileInfo>, ScanStatistics) {
    let mut scanner = RepositoryScanner::new(config);
    scanner.load_ignore_file(root);
    let files = scanner.scan(root);
    (files, scanner.into_statistics())
}
