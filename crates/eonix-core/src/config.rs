use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

/// Name of the configuration file looked up from the analyzed directory upwards.
pub const CONFIG_FILE: &str = ".eonix.toml";

/// Top-level configuration from `.eonix.toml`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub scan: ScanConfig,
    #[serde(default)]
    pub detector: DetectorConfig,
    #[serde(default)]
    pub extractors: ExtractorsConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Directory names pruned in addition to the built-in ignore set
    #[serde(default)]
    pub extra_ignores: Vec<String>,
}

/// Bounds on the language and framework census
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectorConfig {
    #[serde(default = "default_sample_limit")]
    pub sample_limit: usize,
    #[serde(default = "default_import_search_files")]
    pub import_search_files: usize,
    #[serde(default = "default_import_prefix_bytes")]
    pub import_prefix_bytes: usize,
}

fn default_sample_limit() -> usize {
    1000
}
fn default_import_search_files() -> usize {
    50
}
fn default_import_prefix_bytes() -> usize {
    10_000
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            sample_limit: default_sample_limit(),
            import_search_files: default_import_search_files(),
            import_prefix_bytes: default_import_prefix_bytes(),
        }
    }
}

/// Settings for the subprocess-backed Go and Java extractors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractorsConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_concurrent_processes")]
    pub max_concurrent_processes: usize,
    #[serde(default)]
    pub go_parser: Option<PathBuf>,
    #[serde(default)]
    pub java_parser_jar: Option<PathBuf>,
    #[serde(default = "default_java_runtime")]
    pub java_runtime: String,
}

fn default_timeout_secs() -> u64 {
    30
}
fn default_max_concurrent_processes() -> usize {
    4
}
fn default_java_runtime() -> String {
    "java".to_string()
}

impl Default for ExtractorsConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            max_concurrent_processes: default_max_concurrent_processes(),
            go_parser: None,
            java_parser_jar: None,
            java_runtime: default_java_runtime(),
        }
    }
}

impl ExtractorsConfig {
    /// Configured Go parser path, treating an empty string as unset.
    pub fn go_parser_path(&self) -> Option<&Path> {
        non_empty_path(self.go_parser.as_deref())
    }

    /// Configured Java parser jar, treating an empty string as unset.
    pub fn java_parser_jar_path(&self) -> Option<&Path> {
        non_empty_path(self.java_parser_jar.as_deref())
    }

    /// Anchor relative parser paths at `dir`, the directory holding the config file.
    pub fn resolve_paths(&mut self, dir: &Path) {
        for path in [&mut self.go_parser, &mut self.java_parser_jar]
            .into_iter()
            .flatten()
        {
            if !path.as_os_str().is_empty() && path.is_relative() {
                *path = dir.join(&*path);
            }
        }
    }
}

fn non_empty_path(path: Option<&Path>) -> Option<&Path> {
    path.filter(|p| !p.as_os_str().is_empty())
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Worker threads for per-file extraction, 0 means one per CPU
    #[serde(default)]
    pub workers: usize,
    #[serde(default)]
    pub incremental: bool,
}

impl Config {
    /// Load configuration from a `.eonix.toml` file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file '{}'", path.display()))?;
        let mut config: Config = toml::from_str(&content).with_context(|| {
            format!(
                "failed to parse '{}'. Run `eonix init` to create a valid config file",
                path.display()
            )
        })?;
        let file = std::path::absolute(path)
            .with_context(|| format!("failed to resolve '{}'", path.display()))?;
        if let Some(dir) = file.parent() {
            config.extractors.resolve_paths(dir);
        }
        Ok(config)
    }

    /// Find `.eonix.toml` in `dir` or the nearest ancestor.
    pub fn find(dir: &Path) -> Option<PathBuf> {
        let start = dir.canonicalize().unwrap_or_else(|_| dir.to_path_buf());
        start
            .ancestors()
            .map(|d| d.join(CONFIG_FILE))
            .find(|p| p.is_file())
    }

    /// Load from `.eonix.toml` in the given directory or any ancestor, or return defaults.
    pub fn load_or_default(dir: &Path) -> Self {
        let Some(config_path) = Self::find(dir) else {
            return Self::default();
        };
        match Self::load(&config_path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    path = %config_path.display(),
                    "failed to load config: {e:#}. Using defaults"
                );
                Self::default()
            }
        }
    }

    /// Generate default TOML content for `eonix init`.
    pub fn default_toml() -> String {
        r#"# Eonix - Architecture Extraction Configuration

[scan]
# Directory names skipped in addition to the built-in ignore set
# (a .eonixignore file at the repository root is also honored)
extra_ignores = []

[detector]
# File ceiling for the extension census
sample_limit = 1000
# Files searched per framework when looking for import statements
import_search_files = 50
# Bytes read from the start of each file during the import search
import_prefix_bytes = 10000

[extractors]
# Per-file timeout for the Go and Java parser subprocesses, in seconds
timeout_secs = 30
max_concurrent_processes = 4
# Explicit parser locations; when unset, EONIX_GO_EXTRACTOR / EONIX_JAVA_EXTRACTOR_JAR,
# vendor/ and PATH are searched in that order
# go_parser = "vendor/go-extractor/go-extractor"
# java_parser_jar = "vendor/java-extractor/target/java-extractor.jar"
java_runtime = "java"

[pipeline]
# 0 uses one worker per CPU
workers = 0
# Reuse cached results for files whose content has not changed (.eonix/cache.json)
incremental = false
"#
        .to_string()
    }
}
