use std::path::Path;

use crate::uas::ExtractionResult;

/// Trait that each language extractor must implement.
///
/// `extract` never fails: parse problems, missing tools and subprocess errors are
/// reported through the returned result's confidence, `errors` and `warnings`.
pub trait Extractor: Send + Sync {
    /// Language name (e.g., "python", "go")
    fn language(&self) -> &'static str;

    /// File extensions this extractor handles, lower-case without the dot
    fn file_extensions(&self) -> &[&str];

    /// Extract architectural facts from one source file.
    fn extract(&self, path: &Path, content: &str) -> ExtractionResult;
}

/// Service identifier for facts found in `path`: the parent directory name when the
/// path has more than two components, otherwise `fallback`.
pub fn infer_service_name(path: &Path, fallback: &str) -> String {
    let parts: Vec<_> = path.iter().collect();
    if parts.len() > 2 {
        if let Some(parent) = parts.get(parts.len() - 2) {
            return parent.to_string_lossy().into_owned();
        }
    }
    fallback.to_string()
}

const SENSITIVE_MARKERS: &[&str] = &["SECRET", "PASSWORD", "TOKEN", "KEY", "CREDENTIAL"];

/// Whether an environment variable name looks like it carries a credential.
pub fn is_sensitive_env_var(name: &str) -> bool {
    let upper = name.to_uppercase();
    SENSITIVE_MARKERS.iter().any(|m| upper.contains(m))
}

/// File path as stored on nodes, with `/` separators.
pub fn display_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}
