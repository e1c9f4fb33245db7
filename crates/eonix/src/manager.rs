use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::debug;

use eonix_core::config::ExtractorsConfig;
use eonix_core::external::{ParserSearch, ProcessLimiter};
use eonix_core::extractor::Extractor;
use eonix_core::scanner::normalized_extension;
use eonix_core::uas::{Confidence, ExtractionResult};

use eonix_go::GoExtractor;
use eonix_java::JavaExtractor;
use eonix_python::PythonExtractor;
use eonix_typescript::TypeScriptExtractor;

/// The extractors a file can be routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExtractorKind {
    Python,
    TypeScript,
    Go,
    Java,
}

/// Lower-cased extension to extractor.
static EXTENSION_TABLE: &[(&str, ExtractorKind)] = &[
    ("py", ExtractorKind::Python),
    ("pyi", ExtractorKind::Python),
    ("ts", ExtractorKind::TypeScript),
    ("tsx", ExtractorKind::TypeScript),
    ("js", ExtractorKind::TypeScript),
    ("jsx", ExtractorKind::TypeScript),
    ("mjs", ExtractorKind::TypeScript),
    ("cjs", ExtractorKind::TypeScript),
    ("go", ExtractorKind::Go),
    ("java", ExtractorKind::Java),
];

impl ExtractorKind {
    pub fn for_extension(ext: &str) -> Option<Self> {
        let ext = ext.trim_start_matches('.').to_ascii_lowercase();
        EXTENSION_TABLE
            .iter()
            .find(|(e, _)| *e == ext)
            .map(|(_, kind)| *kind)
    }

    pub fn for_path(path: &Path) -> Option<Self> {
        normalized_extension(path).and_then(|ext| Self::for_extension(&ext))
    }
}

/// Routes files to one extractor instance per language.
///
/// Extractors are built once; `extract_file` never fails, read and decode
/// problems come back as LOW results carrying the error.
pub struct ExtractionManager {
    python: PythonExtractor,
    typescript: TypeScriptExtractor,
    go: GoExtractor,
    java: JavaExtractor,
}

impl ExtractionManager {
    pub fn new(config: &ExtractorsConfig) -> Result<Self> {
        let limiter = parser_limiter(config)?;
        Ok(Self {
            python: PythonExtractor::new().context("failed to initialize Python extractor")?,
            typescript: TypeScriptExtractor::new()
                .context("failed to initialize TypeScript extractor")?,
            go: GoExtractor::new(config, Arc::clone(&limiter)),
            java: JavaExtractor::new(config, limiter),
        })
    }

    /// Manager whose Go and Java parsers are searched for under `base_dir` only,
    /// ignoring the process environment and `PATH`.
    pub fn with_parser_search(config: &ExtractorsConfig, base_dir: &Path) -> Result<Self> {
        let limiter = parser_limiter(config)?;
        let search = ParserSearch::isolated(base_dir);
        Ok(Self {
            python: PythonExtractor::new().context("failed to initialize Python extractor")?,
            typescript: TypeScriptExtractor::new()
                .context("failed to initialize TypeScript extractor")?,
            go: GoExtractor::with_search(config, Arc::clone(&limiter), &search),
            java: JavaExtractor::with_search(config, limiter, &search),
        })
    }

    pub fn extractor(&self, kind: ExtractorKind) -> &dyn Extractor {
        match kind {
            ExtractorKind::Python => &self.python,
            ExtractorKind::TypeScript => &self.typescript,
            ExtractorKind::Go => &self.go,
            ExtractorKind::Java => &self.java,
        }
    }

    pub fn supports(&self, ext: &str) -> bool {
        ExtractorKind::for_extension(ext).is_some()
    }

    pub fn go_available(&self) -> bool {
        self.go.is_available()
    }

    pub fn java_available(&self) -> bool {
        self.java.is_available()
    }

    /// Read `path` and extract from it.
    pub fn extract_file(&self, path: &Path) -> ExtractionResult {
        match read_source(path) {
            Ok(content) => self.extract_source(path, &content),
            Err(e) => ExtractionResult::failed(format!("{e:#}")),
        }
    }

    /// Extract from already-read content. Unknown extensions give an empty LOW result.
    pub fn extract_source(&self, path: &Path, content: &str) -> ExtractionResult {
        let Some(kind) = ExtractorKind::for_path(path) else {
            debug!(path = %path.display(), "no extractor for extension");
            return ExtractionResult::empty(Confidence::Low);
        };
        self.extractor(kind).extract(path, content)
    }
}

fn parser_limiter(config: &ExtractorsConfig) -> Result<Arc<ProcessLimiter>> {
    let limiter = ProcessLimiter::new(config.max_concurrent_processes)
        .context("failed to start parser process runtime")?;
    Ok(Arc::new(limiter))
}

/// File content as UTF-8.
pub fn read_source(path: &Path) -> Result<String> {
    let bytes =
        std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    String::from_utf8(bytes).with_context(|| format!("{} is not valid UTF-8", path.display()))
}
