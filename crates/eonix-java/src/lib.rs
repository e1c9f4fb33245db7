//! Java extractor. Parsing is delegated to `java-extractor.jar`, run as
//! `<java> -jar <jar> <file>`.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use eonix_core::config::ExtractorsConfig;
use eonix_core::external::{ExternalExtractor, ExternalParser, ParserSearch, ProcessLimiter};
use eonix_core::extractor::Extractor;
use eonix_core::uas::ExtractionResult;

/// Environment variable naming the parser jar.
pub const PARSER_ENV: &str = "EONIX_JAVA_EXTRACTOR_JAR";

const VENDOR_PATHS: &[&str] = &[
    "vendor/java-extractor/target/java-extractor.jar",
    "backend/vendor/java-extractor/target/java-extractor.jar",
    "../vendor/java-extractor/target/java-extractor.jar",
];

/// Java language extractor backed by a JVM subprocess.
pub struct JavaExtractor {
    inner: ExternalExtractor,
}

impl JavaExtractor {
    /// Locate the jar from `config`, [`PARSER_ENV`] or vendor paths under the
    /// working directory, and the runtime on `PATH`.
    pub fn new(config: &ExtractorsConfig, limiter: Arc<ProcessLimiter>) -> Self {
        Self::with_search(config, limiter, &ParserSearch::from_process(PARSER_ENV))
    }

    pub fn with_search(
        config: &ExtractorsConfig,
        limiter: Arc<ProcessLimiter>,
        search: &ParserSearch,
    ) -> Self {
        let Some(jar) = locate_jar(config, search) else {
            return Self {
                inner: ExternalExtractor::unavailable(
                    "java",
                    format!(
                        "java-extractor.jar not found; set extractors.java_parser_jar or {PARSER_ENV}"
                    ),
                ),
            };
        };
        let Some(runtime) = search.find_program(&config.java_runtime) else {
            return Self {
                inner: ExternalExtractor::unavailable(
                    "java",
                    format!("Java runtime '{}' not found on PATH", config.java_runtime),
                ),
            };
        };

        info!(runtime = %runtime.display(), jar = %jar.display(), "using Java parser");
        let timeout = Duration::from_secs(config.timeout_secs);
        let parser = ExternalParser::new(runtime, timeout, limiter)
            .arg("-jar")
            .arg(jar);
        Self {
            inner: ExternalExtractor::available("java", parser),
        }
    }

    pub fn is_available(&self) -> bool {
        self.inner.is_available()
    }
}

/// Jar location, checked in discovery order.
pub fn locate_jar(config: &ExtractorsConfig, search: &ParserSearch) -> Option<PathBuf> {
    search.find_artifact(config.java_parser_jar_path(), VENDOR_PATHS)
}

impl Extractor for JavaExtractor {
    fn language(&self) -> &'static str {
        "java"
    }

    fn file_extensions(&self) -> &[&str] {
        &["java"]
    }

    fn extract(&self, path: &Path, _content: &str) -> ExtractionResult {
        self.inner.extract(path)
    }
}
