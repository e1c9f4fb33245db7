//! Go extractor. Parsing is delegated to a native `go-extractor` binary that
//! prints UAS facts as JSON for one file at a time.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use eonix_core::config::ExtractorsConfig;
use eonix_core::external::{ExternalExtractor, ExternalParser, ParserSearch, ProcessLimiter};
use eonix_core::extractor::Extractor;
use eonix_core::uas::ExtractionResult;

/// Environment variable naming the parser binary.
pub const PARSER_ENV: &str = "EONIX_GO_EXTRACTOR";

const PARSER_BINARY: &str = "go-extractor";

const VENDOR_PATHS: &[&str] = &[
    "vendor/go-extractor/go-extractor",
    "backend/vendor/go-extractor/go-extractor",
    "../vendor/go-extractor/go-extractor",
];

/// Go language extractor backed by a subprocess.
pub struct GoExtractor {
    inner: ExternalExtractor,
}

impl GoExtractor {
    /// Locate the parser from `config`, [`PARSER_ENV`], vendor paths under the
    /// working directory and finally `PATH`.
    pub fn new(config: &ExtractorsConfig, limiter: Arc<ProcessLimiter>) -> Self {
        Self::with_search(config, limiter, &ParserSearch::from_process(PARSER_ENV))
    }

    pub fn with_search(
        config: &ExtractorsConfig,
        limiter: Arc<ProcessLimiter>,
        search: &ParserSearch,
    ) -> Self {
        let inner = match locate_parser(config, search) {
            Some(program) => {
                info!(parser = %program.display(), "using Go parser");
                let timeout = Duration::from_secs(config.timeout_secs);
                ExternalExtractor::available("go", ExternalParser::new(program, timeout, limiter))
            }
            None => ExternalExtractor::unavailable(
                "go",
                format!("{PARSER_BINARY} not found; set extractors.go_parser or {PARSER_ENV}"),
            ),
        };
        Self { inner }
    }

    pub fn is_available(&self) -> bool {
        self.inner.is_available()
    }

    pub fn parser_path(&self) -> Option<&Path> {
        self.inner.parser().map(|p| p.program())
    }
}

/// Parser location, checked in discovery order.
pub fn locate_parser(config: &ExtractorsConfig, search: &ParserSearch) -> Option<PathBuf> {
    search
        .find_artifact(config.go_parser_path(), VENDOR_PATHS)
        .or_else(|| search.find_program(PARSER_BINARY))
}

impl Extractor for GoExtractor {
    fn language(&self) -> &'static str {
        "go"
    }

    fn file_extensions(&self) -> &[&str] {
        &["go"]
    }

    fn extract(&self, path: &Path, _content: &str) -> ExtractionResult {
        self.inner.extract(path)
    }
}
