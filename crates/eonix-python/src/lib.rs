//! Python extractor built on tree-sitter-python.
//!
//! Finds FastAPI/Flask endpoints, SQLAlchemy/Django/Pydantic models, Redis
//! clients, outbound `httpx`/`requests` calls and environment reads.

mod endpoints;
mod models;
mod resources;
mod syntax;

use std::path::Path;

use anyhow::{Context, Result};
use tracing::debug;
use tree_sitter::{Language, Parser, Query};

use eonix_core::extractor::{display_path, infer_service_name, Extractor};
use eonix_core::uas::{
    Confidence, ExtractionMethod, ExtractionResult, Metadata, NodeId, NodeKind, UasNode,
};

const FALLBACK_SERVICE: &str = "python-service";

/// Per-file state shared by the extraction passes.
pub(crate) struct FileContext<'a> {
    pub source: &'a str,
    pub file_path: String,
    pub service: String,
}

impl FileContext<'_> {
    /// Build a HIGH-confidence node whose id is fingerprinted from this file.
    pub fn node(
        &self,
        symbol: &str,
        name: String,
        line_number: usize,
        metadata: Metadata,
        kind: NodeKind,
    ) -> UasNode {
        UasNode {
            id: NodeId::fingerprint(&self.file_path, symbol, line_number),
            name,
            file_path: self.file_path.clone(),
            line_number,
            metadata,
            confidence: Confidence::High,
            extraction_method: ExtractionMethod::TreeSitter,
            kind,
        }
    }
}

/// Python extractor using tree-sitter.
pub struct PythonExtractor {
    language: Language,
    route_query: Query,
}

impl PythonExtractor {
    pub fn new() -> Result<Self> {
        let language: Language = tree_sitter_python::LANGUAGE.into();
        let route_query = Query::new(&language, endpoints::ROUTE_QUERY)
            .context("failed to compile route decorator query")?;
        Ok(Self {
            language,
            route_query,
        })
    }
}

impl Extractor for PythonExtractor {
    fn language(&self) -> &'static str {
        "python"
    }

    fn file_extensions(&self) -> &[&str] {
        &["py", "pyi"]
    }

    fn extract(&self, path: &Path, content: &str) -> ExtractionResult {
        let mut parser = Parser::new();
        if let Err(e) = parser.set_language(&self.language) {
            return ExtractionResult::failed(format!("failed to set Python language: {e}"));
        }
        let Some(tree) = parser.parse(content, None) else {
            return ExtractionResult::failed(format!("failed to parse {}", path.display()));
        };
        let root = tree.root_node();
        if root.has_error() {
            debug!(path = %path.display(), "syntax error, skipping file");
            return ExtractionResult::failed(format!("syntax error in {}", path.display()));
        }

        let ctx = FileContext {
            source: content,
            file_path: display_path(path),
            service: infer_service_name(path, FALLBACK_SERVICE),
        };

        let mut result = ExtractionResult::empty(Confidence::High);
        result
            .nodes
            .extend(endpoints::extract_endpoints(&self.route_query, root, &ctx));
        result.nodes.extend(models::extract_models(root, &ctx));
        let resources = resources::extract_resources(root, &ctx);
        result.nodes.extend(resources.nodes);
        result.edges.extend(resources.edges);

        debug!(
            path = %path.display(),
            nodes = result.nodes.len(),
            edges = result.edges.len(),
            "python extraction complete"
        );
        result
    }
}
