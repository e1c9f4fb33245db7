use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::detector::DetectionResult;
use crate::scanner::ScanStatistics;
use crate::uas::{Confidence, ExtractionResult, UasNode};

/// Aggregate counts over a repository's extraction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionSummary {
    pub total_nodes: usize,
    pub nodes_by_type: BTreeMap<String, usize>,
    pub nodes_by_confidence: BTreeMap<Confidence, usize>,
    pub total_edges: usize,
    pub edges_by_type: BTreeMap<String, usize>,
    pub files_with_errors: usize,
    pub files_with_warnings: usize,
}

impl ExtractionSummary {
    /// Add one file's result to the totals.
    pub fn record(&mut self, result: &ExtractionResult) {
        for node in &result.nodes {
            *self
                .nodes_by_type
                .entry(node.type_name().to_string())
                .or_default() += 1;
            *self.nodes_by_confidence.entry(node.confidence).or_default() += 1;
        }
        for edge in &result.edges {
            *self
                .edges_by_type
                .entry(edge.kind.type_name().to_string())
                .or_default() += 1;
        }
        self.total_nodes += result.nodes.len();
        self.total_edges += result.edges.len();
        if !result.errors.is_empty() {
            self.files_with_errors += 1;
        }
        if !result.warnings.is_empty() {
            self.files_with_warnings += 1;
        }
    }

    pub fn from_results<'a>(results: impl IntoIterator<Item = &'a ExtractionResult>) -> Self {
        let mut summary = Self::default();
        for result in results {
            summary.record(result);
        }
        summary
    }

    pub fn count(&self, node_type: &str) -> usize {
        self.nodes_by_type.get(node_type).copied().unwrap_or(0)
    }
}

/// Everything learned about one repository in a single run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositoryAnalysis {
    pub root: PathBuf,
    pub detection: DetectionResult,
    pub scan: ScanStatistics,
    /// Source files dispatched to an extractor
    pub files_extracted: usize,
    /// Files whose result came from the incremental cache
    #[serde(default)]
    pub files_from_cache: usize,
    pub result: ExtractionResult,
    pub summary: ExtractionSummary,
}

impl RepositoryAnalysis {
    pub fn nodes_of_type<'a>(&'a self, node_type: &'a str) -> impl Iterator<Item = &'a UasNode> + 'a {
        self.result
            .nodes
            .iter()
            .filter(move |n| n.type_name() == node_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::uas::{
        CacheInfo, DependencyEdge, EdgeKind, ExtractionMethod, Metadata, NodeId, NodeKind,
    };

    fn cache_node(confidence: Confidence) -> UasNode {
        UasNode {
            id: NodeId::fingerprint("app/cache.py", "cache:Redis:1", 3),
            name: "Redis".to_string(),
            file_path: "app/cache.py".to_string(),
            line_number: 3,
            metadata: Metadata::new(),
            confidence,
            extraction_method: ExtractionMethod::TreeSitter,
            kind: NodeKind::Cache(CacheInfo {
                technology: "Redis".to_string(),
                host: Some("localhost".to_string()),
                port: Some(6379),
                ttl: None,
                key_pattern: None,
            }),
        }
    }

    #[test]
    fn test_summary_counts() {
        let mut first = ExtractionResult::empty(Confidence::High);
        first.nodes.push(cache_node(Confidence::High));
        first.edges.push(DependencyEdge {
            source_id: "app".to_string(),
            target_id: first.nodes[0].id.to_string(),
            kind: EdgeKind::Cache {
                operations: vec!["get".to_string()],
            },
            metadata: Metadata::new(),
        });

        let mut second = ExtractionResult::failed("parse error");
        second.warnings.push("fallback".to_string());
        let third = ExtractionResult::degraded("go parser unavailable");

        let summary = ExtractionSummary::from_results([&first, &second, &third]);
        assert_eq!(summary.total_nodes, 1);
        assert_eq!(summary.count("Cache"), 1);
        assert_eq!(summary.count("Endpoint"), 0);
        assert_eq!(summary.nodes_by_confidence[&Confidence::High], 1);
        assert_eq!(summary.edges_by_type["CACHES"], 1);
        assert_eq!(summary.files_with_errors, 1);
        assert_eq!(summary.files_with_warnings, 2);
    }

    #[test]
    fn test_summary_serializes_confidence_keys() {
        let mut result = ExtractionResult::empty(Confidence::Medium);
        result.nodes.push(cache_node(Confidence::Medium));
        let summary = ExtractionSummary::from_results([&result]);

        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["nodes_by_confidence"]["MEDIUM"], 1);
    }
}
