use anyhow::{Context, Result};
use serde::Serialize;

use eonix_core::analysis::RepositoryAnalysis;
use eonix_core::detector::DetectionResult;
use eonix_core::scanner::{FileInfo, ScanStatistics};

/// Serialize any report value, pretty-printed unless `compact`.
pub fn render<T: Serialize + ?Sized>(value: &T, compact: bool) -> Result<String> {
    let json = if compact {
        serde_json::to_string(value)
    } else {
        serde_json::to_string_pretty(value)
    };
    json.context("failed to serialize report")
}

/// Full analysis report as JSON.
pub fn format_analysis(analysis: &RepositoryAnalysis, compact: bool) -> Result<String> {
    render(analysis, compact)
}

pub fn format_detection(detection: &DetectionResult, compact: bool) -> Result<String> {
    render(detection, compact)
}

/// Scan output: the file list plus running statistics.
#[derive(Debug, Serialize)]
pub struct ScanOutput<'a> {
    pub files: &'a [FileInfo],
    pub statistics: &'a ScanStatistics,
}

pub fn format_scan(files: &[FileInfo], statistics: &ScanStatistics, compact: bool) -> Result<String> {
    render(&ScanOutput { files, statistics }, compact)
}

#[cfg(test)]
mod tests {
    use super::*;
    use eonix_core::analysis::ExtractionSummary;
    use eonix_core::detector::{ArchitectureType, Language};
    use eonix_core::scanner::FileCategory;
    use eonix_core::uas::{
        Confidence, EndpointInfo, ExtractionMethod, ExtractionResult, Metadata, NodeId, NodeKind,
        UasNode,
    };
    use std::collections::BTreeMap;
    use std::path::PathBuf;

    fn sample_analysis() -> RepositoryAnalysis {
        let node = UasNode {
            id: NodeId::fingerprint("api/users.py", "endpoint:get_user:GET:/users/{id}", 5),
            name: "get_user".to_string(),
            file_path: "api/users.py".to_string(),
            line_number: 5,
            metadata: Metadata::new(),
            confidence: Confidence::High,
            extraction_method: ExtractionMethod::TreeSitter,
            kind: NodeKind::Endpoint(EndpointInfo {
                method: "GET".to_string(),
                path: "/users/{id}".to_string(),
                parameters: Vec::new(),
                response_type: None,
            }),
        };
        let mut result = ExtractionResult::empty(Confidence::High);
        result.nodes.push(node);
        let summary = ExtractionSummary::from_results([&result]);

        RepositoryAnalysis {
            root: PathBuf::from("/repo"),
            detection: DetectionResult {
                primary_language: Language::Python,
                frameworks: Vec::new(),
                languages_detected: BTreeMap::from([(Language::Python, 1)]),
                confidence: Confidence::High,
                evidence: BTreeMap::new(),
                is_monorepo: false,
                architecture_type: ArchitectureType::Monolith,
            },
            scan: ScanStatistics::default(),
            files_extracted: 1,
            files_from_cache: 0,
            result,
            summary,
        }
    }

    #[test]
    fn test_format_analysis_valid_json() {
        let json = format_analysis(&sample_analysis(), false).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).expect("should be valid JSON");
        assert_eq!(parsed["files_extracted"], 1);
        assert_eq!(parsed["result"]["confidence"], "HIGH");
        let node = &parsed["result"]["nodes"][0];
        assert_eq!(node["type"], "Endpoint");
        assert_eq!(node["method"], "GET");
        assert_eq!(node["path"], "/users/{id}");
        assert_eq!(parsed["summary"]["nodes_by_type"]["Endpoint"], 1);
    }

    #[test]
    fn test_compact_is_single_line() {
        let json = format_analysis(&sample_analysis(), true).unwrap();
        assert!(!json.contains('\n'), "compact JSON should be single line");
        let pretty = format_analysis(&sample_analysis(), false).unwrap();
        assert!(pretty.contains('\n'), "pretty JSON should be multiline");
    }

    #[test]
    fn test_format_detection() {
        let json = format_detection(&sample_analysis().detection, true).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["confidence"], "HIGH");
        assert_eq!(parsed["is_monorepo"], false);
    }

    #[test]
    fn test_format_scan_includes_files_and_statistics() {
        let files = vec![FileInfo {
            path: PathBuf::from("/repo/app.py"),
            relative_path: PathBuf::from("app.py"),
            extension: "py".to_string(),
            category: FileCategory::Python,
            size_bytes: 42,
        }];
        let mut statistics = ScanStatistics::default();
        statistics.total_files = 1;
        statistics.total_size_bytes = 42;

        let json = format_scan(&files, &statistics, true).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["files"][0]["category"], "python");
        assert_eq!(parsed["statistics"]["total_files"], 1);
    }
}
