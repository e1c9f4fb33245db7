use colored::{ColoredString, Colorize};

use eonix_core::analysis::RepositoryAnalysis;
use eonix_core::detector::DetectionResult;
use eonix_core::scanner::{FileInfo, ScanStatistics};
use eonix_core::uas::{Confidence, NodeKind, UasNode};

/// Problems listed per kind before the rest is summarized.
const MAX_LISTED_PROBLEMS: usize = 20;

fn confidence_label(confidence: Confidence) -> ColoredString {
    let label = confidence.to_string();
    match confidence {
        Confidence::High => label.green().bold(),
        Confidence::Medium => label.yellow().bold(),
        Confidence::Low => label.red().bold(),
    }
}

fn section(out: &mut String, title: &str) {
    out.push_str(&format!("\n{}\n{}\n", title.bold(), "-".repeat(40)));
}

fn human_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{size:.1} {}", UNITS[unit])
    }
}

/// Format a full analysis report for terminal output.
pub fn format_analysis(analysis: &RepositoryAnalysis) -> String {
    let mut out = String::new();

    out.push_str(&format!("\n{}\n", "Eonix - Repository Analysis".bold()));
    out.push_str(&format!("{}\n", "=".repeat(40)));
    out.push_str(&format!("{}: {}\n", "Root".bold(), analysis.root.display()));

    out.push_str(&detection_body(&analysis.detection));

    section(&mut out, "Scan");
    out.push_str(&scan_body(&analysis.scan));

    section(&mut out, "Extraction");
    let summary = &analysis.summary;
    out.push_str(&format!(
        "  Files extracted: {} ({} from cache)\n",
        analysis.files_extracted, analysis.files_from_cache
    ));
    out.push_str(&format!(
        "  Overall confidence: {}\n",
        confidence_label(analysis.result.confidence)
    ));
    out.push_str(&format!("  Nodes: {}\n", summary.total_nodes));
    for (kind, count) in &summary.nodes_by_type {
        out.push_str(&format!("    {kind}: {count}\n"));
    }
    if !summary.nodes_by_confidence.is_empty() {
        let by_confidence: Vec<String> = summary
            .nodes_by_confidence
            .iter()
            .rev()
            .map(|(c, n)| format!("{} {n}", confidence_label(*c)))
            .collect();
        out.push_str(&format!("    by confidence: {}\n", by_confidence.join(", ")));
    }
    out.push_str(&format!("  Edges: {}\n", summary.total_edges));
    for (kind, count) in &summary.edges_by_type {
        out.push_str(&format!("    {kind}: {count}\n"));
    }

    let nodes = &analysis.result.nodes;
    list_facts(&mut out, "Endpoints", nodes, |node| {
        let info = node.as_endpoint()?;
        Some(format!("{:<7} {}", info.method.cyan(), info.path))
    });
    list_facts(&mut out, "Database Models", nodes, |node| {
        let info = node.as_database_model()?;
        Some(format!(
            "{} (table {}, {} columns)",
            node.name,
            info.table_name.cyan(),
            info.columns.len()
        ))
    });
    list_facts(&mut out, "Dependencies", nodes, |node| match &node.kind {
        NodeKind::Cache(info) => Some(format!(
            "cache {} {}",
            info.technology.cyan(),
            info.host.as_deref().unwrap_or("?")
        )),
        NodeKind::Event(info) => Some(format!("event {} {}", info.technology.cyan(), info.topic_name)),
        NodeKind::ExternalApi(info) => {
            Some(format!("external {} {}", info.provider.cyan(), info.base_url))
        }
        _ => None,
    });
    list_facts(&mut out, "Configuration", nodes, |node| {
        let info = node.as_config()?;
        let marker = if info.sensitive {
            " (sensitive)".yellow().to_string()
        } else {
            String::new()
        };
        Some(format!("{}{marker}", info.env_var))
    });

    let errors = &analysis.result.errors;
    let warnings = &analysis.result.warnings;
    if errors.is_empty() && warnings.is_empty() {
        out.push_str(&format!("\n{}\n", "No extraction problems.".green().bold()));
    } else {
        section(
            &mut out,
            &format!(
                "Problems ({} files with errors, {} with warnings)",
                summary.files_with_errors, summary.files_with_warnings
            ),
        );
        list_problems(&mut out, errors, "ERROR".red().bold());
        list_problems(&mut out, warnings, "WARN".yellow().bold());
    }

    out.push('\n');
    out
}

fn list_facts(
    out: &mut String,
    title: &str,
    nodes: &[UasNode],
    describe: impl Fn(&UasNode) -> Option<String>,
) {
    let lines: Vec<String> = nodes
        .iter()
        .filter_map(|node| {
            let text = describe(node)?;
            Some(format!(
                "  {text}  {}:{} [{}]",
                node.file_path.dimmed(),
                node.line_number,
                confidence_label(node.confidence)
            ))
        })
        .collect();
    if lines.is_empty() {
        return;
    }
    section(out, &format!("{title} ({})", lines.len()));
    for line in lines {
        out.push_str(&line);
        out.push('\n');
    }
}

fn list_problems(out: &mut String, problems: &[String], label: ColoredString) {
    for problem in problems.iter().take(MAX_LISTED_PROBLEMS) {
        out.push_str(&format!("  {label} {problem}\n"));
    }
    if problems.len() > MAX_LISTED_PROBLEMS {
        out.push_str(&format!(
            "  ... and {} more\n",
            problems.len() - MAX_LISTED_PROBLEMS
        ));
    }
}

/// Format a detection result for terminal output.
pub fn format_detection(detection: &DetectionResult) -> String {
    let mut out = String::new();
    out.push_str(&format!("\n{}\n", "Eonix - Language Detection".bold()));
    out.push_str(&format!("{}\n", "=".repeat(40)));
    out.push_str(&detection_body(detection));
    out.push('\n');
    out
}

fn detection_body(detection: &DetectionResult) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{}: {} [{}]\n",
        "Primary language".bold(),
        detection.primary_language,
        confidence_label(detection.confidence)
    ));
    out.push_str(&format!(
        "{}: {}{}\n",
        "Architecture".bold(),
        detection.architecture_type,
        if detection.is_monorepo { " (monorepo)" } else { "" }
    ));

    if !detection.languages_detected.is_empty() {
        out.push_str("  Files by language:\n");
        for (language, count) in &detection.languages_detected {
            out.push_str(&format!("    {language}: {count}\n"));
        }
    }

    if detection.frameworks.is_empty() {
        out.push_str("  Frameworks: none detected\n");
    } else {
        out.push_str("  Frameworks:\n");
        for framework in &detection.frameworks {
            out.push_str(&format!(
                "    {} [{}]\n",
                framework.name,
                confidence_label(framework.confidence)
            ));
        }
    }

    if !detection.evidence.is_empty() {
        out.push_str("  Evidence:\n");
        for (key, items) in &detection.evidence {
            out.push_str(&format!("    {}: {}\n", key.dimmed(), items.join(", ")));
        }
    }
    out
}

/// Format scan results: statistics, then the selected files.
pub fn format_scan(files: &[FileInfo], statistics: &ScanStatistics) -> String {
    let mut out = String::new();
    out.push_str(&format!("\n{}\n", "Eonix - Repository Scan".bold()));
    out.push_str(&format!("{}\n", "=".repeat(40)));
    out.push_str(&scan_body(statistics));

    if !files.is_empty() {
        section(&mut out, "Files");
        for file in files {
            out.push_str(&format!(
                "  {:<11} {}\n",
                file.category.to_string().cyan(),
                file.relative_path.display()
            ));
        }
    }
    out.push('\n');
    out
}

fn scan_body(statistics: &ScanStatistics) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "  {} files, {}\n",
        statistics.total_files,
        human_size(statistics.total_size_bytes)
    ));
    out.push_str(&format!(
        "  Directories: {} scanned, {} ignored\n",
        statistics.directories_scanned, statistics.directories_ignored
    ));
    for (category, count) in &statistics.files_by_category {
        out.push_str(&format!("    {category}: {count}\n"));
    }
    out
}
