//! Primary language, framework and architecture-shape detection.
//!
//! Two signals are combined: marker files at the repository root and a bounded
//! census of source file extensions. Framework detection adds a capped import
//! search on top of marker files.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::config::DetectorConfig;
use crate::scanner::{normalized_extension, IgnoreRules};
use crate::uas::Confidence;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Language {
    Python,
    TypeScript,
    JavaScript,
    Java,
    Go,
    Unknown,
}

impl Language {
    /// Known languages in tie-break order.
    pub const KNOWN: [Language; 5] = [
        Language::Python,
        Language::TypeScript,
        Language::JavaScript,
        Language::Java,
        Language::Go,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Python => "Python",
            Language::TypeScript => "TypeScript",
            Language::JavaScript => "JavaScript",
            Language::Java => "Java",
            Language::Go => "Go",
            Language::Unknown => "Unknown",
        }
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        let lang = match ext {
            "py" | "pyi" => Language::Python,
            "js" | "jsx" | "mjs" | "cjs" => Language::JavaScript,
            "ts" | "tsx" => Language::TypeScript,
            "java" => Language::Java,
            "go" => Language::Go,
            _ => return None,
        };
        Some(lang)
    }

    pub fn is_js_family(&self) -> bool {
        matches!(self, Language::JavaScript | Language::TypeScript)
    }

    /// Extensions searched for import statements of a framework owned by this language.
    fn import_search_extensions(&self) -> &'static [&'static str] {
        match self {
            Language::Python => &["py"],
            Language::JavaScript | Language::TypeScript => {
                &["js", "jsx", "mjs", "cjs", "ts", "tsx"]
            }
            Language::Java => &["java"],
            Language::Go => &["go"],
            Language::Unknown => &[],
        }
    }

    fn tie_rank(&self) -> usize {
        Self::KNOWN
            .iter()
            .position(|l| l == self)
            .unwrap_or(Self::KNOWN.len())
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "python" => Ok(Language::Python),
            "typescript" => Ok(Language::TypeScript),
            "javascript" => Ok(Language::JavaScript),
            "java" => Ok(Language::Java),
            "go" => Ok(Language::Go),
            "unknown" => Ok(Language::Unknown),
            other => Err(format!("unknown language: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArchitectureType {
    Monolith,
    Microservices,
    Unknown,
}

impl fmt::Display for ArchitectureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ArchitectureType::Monolith => "monolith",
            ArchitectureType::Microservices => "microservices",
            ArchitectureType::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Framework {
    pub name: String,
    pub confidence: Confidence,
    pub evidence: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectionResult {
    pub primary_language: Language,
    pub frameworks: Vec<Framework>,
    /// Source file counts from the sampled census, non-zero entries only
    pub languages_detected: BTreeMap<Language, usize>,
    pub confidence: Confidence,
    pub evidence: BTreeMap<String, Vec<String>>,
    pub is_monorepo: bool,
    pub architecture_type: ArchitectureType,
}

impl DetectionResult {
    pub fn has_framework(&self, name: &str) -> bool {
        self.frameworks.iter().any(|f| f.name == name)
    }
}

const LANGUAGE_MARKERS: &[(Language, &[&str])] = &[
    (
        Language::Python,
        &["requirements.txt", "pyproject.toml", "setup.py", "Pipfile", "poetry.lock"],
    ),
    (Language::JavaScript, &["package.json"]),
    (Language::TypeScript, &["tsconfig.json"]),
    (Language::Java, &["pom.xml", "build.gradle", "build.gradle.kts"]),
    (Language::Go, &["go.mod", "go.sum"]),
];

const WORKSPACE_MARKERS: &[&str] = &[
    "lerna.json",
    "pnpm-workspace.yaml",
    "nx.json",
    "turbo.json",
    "rush.json",
    "go.work",
];

const COMPOSE_FILES: &[&str] = &[
    "docker-compose.yml",
    "docker-compose.yaml",
    "compose.yml",
    "compose.yaml",
];

const KUBERNETES_DIRS: &[&str] = &["k8s", "kubernetes"];

const MONOREPO_DIRS: &[&str] = &["packages", "apps"];

struct FrameworkSpec {
    name: &'static str,
    language: Language,
    marker_files: &'static [&'static str],
    import_patterns: &'static [&'static str],
}

const FRAMEWORKS: &[FrameworkSpec] = &[
    FrameworkSpec {
        name: "FastAPI",
        language: Language::Python,
        marker_files: &[],
        import_patterns: &[r"from\s+fastapi\s+import", r"import\s+fastapi"],
    },
    FrameworkSpec {
        name: "Flask",
        language: Language::Python,
        marker_files: &[],
        import_patterns: &[r"from\s+flask\s+import", r"import\s+flask\b"],
    },
    FrameworkSpec {
        name: "Django",
        language: Language::Python,
        marker_files: &["manage.py", "settings.py"],
        import_patterns: &[r"from\s+django", r"import\s+django"],
    },
    FrameworkSpec {
        name: "SQLAlchemy",
        language: Language::Python,
        marker_files: &[],
        import_patterns: &[r"from\s+sqlalchemy", r"import\s+sqlalchemy"],
    },
    FrameworkSpec {
        name: "Express",
        language: Language::JavaScript,
        marker_files: &[],
        import_patterns: &[r#"require\(['"]express['"]\)"#, r#"from\s+['"]express['"]"#],
    },
    FrameworkSpec {
        name: "NestJS",
        language: Language::TypeScript,
        marker_files: &["nest-cli.json"],
        import_patterns: &[r"@nestjs/", r"import.*@nestjs"],
    },
    FrameworkSpec {
        name: "Next.js",
        language: Language::TypeScript,
        marker_files: &["next.config.js", "next.config.mjs", "next.config.ts"],
        import_patterns: &[r#"from\s+['"]next[/'"]"#, r#"require\(['"]next[/'"]"#],
    },
    FrameworkSpec {
        name: "React",
        language: Language::JavaScript,
        marker_files: &[],
        import_patterns: &[r#"from\s+['"]react['"]"#, r"import\s+React\b"],
    },
    FrameworkSpec {
        name: "Prisma",
        language: Language::TypeScript,
        marker_files: &["schema.prisma", "prisma/schema.prisma"],
        import_patterns: &[r"@prisma/client", r#"from\s+['"]@prisma"#],
    },
    FrameworkSpec {
        name: "TypeORM",
        language: Language::TypeScript,
        marker_files: &[],
        import_patterns: &[r#"from\s+['"]typeorm['"]"#, r"import.*typeorm"],
    },
    FrameworkSpec {
        name: "Spring Boot",
        language: Language::Java,
        marker_files: &[],
        import_patterns: &[r"import\s+org\.springframework"],
    },
    FrameworkSpec {
        name: "Gin",
        language: Language::Go,
        marker_files: &[],
        import_patterns: &[r#""github\.com/gin-gonic/gin""#],
    },
    FrameworkSpec {
        name: "Echo",
        language: Language::Go,
        marker_files: &[],
        import_patterns: &[r#""github\.com/labstack/echo(/v\d+)?""#],
    },
    FrameworkSpec {
        name: "GORM",
        language: Language::Go,
        marker_files: &[],
        import_patterns: &[r#""gorm\.io/gorm""#, r#""github\.com/jinzhu/gorm""#],
    },
];

/// Repository-level language and framework detector.
///
/// Construction compiles the framework import patterns once; `detect` only reads
/// the filesystem and returns a fresh [`DetectionResult`].
pub struct LanguageDetector {
    root: PathBuf,
    rules: IgnoreRules,
    config: DetectorConfig,
    import_patterns: Vec<Vec<Regex>>,
}

impl LanguageDetector {
    pub fn new(root: &Path, config: &DetectorConfig) -> Self {
        Self::with_rules(root, config, IgnoreRules::default())
    }

    /// Detector that prunes the same directories as a configured scanner.
    pub fn with_rules(root: &Path, config: &DetectorConfig, rules: IgnoreRules) -> Self {
        let import_patterns = FRAMEWORKS
            .iter()
            .map(|spec| {
                spec.import_patterns
                    .iter()
                    .filter_map(|p| match Regex::new(p) {
                        Ok(re) => Some(re),
                        Err(e) => {
                            warn!(framework = spec.name, pattern = p, error = %e, "invalid import pattern");
                            None
                        }
                    })
                    .collect()
            })
            .collect();

        Self {
            root: root.canonicalize().unwrap_or_else(|_| root.to_path_buf()),
            rules,
            config: config.clone(),
            import_patterns,
        }
    }

    pub fn detect(&self) -> DetectionResult {
        let mut evidence: BTreeMap<String, Vec<String>> = BTreeMap::new();

        let config_languages = self.languages_from_config(&mut evidence);
        let counts = self.count_files_by_language();
        let (primary_language, confidence) = resolve_primary(&config_languages, &counts);
        let frameworks = self.detect_frameworks(primary_language, &mut evidence);
        let is_monorepo = self.detect_monorepo(&mut evidence);
        let architecture_type = self.detect_architecture(is_monorepo, &mut evidence);

        info!(
            root = %self.root.display(),
            language = %primary_language,
            %confidence,
            frameworks = frameworks.len(),
            is_monorepo,
            architecture = %architecture_type,
            "language detection complete"
        );

        DetectionResult {
            primary_language,
            frameworks,
            languages_detected: counts,
            confidence,
            evidence,
            is_monorepo,
            architecture_type,
        }
    }

    fn file_exists(&self, rel: &str) -> bool {
        self.root.join(rel).is_file()
    }

    fn dir_exists(&self, rel: &str) -> bool {
        self.root.join(rel).is_dir()
    }

    fn languages_from_config(
        &self,
        evidence: &mut BTreeMap<String, Vec<String>>,
    ) -> BTreeSet<Language> {
        let mut detected = BTreeSet::new();
        for (language, markers) in LANGUAGE_MARKERS {
            if let Some(marker) = markers.iter().find(|m| self.file_exists(m)) {
                detected.insert(*language);
                add_evidence(evidence, format!("{language}_config"), format!("Found {marker}"));
            }
        }
        // A TypeScript project is also a JavaScript project
        if detected.contains(&Language::TypeScript) {
            detected.insert(Language::JavaScript);
        }
        detected
    }

    /// Walk source files under the shared ignore rules, in a stable order.
    fn source_files(&self) -> impl Iterator<Item = (PathBuf, String)> + '_ {
        WalkDir::new(&self.root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| {
                e.depth() == 0
                    || !e.file_type().is_dir()
                    || !self.rules.is_ignored_dir(&e.file_name().to_string_lossy())
            })
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter(|e| !self.rules.is_ignored_file(&e.file_name().to_string_lossy()))
            .filter_map(|e| {
                let ext = normalized_extension(e.path())?;
                Some((e.into_path(), ext))
            })
    }

    fn count_files_by_language(&self) -> BTreeMap<Language, usize> {
        let mut counts = BTreeMap::new();
        let mut sampled = 0usize;
        for (_, ext) in self.source_files() {
            if sampled >= self.config.sample_limit {
                break;
            }
            if let Some(lang) = Language::from_extension(&ext) {
                *counts.entry(lang).or_insert(0) += 1;
                sampled += 1;
            }
        }
        debug!(sampled, "extension census complete");
        counts
    }

    fn detect_frameworks(
        &self,
        primary: Language,
        evidence: &mut BTreeMap<String, Vec<String>>,
    ) -> Vec<Framework> {
        let mut frameworks = Vec::new();

        for (spec, patterns) in FRAMEWORKS.iter().zip(&self.import_patterns) {
            let eligible = spec.language == primary
                || (primary.is_js_family() && spec.language.is_js_family());
            if !eligible {
                continue;
            }

            let markers: Vec<String> = spec
                .marker_files
                .iter()
                .filter(|m| self.file_exists(m))
                .map(|m| format!("Found {m}"))
                .collect();

            let (confidence, found) = if !markers.is_empty() {
                (Confidence::High, markers)
            } else if let Some(hit) = self.search_imports(patterns, spec.language) {
                (Confidence::Medium, vec![hit])
            } else {
                continue;
            };

            add_evidence_all(evidence, format!("framework_{}", spec.name), &found);
            frameworks.push(Framework {
                name: spec.name.to_string(),
                confidence,
                evidence: found,
            });
        }

        frameworks
    }

    /// Search a capped number of files for any of `patterns`, stopping at the first hit.
    fn search_imports(&self, patterns: &[Regex], language: Language) -> Option<String> {
        if patterns.is_empty() {
            return None;
        }
        let extensions = language.import_search_extensions();
        let candidates = self
            .source_files()
            .filter(|(_, ext)| extensions.contains(&ext.as_str()))
            .take(self.config.import_search_files);

        for (path, _) in candidates {
            let prefix = match read_prefix(&path, self.config.import_prefix_bytes) {
                Ok(p) => p,
                Err(e) => {
                    debug!(path = %path.display(), error = %e, "skipping unreadable file");
                    continue;
                }
            };
            if patterns.iter().any(|re| re.is_match(&prefix)) {
                let rel = path.strip_prefix(&self.root).unwrap_or(&path);
                return Some(format!("Import in {}", rel.display()));
            }
        }
        None
    }

    fn detect_monorepo(&self, evidence: &mut BTreeMap<String, Vec<String>>) -> bool {
        let mut found = false;
        for marker in WORKSPACE_MARKERS.iter().filter(|m| self.file_exists(m)) {
            add_evidence(evidence, "monorepo", format!("Found {marker}"));
            found = true;
        }
        for dir in MONOREPO_DIRS.iter().filter(|d| self.dir_exists(d)) {
            add_evidence(evidence, "monorepo", format!("Found {dir}/ directory"));
            found = true;
        }
        found
    }

    fn detect_architecture(
        &self,
        is_monorepo: bool,
        evidence: &mut BTreeMap<String, Vec<String>>,
    ) -> ArchitectureType {
        if let Some(dir) = KUBERNETES_DIRS.iter().find(|d| self.dir_exists(d)) {
            add_evidence(evidence, "architecture", format!("Found {dir}/ directory"));
            return ArchitectureType::Microservices;
        }
        if let Some(file) = COMPOSE_FILES.iter().find(|f| self.file_exists(f)) {
            add_evidence(evidence, "architecture", format!("Found {file}"));
            return ArchitectureType::Microservices;
        }
        if self.file_exists("Dockerfile") && is_monorepo {
            add_evidence(evidence, "architecture", "Found Dockerfile in a monorepo");
            return ArchitectureType::Microservices;
        }
        ArchitectureType::Monolith
    }
}

/// Pick the primary language from config markers and file counts.
fn resolve_primary(
    config_languages: &BTreeSet<Language>,
    counts: &BTreeMap<Language, usize>,
) -> (Language, Confidence) {
    if let Some(primary) = most_files(config_languages.iter().copied(), counts) {
        let confidence = if counts.get(&primary).copied().unwrap_or(0) > 0 {
            Confidence::High
        } else {
            Confidence::Medium
        };
        return (primary, confidence);
    }

    let counted = counts.iter().filter(|(_, n)| **n > 0).map(|(l, _)| *l);
    match most_files(counted, counts) {
        Some(primary) => (primary, Confidence::Medium),
        None => (Language::Unknown, Confidence::Low),
    }
}

/// Language with the highest count, ties broken by [`Language::KNOWN`] order.
fn most_files(
    langs: impl Iterator<Item = Language>,
    counts: &BTreeMap<Language, usize>,
) -> Option<Language> {
    let count = |lang: &Language| counts.get(lang).copied().unwrap_or(0);
    langs.min_by(|a, b| {
        count(b)
            .cmp(&count(a))
            .then(a.tie_rank().cmp(&b.tie_rank()))
    })
}

fn read_prefix(path: &Path, limit: usize) -> std::io::Result<String> {
    let file = std::fs::File::open(path)?;
    let mut buf = Vec::with_capacity(limit.min(64 * 1024));
    file.take(limit as u64).read_to_end(&mut buf)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

fn add_evidence(
    evidence: &mut BTreeMap<String, Vec<String>>,
    category: impl Into<String>,
    item: impl Into<String>,
) {
    evidence.entry(category.into()).or_default().push(item.into());
}

fn add_evidence_all(evidence: &mut BTreeMap<String, Vec<String>>, category: String, items: &[String]) {
    evidence.entry(category).or_default().extend(items.iter().cloned());
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn detect(root: &Path) -> DetectionResult {
        LanguageDetector::new(root, &DetectorConfig::default()).detect()
    }

    #[test]
    fn test_go_mod_with_source_is_high() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "go.mod", "module example.com/app\n");
        write(tmp.path(), "main.go", "package main\n");

        let result = detect(tmp.path());
        assert_eq!(result.primary_language, Language::Go);
        assert_eq!(result.confidence, Confidence::High);
        assert_eq!(result.evidence["Go_config"], vec!["Found go.mod"]);
    }

    #[test]
    fn test_go_mod_without_source_is_medium() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "go.mod", "module example.com/app\n");

        let result = detect(tmp.path());
        assert_eq!(result.primary_language, Language::Go);
        assert_eq!(result.confidence, Confidence::Medium);
    }

    #[test]
    fn test_empty_repository_is_unknown() {
        let tmp = tempfile::tempdir().unwrap();
        let result = detect(tmp.path());
        assert_eq!(result.primary_language, Language::Unknown);
        assert_eq!(result.confidence, Confidence::Low);
        assert!(result.frameworks.is_empty());
        assert_eq!(result.architecture_type, ArchitectureType::Monolith);
    }

    #[test]
    fn test_file_counts_without_markers_are_medium() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "a.py", "");
        write(tmp.path(), "b.py", "");
        write(tmp.path(), "c.java", "");

        let result = detect(tmp.path());
        assert_eq!(result.primary_language, Language::Python);
        assert_eq!(result.confidence, Confidence::Medium);
        assert_eq!(result.languages_detected[&Language::Python], 2);
        assert_eq!(result.languages_detected[&Language::Java], 1);
    }

    #[test]
    fn test_config_language_with_most_files_wins() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "package.json", "{}");
        write(tmp.path(), "tsconfig.json", "{}");
        write(tmp.path(), "src/a.ts", "");
        write(tmp.path(), "src/b.ts", "");
        write(tmp.path(), "src/c.js", "");

        let result = detect(tmp.path());
        assert_eq!(result.primary_language, Language::TypeScript);
        assert_eq!(result.confidence, Confidence::High);
    }

    #[test]
    fn test_tie_breaks_by_language_order() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "main.go", "");
        write(tmp.path(), "app.py", "");

        let result = detect(tmp.path());
        assert_eq!(result.primary_language, Language::Python);
    }

    #[test]
    fn test_ignored_directories_are_not_counted() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "app.py", "");
        for i in 0..5 {
            write(tmp.path(), &format!("node_modules/pkg/f{i}.js"), "");
        }

        let result = detect(tmp.path());
        assert_eq!(result.primary_language, Language::Python);
        assert!(!result.languages_detected.contains_key(&Language::JavaScript));
    }

    #[test]
    fn test_sample_limit_caps_census() {
        let tmp = tempfile::tempdir().unwrap();
        for i in 0..10 {
            write(tmp.path(), &format!("f{i}.py"), "");
        }
        let config = DetectorConfig {
            sample_limit: 3,
            ..DetectorConfig::default()
        };

        let result = LanguageDetector::new(tmp.path(), &config).detect();
        assert_eq!(result.languages_detected[&Language::Python], 3);
    }

    #[test]
    fn test_framework_from_import_is_medium() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "requirements.txt", "fastapi\n");
        write(tmp.path(), "app/main.py", "from fastapi import FastAPI\napp = FastAPI()\n");

        let result = detect(tmp.path());
        let fastapi = result.frameworks.iter().find(|f| f.name == "FastAPI").unwrap();
        assert_eq!(fastapi.confidence, Confidence::Medium);
        assert_eq!(fastapi.evidence.len(), 1);
        assert!(fastapi.evidence[0].starts_with("Import in app"));
        assert!(!result.has_framework("Flask"));
    }

    #[test]
    fn test_framework_marker_is_high_and_not_downgraded() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "manage.py", "from django.core import management\n");

        let result = detect(tmp.path());
        let django = result.frameworks.iter().find(|f| f.name == "Django").unwrap();
        assert_eq!(django.confidence, Confidence::High);
        assert_eq!(django.evidence, vec!["Found manage.py"]);
        assert_eq!(result.evidence["framework_Django"], vec!["Found manage.py"]);
    }

    #[test]
    fn test_typescript_framework_in_javascript_repo() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "package.json", "{}");
        write(tmp.path(), "nest-cli.json", "{}");
        write(tmp.path(), "src/app.js", "const express = require('express');\n");

        let result = detect(tmp.path());
        assert_eq!(result.primary_language, Language::JavaScript);
        assert!(result.has_framework("NestJS"));
        assert!(result.has_framework("Express"));
    }

    #[test]
    fn test_framework_of_other_language_is_skipped() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "go.mod", "module x\n");
        write(tmp.path(), "main.go", "package main\nimport \"github.com/gin-gonic/gin\"\n");
        write(tmp.path(), "tools/gen.py", "from fastapi import FastAPI\n");

        let result = detect(tmp.path());
        assert!(result.has_framework("Gin"));
        assert!(!result.has_framework("FastAPI"));
    }

    #[test]
    fn test_import_search_respects_file_budget() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "a.py", "import os\n");
        write(tmp.path(), "b.py", "import sys\n");
        write(tmp.path(), "c.py", "from flask import Flask\n");
        let config = DetectorConfig {
            import_search_files: 2,
            ..DetectorConfig::default()
        };

        let result = LanguageDetector::new(tmp.path(), &config).detect();
        assert!(!result.has_framework("Flask"));
    }

    #[test]
    fn test_import_search_respects_prefix_bytes() {
        let tmp = tempfile::tempdir().unwrap();
        let mut content = "#".repeat(200);
        content.push_str("\nfrom flask import Flask\n");
        write(tmp.path(), "app.py", &content);
        let config = DetectorConfig {
            import_prefix_bytes: 100,
            ..DetectorConfig::default()
        };

        let result = LanguageDetector::new(tmp.path(), &config).detect();
        assert!(!result.has_framework("Flask"));
    }

    #[test]
    fn test_monorepo_and_architecture() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "packages/api/index.ts", "");
        write(tmp.path(), "Dockerfile", "FROM node\n");

        let result = detect(tmp.path());
        assert!(result.is_monorepo);
        assert_eq!(result.architecture_type, ArchitectureType::Microservices);
        assert_eq!(result.evidence["monorepo"], vec!["Found packages/ directory"]);
    }

    #[test]
    fn test_compose_file_means_microservices() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "compose.yaml", "services: {}\n");

        let result = detect(tmp.path());
        assert!(!result.is_monorepo);
        assert_eq!(result.architecture_type, ArchitectureType::Microservices);
    }

    #[test]
    fn test_dockerfile_alone_is_monolith() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "Dockerfile", "FROM python\n");
        write(tmp.path(), "app.py", "");

        let result = detect(tmp.path());
        assert_eq!(result.architecture_type, ArchitectureType::Monolith);
    }

    #[test]
    fn test_language_parse_and_display() {
        assert_eq!("typescript".parse::<Language>().unwrap(), Language::TypeScript);
        assert_eq!(Language::Go.to_string(), "Go");
        assert!("cobol".parse::<Language>().is_err());
    }
}
