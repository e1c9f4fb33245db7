//! Subprocess boundary for language-native parsers.
//!
//! A parser is invoked with one absolute file path and prints a JSON document of
//! the shape `{"nodes": [...], "confidence": "HIGH"}` on stdout. Every failure on
//! that boundary is an [`ExternalParserError`] value; [`ExternalExtractor`] turns
//! those into LOW-confidence results so nothing propagates past a single file.

use std::ffi::OsString;
use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::runtime::Runtime;
use tokio::sync::{Semaphore, SemaphorePermit};
use tracing::{debug, warn};

use crate::extractor::display_path;
use crate::uas::{
    Confidence, DatabaseModelInfo, EndpointInfo, ExtractionMethod, ExtractionResult, Metadata,
    MetadataValue, NodeId, NodeKind, Parameter, ParameterSource, UasNode,
};

#[derive(Debug, Error)]
pub enum ExternalParserError {
    #[error("failed to start '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("parser timed out after {secs}s")]
    Timeout { secs: u64 },

    #[error("parser exited with status {code}: {stderr}")]
    NonZeroExit { code: i32, stderr: String },

    #[error("malformed parser output: {0}")]
    MalformedOutput(String),

    #[error("I/O error while running parser: {0}")]
    Io(#[from] io::Error),
}

/// Caps simultaneous parser subprocesses and drives them.
///
/// One current-thread runtime is shared by every extractor holding the limiter;
/// extraction threads enter it with [`ProcessLimiter::block_on`].
#[derive(Debug)]
pub struct ProcessLimiter {
    max: usize,
    permits: Semaphore,
    runtime: Runtime,
}

impl ProcessLimiter {
    pub fn new(max: usize) -> io::Result<Self> {
        let max = max.max(1);
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_io()
            .enable_time()
            .build()?;
        Ok(Self {
            max,
            permits: Semaphore::new(max),
            runtime,
        })
    }

    pub fn max(&self) -> usize {
        self.max
    }

    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    /// Wait for a free slot. The slot is released when the permit drops.
    pub async fn acquire(&self) -> Result<SemaphorePermit<'_>, ExternalParserError> {
        self.permits
            .acquire()
            .await
            .map_err(|_| ExternalParserError::Io(io::Error::other("process limiter closed")))
    }

    /// Run `future` to completion on the limiter's runtime. Safe to call from
    /// several threads at once.
    pub fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }
}

/// A located parser program plus the arguments placed before the file path.
#[derive(Debug, Clone)]
pub struct ExternalParser {
    program: PathBuf,
    args: Vec<OsString>,
    timeout: Duration,
    limiter: Arc<ProcessLimiter>,
}

impl ExternalParser {
    pub fn new(program: impl Into<PathBuf>, timeout: Duration, limiter: Arc<ProcessLimiter>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            timeout,
            limiter,
        }
    }

    /// Add a fixed argument passed before the file path (e.g. `-jar parser.jar`).
    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Run the parser on `file` and return its stdout.
    ///
    /// Waits for a limiter slot first. A run exceeding the timeout is killed and
    /// reported as [`ExternalParserError::Timeout`]; it is not retried.
    pub fn run(&self, file: &Path) -> Result<String, ExternalParserError> {
        let file = std::path::absolute(file)?;
        self.limiter.block_on(self.run_async(&file))
    }

    async fn run_async(&self, file: &Path) -> Result<String, ExternalParserError> {
        let _permit = self.limiter.acquire().await?;

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .arg(file)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ExternalParserError::Spawn {
                program: self.program.display().to_string(),
                source,
            })?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let finished = tokio::time::timeout(self.timeout, async {
            tokio::try_join!(child.wait(), read_pipe(stdout), read_pipe(stderr))
        })
        .await;

        let (status, stdout, stderr): (ExitStatus, Vec<u8>, Vec<u8>) = match finished {
            Ok(outcome) => outcome?,
            Err(_) => {
                if let Err(e) = child.kill().await {
                    warn!(program = %self.program.display(), error = %e, "failed to kill timed-out parser");
                }
                return Err(ExternalParserError::Timeout {
                    secs: self.timeout.as_secs(),
                });
            }
        };

        if !status.success() {
            return Err(ExternalParserError::NonZeroExit {
                code: status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&stderr).trim().to_string(),
            });
        }

        String::from_utf8(stdout)
            .map_err(|e| ExternalParserError::MalformedOutput(format!("stdout is not UTF-8: {e}")))
    }
}

async fn read_pipe<R: AsyncRead + Unpin>(pipe: Option<R>) -> io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    if let Some(mut pipe) = pipe {
        pipe.read_to_end(&mut buf).await?;
    }
    Ok(buf)
}

#[derive(Debug, Deserialize)]
struct RawOutput {
    #[serde(default)]
    nodes: Vec<serde_json::Value>,
    #[serde(default = "default_raw_confidence")]
    confidence: Confidence,
}

fn default_raw_confidence() -> Confidence {
    Confidence::High
}

#[derive(Debug, Deserialize)]
struct RawParameter {
    name: String,
    #[serde(rename = "type", default)]
    type_name: String,
    #[serde(default)]
    source: Option<String>,
    #[serde(default)]
    required: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct RawEndpoint {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    name: String,
    #[serde(default)]
    line_number: usize,
    method: String,
    path: String,
    #[serde(default)]
    parameters: Vec<RawParameter>,
    #[serde(default)]
    response_type: Option<String>,
    #[serde(default)]
    metadata: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    confidence: Option<Confidence>,
}

#[derive(Debug, Deserialize)]
struct RawDatabaseModel {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    name: String,
    #[serde(default)]
    line_number: usize,
    table_name: String,
    #[serde(default)]
    columns: Vec<String>,
    #[serde(default)]
    indexes: Vec<String>,
    #[serde(default)]
    relationships: Vec<String>,
    #[serde(default)]
    metadata: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    confidence: Option<Confidence>,
}

fn convert_metadata(
    raw: serde_json::Map<String, serde_json::Value>,
    parser_id: Option<String>,
) -> Metadata {
    let mut metadata: Metadata = raw
        .into_iter()
        .map(|(k, v)| (k, MetadataValue::from(v)))
        .collect();
    if let Some(id) = parser_id.filter(|id| !id.is_empty()) {
        metadata.insert("parser_id".to_string(), MetadataValue::Text(id));
    }
    metadata
}

/// Map a parser's JSON document onto UAS nodes for `file`.
///
/// Node ids are re-derived from the file path and the node's position in the
/// document, so they stay unique even when a parser reuses ids or reports the same
/// route twice; the parser's own id is kept as `metadata.parser_id`.
/// Unknown node types are skipped with a warning on the result.
pub fn parse_parser_output(stdout: &str, file: &Path) -> Result<ExtractionResult, ExternalParserError> {
    let raw: RawOutput = serde_json::from_str(stdout.trim())
        .map_err(|e| ExternalParserError::MalformedOutput(e.to_string()))?;

    let file_path = display_path(file);
    let mut result = ExtractionResult::empty(raw.confidence);

    for (index, value) in raw.nodes.into_iter().enumerate() {
        let node_type = value
            .get("type")
            .and_then(|t| t.as_str())
            .unwrap_or_default()
            .to_string();

        let node = match node_type.as_str() {
            "Endpoint" => {
                let ep: RawEndpoint = serde_json::from_value(value).map_err(|e| {
                    ExternalParserError::MalformedOutput(format!("node {index}: {e}"))
                })?;
                let method = ep.method.to_uppercase();
                let symbol = format!("endpoint:{}:{}:{}:{index}", ep.name, method, ep.path);
                let parameters = ep
                    .parameters
                    .into_iter()
                    .map(|p| Parameter {
                        source: p
                            .source
                            .as_deref()
                            .and_then(|s| s.parse::<ParameterSource>().ok())
                            .unwrap_or_default(),
                        required: p.required.unwrap_or(true),
                        ..Parameter::new(p.name, p.type_name, ParameterSource::Query)
                    })
                    .collect();
                UasNode {
                    id: NodeId::fingerprint(&file_path, &symbol, ep.line_number),
                    name: ep.name,
                    file_path: file_path.clone(),
                    line_number: ep.line_number,
                    metadata: convert_metadata(ep.metadata, ep.id),
                    confidence: ep.confidence.unwrap_or(raw.confidence),
                    extraction_method: ExtractionMethod::ExternalParser,
                    kind: NodeKind::Endpoint(EndpointInfo {
                        method,
                        path: ep.path,
                        parameters,
                        response_type: ep.response_type,
                    }),
                }
            }
            "DatabaseModel" => {
                let model: RawDatabaseModel = serde_json::from_value(value).map_err(|e| {
                    ExternalParserError::MalformedOutput(format!("node {index}: {e}"))
                })?;
                let symbol = format!("model:{}:{}:{index}", model.name, model.table_name);
                UasNode {
                    id: NodeId::fingerprint(&file_path, &symbol, model.line_number),
                    name: model.name,
                    file_path: file_path.clone(),
                    line_number: model.line_number,
                    metadata: convert_metadata(model.metadata, model.id),
                    confidence: model.confidence.unwrap_or(raw.confidence),
                    extraction_method: ExtractionMethod::ExternalParser,
                    kind: NodeKind::DatabaseModel(DatabaseModelInfo {
                        table_name: model.table_name,
                        columns: model.columns,
                        indexes: model.indexes,
                        relationships: model.relationships,
                    }),
                }
            }
            other => {
                let message = format!("ignoring parser node {index} with unknown type '{other}'");
                warn!(file = %file_path, "{message}");
                result.warnings.push(message);
                continue;
            }
        };
        result.nodes.push(node);
    }

    Ok(result)
}

/// First candidate that exists as a regular file.
pub fn find_parser_artifact(candidates: impl IntoIterator<Item = PathBuf>) -> Option<PathBuf> {
    candidates.into_iter().find(|p| p.is_file())
}

/// Where a parser is looked for besides its configured path.
#[derive(Debug, Clone, Default)]
pub struct ParserSearch {
    /// Value of the language's override variable.
    pub env_value: Option<PathBuf>,
    /// Directory vendor paths are resolved against.
    pub base_dir: PathBuf,
    /// Program search path. `None` turns the `PATH` lookup off.
    pub path_var: Option<OsString>,
}

impl ParserSearch {
    /// Search driven by the process: `env_var`, the working directory and `PATH`.
    pub fn from_process(env_var: &str) -> Self {
        Self {
            env_value: std::env::var_os(env_var).map(PathBuf::from),
            base_dir: std::env::current_dir().unwrap_or_default(),
            path_var: std::env::var_os("PATH"),
        }
    }

    /// Search confined to `base_dir`, with no environment override and no `PATH`.
    pub fn isolated(base_dir: &Path) -> Self {
        Self {
            env_value: None,
            base_dir: base_dir.to_path_buf(),
            path_var: None,
        }
    }

    pub fn with_env_value(mut self, value: impl Into<PathBuf>) -> Self {
        self.env_value = Some(value.into());
        self
    }

    /// Configured path, then the environment override, then `vendor_paths`.
    pub fn find_artifact(&self, configured: Option<&Path>, vendor_paths: &[&str]) -> Option<PathBuf> {
        let candidates = configured
            .map(|p| self.base_dir.join(p))
            .into_iter()
            .chain(
                self.env_value
                    .clone()
                    .filter(|p| !p.as_os_str().is_empty()),
            )
            .chain(vendor_paths.iter().map(|p| self.base_dir.join(p)));
        find_parser_artifact(candidates)
    }

    /// Resolve a program name on the search path. Names containing a path
    /// separator are taken relative to `base_dir` even without a search path.
    pub fn find_program(&self, name: &str) -> Option<PathBuf> {
        match &self.path_var {
            Some(paths) => which::which_in(name, Some(paths), &self.base_dir).ok(),
            None => {
                let has_separator = Path::new(name).components().count() > 1;
                let candidate = self.base_dir.join(name);
                (has_separator && candidate.is_file()).then_some(candidate)
            }
        }
    }
}

/// Extractor state shared by the subprocess-backed languages.
///
/// Availability is decided once at construction: without a parser every call
/// returns an empty LOW result with a warning and no process is started.
#[derive(Debug, Clone)]
pub struct ExternalExtractor {
    language: &'static str,
    parser: Option<ExternalParser>,
    unavailable_reason: String,
}

impl ExternalExtractor {
    pub fn available(language: &'static str, parser: ExternalParser) -> Self {
        Self {
            language,
            parser: Some(parser),
            unavailable_reason: String::new(),
        }
    }

    pub fn unavailable(language: &'static str, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        warn!(language, %reason, "external parser unavailable, extraction disabled");
        Self {
            language,
            parser: None,
            unavailable_reason: reason,
        }
    }

    pub fn is_available(&self) -> bool {
        self.parser.is_some()
    }

    pub fn parser(&self) -> Option<&ExternalParser> {
        self.parser.as_ref()
    }

    pub fn extract(&self, path: &Path) -> ExtractionResult {
        let Some(parser) = &self.parser else {
            return ExtractionResult::degraded(format!(
                "{} parser unavailable: {}",
                self.language, self.unavailable_reason
            ));
        };

        debug!(language = self.language, path = %path.display(), "invoking external parser");
        let outcome = parser
            .run(path)
            .and_then(|stdout| parse_parser_output(&stdout, path));

        match outcome {
            Ok(result) => result,
            Err(e) => {
                warn!(language = self.language, path = %path.display(), error = %e, "external extraction failed");
                ExtractionResult::failed(format!(
                    "{} parser failed for {}: {e}",
                    self.language,
                    path.display()
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    const GO_OUTPUT: &str = r#"{
        "nodes": [
            {
                "type": "Endpoint",
                "id": "go-ep-1",
                "name": "GetUser",
                "file_path": "/repo/main.go",
                "line_number": 12,
                "method": "get",
                "path": "/users/:id",
                "parameters": [{"name": "id", "type": "string", "source": "path"}],
                "metadata": {"framework": "gin", "middleware": ["auth"]}
            },
            {
                "type": "DatabaseModel",
                "id": "go-model-1",
                "name": "User",
                "file_path": "/repo/main.go",
                "line_number": 3,
                "table_name": "users",
                "columns": ["ID:uint", "Email:string"],
                "metadata": {"orm": "gorm"}
            },
            {"type": "Middleware", "name": "auth"}
        ],
        "confidence": "HIGH"
    }"#;

    #[test]
    fn test_parse_parser_output_maps_nodes() {
        let result = parse_parser_output(GO_OUTPUT, Path::new("/repo/main.go")).unwrap();

        assert_eq!(result.confidence, Confidence::High);
        assert_eq!(result.nodes.len(), 2);
        assert_eq!(result.warnings.len(), 1);
        assert!(result.warnings[0].contains("Middleware"));

        let endpoint = result.nodes[0].as_endpoint().unwrap();
        assert_eq!(endpoint.method, "GET");
        assert_eq!(endpoint.path, "/users/:id");
        assert_eq!(endpoint.parameters[0].source, ParameterSource::Path);
        assert_eq!(endpoint.parameters[0].type_name, "string");
        assert_eq!(
            result.nodes[0].metadata["parser_id"],
            MetadataValue::Text("go-ep-1".to_string())
        );
        assert_eq!(
            result.nodes[0].metadata["middleware"],
            MetadataValue::Text(r#"["auth"]"#.to_string())
        );
        assert_eq!(result.nodes[0].extraction_method, ExtractionMethod::ExternalParser);

        let model = result.nodes[1].as_database_model().unwrap();
        assert_eq!(model.table_name, "users");
        assert_eq!(model.columns, vec!["ID:uint", "Email:string"]);
    }

    #[test]
    fn test_parse_parser_output_ids_are_deterministic() {
        let a = parse_parser_output(GO_OUTPUT, Path::new("/repo/main.go")).unwrap();
        let b = parse_parser_output(GO_OUTPUT, Path::new("/repo/main.go")).unwrap();
        let c = parse_parser_output(GO_OUTPUT, Path::new("/repo/other.go")).unwrap();

        assert_eq!(a.nodes[0].id, b.nodes[0].id);
        assert_ne!(a.nodes[0].id, c.nodes[0].id);
        assert_ne!(a.nodes[0].id.as_str(), "go-ep-1");
    }

    #[test]
    fn test_parse_parser_output_repeated_routes_get_distinct_ids() {
        let route = r#"{"type": "Endpoint", "name": "Health", "line_number": 7, "method": "GET", "path": "/health"}"#;
        let output = format!(r#"{{"nodes": [{route}, {route}], "confidence": "HIGH"}}"#);
        let result = parse_parser_output(&output, Path::new("/repo/main.go")).unwrap();

        assert_eq!(result.nodes.len(), 2);
        assert_ne!(result.nodes[0].id, result.nodes[1].id);
    }

    #[test]
    fn test_parse_parser_output_rejects_malformed_json() {
        let err = parse_parser_output("{not json", Path::new("/repo/main.go")).unwrap_err();
        assert!(matches!(err, ExternalParserError::MalformedOutput(_)));

        let err = parse_parser_output(
            r#"{"nodes": [{"type": "Endpoint", "name": "x"}]}"#,
            Path::new("/repo/main.go"),
        )
        .unwrap_err();
        assert!(matches!(err, ExternalParserError::MalformedOutput(_)));
    }

    #[test]
    fn test_unavailable_extractor_degrades() {
        let extractor = ExternalExtractor::unavailable("go", "go-extractor not found");
        let result = extractor.extract(Path::new("/repo/main.go"));

        assert!(!extractor.is_available());
        assert!(result.is_empty());
        assert_eq!(result.confidence, Confidence::Low);
        assert!(result.errors.is_empty());
        assert_eq!(result.warnings.len(), 1);
        assert!(result.warnings[0].contains("go-extractor not found"));
    }

    fn limiter(max: usize) -> Arc<ProcessLimiter> {
        Arc::new(ProcessLimiter::new(max).unwrap())
    }

    #[test]
    fn test_limiter_waits_for_released_permit() {
        let limiter = limiter(1);
        limiter.block_on(async {
            let permit = limiter.acquire().await.unwrap();
            assert_eq!(limiter.available(), 0);
            let blocked =
                tokio::time::timeout(Duration::from_millis(50), limiter.acquire()).await;
            assert!(blocked.is_err(), "second acquire should wait");

            drop(permit);
            assert!(limiter.acquire().await.is_ok());
        });
        assert_eq!(limiter.available(), 1);
    }

    #[test]
    fn test_limiter_has_at_least_one_slot() {
        assert_eq!(limiter(0).max(), 1);
    }

    #[test]
    fn test_limiter_is_shared_across_threads() {
        let limiter = limiter(2);
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let limiter = Arc::clone(&limiter);
                std::thread::spawn(move || {
                    limiter.block_on(async {
                        let _permit = limiter.acquire().await.unwrap();
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    })
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(limiter.available(), 2);
    }

    #[test]
    fn test_spawn_failure_becomes_error_result() {
        let parser = ExternalParser::new(
            "/nonexistent/eonix-parser",
            Duration::from_secs(1),
            limiter(1),
        );
        let extractor = ExternalExtractor::available("go", parser);
        let result = extractor.extract(Path::new("/repo/main.go"));

        assert!(result.is_empty());
        assert_eq!(result.confidence, Confidence::Low);
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].contains("failed to start"));
    }

    #[cfg(unix)]
    mod unix {
        use super::*;
        use std::os::unix::fs::PermissionsExt;

        fn script(dir: &Path, name: &str, body: &str) -> PathBuf {
            let path = dir.join(name);
            std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
            path
        }

        fn parser(program: PathBuf, timeout: Duration) -> ExternalParser {
            ExternalParser::new(program, timeout, limiter(2))
        }

        #[test]
        fn test_find_parser_artifact_skips_missing() {
            let dir = tempfile::tempdir().unwrap();
            let present = script(dir.path(), "go-extractor", "true");
            let found = find_parser_artifact([dir.path().join("missing"), present.clone()]);
            assert_eq!(found, Some(present));
            assert_eq!(find_parser_artifact([dir.path().join("missing")]), None);
        }

        #[test]
        fn test_search_order_config_env_vendor() {
            let dir = tempfile::tempdir().unwrap();
            let configured = script(dir.path(), "configured", "true");
            let from_env = script(dir.path(), "from-env", "true");
            std::fs::create_dir_all(dir.path().join("vendor")).unwrap();
            let vendored = script(&dir.path().join("vendor"), "parser", "true");
            let vendor_paths = &["vendor/parser"];

            let search = ParserSearch::isolated(dir.path());
            assert_eq!(search.find_artifact(None, vendor_paths), Some(vendored));

            let search = search.with_env_value(&from_env);
            assert_eq!(search.find_artifact(None, vendor_paths), Some(from_env));
            assert_eq!(
                search.find_artifact(Some(Path::new("configured")), vendor_paths),
                Some(configured)
            );
        }

        #[test]
        fn test_isolated_search_skips_path_lookup() {
            let dir = tempfile::tempdir().unwrap();
            let bin = dir.path().join("bin");
            std::fs::create_dir_all(&bin).unwrap();
            let program = script(&bin, "go-extractor", "true");

            let isolated = ParserSearch::isolated(dir.path());
            assert_eq!(isolated.find_program("go-extractor"), None);
            assert_eq!(isolated.find_program("bin/go-extractor"), Some(program.clone()));

            let on_path = ParserSearch {
                path_var: Some(bin.clone().into_os_string()),
                ..ParserSearch::isolated(dir.path())
            };
            assert_eq!(on_path.find_program("go-extractor"), Some(program));
        }

        #[test]
        fn test_run_returns_stdout_and_passes_path() {
            let dir = tempfile::tempdir().unwrap();
            let program = script(dir.path(), "echo-path", r#"echo "$1""#);

            let out = parser(program, Duration::from_secs(5))
                .run(Path::new("/repo/main.go"))
                .unwrap();
            assert_eq!(out.trim(), "/repo/main.go");
        }

        #[test]
        fn test_run_passes_prefix_args_before_path() {
            let dir = tempfile::tempdir().unwrap();
            let program = script(dir.path(), "echo-args", r#"echo "$1 $2 $3""#);

            let out = parser(program, Duration::from_secs(5))
                .arg("-jar")
                .arg("parser.jar")
                .run(Path::new("/repo/A.java"))
                .unwrap();
            assert_eq!(out.trim(), "-jar parser.jar /repo/A.java");
        }

        #[test]
        fn test_run_reports_non_zero_exit() {
            let dir = tempfile::tempdir().unwrap();
            let program = script(dir.path(), "fail", "echo 'syntax error' >&2\nexit 3");

            let err = parser(program, Duration::from_secs(5))
                .run(Path::new("/repo/main.go"))
                .unwrap_err();
            match err {
                ExternalParserError::NonZeroExit { code, stderr } => {
                    assert_eq!(code, 3);
                    assert_eq!(stderr, "syntax error");
                }
                other => panic!("unexpected error: {other}"),
            }
        }

        #[test]
        fn test_run_times_out() {
            let dir = tempfile::tempdir().unwrap();
            let program = script(dir.path(), "hang", "exec sleep 5");

            let started = Instant::now();
            let err = parser(program, Duration::from_millis(200))
                .run(Path::new("/repo/main.go"))
                .unwrap_err();
            assert!(matches!(err, ExternalParserError::Timeout { .. }));
            assert!(started.elapsed() < Duration::from_secs(4));
        }

        #[test]
        fn test_timeout_with_background_child_frees_slot() {
            let dir = tempfile::tempdir().unwrap();
            // The background sleep inherits stdout and outlives the killed shell.
            let program = script(dir.path(), "fork", "sleep 5 &\nsleep 5");
            let limiter = limiter(1);
            let parser = ExternalParser::new(program, Duration::from_millis(200), limiter.clone());

            let started = Instant::now();
            let err = parser.run(Path::new("/repo/main.go")).unwrap_err();
            assert!(matches!(err, ExternalParserError::Timeout { .. }));
            assert!(started.elapsed() < Duration::from_secs(4));
            assert_eq!(limiter.available(), 1);
        }

        #[test]
        fn test_extract_end_to_end() {
            let dir = tempfile::tempdir().unwrap();
            let body = format!("cat <<'EOF'\n{GO_OUTPUT}\nEOF");
            let program = script(dir.path(), "go-extractor", &body);
            let extractor =
                ExternalExtractor::available("go", parser(program, Duration::from_secs(5)));

            let result = extractor.extract(Path::new("/repo/main.go"));
            assert!(result.errors.is_empty());
            assert_eq!(result.nodes.len(), 2);
            assert_eq!(result.confidence, Confidence::High);
        }

        #[test]
        fn test_extract_malformed_output_is_low() {
            let dir = tempfile::tempdir().unwrap();
            let program = script(dir.path(), "garbage", "echo 'panic: runtime error'");
            let extractor =
                ExternalExtractor::available("go", parser(program, Duration::from_secs(5)));

            let result = extractor.extract(Path::new("/repo/main.go"));
            assert!(result.is_empty());
            assert_eq!(result.confidence, Confidence::Low);
            assert!(result.errors[0].contains("malformed parser output"));
        }
    }
}
