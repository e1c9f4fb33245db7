//! Universal Architecture Schema: the node/edge vocabulary every extractor emits into.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;

/// How much an extracted fact can be trusted.
/// Ordered from weakest (Low) to strongest (High).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Confidence {
    /// Regex fallback, tool failure or parse failure
    Low,
    /// Combined heuristic signals
    Medium,
    /// Full grammar parse
    High,
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Confidence::Low => write!(f, "LOW"),
            Confidence::Medium => write!(f, "MEDIUM"),
            Confidence::High => write!(f, "HIGH"),
        }
    }
}

impl std::str::FromStr for Confidence {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "HIGH" => Ok(Confidence::High),
            "MEDIUM" => Ok(Confidence::Medium),
            "LOW" => Ok(Confidence::Low),
            _ => Err(anyhow::anyhow!("unknown confidence level: {s}")),
        }
    }
}

/// Technique that produced a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExtractionMethod {
    Ast,
    TreeSitter,
    Regex,
    ExternalParser,
}

/// Deterministic node identifier.
#[derive(Debug, Clone, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub String);

impl NodeId {
    /// Fingerprint of the defining file, symbol and line.
    ///
    /// The same triple always yields the same id, so re-extracting unchanged
    /// content is idempotent. Symbols are kind-prefixed (`endpoint:`, `model:`...)
    /// and include a column where one line can define several facts.
    pub fn fingerprint(file_path: &str, symbol: &str, line: usize) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(file_path.as_bytes());
        hasher.update([0u8]);
        hasher.update(symbol.as_bytes());
        hasher.update([0u8]);
        hasher.update(line.to_string().as_bytes());
        let digest = hasher.finalize();
        let hex: String = digest[..16].iter().map(|b| format!("{b:02x}")).collect();
        Self(hex)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Scalar value stored in a node's open metadata map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl From<&str> for MetadataValue {
    fn from(s: &str) -> Self {
        MetadataValue::Text(s.to_string())
    }
}

impl From<String> for MetadataValue {
    fn from(s: String) -> Self {
        MetadataValue::Text(s)
    }
}

impl From<bool> for MetadataValue {
    fn from(b: bool) -> Self {
        MetadataValue::Bool(b)
    }
}

impl From<i64> for MetadataValue {
    fn from(n: i64) -> Self {
        MetadataValue::Int(n)
    }
}

impl From<serde_json::Value> for MetadataValue {
    /// Scalars map directly; arrays and objects are kept as compact JSON text.
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Bool(b) => MetadataValue::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => MetadataValue::Int(i),
                None => MetadataValue::Float(n.as_f64().unwrap_or_default()),
            },
            serde_json::Value::String(s) => MetadataValue::Text(s),
            serde_json::Value::Null => MetadataValue::Text(String::new()),
            other => MetadataValue::Text(other.to_string()),
        }
    }
}

impl fmt::Display for MetadataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetadataValue::Bool(b) => write!(f, "{b}"),
            MetadataValue::Int(n) => write!(f, "{n}"),
            MetadataValue::Float(n) => write!(f, "{n}"),
            MetadataValue::Text(s) => write!(f, "{s}"),
        }
    }
}

/// Open, string-keyed metadata. Sorted so serialized output is stable.
pub type Metadata = BTreeMap<String, MetadataValue>;

/// Where an endpoint parameter is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterSource {
    Path,
    #[default]
    Query,
    Body,
    Header,
}

impl fmt::Display for ParameterSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterSource::Path => write!(f, "path"),
            ParameterSource::Query => write!(f, "query"),
            ParameterSource::Body => write!(f, "body"),
            ParameterSource::Header => write!(f, "header"),
        }
    }
}

impl std::str::FromStr for ParameterSource {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "path" => Ok(ParameterSource::Path),
            "query" => Ok(ParameterSource::Query),
            "body" => Ok(ParameterSource::Body),
            "header" | "headers" => Ok(ParameterSource::Header),
            _ => Err(anyhow::anyhow!("unknown parameter source: {s}")),
        }
    }
}

/// Endpoint parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    pub source: ParameterSource,
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

impl Parameter {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>, source: ParameterSource) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            source,
            required: true,
            default: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceInfo {
    pub language: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub framework: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointInfo {
    pub method: String,
    pub path: String,
    #[serde(default)]
    pub parameters: Vec<Parameter>,
    #[serde(default)]
    pub response_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseModelInfo {
    pub table_name: String,
    #[serde(default)]
    pub columns: Vec<String>,
    #[serde(default)]
    pub indexes: Vec<String>,
    #[serde(default)]
    pub relationships: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheInfo {
    pub technology: String,
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
    /// Default TTL in seconds
    #[serde(default)]
    pub ttl: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_pattern: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventInfo {
    pub technology: String,
    pub topic_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partition_key: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalApiInfo {
    pub provider: String,
    pub base_url: String,
    #[serde(default)]
    pub endpoints_called: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigInfo {
    pub env_var: String,
    #[serde(default)]
    pub sensitive: bool,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
}

/// Variant-specific payload of a node. Serialized as the node's `type` tag
/// plus the variant fields, flattened into the node object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum NodeKind {
    Service(ServiceInfo),
    Endpoint(EndpointInfo),
    DatabaseModel(DatabaseModelInfo),
    Cache(CacheInfo),
    Event(EventInfo),
    #[serde(rename = "ExternalAPI")]
    ExternalApi(ExternalApiInfo),
    Config(ConfigInfo),
}

impl NodeKind {
    /// The `type` tag as it appears in serialized output.
    pub fn type_name(&self) -> &'static str {
        match self {
            NodeKind::Service(_) => "Service",
            NodeKind::Endpoint(_) => "Endpoint",
            NodeKind::DatabaseModel(_) => "DatabaseModel",
            NodeKind::Cache(_) => "Cache",
            NodeKind::Event(_) => "Event",
            NodeKind::ExternalApi(_) => "ExternalAPI",
            NodeKind::Config(_) => "Config",
        }
    }
}

/// One extracted architectural fact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UasNode {
    pub id: NodeId,
    pub name: String,
    pub file_path: String,
    pub line_number: usize,
    #[serde(default)]
    pub metadata: Metadata,
    pub confidence: Confidence,
    pub extraction_method: ExtractionMethod,
    #[serde(flatten)]
    pub kind: NodeKind,
}

impl UasNode {
    pub fn type_name(&self) -> &'static str {
        self.kind.type_name()
    }

    pub fn as_endpoint(&self) -> Option<&EndpointInfo> {
        match &self.kind {
            NodeKind::Endpoint(info) => Some(info),
            _ => None,
        }
    }

    pub fn as_database_model(&self) -> Option<&DatabaseModelInfo> {
        match &self.kind {
            NodeKind::DatabaseModel(info) => Some(info),
            _ => None,
        }
    }

    pub fn as_cache(&self) -> Option<&CacheInfo> {
        match &self.kind {
            NodeKind::Cache(info) => Some(info),
            _ => None,
        }
    }

    pub fn as_external_api(&self) -> Option<&ExternalApiInfo> {
        match &self.kind {
            NodeKind::ExternalApi(info) => Some(info),
            _ => None,
        }
    }

    pub fn as_event(&self) -> Option<&EventInfo> {
        match &self.kind {
            NodeKind::Event(info) => Some(info),
            _ => None,
        }
    }

    pub fn as_config(&self) -> Option<&ConfigInfo> {
        match &self.kind {
            NodeKind::Config(info) => Some(info),
            _ => None,
        }
    }
}

/// Access pattern of an ownership edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccessPattern {
    Read,
    Write,
    #[default]
    ReadWrite,
}

/// Kind of relationship between two nodes, serialized as the edge `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum EdgeKind {
    #[serde(rename = "CALLS")]
    ServiceCall {
        protocol: String,
        #[serde(default)]
        method: Option<String>,
    },
    #[serde(rename = "OWNS")]
    Ownership {
        #[serde(default)]
        access_pattern: AccessPattern,
    },
    #[serde(rename = "CACHES")]
    Cache {
        #[serde(default)]
        operations: Vec<String>,
    },
    #[serde(rename = "EMITS")]
    EventEmit,
    #[serde(rename = "CONSUMES")]
    EventConsume,
    #[serde(rename = "CALLS_EXTERNAL")]
    ExternalCall,
    #[serde(rename = "DEPENDS_ON")]
    DependsOn,
    #[serde(rename = "EXPOSES")]
    Exposes,
}

impl EdgeKind {
    pub fn type_name(&self) -> &'static str {
        match self {
            EdgeKind::ServiceCall { .. } => "CALLS",
            EdgeKind::Ownership { .. } => "OWNS",
            EdgeKind::Cache { .. } => "CACHES",
            EdgeKind::EventEmit => "EMITS",
            EdgeKind::EventConsume => "CONSUMES",
            EdgeKind::ExternalCall => "CALLS_EXTERNAL",
            EdgeKind::DependsOn => "DEPENDS_ON",
            EdgeKind::Exposes => "EXPOSES",
        }
    }
}

/// A directed relationship between a source (node id or service identifier) and a target node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DependencyEdge {
    pub source_id: String,
    pub target_id: String,
    #[serde(flatten)]
    pub kind: EdgeKind,
    #[serde(default)]
    pub metadata: Metadata,
}

/// Facts extracted from one file, or the concatenation of many files' results.
///
/// A result with errors is still a valid value: one file failing never aborts a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub nodes: Vec<UasNode>,
    pub edges: Vec<DependencyEdge>,
    pub confidence: Confidence,
    #[serde(default)]
    pub errors: Vec<String>,
    #[serde(default)]
    pub warnings: Vec<String>,
}

impl Default for ExtractionResult {
    fn default() -> Self {
        Self::empty(Confidence::Low)
    }
}

impl ExtractionResult {
    pub fn empty(confidence: Confidence) -> Self {
        Self {
            nodes: Vec::new(),
            edges: Vec::new(),
            confidence,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Empty LOW-confidence result carrying one error.
    pub fn failed(error: impl Into<String>) -> Self {
        let mut result = Self::empty(Confidence::Low);
        result.errors.push(error.into());
        result
    }

    /// Empty LOW-confidence result carrying one warning.
    pub fn degraded(warning: impl Into<String>) -> Self {
        let mut result = Self::empty(Confidence::Low);
        result.warnings.push(warning.into());
        result
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Concatenate per-file results. No deduplication is performed.
    ///
    /// The aggregate confidence is the lowest confidence among results that
    /// contributed at least one node, or LOW when nothing was extracted.
    pub fn concat<I>(results: I) -> Self
    where
        I: IntoIterator<Item = ExtractionResult>,
    {
        let mut merged = Self::empty(Confidence::High);
        let mut contributed = false;

        for result in results {
            if !result.nodes.is_empty() {
                contributed = true;
                merged.confidence = merged.confidence.min(result.confidence);
            }
            merged.nodes.extend(result.nodes);
            merged.edges.extend(result.edges);
            merged.errors.extend(result.errors);
            merged.warnings.extend(result.warnings);
        }

        if !contributed {
            merged.confidence = Confidence::Low;
        }
        merged
    }
}
