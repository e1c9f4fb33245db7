//! Caches, outbound HTTP calls and environment reads found in call expressions.

use std::collections::HashSet;

use tree_sitter::Node;

use eonix_core::extractor::is_sensitive_env_var;
use eonix_core::remote::{host_and_port, RemoteTarget};
use eonix_core::uas::{
    CacheInfo, ConfigInfo, DependencyEdge, EdgeKind, ExternalApiInfo, Metadata, NodeKind, UasNode,
};

use crate::syntax::*;
use crate::FileContext;

const REDIS_CLIENTS: &[&str] = &["Redis", "StrictRedis", "RedisCluster"];
const REDIS_MODULES: &[&str] = &["redis", "aioredis", "Redis", "StrictRedis"];

const HTTP_LIBRARIES: &[&str] = &["httpx", "requests"];
const HTTP_VERBS: &[&str] = &["get", "post", "put", "delete", "patch", "head", "options"];

const KNOWN_PROVIDERS: &[(&str, &str)] = &[
    ("stripe.com", "Stripe"),
    ("sendgrid.com", "SendGrid"),
    ("twilio.com", "Twilio"),
    ("github.com", "GitHub"),
    ("googleapis.com", "Google"),
    ("slack.com", "Slack"),
    ("openai.com", "OpenAI"),
    ("amazonaws.com", "AWS"),
];

#[derive(Default)]
pub(crate) struct Resources {
    pub nodes: Vec<UasNode>,
    pub edges: Vec<DependencyEdge>,
}

pub(crate) fn extract_resources(root: Node, ctx: &FileContext) -> Resources {
    let mut found = Resources::default();
    let mut seen_env = HashSet::new();

    walk_tree(root, |node| match node.kind() {
        "call" => {
            if let Some(cache) = cache_client(node, ctx) {
                found.nodes.push(cache);
            } else if let Some((api, edge)) = external_call(node, ctx) {
                found.nodes.push(api);
                found.edges.push(edge);
            } else if let Some(config) = env_read_call(node, ctx, &mut seen_env) {
                found.nodes.push(config);
            }
        }
        "subscript" => {
            if let Some(config) = env_subscript(node, ctx, &mut seen_env) {
                found.nodes.push(config);
            }
        }
        _ => {}
    });

    found
}

/// `redis.Redis(host=..., port=...)` or `redis.from_url("redis://host:port")`.
fn cache_client(call: Node, ctx: &FileContext) -> Option<UasNode> {
    let source = ctx.source;
    let callee = callee_name(call, source)?;

    let (host, port, client) = if REDIS_CLIENTS.contains(&callee) {
        let host = keyword_arg(call, "host", source).and_then(|v| string_value(v, source));
        let port = keyword_arg(call, "port", source)
            .filter(|v| v.kind() == "integer")
            .and_then(|v| node_text(v, source).parse().ok());
        (host, port, callee)
    } else if callee == "from_url" {
        let (object, _) = method_call(call, source)?;
        let module = type_name(object, source);
        if !REDIS_MODULES.contains(&module.as_str()) {
            return None;
        }
        let url = positional_args(call)
            .first()
            .and_then(|a| string_value(*a, source));
        let (host, port) = url.as_deref().map(host_and_port).unwrap_or((None, None));
        (host, port, "from_url")
    } else {
        return None;
    };

    let mut metadata = Metadata::new();
    metadata.insert("client".to_string(), client.into());
    if let Some(var) = assigned_name(call, source) {
        metadata.insert("variable".to_string(), var.into());
    }

    Some(ctx.node(
        &position_symbol("cache", "Redis", call),
        "Redis".to_string(),
        line_of(call),
        metadata,
        NodeKind::Cache(CacheInfo {
            technology: "Redis".to_string(),
            host,
            port,
            ttl: None,
            key_pattern: None,
        }),
    ))
}

/// Name bound by `name = <call>` when the call is the right-hand side.
fn assigned_name<'s>(call: Node, source: &'s str) -> Option<&'s str> {
    let parent = call.parent()?;
    if parent.kind() != "assignment" {
        return None;
    }
    let left = parent.child_by_field_name("left")?;
    (left.kind() == "identifier").then(|| node_text(left, source))
}

/// `httpx.<verb>("http...")` or `requests.<verb>("http...")` inside a function.
fn external_call(call: Node, ctx: &FileContext) -> Option<(UasNode, DependencyEdge)> {
    let source = ctx.source;
    let (object, verb) = method_call(call, source)?;
    if object.kind() != "identifier" {
        return None;
    }
    let library = node_text(object, source);
    let verb = verb.to_lowercase();
    if !HTTP_LIBRARIES.contains(&library) || !HTTP_VERBS.contains(&verb.as_str()) {
        return None;
    }
    let function = enclosing_function(call)?;
    let url = positional_args(call)
        .first()
        .and_then(|a| string_value(*a, source))
        .filter(|u| u.starts_with("http"))?;

    let (base_url, host) = match RemoteTarget::parse(&url) {
        Some(target) => (target.origin, target.host),
        None => (url.clone(), url.clone()),
    };
    let provider = provider_for(&host);

    let mut metadata = Metadata::new();
    metadata.insert("method".to_string(), verb.to_uppercase().into());
    metadata.insert("library".to_string(), library.into());
    if let Some(name) = function.child_by_field_name("name") {
        metadata.insert("function".to_string(), node_text(name, source).into());
    }

    let node = ctx.node(
        &position_symbol("external", &provider, call),
        provider.clone(),
        line_of(call),
        metadata,
        NodeKind::ExternalApi(ExternalApiInfo {
            provider: provider.clone(),
            base_url,
            endpoints_called: vec![url],
            api_version: None,
        }),
    );

    let mut edge_metadata = Metadata::new();
    edge_metadata.insert("provider".to_string(), provider.into());
    let edge = DependencyEdge {
        source_id: ctx.service.clone(),
        target_id: node.id.to_string(),
        kind: EdgeKind::ExternalCall,
        metadata: edge_metadata,
    };

    Some((node, edge))
}

pub(crate) fn provider_for(host: &str) -> String {
    KNOWN_PROVIDERS
        .iter()
        .find(|(domain, _)| host == *domain || host.ends_with(&format!(".{domain}")))
        .map(|(_, name)| name.to_string())
        .unwrap_or_else(|| host.to_string())
}

/// `os.getenv("X", default)` and `os.environ.get("X", default)`.
fn env_read_call(call: Node, ctx: &FileContext, seen: &mut HashSet<String>) -> Option<UasNode> {
    let source = ctx.source;
    let (object, method) = method_call(call, source)?;
    let object = node_text(object, source);
    let is_env_read = (object == "os" && method == "getenv")
        || (object == "os.environ" && method == "get");
    if !is_env_read {
        return None;
    }
    let args = positional_args(call);
    let var = args.first().and_then(|a| string_value(*a, source))?;
    let default = args.get(1).map(|d| {
        string_value(*d, source).unwrap_or_else(|| node_text(*d, source).to_string())
    });
    config_node(var, false, default, call, ctx, seen)
}

/// `os.environ["X"]`, which raises when unset.
fn env_subscript(node: Node, ctx: &FileContext, seen: &mut HashSet<String>) -> Option<UasNode> {
    let source = ctx.source;
    let value = node.child_by_field_name("value")?;
    if node_text(value, source) != "os.environ" {
        return None;
    }
    let key = node.child_by_field_name("subscript")?;
    let var = string_value(key, source)?;
    config_node(var, true, None, node, ctx, seen)
}

fn config_node(
    var: String,
    required: bool,
    default_value: Option<String>,
    at: Node,
    ctx: &FileContext,
    seen: &mut HashSet<String>,
) -> Option<UasNode> {
    if var.is_empty() || !seen.insert(var.clone()) {
        return None;
    }
    Some(ctx.node(
        &format!("config:{var}"),
        var.clone(),
        line_of(at),
        Metadata::new(),
        NodeKind::Config(ConfigInfo {
            sensitive: is_sensitive_env_var(&var),
            env_var: var,
            required,
            default_value,
        }),
    ))
}
