//! Redis clients, Kafka topics and `process.env` reads.

use std::collections::HashSet;

use tree_sitter::Node;

use eonix_core::extractor::is_sensitive_env_var;
use eonix_core::remote::host_and_port;
use eonix_core::uas::{
    CacheInfo, ConfigInfo, DependencyEdge, EdgeKind, EventInfo, Metadata, NodeKind, UasNode,
};

use crate::syntax::*;
use crate::FileContext;

const REDIS_CLASSES: &[&str] = &["Redis", "IORedis", "RedisClient"];

#[derive(Default)]
pub(crate) struct Resources {
    pub nodes: Vec<UasNode>,
    pub edges: Vec<DependencyEdge>,
}

pub(crate) fn extract_resources(root: Node, ctx: &FileContext) -> Resources {
    let mut found = Resources::default();
    let mut seen_env = HashSet::new();

    walk_tree(root, |node| match node.kind() {
        "new_expression" => found.nodes.extend(redis_client(node, ctx)),
        "call_expression" => {
            for (event, edge) in kafka_topics(node, ctx) {
                found.nodes.push(event);
                found.edges.push(edge);
            }
        }
        "member_expression" | "subscript_expression" => {
            found.nodes.extend(env_read(node, ctx, &mut seen_env));
        }
        _ => {}
    });

    found
}

/// `new Redis(..)`, `new IORedis(..)` or `new RedisClient(..)`.
fn redis_client(new_expr: Node, ctx: &FileContext) -> Option<UasNode> {
    let source = ctx.source;
    let constructor = new_expr.child_by_field_name("constructor")?;
    let class = match constructor.kind() {
        "identifier" => node_text(constructor, source),
        "member_expression" => node_text(constructor.child_by_field_name("property")?, source),
        _ => return None,
    };
    if !REDIS_CLASSES.contains(&class) {
        return None;
    }

    let args = call_args(new_expr);
    let (host, port) = connection_target(&args, source);

    let mut metadata = Metadata::new();
    metadata.insert("client".to_string(), class.into());
    metadata.insert("library".to_string(), "ioredis".into());

    Some(ctx.node(
        &position_symbol("cache", "Redis", new_expr),
        "Redis".to_string(),
        line_of(new_expr),
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

/// Host and port from `{ host, port }`, `(port, host)` or a `redis://` URL.
fn connection_target(args: &[Node], source: &str) -> (Option<String>, Option<u16>) {
    let Some(first) = args.first() else {
        return (None, None);
    };
    match first.kind() {
        "object" => {
            if let Some(url) =
                object_property(*first, "url", source).and_then(|v| string_value(v, source))
            {
                return host_and_port(&url);
            }
            let host = object_property(*first, "host", source).and_then(|v| string_value(v, source));
            let port = object_property(*first, "port", source).and_then(|v| number(v, source));
            (host, port)
        }
        "number" => {
            let host = args.get(1).and_then(|a| string_value(*a, source));
            (host, number(*first, source))
        }
        _ => match string_value(*first, source) {
            Some(url) if url.contains("://") => host_and_port(&url),
            Some(host) => (Some(host), None),
            None => (None, None),
        },
    }
}

fn number(node: Node, source: &str) -> Option<u16> {
    (node.kind() == "number")
        .then(|| node_text(node, source).parse().ok())
        .flatten()
}

/// Kafka `producer.send({ topic, messages })` and `consumer.subscribe({ topic | topics })`.
fn kafka_topics(call: Node, ctx: &FileContext) -> Vec<(UasNode, DependencyEdge)> {
    let source = ctx.source;
    let Some(function) = call
        .child_by_field_name("function")
        .filter(|f| f.kind() == "member_expression")
    else {
        return Vec::new();
    };
    let Some(method) = function
        .child_by_field_name("property")
        .map(|p| node_text(p, source))
    else {
        return Vec::new();
    };
    let args = call_args(call);
    let Some(options) = args.first().filter(|a| a.kind() == "object") else {
        return Vec::new();
    };

    let (role, edge_kind) = match method {
        "send" if object_property(*options, "messages", source).is_some() => {
            ("producer", EdgeKind::EventEmit)
        }
        "subscribe" => ("consumer", EdgeKind::EventConsume),
        _ => return Vec::new(),
    };

    let mut topics: Vec<String> = object_property(*options, "topic", source)
        .and_then(|v| string_value(v, source))
        .into_iter()
        .collect();
    if let Some(list) = object_property(*options, "topics", source).filter(|v| v.kind() == "array")
    {
        topics.extend(
            named_children(list)
                .into_iter()
                .filter_map(|item| string_value(item, source)),
        );
    }

    topics
        .into_iter()
        .map(|topic| {
            let mut metadata = Metadata::new();
            metadata.insert("role".to_string(), role.into());
            let node = ctx.node(
                &position_symbol(&format!("event:{role}"), &topic, call),
                topic.clone(),
                line_of(call),
                metadata,
                NodeKind::Event(EventInfo {
                    technology: "Kafka".to_string(),
                    topic_name: topic,
                    partition_key: None,
                }),
            );
            let edge = DependencyEdge {
                source_id: ctx.service.clone(),
                target_id: node.id.to_string(),
                kind: edge_kind.clone(),
                metadata: Metadata::new(),
            };
            (node, edge)
        })
        .collect()
}

/// `process.env.NAME` or `process.env['NAME']`, with a `||`/`??` fallback as default.
fn env_read(node: Node, ctx: &FileContext, seen: &mut HashSet<String>) -> Option<UasNode> {
    let source = ctx.source;
    let object = node.child_by_field_name("object")?;
    if node_text(object, source) != "process.env" {
        return None;
    }
    let var = match node.kind() {
        "member_expression" => node_text(node.child_by_field_name("property")?, source).to_string(),
        _ => string_value(node.child_by_field_name("index")?, source)?,
    };
    if var.is_empty() || !seen.insert(var.clone()) {
        return None;
    }

    let default_value = node
        .parent()
        .filter(|p| p.kind() == "binary_expression")
        .filter(|p| p.child_by_field_name("left") == Some(node))
        .filter(|p| {
            p.child_by_field_name("operator")
                .is_some_and(|op| matches!(node_text(op, source), "||" | "??"))
        })
        .and_then(|p| p.child_by_field_name("right"))
        .map(|right| string_value(right, source).unwrap_or_else(|| node_text(right, source).to_string()));

    Some(ctx.node(
        &format!("config:{var}"),
        var.clone(),
        line_of(node),
        Metadata::new(),
        NodeKind::Config(ConfigInfo {
            sensitive: is_sensitive_env_var(&var),
            env_var: var,
            required: false,
            default_value,
        }),
    ))
}
