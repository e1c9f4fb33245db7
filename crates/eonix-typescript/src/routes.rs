use tree_sitter::{Node, Point, Query, QueryCursor, StreamingIterator};

use eonix_core::uas::{EndpointInfo, Metadata, NodeKind, Parameter, ParameterSource, UasNode};

use crate::syntax::*;
use crate::FileContext;

pub(crate) const ROUTE_VERBS: &[&str] = &[
    "get", "post", "put", "delete", "patch", "head", "options", "all",
];

const ROUTER_NAMES: &[&str] = &["app", "router", "server", "api", "routes"];
const ROUTER_SUFFIXES: &[&str] = &["router", "Router", "app", "App"];

/// Whether an identifier is conventionally bound to an app or router object.
pub(crate) fn is_router_name(name: &str) -> bool {
    ROUTER_NAMES.contains(&name) || ROUTER_SUFFIXES.iter().any(|s| name.ends_with(s))
}

/// Endpoints registered as `<router>.<verb>('/path', handler...)`.
pub(crate) fn route_endpoints(query: &Query, root: Node, ctx: &FileContext) -> Vec<UasNode> {
    let source = ctx.source;
    let names = query.capture_names();
    let receiver_idx = names.iter().position(|n| *n == "receiver");
    let verb_idx = names.iter().position(|n| *n == "verb");
    let call_idx = names.iter().position(|n| *n == "call");

    let mut endpoints = Vec::new();
    let mut cursor = QueryCursor::new();
    let mut matches = cursor.matches(query, root, source.as_bytes());
    while let Some(m) = matches.next() {
        let mut receiver = None;
        let mut verb = None;
        let mut call = None;
        for capture in m.captures {
            let idx = Some(capture.index as usize);
            if idx == receiver_idx {
                receiver = Some(node_text(capture.node, source));
            } else if idx == verb_idx {
                verb = Some(node_text(capture.node, source));
            } else if idx == call_idx {
                call = Some(capture.node);
            }
        }
        let (Some(receiver), Some(verb), Some(call)) = (receiver, verb, call) else {
            continue;
        };
        if !is_router_name(receiver) || !ROUTE_VERBS.contains(&verb) {
            continue;
        }
        // A single argument is a settings read such as `app.get('env')`.
        let args = call_args(call);
        if args.len() < 2 {
            continue;
        }
        let Some(path) = string_value(args[0], source) else {
            continue;
        };
        endpoints.push(route_endpoint(
            receiver,
            &verb.to_uppercase(),
            &path,
            call.start_position(),
            "Express",
            ctx,
        ));
    }
    endpoints
}

/// Endpoint named `"METHOD path"` with `:name` segments as path parameters, registered at `at`.
pub(crate) fn route_endpoint(
    receiver: &str,
    method: &str,
    raw_path: &str,
    at: Point,
    framework: &str,
    ctx: &FileContext,
) -> UasNode {
    let path = normalize_path(raw_path);
    let parameters = path_params(&path)
        .into_iter()
        .map(|name| Parameter::new(name, "string", ParameterSource::Path))
        .collect();

    let mut metadata = Metadata::new();
    metadata.insert("framework".to_string(), framework.into());
    metadata.insert("router".to_string(), receiver.into());

    let name = format!("{method} {path}");
    let symbol = format!("route:{receiver}:{method}:{path}:{}:{}", at.row, at.column);
    ctx.node(
        &symbol,
        name,
        at.row + 1,
        metadata,
        NodeKind::Endpoint(EndpointInfo {
            method: method.to_string(),
            path,
            parameters,
            response_type: None,
        }),
    )
}
