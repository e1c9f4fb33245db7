use tree_sitter::{Node, Query, QueryCursor, StreamingIterator};

use eonix_core::uas::{EndpointInfo, Metadata, NodeKind, Parameter, ParameterSource, UasNode};

use crate::syntax::*;
use crate::FileContext;

const HTTP_VERBS: &[&str] = &["get", "post", "put", "delete", "patch", "head", "options"];

/// Path used when a route decorator has no literal path argument.
const UNKNOWN_PATH: &str = "unknown";

pub(crate) const ROUTE_QUERY: &str = r#"
(decorated_definition
  (decorator
    (call
      function: (attribute
        object: (_) @object
        attribute: (identifier) @verb)) @call)
  definition: (function_definition) @function)
"#;

struct RouteCapture<'t> {
    object: Node<'t>,
    verb: String,
    call: Node<'t>,
    function: Node<'t>,
}

/// Endpoints declared by `@<obj>.<verb>(path, ...)` and `@<obj>.route(path, methods=[...])`.
pub(crate) fn extract_endpoints(query: &Query, root: Node, ctx: &FileContext) -> Vec<UasNode> {
    let object_idx = capture_index(query, "object");
    let verb_idx = capture_index(query, "verb");
    let call_idx = capture_index(query, "call");
    let function_idx = capture_index(query, "function");

    let mut routes = Vec::new();
    let mut cursor = QueryCursor::new();
    let mut matches = cursor.matches(query, root, ctx.source.as_bytes());

    while let Some(m) = matches.next() {
        let mut object = None;
        let mut verb = None;
        let mut call = None;
        let mut function = None;
        for capture in m.captures {
            let idx = Some(capture.index as usize);
            if idx == object_idx {
                object = Some(capture.node);
            } else if idx == verb_idx {
                verb = Some(node_text(capture.node, ctx.source).to_string());
            } else if idx == call_idx {
                call = Some(capture.node);
            } else if idx == function_idx {
                function = Some(capture.node);
            }
        }
        if let (Some(object), Some(verb), Some(call), Some(function)) = (object, verb, call, function)
        {
            routes.push(RouteCapture {
                object,
                verb,
                call,
                function,
            });
        }
    }

    let mut endpoints = Vec::new();
    for route in &routes {
        let verb = route.verb.to_lowercase();
        let (methods, framework) = if HTTP_VERBS.contains(&verb.as_str()) {
            (vec![verb.to_uppercase()], "FastAPI")
        } else if verb == "route" {
            (route_methods(route.call, ctx.source), "Flask")
        } else {
            continue;
        };

        for method in methods {
            endpoints.push(build_endpoint(route, &method, framework, ctx));
        }
    }
    endpoints
}

fn capture_index(query: &Query, name: &str) -> Option<usize> {
    query.capture_names().iter().position(|n| *n == name)
}

/// Methods listed in a Flask `methods=[...]` keyword, `GET` when absent.
fn route_methods(call: Node, source: &str) -> Vec<String> {
    let listed: Vec<String> = keyword_arg(call, "methods", source)
        .filter(|v| matches!(v.kind(), "list" | "tuple" | "set"))
        .map(|list| {
            named_children(list)
                .into_iter()
                .filter_map(|item| string_value(item, source))
                .map(|m| m.to_uppercase())
                .collect()
        })
        .unwrap_or_default();

    if listed.is_empty() {
        vec!["GET".to_string()]
    } else {
        listed
    }
}

fn build_endpoint(route: &RouteCapture, method: &str, framework: &str, ctx: &FileContext) -> UasNode {
    let source = ctx.source;
    let function = route.function;
    let name = function
        .child_by_field_name("name")
        .map(|n| node_text(n, source).to_string())
        .unwrap_or_default();

    let path = positional_args(route.call)
        .first()
        .and_then(|arg| string_value(*arg, source))
        .unwrap_or_else(|| UNKNOWN_PATH.to_string());

    let response_type = keyword_arg(route.call, "response_model", source)
        .map(|v| type_name(v, source))
        .or_else(|| {
            function
                .child_by_field_name("return_type")
                .map(|t| node_text(t, source).to_string())
        });

    let parameters = function
        .child_by_field_name("parameters")
        .map(|p| extract_parameters(p, &path, source))
        .unwrap_or_default();

    let mut metadata = Metadata::new();
    metadata.insert("framework".to_string(), framework.into());
    metadata.insert("is_async".to_string(), is_async(function).into());
    metadata.insert(
        "router".to_string(),
        node_text(route.object, source).into(),
    );

    let symbol = position_symbol("endpoint", &format!("{name}:{method}:{path}"), route.call);
    ctx.node(
        &symbol,
        name,
        line_of(function),
        metadata,
        NodeKind::Endpoint(EndpointInfo {
            method: method.to_string(),
            path,
            parameters,
            response_type,
        }),
    )
}

/// Positional parameters of a function, stopping at `*`, `*args` or `**kwargs`.
fn extract_parameters(params: Node, path: &str, source: &str) -> Vec<Parameter> {
    let mut parameters = Vec::new();

    for child in named_children(params) {
        let (name_node, type_node, default_node) = match child.kind() {
            "identifier" => (Some(child), None, None),
            "typed_parameter" => {
                let name = named_children(child).into_iter().next();
                if name.is_some_and(|n| n.kind() != "identifier") {
                    break;
                }
                (name, child.child_by_field_name("type"), None)
            }
            "default_parameter" => (
                child.child_by_field_name("name"),
                None,
                child.child_by_field_name("value"),
            ),
            "typed_default_parameter" => (
                child.child_by_field_name("name"),
                child.child_by_field_name("type"),
                child.child_by_field_name("value"),
            ),
            "list_splat_pattern" | "dictionary_splat_pattern" | "keyword_separator" => break,
            _ => continue,
        };

        let Some(name_node) = name_node else {
            continue;
        };
        let name = node_text(name_node, source);
        if name == "self" || name == "cls" {
            continue;
        }

        let annotation = type_node.map(|t| node_text(t, source));
        let source_kind = infer_source(name, annotation, default_node, path, source);

        let mut parameter = Parameter::new(name, annotation.unwrap_or("Any"), source_kind);
        if let Some(default) = default_node {
            parameter.required = false;
            parameter.default = Some(node_text(default, source).to_string());
        }
        parameters.push(parameter);
    }

    parameters
}

/// Annotation markers win, then a marker default like `Query(None)`, then a
/// `{name}` placeholder in the route path; everything else is a query parameter.
fn infer_source(
    name: &str,
    annotation: Option<&str>,
    default: Option<Node>,
    path: &str,
    source: &str,
) -> ParameterSource {
    if let Some(kind) = annotation.and_then(marker_source) {
        return kind;
    }
    if let Some(kind) = default
        .filter(|d| d.kind() == "call")
        .and_then(|d| callee_name(d, source))
        .and_then(marker_source)
    {
        return kind;
    }
    if path.contains(&format!("{{{name}}}"))
        || path.contains(&format!("<{name}>"))
        || path.contains(&format!(":{name}>"))
    {
        return ParameterSource::Path;
    }
    ParameterSource::Query
}

fn marker_source(text: &str) -> Option<ParameterSource> {
    if text.contains("Query") {
        Some(ParameterSource::Query)
    } else if text.contains("Body") {
        Some(ParameterSource::Body)
    } else if text.contains("Path") {
        Some(ParameterSource::Path)
    } else if text.contains("Header") {
        Some(ParameterSource::Header)
    } else {
        None
    }
}
