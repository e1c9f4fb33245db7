use tree_sitter::Node;

use eonix_core::uas::{EndpointInfo, Metadata, NodeKind, Parameter, ParameterSource, UasNode};

use crate::syntax::*;
use crate::{ClassDecl, FileContext};

const VERB_DECORATORS: &[&str] = &[
    "Get", "Post", "Put", "Delete", "Patch", "Head", "Options", "All",
];

/// Parameters supplied by the framework rather than by the request contract.
const INJECTED_DECORATORS: &[&str] = &["Req", "Res", "Request", "Response", "Next"];

/// Endpoints of a `@Controller(base)` class: one per method carrying a verb decorator.
pub(crate) fn controller_endpoints(class: &ClassDecl, ctx: &FileContext) -> Vec<UasNode> {
    let source = ctx.source;
    let decorators = class_decorators(class.node, source);
    let Some(controller) = decorators.iter().find(|d| d.name == "Controller") else {
        return Vec::new();
    };
    let base = controller
        .args
        .first()
        .and_then(|arg| route_argument(*arg, source))
        .unwrap_or_default();

    let mut endpoints = Vec::new();
    for member in class_members(class.body, source) {
        if member.node.kind() != "method_definition" {
            continue;
        }
        for verb in member
            .decorators
            .iter()
            .filter(|d| VERB_DECORATORS.contains(&d.name))
        {
            let route = verb
                .args
                .first()
                .and_then(|arg| route_argument(*arg, source))
                .unwrap_or_default();
            let path = normalize_path(&format!("/{base}/{route}"));
            endpoints.push(build_endpoint(
                class.name,
                member.node,
                verb.node,
                &verb.name.to_uppercase(),
                path,
                ctx,
            ));
        }
    }
    endpoints
}

/// A route given as `'path'`, `{ path: 'path' }` or `['path', ...]`.
fn route_argument(arg: Node, source: &str) -> Option<String> {
    match arg.kind() {
        "object" => object_property(arg, "path", source).and_then(|v| route_argument(v, source)),
        "array" => named_children(arg)
            .into_iter()
            .find_map(|item| string_value(item, source)),
        _ => string_value(arg, source),
    }
}

fn build_endpoint(
    controller: &str,
    method_node: Node,
    decorator: Node,
    method: &str,
    path: String,
    ctx: &FileContext,
) -> UasNode {
    let source = ctx.source;
    let name = method_node
        .child_by_field_name("name")
        .map(|n| node_text(n, source).to_string())
        .unwrap_or_default();
    let parameters = method_node
        .child_by_field_name("parameters")
        .map(|p| extract_parameters(p, source))
        .unwrap_or_default();
    let response_type = method_node
        .child_by_field_name("return_type")
        .map(|t| unwrap_promise(annotation_text(t, source)).to_string());

    let mut cursor = method_node.walk();
    let is_async = method_node
        .children(&mut cursor)
        .any(|c| c.kind() == "async");

    let mut metadata = Metadata::new();
    metadata.insert("framework".to_string(), "NestJS".into());
    metadata.insert("controller".to_string(), controller.into());
    metadata.insert("is_async".to_string(), is_async.into());

    let symbol = position_symbol("endpoint", &format!("{name}:{method}:{path}"), decorator);
    ctx.node(
        &symbol,
        name,
        line_of(method_node),
        metadata,
        NodeKind::Endpoint(EndpointInfo {
            method: method.to_string(),
            path,
            parameters,
            response_type,
        }),
    )
}

fn extract_parameters(params: Node, source: &str) -> Vec<Parameter> {
    let mut parameters = Vec::new();
    for param in named_children(params) {
        let (name_node, type_node, default_node) = match param.kind() {
            "required_parameter" | "optional_parameter" => (
                param.child_by_field_name("pattern"),
                param.child_by_field_name("type"),
                param.child_by_field_name("value"),
            ),
            "identifier" => (Some(param), None, None),
            "assignment_pattern" => (
                param.child_by_field_name("left"),
                None,
                param.child_by_field_name("right"),
            ),
            _ => continue,
        };
        let Some(name_node) = name_node else {
            continue;
        };

        let decorators = own_decorators(param, source);
        if decorators
            .iter()
            .any(|d| INJECTED_DECORATORS.contains(&d.name))
        {
            continue;
        }
        let source_kind = decorators
            .iter()
            .find_map(|d| decorator_source(d.name))
            .unwrap_or(ParameterSource::Query);

        let type_name = type_node
            .map(|t| annotation_text(t, source))
            .unwrap_or("any");
        let mut parameter = Parameter::new(node_text(name_node, source), type_name, source_kind);
        if param.kind() == "optional_parameter" {
            parameter.required = false;
        }
        if let Some(default) = default_node {
            parameter.required = false;
            parameter.default = Some(node_text(default, source).to_string());
        }
        parameters.push(parameter);
    }
    parameters
}

fn decorator_source(name: &str) -> Option<ParameterSource> {
    match name {
        "Param" => Some(ParameterSource::Path),
        "Body" => Some(ParameterSource::Body),
        "Query" => Some(ParameterSource::Query),
        "Headers" | "Header" => Some(ParameterSource::Header),
        _ => None,
    }
}
