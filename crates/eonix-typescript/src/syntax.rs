//! Helpers shared by the TypeScript, TSX and JavaScript grammars, which agree on
//! the node kinds used here.

use tree_sitter::Node;

pub(crate) fn node_text<'s>(node: Node, source: &'s str) -> &'s str {
    &source[node.byte_range()]
}

/// 1-based line of the node's first byte.
pub(crate) fn line_of(node: Node) -> usize {
    node.start_position().row + 1
}

/// Id symbol suffixed with the node's `row:column`, so two declarations never share one.
pub(crate) fn position_symbol(kind: &str, name: &str, node: Node) -> String {
    let pos = node.start_position();
    format!("{kind}:{name}:{}:{}", pos.row, pos.column)
}

pub(crate) fn named_children(node: Node) -> Vec<Node> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor).collect()
}

/// Visit every node below `root` (inclusive) in document order.
pub(crate) fn walk_tree<'t>(root: Node<'t>, mut visit: impl FnMut(Node<'t>)) {
    let mut cursor = root.walk();
    loop {
        visit(cursor.node());
        if cursor.goto_first_child() {
            continue;
        }
        loop {
            if cursor.goto_next_sibling() {
                break;
            }
            if !cursor.goto_parent() {
                return;
            }
        }
    }
}

/// Value of a string literal, or of a template literal without substitutions.
pub(crate) fn string_value(node: Node, source: &str) -> Option<String> {
    match node.kind() {
        "string" => Some(strip_quotes(node_text(node, source)).to_string()),
        "template_string" => {
            if named_children(node)
                .iter()
                .any(|c| c.kind() == "template_substitution")
            {
                return None;
            }
            Some(strip_quotes(node_text(node, source)).to_string())
        }
        _ => None,
    }
}

fn strip_quotes(literal: &str) -> &str {
    let mut chars = literal.chars();
    match (chars.next(), chars.next_back()) {
        (Some(open), Some(close)) if open == close && matches!(open, '"' | '\'' | '`') => {
            chars.as_str()
        }
        _ => literal,
    }
}

/// Arguments of a call or `new` expression, comments excluded.
pub(crate) fn call_args(call: Node) -> Vec<Node> {
    let Some(args) = call.child_by_field_name("arguments") else {
        return Vec::new();
    };
    named_children(args)
        .into_iter()
        .filter(|a| a.kind() != "comment")
        .collect()
}

/// Value of the `key: value` pair in an object literal.
pub(crate) fn object_property<'t>(object: Node<'t>, key: &str, source: &str) -> Option<Node<'t>> {
    if object.kind() != "object" {
        return None;
    }
    named_children(object).into_iter().find_map(|pair| {
        if pair.kind() != "pair" {
            return None;
        }
        let k = pair.child_by_field_name("key")?;
        let name = string_value(k, source).unwrap_or_else(|| node_text(k, source).to_string());
        if name == key {
            pair.child_by_field_name("value")
        } else {
            None
        }
    })
}

/// A decorator's name and its call arguments: `@Get(':id')` is `("Get", [':id'])`,
/// `@Injectable` is `("Injectable", [])`.
pub(crate) struct Decorator<'t> {
    pub node: Node<'t>,
    pub name: &'t str,
    pub args: Vec<Node<'t>>,
}

pub(crate) fn decorator<'t>(node: Node<'t>, source: &'t str) -> Option<Decorator<'t>> {
    if node.kind() != "decorator" {
        return None;
    }
    let expr = named_children(node).into_iter().next()?;
    let (callee, args) = if expr.kind() == "call_expression" {
        (expr.child_by_field_name("function")?, call_args(expr))
    } else {
        (expr, Vec::new())
    };
    let name = match callee.kind() {
        "identifier" => node_text(callee, source),
        "member_expression" => node_text(callee.child_by_field_name("property")?, source),
        _ => return None,
    };
    Some(Decorator { node, name, args })
}

/// Decorators written directly on `node`.
pub(crate) fn own_decorators<'t>(node: Node<'t>, source: &'t str) -> Vec<Decorator<'t>> {
    named_children(node)
        .into_iter()
        .filter_map(|c| decorator(c, source))
        .collect()
}

/// Decorators on a class declaration, including those written before `export`.
pub(crate) fn class_decorators<'t>(class: Node<'t>, source: &'t str) -> Vec<Decorator<'t>> {
    let mut decorators = own_decorators(class, source);
    if let Some(parent) = class.parent().filter(|p| p.kind() == "export_statement") {
        decorators.extend(own_decorators(parent, source));
    }
    decorators
}

/// A class member together with every decorator applied to it. The TypeScript
/// grammar places member decorators as siblings in the class body, the
/// JavaScript grammar as children of the member.
pub(crate) struct Member<'t> {
    pub node: Node<'t>,
    pub decorators: Vec<Decorator<'t>>,
}

pub(crate) fn class_members<'t>(body: Node<'t>, source: &'t str) -> Vec<Member<'t>> {
    let mut members = Vec::new();
    let mut pending = Vec::new();
    for child in named_children(body) {
        match child.kind() {
            "decorator" => pending.extend(decorator(child, source)),
            "comment" => {}
            "method_definition" | "public_field_definition" | "field_definition" => {
                let mut decorators = std::mem::take(&mut pending);
                decorators.extend(own_decorators(child, source));
                members.push(Member {
                    node: child,
                    decorators,
                });
            }
            _ => pending.clear(),
        }
    }
    members
}

/// Text of a `: T` annotation without the colon.
pub(crate) fn annotation_text<'s>(annotation: Node, source: &'s str) -> &'s str {
    node_text(annotation, source).trim_start_matches(':').trim()
}

/// `Promise<T>` is reported as `T`.
pub(crate) fn unwrap_promise(type_text: &str) -> &str {
    type_text
        .strip_prefix("Promise<")
        .and_then(|rest| rest.strip_suffix('>'))
        .map(str::trim)
        .unwrap_or(type_text)
}

/// Collapse repeated slashes and drop a trailing slash, keeping `/` for the root.
pub(crate) fn normalize_path(path: &str) -> String {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    format!("/{}", segments.join("/"))
}

/// Names of `:name` segments in an Express-style path.
pub(crate) fn path_params(path: &str) -> Vec<&str> {
    path.split('/')
        .filter_map(|segment| segment.strip_prefix(':'))
        .map(|name| name.trim_end_matches('?'))
        .filter(|name| !name.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_quotes() {
        assert_eq!(strip_quotes("'users'"), "users");
        assert_eq!(strip_quotes("\"users\""), "users");
        assert_eq!(strip_quotes("`users`"), "users");
        assert_eq!(strip_quotes("'"), "'");
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("/products/:id"), "/products/:id");
        assert_eq!(normalize_path("//products//:id/"), "/products/:id");
        assert_eq!(normalize_path("/"), "/");
        assert_eq!(normalize_path("//"), "/");
        assert_eq!(normalize_path("users"), "/users");
    }

    #[test]
    fn test_unwrap_promise() {
        assert_eq!(unwrap_promise("Promise<User[]>"), "User[]");
        assert_eq!(unwrap_promise("Promise<Map<string, User>>"), "Map<string, User>");
        assert_eq!(unwrap_promise("User"), "User");
    }

    #[test]
    fn test_path_params() {
        assert_eq!(path_params("/users/:id/posts/:postId?"), vec!["id", "postId"]);
        assert!(path_params("/health").is_empty());
    }
}
