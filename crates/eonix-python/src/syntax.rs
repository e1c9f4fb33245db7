//! Small helpers over the tree-sitter-python syntax tree.

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

/// Value of a plain string literal. F-strings with interpolation are not literals.
pub(crate) fn string_value(node: Node, source: &str) -> Option<String> {
    match node.kind() {
        "string" => {
            if named_children(node)
                .iter()
                .any(|c| c.kind() == "interpolation")
            {
                return None;
            }
            Some(unquote(node_text(node, source)))
        }
        "concatenated_string" => named_children(node)
            .into_iter()
            .map(|part| string_value(part, source))
            .collect(),
        _ => None,
    }
}

fn unquote(literal: &str) -> String {
    let body = literal.trim_start_matches(|c: char| c.is_ascii_alphabetic());
    for quote in ["\"\"\"", "'''", "\"", "'"] {
        if let Some(inner) = body
            .strip_prefix(quote)
            .and_then(|rest| rest.strip_suffix(quote))
        {
            return inner.to_string();
        }
    }
    body.to_string()
}

/// Name a call is made through: `Column(..)` is `Column`, `models.CharField(..)` is `CharField`.
pub(crate) fn callee_name<'s>(call: Node, source: &'s str) -> Option<&'s str> {
    let function = call.child_by_field_name("function")?;
    match function.kind() {
        "identifier" => Some(node_text(function, source)),
        "attribute" => function
            .child_by_field_name("attribute")
            .map(|a| node_text(a, source)),
        _ => None,
    }
}

/// Receiver text and method name of an `<object>.<method>(..)` call.
pub(crate) fn method_call<'t, 's>(call: Node<'t>, source: &'s str) -> Option<(Node<'t>, &'s str)> {
    let function = call.child_by_field_name("function")?;
    if function.kind() != "attribute" {
        return None;
    }
    let object = function.child_by_field_name("object")?;
    let attribute = function.child_by_field_name("attribute")?;
    Some((object, node_text(attribute, source)))
}

pub(crate) fn positional_args(call: Node) -> Vec<Node> {
    let Some(args) = call.child_by_field_name("arguments") else {
        return Vec::new();
    };
    named_children(args)
        .into_iter()
        .filter(|a| {
            !matches!(
                a.kind(),
                "keyword_argument" | "comment" | "list_splat" | "dictionary_splat"
            )
        })
        .collect()
}

pub(crate) fn keyword_arg<'t>(call: Node<'t>, name: &str, source: &str) -> Option<Node<'t>> {
    let args = call.child_by_field_name("arguments")?;
    named_children(args).into_iter().find_map(|a| {
        if a.kind() != "keyword_argument" {
            return None;
        }
        let key = a.child_by_field_name("name")?;
        if node_text(key, source) == name {
            a.child_by_field_name("value")
        } else {
            None
        }
    })
}

/// Whether `call` has a keyword argument `name=True`.
pub(crate) fn has_true_keyword(call: Node, name: &str, source: &str) -> bool {
    keyword_arg(call, name, source).is_some_and(|v| v.kind() == "true")
}

/// Short type name for an expression used as a type: `sa.String(50)` is `String`.
pub(crate) fn type_name(expr: Node, source: &str) -> String {
    match expr.kind() {
        "identifier" => node_text(expr, source).to_string(),
        "attribute" => expr
            .child_by_field_name("attribute")
            .map(|a| node_text(a, source).to_string())
            .unwrap_or_else(|| node_text(expr, source).to_string()),
        "call" => expr
            .child_by_field_name("function")
            .map(|f| type_name(f, source))
            .unwrap_or_else(|| node_text(expr, source).to_string()),
        "string" | "concatenated_string" => {
            string_value(expr, source).unwrap_or_else(|| node_text(expr, source).to_string())
        }
        _ => node_text(expr, source).to_string(),
    }
}

/// Nearest function definition containing `node`.
pub(crate) fn enclosing_function(node: Node) -> Option<Node> {
    let mut current = node.parent();
    while let Some(n) = current {
        if n.kind() == "function_definition" {
            return Some(n);
        }
        current = n.parent();
    }
    None
}

pub(crate) fn is_async(function: Node) -> bool {
    let mut cursor = function.walk();
    let found = function.children(&mut cursor).any(|c| c.kind() == "async");
    found
}
