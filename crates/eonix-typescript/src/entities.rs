use tree_sitter::Node;

use eonix_core::uas::{DatabaseModelInfo, Metadata, NodeKind, UasNode};

use crate::syntax::*;
use crate::{ClassDecl, FileContext};

const RELATION_DECORATORS: &[&str] = &["OneToMany", "ManyToOne", "OneToOne", "ManyToMany"];

/// Database model for a class carrying `@Entity(..)`.
pub(crate) fn entity_model(class: &ClassDecl, ctx: &FileContext) -> Option<UasNode> {
    let source = ctx.source;
    let decorators = class_decorators(class.node, source);
    let entity = decorators.iter().find(|d| d.name == "Entity")?;

    let table_name = entity
        .args
        .first()
        .and_then(|arg| match arg.kind() {
            "object" => object_property(*arg, "name", source).and_then(|v| string_value(v, source)),
            _ => string_value(*arg, source),
        })
        .unwrap_or_else(|| class.name.to_lowercase());

    let mut columns = Vec::new();
    let mut indexes = Vec::new();
    let mut relationships = Vec::new();

    for member in class_members(class.body, source) {
        let Some((field, annotation)) = field_parts(member.node, source) else {
            continue;
        };
        let mut indexed = false;
        for decorator in &member.decorators {
            if decorator.name.ends_with("Column") {
                columns.push(format!("{field}:{}", annotation.unwrap_or("any")));
                indexed |= decorator
                    .args
                    .first()
                    .and_then(|opts| object_property(*opts, "unique", source))
                    .is_some_and(|v| v.kind() == "true");
            } else if RELATION_DECORATORS.contains(&decorator.name) {
                let target = decorator
                    .args
                    .first()
                    .and_then(|arg| relation_target(*arg, source))
                    .or_else(|| annotation.map(|a| a.trim_end_matches("[]")))
                    .unwrap_or("unknown");
                relationships.push(format!("{field}:{target}"));
            } else if decorator.name == "Index" {
                indexed = true;
            }
        }
        if indexed {
            indexes.push(field.to_string());
        }
    }

    let mut metadata = Metadata::new();
    metadata.insert("framework".to_string(), "TypeORM".into());

    let symbol = format!("model:{}", class.name);
    Some(ctx.node(
        &symbol,
        class.name.to_string(),
        line_of(class.node),
        metadata,
        NodeKind::DatabaseModel(DatabaseModelInfo {
            table_name,
            columns,
            indexes,
            relationships,
        }),
    ))
}

/// Field name and type annotation of a class property.
fn field_parts<'s>(member: Node, source: &'s str) -> Option<(&'s str, Option<&'s str>)> {
    match member.kind() {
        "public_field_definition" => Some((
            node_text(member.child_by_field_name("name")?, source),
            member
                .child_by_field_name("type")
                .map(|t| annotation_text(t, source)),
        )),
        "field_definition" => Some((
            node_text(member.child_by_field_name("property")?, source),
            None,
        )),
        _ => None,
    }
}

/// `() => Category` targets `Category`; a string argument names the target directly.
fn relation_target<'s>(arg: Node, source: &'s str) -> Option<&'s str> {
    match arg.kind() {
        "arrow_function" => arg
            .child_by_field_name("body")
            .filter(|b| matches!(b.kind(), "identifier" | "member_expression"))
            .map(|b| node_text(b, source)),
        "string" => {
            let text = node_text(arg, source);
            text.get(1..text.len().saturating_sub(1))
        }
        _ => None,
    }
}
