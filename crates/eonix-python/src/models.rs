use tree_sitter::Node;

use eonix_core::uas::{DatabaseModelInfo, Metadata, NodeKind, UasNode};

use crate::syntax::*;
use crate::FileContext;

/// Base classes that mark a class as a model, with the framework they imply.
const MODEL_BASES: &[(&str, &str)] = &[
    ("Base", "SQLAlchemy"),
    ("DeclarativeBase", "SQLAlchemy"),
    ("Model", "Django/SQLAlchemy"),
    ("BaseModel", "Pydantic"),
    ("SQLModel", "SQLModel"),
];

const RELATION_FIELDS: &[&str] = &["ForeignKey", "OneToOneField", "ManyToManyField"];

pub(crate) fn extract_models(root: Node, ctx: &FileContext) -> Vec<UasNode> {
    let mut models = Vec::new();
    walk_tree(root, |node| {
        if node.kind() == "class_definition" {
            if let Some(model) = build_model(node, ctx) {
                models.push(model);
            }
        }
    });
    models
}

fn model_framework(class: Node, source: &str) -> Option<(String, &'static str)> {
    let bases = class.child_by_field_name("superclasses")?;
    named_children(bases).into_iter().find_map(|base| {
        let name = match base.kind() {
            "identifier" => node_text(base, source),
            "attribute" => node_text(base.child_by_field_name("attribute")?, source),
            _ => return None,
        };
        let (_, framework) = MODEL_BASES.iter().find(|(b, _)| *b == name)?;
        let framework = if name == "Model" && node_text(base, source) == "models.Model" {
            "Django"
        } else {
            framework
        };
        Some((name.to_string(), framework))
    })
}

#[derive(Default)]
struct ModelBody {
    table_name: Option<String>,
    columns: Vec<String>,
    indexes: Vec<String>,
    relationships: Vec<String>,
}

fn build_model(class: Node, ctx: &FileContext) -> Option<UasNode> {
    let source = ctx.source;
    let (base, framework) = model_framework(class, source)?;
    let name = node_text(class.child_by_field_name("name")?, source).to_string();
    let annotated_fields = matches!(framework, "Pydantic" | "SQLModel");

    let mut body = ModelBody::default();
    if let Some(block) = class.child_by_field_name("body") {
        for stmt in named_children(block) {
            match stmt.kind() {
                "expression_statement" => {
                    for assignment in named_children(stmt)
                        .into_iter()
                        .filter(|n| n.kind() == "assignment")
                    {
                        read_assignment(assignment, annotated_fields, source, &mut body);
                    }
                }
                "class_definition" => {
                    if let Some(table) = meta_db_table(stmt, source) {
                        body.table_name = Some(table);
                    }
                }
                _ => {}
            }
        }
    }

    let table_name = body.table_name.unwrap_or_else(|| name.to_lowercase());

    let mut metadata = Metadata::new();
    metadata.insert("framework".to_string(), framework.into());
    metadata.insert("base".to_string(), base.into());

    let symbol = format!("model:{name}");
    Some(ctx.node(
        &symbol,
        name,
        line_of(class),
        metadata,
        NodeKind::DatabaseModel(DatabaseModelInfo {
            table_name,
            columns: body.columns,
            indexes: body.indexes,
            relationships: body.relationships,
        }),
    ))
}

/// Django `class Meta: db_table = "..."`.
fn meta_db_table(class: Node, source: &str) -> Option<String> {
    let name = class.child_by_field_name("name")?;
    if node_text(name, source) != "Meta" {
        return None;
    }
    let block = class.child_by_field_name("body")?;
    named_children(block)
        .into_iter()
        .filter(|s| s.kind() == "expression_statement")
        .flat_map(named_children)
        .filter(|a| a.kind() == "assignment")
        .find_map(|a| {
            let left = a.child_by_field_name("left")?;
            if node_text(left, source) != "db_table" {
                return None;
            }
            string_value(a.child_by_field_name("right")?, source)
        })
}

fn mapped_inner(annotation: &str) -> Option<&str> {
    annotation
        .strip_prefix("Mapped[")
        .and_then(|rest| rest.strip_suffix(']'))
}

fn read_assignment(assignment: Node, annotated_fields: bool, source: &str, body: &mut ModelBody) {
    let Some(left) = assignment.child_by_field_name("left") else {
        return;
    };
    if left.kind() != "identifier" {
        return;
    }
    let field = node_text(left, source);
    let annotation = assignment
        .child_by_field_name("type")
        .map(|t| node_text(t, source));
    let right = assignment.child_by_field_name("right");

    if field == "__tablename__" {
        if let Some(table) = right.and_then(|r| string_value(r, source)) {
            body.table_name = Some(table);
        }
        return;
    }
    if field.starts_with("__") || annotation.is_some_and(|a| a.starts_with("ClassVar")) {
        return;
    }

    if let Some(call) = right.filter(|r| r.kind() == "call") {
        if read_column_call(field, annotation, call, source, body) {
            return;
        }
    }

    // Bare annotations: SQLAlchemy 2.0 `Mapped[T]` or pydantic-style fields.
    if let Some(inner) = annotation.and_then(mapped_inner) {
        body.columns.push(format!("{field}:{inner}"));
    } else if let Some(a) = annotation.filter(|_| annotated_fields) {
        body.columns.push(format!("{field}:{a}"));
    }
}

/// Record a column or relationship declared by a constructor call.
/// Returns false when the call is not a recognized declaration.
fn read_column_call(
    field: &str,
    annotation: Option<&str>,
    call: Node,
    source: &str,
    body: &mut ModelBody,
) -> bool {
    let Some(callee) = callee_name(call, source) else {
        return false;
    };
    let args = positional_args(call);
    let indexed = has_true_keyword(call, "index", source)
        || has_true_keyword(call, "unique", source)
        || has_true_keyword(call, "db_index", source);

    match callee {
        "relationship" | "Relationship" => {
            let target = args
                .first()
                .map(|a| type_name(*a, source))
                .or_else(|| annotation.map(|a| relation_target(a).to_string()))
                .unwrap_or_else(|| "Unknown".to_string());
            body.relationships.push(format!("{field}:{target}"));
        }
        "Column" | "mapped_column" => {
            let mut column_type = None;
            for arg in &args {
                if arg.kind() == "call" && callee_name(*arg, source) == Some("ForeignKey") {
                    if let Some(target) = positional_args(*arg).first() {
                        body.relationships
                            .push(format!("{field}:{}", type_name(*target, source)));
                    }
                } else if column_type.is_none() {
                    column_type = Some(type_name(*arg, source));
                }
            }
            let column_type = column_type
                .or_else(|| annotation.and_then(mapped_inner).map(str::to_string))
                .unwrap_or_else(|| "Unknown".to_string());
            body.columns.push(format!("{field}:{column_type}"));
            if indexed {
                body.indexes.push(field.to_string());
            }
        }
        "Field" => {
            let Some(annotation) = annotation else {
                return false;
            };
            body.columns.push(format!("{field}:{annotation}"));
            if indexed {
                body.indexes.push(field.to_string());
            }
        }
        c if RELATION_FIELDS.contains(&c) || c.ends_with("Field") => {
            body.columns.push(format!("{field}:{c}"));
            if RELATION_FIELDS.contains(&c) {
                let target = args
                    .first()
                    .map(|a| type_name(*a, source))
                    .unwrap_or_else(|| "Unknown".to_string());
                body.relationships.push(format!("{field}:{target}"));
            }
            if indexed {
                body.indexes.push(field.to_string());
            }
        }
        _ => return false,
    }
    true
}

/// `Mapped[List["Address"]]` targets `Address`.
fn relation_target(annotation: &str) -> &str {
    let inner = mapped_inner(annotation).unwrap_or(annotation);
    let inner = inner
        .rsplit('[')
        .next()
        .unwrap_or(inner)
        .trim_end_matches(']');
    inner.trim_matches(|c| c == '"' || c == '\'')
}
