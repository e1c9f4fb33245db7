//! Line-anchored regex scan used when no grammar is available.

use std::path::Path;

use anyhow::{Context, Result};
use regex::Regex;
use tree_sitter::Point;

use eonix_core::uas::{
    Confidence, EndpointInfo, ExtractionMethod, ExtractionResult, Metadata, NodeKind, UasNode,
};

use crate::routes::{is_router_name, route_endpoint};
use crate::syntax::normalize_path;
use crate::FileContext;

const CONTROLLER_PATTERN: &str = r#"(?m)^[ \t]*@Controller\s*\(\s*(?:['"`]([^'"`]*)['"`])?"#;
const DECORATOR_PATTERN: &str =
    r#"(?m)^[ \t]*@(Get|Post|Put|Delete|Patch|Head|Options|All)\s*\(\s*(?:['"`]([^'"`]*)['"`])?\s*\)"#;
const ROUTE_PATTERN: &str = r#"(?m)^[ \t]*([A-Za-z_$][\w$]*)\.(get|post|put|delete|patch|head|options|all)\s*\(\s*['"`]([^'"`]+)['"`]"#;

pub(crate) struct RegexFallback {
    controller: Regex,
    decorator: Regex,
    route: Regex,
}

impl RegexFallback {
    pub fn new() -> Result<Self> {
        Ok(Self {
            controller: Regex::new(CONTROLLER_PATTERN).context("invalid controller pattern")?,
            decorator: Regex::new(DECORATOR_PATTERN).context("invalid decorator pattern")?,
            route: Regex::new(ROUTE_PATTERN).context("invalid route pattern")?,
        })
    }

    /// Endpoints matched line by line, always at LOW confidence.
    pub fn extract(&self, path: &Path, content: &str) -> ExtractionResult {
        let ctx = FileContext::new(path, content);
        let mut result = ExtractionResult::empty(Confidence::Low);
        result
            .warnings
            .push(format!("{}: parsed with regex fallback", ctx.file_path));

        let controllers: Vec<(usize, &str)> = self
            .controller
            .captures_iter(content)
            .filter_map(|c| {
                let whole = c.get(0)?;
                Some((whole.start(), c.get(1).map_or("", |m| m.as_str())))
            })
            .collect();

        for caps in self.decorator.captures_iter(content) {
            let (Some(whole), Some(verb)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            let base = controllers
                .iter()
                .rev()
                .find(|(start, _)| *start < whole.start())
                .map_or("", |(_, base)| *base);
            let route = caps.get(2).map_or("", |m| m.as_str());
            let method = verb.as_str().to_uppercase();
            let path = normalize_path(&format!("/{base}/{route}"));
            let at = point_at(content, verb.start());

            let mut metadata = Metadata::new();
            metadata.insert("framework".to_string(), "NestJS (regex)".into());
            let node = ctx.node(
                &format!("endpoint:{method}:{path}:{}:{}", at.row, at.column),
                format!("{method} {path}"),
                at.row + 1,
                metadata,
                NodeKind::Endpoint(EndpointInfo {
                    method,
                    path,
                    parameters: Vec::new(),
                    response_type: None,
                }),
            );
            result.nodes.push(downgrade(node));
        }

        for caps in self.route.captures_iter(content) {
            let (Some(receiver), Some(verb), Some(route)) = (caps.get(1), caps.get(2), caps.get(3))
            else {
                continue;
            };
            if !is_router_name(receiver.as_str()) {
                continue;
            }
            let node = route_endpoint(
                receiver.as_str(),
                &verb.as_str().to_uppercase(),
                route.as_str(),
                point_at(content, receiver.start()),
                "Express (regex)",
                &ctx,
            );
            result.nodes.push(downgrade(node));
        }

        result
    }
}

fn downgrade(mut node: UasNode) -> UasNode {
    node.confidence = Confidence::Low;
    node.extraction_method = ExtractionMethod::Regex;
    node
}

/// Zero-based row and byte column of `offset`.
fn point_at(content: &str, offset: usize) -> Point {
    let before = &content[..offset];
    Point {
        row: before.matches('\n').count(),
        column: offset - before.rfind('\n').map_or(0, |i| i + 1),
    }
}
