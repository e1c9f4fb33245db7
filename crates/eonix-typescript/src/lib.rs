//! TypeScript and JavaScript extractor built on tree-sitter.
//!
//! Finds NestJS controllers, Express-style route registrations, TypeORM entities,
//! Redis clients, Kafka topics and `process.env` reads. When no grammar can be
//! loaded the file is scanned with line-anchored regexes at LOW confidence.

mod entities;
mod fallback;
mod nest;
mod resources;
mod routes;
mod syntax;

use std::path::Path;

use anyhow::{Context, Result};
use tracing::{debug, warn};
use tree_sitter::{Language, Node, Parser, Query, QueryCursor, StreamingIterator};

use eonix_core::extractor::{display_path, infer_service_name, Extractor};
use eonix_core::uas::{
    Confidence, ExtractionMethod, ExtractionResult, Metadata, NodeId, NodeKind, UasNode,
};

use crate::fallback::RegexFallback;
use crate::syntax::node_text;

const FALLBACK_SERVICE: &str = "typescript-service";

const CLASS_QUERY: &str = r#"
(class_declaration
  name: (_) @name
  body: (class_body) @body) @class
"#;

/// Calls shaped like `app.get('/path', handler)`.
const ROUTE_QUERY: &str = r#"
(call_expression
  function: (member_expression
    object: (identifier) @receiver
    property: (property_identifier) @verb)
  arguments: (arguments) @args) @call
"#;

/// Per-file state shared by the extraction passes.
pub(crate) struct FileContext<'a> {
    pub source: &'a str,
    pub file_path: String,
    pub service: String,
}

impl<'a> FileContext<'a> {
    fn new(path: &Path, source: &'a str) -> Self {
        Self {
            source,
            file_path: display_path(path),
            service: infer_service_name(path, FALLBACK_SERVICE),
        }
    }

    /// Build a HIGH-confidence node whose id is fingerprinted from this file.
    pub fn node(
        &self,
        symbol: &str,
        name: String,
        line_number: usize,
        metadata: Metadata,
        kind: NodeKind,
    ) -> UasNode {
        UasNode {
            id: NodeId::fingerprint(&self.file_path, symbol, line_number),
            name,
            file_path: self.file_path.clone(),
            line_number,
            metadata,
            confidence: Confidence::High,
            extraction_method: ExtractionMethod::TreeSitter,
            kind,
        }
    }
}

/// A class declaration as matched by [`CLASS_QUERY`].
pub(crate) struct ClassDecl<'t> {
    pub node: Node<'t>,
    pub name: &'t str,
    pub body: Node<'t>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Dialect {
    TypeScript,
    Tsx,
    JavaScript,
}

impl Dialect {
    fn for_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();
        match ext.as_str() {
            "ts" | "mts" | "cts" => Dialect::TypeScript,
            "tsx" => Dialect::Tsx,
            _ => Dialect::JavaScript,
        }
    }
}

/// Pre-compiled queries for one grammar.
struct QuerySet {
    language: Language,
    classes: Query,
    routes: Query,
}

fn compile_queries(language: Language) -> Result<QuerySet> {
    let classes =
        Query::new(&language, CLASS_QUERY).context("failed to compile class declaration query")?;
    let routes = Query::new(&language, ROUTE_QUERY).context("failed to compile route call query")?;
    Ok(QuerySet {
        language,
        classes,
        routes,
    })
}

struct Grammars {
    typescript: QuerySet,
    tsx: QuerySet,
    javascript: QuerySet,
}

impl Grammars {
    fn load() -> Result<Self> {
        Ok(Self {
            typescript: compile_queries(tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into())
                .context("TypeScript grammar")?,
            tsx: compile_queries(tree_sitter_typescript::LANGUAGE_TSX.into())
                .context("TSX grammar")?,
            javascript: compile_queries(tree_sitter_javascript::LANGUAGE.into())
                .context("JavaScript grammar")?,
        })
    }

    fn for_dialect(&self, dialect: Dialect) -> &QuerySet {
        match dialect {
            Dialect::TypeScript => &self.typescript,
            Dialect::Tsx => &self.tsx,
            Dialect::JavaScript => &self.javascript,
        }
    }
}

/// TypeScript/JavaScript extractor using tree-sitter, with a regex fallback.
pub struct TypeScriptExtractor {
    grammars: Option<Grammars>,
    fallback: RegexFallback,
}

impl TypeScriptExtractor {
    pub fn new() -> Result<Self> {
        let fallback = RegexFallback::new()?;
        let grammars = match Grammars::load() {
            Ok(grammars) => Some(grammars),
            Err(e) => {
                warn!(error = %format!("{e:#}"), "TypeScript grammars unavailable, using regex fallback");
                None
            }
        };
        Ok(Self { grammars, fallback })
    }

    /// Extractor that never loads a grammar and always takes the regex path.
    pub fn regex_only() -> Result<Self> {
        Ok(Self {
            grammars: None,
            fallback: RegexFallback::new()?,
        })
    }

    pub fn has_grammar(&self) -> bool {
        self.grammars.is_some()
    }

    fn extract_with_grammar(
        &self,
        queries: &QuerySet,
        path: &Path,
        content: &str,
    ) -> ExtractionResult {
        let mut parser = Parser::new();
        if let Err(e) = parser.set_language(&queries.language) {
            debug!(path = %path.display(), error = %e, "grammar rejected, using regex fallback");
            return self.fallback.extract(path, content);
        }
        let Some(tree) = parser.parse(content, None) else {
            debug!(path = %path.display(), "parser returned no tree, using regex fallback");
            return self.fallback.extract(path, content);
        };
        let root = tree.root_node();
        if root.has_error() {
            debug!(path = %path.display(), "syntax error, skipping file");
            return ExtractionResult::failed(format!("syntax error in {}", path.display()));
        }

        let ctx = FileContext::new(path, content);
        let mut result = ExtractionResult::empty(Confidence::High);

        for class in collect_classes(&queries.classes, root, content) {
            result.nodes.extend(nest::controller_endpoints(&class, &ctx));
            result.nodes.extend(entities::entity_model(&class, &ctx));
        }
        result
            .nodes
            .extend(routes::route_endpoints(&queries.routes, root, &ctx));

        let resources = resources::extract_resources(root, &ctx);
        result.nodes.extend(resources.nodes);
        result.edges.extend(resources.edges);

        debug!(
            path = %path.display(),
            nodes = result.nodes.len(),
            edges = result.edges.len(),
            "typescript extraction complete"
        );
        result
    }
}

fn collect_classes<'t>(query: &Query, root: Node<'t>, source: &'t str) -> Vec<ClassDecl<'t>> {
    let names = query.capture_names();
    let class_idx = names.iter().position(|n| *n == "class");
    let name_idx = names.iter().position(|n| *n == "name");
    let body_idx = names.iter().position(|n| *n == "body");

    let mut classes = Vec::new();
    let mut cursor = QueryCursor::new();
    let mut matches = cursor.matches(query, root, source.as_bytes());
    while let Some(m) = matches.next() {
        let mut node = None;
        let mut name = None;
        let mut body = None;
        for capture in m.captures {
            let idx = Some(capture.index as usize);
            if idx == class_idx {
                node = Some(capture.node);
            } else if idx == name_idx {
                name = Some(node_text(capture.node, source));
            } else if idx == body_idx {
                body = Some(capture.node);
            }
        }
        if let (Some(node), Some(name), Some(body)) = (node, name, body) {
            classes.push(ClassDecl { node, name, body });
        }
    }
    classes
}

impl Extractor for TypeScriptExtractor {
    fn language(&self) -> &'static str {
        "typescript"
    }

    fn file_extensions(&self) -> &[&str] {
        &["ts", "tsx", "js", "jsx", "mjs", "cjs"]
    }

    fn extract(&self, path: &Path, content: &str) -> ExtractionResult {
        match &self.grammars {
            Some(grammars) => {
                let queries = grammars.for_dialect(Dialect::for_path(path));
                self.extract_with_grammar(queries, path, content)
            }
            None => self.fallback.extract(path, content),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eonix_core::uas::{EdgeKind, MetadataValue, ParameterSource};
    use std::collections::HashSet;
    use std::path::PathBuf;

    fn extract_as(file: &str, content: &str) -> ExtractionResult {
        let extractor = TypeScriptExtractor::new().unwrap();
        assert!(extractor.has_grammar());
        extractor.extract(&PathBuf::from(file), content)
    }

    fn extract(content: &str) -> ExtractionResult {
        extract_as("/repo/catalog/products.controller.ts", content)
    }

    fn endpoints(result: &ExtractionResult) -> Vec<(&UasNode, &eonix_core::uas::EndpointInfo)> {
        result
            .nodes
            .iter()
            .filter_map(|n| n.as_endpoint().map(|e| (n, e)))
            .collect()
    }

    #[test]
    fn test_nest_controller_endpoint() {
        let result = extract(
            "@Controller('products') class C { @Get(':id') findOne(@Param('id') id: string) {} }",
        );
        assert_eq!(result.confidence, Confidence::High);
        let found = endpoints(&result);
        assert_eq!(found.len(), 1);
        let (node, endpoint) = found[0];
        assert_eq!(endpoint.method, "GET");
        assert_eq!(endpoint.path, "/products/:id");
        assert_eq!(node.name, "findOne");
        assert_eq!(node.confidence, Confidence::High);
        assert_eq!(endpoint.parameters.len(), 1);
        assert_eq!(endpoint.parameters[0].name, "id");
        assert_eq!(endpoint.parameters[0].type_name, "string");
        assert_eq!(endpoint.parameters[0].source, ParameterSource::Path);
    }

    #[test]
    fn test_nest_controller_full_shape() {
        let result = extract(
            r#"
import { Body, Controller, Get, Headers, Post, Query } from '@nestjs/common';

@Controller('/users/')
export class UsersController {
  constructor(private readonly users: UsersService) {}

  @Get()
  async findAll(@Query('limit') limit?: number): Promise<User[]> {
    return this.users.findAll(limit);
  }

  @Post('/')
  create(@Body() dto: CreateUserDto, @Headers('x-tenant') tenant: string): User {
    return this.users.create(dto);
  }

  helper() {}
}
"#,
        );
        let found = endpoints(&result);
        assert_eq!(found.len(), 2);

        let (list, list_info) = found[0];
        assert_eq!(list.name, "findAll");
        assert_eq!(list_info.method, "GET");
        assert_eq!(list_info.path, "/users");
        assert_eq!(list_info.response_type.as_deref(), Some("User[]"));
        assert_eq!(list_info.parameters[0].source, ParameterSource::Query);
        assert!(!list_info.parameters[0].required);
        assert_eq!(
            list.metadata.get("controller"),
            Some(&MetadataValue::Text("UsersController".to_string()))
        );
        assert_eq!(list.metadata.get("is_async"), Some(&MetadataValue::Bool(true)));

        let (_, create_info) = found[1];
        assert_eq!(create_info.method, "POST");
        assert_eq!(create_info.path, "/users");
        assert_eq!(create_info.response_type.as_deref(), Some("User"));
        let sources: Vec<_> = create_info.parameters.iter().map(|p| p.source).collect();
        assert_eq!(sources, vec![ParameterSource::Body, ParameterSource::Header]);
        assert_eq!(create_info.parameters[0].type_name, "CreateUserDto");
    }

    #[test]
    fn test_controller_without_prefix() {
        let result = extract(
            r#"
@Controller()
export class HealthController {
  @Get('health')
  check() { return 'ok'; }

  @Delete()
  reset() {}
}
"#,
        );
        let paths: Vec<_> = endpoints(&result)
            .iter()
            .map(|(_, e)| (e.method.clone(), e.path.clone()))
            .collect();
        assert_eq!(
            paths,
            vec![
                ("GET".to_string(), "/health".to_string()),
                ("DELETE".to_string(), "/".to_string())
            ]
        );
    }

    #[test]
    fn test_verb_decorators_outside_controller_are_ignored() {
        let result = extract("class NotAController { @Get('x') handler() {} }");
        assert!(endpoints(&result).is_empty());
    }

    #[test]
    fn test_express_routes() {
        let result = extract_as(
            "/repo/api/server.js",
            r#"
const express = require('express');
const app = express();
const userRouter = express.Router();

app.set('port', 3000);
app.get('env');
app.get('/health', (req, res) => res.send('ok'));
userRouter.post('/users/:id/posts/:postId', createPost);
cache.get('/not-a-route', handler);
"#,
        );
        let found = endpoints(&result);
        assert_eq!(found.len(), 2);

        let (health, health_info) = found[0];
        assert_eq!(health.name, "GET /health");
        assert_eq!(health_info.method, "GET");
        assert_eq!(
            health.metadata.get("framework"),
            Some(&MetadataValue::Text("Express".to_string()))
        );

        let (post, post_info) = found[1];
        assert_eq!(post.name, "POST /users/:id/posts/:postId");
        let names: Vec<_> = post_info.parameters.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["id", "postId"]);
        assert!(post_info
            .parameters
            .iter()
            .all(|p| p.source == ParameterSource::Path));
    }

    #[test]
    fn test_repeated_registrations_get_distinct_ids() {
        let routes = extract_as(
            "/repo/api/server.js",
            "app.get('/x', a); app.get('/x', b);\n",
        );
        let nest = extract(
            r#"
@Controller('items')
export class ItemsController {
  @Get('x')
  @Get('x')
  find() {}
}
"#,
        );

        for result in [&routes, &nest] {
            let found = endpoints(result);
            assert_eq!(found.len(), 2);
            let ids: HashSet<_> = found.iter().map(|(n, _)| n.id.to_string()).collect();
            assert_eq!(ids.len(), 2);
        }
    }

    #[test]
    fn test_typeorm_entity() {
        let result = extract(
            r#"
import { Column, Entity, ManyToOne, OneToMany, PrimaryGeneratedColumn } from 'typeorm';

@Entity()
export class Product {
  @PrimaryGeneratedColumn()
  id: number;

  @Column({ unique: true })
  sku: string;

  @Column()
  price: number;

  @ManyToOne(() => Category, (category) => category.products)
  category: Category;

  @OneToMany(() => Review, (review) => review.product)
  reviews: Review[];

  transient: string;
}
"#,
        );
        let model = result
            .nodes
            .iter()
            .find_map(|n| n.as_database_model())
            .unwrap();
        assert_eq!(model.table_name, "product");
        assert_eq!(model.columns, vec!["id:number", "sku:string", "price:number"]);
        assert_eq!(model.indexes, vec!["sku"]);
        assert_eq!(
            model.relationships,
            vec!["category:Category", "reviews:Review"]
        );
    }

    #[test]
    fn test_entity_with_explicit_table_name() {
        let result = extract("@Entity('orders') class Order { @Column() total: number; }");
        let model = result
            .nodes
            .iter()
            .find_map(|n| n.as_database_model())
            .unwrap();
        assert_eq!(model.table_name, "orders");
        assert_eq!(model.columns, vec!["total:number"]);
    }

    #[test]
    fn test_redis_clients() {
        let result = extract(
            r#"
import Redis from 'ioredis';
const a = new Redis({ host: 'cache.internal', port: 6380 });
const b = new Redis(6379, 'localhost');
const c = new IORedis('redis://sessions:6381');
const d = new Map();
"#,
        );
        let caches: Vec<_> = result.nodes.iter().filter_map(|n| n.as_cache()).collect();
        assert_eq!(caches.len(), 3);
        assert_eq!(caches[0].host.as_deref(), Some("cache.internal"));
        assert_eq!(caches[0].port, Some(6380));
        assert_eq!(caches[1].host.as_deref(), Some("localhost"));
        assert_eq!(caches[1].port, Some(6379));
        assert_eq!(caches[2].host.as_deref(), Some("sessions"));
        assert_eq!(caches[2].port, Some(6381));
    }

    #[test]
    fn test_redis_url_hosts_are_normalized() {
        let result = extract(
            r#"
const a = new Redis('redis://:pw@Cache.Internal:6380/0');
const b = new Redis({ url: 'redis://[::1]:6379' });
const c = new Redis('redis://[::1]');
"#,
        );
        let caches: Vec<_> = result.nodes.iter().filter_map(|n| n.as_cache()).collect();
        assert_eq!(caches.len(), 3);
        assert_eq!(caches[0].host.as_deref(), Some("cache.internal"));
        assert_eq!(caches[0].port, Some(6380));
        assert_eq!(caches[1].host.as_deref(), Some("::1"));
        assert_eq!(caches[1].port, Some(6379));
        assert_eq!(caches[2].host.as_deref(), Some("::1"));
        assert_eq!(caches[2].port, None);
    }

    #[test]
    fn test_kafka_topics_and_edges() {
        let result = extract_as(
            "/repo/orders/events.ts",
            r#"
async function publish(order: Order) {
  await producer.send({ topic: 'order-created', messages: [{ value: JSON.stringify(order) }] });
  await consumer.subscribe({ topic: 'payment-completed', fromBeginning: true });
  res.send({ ok: true });
}
"#,
        );
        let events: Vec<_> = result.nodes.iter().filter_map(|n| n.as_event()).collect();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].topic_name, "order-created");
        assert_eq!(events[0].technology, "Kafka");
        assert_eq!(events[1].topic_name, "payment-completed");

        assert_eq!(result.edges.len(), 2);
        assert_eq!(result.edges[0].kind, EdgeKind::EventEmit);
        assert_eq!(result.edges[0].source_id, "orders");
        assert_eq!(result.edges[1].kind, EdgeKind::EventConsume);
    }

    #[test]
    fn test_process_env_reads() {
        let result = extract(
            r#"
const url = process.env.DATABASE_URL;
const key = process.env['STRIPE_SECRET_KEY'];
const port = process.env.PORT || '3000';
const again = process.env.DATABASE_URL;
"#,
        );
        let configs: Vec<_> = result.nodes.iter().filter_map(|n| n.as_config()).collect();
        assert_eq!(configs.len(), 3);
        assert_eq!(configs[0].env_var, "DATABASE_URL");
        assert!(!configs[0].sensitive);
        assert_eq!(configs[1].env_var, "STRIPE_SECRET_KEY");
        assert!(configs[1].sensitive);
        assert_eq!(configs[2].env_var, "PORT");
        assert_eq!(configs[2].default_value.as_deref(), Some("3000"));
    }

    #[test]
    fn test_syntax_error_yields_empty_low() {
        let result = extract("@Controller('x') class { @Get( broken");
        assert!(result.is_empty());
        assert_eq!(result.confidence, Confidence::Low);
        assert!(result.has_errors());
    }

    #[test]
    fn test_tsx_and_jsx_files_parse() {
        let tsx = extract_as(
            "/repo/web/App.tsx",
            "export const App = () => <div>{process.env.API_URL}</div>;",
        );
        assert_eq!(tsx.confidence, Confidence::High);
        assert_eq!(tsx.nodes.len(), 1);

        let jsx = extract_as(
            "/repo/web/index.jsx",
            "const el = <App />; router.get('/x', handler);",
        );
        assert_eq!(jsx.confidence, Confidence::High);
        assert_eq!(endpoints(&jsx).len(), 1);
    }

    #[test]
    fn test_ids_are_deterministic() {
        let source = "@Controller('products') class C { @Get(':id') findOne() {} }";
        let first = extract(source);
        let second = extract(source);
        assert_eq!(first.nodes[0].id, second.nodes[0].id);
    }

    #[test]
    fn test_regex_fallback_is_low_confidence() {
        let extractor = TypeScriptExtractor::regex_only().unwrap();
        assert!(!extractor.has_grammar());
        let result = extractor.extract(
            &PathBuf::from("/repo/catalog/products.controller.ts"),
            r#"
@Controller('products')
export class ProductsController {
  @Get(':id')
  findOne() {}
}

router.post('/orders', handler);
"#,
        );
        assert_eq!(result.confidence, Confidence::Low);
        let found = endpoints(&result);
        assert_eq!(found.len(), 2);
        assert!(found.iter().all(|(n, _)| n.confidence == Confidence::Low));
        assert_eq!(found[0].1.path, "/products/:id");
        assert_eq!(found[1].1.method, "POST");
        assert_eq!(found[1].1.path, "/orders");
    }
}
