//! OpenAPI/Swagger adapter (§4.7).
//!
//! Unlike the platform adapters, this one is driven entirely by a spec
//! document the caller supplies (via `add-openapi`), not by crawling a
//! portal. It normalizes Swagger 2.0 documents into the 3.x shape this
//! module understands, resolves `$ref` pointers with a depth/cycle guard,
//! flattens `allOf`/`oneOf`/`anyOf` compositions, and renders each operation
//! as a Markdown page with a parameter table and a response table. Any
//! documented non-2xx response becomes an [`ErrorCodeEntry`].

use async_trait::async_trait;
use serde_json::Value;

use super::{Adapter, DocContent, DocEntry};
use crate::types::{DocType, ErrorCodeEntry};
use crate::{Error, Result};

const MAX_REF_DEPTH: usize = 16;

/// One registered OpenAPI source: an id, display name, and the URL its spec
/// document lives at (fetched fresh on every sync — §9 Open Questions).
#[derive(Debug, Clone)]
pub struct OpenApiSource {
    /// Stable source id this adapter populates.
    pub id: String,
    /// Human-readable display name.
    pub name: String,
    /// URL of the OpenAPI/Swagger document (JSON or YAML).
    pub spec_url: String,
}

/// Fetches and normalizes a single OpenAPI/Swagger document into one
/// [`DocEntry`]/[`DocContent`] pair per operation.
pub struct OpenApiAdapter {
    client: reqwest::Client,
    source: OpenApiSource,
}

impl OpenApiAdapter {
    /// Build an adapter for one registered OpenAPI source.
    #[must_use]
    pub fn new(client: reqwest::Client, source: OpenApiSource) -> Self {
        Self { client, source }
    }

    async fn fetch_spec(&self) -> Result<Value> {
        let body = self.client.get(&self.source.spec_url).send().await?.error_for_status()?.text().await?;
        parse_spec_document(&body)
    }
}

/// Parse a raw spec body as JSON first, falling back to YAML; normalizes
/// Swagger 2.0 (`swagger: "2.0"`) documents to the 3.x shape this module
/// expects downstream.
pub fn parse_spec_document(body: &str) -> Result<Value> {
    let raw = match serde_json::from_str::<Value>(body) {
        Ok(v) => v,
        Err(json_err) => serde_yaml::from_str::<Value>(body)
            .map_err(|yaml_err| Error::Parse(format!("spec is neither valid JSON ({json_err}) nor valid YAML ({yaml_err})")))?,
    };

    if raw.get("swagger").and_then(Value::as_str) == Some("2.0") {
        Ok(swagger2_to_openapi3(raw))
    } else {
        Ok(raw)
    }
}

/// Shim a Swagger 2.0 document into an OpenAPI-3-shaped `Value` good enough
/// for this module's operation/parameter/response walk: `definitions` moves
/// to `components.schemas`, and each operation's `host`+`basePath` is folded
/// into a single `servers` entry so path rendering stays uniform.
fn swagger2_to_openapi3(mut raw: Value) -> Value {
    let definitions = raw.as_object_mut().and_then(|m| m.remove("definitions"));
    if let Some(defs) = definitions {
        let components = raw.as_object_mut().unwrap().entry("components").or_insert_with(|| Value::Object(serde_json::Map::new()));
        if let Some(obj) = components.as_object_mut() {
            obj.insert("schemas".to_string(), defs);
        }
    }

    let scheme = raw.get("schemes").and_then(|s| s.as_array()).and_then(|a| a.first()).and_then(Value::as_str).unwrap_or("https");
    let host = raw.get("host").and_then(Value::as_str).unwrap_or("");
    let base_path = raw.get("basePath").and_then(Value::as_str).unwrap_or("");
    if !host.is_empty() {
        let url = format!("{scheme}://{host}{base_path}");
        raw.as_object_mut().unwrap().insert(
            "servers".to_string(),
            Value::Array(vec![serde_json::json!({ "url": url })]),
        );
    }
    raw
}

/// Resolve a `$ref` pointer against the document root, following nested
/// refs up to [`MAX_REF_DEPTH`] hops and detecting cycles along the way.
fn resolve_ref<'a>(root: &'a Value, reference: &str, depth: usize, seen: &mut Vec<String>) -> Result<&'a Value> {
    if depth > MAX_REF_DEPTH {
        return Err(Error::Parse(format!("$ref depth exceeded {MAX_REF_DEPTH} while resolving {reference}")));
    }
    if seen.contains(&reference.to_string()) {
        return Err(Error::Parse(format!("cyclic $ref detected at {reference}")));
    }
    seen.push(reference.to_string());

    let pointer = reference.strip_prefix('#').unwrap_or(reference);
    let mut node = root;
    for part in pointer.split('/').filter(|s| !s.is_empty()) {
        let key = part.replace("~1", "/").replace("~0", "~");
        node = node.get(&key).ok_or_else(|| Error::Parse(format!("unresolved $ref segment '{key}' in {reference}")))?;
    }
    if let Some(inner_ref) = node.get("$ref").and_then(Value::as_str) {
        return resolve_ref(root, inner_ref, depth + 1, seen);
    }
    Ok(node)
}

/// Dereference `$ref` at the top level of `schema`, returning it unchanged
/// if it carries no `$ref`.
fn deref<'a>(root: &'a Value, schema: &'a Value) -> Result<&'a Value> {
    if let Some(reference) = schema.get("$ref").and_then(Value::as_str) {
        let mut seen = Vec::new();
        resolve_ref(root, reference, 0, &mut seen)
    } else {
        Ok(schema)
    }
}

/// Flatten `allOf`/`oneOf`/`anyOf` into a single best-effort property map:
/// `allOf` members merge; `oneOf`/`anyOf` contribute the first variant's
/// properties, annotated as a union in the rendered table.
fn flatten_schema(root: &Value, schema: &Value) -> (serde_json::Map<String, Value>, bool) {
    let mut props = serde_json::Map::new();
    let mut is_union = false;

    let Ok(resolved) = deref(root, schema) else {
        return (props, is_union);
    };

    if let Some(all_of) = resolved.get("allOf").and_then(Value::as_array) {
        for member in all_of {
            if let Ok(m) = deref(root, member) {
                let (sub, _) = flatten_schema(root, m);
                props.extend(sub);
            }
        }
    }
    for key in ["oneOf", "anyOf"] {
        if let Some(variants) = resolved.get(key).and_then(Value::as_array) {
            is_union = true;
            if let Some(first) = variants.first() {
                if let Ok(m) = deref(root, first) {
                    let (sub, _) = flatten_schema(root, m);
                    props.extend(sub);
                }
            }
        }
    }
    if let Some(direct) = resolved.get("properties").and_then(Value::as_object) {
        props.extend(direct.clone());
    }
    (props, is_union)
}

/// One operation extracted from a `paths` walk.
struct Operation {
    method: String,
    path: String,
    operation_id: Option<String>,
    summary: Option<String>,
    parameters: Vec<Value>,
    request_schema: Option<Value>,
    responses: serde_json::Map<String, Value>,
}

fn walk_operations(spec: &Value) -> Vec<Operation> {
    let mut ops = Vec::new();
    let Some(paths) = spec.get("paths").and_then(Value::as_object) else { return ops };
    for (path, item) in paths {
        let Some(item_obj) = item.as_object() else { continue };
        let shared_params: Vec<Value> = item_obj.get("parameters").and_then(Value::as_array).cloned().unwrap_or_default();
        for method in ["get", "post", "put", "delete", "patch"] {
            let Some(op) = item_obj.get(method) else { continue };
            let mut parameters = shared_params.clone();
            if let Some(own) = op.get("parameters").and_then(Value::as_array) {
                parameters.extend(own.clone());
            }
            let request_schema = op
                .get("requestBody")
                .and_then(|rb| rb.get("content"))
                .and_then(|c| c.get("application/json"))
                .and_then(|m| m.get("schema"))
                .cloned();
            let responses = op.get("responses").and_then(Value::as_object).cloned().unwrap_or_default();
            ops.push(Operation {
                method: method.to_uppercase(),
                path: path.clone(),
                operation_id: op.get("operationId").and_then(Value::as_str).map(ToString::to_string),
                summary: op.get("summary").and_then(Value::as_str).map(ToString::to_string),
                parameters,
                request_schema,
                responses,
            });
        }
    }
    ops
}

fn render_operation(spec: &Value, op: &Operation) -> String {
    let title = op.summary.clone().unwrap_or_else(|| format!("{} {}", op.method, op.path));
    let mut out = format!("# {title}\n\n`{} {}`\n\n", op.method, op.path);

    if !op.parameters.is_empty() {
        out.push_str("## Parameters\n\n| Name | In | Required | Type | Description |\n| --- | --- | --- | --- | --- |\n");
        for param in &op.parameters {
            let resolved = deref(spec, param).ok();
            let name = resolved.and_then(|p| p.get("name")).and_then(Value::as_str).unwrap_or("?");
            let location = resolved.and_then(|p| p.get("in")).and_then(Value::as_str).unwrap_or("?");
            let required = resolved.and_then(|p| p.get("required")).and_then(Value::as_bool).unwrap_or(false);
            let ty = resolved
                .and_then(|p| p.get("schema").or_else(|| p.get("type").map(|_| p)))
                .and_then(|s| s.get("type").and_then(Value::as_str).or_else(|| s.as_str()))
                .unwrap_or("string");
            let description = resolved.and_then(|p| p.get("description")).and_then(Value::as_str).unwrap_or("");
            out.push_str(&format!("| {name} | {location} | {required} | {ty} | {description} |\n"));
        }
        out.push('\n');
    }

    if let Some(schema) = &op.request_schema {
        let (props, is_union) = flatten_schema(spec, schema);
        if !props.is_empty() {
            out.push_str("## Request body\n\n");
            if is_union {
                out.push_str("_(oneOf/anyOf — showing first variant)_\n\n");
            }
            out.push_str("| Field | Type |\n| --- | --- |\n");
            for (name, field_schema) in &props {
                let ty = field_schema.get("type").and_then(Value::as_str).unwrap_or("object");
                out.push_str(&format!("| {name} | {ty} |\n"));
            }
            out.push('\n');
        }
    }

    if !op.responses.is_empty() {
        out.push_str("## Responses\n\n| Status | Description |\n| --- | --- |\n");
        let mut codes: Vec<&String> = op.responses.keys().collect();
        codes.sort();
        for code in codes {
            let description = op.responses[code].get("description").and_then(Value::as_str).unwrap_or("");
            out.push_str(&format!("| {code} | {description} |\n"));
        }
        out.push('\n');
    }

    if let Some(id) = &op.operation_id {
        out.push_str(&format!("_operationId: `{id}`_\n"));
    }
    out
}

/// Every documented response whose status is not `2xx` becomes an error
/// code entry, keyed by the numeric status itself.
fn extract_error_responses(source_id: &str, op: &Operation, doc_id: &str) -> Vec<ErrorCodeEntry> {
    op.responses
        .iter()
        .filter(|(status, _)| !status.starts_with('2') && status.chars().all(|c| c.is_ascii_digit()))
        .map(|(status, body)| ErrorCodeEntry {
            source_id: source_id.to_string(),
            code: status.clone(),
            message: body.get("description").and_then(Value::as_str).unwrap_or("").to_string(),
            description: format!("{} {}", op.method, op.path),
            doc_id: Some(doc_id.to_string()),
        })
        .collect()
}

#[async_trait]
impl Adapter for OpenApiAdapter {
    fn source_id(&self) -> &str {
        &self.source.id
    }

    async fn fetch_catalog(&self) -> Result<Vec<DocEntry>> {
        let spec = self.fetch_spec().await?;
        let ops = walk_operations(&spec);
        Ok(ops
            .iter()
            .map(|op| {
                let slug = op.operation_id.clone().unwrap_or_else(|| format!("{}-{}", op.method.to_lowercase(), op.path.replace('/', "-")));
                DocEntry {
                    path: slug,
                    title: op.summary.clone().unwrap_or_else(|| format!("{} {}", op.method, op.path)),
                    doc_type: DocType::ApiReference,
                    dev_mode: None,
                    source_url: None,
                }
            })
            .collect())
    }

    async fn fetch_content(&self, entry: &DocEntry) -> Result<DocContent> {
        let spec = self.fetch_spec().await?;
        let ops = walk_operations(&spec);
        let op = ops
            .iter()
            .find(|op| {
                let slug = op.operation_id.clone().unwrap_or_else(|| format!("{}-{}", op.method.to_lowercase(), op.path.replace('/', "-")));
                slug == entry.path
            })
            .ok_or_else(|| Error::NotFound(format!("operation '{}' no longer present in spec", entry.path)))?;

        let content = render_operation(&spec, op);
        let doc_id = crate::types::compute_doc_id(&self.source.id, &entry.path);
        let error_codes = extract_error_responses(&self.source.id, op, &doc_id);
        Ok(DocContent {
            content,
            api_path: Some(format!("{} {}", op.method, op.path)),
            last_updated: None,
            metadata: None,
            error_codes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_V3: &str = r#"{
        "openapi": "3.0.0",
        "paths": {
            "/pets/{id}": {
                "get": {
                    "operationId": "getPet",
                    "summary": "Get a pet",
                    "parameters": [{"name": "id", "in": "path", "required": true, "schema": {"type": "string"}}],
                    "responses": {
                        "200": {"description": "OK"},
                        "404": {"description": "Not found"}
                    }
                }
            }
        }
    }"#;

    const SAMPLE_V2: &str = r#"{
        "swagger": "2.0",
        "host": "api.example.com",
        "basePath": "/v1",
        "schemes": ["https"],
        "paths": {}
    }"#;

    #[test]
    fn parses_json_spec() {
        let spec = parse_spec_document(SAMPLE_V3).unwrap();
        assert_eq!(spec.get("openapi").and_then(Value::as_str), Some("3.0.0"));
    }

    #[test]
    fn shims_swagger2_host_and_base_path_into_servers() {
        let spec = parse_spec_document(SAMPLE_V2).unwrap();
        let servers = spec.get("servers").and_then(Value::as_array).unwrap();
        assert_eq!(servers[0]["url"], "https://api.example.com/v1");
    }

    #[test]
    fn walks_operations_and_extracts_error_responses() {
        let spec = parse_spec_document(SAMPLE_V3).unwrap();
        let ops = walk_operations(&spec);
        assert_eq!(ops.len(), 1);
        let errors = extract_error_responses("petstore", &ops[0], "doc1");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].code, "404");
    }

    #[test]
    fn render_operation_includes_parameter_and_response_tables() {
        let spec = parse_spec_document(SAMPLE_V3).unwrap();
        let ops = walk_operations(&spec);
        let rendered = render_operation(&spec, &ops[0]);
        assert!(rendered.contains("## Parameters"));
        assert!(rendered.contains("## Responses"));
        assert!(rendered.contains("404"));
    }

    #[test]
    fn ref_cycle_is_detected_rather_than_recursing_forever() {
        let spec = serde_json::json!({
            "components": {"schemas": {"A": {"$ref": "#/components/schemas/B"}, "B": {"$ref": "#/components/schemas/A"}}}
        });
        let mut seen = Vec::new();
        let err = resolve_ref(&spec, "#/components/schemas/A", 0, &mut seen).unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
    }
}
