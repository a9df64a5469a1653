use reqwest::blocking::Client;
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::common::names::avro_name;
use crate::converter::state::SchemaSource;
use crate::converter::utils::id_to_avro_namespace;
use crate::error::ResolveError;

/// A `$ref` target located in its document.
#[derive(Debug, Clone)]
pub struct ResolvedReference {
    /// Absolute reference URI; the key under which the target is imported.
    pub uri: String,
    /// The referenced schema fragment.
    pub schema: Value,
    /// The containing document when it is not the referring one.
    pub document: Option<Value>,
    pub base_uri: String,
    /// Namespace of the containing document's types.
    pub namespace: String,
    /// Avro name for the target: the last pointer segment or the file stem.
    pub type_name: String,
}

/// Interpret a base URI that may also be a plain file path.
pub fn base_url(base_uri: &str) -> Result<Url, ResolveError> {
    if let Ok(url) = Url::parse(base_uri) {
        // A single-letter scheme is a Windows drive, not a URL.
        if url.scheme().len() > 1 {
            return Ok(url);
        }
    }
    let path = Path::new(if base_uri.is_empty() { "." } else { base_uri });
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };
    Url::from_file_path(&absolute).map_err(|_| ResolveError::InvalidUri(base_uri.to_string()))
}

/// Fetch schema text from a URL, with caching.
pub fn fetch_content(url: &Url, cache: &mut HashMap<String, String>) -> Result<String, ResolveError> {
    let mut key = url.clone();
    key.set_fragment(None);
    if let Some(cached) = cache.get(key.as_str()) {
        return Ok(cached.clone());
    }

    let unresolvable = |message: String| ResolveError::UnresolvableReference {
        reference: key.to_string(),
        message,
    };

    let content = match key.scheme() {
        "http" | "https" => {
            debug!("fetching {key}");
            let client = Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .map_err(|e| unresolvable(format!("client build error: {e}")))?;
            let resp = client
                .get(key.as_str())
                .send()
                .and_then(|r| r.error_for_status())
                .map_err(|e| unresolvable(format!("HTTP request error: {e}")))?;
            resp.text()
                .map_err(|e| unresolvable(format!("error reading response: {e}")))?
        }
        "file" => {
            let path = key
                .to_file_path()
                .map_err(|_| unresolvable("invalid file URL".to_string()))?;
            fs::read_to_string(&path)
                .map_err(|e| unresolvable(format!("file read error from {}: {e}", path.display())))?
        }
        other => return Err(unresolvable(format!("unsupported scheme {other}"))),
    };

    cache.insert(key.to_string(), content.clone());
    Ok(content)
}

/// Normalize a URI fragment to an RFC 6901 JSON Pointer.
///
/// Tolerates the sloppy `#definitions/...` form.
fn fragment_pointer(fragment: &str) -> String {
    if fragment.is_empty() || fragment.starts_with('/') {
        fragment.to_string()
    } else {
        format!("/{fragment}")
    }
}

fn locate<'v>(document: &'v Value, pointer: &str, reference: &str) -> Result<&'v Value, ResolveError> {
    document
        .pointer(pointer)
        .ok_or_else(|| ResolveError::UnresolvableReference {
            reference: reference.to_string(),
            message: format!("JSON pointer {pointer} not found"),
        })
}

/// Key of a location inside the document at `base_uri`.
pub fn local_uri(base_uri: &str, pointer: &str) -> String {
    format!("{base_uri}#{pointer}")
}

/// Escape a key for use as a JSON Pointer segment.
pub fn pointer_segment(key: &str) -> String {
    key.replace('~', "~0").replace('/', "~1")
}

fn name_from_pointer(pointer: &str) -> Option<String> {
    pointer
        .rsplit('/')
        .find(|s| !s.is_empty())
        .map(|s| avro_name(&s.replace("~1", "/").replace("~0", "~")))
}

/// Resolve a `$ref` inside a JSON schema.
///
/// Local fragments (`#/definitions/...`) resolve against the referring
/// document. Anything else is joined with the base URI and fetched over
/// `http(s)` or read from a `file` URL.
pub fn resolve_reference(
    reference: &str,
    source: SchemaSource<'_>,
    cache: &mut HashMap<String, String>,
) -> Result<ResolvedReference, ResolveError> {
    if let Some(fragment) = reference.strip_prefix('#') {
        let pointer = fragment_pointer(fragment);
        let schema = locate(source.document, &pointer, reference)?.clone();
        return Ok(ResolvedReference {
            uri: local_uri(source.base_uri, &pointer),
            schema,
            document: None,
            base_uri: source.base_uri.to_string(),
            namespace: source.namespace.to_string(),
            type_name: name_from_pointer(&pointer).unwrap_or_else(|| "document".to_string()),
        });
    }

    let base = base_url(source.base_uri)?;
    let target = base
        .join(reference)
        .map_err(|e| ResolveError::InvalidUri(format!("{reference}: {e}")))?;
    let pointer = fragment_pointer(target.fragment().unwrap_or(""));

    let mut document_url = target.clone();
    document_url.set_fragment(None);
    let mut base_without_fragment = base.clone();
    base_without_fragment.set_fragment(None);

    let stem = document_url
        .path_segments()
        .and_then(|s| s.last().map(str::to_string))
        .and_then(|file| file.split('.').next().map(avro_name))
        .filter(|s| !s.is_empty() && s != "_");
    let type_name = name_from_pointer(&pointer)
        .or(stem)
        .unwrap_or_else(|| "document".to_string());

    if document_url == base_without_fragment {
        let schema = locate(source.document, &pointer, reference)?.clone();
        return Ok(ResolvedReference {
            uri: local_uri(source.base_uri, &pointer),
            schema,
            document: None,
            base_uri: source.base_uri.to_string(),
            namespace: source.namespace.to_string(),
            type_name,
        });
    }

    let text = fetch_content(&document_url, cache)?;
    let document: Value = serde_json::from_str(&text).map_err(|e| {
        ResolveError::UnresolvableReference {
            reference: reference.to_string(),
            message: format!("JSON parse error: {e}"),
        }
    })?;
    let namespace = document
        .get("$id")
        .and_then(Value::as_str)
        .map(id_to_avro_namespace)
        .filter(|ns| !ns.is_empty())
        .unwrap_or_else(|| source.namespace.to_string());
    let schema = locate(&document, &pointer, reference)?.clone();

    Ok(ResolvedReference {
        uri: target.to_string(),
        schema,
        document: Some(document),
        base_uri: document_url.to_string(),
        namespace,
        type_name,
    })
}
