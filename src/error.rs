//! Error types for schema resolution, inference, and canonicalization.

use thiserror::Error;

/// Errors raised while resolving a JSON Schema into the Avro IR.
///
/// Only [`ResolveError::MalformedSchema`] and the I/O variants abort a
/// conversion. Unreachable references are downgraded to diagnostics by the
/// resolver itself.
#[derive(Error, Debug)]
pub enum ResolveError {
    /// The schema contains a construct the resolver does not understand.
    #[error("malformed schema: unsupported {construct} in {fragment}")]
    MalformedSchema { construct: String, fragment: String },

    /// A `$ref` target could not be fetched or located.
    #[error("unresolvable reference {reference}: {message}")]
    UnresolvableReference { reference: String, message: String },

    /// A base URI or `$ref` is not a valid URI.
    #[error("invalid URI {0}")]
    InvalidUri(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ResolveError {
    pub fn malformed(construct: impl Into<String>, fragment: &serde_json::Value) -> Self {
        let mut fragment = fragment.to_string();
        if fragment.len() > 200 {
            let cut = (0..=200)
                .rev()
                .find(|i| fragment.is_char_boundary(*i))
                .unwrap_or(0);
            fragment.truncate(cut);
            fragment.push_str("...");
        }
        ResolveError::MalformedSchema {
            construct: construct.into(),
            fragment,
        }
    }
}

/// Errors that can occur during structural inference
#[derive(Error, Debug)]
pub enum InferenceError {
    /// No documents were supplied
    #[error("No documents provided for inference")]
    NoDocuments,

    /// JSON parsing error
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    /// XML parsing error
    #[error("XML parsing error at position {position}: {message}")]
    Xml { position: u64, message: String },

    /// Input did not have the expected shape
    #[error("Invalid document structure: {0}")]
    InvalidStructure(String),
}

/// Errors raised when reading an Avro schema (IR JSON or PCF input).
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid Avro schema: {0}")]
    InvalidSchema(String),
}

/// A document did not conform to an IR schema.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{path}: {message}")]
pub struct ValidationError {
    pub path: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(path: &str, message: impl Into<String>) -> Self {
        Self {
            path: path.to_string(),
            message: message.into(),
        }
    }
}
