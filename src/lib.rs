//! # avrotize-core
//!
//! Turn [JSON Schema](https://json-schema.org/) documents and sample data
//! into [Apache Avro](https://avro.apache.org/) schemas.
//!
//! ## Features
//!
//! - Resolves `$defs` / `definitions`, local and remote `$ref`s, and
//!   recursive types (cycles are broken with `*_ref` forwarding records)
//! - Merges composition keywords (`allOf`, `anyOf`, `oneOf`)
//! - Infers schemas from JSON or XML sample documents, folding optional
//!   fields and detecting discriminated unions
//! - Parsing Canonical Form plus SHA-256, MD5 and Rabin fingerprints
//! - Validates documents against the resulting schemas
//! - CLI tool `avrotize`
//!
//! ## Example (Programmatic Usage)
//!
//! ```no_run
//! use avrotize_core::canonical::{canonicalize, canonicalize_node};
//! use avrotize_core::converter::jsons_to_avro;
//! use avrotize_core::fingerprint::{fingerprint_hex, Algorithm};
//! use avrotize_core::inference::infer;
//! use serde_json::json;
//!
//! // Resolve a JSON Schema into Avro JSON.
//! let order = json!({
//!     "$id": "https://shop.example/order.json",
//!     "type": "object",
//!     "properties": {
//!         "sku": { "type": "string" },
//!         "quantity": { "type": "integer", "minimum": 1 }
//!     },
//!     "required": ["sku"]
//! });
//! let avro = jsons_to_avro(&order, "", "", "order.json", false)?;
//! println!("{}", fingerprint_hex(&canonicalize(&avro)?, Algorithm::Sha256));
//!
//! // Infer a schema straight from samples.
//! let samples = [json!({"sku": "A-1", "quantity": 2}), json!({"sku": "B-7"})];
//! let inferred = infer("Order", &samples);
//! println!("{}", canonicalize_node(&inferred)?);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Example (CLI)
//!
//! ```bash
//! avrotize j2a schema.json out.avsc
//! avrotize json2a samples.jsonl out.avsc --type-name Event
//! avrotize fingerprint out.avsc --algorithm rabin
//! ```
//!
//! ## Crate Layout
//!
//! - [`avro`]: the schema IR and its registry
//! - [`converter`]: JSON Schema resolution
//! - [`inference`]: schema inference from sample documents
//! - [`choice`]: discriminated-union detection
//! - [`canonical`] / [`fingerprint`]: Parsing Canonical Form and fingerprints
//! - [`validate`]: instance validation
//! - [`common`] / [`dependency_resolver`]: naming, hashing, ordering helpers
//!
//! The CLI binary is enabled with the `cli` feature.
pub mod avro;
pub mod canonical;
pub mod choice;
pub mod common;
pub mod converter;
pub mod dependency_resolver;
pub mod error;
pub mod fingerprint;
pub mod inference;
pub mod validate;
