//! # fieldtree - Declarative Configuration Schemas
//!
//! A library for describing configuration as a tree of named, typed and
//! validated fields, with defaults, overrides, read hooks and fallback
//! chains between fields.
//!
//! ## Features
//!
//! - **Fields**: Default plus optional override, validated on every write
//! - **Types**: Pluggable type registry with validator chains (`string`, `number`, `boolean`, `table` built in)
//! - **Field Specs**: Short literals like `["debug", "severity level"]` turn into fields
//! - **Schemas**: Ordered, nestable collections mixing fields and plain data
//! - **Fallbacks**: A field can take its default live from another field, cycle-checked
//! - **Classes**: Capture a schema once, instantiate independent copies
//!
//! ## Quick Start
//!
//! ```rust
//! use fieldtree::{Declaration, FieldSpec, Schema, SchemaOptions};
//! use serde_json::json;
//!
//! let schema = Schema::new(
//!     [
//!         ("severity", Declaration::from(FieldSpec::with_default("debug", "severity level"))),
//!         ("retries", FieldSpec::with_default(3, "retry count").attr("max", 10).into()),
//!     ],
//!     SchemaOptions::new(),
//! )?;
//!
//! assert_eq!(schema.value("severity"), Some(json!("debug")));
//!
//! schema.update(&json!({"retries": 5}))?;
//! assert_eq!(schema.value("retries"), Some(json!(5)));
//!
//! // out of range: rejected, value unchanged
//! assert!(schema.update(&json!({"retries": 50})).is_err());
//! assert_eq!(schema.value("retries"), Some(json!(5)));
//! # Ok::<(), fieldtree::Error>(())
//! ```
//!
//! ## Defining Schemas from JSON
//!
//! Arrays shaped like field specs become fields; everything else is kept as
//! plain data.
//!
//! ```rust
//! use fieldtree::{KeyKind, Schema, SchemaOptions};
//! use serde_json::json;
//!
//! let schema = Schema::from_value(
//!     &json!({
//!         "host": ["localhost", "server host"],
//!         "port": [8080, "server port"],
//!         "banner": "not a field"
//!     }),
//!     SchemaOptions::new().order(["port", "host"]),
//! )?;
//!
//! assert_eq!(schema.kind("port"), Some(KeyKind::Field));
//! assert_eq!(schema.kind("banner"), Some(KeyKind::NonField));
//! assert_eq!(schema.keys().collect::<Vec<_>>(), ["port", "host", "banner"]);
//! # Ok::<(), fieldtree::Error>(())
//! ```
//!
//! ## Custom Types
//!
//! ```rust
//! use fieldtree::{FieldSpec, Schema, SchemaOptions, TypeOptions, TypeRegistry, validators};
//! use std::sync::Arc;
//!
//! let mut registry = TypeRegistry::new();
//! registry.register(
//!     "level",
//!     "log level name",
//!     vec![validators::validator(|c| match c.value.as_str() {
//!         Some("debug" | "info" | "warn" | "error") | None => Ok(()),
//!         _ => Err("unknown log level".into()),
//!     })],
//!     TypeOptions::new(),
//! )?;
//!
//! let schema = Schema::new(
//!     [("level", FieldSpec::with_default("info", "log level").of_type("level"))],
//!     SchemaOptions::new().registry(Arc::new(registry)),
//! )?;
//!
//! assert!(schema.field("level").unwrap().set_value("loud").is_err());
//! # Ok::<(), fieldtree::Error>(())
//! ```
//!
//! ## Errors
//!
//! Every violated rule is reported, not just the first:
//!
//! ```rust
//! use fieldtree::{Field, FieldOptions};
//!
//! let err = Field::new(FieldOptions::default()).unwrap_err();
//! assert!(err.is_validation());
//! assert_eq!(
//!     err.violations(),
//!     ["name is required", "description is required", "type is required"]
//! );
//! ```

mod error;
mod sync;

pub mod field;
pub mod schema;
pub mod types;

// Re-exports from core
pub use error::{Error, Result};

pub use field::spec::{is_field_spec, normalize_description};
pub use field::{Behaviour, FallbackContext, Field, FieldInfo, FieldOptions, FieldSpec, Hook};

pub use schema::{
    Declaration, Entry, Fields, KeyKind, Node, Schema, SchemaClass, SchemaOptions, WalkOrder,
};

pub use types::validators;
pub use types::{FieldType, TypeOptions, TypeRegistry, ids};
