//! Schemas: ordered, nestable collections of fields
//!
//! # Overview
//!
//! A [`Schema`] maps keys to entries. Every declared entry is classified when
//! it is assigned:
//!
//! - a field spec literal (or a ready-made [`Field`]) becomes a **field**;
//! - anything else (a nested [`Schema`], a plain JSON value, a literal that
//!   is not shaped like a field spec) is stored as a **non-field** entry.
//!
//! Being "not a field" is never an error. An invalid field spec is: it fails
//! construction with [`Error::Validation`].
//!
//! Keys are kept sorted unless an explicit order is supplied through
//! [`SchemaOptions::order`]; iteration, traversal and bulk updates follow that
//! order.
//!
//! # Example
//!
//! ```rust
//! use fieldtree::{Declaration, FieldSpec, Schema, SchemaOptions};
//! use serde_json::json;
//!
//! let file = Schema::new(
//!     [
//!         ("path", Declaration::from(FieldSpec::with_default("/var/log/app.log", "log file"))),
//!         ("level", FieldSpec::described("file log level").of_type("string").into()),
//!     ],
//!     SchemaOptions::new(),
//! )?;
//!
//! let logger = Schema::new(
//!     [
//!         ("level", Declaration::from(FieldSpec::with_default("info", "global log level"))),
//!         ("file", file.into()),
//!         ("version", json!(2).into()),
//!     ],
//!     SchemaOptions::new().fallback("file.level", "level"),
//! )?;
//!
//! assert_eq!(logger.value("file.level"), Some(json!("info")));
//!
//! logger.update(&json!({"level": "debug"}))?;
//! assert_eq!(logger.value("file.level"), Some(json!("debug")));
//! assert_eq!(logger.value("version"), Some(json!(2)));
//! # Ok::<(), fieldtree::Error>(())
//! ```

mod class;
mod options;
mod traversal;

pub use class::SchemaClass;
pub use options::SchemaOptions;
pub use traversal::{Fields, WalkOrder};

use crate::error::{Error, Result};
use crate::field::{Field, FieldSpec};
use crate::types::TypeRegistry;
use log::{debug, info, warn};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

// =============================================================================
// Entries
// =============================================================================

/// Something declared under a key when building a schema
#[derive(Debug)]
pub enum Declaration {
    /// Field spec literal; becomes a field if it has a field spec's shape
    Spec(FieldSpec),
    /// Ready-made field
    Field(Field),
    /// Nested schema
    Schema(Schema),
    /// Plain data; a JSON array shaped like a field spec becomes a field
    Raw(Value),
}

impl From<FieldSpec> for Declaration {
    fn from(spec: FieldSpec) -> Self {
        Self::Spec(spec)
    }
}

impl From<Field> for Declaration {
    fn from(field: Field) -> Self {
        Self::Field(field)
    }
}

impl From<Schema> for Declaration {
    fn from(schema: Schema) -> Self {
        Self::Schema(schema)
    }
}

impl From<Value> for Declaration {
    fn from(value: Value) -> Self {
        Self::Raw(value)
    }
}

/// How a key was classified
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyKind {
    Field,
    NonField,
}

/// A stored schema entry
#[derive(Debug)]
pub enum Entry {
    Field(Arc<Field>),
    Schema(Schema),
    Raw(Value),
}

impl Entry {
    #[must_use]
    pub fn kind(&self) -> KeyKind {
        match self {
            Entry::Field(_) => KeyKind::Field,
            Entry::Schema(_) | Entry::Raw(_) => KeyKind::NonField,
        }
    }

    #[must_use]
    pub fn as_node(&self) -> Node<'_> {
        match self {
            Entry::Field(field) => Node::Field(field),
            Entry::Schema(schema) => Node::Schema(schema),
            Entry::Raw(value) => Node::Raw(value),
        }
    }
}

/// Borrowed result of a path lookup
#[derive(Debug, Clone, Copy)]
pub enum Node<'a> {
    Field(&'a Arc<Field>),
    Schema(&'a Schema),
    /// Plain data, or a value nested inside plain data
    Raw(&'a Value),
}

impl<'a> Node<'a> {
    #[must_use]
    pub fn as_field(&self) -> Option<&'a Arc<Field>> {
        match self {
            Node::Field(field) => Some(field),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_schema(&self) -> Option<&'a Schema> {
        match self {
            Node::Schema(schema) => Some(schema),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_raw(&self) -> Option<&'a Value> {
        match self {
            Node::Raw(value) => Some(value),
            _ => None,
        }
    }

    /// Current value: a field's value, a copy of plain data, or a snapshot
    /// of a nested schema
    #[must_use]
    pub fn value(&self) -> Value {
        match self {
            Node::Field(field) => field.value(),
            Node::Schema(schema) => schema.snapshot(),
            Node::Raw(value) => (*value).clone(),
        }
    }
}

// =============================================================================
// Schema
// =============================================================================

/// Ordered, nestable mapping of keys to fields, nested schemas and plain data
#[derive(Debug)]
pub struct Schema {
    values: HashMap<String, Entry>,
    order: Vec<String>,
    explicit_order: bool,
    description: Option<String>,
    registry: Arc<TypeRegistry>,
}

impl Schema {
    /// Build a schema from declarations, in the order given
    ///
    /// After every entry is assigned, the fallback pairs from `options` are
    /// wired up.
    ///
    /// # Errors
    ///
    /// - [`Error::Validation`] if a field spec describes an invalid field
    /// - [`Error::Construction`] if the explicit order names an undeclared key
    /// - [`Error::FallbackCycle`] if a fallback pair closes a cycle
    /// - [`Error::FallbackPathNotFound`] for an unresolved fallback path, in
    ///   strict mode only
    pub fn new<I, K, D>(entries: I, options: SchemaOptions) -> Result<Self>
    where
        I: IntoIterator<Item = (K, D)>,
        K: Into<String>,
        D: Into<Declaration>,
    {
        let SchemaOptions {
            description,
            order,
            fallback,
            registry,
            strict_fallback,
        } = options;

        let mut schema = Self {
            values: HashMap::new(),
            order: Vec::new(),
            explicit_order: false,
            description,
            registry: registry.unwrap_or_else(TypeRegistry::builtin),
        };

        for (key, declaration) in entries {
            schema.insert(key, declaration)?;
        }
        if let Some(order) = order {
            schema.apply_order(order)?;
        }
        for (source, target) in &fallback {
            schema.route_fallback(source, target, strict_fallback)?;
        }

        info!(
            "Built schema with {} fields and {} other entries",
            schema.fields_count(),
            schema.len() - schema.fields_count()
        );
        Ok(schema)
    }

    /// Build a schema from a JSON mapping
    ///
    /// Arrays shaped like field specs become fields; everything else is
    /// stored as plain data.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Construction`] if `value` is not a mapping, otherwise
    /// the same errors as [`Schema::new`].
    pub fn from_value(value: &Value, options: SchemaOptions) -> Result<Self> {
        let Value::Object(map) = value else {
            return Err(Error::Construction(
                "schema entries must be a mapping".into(),
            ));
        };
        Self::new(
            map.iter().map(|(key, value)| (key.clone(), value.clone())),
            options,
        )
    }

    /// Assign an entry, classifying it as field or non-field
    ///
    /// An existing entry under `key` is replaced in place.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if `declaration` is a field spec that
    /// describes an invalid field.
    pub fn insert(
        &mut self,
        key: impl Into<String>,
        declaration: impl Into<Declaration>,
    ) -> Result<KeyKind> {
        let key = key.into();
        let entry = self.classify(&key, declaration.into())?;
        let kind = entry.kind();

        if self.values.insert(key.clone(), entry).is_some() {
            debug!("Replaced schema entry '{key}'");
        } else if self.explicit_order {
            self.order.push(key);
        } else {
            let at = self.order.binary_search(&key).unwrap_or_else(|at| at);
            self.order.insert(at, key);
        }
        Ok(kind)
    }

    fn classify(&self, key: &str, declaration: Declaration) -> Result<Entry> {
        let spec = match declaration {
            Declaration::Field(field) => return Ok(Entry::Field(Arc::new(field))),
            Declaration::Schema(schema) => return Ok(Entry::Schema(schema)),
            Declaration::Raw(value) => match FieldSpec::from_value(&value) {
                Some(spec) if spec.is_field_spec() => spec,
                _ => return Ok(Entry::Raw(value)),
            },
            Declaration::Spec(spec) => spec,
        };

        match Field::parse(key, &spec, &self.registry)? {
            Some(field) => Ok(Entry::Field(Arc::new(field))),
            None => {
                debug!("Entry '{key}' is not a field spec, storing as plain data");
                Ok(Entry::Raw(Value::Array(spec.args().to_vec())))
            }
        }
    }

    fn apply_order(&mut self, explicit: Vec<String>) -> Result<()> {
        let mut order = Vec::with_capacity(self.values.len());
        for key in explicit {
            if !self.values.contains_key(&key) {
                return Err(Error::Construction(format!(
                    "order names undeclared key '{key}'"
                )));
            }
            if !order.contains(&key) {
                order.push(key);
            }
        }

        let mut rest: Vec<String> = self
            .values
            .keys()
            .filter(|key| !order.contains(key))
            .cloned()
            .collect();
        rest.sort();
        order.extend(rest);

        self.order = order;
        self.explicit_order = true;
        Ok(())
    }

    fn route_fallback(&self, source: &str, target: &str, strict: bool) -> Result<()> {
        match (self.field(source), self.field(target)) {
            (Some(source), Some(target)) => source.set_fallback(&target),
            (found, _) => {
                let missing = if found.is_none() { source } else { target };
                if strict {
                    return Err(Error::FallbackPathNotFound(missing.to_string()));
                }
                warn!("Skipping fallback '{source}' -> '{target}': '{missing}' is not a field");
                Ok(())
            }
        }
    }

    /// Make the field at `source` fall back to the field at `target`
    ///
    /// # Errors
    ///
    /// Returns [`Error::FallbackPathNotFound`] if either path does not lead to
    /// a field, or [`Error::FallbackCycle`] if the link would close a cycle.
    pub fn set_fallback(&self, source: &str, target: &str) -> Result<()> {
        self.route_fallback(source, target, true)
    }

    // =========================================================================
    // Lookup
    // =========================================================================

    /// Look up a dotted path, descending through nested schemas and plain
    /// JSON data
    #[must_use]
    pub fn get(&self, path: &str) -> Option<Node<'_>> {
        let mut segments = path.split('.');
        let mut node = self.values.get(segments.next()?)?.as_node();

        for segment in segments {
            node = match node {
                Node::Schema(schema) => schema.values.get(segment)?.as_node(),
                Node::Raw(Value::Object(map)) => Node::Raw(map.get(segment)?),
                Node::Raw(Value::Array(items)) => {
                    Node::Raw(items.get(segment.parse::<usize>().ok()?)?)
                }
                Node::Field(_) | Node::Raw(_) => return None,
            };
        }
        Some(node)
    }

    /// Field at a dotted path
    #[must_use]
    pub fn field(&self, path: &str) -> Option<Arc<Field>> {
        self.get(path)?.as_field().cloned()
    }

    /// Nested schema at a dotted path
    #[must_use]
    pub fn schema(&self, path: &str) -> Option<&Schema> {
        self.get(path)?.as_schema()
    }

    /// Current value at a dotted path
    #[must_use]
    pub fn value(&self, path: &str) -> Option<Value> {
        self.get(path).map(|node| node.value())
    }

    /// Direct child entry
    #[must_use]
    pub fn entry(&self, key: &str) -> Option<&Entry> {
        self.values.get(key)
    }

    /// Classification of a direct child key
    #[must_use]
    pub fn kind(&self, key: &str) -> Option<KeyKind> {
        self.values.get(key).map(Entry::kind)
    }

    /// Direct child keys in iteration order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn fields_count(&self) -> usize {
        self.values
            .values()
            .filter(|entry| entry.kind() == KeyKind::Field)
            .count()
    }

    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<TypeRegistry> {
        &self.registry
    }

    #[must_use]
    pub fn has_explicit_order(&self) -> bool {
        self.explicit_order
    }

    // =========================================================================
    // Bulk update
    // =========================================================================

    /// Write many values at once
    ///
    /// Keys naming fields get their value set; mappings under keys naming
    /// nested schemas are applied recursively; dotted keys are resolved as
    /// paths. Unknown and non-field keys are ignored with a warning.
    ///
    /// Keys are applied in the mapping's order. Each write is atomic, but an
    /// error stops the update, keeping the writes made before it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Construction`] if `data` is not a mapping, or the
    /// first error raised by a field write.
    pub fn update(&self, data: &Value) -> Result<()> {
        let Value::Object(map) = data else {
            return Err(Error::Construction("update data must be a mapping".into()));
        };

        for (key, value) in map {
            match self.values.get(key) {
                Some(Entry::Field(field)) => field.set_value(value.clone())?,
                Some(Entry::Schema(schema)) if value.is_object() => schema.update(value)?,
                Some(_) => warn!("Ignoring update for non-field key '{key}'"),
                None => match self.field(key) {
                    Some(field) => field.set_value(value.clone())?,
                    None => warn!("Ignoring update for unknown key '{key}'"),
                },
            }
        }
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
