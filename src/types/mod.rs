//! Field types and the type registry
//!
//! A [`FieldType`] is a named validation contract: an ordered validator chain
//! plus the set of extra attributes fields of that type may carry. Types live
//! in a [`TypeRegistry`]; a fresh registry is always seeded with the four
//! builtin types (`string`, `number`, `boolean`, `table`).
//!
//! Registries are ordinary values. Share one between schemas by wrapping it in
//! an `Arc`; nothing here is process-wide mutable state.
//!
//! ```rust
//! use fieldtree::{TypeOptions, TypeRegistry, validators};
//! use fieldtree::validators::ValueKind;
//!
//! let mut registry = TypeRegistry::new();
//! registry.register(
//!     "port",
//!     "TCP port number",
//!     vec![
//!         validators::type_check(ValueKind::Number),
//!         validators::validator(|c| match c.value.as_u64() {
//!             Some(1..=65535) | None => Ok(()),
//!             _ => Err("port must be between 1 and 65535".into()),
//!         }),
//!     ],
//!     TypeOptions::new(),
//! )?;
//!
//! assert!(registry.is_valid_type("port"));
//! assert!(registry.register("port", "again", vec![], TypeOptions::new()).is_err());
//! # Ok::<(), fieldtree::Error>(())
//! ```

pub mod validators;

use crate::error::{Error, Result};
use log::info;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::{Arc, LazyLock};
use validators::{Candidate, Validator, ValueKind};

// =============================================================================
// Builtin Type Ids
// =============================================================================

/// Ids of the types every registry is seeded with
pub mod ids {
    pub const STRING: &str = "string";
    pub const NUMBER: &str = "number";
    pub const BOOLEAN: &str = "boolean";
    pub const TABLE: &str = "table";
}

static BUILTIN: LazyLock<Arc<TypeRegistry>> = LazyLock::new(|| Arc::new(TypeRegistry::new()));

// =============================================================================
// Field Type
// =============================================================================

/// A registered validation contract
pub struct FieldType {
    id: String,
    description: String,
    validators: Vec<Validator>,
    attributes: BTreeSet<String>,
}

impl FieldType {
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Validators in registration order
    #[must_use]
    pub fn validators(&self) -> &[Validator] {
        &self.validators
    }

    /// Extra attributes fields of this type may carry
    pub fn attributes(&self) -> impl Iterator<Item = &str> {
        self.attributes.iter().map(String::as_str)
    }

    /// Whether a field of this type may carry the given attribute
    #[must_use]
    pub fn permits(&self, attribute: &str) -> bool {
        self.attributes.contains(attribute)
    }

    /// Run the whole chain, returning one line per violated rule
    #[must_use]
    pub fn validate(&self, candidate: &Candidate<'_>) -> Vec<String> {
        validators::run_chain(&self.validators, candidate)
    }
}

impl fmt::Debug for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldType")
            .field("id", &self.id)
            .field("description", &self.description)
            .field("validators", &self.validators.len())
            .field("attributes", &self.attributes)
            .finish()
    }
}

/// Options for registering a new type
#[derive(Debug, Clone, Default)]
pub struct TypeOptions {
    attributes: Vec<String>,
}

impl TypeOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Permit an extra attribute on fields of this type
    #[must_use]
    pub fn attribute(mut self, name: impl Into<String>) -> Self {
        self.attributes.push(name.into());
        self
    }

    /// Permit several extra attributes at once
    #[must_use]
    pub fn attributes<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attributes.extend(names.into_iter().map(Into::into));
        self
    }
}

// =============================================================================
// Type Registry
// =============================================================================

/// Lookup table from type id to [`FieldType`]
#[derive(Debug, Clone)]
pub struct TypeRegistry {
    types: BTreeMap<String, Arc<FieldType>>,
}

impl TypeRegistry {
    /// Create a registry seeded with the builtin types
    #[must_use]
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.seed(
            ids::STRING,
            "UTF-8 text, optionally bounded by `maxlen` and matched against `pattern`",
            vec![
                validators::type_check(ValueKind::String),
                validators::max_length(),
                validators::pattern(),
            ],
            &[validators::MAXLEN, validators::PATTERN],
        );
        registry.seed(
            ids::NUMBER,
            "Integer or floating point number, optionally bounded by `min` and `max`",
            vec![validators::type_check(ValueKind::Number), validators::range()],
            &[validators::MIN, validators::MAX],
        );
        registry.seed(
            ids::BOOLEAN,
            "true or false",
            vec![validators::type_check(ValueKind::Boolean)],
            &[],
        );
        registry.seed(
            ids::TABLE,
            "List or mapping of arbitrary values",
            vec![validators::type_check(ValueKind::Table)],
            &[],
        );
        registry
    }

    /// Create a registry without any types
    #[must_use]
    pub fn empty() -> Self {
        Self {
            types: BTreeMap::new(),
        }
    }

    /// Shared, read-only registry holding only the builtin types
    #[must_use]
    pub fn builtin() -> Arc<TypeRegistry> {
        BUILTIN.clone()
    }

    fn seed(&mut self, id: &str, description: &str, validators: Vec<Validator>, attrs: &[&str]) {
        self.types.insert(
            id.to_string(),
            Arc::new(FieldType {
                id: id.to_string(),
                description: description.to_string(),
                validators,
                attributes: attrs.iter().map(|a| (*a).to_string()).collect(),
            }),
        );
    }

    /// Register a new type
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateType`] if `id` is already registered.
    pub fn register(
        &mut self,
        id: impl Into<String>,
        description: impl Into<String>,
        validators: Vec<Validator>,
        options: TypeOptions,
    ) -> Result<Arc<FieldType>> {
        let id = id.into();
        if self.types.contains_key(&id) {
            return Err(Error::DuplicateType(id));
        }

        let field_type = Arc::new(FieldType {
            id: id.clone(),
            description: description.into(),
            validators,
            attributes: options.attributes.into_iter().collect(),
        });
        info!(
            "Registered field type '{id}' ({} validators)",
            field_type.validators.len()
        );
        self.types.insert(id, field_type.clone());
        Ok(field_type)
    }

    /// Look up a type by id
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownType`] if `id` is not registered.
    pub fn get(&self, id: &str) -> Result<Arc<FieldType>> {
        self.types
            .get(id)
            .cloned()
            .ok_or_else(|| Error::UnknownType(id.to_string()))
    }

    /// Whether `id` names a registered type
    #[must_use]
    pub fn is_valid_type(&self, id: &str) -> bool {
        self.types.contains_key(id)
    }

    /// Registered ids in sorted order
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }

    /// Registered types in id order
    pub fn types(&self) -> impl Iterator<Item = &Arc<FieldType>> {
        self.types.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.types.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Tests
// =============================================================================
