//! Reusable schema templates
//!
//! A [`SchemaClass`] captures a schema's shape once and hands out independent
//! instances. Instances share no mutable state with the template or with each
//! other: every field is copied, and fallback links between fields of the
//! copied tree are re-pointed at the copies.

use super::{Entry, Schema};
use crate::field::Field;
use log::debug;
use std::collections::HashMap;
use std::sync::Arc;

/// Template producing independent copies of a schema
///
/// # Example
///
/// ```rust
/// use fieldtree::{FieldSpec, Schema, SchemaOptions};
/// use serde_json::json;
///
/// let schema = Schema::new(
///     [("retries", FieldSpec::with_default(3, "retry count"))],
///     SchemaOptions::new(),
/// )?;
/// let class = schema.create_class();
///
/// let first = class.instantiate();
/// let second = class.instantiate();
/// first.update(&json!({"retries": 5}))?;
///
/// assert_eq!(first.value("retries"), Some(json!(5)));
/// assert_eq!(second.value("retries"), Some(json!(3)));
/// assert_eq!(schema.value("retries"), Some(json!(3)));
/// # Ok::<(), fieldtree::Error>(())
/// ```
#[derive(Debug)]
pub struct SchemaClass {
    template: Schema,
}

impl SchemaClass {
    /// Produce a fresh, independent schema
    #[must_use]
    pub fn instantiate(&self) -> Schema {
        let schema = self.template.deep_copy();
        debug!("Instantiated schema class ({} entries)", schema.len());
        schema
    }

    /// The captured template
    ///
    /// Mutating fields through it changes the starting point of later
    /// instances, not existing ones.
    #[must_use]
    pub fn template(&self) -> &Schema {
        &self.template
    }
}

type Copies = HashMap<*const Field, Arc<Field>>;

impl Schema {
    /// Capture this schema as a template
    ///
    /// The template is a copy; later changes to `self` do not affect it.
    #[must_use]
    pub fn create_class(&self) -> SchemaClass {
        SchemaClass {
            template: self.deep_copy(),
        }
    }

    /// Copy the whole tree, relinking fallbacks that stay inside it
    ///
    /// Fallback targets outside the tree are kept as they are.
    pub(crate) fn deep_copy(&self) -> Schema {
        let mut copies = Copies::new();
        let schema = self.copy_tree(&mut copies);

        for copy in copies.values() {
            let Some(context) = copy.context() else {
                continue;
            };
            if let Some(target) = copies.get(&Arc::as_ptr(&context.target)) {
                copy.relink(target.clone());
            }
        }
        schema
    }

    fn copy_tree(&self, copies: &mut Copies) -> Schema {
        let mut values = HashMap::with_capacity(self.values.len());
        for (key, entry) in &self.values {
            let entry = match entry {
                Entry::Field(field) => Entry::Field(
                    copies
                        .entry(Arc::as_ptr(field))
                        .or_insert_with(|| Arc::new(field.duplicate()))
                        .clone(),
                ),
                Entry::Schema(nested) => Entry::Schema(nested.copy_tree(copies)),
                Entry::Raw(value) => Entry::Raw(value.clone()),
            };
            values.insert(key.clone(), entry);
        }

        Schema {
            values,
            order: self.order.clone(),
            explicit_order: self.explicit_order,
            description: self.description.clone(),
            registry: self.registry.clone(),
        }
    }
}
