//! Ordered iteration and recursive walks over a schema's fields

use super::{Entry, Schema};
use crate::field::Field;
use serde_json::{Map, Value};
use std::sync::Arc;

/// Order in which [`Schema::walk`] visits a schema's own fields relative to
/// its nested schemas
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WalkOrder {
    /// Nested schemas first, then the schema's own fields
    #[default]
    PostOrder,
    /// Own fields first, then nested schemas
    PreOrder,
}

/// Iterator over the direct fields of a schema
///
/// Yields `(key, field)` pairs in order, skipping non-field entries and
/// fields whose current value is nil. Each call to [`Schema::fields`] starts
/// a fresh iteration.
pub struct Fields<'a> {
    schema: &'a Schema,
    keys: Vec<&'a str>,
    next: usize,
}

impl<'a> Iterator for Fields<'a> {
    type Item = (&'a str, &'a Arc<Field>);

    fn next(&mut self) -> Option<Self::Item> {
        let schema = self.schema;
        while let Some(&key) = self.keys.get(self.next) {
            self.next += 1;
            if let Some(Entry::Field(field)) = schema.values.get(key) {
                if !field.value().is_null() {
                    return Some((key, field));
                }
            }
        }
        None
    }
}

impl Schema {
    /// Iterate direct fields in the schema's key order
    #[must_use]
    pub fn fields(&self) -> Fields<'_> {
        Fields {
            schema: self,
            keys: self.order.iter().map(String::as_str).collect(),
            next: 0,
        }
    }

    /// Iterate direct fields in the given key order
    ///
    /// Keys that are not present are skipped.
    #[must_use]
    pub fn fields_in<'a, S: AsRef<str>>(&'a self, order: &'a [S]) -> Fields<'a> {
        Fields {
            schema: self,
            keys: order.iter().map(|key| key.as_ref()).collect(),
            next: 0,
        }
    }

    /// Visit every non-nil field of this schema and all nested schemas
    ///
    /// The visitor receives the dotted path of each field. Nested schemas are
    /// visited in key order; `order` decides whether a schema's own fields
    /// come before or after its nested schemas. The order is taken first so
    /// the visitor closure can be written last at the call site.
    ///
    /// ```rust
    /// use fieldtree::{Declaration, FieldSpec, Schema, SchemaOptions, WalkOrder};
    ///
    /// let inner = Schema::new(
    ///     [("port", FieldSpec::with_default(5432, "port"))],
    ///     SchemaOptions::new(),
    /// )?;
    /// let outer = Schema::new(
    ///     [
    ///         ("db", Declaration::from(inner)),
    ///         ("name", FieldSpec::with_default("app", "name").into()),
    ///     ],
    ///     SchemaOptions::new(),
    /// )?;
    ///
    /// let mut paths = Vec::new();
    /// outer.walk(WalkOrder::PostOrder, |path, _| paths.push(path.to_string()));
    /// assert_eq!(paths, ["db.port", "name"]);
    ///
    /// paths.clear();
    /// outer.walk(WalkOrder::PreOrder, |path, _| paths.push(path.to_string()));
    /// assert_eq!(paths, ["name", "db.port"]);
    /// # Ok::<(), fieldtree::Error>(())
    /// ```
    pub fn walk<F>(&self, order: WalkOrder, mut visitor: F)
    where
        F: FnMut(&str, &Arc<Field>),
    {
        self.walk_at("", order, &mut visitor);
    }

    fn walk_at(
        &self,
        prefix: &str,
        order: WalkOrder,
        visitor: &mut dyn FnMut(&str, &Arc<Field>),
    ) {
        if order == WalkOrder::PreOrder {
            self.visit_fields(prefix, visitor);
        }
        for key in &self.order {
            if let Some(Entry::Schema(nested)) = self.values.get(key) {
                nested.walk_at(&join(prefix, key), order, visitor);
            }
        }
        if order == WalkOrder::PostOrder {
            self.visit_fields(prefix, visitor);
        }
    }

    fn visit_fields(&self, prefix: &str, visitor: &mut dyn FnMut(&str, &Arc<Field>)) {
        for (key, field) in self.fields() {
            visitor(&join(prefix, key), field);
        }
    }

    /// Nested mapping of every field's current value
    ///
    /// Nested schemas become nested mappings. Plain data is left out; nil
    /// values are kept so the result mirrors the schema's shape.
    #[must_use]
    pub fn snapshot(&self) -> Value {
        let mut map = Map::new();
        for key in &self.order {
            match self.values.get(key) {
                Some(Entry::Field(field)) => {
                    map.insert(key.clone(), field.value());
                }
                Some(Entry::Schema(nested)) => {
                    map.insert(key.clone(), nested.snapshot());
                }
                Some(Entry::Raw(_)) | None => {}
            }
        }
        Value::Object(map)
    }
}

fn join(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}.{key}")
    }
}
