//! Options for building a Schema

use crate::types::TypeRegistry;
use std::sync::Arc;

/// Configuration for [`Schema`](super::Schema) construction
///
/// # Example
/// ```rust
/// use fieldtree::SchemaOptions;
///
/// let options = SchemaOptions::new()
///     .description("Logger settings")
///     .order(["level", "format"])
///     .fallback("file.level", "level")
///     .strict_fallback(true);
///
/// assert_eq!(options.explicit_order(), Some(&["level".to_string(), "format".to_string()][..]));
/// ```
#[derive(Debug, Clone, Default)]
pub struct SchemaOptions {
    pub(crate) description: Option<String>,
    pub(crate) order: Option<Vec<String>>,
    pub(crate) fallback: Vec<(String, String)>,
    pub(crate) registry: Option<Arc<TypeRegistry>>,
    pub(crate) strict_fallback: bool,
}

impl SchemaOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Human-readable description of the schema
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Fixed key order, used verbatim instead of sorting keys
    ///
    /// Keys declared but not listed here follow the listed ones, sorted.
    #[must_use]
    pub fn order<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.order = Some(keys.into_iter().map(Into::into).collect());
        self
    }

    /// Make the field at `source` fall back to the field at `target`
    ///
    /// Both are dotted paths, resolved after every entry is in place.
    #[must_use]
    pub fn fallback(mut self, source: impl Into<String>, target: impl Into<String>) -> Self {
        self.fallback.push((source.into(), target.into()));
        self
    }

    /// Registry used to resolve field types (default: builtin types)
    #[must_use]
    pub fn registry(mut self, registry: Arc<TypeRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Fail construction when a fallback path does not resolve
    ///
    /// By default such pairs are skipped with a warning.
    #[must_use]
    pub fn strict_fallback(mut self, strict: bool) -> Self {
        self.strict_fallback = strict;
        self
    }

    #[must_use]
    pub fn explicit_order(&self) -> Option<&[String]> {
        self.order.as_deref()
    }

    #[must_use]
    pub fn fallback_pairs(&self) -> &[(String, String)] {
        &self.fallback
    }
}
