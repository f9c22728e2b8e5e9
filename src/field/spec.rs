//! Declarative field spec literals
//!
//! A spec is a short positional literal plus optional keyed extras:
//!
//! - `["debug", "severity level"]`: default `"debug"`, description
//!   `"severity level"`.
//! - `[null, "proxy url"]` with an explicit type: no default, OPTIONAL.
//! - `["proxy url"]` with an explicit type or value: OPTIONAL.
//!
//! Anything that does not have this shape is not a field spec. That is not an
//! error: schemas store such entries as plain data.
//!
//! ```rust
//! use fieldtree::{Behaviour, FieldSpec};
//! use serde_json::json;
//!
//! let spec = FieldSpec::with_default("debug", "severity level");
//! let options = spec.parse("severity").unwrap();
//! assert_eq!(options.default, json!("debug"));
//! assert_eq!(options.behaviour, Behaviour::DEFAULT);
//!
//! // a lone description is only a field when it says what type it has
//! assert!(FieldSpec::described("desc only").parse("x").is_none());
//! assert!(FieldSpec::described("desc only").of_type("string").parse("x").is_some());
//! ```

use super::{Behaviour, FallbackContext, Field, FieldOptions, Hook};
use crate::types::validators::ValueKind;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;

/// A field spec literal
#[derive(Clone, Default)]
pub struct FieldSpec {
    args: Vec<Value>,
    field_type: Option<String>,
    value: Option<Value>,
    behaviour: Behaviour,
    hook: Option<Hook>,
    context: Option<FallbackContext>,
    attributes: Map<String, Value>,
}

impl FieldSpec {
    /// Empty spec; add positional elements with [`FieldSpec::arg`]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Spec with a description as its only positional element
    pub fn described(description: impl Into<String>) -> Self {
        Self::new().arg(Value::String(description.into()))
    }

    /// Spec with a default followed by a description
    pub fn with_default(default: impl Into<Value>, description: impl Into<String>) -> Self {
        Self::new()
            .arg(default)
            .arg(Value::String(description.into()))
    }

    /// Read a spec from a JSON array of positional elements.
    ///
    /// Returns `None` for anything but an array.
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        value.as_array().map(|args| Self {
            args: args.clone(),
            ..Self::default()
        })
    }

    // =========================================================================
    // Builder
    // =========================================================================

    /// Append a positional element
    #[must_use]
    pub fn arg(mut self, value: impl Into<Value>) -> Self {
        self.args.push(value.into());
        self
    }

    /// Explicit type id, overriding inference
    #[must_use]
    pub fn of_type(mut self, id: impl Into<String>) -> Self {
        self.field_type = Some(id.into());
        self
    }

    /// Explicit initial value
    #[must_use]
    pub fn value(mut self, value: impl Into<Value>) -> Self {
        self.value = Some(value.into());
        self
    }

    #[must_use]
    pub fn hook<F>(mut self, hook: F) -> Self
    where
        F: Fn(Value) -> Value + Send + Sync + 'static,
    {
        self.hook = Some(Arc::new(hook));
        self
    }

    #[must_use]
    pub fn attr(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn readonly(mut self) -> Self {
        self.behaviour |= Behaviour::READONLY;
        self
    }

    /// Delegate the default to `target` (sets `FALLBACK`)
    #[must_use]
    pub fn fallback(mut self, target: &Arc<Field>) -> Self {
        self.context = Some(FallbackContext::new(target));
        self.behaviour |= Behaviour::FALLBACK;
        self
    }

    /// Attach a context without touching the behaviour flags
    #[must_use]
    pub fn context(mut self, context: FallbackContext) -> Self {
        self.context = Some(context);
        self
    }

    // =========================================================================
    // Classification and parsing
    // =========================================================================

    /// Positional elements, in order
    #[must_use]
    pub fn args(&self) -> &[Value] {
        &self.args
    }

    /// Whether this literal describes a field.
    ///
    /// True when there are one or two positional elements, the last one is a
    /// string, and a lone description comes with a `type` or `value`.
    #[must_use]
    pub fn is_field_spec(&self) -> bool {
        match self.args.as_slice() {
            [Value::String(_)] => self.field_type.is_some() || self.value.is_some(),
            [_, Value::String(_)] => true,
            _ => false,
        }
    }

    /// Normalize into field options, or `None` if this is not a field spec
    #[must_use]
    pub fn parse(&self, name: &str) -> Option<FieldOptions> {
        if !self.is_field_spec() {
            return None;
        }

        let mut behaviour = self.behaviour;
        let (default, description) = match self.args.as_slice() {
            [Value::String(description)] => {
                behaviour |= Behaviour::OPTIONAL;
                (Value::Null, description)
            }
            [default, Value::String(description)] => {
                if default.is_null() {
                    behaviour |= Behaviour::OPTIONAL;
                }
                (default.clone(), description)
            }
            _ => return None,
        };

        let value = self.value.clone().unwrap_or(Value::Null);
        let field_type = self.field_type.clone().or_else(|| {
            let initial = if value.is_null() { &default } else { &value };
            ValueKind::of(initial).map(|kind| kind.type_id().to_string())
        });

        Some(FieldOptions {
            name: Some(name.to_string()),
            description: Some(normalize_description(description)),
            field_type,
            default,
            value,
            behaviour,
            hook: self.hook.clone(),
            attributes: self.attributes.clone(),
            context: self.context.clone(),
        })
    }
}

impl fmt::Debug for FieldSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldSpec")
            .field("args", &self.args)
            .field("field_type", &self.field_type)
            .field("value", &self.value)
            .field("behaviour", &self.behaviour)
            .field("hook", &self.hook.as_ref().map(|_| "Some(Fn)"))
            .field("context", &self.context)
            .field("attributes", &self.attributes)
            .finish()
    }
}

/// Whether an untyped value is a field spec literal
#[must_use]
pub fn is_field_spec(value: &Value) -> bool {
    FieldSpec::from_value(value).is_some_and(|spec| spec.is_field_spec())
}

/// Trim every line and drop blank lines at both ends.
///
/// Lets descriptions be written as indented multi-line literals.
#[must_use]
pub fn normalize_description(text: &str) -> String {
    let lines: Vec<&str> = text.lines().map(str::trim).collect();
    let start = lines.iter().position(|line| !line.is_empty());
    let end = lines.iter().rposition(|line| !line.is_empty());

    match (start, end) {
        (Some(start), Some(end)) => lines[start..=end].join("\n"),
        _ => String::new(),
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_and_description() {
        let options = FieldSpec::with_default("debug", "severity level")
            .parse("severity")
            .unwrap();

        assert_eq!(options.name.as_deref(), Some("severity"));
        assert_eq!(options.description.as_deref(), Some("severity level"));
        assert_eq!(options.default, json!("debug"));
        assert_eq!(options.field_type.as_deref(), Some("string"));
        assert_eq!(options.behaviour, Behaviour::DEFAULT);
        assert!(options.value.is_null());
    }

    #[test]
    fn test_description_only_needs_type_or_value() {
        assert!(!FieldSpec::described("desc only").is_field_spec());
        assert!(FieldSpec::described("desc only").parse("x").is_none());

        let typed = FieldSpec::described("desc only").of_type("number");
        let options = typed.parse("x").unwrap();
        assert_eq!(options.behaviour, Behaviour::OPTIONAL);
        assert!(options.default.is_null());

        let valued = FieldSpec::described("desc only").value(5);
        let options = valued.parse("x").unwrap();
        assert_eq!(options.field_type.as_deref(), Some("number"));
        assert_eq!(options.value, json!(5));
        assert!(options.behaviour.contains(Behaviour::OPTIONAL));
    }

    #[test]
    fn test_nil_default_is_optional() {
        let options = FieldSpec::with_default(Value::Null, "proxy")
            .of_type("string")
            .parse("proxy")
            .unwrap();

        assert_eq!(options.behaviour, Behaviour::OPTIONAL);
    }

    #[test]
    fn test_explicit_type_wins_over_inference() {
        let options = FieldSpec::with_default(json!([1, 2]), "ids")
            .of_type("custom")
            .parse("ids")
            .unwrap();
        assert_eq!(options.field_type.as_deref(), Some("custom"));
    }

    #[test]
    fn test_shape_rules() {
        assert!(!FieldSpec::new().is_field_spec());
        // description must come last
        assert!(!FieldSpec::new().arg("desc").arg(5).is_field_spec());
        assert!(!FieldSpec::new().arg(1).arg(2).arg("desc").is_field_spec());
        assert!(FieldSpec::new().arg(false).arg("flag").is_field_spec());
    }

    #[test]
    fn test_from_value() {
        assert!(is_field_spec(&json!(["debug", "severity level"])));
        assert!(is_field_spec(&json!([null, "nothing yet"])));
        assert!(!is_field_spec(&json!(["desc only"])));
        assert!(!is_field_spec(&json!({"default": 1, "description": "x"})));
        assert!(!is_field_spec(&json!("plain string")));
    }

    #[test]
    fn test_extras_ride_along() {
        let options = FieldSpec::with_default("abc", "code")
            .attr("maxlen", 8)
            .readonly()
            .hook(|v| v)
            .parse("code")
            .unwrap();

        assert_eq!(options.attributes.get("maxlen"), Some(&json!(8)));
        assert!(options.behaviour.contains(Behaviour::READONLY));
        assert!(options.hook.is_some());
    }

    #[test]
    fn test_normalize_description() {
        let text = "
            First line
              indented second line

            after a gap
        ";
        assert_eq!(
            normalize_description(text),
            "First line\nindented second line\n\nafter a gap"
        );
        assert_eq!(normalize_description("  single  "), "single");
        assert_eq!(normalize_description("\n \n"), "");
    }
}
