//! Validator functions for field types
//!
//! A validator looks at a [`Candidate`] (the value a field would expose,
//! plus its name, attributes and behaviour) and either accepts it or returns
//! a single human-readable rule violation. Validators never mutate anything.
//!
//! A type's chain always runs to the end so that every violated rule is
//! reported at once; see [`FieldType::validate`](crate::FieldType::validate).
//!
//! ```rust
//! use fieldtree::validators::{self, Candidate, ValueKind};
//! use fieldtree::Behaviour;
//! use serde_json::{json, Map};
//!
//! let mut attributes = Map::new();
//! attributes.insert("maxlen".into(), json!(3));
//!
//! let value = json!("too long");
//! let candidate = Candidate {
//!     name: "code",
//!     value: &value,
//!     attributes: &attributes,
//!     behaviour: Behaviour::DEFAULT,
//! };
//!
//! assert!(validators::type_check(ValueKind::String)(&candidate).is_ok());
//! assert!(validators::max_length()(&candidate).is_err());
//! ```

use crate::field::Behaviour;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;

/// Type alias for a validator function
pub type Validator = Arc<dyn Fn(&Candidate<'_>) -> Result<(), String> + Send + Sync>;

/// Attribute holding the maximum string length
pub const MAXLEN: &str = "maxlen";
/// Attribute holding the regex a string must match
pub const PATTERN: &str = "pattern";
/// Attribute holding the lower bound of a number
pub const MIN: &str = "min";
/// Attribute holding the upper bound of a number
pub const MAX: &str = "max";

/// What a validator gets to see of a field
#[derive(Debug, Clone, Copy)]
pub struct Candidate<'a> {
    pub name: &'a str,
    pub value: &'a Value,
    pub attributes: &'a Map<String, Value>,
    pub behaviour: Behaviour,
}

impl Candidate<'_> {
    /// Look up a type-specific attribute
    #[must_use]
    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }
}

/// Runtime shape of a value, used for type checks and type inference
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    String,
    Number,
    Boolean,
    Table,
}

impl ValueKind {
    /// Kind of a value, `None` for nil
    #[must_use]
    pub fn of(value: &Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::String(_) => Some(Self::String),
            Value::Number(_) => Some(Self::Number),
            Value::Bool(_) => Some(Self::Boolean),
            Value::Array(_) | Value::Object(_) => Some(Self::Table),
        }
    }

    /// Builtin type id matching this kind
    #[must_use]
    pub fn type_id(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Table => "table",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_id())
    }
}

/// Wrap a closure as a [`Validator`]
pub fn validator<F>(f: F) -> Validator
where
    F: Fn(&Candidate<'_>) -> Result<(), String> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Check the runtime kind of the value.
///
/// Nil passes only when the field is OPTIONAL or FALLBACK.
pub fn type_check(expected: ValueKind) -> Validator {
    validator(move |candidate| match ValueKind::of(candidate.value) {
        Some(kind) if kind == expected => Ok(()),
        Some(kind) => Err(format!("value must be of type '{expected}', got '{kind}'")),
        None if candidate
            .behaviour
            .intersects(Behaviour::OPTIONAL | Behaviour::FALLBACK) =>
        {
            Ok(())
        }
        None => Err("value is required".to_string()),
    })
}

/// Fail when the string is longer than the `maxlen` attribute
pub fn max_length() -> Validator {
    validator(|candidate| {
        let (Some(limit), Some(text)) = (candidate.attribute(MAXLEN), candidate.value.as_str())
        else {
            return Ok(());
        };
        let limit = limit
            .as_u64()
            .ok_or_else(|| format!("attribute '{MAXLEN}' must be a non-negative integer"))?;

        if text.chars().count() as u64 > limit {
            return Err(format!("string length must be lower than {limit}"));
        }
        Ok(())
    })
}

/// Fail when the string does not match the `pattern` attribute
pub fn pattern() -> Validator {
    validator(|candidate| {
        let (Some(pattern), Some(text)) = (candidate.attribute(PATTERN), candidate.value.as_str())
        else {
            return Ok(());
        };
        let pattern = pattern
            .as_str()
            .ok_or_else(|| format!("attribute '{PATTERN}' must be a string"))?;
        let re = regex::Regex::new(pattern)
            .map_err(|e| format!("invalid pattern '{pattern}': {e}"))?;

        if !re.is_match(text) {
            return Err(format!("string must match pattern '{pattern}'"));
        }
        Ok(())
    })
}

/// Fail when the number is outside the `min`/`max` attributes
pub fn range() -> Validator {
    validator(|candidate| {
        let Some(num) = candidate.value.as_f64() else {
            return Ok(());
        };

        if let Some(min) = candidate.attribute(MIN) {
            let min = min
                .as_f64()
                .ok_or_else(|| format!("attribute '{MIN}' must be a number"))?;
            if num < min {
                return Err(format!("number must be at least {min}"));
            }
        }
        if let Some(max) = candidate.attribute(MAX) {
            let max = max
                .as_f64()
                .ok_or_else(|| format!("attribute '{MAX}' must be a number"))?;
            if num > max {
                return Err(format!("number must be at most {max}"));
            }
        }
        Ok(())
    })
}

/// Run every validator in order and collect one line per failure.
///
/// An empty result means the candidate is valid.
pub(crate) fn run_chain(validators: &[Validator], candidate: &Candidate<'_>) -> Vec<String> {
    validators
        .iter()
        .filter_map(|validator| validator(candidate).err())
        .collect()
}

// =============================================================================
// Tests
// =============================================================================
