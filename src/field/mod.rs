//! Fields: named, typed, validated configuration values
//!
//! # Value resolution
//!
//! A field keeps a default and an optional override. Reading [`Field::value`]
//! resolves in this order:
//!
//! 1. the override, if one was written;
//! 2. otherwise the default, or, when the field has the `FALLBACK` flag, the
//!    current value of its fallback target (re-read on every access).
//!
//! A hook, when present, transforms the resolved value before it is returned.
//! The one exception is a `FALLBACK` field without an override: the target's
//! value is returned as-is, because the target already applied its own hook.
//!
//! | override | FALLBACK | returned           |
//! |----------|----------|--------------------|
//! | no       | no       | `hook(default)`    |
//! | yes      | no       | `hook(override)`   |
//! | no       | yes      | `target.value()`   |
//! | yes      | yes      | `hook(override)`   |
//!
//! # Example
//!
//! ```rust
//! use fieldtree::{Field, FieldOptions};
//! use serde_json::json;
//!
//! let level = Field::new(
//!     FieldOptions::new("level", "log level").default_value("info"),
//! )?;
//! assert_eq!(level.value(), json!("info"));
//!
//! level.set_value("debug")?;
//! assert_eq!(level.value(), json!("debug"));
//!
//! // writing nil drops the override again
//! level.set_value(serde_json::Value::Null)?;
//! assert_eq!(level.value(), json!("info"));
//!
//! // a wrongly typed write is rejected and leaves the field untouched
//! assert!(level.set_value(42).is_err());
//! assert_eq!(level.value(), json!("info"));
//! # Ok::<(), fieldtree::Error>(())
//! ```

mod behaviour;
pub mod spec;

pub use behaviour::Behaviour;
pub use spec::FieldSpec;

use crate::error::{Error, Result};
use crate::sync::{MutexExt, RwLockExt};
use crate::types::validators::{Candidate, ValueKind};
use crate::types::{FieldType, TypeRegistry};
use log::debug;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::{Arc, Mutex, RwLock};

/// Transform applied to a resolved value on read
pub type Hook = Arc<dyn Fn(Value) -> Value + Send + Sync>;

/// Name used in error messages for fields constructed without a name
const UNNAMED: &str = "<unnamed>";

/// Serializes fallback rewiring so the cycle walk and the commit are one step
static LINKS: Mutex<()> = Mutex::new(());

// =============================================================================
// Fallback Context
// =============================================================================

/// Live reference to the field a `FALLBACK` field delegates its default to
#[derive(Clone)]
pub struct FallbackContext {
    pub target: Arc<Field>,
}

impl FallbackContext {
    #[must_use]
    pub fn new(target: &Arc<Field>) -> Self {
        Self {
            target: target.clone(),
        }
    }
}

impl fmt::Debug for FallbackContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FallbackContext")
            .field("target", &self.target.name())
            .finish()
    }
}

// =============================================================================
// Field Options
// =============================================================================

/// Canonical options a [`Field`] is constructed from
///
/// `Value::Null` in `default` or `value` means "not given".
#[derive(Clone, Default)]
pub struct FieldOptions {
    pub name: Option<String>,
    pub description: Option<String>,
    pub field_type: Option<String>,
    pub default: Value,
    pub value: Value,
    pub behaviour: Behaviour,
    pub hook: Option<Hook>,
    pub attributes: Map<String, Value>,
    pub context: Option<FallbackContext>,
}

impl FieldOptions {
    /// Options with the two mandatory parts filled in
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            description: Some(description.into()),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn default_value(mut self, default: impl Into<Value>) -> Self {
        self.default = default.into();
        self
    }

    #[must_use]
    pub fn value(mut self, value: impl Into<Value>) -> Self {
        self.value = value.into();
        self
    }

    #[must_use]
    pub fn field_type(mut self, id: impl Into<String>) -> Self {
        self.field_type = Some(id.into());
        self
    }

    #[must_use]
    pub fn behaviour(mut self, behaviour: Behaviour) -> Self {
        self.behaviour |= behaviour;
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
    pub fn attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Delegate the default to `target` (sets `FALLBACK`)
    #[must_use]
    pub fn fallback(mut self, target: &Arc<Field>) -> Self {
        self.context = Some(FallbackContext::new(target));
        self.behaviour |= Behaviour::FALLBACK;
        self
    }
}

impl fmt::Debug for FieldOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldOptions")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("field_type", &self.field_type)
            .field("default", &self.default)
            .field("value", &self.value)
            .field("behaviour", &self.behaviour)
            .field("hook", &self.hook.as_ref().map(|_| "Some(Fn)"))
            .field("attributes", &self.attributes)
            .field("context", &self.context)
            .finish()
    }
}

impl TryFrom<&Value> for FieldOptions {
    type Error = Error;

    /// Read options from an untyped mapping.
    ///
    /// Recognised keys: `name`, `description`, `type`, `default`, `value`,
    /// `behaviour` (integer bitmask) and `attributes` (mapping). Keys of the
    /// wrong JSON type are treated as absent and reported by base validation.
    fn try_from(value: &Value) -> Result<Self> {
        let Value::Object(map) = value else {
            return Err(Error::Construction(format!(
                "field options must be a mapping, got {}",
                ValueKind::of(value).map_or("nil", ValueKind::type_id)
            )));
        };

        let text = |key: &str| map.get(key).and_then(Value::as_str).map(String::from);
        let attributes = match map.get("attributes") {
            None | Some(Value::Null) => Map::new(),
            Some(Value::Object(attrs)) => attrs.clone(),
            Some(_) => {
                return Err(Error::Construction(
                    "field attributes must be a mapping".into(),
                ));
            }
        };

        Ok(Self {
            name: text("name"),
            description: text("description"),
            field_type: text("type"),
            default: map.get("default").cloned().unwrap_or(Value::Null),
            value: map.get("value").cloned().unwrap_or(Value::Null),
            behaviour: Behaviour::from_value(map.get("behaviour").unwrap_or(&Value::Null)),
            hook: None,
            attributes,
            context: None,
        })
    }
}

// =============================================================================
// Field
// =============================================================================

/// Override slot: distinct from every legitimate value, nil included
#[derive(Debug, Clone, PartialEq)]
enum Override {
    Unset,
    Value(Value),
}

#[derive(Clone)]
struct FieldState {
    default: Value,
    overridden: Override,
    behaviour: Behaviour,
    hook: Option<Hook>,
    context: Option<FallbackContext>,
}

impl FieldState {
    fn fallback_target(&self) -> Option<&Arc<Field>> {
        if self.behaviour.contains(Behaviour::FALLBACK) {
            self.context.as_ref().map(|ctx| &ctx.target)
        } else {
            None
        }
    }

    /// Whether the value comes from the fallback target as-is
    fn delegates(&self) -> bool {
        self.overridden == Override::Unset && self.fallback_target().is_some()
    }

    /// Hooked default, ignoring override and fallback
    fn own_value(&self) -> Value {
        match &self.hook {
            Some(hook) => hook(self.default.clone()),
            None => self.default.clone(),
        }
    }

    fn resolve(&self) -> Value {
        let fallback = self.behaviour.contains(Behaviour::FALLBACK);
        let raw = match &self.overridden {
            Override::Value(value) => value.clone(),
            Override::Unset => match self.fallback_target() {
                Some(target) => target.value(),
                None => self.default.clone(),
            },
        };

        // the fallback target already applied its own hook
        let suppressed = fallback && self.overridden == Override::Unset;
        match &self.hook {
            Some(hook) if !suppressed => hook(raw),
            _ => raw,
        }
    }
}

/// A validated, mutable configuration value
///
/// Fields are shared as `Arc<Field>`; all mutation goes through `&self`.
pub struct Field {
    name: String,
    description: String,
    field_type: Arc<FieldType>,
    attributes: Map<String, Value>,
    state: RwLock<FieldState>,
}

impl Field {
    /// Construct a field against the builtin types
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] listing every violated base or type rule.
    pub fn new(options: FieldOptions) -> Result<Self> {
        Self::with_registry(options, &TypeRegistry::builtin())
    }

    /// Construct a field, resolving its type in `registry`
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] listing every violated base or type rule.
    pub fn with_registry(options: FieldOptions, registry: &TypeRegistry) -> Result<Self> {
        let FieldOptions {
            name,
            description,
            field_type,
            default,
            value,
            mut behaviour,
            hook,
            attributes,
            context,
        } = options;

        let initial = if value.is_null() { &default } else { &value };
        let type_id = field_type
            .or_else(|| ValueKind::of(initial).map(|kind| kind.type_id().to_string()));
        if default.is_null() && value.is_null() {
            behaviour |= Behaviour::OPTIONAL;
        }

        // Base rules
        let mut errors = Vec::new();
        let name = name.filter(|n| !n.is_empty());
        if name.is_none() {
            errors.push("name is required".to_string());
        }
        if description.is_none() {
            errors.push("description is required".to_string());
        }
        let resolved = match type_id.as_deref() {
            None => {
                errors.push("type is required".to_string());
                None
            }
            Some(id) => match registry.get(id) {
                Ok(field_type) => Some(field_type),
                Err(_) => {
                    errors.push(format!("unknown type '{id}'"));
                    None
                }
            },
        };
        if let Some(field_type) = &resolved {
            for key in attributes.keys().filter(|key| !field_type.permits(key)) {
                errors.push(format!(
                    "attribute '{key}' is not supported by type '{}'",
                    field_type.id()
                ));
            }
        }
        if behaviour.contains(Behaviour::FALLBACK) && context.is_none() {
            errors.push("fallback behaviour requires a context target".to_string());
        }

        let (Some(name), Some(description), Some(field_type)) = (name, description, resolved)
        else {
            return Err(Error::Validation {
                field: UNNAMED.to_string(),
                errors,
                value: initial.clone(),
            });
        };
        if !errors.is_empty() {
            return Err(Error::Validation {
                field: name,
                errors,
                value: initial.clone(),
            });
        }

        let field = Self {
            name,
            description,
            field_type,
            attributes,
            state: RwLock::new(FieldState {
                default,
                overridden: if value.is_null() {
                    Override::Unset
                } else {
                    Override::Value(value)
                },
                behaviour,
                hook,
                context,
            }),
        };

        // Type rules
        field.check(&field.state.read_recovered())?;
        debug!(
            "Constructed field '{}' of type '{}'",
            field.name,
            field.field_type.id()
        );
        Ok(field)
    }

    /// Construct a field from an untyped options mapping
    ///
    /// # Errors
    ///
    /// Returns [`Error::Construction`] if `value` is not a mapping, otherwise
    /// the same errors as [`Field::with_registry`].
    pub fn from_value(value: &Value, registry: &TypeRegistry) -> Result<Self> {
        Self::with_registry(FieldOptions::try_from(value)?, registry)
    }

    /// Parse a spec literal and construct the field it describes
    ///
    /// Returns `Ok(None)` when `spec` is not a field spec at all.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] when `spec` is a field spec but the field
    /// it describes is invalid.
    pub fn parse(name: &str, spec: &FieldSpec, registry: &TypeRegistry) -> Result<Option<Self>> {
        spec.parse(name)
            .map(|options| Self::with_registry(options, registry))
            .transpose()
    }

    /// Validate the resolved value
    ///
    /// A value delegated to the fallback target is the target's to validate.
    fn check(&self, state: &FieldState) -> Result<()> {
        if state.delegates() {
            return Ok(());
        }
        self.check_value(state.resolve(), state.behaviour)
    }

    fn check_value(&self, value: Value, behaviour: Behaviour) -> Result<()> {
        let errors = self.field_type.validate(&Candidate {
            name: &self.name,
            value: &value,
            attributes: &self.attributes,
            behaviour,
        });

        if errors.is_empty() {
            Ok(())
        } else {
            Err(Error::Validation {
                field: self.name.clone(),
                errors,
                value,
            })
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Id of this field's type
    #[must_use]
    pub fn type_id(&self) -> &str {
        self.field_type.id()
    }

    #[must_use]
    pub fn field_type(&self) -> &Arc<FieldType> {
        &self.field_type
    }

    #[must_use]
    pub fn attributes(&self) -> &Map<String, Value> {
        &self.attributes
    }

    #[must_use]
    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    /// Current effective value (`Null` when nothing resolves)
    #[must_use]
    pub fn value(&self) -> Value {
        self.state.read_recovered().resolve()
    }

    /// The override, if one is set
    #[must_use]
    pub fn override_value(&self) -> Option<Value> {
        match &self.state.read_recovered().overridden {
            Override::Value(value) => Some(value.clone()),
            Override::Unset => None,
        }
    }

    /// Whether an override is set
    #[must_use]
    pub fn is_overridden(&self) -> bool {
        self.state.read_recovered().overridden != Override::Unset
    }

    /// The declared default (not fallback-resolved, not hooked)
    #[must_use]
    pub fn default(&self) -> Value {
        self.state.read_recovered().default.clone()
    }

    // =========================================================================
    // Mutation
    // =========================================================================

    /// Write an override; `Null` drops the override instead
    ///
    /// The write is validated before it becomes visible. On failure the field
    /// keeps its previous state. Dropping the override of a `FALLBACK` field
    /// always succeeds, since the value then belongs to the target.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ReadOnly`] for `READONLY` fields and
    /// [`Error::Validation`] when the resulting value breaks a type rule.
    pub fn set_value(&self, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        let mut state = self.state.write_recovered();
        if state.behaviour.contains(Behaviour::READONLY) {
            return Err(Error::ReadOnly(self.name.clone()));
        }

        let next = if value.is_null() {
            Override::Unset
        } else {
            Override::Value(value)
        };
        let previous = std::mem::replace(&mut state.overridden, next);
        if let Err(e) = self.check(&state) {
            state.overridden = previous;
            return Err(e);
        }

        debug!("Field '{}' set to {:?}", self.name, state.overridden);
        Ok(())
    }

    /// Drop the override so the value reverts to default or fallback
    ///
    /// # Errors
    ///
    /// Same as [`Field::set_value`] with `Null`.
    pub fn reset(&self) -> Result<()> {
        self.set_value(Value::Null)
    }

    /// Replace the default
    ///
    /// The new default is validated on its own (with the hook applied),
    /// whatever the override or fallback target currently hold.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] when the default breaks a type rule; the
    /// old default is kept.
    pub fn set_default(&self, default: impl Into<Value>) -> Result<()> {
        let mut state = self.state.write_recovered();
        let previous = std::mem::replace(&mut state.default, default.into());
        if let Err(e) = self.check_value(state.own_value(), state.behaviour) {
            state.default = previous;
            return Err(e);
        }
        Ok(())
    }

    /// Replace or remove the read hook
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] when the hooked value breaks a type rule;
    /// the old hook is kept.
    pub fn set_hook(&self, hook: Option<Hook>) -> Result<()> {
        let mut state = self.state.write_recovered();
        let previous = std::mem::replace(&mut state.hook, hook);
        if let Err(e) = self.check(&state) {
            state.hook = previous;
            return Err(e);
        }
        Ok(())
    }

    #[must_use]
    pub fn has_hook(&self) -> bool {
        self.state.read_recovered().hook.is_some()
    }

    // =========================================================================
    // Behaviour flags
    // =========================================================================

    #[must_use]
    pub fn behaviour(&self) -> Behaviour {
        self.state.read_recovered().behaviour
    }

    /// Whether every bit of `flag` is set
    #[must_use]
    pub fn has_flag(&self, flag: Behaviour) -> bool {
        self.state.read_recovered().behaviour.contains(flag)
    }

    pub fn set_flag(&self, flag: Behaviour) {
        self.state.write_recovered().behaviour |= flag;
    }

    pub fn clear_flag(&self, flag: Behaviour) {
        self.state.write_recovered().behaviour.remove(flag);
    }

    // =========================================================================
    // Fallback
    // =========================================================================

    /// Delegate this field's default to `target`
    ///
    /// Sets `FALLBACK` and stores a live reference to `target`; later changes
    /// to `target` show up in this field's value immediately.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FallbackCycle`] if `target` is this field or already
    /// links (directly or transitively) to it. Links whose `FALLBACK` flag is
    /// cleared still count, so re-setting the flag can never close a cycle.
    pub fn set_fallback(&self, target: &Arc<Field>) -> Result<()> {
        let _links = LINKS.lock_recovered();
        let mut current = Some(target.clone());
        while let Some(node) = current {
            if std::ptr::eq(Arc::as_ptr(&node), self) {
                return Err(Error::FallbackCycle {
                    field: self.name.clone(),
                    target: target.name.clone(),
                });
            }
            current = node.context().map(|ctx| ctx.target);
        }

        let mut state = self.state.write_recovered();
        state.behaviour |= Behaviour::FALLBACK;
        state.context = Some(FallbackContext::new(target));
        debug!("Field '{}' falls back to '{}'", self.name, target.name);
        Ok(())
    }

    /// Target of an active fallback (requires the `FALLBACK` flag)
    #[must_use]
    pub fn fallback_target(&self) -> Option<Arc<Field>> {
        self.state.read_recovered().fallback_target().cloned()
    }

    #[must_use]
    pub fn context(&self) -> Option<FallbackContext> {
        self.state.read_recovered().context.clone()
    }

    // =========================================================================
    // Copying
    // =========================================================================

    /// Independent copy sharing no mutable state.
    ///
    /// The copy's fallback context still points at the original target;
    /// callers copying a whole tree relink it afterwards.
    pub(crate) fn duplicate(&self) -> Self {
        Self {
            name: self.name.clone(),
            description: self.description.clone(),
            field_type: self.field_type.clone(),
            attributes: self.attributes.clone(),
            state: RwLock::new(self.state.read_recovered().clone()),
        }
    }

    pub(crate) fn relink(&self, target: Arc<Field>) {
        if let Some(context) = self.state.write_recovered().context.as_mut() {
            context.target = target;
        }
    }

    // =========================================================================
    // Introspection
    // =========================================================================

    /// Snapshot of this field's definition and current state
    #[must_use]
    pub fn describe(&self) -> FieldInfo {
        let state = self.state.read_recovered();
        FieldInfo {
            name: self.name.clone(),
            description: self.description.clone(),
            field_type: self.field_type.id().to_string(),
            default: state.default.clone(),
            value: state.resolve(),
            overridden: state.overridden != Override::Unset,
            behaviour: state.behaviour,
            attributes: self.attributes.clone(),
            fallback: state.fallback_target().map(|target| target.name.clone()),
        }
    }
}

impl fmt::Debug for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.read_recovered();
        f.debug_struct("Field")
            .field("name", &self.name)
            .field("type", &self.field_type.id())
            .field("default", &state.default)
            .field("override", &state.overridden)
            .field("behaviour", &state.behaviour)
            .field("hook", &state.hook.as_ref().map(|_| "Some(Fn)"))
            .field("context", &state.context)
            .finish()
    }
}

/// Serializable snapshot of a field
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldInfo {
    pub name: String,
    pub description: String,
    #[serde(rename = "type")]
    pub field_type: String,
    pub default: Value,
    pub value: Value,
    pub overridden: bool,
    pub behaviour: Behaviour,
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub attributes: Map<String, Value>,
    /// Name of the fallback target, if the field falls back
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback: Option<String>,
}

// =============================================================================
// Tests
// =============================================================================
