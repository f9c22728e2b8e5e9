//! Fallback Integration Tests
//!
//! Live propagation through fallback chains, hooks along the chain,
//! cycle rejection and strict path resolution.

mod common;

use common::{logger_schema, logger_schema_with, string_field};
use fieldtree::{
    Behaviour, Declaration, Error, Field, FieldOptions, FieldSpec, Schema, SchemaOptions,
};
use serde_json::{Value, json};
use std::sync::Arc;

#[test]
fn test_propagation_through_schema() {
    let schema = logger_schema();

    assert_eq!(schema.value("file.level"), Some(json!("info")));

    schema.update(&json!({"level": "warn"})).unwrap();
    assert_eq!(schema.value("file.level"), Some(json!("warn")));

    // own override wins, reset goes back to following the target
    schema.update(&json!({"file": {"level": "error"}})).unwrap();
    assert_eq!(schema.value("file.level"), Some(json!("error")));
    schema.field("file.level").unwrap().reset().unwrap();
    assert_eq!(schema.value("file.level"), Some(json!("warn")));
}

#[test]
fn test_chain_of_three() {
    let root = string_field("root", "r");
    let middle = string_field("middle", "m");
    let leaf = string_field("leaf", "l");

    middle.set_fallback(&root).unwrap();
    leaf.set_fallback(&middle).unwrap();
    assert_eq!(leaf.value(), json!("r"));

    middle.set_value("m2").unwrap();
    assert_eq!(leaf.value(), json!("m2"));

    middle.reset().unwrap();
    root.set_value("r2").unwrap();
    assert_eq!(leaf.value(), json!("r2"));

    let err = root.set_fallback(&leaf).unwrap_err();
    assert!(matches!(
        err,
        Error::FallbackCycle { ref field, ref target } if field == "root" && target == "leaf"
    ));
}

#[test]
fn test_hooks_not_applied_twice_along_chain() {
    let exclaim = |v: Value| json!(format!("{}!", v.as_str().unwrap_or_default()));

    let target = Arc::new(
        Field::new(
            FieldOptions::new("target", "target")
                .default_value("hi")
                .hook(exclaim),
        )
        .unwrap(),
    );
    let follower = Field::new(
        FieldOptions::new("follower", "follower")
            .field_type("string")
            .hook(exclaim)
            .fallback(&target),
    )
    .unwrap();

    assert_eq!(target.value(), json!("hi!"));
    assert_eq!(follower.value(), json!("hi!"));

    follower.set_value("own").unwrap();
    assert_eq!(follower.value(), json!("own!"));
}

#[test]
fn test_fallback_flag_without_context_stays_inert() {
    let field = string_field("plain", "value");
    field.set_flag(Behaviour::FALLBACK);

    assert!(field.fallback_target().is_none());
    assert_eq!(field.value(), json!("value"));
}

#[test]
fn test_clearing_fallback_flag_restores_default() {
    let target = string_field("target", "t");
    let field = string_field("field", "own-default");
    field.set_fallback(&target).unwrap();
    assert_eq!(field.value(), json!("t"));

    field.clear_flag(Behaviour::FALLBACK);
    assert_eq!(field.value(), json!("own-default"));
    assert!(field.context().is_some());
}

#[test]
fn test_tolerant_resolution_skips_missing_paths() {
    let schema = logger_schema_with(SchemaOptions::new().fallback("file.missing", "level"));
    assert_eq!(schema.value("file.level"), Some(json!("info")));
}

#[test]
fn test_strict_resolution_reports_missing_paths() {
    let err = logger_schema_with_strict("file.missing", "level");
    assert!(matches!(err, Error::FallbackPathNotFound(ref p) if p == "file.missing"));

    let err = logger_schema_with_strict("file.level", "tags");
    assert!(matches!(err, Error::FallbackPathNotFound(ref p) if p == "tags"));
}

fn logger_schema_with_strict(source: &str, target: &str) -> Error {
    let file = Schema::new(
        [(
            "level",
            Declaration::from(FieldSpec::described("file level").of_type("string")),
        )],
        SchemaOptions::new(),
    )
    .unwrap();

    Schema::new(
        [
            ("level", Declaration::from(FieldSpec::with_default("info", "level"))),
            ("file", file.into()),
            ("tags", json!(["core"]).into()),
        ],
        SchemaOptions::new()
            .fallback(source, target)
            .strict_fallback(true),
    )
    .unwrap_err()
}

#[test]
fn test_cycle_in_schema_options() {
    let result = Schema::new(
        [
            ("a", Declaration::from(FieldSpec::with_default("a", "a"))),
            ("b", FieldSpec::with_default("b", "b").into()),
        ],
        SchemaOptions::new().fallback("a", "b").fallback("b", "a"),
    );

    assert!(matches!(result, Err(Error::FallbackCycle { .. })));
}

#[test]
fn test_set_fallback_after_construction() {
    let schema = logger_schema();

    schema.set_fallback("format", "level").unwrap();
    assert_eq!(schema.value("format"), Some(json!("info")));

    assert!(matches!(
        schema.set_fallback("format", "nope"),
        Err(Error::FallbackPathNotFound(_))
    ));
}

// =============================================================================
// Re-enabled links
// =============================================================================

#[test]
fn test_reenabling_flag_cannot_close_cycle() {
    let a = string_field("a", "a-default");
    let b = string_field("b", "b-default");

    b.set_fallback(&a).unwrap();
    b.clear_flag(Behaviour::FALLBACK);

    // b's dormant link to a still counts
    let err = a.set_fallback(&b).unwrap_err();
    assert!(matches!(
        err,
        Error::FallbackCycle { ref field, ref target } if field == "a" && target == "b"
    ));

    b.set_flag(Behaviour::FALLBACK);
    assert_eq!(a.value(), json!("a-default"));
    assert_eq!(b.value(), json!("a-default"));
}

#[test]
fn test_concurrent_links_never_form_cycle() {
    use std::sync::Barrier;
    use std::thread;

    for _ in 0..50 {
        let a = string_field("a", "a");
        let b = string_field("b", "b");
        let barrier = Arc::new(Barrier::new(2));

        let handles: Vec<_> = [(a.clone(), b.clone()), (b.clone(), a.clone())]
            .into_iter()
            .map(|(source, target)| {
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    source.set_fallback(&target).is_ok()
                })
            })
            .collect();
        let linked: Vec<bool> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(linked.iter().filter(|ok| **ok).count(), 1);
        assert!(a.value().is_string());
        assert!(b.value().is_string());
    }
}

// =============================================================================
// Nil writes and defaults on fallback fields
// =============================================================================

fn short_follower(target: &Arc<Field>) -> Field {
    Field::new(
        FieldOptions::new("short", "short code")
            .field_type("string")
            .value("ab")
            .attribute("maxlen", 3)
            .fallback(target),
    )
    .unwrap()
}

#[test]
fn test_reset_follows_target_even_if_it_breaks_own_rules() {
    let target = string_field("target", "verbose");
    let field = short_follower(&target);
    assert_eq!(field.value(), json!("ab"));

    field.reset().unwrap();
    assert!(!field.is_overridden());
    assert_eq!(field.value(), json!("verbose"));

    // nil write round-trip
    field.set_value("cd").unwrap();
    field.set_value(Value::Null).unwrap();
    assert!(!field.is_overridden());
    assert_eq!(field.value(), json!("verbose"));

    // own overrides are still checked
    assert_eq!(
        field.set_value("abcd").unwrap_err().violations(),
        ["string length must be lower than 3"]
    );
}

#[test]
fn test_set_default_validates_default_not_target() {
    let target = string_field("target", "verbose");
    let field = short_follower(&target);

    field.set_default("x").unwrap();
    assert_eq!(field.default(), json!("x"));
    assert_eq!(field.value(), json!("ab"));

    let err = field.set_default("toolong").unwrap_err();
    assert_eq!(err.violations(), ["string length must be lower than 3"]);
    assert!(matches!(err, Error::Validation { ref value, .. } if value == &json!("toolong")));
    assert_eq!(field.default(), json!("x"));

    // the default shows once the link is dropped
    field.reset().unwrap();
    field.clear_flag(Behaviour::FALLBACK);
    assert_eq!(field.value(), json!("x"));
}

#[test]
fn test_reset_through_schema_update() {
    let schema = logger_schema();
    schema.update(&json!({"file": {"level": "error"}})).unwrap();

    schema.update(&json!({"file": {"level": null}})).unwrap();
    assert!(!schema.field("file.level").unwrap().is_overridden());
    assert_eq!(schema.value("file.level"), Some(json!("info")));
}
