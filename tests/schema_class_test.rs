//! Schema Class Integration Tests
//!
//! Instances produced from a class must not share mutable state.

mod common;

use common::logger_schema;
use fieldtree::{Behaviour, WalkOrder};
use serde_json::json;
use std::sync::Arc;

#[test]
fn test_many_instances_stay_isolated() {
    let class = logger_schema().create_class();
    let instances: Vec<_> = (0..5).map(|_| class.instantiate()).collect();

    for (i, instance) in instances.iter().enumerate() {
        instance.update(&json!({"retries": i})).unwrap();
    }
    for (i, instance) in instances.iter().enumerate() {
        assert_eq!(instance.value("retries"), Some(json!(i)));
    }
    assert_eq!(class.template().value("retries"), Some(json!(3)));
}

#[test]
fn test_nested_fields_are_copied() {
    let class = logger_schema().create_class();
    let a = class.instantiate();
    let b = class.instantiate();

    a.update(&json!({"file": {"path": "/a.log"}})).unwrap();

    assert_eq!(a.value("file.path"), Some(json!("/a.log")));
    assert_eq!(b.value("file.path"), Some(json!("/var/log/app.log")));

    let mut a_fields = Vec::new();
    a.walk(WalkOrder::PostOrder, |_, field| a_fields.push(field.clone()));
    let mut b_fields = Vec::new();
    b.walk(WalkOrder::PostOrder, |_, field| b_fields.push(field.clone()));

    assert_eq!(a_fields.len(), b_fields.len());
    for (x, y) in a_fields.iter().zip(&b_fields) {
        assert!(!Arc::ptr_eq(x, y));
    }
}

#[test]
fn test_instance_fallbacks_follow_own_targets() {
    let class = logger_schema().create_class();
    let a = class.instantiate();
    let b = class.instantiate();

    a.update(&json!({"level": "debug"})).unwrap();

    assert_eq!(a.value("file.level"), Some(json!("debug")));
    assert_eq!(b.value("file.level"), Some(json!("info")));
    assert!(a.field("file.level").unwrap().has_flag(Behaviour::FALLBACK));
}

#[test]
fn test_template_changes_reach_only_later_instances() {
    let class = logger_schema().create_class();
    let before = class.instantiate();

    class.template().update(&json!({"format": "json"})).unwrap();
    let after = class.instantiate();

    assert_eq!(before.value("format"), Some(json!("text")));
    assert_eq!(after.value("format"), Some(json!("json")));
}

#[test]
fn test_plain_data_is_copied() {
    let class = logger_schema().create_class();
    let instance = class.instantiate();

    assert_eq!(instance.value("tags"), Some(json!(["core"])));
    assert_eq!(instance.value("note"), Some(json!(["desc only"])));
    assert_eq!(instance.len(), class.template().len());
}
