//! Common test utilities for fieldtree integration tests
//!
//! Provides shared schemas, field builders, and logger setup.

#![allow(dead_code)]

use fieldtree::{Declaration, Field, FieldOptions, FieldSpec, Schema, SchemaOptions};
use std::sync::Arc;

/// Route library logs to the test harness (`RUST_LOG=debug cargo test`)
pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

// =============================================================================
// Test Schema
// =============================================================================

/// Logger-style schema covering every kind of entry
///
/// ```text
/// level        "info"        field
/// format       "text"        field, maxlen 8
/// retries      3             field, 0..=10
/// file.path    "/var/log/app.log"
/// file.level   (nil)         falls back to `level`
/// file.rotate  true
/// tags         ["core"]      plain data
/// note         ["desc only"] plain data (not a field spec)
/// ```
pub fn logger_schema() -> Schema {
    logger_schema_with(SchemaOptions::new())
}

pub fn logger_schema_with(options: SchemaOptions) -> Schema {
    init_logger();

    let file = Schema::new(
        [
            (
                "path",
                Declaration::from(FieldSpec::with_default("/var/log/app.log", "log file path")),
            ),
            (
                "level",
                FieldSpec::described("file log level").of_type("string").into(),
            ),
            ("rotate", FieldSpec::with_default(true, "rotate daily").into()),
        ],
        SchemaOptions::new().description("file output"),
    )
    .expect("Failed to build file schema");

    Schema::new(
        [
            (
                "level",
                Declaration::from(FieldSpec::with_default("info", "global log level")),
            ),
            (
                "format",
                FieldSpec::with_default("text", "output format")
                    .attr("maxlen", 8)
                    .into(),
            ),
            (
                "retries",
                FieldSpec::with_default(3, "retry count")
                    .attr("min", 0)
                    .attr("max", 10)
                    .into(),
            ),
            ("file", file.into()),
            ("tags", serde_json::json!(["core"]).into()),
            ("note", FieldSpec::described("desc only").into()),
        ],
        options.fallback("file.level", "level"),
    )
    .expect("Failed to build logger schema")
}

// =============================================================================
// Field Builders
// =============================================================================

pub fn string_field(name: &str, default: &str) -> Arc<Field> {
    Arc::new(
        Field::new(FieldOptions::new(name, format!("{name} setting")).default_value(default))
            .expect("Failed to build field"),
    )
}

pub fn number_field(name: &str, default: i64) -> Arc<Field> {
    Arc::new(
        Field::new(FieldOptions::new(name, format!("{name} setting")).default_value(default))
            .expect("Failed to build field"),
    )
}
