//! Integration test: extension functions
//!
//! Custom extensions registered on a mapper's registry are reachable from
//! mapping documents, both as member steps and as type converters.

use automap::{Arity, Error, Extension, ExtensionRegistry, Mapper, MappingDocument};
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

fn pricing_extension() -> Extension {
    let mut ext = Extension::new("pricing", "2.1.0");
    ext.register_function("with_vat", Arity::range(1, 2), |args| {
        let net = args.first().and_then(Value::as_f64).ok_or_else(|| Error::extension("with_vat expects a number"))?;
        let rate = args.get(1).and_then(Value::as_f64).unwrap_or(0.19);
        Ok(json!((net * (1.0 + rate) * 100.0).round() / 100.0))
    })
    .register_function("label", Arity::exactly(1), |args| {
        Ok(json!({ "price": args.first().cloned().unwrap_or(Value::Null), "currency": "EUR" }))
    });
    ext
}

#[test]
fn test_custom_extension_in_document() {
    let extensions = ExtensionRegistry::with_builtins().unwrap();
    extensions.register(pricing_extension()).unwrap();
    let mut mapper = Mapper::with_extensions(extensions);

    let document = MappingDocument::parse(
        r"
mappings:
  - source: product
    destination: productDto
    members:
      - member: gross
        steps:
          - op: map_from
            path: net
          - op: call
            extension: pricing
            function: with_vat
      - member: reduced
        steps:
          - op: map_from
            path: net
          - op: call
            extension: pricing
            function: with_vat
            args: [0.07]
      - member: total
        steps:
          - op: map_from
            path: quantity
          - op: call
            extension: math_utils
            function: multiply
            args: [3]
  - source: price
    destination: label
    convert_using:
      extension: pricing
      function: label
",
    )
    .unwrap();
    document.apply(&mut mapper).unwrap();

    let result = mapper
        .map_value("product", "productDto", &json!({ "net": 10.0, "quantity": 2, "sku": "X1" }))
        .unwrap();
    assert_eq!(
        result,
        json!({ "gross": 11.9, "reduced": 10.7, "total": 6, "sku": "X1" })
    );

    assert_eq!(
        mapper.map_value("price", "label", &json!(4.5)).unwrap(),
        json!({ "price": 4.5, "currency": "EUR" })
    );
}

#[test]
fn test_call_step_arity_is_checked_when_applied() {
    let mut mapper = Mapper::with_builtin_extensions().unwrap();
    let document = MappingDocument::parse(
        r"
mappings:
  - source: a
    destination: b
    members:
      - member: x
        steps:
          - op: call
            function: replace
            args: [only-one]
",
    )
    .unwrap();

    let err = document.apply(&mut mapper).unwrap_err();
    assert!(matches!(err, Error::Arity { .. }));
    assert_eq!(err.to_string(), "Function 'replace' expects 3 argument(s), got 2");
}

#[test]
fn test_failing_function_surfaces_as_transformation_error() {
    let extensions = ExtensionRegistry::new();
    extensions.register(pricing_extension()).unwrap();
    let mut mapper = Mapper::with_extensions(extensions);
    let document = MappingDocument::parse(
        r"
mappings:
  - source: product
    destination: productDto
    members:
      - member: gross
        steps:
          - op: map_from
            path: net
          - op: call
            extension: pricing
            function: with_vat
",
    )
    .unwrap();
    document.apply(&mut mapper).unwrap();

    let err = mapper
        .map_value("product", "productDto", &json!({ "net": "ten" }))
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Core(automap_core::Error::Transformation { ref member, .. }) if member == "gross"
    ));
}

#[test]
fn test_registry_lifecycle_hooks() {
    let initialized = Arc::new(AtomicUsize::new(0));
    let cleaned = Arc::new(AtomicUsize::new(0));

    let make = || {
        let mut ext = Extension::new("audit", "1.0.0");
        let init = Arc::clone(&initialized);
        let cleanup = Arc::clone(&cleaned);
        ext.register_function("noop", Arity::exactly(1), |args| {
            Ok(args.first().cloned().unwrap_or(Value::Null))
        })
        .on_init(move || {
            init.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .on_cleanup(move || {
            cleanup.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        ext
    };

    let registry = ExtensionRegistry::new();
    registry.register(make()).unwrap();
    // Replacing an extension cleans up the previous registration.
    registry.register(make()).unwrap();
    assert_eq!(initialized.load(Ordering::SeqCst), 2);
    assert_eq!(cleaned.load(Ordering::SeqCst), 1);

    // Clones share the same registry.
    let mapper = Mapper::with_extensions(registry.clone());
    assert!(mapper.extensions().has_extension("audit"));

    registry.cleanup_all().unwrap();
    assert_eq!(cleaned.load(Ordering::SeqCst), 2);
}
