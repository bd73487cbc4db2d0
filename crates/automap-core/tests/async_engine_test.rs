//! Integration tests for the asynchronous engine.

use automap_core::{MappingRegistry, MemberConfig};
use serde_json::{Value, json};
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn number(value: Option<&Value>) -> i64 {
    value.and_then(Value::as_i64).unwrap_or_default()
}

#[tokio::test]
async fn test_steps_within_a_member_run_in_order() {
    let log = Arc::new(Mutex::new(Vec::<&'static str>::new()));
    let mut registry = MappingRegistry::new();
    let mapping = registry.create_mapping("source", "destination");

    let step_a_log = Arc::clone(&log);
    mapping.configure_member("y", MemberConfig::map_from("x")).unwrap();
    mapping
        .configure_member(
            "y",
            MemberConfig::custom_async(move |context| {
                let log = Arc::clone(&step_a_log);
                async move {
                    log.lock().unwrap().push("a:start");
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    log.lock().unwrap().push("a:done");
                    Ok(Some(json!(number(context.intermediate_property_value.as_ref()) + 1)))
                }
            }),
        )
        .unwrap();

    let step_b_log = Arc::clone(&log);
    mapping
        .configure_member(
            "y",
            MemberConfig::custom_async(move |context| {
                let log = Arc::clone(&step_b_log);
                async move {
                    log.lock().unwrap().push("b:start");
                    Ok(Some(json!(number(context.intermediate_property_value.as_ref()) * 10)))
                }
            }),
        )
        .unwrap();

    let result = registry
        .map_async("source", "destination", Some(&json!({ "x": 1 })))
        .await
        .unwrap();

    assert_eq!(result, Some(json!({ "y": 20 })));
    assert_eq!(*log.lock().unwrap(), vec!["a:start", "a:done", "b:start"]);
}

#[tokio::test]
async fn test_sibling_members_are_polled_concurrently() {
    // Each member waits until the other has started, so sequential polling never finishes.
    let barrier = Arc::new(tokio::sync::Barrier::new(2));
    let mut registry = MappingRegistry::new();
    let mapping = registry.create_mapping("source", "destination");
    for member in ["left", "right"] {
        let barrier = Arc::clone(&barrier);
        mapping
            .configure_member(
                member,
                MemberConfig::custom_async(move |context| {
                    let barrier = Arc::clone(&barrier);
                    async move {
                        barrier.wait().await;
                        Ok(Some(json!(number(context.intermediate_property_value.as_ref()) * 2)))
                    }
                }),
            )
            .unwrap();
    }

    let source = json!({ "left": 1, "right": 2 });
    let result = tokio::time::timeout(
        Duration::from_secs(5),
        registry.map_async("source", "destination", Some(&source)),
    )
    .await
    .expect("sibling members must not wait for each other")
    .unwrap();

    assert_eq!(result, Some(json!({ "left": 2, "right": 4 })));
}

#[tokio::test]
async fn test_siblings_and_array_elements_all_complete() {
    let mut registry = MappingRegistry::new();
    let mapping = registry.create_mapping("source", "destination");
    for (member, delay) in [("slow", 30_u64), ("fast", 1)] {
        mapping
            .configure_member(
                member,
                MemberConfig::custom_async(move |context| async move {
                    tokio::time::sleep(Duration::from_millis(delay)).await;
                    Ok(Some(json!(number(context.intermediate_property_value.as_ref()) + 1)))
                }),
            )
            .unwrap();
    }

    let source = json!([{ "slow": 1, "fast": 2, "plain": true }, null, { "slow": 5, "fast": 6 }]);
    let result = registry
        .map_async("source", "destination", Some(&source))
        .await
        .unwrap();

    assert_eq!(
        result,
        Some(json!([
            { "slow": 2, "fast": 3, "plain": true },
            null,
            { "slow": 6, "fast": 7 }
        ]))
    );
}

#[tokio::test]
async fn test_async_ignore_omits_member() {
    let mut registry = MappingRegistry::new();
    registry
        .create_mapping("source", "destination")
        .configure_member(
            "hidden",
            MemberConfig::custom_async(|context| async move {
                context.ignore();
                Ok(None)
            }),
        )
        .unwrap();

    let result = registry
        .map_async("source", "destination", Some(&json!({ "hidden": 1, "shown": 2 })))
        .await
        .unwrap();
    assert_eq!(result, Some(json!({ "shown": 2 })));
}

#[tokio::test]
async fn test_sync_and_async_engines_agree() {
    let mut registry = MappingRegistry::new();
    let mapping = registry.create_mapping("source", "destination");
    mapping
        .configure_member("person.name", MemberConfig::map_from("name"))
        .unwrap();
    mapping
        .configure_member("person.age", MemberConfig::map_from("details.age"))
        .unwrap();
    mapping.configure_member("kind", MemberConfig::constant("person")).unwrap();
    mapping.configure_source_member("secret", MemberConfig::ignore()).unwrap();
    mapping.set_all_members_handler(|object, name, value| {
        if value.is_number() {
            object.insert(name.to_string(), json!(value.to_string()));
        }
    });

    let source = json!({ "name": "Ann", "details": { "age": 30 }, "secret": "s", "extra": 1 });
    let sync = registry.map("source", "destination", Some(&source)).unwrap();
    let asynchronous = registry
        .map_async("source", "destination", Some(&source))
        .await
        .unwrap();

    assert_eq!(sync, asynchronous);
    assert_eq!(
        sync,
        Some(json!({
            "person": { "name": "Ann", "age": "30" },
            "kind": "person",
            "extra": "1"
        }))
    );
}

#[tokio::test]
async fn test_async_missing_mapping() {
    let registry = MappingRegistry::new();
    let err = registry
        .map_async("source", "destination", Some(&json!({})))
        .await
        .unwrap_err();
    assert!(matches!(err, automap_core::Error::MappingNotFound { .. }));
}

#[tokio::test]
async fn test_async_items_with_holes() {
    let mut registry = MappingRegistry::new();
    registry.create_mapping("source", "destination");
    let mapping = registry.get_mapping("source", "destination").unwrap();

    let items = vec![Some(json!({ "prop": "a" })), None];
    assert_eq!(mapping.map_items_async(&items).await.unwrap(), items);
}
