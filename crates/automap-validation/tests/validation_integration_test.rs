//! Integration tests for automap-validation
//!
//! These tests validate complete registries the way an application would
//! before its first mapping call.

use automap_core::{Converter, MappingRegistry, MemberConfig, TypeDescriptor};
use automap_validation::{
    ConfigurationValidator, Error, RuleKind, Severity, ValidationReporter,
    assert_configuration_is_valid,
};
use serde_json::{Value, json};

fn person() -> TypeDescriptor {
    TypeDescriptor::new("Person")
        .with_member("firstName", Value::Null)
        .with_member("age", Value::Null)
        .with_member("address", json!({ "city": null }))
}

fn person_dto() -> TypeDescriptor {
    TypeDescriptor::new("PersonDto")
        .with_member("firstName", Value::Null)
        .with_member("years", Value::Null)
        .with_member("location", json!({ "city": null }))
}

fn registry_with_issues() -> MappingRegistry {
    let mut registry = MappingRegistry::new();
    let mapping = registry.create_mapping("Person", "PersonDto");
    mapping.set_source_type(person());
    mapping.set_destination_type(person_dto()).unwrap();
    mapping
        .configure_member("location.city", MemberConfig::map_from("address.city"))
        .unwrap();
    mapping.configure_member("nickname", MemberConfig::constant("n")).unwrap();
    mapping.configure_source_member("password", MemberConfig::ignore()).unwrap();
    registry
}

#[test]
fn test_report_lists_every_rule_in_order() {
    let report = ConfigurationValidator::new().validate(&registry_with_issues());

    assert!(!report.is_valid);
    let kinds: Vec<RuleKind> = report.errors.iter().map(|issue| issue.kind).collect();
    assert_eq!(
        kinds,
        vec![
            RuleKind::UnknownDestinationMember,
            RuleKind::UnknownSourceMember,
            RuleKind::UnmappedSourceMember,
            RuleKind::UnmappedDestinationMember,
        ]
    );

    let paths: Vec<Option<&str>> = report.errors.iter().map(|issue| issue.path.as_deref()).collect();
    assert_eq!(
        paths,
        vec![Some("nickname"), Some("password"), Some("age"), Some("years")]
    );
}

#[test]
fn test_messages_are_prefixed_with_mapping_key() {
    let report = ConfigurationValidator::new().validate(&registry_with_issues());

    assert_eq!(
        report.errors[0].message,
        "Mapping 'Person=>PersonDto' is invalid: Destination member 'nickname' is configured, \
         but does not exist on destination type (source: 'Person', destination: 'PersonDto')."
    );
    assert_eq!(
        report.errors[2].message,
        "Mapping 'Person=>PersonDto' is invalid: Source member 'age' is configured to be mapped, \
         but does not exist on destination type (source: 'Person', destination: 'PersonDto')."
    );
    assert!(report.errors.iter().all(|issue| issue.severity == Severity::Error));
}

#[test]
fn test_assert_configuration_is_valid_joins_messages() {
    let err = assert_configuration_is_valid(&registry_with_issues(), false).unwrap_err();
    let Error::InvalidConfiguration { message, issues } = err;
    assert_eq!(issues.len(), 4);
    assert_eq!(message.lines().count(), 4);
}

#[test]
fn test_fully_configured_mapping_is_valid() {
    let mut registry = MappingRegistry::new();
    let mapping = registry.create_mapping("Person", "PersonDto");
    mapping.set_source_type(person());
    mapping.set_destination_type(person_dto()).unwrap();
    mapping.configure_member("years", MemberConfig::map_from("age")).unwrap();
    mapping
        .configure_member("location", MemberConfig::map_from("address"))
        .unwrap();

    assert!(assert_configuration_is_valid(&registry, true).is_ok());
}

#[test]
fn test_converter_mappings_skip_member_rules() {
    let mut registry = MappingRegistry::new();
    let mapping = registry.create_mapping("Person", "PersonDto");
    mapping.set_source_type(person());
    mapping.set_destination_type(person_dto()).unwrap();
    mapping.set_converter(Converter::from_fn(|context| Ok(context.source_value.clone())));

    assert!(assert_configuration_is_valid(&registry, true).is_ok());
}

#[test]
fn test_strict_mode_fails_untyped_mapping_lenient_mode_does_not() {
    let mut registry = registry_with_issues();
    registry.create_mapping("Order", "OrderDto");
    registry.get_mapping_mut("Person", "PersonDto").unwrap().set_ignore_all_non_existing();

    let strict = ConfigurationValidator::strict(true).validate(&registry);
    assert!(strict
        .errors
        .iter()
        .any(|issue| issue.kind == RuleKind::UnspecifiedTypes && issue.mapping == "Order=>OrderDto"));

    let lenient = ConfigurationValidator::strict(false).validate(&registry);
    assert!(lenient.errors.iter().all(|issue| issue.mapping == "Person=>PersonDto"));
    assert_eq!(lenient.warnings.len(), 1);

    let rendered = ValidationReporter::new().render(&lenient);
    assert!(rendered.ends_with("configuration invalid: 2 error(s), 1 warning(s)"));
}
