//! Validation engine

use automap_core::{Mapping, MappingRegistry};
use tracing::{debug, warn};

use crate::reporter::{Severity, ValidationIssue, ValidationReport};
use crate::rules::{
    RuleKind, validate_configured_destination_members, validate_configured_source_members,
    validate_unmapped_destination_members, validate_unmapped_source_members,
};

/// Strictness level for validation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StrictnessLevel {
    /// Mappings without type metadata are errors
    #[default]
    Strict,
    /// Mappings without type metadata are skipped with a warning
    Lenient,
}

impl StrictnessLevel {
    #[must_use]
    pub fn from_strict(strict: bool) -> Self {
        if strict { Self::Strict } else { Self::Lenient }
    }
}

/// Validation configuration
#[derive(Debug, Clone, Default)]
pub struct ValidationConfig {
    pub strictness: StrictnessLevel,
    /// Maximum errors before stopping (0 = unlimited)
    pub max_errors: usize,
}

/// Validates every mapping of a registry against its type metadata
#[derive(Debug, Clone, Default)]
pub struct ConfigurationValidator {
    config: ValidationConfig,
}

impl ConfigurationValidator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_config(config: ValidationConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn strict(strict: bool) -> Self {
        Self::with_config(ValidationConfig {
            strictness: StrictnessLevel::from_strict(strict),
            ..ValidationConfig::default()
        })
    }

    /// Validate all mappings in key order
    #[must_use]
    pub fn validate(&self, registry: &MappingRegistry) -> ValidationReport {
        let mut report = ValidationReport::new();

        for mapping in registry.iter() {
            if self.limit_reached(&report) {
                debug!(max_errors = self.config.max_errors, "validation stopped at error limit");
                break;
            }
            self.validate_mapping(mapping, &mut report);
        }

        report.truncate_errors(self.config.max_errors);
        report
    }

    /// Validate a single mapping into `report`
    pub fn validate_mapping(&self, mapping: &Mapping, report: &mut ValidationReport) {
        let key = mapping.key().to_string();
        debug!(mapping = %key, "validating mapping");

        let (Some(source), Some(destination)) = (mapping.source_type(), mapping.destination_type())
        else {
            let message = format!(
                "Mapping '{key}' cannot be validated, since mapping.sourceType or mapping.destinationType are unspecified."
            );
            match self.config.strictness {
                StrictnessLevel::Strict => {
                    report.add(ValidationIssue::new(Severity::Error, RuleKind::UnspecifiedTypes, &key, None, message));
                }
                StrictnessLevel::Lenient => {
                    warn!(mapping = %key, "skipping mapping without type metadata");
                    report.add(ValidationIssue::new(Severity::Warning, RuleKind::UnspecifiedTypes, &key, None, message));
                }
            }
            return;
        };

        if mapping.converter().is_some() {
            debug!(mapping = %key, "mapping uses a type converter, member rules skipped");
            return;
        }

        let mut violations = validate_configured_destination_members(mapping, destination);
        violations.extend(validate_configured_source_members(mapping, source));
        if !mapping.ignores_all_non_existing() {
            violations.extend(validate_unmapped_source_members(mapping, source, destination));
            violations.extend(validate_unmapped_destination_members(mapping, source, destination));
        }

        for violation in violations {
            let message = format!(
                "Mapping '{key}' is invalid: {}",
                violation.kind.describe(&violation.path, source, destination)
            );
            report.add(ValidationIssue::new(
                Severity::Error,
                violation.kind,
                &key,
                Some(violation.path),
                message,
            ));
        }
    }

    fn limit_reached(&self, report: &ValidationReport) -> bool {
        self.config.max_errors > 0 && report.errors.len() >= self.config.max_errors
    }
}
