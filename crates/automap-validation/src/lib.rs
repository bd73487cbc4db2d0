#![deny(rust_2018_idioms)]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

//! # automap-validation
//!
//! Configuration validation for mapping registries.
//!
//! Every mapping is cross-checked against the source and destination type
//! metadata it was configured with: configured members must exist, and
//! unconfigured members must line up on both sides. The registry is only
//! read, never executed.
//!
//! ## Example Usage
//!
//! ```rust
//! use automap_core::{MappingRegistry, TypeDescriptor};
//! use automap_validation::assert_configuration_is_valid;
//! use serde_json::Value;
//!
//! let mut registry = MappingRegistry::new();
//! let mapping = registry.create_mapping("Person", "PersonDto");
//! mapping.set_source_type(TypeDescriptor::new("Person").with_member("name", Value::Null));
//! mapping
//!     .set_destination_type(TypeDescriptor::new("PersonDto").with_member("name", Value::Null))
//!     .unwrap();
//!
//! assert!(assert_configuration_is_valid(&registry, true).is_ok());
//! ```

pub mod engine;
pub mod reporter;
pub mod rules;

pub use engine::{ConfigurationValidator, StrictnessLevel, ValidationConfig};
pub use reporter::{Severity, ValidationIssue, ValidationReport, ValidationReporter};
pub use rules::RuleKind;

use automap_core::MappingRegistry;
use thiserror::Error;

/// Errors that can occur during validation
#[derive(Error, Debug)]
pub enum Error {
    #[error("{message}")]
    InvalidConfiguration {
        message: String,
        issues: Vec<ValidationIssue>,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

/// Fail when any mapping of `registry` is invalid
///
/// With `strict`, mappings without source or destination type metadata are
/// invalid; without it they are skipped.
///
/// # Errors
///
/// Returns `InvalidConfiguration` carrying every error message, one per line.
pub fn assert_configuration_is_valid(registry: &MappingRegistry, strict: bool) -> Result<()> {
    let report = ConfigurationValidator::strict(strict).validate(registry);
    if report.is_valid {
        Ok(())
    } else {
        Err(Error::InvalidConfiguration {
            message: report.error_message(),
            issues: report.errors,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assert_names_unresolved_mapping() {
        let mut registry = MappingRegistry::new();
        registry.create_mapping("Source", "Destination");

        let err = assert_configuration_is_valid(&registry, true).unwrap_err();
        assert!(err.to_string().contains("Mapping 'Source=>Destination' cannot be validated"));

        assert!(assert_configuration_is_valid(&registry, false).is_ok());
    }
}
