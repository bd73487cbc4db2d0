//! Mapping profiles
//!
//! A profile groups mapping configuration under a name. Mappings created
//! while a profile is configured are kept apart from the application's
//! mappings under `"{profile}=>{key}"` keys; `with_profile(name)` merges
//! them into an application mapping with the same keys and installs the
//! profile's naming conventions.

use automap_core::MappingKey;
use std::sync::Arc;

use crate::Result;
use crate::mapper::{MapKey, Mapper, MappingConfigurator, Scope};
use crate::naming::NamingConvention;

/// A named group of mapping configuration
pub trait Profile {
    fn profile_name(&self) -> &str;

    /// Convention of the source member names
    fn source_member_naming_convention(&self) -> Option<Arc<dyn NamingConvention>> {
        None
    }

    /// Convention of the destination member names
    fn destination_member_naming_convention(&self) -> Option<Arc<dyn NamingConvention>> {
        None
    }

    /// Create the profile's mappings
    ///
    /// # Errors
    ///
    /// Implementations propagate configuration errors.
    fn configure(&self, config: &mut ProfileConfiguration<'_>) -> Result<()> {
        let _ = config;
        Ok(())
    }
}

/// Handle passed to [`Profile::configure`]
pub struct ProfileConfiguration<'a> {
    mapper: &'a mut Mapper,
    profile_name: String,
}

impl<'a> ProfileConfiguration<'a> {
    pub(crate) fn new(mapper: &'a mut Mapper, profile_name: &str) -> Self {
        Self {
            mapper,
            profile_name: profile_name.to_string(),
        }
    }

    #[must_use]
    pub fn profile_name(&self) -> &str {
        &self.profile_name
    }

    /// Create (or extend) a mapping belonging to this profile
    ///
    /// # Errors
    ///
    /// Returns `ConflictingDestinationType` when a typed destination key
    /// conflicts with an earlier one.
    pub fn create_map(
        &mut self,
        source: impl Into<MapKey>,
        destination: impl Into<MapKey>,
    ) -> Result<MappingConfigurator<'_>> {
        let (source, destination) = (source.into(), destination.into());
        let key = MappingKey::new(
            profile_key(&self.profile_name, source.name()),
            profile_key(&self.profile_name, destination.name()),
        );
        self.mapper.configure(Scope::Profile, key, source, destination)
    }
}

/// Key under which a profile stores its mapping for `key`
pub(crate) fn profile_key(profile_name: &str, key: &str) -> String {
    format!("{profile_name}=>{key}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemberConfig;
    use crate::naming::{CamelCaseNamingConvention, PascalCaseNamingConvention};
    use serde_json::json;

    struct PascalToCamel;

    impl Profile for PascalToCamel {
        fn profile_name(&self) -> &str {
            "PascalCaseToCamelCase"
        }

        fn source_member_naming_convention(&self) -> Option<Arc<dyn NamingConvention>> {
            Some(Arc::new(PascalCaseNamingConvention))
        }

        fn destination_member_naming_convention(&self) -> Option<Arc<dyn NamingConvention>> {
            Some(Arc::new(CamelCaseNamingConvention))
        }

        fn configure(&self, config: &mut ProfileConfiguration<'_>) -> Result<()> {
            config
                .create_map("a", "b")?
                .for_member("total", MemberConfig::constant(1))?;
            Ok(())
        }
    }

    #[test]
    fn test_profile_mappings_are_kept_apart() {
        let mut mapper = Mapper::new();
        mapper.add_profile(&PascalToCamel).unwrap();

        assert!(mapper.registry().is_empty());
        assert!(mapper.has_profile("PascalCaseToCamelCase"));

        mapper
            .create_map("a", "b")
            .unwrap()
            .with_profile("PascalCaseToCamelCase")
            .unwrap();
        let result = mapper.map("a", "b", Some(&json!({ "FullName": "x" }))).unwrap();
        assert_eq!(result, Some(json!({ "total": 1, "fullName": "x" })));
    }

    #[test]
    fn test_profile_key() {
        assert_eq!(profile_key("p", "a"), "p=>a");
    }
}
