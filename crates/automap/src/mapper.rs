//! Mapper context and staged configuration builder
//!
//! [`Mapper`] is an explicit context object: construct it, configure
//! mappings through [`Mapper::begin_mapping`] or [`Mapper::initialize`], then
//! map values. Nothing is process-global.

use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info};

use automap_core::{
    Converter, Mapping, MappingKey, MappingRegistry, MemberConfig, ResolutionContext,
    TypeConverter, TypeDescriptor,
};
use automap_validation::{ConfigurationValidator, ValidationReport};

use crate::extensions::ExtensionRegistry;
use crate::naming::ConventionTranslator;
use crate::profile::{Profile, ProfileConfiguration, profile_key};
use crate::{Error, Result};

/// Key of one side of a mapping: a plain name or a described type
#[derive(Debug, Clone, PartialEq)]
pub enum MapKey {
    Name(String),
    /// Typed keys record type metadata on the mapping; a typed destination
    /// also constructs destination objects from the type's member defaults
    Type(TypeDescriptor),
}

impl MapKey {
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Name(name) => name,
            Self::Type(descriptor) => descriptor.name(),
        }
    }
}

impl From<&str> for MapKey {
    fn from(name: &str) -> Self {
        Self::Name(name.to_string())
    }
}

impl From<String> for MapKey {
    fn from(name: String) -> Self {
        Self::Name(name)
    }
}

impl From<TypeDescriptor> for MapKey {
    fn from(descriptor: TypeDescriptor) -> Self {
        Self::Type(descriptor)
    }
}

/// Which store a configurator writes to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Scope {
    Application,
    Profile,
}

/// A registered profile: its naming conventions as a translator
#[derive(Debug, Clone)]
struct RegisteredProfile {
    translator: Option<ConventionTranslator>,
}

/// Mapping context: mappings, profiles and extension functions
#[derive(Debug, Default)]
pub struct Mapper {
    registry: MappingRegistry,
    profile_mappings: MappingRegistry,
    profiles: BTreeMap<String, RegisteredProfile>,
    extensions: ExtensionRegistry,
}

impl Mapper {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A mapper sharing an existing extension registry
    #[must_use]
    pub fn with_extensions(extensions: ExtensionRegistry) -> Self {
        Self {
            extensions,
            ..Self::default()
        }
    }

    /// A mapper with the built-in extensions registered
    ///
    /// # Errors
    ///
    /// Returns an error if a built-in extension fails to initialize.
    pub fn with_builtin_extensions() -> Result<Self> {
        Ok(Self::with_extensions(ExtensionRegistry::with_builtins()?))
    }

    /// Drop every mapping and profile; extensions stay registered
    pub fn reset(&mut self) {
        info!(profiles = self.profiles.len(), "resetting mapper");
        self.registry.reset();
        self.profile_mappings.reset();
        self.profiles.clear();
    }

    #[must_use]
    pub fn registry(&self) -> &MappingRegistry {
        &self.registry
    }

    #[must_use]
    pub fn extensions(&self) -> &ExtensionRegistry {
        &self.extensions
    }

    #[must_use]
    pub fn has_profile(&self, profile_name: &str) -> bool {
        self.profiles.contains_key(profile_name)
    }

    /// Start configuring a mapping from `source`
    pub fn begin_mapping(&mut self, source: impl Into<MapKey>) -> MappingBuilder<'_> {
        MappingBuilder {
            mapper: self,
            source: source.into(),
        }
    }

    /// Create (or extend) the mapping from `source` to `destination`
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
        self.begin_mapping(source).to_destination(destination)
    }

    /// Run a configuration closure against this mapper
    ///
    /// # Errors
    ///
    /// Propagates the first error returned by `configure`.
    pub fn initialize<F>(&mut self, configure: F) -> Result<()>
    where
        F: FnOnce(&mut MapperConfiguration<'_>) -> Result<()>,
    {
        configure(&mut MapperConfiguration { mapper: self })
    }

    /// Register a profile and run its configuration
    ///
    /// Registering a profile name again replaces the earlier registration.
    ///
    /// # Errors
    ///
    /// Propagates errors from [`Profile::configure`].
    pub fn add_profile<P>(&mut self, profile: &P) -> Result<()>
    where
        P: Profile + ?Sized,
    {
        let name = profile.profile_name().to_string();
        let translator = match (
            profile.source_member_naming_convention(),
            profile.destination_member_naming_convention(),
        ) {
            (Some(source), Some(destination)) => Some(ConventionTranslator::new(source, destination)),
            _ => None,
        };

        let prefix = profile_key(&name, "");
        self.profile_mappings
            .retain(|mapping| !mapping.source_key().starts_with(&prefix));
        self.profiles
            .insert(name.clone(), RegisteredProfile { translator });
        info!(profile = %name, "registered profile");

        profile.configure(&mut ProfileConfiguration::new(self, &name))
    }

    pub(crate) fn configure(
        &mut self,
        scope: Scope,
        key: MappingKey,
        source: MapKey,
        destination: MapKey,
    ) -> Result<MappingConfigurator<'_>> {
        let mapping = self
            .store_mut(scope)
            .create_mapping(&key.source, &key.destination);
        if let MapKey::Type(destination_type) = destination {
            mapping.set_destination_type(destination_type)?;
        }
        if let MapKey::Type(source_type) = source {
            mapping.set_source_type(source_type);
        }
        Ok(MappingConfigurator {
            mapper: self,
            key,
            scope,
        })
    }

    fn store_mut(&mut self, scope: Scope) -> &mut MappingRegistry {
        match scope {
            Scope::Application => &mut self.registry,
            Scope::Profile => &mut self.profile_mappings,
        }
    }

    /// Map a value (`None` stays `None`, `null` stays `null`)
    ///
    /// # Errors
    ///
    /// Returns `MappingNotFound` for an unknown key pair and propagates
    /// execution errors.
    pub fn map(&self, source_key: &str, destination_key: &str, source: Option<&Value>) -> Result<Option<Value>> {
        Ok(self.registry.map(source_key, destination_key, source)?)
    }

    /// Map a defined value
    ///
    /// # Errors
    ///
    /// See [`Mapper::map`].
    pub fn map_value(&self, source_key: &str, destination_key: &str, source: &Value) -> Result<Value> {
        Ok(self
            .registry
            .get_mapping(source_key, destination_key)?
            .map_value(source)?)
    }

    /// Map a sequence with holes, preserving its length
    ///
    /// # Errors
    ///
    /// See [`Mapper::map`].
    pub fn map_items(
        &self,
        source_key: &str,
        destination_key: &str,
        items: &[Option<Value>],
    ) -> Result<Vec<Option<Value>>> {
        Ok(self.registry.map_items(source_key, destination_key, items)?)
    }

    /// Asynchronous counterpart of [`Mapper::map`]
    ///
    /// # Errors
    ///
    /// See [`Mapper::map`].
    pub async fn map_async(
        &self,
        source_key: &str,
        destination_key: &str,
        source: Option<&Value>,
    ) -> Result<Option<Value>> {
        Ok(self
            .registry
            .map_async(source_key, destination_key, source)
            .await?)
    }

    /// Validate every application mapping
    #[must_use]
    pub fn validate(&self, strict: bool) -> ValidationReport {
        ConfigurationValidator::strict(strict).validate(&self.registry)
    }

    /// Fail when any application mapping is invalid
    ///
    /// # Errors
    ///
    /// Returns a validation error naming every problem.
    pub fn assert_configuration_is_valid(&self, strict: bool) -> Result<()> {
        Ok(automap_validation::assert_configuration_is_valid(&self.registry, strict)?)
    }
}

/// First stage of the builder: the source key is known
pub struct MappingBuilder<'a> {
    mapper: &'a mut Mapper,
    source: MapKey,
}

impl<'a> MappingBuilder<'a> {
    /// Complete the key pair and return the configuration handle
    ///
    /// # Errors
    ///
    /// Returns `ConflictingDestinationType` when a typed destination key
    /// conflicts with an earlier one.
    #[allow(clippy::wrong_self_convention)]
    pub fn to_destination(self, destination: impl Into<MapKey>) -> Result<MappingConfigurator<'a>> {
        let destination = destination.into();
        let key = MappingKey::new(self.source.name(), destination.name());
        self.mapper
            .configure(Scope::Application, key, self.source, destination)
    }
}

/// Handle passed to [`Mapper::initialize`]
pub struct MapperConfiguration<'a> {
    mapper: &'a mut Mapper,
}

impl MapperConfiguration<'_> {
    /// See [`Mapper::add_profile`]
    ///
    /// # Errors
    ///
    /// Propagates errors from [`Profile::configure`].
    pub fn add_profile<P>(&mut self, profile: &P) -> Result<()>
    where
        P: Profile + ?Sized,
    {
        self.mapper.add_profile(profile)
    }

    /// See [`Mapper::create_map`]
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
        self.mapper.create_map(source, destination)
    }
}

/// Fluent configuration of one mapping
pub struct MappingConfigurator<'a> {
    mapper: &'a mut Mapper,
    key: MappingKey,
    scope: Scope,
}

impl MappingConfigurator<'_> {
    #[must_use]
    pub fn key(&self) -> &MappingKey {
        &self.key
    }

    fn mapping(&mut self) -> Result<&mut Mapping> {
        Ok(self
            .mapper
            .store_mut(self.scope)
            .get_mapping_mut(&self.key.source, &self.key.destination)?)
    }

    /// Configure a destination member
    ///
    /// # Errors
    ///
    /// Returns `InvalidPath` for malformed paths.
    pub fn for_member(&mut self, destination: &str, config: MemberConfig) -> Result<&mut Self> {
        self.mapping()?.configure_member(destination, config)?;
        Ok(self)
    }

    /// Configure a source member with `ignore` or a custom function
    ///
    /// # Errors
    ///
    /// Returns `InvalidSourceMemberConfiguration` for other descriptors.
    pub fn for_source_member(&mut self, source: &str, config: MemberConfig) -> Result<&mut Self> {
        self.mapping()?.configure_source_member(source, config)?;
        Ok(self)
    }

    /// Post-process every written member
    ///
    /// # Errors
    ///
    /// Returns `MappingNotFound` if the mapping was removed by a reset.
    pub fn for_all_members<F>(&mut self, handler: F) -> Result<&mut Self>
    where
        F: Fn(&mut Map<String, Value>, &str, &Value) + Send + Sync + 'static,
    {
        self.mapping()?.set_all_members_handler(handler);
        Ok(self)
    }

    /// Drop source members that have no explicit configuration
    ///
    /// # Errors
    ///
    /// Returns `MappingNotFound` if the mapping was removed by a reset.
    pub fn ignore_all_non_existing(&mut self) -> Result<&mut Self> {
        self.mapping()?.set_ignore_all_non_existing();
        Ok(self)
    }

    /// Construct destination objects from a type
    ///
    /// # Errors
    ///
    /// Returns `ConflictingDestinationType` when a different type is set.
    pub fn convert_to_type(&mut self, destination_type: TypeDescriptor) -> Result<&mut Self> {
        self.mapping()?.set_destination_type(destination_type)?;
        Ok(self)
    }

    /// Convert whole objects with a [`TypeConverter`]
    ///
    /// # Errors
    ///
    /// Returns `MappingNotFound` if the mapping was removed by a reset.
    pub fn convert_using<C>(&mut self, converter: C) -> Result<&mut Self>
    where
        C: TypeConverter + 'static,
    {
        self.mapping()?
            .set_converter(Converter::from_type_converter(converter));
        Ok(self)
    }

    /// Convert whole objects with a function of the resolution context
    ///
    /// # Errors
    ///
    /// Returns `MappingNotFound` if the mapping was removed by a reset.
    pub fn convert_using_fn<F>(&mut self, function: F) -> Result<&mut Self>
    where
        F: Fn(&ResolutionContext) -> automap_core::Result<Value> + Send + Sync + 'static,
    {
        self.mapping()?.set_converter(Converter::from_fn(function));
        Ok(self)
    }

    /// Convert whole objects asynchronously (async engine only)
    ///
    /// # Errors
    ///
    /// Returns `MappingNotFound` if the mapping was removed by a reset.
    pub fn convert_using_async<F, Fut>(&mut self, function: F) -> Result<&mut Self>
    where
        F: Fn(ResolutionContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = automap_core::Result<Value>> + Send + 'static,
    {
        self.mapping()?
            .set_converter(Converter::from_async_fn(function));
        Ok(self)
    }

    /// Convert whole objects with a registered extension function
    ///
    /// The function receives the source value as its only argument.
    ///
    /// # Errors
    ///
    /// Returns `ExtensionNotFound` / `FunctionNotFound` for unknown names and
    /// `InvalidConverterFunction` unless the function takes exactly one
    /// argument.
    pub fn convert_using_extension(&mut self, extension: &str, function: &str) -> Result<&mut Self> {
        let resolved = self.mapper.extensions.function(extension, function)?;
        let qualified = format!("{extension}.{function}");
        if !resolved.arity.is_exactly(1) {
            return Err(Error::InvalidConverterFunction {
                function: qualified,
                arity: resolved.arity.to_string(),
            });
        }

        let name = function.to_string();
        self.mapping()?.set_converter(Converter::from_fn(move |context| {
            resolved
                .call(&name, std::slice::from_ref(&context.source_value))
                .map_err(|e| automap_core::Error::transformation(context.destination_key.clone(), e.to_string()))
        }));
        debug!(mapping = %self.key, converter = %qualified, "using extension function as converter");
        Ok(self)
    }

    /// Apply a registered profile
    ///
    /// Installs the profile's naming conventions and merges the profile's
    /// mapping for the same keys, if it has one. Steps of the profile are
    /// appended after the ones configured so far.
    ///
    /// # Errors
    ///
    /// Returns `ProfileNotFound` for an unknown profile name.
    pub fn with_profile(&mut self, profile_name: &str) -> Result<&mut Self> {
        let profile = self
            .mapper
            .profiles
            .get(profile_name)
            .cloned()
            .ok_or_else(|| Error::ProfileNotFound(profile_name.to_string()))?;

        let profile_mapping = self
            .mapper
            .profile_mappings
            .get_mapping(
                &profile_key(profile_name, &self.key.source),
                &profile_key(profile_name, &self.key.destination),
            )
            .ok()
            .cloned();

        debug!(mapping = %self.key, profile = profile_name, merged = profile_mapping.is_some(), "applying profile");
        let mapping = self.mapping()?;
        if let Some(translator) = profile.translator {
            mapping.set_name_translator(Arc::new(translator));
        }
        if let Some(profile_mapping) = profile_mapping {
            mapping.merge(&profile_mapping)?;
        }
        Ok(self)
    }
}
