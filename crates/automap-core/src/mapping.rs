//! Mapping definitions
//!
//! A [`Mapping`] is one configuration unit between a source key and a
//! destination key. Member configuration is delegated to its
//! [`PropertyTree`]; whole-mapping settings (converter, destination type,
//! all-members handler, ignore-all-non-existing) are recorded on the mapping.

use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

use crate::converter::{Converter, ResolutionContext};
use crate::member::MemberConfig;
use crate::path::PropertyPath;
use crate::tree::PropertyTree;
use crate::{Error, Result};

/// Post-processing hook, called once per written member with the object that
/// holds the member, the member name and the written value
pub type ForAllMembersFn = Arc<dyn Fn(&mut Map<String, Value>, &str, &Value) + Send + Sync>;

/// Translates member names between the source and destination conventions
pub trait MemberNameTranslator: Send + Sync {
    fn to_destination(&self, source_name: &str) -> String;
    fn to_source(&self, destination_name: &str) -> String;
}

/// Identity of a mapping: source key and destination key
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MappingKey {
    pub source: String,
    pub destination: String,
}

impl MappingKey {
    #[must_use]
    pub fn new(source: impl Into<String>, destination: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
        }
    }
}

impl fmt::Display for MappingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}=>{}", self.source, self.destination)
    }
}

/// External type metadata: a named set of members with default values
///
/// Object-valued defaults declare nested members.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeDescriptor {
    name: String,
    members: Map<String, Value>,
}

impl TypeDescriptor {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            members: Map::new(),
        }
    }

    /// Build a descriptor from an object of member defaults
    #[must_use]
    pub fn from_members(name: impl Into<String>, members: Map<String, Value>) -> Self {
        Self {
            name: name.into(),
            members,
        }
    }

    #[must_use]
    pub fn with_member(mut self, name: impl Into<String>, default: impl Into<Value>) -> Self {
        self.members.insert(name.into(), default.into());
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn members(&self) -> &Map<String, Value> {
        &self.members
    }

    /// Whether the (possibly nested) member exists on this type
    #[must_use]
    pub fn has_member(&self, path: &PropertyPath) -> bool {
        path.read_in(&self.members).is_some()
    }

    /// A fresh destination object holding the member defaults
    #[must_use]
    pub fn instantiate(&self) -> Map<String, Value> {
        self.members.clone()
    }
}

/// One registered mapping between a source key and a destination key
#[derive(Clone)]
pub struct Mapping {
    key: MappingKey,
    source_type: Option<TypeDescriptor>,
    destination_type: Option<TypeDescriptor>,
    converter: Option<Converter>,
    tree: PropertyTree,
    ignore_all_non_existing: bool,
    for_all_members: Option<ForAllMembersFn>,
    name_translator: Option<Arc<dyn MemberNameTranslator>>,
}

impl Mapping {
    #[must_use]
    pub fn new(source_key: impl Into<String>, destination_key: impl Into<String>) -> Self {
        Self {
            key: MappingKey::new(source_key, destination_key),
            source_type: None,
            destination_type: None,
            converter: None,
            tree: PropertyTree::new(),
            ignore_all_non_existing: false,
            for_all_members: None,
            name_translator: None,
        }
    }

    #[must_use]
    pub fn key(&self) -> &MappingKey {
        &self.key
    }

    #[must_use]
    pub fn source_key(&self) -> &str {
        &self.key.source
    }

    #[must_use]
    pub fn destination_key(&self) -> &str {
        &self.key.destination
    }

    #[must_use]
    pub fn tree(&self) -> &PropertyTree {
        &self.tree
    }

    #[must_use]
    pub fn source_type(&self) -> Option<&TypeDescriptor> {
        self.source_type.as_ref()
    }

    #[must_use]
    pub fn destination_type(&self) -> Option<&TypeDescriptor> {
        self.destination_type.as_ref()
    }

    #[must_use]
    pub fn converter(&self) -> Option<&Converter> {
        self.converter.as_ref()
    }

    #[must_use]
    pub fn ignores_all_non_existing(&self) -> bool {
        self.ignore_all_non_existing
    }

    #[must_use]
    pub fn for_all_members(&self) -> Option<&ForAllMembersFn> {
        self.for_all_members.as_ref()
    }

    /// Configure a destination member (dotted path)
    ///
    /// # Errors
    ///
    /// Returns `InvalidPath` for malformed destination or `MapFrom` paths.
    pub fn configure_member(&mut self, destination: &str, config: MemberConfig) -> Result<()> {
        let path = PropertyPath::parse(destination)?;
        debug!(mapping = %self.key, member = %path, config = config.kind_name(), "configuring member");
        self.tree.configure_member(&path, config)
    }

    /// Configure a source member (dotted path)
    ///
    /// # Errors
    ///
    /// Returns `InvalidPath` for a malformed path and
    /// `InvalidSourceMemberConfiguration` for descriptors other than
    /// ignore and custom functions.
    pub fn configure_source_member(&mut self, source: &str, config: MemberConfig) -> Result<()> {
        let path = PropertyPath::parse(source)?;
        debug!(mapping = %self.key, source_member = %path, config = config.kind_name(), "configuring source member");
        self.tree.configure_source_member(&path, config)
    }

    pub fn set_all_members_handler<F>(&mut self, handler: F)
    where
        F: Fn(&mut Map<String, Value>, &str, &Value) + Send + Sync + 'static,
    {
        self.for_all_members = Some(Arc::new(handler));
    }

    pub fn set_ignore_all_non_existing(&mut self) {
        self.ignore_all_non_existing = true;
    }

    pub fn set_converter(&mut self, converter: Converter) {
        debug!(mapping = %self.key, ?converter, "setting converter");
        self.converter = Some(converter);
    }

    pub fn set_source_type(&mut self, source_type: TypeDescriptor) {
        self.source_type = Some(source_type);
    }

    /// Set the destination type used to construct destination objects
    ///
    /// # Errors
    ///
    /// Returns `ConflictingDestinationType` if a different destination type
    /// was already set. Descriptors are equal when both name and members match.
    pub fn set_destination_type(&mut self, destination_type: TypeDescriptor) -> Result<()> {
        if let Some(existing) = &self.destination_type {
            if *existing != destination_type {
                return Err(Error::ConflictingDestinationType {
                    mapping: self.key.to_string(),
                    existing: existing.name().to_string(),
                    requested: destination_type.name().to_string(),
                });
            }
        }
        self.destination_type = Some(destination_type);
        Ok(())
    }

    pub fn set_name_translator(&mut self, translator: Arc<dyn MemberNameTranslator>) {
        self.name_translator = Some(translator);
    }

    /// Destination name of an unconfigured source member
    #[must_use]
    pub fn destination_member_name(&self, source_name: &str) -> String {
        self.name_translator
            .as_ref()
            .map_or_else(|| source_name.to_string(), |t| t.to_destination(source_name))
    }

    /// Source name of an unconfigured destination member
    #[must_use]
    pub fn source_member_name(&self, destination_name: &str) -> String {
        self.name_translator
            .as_ref()
            .map_or_else(|| destination_name.to_string(), |t| t.to_source(destination_name))
    }

    /// Absorb the configuration of another mapping
    ///
    /// Steps of `other` are appended after the steps configured here. Types,
    /// converter and handlers of `other` replace the ones set here when
    /// present.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPath` if replaying a step of `other` fails.
    pub fn merge(&mut self, other: &Mapping) -> Result<()> {
        debug!(mapping = %self.key, from = %other.key, "merging mapping configuration");
        self.tree.merge(&other.tree)?;
        if let Some(source_type) = &other.source_type {
            self.source_type = Some(source_type.clone());
        }
        if let Some(destination_type) = &other.destination_type {
            self.destination_type = Some(destination_type.clone());
        }
        if let Some(converter) = &other.converter {
            self.converter = Some(converter.clone());
        }
        if let Some(handler) = &other.for_all_members {
            self.for_all_members = Some(handler.clone());
        }
        if let Some(translator) = &other.name_translator {
            self.name_translator = Some(translator.clone());
        }
        self.ignore_all_non_existing |= other.ignore_all_non_existing;
        Ok(())
    }

    pub(crate) fn create_destination_object(&self) -> Map<String, Value> {
        self.destination_type
            .as_ref()
            .map(TypeDescriptor::instantiate)
            .unwrap_or_default()
    }

    pub(crate) fn resolution_context(&self, source: &Value) -> ResolutionContext {
        ResolutionContext {
            source_value: source.clone(),
            source_key: self.key.source.clone(),
            destination_key: self.key.destination.clone(),
        }
    }
}

impl fmt::Debug for Mapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mapping")
            .field("key", &self.key)
            .field("source_type", &self.source_type)
            .field("destination_type", &self.destination_type)
            .field("converter", &self.converter)
            .field("tree", &self.tree)
            .field("ignore_all_non_existing", &self.ignore_all_non_existing)
            .field("for_all_members", &self.for_all_members.as_ref().map(|_| "<fn>"))
            .field("name_translator", &self.name_translator.as_ref().map(|_| "<translator>"))
            .finish()
    }
}
