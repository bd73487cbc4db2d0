//! Mapping documents
//!
//! Declarative YAML form of mapper configuration: type metadata, profiles
//! with naming conventions, and mappings built from member steps.
//!
//! ```yaml
//! types:
//!   Person: { fullName: null, age: null }
//! mappings:
//!   - source: Person
//!     destination: PersonDto
//!     members:
//!       - member: name
//!         steps:
//!           - op: map_from
//!             path: fullName
//!           - op: call
//!             function: uppercase
//! ```

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

use automap_core::member::ConditionFn;
use automap_core::{MemberConfig, PropertyPath, TypeDescriptor};

use crate::extensions::ExtensionRegistry;
use crate::mapper::{MapKey, Mapper, MappingConfigurator};
use crate::naming::{NamingConvention, convention_by_name};
use crate::profile::{Profile, ProfileConfiguration};
use crate::{Error, Result};

fn default_extension() -> String {
    "string_utils".to_string()
}

/// A complete mapping document
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MappingDocument {
    /// Type metadata by name: member names with default values
    #[serde(default)]
    pub types: BTreeMap<String, Map<String, Value>>,

    #[serde(default)]
    pub profiles: Vec<ProfileDefinition>,

    #[serde(default)]
    pub mappings: Vec<MappingDefinition>,
}

/// A profile declared in a document
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProfileDefinition {
    pub name: String,

    /// Naming convention name (`pascal_case`, `camel_case`)
    #[serde(default)]
    pub source_naming: Option<String>,

    #[serde(default)]
    pub destination_naming: Option<String>,

    #[serde(default)]
    pub mappings: Vec<MappingDefinition>,
}

/// One mapping between a source key and a destination key
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MappingDefinition {
    pub source: String,
    pub destination: String,

    /// Declared type describing the source; defaults to the type named like
    /// the source key, if any
    #[serde(default)]
    pub source_type: Option<String>,

    #[serde(default)]
    pub destination_type: Option<String>,

    /// Profile applied after the members below are configured
    #[serde(default)]
    pub profile: Option<String>,

    #[serde(default)]
    pub ignore_all_non_existing: bool,

    #[serde(default)]
    pub convert_using: Option<FunctionRef>,

    #[serde(default)]
    pub members: Vec<MemberDefinition>,

    #[serde(default)]
    pub source_members: Vec<MemberDefinition>,
}

/// Reference to an extension function
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FunctionRef {
    #[serde(default = "default_extension")]
    pub extension: String,
    pub function: String,
}

/// Ordered steps for one (dotted) member path
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MemberDefinition {
    pub member: String,
    #[serde(default)]
    pub steps: Vec<MemberStep>,
}

/// One configuration step
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum MemberStep {
    /// Feed the member from another source path
    MapFrom { path: String },

    /// Leave the member out
    Ignore,

    /// Use a fixed value
    Constant { value: Value },

    /// Only map the member when the condition holds for the source object
    Condition { when: Condition },

    /// Call an extension function with the current value followed by `args`
    Call {
        #[serde(default = "default_extension")]
        extension: String,
        function: String,
        #[serde(default)]
        args: Vec<Value>,
    },
}

/// Condition evaluated against the source object
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Condition {
    /// Check if field exists and is not empty
    Exists { field: String },

    /// Check if field equals value
    Equals { field: String, value: Value },

    /// Check if field contains value
    Contains { field: String, value: String },

    /// Check if field matches regex pattern
    Matches { field: String, pattern: String },

    /// Logical AND of conditions
    And { conditions: Vec<Condition> },

    /// Logical OR of conditions
    Or { conditions: Vec<Condition> },

    /// Logical NOT of condition
    Not { condition: Box<Condition> },
}

fn as_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn field_path(field: &str) -> Result<PropertyPath> {
    Ok(PropertyPath::parse(field)?)
}

impl Condition {
    /// Evaluate against a source object
    ///
    /// # Errors
    ///
    /// Returns an error for malformed field paths or regex patterns.
    pub fn evaluate(&self, source: &Value) -> Result<bool> {
        let predicate = self.compile()?;
        Ok(predicate(source))
    }

    /// Compile into a predicate, validating paths and patterns once
    ///
    /// # Errors
    ///
    /// Returns an error for malformed field paths or regex patterns.
    pub fn compile(&self) -> Result<ConditionFn> {
        let predicate: ConditionFn = match self {
            Self::Exists { field } => {
                let path = field_path(field)?;
                Arc::new(move |source: &Value| match path.read(source) {
                    None | Some(Value::Null) => false,
                    Some(Value::String(s)) => !s.is_empty(),
                    Some(_) => true,
                })
            }
            Self::Equals { field, value } => {
                let path = field_path(field)?;
                let expected = as_text(value);
                Arc::new(move |source: &Value| path.read(source).is_some_and(|v| as_text(v) == expected))
            }
            Self::Contains { field, value } => {
                let path = field_path(field)?;
                let needle = value.clone();
                Arc::new(move |source: &Value| match path.read(source) {
                    Some(Value::Array(items)) => items.iter().any(|item| as_text(item) == needle),
                    Some(other) => as_text(other).contains(&needle),
                    None => false,
                })
            }
            Self::Matches { field, pattern } => {
                let path = field_path(field)?;
                let regex = Regex::new(pattern).map_err(|e| ParseError {
                    message: format!("Invalid pattern '{pattern}': {e}"),
                    line: None,
                    column: None,
                })?;
                Arc::new(move |source: &Value| path.read(source).is_some_and(|v| regex.is_match(&as_text(v))))
            }
            Self::And { conditions } => {
                let compiled = conditions.iter().map(Self::compile).collect::<Result<Vec<_>>>()?;
                Arc::new(move |source: &Value| compiled.iter().all(|c| c(source)))
            }
            Self::Or { conditions } => {
                let compiled = conditions.iter().map(Self::compile).collect::<Result<Vec<_>>>()?;
                Arc::new(move |source: &Value| compiled.iter().any(|c| c(source)))
            }
            Self::Not { condition } => {
                let inner = condition.compile()?;
                Arc::new(move |source: &Value| !inner(source))
            }
        };
        Ok(predicate)
    }
}

impl MemberStep {
    fn to_config(&self, extensions: &ExtensionRegistry) -> Result<MemberConfig> {
        Ok(match self {
            Self::MapFrom { path } => MemberConfig::map_from(path.clone()),
            Self::Ignore => MemberConfig::ignore(),
            Self::Constant { value } => MemberConfig::constant(value.clone()),
            Self::Condition { when } => MemberConfig::Condition(when.compile()?),
            Self::Call {
                extension,
                function,
                args,
            } => {
                let resolved = extensions.function(extension, function)?;
                if !resolved.arity.accepts(args.len() + 1) {
                    return Err(Error::arity(function.clone(), &resolved.arity, args.len() + 1));
                }
                let name = function.clone();
                let args = args.clone();
                MemberConfig::custom(move |context| {
                    let mut call_args = Vec::with_capacity(args.len() + 1);
                    call_args.push(context.intermediate_property_value.clone().unwrap_or(Value::Null));
                    call_args.extend(args.iter().cloned());
                    resolved.call(&name, &call_args).map(Some).map_err(|e| {
                        automap_core::Error::transformation(
                            context.destination_property_name.clone(),
                            e.to_string(),
                        )
                    })
                })
            }
        })
    }
}

impl MappingDefinition {
    fn configure(&self, configurator: &mut MappingConfigurator<'_>, extensions: &ExtensionRegistry) -> Result<()> {
        for member in &self.members {
            for step in &member.steps {
                configurator.for_member(&member.member, step.to_config(extensions)?)?;
            }
        }
        for member in &self.source_members {
            for step in &member.steps {
                configurator.for_source_member(&member.member, step.to_config(extensions)?)?;
            }
        }
        if self.ignore_all_non_existing {
            configurator.ignore_all_non_existing()?;
        }
        if let Some(converter) = &self.convert_using {
            configurator.convert_using_extension(&converter.extension, &converter.function)?;
        }
        if let Some(profile) = &self.profile {
            configurator.with_profile(profile)?;
        }
        Ok(())
    }
}

struct DocumentProfile<'d> {
    document: &'d MappingDocument,
    definition: &'d ProfileDefinition,
    source_naming: Option<Arc<dyn NamingConvention>>,
    destination_naming: Option<Arc<dyn NamingConvention>>,
    extensions: ExtensionRegistry,
}

fn naming(name: Option<&String>) -> Result<Option<Arc<dyn NamingConvention>>> {
    name.map(|name| convention_by_name(name).ok_or_else(|| Error::UnknownNamingConvention(name.clone())))
        .transpose()
}

impl Profile for DocumentProfile<'_> {
    fn profile_name(&self) -> &str {
        &self.definition.name
    }

    fn source_member_naming_convention(&self) -> Option<Arc<dyn NamingConvention>> {
        self.source_naming.clone()
    }

    fn destination_member_naming_convention(&self) -> Option<Arc<dyn NamingConvention>> {
        self.destination_naming.clone()
    }

    fn configure(&self, config: &mut ProfileConfiguration<'_>) -> Result<()> {
        for mapping in &self.definition.mappings {
            let (source, destination) = self.document.keys(mapping)?;
            let mut configurator = config.create_map(source, destination)?;
            mapping.configure(&mut configurator, &self.extensions)?;
        }
        Ok(())
    }
}

impl MappingDocument {
    /// See [`MappingDsl::parse`]
    ///
    /// # Errors
    ///
    /// Returns an error when YAML parsing fails.
    pub fn parse(yaml: &str) -> std::result::Result<Self, ParseError> {
        MappingDsl::parse(yaml)
    }

    /// See [`MappingDsl::parse_file`]
    ///
    /// # Errors
    ///
    /// Returns an error when the file cannot be read or parsed.
    pub fn parse_file(path: &std::path::Path) -> std::result::Result<Self, ParseError> {
        MappingDsl::parse_file(path)
    }

    /// Declared type metadata by name
    ///
    /// # Errors
    ///
    /// Returns `UnknownType` for undeclared names.
    pub fn type_descriptor(&self, name: &str) -> Result<TypeDescriptor> {
        self.types
            .get(name)
            .map(|members| TypeDescriptor::from_members(name, members.clone()))
            .ok_or_else(|| Error::UnknownType(name.to_string()))
    }

    fn key(&self, key: &str, declared_type: Option<&String>) -> Result<MapKey> {
        let type_name = match declared_type {
            Some(name) => name.as_str(),
            None if self.types.contains_key(key) => key,
            None => return Ok(MapKey::from(key)),
        };
        let members = self.type_descriptor(type_name)?.members().clone();
        Ok(MapKey::Type(TypeDescriptor::from_members(key, members)))
    }

    fn keys(&self, mapping: &MappingDefinition) -> Result<(MapKey, MapKey)> {
        Ok((
            self.key(&mapping.source, mapping.source_type.as_ref())?,
            self.key(&mapping.destination, mapping.destination_type.as_ref())?,
        ))
    }

    /// Register the document's profiles, then its mappings, on `mapper`
    ///
    /// # Errors
    ///
    /// Fails on the first invalid type reference, naming convention,
    /// extension function, path or profile name.
    pub fn apply(&self, mapper: &mut Mapper) -> Result<()> {
        let extensions = mapper.extensions().clone();

        for definition in &self.profiles {
            let profile = DocumentProfile {
                document: self,
                definition,
                source_naming: naming(definition.source_naming.as_ref())?,
                destination_naming: naming(definition.destination_naming.as_ref())?,
                extensions: extensions.clone(),
            };
            mapper.add_profile(&profile)?;
        }

        for mapping in &self.mappings {
            debug!(source = %mapping.source, destination = %mapping.destination, "applying document mapping");
            let (source, destination) = self.keys(mapping)?;
            let mut configurator = mapper.create_map(source, destination)?;
            mapping.configure(&mut configurator, &extensions)?;
        }

        info!(
            profiles = self.profiles.len(),
            mappings = self.mappings.len(),
            "applied mapping document"
        );
        Ok(())
    }
}

/// DSL Parser
pub struct MappingDsl;

/// Parse error type
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub message: String,
    pub line: Option<usize>,
    pub column: Option<usize>,
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)?;
        if let (Some(line), Some(col)) = (self.line, self.column) {
            write!(f, " at line {line}, column {col}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ParseError {}

impl MappingDsl {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Parse a mapping document from YAML
    ///
    /// # Errors
    ///
    /// Returns an error when YAML parsing fails.
    pub fn parse(yaml: &str) -> std::result::Result<MappingDocument, ParseError> {
        serde_yaml::from_str(yaml).map_err(|e| ParseError {
            message: format!("Failed to parse mapping document: {e}"),
            line: e.location().map(|l| l.line()),
            column: e.location().map(|l| l.column()),
        })
    }

    /// Parse a mapping document from a file
    ///
    /// # Errors
    ///
    /// Returns an error when the file cannot be read or parsed.
    pub fn parse_file(path: &std::path::Path) -> std::result::Result<MappingDocument, ParseError> {
        let content = std::fs::read_to_string(path).map_err(|e| ParseError {
            message: format!("Failed to read file '{}': {e}", path.display()),
            line: None,
            column: None,
        })?;
        Self::parse(&content)
    }

    /// Serialize a mapping document to YAML
    ///
    /// # Errors
    ///
    /// Returns an error when serialization fails.
    pub fn to_yaml(document: &MappingDocument) -> std::result::Result<String, ParseError> {
        serde_yaml::to_string(document).map_err(|e| ParseError {
            message: format!("Failed to serialize: {e}"),
            line: None,
            column: None,
        })
    }
}

impl Default for MappingDsl {
    fn default() -> Self {
        Self::new()
    }
}
