//! Validation rules
//!
//! Each rule inspects one mapping against its source and destination type
//! descriptors and returns the member paths that violate it.

use automap_core::{Mapping, PropertyPath, TypeDescriptor};

/// The kind of problem a rule reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleKind {
    /// Source or destination type metadata is missing
    UnspecifiedTypes,
    /// A configured destination member is not declared on the destination type
    UnknownDestinationMember,
    /// A configured source member is not declared on the source type
    UnknownSourceMember,
    /// An unconfigured source member has no destination counterpart
    UnmappedSourceMember,
    /// An unconfigured destination member has no source counterpart
    UnmappedDestinationMember,
}

impl RuleKind {
    /// Stable code for reports
    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            Self::UnspecifiedTypes => "UNSPECIFIED_TYPES",
            Self::UnknownDestinationMember => "UNKNOWN_DESTINATION_MEMBER",
            Self::UnknownSourceMember => "UNKNOWN_SOURCE_MEMBER",
            Self::UnmappedSourceMember => "UNMAPPED_SOURCE_MEMBER",
            Self::UnmappedDestinationMember => "UNMAPPED_DESTINATION_MEMBER",
        }
    }

    /// Human readable description of a violation at `path`
    #[must_use]
    pub fn describe(self, path: &str, source: &TypeDescriptor, destination: &TypeDescriptor) -> String {
        let types = format!(
            "(source: '{}', destination: '{}')",
            source.name(),
            destination.name()
        );
        match self {
            Self::UnspecifiedTypes => {
                "mapping.sourceType or mapping.destinationType are unspecified".to_string()
            }
            Self::UnknownDestinationMember => format!(
                "Destination member '{path}' is configured, but does not exist on destination type {types}."
            ),
            Self::UnknownSourceMember => format!(
                "Source member '{path}' is configured, but does not exist on source type {types}."
            ),
            Self::UnmappedSourceMember => format!(
                "Source member '{path}' is configured to be mapped, but does not exist on destination type {types}."
            ),
            Self::UnmappedDestinationMember => {
                format!("Destination member '{path}' does not exist on source type {types}.")
            }
        }
    }
}

/// A rule violation: which rule and which member path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub kind: RuleKind,
    pub path: String,
}

impl Violation {
    fn new(kind: RuleKind, path: impl Into<String>) -> Self {
        Self {
            kind,
            path: path.into(),
        }
    }
}

/// Configured destination leaves must exist on the destination type
#[must_use]
pub fn validate_configured_destination_members(
    mapping: &Mapping,
    destination: &TypeDescriptor,
) -> Vec<Violation> {
    mapping
        .tree()
        .configured_members()
        .into_iter()
        .filter(|(_, member)| !member.is_source_mapping())
        .filter(|(property, _)| !destination.has_member(property.path()))
        .map(|(property, _)| Violation::new(RuleKind::UnknownDestinationMember, property.path().to_string()))
        .collect()
}

/// Source member configuration must point at members of the source type
#[must_use]
pub fn validate_configured_source_members(mapping: &Mapping, source: &TypeDescriptor) -> Vec<Violation> {
    mapping
        .tree()
        .configured_members()
        .into_iter()
        .filter(|(_, member)| member.is_source_mapping())
        .filter(|(_, member)| !source.has_member(member.source_path()))
        .map(|(_, member)| Violation::new(RuleKind::UnknownSourceMember, member.source_path().to_string()))
        .collect()
}

/// Unconfigured source members must have a destination counterpart
#[must_use]
pub fn validate_unmapped_source_members(
    mapping: &Mapping,
    source: &TypeDescriptor,
    destination: &TypeDescriptor,
) -> Vec<Violation> {
    let tree = mapping.tree();
    source
        .members()
        .keys()
        .filter(|name| !tree.has_source_root(name))
        .filter(|name| {
            let target = mapping.destination_member_name(name);
            !tree.has_destination_root(&target) && !destination.has_member(&PropertyPath::single(target))
        })
        .map(|name| Violation::new(RuleKind::UnmappedSourceMember, name.clone()))
        .collect()
}

/// Unconfigured destination members must have a source counterpart
#[must_use]
pub fn validate_unmapped_destination_members(
    mapping: &Mapping,
    source: &TypeDescriptor,
    destination: &TypeDescriptor,
) -> Vec<Violation> {
    let tree = mapping.tree();
    destination
        .members()
        .keys()
        .filter(|name| !tree.has_destination_root(name))
        .filter(|name| {
            let origin = mapping.source_member_name(name);
            !tree.has_source_root(&origin) && !source.has_member(&PropertyPath::single(origin))
        })
        .map(|name| Violation::new(RuleKind::UnmappedDestinationMember, name.clone()))
        .collect()
}
