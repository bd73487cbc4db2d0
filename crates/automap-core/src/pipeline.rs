//! Transformation pipeline
//!
//! Resolves one destination leaf by folding its steps over the value read at
//! its source path, then fills in automapped members and runs the
//! all-members handler. Shared by the synchronous and asynchronous engines.

use serde_json::{Map, Value};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::trace;

use crate::mapping::Mapping;
use crate::member::{MemberConfig, MemberContext};
use crate::path::PropertyPath;
use crate::tree::{DestinationProperty, MemberMapping};
use crate::{Error, Result};

/// Outcome of resolving one destination leaf
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Resolution {
    Assign(Value),
    Skip,
}

impl Resolution {
    fn from_value(value: Option<Value>) -> Self {
        value.map_or(Self::Skip, Self::Assign)
    }
}

/// Seed value of a leaf, `None` when the leaf is ignored or its condition fails
fn seed(member: &MemberMapping, source: &Value) -> Option<Option<Value>> {
    if member.is_ignored() {
        return None;
    }
    if let Some(condition) = member.condition() {
        if !condition(source) {
            return None;
        }
    }
    Some(member.source_path().read(source).cloned())
}

fn context(
    property: &DestinationProperty,
    member: &MemberMapping,
    source: &Arc<Value>,
    value: Option<&Value>,
    ignored: &Arc<AtomicBool>,
) -> MemberContext {
    MemberContext::new(
        Arc::clone(source),
        member.source_path().to_string(),
        property.path().to_string(),
        value.cloned(),
        Arc::clone(ignored),
    )
}

pub(crate) fn resolve_member(
    mapping: &Mapping,
    property: &DestinationProperty,
    member: &MemberMapping,
    source: &Arc<Value>,
) -> Result<Resolution> {
    let Some(mut value) = seed(member, source) else {
        trace!(member = %property.path(), "member skipped");
        return Ok(Resolution::Skip);
    };
    let ignored = Arc::new(AtomicBool::new(false));

    for transformation in member.transformations() {
        match &transformation.config {
            MemberConfig::Constant(constant) => value = Some(constant.clone()),
            MemberConfig::Custom(function) => {
                let options = context(property, member, source, value.as_ref(), &ignored);
                if let Some(next) = function(&options)? {
                    value = Some(next);
                }
            }
            MemberConfig::AsyncCustom(_) => {
                return Err(Error::asynchronous_configuration(
                    mapping.key().to_string(),
                    format!("member '{}'", property.path()),
                ));
            }
            MemberConfig::MapFrom(_) | MemberConfig::Ignore | MemberConfig::Condition(_) => {}
        }
        if ignored.load(Ordering::SeqCst) {
            trace!(member = %property.path(), "member ignored during execution");
            return Ok(Resolution::Skip);
        }
    }

    Ok(Resolution::from_value(value))
}

pub(crate) async fn resolve_member_async(
    property: &DestinationProperty,
    member: &MemberMapping,
    source: &Arc<Value>,
) -> Result<Resolution> {
    let Some(mut value) = seed(member, source) else {
        trace!(member = %property.path(), "member skipped");
        return Ok(Resolution::Skip);
    };
    let ignored = Arc::new(AtomicBool::new(false));

    for transformation in member.transformations() {
        match &transformation.config {
            MemberConfig::Constant(constant) => value = Some(constant.clone()),
            MemberConfig::Custom(function) => {
                let options = context(property, member, source, value.as_ref(), &ignored);
                if let Some(next) = function(&options)? {
                    value = Some(next);
                }
            }
            MemberConfig::AsyncCustom(function) => {
                let options = context(property, member, source, value.as_ref(), &ignored);
                if let Some(next) = function(options).await? {
                    value = Some(next);
                }
            }
            MemberConfig::MapFrom(_) | MemberConfig::Ignore | MemberConfig::Condition(_) => {}
        }
        if ignored.load(Ordering::SeqCst) {
            trace!(member = %property.path(), "member ignored during execution");
            return Ok(Resolution::Skip);
        }
    }

    Ok(Resolution::from_value(value))
}

/// Keep only the members a nested type template declares
fn filter_to_template(value: &Value, template: &Value) -> Value {
    match (value, template) {
        (Value::Object(object), Value::Object(members)) if !members.is_empty() => Value::Object(
            object
                .iter()
                .filter_map(|(name, nested)| {
                    members
                        .get(name)
                        .map(|nested_template| (name.clone(), filter_to_template(nested, nested_template)))
                })
                .collect(),
        ),
        _ => value.clone(),
    }
}

/// Copy unconfigured source members to the destination
fn automap(
    mapping: &Mapping,
    source: &Map<String, Value>,
    destination: &mut Map<String, Value>,
    written: &mut Vec<PropertyPath>,
) {
    if mapping.ignores_all_non_existing() {
        return;
    }

    let tree = mapping.tree();
    for (name, value) in source {
        if tree.has_source_root(name) {
            continue;
        }
        let target = mapping.destination_member_name(name);
        if tree.has_destination_root(&target) {
            continue;
        }

        let value = match mapping.destination_type() {
            Some(destination_type) => match destination_type.members().get(&target) {
                Some(template) => filter_to_template(value, template),
                None => continue,
            },
            None => value.clone(),
        };

        trace!(member = %name, destination = %target, "automapping member");
        destination.insert(target.clone(), value);
        written.push(PropertyPath::single(target));
    }
}

fn apply_for_all_members(mapping: &Mapping, destination: &mut Map<String, Value>, written: &[PropertyPath]) {
    let Some(handler) = mapping.for_all_members() else {
        return;
    };

    for path in written {
        let Some(value) = path.read_in(destination).cloned() else {
            continue;
        };
        if let Some(parent) = path.parent_object_mut(destination) {
            handler(parent, path.leaf(), &value);
        }
    }
}

/// Automapping and the all-members handler, run after configured members
pub(crate) fn complete(
    mapping: &Mapping,
    source: &Value,
    destination: &mut Map<String, Value>,
    written: &mut Vec<PropertyPath>,
) {
    if let Some(object) = source.as_object() {
        automap(mapping, object, destination, written);
    }
    apply_for_all_members(mapping, destination, written);
}
