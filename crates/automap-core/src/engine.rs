//! Synchronous execution engine

use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

use crate::converter::Converter;
use crate::mapping::Mapping;
use crate::pipeline::{self, Resolution};
use crate::{Error, Result};

impl Mapping {
    /// Map an optional source value
    ///
    /// `None` (undefined) maps to `None`, `null` to `null`, arrays element by
    /// element, anything else through the member configuration.
    ///
    /// # Errors
    ///
    /// Fails when a converter or member function fails, and with
    /// `AsynchronousConfiguration` when the mapping needs the async engine.
    pub fn map(&self, source: Option<&Value>) -> Result<Option<Value>> {
        source.map(|value| self.map_value(value)).transpose()
    }

    /// Map a source value
    ///
    /// # Errors
    ///
    /// See [`Mapping::map`].
    pub fn map_value(&self, source: &Value) -> Result<Value> {
        match source {
            Value::Null => Ok(Value::Null),
            Value::Array(items) => {
                debug!(mapping = %self.key(), items = items.len(), "mapping array");
                items
                    .iter()
                    .map(|item| {
                        if item.is_null() {
                            Ok(Value::Null)
                        } else {
                            self.map_item(item)
                        }
                    })
                    .collect::<Result<Vec<_>>>()
                    .map(Value::Array)
            }
            item => self.map_item(item),
        }
    }

    /// Map a sequence that may contain undefined elements
    ///
    /// Undefined and `null` elements pass through; the length is preserved.
    ///
    /// # Errors
    ///
    /// See [`Mapping::map`].
    pub fn map_items(&self, items: &[Option<Value>]) -> Result<Vec<Option<Value>>> {
        items.iter().map(|item| self.map(item.as_ref())).collect()
    }

    fn map_item(&self, source: &Value) -> Result<Value> {
        if let Some(converter) = self.converter() {
            return match converter {
                Converter::Sync(converter) => converter.convert(&self.resolution_context(source)),
                Converter::Async(_) => Err(Error::asynchronous_configuration(
                    self.key().to_string(),
                    "its type converter",
                )),
            };
        }

        let source_object = Arc::new(source.clone());
        let mut destination = self.create_destination_object();
        let mut written = Vec::new();

        for (property, member) in self.tree().configured_members() {
            if let Resolution::Assign(value) =
                pipeline::resolve_member(self, property, member, &source_object)?
            {
                property.path().write(&mut destination, value);
                written.push(property.path().clone());
            }
        }

        pipeline::complete(self, source, &mut destination, &mut written);
        Ok(Value::Object(destination))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::member::MemberConfig;
    use crate::mapping::TypeDescriptor;
    use serde_json::json;

    #[test]
    fn test_identity_mapping_copies_members() {
        let mapping = Mapping::new("a", "b");
        let source = json!({ "name": "John", "age": 42 });
        assert_eq!(mapping.map_value(&source).unwrap(), source);
    }

    #[test]
    fn test_null_and_undefined_sources() {
        let mapping = Mapping::new("a", "b");
        assert_eq!(mapping.map(None).unwrap(), None);
        assert_eq!(mapping.map(Some(&Value::Null)).unwrap(), Some(Value::Null));
    }

    #[test]
    fn test_array_elements_are_mapped_independently() {
        let mut mapping = Mapping::new("a", "b");
        mapping.configure_member("label", MemberConfig::map_from("prop")).unwrap();

        let result = mapping.map_value(&json!([{ "prop": "a" }, null])).unwrap();
        assert_eq!(result, json!([{ "label": "a" }, null]));
    }

    #[test]
    fn test_async_step_is_rejected() {
        let mut mapping = Mapping::new("a", "b");
        mapping
            .configure_member("x", MemberConfig::custom_async(|_| async { Ok(None) }))
            .unwrap();

        let err = mapping.map_value(&json!({})).unwrap_err();
        assert!(matches!(err, Error::AsynchronousConfiguration { .. }));
    }

    #[test]
    fn test_destination_type_seeds_defaults() {
        let mut mapping = Mapping::new("a", "b");
        mapping
            .set_destination_type(
                TypeDescriptor::new("Dto")
                    .with_member("name", Value::Null)
                    .with_member("active", true),
            )
            .unwrap();

        let result = mapping.map_value(&json!({ "name": "x", "other": 1 })).unwrap();
        assert_eq!(result, json!({ "name": "x", "active": true }));
    }
}
