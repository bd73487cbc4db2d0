//! Asynchronous execution engine
//!
//! Each configured member resolves in its own future; steps within a member
//! run strictly in order while sibling members (and array elements) are
//! polled concurrently and joined before the destination object is
//! assembled. Results are written in configuration order, so the output
//! matches the synchronous engine.

use futures::future::join_all;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

use crate::converter::Converter;
use crate::mapping::Mapping;
use crate::pipeline::{self, Resolution};
use crate::Result;

impl Mapping {
    /// Asynchronous counterpart of [`Mapping::map`]
    ///
    /// # Errors
    ///
    /// Fails when a converter or member function fails.
    pub async fn map_async(&self, source: Option<&Value>) -> Result<Option<Value>> {
        match source {
            None => Ok(None),
            Some(value) => self.map_value_async(value).await.map(Some),
        }
    }

    /// Asynchronous counterpart of [`Mapping::map_value`]
    ///
    /// # Errors
    ///
    /// See [`Mapping::map_async`].
    pub async fn map_value_async(&self, source: &Value) -> Result<Value> {
        match source {
            Value::Null => Ok(Value::Null),
            Value::Array(items) => {
                debug!(mapping = %self.key(), items = items.len(), "mapping array asynchronously");
                join_all(items.iter().map(|item| self.map_element_async(item)))
                    .await
                    .into_iter()
                    .collect::<Result<Vec<_>>>()
                    .map(Value::Array)
            }
            item => self.map_item_async(item).await,
        }
    }

    /// Asynchronous counterpart of [`Mapping::map_items`]
    ///
    /// # Errors
    ///
    /// See [`Mapping::map_async`].
    pub async fn map_items_async(&self, items: &[Option<Value>]) -> Result<Vec<Option<Value>>> {
        join_all(items.iter().map(|item| self.map_async(item.as_ref())))
            .await
            .into_iter()
            .collect()
    }

    async fn map_element_async(&self, item: &Value) -> Result<Value> {
        if item.is_null() {
            Ok(Value::Null)
        } else {
            self.map_item_async(item).await
        }
    }

    async fn map_item_async(&self, source: &Value) -> Result<Value> {
        if let Some(converter) = self.converter() {
            let context = self.resolution_context(source);
            return match converter {
                Converter::Sync(converter) => converter.convert(&context),
                Converter::Async(convert) => convert(context).await,
            };
        }

        let source_object = Arc::new(source.clone());
        let members = self.tree().configured_members();
        let resolutions = join_all(members.iter().map(|(property, member)| {
            pipeline::resolve_member_async(property, member, &source_object)
        }))
        .await;

        let mut destination = self.create_destination_object();
        let mut written = Vec::new();
        for ((property, _), resolution) in members.iter().zip(resolutions) {
            if let Resolution::Assign(value) = resolution? {
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
    use crate::converter::BaseTypeConverter;
    use crate::member::MemberConfig;
    use crate::Error;
    use serde_json::json;

    #[tokio::test]
    async fn test_async_identity_mapping() {
        let mapping = Mapping::new("a", "b");
        let source = json!({ "name": "John" });
        assert_eq!(mapping.map_async(Some(&source)).await.unwrap(), Some(source));
        assert_eq!(mapping.map_async(None).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_async_converter() {
        let mut mapping = Mapping::new("a", "b");
        mapping.set_converter(Converter::from_async_fn(|context| async move {
            Ok(json!({ "wrapped": context.source_value }))
        }));

        let result = mapping.map_value_async(&json!([1, null])).await.unwrap();
        assert_eq!(result, json!([{ "wrapped": 1 }, null]));
    }

    #[tokio::test]
    async fn test_async_abstract_converter_fails() {
        let mut mapping = Mapping::new("a", "b");
        mapping.set_converter(Converter::from_type_converter(BaseTypeConverter));

        let err = mapping.map_value_async(&json!({})).await.unwrap_err();
        assert!(matches!(err, Error::AbstractConverter));
    }

    #[tokio::test]
    async fn test_async_engine_accepts_sync_steps() {
        let mut mapping = Mapping::new("a", "b");
        mapping.configure_member("x", MemberConfig::constant(1)).unwrap();
        mapping
            .configure_member(
                "x",
                MemberConfig::custom(|context| {
                    let current = context.intermediate_property_value.clone().unwrap_or_default();
                    Ok(Some(json!(current.as_i64().unwrap_or_default() + 1)))
                }),
            )
            .unwrap();

        let result = mapping.map_value_async(&json!({})).await.unwrap();
        assert_eq!(result, json!({ "x": 2 }));
    }
}
