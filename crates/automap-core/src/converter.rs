//! Whole-object type converters
//!
//! A mapping with a converter skips member-level logic entirely and returns
//! whatever the converter produces for each source item.

use futures::future::{BoxFuture, FutureExt};
use serde_json::Value;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use crate::{Error, Result};

/// Input handed to a converter
#[derive(Debug, Clone)]
pub struct ResolutionContext {
    pub source_value: Value,
    pub source_key: String,
    pub destination_key: String,
}

/// Converts a complete source value into a destination value
///
/// Implementors override [`TypeConverter::convert`]; the provided
/// implementation fails, so [`BaseTypeConverter`] cannot be used as is.
pub trait TypeConverter: Send + Sync {
    /// Convert the source value of `context`
    ///
    /// # Errors
    ///
    /// The default implementation always returns `AbstractConverter`.
    fn convert(&self, context: &ResolutionContext) -> Result<Value> {
        let _ = context;
        Err(Error::AbstractConverter)
    }
}

/// The unextended converter base
#[derive(Debug, Default, Clone, Copy)]
pub struct BaseTypeConverter;

impl TypeConverter for BaseTypeConverter {}

struct FnConverter<F>(F);

impl<F> TypeConverter for FnConverter<F>
where
    F: Fn(&ResolutionContext) -> Result<Value> + Send + Sync,
{
    fn convert(&self, context: &ResolutionContext) -> Result<Value> {
        (self.0)(context)
    }
}

/// Asynchronous converter function
pub type AsyncConvertFn =
    Arc<dyn Fn(ResolutionContext) -> BoxFuture<'static, Result<Value>> + Send + Sync>;

/// Converter registered on a mapping
#[derive(Clone)]
pub enum Converter {
    Sync(Arc<dyn TypeConverter>),
    /// Only usable from the asynchronous engine
    Async(AsyncConvertFn),
}

impl Converter {
    #[must_use]
    pub fn from_type_converter<C>(converter: C) -> Self
    where
        C: TypeConverter + 'static,
    {
        Self::Sync(Arc::new(converter))
    }

    #[must_use]
    pub fn from_fn<F>(function: F) -> Self
    where
        F: Fn(&ResolutionContext) -> Result<Value> + Send + Sync + 'static,
    {
        Self::Sync(Arc::new(FnConverter(function)))
    }

    #[must_use]
    pub fn from_async_fn<F, Fut>(function: F) -> Self
    where
        F: Fn(ResolutionContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value>> + Send + 'static,
    {
        Self::Async(Arc::new(move |context| function(context).boxed()))
    }

    #[must_use]
    pub fn is_async(&self) -> bool {
        matches!(self, Self::Async(_))
    }
}

impl fmt::Debug for Converter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sync(_) => f.write_str("Converter::Sync(<converter>)"),
            Self::Async(_) => f.write_str("Converter::Async(<fn>)"),
        }
    }
}
