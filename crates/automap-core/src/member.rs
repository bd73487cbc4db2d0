//! Member configuration descriptors and transformation steps

use futures::future::{BoxFuture, FutureExt};
use serde_json::Value;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::Result;

/// Synchronous member function. Returning `Ok(None)` keeps the current
/// intermediate value.
pub type MemberFn = Arc<dyn Fn(&MemberContext) -> Result<Option<Value>> + Send + Sync>;

/// Asynchronous member function
pub type AsyncMemberFn =
    Arc<dyn Fn(MemberContext) -> BoxFuture<'static, Result<Option<Value>>> + Send + Sync>;

/// Predicate evaluated against the source object
pub type ConditionFn = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

/// One configuration call for a member
#[derive(Clone)]
pub enum MemberConfig {
    /// Feed the member from another (dotted) source path
    MapFrom(String),
    /// Leave the member out of the destination
    Ignore,
    /// Use a fixed value
    Constant(Value),
    /// Only map the member when the predicate holds for the source object
    Condition(ConditionFn),
    /// Compute the value with a function
    Custom(MemberFn),
    /// Compute the value with an asynchronous function
    AsyncCustom(AsyncMemberFn),
}

impl MemberConfig {
    #[must_use]
    pub fn map_from(path: impl Into<String>) -> Self {
        Self::MapFrom(path.into())
    }

    #[must_use]
    pub fn ignore() -> Self {
        Self::Ignore
    }

    #[must_use]
    pub fn constant(value: impl Into<Value>) -> Self {
        Self::Constant(value.into())
    }

    #[must_use]
    pub fn condition<F>(predicate: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        Self::Condition(Arc::new(predicate))
    }

    #[must_use]
    pub fn custom<F>(function: F) -> Self
    where
        F: Fn(&MemberContext) -> Result<Option<Value>> + Send + Sync + 'static,
    {
        Self::Custom(Arc::new(function))
    }

    #[must_use]
    pub fn custom_async<F, Fut>(function: F) -> Self
    where
        F: Fn(MemberContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Option<Value>>> + Send + 'static,
    {
        Self::AsyncCustom(Arc::new(move |context| function(context).boxed()))
    }

    #[must_use]
    pub fn is_async(&self) -> bool {
        matches!(self, Self::AsyncCustom(_))
    }

    /// Short descriptor name used in diagnostics
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::MapFrom(_) => "map_from",
            Self::Ignore => "ignore",
            Self::Constant(_) => "constant",
            Self::Condition(_) => "condition",
            Self::Custom(_) => "custom",
            Self::AsyncCustom(_) => "async custom",
        }
    }
}

impl fmt::Debug for MemberConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MapFrom(path) => f.debug_tuple("MapFrom").field(path).finish(),
            Self::Constant(value) => f.debug_tuple("Constant").field(value).finish(),
            Self::Ignore => f.write_str("Ignore"),
            Self::Condition(_) => f.write_str("Condition(<fn>)"),
            Self::Custom(_) => f.write_str("Custom(<fn>)"),
            Self::AsyncCustom(_) => f.write_str("AsyncCustom(<fn>)"),
        }
    }
}

/// Which configuration call produced a step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigurationOrigin {
    Member,
    SourceMember,
}

/// Tag recorded for every appended step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransformationType {
    Constant = 1,
    MemberOptions = 2,
    AsyncMemberOptions = 4,
    SourceMemberOptions = 8,
    AsyncSourceMemberOptions = 16,
}

impl TransformationType {
    #[must_use]
    pub fn of(config: &MemberConfig, origin: ConfigurationOrigin) -> Self {
        match (config, origin) {
            (MemberConfig::Constant(_), _) => Self::Constant,
            (MemberConfig::AsyncCustom(_), ConfigurationOrigin::Member) => Self::AsyncMemberOptions,
            (MemberConfig::AsyncCustom(_), ConfigurationOrigin::SourceMember) => {
                Self::AsyncSourceMemberOptions
            }
            (_, ConfigurationOrigin::Member) => Self::MemberOptions,
            (_, ConfigurationOrigin::SourceMember) => Self::SourceMemberOptions,
        }
    }

    #[must_use]
    pub fn origin(self) -> ConfigurationOrigin {
        match self {
            Self::SourceMemberOptions | Self::AsyncSourceMemberOptions => {
                ConfigurationOrigin::SourceMember
            }
            Self::Constant | Self::MemberOptions | Self::AsyncMemberOptions => {
                ConfigurationOrigin::Member
            }
        }
    }
}

/// An appended step in a member's chain
#[derive(Debug, Clone)]
pub struct Transformation {
    pub kind: TransformationType,
    pub config: MemberConfig,
}

/// Options handed to member functions at execution time
#[derive(Debug, Clone)]
pub struct MemberContext {
    /// The whole source object being mapped
    pub source_object: Arc<Value>,

    /// Full (rebased) source path of the member
    pub source_property_name: String,

    /// Full destination path of the member
    pub destination_property_name: String,

    /// Output of the previous step
    pub intermediate_property_value: Option<Value>,

    ignored: Arc<AtomicBool>,
}

impl MemberContext {
    pub(crate) fn new(
        source_object: Arc<Value>,
        source_property_name: String,
        destination_property_name: String,
        intermediate_property_value: Option<Value>,
        ignored: Arc<AtomicBool>,
    ) -> Self {
        Self {
            source_object,
            source_property_name,
            destination_property_name,
            intermediate_property_value,
            ignored,
        }
    }

    /// Omit the member from this execution and skip its remaining steps
    pub fn ignore(&self) {
        self.ignored.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_ignored(&self) -> bool {
        self.ignored.load(Ordering::SeqCst)
    }
}
