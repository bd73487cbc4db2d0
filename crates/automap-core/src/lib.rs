#![deny(rust_2018_idioms)]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

//! # automap-core
//!
//! Mapping model, property tree builder and execution engines.
//!
//! A [`Mapping`] describes how a source object graph is turned into a
//! destination object graph. It is built incrementally from per-member
//! configuration calls ([`MemberConfig`] descriptors), compiled into a
//! [`PropertyTree`], and executed synchronously ([`Mapping::map`]) or
//! asynchronously ([`Mapping::map_async`]) against `serde_json` values.
//!
//! ## Example Usage
//!
//! ```rust
//! use automap_core::{MappingRegistry, MemberConfig};
//! use serde_json::json;
//!
//! let mut registry = MappingRegistry::new();
//! registry
//!     .create_mapping("source", "destination")
//!     .configure_member("dstLevel1.dstLevel2", MemberConfig::map_from("srcLevel1.srcLevel2"))
//!     .unwrap();
//!
//! let source = json!({ "srcLevel1": { "srcLevel2": "v" } });
//! let result = registry.map("source", "destination", Some(&source)).unwrap();
//! assert_eq!(result, Some(json!({ "dstLevel1": { "dstLevel2": "v" } })));
//! ```

pub mod async_engine;
pub mod converter;
pub mod engine;
pub mod mapping;
pub mod member;
pub mod path;
mod pipeline;
pub mod registry;
pub mod tree;

pub use converter::{BaseTypeConverter, Converter, ResolutionContext, TypeConverter};
pub use mapping::{ForAllMembersFn, Mapping, MappingKey, MemberNameTranslator, TypeDescriptor};
pub use member::{MemberConfig, MemberContext, Transformation, TransformationType};
pub use path::PropertyPath;
pub use registry::MappingRegistry;
pub use tree::{DestinationProperty, MemberMapping, PropertyTree, SourceProperty};

use thiserror::Error;

/// Errors raised while configuring or executing mappings
#[derive(Error, Debug)]
pub enum Error {
    #[error(
        "Could not find map object with a source of {source_key} and a destination of {destination_key}"
    )]
    MappingNotFound {
        source_key: String,
        destination_key: String,
    },

    #[error(
        "Mapping '{mapping}' already has destination type '{existing}' and cannot be changed to '{requested}'"
    )]
    ConflictingDestinationType {
        mapping: String,
        existing: String,
        requested: String,
    },

    #[error(
        "The TypeConverter.convert method is abstract. Use a TypeConverter extension class instead."
    )]
    AbstractConverter,

    #[error(
        "Source member '{path}' can only be configured with ignore or a custom function, got {config}"
    )]
    InvalidSourceMemberConfiguration { path: String, config: String },

    #[error(
        "Source member '{path}' cannot be configured: destination member '{path}' is already mapped from '{fed_by}'"
    )]
    SourceMemberConflict { path: String, fed_by: String },

    #[error("Invalid property path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    #[error(
        "Mapping '{mapping}' has an asynchronous configuration for {target} and must be executed with map_async"
    )]
    AsynchronousConfiguration { mapping: String, target: String },

    #[error("Transformation of member '{member}' failed: {message}")]
    Transformation { member: String, message: String },
}

impl Error {
    /// Create a mapping-not-found error for a key pair
    #[must_use]
    pub fn mapping_not_found(source_key: impl Into<String>, destination_key: impl Into<String>) -> Self {
        Self::MappingNotFound {
            source_key: source_key.into(),
            destination_key: destination_key.into(),
        }
    }

    /// Create an invalid path error
    #[must_use]
    pub fn invalid_path(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPath {
            path: path.into(),
            reason: reason.into(),
        }
    }

    #[must_use]
    pub fn invalid_source_member_configuration(
        path: impl Into<String>,
        config: impl Into<String>,
    ) -> Self {
        Self::InvalidSourceMemberConfiguration {
            path: path.into(),
            config: config.into(),
        }
    }

    #[must_use]
    pub fn source_member_conflict(path: impl Into<String>, fed_by: impl Into<String>) -> Self {
        Self::SourceMemberConflict {
            path: path.into(),
            fed_by: fed_by.into(),
        }
    }

    #[must_use]
    pub fn asynchronous_configuration(mapping: impl Into<String>, target: impl Into<String>) -> Self {
        Self::AsynchronousConfiguration {
            mapping: mapping.into(),
            target: target.into(),
        }
    }

    /// Create a transformation error, for use inside custom member functions
    #[must_use]
    pub fn transformation(member: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transformation {
            member: member.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
