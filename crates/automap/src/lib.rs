#![deny(rust_2018_idioms)]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

//! # automap
//!
//! Convention-based object mapping.
//!
//! A [`Mapper`] owns the mapping registry, the registered profiles and a
//! registry of named extension functions. Mappings are configured with a
//! staged builder (`begin_mapping(source).to_destination(destination)`) or
//! loaded from YAML mapping documents, then executed synchronously or
//! asynchronously against `serde_json` values.
//!
//! ## Example Usage
//!
//! ```rust
//! use automap::{Mapper, MemberConfig};
//! use serde_json::json;
//!
//! let mut mapper = Mapper::new();
//! mapper
//!     .begin_mapping("person")
//!     .to_destination("personDto")
//!     .unwrap()
//!     .for_member("name", MemberConfig::map_from("fullName"))
//!     .unwrap();
//!
//! let source = json!({ "fullName": "John Doe", "age": 42 });
//! let result = mapper.map("person", "personDto", Some(&source)).unwrap();
//! assert_eq!(result, Some(json!({ "name": "John Doe", "age": 42 })));
//! ```

pub mod dsl;
pub mod extensions;
pub mod mapper;
pub mod naming;
pub mod profile;

pub use automap_core::{
    BaseTypeConverter, Converter, Mapping, MappingKey, MappingRegistry, MemberConfig,
    MemberContext, ResolutionContext, TypeConverter, TypeDescriptor,
};
pub use dsl::{
    Condition, MappingDefinition, MappingDocument, MappingDsl, MemberStep, ParseError,
};
pub use extensions::{Arity, Extension, ExtensionRegistry, create_math_utils_extension, create_string_utils_extension};
pub use mapper::{MapKey, Mapper, MapperConfiguration, MappingBuilder, MappingConfigurator};
pub use naming::{
    CamelCaseNamingConvention, ConventionTranslator, NamingConvention, PascalCaseNamingConvention,
};
pub use profile::{Profile, ProfileConfiguration};

use thiserror::Error;

/// Errors raised by the mapper and its configuration layers
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Core(#[from] automap_core::Error),

    #[error(transparent)]
    Validation(#[from] automap_validation::Error),

    #[error("Could not find profile with profile name '{0}'.")]
    ProfileNotFound(String),

    #[error("Function '{function}' expects {expected} argument(s), got {actual}")]
    Arity {
        function: String,
        expected: String,
        actual: usize,
    },

    #[error(
        "Function '{function}' cannot be used as a converter: it accepts {arity} argument(s) instead of exactly one resolution context"
    )]
    InvalidConverterFunction { function: String, arity: String },

    #[error("Extension '{0}' not found")]
    ExtensionNotFound(String),

    #[error("Function '{function}' not found in extension '{extension}', available functions: {available:?}")]
    FunctionNotFound {
        extension: String,
        function: String,
        available: Vec<String>,
    },

    #[error("Extension error: {0}")]
    Extension(String),

    #[error("Mapping document error: {0}")]
    Parse(#[from] ParseError),

    #[error("Type '{0}' is not declared in the mapping document")]
    UnknownType(String),

    #[error("Unknown naming convention '{0}'")]
    UnknownNamingConvention(String),
}

impl Error {
    /// Create an arity error for an extension function call
    #[must_use]
    pub fn arity(function: impl Into<String>, expected: &Arity, actual: usize) -> Self {
        Self::Arity {
            function: function.into(),
            expected: expected.to_string(),
            actual,
        }
    }

    #[must_use]
    pub fn extension(message: impl Into<String>) -> Self {
        Self::Extension(message.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
