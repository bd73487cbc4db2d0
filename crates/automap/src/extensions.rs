//! Extension API
//!
//! Named functions over JSON values, grouped into extensions with
//! initialization and cleanup hooks. Mapping documents call them as member
//! steps and converters; applications register their own next to the
//! built-in ones.

use dashmap::DashMap;
use serde_json::{Number, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace};

use crate::{Error, Result};

/// Type alias for extension function
pub type ExtensionFn = Arc<dyn Fn(&[Value]) -> Result<Value> + Send + Sync>;

/// Type alias for initialization hook
pub type InitFn = Arc<dyn Fn() -> Result<()> + Send + Sync>;

/// Type alias for cleanup hook
pub type CleanupFn = Arc<dyn Fn() -> Result<()> + Send + Sync>;

/// Accepted argument count of an extension function
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Arity {
    pub min: usize,
    /// `None` means unbounded
    pub max: Option<usize>,
}

impl Arity {
    #[must_use]
    pub fn exactly(count: usize) -> Self {
        Self {
            min: count,
            max: Some(count),
        }
    }

    #[must_use]
    pub fn range(min: usize, max: usize) -> Self {
        Self {
            min,
            max: Some(max),
        }
    }

    #[must_use]
    pub fn at_least(min: usize) -> Self {
        Self { min, max: None }
    }

    #[must_use]
    pub fn accepts(&self, count: usize) -> bool {
        count >= self.min && self.max.is_none_or(|max| count <= max)
    }

    #[must_use]
    pub fn is_exactly(&self, count: usize) -> bool {
        self.min == count && self.max == Some(count)
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.max {
            Some(max) if max == self.min => write!(f, "{max}"),
            Some(max) => write!(f, "{}..={max}", self.min),
            None => write!(f, "at least {}", self.min),
        }
    }
}

/// A registered function together with its accepted arity
#[derive(Clone)]
pub struct ExtensionFunction {
    pub arity: Arity,
    function: ExtensionFn,
}

impl ExtensionFunction {
    /// Call the function after checking the argument count
    ///
    /// # Errors
    ///
    /// Returns `Arity` when `args` is outside the accepted range, otherwise
    /// whatever the function returns.
    pub fn call(&self, name: &str, args: &[Value]) -> Result<Value> {
        if !self.arity.accepts(args.len()) {
            return Err(Error::arity(name, &self.arity, args.len()));
        }
        (self.function)(args)
    }
}

/// An extension providing custom functionality
#[derive(Clone)]
pub struct Extension {
    pub name: String,
    pub version: String,
    functions: BTreeMap<String, ExtensionFunction>,
    init_hook: Option<InitFn>,
    cleanup_hook: Option<CleanupFn>,
}

impl Extension {
    #[must_use]
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            functions: BTreeMap::new(),
            init_hook: None,
            cleanup_hook: None,
        }
    }

    /// Register a function accepting `arity` arguments
    pub fn register_function(
        &mut self,
        name: impl Into<String>,
        arity: Arity,
        func: impl Fn(&[Value]) -> Result<Value> + Send + Sync + 'static,
    ) -> &mut Self {
        self.functions.insert(
            name.into(),
            ExtensionFunction {
                arity,
                function: Arc::new(func),
            },
        );
        self
    }

    pub fn on_init(&mut self, hook: impl Fn() -> Result<()> + Send + Sync + 'static) -> &mut Self {
        self.init_hook = Some(Arc::new(hook));
        self
    }

    pub fn on_cleanup(&mut self, hook: impl Fn() -> Result<()> + Send + Sync + 'static) -> &mut Self {
        self.cleanup_hook = Some(Arc::new(hook));
        self
    }

    #[must_use]
    pub fn get_function(&self, name: &str) -> Option<ExtensionFunction> {
        self.functions.get(name).cloned()
    }

    #[must_use]
    pub fn has_function(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    /// Run the initialization hook
    ///
    /// # Errors
    ///
    /// Returns an error if the initialization hook fails.
    pub fn initialize(&self) -> Result<()> {
        self.init_hook.as_ref().map_or(Ok(()), |hook| hook())
    }

    /// Run the cleanup hook
    ///
    /// # Errors
    ///
    /// Returns an error if the cleanup hook fails.
    pub fn cleanup(&self) -> Result<()> {
        self.cleanup_hook.as_ref().map_or(Ok(()), |hook| hook())
    }

    /// Registered function names in sorted order
    #[must_use]
    pub fn function_names(&self) -> Vec<String> {
        self.functions.keys().cloned().collect()
    }
}

impl fmt::Debug for Extension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Extension")
            .field("name", &self.name)
            .field("version", &self.version)
            .field("functions", &self.function_names())
            .field("has_init", &self.init_hook.is_some())
            .field("has_cleanup", &self.cleanup_hook.is_some())
            .finish()
    }
}

/// Concurrent registry of extensions, shared between clones
#[derive(Debug, Default, Clone)]
pub struct ExtensionRegistry {
    extensions: Arc<DashMap<String, Extension>>,
}

impl ExtensionRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the built-in extensions
    ///
    /// # Errors
    ///
    /// Returns an error if a built-in initialization hook fails.
    pub fn with_builtins() -> Result<Self> {
        let registry = Self::new();
        registry.register(create_string_utils_extension())?;
        registry.register(create_math_utils_extension())?;
        Ok(registry)
    }

    /// Initialize and register an extension, replacing one with the same name
    ///
    /// # Errors
    ///
    /// Returns an error if extension initialization fails.
    pub fn register(&self, extension: Extension) -> Result<()> {
        extension.initialize()?;
        debug!(extension = %extension.name, version = %extension.version, "registered extension");
        if let Some(previous) = self.extensions.insert(extension.name.clone(), extension) {
            previous.cleanup()?;
        }
        Ok(())
    }

    /// Remove an extension and run its cleanup hook
    ///
    /// # Errors
    ///
    /// Returns an error if extension cleanup fails.
    pub fn unregister(&self, name: &str) -> Result<()> {
        if let Some((_, extension)) = self.extensions.remove(name) {
            extension.cleanup()?;
        }
        Ok(())
    }

    #[must_use]
    pub fn get_extension(&self, name: &str) -> Option<Extension> {
        self.extensions.get(name).map(|entry| entry.value().clone())
    }

    #[must_use]
    pub fn has_extension(&self, name: &str) -> bool {
        self.extensions.contains_key(name)
    }

    /// Look up a function
    ///
    /// # Errors
    ///
    /// Returns `ExtensionNotFound` or `FunctionNotFound`.
    pub fn function(&self, extension_name: &str, function_name: &str) -> Result<ExtensionFunction> {
        let extension = self
            .extensions
            .get(extension_name)
            .ok_or_else(|| Error::ExtensionNotFound(extension_name.to_string()))?;

        extension
            .get_function(function_name)
            .ok_or_else(|| Error::FunctionNotFound {
                extension: extension_name.to_string(),
                function: function_name.to_string(),
                available: extension.function_names(),
            })
    }

    /// Call a function from an extension
    ///
    /// # Errors
    ///
    /// Returns an error if the extension or function is missing, the
    /// argument count is not accepted, or the function itself fails.
    pub fn call(&self, extension_name: &str, function_name: &str, args: &[Value]) -> Result<Value> {
        // The map guard is released before calling into user code.
        let function = self.function(extension_name, function_name)?;
        trace!(extension = extension_name, function = function_name, args = args.len(), "calling extension function");
        function.call(function_name, args)
    }

    /// Registered extension names in sorted order
    #[must_use]
    pub fn extension_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.extensions.iter().map(|entry| entry.key().clone()).collect();
        names.sort();
        names
    }

    /// Remove every extension, running each cleanup hook
    ///
    /// # Errors
    ///
    /// Returns the first cleanup failure after all extensions are removed.
    pub fn cleanup_all(&self) -> Result<()> {
        let mut first_error = None;
        for name in self.extension_names() {
            if let Err(e) = self.unregister(&name) {
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.extensions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.extensions.is_empty()
    }
}

fn string_arg<'a>(function: &str, args: &'a [Value], index: usize) -> Result<&'a str> {
    args.get(index)
        .and_then(Value::as_str)
        .ok_or_else(|| Error::extension(format!("{function}: argument {} must be a string", index + 1)))
}

fn number_arg(function: &str, args: &[Value], index: usize) -> Result<f64> {
    match args.get(index) {
        Some(Value::Number(n)) => n
            .as_f64()
            .ok_or_else(|| Error::extension(format!("{function}: argument {} is out of range", index + 1))),
        Some(Value::String(s)) => s.trim().parse::<f64>().map_err(|_| {
            Error::extension(format!("{function}: argument {} is not numeric: '{s}'", index + 1))
        }),
        _ => Err(Error::extension(format!(
            "{function}: argument {} must be a number",
            index + 1
        ))),
    }
}

// Integral results stay integers so `2 + 3` maps to `5`, not `5.0`.
#[allow(clippy::cast_possible_truncation, clippy::float_cmp)]
fn number_value(value: f64) -> Result<Value> {
    if value.fract() == 0.0 && value.abs() < 9_007_199_254_740_992.0 {
        return Ok(Value::from(value as i64));
    }
    Number::from_f64(value)
        .map(Value::Number)
        .ok_or_else(|| Error::extension(format!("result {value} is not a finite number")))
}

fn map_string(function: &'static str, args: &[Value], f: impl Fn(&str) -> String) -> Result<Value> {
    match args.first().unwrap_or(&Value::Null) {
        Value::Null => Ok(Value::Null),
        Value::String(s) => Ok(Value::String(f(s))),
        other => Err(Error::extension(format!("{function}: cannot apply to {other}"))),
    }
}

/// Built-in string utilities extension
///
/// `uppercase`, `lowercase`, `trim`, `reverse` take one argument, `replace`
/// takes three and `concat` joins one or more values. `null` input passes
/// through the single-argument functions.
#[must_use]
pub fn create_string_utils_extension() -> Extension {
    let mut ext = Extension::new("string_utils", "1.0.0");

    ext.register_function("uppercase", Arity::exactly(1), |args| {
        map_string("uppercase", args, str::to_uppercase)
    })
    .register_function("lowercase", Arity::exactly(1), |args| {
        map_string("lowercase", args, str::to_lowercase)
    })
    .register_function("trim", Arity::exactly(1), |args| {
        map_string("trim", args, |s| s.trim().to_string())
    })
    .register_function("reverse", Arity::exactly(1), |args| {
        map_string("reverse", args, |s| s.chars().rev().collect())
    })
    .register_function("replace", Arity::exactly(3), |args| {
        let input = string_arg("replace", args, 0)?;
        let from = string_arg("replace", args, 1)?;
        let to = string_arg("replace", args, 2)?;
        Ok(Value::String(input.replace(from, to)))
    })
    .register_function("concat", Arity::at_least(1), |args| {
        let joined: String = args
            .iter()
            .map(|value| match value {
                Value::Null => String::new(),
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect();
        Ok(Value::String(joined))
    })
    .on_init(|| {
        debug!("String utils extension initialized");
        Ok(())
    })
    .on_cleanup(|| {
        debug!("String utils extension cleaned up");
        Ok(())
    });

    ext
}

/// Built-in math utilities extension: `add`, `multiply`
#[must_use]
pub fn create_math_utils_extension() -> Extension {
    let mut ext = Extension::new("math_utils", "1.0.0");

    ext.register_function("add", Arity::exactly(2), |args| {
        number_value(number_arg("add", args, 0)? + number_arg("add", args, 1)?)
    })
    .register_function("multiply", Arity::exactly(2), |args| {
        number_value(number_arg("multiply", args, 0)? * number_arg("multiply", args, 1)?)
    });

    ext
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_arity() {
        assert!(Arity::exactly(1).accepts(1));
        assert!(!Arity::exactly(1).accepts(2));
        assert!(Arity::range(1, 3).accepts(3));
        assert!(!Arity::range(1, 3).accepts(0));
        assert!(Arity::at_least(1).accepts(10));
        assert_eq!(Arity::exactly(2).to_string(), "2");
        assert_eq!(Arity::range(2, 5).to_string(), "2..=5");
        assert_eq!(Arity::at_least(1).to_string(), "at least 1");
    }

    #[test]
    fn test_string_utils() {
        let registry = ExtensionRegistry::with_builtins().unwrap();
        assert_eq!(
            registry.call("string_utils", "uppercase", &[json!("abc")]).unwrap(),
            json!("ABC")
        );
        assert_eq!(
            registry.call("string_utils", "trim", &[json!("  x ")]).unwrap(),
            json!("x")
        );
        assert_eq!(
            registry.call("string_utils", "reverse", &[Value::Null]).unwrap(),
            Value::Null
        );
        assert_eq!(
            registry
                .call("string_utils", "replace", &[json!("a-b-c"), json!("-"), json!("/")])
                .unwrap(),
            json!("a/b/c")
        );
        assert_eq!(
            registry
                .call("string_utils", "concat", &[json!("n"), json!(1), Value::Null])
                .unwrap(),
            json!("n1")
        );
    }

    #[test]
    fn test_math_utils() {
        let registry = ExtensionRegistry::with_builtins().unwrap();
        assert_eq!(registry.call("math_utils", "add", &[json!(2), json!(3)]).unwrap(), json!(5));
        assert_eq!(
            registry.call("math_utils", "multiply", &[json!("1.5"), json!(3)]).unwrap(),
            json!(4.5)
        );
        assert!(registry.call("math_utils", "add", &[json!("x"), json!(1)]).is_err());
    }

    #[test]
    fn test_arity_is_checked_before_calling() {
        let registry = ExtensionRegistry::with_builtins().unwrap();
        let err = registry
            .call("string_utils", "replace", &[json!("a")])
            .unwrap_err();
        assert!(matches!(err, Error::Arity { actual: 1, .. }));
        assert_eq!(err.to_string(), "Function 'replace' expects 3 argument(s), got 1");
    }

    #[test]
    fn test_missing_extension_and_function() {
        let registry = ExtensionRegistry::with_builtins().unwrap();
        assert!(matches!(
            registry.call("nope", "x", &[]),
            Err(Error::ExtensionNotFound(_))
        ));
        let err = registry.call("string_utils", "nope", &[]).unwrap_err();
        assert!(err.to_string().contains("available functions"));
    }

    #[test]
    fn test_hooks_run_on_register_and_unregister() {
        let counter = Arc::new(AtomicUsize::new(0));
        let init = counter.clone();
        let cleanup = counter.clone();

        let mut ext = Extension::new("custom", "0.1.0");
        ext.register_function("double", Arity::exactly(1), |args| {
            Ok(json!(args[0].as_i64().unwrap_or_default() * 2))
        })
        .on_init(move || {
            init.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .on_cleanup(move || {
            cleanup.fetch_add(10, Ordering::SeqCst);
            Ok(())
        });

        let registry = ExtensionRegistry::new();
        registry.register(ext).unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert_eq!(registry.call("custom", "double", &[json!(4)]).unwrap(), json!(8));

        registry.cleanup_all().unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 11);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_clones_share_registrations() {
        let registry = ExtensionRegistry::new();
        let clone = registry.clone();
        clone.register(create_string_utils_extension()).unwrap();
        assert!(registry.has_extension("string_utils"));
        assert_eq!(registry.extension_names(), vec!["string_utils"]);
    }
}
