//! Naming conventions
//!
//! Conventions split a member name into words and join words back into a
//! member name. A [`ConventionTranslator`] pairs a source and a destination
//! convention so automapping can rename members between them.

use automap_core::MemberNameTranslator;
use regex::Regex;
use std::fmt;
use std::sync::{Arc, LazyLock};

static WORDS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[A-Z]?[a-z0-9]+").unwrap_or_else(|e| panic!("invalid word pattern: {e}"))
});

/// Splits member names into words and joins words into member names
pub trait NamingConvention: Send + Sync {
    /// Convention name as used in mapping documents
    fn name(&self) -> &'static str;

    /// Character placed between words, empty for case-based conventions
    fn separator_character(&self) -> &str {
        ""
    }

    /// Split a member name into its words
    fn split(&self, property_name: &str) -> Vec<String> {
        split_words(property_name, 0)
    }

    /// Join words into a member name
    fn transform_property_name(&self, parts: &[String]) -> String;
}

/// Words of `name` after its first `leading` bytes, which form a word of
/// their own. Text between matches is kept as a word too.
fn split_words(name: &str, leading: usize) -> Vec<String> {
    let mut words = Vec::new();
    if leading > 0 {
        words.push(name[..leading].to_string());
    }

    let rest = &name[leading..];
    let mut last = 0;
    for word in WORDS.find_iter(rest) {
        if word.start() > last {
            words.push(rest[last..word.start()].to_string());
        }
        words.push(word.as_str().to_string());
        last = word.end();
    }
    if last < rest.len() {
        words.push(rest[last..].to_string());
    }
    words
}

fn is_word_tail(byte: u8) -> bool {
    byte.is_ascii_lowercase() || byte.is_ascii_digit()
}

/// Length of a leading acronym: the whole name when it is all capitals,
/// otherwise the capitals before the one that starts the next word.
fn leading_acronym(name: &str) -> usize {
    let bytes = name.as_bytes();
    let run = bytes.iter().take_while(|b| b.is_ascii_uppercase()).count();
    match bytes.get(run) {
        None => run,
        Some(&next) if run > 1 && is_word_tail(next) => run - 1,
        Some(_) => 0,
    }
}

/// Length of a leading lowercase word followed by the end of the name or a
/// capitalized word.
fn leading_lowercase(name: &str) -> usize {
    let bytes = name.as_bytes();
    let run = bytes.iter().take_while(|b| b.is_ascii_lowercase()).count();
    match (bytes.get(run), bytes.get(run + 1)) {
        (None, _) => run,
        (Some(upper), Some(&next)) if upper.is_ascii_uppercase() && is_word_tail(next) => run,
        _ => 0,
    }
}

fn with_first(word: &str, convert: fn(char) -> String) -> String {
    let mut chars = word.chars();
    chars
        .next()
        .map_or_else(String::new, |first| convert(first) + chars.as_str())
}

fn upper(c: char) -> String {
    c.to_uppercase().collect()
}

fn lower(c: char) -> String {
    c.to_lowercase().collect()
}

/// `FullName`
#[derive(Debug, Clone, Copy, Default)]
pub struct PascalCaseNamingConvention;

impl NamingConvention for PascalCaseNamingConvention {
    fn name(&self) -> &'static str {
        "pascal_case"
    }

    fn split(&self, property_name: &str) -> Vec<String> {
        split_words(property_name, leading_acronym(property_name))
    }

    fn transform_property_name(&self, parts: &[String]) -> String {
        parts.iter().map(|part| with_first(part, upper)).collect()
    }
}

/// `fullName`
#[derive(Debug, Clone, Copy, Default)]
pub struct CamelCaseNamingConvention;

impl NamingConvention for CamelCaseNamingConvention {
    fn name(&self) -> &'static str {
        "camel_case"
    }

    fn split(&self, property_name: &str) -> Vec<String> {
        split_words(property_name, leading_lowercase(property_name))
    }

    fn transform_property_name(&self, parts: &[String]) -> String {
        parts
            .iter()
            .enumerate()
            .map(|(index, part)| with_first(part, if index == 0 { lower } else { upper }))
            .collect()
    }
}

/// Look up a built-in convention by name (`pascal_case`, `camel_case`)
#[must_use]
pub fn convention_by_name(name: &str) -> Option<Arc<dyn NamingConvention>> {
    match name {
        "pascal_case" | "PascalCase" => Some(Arc::new(PascalCaseNamingConvention)),
        "camel_case" | "camelCase" | "CamelCase" => Some(Arc::new(CamelCaseNamingConvention)),
        _ => None,
    }
}

/// Renames members from a source convention to a destination convention
#[derive(Clone)]
pub struct ConventionTranslator {
    source: Arc<dyn NamingConvention>,
    destination: Arc<dyn NamingConvention>,
}

impl ConventionTranslator {
    #[must_use]
    pub fn new(source: Arc<dyn NamingConvention>, destination: Arc<dyn NamingConvention>) -> Self {
        Self {
            source,
            destination,
        }
    }
}

impl MemberNameTranslator for ConventionTranslator {
    fn to_destination(&self, source_name: &str) -> String {
        self.destination
            .transform_property_name(&self.source.split(source_name))
    }

    fn to_source(&self, destination_name: &str) -> String {
        self.source
            .transform_property_name(&self.destination.split(destination_name))
    }
}

impl fmt::Debug for ConventionTranslator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConventionTranslator")
            .field("source", &self.source.name())
            .field("destination", &self.destination.name())
            .finish()
    }
}
