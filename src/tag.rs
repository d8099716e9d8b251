//! Struct tag parsing.
//!
//! Tags use the Go struct tag syntax: space separated `key:"value"` pairs.
//! A value is a comma separated list whose first item is a name and whose
//! remaining items are options:
//!
//! ```text
//! mapstructure:"staging_directory" mapstructure-to-hcl2:",self-defined"
//! mapstructure:",squash"
//! ```
//!
//! Which keys and options carry meaning is decided by a [`TagGrammar`]; every
//! other key is preserved as-is and rendered back unchanged.

use std::fmt;

use serde::{Serialize, Serializer};

use crate::error::TagError;

/// Version of the tag grammar understood by [`TagGrammar::default`].
pub const TAG_GRAMMAR_VERSION: u32 = 1;

/// Tag keys and options recognized on struct fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagGrammar {
    pub version: u32,
    /// Primary decode tag carrying the external name and `squash`.
    pub decode_key: String,
    /// Secondary marker tag carrying `self-defined`.
    pub marker_key: String,
    /// Key the synthesized accessor is written under.
    pub accessor_key: String,
    pub squash_option: String,
    pub self_defined_option: String,
}

impl Default for TagGrammar {
    fn default() -> Self {
        Self {
            version: TAG_GRAMMAR_VERSION,
            decode_key: "mapstructure".to_string(),
            marker_key: "mapstructure-to-hcl2".to_string(),
            accessor_key: "cty".to_string(),
            squash_option: "squash".to_string(),
            self_defined_option: "self-defined".to_string(),
        }
    }
}

/// One `key:"name,opt,opt"` entry of a struct tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagEntry {
    pub key: String,
    pub name: String,
    pub options: Vec<String>,
}

impl TagEntry {
    /// An entry with a name and no options.
    pub fn named(key: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            name: name.into(),
            options: Vec::new(),
        }
    }

    fn from_value(key: &str, value: &str) -> Self {
        let mut parts = value.split(',');
        let name = parts.next().unwrap_or_default().to_string();
        Self {
            key: key.to_string(),
            name,
            options: parts.map(String::from).collect(),
        }
    }

    pub fn has_option(&self, option: &str) -> bool {
        self.options.iter().any(|o| o == option)
    }

    fn value(&self) -> String {
        let mut value = self.name.clone();
        for option in &self.options {
            value.push(',');
            value.push_str(option);
        }
        value
    }
}

/// Parsed struct tag, entries kept in source order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StructTag {
    entries: Vec<TagEntry>,
}

/// Tag metadata the generator acts on.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FieldTagMeta {
    /// Explicit external name, when the decode tag names one.
    pub external_name: Option<String>,
    pub squash: bool,
    /// The field's own type supplies its decode spec.
    pub self_defined: bool,
}

impl StructTag {
    /// Parse raw tag text.
    ///
    /// # Errors
    ///
    /// Returns `TagError` when a key is empty or contains spaces or quotes,
    /// or when a value is missing, unquoted or unterminated.
    pub fn parse(raw: &str) -> Result<Self, TagError> {
        let mut entries = Vec::new();
        let mut rest = raw.trim_start();

        while !rest.is_empty() {
            let Some(colon) = rest.find(':') else {
                return Err(TagError::MissingValue {
                    key: rest.trim_end().to_string(),
                });
            };
            let key = &rest[..colon];
            if key.is_empty()
                || key
                    .chars()
                    .any(|c| c == ' ' || c == '"' || c.is_control())
            {
                return Err(TagError::InvalidKey {
                    key: key.to_string(),
                });
            }

            let Some(body) = rest[colon + 1..].strip_prefix('"') else {
                return Err(TagError::UnquotedValue {
                    key: key.to_string(),
                });
            };
            let (value, consumed) = unquote(body).ok_or_else(|| TagError::UnterminatedValue {
                key: key.to_string(),
            })?;

            entries.push(TagEntry::from_value(key, &value));
            rest = body[consumed..].trim_start();
        }

        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[TagEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&TagEntry> {
        self.entries.iter().find(|e| e.key == key)
    }

    /// Return a new tag with `entry` set: an existing entry with the same key
    /// is replaced in place, otherwise the entry is appended.
    pub fn set(&self, entry: TagEntry) -> Self {
        let mut entries = self.entries.clone();
        match entries.iter_mut().find(|e| e.key == entry.key) {
            Some(existing) => *existing = entry,
            None => entries.push(entry),
        }
        Self { entries }
    }

    /// Extract the metadata `grammar` gives meaning to.
    pub fn meta(&self, grammar: &TagGrammar) -> FieldTagMeta {
        let decode = self.get(&grammar.decode_key);
        let marker = self.get(&grammar.marker_key);

        FieldTagMeta {
            external_name: decode
                .map(|e| e.name.clone())
                .filter(|name| !name.is_empty()),
            squash: decode.is_some_and(|e| e.has_option(&grammar.squash_option)),
            self_defined: marker.is_some_and(|e| e.has_option(&grammar.self_defined_option)),
        }
    }
}

impl fmt::Display for StructTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, entry) in self.entries.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{}:\"{}\"", entry.key, quote(&entry.value()))?;
        }
        Ok(())
    }
}

impl Serialize for StructTag {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Read a quoted value up to its closing quote. Returns the unescaped value
/// and the number of bytes consumed, closing quote included.
fn unquote(body: &str) -> Option<(String, usize)> {
    let mut value = String::new();
    let mut chars = body.char_indices();

    while let Some((i, c)) = chars.next() {
        match c {
            '"' => return Some((value, i + 1)),
            '\\' => {
                let (_, escaped) = chars.next()?;
                value.push(match escaped {
                    'n' => '\n',
                    't' => '\t',
                    other => other,
                });
            }
            other => value.push(other),
        }
    }

    None
}

fn quote(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
