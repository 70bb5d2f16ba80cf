//! Flat `key=value` properties documents.
//!
//! A [`PropertiesFile`] is the on-disk format read by log4j and by most JVM
//! daemons (`server.properties`, `zookeeper.properties`). Entries keep their
//! insertion order, duplicate keys are kept as-is, and values are written
//! verbatim: neither `\n` nor `=` is escaped. The consumers use a naive
//! line-based parser, so a value containing a newline will split into two
//! lines on disk. That behavior is relied on and intentionally left alone.
use std::{fmt, fs, path::Path};

use tracing::debug;

use crate::error::PropertiesError;

/// An ordered, immutable sequence of key/value pairs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertiesFile {
    entries: Vec<(String, String)>,
}

impl PropertiesFile {
    /// Builds a document from an ordered sequence of pairs.
    pub fn new<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            entries: entries
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        }
    }

    /// Builds a document from a fallible sequence, failing if any item fails.
    pub fn try_from_entries<I, K, V, E>(entries: I) -> Result<Self, PropertiesError>
    where
        I: IntoIterator<Item = Result<(K, V), E>>,
        K: Into<String>,
        V: Into<String>,
        E: fmt::Display,
    {
        let mut collected = Vec::new();
        for entry in entries {
            let (key, value) =
                entry.map_err(|err| PropertiesError::InvalidArgument(err.to_string()))?;
            collected.push((key.into(), value.into()));
        }
        Ok(Self { entries: collected })
    }

    /// Parses text produced by [`PropertiesFile::to_text`].
    ///
    /// Each line is split at its first `=`. Blank lines are skipped; any other
    /// line without a separator is rejected.
    pub fn parse(text: &str) -> Result<Self, PropertiesError> {
        let mut entries = Vec::new();
        for (index, line) in text.split('\n').enumerate() {
            if line.is_empty() {
                continue;
            }
            match line.split_once('=') {
                Some((key, value)) => entries.push((key.to_string(), value.to_string())),
                None => {
                    return Err(PropertiesError::MalformedLine {
                        line_number: index + 1,
                        line: line.to_string(),
                    });
                }
            }
        }
        Ok(Self { entries })
    }

    /// The entries in file order.
    pub fn entries(&self) -> &[(String, String)] {
        &self.entries
    }

    /// Returns the value of the first entry with the given key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns a copy of this document with `key` set to `value`.
    ///
    /// The first entry with that key is replaced where it stands; if there is
    /// none the pair is appended. `self` is left untouched.
    pub fn with_entry(&self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let key = key.into();
        let value = value.into();
        let mut entries = self.entries.clone();
        match entries.iter_mut().find(|(k, _)| *k == key) {
            Some(existing) => existing.1 = value,
            None => entries.push((key, value)),
        }
        Self { entries }
    }

    /// Appends every entry of `other` after this document's entries.
    pub fn concat(&self, other: &PropertiesFile) -> Self {
        let mut entries = self.entries.clone();
        entries.extend(other.entries.iter().cloned());
        Self { entries }
    }

    /// The full text of the file: `key=value` lines joined by `\n`.
    pub fn to_text(&self) -> String {
        self.entries
            .iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Writes the document to `path`, replacing any existing file.
    ///
    /// The file is ASCII: characters outside the ASCII range are written as `?`.
    pub fn write_to_file(&self, path: &Path) -> Result<(), PropertiesError> {
        let ascii: String = self
            .to_text()
            .chars()
            .map(|c| if c.is_ascii() { c } else { '?' })
            .collect();
        debug!(
            "Writing {} properties to {}",
            self.entries.len(),
            path.display()
        );
        fs::write(path, ascii).map_err(|source| PropertiesError::Write {
            path: path.to_path_buf(),
            source,
        })
    }
}

impl fmt::Display for PropertiesFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}

impl<K, V> FromIterator<(K, V)> for PropertiesFile
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self::new(iter)
    }
}
