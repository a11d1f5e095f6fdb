//! Property files
//!
//! `key = value` lines with `#` comments, used for the engine options file.
//! Keys are case-insensitive; values keep their case.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;

/// Scan property text, invoking `handler` for each `key = value` pair.
///
/// Whitespace around keys and values is trimmed and a `#` starts a comment
/// anywhere on a line. Lines without `=` are skipped with a warning.
pub fn parse_propfile(data: &str, handler: &mut dyn FnMut(&str, &str)) {
    for (number, raw) in data.lines().enumerate() {
        let line = match raw.find('#') {
            Some(hash) => &raw[..hash],
            None => raw,
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match line.split_once('=') {
            Some((key, value)) => {
                let key = key.trim();
                if key.is_empty() {
                    log::warn!("Property line {}: value without key", number + 1);
                    continue;
                }
                handler(key, value.trim());
            }
            None => log::warn!("Property line {}: key '{}' without value", number + 1, line),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PropertyError {
    #[error("Property file {0} not found")]
    FileNotFound(String),

    #[error("I/O error reading property file {path}: {message}")]
    Io { path: String, message: String },
}

impl PropertyError {
    fn from_io(path: &Path, err: io::Error) -> Self {
        let path = path.display().to_string();
        match err.kind() {
            io::ErrorKind::NotFound => PropertyError::FileNotFound(path),
            _ => PropertyError::Io {
                path,
                message: err.to_string(),
            },
        }
    }
}

/// Parsed property file
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PropertyFile {
    properties: BTreeMap<String, String>,
}

impl PropertyFile {
    pub fn parse(content: &str) -> Self {
        let mut pf = PropertyFile::default();
        parse_propfile(content, &mut |key, value| pf.set(key, value));
        pf
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, PropertyError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| PropertyError::from_io(path, e))?;
        Ok(Self::parse(&content))
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.properties.get(&key.to_ascii_lowercase()).map(|s| s.as_str())
    }

    pub fn get_int(&self, key: &str) -> Option<i64> {
        self.get(key)?.parse().ok()
    }

    /// `true`/`yes`/`1` and `false`/`no`/`0`, any case
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        match self.get(key)?.to_ascii_lowercase().as_str() {
            "true" | "yes" | "1" => Some(true),
            "false" | "no" | "0" => Some(false),
            _ => None,
        }
    }

    pub fn set(&mut self, key: &str, value: &str) {
        self.properties
            .insert(key.to_ascii_lowercase(), value.to_string());
    }

    pub fn contains(&self, key: &str) -> bool {
        self.properties.contains_key(&key.to_ascii_lowercase())
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    /// Keys in sorted order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.properties.keys().map(|k| k.as_str())
    }
}
