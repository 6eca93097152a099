use std::collections::HashMap;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum HeaderError {
    #[error("header name cannot be empty")]
    EmptyKey,
    #[error("header not found: {0}")]
    NotFound(String),
}

/// Header store shared by requests and responses.
///
/// Names are matched ASCII case-insensitively. Setting a name that is
/// already present replaces the value (last write wins, no folding of
/// repeated headers). Iteration yields the name as it was last set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: HashMap<String, (String, String)>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or overwrites a header.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> Result<(), HeaderError> {
        let key = key.into();
        if key.is_empty() {
            return Err(HeaderError::EmptyKey);
        }
        self.entries
            .insert(key.to_ascii_lowercase(), (key, value.into()));
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .get(&key.to_ascii_lowercase())
            .map(|(_, v)| v.as_str())
    }

    /// `Content-Length` as a number; `None` when missing or not numeric.
    pub fn content_length(&self) -> Option<usize> {
        self.get("Content-Length")
            .and_then(|v| v.trim().parse().ok())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(&key.to_ascii_lowercase())
    }

    /// Replaces the value of an existing header, leaving the store untouched
    /// when the header is absent.
    pub fn replace(&mut self, key: &str, value: impl Into<String>) -> Result<(), HeaderError> {
        if key.is_empty() {
            return Err(HeaderError::EmptyKey);
        }
        match self.entries.get_mut(&key.to_ascii_lowercase()) {
            Some((_, v)) => {
                *v = value.into();
                Ok(())
            }
            None => Err(HeaderError::NotFound(key.to_string())),
        }
    }

    pub fn remove(&mut self, key: &str) -> Result<String, HeaderError> {
        if key.is_empty() {
            return Err(HeaderError::EmptyKey);
        }
        self.entries
            .remove(&key.to_ascii_lowercase())
            .map(|(_, v)| v)
            .ok_or_else(|| HeaderError::NotFound(key.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .values()
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
