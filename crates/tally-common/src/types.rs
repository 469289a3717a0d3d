//! Core type definitions for Tally
//!
//! Defines the validated counter name, the abstract record key, and the
//! stored record itself. Keys are backend-agnostic: a storage namespace
//! plus an identifier within it.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Maximum length of a counter name in bytes
const MAX_COUNTER_NAME_LEN: usize = 100;

/// Name of a logical counter
///
/// Names are restricted to ASCII alphanumerics plus `-`, `_` and `.` so
/// that derived storage namespaces and encoded keys are collision-free.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CounterName(String);

impl CounterName {
    /// Create a new counter name, validating it
    pub fn new(name: impl Into<String>) -> Result<Self, CounterNameError> {
        let name = name.into();
        Self::validate(&name)?;
        Ok(Self(name))
    }

    /// Create without validation (internal use only)
    #[must_use]
    pub fn new_unchecked(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Get the counter name as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn validate(name: &str) -> Result<(), CounterNameError> {
        if name.is_empty() {
            return Err(CounterNameError::Empty);
        }
        if name.len() > MAX_COUNTER_NAME_LEN {
            return Err(CounterNameError::TooLong);
        }
        for c in name.chars() {
            if !c.is_ascii_alphanumeric() && c != '-' && c != '_' && c != '.' {
                return Err(CounterNameError::InvalidChar(c));
            }
        }
        Ok(())
    }
}

impl fmt::Debug for CounterName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CounterName({:?})", self.0)
    }
}

impl fmt::Display for CounterName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Errors that can occur when creating a counter name
#[derive(Debug, Clone, Error)]
pub enum CounterNameError {
    #[error("counter name must not be empty")]
    Empty,
    #[error("counter name must be at most 100 characters")]
    TooLong,
    #[error("counter name contains invalid character: {0:?}")]
    InvalidChar(char),
}

/// Abstract record key: a storage namespace plus an identifier within it
///
/// Namespaces are derived from validated counter names, so neither part
/// ever contains the `:` separator used by the string encoding.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Key {
    namespace: String,
    id: String,
}

impl Key {
    /// Create a key from a namespace and an identifier
    #[must_use]
    pub fn new(namespace: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            id: id.into(),
        }
    }

    /// The storage namespace this key belongs to
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// The identifier within the namespace
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Flat string encoding used by store adapters
    #[must_use]
    pub fn encoded(&self) -> String {
        format!("{}:{}", self.namespace, self.id)
    }

    /// Decode a key previously produced by [`Key::encoded`]
    #[must_use]
    pub fn decode(encoded: &str) -> Option<Self> {
        encoded
            .split_once(':')
            .map(|(namespace, id)| Self::new(namespace, id))
    }

    /// Scan prefix matching every key in `namespace` and nothing else
    #[must_use]
    pub fn namespace_prefix(namespace: &str) -> String {
        format!("{namespace}:")
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Key({}:{})", self.namespace, self.id)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.namespace, self.id)
    }
}

/// A stored record: a key and its unsigned integer value
///
/// Counter state never decrements, so values are unsigned by construction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub key: Key,
    pub value: u64,
}

impl Record {
    /// Create a record
    #[must_use]
    pub const fn new(key: Key, value: u64) -> Self {
        Self { key, value }
    }
}
