//! Namespace identifiers and path-safe name checks.

use std::fmt;
use std::str::FromStr;

use crate::Error;

/// Top-level scope of a cache instance, usually a chain id.
///
/// Selects the `<root>/<namespace>` directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Namespace(String);

impl Namespace {
    /// Build a namespace from any string usable as a directory name.
    pub fn new(name: impl Into<String>) -> Result<Self, Error> {
        let name = name.into();
        validate_name(&name)?;
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<u64> for Namespace {
    fn from(chain_id: u64) -> Self {
        Self(chain_id.to_string())
    }
}

impl FromStr for Namespace {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Reject names that would escape or alias the cache directory.
pub fn validate_name(name: &str) -> Result<(), Error> {
    if name.is_empty() {
        return Err(Error::InvalidName("name must not be empty".into()));
    }
    if name == "." || name == ".." {
        return Err(Error::InvalidName(format!("'{name}' is not a valid name")));
    }
    if name.contains(['/', '\\', '\0']) {
        return Err(Error::InvalidName(format!("'{name}' must not contain path separators")));
    }
    Ok(())
}
