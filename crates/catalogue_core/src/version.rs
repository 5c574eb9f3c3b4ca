use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub const MIN_COMPONENTS: usize = 2;
pub const MAX_COMPONENTS: usize = 4;

/// Dotted numeric release identifier such as `13.0.1` or `0.4.8.13`.
///
/// Ordering compares components numerically from left to right, so
/// `13.0.10` sorts after `13.0.9`. A shorter version that is a prefix of a
/// longer one sorts first (`1.2` < `1.2.0`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Version {
    components: Vec<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseVersionError {
    #[error("version must have 2 to 4 components, got {0}")]
    ComponentCount(usize),
    #[error("invalid version component {0:?}")]
    InvalidComponent(String),
}

impl Version {
    pub fn components(&self) -> &[u32] {
        &self.components
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }
}

impl FromStr for Version {
    type Err = ParseVersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split('.').collect();
        if !(MIN_COMPONENTS..=MAX_COMPONENTS).contains(&parts.len()) {
            return Err(ParseVersionError::ComponentCount(parts.len()));
        }
        let components = parts
            .into_iter()
            .map(|part| {
                if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(ParseVersionError::InvalidComponent(part.to_string()));
                }
                part.parse::<u32>()
                    .map_err(|_| ParseVersionError::InvalidComponent(part.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { components })
    }
}

impl TryFrom<String> for Version {
    type Error = ParseVersionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Version> for String {
    fn from(version: Version) -> Self {
        version.to_string()
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, component) in self.components.iter().enumerate() {
            if idx > 0 {
                f.write_str(".")?;
            }
            write!(f, "{component}")?;
        }
        Ok(())
    }
}
