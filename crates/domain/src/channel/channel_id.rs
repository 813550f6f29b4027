use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, Result};

const MAX_LEN: usize = 100;

/// Name of a channel on the bus, e.g. `site/heating/hp1.state`.
///
/// A `/`-separated path of non-empty segments made of alphanumerics,
/// `_`, `-` and `.`, at most 100 bytes overall.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ChannelId(String);

fn invalid(id: &str, reason: &str) -> DomainError {
    DomainError::InvalidChannelId(format!("{id:?}: {reason}"))
}

fn valid_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.'))
}

impl ChannelId {
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        if id.is_empty() {
            return Err(invalid(&id, "empty"));
        }
        if id.len() > MAX_LEN {
            return Err(invalid(&id, &format!("longer than {MAX_LEN} bytes")));
        }
        if let Some(segment) = id.split('/').find(|s| !valid_segment(s)) {
            return Err(invalid(&id, &format!("bad path segment {segment:?}")));
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for ChannelId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl TryFrom<String> for ChannelId {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<ChannelId> for String {
    fn from(id: ChannelId) -> Self {
        id.0
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
