use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a layer, `"L"` followed by a counter value, e.g. `L0`, `L1`.
///
/// Ids are immutable once assigned and never reused, even after the layer is removed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LayerId(String);

impl LayerId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for LayerId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Issues monotonically increasing layer ids.
///
/// The counter starts at -1 and is incremented before each allocation, so the k-th call
/// (1-indexed) yields `L(k-1)`.
#[derive(Debug, Clone)]
pub struct IdAllocator {
    last_id: i64,
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self {
            last_id: -1,
        }
    }
}

impl IdAllocator {
    pub fn next_id(&mut self) -> LayerId {
        self.last_id += 1;
        LayerId(format!("L{}", self.last_id))
    }

    /// The number of ids issued so far.
    pub fn issued(&self) -> u64 {
        (self.last_id + 1) as u64
    }
}
