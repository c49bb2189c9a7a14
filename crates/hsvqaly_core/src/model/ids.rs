//! Identifiers for decision graph nodes
//!
//! Builders wire fixed topologies with static names ("c0", "t4", ...), while
//! graphs loaded from data carry owned strings. `Cow` covers both without
//! allocating for the static case.

use std::borrow::Cow;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Unique identifier for a node within a decision graph
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub Cow<'static, str>);

impl NodeId {
    #[must_use]
    pub const fn from_static(name: &'static str) -> Self {
        NodeId(Cow::Borrowed(name))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&'static str> for NodeId {
    fn from(name: &'static str) -> Self {
        NodeId(Cow::Borrowed(name))
    }
}

impl From<String> for NodeId {
    fn from(name: String) -> Self {
        NodeId(Cow::Owned(name))
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
