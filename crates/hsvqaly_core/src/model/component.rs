//! Named disutility categories used for loss breakdown reporting

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::LookupError;

/// Disutility category a node's own contribution is attributed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Component {
    /// Symptomatic primary outbreak
    Primary,
    AsepticMeningitis,
    UrinaryRetention,
    /// Long-term psychosocial impact of diagnosis
    Psychosocial,
    /// Symptomatic recurrences (HSV-1, infrequent)
    Recurrence,
    /// Infrequent symptomatic recurrences (HSV-2)
    Infrequent,
    /// Frequent recurrences, no suppressive therapy
    FrequentNoCst,
    /// Frequent recurrences on chronic suppressive therapy
    FrequentCst,
    RecurrentMeningitis,
    Encephalitis,
}

impl Component {
    pub const ALL: [Component; 10] = [
        Component::Primary,
        Component::AsepticMeningitis,
        Component::UrinaryRetention,
        Component::Psychosocial,
        Component::Recurrence,
        Component::Infrequent,
        Component::FrequentNoCst,
        Component::FrequentCst,
        Component::RecurrentMeningitis,
        Component::Encephalitis,
    ];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Component::Primary => "primary",
            Component::AsepticMeningitis => "am",
            Component::UrinaryRetention => "ur",
            Component::Psychosocial => "psych",
            Component::Recurrence => "recur",
            Component::Infrequent => "infreq",
            Component::FrequentNoCst => "freq_no_cst",
            Component::FrequentCst => "freq_cst",
            Component::RecurrentMeningitis => "rm",
            Component::Encephalitis => "ence",
        }
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Component {
    type Err = LookupError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Component::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| LookupError::UnknownComponent(s.to_string()))
    }
}

/// Component-name to value mapping; ordered so merged output is deterministic
pub type ComponentMap = BTreeMap<Component, f64>;

/// Key-wise `target += weight * source`, absent keys treated as zero
pub fn merge_weighted(target: &mut ComponentMap, source: &ComponentMap, weight: f64) {
    for (component, value) in source {
        *target.entry(*component).or_insert(0.0) += weight * value;
    }
}

/// Build a component map from `(component, value)` pairs
#[must_use]
pub fn components<const N: usize>(entries: [(Component, f64); N]) -> ComponentMap {
    let mut map = ComponentMap::new();
    for (component, value) in entries {
        *map.entry(component).or_insert(0.0) += value;
    }
    map
}
