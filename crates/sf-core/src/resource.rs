use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A stockpiled commodity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// Raw metal ore dug out by mines.
    Ore,
    /// Crude oil, the refinery input.
    Oil,
    /// Refined starship fuel.
    Fuel,
    /// Water ice.
    Water,
}

impl ResourceKind {
    /// All resource kinds in display order.
    pub const ALL: [ResourceKind; 4] = [Self::Ore, Self::Oil, Self::Fuel, Self::Water];
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ore => write!(f, "ore"),
            Self::Oil => write!(f, "oil"),
            Self::Fuel => write!(f, "fuel"),
            Self::Water => write!(f, "water"),
        }
    }
}

/// Amounts of each resource held at one place. Missing kinds read as zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Stockpile(BTreeMap<ResourceKind, f64>);

impl Stockpile {
    /// Create an empty stockpile.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert of an initial amount.
    pub fn with(mut self, kind: ResourceKind, amount: f64) -> Self {
        self.0.insert(kind, amount.max(0.0));
        self
    }

    /// Amount of `kind` held.
    pub fn get(&self, kind: ResourceKind) -> f64 {
        self.0.get(&kind).copied().unwrap_or(0.0)
    }

    /// Add `delta` (which may be negative) to `kind`, flooring the result at zero.
    pub fn adjust(&mut self, kind: ResourceKind, delta: f64) {
        let level = self.0.entry(kind).or_insert(0.0);
        *level = (*level + delta).max(0.0);
    }

    /// Iterate over the non-empty entries.
    pub fn iter(&self) -> impl Iterator<Item = (ResourceKind, f64)> + '_ {
        self.0.iter().map(|(k, v)| (*k, *v))
    }
}
