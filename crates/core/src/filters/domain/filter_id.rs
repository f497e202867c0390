use std::str::FromStr;

use thiserror::Error;

/// Closed set of overlay filters.
///
/// Declaration order is the draw order: when several filters are active on a
/// face, later ones are painted over earlier ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FilterId {
    Sunglasses,
    Mustache,
    ClownNose,
    Pixelate,
    Rainbow,
    None,
}

impl FilterId {
    pub const ALL: &[FilterId] = &[
        FilterId::Sunglasses,
        FilterId::Mustache,
        FilterId::ClownNose,
        FilterId::Pixelate,
        FilterId::Rainbow,
        FilterId::None,
    ];

    /// Kebab-case name used on the command line.
    pub fn name(self) -> &'static str {
        match self {
            FilterId::Sunglasses => "sunglasses",
            FilterId::Mustache => "mustache",
            FilterId::ClownNose => "clown-nose",
            FilterId::Pixelate => "pixelate",
            FilterId::Rainbow => "rainbow",
            FilterId::None => "none",
        }
    }
}

impl std::fmt::Display for FilterId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown filter '{0}' (expected one of: sunglasses, mustache, clown-nose, pixelate, rainbow, none)")]
pub struct UnknownFilter(pub String);

impl FromStr for FilterId {
    type Err = UnknownFilter;

    /// Accepts kebab, snake and camel case (`clown-nose`, `clown_nose`,
    /// `clownNose`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .flat_map(char::to_lowercase)
            .collect();
        FilterId::ALL
            .iter()
            .copied()
            .find(|id| id.name().replace('-', "") == normalized)
            .ok_or_else(|| UnknownFilter(s.to_string()))
    }
}
