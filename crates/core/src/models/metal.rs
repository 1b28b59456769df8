use serde::{Deserialize, Serialize};

use crate::errors::CoreError;

/// One of the four tracked precious metals.
///
/// The declaration order (gold, silver, platinum, palladium) is the display
/// order used by summaries and weight tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metal {
    Gold,
    Silver,
    Platinum,
    Palladium,
}

impl Metal {
    /// All metals in display order.
    pub const ALL: [Metal; 4] = [Metal::Gold, Metal::Silver, Metal::Platinum, Metal::Palladium];

    /// Lowercase key used in allocation maps and settings files.
    pub fn key(&self) -> &'static str {
        match self {
            Metal::Gold => "gold",
            Metal::Silver => "silver",
            Metal::Platinum => "platinum",
            Metal::Palladium => "palladium",
        }
    }

    /// Parse a metal name, case-insensitive ("gold", "Gold", "GOLD").
    pub fn parse(name: &str) -> Result<Self, CoreError> {
        match name.trim().to_lowercase().as_str() {
            "gold" => Ok(Metal::Gold),
            "silver" => Ok(Metal::Silver),
            "platinum" => Ok(Metal::Platinum),
            "palladium" => Ok(Metal::Palladium),
            _ => Err(CoreError::UnknownMetal(name.to_string())),
        }
    }
}

impl std::fmt::Display for Metal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Metal::Gold => write!(f, "Gold"),
            Metal::Silver => write!(f, "Silver"),
            Metal::Platinum => write!(f, "Platinum"),
            Metal::Palladium => write!(f, "Palladium"),
        }
    }
}

impl std::str::FromStr for Metal {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Metal::parse(s)
    }
}

/// Grams per troy ounce.
pub const GRAMS_PER_TROY_OUNCE: f64 = 31.1035;

/// Unit in which metal quantities are expressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeightUnit {
    Gram,
    TroyOunce,
}

impl WeightUnit {
    /// Convert a quantity between units.
    pub fn convert(amount: f64, from: WeightUnit, to: WeightUnit) -> f64 {
        match (from, to) {
            (WeightUnit::Gram, WeightUnit::TroyOunce) => amount / GRAMS_PER_TROY_OUNCE,
            (WeightUnit::TroyOunce, WeightUnit::Gram) => amount * GRAMS_PER_TROY_OUNCE,
            _ => amount,
        }
    }
}

impl std::fmt::Display for WeightUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WeightUnit::Gram => write!(f, "g"),
            WeightUnit::TroyOunce => write!(f, "oz"),
        }
    }
}
