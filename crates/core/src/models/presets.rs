//! Built-in allocation strategies and dealer margin tables.
//!
//! These are plain values; callers pick one and pass it into the core.

use serde::{Deserialize, Serialize};

use super::allocation::Allocation;
use super::metal::Metal;

/// Buy/sell dealer margins for one metal, in percent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarginPair {
    pub buy: f64,
    pub sell: f64,
}

/// Typical dealer margins per metal.
pub fn default_margins(metal: Metal) -> MarginPair {
    match metal {
        Metal::Gold => MarginPair { buy: 2.0, sell: 1.5 },
        Metal::Silver => MarginPair { buy: 3.0, sell: 2.0 },
        Metal::Platinum => MarginPair { buy: 4.0, sell: 3.0 },
        Metal::Palladium => MarginPair { buy: 5.0, sell: 4.0 },
    }
}

fn split(gold: f64, silver: f64, platinum: f64, palladium: f64) -> Allocation {
    Allocation::from_pairs([
        (Metal::Gold, gold),
        (Metal::Silver, silver),
        (Metal::Platinum, platinum),
        (Metal::Palladium, palladium),
    ])
}

/// 40 / 30 / 15 / 15
pub fn default_allocation() -> Allocation {
    split(40.0, 30.0, 15.0, 15.0)
}

/// Named investment strategies, in presentation order.
pub fn strategies() -> Vec<(&'static str, Allocation)> {
    vec![
        ("Standard", default_allocation()),
        ("Conservative", split(70.0, 20.0, 5.0, 5.0)),
        ("Aggressive", split(20.0, 30.0, 25.0, 25.0)),
        ("Gold only", split(100.0, 0.0, 0.0, 0.0)),
        ("Industrial", split(10.0, 40.0, 25.0, 25.0)),
    ]
}

/// Look up a strategy by name (case-insensitive).
pub fn strategy(name: &str) -> Option<Allocation> {
    strategies()
        .into_iter()
        .find(|(n, _)| n.eq_ignore_ascii_case(name))
        .map(|(_, a)| a)
}
