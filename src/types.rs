// Common types used across the application

use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of hidden states fitted per run. Labeling assumes exactly three.
pub const REGIME_COUNT: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RegimeLabel {
    Bearish, // Lowest mean segment return
    Neutral,
    Bullish, // Highest mean segment return
}

impl RegimeLabel {
    /// Labels in ascending order of mean return
    pub const ASCENDING: [RegimeLabel; REGIME_COUNT] =
        [RegimeLabel::Bearish, RegimeLabel::Neutral, RegimeLabel::Bullish];

    pub fn color(self) -> RegimeColor {
        match self {
            RegimeLabel::Bearish => RegimeColor::Red,
            RegimeLabel::Neutral => RegimeColor::Blue,
            RegimeLabel::Bullish => RegimeColor::Green,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RegimeLabel::Bearish => "Bearish",
            RegimeLabel::Neutral => "Neutral",
            RegimeLabel::Bullish => "Bullish",
        }
    }
}

impl fmt::Display for RegimeLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RegimeColor {
    Red,
    Blue,
    Green,
}

impl RegimeColor {
    /// Lowercase CSS color name used when shading chart spans
    pub fn css_name(self) -> &'static str {
        match self {
            RegimeColor::Red => "red",
            RegimeColor::Blue => "blue",
            RegimeColor::Green => "green",
        }
    }
}
