//! Deterministic, mode-adjusted display values.
//!
//! A stable identifier (usually `"Crop-Market-Mode"`) is hashed to a factor
//! in `[1 - max_delta, 1 + max_delta]`. The same identifier and mode always
//! give the same factor, across runs and platforms, so figures look
//! mode-adjusted without flickering between renders.

use std::fmt;

use serde::{Deserialize, Serialize};

/// How the displayed figure was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariationMode {
    Estimate,
    Realtime,
    Predictive,
}

impl VariationMode {
    pub const ALL: [VariationMode; 3] = [
        VariationMode::Estimate,
        VariationMode::Realtime,
        VariationMode::Predictive,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            VariationMode::Estimate => "Estimate",
            VariationMode::Realtime => "Realtime",
            VariationMode::Predictive => "Predictive",
        }
    }
}

impl fmt::Display for VariationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Which kind of figure is being varied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldFamily {
    Price,
    Volume,
}

/// Maximum relative deviation per field family.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FamilyDeltas {
    pub price: f64,
    pub volume: f64,
}

impl FamilyDeltas {
    pub fn get(&self, family: FieldFamily) -> f64 {
        match family {
            FieldFamily::Price => self.price,
            FieldFamily::Volume => self.volume,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct VariationTable {
    pub estimate: FamilyDeltas,
    pub realtime: FamilyDeltas,
    pub predictive: FamilyDeltas,
}

impl Default for VariationTable {
    fn default() -> Self {
        Self {
            estimate: FamilyDeltas {
                price: 0.06,
                volume: 0.12,
            },
            realtime: FamilyDeltas {
                price: 0.02,
                volume: 0.05,
            },
            predictive: FamilyDeltas {
                price: 0.10,
                volume: 0.15,
            },
        }
    }
}

impl VariationTable {
    pub fn max_delta(&self, mode: VariationMode, family: FieldFamily) -> f64 {
        let row = match mode {
            VariationMode::Estimate => &self.estimate,
            VariationMode::Realtime => &self.realtime,
            VariationMode::Predictive => &self.predictive,
        };
        row.get(family)
    }

    /// Every delta must lie in `[0, 1)` so factors stay positive.
    pub fn is_valid(&self) -> bool {
        [self.estimate, self.realtime, self.predictive]
            .iter()
            .flat_map(|row| [row.price, row.volume])
            .all(|d| d.is_finite() && (0.0..1.0).contains(&d))
    }
}

/// Display clamp for adjusted prices, in rupees per quintal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceBounds {
    pub floor: f64,
    pub ceiling: f64,
}

impl Default for PriceBounds {
    fn default() -> Self {
        Self {
            floor: 500.0,
            ceiling: 15_000.0,
        }
    }
}

impl PriceBounds {
    pub fn is_valid(&self) -> bool {
        self.floor.is_finite() && self.ceiling.is_finite() && self.floor <= self.ceiling
    }

    /// Clamp `value` into the bounds. Never panics: inverted bounds are
    /// swapped and a NaN bound is ignored.
    pub fn clamp(&self, value: f64) -> f64 {
        let floor = if self.floor.is_nan() { f64::NEG_INFINITY } else { self.floor };
        let ceiling = if self.ceiling.is_nan() { f64::INFINITY } else { self.ceiling };
        let (low, high) = if floor <= ceiling {
            (floor, ceiling)
        } else {
            (ceiling, floor)
        };
        value.max(low).min(high)
    }
}

// ═══════════════════════════════════════════════════════════
// Hashing
// ═══════════════════════════════════════════════════════════

/// 32-bit signed rolling hash over UTF-16 code units: `h = h * 31 + c`,
/// wrapping on overflow.
pub fn rolling_hash(s: &str) -> i32 {
    s.encode_utf16()
        .fold(0i32, |h, unit| h.wrapping_mul(31).wrapping_add(i32::from(unit)))
}

/// `(|hash| mod 1000) / 1000`, in `[0, 0.999]`.
pub fn normalized_hash(s: &str) -> f64 {
    f64::from(rolling_hash(s).unsigned_abs() % 1000) / 1000.0
}

/// Build the identifier used for a crop at a market under a mode.
pub fn variation_key(crop: &str, market: &str, mode: VariationMode) -> String {
    format!("{crop}-{market}-{mode}")
}

// ═══════════════════════════════════════════════════════════
// Engine
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct VariationEngine {
    table: VariationTable,
    bounds: PriceBounds,
}

impl VariationEngine {
    pub fn new(table: VariationTable, bounds: PriceBounds) -> Self {
        Self { table, bounds }
    }

    pub fn table(&self) -> &VariationTable {
        &self.table
    }

    pub fn bounds(&self) -> &PriceBounds {
        &self.bounds
    }

    /// Price-family factor for `id` under `mode`.
    pub fn factor(&self, id: &str, mode: VariationMode) -> f64 {
        self.factor_for(id, mode, FieldFamily::Price)
    }

    pub fn factor_for(&self, id: &str, mode: VariationMode, family: FieldFamily) -> f64 {
        let max_delta = self.table.max_delta(mode, family);
        1.0 + (normalized_hash(id) * 2.0 - 1.0) * max_delta
    }

    /// Apply the price factor, then clamp to the display bounds.
    pub fn adjust_price(&self, base: f64, id: &str, mode: VariationMode) -> f64 {
        self.bounds.clamp(base * self.factor(id, mode))
    }

    /// Apply the volume factor; volumes never go negative.
    pub fn adjust_volume(&self, base: f64, id: &str, mode: VariationMode) -> f64 {
        (base * self.factor_for(id, mode, FieldFamily::Volume)).max(0.0)
    }
}
