//! Budget values and the scalar combinators shared by every pricing rule.

pub mod functions;
pub mod truth;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

static CLAMP_WARNED: AtomicBool = AtomicBool::new(false);

/// Forces a budget component back into [0, 1].
///
/// Out-of-range values are an invariant violation upstream. They are
/// repaired here and reported once per process.
pub(crate) fn clamp_unit(value: f32) -> f32 {
    if (0.0..=1.0).contains(&value) {
        return value;
    }
    if !CLAMP_WARNED.swap(true, Ordering::Relaxed) {
        tracing::warn!(value, "budget component left [0, 1], clamping");
    }
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Disjunction: `1 - (1 - a)(1 - b)`.
pub fn or(a: f32, b: f32) -> f32 {
    1.0 - (1.0 - a) * (1.0 - b)
}

/// Conjunction: `a * b`.
pub fn and(a: f32, b: f32) -> f32 {
    a * b
}

/// Arithmetic mean of two values.
pub fn ave_ari(a: f32, b: f32) -> f32 {
    (a + b) / 2.0
}

pub fn ave_geo(values: &[f32]) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    let product: f32 = values.iter().product();
    product.powf(1.0 / values.len() as f32)
}

/// Evidence weight to confidence, with an evidential horizon of 1.
pub fn w2c(w: f32) -> f32 {
    w / (w + 1.0)
}

/// Confidence to evidence weight. Inverse of [`w2c`].
pub fn c2w(c: f32) -> f32 {
    c / (1.0 - c)
}

/// Priority, durability and quality of an item, each kept in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BudgetValue {
    priority: f32,
    durability: f32,
    quality: f32,
}

impl BudgetValue {
    pub fn new(priority: f32, durability: f32, quality: f32) -> Self {
        Self {
            priority: clamp_unit(priority),
            durability: clamp_unit(durability),
            quality: clamp_unit(quality),
        }
    }

    // Getters
    pub fn priority(&self) -> f32 { self.priority }
    pub fn durability(&self) -> f32 { self.durability }
    pub fn quality(&self) -> f32 { self.quality }

    pub fn set_priority(&mut self, value: f32) {
        self.priority = clamp_unit(value);
    }

    pub fn set_durability(&mut self, value: f32) {
        self.durability = clamp_unit(value);
    }

    pub fn set_quality(&mut self, value: f32) {
        self.quality = clamp_unit(value);
    }

    /// Raises priority towards 1: `p = or(p, v)`.
    pub fn inc_priority(&mut self, v: f32) {
        self.set_priority(or(self.priority, v));
    }

    /// Scales priority down: `p = and(p, v)`.
    pub fn dec_priority(&mut self, v: f32) {
        self.set_priority(and(self.priority, v));
    }

    pub fn inc_durability(&mut self, v: f32) {
        self.set_durability(or(self.durability, v));
    }

    pub fn dec_durability(&mut self, v: f32) {
        self.set_durability(and(self.durability, v));
    }

    /// Overall worth of the budget, the geometric mean of its components.
    pub fn summary(&self) -> f32 {
        ave_geo(&[self.priority, self.durability, self.quality])
    }

    pub fn above_threshold(&self, threshold: f32) -> bool {
        self.summary() >= threshold
    }
}

impl Default for BudgetValue {
    fn default() -> Self {
        Self::new(0.01, 0.01, 0.01)
    }
}

impl fmt::Display for BudgetValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${:.4};{:.4};{:.4}$", self.priority, self.durability, self.quality)
    }
}
