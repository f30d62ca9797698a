use super::{c2w, w2c};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Highest confidence a finite amount of evidence can reach.
pub const MAX_CONFIDENCE: f32 = 0.99;

/// Frequency and confidence of a judgment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TruthValue {
    frequency: f32,
    confidence: f32,
}

impl TruthValue {
    pub fn new(frequency: f32, confidence: f32) -> Self {
        Self {
            frequency: frequency.clamp(0.0, 1.0),
            confidence: confidence.clamp(0.0, MAX_CONFIDENCE),
        }
    }

    pub fn frequency(&self) -> f32 { self.frequency }
    pub fn confidence(&self) -> f32 { self.confidence }

    /// Expected frequency once future evidence is taken into account.
    pub fn expectation(&self) -> f32 {
        self.confidence * (self.frequency - 0.5) + 0.5
    }

    pub fn exp_dif_abs(&self, other: &TruthValue) -> f32 {
        (self.expectation() - other.expectation()).abs()
    }

    /// Pools the evidence behind two independent judgments of the same content.
    pub fn revision(&self, other: &TruthValue) -> TruthValue {
        let w1 = c2w(self.confidence);
        let w2 = c2w(other.confidence);
        let w = w1 + w2;
        if w <= 0.0 {
            return TruthValue::new(ave(self.frequency, other.frequency), 0.0);
        }
        TruthValue::new((w1 * self.frequency + w2 * other.frequency) / w, w2c(w))
    }
}

fn ave(a: f32, b: f32) -> f32 {
    (a + b) / 2.0
}

impl fmt::Display for TruthValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%{:.2};{:.2}%", self.frequency, self.confidence)
    }
}
