//! Contract between the memory cycle and an external inference rule library.
//!
//! The library sees a premise pair and returns candidate conclusions. It never
//! touches budgets: the memory prices each conclusion according to its
//! [`Pricing`].

use crate::budget::truth::TruthValue;
use crate::memory::entry::{Sentence, SentenceKind, Term};
use crate::memory::link::TermLinkKind;
use thiserror::Error;

/// The premises selected for one cycle.
#[derive(Debug, Clone, Copy)]
pub struct PremisePair<'a> {
    pub task: &'a Sentence,
    /// Belief drawn from the concept the term-link points at, if any.
    pub belief: Option<&'a Sentence>,
    /// Term the selected term-link points at.
    pub target: Option<&'a Term>,
    /// Structural relation between the two concepts.
    pub relation: Option<TermLinkKind>,
}

/// Which budget function prices a conclusion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pricing {
    Forward,
    Backward,
    BackwardWeak,
    CompoundForward,
    CompoundBackward,
    CompoundBackwardWeak,
}

/// One conclusion proposed by the rule library.
#[derive(Debug, Clone, PartialEq)]
pub struct Derivation {
    pub content: Term,
    pub kind: SentenceKind,
    pub truth: Option<TruthValue>,
    pub pricing: Pricing,
}

impl Derivation {
    pub fn judgment(content: Term, truth: TruthValue, pricing: Pricing) -> Self {
        Self {
            content,
            kind: SentenceKind::Judgment,
            truth: Some(truth),
            pricing,
        }
    }

    pub fn question(content: Term, pricing: Pricing) -> Self {
        Self {
            content,
            kind: SentenceKind::Question,
            truth: None,
            pricing,
        }
    }
}

/// A rule library failed on a premise pair. The cycle is abandoned, not the run.
#[derive(Error, Debug, Clone)]
#[error("rule library fault: {0}")]
pub struct RuleFault(pub String);

pub trait InferenceRules {
    fn derive(&self, premises: &PremisePair<'_>) -> Result<Vec<Derivation>, RuleFault>;
}

impl<F> InferenceRules for F
where
    F: Fn(&PremisePair<'_>) -> Result<Vec<Derivation>, RuleFault>,
{
    fn derive(&self, premises: &PremisePair<'_>) -> Result<Vec<Derivation>, RuleFault> {
        self(premises)
    }
}

/// A library that never concludes anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoRules;

impl InferenceRules for NoRules {
    fn derive(&self, _premises: &PremisePair<'_>) -> Result<Vec<Derivation>, RuleFault> {
        Ok(Vec::new())
    }
}
