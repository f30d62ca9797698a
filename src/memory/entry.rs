use crate::budget::truth::TruthValue;
use crate::budget::BudgetValue;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Anything a [`Bag`](crate::storage::bag::Bag) can hold: a stable key plus a budget.
pub trait Item {
    fn key(&self) -> &str;
    fn budget(&self) -> &BudgetValue;
    fn budget_mut(&mut self) -> &mut BudgetValue;

    fn priority(&self) -> f32 {
        self.budget().priority()
    }
}

/// Content of a sentence: an atom or a compound of other terms.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Term {
    name: String,
    components: Vec<Term>,
}

impl Term {
    pub fn atom(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            components: Vec::new(),
        }
    }

    /// Builds a compound named `(op, c1, c2, ...)`.
    pub fn compound(op: &str, components: Vec<Term>) -> Self {
        let mut name = format!("({op}");
        for component in &components {
            name.push_str(", ");
            name.push_str(&component.name);
        }
        name.push(')');
        Self { name, components }
    }

    pub fn name(&self) -> &str { &self.name }
    pub fn components(&self) -> &[Term] { &self.components }

    pub fn is_compound(&self) -> bool {
        !self.components.is_empty()
    }

    /// Syntactic node count: 1 for an atom.
    pub fn complexity(&self) -> usize {
        1 + self.components.iter().map(Term::complexity).sum::<usize>()
    }

    pub fn has_query_var(&self) -> bool {
        self.name.starts_with('?') || self.components.iter().any(Term::has_query_var)
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Evidential base of a sentence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stamp {
    base: Vec<u64>,
    creation_time: u64,
}

impl Stamp {
    /// Stamp of a fresh piece of input evidence.
    pub fn new(serial: u64, creation_time: u64) -> Self {
        Self {
            base: vec![serial],
            creation_time,
        }
    }

    /// Interleaves two bases position by position, `first` leading at each
    /// position, dropping repeats and keeping at most `max_length` serials.
    pub fn merge(first: &Stamp, second: &Stamp, creation_time: u64, max_length: usize) -> Self {
        let mut base = Vec::with_capacity(max_length);
        let longest = first.base.len().max(second.base.len());
        for i in 0..longest {
            for source in [&first.base, &second.base] {
                if let Some(&serial) = source.get(i) {
                    if base.len() < max_length && !base.contains(&serial) {
                        base.push(serial);
                    }
                }
            }
        }
        Self { base, creation_time }
    }

    /// Same evidence, re-dated to `creation_time`.
    pub fn with_time(&self, creation_time: u64) -> Self {
        Self {
            base: self.base.clone(),
            creation_time,
        }
    }

    pub fn base(&self) -> &[u64] { &self.base }
    pub fn creation_time(&self) -> u64 { self.creation_time }

    /// Whether the two stamps share any evidence.
    pub fn overlaps(&self, other: &Stamp) -> bool {
        self.base.iter().any(|serial| other.base.contains(serial))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SentenceKind {
    Judgment,
    Question,
    Goal,
}

impl SentenceKind {
    pub fn punctuation(&self) -> char {
        match self {
            SentenceKind::Judgment => '.',
            SentenceKind::Question => '?',
            SentenceKind::Goal => '!',
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sentence {
    content: Term,
    kind: SentenceKind,
    truth: Option<TruthValue>,
    stamp: Stamp,
}

impl Sentence {
    /// Questions carry no truth value; `truth` is ignored for them.
    pub fn new(content: Term, kind: SentenceKind, truth: Option<TruthValue>, stamp: Stamp) -> Self {
        let truth = match kind {
            SentenceKind::Question => None,
            _ => truth,
        };
        Self {
            content,
            kind,
            truth,
            stamp,
        }
    }

    pub fn judgment(content: Term, truth: TruthValue, stamp: Stamp) -> Self {
        Self::new(content, SentenceKind::Judgment, Some(truth), stamp)
    }

    pub fn question(content: Term, stamp: Stamp) -> Self {
        Self::new(content, SentenceKind::Question, None, stamp)
    }

    pub fn goal(content: Term, truth: TruthValue, stamp: Stamp) -> Self {
        Self::new(content, SentenceKind::Goal, Some(truth), stamp)
    }

    // Getters
    pub fn content(&self) -> &Term { &self.content }
    pub fn kind(&self) -> SentenceKind { self.kind }
    pub fn truth(&self) -> Option<&TruthValue> { self.truth.as_ref() }
    pub fn stamp(&self) -> &Stamp { &self.stamp }

    pub fn is_judgment(&self) -> bool {
        self.kind == SentenceKind::Judgment
    }

    pub fn is_question(&self) -> bool {
        self.kind == SentenceKind::Question
    }

    /// Textual identity: content, punctuation and truth.
    pub fn key(&self) -> String {
        match &self.truth {
            Some(truth) => format!("{}{} {}", self.content, self.kind.punctuation(), truth),
            None => format!("{}{}", self.content, self.kind.punctuation()),
        }
    }

    /// Same content and truth, and the same evidence behind it.
    pub fn is_duplicate_of(&self, other: &Sentence) -> bool {
        self.content == other.content && self.truth == other.truth && self.stamp.base == other.stamp.base
    }
}

impl fmt::Display for Sentence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

/// A sentence to be processed, with the budget that pays for processing it.
#[derive(Debug, Clone)]
pub struct Task {
    key: String,
    sentence: Sentence,
    budget: BudgetValue,
    best_solution: Option<Sentence>,
}

/// A task shared by every link that points at it.
pub type SharedTask = Arc<RwLock<Task>>;

impl Task {
    pub fn new(sentence: Sentence, budget: BudgetValue) -> Self {
        Self {
            key: sentence.key(),
            sentence,
            budget,
            best_solution: None,
        }
    }

    pub fn sentence(&self) -> &Sentence { &self.sentence }
    pub fn content(&self) -> &Term { self.sentence.content() }
    pub fn best_solution(&self) -> Option<&Sentence> { self.best_solution.as_ref() }

    pub fn set_best_solution(&mut self, solution: Sentence) {
        self.best_solution = Some(solution);
    }

    pub fn into_shared(self) -> SharedTask {
        Arc::new(RwLock::new(self))
    }
}

impl Item for Task {
    fn key(&self) -> &str {
        &self.key
    }

    fn budget(&self) -> &BudgetValue {
        &self.budget
    }

    fn budget_mut(&mut self) -> &mut BudgetValue {
        &mut self.budget
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.budget, self.sentence)
    }
}
