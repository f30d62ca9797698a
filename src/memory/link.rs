use super::entry::{Item, SharedTask, Term};
use crate::budget::BudgetValue;
use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskLinkKind {
    /// The task's content is the concept's own term.
    SelfLink,
    /// The concept's term is a component of the task's content.
    Component,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TermLinkKind {
    /// The target is a component of this concept's term.
    Component,
    /// The target is a compound containing this concept's term.
    Compound,
}

/// "This concept currently hosts an active task."
#[derive(Debug)]
pub struct TaskLink {
    key: String,
    task: SharedTask,
    kind: TaskLinkKind,
    budget: BudgetValue,
    // (term-link key, cycle) pairs this link was recently fired with
    recent: VecDeque<(String, u64)>,
    record_length: usize,
}

impl TaskLink {
    pub fn new(task: SharedTask, kind: TaskLinkKind, budget: BudgetValue, record_length: usize) -> Self {
        let key = format!("{:?}:{}", kind, task.read().key());
        Self {
            key,
            task,
            kind,
            budget,
            recent: VecDeque::with_capacity(record_length),
            record_length,
        }
    }

    pub fn task(&self) -> &SharedTask { &self.task }
    pub fn kind(&self) -> TaskLinkKind { self.kind }

    /// Checks whether pairing with `term_link` at cycle `now` is new, and records it.
    ///
    /// A pair counts as new again once `novelty_horizon` cycles have passed.
    pub fn novel(&mut self, term_link: &TermLink, now: u64, novelty_horizon: u64) -> bool {
        let key = term_link.key();
        if let Some(pos) = self.recent.iter().position(|(seen, _)| seen == key) {
            let (_, when) = self.recent[pos];
            if now.saturating_sub(when) < novelty_horizon {
                return false;
            }
            self.recent.remove(pos);
        }
        if self.record_length == 0 {
            return true;
        }
        if self.recent.len() >= self.record_length {
            self.recent.pop_front();
        }
        self.recent.push_back((key.to_string(), now));
        true
    }
}

impl Item for TaskLink {
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

/// "This concept structurally relates to the concept of `target`."
#[derive(Debug, Clone)]
pub struct TermLink {
    key: String,
    target: Term,
    kind: TermLinkKind,
    budget: BudgetValue,
}

impl TermLink {
    pub fn new(target: Term, kind: TermLinkKind, budget: BudgetValue) -> Self {
        Self {
            key: format!("{:?}:{}", kind, target),
            target,
            kind,
            budget,
        }
    }

    pub fn target(&self) -> &Term { &self.target }
    pub fn kind(&self) -> TermLinkKind { self.kind }
}

impl Item for TermLink {
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::budget::truth::TruthValue;
    use crate::memory::entry::{Sentence, Stamp, Task};

    fn shared_task() -> SharedTask {
        let sentence = Sentence::judgment(Term::atom("a"), TruthValue::new(1.0, 0.9), Stamp::new(1, 0));
        Task::new(sentence, BudgetValue::new(0.5, 0.5, 0.5)).into_shared()
    }

    #[test]
    fn test_novelty_record() {
        let mut link = TaskLink::new(shared_task(), TaskLinkKind::SelfLink, BudgetValue::default(), 2);
        let first = TermLink::new(Term::atom("b"), TermLinkKind::Component, BudgetValue::default());
        let second = TermLink::new(Term::atom("c"), TermLinkKind::Component, BudgetValue::default());

        assert!(link.novel(&first, 0, 10));
        assert!(!link.novel(&first, 5, 10));
        assert!(link.novel(&first, 10, 10), "novel again after the horizon");
        assert!(link.novel(&second, 11, 10));
    }

    #[test]
    fn test_link_keys_carry_kind() {
        let link = TaskLink::new(shared_task(), TaskLinkKind::Component, BudgetValue::default(), 2);
        assert_eq!(link.key(), "Component:a. %1.00;0.90%");
        let term_link = TermLink::new(Term::atom("b"), TermLinkKind::Compound, BudgetValue::default());
        assert_eq!(term_link.key(), "Compound:b");
    }
}
