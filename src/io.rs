//! Input sources and output sinks around a reasoner.

use crate::budget::truth::TruthValue;
use crate::budget::BudgetValue;
use crate::memory::entry::{Sentence, SentenceKind, Task, Term};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

/// An already parsed sentence offered to a reasoner. The memory stamps it and,
/// unless one is given, assigns the default budget for its kind.
#[derive(Debug, Clone, PartialEq)]
pub struct Input {
    pub content: Term,
    pub kind: SentenceKind,
    pub truth: Option<TruthValue>,
    pub budget: Option<BudgetValue>,
}

impl Input {
    pub fn judgment(content: Term, truth: TruthValue) -> Self {
        Self {
            content,
            kind: SentenceKind::Judgment,
            truth: Some(truth),
            budget: None,
        }
    }

    pub fn question(content: Term) -> Self {
        Self {
            content,
            kind: SentenceKind::Question,
            truth: None,
            budget: None,
        }
    }

    pub fn goal(content: Term, truth: TruthValue) -> Self {
        Self {
            content,
            kind: SentenceKind::Goal,
            truth: Some(truth),
            budget: None,
        }
    }

    pub fn with_budget(mut self, budget: BudgetValue) -> Self {
        self.budget = Some(budget);
        self
    }
}

pub trait InputSource: Send {
    fn has_more(&self) -> bool;
    fn next_input(&mut self) -> Option<Input>;
    /// Whether the source will never produce anything again.
    fn is_closed(&self) -> bool;
}

/// In-memory FIFO source.
#[derive(Debug, Default)]
pub struct QueueInput {
    queue: VecDeque<Input>,
    closed: bool,
}

impl QueueInput {
    pub fn new() -> Self {
        Self::default()
    }

    /// A source holding exactly `inputs`, closed once they are drained.
    pub fn closed_with(inputs: impl IntoIterator<Item = Input>) -> Self {
        Self {
            queue: inputs.into_iter().collect(),
            closed: true,
        }
    }

    pub fn push(&mut self, input: Input) {
        self.queue.push_back(input);
    }

    pub fn close(&mut self) {
        self.closed = true;
    }
}

impl InputSource for QueueInput {
    fn has_more(&self) -> bool {
        !self.queue.is_empty()
    }

    fn next_input(&mut self) -> Option<Input> {
        self.queue.pop_front()
    }

    fn is_closed(&self) -> bool {
        self.closed && self.queue.is_empty()
    }
}

/// Something a cycle reports to the outside world.
#[derive(Debug, Clone)]
pub enum OutputEvent {
    /// An external task entered the admission buffer.
    Admitted(Task),
    /// A task was taken from the admission buffer and processed directly.
    Processed(Task),
    /// A task was derived and queued for admission.
    Derived(Task),
    /// A belief answered a question.
    Answer { question: Sentence, solution: Sentence },
    /// A concept fired a task-link.
    Fired { concept: Term, task: Sentence },
}

impl fmt::Display for OutputEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputEvent::Admitted(task) => write!(f, "IN: {task}"),
            OutputEvent::Processed(task) => write!(f, "PROCESS: {task}"),
            OutputEvent::Derived(task) => write!(f, "OUT: {task}"),
            OutputEvent::Answer { question, solution } => write!(f, "ANSWER: {question} {solution}"),
            OutputEvent::Fired { concept, task } => write!(f, "FIRE: {concept} {task}"),
        }
    }
}

pub trait OutputSink: Send {
    fn emit(&mut self, event: &OutputEvent);
}

impl OutputSink for Vec<OutputEvent> {
    fn emit(&mut self, event: &OutputEvent) {
        self.push(event.clone());
    }
}

/// Collects events into a list that stays readable through cloned handles.
#[derive(Debug, Clone, Default)]
pub struct CollectingSink {
    events: Arc<Mutex<Vec<OutputEvent>>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<OutputEvent> {
        self.events.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}

impl OutputSink for CollectingSink {
    fn emit(&mut self, event: &OutputEvent) {
        self.events.lock().push(event.clone());
    }
}

/// Logs every event through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl OutputSink for TracingSink {
    fn emit(&mut self, event: &OutputEvent) {
        match event {
            OutputEvent::Answer { .. } => tracing::info!(event = %event, "answer"),
            _ => tracing::debug!(event = %event, "output"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queue_input_reports_closure() {
        let mut source = QueueInput::new();
        source.push(Input::question(Term::atom("a")));
        assert!(source.has_more());
        assert!(!source.is_closed());
        source.close();
        assert!(!source.is_closed(), "still holds an input");
        assert_eq!(source.next_input().unwrap().kind, SentenceKind::Question);
        assert!(source.is_closed());
        assert!(source.next_input().is_none());
    }

    #[test]
    fn test_collecting_sink_shares_events() {
        let sink = CollectingSink::new();
        let mut handle: Box<dyn OutputSink> = Box::new(sink.clone());
        let question = Sentence::question(Term::atom("a"), crate::memory::entry::Stamp::new(1, 0));
        handle.emit(&OutputEvent::Fired {
            concept: Term::atom("a"),
            task: question,
        });
        assert_eq!(sink.len(), 1);
        assert!(sink.events()[0].to_string().starts_with("FIRE: a"));
    }
}
