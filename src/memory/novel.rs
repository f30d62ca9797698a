use super::entry::{Item, Task};
use crate::budget::functions;
use std::collections::{HashMap, VecDeque};

/// What happened to a task offered to the [`NoveltyBuffer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    Queued,
    /// An equal-key task was already waiting; budgets were merged.
    Merged,
    /// The buffer was full; the named task (possibly the offered one) was dropped.
    Displaced(String),
}

/// Bounded FIFO of tasks waiting for immediate processing.
pub struct NoveltyBuffer {
    order: VecDeque<String>,
    tasks: HashMap<String, Task>,
    capacity: usize,
}

impl NoveltyBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            order: VecDeque::with_capacity(capacity),
            tasks: HashMap::with_capacity(capacity),
            capacity,
        }
    }

    /// Appends a task, merging it into a pending task with the same key.
    ///
    /// When full, the lowest-priority task among the pending ones and the
    /// newcomer is dropped. Ties go against the oldest pending task.
    pub fn push(&mut self, task: Task) -> Admission {
        if let Some(pending) = self.tasks.get_mut(task.key()) {
            functions::merge(pending.budget_mut(), task.budget());
            return Admission::Merged;
        }
        if self.tasks.len() >= self.capacity {
            let weakest = self
                .order
                .iter()
                .filter_map(|key| self.tasks.get(key))
                .min_by(|a, b| a.priority().total_cmp(&b.priority()))
                .filter(|weakest| weakest.priority() < task.priority())
                .map(|weakest| weakest.key().to_string());
            match weakest {
                Some(key) => {
                    self.tasks.remove(&key);
                    self.order.retain(|k| *k != key);
                    self.enqueue(task);
                    return Admission::Displaced(key);
                }
                None => return Admission::Displaced(task.key().to_string()),
            }
        }
        self.enqueue(task);
        Admission::Queued
    }

    fn enqueue(&mut self, task: Task) {
        let key = task.key().to_string();
        self.order.push_back(key.clone());
        self.tasks.insert(key, task);
    }

    /// Removes the earliest queued task.
    pub fn pop(&mut self) -> Option<Task> {
        while let Some(key) = self.order.pop_front() {
            if let Some(task) = self.tasks.remove(&key) {
                return Some(task);
            }
        }
        None
    }

    pub fn get(&self, key: &str) -> Option<&Task> {
        self.tasks.get(key)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn clear(&mut self) {
        self.order.clear();
        self.tasks.clear();
    }
}
