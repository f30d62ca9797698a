//! Read-only reasoning telemetry.
//!
//! Counters are atomics and sample windows sit behind a `parking_lot` mutex,
//! so a background reporter may call [`LogicSense::sense`] while the
//! reasoner runs. Nothing here feeds back into reasoning.

use crate::memory::Memory;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

const DEFAULT_WINDOW: usize = 32;

/// Counts occurrences of an event and keeps a window of recent values.
pub struct EventSensor {
    name: &'static str,
    hits: AtomicU64,
    window: Mutex<VecDeque<f64>>,
    window_size: usize,
}

impl EventSensor {
    pub fn new(name: &'static str, window_size: usize) -> Self {
        Self {
            name,
            hits: AtomicU64::new(0),
            window: Mutex::new(VecDeque::with_capacity(window_size)),
            window_size,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Records one occurrence carrying `value` (a priority, a complexity, ...).
    pub fn hit(&self, value: f64) {
        self.hits.fetch_add(1, Ordering::Relaxed);
        if self.window_size == 0 {
            return;
        }
        let mut window = self.window.lock();
        if window.len() >= self.window_size {
            window.pop_front();
        }
        window.push_back(value);
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    /// Mean of the values in the current window.
    pub fn mean(&self) -> f64 {
        let window = self.window.lock();
        if window.is_empty() {
            return 0.0;
        }
        window.iter().sum::<f64>() / window.len() as f64
    }

    fn reset(&self) {
        self.hits.store(0, Ordering::Relaxed);
        self.window.lock().clear();
    }
}

/// Event sensors of the reasoning core.
pub struct LogicSense {
    pub task_add_new: EventSensor,
    pub task_immediate_process: EventSensor,
    pub task_derived: EventSensor,
    pub tasklink_fire: EventSensor,
    pub task_link_to: EventSensor,
    pub reason: EventSensor,
    pub concept_new: EventSensor,
    pub belief_revision: EventSensor,
    pub judgment_process: EventSensor,
    pub question_process: EventSensor,
    pub goal_process: EventSensor,
    pub answer: EventSensor,
    pub rule_fault: EventSensor,
}

impl Default for LogicSense {
    fn default() -> Self {
        Self::new()
    }
}

impl LogicSense {
    pub fn new() -> Self {
        Self {
            task_add_new: EventSensor::new("task.add_new", DEFAULT_WINDOW),
            task_immediate_process: EventSensor::new("task.immediate_process", DEFAULT_WINDOW),
            task_derived: EventSensor::new("task.derived", DEFAULT_WINDOW),
            tasklink_fire: EventSensor::new("tasklink.fire", DEFAULT_WINDOW),
            task_link_to: EventSensor::new("task.link_to", DEFAULT_WINDOW),
            reason: EventSensor::new("reason.tasktermlinks", DEFAULT_WINDOW),
            concept_new: EventSensor::new("concept.new", DEFAULT_WINDOW),
            belief_revision: EventSensor::new("reason.belief_revision", DEFAULT_WINDOW),
            judgment_process: EventSensor::new("judgment.process", 0),
            question_process: EventSensor::new("question.process", 0),
            goal_process: EventSensor::new("goal.process", 0),
            answer: EventSensor::new("task.answer", DEFAULT_WINDOW),
            rule_fault: EventSensor::new("reason.rule_fault", 0),
        }
    }

    fn sensors(&self) -> [&EventSensor; 13] {
        [
            &self.task_add_new,
            &self.task_immediate_process,
            &self.task_derived,
            &self.tasklink_fire,
            &self.task_link_to,
            &self.reason,
            &self.concept_new,
            &self.belief_revision,
            &self.judgment_process,
            &self.question_process,
            &self.goal_process,
            &self.answer,
            &self.rule_fault,
        ]
    }

    /// Combines the counters with a look at the memory's current state.
    pub fn sense(&self, memory: &Memory) -> SenseSnapshot {
        let stats = memory.stats();
        SenseSnapshot {
            cycle: memory.time(),
            concept_count: stats.concept_count,
            concept_priority_mean: stats.concept_priority_mean,
            concept_beliefs_mean: stats.concept_beliefs_mean,
            concept_questions_mean: stats.concept_questions_mean,
            novel_tasks: stats.novel_tasks,
            events: self
                .sensors()
                .iter()
                .map(|sensor| EventSummary {
                    name: sensor.name(),
                    hits: sensor.hits(),
                    mean: sensor.mean(),
                })
                .collect(),
        }
    }

    /// Emits one `info!` event per sensor.
    pub fn flush(&self) {
        for sensor in self.sensors() {
            tracing::info!(metric = sensor.name(), hits = sensor.hits(), mean = sensor.mean());
        }
    }

    pub fn reset(&self) {
        self.sensors().iter().for_each(|sensor| sensor.reset());
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EventSummary {
    pub name: &'static str,
    pub hits: u64,
    pub mean: f64,
}

/// Point-in-time telemetry of one reasoner.
#[derive(Debug, Clone, Serialize)]
pub struct SenseSnapshot {
    pub cycle: u64,
    pub concept_count: usize,
    pub concept_priority_mean: f32,
    pub concept_beliefs_mean: f32,
    pub concept_questions_mean: f32,
    pub novel_tasks: usize,
    pub events: Vec<EventSummary>,
}

impl SenseSnapshot {
    pub fn hits(&self, name: &str) -> Option<u64> {
        self.events.iter().find(|e| e.name == name).map(|e| e.hits)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
