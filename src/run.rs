//! Batch driver: feeds inputs into a [`Memory`] and keeps it cycling.

use crate::config::ReasonerConfig;
use crate::error::Result;
use crate::io::{InputSource, OutputEvent, OutputSink};
use crate::memory::{Admission, CycleOutcome, Item, Memory};
use crate::rules::InferenceRules;
use crate::sense::LogicSense;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// When [`Reasoner::run`] returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunLimit {
    /// Exactly this many ticks.
    Cycles(u64),
    /// Until every input source is closed, or `max_cycles` ticks.
    UntilInputExhausted { max_cycles: u64 },
    /// Until stopped through a [`StopHandle`].
    Forever,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    CycleLimit,
    InputExhausted,
    Requested,
}

/// Requests a running reasoner to stop after its current cycle.
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn request_stop(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_stop_requested(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    fn clear(&self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Summary of one call to [`Reasoner::run`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub cycles: u64,
    pub processed: u64,
    pub fired: u64,
    pub derived: u64,
    pub faults: u64,
    pub idle: u64,
    pub stopped_by: Option<StopReason>,
}

impl RunReport {
    fn record(&mut self, outcome: CycleOutcome) {
        self.cycles += 1;
        match outcome {
            CycleOutcome::Processed => self.processed += 1,
            CycleOutcome::Fired { derived } => {
                self.fired += 1;
                self.derived += derived as u64;
            }
            CycleOutcome::Faulted => self.faults += 1,
            CycleOutcome::Idle => self.idle += 1,
        }
    }
}

/// Fans every event out to the registered sinks, in registration order.
#[derive(Default)]
struct Sinks(Vec<Box<dyn OutputSink>>);

impl OutputSink for Sinks {
    fn emit(&mut self, event: &OutputEvent) {
        for sink in self.0.iter_mut() {
            sink.emit(event);
        }
    }
}

/// A memory together with its rule library and the world around it.
pub struct Reasoner {
    memory: Memory,
    rules: Box<dyn InferenceRules + Send>,
    sources: Vec<Box<dyn InputSource>>,
    sinks: Sinks,
    stop: StopHandle,
}

impl Reasoner {
    pub fn new(config: ReasonerConfig, rules: impl InferenceRules + Send + 'static) -> Result<Self> {
        Ok(Self {
            memory: Memory::new(config)?,
            rules: Box::new(rules),
            sources: Vec::new(),
            sinks: Sinks::default(),
            stop: StopHandle::default(),
        })
    }

    pub fn with_sense(mut self, sense: Arc<LogicSense>) -> Self {
        self.memory = self.memory.with_sense(sense);
        self
    }

    pub fn add_input(&mut self, source: impl InputSource + 'static) {
        self.sources.push(Box::new(source));
    }

    pub fn add_output(&mut self, sink: impl OutputSink + 'static) {
        self.sinks.0.push(Box::new(sink));
    }

    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    pub fn memory_mut(&mut self) -> &mut Memory {
        &mut self.memory
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Whether every input source is closed. True when there are none.
    pub fn inputs_exhausted(&self) -> bool {
        self.sources.iter().all(|source| source.is_closed())
    }

    /// Admits at most one pending input, then runs one cycle.
    ///
    /// Sources are polled in the order they were added.
    pub fn tick(&mut self) -> Result<CycleOutcome> {
        let next = self
            .sources
            .iter_mut()
            .filter(|source| source.has_more())
            .find_map(|source| source.next_input());
        if let Some(input) = next {
            let task = self.memory.perceive(input);
            let key = task.key().to_string();
            match self.memory.admit(task.clone()) {
                Admission::Displaced(dropped) if dropped == key => {
                    tracing::debug!(task = %task, "input dropped at admission");
                }
                _ => self.sinks.emit(&OutputEvent::Admitted(task)),
            }
        }
        self.memory.cycle(self.rules.as_ref(), &mut self.sinks)
    }

    /// Ticks until `limit` is reached or a stop is requested.
    ///
    /// A pending stop request is consumed by the call it stops.
    pub fn run(&mut self, limit: RunLimit) -> Result<RunReport> {
        let mut report = RunReport::default();
        tracing::info!(?limit, time = self.memory.time(), "run started");
        loop {
            if self.stop.is_stop_requested() {
                self.stop.clear();
                report.stopped_by = Some(StopReason::Requested);
                break;
            }
            match limit {
                RunLimit::Cycles(n) if report.cycles >= n => {
                    report.stopped_by = Some(StopReason::CycleLimit);
                    break;
                }
                RunLimit::UntilInputExhausted { max_cycles } if report.cycles >= max_cycles => {
                    report.stopped_by = Some(StopReason::CycleLimit);
                    break;
                }
                _ => {}
            }

            let outcome = self.tick().map_err(|e| {
                tracing::error!(error = %e, time = self.memory.time(), "run aborted");
                e
            })?;
            report.record(outcome);

            if matches!(limit, RunLimit::UntilInputExhausted { .. }) && self.inputs_exhausted() {
                report.stopped_by = Some(StopReason::InputExhausted);
                break;
            }
        }
        tracing::info!(
            cycles = report.cycles,
            derived = report.derived,
            faults = report.faults,
            stopped_by = ?report.stopped_by,
            "run finished"
        );
        Ok(report)
    }
}

impl fmt::Display for Reasoner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.memory, f)
    }
}
