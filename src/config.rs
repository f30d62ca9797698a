//! Tunable parameters of a reasoner.

use crate::error::{ReasonerError, Result};
use crate::storage::bag::{ForgetRate, LevelWeighting};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Shape and decay of one family of bags
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BagConfig {
    /// Maximum number of stored items
    pub capacity: usize,
    /// Number of priority levels
    pub levels: usize,
    /// Number of accesses after which priority 1 decays to the durability
    pub forget_rate: f32,
    /// Fraction of quality kept as the decay floor
    pub relative_threshold: f32,
}

impl BagConfig {
    pub fn new(capacity: usize, levels: usize, forget_rate: f32) -> Self {
        Self {
            capacity,
            levels,
            forget_rate,
            ..Self::default()
        }
    }

    pub fn validate(&self, role: &str) -> Result<()> {
        if self.capacity == 0 {
            return Err(ReasonerError::config(format!("{role}: capacity must be positive")));
        }
        if self.levels == 0 {
            return Err(ReasonerError::config(format!("{role}: level count must be positive")));
        }
        if !(0.0..=1.0).contains(&self.relative_threshold) {
            return Err(ReasonerError::config(format!(
                "{role}: relative threshold {} outside [0, 1]",
                self.relative_threshold
            )));
        }
        ForgetRate::check(self.forget_rate).map_err(|e| match e {
            ReasonerError::Configuration(msg) => ReasonerError::config(format!("{role}: {msg}")),
            other => other,
        })
    }
}

impl Default for BagConfig {
    fn default() -> Self {
        Self {
            capacity: 1000,
            levels: 100,
            forget_rate: 10.0,
            relative_threshold: 0.1,
        }
    }
}

/// Default (priority, durability) given to input tasks of one kind.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InputBudget {
    pub priority: f32,
    pub durability: f32,
}

impl InputBudget {
    pub const fn new(priority: f32, durability: f32) -> Self {
        Self { priority, durability }
    }
}

/// Configuration for a [`Memory`](crate::memory::Memory) and its bags
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReasonerConfig {
    pub concept_bag: BagConfig,
    pub task_link_bag: BagConfig,
    pub term_link_bag: BagConfig,
    /// Maximum number of tasks waiting for admission
    pub novel_task_capacity: usize,
    /// Maximum number of beliefs kept per concept
    pub belief_capacity: usize,
    pub goal_capacity: usize,
    pub question_capacity: usize,
    /// Maximum number of serials in an evidential base
    pub max_stamp_length: usize,
    /// Derived tasks whose budget summary falls below this are dropped
    pub budget_threshold: f32,
    /// How many recent term-links a task-link remembers
    pub term_link_record_length: usize,
    /// Cycles before a fired premise pair counts as novel again
    pub novelty_horizon: u64,
    /// Term-links tried per cycle while looking for a novel one
    pub max_matched_term_links: usize,
    pub judgment_budget: InputBudget,
    pub question_budget: InputBudget,
    pub goal_budget: InputBudget,
    /// Weighting used when sampling a bag level
    pub level_weighting: LevelWeighting,
    /// Seed for every random choice; `None` draws from the OS
    pub seed: Option<u64>,
}

impl Default for ReasonerConfig {
    fn default() -> Self {
        Self {
            concept_bag: BagConfig::new(1000, 100, 10.0),
            task_link_bag: BagConfig::new(20, 100, 20.0),
            term_link_bag: BagConfig::new(100, 100, 50.0),
            novel_task_capacity: 1000,
            belief_capacity: 7,
            goal_capacity: 7,
            question_capacity: 5,
            max_stamp_length: 8,
            budget_threshold: 0.01,
            term_link_record_length: 10,
            novelty_horizon: 10,
            max_matched_term_links: 10,
            judgment_budget: InputBudget::new(0.8, 0.8),
            question_budget: InputBudget::new(0.9, 0.9),
            goal_budget: InputBudget::new(0.9, 0.9),
            level_weighting: LevelWeighting::Linear,
            seed: None,
        }
    }
}

impl ReasonerConfig {
    /// Default configuration with a fixed random seed.
    pub fn seeded(seed: u64) -> Self {
        Self {
            seed: Some(seed),
            ..Self::default()
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<()> {
        self.concept_bag.validate("concept bag")?;
        self.task_link_bag.validate("task-link bag")?;
        self.term_link_bag.validate("term-link bag")?;
        if self.novel_task_capacity == 0 {
            return Err(ReasonerError::config("novel task capacity must be positive"));
        }
        if self.belief_capacity == 0 || self.goal_capacity == 0 || self.question_capacity == 0 {
            return Err(ReasonerError::config("belief, goal and question tables need room"));
        }
        if self.max_stamp_length == 0 {
            return Err(ReasonerError::config("stamp length must be positive"));
        }
        if !(0.0..=1.0).contains(&self.budget_threshold) {
            return Err(ReasonerError::config(format!(
                "budget threshold {} outside [0, 1]",
                self.budget_threshold
            )));
        }
        for budget in [&self.judgment_budget, &self.question_budget, &self.goal_budget] {
            if !(0.0..=1.0).contains(&budget.priority) || !(0.0..=1.0).contains(&budget.durability) {
                return Err(ReasonerError::config("input budgets must lie in [0, 1]"));
            }
        }
        Ok(())
    }
}
