//! Bounded, priority-stratified item storage.

pub mod bag;

pub use bag::{Bag, ForgetRate, HighestLevelSelector, LevelSelector, LevelWeighting, WeightedRandomSelector};
