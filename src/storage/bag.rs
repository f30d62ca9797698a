use crate::budget::functions;
use crate::config::BagConfig;
use crate::error::{ReasonerError, Result};
use crate::memory::entry::Item;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// Runtime-tunable forget rate, shared by every bag holding the same kind of item.
#[derive(Debug, Clone)]
pub struct ForgetRate(Arc<AtomicU32>);

impl ForgetRate {
    pub fn new(rate: f32) -> Result<Self> {
        Self::check(rate)?;
        Ok(Self(Arc::new(AtomicU32::new(rate.to_bits()))))
    }

    pub fn get(&self) -> f32 {
        f32::from_bits(self.0.load(Ordering::Relaxed))
    }

    /// Changes the rate for every bag sharing this cell.
    pub fn set(&self, rate: f32) -> Result<()> {
        Self::check(rate)?;
        self.0.store(rate.to_bits(), Ordering::Relaxed);
        tracing::debug!(rate, "forget rate updated");
        Ok(())
    }

    pub(crate) fn check(rate: f32) -> Result<()> {
        if rate.is_finite() && rate > 0.0 {
            Ok(())
        } else {
            Err(ReasonerError::config(format!("forget rate must be positive, got {rate}")))
        }
    }
}

/// How strongly higher levels are favoured when sampling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LevelWeighting {
    /// Weight `level + 1`
    Linear,
    /// Weight `(level + 1)^2`
    Quadratic,
}

impl LevelWeighting {
    pub fn weight(&self, level: usize) -> f64 {
        let rank = (level + 1) as f64;
        match self {
            LevelWeighting::Linear => rank,
            LevelWeighting::Quadratic => rank * rank,
        }
    }
}

/// Chooses which level a [`Bag::take`] draws from.
pub trait LevelSelector: Send {
    /// `occupied` lists the non-empty levels in ascending order and is never empty.
    /// Must return one of its elements.
    fn select(&mut self, occupied: &[usize]) -> usize;
}

/// Priority-weighted random choice among occupied levels.
pub struct WeightedRandomSelector {
    rng: StdRng,
    weighting: LevelWeighting,
}

impl WeightedRandomSelector {
    pub fn seeded(seed: u64, weighting: LevelWeighting) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            weighting,
        }
    }

    pub fn from_entropy(weighting: LevelWeighting) -> Self {
        Self {
            rng: StdRng::from_os_rng(),
            weighting,
        }
    }
}

impl LevelSelector for WeightedRandomSelector {
    fn select(&mut self, occupied: &[usize]) -> usize {
        let total: f64 = occupied.iter().map(|&level| self.weighting.weight(level)).sum();
        let mut remaining = self.rng.random::<f64>() * total;
        for &level in occupied {
            remaining -= self.weighting.weight(level);
            if remaining < 0.0 {
                return level;
            }
        }
        occupied[occupied.len() - 1]
    }
}

/// Always draws from the highest occupied level.
#[derive(Debug, Default, Clone, Copy)]
pub struct HighestLevelSelector;

impl LevelSelector for HighestLevelSelector {
    fn select(&mut self, occupied: &[usize]) -> usize {
        occupied[occupied.len() - 1]
    }
}

struct Slot<T> {
    item: T,
    level: usize,
}

/// Bounded store of items, bucketed by priority level.
///
/// Items within a level are kept in insertion order. Taking an item removes
/// it; callers hand it back with [`Bag::put_back`], which charges the access
/// against its priority.
pub struct Bag<T: Item> {
    levels: Vec<VecDeque<String>>,
    slots: HashMap<String, Slot<T>>,
    capacity: usize,
    relative_threshold: f32,
    forget_rate: ForgetRate,
    selector: Box<dyn LevelSelector>,
}

impl<T: Item> Bag<T> {
    /// Creates a bag with its own forget rate cell.
    pub fn new(config: &BagConfig, selector: Box<dyn LevelSelector>) -> Result<Self> {
        config.validate("bag")?;
        let forget_rate = ForgetRate::new(config.forget_rate)?;
        Self::with_forget_rate(config, forget_rate, selector)
    }

    /// Creates a bag whose forget rate is shared with other bags.
    pub fn with_forget_rate(
        config: &BagConfig,
        forget_rate: ForgetRate,
        selector: Box<dyn LevelSelector>,
    ) -> Result<Self> {
        config.validate("bag")?;
        Ok(Self {
            levels: (0..config.levels).map(|_| VecDeque::new()).collect(),
            slots: HashMap::with_capacity(config.capacity + 1),
            capacity: config.capacity,
            relative_threshold: config.relative_threshold,
            forget_rate,
            selector,
        })
    }

    fn level_for(priority: f32, level_count: usize) -> usize {
        let level = (priority * level_count as f32).floor() as usize;
        level.min(level_count - 1)
    }

    /// Inserts an item, or merges its budget into the stored item with the same key.
    ///
    /// Returns the item evicted to stay within capacity, which may be the
    /// one just inserted.
    pub fn put(&mut self, item: T) -> Option<T> {
        let level_count = self.levels.len();
        if let Some(slot) = self.slots.get_mut(item.key()) {
            functions::merge(slot.item.budget_mut(), item.budget());
            let level = Self::level_for(slot.item.priority(), level_count);
            if level != slot.level {
                let key = item.key();
                if let Some(pos) = self.levels[slot.level].iter().position(|k| k == key) {
                    self.levels[slot.level].remove(pos);
                }
                self.levels[level].push_back(key.to_string());
                slot.level = level;
            }
            return None;
        }

        let key = item.key().to_string();
        let level = Self::level_for(item.priority(), level_count);
        self.levels[level].push_back(key.clone());
        self.slots.insert(key, Slot { item, level });

        if self.slots.len() > self.capacity {
            self.evict()
        } else {
            None
        }
    }

    /// Decays the item's priority for having been used, then puts it back.
    pub fn put_back(&mut self, mut item: T) -> Option<T> {
        functions::forget(item.budget_mut(), self.forget_rate.get(), self.relative_threshold);
        self.put(item)
    }

    /// Removes the oldest item of a level chosen by the selector.
    pub fn take(&mut self) -> Option<T> {
        if self.slots.is_empty() {
            return None;
        }
        let occupied: Vec<usize> = self
            .levels
            .iter()
            .enumerate()
            .filter(|(_, queue)| !queue.is_empty())
            .map(|(level, _)| level)
            .collect();
        let mut level = self.selector.select(&occupied);
        if self.levels.get(level).map_or(true, VecDeque::is_empty) {
            level = occupied[occupied.len() - 1];
        }
        let key = self.levels[level].pop_front()?;
        self.slots.remove(&key).map(|slot| slot.item)
    }

    /// Removes the item with the given key.
    pub fn pick(&mut self, key: &str) -> Option<T> {
        let slot = self.slots.remove(key)?;
        if let Some(pos) = self.levels[slot.level].iter().position(|k| k == key) {
            self.levels[slot.level].remove(pos);
        }
        Some(slot.item)
    }

    fn evict(&mut self) -> Option<T> {
        let key = self.levels.iter_mut().find(|queue| !queue.is_empty())?.pop_front()?;
        let slot = self.slots.remove(&key)?;
        tracing::trace!(key = %key, level = slot.level, "evicted from bag");
        Some(slot.item)
    }

    pub fn get(&self, key: &str) -> Option<&T> {
        self.slots.get(key).map(|slot| &slot.item)
    }

    /// Mutable access; the item stays in the level it was put at.
    pub fn get_mut(&mut self, key: &str) -> Option<&mut T> {
        self.slots.get_mut(key).map(|slot| &mut slot.item)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.slots.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn forget_rate(&self) -> &ForgetRate {
        &self.forget_rate
    }

    /// Level the item with this key was filed under at its last put.
    pub fn level_of(&self, key: &str) -> Option<usize> {
        self.slots.get(key).map(|slot| slot.level)
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.slots.values().map(|slot| &slot.item)
    }

    pub fn average_priority(&self) -> f32 {
        if self.slots.is_empty() {
            return 0.0;
        }
        self.iter().map(Item::priority).sum::<f32>() / self.slots.len() as f32
    }

    pub fn clear(&mut self) {
        self.slots.clear();
        self.levels.iter_mut().for_each(VecDeque::clear);
    }
}
