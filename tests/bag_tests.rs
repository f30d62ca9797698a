use nars_core::storage::bag::{Bag, HighestLevelSelector, LevelWeighting, WeightedRandomSelector};
use nars_core::{BagConfig, BudgetValue, Item};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashSet;

#[derive(Debug)]
struct Token {
    key: String,
    budget: BudgetValue,
}

impl Token {
    fn new(key: &str, priority: f32) -> Self {
        Self {
            key: key.to_string(),
            budget: BudgetValue::new(priority, 0.5, 0.5),
        }
    }
}

impl Item for Token {
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

fn seeded_bag(capacity: usize, levels: usize, seed: u64) -> Bag<Token> {
    let selector = WeightedRandomSelector::seeded(seed, LevelWeighting::Linear);
    Bag::new(&BagConfig::new(capacity, levels, 10.0), Box::new(selector)).unwrap()
}

#[test]
fn test_capacity_never_exceeded() {
    let mut rng = StdRng::seed_from_u64(42);
    let mut bag = seeded_bag(25, 10, 42);

    for i in 0..2000 {
        match rng.random_range(0..3) {
            0 | 1 => {
                let key = format!("k{}", rng.random_range(0..60));
                if let Some(evicted) = bag.put(Token::new(&key, rng.random())) {
                    assert!(!bag.contains(evicted.key()), "evicted {} still indexed", evicted.key());
                }
            }
            _ => {
                if let Some(token) = bag.take() {
                    assert!(!bag.contains(token.key()), "taken item {} still indexed", token.key());
                    if i % 2 == 0 {
                        bag.put_back(token);
                    }
                }
            }
        }
        assert!(bag.len() <= bag.capacity());
    }
}

#[test]
fn test_overflow_evicts_from_lowest_level() {
    let mut rng = StdRng::seed_from_u64(7);
    let mut bag = seeded_bag(10, 10, 7);
    for i in 0..10 {
        bag.put(Token::new(&format!("k{i}"), rng.random_range(0.2..1.0)));
    }
    let lowest = bag
        .iter()
        .map(|token| bag.level_of(token.key()).unwrap())
        .min()
        .unwrap();

    let evicted = bag.put(Token::new("newcomer", 0.95)).expect("one item evicted");
    assert_eq!(bag.len(), 10);
    assert_eq!((evicted.priority() * 10.0).floor() as usize, lowest);
    assert!(bag.contains("newcomer"));
}

#[test]
fn test_duplicate_put_keeps_one_entry() {
    let mut bag = seeded_bag(5, 10, 1);
    bag.put(Token::new("a", 0.3));
    assert!(bag.put(Token::new("a", 0.8)).is_none());
    assert!(bag.put(Token::new("a", 0.1)).is_none());

    assert_eq!(bag.len(), 1);
    assert_eq!(bag.get("a").unwrap().priority(), 0.8);
    assert_eq!(bag.level_of("a"), Some(8));
}

#[test]
fn test_take_drains_every_item_once() {
    let mut bag = Bag::new(&BagConfig::new(50, 5, 10.0), Box::new(HighestLevelSelector)).unwrap();
    let mut rng = StdRng::seed_from_u64(11);
    for i in 0..50 {
        bag.put(Token::new(&format!("k{i}"), rng.random()));
    }

    let mut seen = HashSet::new();
    let mut last_level = usize::MAX;
    while let Some(token) = bag.take() {
        let level = ((token.priority() * 5.0).floor() as usize).min(4);
        assert!(level <= last_level, "highest level drained first");
        last_level = level;
        assert!(seen.insert(token.key.clone()));
    }
    assert_eq!(seen.len(), 50);
    assert!(bag.is_empty());
}

#[test]
fn test_hot_reloaded_forget_rate_applies_to_put_back() {
    let mut bag = seeded_bag(5, 10, 3);
    bag.put(Token::new("a", 0.9));
    let fast = {
        bag.forget_rate().set(1.0).unwrap();
        let token = bag.take().unwrap();
        bag.put_back(token);
        bag.get("a").unwrap().priority()
    };

    let mut slow_bag = seeded_bag(5, 10, 3);
    slow_bag.put(Token::new("a", 0.9));
    slow_bag.forget_rate().set(100.0).unwrap();
    let token = slow_bag.take().unwrap();
    slow_bag.put_back(token);
    let slow = slow_bag.get("a").unwrap().priority();

    assert!(fast < slow, "fast {fast} should decay below slow {slow}");
    assert!(bag.forget_rate().set(0.0).is_err());
}
