use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use nars_core::memory::{Item, Memory, Term};
use nars_core::io::{Input, OutputEvent};
use nars_core::storage::bag::{Bag, HighestLevelSelector, WeightedRandomSelector, LevelWeighting};
use nars_core::{BagConfig, BudgetValue, ReasonerConfig, TruthValue};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

struct Token {
    key: String,
    budget: BudgetValue,
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

fn filled_bag(size: usize, rng: &mut StdRng) -> Bag<Token> {
    let config = BagConfig::new(size, 100, 10.0);
    let selector = Box::new(WeightedRandomSelector::seeded(rng.random(), LevelWeighting::Linear));
    let mut bag = Bag::new(&config, selector).unwrap();
    for i in 0..size {
        bag.put(Token {
            key: format!("t{i}"),
            budget: BudgetValue::new(rng.random(), rng.random(), rng.random()),
        });
    }
    bag
}

fn benchmark_bag_put(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(1);
    let config = BagConfig::new(1000, 100, 10.0);
    let mut bag = Bag::new(&config, Box::new(HighestLevelSelector)).unwrap();
    let mut i = 0u64;

    c.bench_function("bag put with eviction", |b| {
        b.iter(|| {
            bag.put(Token {
                key: format!("t{i}"),
                budget: BudgetValue::new(rng.random(), 0.5, 0.5),
            });
            i += 1;
        });
    });
}

fn benchmark_bag_take_put_back(c: &mut Criterion) {
    let mut group = c.benchmark_group("bag_take_put_back");

    for size in [10, 100, 1000].iter() {
        group.throughput(Throughput::Elements(1));
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            let mut rng = StdRng::seed_from_u64(size as u64);
            let mut bag = filled_bag(size, &mut rng);
            b.iter(|| {
                if let Some(token) = bag.take() {
                    bag.put_back(token);
                }
            });
        });
    }
    group.finish();
}

fn benchmark_cycle(c: &mut Criterion) {
    let mut memory = Memory::new(ReasonerConfig::seeded(7)).unwrap();
    for i in 0..50 {
        let content = Term::compound("-->", vec![Term::atom(format!("s{i}")), Term::atom(format!("p{}", i % 7))]);
        let task = memory.perceive(Input::judgment(content, TruthValue::new(1.0, 0.9)));
        memory.admit(task);
    }
    let mut events: Vec<OutputEvent> = Vec::new();
    for _ in 0..50 {
        memory.cycle(&nars_core::rules::NoRules, &mut events).unwrap();
    }

    c.bench_function("memory cycle", |b| {
        b.iter(|| {
            events.clear();
            memory.cycle(&nars_core::rules::NoRules, &mut events).unwrap();
        });
    });
}

criterion_group!(benches, benchmark_bag_put, benchmark_bag_take_put_back, benchmark_cycle);
criterion_main!(benches);
