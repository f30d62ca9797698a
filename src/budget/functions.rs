//! Pricing of cognitive events.
//!
//! Each function either derives the budget of a new task from the budgets of
//! the premises that produced it, or adjusts budgets in place after an item
//! has been used. Functions that look at "the current premises" read and
//! write them through the cycle [`Focus`].

use super::truth::TruthValue;
use super::{and, ave_ari, or, w2c, BudgetValue};
use crate::error::{ReasonerError, Result};
use crate::memory::entry::{Item, Sentence, SharedTask, Task, Term};
use crate::memory::Focus;

/// Quality of a judgment judged by its truth alone.
///
/// Confident judgments score high in either polarity; the floor is near 0.5.
pub fn truth_to_quality(truth: &TruthValue) -> f32 {
    let exp = truth.expectation();
    exp.max((1.0 - exp) * 0.75)
}

/// Rank of a belief inside a concept's table: confidence or originality.
pub fn rank_belief(judgment: &Sentence) -> f32 {
    let confidence = judgment.truth().map_or(0.0, TruthValue::confidence);
    let originality = 1.0 / (judgment.stamp().base().len() as f32 + 1.0);
    or(confidence, originality)
}

/// How well `solution` answers `problem`.
pub fn solution_quality(problem: &Sentence, solution: &Sentence) -> f32 {
    let Some(truth) = solution.truth() else {
        return 0.0;
    };
    if problem.content().has_query_var() {
        truth.expectation() / solution.content().complexity() as f32
    } else {
        truth.confidence()
    }
}

fn focus_task(focus: &Focus) -> Result<SharedTask> {
    focus
        .task
        .clone()
        .ok_or(ReasonerError::MissingPremise("no task in focus"))
}

/// Rewards a belief that solves a problem and de-prioritizes the problem.
///
/// With `task == None` the focus task is evaluated and the current links get
/// feedback. Returns the budget for re-activating the solution when the task
/// is not a judgment.
pub fn solution_eval(
    problem: &Sentence,
    solution: &Sentence,
    task: Option<&SharedTask>,
    focus: &mut Focus,
) -> Result<Option<BudgetValue>> {
    let (task, feedback_to_links) = match task {
        Some(task) => (task.clone(), false),
        None => (focus_task(focus)?, true),
    };
    let quality = solution_quality(problem, solution);

    let budget = {
        let mut task = task.write();
        if task.sentence().is_judgment() {
            task.budget_mut().inc_priority(quality);
            None
        } else {
            let task_priority = task.priority();
            let durability = task.budget().durability();
            let solution_quality = solution.truth().map_or(0.0, truth_to_quality);
            task.budget_mut().set_priority((1.0 - quality).min(task_priority));
            Some(BudgetValue::new(or(task_priority, quality), durability, solution_quality))
        }
    };

    if feedback_to_links {
        if let Some(link) = focus.task_link.as_mut() {
            let priority = link.priority();
            link.budget_mut().set_priority((1.0 - quality).min(priority));
        }
        if let Some(link) = focus.belief_link.as_mut() {
            link.budget_mut().inc_priority(quality);
        }
    }
    Ok(budget)
}

/// Prices a revision and de-prioritizes the premises in proportion to the surprise.
pub fn revise(
    t_truth: &TruthValue,
    b_truth: &TruthValue,
    truth: &TruthValue,
    feedback_to_links: bool,
    focus: &mut Focus,
) -> Result<BudgetValue> {
    let task = focus_task(focus)?;
    let dif_t = truth.exp_dif_abs(t_truth);
    let (task_priority, task_durability) = {
        let mut task = task.write();
        let budget = task.budget_mut();
        budget.dec_priority(1.0 - dif_t);
        budget.dec_durability(1.0 - dif_t);
        (budget.priority(), budget.durability())
    };

    if feedback_to_links {
        if let Some(link) = focus.task_link.as_mut() {
            link.budget_mut().dec_priority(1.0 - dif_t);
            link.budget_mut().dec_durability(1.0 - dif_t);
        }
        if let Some(link) = focus.belief_link.as_mut() {
            let dif_b = truth.exp_dif_abs(b_truth);
            link.budget_mut().dec_priority(1.0 - dif_b);
            link.budget_mut().dec_durability(1.0 - dif_b);
        }
    }

    let gain = truth.confidence() - t_truth.confidence().max(b_truth.confidence());
    Ok(BudgetValue::new(
        or(gain, task_priority),
        ave_ari(gain, task_durability),
        truth_to_quality(truth),
    ))
}

/// Budget for a task that re-confirms an existing belief.
pub fn update(task: &Task, b_truth: &TruthValue) -> BudgetValue {
    let dif = task.sentence().truth().map_or(0.0, |t| t.exp_dif_abs(b_truth));
    BudgetValue::new(
        or(dif, task.priority()),
        ave_ari(dif, task.budget().durability()),
        truth_to_quality(b_truth),
    )
}

/// Share of a budget given to each of `n` sibling links.
pub fn distribute_among_links(budget: &BudgetValue, n: usize) -> BudgetValue {
    if n <= 1 {
        return *budget;
    }
    BudgetValue::new(
        budget.priority() / (n as f32).sqrt(),
        budget.durability(),
        budget.quality(),
    )
}

/// Activates a concept's budget with an incoming one. Quality is left alone.
pub fn activate(concept: &mut BudgetValue, budget: &BudgetValue) {
    let priority = or(concept.priority(), budget.priority());
    let durability = ave_ari(concept.durability(), budget.durability());
    concept.set_priority(priority);
    concept.set_durability(durability);
}

/// Lowers priority after an item has been used.
///
/// After `forget_rate` accesses a priority of 1 decays to roughly the
/// durability. Priority never goes below `quality * relative_threshold`.
pub fn forget(budget: &mut BudgetValue, forget_rate: f32, relative_threshold: f32) {
    let mut quality = f64::from(budget.quality()) * f64::from(relative_threshold);
    let p = f64::from(budget.priority()) - quality;
    if p > 0.0 {
        quality += p * f64::from(budget.durability()).powf(1.0 / (f64::from(forget_rate) * p));
    }
    budget.set_priority(quality as f32);
}

/// Merges two budgets of the same item, keeping the larger of each component.
pub fn merge(base: &mut BudgetValue, adjust: &BudgetValue) {
    base.set_priority(base.priority().max(adjust.priority()));
    base.set_durability(base.durability().max(adjust.durability()));
    base.set_quality(base.quality().max(adjust.quality()));
}

/* ----- derivations with atomic conclusions ----- */

pub fn forward(truth: &TruthValue, focus: &mut Focus) -> Result<BudgetValue> {
    budget_inference(truth_to_quality(truth), 1, focus)
}

pub fn backward(truth: &TruthValue, focus: &mut Focus) -> Result<BudgetValue> {
    budget_inference(truth_to_quality(truth), 1, focus)
}

pub fn backward_weak(truth: &TruthValue, focus: &mut Focus) -> Result<BudgetValue> {
    budget_inference(w2c(1.0) * truth_to_quality(truth), 1, focus)
}

/* ----- derivations with compound conclusions ----- */

pub fn compound_forward(truth: &TruthValue, content: Option<&Term>, focus: &mut Focus) -> Result<BudgetValue> {
    let complexity = content.map_or(1, Term::complexity);
    budget_inference(truth_to_quality(truth), complexity, focus)
}

pub fn compound_backward(content: &Term, focus: &mut Focus) -> Result<BudgetValue> {
    budget_inference(1.0, content.complexity(), focus)
}

pub fn compound_backward_weak(content: &Term, focus: &mut Focus) -> Result<BudgetValue> {
    budget_inference(w2c(1.0), content.complexity(), focus)
}

/// Common pricing of every inference step.
///
/// Larger conclusions get less durability and quality. A belief-link that
/// took part is reinforced.
pub fn budget_inference(quality: f32, complexity: usize, focus: &mut Focus) -> Result<BudgetValue> {
    let complexity = complexity.max(1) as f32;
    let (mut priority, mut durability) = match (&focus.task_link, &focus.task) {
        (Some(link), _) => (link.priority(), link.budget().durability()),
        (None, Some(task)) => {
            let task = task.read();
            (task.priority(), task.budget().durability())
        }
        (None, None) => return Err(ReasonerError::MissingPremise("neither task-link nor task in focus")),
    };
    durability /= complexity;
    let quality = quality / complexity;

    if let Some(link) = focus.belief_link.as_mut() {
        priority = or(priority, link.priority());
        durability = and(durability, link.budget().durability());
        link.budget_mut().inc_priority(or(quality, focus.target_activation));
        link.budget_mut().inc_durability(quality);
    }
    Ok(BudgetValue::new(priority, durability, quality))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::entry::{Stamp, Term};
    use crate::memory::link::{TaskLink, TaskLinkKind, TermLink, TermLinkKind};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    const EPS: f32 = 1e-5;

    fn judgment_task(truth: TruthValue, budget: BudgetValue) -> SharedTask {
        Task::new(Sentence::judgment(Term::atom("a"), truth, Stamp::new(1, 0)), budget).into_shared()
    }

    fn question_task(budget: BudgetValue) -> SharedTask {
        Task::new(Sentence::question(Term::atom("a"), Stamp::new(2, 0)), budget).into_shared()
    }

    #[test]
    fn test_truth_to_quality() {
        assert!((truth_to_quality(&TruthValue::new(1.0, 0.8)) - 0.9).abs() < EPS);
        assert!((truth_to_quality(&TruthValue::new(0.5, 0.9)) - 0.5).abs() < EPS);
        // strong negative evidence is still worth keeping
        let negative = truth_to_quality(&TruthValue::new(0.0, 0.9));
        assert!((negative - 0.7125).abs() < EPS);
    }

    #[test]
    fn test_forget_stays_between_floor_and_priority() {
        let mut rng = StdRng::seed_from_u64(5);
        for _ in 0..2000 {
            let quality: f32 = rng.random();
            let threshold: f32 = rng.random();
            let floor = quality * threshold;
            let priority = floor + rng.random::<f32>() * (1.0 - floor);
            let durability: f32 = rng.random();
            let rate = rng.random_range(0.1f32..100.0);

            let mut budget = BudgetValue::new(priority, durability, quality);
            forget(&mut budget, rate, threshold);
            assert!(budget.priority() >= floor - EPS, "{} < {floor}", budget.priority());
            assert!(budget.priority() <= priority + EPS, "{} > {priority}", budget.priority());
        }
    }

    #[test]
    fn test_forget_below_floor_resets_to_floor() {
        let mut budget = BudgetValue::new(0.01, 0.9, 1.0);
        forget(&mut budget, 10.0, 0.1);
        assert!((budget.priority() - 0.1).abs() < EPS);
    }

    #[test]
    fn test_durable_items_decay_slower() {
        let mut durable = BudgetValue::new(0.8, 0.9, 0.1);
        let mut fleeting = BudgetValue::new(0.8, 0.3, 0.1);
        forget(&mut durable, 10.0, 0.1);
        forget(&mut fleeting, 10.0, 0.1);
        assert!(durable.priority() > fleeting.priority());
    }

    #[test]
    fn test_merge_is_componentwise_max() {
        let mut rng = StdRng::seed_from_u64(9);
        for _ in 0..500 {
            let a = BudgetValue::new(rng.random(), rng.random(), rng.random());
            let b = BudgetValue::new(rng.random(), rng.random(), rng.random());
            let mut merged = a;
            merge(&mut merged, &b);
            assert_eq!(merged.priority(), a.priority().max(b.priority()));
            assert_eq!(merged.durability(), a.durability().max(b.durability()));
            assert_eq!(merged.quality(), a.quality().max(b.quality()));
        }
    }

    #[test]
    fn test_distribute_among_links() {
        let budget = BudgetValue::new(0.9, 0.6, 0.3);
        assert_eq!(distribute_among_links(&budget, 1), budget);
        for n in 2..10 {
            let share = distribute_among_links(&budget, n);
            assert_eq!(share.priority(), budget.priority() / (n as f32).sqrt());
            assert_eq!(share.durability(), budget.durability());
            assert_eq!(share.quality(), budget.quality());
        }
    }

    #[test]
    fn test_activate_keeps_quality() {
        let mut concept = BudgetValue::new(0.5, 0.4, 0.3);
        activate(&mut concept, &BudgetValue::new(0.5, 0.8, 0.9));
        assert!((concept.priority() - 0.75).abs() < EPS);
        assert!((concept.durability() - 0.6).abs() < EPS);
        assert_eq!(concept.quality(), 0.3);
    }

    #[test]
    fn test_revise_decays_task_and_links() {
        let task = judgment_task(TruthValue::new(1.0, 0.5), BudgetValue::new(0.8, 0.6, 0.5));
        let t_truth = TruthValue::new(1.0, 0.5); // expectation 0.75
        let b_truth = TruthValue::new(0.5, 0.4); // expectation 0.5
        let truth = TruthValue::new(0.75, 0.6); // expectation 0.65

        let mut focus = Focus {
            task: Some(task.clone()),
            task_link: Some(TaskLink::new(task.clone(), TaskLinkKind::SelfLink, BudgetValue::new(0.5, 0.5, 0.5), 4)),
            belief_link: Some(TermLink::new(Term::atom("b"), TermLinkKind::Component, BudgetValue::new(0.4, 0.4, 0.5))),
            ..Focus::default()
        };
        let budget = revise(&t_truth, &b_truth, &truth, true, &mut focus).unwrap();

        let decayed = *task.read().budget();
        assert!((decayed.priority() - 0.8 * 0.9).abs() < EPS);
        assert!((decayed.durability() - 0.6 * 0.9).abs() < EPS);

        let task_link = focus.task_link.as_ref().unwrap().budget();
        assert!((task_link.priority() - 0.5 * 0.9).abs() < EPS);
        assert!((task_link.durability() - 0.5 * 0.9).abs() < EPS);
        let belief_link = focus.belief_link.as_ref().unwrap().budget();
        assert!((belief_link.priority() - 0.4 * 0.85).abs() < EPS);
        assert!((belief_link.durability() - 0.4 * 0.85).abs() < EPS);

        let gain = 0.6 - 0.5;
        assert!((budget.priority() - or(gain, 0.72)).abs() < EPS);
        assert!((budget.durability() - ave_ari(gain, 0.54)).abs() < EPS);
        assert!((budget.quality() - truth_to_quality(&truth)).abs() < EPS);
    }

    #[test]
    fn test_revise_without_feedback_leaves_links() {
        let task = judgment_task(TruthValue::new(1.0, 0.5), BudgetValue::new(0.8, 0.6, 0.5));
        let mut focus = Focus {
            task: Some(task.clone()),
            belief_link: Some(TermLink::new(Term::atom("b"), TermLinkKind::Component, BudgetValue::new(0.4, 0.4, 0.5))),
            ..Focus::default()
        };
        revise(&TruthValue::new(1.0, 0.5), &TruthValue::new(0.5, 0.4), &TruthValue::new(0.75, 0.6), false, &mut focus)
            .unwrap();
        assert_eq!(focus.belief_link.unwrap().priority(), 0.4);
    }

    #[test]
    fn test_update_prices_reconfirmation() {
        let task = Task::new(
            Sentence::judgment(Term::atom("a"), TruthValue::new(1.0, 0.8), Stamp::new(1, 0)),
            BudgetValue::new(0.5, 0.5, 0.5),
        );
        let belief = TruthValue::new(1.0, 0.8);
        let budget = update(&task, &belief);
        assert!((budget.priority() - 0.5).abs() < EPS);
        assert!((budget.durability() - 0.25).abs() < EPS);
        assert!((budget.quality() - 0.9).abs() < EPS);
    }

    #[test]
    fn test_solution_eval_for_question() {
        let task = question_task(BudgetValue::new(0.9, 0.8, 1.0));
        let problem = task.read().sentence().clone();
        let solution = Sentence::judgment(Term::atom("a"), TruthValue::new(1.0, 0.8), Stamp::new(1, 0));
        let mut focus = Focus::default();

        let budget = solution_eval(&problem, &solution, Some(&task), &mut focus).unwrap().unwrap();
        assert!((budget.priority() - or(0.9, 0.8)).abs() < EPS);
        assert!((budget.durability() - 0.8).abs() < EPS);
        assert!((budget.quality() - 0.9).abs() < EPS);
        assert!((task.read().priority() - 0.2).abs() < EPS);
    }

    #[test]
    fn test_solution_eval_feeds_back_to_links() {
        let task = question_task(BudgetValue::new(0.9, 0.8, 1.0));
        let problem = task.read().sentence().clone();
        let solution = Sentence::judgment(Term::atom("a"), TruthValue::new(1.0, 0.5), Stamp::new(1, 0));
        let mut focus = Focus {
            task: Some(task.clone()),
            task_link: Some(TaskLink::new(task.clone(), TaskLinkKind::SelfLink, BudgetValue::new(0.9, 0.5, 0.5), 4)),
            belief_link: Some(TermLink::new(Term::atom("b"), TermLinkKind::Component, BudgetValue::new(0.2, 0.4, 0.5))),
            ..Focus::default()
        };
        solution_eval(&problem, &solution, None, &mut focus).unwrap();
        assert!((focus.task_link.as_ref().unwrap().priority() - 0.5).abs() < EPS);
        assert!((focus.belief_link.as_ref().unwrap().priority() - or(0.2, 0.5)).abs() < EPS);
    }

    #[test]
    fn test_solution_eval_boosts_judgment_task() {
        let task = judgment_task(TruthValue::new(1.0, 0.9), BudgetValue::new(0.5, 0.5, 0.5));
        let problem = Sentence::question(Term::atom("a"), Stamp::new(3, 0));
        let solution = Sentence::judgment(Term::atom("a"), TruthValue::new(1.0, 0.5), Stamp::new(1, 0));
        let result = solution_eval(&problem, &solution, Some(&task), &mut Focus::default()).unwrap();
        assert!(result.is_none());
        assert!((task.read().priority() - 0.75).abs() < EPS);
    }

    #[test]
    fn test_budget_inference_requires_a_premise() {
        let err = forward(&TruthValue::new(1.0, 0.9), &mut Focus::default()).unwrap_err();
        assert!(matches!(err, ReasonerError::MissingPremise(_)));
    }

    #[test]
    fn test_budget_inference_penalizes_complexity_and_rewards_belief_link() {
        let task = judgment_task(TruthValue::new(1.0, 0.9), BudgetValue::new(0.6, 0.9, 0.5));
        let mut focus = Focus {
            task: Some(task.clone()),
            task_link: Some(TaskLink::new(task, TaskLinkKind::SelfLink, BudgetValue::new(0.4, 0.6, 0.5), 4)),
            belief_link: Some(TermLink::new(Term::atom("b"), TermLinkKind::Component, BudgetValue::new(0.3, 0.5, 0.5))),
            target_activation: 0.2,
            ..Focus::default()
        };
        let content = Term::compound("-->", vec![Term::atom("a"), Term::atom("b")]);
        let budget = compound_backward(&content, &mut focus).unwrap();

        assert!((budget.priority() - or(0.4, 0.3)).abs() < EPS);
        assert!((budget.durability() - 0.2 * 0.5).abs() < EPS);
        assert!((budget.quality() - 1.0 / 3.0).abs() < EPS);

        let link = focus.belief_link.as_ref().unwrap().budget();
        assert!((link.priority() - or(0.3, or(1.0 / 3.0, 0.2))).abs() < EPS);
        assert!((link.durability() - or(0.5, 1.0 / 3.0)).abs() < EPS);
    }

    #[test]
    fn test_weak_variants_are_discounted() {
        let task = judgment_task(TruthValue::new(1.0, 0.9), BudgetValue::new(0.6, 0.9, 0.5));
        let mut focus = Focus {
            task: Some(task),
            ..Focus::default()
        };
        let truth = TruthValue::new(1.0, 0.8);
        let strong = backward(&truth, &mut focus).unwrap();
        let weak = backward_weak(&truth, &mut focus).unwrap();
        assert!((weak.quality() - strong.quality() * 0.5).abs() < EPS);
        assert_eq!(weak.priority(), 0.6);

        let content = Term::compound("&&", vec![Term::atom("x"), Term::atom("y")]);
        let compound = compound_forward(&truth, Some(&content), &mut focus).unwrap();
        assert!((compound.quality() - 0.3).abs() < EPS);
        assert!((compound_forward(&truth, None, &mut focus).unwrap().quality() - 0.9).abs() < EPS);
        assert!((compound_backward_weak(&content, &mut focus).unwrap().quality() - 0.5 / 3.0).abs() < EPS);
    }

    #[test]
    fn test_rank_prefers_original_confident_beliefs() {
        let short = Sentence::judgment(Term::atom("a"), TruthValue::new(1.0, 0.6), Stamp::new(1, 0));
        let long = Sentence::judgment(
            Term::atom("a"),
            TruthValue::new(1.0, 0.6),
            Stamp::merge(&Stamp::new(2, 0), &Stamp::new(3, 0), 1, 8),
        );
        assert!(rank_belief(&short) > rank_belief(&long));
        assert!((rank_belief(&short) - or(0.6, 0.5)).abs() < EPS);
    }

    #[test]
    fn test_solution_quality_with_query_var() {
        let problem = Sentence::question(Term::compound("-->", vec![Term::atom("?x"), Term::atom("bird")]), Stamp::new(1, 0));
        let content = Term::compound("-->", vec![Term::atom("robin"), Term::atom("bird")]);
        let solution = Sentence::judgment(content, TruthValue::new(1.0, 0.8), Stamp::new(2, 0));
        assert!((solution_quality(&problem, &solution) - 0.3).abs() < EPS);
    }
}
