use super::concept::{Concept, ConceptLimits};
use super::entry::{Item, Sentence, SentenceKind, SharedTask, Stamp, Task, Term};
use super::link::{TaskLink, TaskLinkKind, TermLink, TermLinkKind};
use super::novel::{Admission, NoveltyBuffer};
use crate::budget::functions::{self, solution_quality, truth_to_quality};
use crate::budget::truth::TruthValue;
use crate::budget::BudgetValue;
use crate::config::ReasonerConfig;
use crate::error::Result;
use crate::io::{Input, OutputEvent, OutputSink};
use crate::rules::{Derivation, InferenceRules, PremisePair, Pricing};
use crate::sense::LogicSense;
use crate::storage::bag::{Bag, ForgetRate, LevelSelector, WeightedRandomSelector};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fmt;
use std::sync::Arc;

/// Truth assumed for input judgments and goals that arrive without one.
const DEFAULT_TRUTH: (f32, f32) = (1.0, 0.9);

/// The premises of the step being executed.
///
/// Budget functions read these to price conclusions and write them to give
/// feedback to the links that produced a result.
#[derive(Debug, Default)]
pub struct Focus {
    pub task: Option<SharedTask>,
    pub task_link: Option<TaskLink>,
    pub belief_link: Option<TermLink>,
    pub belief: Option<Sentence>,
    /// Priority of the concept the belief-link points at.
    pub target_activation: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// A task from the admission buffer was processed directly.
    Processed,
    /// A concept fired; `derived` tasks were queued.
    Fired { derived: usize },
    /// The rule library failed; nothing was derived.
    Faulted,
    /// Nothing to do.
    Idle,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MemoryStats {
    pub concept_count: usize,
    pub concept_priority_mean: f32,
    pub concept_beliefs_mean: f32,
    pub concept_questions_mean: f32,
    pub novel_tasks: usize,
}

/// Long-term memory of one reasoner and the cycle that works on it.
pub struct Memory {
    config: ReasonerConfig,
    concepts: Bag<Concept>,
    novel_tasks: NoveltyBuffer,
    focus: Focus,
    task_link_rate: ForgetRate,
    term_link_rate: ForgetRate,
    rng: StdRng,
    time: u64,
    next_serial: u64,
    sense: Option<Arc<LogicSense>>,
}

impl Memory {
    pub fn new(config: ReasonerConfig) -> Result<Self> {
        config.validate()?;
        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let selector = Box::new(WeightedRandomSelector::seeded(rng.random(), config.level_weighting));
        let concepts = Bag::new(&config.concept_bag, selector)?;
        let task_link_rate = ForgetRate::new(config.task_link_bag.forget_rate)?;
        let term_link_rate = ForgetRate::new(config.term_link_bag.forget_rate)?;
        Ok(Self {
            novel_tasks: NoveltyBuffer::new(config.novel_task_capacity),
            config,
            concepts,
            focus: Focus::default(),
            task_link_rate,
            term_link_rate,
            rng,
            time: 0,
            next_serial: 0,
            sense: None,
        })
    }

    /// Attaches telemetry. Reasoning is identical with or without it.
    pub fn with_sense(mut self, sense: Arc<LogicSense>) -> Self {
        self.sense = Some(sense);
        self
    }

    pub fn config(&self) -> &ReasonerConfig { &self.config }
    pub fn time(&self) -> u64 { self.time }
    pub fn concepts(&self) -> &Bag<Concept> { &self.concepts }
    pub fn sense(&self) -> Option<&Arc<LogicSense>> { self.sense.as_ref() }

    pub fn concept(&self, term: &Term) -> Option<&Concept> {
        self.concepts.get(term.name())
    }

    /// Current priority of the concept of `term`, 0 if it has none.
    pub fn concept_activation(&self, term: &Term) -> f32 {
        self.concept(term).map_or(0.0, Item::priority)
    }

    pub fn novel_task_count(&self) -> usize {
        self.novel_tasks.len()
    }

    pub fn concept_forget_rate(&self) -> &ForgetRate {
        self.concepts.forget_rate()
    }

    pub fn task_link_forget_rate(&self) -> &ForgetRate {
        &self.task_link_rate
    }

    pub fn term_link_forget_rate(&self) -> &ForgetRate {
        &self.term_link_rate
    }

    /// Stamps an input sentence with fresh evidence and gives it its default budget.
    pub fn perceive(&mut self, input: Input) -> Task {
        let serial = self.next_serial;
        self.next_serial += 1;
        let stamp = Stamp::new(serial, self.time);

        let truth = match input.kind {
            SentenceKind::Question => None,
            _ => Some(input.truth.unwrap_or(TruthValue::new(DEFAULT_TRUTH.0, DEFAULT_TRUTH.1))),
        };
        let budget = input.budget.unwrap_or_else(|| {
            let defaults = match input.kind {
                SentenceKind::Judgment => self.config.judgment_budget,
                SentenceKind::Question => self.config.question_budget,
                SentenceKind::Goal => self.config.goal_budget,
            };
            let quality = truth.as_ref().map_or(1.0, truth_to_quality);
            BudgetValue::new(defaults.priority, defaults.durability, quality)
        });
        Task::new(Sentence::new(input.content, input.kind, truth, stamp), budget)
    }

    /// Queues an external task for direct processing, preserving arrival order.
    pub fn admit(&mut self, task: Task) -> Admission {
        if let Some(sense) = &self.sense {
            sense.task_add_new.hit(f64::from(task.priority()));
        }
        let admission = self.novel_tasks.push(task);
        if let Admission::Displaced(key) = &admission {
            tracing::debug!(key = %key, "admission buffer full, task dropped");
        }
        admission
    }

    /// Runs one reasoning step.
    ///
    /// Work per step is bounded by the bag sizes, the term-link matching
    /// limit and the number of conclusions the rule library returns.
    pub fn cycle(&mut self, rules: &dyn InferenceRules, sink: &mut dyn OutputSink) -> Result<CycleOutcome> {
        self.time += 1;
        self.focus = Focus::default();
        let outcome = match self.novel_tasks.pop() {
            Some(task) => self.immediate_process(task, sink).map(|_| CycleOutcome::Processed),
            None => self.fire_concept(rules, sink),
        };
        self.focus = Focus::default();
        outcome
    }

    /* ---------- direct processing ---------- */

    fn immediate_process(&mut self, task: Task, sink: &mut dyn OutputSink) -> Result<()> {
        if let Some(sense) = &self.sense {
            sense.task_immediate_process.hit(f64::from(task.priority()));
        }
        sink.emit(&OutputEvent::Processed(task.clone()));
        tracing::trace!(task = %task, "immediate process");

        let content = task.content().clone();
        let kind = task.sentence().kind();
        let budget = *task.budget();
        let shared = task.into_shared();
        self.focus.task = Some(shared.clone());

        let mut concept = self.take_or_create_concept(&content)?;
        functions::activate(concept.budget_mut(), &budget);

        let processed = match kind {
            SentenceKind::Judgment => self.process_judgment(&mut concept, &shared, sink),
            SentenceKind::Question => self.process_question(&mut concept, &shared, sink),
            SentenceKind::Goal => {
                if let Some(sense) = &self.sense {
                    sense.goal_process.hit(0.0);
                }
                concept.add_goal(shared.read().sentence().clone());
                Ok(())
            }
        };
        let linked = match processed {
            Ok(()) => self.link_to_task(&mut concept, &shared),
            Err(e) => Err(e),
        };
        self.return_concept(concept);
        linked
    }

    fn process_judgment(&mut self, concept: &mut Concept, task: &SharedTask, sink: &mut dyn OutputSink) -> Result<()> {
        if let Some(sense) = &self.sense {
            sense.judgment_process.hit(0.0);
        }
        let judgment = task.read().sentence().clone();
        if concept.has_duplicate_belief(&judgment) {
            tracing::trace!(judgment = %judgment, "duplicate belief ignored");
            task.write().budget_mut().set_priority(0.0);
            return Ok(());
        }

        if let Some(belief) = concept.revisable_belief(&judgment).cloned() {
            if let (Some(t_truth), Some(b_truth)) = (judgment.truth(), belief.truth()) {
                let truth = t_truth.revision(b_truth);
                let budget = functions::revise(t_truth, b_truth, &truth, false, &mut self.focus)?;
                if budget.above_threshold(self.config.budget_threshold) {
                    let stamp = Stamp::merge(judgment.stamp(), belief.stamp(), self.time, self.config.max_stamp_length);
                    let revised = Task::new(Sentence::judgment(judgment.content().clone(), truth, stamp), budget);
                    if let Some(sense) = &self.sense {
                        sense.belief_revision.hit(f64::from(budget.priority()));
                    }
                    self.queue_derived(revised, sink);
                }
            }
        }

        let questions: Vec<SharedTask> = concept.questions().cloned().collect();
        for question in questions {
            self.try_solution(&judgment, &question, false, sink)?;
        }
        concept.add_belief(judgment);
        Ok(())
    }

    fn process_question(&mut self, concept: &mut Concept, task: &SharedTask, sink: &mut dyn OutputSink) -> Result<()> {
        if let Some(sense) = &self.sense {
            sense.question_process.hit(0.0);
        }
        let question = task.read().sentence().clone();
        if let Some(solution) = concept.best_solution(&question).cloned() {
            self.try_solution(&solution, task, false, sink)?;
        }
        concept.add_question(task.clone());
        Ok(())
    }

    /// Offers `belief` as an answer to `question`; reports it if it beats the
    /// best answer so far. Returns whether it did.
    ///
    /// With `feedback` the question must be the focus task, and the focus
    /// links are rewarded or penalized. An answer to a question is queued
    /// again as a task with the reduced budget `solution_eval` prices it at.
    fn try_solution(
        &mut self,
        belief: &Sentence,
        question: &SharedTask,
        feedback: bool,
        sink: &mut dyn OutputSink,
    ) -> Result<bool> {
        let problem = question.read().sentence().clone();
        if problem.content() != belief.content() {
            return Ok(false);
        }
        let quality = solution_quality(&problem, belief);
        if let Some(best) = question.read().best_solution() {
            if solution_quality(&problem, best) >= quality {
                return Ok(false);
            }
        }
        question.write().set_best_solution(belief.clone());

        let explicit = if feedback { None } else { Some(question) };
        let budget = functions::solution_eval(&problem, belief, explicit, &mut self.focus)?;
        if let Some(sense) = &self.sense {
            sense.answer.hit(f64::from(quality));
        }
        tracing::debug!(question = %problem, solution = %belief, "answer");
        sink.emit(&OutputEvent::Answer {
            question: problem,
            solution: belief.clone(),
        });

        if let Some(budget) = budget.filter(|b| b.above_threshold(self.config.budget_threshold)) {
            let answer = Sentence::new(
                belief.content().clone(),
                belief.kind(),
                belief.truth().copied(),
                belief.stamp().with_time(self.time),
            );
            self.queue_derived(Task::new(answer, budget), sink);
        }
        Ok(true)
    }

    /// Hangs task-links to the task on its concept and on the concepts of its
    /// components, and term-links between them.
    fn link_to_task(&mut self, concept: &mut Concept, task: &SharedTask) -> Result<()> {
        let budget = *task.read().budget();
        if !budget.above_threshold(self.config.budget_threshold) {
            return Ok(());
        }
        let record = self.config.term_link_record_length;
        let templates = concept.term_link_templates();
        let mut components: Vec<(Term, TermLinkKind)> = Vec::with_capacity(templates.len());
        for template in templates {
            if template.0 != *concept.term() && !components.contains(&template) {
                components.push(template);
            }
        }
        let link_budget = functions::distribute_among_links(&budget, 1 + components.len());
        if let Some(sense) = &self.sense {
            sense.task_link_to.hit(f64::from(link_budget.priority()));
        }

        concept
            .task_links_mut()
            .put(TaskLink::new(task.clone(), TaskLinkKind::SelfLink, link_budget, record));
        for (component, kind) in components {
            let mut child = self.take_or_create_concept(&component)?;
            functions::activate(child.budget_mut(), &link_budget);
            child
                .task_links_mut()
                .put(TaskLink::new(task.clone(), TaskLinkKind::Component, link_budget, record));
            child
                .term_links_mut()
                .put(TermLink::new(concept.term().clone(), TermLinkKind::Compound, link_budget));
            concept
                .term_links_mut()
                .put(TermLink::new(component, kind, link_budget));
            self.return_concept(child);
        }
        Ok(())
    }

    /* ---------- concept firing ---------- */

    fn fire_concept(&mut self, rules: &dyn InferenceRules, sink: &mut dyn OutputSink) -> Result<CycleOutcome> {
        let Some(mut concept) = self.concepts.take() else {
            return Ok(CycleOutcome::Idle);
        };
        let Some(task_link) = concept.task_links_mut().take() else {
            self.concepts.put_back(concept);
            return Ok(CycleOutcome::Idle);
        };
        if let Some(sense) = &self.sense {
            sense.tasklink_fire.hit(f64::from(task_link.priority()));
        }
        let task = task_link.task().clone();
        let task_sentence = task.read().sentence().clone();
        sink.emit(&OutputEvent::Fired {
            concept: concept.term().clone(),
            task: task_sentence.clone(),
        });

        self.focus.task = Some(task);
        self.focus.task_link = Some(task_link);
        if let Some(term_link) = self.select_term_link(&mut concept) {
            let target = self.concepts.get(term_link.target().name());
            self.focus.target_activation = target.map_or(0.0, Item::priority);
            self.focus.belief = target.and_then(|c| c.select_belief(&task_sentence)).cloned();
            self.focus.belief_link = Some(term_link);
        }

        let outcome = self.reason(rules, &task_sentence, sink);

        let focus = std::mem::take(&mut self.focus);
        if let Some(link) = focus.belief_link {
            concept.term_links_mut().put_back(link);
        }
        if let Some(link) = focus.task_link {
            concept.task_links_mut().put_back(link);
        }
        self.concepts.put_back(concept);
        outcome
    }

    /// Draws term-links until one forms a novel pair with the focus task-link.
    fn select_term_link(&mut self, concept: &mut Concept) -> Option<TermLink> {
        let now = self.time;
        let horizon = self.config.novelty_horizon;
        let attempts = self.config.max_matched_term_links;
        let task_link = self.focus.task_link.as_mut()?;
        for _ in 0..attempts {
            let term_link = concept.term_links_mut().take()?;
            if task_link.novel(&term_link, now, horizon) {
                return Some(term_link);
            }
            concept.term_links_mut().put_back(term_link);
        }
        None
    }

    fn reason(&mut self, rules: &dyn InferenceRules, task: &Sentence, sink: &mut dyn OutputSink) -> Result<CycleOutcome> {
        let belief = self.focus.belief.clone();
        let (target, relation) = match &self.focus.belief_link {
            Some(link) => (Some(link.target().clone()), Some(link.kind())),
            None => (None, None),
        };
        if let Some(sense) = &self.sense {
            let priority = self.focus.belief_link.as_ref().map_or(0.0, Item::priority);
            sense.reason.hit(f64::from(priority));
        }

        if task.is_question() {
            if let (Some(belief), Some(question)) = (&belief, self.focus.task.clone()) {
                self.try_solution(belief, &question, true, sink)?;
            }
        }

        let premises = PremisePair {
            task,
            belief: belief.as_ref(),
            target: target.as_ref(),
            relation,
        };
        let derivations = match rules.derive(&premises) {
            Ok(derivations) => derivations,
            Err(fault) => {
                tracing::warn!(error = %fault, task = %task, "rule library fault, cycle skipped");
                if let Some(sense) = &self.sense {
                    sense.rule_fault.hit(0.0);
                }
                return Ok(CycleOutcome::Faulted);
            }
        };

        let mut derived = 0;
        for derivation in derivations {
            if self.derive_task(derivation, task, belief.as_ref(), sink)? {
                derived += 1;
            }
        }
        Ok(CycleOutcome::Fired { derived })
    }

    /// Prices one conclusion and queues it. Returns whether it was kept.
    fn derive_task(
        &mut self,
        derivation: Derivation,
        parent: &Sentence,
        belief: Option<&Sentence>,
        sink: &mut dyn OutputSink,
    ) -> Result<bool> {
        if derivation.kind != SentenceKind::Question && derivation.truth.is_none() {
            tracing::debug!(content = %derivation.content, "conclusion without truth dropped");
            return Ok(false);
        }
        let belief_truth = belief.and_then(Sentence::truth).copied();
        let basis = match derivation.pricing {
            Pricing::Backward | Pricing::BackwardWeak => belief_truth.or(derivation.truth),
            _ => derivation.truth.or(belief_truth),
        }
        .or_else(|| parent.truth().copied());

        let budget = match (derivation.pricing, basis) {
            (Pricing::Forward, Some(truth)) => functions::forward(&truth, &mut self.focus)?,
            (Pricing::Backward, Some(truth)) => functions::backward(&truth, &mut self.focus)?,
            (Pricing::BackwardWeak, Some(truth)) => functions::backward_weak(&truth, &mut self.focus)?,
            (Pricing::CompoundForward, Some(truth)) => {
                functions::compound_forward(&truth, Some(&derivation.content), &mut self.focus)?
            }
            (Pricing::CompoundBackward, _) => functions::compound_backward(&derivation.content, &mut self.focus)?,
            (Pricing::CompoundBackwardWeak, _) => {
                functions::compound_backward_weak(&derivation.content, &mut self.focus)?
            }
            (pricing, None) => {
                tracing::debug!(?pricing, content = %derivation.content, "no truth to price conclusion");
                return Ok(false);
            }
        };
        if !budget.above_threshold(self.config.budget_threshold) {
            tracing::trace!(content = %derivation.content, budget = %budget, "conclusion below threshold");
            return Ok(false);
        }

        let stamp = match belief {
            Some(belief) => Stamp::merge(parent.stamp(), belief.stamp(), self.time, self.config.max_stamp_length),
            None => parent.stamp().with_time(self.time),
        };
        let sentence = Sentence::new(derivation.content, derivation.kind, derivation.truth, stamp);
        if let Some(sense) = &self.sense {
            sense.task_derived.hit(f64::from(budget.priority()));
        }
        self.queue_derived(Task::new(sentence, budget), sink);
        Ok(true)
    }

    fn queue_derived(&mut self, task: Task, sink: &mut dyn OutputSink) {
        sink.emit(&OutputEvent::Derived(task.clone()));
        if let Admission::Displaced(key) = self.novel_tasks.push(task) {
            tracing::trace!(key = %key, "admission buffer full, task dropped");
        }
    }

    /* ---------- concept bookkeeping ---------- */

    fn selector(&mut self) -> Box<dyn LevelSelector> {
        Box::new(WeightedRandomSelector::seeded(self.rng.random(), self.config.level_weighting))
    }

    /// Removes the concept of `term` from the bag, creating it if needed.
    fn take_or_create_concept(&mut self, term: &Term) -> Result<Concept> {
        if let Some(concept) = self.concepts.pick(term.name()) {
            return Ok(concept);
        }
        let task_selector = self.selector();
        let term_selector = self.selector();
        let task_links = Bag::with_forget_rate(&self.config.task_link_bag, self.task_link_rate.clone(), task_selector)?;
        let term_links = Bag::with_forget_rate(&self.config.term_link_bag, self.term_link_rate.clone(), term_selector)?;
        let limits = ConceptLimits {
            beliefs: self.config.belief_capacity,
            goals: self.config.goal_capacity,
            questions: self.config.question_capacity,
        };
        if let Some(sense) = &self.sense {
            sense.concept_new.hit(term.complexity() as f64);
        }
        tracing::trace!(term = %term, "new concept");
        Ok(Concept::new(term.clone(), BudgetValue::default(), task_links, term_links, limits))
    }

    fn return_concept(&mut self, concept: Concept) {
        if let Some(evicted) = self.concepts.put(concept) {
            tracing::trace!(term = %evicted.term(), "concept forgotten");
        }
    }

    pub fn stats(&self) -> MemoryStats {
        let concept_count = self.concepts.len();
        let per_concept = |total: usize| {
            if concept_count == 0 {
                0.0
            } else {
                total as f32 / concept_count as f32
            }
        };
        MemoryStats {
            concept_count,
            concept_priority_mean: self.concepts.average_priority(),
            concept_beliefs_mean: per_concept(self.concepts.iter().map(|c| c.beliefs().len()).sum()),
            concept_questions_mean: per_concept(self.concepts.iter().map(Concept::question_count).sum()),
            novel_tasks: self.novel_tasks.len(),
        }
    }

    /// Forgets everything; the configuration and forget rates are kept.
    pub fn reset(&mut self) {
        self.concepts.clear();
        self.novel_tasks.clear();
        self.focus = Focus::default();
        self.time = 0;
        self.next_serial = 0;
        tracing::info!("memory reset");
    }
}

impl fmt::Display for Memory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stats = self.stats();
        writeln!(
            f,
            "cycle {} concepts={} novel={} mean-priority={:.4}",
            self.time, stats.concept_count, stats.novel_tasks, stats.concept_priority_mean
        )?;
        let mut concepts: Vec<&Concept> = self.concepts.iter().collect();
        concepts.sort_by(|a, b| b.priority().total_cmp(&a.priority()));
        for concept in concepts {
            writeln!(f, "  {concept}")?;
        }
        Ok(())
    }
}
