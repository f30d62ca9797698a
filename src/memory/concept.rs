use super::entry::{Item, Sentence, SharedTask, Term};
use super::link::{TaskLink, TermLink, TermLinkKind};
use crate::budget::functions::{rank_belief, solution_quality};
use crate::budget::BudgetValue;
use crate::storage::bag::Bag;
use std::collections::VecDeque;
use std::fmt;

/// Unit of long-term memory, keyed by a term.
pub struct Concept {
    term: Term,
    budget: BudgetValue,
    task_links: Bag<TaskLink>,
    term_links: Bag<TermLink>,
    beliefs: Vec<Sentence>,
    goals: Vec<Sentence>,
    questions: VecDeque<SharedTask>,
    belief_capacity: usize,
    goal_capacity: usize,
    question_capacity: usize,
}

/// Table sizes of a concept.
#[derive(Debug, Clone, Copy)]
pub struct ConceptLimits {
    pub beliefs: usize,
    pub goals: usize,
    pub questions: usize,
}

impl Concept {
    pub fn new(
        term: Term,
        budget: BudgetValue,
        task_links: Bag<TaskLink>,
        term_links: Bag<TermLink>,
        limits: ConceptLimits,
    ) -> Self {
        Self {
            term,
            budget,
            task_links,
            term_links,
            beliefs: Vec::with_capacity(limits.beliefs),
            goals: Vec::with_capacity(limits.goals),
            questions: VecDeque::with_capacity(limits.questions),
            belief_capacity: limits.beliefs,
            goal_capacity: limits.goals,
            question_capacity: limits.questions,
        }
    }

    pub fn term(&self) -> &Term { &self.term }
    pub fn beliefs(&self) -> &[Sentence] { &self.beliefs }
    pub fn goals(&self) -> &[Sentence] { &self.goals }
    pub fn task_links(&self) -> &Bag<TaskLink> { &self.task_links }
    pub fn term_links(&self) -> &Bag<TermLink> { &self.term_links }

    pub fn task_links_mut(&mut self) -> &mut Bag<TaskLink> {
        &mut self.task_links
    }

    pub fn term_links_mut(&mut self) -> &mut Bag<TermLink> {
        &mut self.term_links
    }

    pub fn questions(&self) -> impl Iterator<Item = &SharedTask> {
        self.questions.iter()
    }

    pub fn question_count(&self) -> usize {
        self.questions.len()
    }

    /// Term-links every concept of this term starts with: one per component.
    pub fn term_link_templates(&self) -> Vec<(Term, TermLinkKind)> {
        self.term
            .components()
            .iter()
            .map(|component| (component.clone(), TermLinkKind::Component))
            .collect()
    }

    /// Files a judgment into the belief table by rank. Returns `false` if it
    /// ranked below a full table.
    pub fn add_belief(&mut self, judgment: Sentence) -> bool {
        add_ranked(&mut self.beliefs, judgment, self.belief_capacity)
    }

    pub fn add_goal(&mut self, goal: Sentence) -> bool {
        add_ranked(&mut self.goals, goal, self.goal_capacity)
    }

    /// Remembers a pending question, dropping the oldest one when full.
    pub fn add_question(&mut self, question: SharedTask) {
        let key = question.read().key().to_string();
        if self.questions.iter().any(|q| q.read().key() == key) {
            return;
        }
        if self.questions.len() >= self.question_capacity {
            self.questions.pop_front();
        }
        self.questions.push_back(question);
    }

    /// Highest-ranked belief whose evidence does not overlap the task's.
    pub fn select_belief(&self, task: &Sentence) -> Option<&Sentence> {
        self.beliefs
            .iter()
            .find(|belief| !belief.stamp().overlaps(task.stamp()))
    }

    /// Belief with the same content that can be revised with `judgment`.
    pub fn revisable_belief(&self, judgment: &Sentence) -> Option<&Sentence> {
        self.beliefs
            .iter()
            .find(|belief| belief.content() == judgment.content() && !belief.stamp().overlaps(judgment.stamp()))
    }

    pub fn has_duplicate_belief(&self, judgment: &Sentence) -> bool {
        self.beliefs.iter().any(|belief| belief.is_duplicate_of(judgment))
    }

    /// Best answer to `question` among the beliefs.
    pub fn best_solution(&self, question: &Sentence) -> Option<&Sentence> {
        self.beliefs
            .iter()
            .filter(|belief| belief.content() == question.content())
            .max_by(|a, b| solution_quality(question, a).total_cmp(&solution_quality(question, b)))
    }
}

fn add_ranked(table: &mut Vec<Sentence>, sentence: Sentence, capacity: usize) -> bool {
    let rank = rank_belief(&sentence);
    let pos = table
        .iter()
        .position(|existing| rank >= rank_belief(existing))
        .unwrap_or(table.len());
    if pos >= capacity {
        return false;
    }
    table.insert(pos, sentence);
    table.truncate(capacity);
    true
}

impl Item for Concept {
    fn key(&self) -> &str {
        self.term.name()
    }

    fn budget(&self) -> &BudgetValue {
        &self.budget
    }

    fn budget_mut(&mut self) -> &mut BudgetValue {
        &mut self.budget
    }
}

impl fmt::Display for Concept {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} beliefs={} goals={} questions={} task-links={} term-links={}",
            self.budget,
            self.term,
            self.beliefs.len(),
            self.goals.len(),
            self.questions.len(),
            self.task_links.len(),
            self.term_links.len()
        )
    }
}
