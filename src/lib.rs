//! Attention and budget economy of a non-axiomatic reasoner.
//!
//! Every belief, task and structural link carries a [`BudgetValue`]. Bounded,
//! priority-stratified [`Bag`]s decide what gets looked at next, and
//! [`Memory::cycle`] performs one bounded unit of reasoning work: select a
//! premise pair, hand it to an external rule library, price whatever comes
//! back, and age everything it touched.

pub mod budget;
pub mod config;
pub mod error;
pub mod io;
pub mod memory;
pub mod rules;
pub mod run;
pub mod sense;
pub mod storage;

pub use budget::truth::TruthValue;
pub use budget::BudgetValue;
pub use config::{BagConfig, ReasonerConfig};
pub use error::{ReasonerError, Result};
pub use memory::{Concept, Item, Memory, Sentence, SentenceKind, Stamp, Task, Term};
pub use rules::{Derivation, InferenceRules, PremisePair, Pricing, RuleFault};
pub use run::{Reasoner, RunLimit, RunReport, StopHandle, StopReason};
pub use storage::bag::{Bag, ForgetRate};
