//! Concepts, links, tasks and the reasoning cycle that ties them together.

pub mod concept;
pub mod cycle;
pub mod entry;
pub mod link;
pub mod novel;

pub use concept::{Concept, ConceptLimits};
pub use cycle::{CycleOutcome, Focus, Memory, MemoryStats};
pub use entry::{Item, Sentence, SentenceKind, SharedTask, Stamp, Task, Term};
pub use link::{TaskLink, TaskLinkKind, TermLink, TermLinkKind};
pub use novel::{Admission, NoveltyBuffer};
