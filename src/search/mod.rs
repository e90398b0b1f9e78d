mod bm25;
mod orchestrator;

pub use bm25::{Bm25Index, Bm25Match, Bm25Params};
pub use orchestrator::{ExplicitFilters, RankedResult, SearchOrchestrator, SearchOutcome, Strategy};
