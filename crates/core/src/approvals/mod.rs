pub mod chain;
pub mod evaluator;

pub use chain::{ChainBuilder, ChainPolicy, MANAGER_FALLBACK_PCT};
pub use evaluator::{ApprovalEvaluator, Tally, VoteOutcome};
