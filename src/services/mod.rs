pub mod source;
pub mod runner;
pub mod builder;

#[cfg(test)]
pub mod testing;

pub use source::Source;
pub use runner::{DispatchOutcome, FetchFailure, RunPhase, RunReport, Runner};
pub use builder::build_runner;
