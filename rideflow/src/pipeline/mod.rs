//! Pipeline construction and the dependency-ordered runner.

mod builder;
mod runner;
mod spec;


pub use builder::PipelineBuilder;
pub use runner::{Pipeline, RunReport};
pub use spec::{RetryPolicy, StageSpec};
