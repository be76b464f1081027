//! # Rideflow
//!
//! A small dependency-ordered extract → transform → load pipeline core for
//! ride booking data.
//!
//! Rideflow extracts tabular data from a local CSV file, cleans and reshapes
//! it, and publishes the result to an object-storage collaborator. The heart
//! of the crate is the execution contract between stages:
//!
//! - **Handoff store**: a per-run key-value exchange through which a stage
//!   publishes a result reference, visible downstream only after the stage
//!   returned successfully
//! - **Stages**: extract, transform and load, each independently invocable
//!   with a run-scoped context and at most one declared upstream
//! - **Graph runner**: enforces the strict chain, failing the run and
//!   skipping downstream stages on any upstream failure
//!
//! Scheduling cadence, retry timing and the real storage network client live
//! outside this crate; the scheduler triggers stages (or whole runs) and the
//! storage collaborator is reached through the [`storage::ObjectStore`]
//! trait.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use rideflow::prelude::*;
//! use std::sync::Arc;
//!
//! let config = Arc::new(PipelineConfig::default().with_source_path("data/uber.csv"));
//! let handoff = Arc::new(HandoffStore::new());
//! let store = Arc::new(MemoryObjectStore::new());
//!
//! let pipeline = Pipeline::etl(store)?;
//! let ctx = RunContext::new(RunId::new(), config, handoff);
//! let report = pipeline.run(&ctx).await;
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, missing_docs, rust_2018_idioms)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod config;
pub mod errors;
pub mod events;
pub mod handoff;
pub mod pipeline;
pub mod run;
pub mod stages;
pub mod storage;
pub mod table;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::PipelineConfig;
    pub use crate::errors::{PipelineValidationError, StageError, StageErrorKind};
    pub use crate::events::{
        init_tracing, CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink,
    };
    pub use crate::handoff::{HandoffEntry, HandoffStore};
    pub use crate::pipeline::{Pipeline, PipelineBuilder, RetryPolicy, RunReport, StageSpec};
    pub use crate::run::{Run, RunContext, RunId, RunStatus};
    pub use crate::stages::{
        ExtractStage, LoadStage, Stage, StageReport, TransformStage, RAW_DATA_KEY,
        TRANSFORMED_FILE_KEY,
    };
    pub use crate::storage::{MemoryObjectStore, ObjectStore, ObjectStoreError, StoredObject};
    pub use crate::table::Table;
}
