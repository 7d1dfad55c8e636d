//! EPL spread reconciliation: joins bookmaker handicap snapshots with final
//! scores and tracks each club's net performance against the line.

pub mod aggregate;
pub mod backfill;
pub mod config;
pub mod consensus;
pub mod correlation;
pub mod fetch;
pub mod fixture;
pub mod odds_api;
pub mod performance;
pub mod pipeline;
pub mod report;
pub mod results;
pub mod serde_utils;
pub mod spreads;
pub mod store;
pub mod teams;
pub mod upcoming;

pub use pipeline::{PipelineContext, PipelineError, PipelineInput};
