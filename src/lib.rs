//! # Trueno-Experiment: Control/Candidate Experiments for Safe Refactoring
//!
//! **Version**: 0.1.0
//!
//! Trueno-Experiment runs a trusted *control* code path alongside one or more
//! *candidate* code paths that perform the same logical operation. The
//! control's result is always authoritative; candidates are observed, timed
//! and compared, but never allowed to affect the caller.
//!
//! ## Design Principles (Toyota Way Aligned)
//!
//! - **Jidoka**: Candidate panics are captured, never propagated to callers
//! - **Genchi Genbutsu**: Candidates are validated against production traffic
//! - **Heijunka**: Sampling keeps the candidate hit-rate under a fixed ceiling
//! - **Poka-Yoke**: The control always runs, in every mode
//!
//! ## Example Usage
//!
//! ```rust
//! use trueno_experiment::{Behaviours, Context, Experiment};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> trueno_experiment::Result<()> {
//! let experiment = Experiment::<usize, String>::builder("word-count")
//!     .percentage(10)
//!     .build()?;
//!
//! let behaviours = Behaviours::<usize, String>::new(|ctx: Context| async move {
//!     let text = ctx.value::<String>("text").cloned().unwrap_or_default();
//!     Ok(text.split_whitespace().count())
//! })
//! .candidate("bytes", |ctx: Context| async move {
//!     let text = ctx.value::<String>("text").cloned().unwrap_or_default();
//!     Ok(text.split(' ').filter(|w| !w.is_empty()).count())
//! })?;
//!
//! let mut runner = experiment.runner(behaviours);
//! let ctx = Context::new().with_value("text", "the quick brown fox".to_string());
//! let observations = runner.run(Some(ctx)).await;
//!
//! assert_eq!(observations.control().and_then(|o| o.value()), Some(&4));
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod context;
pub mod error;
pub mod experiment;
pub mod publish;

pub use context::Context;
pub use error::{Error, Result};
pub use experiment::{
    Behaviours, Evaluation, Experiment, ExperimentBuilder, Observation, Observations, Runner,
};
pub use publish::{Publisher, TracingPublisher};
