//! Producer/reviewer revision loop with a hard round cap.
//!
//! An ordered list of [`Stage`]s produces and refines an artifact; a
//! [`Reviewer`] judges it each round. Revision reasons flow back into the
//! next round's [`StageInput::feedback`]. The loop always terminates: either
//! the reviewer approves, or the cap is hit and the result comes back with
//! `resolved: false`.
//!
//! Verdict parsing lives in its own module so orchestration never touches
//! the reviewer's output format.

mod pipeline;
mod verdict;

pub use pipeline::{
    DEFAULT_MAX_ROUNDS, ReviewError, ReviewOutcome, ReviewPipeline, Reviewer, Stage, StageInput,
};
pub use verdict::{Verdict, parse_verdict};
