//! Bounded revision loop over an ordered stage sequence.

use std::sync::Arc;

use async_trait::async_trait;
use miette::Diagnostic;
use thiserror::Error;
use tracing::instrument;

use super::verdict::{Verdict, parse_verdict};
use crate::node::HandlerError;

/// Default round cap for [`ReviewPipeline`].
pub const DEFAULT_MAX_ROUNDS: u32 = 3;

/// Input handed to every stage on every round.
#[derive(Clone, Debug)]
pub struct StageInput {
    /// The original request, unchanged across rounds.
    pub request: String,
    /// Output of the previous stage (or previous round's final artifact for
    /// the first stage).
    pub artifact: Option<String>,
    /// Revision reason from the previous round's reviewer, if any.
    pub feedback: Option<String>,
    /// 1-based round counter.
    pub round: u32,
}

/// One step of the pipeline: produces or transforms an artifact.
#[async_trait]
pub trait Stage: Send + Sync {
    async fn run(&self, input: StageInput) -> Result<String, HandlerError>;
}

/// Judges the final artifact of a round. The raw text is parsed with
/// [`parse_verdict`], so reviewers only need to print `VERDICT:` and
/// `REASON:` lines.
#[async_trait]
pub trait Reviewer: Send + Sync {
    async fn review(&self, request: &str, artifact: &str) -> Result<String, HandlerError>;
}

#[derive(Debug, Error, Diagnostic)]
pub enum ReviewError {
    #[error("review pipeline has no stages")]
    #[diagnostic(code(loomflow::review::no_stages))]
    NoStages,

    #[error("stage {stage} failed: {source}")]
    #[diagnostic(code(loomflow::review::stage))]
    Stage {
        stage: String,
        #[source]
        source: HandlerError,
    },

    #[error("reviewer failed: {source}")]
    #[diagnostic(code(loomflow::review::reviewer))]
    Reviewer {
        #[source]
        source: HandlerError,
    },
}

/// What the loop settled on.
///
/// `resolved` distinguishes an approved artifact from one returned because
/// the round cap ran out; callers must check it before trusting `artifact`.
#[derive(Clone, Debug)]
pub struct ReviewOutcome {
    pub artifact: String,
    /// Rounds actually executed.
    pub rounds: u32,
    /// True when the reviewer approved; false when rounds were exhausted.
    pub resolved: bool,
}

/// Runs stages in order, asks the reviewer for a verdict, and loops with the
/// revision reason fed back as stage feedback until approval or `max_rounds`.
///
/// The reviewer is invoked at most `max_rounds` times; an unparseable
/// verdict counts as a revision request, never an approval.
pub struct ReviewPipeline {
    stages: Vec<(String, Arc<dyn Stage>)>,
    reviewer: Arc<dyn Reviewer>,
    max_rounds: u32,
}

impl ReviewPipeline {
    pub fn new(reviewer: Arc<dyn Reviewer>) -> Self {
        Self {
            stages: Vec::new(),
            reviewer,
            max_rounds: DEFAULT_MAX_ROUNDS,
        }
    }

    pub fn add_stage(mut self, name: impl Into<String>, stage: Arc<dyn Stage>) -> Self {
        self.stages.push((name.into(), stage));
        self
    }

    pub fn with_max_rounds(mut self, max_rounds: u32) -> Self {
        self.max_rounds = max_rounds.max(1);
        self
    }

    #[instrument(skip(self, request), fields(stages = self.stages.len(), max_rounds = self.max_rounds))]
    pub async fn run(&self, request: &str) -> Result<ReviewOutcome, ReviewError> {
        if self.stages.is_empty() {
            return Err(ReviewError::NoStages);
        }

        let mut artifact: Option<String> = None;
        let mut feedback: Option<String> = None;

        for round in 1..=self.max_rounds {
            for (name, stage) in &self.stages {
                let input = StageInput {
                    request: request.to_string(),
                    artifact: artifact.clone(),
                    feedback: feedback.clone(),
                    round,
                };
                let output = stage
                    .run(input)
                    .await
                    .map_err(|source| ReviewError::Stage {
                        stage: name.clone(),
                        source,
                    })?;
                artifact = Some(output);
            }

            // Non-empty stage list guarantees an artifact by now.
            let current = artifact.clone().unwrap_or_default();
            let raw = self
                .reviewer
                .review(request, &current)
                .await
                .map_err(|source| ReviewError::Reviewer { source })?;

            match parse_verdict(&raw) {
                Verdict::Approve => {
                    tracing::info!(round, "artifact approved");
                    return Ok(ReviewOutcome {
                        artifact: current,
                        rounds: round,
                        resolved: true,
                    });
                }
                Verdict::Revise { reason } => {
                    tracing::debug!(round, %reason, "revision requested");
                    feedback = Some(reason);
                }
            }
        }

        Ok(ReviewOutcome {
            artifact: artifact.unwrap_or_default(),
            rounds: self.max_rounds,
            resolved: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct Draft;

    #[async_trait]
    impl Stage for Draft {
        async fn run(&self, input: StageInput) -> Result<String, HandlerError> {
            match input.feedback {
                Some(feedback) => Ok(format!("draft r{} ({feedback})", input.round)),
                None => Ok(format!("draft r{}", input.round)),
            }
        }
    }

    struct Polish;

    #[async_trait]
    impl Stage for Polish {
        async fn run(&self, input: StageInput) -> Result<String, HandlerError> {
            Ok(format!("{}!", input.artifact.unwrap_or_default()))
        }
    }

    /// Approves from `approve_on` onward; counts invocations.
    struct ScriptedReviewer {
        approve_on: u32,
        calls: AtomicU32,
    }

    impl ScriptedReviewer {
        fn new(approve_on: u32) -> Self {
            Self {
                approve_on,
                calls: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl Reviewer for ScriptedReviewer {
        async fn review(&self, _request: &str, _artifact: &str) -> Result<String, HandlerError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if call >= self.approve_on {
                Ok("VERDICT: approve".to_string())
            } else {
                Ok("VERDICT: revise\nREASON: needs work".to_string())
            }
        }
    }

    #[tokio::test]
    async fn approves_on_first_round() {
        let reviewer = Arc::new(ScriptedReviewer::new(1));
        let pipeline = ReviewPipeline::new(reviewer.clone())
            .add_stage("draft", Arc::new(Draft))
            .add_stage("polish", Arc::new(Polish));

        let outcome = pipeline.run("write a haiku").await.unwrap();

        assert!(outcome.resolved);
        assert_eq!(outcome.rounds, 1);
        assert_eq!(outcome.artifact, "draft r1!");
        assert_eq!(reviewer.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn exhausted_rounds_return_last_artifact_unresolved() {
        let reviewer = Arc::new(ScriptedReviewer::new(u32::MAX));
        let pipeline = ReviewPipeline::new(reviewer.clone())
            .add_stage("draft", Arc::new(Draft))
            .with_max_rounds(2);

        let outcome = pipeline.run("write a haiku").await.unwrap();

        assert!(!outcome.resolved);
        assert_eq!(outcome.rounds, 2);
        // Round-2 artifact, produced with round-1 feedback applied.
        assert_eq!(outcome.artifact, "draft r2 (needs work)");
        // Never a third reviewer call.
        assert_eq!(reviewer.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn feedback_reaches_the_next_round() {
        let reviewer = Arc::new(ScriptedReviewer::new(2));
        let pipeline = ReviewPipeline::new(reviewer)
            .add_stage("draft", Arc::new(Draft))
            .with_max_rounds(3);

        let outcome = pipeline.run("write a haiku").await.unwrap();

        assert!(outcome.resolved);
        assert_eq!(outcome.rounds, 2);
        assert_eq!(outcome.artifact, "draft r2 (needs work)");
    }

    #[tokio::test]
    async fn empty_pipeline_is_rejected() {
        let pipeline = ReviewPipeline::new(Arc::new(ScriptedReviewer::new(1)));
        assert!(matches!(
            pipeline.run("anything").await,
            Err(ReviewError::NoStages)
        ));
    }

    #[tokio::test]
    async fn stage_failure_names_the_stage() {
        struct Boom;

        #[async_trait]
        impl Stage for Boom {
            async fn run(&self, _input: StageInput) -> Result<String, HandlerError> {
                Err(HandlerError::other("collaborator down"))
            }
        }

        let pipeline = ReviewPipeline::new(Arc::new(ScriptedReviewer::new(1)))
            .add_stage("boom", Arc::new(Boom));

        match pipeline.run("anything").await {
            Err(ReviewError::Stage { stage, .. }) => assert_eq!(stage, "boom"),
            other => panic!("expected Stage error, got {other:?}"),
        }
    }
}
