//! Evaluation - comparison outcome of one observation set

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Result;

/// How a candidate fared against the control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// Comparison returned true.
    Matched,
    /// Comparison returned false.
    Mismatched,
    /// Candidate panicked; comparison was not invoked.
    Failed,
}

/// Per-candidate entry of an evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateOutcome {
    name: String,
    verdict: Verdict,
    duration_us: u64,
    failure: Option<String>,
}

impl CandidateOutcome {
    pub(crate) fn new(
        name: impl Into<String>,
        verdict: Verdict,
        duration: Duration,
        failure: Option<String>,
    ) -> Self {
        Self {
            name: name.into(),
            verdict,
            duration_us: micros(duration),
            failure,
        }
    }

    /// Candidate name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Verdict against the control.
    #[must_use]
    pub const fn verdict(&self) -> Verdict {
        self.verdict
    }

    /// Candidate duration in microseconds.
    #[must_use]
    pub const fn duration_us(&self) -> u64 {
        self.duration_us
    }

    /// Captured panic message, for failed candidates.
    #[must_use]
    pub fn failure(&self) -> Option<&str> {
        self.failure.as_deref()
    }
}

/// Result of comparing every candidate observation against the control.
///
/// Serialisable so publishers can ship it as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evaluation {
    experiment: String,
    evaluated_at: DateTime<Utc>,
    control_duration_us: u64,
    candidates: Vec<CandidateOutcome>,
}

impl Evaluation {
    /// Candidates are sorted by name for stable output.
    pub(crate) fn new(
        experiment: impl Into<String>,
        control_duration: Duration,
        mut candidates: Vec<CandidateOutcome>,
    ) -> Self {
        candidates.sort_by(|a, b| a.name.cmp(&b.name));
        Self {
            experiment: experiment.into(),
            evaluated_at: Utc::now(),
            control_duration_us: micros(control_duration),
            candidates,
        }
    }

    /// Experiment name.
    #[must_use]
    pub fn experiment(&self) -> &str {
        &self.experiment
    }

    /// When the evaluation was made.
    #[must_use]
    pub const fn evaluated_at(&self) -> DateTime<Utc> {
        self.evaluated_at
    }

    /// Control duration in microseconds.
    #[must_use]
    pub const fn control_duration_us(&self) -> u64 {
        self.control_duration_us
    }

    /// Candidate outcomes, sorted by name.
    #[must_use]
    pub fn candidates(&self) -> &[CandidateOutcome] {
        &self.candidates
    }

    /// Names of candidates with the given verdict.
    #[must_use]
    pub fn with_verdict(&self, verdict: Verdict) -> Vec<&str> {
        self.candidates
            .iter()
            .filter(|c| c.verdict == verdict)
            .map(CandidateOutcome::name)
            .collect()
    }

    /// Names of matching candidates.
    #[must_use]
    pub fn matched(&self) -> Vec<&str> {
        self.with_verdict(Verdict::Matched)
    }

    /// Names of mismatching candidates.
    #[must_use]
    pub fn mismatched(&self) -> Vec<&str> {
        self.with_verdict(Verdict::Mismatched)
    }

    /// Names of candidates whose panic was captured.
    #[must_use]
    pub fn failed(&self) -> Vec<&str> {
        self.with_verdict(Verdict::Failed)
    }

    /// True when every candidate matched (vacuously true without candidates).
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.candidates.iter().all(|c| c.verdict == Verdict::Matched)
    }

    /// Serialize to JSON.
    ///
    /// # Errors
    ///
    /// Returns `Error::Serialization` if encoding fails.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

fn micros(duration: Duration) -> u64 {
    u64::try_from(duration.as_micros()).unwrap_or(u64::MAX)
}
