//! Job records and topics for the delivery queue.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use stayforge_core::PropertyId;

use super::retry::RetryPolicy;

/// Unique job identifier. UUIDv7, so ids sort by creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What a job does, as a dotted topic such as `notify.booking_confirmation`.
///
/// Handlers subscribe to an exact topic, to a family (`notify.*`) or to
/// everything (`*`). Two kinds are equal when their topics are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobKind(String);

impl JobKind {
    /// Guest-facing notice delivery. Notice topics live under `notify.`.
    pub fn guest_notification(topic: impl Into<String>) -> Self {
        Self(topic.into())
    }

    /// One-off work outside the notice family.
    pub fn custom(topic: impl Into<String>) -> Self {
        Self(topic.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Where a job is in its life.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Waiting in the queue.
    Pending,
    /// Claimed by a worker.
    Running,
    /// Done, kept for inspection.
    Completed,
    /// Last attempt failed; a retry is scheduled.
    Failed { error: String, attempt: u32 },
    /// Retries exhausted; the job sits on the dead-letter shelf.
    DeadLettered { error: String, attempts: u32 },
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::DeadLettered { .. })
    }

    pub fn is_retriable(&self) -> bool {
        matches!(self, JobStatus::Failed { .. })
    }
}

/// A queued unit of background work, scoped to one property.
///
/// The payload is opaque JSON; the worker picks a handler by topic. Nothing
/// in here ever feeds back into booking decisions: a job can fail forever
/// and the stay it belongs to remains committed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub property_id: PropertyId,
    pub id: JobId,
    pub kind: JobKind,
    pub payload: serde_json::Value,
    pub retry_policy: RetryPolicy,
    pub status: JobStatus,
    /// Attempts started so far.
    pub attempt: u32,
    /// Earliest time the next attempt may run; `None` means immediately.
    pub run_after: Option<DateTime<Utc>>,
    /// Outcome of every finished attempt, oldest first.
    pub outcomes: Vec<AttemptOutcome>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Outcome of one finished attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptOutcome {
    pub attempt: u32,
    pub finished_at: DateTime<Utc>,
    /// `None` on success.
    pub error: Option<String>,
}

impl Job {
    pub fn new(property_id: PropertyId, kind: JobKind, payload: serde_json::Value) -> Self {
        let now = Utc::now();
        Self {
            property_id,
            id: JobId::new(),
            kind,
            payload,
            retry_policy: RetryPolicy::default(),
            status: JobStatus::Pending,
            attempt: 0,
            run_after: None,
            outcomes: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    /// Whether the queue may hand this job to a worker right now.
    pub fn is_due(&self) -> bool {
        self.run_after.map_or(true, |at| Utc::now() >= at)
    }

    /// Push the next attempt out by `delay` from now.
    pub fn defer(&mut self, delay: Duration) {
        self.run_after = Some(due_at(Utc::now(), delay));
    }

    /// Claim the job for an attempt.
    pub fn begin_attempt(&mut self) {
        self.attempt += 1;
        self.status = JobStatus::Running;
        self.updated_at = Utc::now();
    }

    /// Record a successful attempt.
    pub fn succeed(&mut self) {
        let now = Utc::now();
        self.record_outcome(now, None);
        self.status = JobStatus::Completed;
    }

    /// Record a failed attempt. Schedules a retry with backoff while the
    /// policy allows it, then dead-letters.
    pub fn fail(&mut self, error: String) {
        let now = Utc::now();
        self.record_outcome(now, Some(error.clone()));

        self.status = if self.retry_policy.can_retry(self.attempt) {
            self.run_after = Some(due_at(now, self.retry_policy.next_delay(self.attempt)));
            JobStatus::Failed {
                error,
                attempt: self.attempt,
            }
        } else {
            JobStatus::DeadLettered {
                error,
                attempts: self.attempt,
            }
        };
    }

    fn record_outcome(&mut self, now: DateTime<Utc>, error: Option<String>) {
        self.outcomes.push(AttemptOutcome {
            attempt: self.attempt,
            finished_at: now,
            error,
        });
        self.updated_at = now;
    }
}

fn due_at(now: DateTime<Utc>, delay: Duration) -> DateTime<Utc> {
    now + chrono::Duration::from_std(delay).unwrap_or_default()
}

/// What a handler reports back for one attempt.
#[derive(Debug)]
pub enum JobResult {
    Success,
    /// Counted against the retry policy.
    Failure(String),
    /// Downstream asked us to back off for a specific time.
    RetryAfter(Duration),
}

/// A job parked after its retries ran out, kept for inspection and replay.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeadLetterEntry {
    pub job: Job,
    pub parked_at: DateTime<Utc>,
    pub reason: String,
}

impl DeadLetterEntry {
    pub fn new(job: Job, reason: String) -> Self {
        Self {
            job,
            parked_at: Utc::now(),
            reason,
        }
    }
}
