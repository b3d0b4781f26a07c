//! Queue storage for background jobs.

use std::sync::{Arc, Mutex};

use chrono::Utc;

use stayforge_core::PropertyId;

use super::types::{DeadLetterEntry, Job, JobId, JobKind, JobStatus};

/// Persistence behind the delivery queue.
///
/// Implementations must keep jobs of different properties invisible to each
/// other: a lookup with the wrong property is an isolation error, not a miss.
pub trait JobStore: Send + Sync {
    fn enqueue(&self, job: Job) -> Result<JobId, JobStoreError>;

    fn get(&self, property_id: PropertyId, job_id: JobId) -> Result<Option<Job>, JobStoreError>;

    /// Persist a job the worker has mutated (status, attempt counters, ...).
    fn update(&self, job: &Job) -> Result<(), JobStoreError>;

    /// Hand out the oldest due job, already marked running.
    ///
    /// `property_id` narrows the claim to one property; `None` serves the
    /// whole queue. Returns `None` when nothing is due.
    fn claim_next(&self, property_id: Option<PropertyId>) -> Result<Option<Job>, JobStoreError>;

    fn list_by_status(
        &self,
        property_id: PropertyId,
        status: Option<JobStatus>,
        limit: usize,
    ) -> Result<Vec<Job>, JobStoreError>;

    fn list_by_kind(
        &self,
        property_id: PropertyId,
        kind: &JobKind,
        limit: usize,
    ) -> Result<Vec<Job>, JobStoreError>;

    /// Park a job on the dead-letter shelf.
    fn dead_letter(&self, job: Job, reason: String) -> Result<(), JobStoreError>;

    fn list_dead_letters(
        &self,
        property_id: PropertyId,
        limit: usize,
    ) -> Result<Vec<DeadLetterEntry>, JobStoreError>;

    /// Move a parked job back into the queue with a fresh attempt budget.
    fn retry_dead_letter(
        &self,
        property_id: PropertyId,
        job_id: JobId,
    ) -> Result<Job, JobStoreError>;

    fn delete_dead_letter(
        &self,
        property_id: PropertyId,
        job_id: JobId,
    ) -> Result<(), JobStoreError>;

    fn stats(&self, property_id: PropertyId) -> Result<JobStats, JobStoreError>;
}

// Delegation so Arc<S> (including Arc<dyn JobStore>) is itself a store.
impl<S: JobStore + ?Sized> JobStore for Arc<S> {
    fn enqueue(&self, job: Job) -> Result<JobId, JobStoreError> {
        (**self).enqueue(job)
    }

    fn get(&self, property_id: PropertyId, job_id: JobId) -> Result<Option<Job>, JobStoreError> {
        (**self).get(property_id, job_id)
    }

    fn update(&self, job: &Job) -> Result<(), JobStoreError> {
        (**self).update(job)
    }

    fn claim_next(&self, property_id: Option<PropertyId>) -> Result<Option<Job>, JobStoreError> {
        (**self).claim_next(property_id)
    }

    fn list_by_status(
        &self,
        property_id: PropertyId,
        status: Option<JobStatus>,
        limit: usize,
    ) -> Result<Vec<Job>, JobStoreError> {
        (**self).list_by_status(property_id, status, limit)
    }

    fn list_by_kind(
        &self,
        property_id: PropertyId,
        kind: &JobKind,
        limit: usize,
    ) -> Result<Vec<Job>, JobStoreError> {
        (**self).list_by_kind(property_id, kind, limit)
    }

    fn dead_letter(&self, job: Job, reason: String) -> Result<(), JobStoreError> {
        (**self).dead_letter(job, reason)
    }

    fn list_dead_letters(
        &self,
        property_id: PropertyId,
        limit: usize,
    ) -> Result<Vec<DeadLetterEntry>, JobStoreError> {
        (**self).list_dead_letters(property_id, limit)
    }

    fn retry_dead_letter(
        &self,
        property_id: PropertyId,
        job_id: JobId,
    ) -> Result<Job, JobStoreError> {
        (**self).retry_dead_letter(property_id, job_id)
    }

    fn delete_dead_letter(
        &self,
        property_id: PropertyId,
        job_id: JobId,
    ) -> Result<(), JobStoreError> {
        (**self).delete_dead_letter(property_id, job_id)
    }

    fn stats(&self, property_id: PropertyId) -> Result<JobStats, JobStoreError> {
        (**self).stats(property_id)
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum JobStoreError {
    #[error("job not found: {0}")]
    NotFound(JobId),
    #[error("job belongs to another property")]
    PropertyIsolation,
    #[error("job already queued: {0}")]
    AlreadyExists(JobId),
    #[error("storage error: {0}")]
    Storage(String),
}

/// Queue shape per status, for the ops dashboard.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct JobStats {
    pub pending: usize,
    pub running: usize,
    pub completed: usize,
    pub failed: usize,
    pub dead_lettered: usize,
}

/// In-memory store for tests and single-process deployments.
///
/// A plain `Vec` under one lock: enqueue order is claim order, which gives
/// FIFO without timestamp tie-breaking.
#[derive(Debug, Default)]
pub struct InMemoryJobStore {
    state: Mutex<State>,
}

#[derive(Debug, Default)]
struct State {
    queue: Vec<Job>,
    parked: Vec<DeadLetterEntry>,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl JobStore for InMemoryJobStore {
    fn enqueue(&self, job: Job) -> Result<JobId, JobStoreError> {
        let mut state = self.state.lock().unwrap();
        if state.queue.iter().any(|j| j.id == job.id) {
            return Err(JobStoreError::AlreadyExists(job.id));
        }
        let id = job.id;
        state.queue.push(job);
        Ok(id)
    }

    fn get(&self, property_id: PropertyId, job_id: JobId) -> Result<Option<Job>, JobStoreError> {
        let state = self.state.lock().unwrap();
        match state.queue.iter().find(|j| j.id == job_id) {
            Some(job) if job.property_id == property_id => Ok(Some(job.clone())),
            Some(_) => Err(JobStoreError::PropertyIsolation),
            None => Ok(None),
        }
    }

    fn update(&self, job: &Job) -> Result<(), JobStoreError> {
        let mut state = self.state.lock().unwrap();
        match state.queue.iter_mut().find(|j| j.id == job.id) {
            Some(slot) => {
                *slot = job.clone();
                Ok(())
            }
            None => Err(JobStoreError::NotFound(job.id)),
        }
    }

    fn claim_next(&self, property_id: Option<PropertyId>) -> Result<Option<Job>, JobStoreError> {
        let mut state = self.state.lock().unwrap();
        let claimable = state.queue.iter_mut().find(|j| {
            (matches!(j.status, JobStatus::Pending) || j.status.is_retriable())
                && j.is_due()
                && property_id.map_or(true, |p| j.property_id == p)
        });

        Ok(claimable.map(|job| {
            job.begin_attempt();
            job.clone()
        }))
    }

    fn list_by_status(
        &self,
        property_id: PropertyId,
        status: Option<JobStatus>,
        limit: usize,
    ) -> Result<Vec<Job>, JobStoreError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .queue
            .iter()
            .filter(|j| j.property_id == property_id)
            .filter(|j| {
                status.as_ref().map_or(true, |s| {
                    std::mem::discriminant(&j.status) == std::mem::discriminant(s)
                })
            })
            .take(limit)
            .cloned()
            .collect())
    }

    fn list_by_kind(
        &self,
        property_id: PropertyId,
        kind: &JobKind,
        limit: usize,
    ) -> Result<Vec<Job>, JobStoreError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .queue
            .iter()
            .filter(|j| j.property_id == property_id && j.kind == *kind)
            .take(limit)
            .cloned()
            .collect())
    }

    fn dead_letter(&self, mut job: Job, reason: String) -> Result<(), JobStoreError> {
        let mut state = self.state.lock().unwrap();
        job.status = JobStatus::DeadLettered {
            error: reason.clone(),
            attempts: job.attempt,
        };
        job.updated_at = Utc::now();

        state.queue.retain(|j| j.id != job.id);
        state.parked.push(DeadLetterEntry::new(job, reason));
        Ok(())
    }

    fn list_dead_letters(
        &self,
        property_id: PropertyId,
        limit: usize,
    ) -> Result<Vec<DeadLetterEntry>, JobStoreError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .parked
            .iter()
            .filter(|e| e.job.property_id == property_id)
            .take(limit)
            .cloned()
            .collect())
    }

    fn retry_dead_letter(
        &self,
        property_id: PropertyId,
        job_id: JobId,
    ) -> Result<Job, JobStoreError> {
        let mut state = self.state.lock().unwrap();
        let idx = state
            .parked
            .iter()
            .position(|e| e.job.id == job_id)
            .ok_or(JobStoreError::NotFound(job_id))?;
        if state.parked[idx].job.property_id != property_id {
            return Err(JobStoreError::PropertyIsolation);
        }

        let mut job = state.parked.remove(idx).job;
        job.status = JobStatus::Pending;
        job.attempt = 0;
        job.run_after = None;
        job.outcomes.clear();
        job.updated_at = Utc::now();

        state.queue.push(job.clone());
        Ok(job)
    }

    fn delete_dead_letter(
        &self,
        property_id: PropertyId,
        job_id: JobId,
    ) -> Result<(), JobStoreError> {
        let mut state = self.state.lock().unwrap();
        let idx = state
            .parked
            .iter()
            .position(|e| e.job.id == job_id)
            .ok_or(JobStoreError::NotFound(job_id))?;
        if state.parked[idx].job.property_id != property_id {
            return Err(JobStoreError::PropertyIsolation);
        }

        state.parked.remove(idx);
        Ok(())
    }

    fn stats(&self, property_id: PropertyId) -> Result<JobStats, JobStoreError> {
        let state = self.state.lock().unwrap();
        let mut stats = JobStats::default();

        for job in state.queue.iter().filter(|j| j.property_id == property_id) {
            match &job.status {
                JobStatus::Pending => stats.pending += 1,
                JobStatus::Running => stats.running += 1,
                JobStatus::Completed => stats.completed += 1,
                JobStatus::Failed { .. } => stats.failed += 1,
                JobStatus::DeadLettered { .. } => stats.dead_lettered += 1,
            }
        }
        stats.dead_lettered += state
            .parked
            .iter()
            .filter(|e| e.job.property_id == property_id)
            .count();

        Ok(stats)
    }
}
