//! Background delivery queue.
//!
//! Guest notices (booking confirmations, cancellation notices) must never
//! decide the fate of a booking: the desk commits the stay, drops a job in
//! here and answers the caller. The worker owns delivery, retries with
//! backoff, and parks jobs on a dead-letter shelf once the policy gives up.
//!
//! `Job` and `RetryPolicy` describe the work, `JobStore` persists it,
//! `JobExecutor` drains it.

pub mod executor;
pub mod retry;
pub mod store;
pub mod types;

pub use executor::{ExecutorStats, JobExecutor, JobExecutorConfig, JobExecutorHandle, JobHandler};
pub use retry::{Backoff, RetryPolicy};
pub use store::{InMemoryJobStore, JobStats, JobStore, JobStoreError};
pub use types::{AttemptOutcome, DeadLetterEntry, Job, JobId, JobKind, JobResult, JobStatus};
