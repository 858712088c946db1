//! Background job tracking for the two engine operations.
//!
//! A solve is CPU-bound and synchronous, so it runs on a
//! `tokio::task::spawn_blocking` worker rather than blocking the async
//! runtime; the job's status is polled separately rather than held open on
//! a single request, matching the teacher's `JobManager` generalized from a
//! single `run_solver` call to `generate` and `regenerate_session`.

use dashmap::DashMap;
use seating_core::models::{GenerateOutput, RegenerateOutput};
use serde::Serialize;
use std::sync::{Arc, Mutex};
use tokio::task;
use uuid::Uuid;

#[derive(Serialize, Clone, Debug)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

#[derive(Serialize, Clone)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum JobResult {
    Generate(GenerateOutput),
    Regenerate(RegenerateOutput),
}

#[derive(Serialize, Clone)]
pub struct Job {
    pub id: Uuid,
    pub status: JobStatus,
    pub result: Option<JobResult>,
    pub error: Option<String>,
}

#[derive(Clone)]
pub struct JobManager {
    jobs: Arc<DashMap<Uuid, Arc<Mutex<Job>>>>,
}

impl JobManager {
    pub fn new() -> Self {
        Self {
            jobs: Arc::new(DashMap::new()),
        }
    }

    /// Spawns `work` on a blocking thread pool worker and tracks its result
    /// under a fresh job id.
    pub fn spawn<F>(&self, work: F) -> Uuid
    where
        F: FnOnce() -> Result<JobResult, String> + Send + 'static,
    {
        let job_id = Uuid::new_v4();
        let job = Arc::new(Mutex::new(Job {
            id: job_id,
            status: JobStatus::Pending,
            result: None,
            error: None,
        }));
        self.jobs.insert(job_id, job.clone());

        task::spawn(async move {
            {
                let mut j = job.lock().unwrap();
                j.status = JobStatus::Running;
            }
            let outcome = task::spawn_blocking(work).await;
            let mut j = job.lock().unwrap();
            match outcome {
                Ok(Ok(result)) => {
                    j.status = JobStatus::Completed;
                    j.result = Some(result);
                }
                Ok(Err(message)) => {
                    j.status = JobStatus::Failed;
                    j.error = Some(message);
                }
                Err(join_err) => {
                    j.status = JobStatus::Failed;
                    j.error = Some(format!("solver task panicked: {join_err}"));
                }
            }
        });

        job_id
    }

    pub fn get(&self, id: Uuid) -> Option<Job> {
        self.jobs.get(&id).map(|job| job.lock().unwrap().clone())
    }
}

impl Default for JobManager {
    fn default() -> Self {
        Self::new()
    }
}
