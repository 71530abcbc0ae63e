use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::info;

use matchng_core::{DomainError, Job, JobId, JobStatus};

use super::position_by_id;
use crate::error::StoreError;
use crate::key::keys;
use crate::store::PersistentStore;

/// Job postings, persisted as one list under the `jobs` key.
#[derive(Debug)]
pub struct JobRepository {
    store: Arc<PersistentStore>,
    write_lock: Mutex<()>,
}

impl JobRepository {
    pub fn new(store: Arc<PersistentStore>) -> Self {
        Self {
            store,
            write_lock: Mutex::new(()),
        }
    }

    pub async fn list_jobs(&self) -> Result<Vec<Job>, StoreError> {
        Ok(self
            .store
            .get_item::<Vec<Job>>(keys::JOBS)
            .await?
            .unwrap_or_default())
    }

    /// Jobs a seeker can be recommended.
    pub async fn list_open_jobs(&self) -> Result<Vec<Job>, StoreError> {
        Ok(self
            .list_jobs()
            .await?
            .into_iter()
            .filter(Job::is_open)
            .collect())
    }

    pub async fn get_job(&self, id: &JobId) -> Result<Option<Job>, StoreError> {
        let mut jobs = self.list_jobs().await?;
        Ok(position_by_id(&jobs, id).map(|idx| jobs.swap_remove(idx)))
    }

    /// Upsert by id; new jobs are appended, keeping list order stable.
    pub async fn save_job(&self, job: Job) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut jobs = self.list_jobs().await?;

        match position_by_id(&jobs, &job.id) {
            Some(idx) => jobs[idx] = job,
            None => jobs.push(job),
        }

        self.store.set_item(keys::JOBS, &jobs).await
    }

    /// Returns the job after the change. Setting the status it already has
    /// is a no-op and does not write.
    pub async fn set_status(&self, id: &JobId, status: JobStatus) -> Result<Job, StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut jobs = self.list_jobs().await?;

        let idx = position_by_id(&jobs, id)
            .ok_or_else(|| DomainError::not_found(format!("job {id}")))?;
        let job = &mut jobs[idx];

        if !job.set_status(status) {
            return Ok(job.clone());
        }
        let updated = job.clone();

        self.store.set_item(keys::JOBS, &jobs).await?;
        info!(job_id = %id, status = status.as_str(), "job status changed");
        Ok(updated)
    }
}
