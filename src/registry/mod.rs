//! Job registry - capability layer
//!
//! In-memory bookkeeping for every job the process has accepted. Callers
//! hold a job id, never the job itself; all reads go through snapshots so
//! a running navigator and a status poller never contend on the same lock
//! for long.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::models::{DocumentRecord, JobStatus, SearchCriteria};

/// Full state of one job at a point in time.
#[derive(Clone, Debug, Serialize)]
pub struct Job {
    pub id: String,
    pub criteria: SearchCriteria,
    pub status: JobStatus,
    pub records: Vec<DocumentRecord>,
    pub directory: PathBuf,
    pub created_at: DateTime<Utc>,
    pub pages_visited: u32,
    pub error: Option<String>,
}

impl Job {
    fn is_terminal(&self) -> bool {
        matches!(
            self.status,
            JobStatus::Completed | JobStatus::NoResults | JobStatus::Failed | JobStatus::Cancelled
        )
    }
}

/// `job_<unix-seconds>_<uuid-prefix>`: sortable by submission time, unique
/// within and across process restarts.
fn new_job_id(now: DateTime<Utc>) -> String {
    let uuid = Uuid::new_v4().simple().to_string();
    format!("job_{}_{}", now.timestamp(), &uuid[..8])
}

#[derive(Default)]
pub struct JobRegistry {
    jobs: RwLock<HashMap<String, Arc<Mutex<Job>>>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new job in `Queued` state and hand back its snapshot.
    pub fn create(&self, criteria: SearchCriteria, directory: PathBuf) -> Job {
        let now = Utc::now();
        let job = Job {
            id: new_job_id(now),
            criteria,
            status: JobStatus::Queued,
            records: Vec::new(),
            directory,
            created_at: now,
            pages_visited: 0,
            error: None,
        };
        self.jobs
            .write()
            .unwrap()
            .insert(job.id.clone(), Arc::new(Mutex::new(job.clone())));
        job
    }

    fn with_job<R>(&self, id: &str, f: impl FnOnce(&mut Job) -> R) -> Option<R> {
        let slot = self.jobs.read().unwrap().get(id).cloned()?;
        let mut job = slot.lock().unwrap();
        Some(f(&mut job))
    }

    pub fn set_status(&self, id: &str, status: JobStatus) {
        self.with_job(id, |job| job.status = status);
    }

    pub fn append_record(&self, id: &str, record: DocumentRecord) {
        self.with_job(id, |job| job.records.push(record));
    }

    pub fn set_pages_visited(&self, id: &str, pages: u32) {
        self.with_job(id, |job| job.pages_visited = pages);
    }

    /// Mark the job failed with a human-readable reason.
    pub fn record_error(&self, id: &str, message: impl Into<String>) {
        let message = message.into();
        self.with_job(id, |job| {
            job.status = JobStatus::Failed;
            job.error = Some(message);
        });
    }

    pub fn snapshot(&self, id: &str) -> Option<Job> {
        self.with_job(id, |job| job.clone())
    }

    pub fn list(&self) -> Vec<Job> {
        let slots: Vec<_> = self.jobs.read().unwrap().values().cloned().collect();
        let mut jobs: Vec<Job> = slots.iter().map(|s| s.lock().unwrap().clone()).collect();
        jobs.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        jobs
    }

    /// Drop terminal jobs older than `ttl`. Running and queued jobs are
    /// never dropped, whatever their age. Returns how many were removed.
    pub fn cleanup_expired(&self, ttl: Duration) -> usize {
        let cutoff = Utc::now() - chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::zero());
        let mut jobs = self.jobs.write().unwrap();
        let before = jobs.len();
        jobs.retain(|_, slot| {
            let job = slot.lock().unwrap();
            !(job.is_terminal() && job.created_at < cutoff)
        });
        let removed = before - jobs.len();
        if removed > 0 {
            info!("cleaned up {} expired job(s)", removed);
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DocumentStatus;

    fn criteria() -> SearchCriteria {
        SearchCriteria {
            year: "2023".into(),
            district: "Pune".into(),
            tahsil: "Haveli".into(),
            village: "Kothrud".into(),
            property_no: "123".into(),
        }
    }

    #[test]
    fn lifecycle_is_tracked() {
        let registry = JobRegistry::new();
        let job = registry.create(criteria(), PathBuf::from("downloads/x"));
        assert_eq!(job.status, JobStatus::Queued);
        assert!(job.id.starts_with("job_"));

        registry.set_status(&job.id, JobStatus::Running);
        registry.append_record(&job.id, DocumentRecord::failed(0, 1, "window timeout"));
        registry.set_pages_visited(&job.id, 2);
        registry.set_status(&job.id, JobStatus::Completed);

        let snap = registry.snapshot(&job.id).unwrap();
        assert_eq!(snap.status, JobStatus::Completed);
        assert_eq!(snap.records.len(), 1);
        assert_eq!(snap.records[0].status, DocumentStatus::Failed);
        assert_eq!(snap.pages_visited, 2);
    }

    #[test]
    fn unknown_id_is_a_no_op() {
        let registry = JobRegistry::new();
        registry.set_status("job_0_deadbeef", JobStatus::Running);
        assert!(registry.snapshot("job_0_deadbeef").is_none());
    }

    #[test]
    fn record_error_marks_failed() {
        let registry = JobRegistry::new();
        let job = registry.create(criteria(), PathBuf::from("downloads/x"));
        registry.record_error(&job.id, "captcha not solved after 5 attempts");
        let snap = registry.snapshot(&job.id).unwrap();
        assert_eq!(snap.status, JobStatus::Failed);
        assert_eq!(
            snap.error.as_deref(),
            Some("captcha not solved after 5 attempts")
        );
    }

    #[test]
    fn concurrent_appends_all_land() {
        let registry = Arc::new(JobRegistry::new());
        let job = registry.create(criteria(), PathBuf::from("downloads/x"));
        let mut handles = Vec::new();
        for i in 0..8 {
            let registry = Arc::clone(&registry);
            let id = job.id.clone();
            handles.push(std::thread::spawn(move || {
                for j in 0..25 {
                    registry.append_record(
                        &id,
                        DocumentRecord::failed(j % 10, i + 1, "contended write"),
                    );
                }
            }));
        }
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(registry.snapshot(&job.id).unwrap().records.len(), 200);
    }

    #[test]
    fn cleanup_spares_live_and_recent_jobs() {
        let registry = JobRegistry::new();
        let done = registry.create(criteria(), PathBuf::from("downloads/a"));
        registry.set_status(&done.id, JobStatus::Completed);
        let running = registry.create(criteria(), PathBuf::from("downloads/b"));
        registry.set_status(&running.id, JobStatus::Running);

        // Nothing is older than a day yet.
        assert_eq!(registry.cleanup_expired(Duration::from_secs(24 * 3600)), 0);

        // With a zero TTL only the terminal job goes.
        assert_eq!(registry.cleanup_expired(Duration::ZERO), 1);
        assert!(registry.snapshot(&done.id).is_none());
        assert!(registry.snapshot(&running.id).is_some());
    }
}
