//! Application orchestration - top layer
//!
//! Owns the long-lived pieces (config, location data, job registry) and
//! turns submitted criteria into running jobs. Each job gets its own
//! browser; a semaphore bounds how many run at once, and a cancellation
//! token lets callers stop a job between rows.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::browser;
use crate::captcha::{CaptchaSolver, TesseractOcr};
use crate::config::Config;
use crate::driver::ChromiumDriver;
use crate::error::AppResult;
use crate::locations::LocationIndex;
use crate::models::{JobOutcome, JobStatus, SearchCriteria};
use crate::navigator::Navigator;
use crate::registry::{Job, JobRegistry};
use crate::retriever::DocumentRetriever;

pub struct App {
    config: Config,
    registry: Arc<JobRegistry>,
    locations: Arc<LocationIndex>,
    semaphore: Arc<Semaphore>,
}

/// Caller-side handle for one submitted job.
pub struct JobHandle {
    pub job_id: String,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl JobHandle {
    /// Request a stop. The job finishes its current row, restores the
    /// session, and lands in `Cancelled` with whatever it captured so far.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub async fn wait(self) {
        let _ = self.task.await;
    }
}

impl App {
    /// Load location data and set up the shared state. No browser is
    /// launched until a job is submitted.
    pub fn initialize(config: Config) -> AppResult<Self> {
        log_banner("document fetcher starting");
        let locations = Arc::new(LocationIndex::from_file(&config.locations_file)?);
        let semaphore = Arc::new(Semaphore::new(config.max_concurrent_jobs));
        info!(
            "✓ initialized: up to {} concurrent job(s), output under {}",
            config.max_concurrent_jobs, config.downloads_dir
        );
        Ok(Self {
            config,
            registry: Arc::new(JobRegistry::new()),
            locations,
            semaphore,
        })
    }

    /// Validate criteria and start a job. Validation failures surface
    /// immediately; everything past this point is reported through the
    /// registry.
    pub fn submit(&self, criteria: SearchCriteria) -> AppResult<JobHandle> {
        self.locations.validate(&criteria)?;

        let job_dir = PathBuf::from(&self.config.downloads_dir).join(criteria.folder_slug());
        let job = self.registry.create(criteria.clone(), job_dir.clone());
        info!("job {} accepted -> {}", job.id, job_dir.display());

        let cancel = CancellationToken::new();
        let task = tokio::spawn(job_task(
            self.config.clone(),
            Arc::clone(&self.registry),
            Arc::clone(&self.semaphore),
            job.id.clone(),
            criteria,
            job_dir,
            cancel.clone(),
        ));

        Ok(JobHandle {
            job_id: job.id,
            cancel,
            task,
        })
    }

    /// Submit and wait for the terminal state.
    pub async fn run_to_completion(&self, criteria: SearchCriteria) -> AppResult<Job> {
        let handle = self.submit(criteria)?;
        let id = handle.job_id.clone();
        handle.wait().await;
        let job = self
            .registry
            .snapshot(&id)
            .ok_or_else(|| crate::error::AppError::Other(format!("job {} not found", id)))?;
        log_outcome(&job);
        Ok(job)
    }

    pub fn status(&self, job_id: &str) -> Option<Job> {
        self.registry.snapshot(job_id)
    }

    pub fn jobs(&self) -> Vec<Job> {
        self.registry.list()
    }

    /// Drop finished jobs older than the configured TTL.
    pub fn cleanup(&self) -> usize {
        self.registry.cleanup_expired(self.config.job_ttl)
    }
}

async fn job_task(
    config: Config,
    registry: Arc<JobRegistry>,
    semaphore: Arc<Semaphore>,
    job_id: String,
    criteria: SearchCriteria,
    job_dir: PathBuf,
    cancel: CancellationToken,
) {
    let permit = tokio::select! {
        permit = semaphore.acquire_owned() => match permit {
            Ok(p) => p,
            Err(_) => {
                registry.record_error(&job_id, "job queue shut down");
                return;
            }
        },
        _ = cancel.cancelled() => {
            info!("job {} cancelled while queued", job_id);
            registry.set_status(&job_id, JobStatus::Cancelled);
            return;
        }
    };

    registry.set_status(&job_id, JobStatus::Running);
    info!("job {} running", job_id);

    match run_job(&config, &criteria, &job_dir, cancel).await {
        Ok(outcome) => {
            for record in outcome.records {
                registry.append_record(&job_id, record);
            }
            registry.set_pages_visited(&job_id, outcome.pages_visited);
            match outcome.error {
                Some(reason) => {
                    error!("❌ job {} failed: {}", job_id, reason);
                    registry.record_error(&job_id, reason);
                }
                None => {
                    registry.set_status(&job_id, outcome.status);
                    info!("job {} finished: {}", job_id, outcome.status);
                }
            }
        }
        Err(e) => {
            error!("❌ job {} failed: {}", job_id, e);
            registry.record_error(&job_id, e.to_string());
        }
    }

    drop(permit);
}

/// One browser, one navigator run, always a shutdown.
async fn run_job(
    config: &Config,
    criteria: &SearchCriteria,
    job_dir: &PathBuf,
    cancel: CancellationToken,
) -> AppResult<JobOutcome> {
    let (browser, page) =
        browser::launch(&config.portal_url, config.chrome_executable.as_deref()).await?;
    let driver = ChromiumDriver::new(browser, page);

    let mut solver = CaptchaSolver::new(TesseractOcr::new(&config.tesseract_path));
    if config.keep_debug_artifacts {
        let debug_dir = job_dir.join("captcha_debug");
        tokio::fs::create_dir_all(&debug_dir).await?;
        solver = solver.with_debug_dir(debug_dir);
    }

    let retriever = DocumentRetriever::new(
        config.document_load_wait,
        config.poll_interval,
        config.overwrite_policy,
    );
    let navigator = Navigator::new(&driver, &solver, &retriever, config, cancel);
    let result = navigator.run(criteria, job_dir).await;

    driver.shutdown().await;
    result
}

// ========== progress logging ==========

fn log_banner(title: &str) {
    info!("{}", "=".repeat(60));
    info!("🚀 {}", title);
    info!("{}", "=".repeat(60));
}

fn log_outcome(job: &Job) {
    info!("{}", "=".repeat(60));
    info!("job {}: {}", job.id, job.status);
    let downloaded = job
        .records
        .iter()
        .filter(|r| r.status == crate::models::DocumentStatus::Succeeded)
        .count();
    let skipped = job
        .records
        .iter()
        .filter(|r| r.status == crate::models::DocumentStatus::Skipped)
        .count();
    let failed = job.records.len() - downloaded - skipped;
    info!(
        "pages: {} | downloaded: {} | skipped: {} | failed: {}",
        job.pages_visited, downloaded, skipped, failed
    );
    if let Some(err) = &job.error {
        info!("reason: {}", err);
    }
    info!("{}", "=".repeat(60));
}
