//! Search navigation - workflow layer
//!
//! Drives one job end to end against an already-open portal: form fill,
//! CAPTCHA submission, then the page/row walk that captures every listed
//! document. Owns no browser state of its own; everything goes through the
//! [`UiDriver`] seam, which is also how the whole machine runs under test.

pub mod form;
mod session;

use std::path::{Path, PathBuf};

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::captcha::{CaptchaSolver, OcrEngine};
use crate::config::Config;
use crate::driver::{PostbackCommand, UiDriver};
use crate::error::{AppError, AppResult, CaptchaError};
use crate::grid;
use crate::models::{DocumentRecord, DocumentStatus, JobOutcome, JobStatus, SearchCriteria};
use crate::retriever::{DocumentRetriever, RetrieveRequest};
use crate::retry;

use form::{SEL_CAPTCHA_IMAGE, SEL_CAPTCHA_INPUT, SEL_SEARCH_BUTTON};
use session::{PageState, SessionState};

/// What a CAPTCHA-gated form submission resolved to.
enum SearchOutcome {
    Results,
    NoRecords,
}

/// One response poll after clicking search.
enum SubmitSignal {
    Grid,
    NoRecords,
    Rejected(String),
}

/// What a page-advance attempt resolved to. Cancellation and the last page
/// are different terminal outcomes and must not be conflated.
enum PageAdvance {
    Next(u32),
    LastPage,
    Cancelled,
}

/// How the page/row walk ended.
enum WalkEnd {
    Done,
    Cancelled,
    Error(AppError),
}

pub struct Navigator<'a, D: UiDriver, O: OcrEngine> {
    driver: &'a D,
    solver: &'a CaptchaSolver<O>,
    retriever: &'a DocumentRetriever,
    config: &'a Config,
    cancel: CancellationToken,
}

impl<'a, D: UiDriver, O: OcrEngine> Navigator<'a, D, O> {
    pub fn new(
        driver: &'a D,
        solver: &'a CaptchaSolver<O>,
        retriever: &'a DocumentRetriever,
        config: &'a Config,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            driver,
            solver,
            retriever,
            config,
            cancel,
        }
    }

    /// Run one job. Returns a terminal outcome for every path except a
    /// fatal driver error; row-level trouble becomes failed records, not
    /// job failure.
    pub async fn run(&self, criteria: &SearchCriteria, job_dir: &Path) -> AppResult<JobOutcome> {
        form::open_portal(self.driver, self.config).await?;
        form::fill_form(self.driver, self.config, criteria).await?;

        match self.submit_with_captcha().await? {
            SearchOutcome::NoRecords => {
                info!("portal reported no records for these criteria");
                return Ok(JobOutcome::new(JobStatus::NoResults, Vec::new(), 0));
            }
            SearchOutcome::Results => {}
        }

        let session = SessionState::capture(self.driver).await?;
        let mut pages = PageState::first();
        let mut records = Vec::new();

        // Errors inside the walk become a failed outcome instead of
        // propagating, so the records captured so far survive.
        let end = loop {
            match self
                .process_page(&session, pages.current(), criteria, job_dir, &mut records)
                .await
            {
                Ok(false) => {}
                Ok(true) => break WalkEnd::Cancelled,
                Err(e) => break WalkEnd::Error(e),
            }

            match self.advance_page(pages.current()).await {
                Ok(PageAdvance::Next(next)) => {
                    if let Err(e) = pages.advance_to(next) {
                        break WalkEnd::Error(e);
                    }
                }
                Ok(PageAdvance::LastPage) => break WalkEnd::Done,
                Ok(PageAdvance::Cancelled) => break WalkEnd::Cancelled,
                Err(e) => break WalkEnd::Error(e),
            }
        };

        match end {
            WalkEnd::Cancelled => {
                let _ = session.restore(self.driver).await;
                info!("job cancelled after {} page(s)", pages.visited());
                Ok(JobOutcome {
                    status: JobStatus::Cancelled,
                    records,
                    pages_visited: pages.visited(),
                    error: None,
                })
            }
            WalkEnd::Error(e) => {
                warn!("walk aborted on page {}: {}", pages.current(), e);
                let _ = session.restore(self.driver).await;
                Ok(JobOutcome::failed(records, pages.visited(), e.to_string()))
            }
            WalkEnd::Done => {
                info!(
                    "✓ walk finished: {} page(s), {} record(s)",
                    pages.visited(),
                    records.len()
                );
                Ok(JobOutcome::new(
                    JobStatus::Completed,
                    records,
                    pages.visited(),
                ))
            }
        }
    }

    /// Solve-and-submit cycle, bounded by `max_captcha_retries`. Each cycle
    /// screenshots the current CAPTCHA; after a rejection the portal
    /// renders a fresh one.
    async fn submit_with_captcha(&self) -> AppResult<SearchOutcome> {
        let budget = self.config.max_captcha_retries;
        for attempt in 1..=budget {
            let png = self.driver.screenshot_element(SEL_CAPTCHA_IMAGE).await?;
            let solved = match self.solver.solve(&png, attempt).await {
                Ok(attempt) => attempt,
                Err(CaptchaError::OcrExhausted { techniques }) => {
                    warn!(
                        "attempt {}/{}: no readable text from {} techniques",
                        attempt, budget, techniques
                    );
                    continue;
                }
                Err(e) => return Err(e.into()),
            };
            info!(
                "captcha attempt {}/{}: submitting '{}'",
                attempt, budget, solved.accepted
            );

            self.driver.fill(SEL_CAPTCHA_INPUT, &solved.accepted).await?;
            self.driver.click(SEL_SEARCH_BUTTON).await?;

            let signal = retry::poll_until(
                self.config.submit_wait,
                self.config.poll_interval,
                || async {
                    let html = self.driver.page_source().await.ok()?;
                    if grid::parse_grid(&html).is_some() {
                        Some(SubmitSignal::Grid)
                    } else if grid::no_records_banner(&html) {
                        Some(SubmitSignal::NoRecords)
                    } else {
                        grid::error_banner(&html).map(SubmitSignal::Rejected)
                    }
                },
            )
            .await;

            match signal {
                Some(SubmitSignal::Grid) => return Ok(SearchOutcome::Results),
                Some(SubmitSignal::NoRecords) => return Ok(SearchOutcome::NoRecords),
                Some(SubmitSignal::Rejected(msg)) => {
                    warn!("attempt {}/{} rejected: {}", attempt, budget, msg);
                }
                None => {
                    warn!(
                        "attempt {}/{}: no response within {}s",
                        attempt,
                        budget,
                        self.config.submit_wait.as_secs()
                    );
                }
            }
        }
        Err(CaptchaError::Exhausted { attempts: budget }.into())
    }

    /// Capture every row on the current page. Returns true when the job
    /// was cancelled mid-page.
    async fn process_page(
        &self,
        session: &SessionState,
        page: u32,
        criteria: &SearchCriteria,
        job_dir: &Path,
        records: &mut Vec<DocumentRecord>,
    ) -> AppResult<bool> {
        let html = self.driver.page_source().await?;
        let snapshot = grid::parse_grid(&html)
            .ok_or_else(|| AppError::fatal("results grid disappeared mid-walk"))?;
        info!("page {}: {} row(s)", page, snapshot.row_count);

        for row in 0..snapshot.row_count {
            if self.cancel.is_cancelled() {
                return Ok(true);
            }

            let what = format!("row {} on page {}", row, page);
            // A fatal error means the session itself is broken; retrying
            // the postback against it would only fire blind.
            let result = retry::bounded_when(
                &what,
                self.config.row_retry_limit,
                |e: &AppError| !e.is_fatal(),
                |_| self.capture_row(session, page, row, criteria, job_dir),
            )
            .await;

            match result {
                Ok((path, DocumentStatus::Skipped)) => {
                    records.push(DocumentRecord::skipped(row, page, path));
                }
                Ok((path, _)) => {
                    info!("✓ captured {}", path.display());
                    records.push(DocumentRecord::succeeded(row, page, path));
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    warn!("❌ giving up on {}: {}", what, e);
                    records.push(DocumentRecord::failed(row, page, e.to_string()));
                }
            }
        }
        Ok(false)
    }

    /// One capture attempt for one row. Whatever happens inside, the
    /// session is restored to the grid window before returning; failing
    /// to restore means the walk cannot continue and is fatal.
    async fn capture_row(
        &self,
        session: &SessionState,
        page: u32,
        row: usize,
        criteria: &SearchCriteria,
        job_dir: &Path,
    ) -> AppResult<(PathBuf, DocumentStatus)> {
        let result = self
            .open_and_retrieve(session, page, row, criteria, job_dir)
            .await;
        if let Err(e) = session.restore(self.driver).await {
            return Err(AppError::fatal(format!("lost the grid window: {}", e)));
        }
        result
    }

    async fn open_and_retrieve(
        &self,
        session: &SessionState,
        page: u32,
        row: usize,
        criteria: &SearchCriteria,
        job_dir: &Path,
    ) -> AppResult<(PathBuf, DocumentStatus)> {
        self.driver
            .exec_postback(&PostbackCommand::row(row))
            .await?;
        let window = session
            .wait_for_new_window(self.driver, self.config.new_window_wait, self.config.poll_interval)
            .await?;
        self.driver.switch_to(&window).await?;

        let request = RetrieveRequest {
            page,
            row_index: row,
            property_no: &criteria.property_no,
            dest_dir: job_dir,
        };
        let result = self.retriever.retrieve(self.driver, &request).await;
        let _ = self.driver.close_window(&window).await;
        Ok(result?)
    }

    /// Plan and execute the move to the next page.
    async fn advance_page(&self, current: u32) -> AppResult<PageAdvance> {
        if self.cancel.is_cancelled() {
            return Ok(PageAdvance::Cancelled);
        }

        let html = self.driver.page_source().await?;
        let snapshot = grid::parse_grid(&html)
            .ok_or_else(|| AppError::fatal("results grid disappeared mid-walk"))?;

        let Some(command) = grid::plan_next_page(current, &snapshot.pager) else {
            return Ok(PageAdvance::LastPage);
        };
        let target: u32 = command
            .argument
            .strip_prefix("Page$")
            .and_then(|n| n.parse().ok())
            .ok_or_else(|| AppError::fatal(format!("malformed page command: {}", command.argument)))?;

        info!("advancing to page {}", target);
        self.driver.exec_postback(&command).await?;

        retry::poll_until(self.config.submit_wait, self.config.poll_interval, || async {
            let html = self.driver.page_source().await.ok()?;
            let snap = grid::parse_grid(&html)?;
            (snap.current_page == Some(target)).then_some(())
        })
        .await
        .ok_or_else(|| {
            AppError::wait_timeout(
                format!("page {} to render", target),
                self.config.submit_wait.as_secs(),
            )
        })?;

        Ok(PageAdvance::Next(target))
    }
}
