//! Window bookkeeping and page-position tracking for one portal session.

use std::collections::HashSet;
use std::time::Duration;

use tracing::warn;

use crate::driver::{UiDriver, WindowHandle};
use crate::error::{AppError, AppResult};
use crate::retry;

/// The windows that legitimately belong to the session: the grid window
/// plus whatever the portal opened before the search began.
pub struct SessionState {
    grid: WindowHandle,
    baseline: HashSet<WindowHandle>,
}

impl SessionState {
    /// Capture the baseline. Call once, after the search form is submitted
    /// and before any row postback fires.
    pub async fn capture<D: UiDriver>(driver: &D) -> AppResult<Self> {
        let handles = driver.window_handles().await?;
        let grid = handles
            .first()
            .cloned()
            .ok_or_else(|| AppError::fatal("no browser windows left"))?;
        Ok(Self {
            grid,
            baseline: handles.into_iter().collect(),
        })
    }

    /// Wait for exactly the window a row postback opens: the first handle
    /// not in the baseline.
    pub async fn wait_for_new_window<D: UiDriver>(
        &self,
        driver: &D,
        timeout: Duration,
        interval: Duration,
    ) -> AppResult<WindowHandle> {
        retry::poll_until(timeout, interval, || async {
            let handles = driver.window_handles().await.ok()?;
            handles.into_iter().find(|h| !self.baseline.contains(h))
        })
        .await
        .ok_or_else(|| AppError::wait_timeout("document window", timeout.as_secs()))
    }

    /// Return focus to the grid and close any window that is neither the
    /// grid nor part of the baseline. Best effort: a handle that already
    /// closed itself is not an error.
    pub async fn restore<D: UiDriver>(&self, driver: &D) -> AppResult<()> {
        let handles = driver.window_handles().await?;
        for handle in handles {
            if !self.baseline.contains(&handle) {
                warn!("closing stray window {}", handle);
                let _ = driver.close_window(&handle).await;
            }
        }
        driver.switch_to(&self.grid).await
    }
}

/// Current position in the result set. Pages only ever move forward.
pub struct PageState {
    current: u32,
    visited: u32,
}

impl PageState {
    pub fn first() -> Self {
        Self {
            current: 1,
            visited: 1,
        }
    }

    pub fn current(&self) -> u32 {
        self.current
    }

    pub fn visited(&self) -> u32 {
        self.visited
    }

    /// Record arrival on `page`. Rejects anything that is not a forward
    /// move, which would mean the pager state machine lost sync.
    pub fn advance_to(&mut self, page: u32) -> AppResult<()> {
        if page <= self.current {
            return Err(AppError::fatal(format!(
                "pager moved backwards: {} after {}",
                page, self.current
            )));
        }
        self.current = page;
        self.visited += 1;
        Ok(())
    }
}
