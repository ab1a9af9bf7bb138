//! `UiDriver` over a live headless Chromium via CDP.

use crate::driver::{PostbackCommand, UiDriver, WindowHandle};
use crate::error::{AppError, AppResult, DriverError};
use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::page::{CaptureScreenshotFormat, PrintToPdfParams};
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::{Browser, Page};
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Drives one browser session. The session owns exactly one long-lived grid
/// window; document windows come and go and are addressed by handle.
pub struct ChromiumDriver {
    browser: Browser,
    /// Window currently receiving element-addressed operations.
    current: Mutex<Page>,
}

impl ChromiumDriver {
    pub fn new(browser: Browser, grid_page: Page) -> Self {
        Self {
            browser,
            current: Mutex::new(grid_page),
        }
    }

    /// Close the browser. Best-effort; a browser that refuses to close is
    /// logged and abandoned.
    pub async fn shutdown(mut self) {
        if let Err(e) = self.browser.close().await {
            warn!("browser did not close cleanly: {}", e);
        }
    }

    async fn page_for(&self, handle: &WindowHandle) -> AppResult<Page> {
        let pages = self.browser.pages().await?;
        pages
            .into_iter()
            .find(|p| p.target_id().inner() == &handle.0)
            .ok_or_else(|| {
                AppError::Driver(DriverError::WindowNotFound {
                    handle: handle.0.clone(),
                })
            })
    }

    fn element_not_found(selector: &str) -> AppError {
        AppError::Driver(DriverError::ElementNotFound {
            selector: selector.to_string(),
        })
    }
}

#[async_trait]
impl UiDriver for ChromiumDriver {
    async fn navigate(&self, url: &str) -> AppResult<()> {
        let page = self.current.lock().await;
        page.goto(url)
            .await
            .map_err(|e| AppError::navigation_failed(url, e))?;
        // Navigation may still be settling; a failed settle is not fatal,
        // the bounded waits downstream cover it.
        if let Err(e) = page.wait_for_navigation().await {
            debug!("wait_for_navigation after {}: {}", url, e);
        }
        Ok(())
    }

    async fn click(&self, selector: &str) -> AppResult<()> {
        let page = self.current.lock().await;
        let element = page
            .find_element(selector)
            .await
            .map_err(|_| Self::element_not_found(selector))?;
        element.click().await?;
        Ok(())
    }

    async fn fill(&self, selector: &str, value: &str) -> AppResult<()> {
        // Set the value directly instead of typing: ASP.NET inputs keep
        // stale text otherwise, and the portal only reads the value on
        // submit.
        let script = format!(
            r#"(() => {{
                const el = document.querySelector({sel});
                if (!el) return false;
                el.value = {val};
                el.dispatchEvent(new Event('input', {{ bubbles: true }}));
                return true;
            }})()"#,
            sel = serde_json::to_string(selector)?,
            val = serde_json::to_string(value)?,
        );
        let page = self.current.lock().await;
        let found: bool = page.evaluate(script).await?.into_value()?;
        if !found {
            return Err(Self::element_not_found(selector));
        }
        Ok(())
    }

    async fn select_by_text(&self, selector: &str, text: &str) -> AppResult<bool> {
        let script = format!(
            r#"(() => {{
                const el = document.querySelector({sel});
                if (!el) return false;
                const wanted = {txt};
                for (const option of el.options) {{
                    if (option.text.trim() === wanted) {{
                        el.value = option.value;
                        el.dispatchEvent(new Event('change', {{ bubbles: true }}));
                        return true;
                    }}
                }}
                return false;
            }})()"#,
            sel = serde_json::to_string(selector)?,
            txt = serde_json::to_string(text)?,
        );
        let page = self.current.lock().await;
        let matched: bool = page.evaluate(script).await?.into_value()?;
        Ok(matched)
    }

    async fn options_count(&self, selector: &str) -> AppResult<usize> {
        let script = format!(
            "document.querySelectorAll({} + ' option').length",
            serde_json::to_string(selector)?
        );
        let page = self.current.lock().await;
        let count: i64 = page.evaluate(script).await?.into_value()?;
        Ok(count.max(0) as usize)
    }

    async fn page_source(&self) -> AppResult<String> {
        let page = self.current.lock().await;
        Ok(page.content().await?)
    }

    async fn screenshot_element(&self, selector: &str) -> AppResult<Vec<u8>> {
        let page = self.current.lock().await;
        let element = page
            .find_element(selector)
            .await
            .map_err(|_| Self::element_not_found(selector))?;
        Ok(element.screenshot(CaptureScreenshotFormat::Png).await?)
    }

    async fn exec_postback(&self, command: &PostbackCommand) -> AppResult<()> {
        let page = self.current.lock().await;
        debug!("postback: {}", command.to_script());
        page.evaluate(command.to_script()).await?;
        Ok(())
    }

    async fn window_handles(&self) -> AppResult<Vec<WindowHandle>> {
        let pages = self.browser.pages().await?;
        let mut handles: Vec<WindowHandle> = pages
            .iter()
            .map(|p| WindowHandle(p.target_id().inner().clone()))
            .collect();
        handles.sort();
        Ok(handles)
    }

    async fn switch_to(&self, handle: &WindowHandle) -> AppResult<()> {
        let page = self.page_for(handle).await?;
        if let Err(e) = page.bring_to_front().await {
            debug!("bring_to_front failed for {}: {}", handle, e);
        }
        *self.current.lock().await = page;
        Ok(())
    }

    async fn close_window(&self, handle: &WindowHandle) -> AppResult<()> {
        let page = self.page_for(handle).await?;
        page.close().await?;
        Ok(())
    }

    async fn print_to_pdf(&self) -> AppResult<Vec<u8>> {
        // A4 with backgrounds, the portal report's native shape.
        let params = PrintToPdfParams {
            print_background: Some(true),
            paper_width: Some(8.27),
            paper_height: Some(11.69),
            margin_top: Some(0.4),
            margin_bottom: Some(0.4),
            scale: Some(1.0),
            ..Default::default()
        };
        let page = self.current.lock().await;
        Ok(page.pdf(params).await?)
    }

    async fn screenshot_page(&self) -> AppResult<Vec<u8>> {
        let page = self.current.lock().await;
        Ok(page
            .screenshot(
                ScreenshotParams::builder()
                    .format(CaptureScreenshotFormat::Png)
                    .full_page(true)
                    .build(),
            )
            .await?)
    }
}
