//! UI driver abstraction - infrastructure layer
//!
//! Holds the scarce browser resource and exposes capabilities only: the
//! navigator never touches CDP types or raw `__doPostBack` strings, it
//! drives a [`UiDriver`]. The trait seam is what lets the whole state
//! machine run against a scripted portal in tests.

mod chromium;

pub use chromium::ChromiumDriver;

use crate::error::AppResult;
use async_trait::async_trait;

/// Grid control name on the portal. Every postback the protocol uses is
/// addressed to it.
pub const GRID_CONTROL: &str = "RegistrationGrid";

/// Rows per result page on the portal.
pub const ROWS_PER_PAGE: usize = 10;

/// Opaque window identifier. One handle per browser window/tab.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WindowHandle(pub String);

impl std::fmt::Display for WindowHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A typed ASP.NET postback: control name plus argument. Serialized to a
/// `__doPostBack` call only at the driver boundary.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PostbackCommand {
    pub control: String,
    pub argument: String,
}

impl PostbackCommand {
    /// Row-open postback for the zero-based row `index` (`indexII$<i>`).
    pub fn row(index: usize) -> Self {
        Self {
            control: GRID_CONTROL.to_string(),
            argument: format!("indexII${}", index),
        }
    }

    /// Pagination postback for 1-based page `n` (`Page$<n>`). The ellipsis
    /// jump is the same command addressed at the first page of the next
    /// block.
    pub fn page(n: u32) -> Self {
        Self {
            control: GRID_CONTROL.to_string(),
            argument: format!("Page${}", n),
        }
    }

    /// The exact script the portal expects.
    pub fn to_script(&self) -> String {
        format!("__doPostBack('{}', '{}')", self.control, self.argument)
    }
}

/// The capabilities the automation engine consumes. One implementor drives
/// a real Chromium ([`ChromiumDriver`]); tests provide a scripted portal.
///
/// Element-addressed operations act on the *current* window; the navigator
/// is responsible for switching before and after document capture.
#[async_trait]
pub trait UiDriver: Send + Sync {
    /// Navigate the current window.
    async fn navigate(&self, url: &str) -> AppResult<()>;

    /// Click the first element matching `selector`.
    async fn click(&self, selector: &str) -> AppResult<()>;

    /// Clear and fill a text input.
    async fn fill(&self, selector: &str, value: &str) -> AppResult<()>;

    /// Select a dropdown option by its visible text, firing the change
    /// event the portal's cascading reload hangs off. Returns false when no
    /// option matched.
    async fn select_by_text(&self, selector: &str, text: &str) -> AppResult<bool>;

    /// Number of options currently present in a dropdown.
    async fn options_count(&self, selector: &str) -> AppResult<usize>;

    /// Full HTML of the current window.
    async fn page_source(&self) -> AppResult<String>;

    /// PNG screenshot of a single element (the CAPTCHA image).
    async fn screenshot_element(&self, selector: &str) -> AppResult<Vec<u8>>;

    /// Execute a typed postback in the current window.
    async fn exec_postback(&self, command: &PostbackCommand) -> AppResult<()>;

    /// All live window handles, in stable order.
    async fn window_handles(&self) -> AppResult<Vec<WindowHandle>>;

    /// Make `handle` the current window.
    async fn switch_to(&self, handle: &WindowHandle) -> AppResult<()>;

    /// Close the window behind `handle`. Closing the current window leaves
    /// the driver pointing at nothing; switch afterwards.
    async fn close_window(&self, handle: &WindowHandle) -> AppResult<()>;

    /// Render the current window to PDF (A4, backgrounds on).
    async fn print_to_pdf(&self) -> AppResult<Vec<u8>>;

    /// PNG screenshot of the whole current window (render fallback).
    async fn screenshot_page(&self) -> AppResult<Vec<u8>>;
}
