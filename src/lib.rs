//! Automated retrieval of Index II property-registration extracts from the
//! Maharashtra IGR free-search portal.
//!
//! The crate is layered; each layer only calls downward:
//!
//! - **Infrastructure**: [`browser`] (headless Chromium lifecycle),
//!   [`driver`] (the [`driver::UiDriver`] capability seam over CDP),
//!   [`locations`] (district/tahsil/village data), [`config`], [`error`].
//! - **Capability**: [`captcha`] (preprocessing ensemble + OCR),
//!   [`grid`] (result-grid parsing and pagination planning),
//!   [`retriever`] (document window capture), [`registry`] (job state).
//! - **Workflow**: [`navigator`] (the per-job state machine: form fill,
//!   CAPTCHA gate, page/row walk).
//! - **Orchestration**: [`orchestrator`] (job submission, concurrency
//!   bounds, lifecycle reporting).

pub mod browser;
pub mod captcha;
pub mod config;
pub mod driver;
pub mod error;
pub mod grid;
pub mod locations;
pub mod models;
pub mod navigator;
pub mod orchestrator;
pub mod registry;
pub mod retriever;
pub mod retry;
pub mod utils;

pub use captcha::{CaptchaSolver, OcrEngine, TesseractOcr};
pub use config::{Config, OverwritePolicy};
pub use driver::{ChromiumDriver, PostbackCommand, UiDriver, WindowHandle};
pub use error::{AppError, AppResult};
pub use locations::LocationIndex;
pub use models::{DocumentRecord, DocumentStatus, JobOutcome, JobStatus, SearchCriteria};
pub use navigator::Navigator;
pub use orchestrator::{App, JobHandle};
pub use registry::{Job, JobRegistry};
pub use retriever::DocumentRetriever;
