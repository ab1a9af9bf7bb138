//! Document retrieval - capability layer
//!
//! Captures the content of a transient document window to disk. The
//! navigator has already switched the driver into the window; this module
//! only waits for the render, picks a deterministic path, and persists.

use std::path::{Path, PathBuf};
use std::time::Duration;

use scraper::{Html, Selector};
use tracing::{debug, warn};

use crate::config::OverwritePolicy;
use crate::driver::UiDriver;
use crate::error::RetrievalError;
use crate::models::DocumentStatus;
use crate::retry;

/// Everything needed to name and place one document.
pub struct RetrieveRequest<'a> {
    /// 1-based result page the row came from.
    pub page: u32,
    /// Zero-based row index on that page.
    pub row_index: usize,
    pub property_no: &'a str,
    pub dest_dir: &'a Path,
}

pub struct DocumentRetriever {
    load_timeout: Duration,
    poll_interval: Duration,
    policy: OverwritePolicy,
}

impl DocumentRetriever {
    pub fn new(load_timeout: Duration, poll_interval: Duration, policy: OverwritePolicy) -> Self {
        Self {
            load_timeout,
            poll_interval,
            policy,
        }
    }

    /// Capture the current window's document.
    ///
    /// Rendering prefers PDF; when printing fails a full-page screenshot is
    /// kept instead, under the same name with a `.png` extension. The same
    /// request always maps to the same path, so a rerun under the skip
    /// policy leaves existing files alone.
    pub async fn retrieve<D: UiDriver>(
        &self,
        driver: &D,
        req: &RetrieveRequest<'_>,
    ) -> Result<(PathBuf, DocumentStatus), RetrievalError> {
        let html = retry::poll_until(self.load_timeout, self.poll_interval, || async {
            match driver.page_source().await {
                Ok(html) if html.contains("</html>") => Some(html),
                _ => None,
            }
        })
        .await
        .ok_or(RetrievalError::Timeout {
            secs: self.load_timeout.as_secs(),
        })?;

        if body_text(&html).is_empty() {
            return Err(RetrievalError::EmptyContent);
        }

        let pdf_path = target_path(req, "pdf");
        if matches!(self.policy, OverwritePolicy::Skip) {
            for existing in [&pdf_path, &target_path(req, "png")] {
                if existing.exists() {
                    debug!("document already on disk: {}", existing.display());
                    return Ok((existing.clone(), DocumentStatus::Skipped));
                }
            }
        }

        tokio::fs::create_dir_all(req.dest_dir)
            .await
            .map_err(|e| RetrievalError::RenderError {
                message: format!("cannot create {}: {}", req.dest_dir.display(), e),
            })?;

        match driver.print_to_pdf().await {
            Ok(pdf) if !pdf.is_empty() => {
                write_bytes(&pdf_path, &pdf).await?;
                Ok((pdf_path, DocumentStatus::Succeeded))
            }
            Ok(_) => Err(RetrievalError::EmptyContent),
            Err(e) => {
                warn!("⚠️ PDF render failed ({}), falling back to screenshot", e);
                let png = driver
                    .screenshot_page()
                    .await
                    .map_err(|e2| RetrievalError::RenderError {
                        message: format!("pdf failed ({}); screenshot failed ({})", e, e2),
                    })?;
                if png.is_empty() {
                    return Err(RetrievalError::EmptyContent);
                }
                let png_path = target_path(req, "png");
                write_bytes(&png_path, &png).await?;
                Ok((png_path, DocumentStatus::Succeeded))
            }
        }
    }
}

/// Deterministic per-row path: `document_<property>_<page>_<row>.<ext>`,
/// page zero-padded so listings sort in visit order.
fn target_path(req: &RetrieveRequest<'_>, ext: &str) -> PathBuf {
    let safe: String = req
        .property_no
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    req.dest_dir.join(format!(
        "document_{}_{:02}_{}.{}",
        safe, req.page, req.row_index, ext
    ))
}

fn body_text(html: &str) -> String {
    let doc = Html::parse_document(html);
    let body = Selector::parse("body").unwrap();
    doc.select(&body)
        .next()
        .map(|b| b.text().collect::<String>().trim().to_string())
        .unwrap_or_default()
}

async fn write_bytes(path: &Path, bytes: &[u8]) -> Result<(), RetrievalError> {
    tokio::fs::write(path, bytes)
        .await
        .map_err(|e| RetrievalError::RenderError {
            message: format!("cannot write {}: {}", path.display(), e),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::{PostbackCommand, WindowHandle};
    use crate::error::{AppError, AppResult};
    use async_trait::async_trait;

    /// A driver permanently parked on one rendered document window.
    struct DocWindow {
        html: String,
        pdf: AppResult<Vec<u8>>,
        png: AppResult<Vec<u8>>,
    }

    impl DocWindow {
        fn rendered(pdf: AppResult<Vec<u8>>, png: AppResult<Vec<u8>>) -> Self {
            Self {
                html: "<html><body>Index II extract</body></html>".into(),
                pdf,
                png,
            }
        }
    }

    fn clone_result(r: &AppResult<Vec<u8>>) -> AppResult<Vec<u8>> {
        match r {
            Ok(v) => Ok(v.clone()),
            Err(e) => Err(AppError::Other(e.to_string())),
        }
    }

    #[async_trait]
    impl UiDriver for DocWindow {
        async fn navigate(&self, _url: &str) -> AppResult<()> {
            Ok(())
        }
        async fn click(&self, _selector: &str) -> AppResult<()> {
            Ok(())
        }
        async fn fill(&self, _selector: &str, _value: &str) -> AppResult<()> {
            Ok(())
        }
        async fn select_by_text(&self, _selector: &str, _text: &str) -> AppResult<bool> {
            Ok(false)
        }
        async fn options_count(&self, _selector: &str) -> AppResult<usize> {
            Ok(0)
        }
        async fn page_source(&self) -> AppResult<String> {
            Ok(self.html.clone())
        }
        async fn screenshot_element(&self, _selector: &str) -> AppResult<Vec<u8>> {
            Ok(Vec::new())
        }
        async fn exec_postback(&self, _command: &PostbackCommand) -> AppResult<()> {
            Ok(())
        }
        async fn window_handles(&self) -> AppResult<Vec<WindowHandle>> {
            Ok(Vec::new())
        }
        async fn switch_to(&self, _handle: &WindowHandle) -> AppResult<()> {
            Ok(())
        }
        async fn close_window(&self, _handle: &WindowHandle) -> AppResult<()> {
            Ok(())
        }
        async fn print_to_pdf(&self) -> AppResult<Vec<u8>> {
            clone_result(&self.pdf)
        }
        async fn screenshot_page(&self) -> AppResult<Vec<u8>> {
            clone_result(&self.png)
        }
    }

    fn retriever(policy: OverwritePolicy) -> DocumentRetriever {
        DocumentRetriever::new(
            Duration::from_secs(2),
            Duration::from_millis(10),
            policy,
        )
    }

    #[tokio::test]
    async fn pdf_path_is_deterministic_and_sanitized() {
        let dir = tempfile::tempdir().unwrap();
        let req = RetrieveRequest {
            page: 3,
            row_index: 7,
            property_no: "123/456 A",
            dest_dir: dir.path(),
        };
        assert_eq!(
            target_path(&req, "pdf"),
            dir.path().join("document_123_456_A_03_7.pdf")
        );
    }

    #[tokio::test]
    async fn successful_render_writes_pdf() {
        let dir = tempfile::tempdir().unwrap();
        let driver = DocWindow::rendered(Ok(b"%PDF-1.7 stub".to_vec()), Ok(Vec::new()));
        let req = RetrieveRequest {
            page: 1,
            row_index: 0,
            property_no: "99",
            dest_dir: dir.path(),
        };
        let (path, status) = retriever(OverwritePolicy::Skip)
            .retrieve(&driver, &req)
            .await
            .unwrap();
        assert_eq!(status, DocumentStatus::Succeeded);
        assert_eq!(std::fs::read(path).unwrap(), b"%PDF-1.7 stub");
    }

    #[tokio::test]
    async fn skip_policy_leaves_existing_file_alone() {
        let dir = tempfile::tempdir().unwrap();
        let req = RetrieveRequest {
            page: 1,
            row_index: 0,
            property_no: "99",
            dest_dir: dir.path(),
        };
        let existing = target_path(&req, "pdf");
        std::fs::write(&existing, b"earlier run").unwrap();

        let driver = DocWindow::rendered(Ok(b"new bytes".to_vec()), Ok(Vec::new()));
        let (path, status) = retriever(OverwritePolicy::Skip)
            .retrieve(&driver, &req)
            .await
            .unwrap();
        assert_eq!(status, DocumentStatus::Skipped);
        assert_eq!(std::fs::read(&path).unwrap(), b"earlier run");

        let (_, status) = retriever(OverwritePolicy::Overwrite)
            .retrieve(&driver, &req)
            .await
            .unwrap();
        assert_eq!(status, DocumentStatus::Succeeded);
        assert_eq!(std::fs::read(&existing).unwrap(), b"new bytes");
    }

    #[tokio::test]
    async fn pdf_failure_falls_back_to_screenshot() {
        let dir = tempfile::tempdir().unwrap();
        let driver = DocWindow::rendered(
            Err(AppError::Other("print refused".into())),
            Ok(b"\x89PNG stub".to_vec()),
        );
        let req = RetrieveRequest {
            page: 2,
            row_index: 4,
            property_no: "7",
            dest_dir: dir.path(),
        };
        let (path, status) = retriever(OverwritePolicy::Skip)
            .retrieve(&driver, &req)
            .await
            .unwrap();
        assert_eq!(status, DocumentStatus::Succeeded);
        assert_eq!(path.extension().unwrap(), "png");
        assert!(path.exists());
    }

    #[tokio::test]
    async fn double_render_failure_is_a_render_error() {
        let dir = tempfile::tempdir().unwrap();
        let driver = DocWindow::rendered(
            Err(AppError::Other("print refused".into())),
            Err(AppError::Other("capture refused".into())),
        );
        let req = RetrieveRequest {
            page: 1,
            row_index: 1,
            property_no: "7",
            dest_dir: dir.path(),
        };
        let err = retriever(OverwritePolicy::Skip)
            .retrieve(&driver, &req)
            .await
            .unwrap_err();
        assert!(matches!(err, RetrievalError::RenderError { .. }));
    }

    #[tokio::test]
    async fn blank_window_is_empty_content() {
        let driver = DocWindow {
            html: "<html><body>   </body></html>".into(),
            pdf: Ok(Vec::new()),
            png: Ok(Vec::new()),
        };
        let dir = tempfile::tempdir().unwrap();
        let req = RetrieveRequest {
            page: 1,
            row_index: 0,
            property_no: "1",
            dest_dir: dir.path(),
        };
        let err = retriever(OverwritePolicy::Skip)
            .retrieve(&driver, &req)
            .await
            .unwrap_err();
        assert!(matches!(err, RetrievalError::EmptyContent));
    }
}
