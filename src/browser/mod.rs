//! Browser lifecycle - infrastructure layer
//!
//! One headless Chromium per job. The CDP event handler is drained on a
//! background task for as long as the browser lives.

use crate::error::{AppError, AppResult};
use std::path::Path;

use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use tokio::time::sleep;
use tracing::{debug, error, info};

/// Launch a headless browser and open the portal entry page.
pub async fn launch(url: &str, chrome_executable: Option<&str>) -> AppResult<(Browser, Page)> {
    info!("🚀 launching headless browser...");
    debug!("portal URL: {}", url);

    let mut builder = BrowserConfig::builder().new_headless_mode().args(vec![
        "--disable-gpu",
        "--no-sandbox",
        "--disable-dev-shm-usage",
        "--remote-debugging-port=0",
    ]);
    if let Some(path) = chrome_executable {
        builder = builder.chrome_executable(Path::new(path));
    }
    let config = builder.build().map_err(|e| {
        error!("failed to configure browser: {}", e);
        AppError::Other(format!("failed to configure browser: {}", e))
    })?;

    let (browser, mut handler) = Browser::launch(config).await.map_err(|e| {
        error!("failed to launch browser: {}", e);
        AppError::launch_failed(e)
    })?;
    debug!("browser launched");

    // Drain CDP events in the background.
    tokio::spawn(async move {
        while let Some(event) = handler.next().await {
            if event.is_err() {
                break;
            }
        }
    });

    // Give the browser a moment to settle before the first command.
    sleep(tokio::time::Duration::from_millis(300)).await;

    let page = browser.new_page(url).await.map_err(|e| {
        error!("failed to open portal page: {}", e);
        AppError::navigation_failed(url, e)
    })?;

    info!("✓ portal opened: {}", url);
    Ok((browser, page))
}
