use std::time::Duration;

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config {
    /// Portal entry URL
    pub portal_url: String,
    /// Maximum solve-and-submit CAPTCHA cycles per job
    pub max_captcha_retries: u32,
    /// Maximum attempts per result row before it is recorded as failed
    pub row_retry_limit: u32,
    /// Bound on waiting for a cascading dropdown to repopulate
    pub dropdown_wait: Duration,
    /// Bound on waiting for a document window to appear after a row postback
    pub new_window_wait: Duration,
    /// Bound on waiting for a document window's content to load
    pub document_load_wait: Duration,
    /// Bound on waiting for the result grid after a CAPTCHA submission
    pub submit_wait: Duration,
    /// Interval between polls inside any bounded wait
    pub poll_interval: Duration,
    /// Root directory for job output folders
    pub downloads_dir: String,
    /// What to do when a document file already exists
    pub overwrite_policy: OverwritePolicy,
    /// Path to the tesseract binary
    pub tesseract_path: String,
    /// Path to the district/tahsil/village JSON file
    pub locations_file: String,
    /// Optional explicit chrome/chromium executable
    pub chrome_executable: Option<String>,
    /// How many jobs may run concurrently (one browser each)
    pub max_concurrent_jobs: usize,
    /// Keep preprocessed captcha images and other debug artifacts
    pub keep_debug_artifacts: bool,
    /// Jobs older than this are eligible for cleanup
    pub job_ttl: Duration,
}

/// Persist behavior when the destination file already exists.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OverwritePolicy {
    Overwrite,
    Skip,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            portal_url: "https://freesearchigrservice.maharashtra.gov.in/".to_string(),
            max_captcha_retries: 5,
            row_retry_limit: 3,
            dropdown_wait: Duration::from_secs(10),
            new_window_wait: Duration::from_secs(15),
            document_load_wait: Duration::from_secs(15),
            submit_wait: Duration::from_secs(30),
            poll_interval: Duration::from_millis(500),
            downloads_dir: "downloads".to_string(),
            overwrite_policy: OverwritePolicy::Skip,
            tesseract_path: default_tesseract_path(),
            locations_file: "maharashtra_locations.json".to_string(),
            chrome_executable: None,
            max_concurrent_jobs: 3,
            keep_debug_artifacts: false,
            job_ttl: Duration::from_secs(24 * 3600),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            portal_url: std::env::var("PORTAL_URL").unwrap_or(default.portal_url),
            max_captcha_retries: env_parse("MAX_CAPTCHA_RETRIES", default.max_captcha_retries),
            row_retry_limit: env_parse("ROW_RETRY_LIMIT", default.row_retry_limit),
            dropdown_wait: env_secs("DROPDOWN_WAIT_SECS", default.dropdown_wait),
            new_window_wait: env_secs("NEW_WINDOW_WAIT_SECS", default.new_window_wait),
            document_load_wait: env_secs("DOCUMENT_LOAD_WAIT_SECS", default.document_load_wait),
            submit_wait: env_secs("SUBMIT_WAIT_SECS", default.submit_wait),
            poll_interval: std::env::var("POLL_INTERVAL_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(default.poll_interval),
            downloads_dir: std::env::var("DOWNLOADS_DIR").unwrap_or(default.downloads_dir),
            overwrite_policy: match std::env::var("OVERWRITE_POLICY").as_deref() {
                Ok("overwrite") => OverwritePolicy::Overwrite,
                Ok("skip") => OverwritePolicy::Skip,
                _ => default.overwrite_policy,
            },
            tesseract_path: std::env::var("TESSERACT_PATH").unwrap_or(default.tesseract_path),
            locations_file: std::env::var("LOCATIONS_FILE").unwrap_or(default.locations_file),
            chrome_executable: std::env::var("CHROME_EXECUTABLE").ok(),
            max_concurrent_jobs: env_parse("MAX_CONCURRENT_JOBS", default.max_concurrent_jobs),
            keep_debug_artifacts: env_parse("KEEP_DEBUG_ARTIFACTS", default.keep_debug_artifacts),
            job_ttl: env_secs("JOB_TTL_SECS", default.job_ttl),
        }
    }
}

fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_secs(name: &str, default: Duration) -> Duration {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .map(Duration::from_secs)
        .unwrap_or(default)
}

/// Tesseract install location by OS, overridable via `TESSERACT_PATH`.
fn default_tesseract_path() -> String {
    if cfg!(target_os = "windows") {
        r"C:\Program Files\Tesseract-OCR\tesseract.exe".to_string()
    } else if cfg!(target_os = "macos") {
        "/usr/local/bin/tesseract".to_string()
    } else {
        "/usr/bin/tesseract".to_string()
    }
}
