use std::fmt;

/// Top-level application error.
#[derive(Debug)]
pub enum AppError {
    /// Browser / UI driver errors
    Driver(DriverError),
    /// CAPTCHA solving errors
    Captcha(CaptchaError),
    /// Document retrieval errors
    Retrieval(RetrievalError),
    /// File system errors
    File(FileError),
    /// Configuration errors
    Config(ConfigError),
    /// Search criteria that fail location validation
    InvalidCriteria { field: &'static str, value: String },
    /// Anything else (wraps third-party errors)
    Other(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Driver(e) => write!(f, "driver error: {}", e),
            AppError::Captcha(e) => write!(f, "captcha error: {}", e),
            AppError::Retrieval(e) => write!(f, "retrieval error: {}", e),
            AppError::File(e) => write!(f, "file error: {}", e),
            AppError::Config(e) => write!(f, "config error: {}", e),
            AppError::InvalidCriteria { field, value } => {
                write!(f, "invalid search criteria: {} '{}' is not known", field, value)
            }
            AppError::Other(msg) => write!(f, "error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Driver(e) => Some(e),
            AppError::Captcha(e) => Some(e),
            AppError::Retrieval(e) => Some(e),
            AppError::File(e) => Some(e),
            AppError::Config(e) => Some(e),
            AppError::InvalidCriteria { .. } | AppError::Other(_) => None,
        }
    }
}

/// UI driver / browser errors.
///
/// `Fatal` always propagates and aborts the job; the other variants are
/// recoverable at one of the bounded-retry sites.
#[derive(Debug)]
pub enum DriverError {
    /// Launching the browser failed
    LaunchFailed {
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// Navigation failed
    NavigationFailed {
        url: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// An element the protocol depends on is missing
    ElementNotFound { selector: String },
    /// Script / CDP command failed
    ScriptFailed {
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// A window handle vanished or was never opened
    WindowNotFound { handle: String },
    /// A bounded wait expired (dropdown population, new window, page load)
    WaitTimeout { what: String, secs: u64 },
    /// Structural anomaly: the page no longer matches the known protocol
    Fatal { message: String },
}

impl fmt::Display for DriverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DriverError::LaunchFailed { source } => {
                write!(f, "failed to launch browser: {}", source)
            }
            DriverError::NavigationFailed { url, source } => {
                write!(f, "failed to navigate to {}: {}", url, source)
            }
            DriverError::ElementNotFound { selector } => {
                write!(f, "element not found: {}", selector)
            }
            DriverError::ScriptFailed { source } => {
                write!(f, "script execution failed: {}", source)
            }
            DriverError::WindowNotFound { handle } => {
                write!(f, "window handle not found: {}", handle)
            }
            DriverError::WaitTimeout { what, secs } => {
                write!(f, "timed out after {}s waiting for {}", secs, what)
            }
            DriverError::Fatal { message } => write!(f, "fatal driver error: {}", message),
        }
    }
}

impl std::error::Error for DriverError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DriverError::LaunchFailed { source }
            | DriverError::NavigationFailed { source, .. }
            | DriverError::ScriptFailed { source } => {
                Some(source.as_ref() as &(dyn std::error::Error + 'static))
            }
            _ => None,
        }
    }
}

/// CAPTCHA pipeline errors.
#[derive(Debug)]
pub enum CaptchaError {
    /// Could not capture or decode the CAPTCHA image
    ImageCapture {
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// No technique produced any usable text for this image
    OcrExhausted { techniques: usize },
    /// The whole solve-and-submit cycle ran out of attempts
    Exhausted { attempts: u32 },
}

impl fmt::Display for CaptchaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptchaError::ImageCapture { source } => {
                write!(f, "failed to capture captcha image: {}", source)
            }
            CaptchaError::OcrExhausted { techniques } => {
                write!(f, "no usable text from any of {} techniques", techniques)
            }
            CaptchaError::Exhausted { attempts } => {
                write!(f, "captcha not solved after {} attempts", attempts)
            }
        }
    }
}

impl std::error::Error for CaptchaError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CaptchaError::ImageCapture { source } => {
                Some(source.as_ref() as &(dyn std::error::Error + 'static))
            }
            _ => None,
        }
    }
}

/// Document retrieval errors. All three are recovered by retry-then-skip
/// at the row boundary; none of them aborts a job on its own.
#[derive(Debug)]
pub enum RetrievalError {
    /// The document window never finished loading
    Timeout { secs: u64 },
    /// PDF rendering (and the screenshot fallback) failed
    RenderError { message: String },
    /// The window loaded but carried no retrievable payload
    EmptyContent,
}

impl fmt::Display for RetrievalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetrievalError::Timeout { secs } => {
                write!(f, "document did not load within {}s", secs)
            }
            RetrievalError::RenderError { message } => {
                write!(f, "failed to render document: {}", message)
            }
            RetrievalError::EmptyContent => write!(f, "document window carried no content"),
        }
    }
}

impl std::error::Error for RetrievalError {}

/// File system errors.
#[derive(Debug)]
pub enum FileError {
    ReadFailed {
        path: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    WriteFailed {
        path: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    CreateDirFailed {
        path: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    JsonParseFailed {
        path: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl fmt::Display for FileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileError::ReadFailed { path, source } => {
                write!(f, "failed to read {}: {}", path, source)
            }
            FileError::WriteFailed { path, source } => {
                write!(f, "failed to write {}: {}", path, source)
            }
            FileError::CreateDirFailed { path, source } => {
                write!(f, "failed to create directory {}: {}", path, source)
            }
            FileError::JsonParseFailed { path, source } => {
                write!(f, "failed to parse JSON from {}: {}", path, source)
            }
        }
    }
}

impl std::error::Error for FileError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FileError::ReadFailed { source, .. }
            | FileError::WriteFailed { source, .. }
            | FileError::CreateDirFailed { source, .. }
            | FileError::JsonParseFailed { source, .. } => {
                Some(source.as_ref() as &(dyn std::error::Error + 'static))
            }
        }
    }
}

/// Configuration errors.
#[derive(Debug)]
pub enum ConfigError {
    EnvVarParseFailed {
        var_name: String,
        value: String,
        expected_type: String,
    },
    LocationsNotFound {
        path: String,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::EnvVarParseFailed {
                var_name,
                value,
                expected_type,
            } => {
                write!(
                    f,
                    "env var {} could not be parsed: '{}' is not a {}",
                    var_name, value, expected_type
                )
            }
            ConfigError::LocationsNotFound { path } => {
                write!(f, "location data file not found: {}", path)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

// ========== conversions from common error types ==========

impl From<DriverError> for AppError {
    fn from(err: DriverError) -> Self {
        AppError::Driver(err)
    }
}

impl From<CaptchaError> for AppError {
    fn from(err: CaptchaError) -> Self {
        AppError::Captcha(err)
    }
}

impl From<RetrievalError> for AppError {
    fn from(err: RetrievalError) -> Self {
        AppError::Retrieval(err)
    }
}

impl From<FileError> for AppError {
    fn from(err: FileError) -> Self {
        AppError::File(err)
    }
}

impl From<ConfigError> for AppError {
    fn from(err: ConfigError) -> Self {
        AppError::Config(err)
    }
}

impl From<chromiumoxide::error::CdpError> for AppError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        AppError::Driver(DriverError::ScriptFailed {
            source: Box::new(err),
        })
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::File(FileError::JsonParseFailed {
            path: String::new(),
            source: Box::new(err),
        })
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::File(FileError::ReadFailed {
            path: String::new(),
            source: Box::new(err),
        })
    }
}

// ========== convenience constructors ==========

impl AppError {
    pub fn launch_failed(source: impl std::error::Error + Send + Sync + 'static) -> Self {
        AppError::Driver(DriverError::LaunchFailed {
            source: Box::new(source),
        })
    }

    pub fn navigation_failed(
        url: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::Driver(DriverError::NavigationFailed {
            url: url.into(),
            source: Box::new(source),
        })
    }

    pub fn wait_timeout(what: impl Into<String>, secs: u64) -> Self {
        AppError::Driver(DriverError::WaitTimeout {
            what: what.into(),
            secs,
        })
    }

    pub fn fatal(message: impl Into<String>) -> Self {
        AppError::Driver(DriverError::Fatal {
            message: message.into(),
        })
    }

    /// True when the error must abort the job instead of being absorbed
    /// at a retry site.
    pub fn is_fatal(&self) -> bool {
        matches!(self, AppError::Driver(DriverError::Fatal { .. }))
    }
}

// ========== Result alias ==========

/// Application result type.
pub type AppResult<T> = Result<T, AppError>;
