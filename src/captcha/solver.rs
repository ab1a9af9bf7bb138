//! CAPTCHA solving: preprocessing ensemble over a single OCR engine.

use std::path::PathBuf;

use tracing::{debug, warn};

use crate::error::CaptchaError;

use super::normalize;
use super::ocr::OcrEngine;
use super::preprocess;

/// What one technique produced for one image.
#[derive(Debug, Clone)]
pub struct CaptchaCandidate {
    pub technique: &'static str,
    pub text: String,
    pub confidence: f32,
    pub valid: bool,
}

/// The full record of one solve pass: every candidate plus the one accepted.
#[derive(Debug, Clone)]
pub struct CaptchaAttempt {
    pub attempt: u32,
    pub candidates: Vec<CaptchaCandidate>,
    pub accepted: String,
}

/// Runs every preprocessing technique over a CAPTCHA image and accepts the
/// first recognition that satisfies the format contract. A candidate that
/// violates the contract is never accepted, whatever its confidence.
pub struct CaptchaSolver<O: OcrEngine> {
    ocr: O,
    debug_dir: Option<PathBuf>,
}

impl<O: OcrEngine> CaptchaSolver<O> {
    pub fn new(ocr: O) -> Self {
        Self {
            ocr,
            debug_dir: None,
        }
    }

    /// Keep every preprocessed variant on disk for offline inspection.
    pub fn with_debug_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.debug_dir = Some(dir.into());
        self
    }

    pub async fn solve(
        &self,
        raw_png: &[u8],
        attempt_no: u32,
    ) -> Result<CaptchaAttempt, CaptchaError> {
        let gray = preprocess::decode_png(raw_png)?;
        let techniques = preprocess::techniques();
        let mut candidates = Vec::with_capacity(techniques.len());
        let mut accepted: Option<String> = None;

        for technique in &techniques {
            let processed = technique.apply(&gray);
            let png = preprocess::encode_png(&processed)?;

            if let Some(dir) = &self.debug_dir {
                let path = dir.join(format!("attempt{}_{}.png", attempt_no, technique.name));
                if let Err(e) = std::fs::write(&path, &png) {
                    warn!("⚠️ could not keep debug image {}: {}", path.display(), e);
                }
            }

            let reading = match self.ocr.recognize(&png).await {
                Ok(r) => r,
                Err(e) => {
                    warn!("⚠️ OCR failed for technique '{}': {}", technique.name, e);
                    continue;
                }
            };

            let text = normalize::normalize(&reading.text);
            let valid = normalize::is_valid(&text);
            debug!(
                "technique '{}' read '{}' (conf {:.2}, valid={})",
                technique.name, text, reading.confidence, valid
            );
            candidates.push(CaptchaCandidate {
                technique: technique.name,
                text: text.clone(),
                confidence: reading.confidence,
                valid,
            });

            if valid && accepted.is_none() {
                accepted = Some(text);
            }
        }

        match accepted {
            Some(text) => Ok(CaptchaAttempt {
                attempt: attempt_no,
                candidates,
                accepted: text,
            }),
            None => Err(CaptchaError::OcrExhausted {
                techniques: techniques.len(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::captcha::ocr::OcrReading;
    use crate::error::{AppError, AppResult};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays a scripted sequence of readings, one per recognize call.
    struct MockOcr {
        readings: Mutex<VecDeque<AppResult<OcrReading>>>,
    }

    impl MockOcr {
        fn scripted(readings: Vec<AppResult<OcrReading>>) -> Self {
            Self {
                readings: Mutex::new(readings.into_iter().collect()),
            }
        }

        fn reading(text: &str, confidence: f32) -> AppResult<OcrReading> {
            Ok(OcrReading {
                text: text.to_string(),
                confidence,
            })
        }
    }

    #[async_trait]
    impl OcrEngine for MockOcr {
        async fn recognize(&self, _png: &[u8]) -> AppResult<OcrReading> {
            self.readings
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(AppError::Other("script exhausted".into())))
        }
    }

    fn captcha_png() -> Vec<u8> {
        let img = image::GrayImage::from_pixel(60, 20, image::Luma([200]));
        preprocess::encode_png(&img).unwrap()
    }

    #[tokio::test]
    async fn accepts_first_format_valid_candidate() {
        let ocr = MockOcr::scripted(vec![
            MockOcr::reading("##", 0.99),
            MockOcr::reading("aB1o", 0.40),
            MockOcr::reading("ZZZZ9", 0.95),
        ]);
        let solver = CaptchaSolver::new(ocr);
        let attempt = solver.solve(&captcha_png(), 1).await.unwrap();
        assert_eq!(attempt.accepted, "AB10");
        assert!(attempt.candidates.iter().any(|c| !c.valid));
    }

    #[tokio::test]
    async fn never_accepts_format_violating_text() {
        let ocr = MockOcr::scripted(vec![
            MockOcr::reading("x", 0.99),
            MockOcr::reading("toolongresult", 0.99),
            MockOcr::reading("", 0.99),
            MockOcr::reading("ab", 0.99),
            MockOcr::reading("!!!", 0.99),
            MockOcr::reading("c3", 0.99),
            MockOcr::reading("-", 0.99),
        ]);
        let solver = CaptchaSolver::new(ocr);
        let err = solver.solve(&captcha_png(), 1).await.unwrap_err();
        assert!(matches!(err, CaptchaError::OcrExhausted { techniques: 7 }));
    }

    #[tokio::test]
    async fn engine_failures_do_not_abort_the_pass() {
        let ocr = MockOcr::scripted(vec![
            Err(AppError::Other("engine hiccup".into())),
            MockOcr::reading("K4M2", 0.60),
        ]);
        let solver = CaptchaSolver::new(ocr);
        let attempt = solver.solve(&captcha_png(), 2).await.unwrap();
        assert_eq!(attempt.accepted, "K4M2");
        assert_eq!(attempt.attempt, 2);
    }

    #[tokio::test]
    async fn undecodable_image_is_a_capture_error() {
        let solver = CaptchaSolver::new(MockOcr::scripted(vec![]));
        let err = solver.solve(b"not a png", 1).await.unwrap_err();
        assert!(matches!(err, CaptchaError::ImageCapture { .. }));
    }
}
