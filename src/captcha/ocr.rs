//! OCR engine abstraction and the Tesseract implementation.
//!
//! Recognition goes through a trait so the solver can be exercised without
//! a Tesseract install. The production engine shells out to the `tesseract`
//! binary in TSV mode and averages the per-word confidences it reports.

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::process::Command;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// One recognition result: raw text plus a 0.0..1.0 confidence estimate.
#[derive(Debug, Clone)]
pub struct OcrReading {
    pub text: String,
    pub confidence: f32,
}

#[async_trait]
pub trait OcrEngine: Send + Sync {
    /// Recognize the text in a PNG image.
    async fn recognize(&self, png: &[u8]) -> AppResult<OcrReading>;
}

/// Tesseract invoked as a subprocess.
///
/// `--psm 8` treats the image as a single word and the whitelist pins the
/// alphabet to what the portal actually renders, which cuts most of the
/// garbage readings before normalization even runs.
pub struct TesseractOcr {
    binary: PathBuf,
}

impl TesseractOcr {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    fn temp_image_path() -> PathBuf {
        std::env::temp_dir().join(format!("captcha_{}.png", Uuid::new_v4().simple()))
    }
}

#[async_trait]
impl OcrEngine for TesseractOcr {
    async fn recognize(&self, png: &[u8]) -> AppResult<OcrReading> {
        let path = Self::temp_image_path();
        tokio::fs::write(&path, png).await?;

        let output = Command::new(&self.binary)
            .arg(&path)
            .arg("stdout")
            .args(["--psm", "8"])
            .args(["--oem", "3"])
            .args([
                "-c",
                "tessedit_char_whitelist=0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ",
            ])
            .arg("tsv")
            .output()
            .await;

        // Temp file is scratch; a failed cleanup is not worth surfacing.
        let _ = tokio::fs::remove_file(&path).await;

        let output = output
            .map_err(|e| AppError::Other(format!("failed to run tesseract: {}", e)))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AppError::Other(format!(
                "tesseract exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        Ok(parse_tsv(&String::from_utf8_lossy(&output.stdout)))
    }
}

/// Extract recognized words and mean confidence from Tesseract TSV output.
///
/// Word rows are level 5; rows with a negative confidence are layout
/// artifacts and carry no text worth keeping.
fn parse_tsv(tsv: &str) -> OcrReading {
    let mut words = Vec::new();
    let mut confidences = Vec::new();

    for line in tsv.lines().skip(1) {
        let cols: Vec<&str> = line.split('\t').collect();
        if cols.len() < 12 || cols[0] != "5" {
            continue;
        }
        let conf: f32 = match cols[10].parse() {
            Ok(c) => c,
            Err(_) => continue,
        };
        let text = cols[11].trim();
        if conf < 0.0 || text.is_empty() {
            continue;
        }
        words.push(text.to_string());
        confidences.push(conf);
    }

    let confidence = if confidences.is_empty() {
        0.0
    } else {
        confidences.iter().sum::<f32>() / confidences.len() as f32 / 100.0
    };

    OcrReading {
        text: words.join(""),
        confidence,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "level\tpage_num\tblock_num\tpar_num\tline_num\tword_num\tleft\ttop\twidth\theight\tconf\ttext";

    #[test]
    fn tsv_parse_keeps_word_rows_only() {
        let tsv = format!(
            "{}\n1\t1\t0\t0\t0\t0\t0\t0\t200\t50\t-1\t\n5\t1\t1\t1\t1\t1\t4\t8\t90\t30\t91.5\tAB1\n5\t1\t1\t1\t1\t2\t100\t8\t60\t30\t88.5\t2C\n",
            HEADER
        );
        let reading = parse_tsv(&tsv);
        assert_eq!(reading.text, "AB12C");
        assert!((reading.confidence - 0.90).abs() < 1e-6);
    }

    #[test]
    fn tsv_parse_skips_negative_confidence_words() {
        let tsv = format!(
            "{}\n5\t1\t1\t1\t1\t1\t0\t0\t10\t10\t-1\tX\n5\t1\t1\t1\t1\t2\t0\t0\t10\t10\t70\tK9\n",
            HEADER
        );
        let reading = parse_tsv(&tsv);
        assert_eq!(reading.text, "K9");
        assert!((reading.confidence - 0.70).abs() < 1e-6);
    }

    #[test]
    fn tsv_parse_handles_empty_output() {
        let reading = parse_tsv(HEADER);
        assert_eq!(reading.text, "");
        assert_eq!(reading.confidence, 0.0);
    }
}
