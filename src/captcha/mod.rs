//! CAPTCHA solving - capability layer
//!
//! Image capture happens upstream (the navigator screenshots the CAPTCHA
//! element); this module owns everything after the bytes arrive: an ordered
//! set of preprocessing techniques, the OCR seam, candidate normalization,
//! and the selection policy. No shared state is touched; one call, one
//! [`CaptchaAttempt`].

pub mod normalize;
pub mod ocr;
pub mod preprocess;
mod solver;

pub use ocr::{OcrEngine, OcrReading, TesseractOcr};
pub use solver::{CaptchaAttempt, CaptchaCandidate, CaptchaSolver};
