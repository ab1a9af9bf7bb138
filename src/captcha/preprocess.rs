//! Image preprocessing techniques for CAPTCHA recognition.
//!
//! A single pass rarely suffices; each technique attacks a different failure
//! mode of the portal's renderer (speckle noise, low contrast, thin strokes).
//! The solver runs every technique in order and keeps the first readable
//! result, so order matters: the cheapest and most reliable come first.

use std::io::Cursor;

use image::imageops::FilterType;
use image::{DynamicImage, GrayImage, ImageFormat};
use imageproc::filter::{median_filter, sharpen3x3};

use crate::error::CaptchaError;

/// One named preprocessing pipeline over a grayscale CAPTCHA image.
pub struct Technique {
    pub name: &'static str,
    apply: fn(&GrayImage) -> GrayImage,
}

impl Technique {
    pub fn apply(&self, img: &GrayImage) -> GrayImage {
        (self.apply)(img)
    }
}

/// The ordered set of techniques the solver tries.
pub fn techniques() -> Vec<Technique> {
    vec![
        Technique {
            name: "grayscale-contrast-140",
            apply: |img| threshold(&stretch_contrast(img, 1.5), 140),
        },
        Technique {
            name: "high-contrast-160",
            apply: |img| threshold(&stretch_contrast(img, 2.0), 160),
        },
        Technique {
            name: "median-denoise-150",
            apply: |img| threshold(&median_filter(img, 1, 1), 150),
        },
        Technique {
            name: "sharpen-145",
            apply: |img| threshold(&sharpen3x3(img), 145),
        },
        Technique {
            name: "autocontrast",
            apply: autocontrast,
        },
        Technique {
            name: "upscale-130",
            apply: |img| threshold(&upscale2x(img), 130),
        },
        Technique {
            name: "inverted",
            apply: |img| invert(&threshold(img, 140)),
        },
    ]
}

/// Decode raw PNG bytes into a grayscale image.
pub fn decode_png(png: &[u8]) -> Result<GrayImage, CaptchaError> {
    let img = image::load_from_memory(png).map_err(|e| CaptchaError::ImageCapture {
        source: Box::new(e),
    })?;
    Ok(img.to_luma8())
}

/// Encode a grayscale image back to PNG bytes for the OCR engine.
pub fn encode_png(img: &GrayImage) -> Result<Vec<u8>, CaptchaError> {
    let mut buf = Cursor::new(Vec::new());
    DynamicImage::ImageLuma8(img.clone())
        .write_to(&mut buf, ImageFormat::Png)
        .map_err(|e| CaptchaError::ImageCapture {
            source: Box::new(e),
        })?;
    Ok(buf.into_inner())
}

/// Binarize: pixels at or above `cut` go white, the rest black.
pub fn threshold(img: &GrayImage, cut: u8) -> GrayImage {
    let mut out = img.clone();
    for px in out.pixels_mut() {
        px.0[0] = if px.0[0] >= cut { 255 } else { 0 };
    }
    out
}

/// Stretch pixel values away from the midpoint by `factor`.
pub fn stretch_contrast(img: &GrayImage, factor: f32) -> GrayImage {
    let mut out = img.clone();
    for px in out.pixels_mut() {
        let v = (px.0[0] as f32 - 128.0) * factor + 128.0;
        px.0[0] = v.clamp(0.0, 255.0) as u8;
    }
    out
}

/// Stretch the observed value range to the full 0..255 span.
pub fn autocontrast(img: &GrayImage) -> GrayImage {
    let (mut lo, mut hi) = (255u8, 0u8);
    for px in img.pixels() {
        lo = lo.min(px.0[0]);
        hi = hi.max(px.0[0]);
    }
    if hi <= lo {
        return img.clone();
    }
    let span = (hi - lo) as f32;
    let mut out = img.clone();
    for px in out.pixels_mut() {
        px.0[0] = (((px.0[0] - lo) as f32 / span) * 255.0) as u8;
    }
    out
}

pub fn invert(img: &GrayImage) -> GrayImage {
    let mut out = img.clone();
    for px in out.pixels_mut() {
        px.0[0] = 255 - px.0[0];
    }
    out
}

/// Double both dimensions; small glyphs OCR better at 2x.
pub fn upscale2x(img: &GrayImage) -> GrayImage {
    image::imageops::resize(
        img,
        img.width() * 2,
        img.height() * 2,
        FilterType::Lanczos3,
    )
}
