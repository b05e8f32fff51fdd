use anyhow::Result;
use image::DynamicImage;
use image::imageops::FilterType;
use tracing::{info, warn};

use super::debug_sink::DebugSink;

/// One tesseract recognition mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct OcrProfile {
    pub(crate) label: &'static str,
    pub(crate) engine_mode: u8,
    pub(crate) page_segmentation_mode: u8,
}

impl OcrProfile {
    pub(crate) fn args(&self) -> [String; 4] {
        [
            "--oem".to_string(),
            self.engine_mode.to_string(),
            "--psm".to_string(),
            self.page_segmentation_mode.to_string(),
        ]
    }
}

/// Profiles in priority order: uniform block, column layout, single word,
/// single line, raw line.
pub(crate) const OCR_PROFILES: &[OcrProfile] = &[
    OcrProfile {
        label: "block",
        engine_mode: 3,
        page_segmentation_mode: 6,
    },
    OcrProfile {
        label: "columns",
        engine_mode: 3,
        page_segmentation_mode: 4,
    },
    OcrProfile {
        label: "word",
        engine_mode: 3,
        page_segmentation_mode: 8,
    },
    OcrProfile {
        label: "line",
        engine_mode: 3,
        page_segmentation_mode: 7,
    },
    OcrProfile {
        label: "raw_line",
        engine_mode: 3,
        page_segmentation_mode: 13,
    },
];

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct OcrResult {
    pub(crate) text: String,
    /// Mean of the engine's positive per-token confidences.
    pub(crate) confidence: Option<f64>,
}

pub(crate) trait OcrEngine {
    fn recognize(&self, image: &DynamicImage, profile: &OcrProfile) -> Result<OcrResult>;
}

/// Confidence when the engine reports it, otherwise text length as a proxy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum AttemptScore {
    Confidence(f64),
    TextLength(usize),
}

impl AttemptScore {
    pub(crate) fn for_result(result: &OcrResult) -> Self {
        match result.confidence {
            Some(confidence) => Self::Confidence(confidence),
            None => Self::TextLength(result.text.chars().count()),
        }
    }

    pub(crate) fn value(self) -> f64 {
        match self {
            Self::Confidence(confidence) => confidence,
            Self::TextLength(length) => length as f64,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct SelectedText {
    pub(crate) text: String,
    pub(crate) profile: Option<&'static str>,
    pub(crate) score: Option<AttemptScore>,
}

pub(crate) struct OcrSelector<'a> {
    engine: &'a dyn OcrEngine,
    debug_sink: &'a dyn DebugSink,
    profiles: &'a [OcrProfile],
}

impl<'a> OcrSelector<'a> {
    pub(crate) fn new(engine: &'a dyn OcrEngine, debug_sink: &'a dyn DebugSink) -> Self {
        Self::with_profiles(engine, debug_sink, OCR_PROFILES)
    }

    pub(crate) fn with_profiles(
        engine: &'a dyn OcrEngine,
        debug_sink: &'a dyn DebugSink,
        profiles: &'a [OcrProfile],
    ) -> Self {
        Self {
            engine,
            debug_sink,
            profiles,
        }
    }

    /// Runs every profile against a preprocessed copy of the page and keeps
    /// the strictly best-scoring text. Never fails; an empty result means no
    /// text was recovered.
    pub(crate) fn extract_best_text(&self, page_number: usize, image: &DynamicImage) -> SelectedText {
        let processed = preprocess_for_ocr(image);
        if let Err(error) = self.debug_sink.save_image(page_number, "processed", &processed) {
            warn!(page = page_number, error = %error, "failed to save debug image");
        }

        let mut best = SelectedText::default();
        for profile in self.profiles {
            let result = match self.engine.recognize(&processed, profile) {
                Ok(result) => result,
                Err(error) => {
                    warn!(page = page_number, profile = profile.label, error = %error, "OCR profile failed");
                    continue;
                }
            };

            let score = AttemptScore::for_result(&result);
            info!(
                page = page_number,
                profile = profile.label,
                text_chars = result.text.chars().count(),
                score = score.value(),
                "OCR profile finished"
            );

            let artifact = format!("profile_{}", profile.label);
            if let Err(error) = self.debug_sink.save_text(Some(page_number), &artifact, &result.text) {
                warn!(page = page_number, error = %error, "failed to save debug text");
            }

            let best_value = best.score.map(AttemptScore::value).unwrap_or(0.0);
            if score.value() > best_value {
                best = SelectedText {
                    text: result.text,
                    profile: Some(profile.label),
                    score: Some(score),
                };
            }
        }

        if let (Some(profile), Some(score)) = (best.profile, best.score) {
            let report = format!(
                "OCR profile: {profile}\nOCR score: {:.1}\n{}\n{}",
                score.value(),
                "=".repeat(50),
                best.text
            );
            if let Err(error) = self.debug_sink.save_text(Some(page_number), "raw_ocr", &report) {
                warn!(page = page_number, error = %error, "failed to save debug text");
            }
        }

        best
    }
}

const CONTRAST_BOOST: f32 = 50.0;
const UNSHARP_SIGMA: f32 = 1.0;
const UNSHARP_THRESHOLD: i32 = 2;
const DESPECKLE_SIGMA: f32 = 0.5;
pub(crate) const MIN_OCR_WIDTH: u32 = 1500;

/// Grayscale, contrast and sharpness boost, light blur against speckle, and
/// upscaling of narrow scans.
pub(crate) fn preprocess_for_ocr(image: &DynamicImage) -> DynamicImage {
    let processed = DynamicImage::ImageLuma8(image.to_luma8())
        .adjust_contrast(CONTRAST_BOOST)
        .unsharpen(UNSHARP_SIGMA, UNSHARP_THRESHOLD)
        .blur(DESPECKLE_SIGMA);

    let (width, height) = (processed.width(), processed.height());
    if width == 0 || width >= MIN_OCR_WIDTH {
        return processed;
    }

    let scale = f64::from(MIN_OCR_WIDTH) / f64::from(width);
    let scaled_height = (f64::from(height) * scale).round().max(1.0) as u32;
    processed.resize_exact(MIN_OCR_WIDTH, scaled_height, FilterType::Lanczos3)
}
