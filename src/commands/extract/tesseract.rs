use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, Result, bail};
use chrono::Utc;
use image::DynamicImage;
use tracing::{debug, warn};

use super::error::CollaboratorError;
use super::ocr_select::{OcrEngine, OcrProfile, OcrResult};
use crate::util::command_available;

/// Column of the per-token confidence in tesseract's TSV output.
const TSV_CONFIDENCE_COLUMN: usize = 10;

/// Drives the `tesseract` command-line tool.
#[derive(Debug, Clone)]
pub(crate) struct TesseractCli {
    lang: String,
}

impl TesseractCli {
    pub(crate) fn new(lang: &str) -> Result<Self> {
        if !command_available("tesseract", "--version") {
            return Err(CollaboratorError::ToolUnavailable {
                program: "tesseract",
            }
            .into());
        }

        Ok(Self {
            lang: lang.to_string(),
        })
    }

    fn run(&self, png_path: &Path, profile: &OcrProfile, tsv: bool) -> Result<String> {
        let mut command = Command::new("tesseract");
        command
            .arg(png_path)
            .arg("stdout")
            .arg("-l")
            .arg(&self.lang)
            .args(profile.args());
        if tsv {
            command.arg("tsv");
        }

        let output = command
            .output()
            .with_context(|| format!("failed to execute tesseract for {}", png_path.display()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!(
                "tesseract returned non-zero exit status for profile {}: {}",
                profile.label,
                stderr.trim()
            );
        }

        Ok(String::from_utf8_lossy(&output.stdout).replace('\u{0000}', ""))
    }
}

impl OcrEngine for TesseractCli {
    fn recognize(&self, image: &DynamicImage, profile: &OcrProfile) -> Result<OcrResult> {
        let scratch = ScratchImage::write(image, profile.label)?;

        let text = self.run(scratch.path(), profile, false)?;
        let confidence = match self.run(scratch.path(), profile, true) {
            Ok(tsv) => Some(mean_token_confidence(&tsv)),
            Err(error) => {
                warn!(profile = profile.label, error = %error, "confidence data unavailable");
                None
            }
        };

        debug!(profile = profile.label, confidence = ?confidence, "tesseract finished");
        Ok(OcrResult { text, confidence })
    }
}

/// PNG handed to tesseract, removed from the temp directory on drop.
#[derive(Debug)]
pub(crate) struct ScratchImage {
    path: PathBuf,
}

impl ScratchImage {
    pub(crate) fn write(image: &DynamicImage, label: &str) -> Result<Self> {
        let stamp = Utc::now().timestamp_nanos_opt().unwrap_or_default();
        let scratch = Self {
            path: std::env::temp_dir().join(format!(
                "rollscan_ocr_{}_{}_{}.png",
                std::process::id(),
                label,
                stamp
            )),
        };

        image
            .save(&scratch.path)
            .with_context(|| format!("failed to write OCR input {}", scratch.path.display()))?;
        Ok(scratch)
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ScratchImage {
    fn drop(&mut self) {
        match fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(error) if error.kind() == ErrorKind::NotFound => {}
            Err(error) => {
                warn!(path = %self.path.display(), error = %error, "failed to remove OCR scratch image");
            }
        }
    }
}

/// Mean of the positive confidences in a tesseract TSV report; zero when no
/// token carries one.
pub(crate) fn mean_token_confidence(tsv: &str) -> f64 {
    let confidences = tsv
        .lines()
        .skip(1)
        .filter_map(|line| line.split('\t').nth(TSV_CONFIDENCE_COLUMN))
        .filter_map(|value| value.trim().parse::<f64>().ok())
        .filter(|confidence| *confidence > 0.0)
        .collect::<Vec<f64>>();

    if confidences.is_empty() {
        return 0.0;
    }

    confidences.iter().sum::<f64>() / confidences.len() as f64
}
