use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, Result};
use chrono::Utc;
use image::DynamicImage;
use tracing::{info, warn};

use super::error::CollaboratorError;
use crate::util::{command_available, ensure_directory};

pub(crate) const MIN_DPI: u32 = 72;
pub(crate) const MAX_DPI: u32 = 1200;

#[derive(Debug)]
pub(crate) struct PageImage {
    pub(crate) page_number: usize,
    pub(crate) image: DynamicImage,
}

/// Page rasters produced by one render call. Images are decoded on demand
/// and the scratch directory is removed on drop.
#[derive(Debug)]
pub(crate) struct RenderedDocument {
    work_dir: PathBuf,
    page_paths: Vec<PathBuf>,
}

impl RenderedDocument {
    pub(crate) fn page_count(&self) -> usize {
        self.page_paths.len()
    }

    pub(crate) fn load_page(&self, index: usize) -> Result<PageImage> {
        let path = self
            .page_paths
            .get(index)
            .with_context(|| format!("page index {index} out of range"))?;
        let image =
            image::open(path).with_context(|| format!("failed to decode {}", path.display()))?;

        Ok(PageImage {
            page_number: index + 1,
            image,
        })
    }
}

impl Drop for RenderedDocument {
    fn drop(&mut self) {
        if let Err(error) = fs::remove_dir_all(&self.work_dir) {
            warn!(path = %self.work_dir.display(), error = %error, "failed to remove render directory");
        }
    }
}

/// Renders PDF pages to PNG with poppler's `pdftoppm`.
#[derive(Debug, Clone)]
pub(crate) struct PdftoppmRasterizer {
    max_pages: Option<usize>,
}

impl PdftoppmRasterizer {
    pub(crate) fn new(max_pages: Option<usize>) -> Result<Self> {
        if !command_available("pdftoppm", "-v") {
            return Err(CollaboratorError::ToolUnavailable {
                program: "pdftoppm",
            }
            .into());
        }

        Ok(Self { max_pages })
    }

    pub(crate) fn render(&self, pdf_path: &Path, dpi: u32) -> Result<RenderedDocument> {
        validate_dpi(dpi)?;
        info!(path = %pdf_path.display(), dpi, "rendering PDF pages");

        let stamp = Utc::now().timestamp_nanos_opt().unwrap_or_default();
        let work_dir = std::env::temp_dir().join(format!(
            "rollscan_render_{}_{}",
            std::process::id(),
            stamp
        ));
        ensure_directory(&work_dir)?;

        let mut document = RenderedDocument {
            work_dir,
            page_paths: Vec::new(),
        };

        let mut command = Command::new("pdftoppm");
        command.arg("-r").arg(dpi.to_string()).arg("-png");
        if let Some(max_pages) = self.max_pages {
            command.arg("-l").arg(max_pages.to_string());
        }
        command.arg(pdf_path).arg(document.work_dir.join("page"));

        let output = command
            .output()
            .with_context(|| format!("failed to execute pdftoppm for {}", pdf_path.display()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(CollaboratorError::Render {
                path: pdf_path.to_path_buf(),
                reason: stderr.trim().to_string(),
            }
            .into());
        }

        document.page_paths = collect_page_paths(&document.work_dir)?;
        if document.page_paths.is_empty() {
            return Err(CollaboratorError::Render {
                path: pdf_path.to_path_buf(),
                reason: "pdftoppm produced no page images".to_string(),
            }
            .into());
        }

        info!(pages = document.page_count(), "rendered PDF pages");
        Ok(document)
    }
}

pub(crate) fn validate_dpi(dpi: u32) -> Result<(), CollaboratorError> {
    if (MIN_DPI..=MAX_DPI).contains(&dpi) {
        Ok(())
    } else {
        Err(CollaboratorError::InvalidDpi {
            dpi,
            min: MIN_DPI,
            max: MAX_DPI,
        })
    }
}

fn collect_page_paths(work_dir: &Path) -> Result<Vec<PathBuf>> {
    let entries =
        fs::read_dir(work_dir).with_context(|| format!("failed to read {}", work_dir.display()))?;

    let mut pages = Vec::new();
    for entry in entries {
        let entry =
            entry.with_context(|| format!("failed to read entry in {}", work_dir.display()))?;
        let path = entry.path();
        if let Some(page_number) = rendered_page_number(&path) {
            pages.push((page_number, path));
        }
    }

    pages.sort();
    Ok(pages.into_iter().map(|(_, path)| path).collect())
}

/// Page number of a `pdftoppm` output file such as `page-007.png`.
pub(crate) fn rendered_page_number(path: &Path) -> Option<usize> {
    let is_png = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("png"))
        .unwrap_or(false);
    if !is_png {
        return None;
    }

    let stem = path.file_stem()?.to_str()?;
    let (_, number) = stem.rsplit_once('-')?;
    number.parse::<usize>().ok()
}
