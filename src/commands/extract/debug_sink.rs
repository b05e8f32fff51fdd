use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use image::DynamicImage;
use tracing::info;

use crate::model::RunSummary;
use crate::util::{ensure_directory, write_json_pretty, write_text};

/// Receives intermediate artifacts of a run. Implementations must not
/// influence extraction; callers log and ignore their failures.
pub(crate) trait DebugSink {
    fn save_image(&self, page_number: usize, label: &str, image: &DynamicImage) -> Result<()>;

    fn save_text(&self, page_number: Option<usize>, label: &str, text: &str) -> Result<()>;

    fn save_summary(&self, summary: &RunSummary) -> Result<()>;
}

#[derive(Debug, Default)]
pub(crate) struct NoopDebugSink;

impl DebugSink for NoopDebugSink {
    fn save_image(&self, _page_number: usize, _label: &str, _image: &DynamicImage) -> Result<()> {
        Ok(())
    }

    fn save_text(&self, _page_number: Option<usize>, _label: &str, _text: &str) -> Result<()> {
        Ok(())
    }

    fn save_summary(&self, _summary: &RunSummary) -> Result<()> {
        Ok(())
    }
}

#[derive(Debug)]
pub(crate) struct DirectoryDebugSink {
    root: PathBuf,
}

impl DirectoryDebugSink {
    pub(crate) fn create(root: &Path) -> Result<Self> {
        ensure_directory(root)?;
        info!(path = %root.display(), "writing debug artifacts");
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    pub(crate) fn artifact_path(&self, page_number: Option<usize>, label: &str, extension: &str) -> PathBuf {
        let filename = match page_number {
            Some(page) => format!("page_{page:03}_{label}.{extension}"),
            None => format!("{label}.{extension}"),
        };
        self.root.join(filename)
    }
}

impl DebugSink for DirectoryDebugSink {
    fn save_image(&self, page_number: usize, label: &str, image: &DynamicImage) -> Result<()> {
        let path = self.artifact_path(Some(page_number), label, "png");
        image
            .save(&path)
            .with_context(|| format!("failed to write {}", path.display()))
    }

    fn save_text(&self, page_number: Option<usize>, label: &str, text: &str) -> Result<()> {
        write_text(&self.artifact_path(page_number, label, "txt"), text)
    }

    fn save_summary(&self, summary: &RunSummary) -> Result<()> {
        write_json_pretty(&self.artifact_path(None, "extraction_summary", "json"), summary)
    }
}
