use std::path::PathBuf;

use thiserror::Error;

/// Failures of the external tools a run cannot continue without.
#[derive(Debug, Error)]
pub(crate) enum CollaboratorError {
    #[error("{program} is not installed or not on PATH")]
    ToolUnavailable { program: &'static str },

    #[error("DPI {dpi} is outside the supported range {min}..={max}")]
    InvalidDpi { dpi: u32, min: u32, max: u32 },

    #[error("failed to render {}: {reason}", path.display())]
    Render { path: PathBuf, reason: String },
}
