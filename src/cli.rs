use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "rollscan",
    version,
    about = "Scanned electoral roll OCR and record extraction"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Rasterize a scanned PDF, OCR every page and export the parsed records.
    Extract(ExtractArgs),
    /// Parse records from already-recognized text (pages split by form feed).
    Parse(ParseArgs),
    /// Check that the external OCR tools are installed.
    Doctor(DoctorArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ExtractArgs {
    #[arg(long)]
    pub input: PathBuf,

    /// SQLite workbook to write (`.sqlite` or `.db`) with Dashboard and
    /// Background Data tables.
    #[arg(long)]
    pub output: PathBuf,

    #[arg(long, default_value_t = 300)]
    pub dpi: u32,

    #[arg(long, default_value = "eng")]
    pub ocr_lang: String,

    #[arg(long)]
    pub max_pages: Option<usize>,

    #[arg(long, default_value = "ocr_debug_output")]
    pub debug_dir: PathBuf,

    #[arg(long, default_value_t = false)]
    pub no_debug: bool,

    #[arg(long)]
    pub summary_path: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct ParseArgs {
    #[arg(long)]
    pub input: PathBuf,

    /// Optional SQLite workbook (`.sqlite` or `.db`) for the parsed records.
    #[arg(long)]
    pub output: Option<PathBuf>,

    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct DoctorArgs {
    #[arg(long, default_value = "eng")]
    pub ocr_lang: String,
}
