use std::process::Command;

use anyhow::{Result, bail};
use tracing::{info, warn};

use crate::cli::DoctorArgs;
use crate::util::command_version_optional;

const REQUIRED_TOOLS: &[(&str, &str, &str)] = &[
    ("pdftoppm", "-v", "install poppler-utils (Linux) or `brew install poppler` (macOS)"),
    ("tesseract", "--version", "install tesseract-ocr (Linux) or `brew install tesseract` (macOS)"),
];

pub fn run(args: DoctorArgs) -> Result<()> {
    let mut missing = Vec::new();

    for (program, version_flag, hint) in REQUIRED_TOOLS {
        match command_version_optional(program, &[*version_flag]) {
            Some(version) => info!(program = %program, version = %version, "tool available"),
            None => {
                warn!(program = %program, hint = %hint, "tool missing");
                missing.push(*program);
            }
        }
    }

    if !missing.contains(&"tesseract") {
        let languages = installed_languages();
        if languages.iter().any(|lang| lang == &args.ocr_lang) {
            info!(lang = %args.ocr_lang, "OCR language data available");
        } else {
            warn!(
                lang = %args.ocr_lang,
                installed = %languages.join(","),
                "OCR language data missing"
            );
            missing.push("tesseract language data");
        }
    }

    if !missing.is_empty() {
        bail!("missing OCR prerequisites: {}", missing.join(", "));
    }

    info!("all OCR prerequisites available");
    Ok(())
}

fn installed_languages() -> Vec<String> {
    let Ok(output) = Command::new("tesseract").arg("--list-langs").output() else {
        return Vec::new();
    };

    // Older releases print the list on stderr.
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    let listing = if stdout.trim().is_empty() { stderr } else { stdout };

    parse_language_listing(&listing)
}

fn parse_language_listing(listing: &str) -> Vec<String> {
    listing
        .lines()
        .skip_while(|line| !line.trim_start().starts_with("List of available languages"))
        .skip(1)
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}
