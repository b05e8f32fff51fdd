use std::path::Path;

use anyhow::{Result, bail};
use chrono::Utc;
use tracing::{info, warn};

use super::debug_sink::{DebugSink, DirectoryDebugSink, NoopDebugSink};
use super::export::{
    SqliteWorkbookExporter, TabularExporter, record_statistics, validate_workbook_path,
};
use super::ocr_select::OcrSelector;
use super::pipeline::{PipelineState, RecordPipeline};
use super::rasterize::PdftoppmRasterizer;
use super::tesseract::TesseractCli;
use crate::cli::ExtractArgs;
use crate::model::{PageReport, RunSummary, ToolVersions};
use crate::util::{
    command_version_optional, now_utc_string, sha256_file, utc_compact_string, write_json_pretty,
};

pub(crate) const EXTRACTION_METHOD: &str = "Multi-profile OCR";
const SAMPLE_RECORD_COUNT: usize = 3;

pub fn run(args: ExtractArgs) -> Result<()> {
    let started_ts = Utc::now();
    let started_at = now_utc_string();
    let run_id = format!("run-{}", utc_compact_string(started_ts));

    validate_input(&args.input)?;
    validate_workbook_path(&args.output)?;
    let input_sha256 = sha256_file(&args.input)?;

    info!(input = %args.input.display(), run_id = %run_id, "starting extraction");

    let rasterizer = PdftoppmRasterizer::new(args.max_pages)?;
    let engine = TesseractCli::new(&args.ocr_lang)?;
    let tool_versions = ToolVersions {
        pdftoppm: command_version_optional("pdftoppm", &["-v"]),
        tesseract: command_version_optional("tesseract", &["--version"]),
    };

    let debug_sink: Box<dyn DebugSink> = if args.no_debug {
        Box::new(NoopDebugSink)
    } else {
        Box::new(DirectoryDebugSink::create(&args.debug_dir)?)
    };

    let document = rasterizer.render(&args.input, args.dpi)?;
    let selector = OcrSelector::new(&engine, debug_sink.as_ref());
    let pipeline = RecordPipeline::new()?;

    let mut state = PipelineState::default();
    let mut pages = Vec::<PageReport>::with_capacity(document.page_count());
    let mut warnings = Vec::<String>::new();
    let mut combined_text = String::new();

    for index in 0..document.page_count() {
        let page = match document.load_page(index) {
            Ok(page) => page,
            Err(error) => {
                let warning = format!("skipped page {}: {error:#}", index + 1);
                warn!(warning = %warning, "page load warning");
                warnings.push(warning);
                continue;
            }
        };

        info!(page = page.page_number, total = document.page_count(), "processing page");
        if let Err(error) = debug_sink.save_image(page.page_number, "original", &page.image) {
            warn!(page = page.page_number, error = %error, "failed to save debug image");
        }

        let selected = selector.extract_best_text(page.page_number, &page.image);

        if selected.text.trim().is_empty() {
            warnings.push(format!("no text extracted from page {}", page.page_number));
        } else {
            combined_text.push_str(&selected.text);
            combined_text.push_str("\n\n");
        }

        let mut report = pipeline.process_page(&mut state, page.page_number, &selected.text);
        report.ocr_profile = selected.profile.map(str::to_string);
        report.ocr_score = selected.score.map(|score| score.value());
        pages.push(report);
    }

    let metadata_json = serde_json::to_string_pretty(&state.metadata)?;
    let combined = format!(
        "Metadata extracted:\n{metadata_json}\n{}\n{combined_text}",
        "=".repeat(80)
    );
    if let Err(error) = debug_sink.save_text(None, "all_pages_combined_text", &combined) {
        warn!(error = %error, "failed to save combined text");
    }

    let statistics = record_statistics(&state.records);
    if state.records.is_empty() {
        let warning = "no voter records were extracted; check the raw OCR debug text".to_string();
        warn!(warning = %warning, "empty extraction");
        warnings.push(warning);
    } else {
        SqliteWorkbookExporter::new(&args.output).export(
            &state.records,
            &state.metadata,
            EXTRACTION_METHOD,
        )?;
    }

    let summary = RunSummary {
        manifest_version: 1,
        run_id,
        started_at,
        finished_at: now_utc_string(),
        command: render_extract_command(&args),
        tool_versions: Some(tool_versions),
        input_path: args.input.display().to_string(),
        input_sha256,
        dpi: Some(args.dpi),
        page_count: document.page_count(),
        pages,
        metadata: state.metadata.clone(),
        statistics,
        sample_records: state.records.iter().take(SAMPLE_RECORD_COUNT).cloned().collect(),
        warnings,
    };

    if let Err(error) = debug_sink.save_summary(&summary) {
        warn!(error = %error, "failed to save debug summary");
    }
    let summary_path = args
        .summary_path
        .clone()
        .unwrap_or_else(|| args.output.with_extension("summary.json"));
    write_json_pretty(&summary_path, &summary)?;

    info!(path = %summary_path.display(), "wrote run summary");
    info!(
        records = summary.statistics.total_records,
        male = summary.statistics.male_count,
        female = summary.statistics.female_count,
        metadata_fields = summary.metadata.len(),
        "extraction completed"
    );

    Ok(())
}

fn validate_input(input: &Path) -> Result<()> {
    if !input.exists() {
        bail!("input file not found: {}", input.display());
    }

    let is_pdf = input
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("pdf"))
        .unwrap_or(false);
    if !is_pdf {
        bail!("input file must be a PDF: {}", input.display());
    }

    Ok(())
}

fn render_extract_command(args: &ExtractArgs) -> String {
    let mut command = vec![
        "rollscan".to_string(),
        "extract".to_string(),
        "--input".to_string(),
        args.input.display().to_string(),
        "--output".to_string(),
        args.output.display().to_string(),
        "--dpi".to_string(),
        args.dpi.to_string(),
        "--ocr-lang".to_string(),
        args.ocr_lang.clone(),
    ];

    if let Some(max_pages) = args.max_pages {
        command.push("--max-pages".to_string());
        command.push(max_pages.to_string());
    }
    if args.no_debug {
        command.push("--no-debug".to_string());
    } else {
        command.push("--debug-dir".to_string());
        command.push(args.debug_dir.display().to_string());
    }
    if let Some(path) = &args.summary_path {
        command.push("--summary-path".to_string());
        command.push(path.display().to_string());
    }

    command.join(" ")
}
