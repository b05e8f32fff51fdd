use std::fs;
use std::io::Write;

use anyhow::{Context, Result, bail};
use serde::Serialize;
use tracing::{info, warn};

use crate::cli::ParseArgs;
use crate::commands::extract::{
    PipelineState, RecordPipeline, SqliteWorkbookExporter, TabularExporter, record_statistics,
    validate_workbook_path,
};
use crate::model::{DocumentMetadata, PageReport, Record, RecordStatistics};

const PARSE_METHOD: &str = "Recognized text import";

#[derive(Debug, Serialize)]
struct ParseOutput<'a> {
    metadata: &'a DocumentMetadata,
    pages: &'a [PageReport],
    statistics: RecordStatistics,
    records: &'a [Record],
}

pub fn run(args: ParseArgs) -> Result<()> {
    if !args.input.exists() {
        bail!("input file not found: {}", args.input.display());
    }
    if let Some(output) = &args.output {
        validate_workbook_path(output)?;
    }

    let raw = fs::read(&args.input)
        .with_context(|| format!("failed to read {}", args.input.display()))?;
    let pages = split_pages(&String::from_utf8_lossy(&raw));

    info!(input = %args.input.display(), pages = pages.len(), "parsing recognized text");

    let pipeline = RecordPipeline::new()?;
    let mut state = PipelineState::default();
    let reports = pages
        .iter()
        .enumerate()
        .map(|(index, page)| pipeline.process_page(&mut state, index + 1, page))
        .collect::<Vec<PageReport>>();

    if state.records.is_empty() {
        warn!(input = %args.input.display(), "no voter records were extracted");
    } else if let Some(output) = &args.output {
        SqliteWorkbookExporter::new(output).export(&state.records, &state.metadata, PARSE_METHOD)?;
    }

    if args.json {
        let output = ParseOutput {
            metadata: &state.metadata,
            pages: &reports,
            statistics: record_statistics(&state.records),
            records: &state.records,
        };
        let mut stdout = std::io::stdout().lock();
        serde_json::to_writer_pretty(&mut stdout, &output).context("failed to write JSON output")?;
        writeln!(stdout).context("failed to write JSON output")?;
    }

    info!(records = state.records.len(), "parse completed");
    Ok(())
}

/// Splits text on form feeds and drops trailing blank pages.
fn split_pages(raw: &str) -> Vec<String> {
    let mut pages: Vec<String> = raw
        .split('\u{000C}')
        .map(|chunk| chunk.replace('\u{0000}', ""))
        .collect();

    while let Some(last_page) = pages.last() {
        if last_page.trim().is_empty() {
            pages.pop();
            continue;
        }
        break;
    }

    pages
}
