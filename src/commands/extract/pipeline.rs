use anyhow::Result;
use tracing::{info, warn};

use super::metadata::{METADATA_PAGE_LIMIT, MetadataExtractor};
use super::normalize::TextNormalizer;
use super::record::RecordBuilder;
use super::segment::RecordSegmenter;
use crate::model::{DocumentMetadata, PageReport, Record};

/// Running state of one document: the only cross-page data in a run.
#[derive(Debug, Default)]
pub(crate) struct PipelineState {
    pub(crate) metadata: DocumentMetadata,
    pub(crate) records: Vec<Record>,
}

#[derive(Debug)]
pub(crate) struct RecordPipeline {
    normalizer: TextNormalizer,
    metadata: MetadataExtractor,
    segmenter: RecordSegmenter,
    builder: RecordBuilder,
}

impl RecordPipeline {
    pub(crate) fn new() -> Result<Self> {
        Ok(Self {
            normalizer: TextNormalizer::new()?,
            metadata: MetadataExtractor::new()?,
            segmenter: RecordSegmenter::new()?,
            builder: RecordBuilder::new()?,
        })
    }

    /// Parses one page of recognized text into `state`. Header pages update
    /// the metadata before any record on the same page is built, so every
    /// record sees all metadata found up to and including its page.
    pub(crate) fn process_page(
        &self,
        state: &mut PipelineState,
        page_number: usize,
        raw_text: &str,
    ) -> PageReport {
        let clean = self.normalizer.normalize(raw_text);
        let mut report = PageReport {
            page_number,
            text_char_count: clean.chars().count(),
            ..PageReport::default()
        };

        if clean.is_empty() {
            warn!(page = page_number, "no text recovered for page");
            return report;
        }

        if page_number <= METADATA_PAGE_LIMIT {
            let found = self.metadata.extract(&clean);
            if !found.is_empty() {
                info!(page = page_number, fields = found.len(), "metadata found");
            }
            state.metadata.merge(found);
        }

        let segmentation = self.segmenter.segment(&clean);
        report.strategy = segmentation.strategy;
        report.block_count = segmentation.blocks.len();

        let records = self.page_records(
            &segmentation.blocks.iter().map(|block| block.text.as_str()).collect::<Vec<_>>(),
            state.records.len(),
            &state.metadata,
        );
        report.record_count = records.len();
        state.records.extend(records);

        info!(
            page = page_number,
            strategy = report.strategy.map(|strategy| strategy.as_str()).unwrap_or("none"),
            blocks = report.block_count,
            records = report.record_count,
            "page parsed"
        );

        report
    }

    /// Builds the records of one page against a metadata snapshot. Sequence
    /// hints continue from `records_before`.
    pub(crate) fn page_records(
        &self,
        blocks: &[&str],
        records_before: usize,
        metadata: &DocumentMetadata,
    ) -> Vec<Record> {
        blocks
            .iter()
            .enumerate()
            .filter_map(|(index, block)| {
                self.builder
                    .build(block, records_before + index + 1, metadata)
            })
            .collect()
    }
}
