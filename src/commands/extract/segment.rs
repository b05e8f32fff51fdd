use anyhow::{Context, Result};
use regex::Regex;
use tracing::debug;

use crate::model::SegmentStrategy;
use crate::util::{offset_chars_back, offset_chars_forward, truncate_chars};

/// Alphanumeric voter identifier shapes, most specific first.
pub(crate) const IDENTIFIER_PATTERNS: &[&str] = &[
    r"[A-Z]{2,4}/\d+/\d+/\d+",
    r"[A-Z]{3}\d{7,10}",
    r"[A-Z]{2,4}\d{7,10}",
];

/// Words that must appear in a `Name:` fragment for it to count as a record.
const NAME_BLOCK_KEYWORDS: &[&str] = &["age", "gender", "house"];

const LEAD_IN_CHARS: usize = 50;
const LAST_IDENTIFIER_SPAN_CHARS: usize = 1000;
const MIN_IDENTIFIER_BLOCK_CHARS: usize = 20;
const NAME_FRAGMENT_CHARS: usize = 500;
const SERIAL_FRAGMENT_CHARS: usize = 800;
const MIN_FALLBACK_BLOCK_CHARS: usize = 30;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RecordBlock {
    pub(crate) text: String,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct Segmentation {
    pub(crate) strategy: Option<SegmentStrategy>,
    pub(crate) blocks: Vec<RecordBlock>,
}

#[derive(Debug)]
pub(crate) struct RecordSegmenter {
    identifiers: Vec<Regex>,
    name_label: Regex,
    serial_anchor: Regex,
}

impl RecordSegmenter {
    pub(crate) fn new() -> Result<Self> {
        let identifiers = IDENTIFIER_PATTERNS
            .iter()
            .map(|pattern| {
                Regex::new(pattern)
                    .with_context(|| format!("failed to compile identifier regex {pattern}"))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            identifiers,
            name_label: Regex::new(r"(?i)Name\s*:").context("failed to compile name label regex")?,
            serial_anchor: Regex::new(r"(?i)(\d+)\s+([A-Z]{2,4}[/\d]+|Name\s*:)")
                .context("failed to compile serial anchor regex")?,
        })
    }

    /// Splits normalized page text into candidate record blocks. The first
    /// strategy that yields a block wins; weaker anchors are not tried.
    pub(crate) fn segment(&self, text: &str) -> Segmentation {
        let attempts: [(SegmentStrategy, fn(&Self, &str) -> Vec<RecordBlock>); 3] = [
            (SegmentStrategy::Identifier, Self::by_identifier),
            (SegmentStrategy::NameLabel, Self::by_name_label),
            (SegmentStrategy::SerialNumber, Self::by_serial_number),
        ];

        for (strategy, attempt) in attempts {
            let blocks = attempt(self, text);
            debug!(strategy = strategy.as_str(), blocks = blocks.len(), "segmentation attempt");
            if !blocks.is_empty() {
                return Segmentation {
                    strategy: Some(strategy),
                    blocks,
                };
            }
        }

        Segmentation::default()
    }

    fn identifier_starts(&self, text: &str) -> Vec<usize> {
        let mut spans = self
            .identifiers
            .iter()
            .flat_map(|pattern| pattern.find_iter(text).map(|m| (m.start(), m.end())))
            .collect::<Vec<_>>();
        spans.sort_by(|a, b| a.0.cmp(&b.0).then(b.1.cmp(&a.1)));

        // Looser shapes re-match the same token, sometimes one letter later.
        let mut starts = Vec::with_capacity(spans.len());
        let mut covered_until = 0usize;
        for (start, end) in spans {
            if start < covered_until {
                continue;
            }
            starts.push(start);
            covered_until = end;
        }

        starts
    }

    fn by_identifier(&self, text: &str) -> Vec<RecordBlock> {
        let starts = self.identifier_starts(text);

        starts
            .iter()
            .enumerate()
            .filter_map(|(index, &start)| {
                let block_start = offset_chars_back(text, start, LEAD_IN_CHARS);
                let block_end = match starts.get(index + 1) {
                    Some(&next) => next,
                    None => offset_chars_forward(text, start, LAST_IDENTIFIER_SPAN_CHARS),
                };
                let block = text[block_start..block_end].trim();
                (block.chars().count() > MIN_IDENTIFIER_BLOCK_CHARS).then(|| RecordBlock {
                    text: block.to_string(),
                })
            })
            .collect()
    }

    fn by_name_label(&self, text: &str) -> Vec<RecordBlock> {
        self.name_label
            .split(text)
            .skip(1)
            .filter_map(|fragment| {
                let block = format!("Name: {}", truncate_chars(fragment, NAME_FRAGMENT_CHARS).trim());
                let lowered = block.to_lowercase();
                let corroborated = NAME_BLOCK_KEYWORDS
                    .iter()
                    .any(|keyword| lowered.contains(keyword));
                (block.chars().count() > MIN_FALLBACK_BLOCK_CHARS && corroborated)
                    .then_some(RecordBlock { text: block })
            })
            .collect()
    }

    fn by_serial_number(&self, text: &str) -> Vec<RecordBlock> {
        let anchors = self.serial_anchor.captures_iter(text).collect::<Vec<_>>();

        anchors
            .iter()
            .enumerate()
            .filter_map(|(index, captures)| {
                let whole = captures.get(0)?;
                let serial = captures.get(1)?.as_str();
                let label = captures.get(2)?.as_str();
                let content_end = anchors
                    .get(index + 1)
                    .and_then(|next| next.get(0))
                    .map(|next| next.start())
                    .unwrap_or(text.len());
                let content =
                    truncate_chars(&text[whole.end()..content_end], SERIAL_FRAGMENT_CHARS).trim();

                let block = format!("{serial} {label} {content}").trim().to_string();
                (block.chars().count() > MIN_FALLBACK_BLOCK_CHARS)
                    .then_some(RecordBlock { text: block })
            })
            .collect()
    }
}
