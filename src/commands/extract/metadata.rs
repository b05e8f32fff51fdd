use anyhow::{Context, Result};
use regex::Regex;
use tracing::debug;

use crate::model::{DocumentMetadata, MetadataField};

/// Pages whose headers are scanned for metadata; later pages only repeat them.
pub(crate) const METADATA_PAGE_LIMIT: usize = 3;

/// Capture group `i + 1` of whichever pattern matches first fills `fields[i]`.
/// Patterns run from most to least specific.
pub(crate) struct MetadataRule {
    pub(crate) fields: &'static [MetadataField],
    pub(crate) patterns: &'static [&'static str],
}

pub(crate) const METADATA_RULES: &[MetadataRule] = &[
    MetadataRule {
        fields: &[
            MetadataField::AssemblyConstituencyNo,
            MetadataField::AssemblyConstituencyName,
        ],
        patterns: &[
            r"(?is)Assembly\s+Constituency.*?(\d+).*?[-–—]\s*([A-Z][A-Z\s()]+?)(?:Part|GENERAL|$)",
            r"(?is)Constituency.*?(\d+).*?[-–—]\s*([A-Z][A-Z\s()]+?)(?:Part|GENERAL|$)",
            r"(?is)(\d{2,3})\s*[-–—]\s*([A-Z][A-Z\s()]{5,}?)(?:Part|GENERAL|$)",
            r"(?is)(\d+)\s*[-–—]\s*([A-Z\s]{8,}?)(?:\s|$)",
        ],
    },
    MetadataRule {
        fields: &[MetadataField::PartNo],
        patterns: &[
            r"(?i)Part\s+No\.?\s*:?\s*(\d+)",
            r"(?i)Part\s+Number\s*:?\s*(\d+)",
            r"(?i)Part\s*:?\s*(\d+)",
            r"(\d+)\s*\z",
        ],
    },
    MetadataRule {
        fields: &[
            MetadataField::ParliamentaryConstituencyNo,
            MetadataField::ParliamentaryConstituencyName,
        ],
        patterns: &[
            r"(?is)Parliamentary\s+Constituency.*?(\d+).*?[-–—]\s*([A-Z][A-Z ()]+)",
            r"(?is)Lok\s+Sabha.*?(\d+).*?[-–—]\s*([A-Z][A-Z ()]+)",
        ],
    },
    MetadataRule {
        fields: &[MetadataField::District],
        patterns: &[r"(?im)District\s*:?\s*([A-Z][A-Z ]+?)(?:\s*\d|\s*Pin|\s*$)"],
    },
    MetadataRule {
        fields: &[MetadataField::Subdivision],
        patterns: &[r"(?im)Subdivision\s*:?\s*([A-Z][A-Z ]+?)(?:\s*District|\s*$)"],
    },
    MetadataRule {
        fields: &[MetadataField::Tehsil],
        patterns: &[r"(?im)Tehsil\s*:?\s*([A-Z][A-Z ]+?)\s*$"],
    },
    MetadataRule {
        fields: &[MetadataField::Block],
        patterns: &[r"(?im)Block\s*:?\s*([A-Z][A-Z ]+?)\s*$"],
    },
    MetadataRule {
        fields: &[MetadataField::PinCode],
        patterns: &[r"(?i)Pin\s+code\s*:?\s*(\d{6})"],
    },
];

#[derive(Debug)]
struct CompiledRule {
    fields: &'static [MetadataField],
    patterns: Vec<Regex>,
}

#[derive(Debug)]
pub(crate) struct MetadataExtractor {
    rules: Vec<CompiledRule>,
}

impl MetadataExtractor {
    pub(crate) fn new() -> Result<Self> {
        Self::with_rules(METADATA_RULES)
    }

    pub(crate) fn with_rules(rules: &[MetadataRule]) -> Result<Self> {
        let rules = rules
            .iter()
            .map(|rule| {
                let patterns = rule
                    .patterns
                    .iter()
                    .map(|pattern| {
                        Regex::new(pattern)
                            .with_context(|| format!("failed to compile metadata regex {pattern}"))
                    })
                    .collect::<Result<Vec<_>>>()?;
                Ok(CompiledRule {
                    fields: rule.fields,
                    patterns,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { rules })
    }

    /// Header fields present in `text`. Absent fields are simply omitted.
    pub(crate) fn extract(&self, text: &str) -> DocumentMetadata {
        let mut metadata = DocumentMetadata::default();

        for rule in &self.rules {
            let Some(captures) = rule
                .patterns
                .iter()
                .find_map(|pattern| pattern.captures(text))
            else {
                continue;
            };

            for (index, field) in rule.fields.iter().enumerate() {
                let Some(value) = captures.get(index + 1) else {
                    continue;
                };
                let value = value.as_str().trim();
                if value.is_empty() {
                    continue;
                }

                debug!(field = field.as_str(), value = %value, "metadata field matched");
                metadata.insert(*field, value);
            }
        }

        metadata
    }
}
