use anyhow::{Context, Result};
use regex::Regex;

use super::segment::IDENTIFIER_PATTERNS;
use crate::model::{AgeGroup, DocumentMetadata, Gender, MetadataField, Record};

const SERIAL_PATTERNS: &[&str] = &[r"^(\d+)\s+"];

const NAME_PATTERNS: &[&str] = &[
    r"(?i)Name\s*:\s*([A-Za-z\s.]+?)\s*\b(?:Father|Husband|Other|Age|House|Gender)\b",
    r"(?im)Name\s*:\s*([A-Za-z\s.]+?)\s*$",
    r"(?m)(?:^|\s)([A-Z][a-z]+(?:\s+[A-Z][a-z]+)*)\s*(?i:Father|Husband|w/o|s/o)\b",
];

const RELATIVE_NAME_PATTERNS: &[&str] = &[
    r"(?im)\b(?:Father|Husband|Other)(?:'?s)?\s*Name\s*:\s*([A-Za-z\s.]+?)\s*(?:\b(?:House|Age|Gender)\b|$)",
    r"(?im)\b(?:w/o|s/o|d/o)\s*([A-Za-z\s.]+?)\s*(?:\b(?:House|Age|Gender)\b|$)",
    r"(?im)\b(?:Father|Husband)\s*:\s*([A-Za-z\s.]+?)\s*(?:\b(?:House|Age|Gender)\b|$)",
];

const AGE_PATTERNS: &[&str] = &[
    r"(?i)\bAge\s*:\s*(\d+)",
    r"(?i)\bAge\s+(\d+)",
    r"(?i)\b(\d+)\s*years?\b",
    r"(?i)\b(\d{2})\s*(?:Gender|Male|Female)\b",
];

const GENDER_PATTERNS: &[&str] = &[
    r"(?i)Gender\s*:\s*(Male|Female|Third\s*Gender)",
    r"(?i)\b(Male|Female)(?:\s|$)",
    r"(?i)(?:^|\s)(M|F)(?:\s|$)",
];

const HOUSE_PATTERNS: &[&str] = &[
    r"(?im)\bHouse\s*(?:Number|No\.?)?\s*:\s*([A-Za-z0-9/\-\s]+?)\s*(?:\b(?:Age|Gender|Photo)\b|$)",
    r"(?im)(?:^|\s)([A-Za-z0-9/\-]{1,20})\s*\b(?:Age|Gender)\b",
    r"(?im)\b(?:Address|House)\s*:\s*([A-Za-z0-9/\-\s]+?)\s*$",
];

/// District name fragments grouped under the state reported as the region.
pub(crate) const DISTRICT_REGIONS: &[(&str, &[&str])] = &[
    (
        "West Bengal",
        &[
            "hooghly",
            "kolkata",
            "howrah",
            "north 24 parganas",
            "south 24 parganas",
            "darjeeling",
        ],
    ),
    (
        "Uttar Pradesh",
        &[
            "agra",
            "lucknow",
            "kanpur",
            "allahabad",
            "varanasi",
            "meerut",
            "ghaziabad",
        ],
    ),
    ("Maharashtra", &["mumbai", "pune", "nagpur", "thane", "nashik"]),
    ("Gujarat", &["ahmedabad", "surat", "vadodara", "rajkot"]),
    ("Rajasthan", &["jaipur", "jodhpur", "udaipur", "bikaner"]),
    ("Bihar", &["patna", "gaya", "muzaffarpur", "bhagalpur"]),
    ("Odisha", &["bhubaneswar", "cuttack", "berhampur", "sambalpur"]),
];

pub(crate) const MIN_AGE: u32 = 18;
pub(crate) const MAX_AGE: u32 = 120;
const MAX_HOUSE_CHARS: usize = 30;

/// An ordered list of matchers for one field. The first pattern whose first
/// match passes validation wins; a rejected match falls through.
#[derive(Debug)]
pub(crate) struct FieldCascade {
    patterns: Vec<Regex>,
}

impl FieldCascade {
    pub(crate) fn new(field: &str, patterns: &[&str]) -> Result<Self> {
        let patterns = patterns
            .iter()
            .map(|pattern| {
                Regex::new(pattern)
                    .with_context(|| format!("failed to compile {field} regex {pattern}"))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { patterns })
    }

    pub(crate) fn first_valid<T>(&self, text: &str, accept: impl Fn(&str) -> Option<T>) -> Option<T> {
        self.patterns.iter().find_map(|pattern| {
            let captures = pattern.captures(text)?;
            let value = captures.get(1).or_else(|| captures.get(0))?;
            accept(value.as_str())
        })
    }
}

#[derive(Debug)]
pub(crate) struct RecordBuilder {
    identifier: FieldCascade,
    serial: FieldCascade,
    name: FieldCascade,
    relative_name: FieldCascade,
    age: FieldCascade,
    gender: FieldCascade,
    house: FieldCascade,
}

impl RecordBuilder {
    pub(crate) fn new() -> Result<Self> {
        Ok(Self {
            identifier: FieldCascade::new("identifier", IDENTIFIER_PATTERNS)?,
            serial: FieldCascade::new("serial", SERIAL_PATTERNS)?,
            name: FieldCascade::new("name", NAME_PATTERNS)?,
            relative_name: FieldCascade::new("relative name", RELATIVE_NAME_PATTERNS)?,
            age: FieldCascade::new("age", AGE_PATTERNS)?,
            gender: FieldCascade::new("gender", GENDER_PATTERNS)?,
            house: FieldCascade::new("house", HOUSE_PATTERNS)?,
        })
    }

    /// Parses one normalized block. Returns `None` when the block lacks a
    /// valid name or age; that is a dropped block, not an error.
    pub(crate) fn build(
        &self,
        block: &str,
        sequence_hint: usize,
        metadata: &DocumentMetadata,
    ) -> Option<Record> {
        let mut record = record_from_metadata(metadata);

        record.voter_id = self
            .identifier
            .first_valid(block, |value| Some(value.to_string()))
            .unwrap_or_default();
        record.serial_no = self
            .serial
            .first_valid(block, |value| Some(value.to_string()))
            .unwrap_or_else(|| sequence_hint.to_string());
        record.name = self.name.first_valid(block, accept_person_name)?;
        record.relative_name = self
            .relative_name
            .first_valid(block, accept_person_name)
            .unwrap_or_default();

        let age = self.age.first_valid(block, accept_age)?;
        record.age = age;
        record.age_group = Some(AgeGroup::for_age(age));

        record.gender = self.gender.first_valid(block, |value| Some(gender_code(value)));
        record.house_no = self
            .house
            .first_valid(block, |value| {
                let house = value.trim();
                (!house.is_empty() && house.chars().count() <= MAX_HOUSE_CHARS)
                    .then(|| house.to_string())
            })
            .unwrap_or_default();

        Some(record)
    }
}

fn record_from_metadata(metadata: &DocumentMetadata) -> Record {
    let field = |key: MetadataField| metadata.get(key).unwrap_or_default().to_string();
    let subdivision = field(MetadataField::Subdivision);
    let district = field(MetadataField::District);

    // Rolls that print a development block instead of a tehsil use it for the
    // same column; subdivision is the last resort.
    let tehsil_block = metadata
        .get(MetadataField::Tehsil)
        .or_else(|| metadata.get(MetadataField::Block))
        .map(str::to_string)
        .unwrap_or_else(|| subdivision.clone());

    Record {
        parliamentary_constituency_no: field(MetadataField::ParliamentaryConstituencyNo),
        assembly_constituency_no: field(MetadataField::AssemblyConstituencyNo),
        part_no: field(MetadataField::PartNo),
        assembly_constituency_name: field(MetadataField::AssemblyConstituencyName),
        tehsil_block,
        region: region_for_district(&district),
        division: subdivision,
        district,
        ..Record::default()
    }
}

fn accept_person_name(value: &str) -> Option<String> {
    let name = value.trim();
    let length = name.chars().count();
    let valid = (2..=50).contains(&length) && !name.chars().any(|c| c.is_ascii_digit());
    valid.then(|| name.to_string())
}

fn accept_age(value: &str) -> Option<u32> {
    let age = value.parse::<u32>().ok()?;
    (MIN_AGE..=MAX_AGE).contains(&age).then_some(age)
}

pub(crate) fn gender_code(value: &str) -> Gender {
    let lowered = value.trim().to_ascii_lowercase();
    if lowered == "f" || lowered.starts_with("female") {
        Gender::Female
    } else if lowered == "m" || lowered.starts_with("male") {
        Gender::Male
    } else {
        Gender::Other
    }
}

/// Maps a district to its state; unknown districts are their own region.
pub(crate) fn region_for_district(district: &str) -> String {
    if district.is_empty() {
        return String::new();
    }

    let lowered = district.to_lowercase();
    DISTRICT_REGIONS
        .iter()
        .find(|(_, districts)| districts.iter().any(|name| lowered.contains(name)))
        .map(|(region, _)| region.to_string())
        .unwrap_or_else(|| district.to_string())
}
