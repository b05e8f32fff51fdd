use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetadataField {
    AssemblyConstituencyNo,
    AssemblyConstituencyName,
    PartNo,
    ParliamentaryConstituencyNo,
    ParliamentaryConstituencyName,
    District,
    Subdivision,
    Tehsil,
    Block,
    PinCode,
}

impl MetadataField {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AssemblyConstituencyNo => "assembly_constituency_no",
            Self::AssemblyConstituencyName => "assembly_constituency_name",
            Self::PartNo => "part_no",
            Self::ParliamentaryConstituencyNo => "parliamentary_constituency_no",
            Self::ParliamentaryConstituencyName => "parliamentary_constituency_name",
            Self::District => "district",
            Self::Subdivision => "subdivision",
            Self::Tehsil => "tehsil",
            Self::Block => "block",
            Self::PinCode => "pin_code",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::AssemblyConstituencyNo => "Assembly Constituency No",
            Self::AssemblyConstituencyName => "Assembly Constituency Name",
            Self::PartNo => "Part No",
            Self::ParliamentaryConstituencyNo => "Parliamentary Constituency No",
            Self::ParliamentaryConstituencyName => "Parliamentary Constituency Name",
            Self::District => "District",
            Self::Subdivision => "Subdivision",
            Self::Tehsil => "Tehsil",
            Self::Block => "Block",
            Self::PinCode => "Pin Code",
        }
    }
}

/// Header fields shared by every record of a document.
///
/// Merging uses update semantics: a later page overwrites a value an
/// earlier page already set for the same field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentMetadata {
    fields: BTreeMap<MetadataField, String>,
}

impl DocumentMetadata {
    pub fn get(&self, field: MetadataField) -> Option<&str> {
        self.fields.get(&field).map(String::as_str)
    }

    pub fn insert(&mut self, field: MetadataField, value: impl Into<String>) {
        self.fields.insert(field, value.into());
    }

    pub fn merge(&mut self, other: DocumentMetadata) {
        // TODO: decide whether a value found on page 1 should survive a looser
        // match on page 3; the overwrite is kept until rolls prove otherwise.
        self.fields.extend(other.fields);
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (MetadataField, &str)> {
        self.fields
            .iter()
            .map(|(field, value)| (*field, value.as_str()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    #[serde(rename = "M")]
    Male,
    #[serde(rename = "F")]
    Female,
    #[serde(rename = "T")]
    Other,
}

impl Gender {
    pub fn code(self) -> &'static str {
        match self {
            Self::Male => "M",
            Self::Female => "F",
            Self::Other => "T",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AgeGroup {
    #[serde(rename = "Under 18")]
    Under18,
    #[serde(rename = "18-29")]
    From18To29,
    #[serde(rename = "30-45")]
    From30To45,
    #[serde(rename = "46+")]
    From46,
}

impl AgeGroup {
    pub fn for_age(age: u32) -> Self {
        match age {
            0..=17 => Self::Under18,
            18..=29 => Self::From18To29,
            30..=45 => Self::From30To45,
            _ => Self::From46,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Under18 => "Under 18",
            Self::From18To29 => "18-29",
            Self::From30To45 => "30-45",
            Self::From46 => "46+",
        }
    }
}

/// One parsed roll entry. Metadata-sourced fields are copies taken when the
/// record was built.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub parliamentary_constituency_no: String,
    pub assembly_constituency_no: String,
    pub part_no: String,
    pub assembly_constituency_name: String,
    pub panchayat_name: String,
    pub ward: String,
    pub tehsil_block: String,
    pub region: String,
    pub division: String,
    pub district: String,
    pub voter_id: String,
    pub serial_no: String,
    pub name: String,
    pub relative_name: String,
    pub house_no: String,
    pub age: u32,
    pub gender: Option<Gender>,
    pub religion: String,
    pub caste: String,
    pub age_group: Option<AgeGroup>,
    pub family_size: String,
}

pub const RECORD_COLUMN_LABELS: [&str; 21] = [
    "Lok Sabha Constituency No",
    "Vidhan Sabha Constituency No",
    "Part No",
    "Vidhan Sabha Name",
    "Grampanchayat Name",
    "Ward No/Ward Name",
    "Tehsil/Block Name",
    "Region",
    "Division",
    "District",
    "EPIC",
    "Serial No",
    "Name",
    "Father/Husband Name",
    "House No",
    "Age",
    "Gender",
    "Religion",
    "Caste",
    "Age Group",
    "Family Size",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellValue<'a> {
    Text(&'a str),
    Integer(i64),
}

impl Record {
    /// Cell values in `RECORD_COLUMN_LABELS` order.
    pub fn cells(&self) -> [CellValue<'_>; 21] {
        use CellValue::{Integer, Text};

        [
            Text(&self.parliamentary_constituency_no),
            Text(&self.assembly_constituency_no),
            Text(&self.part_no),
            Text(&self.assembly_constituency_name),
            Text(&self.panchayat_name),
            Text(&self.ward),
            Text(&self.tehsil_block),
            Text(&self.region),
            Text(&self.division),
            Text(&self.district),
            Text(&self.voter_id),
            Text(&self.serial_no),
            Text(&self.name),
            Text(&self.relative_name),
            Text(&self.house_no),
            Integer(i64::from(self.age)),
            Text(self.gender.map(Gender::code).unwrap_or("")),
            Text(&self.religion),
            Text(&self.caste),
            Text(self.age_group.map(AgeGroup::as_str).unwrap_or("")),
            Text(&self.family_size),
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentStrategy {
    Identifier,
    NameLabel,
    SerialNumber,
}

impl SegmentStrategy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Identifier => "identifier",
            Self::NameLabel => "name_label",
            Self::SerialNumber => "serial_number",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PageReport {
    pub page_number: usize,
    pub text_char_count: usize,
    pub ocr_profile: Option<String>,
    pub ocr_score: Option<f64>,
    pub strategy: Option<SegmentStrategy>,
    pub block_count: usize,
    pub record_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ToolVersions {
    pub pdftoppm: Option<String>,
    pub tesseract: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecordStatistics {
    pub total_records: usize,
    pub male_count: usize,
    pub female_count: usize,
    pub age_distribution: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub manifest_version: u32,
    pub run_id: String,
    pub started_at: String,
    pub finished_at: String,
    pub command: String,
    pub tool_versions: Option<ToolVersions>,
    pub input_path: String,
    pub input_sha256: String,
    pub dpi: Option<u32>,
    pub page_count: usize,
    pub pages: Vec<PageReport>,
    pub metadata: DocumentMetadata,
    pub statistics: RecordStatistics,
    pub sample_records: Vec<Record>,
    pub warnings: Vec<String>,
}
