use std::cell::RefCell;

use anyhow::{Result, anyhow, bail};
use image::{DynamicImage, GrayImage, Luma};

use super::*;
use super::debug_sink::{DebugSink, DirectoryDebugSink, NoopDebugSink};
use super::error::CollaboratorError;
use super::metadata::MetadataExtractor;
use super::normalize::TextNormalizer;
use super::ocr_select::{
    AttemptScore, MIN_OCR_WIDTH, OCR_PROFILES, OcrEngine, OcrProfile, OcrResult, OcrSelector,
    preprocess_for_ocr,
};
use super::rasterize::{rendered_page_number, validate_dpi};
use super::record::{RecordBuilder, gender_code, region_for_district};
use super::segment::RecordSegmenter;
use super::tesseract::{ScratchImage, mean_token_confidence};
use crate::model::{
    AgeGroup, DocumentMetadata, Gender, MetadataField, Record, RunSummary, SegmentStrategy,
};

const ROLL_PAGE: &str = "1 AB1234567 Name: Jane Roe Father Name: John Roe House Number: 12A \
Age: 34 Gender: Female Photo not available for this elector entry see remarks \
2 CD7654321 Name: Rita Sen Husband Name: Amal Sen House Number: 4/B Age: 58 \
Gender: Female Photo not available for this elector entry see remarks \
3 EFG9876543 Name: Mohan Das Father Name: Hari Das House Number: 7 Age: 150 \
Gender: Male Photo not available for this elector entry see remarks";

fn normalizer() -> TextNormalizer {
    TextNormalizer::new().expect("normalizer regexes compile")
}

fn segmenter() -> RecordSegmenter {
    RecordSegmenter::new().expect("segmenter regexes compile")
}

fn builder() -> RecordBuilder {
    RecordBuilder::new().expect("record regexes compile")
}

#[test]
fn normalize_corrects_header_words_as_whole_words() {
    let normalized = normalizer().normalize("Narne : Jane  Aqe:34 Fernale Aggregate Nanrest");
    assert_eq!(normalized, "Name: Jane Age: 34 Female Aggregate Nanrest");
}

#[test]
fn normalize_collapses_whitespace_and_blank_lines() {
    let raw = "  Part No :7\t\t,Block\r\n\n\n   District: HOOGHLY   \n\n";
    assert_eq!(normalizer().normalize(raw), "Part No: 7, Block\nDistrict: HOOGHLY");
}

#[test]
fn normalize_empty_text_stays_empty() {
    assert_eq!(normalizer().normalize(""), "");
    assert_eq!(normalizer().normalize(" \n\t "), "");
}

#[test]
fn normalize_is_idempotent() {
    let normalizer = normalizer();
    let samples = [
        "",
        "Name:",
        "a::b ,, c",
        "  Narne :Jane\n\n\nHusbamd  Name : Ram ,Agge: 41  ",
        "x : \n : y",
        ROLL_PAGE,
        "Assembly Constituency No. 42 – SAMPLE TOWN\r\n\r\nPart No:7",
    ];

    for sample in samples {
        let once = normalizer.normalize(sample);
        assert_eq!(normalizer.normalize(&once), once, "sample: {sample:?}");
    }
}

#[test]
fn metadata_reads_constituency_and_part_from_header() {
    let extractor = MetadataExtractor::new().expect("metadata regexes compile");
    let text = normalizer().normalize("Assembly Constituency No. 42 - SAMPLE TOWN Part No: 7");

    let metadata = extractor.extract(&text);
    assert_eq!(metadata.get(MetadataField::AssemblyConstituencyNo), Some("42"));
    assert_eq!(
        metadata.get(MetadataField::AssemblyConstituencyName),
        Some("SAMPLE TOWN")
    );
    assert_eq!(metadata.get(MetadataField::PartNo), Some("7"));
}

#[test]
fn metadata_reads_location_lines() {
    let extractor = MetadataExtractor::new().expect("metadata regexes compile");
    let text = normalizer().normalize(
        "Parliamentary Constituency 28 - HOOGHLY\nDistrict : HOOGHLY\nPin code: 712101",
    );

    let metadata = extractor.extract(&text);
    assert_eq!(
        metadata.get(MetadataField::ParliamentaryConstituencyNo),
        Some("28")
    );
    assert_eq!(metadata.get(MetadataField::District), Some("HOOGHLY"));
    assert_eq!(metadata.get(MetadataField::PinCode), Some("712101"));
}

#[test]
fn metadata_omits_fields_without_matches() {
    let extractor = MetadataExtractor::new().expect("metadata regexes compile");
    let metadata = extractor.extract("nothing resembling a header here");
    assert!(metadata.is_empty());
}

#[test]
fn metadata_merge_lets_later_pages_overwrite() {
    let mut running = DocumentMetadata::default();
    running.insert(MetadataField::PartNo, "7");
    running.insert(MetadataField::District, "HOOGHLY");

    let mut later = DocumentMetadata::default();
    later.insert(MetadataField::PartNo, "8");
    running.merge(later);

    assert_eq!(running.get(MetadataField::PartNo), Some("8"));
    assert_eq!(running.get(MetadataField::District), Some("HOOGHLY"));
}

#[test]
fn segment_prefers_identifiers_over_name_labels() {
    let text = normalizer().normalize(ROLL_PAGE);
    let segmentation = segmenter().segment(&text);

    assert_eq!(segmentation.strategy, Some(SegmentStrategy::Identifier));
    assert_eq!(segmentation.blocks.len(), 3);
    assert!(segmentation.blocks[0].text.starts_with("1 AB1234567 Name: Jane Roe"));
    assert!(segmentation.blocks[1].text.contains("CD7654321 Name: Rita Sen"));
    assert!(!segmentation.blocks[0].text.contains("CD7654321"));
}

#[test]
fn segment_identifier_blocks_include_lead_in_text() {
    let text = format!("{}XYZ1234567 tail", "n".repeat(80));
    let segmentation = segmenter().segment(&text);

    assert_eq!(segmentation.blocks.len(), 1);
    assert_eq!(
        segmentation.blocks[0].text,
        format!("{}XYZ1234567 tail", "n".repeat(50))
    );
}

#[test]
fn segment_drops_overlapping_identifier_rematches() {
    let text = "serial 1 WBX12345678 Name: A Person Age: 40";
    let segmentation = segmenter().segment(text);

    assert_eq!(segmentation.strategy, Some(SegmentStrategy::Identifier));
    assert_eq!(segmentation.blocks.len(), 1);
}

#[test]
fn segment_falls_back_to_name_labels() {
    let text = "Header line Name: Jane Roe Age: 34 Gender: Female Name: Bad Fragment Name: Amit Roy House Number: 19/A";
    let segmentation = segmenter().segment(text);

    assert_eq!(segmentation.strategy, Some(SegmentStrategy::NameLabel));
    assert_eq!(segmentation.blocks.len(), 2);
    assert_eq!(
        segmentation.blocks[0].text,
        "Name: Jane Roe Age: 34 Gender: Female"
    );
    assert_eq!(segmentation.blocks[1].text, "Name: Amit Roy House Number: 19/A");
}

#[test]
fn segment_falls_back_to_serial_numbers() {
    let text = "12 wb/24/161 Jane Roe aged thirty four female 13 wb/24/162 Amit Roy aged forty male";
    let segmentation = segmenter().segment(text);

    assert_eq!(segmentation.strategy, Some(SegmentStrategy::SerialNumber));
    assert_eq!(segmentation.blocks.len(), 2);
    assert_eq!(
        segmentation.blocks[0].text,
        "12 wb/24/161 Jane Roe aged thirty four female"
    );
    assert_eq!(segmentation.blocks[1].text, "13 wb/24/162 Amit Roy aged forty male");
}

#[test]
fn segment_without_anchors_yields_nothing() {
    let segmentation = segmenter().segment("a page of prose with no anchors at all");
    assert_eq!(segmentation.strategy, None);
    assert!(segmentation.blocks.is_empty());
}

#[test]
fn build_record_parses_labelled_block() {
    let record = builder()
        .build(
            "12 AB1234567 Name: Jane Roe Age: 34 Gender: Female House: 12A",
            99,
            &DocumentMetadata::default(),
        )
        .expect("record accepted");

    assert_eq!(record.serial_no, "12");
    assert_eq!(record.voter_id, "AB1234567");
    assert_eq!(record.name, "Jane Roe");
    assert_eq!(record.age, 34);
    assert_eq!(record.age_group, Some(AgeGroup::From30To45));
    assert_eq!(record.gender, Some(Gender::Female));
    assert_eq!(record.house_no, "12A");
}

#[test]
fn build_record_rejects_out_of_range_ages() {
    let builder = builder();
    let metadata = DocumentMetadata::default();

    for age in ["150", "12"] {
        let block = format!("Name: Old Timer Age: {age} Gender: Male");
        assert_eq!(builder.build(&block, 1, &metadata), None, "age {age}");
    }
}

#[test]
fn build_record_falls_through_to_later_age_patterns() {
    let record = builder()
        .build(
            "Name: Asha Devi Age: 7 Husband: Ravi 62 years",
            1,
            &DocumentMetadata::default(),
        )
        .expect("record accepted");

    assert_eq!(record.age, 62);
    assert_eq!(record.age_group, Some(AgeGroup::From46));
}

#[test]
fn build_record_uses_sequence_hint_without_serial() {
    let record = builder()
        .build(
            "Name: Asha Devi Husband Name: Ravi Kumar Age: 29 Gender: Female",
            17,
            &DocumentMetadata::default(),
        )
        .expect("record accepted");

    assert_eq!(record.serial_no, "17");
    assert_eq!(record.relative_name, "Ravi Kumar");
    assert_eq!(record.age_group, Some(AgeGroup::From18To29));
}

#[test]
fn build_record_rejects_names_with_digits() {
    let record = builder().build(
        "Name: R2D2 Unit Age: 40 Gender: Male",
        1,
        &DocumentMetadata::default(),
    );
    assert_eq!(record, None);
}

#[test]
fn build_record_copies_metadata_fields() {
    let mut metadata = DocumentMetadata::default();
    metadata.insert(MetadataField::AssemblyConstituencyNo, "42");
    metadata.insert(MetadataField::PartNo, "7");
    metadata.insert(MetadataField::District, "HOOGHLY");
    metadata.insert(MetadataField::Subdivision, "CHINSURAH");

    let record = builder()
        .build("Name: Jane Roe Age: 34 Gender: F", 1, &metadata)
        .expect("record accepted");

    assert_eq!(record.assembly_constituency_no, "42");
    assert_eq!(record.part_no, "7");
    assert_eq!(record.district, "HOOGHLY");
    assert_eq!(record.region, "West Bengal");
    assert_eq!(record.division, "CHINSURAH");
    assert_eq!(record.tehsil_block, "CHINSURAH");
    assert_eq!(record.gender, Some(Gender::Female));
}

#[test]
fn gender_codes_distinguish_female_from_male() {
    assert_eq!(gender_code("Female"), Gender::Female);
    assert_eq!(gender_code("MALE"), Gender::Male);
    assert_eq!(gender_code("f"), Gender::Female);
    assert_eq!(gender_code("Third Gender"), Gender::Other);
}

#[test]
fn region_lookup_passes_unknown_districts_through() {
    assert_eq!(region_for_district("North 24 Parganas"), "West Bengal");
    assert_eq!(region_for_district("PUNE"), "Maharashtra");
    assert_eq!(region_for_district("Shimla"), "Shimla");
    assert_eq!(region_for_district(""), "");
}

#[test]
fn pipeline_threads_early_metadata_into_later_pages() {
    let pipeline = RecordPipeline::new().expect("pipeline regexes compile");
    let mut state = PipelineState::default();

    let header = "Assembly Constituency No. 42 - SAMPLE TOWN Part No: 7\nDistrict: HOOGHLY";
    let first = pipeline.process_page(&mut state, 1, header);
    assert_eq!(first.record_count, 0);

    let second = pipeline.process_page(&mut state, 2, ROLL_PAGE);
    assert_eq!(second.strategy, Some(SegmentStrategy::Identifier));
    assert_eq!(second.block_count, 3);
    assert_eq!(second.record_count, 2);

    let names = state
        .records
        .iter()
        .map(|record| record.name.as_str())
        .collect::<Vec<_>>();
    assert_eq!(names, vec!["Jane Roe", "Rita Sen"]);

    for record in &state.records {
        assert_eq!(record.assembly_constituency_no, "42");
        assert_eq!(record.part_no, "7");
        assert_eq!(record.region, "West Bengal");
    }
    assert_eq!(state.records[1].serial_no, "2");
    assert_eq!(state.records[1].relative_name, "Amal Sen");
    assert_eq!(state.records[1].house_no, "4/B");
}

#[test]
fn pipeline_ignores_headers_after_metadata_pages() {
    let pipeline = RecordPipeline::new().expect("pipeline regexes compile");
    let mut state = PipelineState::default();

    for page in 1..=3 {
        pipeline.process_page(&mut state, page, "blank");
    }
    pipeline.process_page(&mut state, 4, "Part No: 9");

    assert_eq!(state.metadata.get(MetadataField::PartNo), None);
}

#[test]
fn pipeline_skips_empty_pages() {
    let pipeline = RecordPipeline::new().expect("pipeline regexes compile");
    let mut state = PipelineState::default();

    let report = pipeline.process_page(&mut state, 1, "  \n ");
    assert_eq!(report.text_char_count, 0);
    assert_eq!(report.strategy, None);
    assert!(state.records.is_empty());
}

#[test]
fn accepted_records_always_have_name_and_valid_age() {
    let pipeline = RecordPipeline::new().expect("pipeline regexes compile");
    let mut state = PipelineState::default();
    let pages = [
        ROLL_PAGE,
        "Name: Ghost Age: 0 Gender: Male Name: Nobody House: 1",
        "5 Name: Kid Roe Age: 12 Gender: Male 6 Name: Ok Person Age: 120 Gender: M",
    ];

    for (index, page) in pages.iter().enumerate() {
        pipeline.process_page(&mut state, index + 1, page);
    }

    assert!(!state.records.is_empty());
    for record in &state.records {
        assert!(!record.name.is_empty());
        assert!((18..=120).contains(&record.age), "age {}", record.age);
    }
}

struct ScriptedEngine {
    results: Vec<Result<OcrResult, String>>,
    calls: RefCell<usize>,
}

impl ScriptedEngine {
    fn new(results: Vec<Result<OcrResult, String>>) -> Self {
        Self {
            results,
            calls: RefCell::new(0),
        }
    }
}

impl OcrEngine for ScriptedEngine {
    fn recognize(&self, _image: &DynamicImage, _profile: &OcrProfile) -> Result<OcrResult> {
        let mut calls = self.calls.borrow_mut();
        let index = *calls;
        *calls += 1;
        match self.results.get(index) {
            Some(Ok(result)) => Ok(result.clone()),
            Some(Err(message)) => Err(anyhow!(message.clone())),
            None => bail!("no scripted result for call {index}"),
        }
    }
}

fn scored(text: &str, confidence: f64) -> Result<OcrResult, String> {
    Ok(OcrResult {
        text: text.to_string(),
        confidence: Some(confidence),
    })
}

fn blank_page() -> DynamicImage {
    DynamicImage::ImageLuma8(GrayImage::from_pixel(40, 20, Luma([255])))
}

#[test]
fn selector_keeps_highest_confidence_attempt() {
    let engine = ScriptedEngine::new(vec![
        scored("first", 10.0),
        scored("second", 40.0),
        scored("third", 25.0),
    ]);
    let selector = OcrSelector::with_profiles(&engine, &NoopDebugSink, &OCR_PROFILES[..3]);

    let selected = selector.extract_best_text(1, &blank_page());
    assert_eq!(selected.text, "second");
    assert_eq!(selected.profile, Some(OCR_PROFILES[1].label));
    assert_eq!(selected.score, Some(AttemptScore::Confidence(40.0)));
}

#[test]
fn selector_ties_keep_earlier_profile() {
    let engine = ScriptedEngine::new(vec![scored("first", 30.0), scored("second", 30.0)]);
    let selector = OcrSelector::with_profiles(&engine, &NoopDebugSink, &OCR_PROFILES[..2]);

    assert_eq!(selector.extract_best_text(1, &blank_page()).text, "first");
}

#[test]
fn selector_falls_back_to_text_length_and_skips_failures() {
    let engine = ScriptedEngine::new(vec![
        Err("engine crashed".to_string()),
        Ok(OcrResult {
            text: "twelve chars".to_string(),
            confidence: None,
        }),
        scored("low", 5.0),
    ]);
    let selector = OcrSelector::with_profiles(&engine, &NoopDebugSink, &OCR_PROFILES[..3]);

    let selected = selector.extract_best_text(1, &blank_page());
    assert_eq!(selected.text, "twelve chars");
    assert_eq!(selected.score, Some(AttemptScore::TextLength(12)));
}

#[test]
fn selector_returns_empty_text_when_every_profile_fails() {
    let engine = ScriptedEngine::new(Vec::new());
    let selector = OcrSelector::new(&engine, &NoopDebugSink);

    let selected = selector.extract_best_text(1, &blank_page());
    assert_eq!(selected.text, "");
    assert_eq!(selected.profile, None);
    assert_eq!(*engine.calls.borrow(), OCR_PROFILES.len());
}

struct FailingSink;

impl DebugSink for FailingSink {
    fn save_image(&self, _page_number: usize, _label: &str, _image: &DynamicImage) -> Result<()> {
        bail!("disk full")
    }

    fn save_text(&self, _page_number: Option<usize>, _label: &str, _text: &str) -> Result<()> {
        bail!("disk full")
    }

    fn save_summary(&self, _summary: &RunSummary) -> Result<()> {
        bail!("disk full")
    }
}

#[test]
fn selector_result_ignores_debug_sink_failures() {
    let engine = ScriptedEngine::new(vec![scored("only", 50.0)]);
    let selector = OcrSelector::with_profiles(&engine, &FailingSink, &OCR_PROFILES[..1]);

    assert_eq!(selector.extract_best_text(1, &blank_page()).text, "only");
}

#[test]
fn preprocess_upscales_narrow_pages_to_grayscale() {
    let processed = preprocess_for_ocr(&blank_page());
    assert_eq!(processed.width(), MIN_OCR_WIDTH);
    assert_eq!(processed.height(), 750);
    assert!(matches!(processed, DynamicImage::ImageLuma8(_)));
}

#[test]
fn mean_token_confidence_ignores_unscored_tokens() {
    let tsv = "level\tpage_num\tblock_num\tpar_num\tline_num\tword_num\tleft\ttop\twidth\theight\tconf\ttext\n\
1\t1\t0\t0\t0\t0\t0\t0\t100\t100\t-1\t\n\
5\t1\t1\t1\t1\t1\t10\t10\t30\t10\t90.5\tName\n\
5\t1\t1\t1\t1\t2\t45\t10\t30\t10\t69.5\tJane\n";

    assert_eq!(mean_token_confidence(tsv), 80.0);
    assert_eq!(mean_token_confidence("level\tconf\n"), 0.0);
}

#[test]
fn rendered_page_numbers_come_from_pdftoppm_suffix() {
    assert_eq!(rendered_page_number(std::path::Path::new("/tmp/x/page-007.png")), Some(7));
    assert_eq!(rendered_page_number(std::path::Path::new("/tmp/x/page-12.PNG")), Some(12));
    assert_eq!(rendered_page_number(std::path::Path::new("/tmp/x/page-1.txt")), None);
}

#[test]
fn dpi_outside_supported_range_is_rejected() {
    assert!(validate_dpi(300).is_ok());
    assert!(matches!(
        validate_dpi(10),
        Err(CollaboratorError::InvalidDpi { dpi: 10, .. })
    ));
}

fn sample_records() -> Vec<Record> {
    vec![
        Record {
            name: "Jane Roe".to_string(),
            age: 34,
            age_group: Some(AgeGroup::From30To45),
            gender: Some(Gender::Female),
            serial_no: "1".to_string(),
            ..Record::default()
        },
        Record {
            name: "Amit Roy".to_string(),
            age: 61,
            age_group: Some(AgeGroup::From46),
            gender: Some(Gender::Male),
            serial_no: "2".to_string(),
            ..Record::default()
        },
    ]
}

#[test]
fn workbook_export_writes_dashboard_and_data_sheets() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("roll.sqlite");
    let mut metadata = DocumentMetadata::default();
    metadata.insert(MetadataField::PartNo, "7");

    SqliteWorkbookExporter::new(&path)
        .export(&sample_records(), &metadata, "test")
        .expect("export succeeds");

    let connection = rusqlite::Connection::open(&path).expect("open workbook");
    let rows: i64 = connection
        .query_row("SELECT COUNT(*) FROM \"Background Data\"", [], |row| row.get(0))
        .expect("count rows");
    assert_eq!(rows, 2);

    let name: String = connection
        .query_row(
            "SELECT \"Name\" FROM \"Background Data\" WHERE \"Age\" = 61",
            [],
            |row| row.get(0),
        )
        .expect("query name");
    assert_eq!(name, "Amit Roy");

    let part: String = connection
        .query_row(
            "SELECT \"Value\" FROM \"Dashboard\" WHERE \"Field\" = 'Part No'",
            [],
            |row| row.get(0),
        )
        .expect("query dashboard");
    assert_eq!(part, "7");
}

#[test]
fn record_statistics_count_genders_and_age_groups() {
    let statistics = record_statistics(&sample_records());
    assert_eq!(statistics.total_records, 2);
    assert_eq!(statistics.male_count, 1);
    assert_eq!(statistics.female_count, 1);
    assert_eq!(statistics.age_distribution.get("30-45"), Some(&1));
    assert_eq!(statistics.age_distribution.get("46+"), Some(&1));
}

#[test]
fn directory_debug_sink_names_artifacts_by_page() {
    let dir = tempfile::tempdir().expect("tempdir");
    let sink = DirectoryDebugSink::create(dir.path()).expect("create sink");

    sink.save_text(Some(3), "raw_ocr", "text").expect("save text");
    sink.save_text(None, "all_pages_combined_text", "all")
        .expect("save combined");
    sink.save_image(3, "processed", &blank_page())
        .expect("save image");

    assert!(dir.path().join("page_003_raw_ocr.txt").exists());
    assert!(dir.path().join("all_pages_combined_text.txt").exists());
    assert!(dir.path().join("page_003_processed.png").exists());
}

#[test]
fn segment_drops_identifier_blocks_of_twenty_chars_or_fewer() {
    let segmenter = segmenter();

    let short = segmenter.segment("ab XYZ1234567");
    assert_eq!(short.strategy, None);
    assert!(short.blocks.is_empty());

    let kept = segmenter.segment("abcdefghij XYZ1234567");
    assert_eq!(kept.strategy, Some(SegmentStrategy::Identifier));
    assert_eq!(kept.blocks[0].text, "abcdefghij XYZ1234567");
}

#[test]
fn segment_caps_last_identifier_block_at_thousand_chars() {
    let segmenter = segmenter();

    let long = segmenter.segment(&format!("XYZ1234567{}", "x".repeat(2000)));
    assert_eq!(long.blocks[0].text.chars().count(), 1000);

    let short = format!("XYZ1234567{}", "x".repeat(500));
    assert_eq!(segmenter.segment(&short).blocks[0].text, short);
}

#[test]
fn segment_truncates_name_label_fragments() {
    let segmenter = segmenter();

    let long = format!("Name: Jane Roe Age: 34 {}", "z".repeat(1000));
    let block = &segmenter.segment(&long).blocks[0].text;
    assert!(block.starts_with("Name: Jane Roe Age: 34 z"));
    // "Name: " plus the first 500 characters of the fragment, less its leading space.
    assert_eq!(block.chars().count(), 505);

    let short = format!("Name: Jane Roe Age: 34 {}", "z".repeat(100));
    assert_eq!(segmenter.segment(&short).blocks[0].text, short);
}

#[test]
fn segment_truncates_serial_number_fragments() {
    let segmenter = segmenter();

    let long = format!("12 AB/1 {}", "q".repeat(2000));
    let segmentation = segmenter.segment(&long);
    assert_eq!(segmentation.strategy, Some(SegmentStrategy::SerialNumber));
    assert_eq!(segmentation.blocks[0].text, format!("12 AB/1 {}", "q".repeat(799)));

    let short = format!("12 AB/1 {}", "q".repeat(100));
    assert_eq!(segmenter.segment(&short).blocks[0].text, short);
}

#[test]
fn build_record_limits_name_length() {
    let builder = builder();
    let metadata = DocumentMetadata::default();
    let block = |name: &str| format!("Name: {name} Age: 40 Gender: Male");

    let fifty_one = format!("A{}", "b".repeat(50));
    assert_eq!(builder.build(&block(&fifty_one), 1, &metadata), None);
    assert_eq!(builder.build(&block("J"), 1, &metadata), None);

    let fifty = format!("A{}", "b".repeat(49));
    let record = builder
        .build(&block(&fifty), 1, &metadata)
        .expect("fifty character name accepted");
    assert_eq!(record.name, fifty);

    let record = builder
        .build(&block("Jo"), 1, &metadata)
        .expect("two character name accepted");
    assert_eq!(record.name, "Jo");
}

#[test]
fn build_record_rejects_long_house_values() {
    let builder = builder();
    let metadata = DocumentMetadata::default();
    let block = |house: &str| format!("Name: Jane Roe House: {house} Age: 40 Gender: Male");

    let record = builder
        .build(&block("12/B Sunrise Garden Apartments"), 1, &metadata)
        .expect("record accepted");
    assert_eq!(record.house_no, "12/B Sunrise Garden Apartments");

    // Thirty-one characters: the labelled match is rejected and the
    // token-before-age pattern answers instead.
    let record = builder
        .build(&block("12/B Sunrise Gardens Apartments"), 1, &metadata)
        .expect("record accepted");
    assert_eq!(record.house_no, "Apartments");
}

#[test]
fn build_record_keeps_surnames_that_start_with_label_words() {
    let record = builder()
        .build(
            "Name: Ram Agerwal Father Name: Hari Agerwal Age: 40 Gender: Male",
            1,
            &DocumentMetadata::default(),
        )
        .expect("record accepted");

    assert_eq!(record.name, "Ram Agerwal");
    assert_eq!(record.relative_name, "Hari Agerwal");
}

#[test]
fn build_record_prefers_tehsil_then_block_then_subdivision() {
    let builder = builder();
    let block = "Name: Jane Roe Age: 34 Gender: F";

    let mut metadata = DocumentMetadata::default();
    metadata.insert(MetadataField::Subdivision, "CHINSURAH");
    metadata.insert(MetadataField::Block, "PANDUA");
    let record = builder.build(block, 1, &metadata).expect("record accepted");
    assert_eq!(record.tehsil_block, "PANDUA");
    assert_eq!(record.division, "CHINSURAH");

    metadata.insert(MetadataField::Tehsil, "BALAGARH");
    let record = builder.build(block, 1, &metadata).expect("record accepted");
    assert_eq!(record.tehsil_block, "BALAGARH");
}

#[test]
fn workbook_path_must_be_sqlite() {
    assert!(validate_workbook_path(std::path::Path::new("out/roll.sqlite")).is_ok());
    assert!(validate_workbook_path(std::path::Path::new("roll.DB")).is_ok());
    assert!(validate_workbook_path(std::path::Path::new("roll.xlsx")).is_err());
    assert!(validate_workbook_path(std::path::Path::new("roll")).is_err());
}

#[test]
fn scratch_image_is_removed_on_drop() {
    let scratch = ScratchImage::write(&blank_page(), "block").expect("write scratch image");
    let path = scratch.path().to_path_buf();
    assert!(path.exists());

    drop(scratch);
    assert!(!path.exists());
}
