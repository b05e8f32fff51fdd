use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use rusqlite::types::Value;
use rusqlite::{Connection, params, params_from_iter};
use tracing::info;

use crate::model::{
    AgeGroup, CellValue, DocumentMetadata, Gender, RECORD_COLUMN_LABELS, Record, RecordStatistics,
};
use crate::util::{ensure_directory, now_utc_string};

pub(crate) const DASHBOARD_SHEET: &str = "Dashboard";
pub(crate) const DATA_SHEET: &str = "Background Data";

/// File extensions accepted for the workbook; the file is always SQLite.
pub(crate) const WORKBOOK_EXTENSIONS: &[&str] = &["sqlite", "db"];

pub(crate) fn validate_workbook_path(path: &Path) -> Result<()> {
    let extension = path.extension().and_then(|ext| ext.to_str()).unwrap_or("");
    if !WORKBOOK_EXTENSIONS
        .iter()
        .any(|allowed| extension.eq_ignore_ascii_case(allowed))
    {
        bail!(
            "output must be a SQLite workbook ending in .{}: {}",
            WORKBOOK_EXTENSIONS.join(" or ."),
            path.display()
        );
    }

    Ok(())
}

pub(crate) trait TabularExporter {
    fn export(&self, records: &[Record], metadata: &DocumentMetadata, method: &str) -> Result<()>;
}

/// Writes a two-sheet workbook as a SQLite file: a dashboard of metadata and
/// statistics, and one row per record under human-readable column labels.
#[derive(Debug, Clone)]
pub(crate) struct SqliteWorkbookExporter {
    path: PathBuf,
}

impl SqliteWorkbookExporter {
    pub(crate) fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }
}

impl TabularExporter for SqliteWorkbookExporter {
    fn export(&self, records: &[Record], metadata: &DocumentMetadata, method: &str) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            ensure_directory(parent)?;
        }
        if self.path.exists() {
            fs::remove_file(&self.path)
                .with_context(|| format!("failed to replace {}", self.path.display()))?;
        }

        let mut connection = Connection::open(&self.path)
            .with_context(|| format!("failed to open {}", self.path.display()))?;
        create_sheets(&connection)?;

        let tx = connection.transaction()?;
        {
            let mut dashboard = tx.prepare(&format!(
                "INSERT INTO {}(\"Field\", \"Value\") VALUES(?1, ?2)",
                quote_identifier(DASHBOARD_SHEET)
            ))?;
            for (field, value) in dashboard_rows(records, metadata, method) {
                dashboard.execute(params![field, value])?;
            }

            let placeholders = (1..=RECORD_COLUMN_LABELS.len())
                .map(|index| format!("?{index}"))
                .collect::<Vec<_>>()
                .join(", ");
            let mut data = tx.prepare(&format!(
                "INSERT INTO {}({}) VALUES({})",
                quote_identifier(DATA_SHEET),
                column_list(),
                placeholders
            ))?;
            for record in records {
                let values = record.cells().map(|cell| match cell {
                    CellValue::Text(text) => Value::Text(text.to_string()),
                    CellValue::Integer(number) => Value::Integer(number),
                });
                data.execute(params_from_iter(values))?;
            }
        }
        tx.commit()?;

        info!(path = %self.path.display(), records = records.len(), "workbook saved");
        Ok(())
    }
}

fn create_sheets(connection: &Connection) -> Result<()> {
    let data_columns = RECORD_COLUMN_LABELS
        .iter()
        .map(|label| {
            let column_type = if *label == "Age" { "INTEGER" } else { "TEXT" };
            format!("{} {}", quote_identifier(label), column_type)
        })
        .collect::<Vec<_>>()
        .join(",\n  ");

    connection
        .execute_batch(&format!(
            "
            CREATE TABLE {} (
              \"Field\" TEXT NOT NULL,
              \"Value\" TEXT NOT NULL
            );

            CREATE TABLE {} (
              {}
            );
            ",
            quote_identifier(DASHBOARD_SHEET),
            quote_identifier(DATA_SHEET),
            data_columns
        ))
        .context("failed to create workbook sheets")
}

fn column_list() -> String {
    RECORD_COLUMN_LABELS
        .iter()
        .map(|label| quote_identifier(label))
        .collect::<Vec<_>>()
        .join(", ")
}

fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

pub(crate) fn record_statistics(records: &[Record]) -> RecordStatistics {
    let mut age_distribution = BTreeMap::<String, usize>::new();
    for record in records {
        let group = record.age_group.map(AgeGroup::as_str).unwrap_or("Unknown");
        *age_distribution.entry(group.to_string()).or_insert(0) += 1;
    }

    RecordStatistics {
        total_records: records.len(),
        male_count: records
            .iter()
            .filter(|record| record.gender == Some(Gender::Male))
            .count(),
        female_count: records
            .iter()
            .filter(|record| record.gender == Some(Gender::Female))
            .count(),
        age_distribution,
    }
}

pub(crate) fn dashboard_rows(
    records: &[Record],
    metadata: &DocumentMetadata,
    method: &str,
) -> Vec<(String, String)> {
    let statistics = record_statistics(records);
    let mut rows = vec![
        ("Extraction Method".to_string(), method.to_string()),
        ("Processing Date".to_string(), now_utc_string()),
        ("Total Records".to_string(), statistics.total_records.to_string()),
    ];

    if !metadata.is_empty() {
        rows.push((String::new(), String::new()));
        rows.push(("=== CONSTITUENCY INFORMATION ===".to_string(), String::new()));
        for (field, value) in metadata.iter() {
            rows.push((field.label().to_string(), value.to_string()));
        }
    }

    if !records.is_empty() {
        rows.push((String::new(), String::new()));
        rows.push(("=== STATISTICS ===".to_string(), String::new()));
        rows.push(("Male Voters".to_string(), statistics.male_count.to_string()));
        rows.push(("Female Voters".to_string(), statistics.female_count.to_string()));

        rows.push((String::new(), String::new()));
        rows.push(("=== AGE DISTRIBUTION ===".to_string(), String::new()));
        for (group, count) in statistics.age_distribution {
            rows.push((group, count.to_string()));
        }
    }

    rows
}
