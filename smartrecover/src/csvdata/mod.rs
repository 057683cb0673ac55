//! Loaders for the CSV mock fixtures.
//!
//! Four schemas: `incidents.csv`, `servicenow_tickets.csv`,
//! `confluence_docs.csv`, `change_correlations.csv`. Rows with extra
//! trailing fields are tolerated (some authored fixtures carry a stray
//! trailing comma) but logged; the extras never become data.

use std::collections::HashMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use tracing::warn;

use crate::error::EngineError;
use crate::model::{ChangeRecord, Incident, KnowledgeDocument, Ticket};

/// One row of `change_correlations.csv`: the change itself plus the
/// authored per-incident correlation score, which the mock connector hands
/// to the change agent as the retrieval-time score.
#[derive(Debug, Clone)]
pub struct ChangeFixture {
    pub incident_id: String,
    pub change: ChangeRecord,
    pub fixture_score: Option<f64>,
}

struct CsvFile {
    path: String,
    columns: HashMap<String, usize>,
    records: Vec<csv::StringRecord>,
}

impl CsvFile {
    fn open(path: &Path, expected: &[&str]) -> Result<Self, EngineError> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_path(path)
            .map_err(|e| EngineError::Config(format!("open {}: {}", path.display(), e)))?;

        let headers = reader
            .headers()
            .map_err(|e| EngineError::Config(format!("read headers of {}: {}", path.display(), e)))?
            .clone();
        let columns: HashMap<String, usize> = headers
            .iter()
            .enumerate()
            .map(|(i, name)| (name.trim().to_string(), i))
            .collect();
        for column in expected {
            if !columns.contains_key(*column) {
                return Err(EngineError::Config(format!(
                    "{} is missing column {}",
                    path.display(),
                    column
                )));
            }
        }

        let mut records = Vec::new();
        for (row, result) in reader.records().enumerate() {
            let record = result.map_err(|e| {
                EngineError::Config(format!("{} row {}: {}", path.display(), row + 2, e))
            })?;
            check_extra_fields(path, row + 2, &record, expected.len());
            records.push(record);
        }

        Ok(Self {
            path: path.display().to_string(),
            columns,
            records,
        })
    }

    fn field<'a>(&self, record: &'a csv::StringRecord, name: &str) -> &'a str {
        self.columns
            .get(name)
            .and_then(|&i| record.get(i))
            .unwrap_or("")
            .trim()
    }

    fn optional(&self, record: &csv::StringRecord, name: &str) -> Option<String> {
        let value = self.field(record, name);
        if value.is_empty() {
            None
        } else {
            Some(value.to_string())
        }
    }
}

/// Warns about rows wider than the schema. An all-empty overflow is the
/// known trailing-comma quirk; non-empty extras are ignored too, but called
/// out, since the schema has no column for them.
fn check_extra_fields(path: &Path, line: usize, record: &csv::StringRecord, expected: usize) {
    if record.len() <= expected {
        return;
    }
    let extras: Vec<&str> = record.iter().skip(expected).collect();
    if extras.iter().all(|f| f.trim().is_empty()) {
        warn!(
            file = %path.display(),
            line,
            "row has trailing empty field(s); tolerated"
        );
    } else {
        warn!(
            file = %path.display(),
            line,
            extras = ?extras,
            "row has extra non-empty field(s); ignored"
        );
    }
}

fn parse_instant(file: &CsvFile, line: usize, value: &str) -> Result<DateTime<Utc>, EngineError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            EngineError::Config(format!(
                "{} row {}: bad timestamp {:?}: {}",
                file.path, line, value, e
            ))
        })
}

/// Loads `incidents.csv`. `affected_services` is pipe-delimited; an empty
/// `assignee` cell means unassigned.
pub fn load_incidents(path: &Path) -> Result<Vec<Incident>, EngineError> {
    const COLUMNS: &[&str] = &[
        "id",
        "title",
        "description",
        "severity",
        "status",
        "created_at",
        "affected_services",
        "assignee",
    ];
    let file = CsvFile::open(path, COLUMNS)?;
    let mut incidents = Vec::with_capacity(file.records.len());
    for (i, record) in file.records.iter().enumerate() {
        let line = i + 2;
        let severity = file
            .field(record, "severity")
            .parse()
            .map_err(|e| EngineError::Config(format!("{} row {}: {}", file.path, line, e)))?;
        let status = file
            .field(record, "status")
            .parse()
            .map_err(|e| EngineError::Config(format!("{} row {}: {}", file.path, line, e)))?;
        let created_at = parse_instant(&file, line, file.field(record, "created_at"))?;
        let affected_services = file
            .field(record, "affected_services")
            .split('|')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        incidents.push(Incident {
            id: file.field(record, "id").to_string(),
            title: file.field(record, "title").to_string(),
            description: file.field(record, "description").to_string(),
            severity,
            status,
            created_at,
            updated_at: None,
            affected_services,
            assignee: file.optional(record, "assignee"),
        });
    }
    Ok(incidents)
}

/// Loads `servicenow_tickets.csv`.
pub fn load_tickets(path: &Path) -> Result<Vec<Ticket>, EngineError> {
    const COLUMNS: &[&str] = &[
        "incident_id",
        "ticket_id",
        "type",
        "resolution",
        "description",
        "source",
    ];
    let file = CsvFile::open(path, COLUMNS)?;
    let mut tickets = Vec::with_capacity(file.records.len());
    for (i, record) in file.records.iter().enumerate() {
        let line = i + 2;
        let kind = file
            .field(record, "type")
            .parse()
            .map_err(|e| EngineError::Config(format!("{} row {}: {}", file.path, line, e)))?;
        tickets.push(Ticket {
            ticket_id: file.field(record, "ticket_id").to_string(),
            incident_id: file.field(record, "incident_id").to_string(),
            kind,
            resolution: file.optional(record, "resolution"),
            description: file.optional(record, "description"),
            source: file.field(record, "source").to_string(),
        });
    }
    Ok(tickets)
}

/// Loads `confluence_docs.csv`. Each row associates a document with one
/// incident (mock mode only).
pub fn load_documents(path: &Path) -> Result<Vec<KnowledgeDocument>, EngineError> {
    const COLUMNS: &[&str] = &["incident_id", "doc_id", "title", "content"];
    let file = CsvFile::open(path, COLUMNS)?;
    let mut documents = Vec::with_capacity(file.records.len());
    for record in &file.records {
        documents.push(KnowledgeDocument {
            doc_id: file.field(record, "doc_id").to_string(),
            title: file.field(record, "title").to_string(),
            content: file.field(record, "content").to_string(),
            tags: Vec::new(),
            incident_id: file.optional(record, "incident_id"),
        });
    }
    Ok(documents)
}

/// Loads `change_correlations.csv`. An unparsable `correlation_score` cell
/// is treated as absent (the agent computes one instead).
pub fn load_changes(path: &Path) -> Result<Vec<ChangeFixture>, EngineError> {
    const COLUMNS: &[&str] = &[
        "incident_id",
        "change_id",
        "description",
        "deployed_at",
        "correlation_score",
    ];
    let file = CsvFile::open(path, COLUMNS)?;
    let mut changes = Vec::with_capacity(file.records.len());
    for (i, record) in file.records.iter().enumerate() {
        let line = i + 2;
        let deployed_at = parse_instant(&file, line, file.field(record, "deployed_at"))?;
        let fixture_score = match file.optional(record, "correlation_score") {
            Some(raw) => match raw.parse::<f64>() {
                Ok(score) => Some(score.clamp(0.0, 1.0)),
                Err(_) => {
                    warn!(file = %file.path, line, value = %raw, "bad correlation_score; ignoring");
                    None
                }
            },
            None => None,
        };
        changes.push(ChangeFixture {
            incident_id: file.field(record, "incident_id").to_string(),
            change: ChangeRecord {
                change_id: file.field(record, "change_id").to_string(),
                description: file.field(record, "description").to_string(),
                deployed_at,
                service: None,
            },
            fixture_score,
        });
    }
    Ok(changes)
}
