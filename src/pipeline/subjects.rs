//! Subject list CSV files
//!
//! Columns are `qid,wiki_title,class`. Readers also accept the older
//! `subject`, `title` and `clase` headers.

use std::collections::HashSet;
use std::path::Path;

use crate::error::Result;
use crate::models::{EntityRef, SubjectRecord};
use crate::utils::error::ConfigError;

/// Class assigned to rows without one
pub const DEFAULT_CLASS: &str = "default";

const QID_HEADERS: &[&str] = &["qid", "subject"];
const TITLE_HEADERS: &[&str] = &["wiki_title", "title"];
const CLASS_HEADERS: &[&str] = &["class", "clase"];

fn column(headers: &csv::StringRecord, names: &[&str]) -> Option<usize> {
    headers
        .iter()
        .position(|h| names.contains(&h.trim().to_lowercase().as_str()))
}

/// Read a subject list
///
/// Rows with a malformed identifier are dropped with a warning.
pub fn load_subjects(path: &Path) -> Result<Vec<SubjectRecord>> {
    if !path.exists() {
        return Err(ConfigError::Missing {
            path: path.to_path_buf(),
        }
        .into());
    }

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)?;

    let headers = reader.headers()?.clone();
    let qid_col = column(&headers, QID_HEADERS).ok_or_else(|| ConfigError::MissingSection {
        path: path.to_path_buf(),
        section: "qid".to_string(),
    })?;
    let title_col = column(&headers, TITLE_HEADERS);
    let class_col = column(&headers, CLASS_HEADERS);

    let mut subjects = Vec::new();
    for (idx, row) in reader.records().enumerate() {
        let row = row?;
        let raw = row.get(qid_col).unwrap_or_default();

        let Some(subject) = EntityRef::parse(raw) else {
            tracing::warn!(
                path = %path.display(),
                row = idx + 2,
                value = raw,
                "Dropping row with invalid identifier"
            );
            continue;
        };

        let wiki_title = title_col
            .and_then(|c| row.get(c))
            .filter(|t| !t.is_empty())
            .map(str::to_string);
        let class_name = class_col
            .and_then(|c| row.get(c))
            .filter(|c| !c.is_empty())
            .unwrap_or(DEFAULT_CLASS)
            .to_string();

        subjects.push(SubjectRecord {
            subject,
            wiki_title,
            class_name,
        });
    }

    tracing::debug!(path = %path.display(), count = subjects.len(), "Loaded subjects");
    Ok(subjects)
}

/// Write a subject list; later duplicates of a subject are dropped
///
/// Returns the number of rows written.
pub fn write_subjects(path: &Path, rows: &[SubjectRecord]) -> Result<usize> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(["qid", "wiki_title", "class"])?;

    let mut seen = HashSet::new();
    let mut written = 0;
    for row in rows {
        if !seen.insert(&row.subject) {
            continue;
        }
        writer.write_record([
            row.subject.as_str(),
            row.wiki_title.as_deref().unwrap_or_default(),
            row.class_name.as_str(),
        ])?;
        written += 1;
    }
    writer.flush()?;

    Ok(written)
}
