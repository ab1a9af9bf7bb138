//! Core data model: search criteria, per-document records, job outcomes.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Immutable input for one job: a location hierarchy, year, and property
/// number.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchCriteria {
    pub year: String,
    pub district: String,
    pub tahsil: String,
    pub village: String,
    #[serde(rename = "propertyNo")]
    pub property_no: String,
}

impl SearchCriteria {
    /// Filesystem-safe folder fragment built from the criteria, matching the
    /// `year_district_tahsil_village_property` naming of job directories.
    pub fn folder_slug(&self) -> String {
        let raw = format!(
            "{}_{}_{}_{}_{}",
            self.year, self.district, self.tahsil, self.village, self.property_no
        );
        let re = Regex::new(r"[^\w]").expect("static regex");
        re.replace_all(&raw, "_").into_owned()
    }
}

/// Terminal state of a single document row.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    Succeeded,
    Failed,
    Skipped,
}

/// One row's outcome. Immutable once appended to a job's result list.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DocumentRecord {
    /// Zero-based row index within its page (0..9)
    pub row_index: usize,
    /// Result page the row was found on (1-based)
    pub page: u32,
    pub file_path: Option<PathBuf>,
    pub status: DocumentStatus,
    pub reason: Option<String>,
}

impl DocumentRecord {
    pub fn succeeded(row_index: usize, page: u32, file_path: PathBuf) -> Self {
        Self {
            row_index,
            page,
            file_path: Some(file_path),
            status: DocumentStatus::Succeeded,
            reason: None,
        }
    }

    pub fn skipped(row_index: usize, page: u32, file_path: PathBuf) -> Self {
        Self {
            row_index,
            page,
            file_path: Some(file_path),
            status: DocumentStatus::Skipped,
            reason: Some("file already exists".to_string()),
        }
    }

    pub fn failed(row_index: usize, page: u32, reason: impl Into<String>) -> Self {
        Self {
            row_index,
            page,
            file_path: None,
            status: DocumentStatus::Failed,
            reason: Some(reason.into()),
        }
    }
}

/// Job lifecycle status.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Running,
    Completed,
    NoResults,
    Failed,
    Cancelled,
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            JobStatus::Queued => "queued",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::NoResults => "no_results",
            JobStatus::Failed => "failed",
            JobStatus::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// What a finished navigator run hands back to the orchestrator. A walk
/// that died partway still carries the records captured before the failure,
/// with the reason in `error`.
#[derive(Clone, Debug)]
pub struct JobOutcome {
    pub status: JobStatus,
    pub records: Vec<DocumentRecord>,
    pub pages_visited: u32,
    pub error: Option<String>,
}

impl JobOutcome {
    pub fn new(status: JobStatus, records: Vec<DocumentRecord>, pages_visited: u32) -> Self {
        Self {
            status,
            records,
            pages_visited,
            error: None,
        }
    }

    pub fn failed(
        records: Vec<DocumentRecord>,
        pages_visited: u32,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            status: JobStatus::Failed,
            records,
            pages_visited,
            error: Some(reason.into()),
        }
    }

    pub fn downloaded(&self) -> usize {
        self.records
            .iter()
            .filter(|r| r.status == DocumentStatus::Succeeded)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn folder_slug_strips_unsafe_characters() {
        let criteria = SearchCriteria {
            year: "2023".to_string(),
            district: "Pune".to_string(),
            tahsil: "Haveli (Rural)".to_string(),
            village: "Kothrud".to_string(),
            property_no: "123/456".to_string(),
        };
        let slug = criteria.folder_slug();
        assert_eq!(slug, "2023_Pune_Haveli__Rural__Kothrud_123_456");
        assert!(slug.chars().all(|c| c.is_alphanumeric() || c == '_'));
    }

    #[test]
    fn record_constructors_set_status() {
        let ok = DocumentRecord::succeeded(0, 1, PathBuf::from("a.pdf"));
        assert_eq!(ok.status, DocumentStatus::Succeeded);
        assert!(ok.reason.is_none());

        let failed = DocumentRecord::failed(3, 2, "new window never appeared");
        assert_eq!(failed.status, DocumentStatus::Failed);
        assert!(failed.file_path.is_none());

        let skipped = DocumentRecord::skipped(1, 1, PathBuf::from("a.pdf"));
        assert_eq!(skipped.status, DocumentStatus::Skipped);
    }
}
