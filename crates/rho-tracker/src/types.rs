use serde::Serialize;
use thiserror::Error;

/// Enumerates supported `TrackerError` values.
#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("tracker API key required for write operations")]
    CredentialRequired,
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("tracker returned non-success status {status}: {body}")]
    HttpStatus { status: u16, body: String },
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("invalid tracker response: {0}")]
    InvalidResponse(String),
}

/// Fields for a brand-new tracker issue. Optional ids are omitted from the
/// wire payload so the tracker applies its own defaults.
#[derive(Debug, Clone, Serialize)]
pub struct NewIssue {
    pub project_id: u64,
    pub subject: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tracker_id: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority_id: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_to_id: Option<u64>,
}

/// Partial change set for an existing issue. Absent fields are left
/// untouched; an all-absent set makes the update a local no-op.
#[derive(Debug, Clone, Default, Serialize)]
pub struct IssueChanges {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tracker_id: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority_id: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_id: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_to_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl IssueChanges {
    pub fn is_empty(&self) -> bool {
        self.subject.is_none()
            && self.description.is_none()
            && self.tracker_id.is_none()
            && self.priority_id.is_none()
            && self.status_id.is_none()
            && self.assigned_to_id.is_none()
            && self.notes.is_none()
    }
}

/// Query filter for issue listings.
#[derive(Debug, Clone, Copy, Default)]
pub struct IssueFilter {
    pub project_id: Option<u64>,
    pub status_id: Option<u32>,
    pub limit: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::IssueChanges;

    #[test]
    fn unit_issue_changes_empty_detection() {
        assert!(IssueChanges::default().is_empty());
        let changes = IssueChanges {
            notes: Some("Retested".to_string()),
            ..IssueChanges::default()
        };
        assert!(!changes.is_empty());
    }

    #[test]
    fn unit_issue_changes_serializes_only_present_fields() {
        let changes = IssueChanges {
            status_id: Some(3),
            notes: Some("Closing".to_string()),
            ..IssueChanges::default()
        };
        let rendered = serde_json::to_string(&changes).expect("changes serialize");
        assert_eq!(rendered, r#"{"status_id":3,"notes":"Closing"}"#);
    }
}
