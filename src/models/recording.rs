//! Canonical recording model
//!
//! Every upstream source normalizes into `Recording`. The `source` tag is
//! fixed when the record is created and decides which optional fields are
//! populated: phone records carry a direct `download_url`, meeting records
//! carry `topic`/`host_email` and the aggregate file statistics. No code path
//! re-derives the tag after construction.

use serde::{Deserialize, Serialize};

/// Provenance of a canonical record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Call recordings from the cursor-paginated upstream
    Phone,
    /// Meeting recordings from the server-aggregated upstream
    Meetings,
}

impl SourceKind {
    /// Wire/label form of the tag
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Phone => "phone",
            SourceKind::Meetings => "meetings",
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Owning user of a recording
///
/// Upstream-provided for phone records; synthesized with `type = "user"` for
/// meeting records.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Owner {
    /// Owner kind, `"user"` for synthesized owners
    #[serde(rename = "type", default)]
    pub owner_type: String,
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
}

impl Owner {
    /// Synthesized owner for sources that only know a host identity
    pub fn user(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner_type: "user".to_string(),
            id: id.into(),
            name: name.into(),
        }
    }
}

/// Site a phone recording belongs to
///
/// The aggregated upstream has no site concept; its records get the empty
/// placeholder.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Site {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
}

impl Site {
    /// Placeholder for records whose upstream has no site concept
    pub fn placeholder() -> Self {
        Self::default()
    }
}

/// One recording, regardless of origin
///
/// `date_time` stays ISO-8601 text end-to-end: upstream strings pass through
/// verbatim (or are selected among, for meeting records) and parsing only
/// happens inside the earliest-start selection, where invalid candidates are
/// skipped rather than raised.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recording {
    /// Unique within a result set
    pub id: String,
    /// Provenance tag, fixed at creation
    pub source: SourceKind,
    /// ISO-8601 effective start of the recording
    pub date_time: String,
    /// Length in seconds, 0 when the upstream omits it
    #[serde(default)]
    pub duration: i64,
    #[serde(default)]
    pub caller_name: String,
    #[serde(default)]
    pub callee_name: String,
    #[serde(default)]
    pub owner: Owner,
    #[serde(default)]
    pub site: Site,
    /// Direct download reference (phone records only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
    /// Meeting topic (meeting records only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    /// Resolved host email (meeting records only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host_email: Option<String>,
    /// Total bytes across embedded files (meeting records only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,
    /// Number of embedded files (meeting records only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub files_count: Option<usize>,
    /// Distinct embedded file types, first-seen order (meeting records only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub files_types: Option<Vec<String>>,
    /// Retention metadata, passed through only when the upstream sent it
    #[serde(rename = "autoDelete", skip_serializing_if = "Option::is_none")]
    pub auto_delete: Option<bool>,
    #[serde(rename = "autoDeleteDate", skip_serializing_if = "Option::is_none")]
    pub auto_delete_date: Option<String>,
}

impl Recording {
    /// Skeleton record with the mandatory fields set and every
    /// source-dependent optional empty
    pub fn new(id: impl Into<String>, source: SourceKind, date_time: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            source,
            date_time: date_time.into(),
            duration: 0,
            caller_name: String::new(),
            callee_name: String::new(),
            owner: Owner::default(),
            site: Site::default(),
            download_url: None,
            topic: None,
            host_email: None,
            file_size: None,
            files_count: None,
            files_types: None,
            auto_delete: None,
            auto_delete_date: None,
        }
    }
}

/// Result envelope returned to callers
///
/// Pagination is resolved inside the engine, so `next_page_token` is always
/// `null` here; the field exists because the display contract carries it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordingsEnvelope {
    pub from: String,
    pub to: String,
    pub total_records: usize,
    pub next_page_token: Option<String>,
    pub recordings: Vec<Recording>,
}

impl RecordingsEnvelope {
    /// Wrap a normalized batch; `total_records` is derived from the batch
    pub fn wrap(from: String, to: String, recordings: Vec<Recording>) -> Self {
        Self {
            from,
            to,
            total_records: recordings.len(),
            next_page_token: None,
            recordings,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_kind_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&SourceKind::Phone).unwrap(),
            "\"phone\""
        );
        assert_eq!(
            serde_json::to_string(&SourceKind::Meetings).unwrap(),
            "\"meetings\""
        );
    }

    #[test]
    fn owner_type_uses_wire_name() {
        let owner = Owner::user("u1", "Dana");
        let json = serde_json::to_value(&owner).unwrap();
        assert_eq!(json["type"], "user");
        assert_eq!(json["name"], "Dana");
    }

    #[test]
    fn absent_optionals_are_omitted() {
        let rec = Recording::new("r1", SourceKind::Phone, "2025-11-05T09:00:00Z");
        let json = serde_json::to_value(&rec).unwrap();
        let obj = json.as_object().unwrap();
        assert!(!obj.contains_key("topic"));
        assert!(!obj.contains_key("download_url"));
        assert!(!obj.contains_key("autoDelete"));
        assert_eq!(json["duration"], 0);
    }

    #[test]
    fn retention_fields_use_camel_case_wire_names() {
        let mut rec = Recording::new("r1", SourceKind::Phone, "2025-11-05T09:00:00Z");
        rec.auto_delete = Some(true);
        rec.auto_delete_date = Some("2026-11-05".to_string());
        let json = serde_json::to_value(&rec).unwrap();
        assert_eq!(json["autoDelete"], true);
        assert_eq!(json["autoDeleteDate"], "2026-11-05");
    }

    #[test]
    fn envelope_wrap_counts_records() {
        let recs = vec![
            Recording::new("a", SourceKind::Phone, "2025-11-01T00:00:00Z"),
            Recording::new("b", SourceKind::Phone, "2025-11-02T00:00:00Z"),
        ];
        let env = RecordingsEnvelope::wrap("2025-11-01".into(), "2025-11-07".into(), recs);
        assert_eq!(env.total_records, 2);
        assert!(env.next_page_token.is_none());
    }
}
