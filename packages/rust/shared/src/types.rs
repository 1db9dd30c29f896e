//! Core domain types: queue tasks, task batches, and content items.

use std::cmp::Ordering;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Date format used by the queue, the batch file, and article metadata.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

// ---------------------------------------------------------------------------
// TaskStatus
// ---------------------------------------------------------------------------

/// Queue status of a task. Values other than the three known ones are kept
/// verbatim and ignored by the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TaskStatus {
    Ready,
    Published,
    Error,
    Other(String),
}

impl TaskStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Ready => "READY",
            Self::Published => "PUBLISHED",
            Self::Error => "ERROR",
            Self::Other(s) => s,
        }
    }

    /// Whether this is one of the two statuses this system writes back.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Published | Self::Error)
    }
}

impl From<String> for TaskStatus {
    fn from(s: String) -> Self {
        match s.trim().to_uppercase().as_str() {
            "READY" => Self::Ready,
            "PUBLISHED" => Self::Published,
            "ERROR" => Self::Error,
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<&str> for TaskStatus {
    fn from(s: &str) -> Self {
        Self::from(s.to_string())
    }
}

impl From<TaskStatus> for String {
    fn from(status: TaskStatus) -> Self {
        status.as_str().to_string()
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Task
// ---------------------------------------------------------------------------

/// One queued instruction to produce a content artifact.
///
/// Field names match the batch file read by the generator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// 1-based sheet row (the header is row 1); used for status write-back.
    pub row_number: u32,
    pub id: String,
    #[serde(rename = "type")]
    pub content_type: String,
    pub slug: String,
    pub title: String,
    pub primary_keyword: String,
    pub secondary_keywords: String,
    /// Raw `YYYY-MM-DD` string as entered in the queue.
    pub publish_date: String,
    pub status: TaskStatus,
    #[serde(default)]
    pub tags: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub internal_links: String,
    #[serde(default)]
    pub notes: String,
}

impl Task {
    /// Parsed publish date, if the queue value is a valid `YYYY-MM-DD`.
    pub fn publish_date(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(&self.publish_date, DATE_FORMAT).ok()
    }

    /// READY, due on or before `as_of`, with a URL-safe slug and a type.
    pub fn is_actionable(&self, as_of: NaiveDate) -> bool {
        self.status == TaskStatus::Ready
            && is_url_safe_slug(&self.slug)
            && !self.content_type.is_empty()
            && self.publish_date().is_some_and(|d| d <= as_of)
    }
}

/// Lowercase ASCII letters, digits and `-` only. Rules out path separators
/// and dot segments, so a slug always names one directory.
pub fn is_url_safe_slug(slug: &str) -> bool {
    !slug.is_empty()
        && slug
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
}

// ---------------------------------------------------------------------------
// TaskBatch
// ---------------------------------------------------------------------------

/// The actionable tasks of one run, as serialized to the batch file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskBatch {
    /// Run date, `YYYY-MM-DD`.
    pub today: String,
    pub tasks: Vec<Task>,
}

impl TaskBatch {
    pub fn new(today: NaiveDate, tasks: Vec<Task>) -> Self {
        Self {
            today: today.format(DATE_FORMAT).to_string(),
            tasks,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }
}

// ---------------------------------------------------------------------------
// ContentItem
// ---------------------------------------------------------------------------

/// Metadata extracted from one generated artifact. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContentItem {
    pub slug: String,
    pub title: String,
    pub description: String,
    pub category: String,
    /// ISO-8601 date (or datetime) string; empty when absent.
    pub published_date: String,
    /// Defaults to `published_date`.
    pub modified_date: String,
    pub read_time: Option<u32>,
    pub image_alt: String,
    /// Unix seconds of the last change (commit time or mtime).
    pub last_touched: i64,
    /// Unix seconds of creation (first commit or birth time).
    pub created: i64,
}

/// Recency order: published date desc, creation time desc, slug asc.
pub fn recency_order(a: &ContentItem, b: &ContentItem) -> Ordering {
    b.published_date
        .cmp(&a.published_date)
        .then_with(|| b.created.cmp(&a.created))
        .then_with(|| a.slug.cmp(&b.slug))
}

/// Sort items in place by [`recency_order`].
pub fn sort_by_recency(items: &mut [ContentItem]) {
    items.sort_by(recency_order);
}
