//! Queue header validation, row normalization, and the actionable filter.

use std::collections::HashMap;

use chrono::NaiveDate;
use pressline_shared::{PresslineError, Result, RetryPolicy, Task, retry};
use tracing::{debug, info, instrument};

use crate::TaskQueue;

/// Columns every queue must have.
pub const REQUIRED_COLUMNS: [&str; 8] = [
    "id",
    "type",
    "slug",
    "title",
    "primary_keyword",
    "secondary_keywords",
    "publish_date",
    "status",
];

/// Columns read when present, empty otherwise.
pub const OPTIONAL_COLUMNS: [&str; 4] = ["tags", "category", "internal_links", "notes"];

/// Normalized contents of one queue read.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueueSnapshot {
    /// One task per data row, in sheet order.
    pub tasks: Vec<Task>,
    /// 0-based index of the `status` column. Only meaningful when the
    /// header row was present.
    pub status_column: usize,
}

impl QueueSnapshot {
    /// Keep only tasks actionable on `as_of`.
    pub fn into_actionable(self, as_of: NaiveDate) -> Self {
        Self {
            tasks: self
                .tasks
                .into_iter()
                .filter(|t| t.is_actionable(as_of))
                .collect(),
            status_column: self.status_column,
        }
    }
}

/// Parse raw rows (header first) into tasks.
///
/// An entirely empty sheet yields an empty snapshot. Otherwise every
/// required column must appear in the header (case-insensitive, trimmed).
pub fn parse_rows(rows: &[Vec<String>]) -> Result<QueueSnapshot> {
    let Some((header, data)) = rows.split_first() else {
        return Ok(QueueSnapshot::default());
    };

    let columns: HashMap<String, usize> = header
        .iter()
        .enumerate()
        .map(|(i, h)| (h.trim().to_lowercase(), i))
        .rev() // first occurrence wins
        .collect();

    let missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|c| !columns.contains_key(**c))
        .map(|c| c.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(PresslineError::Schema { missing });
    }

    let tasks = data
        .iter()
        .enumerate()
        .map(|(i, row)| {
            let get = |name: &str| -> String {
                columns
                    .get(name)
                    .and_then(|&idx| row.get(idx))
                    .map(|v| v.trim().to_string())
                    .unwrap_or_default()
            };
            Task {
                row_number: i as u32 + 2,
                id: get("id"),
                content_type: get("type"),
                slug: get("slug"),
                title: get("title"),
                primary_keyword: get("primary_keyword"),
                secondary_keywords: get("secondary_keywords"),
                publish_date: get("publish_date"),
                status: get("status").into(),
                tags: get("tags"),
                category: get("category"),
                internal_links: get("internal_links"),
                notes: get("notes"),
            }
        })
        .collect();

    Ok(QueueSnapshot {
        tasks,
        status_column: columns["status"],
    })
}

/// Read the queue (with retry) and return the tasks actionable on `as_of`.
#[instrument(skip_all, fields(as_of = %as_of))]
pub async fn fetch_actionable_tasks(
    queue: &dyn TaskQueue,
    policy: &RetryPolicy,
    as_of: NaiveDate,
) -> Result<QueueSnapshot> {
    let rows = retry(policy, "queue read", || queue.read_rows()).await?;
    if rows.is_empty() {
        info!("queue is empty, nothing to do");
        return Ok(QueueSnapshot::default());
    }

    let snapshot = parse_rows(&rows)?;
    let total = snapshot.tasks.len();
    let actionable = snapshot.into_actionable(as_of);

    for task in &actionable.tasks {
        debug!(
            row = task.row_number,
            id = %task.id,
            content_type = %task.content_type,
            slug = %task.slug,
            "actionable task"
        );
    }
    info!(
        rows = total,
        actionable = actionable.tasks.len(),
        "queue filtered"
    );

    Ok(actionable)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryQueue;
    use pressline_shared::TaskStatus;

    const HEADER: &[&str] = &[
        "ID",
        " Type ",
        "slug",
        "title",
        "primary_keyword",
        "secondary_keywords",
        "publish_date",
        "Status",
        "notes",
    ];

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 17).unwrap()
    }

    fn row(id: &str, slug: &str, date: &str, status: &str) -> Vec<String> {
        vec![
            id.into(),
            "article".into(),
            slug.into(),
            "Time Management for Students".into(),
            "time management".into(),
            "study schedule, planner".into(),
            date.into(),
            status.into(),
        ]
    }

    fn table(data: Vec<Vec<String>>) -> Vec<Vec<String>> {
        let mut rows = vec![HEADER.iter().map(|s| s.to_string()).collect()];
        rows.extend(data);
        rows
    }

    #[test]
    fn header_is_matched_case_insensitively() {
        let snapshot =
            parse_rows(&table(vec![row("1", " time-management ", "2026-10-17", "ready")]))
                .unwrap();
        let task = &snapshot.tasks[0];

        assert_eq!(snapshot.status_column, 7);
        assert_eq!(task.row_number, 2);
        assert_eq!(task.slug, "time-management");
        assert_eq!(task.status, TaskStatus::Ready);
        assert_eq!(task.notes, "");
        assert_eq!(task.tags, "");
    }

    #[test]
    fn missing_columns_are_listed() {
        let rows = vec![vec!["id".to_string(), "slug".to_string(), "Status".to_string()]];
        match parse_rows(&rows) {
            Err(PresslineError::Schema { missing }) => assert_eq!(
                missing,
                [
                    "type",
                    "title",
                    "primary_keyword",
                    "secondary_keywords",
                    "publish_date"
                ]
            ),
            other => panic!("expected schema error, got {other:?}"),
        }
    }

    #[test]
    fn empty_sheet_is_empty_snapshot() {
        assert_eq!(parse_rows(&[]).unwrap(), QueueSnapshot::default());
    }

    #[test]
    fn header_only_has_no_tasks() {
        assert!(parse_rows(&table(vec![])).unwrap().tasks.is_empty());
    }

    #[tokio::test]
    async fn filters_to_actionable_rows() {
        let queue = MemoryQueue::new(table(vec![
            row("1", "time-management", "2026-10-17", "READY"),
            row("2", "tomorrow", "2026-10-18", "READY"),
            row("3", "", "2026-10-17", "READY"),
            row("4", "done", "2026-10-01", "PUBLISHED"),
            row("5", "overdue", "2026-09-30", "Ready"),
            vec![],
        ]));

        let snapshot = fetch_actionable_tasks(&queue, &RetryPolicy::once(), today())
            .await
            .unwrap();
        let ids: Vec<_> = snapshot.tasks.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, ["1", "5"]);
        assert_eq!(snapshot.tasks[1].row_number, 6);
    }

    #[tokio::test(start_paused = true)]
    async fn transient_read_failures_are_retried() {
        let queue = MemoryQueue::new(table(vec![row("1", "a", "2026-10-17", "READY")]));
        queue.fail_next_reads(2);

        let snapshot = fetch_actionable_tasks(&queue, &RetryPolicy::default(), today())
            .await
            .unwrap();
        assert_eq!(snapshot.tasks.len(), 1);
        assert_eq!(queue.read_count(), 3);
    }
}
