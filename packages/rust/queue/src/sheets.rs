//! Google Sheets v4 values API client.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use pressline_shared::{PresslineError, QueueSettings, Result};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, instrument};
use url::Url;

use crate::auth::{ServiceAccountTokens, TokenSource};
use crate::{CellUpdate, TaskQueue, a1_cell, quote_sheet};

/// Timeout for a single Sheets request.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// User-Agent string for queue requests.
const USER_AGENT: &str = concat!("Pressline/", env!("CARGO_PKG_VERSION"));

/// Longest error body echoed into an error message.
const MAX_ERROR_BODY: usize = 300;

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

/// [`TaskQueue`] backed by one tab of a Google spreadsheet.
pub struct SheetsQueue {
    client: Client,
    tokens: Arc<dyn TokenSource>,
    api_base: Url,
    sheet_id: String,
    sheet_name: String,
}

impl SheetsQueue {
    /// Build a client that authenticates with the configured key file.
    pub fn from_settings(settings: &QueueSettings) -> Result<Self> {
        let tokens = ServiceAccountTokens::from_file(&settings.credentials)?;
        Self::new(settings, Arc::new(tokens))
    }

    pub fn new(settings: &QueueSettings, tokens: Arc<dyn TokenSource>) -> Result<Self> {
        let api_base = Url::parse(&settings.api_base).map_err(|e| {
            PresslineError::config(format!("invalid queue api_base '{}': {e}", settings.api_base))
        })?;

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| PresslineError::config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            tokens,
            api_base,
            sheet_id: settings.sheet_id.clone(),
            sheet_name: settings.sheet_name.clone(),
        })
    }

    /// `{api}/v4/spreadsheets/{id}/{tail...}`.
    fn api_url(&self, tail: &[&str]) -> Result<Url> {
        let mut url = self.api_base.clone();
        url.path_segments_mut()
            .map_err(|()| {
                PresslineError::config(format!("api_base cannot be a base: {}", self.api_base))
            })?
            .pop_if_empty()
            .extend(["v4", "spreadsheets", self.sheet_id.as_str()])
            .extend(tail);
        Ok(url)
    }
}

impl std::fmt::Debug for SheetsQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SheetsQueue")
            .field("api_base", &self.api_base.as_str())
            .field("sheet_id", &self.sheet_id)
            .field("sheet_name", &self.sheet_name)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl TaskQueue for SheetsQueue {
    #[instrument(skip_all, fields(sheet = %self.sheet_name))]
    async fn read_rows(&self) -> Result<Vec<Vec<String>>> {
        let range = format!("{}!A1:Z", quote_sheet(&self.sheet_name));
        let url = self.api_url(&["values", &range])?;
        let token = self.tokens.token().await?;

        let response = self
            .client
            .get(url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| PresslineError::queue_transient(format!("read {range}: {e}")))?;
        let response = check_status(response, &range).await?;

        let body: ValueRange = response
            .json()
            .await
            .map_err(|e| PresslineError::queue_fatal(format!("read {range}: bad response body: {e}")))?;

        let rows: Vec<Vec<String>> = body
            .values
            .into_iter()
            .map(|row| row.into_iter().map(cell_to_string).collect())
            .collect();

        debug!(rows = rows.len(), "queue rows fetched");
        Ok(rows)
    }

    #[instrument(skip_all, fields(sheet = %self.sheet_name, cells = updates.len()))]
    async fn write_cells(&self, updates: &[CellUpdate]) -> Result<()> {
        if updates.is_empty() {
            return Ok(());
        }

        let data: Vec<Value> = updates
            .iter()
            .map(|u| {
                json!({
                    "range": a1_cell(&self.sheet_name, u),
                    "values": [[u.value]],
                })
            })
            .collect();
        let body = json!({ "valueInputOption": "RAW", "data": data });

        let url = self.api_url(&["values:batchUpdate"])?;
        let token = self.tokens.token().await?;

        let response = self
            .client
            .post(url)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .map_err(|e| PresslineError::queue_transient(format!("batch update: {e}")))?;
        check_status(response, "batch update").await?;

        debug!("queue cells written");
        Ok(())
    }
}

/// Map non-success responses: 429 and 5xx are transient, other 4xx fatal.
async fn check_status(response: reqwest::Response, what: &str) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let snippet: String = body.chars().take(MAX_ERROR_BODY).collect();
    let message = format!("{what}: HTTP {status}: {}", snippet.trim());

    if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        Err(PresslineError::queue_transient(message))
    } else {
        Err(PresslineError::queue_fatal(message))
    }
}

fn cell_to_string(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::StaticToken;

    fn queue_for(server: &wiremock::MockServer) -> SheetsQueue {
        let settings = QueueSettings {
            sheet_id: "sheet-1".into(),
            sheet_name: "Queue".into(),
            credentials: PathBuf::from("unused.json"),
            api_base: server.uri(),
        };
        SheetsQueue::new(&settings, Arc::new(StaticToken("test-token".into()))).unwrap()
    }

    #[tokio::test]
    async fn read_rows_stringifies_cells() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/v4/spreadsheets/sheet-1/values/Queue!A1:Z"))
            .and(wiremock::matchers::header("authorization", "Bearer test-token"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_json(json!({
                "range": "Queue!A1:Z3",
                "majorDimension": "ROWS",
                "values": [
                    ["id", "status"],
                    [7, "READY"],
                    ["8", null, true]
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let rows = queue_for(&server).read_rows().await.unwrap();
        assert_eq!(
            rows,
            vec![
                vec!["id".to_string(), "status".to_string()],
                vec!["7".to_string(), "READY".to_string()],
                vec!["8".to_string(), String::new(), "true".to_string()],
            ]
        );
    }

    #[tokio::test]
    async fn empty_sheet_has_no_rows() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .respond_with(
                wiremock::ResponseTemplate::new(200).set_body_json(json!({ "range": "Queue!A1:Z" })),
            )
            .mount(&server)
            .await;

        assert!(queue_for(&server).read_rows().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn server_errors_are_transient_client_errors_fatal() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .respond_with(wiremock::ResponseTemplate::new(503).set_body_string("backend unavailable"))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .respond_with(wiremock::ResponseTemplate::new(403).set_body_string("permission denied"))
            .mount(&server)
            .await;

        let queue = queue_for(&server);

        let err = queue.read_rows().await.unwrap_err();
        assert!(err.is_transient(), "503 should be transient: {err}");
        assert!(err.to_string().contains("503"));

        let err = queue.read_rows().await.unwrap_err();
        assert!(!err.is_transient(), "403 should be fatal: {err}");
        assert!(err.to_string().contains("permission denied"));
    }

    #[tokio::test]
    async fn rate_limit_is_transient() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .respond_with(wiremock::ResponseTemplate::new(429))
            .mount(&server)
            .await;

        assert!(queue_for(&server).read_rows().await.unwrap_err().is_transient());
    }

    #[tokio::test]
    async fn write_cells_sends_one_raw_batch() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .and(wiremock::matchers::path("/v4/spreadsheets/sheet-1/values:batchUpdate"))
            .and(wiremock::matchers::body_json(json!({
                "valueInputOption": "RAW",
                "data": [
                    { "range": "Queue!H2", "values": [["PUBLISHED"]] },
                    { "range": "Queue!H4", "values": [["ERROR"]] }
                ]
            })))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(1)
            .mount(&server)
            .await;

        let updates = [
            CellUpdate {
                row: 2,
                column: 7,
                value: "PUBLISHED".into(),
            },
            CellUpdate {
                row: 4,
                column: 7,
                value: "ERROR".into(),
            },
        ];
        queue_for(&server).write_cells(&updates).await.unwrap();
    }

    #[tokio::test]
    async fn write_nothing_skips_request() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::any())
            .respond_with(wiremock::ResponseTemplate::new(500))
            .expect(0)
            .mount(&server)
            .await;

        queue_for(&server).write_cells(&[]).await.unwrap();
    }
}
