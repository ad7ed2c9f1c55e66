use super::{Row, SourceError, TableSource};
use crate::config::SourceConfig;
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use std::thread;
use std::time::Duration;
use tracing::{info, warn};

const RETRY_BACKOFF: Duration = Duration::from_millis(250);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Table source backed by a PostgREST-style endpoint.
///
/// `fetch_all` walks the table with `limit`/`offset` pagination, continuing
/// while the server keeps returning full-sized pages and stopping on the
/// first undersized or empty page. Each page request is retried a bounded
/// number of times before the whole fetch is reported unavailable.
pub struct RestTableSource {
    client: Client,
    base_url: String,
    page_size: usize,
    retries: u32,
}

impl RestTableSource {
    pub fn from_config(config: &SourceConfig) -> Result<Self, SourceError> {
        let mut headers = HeaderMap::new();
        let mut bearer = HeaderValue::from_str(&format!("Bearer {}", config.api_key))
            .map_err(|err| SourceError::Unavailable {
                table: "-".to_string(),
                detail: format!("invalid api key header: {err}"),
            })?;
        bearer.set_sensitive(true);
        headers.insert(AUTHORIZATION, bearer);

        let mut api_key = HeaderValue::from_str(&config.api_key).map_err(|err| {
            SourceError::Unavailable {
                table: "-".to_string(),
                detail: format!("invalid api key header: {err}"),
            }
        })?;
        api_key.set_sensitive(true);
        headers.insert("apikey", api_key);

        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .default_headers(headers)
            .build()
            .map_err(|err| SourceError::Unavailable {
                table: "-".to_string(),
                detail: format!("failed to build http client: {err}"),
            })?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            page_size: config.page_size,
            retries: config.fetch_retries,
        })
    }

    fn fetch_page(&self, table: &str, offset: usize) -> Result<Vec<Row>, SourceError> {
        let url = format!("{}/rest/v1/{}", self.base_url, table);
        let mut last_error = String::new();

        for attempt in 0..=self.retries {
            if attempt > 0 {
                thread::sleep(RETRY_BACKOFF);
            }

            let response = self
                .client
                .get(&url)
                .query(&[
                    ("select", "*".to_string()),
                    ("limit", self.page_size.to_string()),
                    ("offset", offset.to_string()),
                ])
                .send()
                .and_then(|response| response.error_for_status());

            match response {
                Ok(response) => {
                    let body = response.text().map_err(|err| SourceError::Unavailable {
                        table: table.to_string(),
                        detail: err.to_string(),
                    })?;
                    return parse_rows(&body, table);
                }
                Err(err) => {
                    warn!(table, attempt, %err, "table page fetch failed");
                    last_error = err.to_string();
                }
            }
        }

        Err(SourceError::Unavailable {
            table: table.to_string(),
            detail: last_error,
        })
    }
}

impl TableSource for RestTableSource {
    fn fetch_all(&self, table: &str) -> Result<Vec<Row>, SourceError> {
        let mut rows = Vec::new();
        let mut offset = 0;

        loop {
            let page = self.fetch_page(table, offset)?;
            let page_len = page.len();
            rows.extend(page);

            if page_len < self.page_size {
                break;
            }
            offset += page_len;
        }

        info!(table, rows = rows.len(), "fetched table");
        Ok(rows)
    }
}

fn parse_rows(body: &str, table: &str) -> Result<Vec<Row>, SourceError> {
    let values: Vec<serde_json::Value> =
        serde_json::from_str(body).map_err(|err| SourceError::Malformed {
            table: table.to_string(),
            detail: err.to_string(),
        })?;

    values
        .into_iter()
        .map(|value| match value {
            serde_json::Value::Object(map) => Ok(map),
            other => Err(SourceError::Malformed {
                table: table.to_string(),
                detail: format!("expected an object row, got {other}"),
            }),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_rows_accepts_object_arrays() {
        let rows = parse_rows(r#"[{"employee_id":"E1"},{"employee_id":"E2"}]"#, "employees")
            .expect("valid payload parses");
        assert_eq!(rows.len(), 2);
        assert_eq!(
            rows[0].get("employee_id").and_then(|v| v.as_str()),
            Some("E1")
        );
    }

    #[test]
    fn parse_rows_rejects_non_object_rows() {
        let error = parse_rows(r#"[1, 2]"#, "employees").expect_err("scalar rows rejected");
        assert!(matches!(error, SourceError::Malformed { .. }));
    }

    #[test]
    fn parse_rows_rejects_non_array_payloads() {
        let error = parse_rows(r#"{"message":"oops"}"#, "employees")
            .expect_err("object payload rejected");
        assert!(matches!(error, SourceError::Malformed { .. }));
    }
}
