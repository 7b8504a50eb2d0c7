use log::warn;
use serde::{Deserialize, Serialize};

use crate::document_store::body_preview;
use crate::errors::SinkUnavailable;
use crate::record::Record;
use crate::requests::RequestClient;

#[derive(Serialize)]
struct CreateSpreadsheetRequest<'a> {
    title: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateSpreadsheetResponse {
    spreadsheet_id: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UpdateValuesRequest<'a> {
    range: &'a str,
    values: &'a [Vec<String>],
    value_input_option: &'a str,
}

/// What the sheet service reports back after a range write.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateValuesSummary {
    #[serde(default)]
    pub updated_range: Option<String>,
    #[serde(default)]
    pub updated_rows: u64,
    #[serde(default)]
    pub updated_columns: u64,
    #[serde(default)]
    pub updated_cells: u64,
}

#[derive(Serialize)]
struct GetValuesRequest<'a> {
    range: &'a str,
}

#[derive(Deserialize, Default)]
struct GetValuesResponse {
    #[serde(default)]
    values: Vec<Vec<String>>,
}

/// Spreadsheet sink: create a spreadsheet, write a range of rows, read a
/// range of rows. Rows are Matrix rows; ranges are `Sheet!A1`-style.
///
/// Rides the same proxy service as the document store, so it walks the same
/// ordered endpoint candidates before giving up.
pub struct SheetMirror {
    client: RequestClient,
    endpoints: Vec<String>,
}

impl SheetMirror {
    pub fn new(endpoints: Vec<String>) -> anyhow::Result<Self> {
        Ok(Self {
            client: RequestClient::new()?,
            endpoints,
        })
    }

    pub async fn create_spreadsheet(&self, title: &str) -> Result<String, SinkUnavailable> {
        let body = self
            .post_any(
                "sheets/spreadsheets/create",
                &CreateSpreadsheetRequest { title },
            )
            .await?;
        let parsed: CreateSpreadsheetResponse = serde_json::from_str(&body).map_err(|e| {
            SinkUnavailable::new(
                "create spreadsheet",
                self.endpoints.len(),
                format!("unparseable response: {e}"),
            )
        })?;
        Ok(parsed.spreadsheet_id)
    }

    pub async fn update_values(
        &self,
        spreadsheet_id: &str,
        range: &str,
        values: &[Vec<String>],
    ) -> Result<UpdateValuesSummary, SinkUnavailable> {
        let path = format!("sheets/{spreadsheet_id}/values/update");
        let payload = UpdateValuesRequest {
            range,
            values,
            value_input_option: "RAW",
        };
        let body = self.post_any(&path, &payload).await?;
        Ok(serde_json::from_str(&body).unwrap_or_default())
    }

    pub async fn read_values(
        &self,
        spreadsheet_id: &str,
        range: &str,
    ) -> Result<Vec<Vec<String>>, SinkUnavailable> {
        let path = format!("sheets/{spreadsheet_id}/values/get");
        let body = self.post_any(&path, &GetValuesRequest { range }).await?;
        let parsed: GetValuesResponse = serde_json::from_str(&body).unwrap_or_default();
        Ok(parsed.values)
    }

    async fn post_any<T: Serialize>(
        &self,
        path: &str,
        payload: &T,
    ) -> Result<String, SinkUnavailable> {
        let mut last_failure = String::from("no endpoints configured");
        for endpoint in &self.endpoints {
            let url = format!("{}/{}", endpoint.trim_end_matches('/'), path);
            match self.client.post_json(&url, payload).await {
                Ok(response) => {
                    let status = response.status();
                    let body = response.text().await.unwrap_or_default();
                    if status.is_success() {
                        return Ok(body);
                    }
                    last_failure = format!("{url} returned {status}: {}", body_preview(&body));
                    warn!("sheet call failed, {last_failure}");
                }
                Err(e) => {
                    last_failure = format!("{url}: {e:#}");
                    warn!("sheet call failed, {last_failure}");
                }
            }
        }
        Err(SinkUnavailable::new(
            path.to_string(),
            self.endpoints.len(),
            last_failure,
        ))
    }
}

/// Convert a sheet range into period-keyed records.
///
/// `header_row` indexes the row holding field names; data rows follow it.
/// `period_column` indexes the column holding the period label. Rows with no
/// period value are structural noise (spacers, section titles) and are
/// skipped at this stage.
pub fn sheet_records(
    values: &[Vec<String>],
    header_row: usize,
    period_column: usize,
    period_key: &str,
) -> Vec<Record> {
    let Some(headers) = values.get(header_row) else {
        return Vec::new();
    };

    let mut records = Vec::new();
    for row in values.iter().skip(header_row + 1) {
        let period = row.get(period_column).map(String::as_str).unwrap_or("");
        if period.is_empty() {
            continue;
        }
        let mut record = Record::new();
        record.insert(period_key, period);
        for (column, header) in headers.iter().enumerate() {
            if header.is_empty() || header == period_key || column == period_column {
                continue;
            }
            if let Some(cell) = row.get(column) {
                record.insert(header.clone(), cell.clone());
            }
        }
        records.push(record);
    }
    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rows(raw: &[&[&str]]) -> Vec<Vec<String>> {
        raw.iter()
            .map(|row| row.iter().map(|cell| cell.to_string()).collect())
            .collect()
    }

    #[test]
    fn update_request_serializes_camel_case() {
        let values = vec![vec!["Metric".to_string(), "2024-01".to_string()]];
        let payload = UpdateValuesRequest {
            range: "Sheet1!A1",
            values: &values,
            value_input_option: "RAW",
        };
        assert_eq!(
            serde_json::to_value(&payload).unwrap(),
            json!({
                "range": "Sheet1!A1",
                "values": [["Metric", "2024-01"]],
                "valueInputOption": "RAW",
            })
        );
    }

    #[test]
    fn update_summary_parses_service_fields() {
        let summary: UpdateValuesSummary = serde_json::from_str(
            r#"{"updatedRange": "Sheet1!A1:C3", "updatedRows": 3, "updatedColumns": 3, "updatedCells": 9}"#,
        )
        .unwrap();
        assert_eq!(summary.updated_range.as_deref(), Some("Sheet1!A1:C3"));
        assert_eq!(summary.updated_cells, 9);
    }

    #[test]
    fn create_response_parses_spreadsheet_id() {
        let parsed: CreateSpreadsheetResponse =
            serde_json::from_str(r#"{"spreadsheetId": "abc123"}"#).unwrap();
        assert_eq!(parsed.spreadsheet_id, "abc123");
    }

    #[test]
    fn sheet_records_reads_past_the_header_row() {
        let values = rows(&[
            &["Automated import", "", ""],
            &["", "Period", "Revenue"],
            &["", "2024 January first half", "10"],
            &["", "2024 January second half", "12"],
        ]);
        let records = sheet_records(&values, 1, 1, "Period");
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].get("Period"), Some("2024 January first half"));
        assert_eq!(records[0].get("Revenue"), Some("10"));
        assert_eq!(records[1].get("Revenue"), Some("12"));
    }

    #[test]
    fn sheet_records_skips_rows_without_a_period() {
        let values = rows(&[
            &["", "Period", "Revenue"],
            &["", "", "11"],
            &["totals", "", ""],
            &["", "2024 February first half", "9"],
        ]);
        let records = sheet_records(&values, 0, 1, "Period");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].get("Period"), Some("2024 February first half"));
    }

    #[test]
    fn sheet_records_with_no_header_row_is_empty() {
        assert!(sheet_records(&[], 1, 1, "Period").is_empty());
    }
}
