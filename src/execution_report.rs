use chrono::Utc;
use serde::Serialize;
use serde_json::Value;

use crate::document_store::DocumentStore;
use crate::errors::SinkUnavailable;

/// Where run reports land in the store.
pub const REPORT_COLLECTION: &str = "workflow_executions";

#[derive(Debug, Serialize)]
pub struct ExecutionSummary {
    pub records_extracted: usize,
    pub unique_periods: usize,
    pub metrics_count: usize,
    pub degraded_periods: Vec<String>,
    pub store_collection: String,
    pub mirror_sheet_id: String,
    pub cells_written: usize,
}

/// One document per mirror run, so operators can audit what happened
/// without re-reading logs.
#[derive(Debug, Serialize)]
pub struct ExecutionReport {
    pub workflow_id: String,
    pub execution_id: String,
    pub status: String,
    pub completed_at: String,
    pub summary: ExecutionSummary,
}

impl ExecutionReport {
    pub fn completed(workflow_id: impl Into<String>, summary: ExecutionSummary) -> Self {
        let now = Utc::now();
        Self {
            workflow_id: workflow_id.into(),
            execution_id: format!("exec_{}", now.format("%Y%m%d_%H%M%S")),
            status: "completed".to_string(),
            completed_at: now.to_rfc3339(),
            summary,
        }
    }

    pub async fn write(&self, store: &DocumentStore) -> Result<(), SinkUnavailable> {
        let document = serde_json::to_value(self).unwrap_or(Value::Null);
        store.insert_one(REPORT_COLLECTION, &document).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary() -> ExecutionSummary {
        ExecutionSummary {
            records_extracted: 222,
            unique_periods: 74,
            metrics_count: 18,
            degraded_periods: vec!["2020-01".to_string()],
            store_collection: "franchise_reports.revenue_report_raw".to_string(),
            mirror_sheet_id: "abc123".to_string(),
            cells_written: 1425,
        }
    }

    #[test]
    fn report_serializes_with_summary() {
        let report = ExecutionReport::completed("revenue_report_mirror", summary());
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["workflow_id"], "revenue_report_mirror");
        assert_eq!(value["status"], "completed");
        assert!(
            value["execution_id"]
                .as_str()
                .unwrap()
                .starts_with("exec_")
        );
        assert_eq!(value["summary"]["records_extracted"], 222);
        assert_eq!(value["summary"]["degraded_periods"][0], "2020-01");
        assert_eq!(value["summary"]["cells_written"], 1425);
    }
}
