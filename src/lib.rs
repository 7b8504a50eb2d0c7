mod config;
mod document_store;
mod errors;
mod execution_report;
mod mirror_context;
mod portal_session;
mod ratelimit;
mod record;
mod requests;
mod reshape;
mod sheet_mirror;
mod table_extract;
mod text_manipulators;

pub use config::{LoadFromEnv, PortalConfig, PortalCredentials, StoreEndpoints, is_iso_period};
pub use document_store::DocumentStore;
pub use errors::{AuthError, EmptyInputError, ExtractionDegraded, SinkUnavailable};
pub use execution_report::{ExecutionReport, ExecutionSummary, REPORT_COLLECTION};
pub use mirror_context::MirrorContext;
pub use portal_session::PortalSession;
pub use record::Record;
pub use reshape::{
    METRIC_HEADER, Matrix, PeriodOrder, ReshapeOptions, month_label_sort_key, reshape,
};
pub use sheet_mirror::{SheetMirror, UpdateValuesSummary, sheet_records};
pub use table_extract::extract_tables;
