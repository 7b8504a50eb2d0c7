use std::time::Duration;

use dotenv::dotenv;
use serde_json::Value;
use spindle::{
    EmptyInputError, ExecutionReport, ExecutionSummary, ExtractionDegraded, Matrix, MirrorContext,
    PortalConfig, PortalSession, Record, ReshapeOptions, is_iso_period, reshape,
};
use tokio::time::sleep;

extern crate env_logger;
extern crate log;

use log::LevelFilter;

use log::{error, info, warn};

const PORTAL_BASE_URL: &str = "https://connect.franchiseportal.com";
const REPORT_PATH: &str = "/reports/revenue-report/";

const STORE_DATABASE: &str = "franchise_reports";
const RAW_COLLECTION: &str = "revenue_report_raw";
const MIRROR_SHEET_TITLE: &str = "Revenue Report Mirror";
const WORKFLOW_ID: &str = "revenue_report_mirror";

// Historical backfill hints; the final None pass picks up the latest data.
const DEFAULT_BACKFILL_PERIODS: &[Option<&str>] = &[
    Some("2020-01"),
    Some("2021-01"),
    Some("2022-01"),
    Some("2023-01"),
    Some("2024-01"),
    None,
];

// Politeness throttle between successive period extractions; this is about
// not hammering the portal, not about correctness.
const PERIOD_THROTTLE: Duration = Duration::from_secs(2);

// Scraped records carry their period under a synthetic key so they merge
// cleanly with period-labelled sources downstream.
const SYNTHETIC_PERIOD_KEY: &str = "_start_from";
const EXTRACTED_AT_KEY: &str = "_extracted_at";
const LATEST_LABEL: &str = "latest";

struct BackfillOutcome {
    records: Vec<Record>,
    degraded_periods: Vec<String>,
}

struct MirrorOutcome {
    matrix: Matrix,
    sheet_id: String,
}

fn periods_from_args() -> Vec<Option<String>> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.is_empty() {
        return DEFAULT_BACKFILL_PERIODS
            .iter()
            .map(|period| period.map(str::to_string))
            .collect();
    }
    // Explicit period hints from the command line, plus a final latest pass.
    let mut periods: Vec<Option<String>> = args.into_iter().map(Some).collect();
    periods.push(None);
    periods
}

async fn run_backfill_job(
    session: &mut PortalSession,
    periods: &[Option<String>],
) -> anyhow::Result<BackfillOutcome> {
    let mut records = Vec::new();
    let mut degraded_periods = Vec::new();

    for (i, period) in periods.iter().enumerate() {
        let hint = period.as_deref();
        let label = hint.unwrap_or(LATEST_LABEL);
        info!("[{}/{}] extracting period {label}", i + 1, periods.len());

        if hint.is_some() && !is_iso_period(label) {
            warn!("period label {label} is not YYYY-MM; mirror columns may sort out of order");
        }

        let mut scraped = session.scrape_table(hint).await?;
        if scraped.is_empty() {
            let degraded = ExtractionDegraded::new(label);
            warn!("{degraded}");
            degraded_periods.push(label.to_string());
        } else {
            let extracted_at = chrono::Utc::now().to_rfc3339();
            for record in &mut scraped {
                record.insert(SYNTHETIC_PERIOD_KEY, label);
                record.insert(EXTRACTED_AT_KEY, extracted_at.clone());
            }
            info!("extracted {} records from {label}", scraped.len());
            records.extend(scraped);
        }

        if i + 1 < periods.len() {
            sleep(PERIOD_THROTTLE).await;
        }
    }

    Ok(BackfillOutcome {
        records,
        degraded_periods,
    })
}

async fn run_store_refresh_job(
    ctx: &MirrorContext,
    records: &[Record],
) -> anyhow::Result<Vec<Record>> {
    let documents: Vec<Value> = records.iter().map(Record::to_document).collect();
    info!(
        "refreshing {STORE_DATABASE}.{RAW_COLLECTION} ({} documents)...",
        documents.len()
    );
    ctx.store
        .replace_collection(RAW_COLLECTION, &documents)
        .await?;

    // The mirror is built from the store's view of the data, not from the
    // in-memory batch.
    let stored = ctx.store.read_all(RAW_COLLECTION).await?;
    let records: Vec<Record> = stored.iter().filter_map(Record::from_document).collect();
    info!("read back {} records from the store", records.len());
    Ok(records)
}

async fn run_mirror_job(ctx: &MirrorContext, records: &[Record]) -> anyhow::Result<MirrorOutcome> {
    let options = ReshapeOptions::new(SYNTHETIC_PERIOD_KEY)
        .metadata_keys([EXTRACTED_AT_KEY, "_id"])
        .fallback_period_label(LATEST_LABEL);
    let matrix = reshape(records, &options)?;
    info!(
        "built matrix: {} rows x {} columns",
        matrix.row_count(),
        matrix.column_count()
    );

    let sheet_id = ctx.sheets.create_spreadsheet(MIRROR_SHEET_TITLE).await?;
    info!("created mirror sheet {sheet_id}");

    let summary = ctx
        .sheets
        .update_values(&sheet_id, "Sheet1!A1", &matrix.rows)
        .await?;
    info!(
        "wrote mirror sheet: {} rows, {} columns, {} cells",
        summary.updated_rows, summary.updated_columns, summary.updated_cells
    );

    // Read a corner range back; an empty readback means the write silently
    // failed and the operator should look at the sheet before trusting it.
    let corner = ctx.sheets.read_values(&sheet_id, "Sheet1!A1:C3").await?;
    if corner.is_empty() {
        warn!("mirror verification read returned no rows");
    } else {
        info!("verified mirror sheet: read back {} rows", corner.len());
    }

    Ok(MirrorOutcome { matrix, sheet_id })
}

async fn run_report_job(
    ctx: &MirrorContext,
    backfill: &BackfillOutcome,
    mirror: &MirrorOutcome,
    stored_count: usize,
) -> anyhow::Result<()> {
    let summary = ExecutionSummary {
        records_extracted: stored_count,
        unique_periods: mirror.matrix.column_count().saturating_sub(1),
        metrics_count: mirror.matrix.row_count().saturating_sub(1),
        degraded_periods: backfill.degraded_periods.clone(),
        store_collection: format!("{STORE_DATABASE}.{RAW_COLLECTION}"),
        mirror_sheet_id: mirror.sheet_id.clone(),
        cells_written: mirror.matrix.cell_count(),
    };
    let report = ExecutionReport::completed(WORKFLOW_ID, summary);
    report.write(&ctx.store).await?;
    info!("execution report written to {}", spindle::REPORT_COLLECTION);
    Ok(())
}

async fn run() -> anyhow::Result<()> {
    let portal_config = PortalConfig::new(PORTAL_BASE_URL, REPORT_PATH);
    let ctx = MirrorContext::new(portal_config, STORE_DATABASE)?;
    let periods = periods_from_args();

    let mut session = PortalSession::launch(ctx.portal_config.clone()).await?;
    let backfill = async {
        session.login(&ctx.credentials).await?;
        run_backfill_job(&mut session, &periods).await
    }
    .await;
    // The browser goes down no matter how extraction went.
    session.close().await;
    let backfill = backfill?;

    if backfill.records.is_empty() {
        // Nothing extracted at all; writing would wipe the destination.
        return Err(EmptyInputError.into());
    }

    let stored = run_store_refresh_job(&ctx, &backfill.records).await?;
    let mirror = run_mirror_job(&ctx, &stored).await?;
    run_report_job(&ctx, &backfill, &mirror, stored.len()).await?;

    info!(
        "mirror complete: {} records, {} periods, {} metrics, sheet {}",
        stored.len(),
        mirror.matrix.column_count().saturating_sub(1),
        mirror.matrix.row_count().saturating_sub(1),
        mirror.sheet_id
    );
    Ok(())
}

#[tokio::main]
async fn main() {
    dotenv().ok();
    env_logger::Builder::new()
        .filter_level(LevelFilter::Info)
        .init();

    if let Err(e) = run().await {
        error!("mirror run failed: {e:#}");
        std::process::exit(1);
    }
}
