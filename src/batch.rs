//! Sequential batch analysis and its summary metrics.

use crate::analysis::AnthropicClient;
use crate::errors::AppError;
use crate::models::{BatchFailure, BatchReport, BatchRow, BatchSummary, ChurnRisk, CustomerRecord};
use chrono::Utc;
use uuid::Uuid;

/// Analyzes `records` one at a time, in order.
///
/// Customers whose analysis fails are reported in `failures` and left out of
/// the rows and the summary. A missing credential stops the whole run.
pub async fn run_batch(
    client: &AnthropicClient,
    records: &[CustomerRecord],
) -> Result<BatchReport, AppError> {
    let run_id = Uuid::new_v4();
    let started_at = Utc::now();
    let total = records.len();
    tracing::info!("Batch {} started: {} customers", run_id, total);

    let mut rows = Vec::with_capacity(total);
    let mut failures = Vec::new();

    for (idx, record) in records.iter().enumerate() {
        let position = idx + 1;
        tracing::info!("Analyzing {}... ({}/{})", record.name, position, total);

        match client.analyze(record).await {
            Ok(result) => rows.push(BatchRow {
                position,
                name: record.name.clone(),
                health_score: result.health_score,
                churn_risk: result.churn_risk,
                revenue: record.total_revenue,
                days_since_last_activity: record.days_since_last_activity,
                open_tickets: record.open_tickets,
            }),
            Err(e) if !e.is_remote() => {
                tracing::error!("Batch {} aborted: {}", run_id, e);
                return Err(e.into());
            }
            Err(e) => {
                tracing::warn!("Skipping {} in batch {}: {}", record.name, run_id, e);
                failures.push(BatchFailure {
                    position,
                    name: record.name.clone(),
                    error: e.to_string(),
                });
            }
        }
    }

    let summary = summarize(&rows, total);
    tracing::info!(
        "✓ Batch {} complete: {} analyzed, {} failed",
        run_id,
        summary.analyzed,
        summary.failed
    );

    Ok(BatchReport {
        run_id,
        started_at,
        finished_at: Utc::now(),
        rows,
        failures,
        summary,
    })
}

/// Computes summary metrics over successful rows.
///
/// With no rows the mean and the high-risk share are `None`.
pub fn summarize(rows: &[BatchRow], requested: usize) -> BatchSummary {
    let analyzed = rows.len();
    let high_risk: Vec<&BatchRow> = rows
        .iter()
        .filter(|r| r.churn_risk == ChurnRisk::High)
        .collect();

    let (mean_health_score, high_risk_pct) = if analyzed == 0 {
        (None, None)
    } else {
        let score_sum: f64 = rows.iter().map(|r| f64::from(r.health_score)).sum();
        (
            Some(score_sum / analyzed as f64),
            Some(high_risk.len() as f64 / analyzed as f64 * 100.0),
        )
    };

    BatchSummary {
        requested,
        analyzed,
        failed: requested.saturating_sub(analyzed),
        mean_health_score,
        high_risk_count: high_risk.len(),
        high_risk_pct,
        total_revenue: rows.iter().map(|r| r.revenue).sum(),
        revenue_at_risk: high_risk.iter().map(|r| r.revenue).sum(),
    }
}
