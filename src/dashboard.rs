//! View models for the dashboard widgets.
//!
//! Front ends render these as-is: metric cards, the health gauge, the churn
//! badge, the results table and the score bar chart.

use crate::models::{
    AnalysisResult, BatchFailure, BatchReport, BatchRow, BatchSummary, ChurnRisk, CustomerRecord,
};
use crate::prompt::format_currency_rounded;
use serde::Serialize;
use uuid::Uuid;

/// Score at which the gauge draws its threshold line.
pub const GAUGE_THRESHOLD: u8 = 50;

/// A single labelled value, optionally with a delta underneath.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricCard {
    pub label: String,
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delta: Option<String>,
}

impl MetricCard {
    fn new(label: &str, value: impl ToString) -> Self {
        Self {
            label: label.to_string(),
            value: value.to_string(),
            delta: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GaugeBand {
    Critical,
    Warning,
    Healthy,
}

impl GaugeBand {
    pub fn for_score(score: u8) -> Self {
        match score {
            0..=32 => GaugeBand::Critical,
            33..=65 => GaugeBand::Warning,
            _ => GaugeBand::Healthy,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GaugeStep {
    pub from: u8,
    pub to: u8,
    pub color: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GaugeView {
    pub value: u8,
    pub min: u8,
    pub max: u8,
    pub band: GaugeBand,
    pub threshold: u8,
    pub steps: Vec<GaugeStep>,
}

impl GaugeView {
    pub fn new(value: u8) -> Self {
        Self {
            value,
            min: 0,
            max: 100,
            band: GaugeBand::for_score(value),
            threshold: GAUGE_THRESHOLD,
            steps: vec![
                GaugeStep {
                    from: 0,
                    to: 33,
                    color: "lightcoral",
                },
                GaugeStep {
                    from: 33,
                    to: 66,
                    color: "lightyellow",
                },
                GaugeStep {
                    from: 66,
                    to: 100,
                    color: "lightgreen",
                },
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskBadge {
    pub risk: ChurnRisk,
    pub label: &'static str,
    pub color: &'static str,
}

impl RiskBadge {
    pub fn new(risk: ChurnRisk) -> Self {
        let label = match risk {
            ChurnRisk::Low => "🟢 BAJO",
            ChurnRisk::Medium => "🟡 MEDIO",
            ChurnRisk::High => "🔴 ALTO",
        };
        Self {
            risk,
            label,
            color: risk_color(risk),
        }
    }
}

/// Bar colour for a churn risk level.
pub fn risk_color(risk: ChurnRisk) -> &'static str {
    match risk {
        ChurnRisk::Low => "#90EE90",
        ChurnRisk::Medium => "#FFD700",
        ChurnRisk::High => "#FF6B6B",
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NumberedRecommendation {
    pub number: usize,
    pub text: String,
}

/// Customer data panel shown before and alongside an analysis.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CustomerView {
    pub record: CustomerRecord,
    pub metrics: Vec<MetricCard>,
}

impl CustomerView {
    pub fn new(record: &CustomerRecord) -> Self {
        let engagement = record.engagement_level();
        let metrics = vec![
            MetricCard::new("Días sin actividad", record.days_since_last_activity),
            MetricCard::new(
                "Revenue Total",
                format_currency_rounded(record.total_revenue),
            ),
            MetricCard::new("Tickets Abiertos", record.open_tickets),
            MetricCard::new("Total Tickets", record.total_tickets),
            MetricCard::new("Oport. Ganadas", record.opportunities_won),
            MetricCard::new("Oport. Perdidas", record.opportunities_lost),
            MetricCard::new(
                "Email Engagement",
                format!("{} {}", engagement.indicator(), record.email_engagement),
            ),
        ];
        Self {
            record: record.clone(),
            metrics,
        }
    }
}

/// Everything the single-customer tab shows after a successful analysis.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisView {
    pub customer: CustomerView,
    pub gauge: GaugeView,
    pub risk_badge: RiskBadge,
    pub analysis: String,
    pub recommendations: Vec<NumberedRecommendation>,
    pub raw: AnalysisResult,
}

impl AnalysisView {
    pub fn new(record: &CustomerRecord, result: AnalysisResult) -> Self {
        let recommendations = result
            .recommendations
            .iter()
            .enumerate()
            .map(|(i, text)| NumberedRecommendation {
                number: i + 1,
                text: text.clone(),
            })
            .collect();

        Self {
            customer: CustomerView::new(record),
            gauge: GaugeView::new(result.health_score),
            risk_badge: RiskBadge::new(result.churn_risk),
            analysis: result.analysis.clone(),
            recommendations,
            raw: result,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableRow {
    #[serde(flatten)]
    pub row: BatchRow,
    /// Background for the health score cell on a red-yellow-green scale.
    pub score_color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartBar {
    pub name: String,
    pub health_score: u8,
    pub churn_risk: ChurnRisk,
    pub color: &'static str,
}

/// Everything the batch tab shows after a run.
#[derive(Debug, Clone, Serialize)]
pub struct BatchDashboard {
    pub run_id: Uuid,
    pub metrics: Vec<MetricCard>,
    pub table: Vec<TableRow>,
    /// Sorted by ascending health score.
    pub chart: Vec<ChartBar>,
    pub failures: Vec<BatchFailure>,
    pub summary: BatchSummary,
}

impl BatchDashboard {
    pub fn new(report: BatchReport) -> Self {
        let BatchReport {
            run_id,
            rows,
            failures,
            summary,
            ..
        } = report;

        let (lo, hi) = rows.iter().fold((u8::MAX, u8::MIN), |(lo, hi), r| {
            (lo.min(r.health_score), hi.max(r.health_score))
        });

        let mut chart: Vec<ChartBar> = rows
            .iter()
            .map(|r| ChartBar {
                name: r.name.clone(),
                health_score: r.health_score,
                churn_risk: r.churn_risk,
                color: risk_color(r.churn_risk),
            })
            .collect();
        chart.sort_by_key(|bar| bar.health_score);

        let table = rows
            .into_iter()
            .map(|row| TableRow {
                score_color: gradient_color(row.health_score, lo, hi),
                row,
            })
            .collect();

        Self {
            run_id,
            metrics: summary_metrics(&summary),
            table,
            chart,
            failures,
            summary,
        }
    }
}

fn summary_metrics(summary: &BatchSummary) -> Vec<MetricCard> {
    let mean = match summary.mean_health_score {
        Some(mean) => format!("{:.0}/100", mean),
        None => "Sin datos".to_string(),
    };

    let mut high_risk = MetricCard::new("Clientes Alto Riesgo", summary.high_risk_count);
    high_risk.delta = summary.high_risk_pct.map(|pct| format!("{:.0}%", pct));

    vec![
        MetricCard::new("Health Score Promedio", mean),
        high_risk,
        MetricCard::new(
            "Revenue Total",
            format_currency_rounded(summary.total_revenue),
        ),
        MetricCard::new(
            "Revenue en Riesgo",
            format_currency_rounded(summary.revenue_at_risk),
        ),
    ]
}

const GRADIENT_RED: (u8, u8, u8) = (0xd7, 0x30, 0x27);
const GRADIENT_YELLOW: (u8, u8, u8) = (0xff, 0xff, 0xbf);
const GRADIENT_GREEN: (u8, u8, u8) = (0x1a, 0x98, 0x50);

/// Maps `score` onto red-yellow-green relative to the column's `lo..=hi`.
fn gradient_color(score: u8, lo: u8, hi: u8) -> String {
    let t = if hi > lo {
        f64::from(score - lo) / f64::from(hi - lo)
    } else {
        0.5
    };
    let (from, to, local) = if t <= 0.5 {
        (GRADIENT_RED, GRADIENT_YELLOW, t * 2.0)
    } else {
        (GRADIENT_YELLOW, GRADIENT_GREEN, (t - 0.5) * 2.0)
    };
    let mix = |a: u8, b: u8| (f64::from(a) + (f64::from(b) - f64::from(a)) * local).round() as u8;
    format!(
        "#{:02x}{:02x}{:02x}",
        mix(from.0, to.0),
        mix(from.1, to.1),
        mix(from.2, to.2)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::summarize;
    use chrono::Utc;

    fn record() -> CustomerRecord {
        CustomerRecord {
            name: "Acme Corp".to_string(),
            days_since_last_activity: 3,
            open_tickets: 1,
            total_tickets: 12,
            total_revenue: 125000.5,
            opportunities_won: 4,
            opportunities_lost: 1,
            email_engagement: "high".to_string(),
        }
    }

    fn row(name: &str, score: u8, risk: ChurnRisk) -> BatchRow {
        BatchRow {
            position: 1,
            name: name.to_string(),
            health_score: score,
            churn_risk: risk,
            revenue: 1000.0,
            days_since_last_activity: 5,
            open_tickets: 0,
        }
    }

    fn report(rows: Vec<BatchRow>) -> BatchReport {
        let summary = summarize(&rows, rows.len());
        BatchReport {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            finished_at: Utc::now(),
            rows,
            failures: vec![],
            summary,
        }
    }

    #[test]
    fn test_gauge_bands() {
        assert_eq!(GaugeBand::for_score(0), GaugeBand::Critical);
        assert_eq!(GaugeBand::for_score(32), GaugeBand::Critical);
        assert_eq!(GaugeBand::for_score(33), GaugeBand::Warning);
        assert_eq!(GaugeBand::for_score(65), GaugeBand::Warning);
        assert_eq!(GaugeBand::for_score(66), GaugeBand::Healthy);
        assert_eq!(GaugeView::new(82).threshold, 50);
    }

    #[test]
    fn test_analysis_view_numbers_recommendations() {
        let result = AnalysisResult {
            health_score: 82,
            churn_risk: ChurnRisk::Low,
            analysis: "Stable.".to_string(),
            recommendations: vec!["A".into(), "B".into(), "C".into()],
        };
        let view = AnalysisView::new(&record(), result);
        assert_eq!(view.gauge.value, 82);
        assert_eq!(view.risk_badge.label, "🟢 BAJO");
        let numbered: Vec<(usize, &str)> = view
            .recommendations
            .iter()
            .map(|r| (r.number, r.text.as_str()))
            .collect();
        assert_eq!(numbered, vec![(1, "A"), (2, "B"), (3, "C")]);
    }

    #[test]
    fn test_customer_view_metrics() {
        let view = CustomerView::new(&record());
        let revenue = view
            .metrics
            .iter()
            .find(|m| m.label == "Revenue Total")
            .unwrap();
        assert_eq!(revenue.value, "$125,000");
        let engagement = view
            .metrics
            .iter()
            .find(|m| m.label == "Email Engagement")
            .unwrap();
        assert_eq!(engagement.value, "🟢 high");
    }

    #[test]
    fn test_chart_sorted_ascending_and_coloured() {
        let dashboard = BatchDashboard::new(report(vec![
            row("A", 90, ChurnRisk::Low),
            row("B", 15, ChurnRisk::High),
            row("C", 55, ChurnRisk::Medium),
        ]));
        let order: Vec<&str> = dashboard.chart.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(order, vec!["B", "C", "A"]);
        assert_eq!(dashboard.chart[0].color, "#FF6B6B");
        // Table keeps analysis order
        assert_eq!(dashboard.table[0].row.name, "A");
        assert_eq!(dashboard.table[0].score_color, "#1a9850");
        assert_eq!(dashboard.table[1].score_color, "#d73027");
    }

    #[test]
    fn test_empty_batch_metrics_report_no_data() {
        let dashboard = BatchDashboard::new(report(vec![]));
        assert_eq!(dashboard.metrics[0].value, "Sin datos");
        assert_eq!(dashboard.metrics[1].delta, None);
        assert!(dashboard.table.is_empty());
        assert!(dashboard.chart.is_empty());
    }

    #[test]
    fn test_gradient_single_value_is_midpoint() {
        assert_eq!(gradient_color(70, 70, 70), "#ffffbf");
    }
}
