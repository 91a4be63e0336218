use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

// ============ Dataset Models ============

/// One customer row of the dataset.
///
/// Column names in the CSV header must match the field names. Extra columns
/// are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerRecord {
    /// Customer (company) name, also the lookup key.
    pub name: String,
    /// Days since the customer last did anything we track.
    pub days_since_last_activity: u32,
    /// Support tickets currently open.
    pub open_tickets: u32,
    /// Support tickets ever opened.
    pub total_tickets: u32,
    /// Lifetime revenue in dollars.
    pub total_revenue: f64,
    /// Sales opportunities won.
    pub opportunities_won: u32,
    /// Sales opportunities lost.
    pub opportunities_lost: u32,
    /// Email engagement label as stored (e.g. "high", "very_low").
    pub email_engagement: String,
}

impl CustomerRecord {
    pub fn engagement_level(&self) -> EngagementLevel {
        EngagementLevel::from_label(&self.email_engagement)
    }
}

/// Email engagement bucket used by the customer metrics panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngagementLevel {
    High,
    Medium,
    Low,
    VeryLow,
    Unknown,
}

impl EngagementLevel {
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "high" => EngagementLevel::High,
            "medium" => EngagementLevel::Medium,
            "low" => EngagementLevel::Low,
            "very_low" => EngagementLevel::VeryLow,
            _ => EngagementLevel::Unknown,
        }
    }

    pub fn indicator(&self) -> &'static str {
        match self {
            EngagementLevel::High => "🟢",
            EngagementLevel::Medium => "🟡",
            EngagementLevel::Low => "🟠",
            EngagementLevel::VeryLow => "🔴",
            EngagementLevel::Unknown => "⚪",
        }
    }
}

// ============ Analysis Models ============

/// Churn risk level assigned by the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChurnRisk {
    Low,
    Medium,
    High,
}

impl ChurnRisk {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChurnRisk::Low => "low",
            ChurnRisk::Medium => "medium",
            ChurnRisk::High => "high",
        }
    }
}

impl fmt::Display for ChurnRisk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for ChurnRisk {
    type Err = String;

    /// Accepts the three literals, ignoring case and surrounding whitespace.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(ChurnRisk::Low),
            "medium" => Ok(ChurnRisk::Medium),
            "high" => Ok(ChurnRisk::High),
            other => Err(format!("unknown churn_risk '{}'", other)),
        }
    }
}

/// Number of recommendations every analysis must carry.
pub const RECOMMENDATION_COUNT: usize = 3;

/// Validated analysis of one customer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// 0-100, 100 being perfect health.
    pub health_score: u8,
    pub churn_risk: ChurnRisk,
    /// Two or three sentences on the customer's current state.
    pub analysis: String,
    /// Exactly [`RECOMMENDATION_COUNT`] actions, in the model's order.
    pub recommendations: Vec<String>,
}

// ============ Batch Models ============

/// One successfully analyzed customer in a batch run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchRow {
    /// 1-based position of the customer in the batch.
    pub position: usize,
    pub name: String,
    pub health_score: u8,
    pub churn_risk: ChurnRisk,
    pub revenue: f64,
    pub days_since_last_activity: u32,
    pub open_tickets: u32,
}

/// A customer skipped because its analysis failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchFailure {
    pub position: usize,
    pub name: String,
    pub error: String,
}

/// Aggregate metrics over the successful rows of a batch.
///
/// Ratios are `None` when no row succeeded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub requested: usize,
    pub analyzed: usize,
    pub failed: usize,
    pub mean_health_score: Option<f64>,
    pub high_risk_count: usize,
    /// Share of analyzed rows with high churn risk, 0-100.
    pub high_risk_pct: Option<f64>,
    pub total_revenue: f64,
    /// Revenue of high-risk rows only.
    pub revenue_at_risk: f64,
}

/// Complete outcome of one batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub rows: Vec<BatchRow>,
    pub failures: Vec<BatchFailure>,
    pub summary: BatchSummary,
}

// ============ Request Models ============

#[derive(Debug, Clone, Deserialize)]
pub struct BatchRequest {
    /// How many customers to analyze, taken from the start of the dataset.
    pub count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_churn_risk_parsing() {
        assert_eq!("low".parse::<ChurnRisk>(), Ok(ChurnRisk::Low));
        assert_eq!(" High ".parse::<ChurnRisk>(), Ok(ChurnRisk::High));
        assert_eq!("MEDIUM".parse::<ChurnRisk>(), Ok(ChurnRisk::Medium));
        assert!("critical".parse::<ChurnRisk>().is_err());
        assert!("".parse::<ChurnRisk>().is_err());
    }

    #[test]
    fn test_churn_risk_serializes_lowercase() {
        let json = serde_json::to_string(&ChurnRisk::Medium).unwrap();
        assert_eq!(json, "\"medium\"");
    }

    #[test]
    fn test_engagement_levels() {
        assert_eq!(
            EngagementLevel::from_label("very_low"),
            EngagementLevel::VeryLow
        );
        assert_eq!(
            EngagementLevel::from_label("High"),
            EngagementLevel::High
        );
        assert_eq!(
            EngagementLevel::from_label("n/a"),
            EngagementLevel::Unknown
        );
        assert_eq!(EngagementLevel::VeryLow.indicator(), "🔴");
        assert_eq!(EngagementLevel::Unknown.indicator(), "⚪");
    }
}
