use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use super::enums::{InsightType, ProcessingStatus};

/// Persisted insight row.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Insight {
    pub id: Uuid,
    pub report_id: Uuid,
    pub insight_type: InsightType,
    pub title: String,
    pub content: String,
    pub summary: String,
    pub key_metrics: Map<String, Value>,
    pub confidence_score: f64,
    pub processing_status: ProcessingStatus,
    pub model_used: Option<String>,
    pub tokens_used: u32,
    pub processing_time_ms: u64,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Structured fields recovered from one model response.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedInsight {
    pub title: String,
    pub content: String,
    pub summary: String,
    pub key_metrics: Map<String, Value>,
    pub confidence_score: f64,
}

/// Outcome of generating one insight type for one report.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InsightGenerationResult {
    pub insight_type: InsightType,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub insight_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Completed insight joined with report and company display fields.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedInsight {
    pub id: Uuid,
    pub insight_type: InsightType,
    pub title: String,
    pub summary: String,
    pub content: String,
    pub key_metrics: Map<String, Value>,
    pub confidence_score: f64,
    pub created_at: DateTime<Utc>,
    pub report_id: Uuid,
    pub report_type: String,
    pub fiscal_year: i32,
    pub company_name: String,
    pub company_ticker: Option<String>,
    pub industry: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedPage {
    pub insights: Vec<FeedInsight>,
    pub total: u64,
    pub has_more: bool,
    pub offset: u32,
    pub limit: u32,
}
