use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::ExtractionMethod;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Company {
    pub id: Uuid,
    pub name: String,
    pub ticker: Option<String>,
    pub industry: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// One annual filing. Only `processed` changes after upload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub id: Uuid,
    pub company_id: Uuid,
    pub report_type: String,
    pub fiscal_year: i32,
    pub filing_date: Option<NaiveDate>,
    pub document_location: String,
    pub processed: bool,
    pub created_at: DateTime<Utc>,
}

/// A report joined with the company fields the prompt needs.
#[derive(Debug, Clone)]
pub struct ReportContext {
    pub report: Report,
    pub company_name: String,
    pub industry: String,
}

/// Cached plain-text rendering of a report document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Extraction {
    pub id: Uuid,
    pub report_id: Uuid,
    pub text: String,
    pub page_count: u32,
    pub method: ExtractionMethod,
    pub created_at: DateTime<Utc>,
}
