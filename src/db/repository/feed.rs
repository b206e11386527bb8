use std::str::FromStr;

use chrono::{DateTime, Utc};
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};

use super::{parse_json, parse_uuid};
use crate::db::DatabaseError;
use crate::models::{FeedInsight, FeedPage, InsightType};

/// Interest-derived feed filter. Type interests and industry interests are
/// separate sets; an insight matches when it hits either one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedFilter {
    pub insight_types: Vec<InsightType>,
    pub industries: Vec<String>,
}

impl FeedFilter {
    /// Split raw interest ids: insight type names go to the type set,
    /// everything else is treated as an industry id.
    pub fn from_interests(interests: &[String]) -> Self {
        let mut filter = FeedFilter::default();
        for interest in interests {
            let interest = interest.trim();
            if interest.is_empty() {
                continue;
            }
            match InsightType::from_str(interest) {
                Ok(t) => filter.insight_types.push(t),
                Err(_) => filter.industries.push(normalize_industry(interest)),
            }
        }
        filter
    }

    pub fn is_empty(&self) -> bool {
        self.insight_types.is_empty() && self.industries.is_empty()
    }
}

/// "Financial Services" and "financial_services" name the same industry.
fn normalize_industry(s: &str) -> String {
    s.to_lowercase().replace(' ', "_")
}

fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

fn where_clause(filter: &FeedFilter, args: &mut Vec<Value>) -> String {
    let mut clause = String::from("i.processing_status = 'completed'");
    if filter.is_empty() {
        return clause;
    }

    let mut branches = Vec::new();
    if !filter.insight_types.is_empty() {
        branches.push(format!("i.insight_type IN ({})", placeholders(filter.insight_types.len())));
        args.extend(filter.insight_types.iter().map(|t| Value::Text(t.as_str().into())));
    }
    if !filter.industries.is_empty() {
        branches.push(format!(
            "REPLACE(LOWER(COALESCE(c.industry, '')), ' ', '_') IN ({})",
            placeholders(filter.industries.len())
        ));
        args.extend(filter.industries.iter().cloned().map(Value::Text));
    }
    clause.push_str(&format!(" AND ({})", branches.join(" OR ")));
    clause
}

struct FeedRow {
    id: String,
    insight_type: String,
    title: String,
    summary: String,
    content: String,
    key_metrics: String,
    confidence_score: f64,
    created_at: DateTime<Utc>,
    report_id: String,
    report_type: String,
    fiscal_year: i32,
    company_name: String,
    company_ticker: Option<String>,
    industry: Option<String>,
}

/// One page of completed insights, newest first.
pub fn list_feed(
    conn: &Connection,
    filter: &FeedFilter,
    limit: u32,
    offset: u32,
) -> Result<FeedPage, DatabaseError> {
    let from = "FROM ai_insights i
         JOIN annual_reports r ON r.id = i.report_id
         JOIN companies c ON c.id = r.company_id";

    let mut args = Vec::new();
    let clause = where_clause(filter, &mut args);

    let total: u64 = conn.query_row(
        &format!("SELECT COUNT(*) {from} WHERE {clause}"),
        params_from_iter(args.iter()),
        |row| row.get(0),
    )?;

    let mut page_args = args.clone();
    page_args.push(Value::Integer(i64::from(limit)));
    page_args.push(Value::Integer(i64::from(offset)));

    let mut stmt = conn.prepare(&format!(
        "SELECT i.id, i.insight_type, i.title, i.summary, i.content, i.key_metrics,
                i.confidence_score, i.created_at, r.id, r.report_type, r.fiscal_year,
                c.name, c.ticker, c.industry
         {from} WHERE {clause}
         ORDER BY i.created_at DESC, i.rowid DESC
         LIMIT ? OFFSET ?"
    ))?;
    let rows = stmt
        .query_map(params_from_iter(page_args.iter()), |row| {
            Ok(FeedRow {
                id: row.get(0)?,
                insight_type: row.get(1)?,
                title: row.get(2)?,
                summary: row.get(3)?,
                content: row.get(4)?,
                key_metrics: row.get(5)?,
                confidence_score: row.get(6)?,
                created_at: row.get(7)?,
                report_id: row.get(8)?,
                report_type: row.get(9)?,
                fiscal_year: row.get(10)?,
                company_name: row.get(11)?,
                company_ticker: row.get(12)?,
                industry: row.get(13)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let insights = rows
        .into_iter()
        .map(|row| {
            Ok(FeedInsight {
                id: parse_uuid("ai_insights.id", &row.id)?,
                insight_type: InsightType::parse_lenient(&row.insight_type),
                title: row.title,
                summary: row.summary,
                content: row.content,
                key_metrics: parse_json("ai_insights.key_metrics", &row.key_metrics)?,
                confidence_score: row.confidence_score,
                created_at: row.created_at,
                report_id: parse_uuid("annual_reports.id", &row.report_id)?,
                report_type: row.report_type,
                fiscal_year: row.fiscal_year,
                company_name: row.company_name,
                company_ticker: row.company_ticker,
                industry: row.industry,
            })
        })
        .collect::<Result<Vec<_>, DatabaseError>>()?;

    let has_more = u64::from(offset) + (insights.len() as u64) < total;
    Ok(FeedPage {
        insights,
        total,
        has_more,
        offset,
        limit,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::fixtures::{seed_company, seed_report};
    use crate::db::repository::{complete_insight, create_pending_insight, mark_insight_processing};
    use crate::db::sqlite::open_memory_database;
    use crate::models::{GeneratedInsight, Report};

    fn completed(conn: &Connection, report: &Report, insight_type: InsightType) {
        let insight = create_pending_insight(conn, &report.id, insight_type).unwrap();
        mark_insight_processing(conn, &insight.id).unwrap();
        let generated = GeneratedInsight {
            title: format!("{insight_type} title"),
            content: "body".into(),
            summary: "short".into(),
            key_metrics: serde_json::Map::new(),
            confidence_score: 0.8,
        };
        complete_insight(conn, &insight.id, &generated, "m", 10, 1).unwrap();
    }

    #[test]
    fn interests_split_into_types_and_industries() {
        let filter = FeedFilter::from_interests(&[
            "risk_assessment".into(),
            "Financial Services".into(),
            " ".into(),
        ]);
        assert_eq!(filter.insight_types, vec![InsightType::RiskAssessment]);
        assert_eq!(filter.industries, vec!["financial_services".to_string()]);
    }

    #[test]
    fn feed_only_lists_completed_insights() {
        let conn = open_memory_database().unwrap();
        let company = seed_company(&conn, "Acme", Some("Technology"));
        let report = seed_report(&conn, &company, 2023);
        completed(&conn, &report, InsightType::FinancialAnalysis);
        create_pending_insight(&conn, &report.id, InsightType::RiskAssessment).unwrap();

        let page = list_feed(&conn, &FeedFilter::default(), 20, 0).unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.insights[0].company_name, "Acme");
        assert_eq!(page.insights[0].fiscal_year, 2023);
        assert!(!page.has_more);
    }

    #[test]
    fn pagination_reports_has_more() {
        let conn = open_memory_database().unwrap();
        let company = seed_company(&conn, "Acme", None);
        let report = seed_report(&conn, &company, 2023);
        for t in [InsightType::FinancialAnalysis, InsightType::RiskAssessment, InsightType::EsgAnalysis] {
            completed(&conn, &report, t);
        }

        let first = list_feed(&conn, &FeedFilter::default(), 2, 0).unwrap();
        assert_eq!(first.insights.len(), 2);
        assert_eq!(first.total, 3);
        assert!(first.has_more);
        // newest first
        assert_eq!(first.insights[0].insight_type, InsightType::EsgAnalysis);

        let second = list_feed(&conn, &FeedFilter::default(), 2, 2).unwrap();
        assert_eq!(second.insights.len(), 1);
        assert!(!second.has_more);
    }

    #[test]
    fn type_and_industry_interests_combine_with_or() {
        let conn = open_memory_database().unwrap();
        let tech = seed_company(&conn, "Chipco", Some("Technology"));
        let bank = seed_company(&conn, "Bankco", Some("Financial Services"));
        let oil = seed_company(&conn, "Oilco", Some("Energy"));
        let tech_report = seed_report(&conn, &tech, 2023);
        let bank_report = seed_report(&conn, &bank, 2023);
        let oil_report = seed_report(&conn, &oil, 2023);

        completed(&conn, &tech_report, InsightType::MarketAnalysis);
        completed(&conn, &bank_report, InsightType::BusinessInsights);
        completed(&conn, &oil_report, InsightType::EsgAnalysis);
        completed(&conn, &oil_report, InsightType::BusinessInsights);

        let filter = FeedFilter::from_interests(&["esg_analysis".into(), "financial_services".into()]);
        let page = list_feed(&conn, &filter, 20, 0).unwrap();

        let mut names: Vec<(String, InsightType)> = page
            .insights
            .iter()
            .map(|i| (i.company_name.clone(), i.insight_type))
            .collect();
        names.sort_by(|a, b| a.0.cmp(&b.0));
        assert_eq!(
            names,
            vec![
                ("Bankco".to_string(), InsightType::BusinessInsights),
                ("Oilco".to_string(), InsightType::EsgAnalysis),
            ]
        );
        assert_eq!(page.total, 2);
    }
}
