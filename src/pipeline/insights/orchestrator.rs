use std::time::Instant;

use rusqlite::Connection;
use uuid::Uuid;

use super::chunker::model_input;
use super::client::LlmClient;
use super::extraction::ExtractionService;
use super::pacing::CallPacer;
use super::parser::parse_response;
use super::prompt::build_prompt;
use super::InsightError;
use crate::db;
use crate::models::{InsightGenerationResult, InsightType, ReportContext};

/// Runs the per-type generation chain for one report.
pub struct InsightGenerator {
    extraction: ExtractionService,
    llm: Box<dyn LlmClient>,
    pacer: Box<dyn CallPacer>,
}

impl InsightGenerator {
    pub fn new(extraction: ExtractionService, llm: Box<dyn LlmClient>, pacer: Box<dyn CallPacer>) -> Self {
        Self {
            extraction,
            llm,
            pacer,
        }
    }

    pub fn extraction(&self) -> &ExtractionService {
        &self.extraction
    }

    pub fn model_name(&self) -> &str {
        self.llm.model_name()
    }

    /// Generate one insight per requested type, in request order.
    ///
    /// Per-type failures (extraction, model, parse storage) come back as
    /// `success: false` results with a failed insight row. `Err` means the
    /// report is missing or the store is unusable.
    pub fn generate_insights_for_report(
        &self,
        conn: &Connection,
        report_id: &Uuid,
        insight_types: &[InsightType],
    ) -> Result<Vec<InsightGenerationResult>, InsightError> {
        let ctx = db::get_report_context(conn, report_id)?
            .ok_or(InsightError::ReportNotFound(*report_id))?;

        tracing::info!(
            report_id = %report_id,
            company = %ctx.company_name,
            types = insight_types.len(),
            "Generating insights"
        );

        let text = match self.extraction.obtain(conn, &ctx.report) {
            Ok(extraction) => model_input(&extraction.text),
            Err(InsightError::Database(e)) => return Err(InsightError::Database(e)),
            Err(e) => {
                tracing::warn!(report_id = %report_id, error = %e, "Extraction failed, failing all requested types");
                return insight_types
                    .iter()
                    .map(|t| self.record_failure(conn, report_id, *t, &e.to_string(), Instant::now()))
                    .collect();
            }
        };

        let mut results = Vec::with_capacity(insight_types.len());
        for (i, insight_type) in insight_types.iter().enumerate() {
            if i > 0 {
                self.pacer.pause();
            }
            results.push(self.generate_single(conn, &ctx, *insight_type, &text)?);
        }

        let failed = results.iter().filter(|r| !r.success).count();
        tracing::info!(
            report_id = %report_id,
            generated = results.len() - failed,
            failed,
            "Insight generation finished"
        );
        Ok(results)
    }

    fn generate_single(
        &self,
        conn: &Connection,
        ctx: &ReportContext,
        insight_type: InsightType,
        text: &str,
    ) -> Result<InsightGenerationResult, InsightError> {
        let start = Instant::now();
        let insight = db::create_pending_insight(conn, &ctx.report.id, insight_type)?;

        match self.run_attempt(conn, ctx, insight_type, text, &insight.id, start) {
            Ok(tokens) => {
                tracing::info!(
                    report_id = %ctx.report.id,
                    insight_type = %insight_type,
                    tokens,
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Insight completed"
                );
                Ok(InsightGenerationResult {
                    insight_type,
                    success: true,
                    insight_id: Some(insight.id),
                    error: None,
                })
            }
            Err(e) => {
                tracing::warn!(
                    report_id = %ctx.report.id,
                    insight_type = %insight_type,
                    error = %e,
                    "Insight generation failed"
                );
                let message = e.to_string();
                db::fail_insight(conn, &insight.id, insight_type, &message, start.elapsed().as_millis() as u64)?;
                Ok(InsightGenerationResult {
                    insight_type,
                    success: false,
                    insight_id: Some(insight.id),
                    error: Some(message),
                })
            }
        }
    }

    /// pending → processing → completed. Returns tokens used.
    fn run_attempt(
        &self,
        conn: &Connection,
        ctx: &ReportContext,
        insight_type: InsightType,
        text: &str,
        insight_id: &Uuid,
        start: Instant,
    ) -> Result<u32, InsightError> {
        db::mark_insight_processing(conn, insight_id)?;

        let prompt = build_prompt(insight_type, text, &ctx.company_name, &ctx.industry, ctx.report.fiscal_year);
        let output = self.llm.generate(&prompt)?;
        let generated = parse_response(&output.text, insight_type);

        db::complete_insight(
            conn,
            insight_id,
            &generated,
            self.llm.model_name(),
            output.total_tokens(),
            start.elapsed().as_millis() as u64,
        )?;
        Ok(output.total_tokens())
    }

    fn record_failure(
        &self,
        conn: &Connection,
        report_id: &Uuid,
        insight_type: InsightType,
        message: &str,
        start: Instant,
    ) -> Result<InsightGenerationResult, InsightError> {
        let insight = db::create_pending_insight(conn, report_id, insight_type)?;
        db::fail_insight(conn, &insight.id, insight_type, message, start.elapsed().as_millis() as u64)?;
        Ok(InsightGenerationResult {
            insight_type,
            success: false,
            insight_id: Some(insight.id),
            error: Some(message.to_string()),
        })
    }
}
