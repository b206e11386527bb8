//! Insight generation pipeline.
//!
//! ```text
//! Extraction → Chunker → Prompt → Model → Parser → Store
//! ```
//!
//! `InsightGenerator` runs the chain once per requested insight type.
//! Failures are isolated per type and recorded as failed insight rows.

pub mod chunker;
pub mod client;
pub mod extraction;
pub mod orchestrator;
pub mod pacing;
pub mod parser;
pub mod prompt;

pub use client::{AnthropicClient, AnthropicConfig, LlmClient, MockLlmClient, ModelInvocationError, ModelOutput};
pub use extraction::{ExtractedDocument, ExtractionService, PdfTextExtractor, PlaceholderExtractor, TextExtractor};
pub use orchestrator::InsightGenerator;
pub use pacing::{CallPacer, FixedDelayPacer};

use thiserror::Error;
use uuid::Uuid;

use crate::db::DatabaseError;

#[derive(Error, Debug)]
pub enum InsightError {
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Model invocation failed: {0}")]
    Model(#[from] ModelInvocationError),

    #[error("Report not found: {0}")]
    ReportNotFound(Uuid),

    #[error("Text extraction failed: {0}")]
    Extraction(String),
}
