//! Shared application state for the HTTP layer and the queue worker.
//!
//! `rusqlite::Connection` is not `Sync`, so callers open a short-lived
//! connection per unit of work with [`CoreState::open_db`]. The database file
//! is migrated once in [`CoreState::new`].

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::api::types::{generate_token, hash_token};
use crate::config::{AppConfig, ExtractorKind};
use crate::db;
use crate::pipeline::insights::{
    AnthropicClient, ExtractionService, FixedDelayPacer, InsightGenerator, LlmClient, ModelInvocationError,
    PdfTextExtractor, PlaceholderExtractor, TextExtractor,
};
use crate::pipeline::queue::QueueProcessor;

pub struct CoreState {
    db_path: PathBuf,
    generator: Arc<InsightGenerator>,
    processor: QueueProcessor,
    /// SHA-256 of the processing trigger secret.
    cron_secret_hash: [u8; 32],
}

impl CoreState {
    /// Migrate the database and assemble the pipeline from explicit parts.
    pub fn new(
        db_path: PathBuf,
        generator: InsightGenerator,
        config: &AppConfig,
        cron_secret: &str,
    ) -> Result<Self, CoreError> {
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| CoreError::Io(e.to_string()))?;
            }
        }
        drop(db::open_database(&db_path)?);

        let generator = Arc::new(generator);
        let processor = QueueProcessor::new(generator.clone(), config.queue.clone());
        Ok(Self {
            db_path,
            generator,
            processor,
            cron_secret_hash: hash_token(cron_secret),
        })
    }

    /// Build the production pipeline from configuration.
    ///
    /// Returns the state and the effective cron secret (generated when the
    /// configuration has none). Constructs a blocking HTTP client, so call it
    /// outside the async runtime.
    pub fn from_config(config: &AppConfig) -> Result<(Self, String), CoreError> {
        let extractor: Box<dyn TextExtractor> = match config.generation.extractor {
            ExtractorKind::Pdf => Box::new(PdfTextExtractor),
            ExtractorKind::Placeholder => Box::new(PlaceholderExtractor),
        };
        if config.anthropic.api_key.is_none() {
            tracing::warn!("ANTHROPIC_API_KEY not set; model calls will fail");
        }
        let llm: Box<dyn LlmClient> = Box::new(AnthropicClient::new(config.anthropic.clone())?);
        let generator = InsightGenerator::new(
            ExtractionService::new(extractor),
            llm,
            Box::new(FixedDelayPacer::new(config.generation.call_spacing)),
        );

        let secret = match &config.cron_secret {
            Some(s) => s.clone(),
            None => {
                let generated = generate_token();
                tracing::warn!(secret = %generated, "CRON_SECRET not set; generated one for this run");
                generated
            }
        };

        let state = Self::new(config.db_path.clone(), generator, config, &secret)?;
        Ok((state, secret))
    }

    pub fn open_db(&self) -> Result<rusqlite::Connection, CoreError> {
        Ok(db::connect(&self.db_path)?)
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    pub fn generator(&self) -> &InsightGenerator {
        &self.generator
    }

    pub fn processor(&self) -> &QueueProcessor {
        &self.processor
    }

    pub fn cron_secret_hash(&self) -> &[u8; 32] {
        &self.cron_secret_hash
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Database error: {0}")]
    Database(#[from] db::DatabaseError),
    #[error("Model client error: {0}")]
    ModelClient(#[from] ModelInvocationError),
    #[error("I/O error: {0}")]
    Io(String),
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use crate::pipeline::insights::MockLlmClient;

    #[test]
    fn new_migrates_and_connections_see_schema() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_with(dir.path(), MockLlmClient::new("{}"));
        let conn = state.open_db().unwrap();
        assert_eq!(db::count_tables(&conn).unwrap(), 8);
    }

    #[test]
    fn cron_secret_is_stored_hashed() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_with(dir.path(), MockLlmClient::new("{}"));
        assert_eq!(state.cron_secret_hash(), &hash_token(TEST_SECRET));
    }

    #[test]
    fn missing_parent_directories_are_created() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        let generator = InsightGenerator::new(
            ExtractionService::new(Box::new(PlaceholderExtractor)),
            Box::new(MockLlmClient::new("{}")),
            Box::new(FixedDelayPacer::default()),
        );
        let config = AppConfig::from_lookup(|_| None).unwrap();
        let state = CoreState::new(nested.join("x.db"), generator, &config, "s").unwrap();
        assert!(state.db_path().exists());
    }
}
