pub mod config;
pub mod core;
pub mod domain;
pub mod llm;
pub mod utils;

pub use config::{toml_config::InsightConfig, ExportConfig, LocalStorage};
pub use core::{
    ai_engine::PortfolioAiEngine, engine::InsightEngine, pipeline::ReportPipeline,
    processor::PortfolioDataProcessor, vector_store::PortfolioVectorStore,
};
pub use llm::GeminiClient;
pub use utils::error::{InsightError, Result};
