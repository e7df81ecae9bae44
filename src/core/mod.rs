pub mod ai_engine;
pub mod cleaning;
pub mod engine;
pub mod pipeline;
pub mod processor;
pub mod recommendations;
pub mod report;
pub mod vector_store;
pub mod workbook;

#[cfg(test)]
pub(crate) mod test_support;

pub use crate::domain::model::{PortfolioInsights, Workbook};
pub use crate::domain::ports::{ConfigProvider, Pipeline, Storage, TextGenerator};
pub use crate::utils::error::Result;
