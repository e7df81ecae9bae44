use crate::domain::model::{PortfolioInsights, Workbook};
use crate::utils::error::Result;
use async_trait::async_trait;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

pub trait ConfigProvider: Send + Sync {
    fn workbook_path(&self) -> &str;
    fn output_path(&self) -> &str;
    fn bundle_name(&self) -> &str;
    fn currency_symbol(&self) -> &str;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self) -> Result<Workbook>;
    async fn transform(&self, workbook: Workbook) -> Result<PortfolioInsights>;
    async fn load(&self, insights: PortfolioInsights) -> Result<String>;
}

/// A hosted generative-text model.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    fn provider(&self) -> &str;

    async fn generate(
        &self,
        prompt: &str,
        system_instruction: &str,
        temperature: f32,
    ) -> Result<String>;
}

#[async_trait]
impl<T: TextGenerator + ?Sized> TextGenerator for Box<T> {
    fn provider(&self) -> &str {
        (**self).provider()
    }

    async fn generate(
        &self,
        prompt: &str,
        system_instruction: &str,
        temperature: f32,
    ) -> Result<String> {
        (**self)
            .generate(prompt, system_instruction, temperature)
            .await
    }
}
