use crate::core::ai_engine::PortfolioAiEngine;
use crate::core::processor::PortfolioDataProcessor;
use crate::core::report::{
    calculate_portfolio_metrics, export_portfolio_report, format_percentage, generate_alerts,
    validate_data_completeness, AlertThresholds,
};
use crate::core::workbook::{decode_workbook, load_workbook};
use crate::core::{ConfigProvider, Pipeline, PortfolioInsights, Storage, Workbook};
use crate::domain::ports::TextGenerator;
use crate::utils::error::Result;
use std::io::Write;
use std::path::Path;
use tokio::sync::Mutex;
use zip::write::{FileOptions, ZipWriter};

/// Workbook in, report bundle out. The AI step runs only when an engine is attached.
pub struct ReportPipeline<S: Storage, C: ConfigProvider> {
    storage: S,
    config: C,
    thresholds: AlertThresholds,
    ai: Option<Mutex<PortfolioAiEngine<Box<dyn TextGenerator>>>>,
}

impl<S: Storage, C: ConfigProvider> ReportPipeline<S, C> {
    pub fn new(storage: S, config: C, thresholds: AlertThresholds) -> Self {
        Self {
            storage,
            config,
            thresholds,
            ai: None,
        }
    }

    pub fn with_ai(mut self, engine: PortfolioAiEngine<Box<dyn TextGenerator>>) -> Self {
        self.ai = Some(Mutex::new(engine));
        self
    }

    /// Hand the AI engine back (e.g. to persist its snapshot index).
    pub fn into_ai_engine(self) -> Option<PortfolioAiEngine<Box<dyn TextGenerator>>> {
        self.ai.map(Mutex::into_inner)
    }

    fn bundle_path(&self) -> String {
        Path::new(self.config.output_path())
            .join(self.config.bundle_name())
            .display()
            .to_string()
    }
}

#[async_trait::async_trait]
impl<S: Storage, C: ConfigProvider> Pipeline for ReportPipeline<S, C> {
    async fn extract(&self) -> Result<Workbook> {
        let path = self.config.workbook_path();
        tracing::debug!("Reading workbook from: {}", path);

        // 目錄形式的 CSV 工作表無法以單一檔案讀取
        if Path::new(path).is_dir() {
            return load_workbook(path);
        }

        let bytes = self.storage.read_file(path).await?;
        tracing::debug!("Read {} bytes", bytes.len());
        decode_workbook(path, bytes)
    }

    async fn transform(&self, workbook: Workbook) -> Result<PortfolioInsights> {
        let processor = PortfolioDataProcessor::from_workbook(workbook)?;
        let portfolio = processor.into_processed();
        let currency = self.config.currency_symbol();

        let metrics = calculate_portfolio_metrics(&portfolio);
        let alerts = generate_alerts(&portfolio, &self.thresholds, currency);
        let completeness = validate_data_completeness(&portfolio);

        let (analysis, recommendations) = match &self.ai {
            Some(ai) => {
                let mut engine = ai.lock().await;
                let analysis = engine.analyze_portfolio(&portfolio).await?;
                let recommendations = engine.generate_recommendations(&portfolio).await?;
                (Some(analysis), recommendations)
            }
            None => (None, Vec::new()),
        };

        Ok(PortfolioInsights {
            portfolio,
            metrics,
            alerts,
            completeness,
            analysis,
            recommendations,
        })
    }

    async fn load(&self, insights: PortfolioInsights) -> Result<String> {
        let currency = self.config.currency_symbol();
        let report = export_portfolio_report(
            &insights.portfolio,
            chrono::Local::now().naive_local(),
            currency,
        );

        let zip_data = {
            let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));

            zip.start_file::<_, ()>("report.txt", FileOptions::default())?;
            zip.write_all(report.as_bytes())?;

            zip.start_file::<_, ()>("summary.json", FileOptions::default())?;
            zip.write_all(serde_json::to_string_pretty(&insights)?.as_bytes())?;

            zip.start_file::<_, ()>("holdings.csv", FileOptions::default())?;
            zip.write_all(&holdings_csv(&insights)?)?;

            zip.start_file::<_, ()>("sector_allocation.csv", FileOptions::default())?;
            zip.write_all(&sector_csv(&insights)?)?;

            if let Some(analysis) = &insights.analysis {
                zip.start_file::<_, ()>("analysis.md", FileOptions::default())?;
                zip.write_all(analysis_markdown(&insights, &analysis.analysis).as_bytes())?;
            }

            let cursor = zip.finish()?;
            cursor.into_inner()
        };

        let output_path = self.bundle_path();
        tracing::debug!("Writing ZIP file ({} bytes) to storage", zip_data.len());
        self.storage.write_file(&output_path, &zip_data).await?;

        Ok(output_path)
    }
}

fn holdings_csv(insights: &PortfolioInsights) -> Result<Vec<u8>> {
    let mut wtr = csv::Writer::from_writer(Vec::new());
    wtr.write_record([
        "Asset_Name",
        "Ticker_Symbol",
        "Sector",
        "Market_Value",
        "Weight_Percent",
        "Current_Price",
        "Dividend_Yield",
        "ESG_Rating",
    ])?;

    let opt = |v: Option<f64>| v.map(|x| x.to_string()).unwrap_or_default();
    for h in &insights.portfolio.holdings {
        wtr.write_record([
            h.asset_name.clone(),
            h.ticker_symbol.clone(),
            h.sector.clone(),
            opt(h.market_value),
            opt(h.weight_percent),
            opt(h.current_price),
            opt(h.dividend_yield),
            h.esg_rating.clone().unwrap_or_default(),
        ])?;
    }

    wtr.into_inner().map_err(|e| e.into_error().into())
}

fn sector_csv(insights: &PortfolioInsights) -> Result<Vec<u8>> {
    let sectors = &insights.portfolio.sector_allocation;
    let total: f64 = sectors.iter().map(|s| s.market_value).sum();

    let mut wtr = csv::Writer::from_writer(Vec::new());
    wtr.write_record(["Sector", "Market_Value", "Weight"])?;
    for slice in sectors {
        let weight = if total > 0.0 {
            slice.market_value / total
        } else {
            0.0
        };
        wtr.write_record([
            slice.name.clone(),
            slice.market_value.to_string(),
            format!("{:.6}", weight),
        ])?;
    }

    wtr.into_inner().map_err(|e| e.into_error().into())
}

fn analysis_markdown(insights: &PortfolioInsights, analysis: &str) -> String {
    let mut md = format!(
        "# {}: AI Analysis\n\n{}\n",
        insights.portfolio.portfolio_summary.fund_name,
        analysis.trim()
    );

    if !insights.recommendations.is_empty() {
        md.push_str("\n## Recommendations\n\n");
        for (i, rec) in insights.recommendations.iter().enumerate() {
            md.push_str(&format!(
                "{}. **{}** ({} priority)\n   {}\n",
                i + 1,
                rec.title,
                rec.priority,
                rec.description
            ));
        }
    }

    if !insights.alerts.is_empty() {
        md.push_str("\n## Alerts\n\n");
        for alert in &insights.alerts {
            md.push_str(&format!("- **{}**: {}\n", alert.title, alert.message));
        }
    }

    md.push_str(&format!(
        "\n_Top 5 concentration: {}_\n",
        format_percentage(insights.metrics.top_5_concentration, 1)
    ));
    md
}
