use crate::core::Pipeline;
use crate::utils::error::Result;
use crate::utils::monitor::SystemMonitor;

/// Runs a pipeline's extract, transform and load phases in order.
pub struct InsightEngine<P: Pipeline> {
    pipeline: P,
    monitor: SystemMonitor,
}

impl<P: Pipeline> InsightEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self::new_with_monitoring(pipeline, false)
    }

    pub fn new_with_monitoring(pipeline: P, monitor_enabled: bool) -> Self {
        Self {
            pipeline,
            monitor: SystemMonitor::new(monitor_enabled),
        }
    }

    pub fn into_pipeline(self) -> P {
        self.pipeline
    }

    pub async fn run(&self) -> Result<String> {
        tracing::info!("Starting export");
        if self.monitor.is_enabled() {
            tracing::debug!("Process monitoring active for this run");
        }
        self.monitor.log_stats("Start");

        tracing::info!("Reading workbook...");
        let workbook = self.pipeline.extract().await?;
        tracing::info!("Read {} sheets", workbook.sheets.len());
        self.monitor.log_stats("Extract");

        tracing::info!("Computing portfolio insights...");
        let insights = self.pipeline.transform(workbook).await?;
        tracing::info!(
            "Computed insights for {} ({} alerts, {} recommendations)",
            insights.portfolio.portfolio_summary.fund_name,
            insights.alerts.len(),
            insights.recommendations.len()
        );
        self.monitor.log_stats("Transform");

        tracing::info!("Writing report bundle...");
        let output_path = self.pipeline.load(insights).await?;
        tracing::info!("Output saved to: {}", output_path);
        self.monitor.log_stats("Load");
        self.monitor.log_final_stats();

        Ok(output_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::report::{calculate_portfolio_metrics, validate_data_completeness};
    use crate::core::test_support::{sample_portfolio, sample_workbook};
    use crate::core::{PortfolioInsights, Workbook};
    use crate::utils::error::InsightError;
    use std::sync::Mutex;

    struct RecordingPipeline {
        phases: Mutex<Vec<&'static str>>,
        fail_load: bool,
    }

    #[async_trait::async_trait]
    impl Pipeline for RecordingPipeline {
        async fn extract(&self) -> Result<Workbook> {
            self.phases.lock().unwrap().push("extract");
            Ok(sample_workbook())
        }

        async fn transform(&self, _workbook: Workbook) -> Result<PortfolioInsights> {
            self.phases.lock().unwrap().push("transform");
            let portfolio = sample_portfolio();
            Ok(PortfolioInsights {
                metrics: calculate_portfolio_metrics(&portfolio),
                completeness: validate_data_completeness(&portfolio),
                portfolio,
                alerts: Vec::new(),
                analysis: None,
                recommendations: Vec::new(),
            })
        }

        async fn load(&self, _insights: PortfolioInsights) -> Result<String> {
            self.phases.lock().unwrap().push("load");
            if self.fail_load {
                return Err(InsightError::IoError(std::io::Error::other("disk full")));
            }
            Ok("out/report.zip".to_string())
        }
    }

    #[tokio::test]
    async fn test_run_executes_phases_in_order() {
        let engine = InsightEngine::new(RecordingPipeline {
            phases: Mutex::new(Vec::new()),
            fail_load: false,
        });

        assert_eq!(engine.run().await.unwrap(), "out/report.zip");
        let pipeline = engine.into_pipeline();
        assert_eq!(
            *pipeline.phases.lock().unwrap(),
            vec!["extract", "transform", "load"]
        );
    }

    #[tokio::test]
    async fn test_run_propagates_load_error() {
        let engine = InsightEngine::new_with_monitoring(
            RecordingPipeline {
                phases: Mutex::new(Vec::new()),
                fail_load: true,
            },
            true,
        );

        assert!(matches!(
            engine.run().await,
            Err(InsightError::IoError(_))
        ));
    }
}
