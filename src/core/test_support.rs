//! Shared fixtures for unit tests.

use crate::core::processor::PortfolioDataProcessor;
use crate::core::workbook::decode_workbook;
use crate::domain::model::{ProcessedPortfolio, Workbook};
use crate::domain::ports::TextGenerator;
use crate::utils::error::{InsightError, LlmErrorKind, Result};
use std::collections::VecDeque;
use std::io::{Cursor, Write};
use std::sync::Mutex;
use zip::write::{FileOptions, ZipWriter};

pub const SAMPLE_SHEETS: [(&str, &str); 7] = [
    (
        "Portfolio_Overview",
        "Fund_Name,Total_AUM,Base_Currency,Target_Return,Risk_Level,Benchmark,Inception_Date,Last_Updated\n\
         Test Sovereign Fund,5000000000,INR,0.08,Moderate,NIFTY 50,2015-04-01,2024-03-31\n",
    ),
    (
        "Holdings_Detail",
        "Asset_Name,Ticker_Symbol,Sector,Market_Value,Units_Held,Average_Cost,Current_Price,Weight_Percent,Dividend_Yield,Purchase_Date,ESG_Rating,Country\n\
         Reliance Industries,RELIANCE,Energy,1500000000,500000,2400,3000,0.30,0.004,2018-06-15,A,India\n\
         HDFC Bank,HDFCBANK,Financials,1200000000,800000,1300,1500,0.24,0.011,2019-01-10,AA,India\n\
         Apple Inc,AAPL,Technology,800000000,40000,15000,20000,0.16,0.005,2020-09-01,AA,United States\n",
    ),
    (
        "Historical_Performance",
        "Date,Portfolio_Value,Daily_Return,Cumulative_Return,Volatility,Sharpe_Ratio,Max_Drawdown,Active_Return\n\
         2024-03-31,5000000000,0.002,0.12,0.15,1.2,-0.08,0.01\n\
         2024-03-29,4990000000,-0.001,0.118,0.15,1.19,-0.08,0.009\n",
    ),
    (
        "Benchmarks",
        "Date,NIFTY_50,MSCI_World\n2024-03-29,22300,3400\n2024-03-31,22326,3410\n",
    ),
    (
        "Risk_Metrics",
        "Date,Portfolio_Beta,VaR_95,CVaR_95,Tracking_Error,Correlation_Benchmark,Concentration_Risk,Liquidity_Score\n\
         2024-03-31,0.95,-45000000,-60000000,0.035,0.92,0.45,8.5\n",
    ),
    (
        "Cash_Flows",
        "Date,Inflows,Outflows,Net_Flow\n2024-03-31,10000000,4000000,6000000\n",
    ),
    (
        "Market_Data",
        "Date,USD_INR,Brent_Crude\n2024-03-31,83.4,87.5\n",
    ),
];

/// The sample workbook as a zip of CSV sheets.
pub fn sample_zip_bytes() -> Vec<u8> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, content) in SAMPLE_SHEETS {
        zip.start_file::<_, ()>(format!("{}.csv", name), FileOptions::default())
            .unwrap();
        zip.write_all(content.as_bytes()).unwrap();
    }
    zip.finish().unwrap().into_inner()
}

pub fn sample_workbook() -> Workbook {
    decode_workbook("sample_fund.zip", sample_zip_bytes()).unwrap()
}

pub fn sample_portfolio() -> ProcessedPortfolio {
    PortfolioDataProcessor::from_workbook(sample_workbook())
        .unwrap()
        .into_processed()
}

/// Replays canned responses in order and records every prompt it receives.
pub struct ScriptedGenerator {
    responses: Mutex<VecDeque<String>>,
    pub prompts: Mutex<Vec<String>>,
}

impl ScriptedGenerator {
    pub fn new(responses: &[&str]) -> Self {
        Self {
            responses: Mutex::new(responses.iter().map(|r| r.to_string()).collect()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompt(&self, index: usize) -> String {
        self.prompts.lock().unwrap()[index].clone()
    }
}

#[async_trait::async_trait]
impl TextGenerator for ScriptedGenerator {
    fn provider(&self) -> &str {
        "scripted"
    }

    async fn generate(
        &self,
        prompt: &str,
        _system_instruction: &str,
        _temperature: f32,
    ) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| {
                InsightError::llm("scripted", LlmErrorKind::EmptyResponse, "no more responses")
            })
    }
}
