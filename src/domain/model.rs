use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const PORTFOLIO_OVERVIEW: &str = "Portfolio_Overview";
pub const HOLDINGS_DETAIL: &str = "Holdings_Detail";
pub const HISTORICAL_PERFORMANCE: &str = "Historical_Performance";
pub const BENCHMARKS: &str = "Benchmarks";
pub const RISK_METRICS: &str = "Risk_Metrics";
pub const CASH_FLOWS: &str = "Cash_Flows";
pub const MARKET_DATA: &str = "Market_Data";

pub const REQUIRED_SHEETS: [&str; 7] = [
    PORTFOLIO_OVERVIEW,
    HOLDINGS_DETAIL,
    HISTORICAL_PERFORMANCE,
    BENCHMARKS,
    RISK_METRICS,
    CASH_FLOWS,
    MARKET_DATA,
];

/// Sheets indexed by a `Date` column and sorted chronologically after cleaning.
pub const TIME_SERIES_SHEETS: [&str; 5] = [
    HISTORICAL_PERFORMANCE,
    BENCHMARKS,
    RISK_METRICS,
    CASH_FLOWS,
    MARKET_DATA,
];

/// A raw spreadsheet cell before column coercion.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Number(f64),
    Text(String),
    Bool(bool),
    Date(NaiveDateTime),
}

impl Cell {
    pub fn is_empty(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Text rendering used for string columns and error messages.
    pub fn to_text(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => format!("{}", *n as i64),
            Cell::Number(n) => n.to_string(),
            Cell::Text(s) => s.trim().to_string(),
            Cell::Bool(b) => b.to_string(),
            Cell::Date(d) => d.format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Sheet {
    pub name: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl Sheet {
    pub fn new(name: impl Into<String>, headers: Vec<String>, rows: Vec<Vec<Cell>>) -> Self {
        Self {
            name: name.into(),
            headers,
            rows,
        }
    }

    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == column)
    }

    /// Cell at (row, column); short rows read as empty.
    pub fn cell(&self, row: usize, column: usize) -> &Cell {
        self.rows
            .get(row)
            .and_then(|r| r.get(column))
            .unwrap_or(&Cell::Empty)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct Workbook {
    pub source: String,
    pub sheets: BTreeMap<String, Sheet>,
}

impl Workbook {
    pub fn sheet(&self, name: &str) -> Option<&Sheet> {
        self.sheets.get(name)
    }

    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.keys().map(|s| s.as_str()).collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FundOverview {
    pub fund_name: String,
    pub total_aum: Option<f64>,
    pub base_currency: String,
    pub target_return: Option<f64>,
    pub risk_level: String,
    pub benchmark: String,
    pub inception_date: NaiveDateTime,
    pub last_updated: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Holding {
    pub asset_name: String,
    pub ticker_symbol: String,
    pub sector: String,
    pub market_value: Option<f64>,
    pub units_held: Option<f64>,
    pub average_cost: Option<f64>,
    pub current_price: Option<f64>,
    pub weight_percent: Option<f64>,
    pub dividend_yield: Option<f64>,
    pub purchase_date: Option<NaiveDateTime>,
    pub esg_rating: Option<String>,
    pub country: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeSeriesPoint {
    pub date: NaiveDateTime,
    pub values: Vec<Option<f64>>,
}

/// A cleaned, date-sorted sheet. `columns` excludes `Date` and lines up with `values`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeSeries {
    pub name: String,
    pub columns: Vec<String>,
    pub points: Vec<TimeSeriesPoint>,
}

impl TimeSeries {
    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    pub fn latest(&self) -> Option<&TimeSeriesPoint> {
        self.points.last()
    }

    /// Keep `Date` plus the requested columns that exist, in request order.
    pub fn select(&self, columns: &[String]) -> TimeSeries {
        if columns.is_empty() {
            return self.clone();
        }

        let indices: Vec<usize> = columns
            .iter()
            .filter_map(|c| self.column_index(c))
            .collect();

        TimeSeries {
            name: self.name.clone(),
            columns: indices.iter().map(|&i| self.columns[i].clone()).collect(),
            points: self
                .points
                .iter()
                .map(|p| TimeSeriesPoint {
                    date: p.date,
                    values: indices.iter().map(|&i| p.values.get(i).copied().flatten()).collect(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PortfolioTables {
    pub overview: Vec<FundOverview>,
    pub holdings: Vec<Holding>,
    pub series: BTreeMap<String, TimeSeries>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioSummary {
    pub fund_name: String,
    pub total_aum: f64,
    pub base_currency: String,
    pub target_return: f64,
    pub risk_level: String,
    pub benchmark: String,
    pub total_holdings: usize,
    pub total_market_value: f64,
    pub inception_date: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopHolding {
    pub asset_name: String,
    pub ticker_symbol: String,
    pub market_value: f64,
    pub weight_percent: f64,
    pub sector: String,
    pub esg_rating: Option<String>,
}

/// One bucket of an allocation breakdown (sector or country).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationSlice {
    pub name: String,
    pub market_value: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PerformanceSummary {
    pub current_value: f64,
    pub total_return: f64,
    pub daily_return: f64,
    pub volatility: f64,
    pub sharpe_ratio: f64,
    pub max_drawdown: f64,
    pub active_return: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RiskSummary {
    pub portfolio_beta: f64,
    pub var_95: f64,
    pub cvar_95: f64,
    pub tracking_error: f64,
    pub correlation_benchmark: f64,
    pub concentration_risk: f64,
    pub liquidity_score: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HoldingsData {
    pub top_holdings: Vec<TopHolding>,
    pub sector_allocation: Vec<AllocationSlice>,
    pub total_holdings: usize,
}

/// Everything derived from one workbook; the unit passed to the index, the AI engine and reports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessedPortfolio {
    pub portfolio_summary: PortfolioSummary,
    pub top_holdings: Vec<TopHolding>,
    pub sector_allocation: Vec<AllocationSlice>,
    pub geographic_allocation: Vec<AllocationSlice>,
    pub performance_summary: PerformanceSummary,
    pub risk_summary: RiskSummary,
    pub holdings: Vec<Holding>,
    pub history_len: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Priority::High => "High",
            Priority::Medium => "Medium",
            Priority::Low => "Low",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub rationale: String,
    pub impact: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioAnalysis {
    pub analysis: String,
    pub timestamp: String,
    pub data_summary: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

impl std::fmt::Display for ChatRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChatRole::User => f.write_str("user"),
            ChatRole::Assistant => f.write_str("assistant"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub message: String,
    pub timestamp: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub level: AlertLevel,
    pub title: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DerivedMetrics {
    pub return_volatility_ratio: f64,
    pub recovery_factor: f64,
    pub top_5_concentration: f64,
    pub top_10_concentration: f64,
    pub sector_herfindahl: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataCompleteness {
    pub portfolio_overview: bool,
    pub holdings_data: bool,
    pub performance_data: bool,
    pub risk_data: bool,
    pub historical_data: bool,
}

/// Result of the export pipeline's transform step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioInsights {
    pub portfolio: ProcessedPortfolio,
    pub metrics: DerivedMetrics,
    pub alerts: Vec<Alert>,
    pub completeness: DataCompleteness,
    pub analysis: Option<PortfolioAnalysis>,
    pub recommendations: Vec<Recommendation>,
}
