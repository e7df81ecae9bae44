use crate::core::cleaning::clean_workbook;
use crate::core::report::{format_grouped, format_percentage};
use crate::core::workbook::load_workbook;
use crate::domain::model::{
    AllocationSlice, Holding, HoldingsData, PerformanceSummary, PortfolioSummary,
    PortfolioTables, ProcessedPortfolio, RiskSummary, Sheet, TimeSeries, TopHolding, Workbook,
    HISTORICAL_PERFORMANCE, PORTFOLIO_OVERVIEW, RISK_METRICS,
};
use crate::utils::error::{InsightError, Result};
use std::collections::HashMap;
use std::path::Path;

pub const TOP_HOLDINGS_LIMIT: usize = 10;

/// Parses a fund workbook and derives the summaries every other component works from.
#[derive(Debug, Clone)]
pub struct PortfolioDataProcessor {
    workbook: Workbook,
    tables: PortfolioTables,
    processed: ProcessedPortfolio,
}

impl PortfolioDataProcessor {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let workbook = load_workbook(path).inspect_err(|e| {
            tracing::error!("Error loading workbook: {}", e);
        })?;
        Self::from_workbook(workbook)
    }

    pub fn from_workbook(workbook: Workbook) -> Result<Self> {
        let tables = clean_workbook(&workbook)?;
        let processed = calculate_metrics(&tables)?;

        tracing::info!(
            "Processed {} with {} holdings across {} sectors",
            processed.portfolio_summary.fund_name,
            processed.portfolio_summary.total_holdings,
            processed.sector_allocation.len()
        );

        Ok(Self {
            workbook,
            tables,
            processed,
        })
    }

    pub fn processed(&self) -> &ProcessedPortfolio {
        &self.processed
    }

    pub fn into_processed(self) -> ProcessedPortfolio {
        self.processed
    }

    pub fn portfolio_summary(&self) -> &PortfolioSummary {
        &self.processed.portfolio_summary
    }

    pub fn holdings_data(&self) -> HoldingsData {
        HoldingsData {
            top_holdings: self.processed.top_holdings.clone(),
            sector_allocation: self.processed.sector_allocation.clone(),
            total_holdings: self.processed.portfolio_summary.total_holdings,
        }
    }

    pub fn performance_data(&self) -> &PerformanceSummary {
        &self.processed.performance_summary
    }

    pub fn risk_data(&self) -> &RiskSummary {
        &self.processed.risk_summary
    }

    pub fn raw_holdings(&self) -> &[Holding] {
        &self.tables.holdings
    }

    pub fn raw_sheet(&self, name: &str) -> Option<&Sheet> {
        self.workbook.sheet(name)
    }

    pub fn sheet_names(&self) -> Vec<&str> {
        self.workbook.sheet_names()
    }

    /// Time series for charting: `Date` plus the requested columns that exist (all when empty).
    pub fn time_series(&self, sheet_name: &str, columns: &[String]) -> Result<TimeSeries> {
        let series = self
            .tables
            .series
            .get(sheet_name)
            .ok_or_else(|| InsightError::UnknownSheet {
                sheet: sheet_name.to_string(),
            })?;
        Ok(series.select(columns))
    }

    /// Structured plain-text summary handed to the language model.
    pub fn prepare_data_for_ai(&self) -> String {
        let p = &self.processed;
        let portfolio = &p.portfolio_summary;
        let perf = &p.performance_summary;
        let risk = &p.risk_summary;
        let mut summary = Vec::new();

        summary.push("=== PORTFOLIO OVERVIEW ===".to_string());
        summary.push(format!("Portfolio: {}", portfolio.fund_name));
        summary.push(format!(
            "AUM: {} {}",
            format_grouped(portfolio.total_aum, 0),
            portfolio.base_currency
        ));
        summary.push(format!(
            "Target Return: {}",
            format_percentage(portfolio.target_return, 1)
        ));
        summary.push(format!("Risk Level: {}", portfolio.risk_level));
        summary.push(format!("Total Holdings: {}", portfolio.total_holdings));
        summary.push(String::new());

        summary.push("=== PERFORMANCE METRICS ===".to_string());
        summary.push(format!("Current Value: {}", format_grouped(perf.current_value, 0)));
        summary.push(format!("Total Return: {}", format_percentage(perf.total_return, 2)));
        summary.push(format!("Volatility: {}", format_percentage(perf.volatility, 2)));
        summary.push(format!("Sharpe Ratio: {:.2}", perf.sharpe_ratio));
        summary.push(String::new());

        summary.push("=== RISK METRICS ===".to_string());
        summary.push(format!("Portfolio Beta: {:.2}", risk.portfolio_beta));
        summary.push(format!("VaR (95%): {}", format_grouped(risk.var_95, 0)));
        summary.push(format!(
            "Tracking Error: {}",
            format_percentage(risk.tracking_error, 2)
        ));
        summary.push(String::new());

        if !p.top_holdings.is_empty() {
            summary.push(format!(
                "=== DETAILED HOLDINGS ({} companies) ===",
                p.top_holdings.len()
            ));
            for (i, h) in p.top_holdings.iter().enumerate() {
                summary.push(format!(
                    "{:2}. {:<35} | Ticker: {:<15} | Sector: {:<20} | Weight: {:>6} | Value: ₹{:>15} | ESG: {:<3}",
                    i + 1,
                    h.asset_name,
                    h.ticker_symbol,
                    h.sector,
                    format_percentage(h.weight_percent, 2),
                    format_grouped(h.market_value, 0),
                    h.esg_rating.as_deref().unwrap_or("N/A")
                ));
            }
            summary.push(String::new());
        }

        if !p.sector_allocation.is_empty() {
            summary.push("=== SECTOR ALLOCATION ===".to_string());
            let total: f64 = p.sector_allocation.iter().map(|s| s.market_value).sum();
            for slice in &p.sector_allocation {
                let weight = if total > 0.0 {
                    slice.market_value / total
                } else {
                    0.0
                };
                summary.push(format!(
                    "- {:<25}: {:>6} (₹{:>15})",
                    slice.name,
                    format_percentage(weight, 1),
                    format_grouped(slice.market_value, 0)
                ));
            }
            summary.push(String::new());
        }

        summary.join("\n")
    }
}

fn calculate_metrics(tables: &PortfolioTables) -> Result<ProcessedPortfolio> {
    let overview = tables
        .overview
        .first()
        .ok_or_else(|| InsightError::EmptySheet {
            sheet: PORTFOLIO_OVERVIEW.to_string(),
        })?;
    let holdings = &tables.holdings;

    let portfolio_summary = PortfolioSummary {
        fund_name: overview.fund_name.clone(),
        total_aum: or_zero(overview.total_aum, "Total_AUM"),
        base_currency: overview.base_currency.clone(),
        target_return: or_zero(overview.target_return, "Target_Return"),
        risk_level: overview.risk_level.clone(),
        benchmark: overview.benchmark.clone(),
        total_holdings: holdings.len(),
        total_market_value: holdings.iter().filter_map(|h| h.market_value).sum(),
        inception_date: overview.inception_date,
    };

    let history = series(tables, HISTORICAL_PERFORMANCE)?;
    let risk = series(tables, RISK_METRICS)?;

    Ok(ProcessedPortfolio {
        portfolio_summary,
        top_holdings: top_holdings(holdings, TOP_HOLDINGS_LIMIT),
        sector_allocation: allocation_by(holdings, |h| Some(h.sector.as_str())),
        geographic_allocation: allocation_by(holdings, |h| h.country.as_deref()),
        performance_summary: performance_summary(history)?,
        risk_summary: risk_summary(risk)?,
        holdings: holdings.clone(),
        history_len: history.points.len(),
    })
}

fn series<'a>(tables: &'a PortfolioTables, name: &str) -> Result<&'a TimeSeries> {
    tables
        .series
        .get(name)
        .ok_or_else(|| InsightError::MissingSheet {
            sheet: name.to_string(),
        })
}

fn or_zero(value: Option<f64>, column: &str) -> f64 {
    value.unwrap_or_else(|| {
        tracing::warn!("{} is missing or not numeric; using 0", column);
        0.0
    })
}

/// Largest holdings by market value. Holdings without a value are skipped; ties keep sheet order.
pub fn top_holdings(holdings: &[Holding], n: usize) -> Vec<TopHolding> {
    let mut valued: Vec<(f64, &Holding)> = holdings
        .iter()
        .filter_map(|h| h.market_value.map(|v| (v, h)))
        .collect();
    valued.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

    valued
        .into_iter()
        .take(n)
        .map(|(value, h)| TopHolding {
            asset_name: h.asset_name.clone(),
            ticker_symbol: h.ticker_symbol.clone(),
            market_value: value,
            weight_percent: h.weight_percent.unwrap_or(0.0),
            sector: h.sector.clone(),
            esg_rating: h.esg_rating.clone(),
        })
        .collect()
}

/// Market value grouped by a key, sorted descending. Blank keys are excluded.
pub fn allocation_by<F>(holdings: &[Holding], key: F) -> Vec<AllocationSlice>
where
    F: Fn(&Holding) -> Option<&str>,
{
    let mut order: Vec<String> = Vec::new();
    let mut totals: HashMap<String, f64> = HashMap::new();

    for holding in holdings {
        let Some(name) = key(holding).map(str::trim).filter(|k| !k.is_empty()) else {
            continue;
        };
        if !totals.contains_key(name) {
            order.push(name.to_string());
        }
        *totals.entry(name.to_string()).or_insert(0.0) += holding.market_value.unwrap_or(0.0);
    }

    let mut slices: Vec<AllocationSlice> = order
        .into_iter()
        .map(|name| {
            let market_value = totals.get(&name).copied().unwrap_or(0.0);
            AllocationSlice { name, market_value }
        })
        .collect();
    slices.sort_by(|a, b| {
        b.market_value
            .partial_cmp(&a.market_value)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    slices
}

/// Reads named columns off the latest row of a date-sorted sheet.
struct LatestRow<'a> {
    series: &'a TimeSeries,
    values: &'a [Option<f64>],
}

impl<'a> LatestRow<'a> {
    fn of(series: &'a TimeSeries) -> Result<Self> {
        let latest = series.latest().ok_or_else(|| InsightError::EmptySheet {
            sheet: series.name.clone(),
        })?;
        Ok(Self {
            series,
            values: &latest.values,
        })
    }

    fn get(&self, column: &str) -> Result<f64> {
        let idx = self
            .series
            .column_index(column)
            .ok_or_else(|| InsightError::MissingColumn {
                sheet: self.series.name.clone(),
                column: column.to_string(),
            })?;
        Ok(or_zero(self.values.get(idx).copied().flatten(), column))
    }
}

fn performance_summary(history: &TimeSeries) -> Result<PerformanceSummary> {
    let row = LatestRow::of(history)?;
    Ok(PerformanceSummary {
        current_value: row.get("Portfolio_Value")?,
        total_return: row.get("Cumulative_Return")?,
        daily_return: row.get("Daily_Return")?,
        volatility: row.get("Volatility")?,
        sharpe_ratio: row.get("Sharpe_Ratio")?,
        max_drawdown: row.get("Max_Drawdown")?,
        active_return: row.get("Active_Return")?,
    })
}

fn risk_summary(risk: &TimeSeries) -> Result<RiskSummary> {
    let row = LatestRow::of(risk)?;
    Ok(RiskSummary {
        portfolio_beta: row.get("Portfolio_Beta")?,
        var_95: row.get("VaR_95")?,
        cvar_95: row.get("CVaR_95")?,
        tracking_error: row.get("Tracking_Error")?,
        correlation_benchmark: row.get("Correlation_Benchmark")?,
        concentration_risk: row.get("Concentration_Risk")?,
        liquidity_score: row.get("Liquidity_Score")?,
    })
}
