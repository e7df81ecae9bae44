//! Number formatting, derived metrics, alerts and the plain-text portfolio report.

use crate::domain::model::{
    Alert, AlertLevel, DataCompleteness, DerivedMetrics, ProcessedPortfolio,
};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

pub const DEFAULT_CURRENCY_SYMBOL: &str = "₹";

/// Group the integer part with commas, e.g. `1234567.891` with 2 decimals → `1,234,567.89`.
pub fn format_grouped(value: f64, decimals: usize) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }

    let formatted = format!("{:.*}", decimals, value.abs());
    let (int_part, frac_part) = match formatted.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (formatted.as_str(), None),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    // "-0" after rounding reads as "0"
    let negative = value < 0.0 && formatted.chars().any(|c| c.is_ascii_digit() && c != '0');
    let mut out = String::new();
    if negative {
        out.push('-');
    }
    out.push_str(&grouped);
    if let Some(frac) = frac_part {
        out.push('.');
        out.push_str(frac);
    }
    out
}

/// Scaled currency: T/B/M/K suffixes above a thousand, grouped two decimals below.
pub fn format_currency(amount: f64, symbol: &str) -> String {
    if amount.is_nan() || amount == 0.0 {
        return format!("{}0", symbol);
    }

    let abs_amount = amount.abs();
    if abs_amount >= 1e12 {
        format!("{}{:.2}T", symbol, amount / 1e12)
    } else if abs_amount >= 1e9 {
        format!("{}{:.2}B", symbol, amount / 1e9)
    } else if abs_amount >= 1e6 {
        format!("{}{:.2}M", symbol, amount / 1e6)
    } else if abs_amount >= 1e3 {
        format!("{}{:.2}K", symbol, amount / 1e3)
    } else {
        format!("{}{}", symbol, format_grouped(amount, 2))
    }
}

/// Fraction rendered as a percentage (`0.1234` → `12.34%`).
pub fn format_percentage(value: f64, decimals: usize) -> String {
    if value.is_nan() {
        return "N/A".to_string();
    }
    format!("{:.*}%", decimals, value * 100.0)
}

pub fn format_number(value: f64, decimals: usize) -> String {
    if value.is_nan() {
        return "N/A".to_string();
    }
    format_grouped(value, decimals)
}

/// Herfindahl index of the given market values (sum of squared shares).
pub fn herfindahl(values: impl Iterator<Item = f64> + Clone) -> Option<f64> {
    let total: f64 = values.clone().sum();
    if total > 0.0 {
        Some(values.map(|v| (v / total).powi(2)).sum())
    } else {
        None
    }
}

pub fn calculate_portfolio_metrics(portfolio: &ProcessedPortfolio) -> DerivedMetrics {
    let perf = &portfolio.performance_summary;

    let return_volatility_ratio = if perf.volatility > 0.0 {
        perf.total_return / perf.volatility
    } else {
        0.0
    };

    let recovery_factor = if perf.max_drawdown < 0.0 {
        perf.total_return / perf.max_drawdown.abs()
    } else {
        f64::INFINITY
    };

    let top = &portfolio.top_holdings;
    let top_5_concentration = top.iter().take(5).map(|h| h.weight_percent).sum();
    let top_10_concentration = top.iter().take(10).map(|h| h.weight_percent).sum();

    DerivedMetrics {
        return_volatility_ratio,
        recovery_factor,
        top_5_concentration,
        top_10_concentration,
        sector_herfindahl: herfindahl(portfolio.sector_allocation.iter().map(|s| s.market_value)),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertThresholds {
    /// Total return below this is flagged (fraction, e.g. -0.05).
    pub min_total_return: f64,
    pub min_sharpe_ratio: f64,
    pub max_concentration_risk: f64,
    /// VaR below this amount is flagged (VaR is reported as a negative number).
    pub min_var_95: f64,
    pub min_holdings: usize,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            min_total_return: -0.05,
            min_sharpe_ratio: 0.5,
            max_concentration_risk: 0.4,
            min_var_95: -50_000_000.0,
            min_holdings: 10,
        }
    }
}

pub fn generate_alerts(
    portfolio: &ProcessedPortfolio,
    thresholds: &AlertThresholds,
    currency_symbol: &str,
) -> Vec<Alert> {
    let mut alerts = Vec::new();
    let perf = &portfolio.performance_summary;
    let risk = &portfolio.risk_summary;

    if perf.total_return < thresholds.min_total_return {
        alerts.push(Alert {
            level: AlertLevel::Warning,
            title: "Poor Performance".to_string(),
            message: format!(
                "Portfolio showing negative return of {}",
                format_percentage(perf.total_return, 2)
            ),
        });
    }

    if perf.sharpe_ratio < thresholds.min_sharpe_ratio {
        alerts.push(Alert {
            level: AlertLevel::Warning,
            title: "Low Risk-Adjusted Returns".to_string(),
            message: format!(
                "Sharpe ratio of {:.2} indicates poor risk-adjusted performance",
                perf.sharpe_ratio
            ),
        });
    }

    if risk.concentration_risk > thresholds.max_concentration_risk {
        alerts.push(Alert {
            level: AlertLevel::Error,
            title: "High Concentration Risk".to_string(),
            message: format!(
                "Concentration risk of {} exceeds recommended levels",
                format_percentage(risk.concentration_risk, 1)
            ),
        });
    }

    if risk.var_95 < thresholds.min_var_95 {
        alerts.push(Alert {
            level: AlertLevel::Warning,
            title: "High Value at Risk".to_string(),
            message: format!(
                "VaR (95%) of {} indicates high potential losses",
                format_currency(risk.var_95, currency_symbol)
            ),
        });
    }

    let total_holdings = portfolio.portfolio_summary.total_holdings;
    if total_holdings < thresholds.min_holdings {
        alerts.push(Alert {
            level: AlertLevel::Info,
            title: "Limited Diversification".to_string(),
            message: format!(
                "Only {} holdings may limit diversification benefits",
                total_holdings
            ),
        });
    }

    alerts
}

pub fn validate_data_completeness(portfolio: &ProcessedPortfolio) -> DataCompleteness {
    DataCompleteness {
        portfolio_overview: !portfolio.portfolio_summary.fund_name.is_empty(),
        holdings_data: !portfolio.top_holdings.is_empty(),
        performance_data: portfolio.history_len > 0,
        risk_data: true,
        historical_data: portfolio.history_len > 0,
    }
}

/// One-line headline, e.g. for a status bar or log line.
pub fn performance_summary_line(portfolio: &ProcessedPortfolio, currency_symbol: &str) -> String {
    let p = &portfolio.portfolio_summary;
    let perf = &portfolio.performance_summary;
    let risk = &portfolio.risk_summary;

    let fund_name = if p.fund_name.is_empty() {
        "Unknown Fund"
    } else {
        p.fund_name.as_str()
    };

    [
        format!("Portfolio: {}", fund_name),
        format!("AUM: {}", format_currency(p.total_aum, currency_symbol)),
        format!("Total Return: {}", format_percentage(perf.total_return, 2)),
        format!("Sharpe Ratio: {:.2}", perf.sharpe_ratio),
        format!("Max Drawdown: {}", format_percentage(perf.max_drawdown, 2)),
        format!("Portfolio Beta: {:.2}", risk.portfolio_beta),
        format!("VaR (95%): {}", format_currency(risk.var_95, currency_symbol)),
    ]
    .join(" | ")
}

pub fn export_portfolio_report(
    portfolio: &ProcessedPortfolio,
    generated_at: NaiveDateTime,
    currency_symbol: &str,
) -> String {
    let p = &portfolio.portfolio_summary;
    let perf = &portfolio.performance_summary;
    let risk = &portfolio.risk_summary;
    let divider = "-".repeat(20);
    let mut lines = Vec::new();

    lines.push("SOVEREIGN FUND PORTFOLIO REPORT".to_string());
    lines.push("=".repeat(50));
    lines.push(format!("Generated: {}", generated_at.format("%Y-%m-%d %H:%M:%S")));
    lines.push(String::new());

    lines.push("PORTFOLIO OVERVIEW".to_string());
    lines.push(divider.clone());
    lines.push(format!("Fund Name: {}", p.fund_name));
    lines.push(format!("Total AUM: {}", format_currency(p.total_aum, currency_symbol)));
    lines.push(format!("Base Currency: {}", p.base_currency));
    lines.push(format!("Risk Level: {}", p.risk_level));
    lines.push(format!("Target Return: {}", format_percentage(p.target_return, 2)));
    lines.push(String::new());

    lines.push("PERFORMANCE METRICS".to_string());
    lines.push(divider.clone());
    lines.push(format!("Total Return: {}", format_percentage(perf.total_return, 2)));
    lines.push(format!("Daily Return: {}", format_percentage(perf.daily_return, 2)));
    lines.push(format!("Volatility: {}", format_percentage(perf.volatility, 2)));
    lines.push(format!("Sharpe Ratio: {:.2}", perf.sharpe_ratio));
    lines.push(format!("Max Drawdown: {}", format_percentage(perf.max_drawdown, 2)));
    lines.push(String::new());

    lines.push("RISK METRICS".to_string());
    lines.push(divider.clone());
    lines.push(format!("Portfolio Beta: {:.3}", risk.portfolio_beta));
    lines.push(format!("VaR (95%): {}", format_currency(risk.var_95, currency_symbol)));
    lines.push(format!("Tracking Error: {:.3}", risk.tracking_error));
    lines.push(format!(
        "Concentration Risk: {}",
        format_percentage(risk.concentration_risk, 2)
    ));
    lines.push(String::new());

    if !portfolio.top_holdings.is_empty() {
        lines.push("TOP 10 HOLDINGS".to_string());
        lines.push(divider);
        for (i, h) in portfolio.top_holdings.iter().take(10).enumerate() {
            lines.push(format!(
                "{:2}. {:<30} {:>8} {:>12}",
                i + 1,
                h.asset_name,
                format_percentage(h.weight_percent, 2),
                format_currency(h.market_value, currency_symbol)
            ));
        }
        lines.push(String::new());
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::test_support::sample_portfolio;

    #[test]
    fn test_format_grouped() {
        assert_eq!(format_grouped(1234567.891, 2), "1,234,567.89");
        assert_eq!(format_grouped(999.0, 0), "999");
        assert_eq!(format_grouped(-1500000.0, 0), "-1,500,000");
        assert_eq!(format_grouped(-0.001, 0), "0");
        assert_eq!(format_grouped(0.5, 2), "0.50");
    }

    #[test]
    fn test_format_currency_scaling() {
        assert_eq!(format_currency(0.0, "₹"), "₹0");
        assert_eq!(format_currency(f64::NAN, "₹"), "₹0");
        assert_eq!(format_currency(2.5e12, "₹"), "₹2.50T");
        assert_eq!(format_currency(1.234e9, "$"), "$1.23B");
        assert_eq!(format_currency(-75_000_000.0, "₹"), "₹-75.00M");
        assert_eq!(format_currency(1500.0, "₹"), "₹1.50K");
        assert_eq!(format_currency(999.5, "₹"), "₹999.50");
    }

    #[test]
    fn test_format_percentage_and_number() {
        assert_eq!(format_percentage(0.1234, 2), "12.34%");
        assert_eq!(format_percentage(-0.05, 1), "-5.0%");
        assert_eq!(format_percentage(f64::NAN, 2), "N/A");
        assert_eq!(format_number(12345.678, 1), "12,345.7");
        assert_eq!(format_number(f64::NAN, 1), "N/A");
    }

    #[test]
    fn test_herfindahl() {
        let h = herfindahl([50.0, 50.0].into_iter()).unwrap();
        assert!((h - 0.5).abs() < 1e-12);
        assert!(herfindahl(std::iter::empty::<f64>()).is_none());
    }

    #[test]
    fn test_derived_metrics() {
        let portfolio = sample_portfolio();
        let metrics = calculate_portfolio_metrics(&portfolio);

        assert!((metrics.return_volatility_ratio - 0.8).abs() < 1e-9);
        assert!((metrics.recovery_factor - 1.5).abs() < 1e-9);
        assert!((metrics.top_5_concentration - 0.70).abs() < 1e-9);
        assert_eq!(metrics.top_5_concentration, metrics.top_10_concentration);
        assert!(metrics.sector_herfindahl.unwrap() > 0.0);
    }

    #[test]
    fn test_recovery_factor_without_drawdown() {
        let mut portfolio = sample_portfolio();
        portfolio.performance_summary.max_drawdown = 0.0;
        portfolio.performance_summary.volatility = 0.0;

        let metrics = calculate_portfolio_metrics(&portfolio);
        assert!(metrics.recovery_factor.is_infinite());
        assert_eq!(metrics.return_volatility_ratio, 0.0);
    }

    #[test]
    fn test_alerts_with_default_thresholds() {
        let portfolio = sample_portfolio();
        let alerts = generate_alerts(&portfolio, &AlertThresholds::default(), "₹");

        let titles: Vec<_> = alerts.iter().map(|a| a.title.as_str()).collect();
        assert_eq!(titles, vec!["High Concentration Risk", "Limited Diversification"]);
        assert_eq!(alerts[0].level, AlertLevel::Error);
        assert_eq!(alerts[0].message, "Concentration risk of 45.0% exceeds recommended levels");
        assert_eq!(alerts[1].level, AlertLevel::Info);
    }

    #[test]
    fn test_alerts_follow_thresholds() {
        let mut portfolio = sample_portfolio();
        portfolio.performance_summary.total_return = -0.10;
        portfolio.performance_summary.sharpe_ratio = 0.2;
        portfolio.risk_summary.var_95 = -75_000_000.0;

        let alerts = generate_alerts(&portfolio, &AlertThresholds::default(), "₹");
        let titles: Vec<_> = alerts.iter().map(|a| a.title.as_str()).collect();
        assert!(titles.contains(&"Poor Performance"));
        assert!(titles.contains(&"Low Risk-Adjusted Returns"));
        let var_alert = alerts.iter().find(|a| a.title == "High Value at Risk").unwrap();
        assert!(var_alert.message.contains("₹-75.00M"));

        let relaxed = AlertThresholds {
            min_total_return: -1.0,
            min_sharpe_ratio: 0.0,
            max_concentration_risk: 1.0,
            min_var_95: f64::MIN,
            min_holdings: 0,
        };
        assert!(generate_alerts(&portfolio, &relaxed, "₹").is_empty());
    }

    #[test]
    fn test_completeness() {
        let mut portfolio = sample_portfolio();
        let complete = validate_data_completeness(&portfolio);
        assert!(complete.portfolio_overview && complete.holdings_data && complete.historical_data);

        portfolio.top_holdings.clear();
        portfolio.history_len = 0;
        let partial = validate_data_completeness(&portfolio);
        assert!(!partial.holdings_data);
        assert!(!partial.performance_data);
        assert!(partial.risk_data);
    }

    #[test]
    fn test_export_report_text() {
        let portfolio = sample_portfolio();
        let generated_at = chrono::NaiveDate::from_ymd_opt(2024, 4, 1)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap();

        let report = export_portfolio_report(&portfolio, generated_at, "₹");
        let lines: Vec<_> = report.lines().collect();
        assert_eq!(lines[0], "SOVEREIGN FUND PORTFOLIO REPORT");
        assert_eq!(lines[2], "Generated: 2024-04-01 09:30:00");
        assert!(report.contains("Total AUM: ₹5.00B"));
        assert!(report.contains("Total Return: 12.00%"));
        assert!(report.contains("TOP 10 HOLDINGS"));
        assert!(report.contains(" 1. Reliance Industries"));
    }

    #[test]
    fn test_summary_line_unknown_fund() {
        let mut portfolio = sample_portfolio();
        portfolio.portfolio_summary.fund_name.clear();
        let line = performance_summary_line(&portfolio, "$");
        assert!(line.starts_with("Portfolio: Unknown Fund | AUM: $5.00B"));
    }
}
