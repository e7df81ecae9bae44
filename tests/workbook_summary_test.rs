mod common;

use anyhow::Result;
use fund_insight::core::report::{generate_alerts, AlertThresholds};
use fund_insight::core::workbook::load_workbook;
use fund_insight::{InsightError, PortfolioDataProcessor};
use tempfile::TempDir;

#[test]
fn test_csv_directory_summary() -> Result<()> {
    let temp_dir = TempDir::new()?;
    common::write_csv_directory(temp_dir.path())?;

    let processor = PortfolioDataProcessor::load(temp_dir.path())?;
    let p = processor.processed();

    // 數字欄位的千分位與百分比應被轉換
    assert_eq!(p.portfolio_summary.fund_name, "Bharat Strategic Fund");
    assert_eq!(p.portfolio_summary.total_aum, 12_500_000_000.0);
    assert!((p.portfolio_summary.target_return - 0.08).abs() < 1e-12);
    assert_eq!(
        p.portfolio_summary.inception_date.format("%Y-%m-%d").to_string(),
        "2015-04-01"
    );

    // 最新一筆依日期排序而非工作表順序
    assert_eq!(p.performance_summary.total_return, 0.095);
    assert_eq!(p.performance_summary.sharpe_ratio, 0.4);
    assert_eq!(p.history_len, 3);

    let top: Vec<_> = p.top_holdings.iter().map(|h| h.ticker_symbol.as_str()).collect();
    assert_eq!(top, vec!["INFY", "SBIN", "TATASTEEL", "MSFT"]);
    assert_eq!(p.top_holdings[2].esg_rating, None);

    let sectors: Vec<_> = p.sector_allocation.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(sectors, vec!["Technology", "Financials", "Materials"]);
    assert_eq!(p.sector_allocation[0].market_value, 4_250_000_000.0);

    assert_eq!(p.geographic_allocation.len(), 2);
    assert_eq!(p.geographic_allocation[1].name, "United States");

    Ok(())
}

#[test]
fn test_text_columns_dropped_from_series() -> Result<()> {
    let temp_dir = TempDir::new()?;
    common::write_csv_directory(temp_dir.path())?;

    let processor = PortfolioDataProcessor::load(temp_dir.path())?;
    let history = processor.time_series("Historical_Performance", &[])?;
    assert!(!history.columns.iter().any(|c| c == "Note"));

    let dates: Vec<_> = history
        .points
        .iter()
        .map(|p| p.date.format("%m-%d").to_string())
        .collect();
    assert_eq!(dates, vec!["03-28", "03-29", "04-01"]);

    Ok(())
}

#[test]
fn test_zip_bundle_matches_directory() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let bundle = common::write_csv_bundle(temp_dir.path(), "fund.zip")?;

    let processor = PortfolioDataProcessor::load(&bundle)?;
    assert_eq!(processor.processed().portfolio_summary.total_holdings, 4);
    assert_eq!(processor.sheet_names().len(), 7);

    Ok(())
}

#[test]
fn test_alerts_for_fixture() -> Result<()> {
    let temp_dir = TempDir::new()?;
    common::write_csv_directory(temp_dir.path())?;

    let processor = PortfolioDataProcessor::load(temp_dir.path())?;
    let alerts = generate_alerts(processor.processed(), &AlertThresholds::default(), "₹");
    let titles: Vec<_> = alerts.iter().map(|a| a.title.as_str()).collect();

    assert_eq!(
        titles,
        vec![
            "Low Risk-Adjusted Returns",
            "High Value at Risk",
            "Limited Diversification"
        ]
    );
    assert!(alerts[1].message.contains("₹-82.00M"));

    Ok(())
}

#[test]
fn test_missing_sheet_fails() -> Result<()> {
    let temp_dir = TempDir::new()?;
    common::write_csv_directory(temp_dir.path())?;
    std::fs::remove_file(temp_dir.path().join("Risk_Metrics.csv"))?;

    match load_workbook(temp_dir.path()) {
        Err(InsightError::MissingSheet { sheet }) => assert_eq!(sheet, "Risk_Metrics"),
        other => panic!("expected MissingSheet, got {:?}", other.map(|w| w.source)),
    }

    Ok(())
}

#[test]
fn test_missing_column_names_sheet() -> Result<()> {
    let temp_dir = TempDir::new()?;
    common::write_csv_directory(temp_dir.path())?;
    std::fs::write(
        temp_dir.path().join("Risk_Metrics.csv"),
        "Date,Portfolio_Beta\n2024-04-01,1.05\n",
    )?;

    let err = PortfolioDataProcessor::load(temp_dir.path()).unwrap_err();
    match err {
        InsightError::MissingColumn { sheet, column } => {
            assert_eq!(sheet, "Risk_Metrics");
            assert_eq!(column, "VaR_95");
        }
        other => panic!("expected MissingColumn, got {:?}", other),
    }

    Ok(())
}
