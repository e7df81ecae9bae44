use crate::domain::model::{
    Cell, FundOverview, Holding, PortfolioTables, Sheet, TimeSeries, TimeSeriesPoint, Workbook,
    HOLDINGS_DETAIL, PORTFOLIO_OVERVIEW, TIME_SERIES_SHEETS,
};
use crate::utils::error::{InsightError, Result};
use chrono::{NaiveDate, NaiveDateTime};
use std::collections::BTreeMap;

const DATE_COLUMN: &str = "Date";

const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
];

// Slash dates are month-first; day-first only matches when the first field exceeds 12.
const DATE_FORMATS: [&str; 5] = ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d/%m/%Y", "%d-%b-%Y"];

/// Parse the date forms found in exported spreadsheets and CSV files.
pub fn parse_datetime_text(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, format) {
            return Some(dt);
        }
    }

    for format in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(text, format) {
            return d.and_hms_opt(0, 0, 0);
        }
    }

    // RFC 3339 with offset (e.g. 2024-03-31T00:00:00Z)
    chrono::DateTime::parse_from_rfc3339(text)
        .ok()
        .map(|dt| dt.naive_utc())
}

/// Numeric coercion; anything that is not a number becomes `None`.
pub fn coerce_number(cell: &Cell) -> Option<f64> {
    match cell {
        Cell::Number(n) if n.is_finite() => Some(*n),
        Cell::Text(s) => parse_number_text(s),
        Cell::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}

fn parse_number_text(text: &str) -> Option<f64> {
    let mut s = text.trim();
    if s.is_empty() {
        return None;
    }

    let percent = s.ends_with('%');
    if percent {
        s = s[..s.len() - 1].trim_end();
    }

    let cleaned: String = s
        .trim_start_matches(['₹', '$', '€', '£'])
        .chars()
        .filter(|c| *c != ',' && *c != '_' && !c.is_whitespace())
        .collect();

    let value: f64 = cleaned.parse().ok()?;
    if !value.is_finite() {
        return None;
    }
    Some(if percent { value / 100.0 } else { value })
}

pub fn coerce_date(cell: &Cell) -> Option<NaiveDateTime> {
    match cell {
        Cell::Date(d) => Some(*d),
        Cell::Text(s) => parse_datetime_text(s),
        Cell::Number(n) => crate::core::workbook::excel_serial_to_datetime(*n),
        _ => None,
    }
}

/// Column accessor bound to one sheet, producing typed values or cell-level errors.
struct Columns<'a> {
    sheet: &'a Sheet,
}

impl<'a> Columns<'a> {
    fn new(sheet: &'a Sheet) -> Self {
        Self { sheet }
    }

    fn require(&self, column: &str) -> Result<usize> {
        self.sheet
            .column_index(column)
            .ok_or_else(|| InsightError::MissingColumn {
                sheet: self.sheet.name.clone(),
                column: column.to_string(),
            })
    }

    fn text(&self, row: usize, column: &str) -> Result<String> {
        let idx = self.require(column)?;
        Ok(self.sheet.cell(row, idx).to_text())
    }

    fn optional_text(&self, row: usize, column: &str) -> Option<String> {
        let idx = self.sheet.column_index(column)?;
        let value = self.sheet.cell(row, idx).to_text();
        (!value.is_empty()).then_some(value)
    }

    fn number(&self, row: usize, column: &str) -> Result<Option<f64>> {
        let idx = self.require(column)?;
        Ok(coerce_number(self.sheet.cell(row, idx)))
    }

    fn date(&self, row: usize, column: &str) -> Result<NaiveDateTime> {
        self.optional_date(row, column)?
            .ok_or_else(|| self.invalid_cell(row, column))
    }

    /// Blank cells are `None`; non-blank text that is not a date is still an error.
    fn optional_date(&self, row: usize, column: &str) -> Result<Option<NaiveDateTime>> {
        let idx = self.require(column)?;
        let cell = self.sheet.cell(row, idx);
        if cell.is_empty() {
            return Ok(None);
        }
        coerce_date(cell)
            .map(Some)
            .ok_or_else(|| self.invalid_cell(row, column))
    }

    fn invalid_cell(&self, row: usize, column: &str) -> InsightError {
        let value = self
            .sheet
            .column_index(column)
            .map(|idx| self.sheet.cell(row, idx).to_text())
            .unwrap_or_default();
        InsightError::InvalidCell {
            sheet: self.sheet.name.clone(),
            // header is row 1 in the source file
            row: row + 2,
            column: column.to_string(),
            value,
        }
    }
}

fn sheet<'a>(workbook: &'a Workbook, name: &str) -> Result<&'a Sheet> {
    workbook.sheet(name).ok_or_else(|| InsightError::MissingSheet {
        sheet: name.to_string(),
    })
}

pub fn clean_overview(sheet: &Sheet) -> Result<Vec<FundOverview>> {
    let cols = Columns::new(sheet);
    let mut rows = Vec::with_capacity(sheet.len());

    for row in 0..sheet.len() {
        rows.push(FundOverview {
            fund_name: cols.text(row, "Fund_Name")?,
            total_aum: cols.number(row, "Total_AUM")?,
            base_currency: cols.text(row, "Base_Currency")?,
            target_return: cols.number(row, "Target_Return")?,
            risk_level: cols.text(row, "Risk_Level")?,
            benchmark: cols.text(row, "Benchmark")?,
            inception_date: cols.date(row, "Inception_Date")?,
            last_updated: cols.optional_date(row, "Last_Updated")?,
        });
    }

    Ok(rows)
}

pub fn clean_holdings(sheet: &Sheet) -> Result<Vec<Holding>> {
    let cols = Columns::new(sheet);
    let mut holdings = Vec::with_capacity(sheet.len());

    for row in 0..sheet.len() {
        holdings.push(Holding {
            asset_name: cols.text(row, "Asset_Name")?,
            ticker_symbol: cols.text(row, "Ticker_Symbol")?,
            sector: cols.text(row, "Sector")?,
            market_value: cols.number(row, "Market_Value")?,
            units_held: cols.number(row, "Units_Held")?,
            average_cost: cols.number(row, "Average_Cost")?,
            current_price: cols.number(row, "Current_Price")?,
            weight_percent: cols.number(row, "Weight_Percent")?,
            dividend_yield: cols.number(row, "Dividend_Yield")?,
            purchase_date: cols.optional_date(row, "Purchase_Date")?,
            esg_rating: cols.optional_text(row, "ESG_Rating"),
            country: cols
                .optional_text(row, "Country")
                .or_else(|| cols.optional_text(row, "Region")),
        });
    }

    Ok(holdings)
}

/// Date-indexed sheet: rows sorted ascending (stable), numeric columns coerced.
/// Rows with a blank `Date` are skipped.
///
/// A column is kept when at least one of its cells is numeric or it is entirely blank;
/// purely textual columns are dropped.
pub fn clean_time_series(sheet: &Sheet) -> Result<TimeSeries> {
    let cols = Columns::new(sheet);
    let date_idx = cols.require(DATE_COLUMN)?;

    let numeric_columns: Vec<(usize, String)> = sheet
        .headers
        .iter()
        .enumerate()
        .filter(|(idx, header)| *idx != date_idx && !header.is_empty())
        .filter(|(idx, _)| {
            let mut non_empty = (0..sheet.len())
                .map(|row| sheet.cell(row, *idx))
                .filter(|c| !c.is_empty())
                .peekable();
            non_empty.peek().is_none() || non_empty.any(|c| coerce_number(c).is_some())
        })
        .map(|(idx, header)| (idx, header.clone()))
        .collect();

    let dropped = sheet.headers.len().saturating_sub(numeric_columns.len() + 1);
    if dropped > 0 {
        tracing::debug!("{}: dropped {} non-numeric columns", sheet.name, dropped);
    }

    let mut points = Vec::with_capacity(sheet.len());
    let mut undated = 0;
    for row in 0..sheet.len() {
        let Some(date) = cols.optional_date(row, DATE_COLUMN)? else {
            undated += 1;
            continue;
        };
        points.push(TimeSeriesPoint {
            date,
            values: numeric_columns
                .iter()
                .map(|(idx, _)| coerce_number(sheet.cell(row, *idx)))
                .collect(),
        });
    }
    points.sort_by_key(|p| p.date);
    if undated > 0 {
        tracing::warn!("{}: skipped {} rows without a date", sheet.name, undated);
    }

    Ok(TimeSeries {
        name: sheet.name.clone(),
        columns: numeric_columns.into_iter().map(|(_, h)| h).collect(),
        points,
    })
}

/// 清理並標準化所有工作表
pub fn clean_workbook(workbook: &Workbook) -> Result<PortfolioTables> {
    let overview = clean_overview(sheet(workbook, PORTFOLIO_OVERVIEW)?)?;
    let holdings = clean_holdings(sheet(workbook, HOLDINGS_DETAIL)?)?;

    let mut series = BTreeMap::new();
    for name in TIME_SERIES_SHEETS {
        let ts = clean_time_series(sheet(workbook, name)?)?;
        tracing::debug!("{}: {} points, {} columns", name, ts.points.len(), ts.columns.len());
        series.insert(name.to_string(), ts);
    }

    Ok(PortfolioTables {
        overview,
        holdings,
        series,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_sheet(name: &str, headers: &[&str], rows: &[&[&str]]) -> Sheet {
        Sheet::new(
            name,
            headers.iter().map(|h| h.to_string()).collect(),
            rows.iter()
                .map(|r| {
                    r.iter()
                        .map(|v| {
                            if v.is_empty() {
                                Cell::Empty
                            } else {
                                Cell::Text(v.to_string())
                            }
                        })
                        .collect()
                })
                .collect(),
        )
    }

    #[test]
    fn test_parse_datetime_text_formats() {
        for text in [
            "2024-03-31",
            "2024/03/31",
            "31/03/2024",
            "2024-03-31 00:00:00",
            "2024-03-31T00:00:00",
            "2024-03-31T00:00:00Z",
        ] {
            let parsed = parse_datetime_text(text).unwrap();
            assert_eq!(parsed.format("%Y-%m-%d").to_string(), "2024-03-31", "{}", text);
        }
        assert!(parse_datetime_text("yesterday").is_none());
    }

    #[test]
    fn test_coerce_number() {
        assert_eq!(coerce_number(&Cell::Number(2.5)), Some(2.5));
        assert_eq!(coerce_number(&Cell::Text("1,250,000".into())), Some(1_250_000.0));
        assert_eq!(coerce_number(&Cell::Text("₹ 500".into())), Some(500.0));
        assert_eq!(coerce_number(&Cell::Text("12.5%".into())), Some(0.125));
        assert_eq!(coerce_number(&Cell::Text("n/a".into())), None);
        assert_eq!(coerce_number(&Cell::Empty), None);
        assert_eq!(coerce_number(&Cell::Number(f64::NAN)), None);
    }

    #[test]
    fn test_time_series_sorted_and_text_columns_dropped() {
        let sheet = text_sheet(
            "Historical_Performance",
            &["Date", "Portfolio_Value", "Regime", "Notes"],
            &[
                &["2024-03-02", "110", "bull", ""],
                &["2024-03-01", "100", "bear", ""],
                &["2024-03-03", "oops", "bull", ""],
            ],
        );

        let ts = clean_time_series(&sheet).unwrap();
        assert_eq!(ts.columns, vec!["Portfolio_Value", "Notes"]);
        assert_eq!(ts.points[0].values[0], Some(100.0));
        assert_eq!(ts.points[1].values[0], Some(110.0));
        assert_eq!(ts.latest().unwrap().values[0], None);
    }

    #[test]
    fn test_invalid_date_is_an_error() {
        let sheet = text_sheet("Benchmarks", &["Date", "Nifty"], &[&["not-a-date", "1"]]);

        match clean_time_series(&sheet) {
            Err(InsightError::InvalidCell { row, column, .. }) => {
                assert_eq!(row, 2);
                assert_eq!(column, "Date");
            }
            other => panic!("expected InvalidCell, got {:?}", other),
        }
    }

    #[test]
    fn test_slash_dates_are_month_first() {
        let jan_2 = parse_datetime_text("01/02/2024").unwrap();
        assert_eq!(jan_2.format("%Y-%m-%d").to_string(), "2024-01-02");
        // 第一欄大於 12 時才改用日/月
        let mar_31 = parse_datetime_text("31/03/2024").unwrap();
        assert_eq!(mar_31.format("%Y-%m-%d").to_string(), "2024-03-31");
    }

    #[test]
    fn test_month_first_dates_decide_latest_row() {
        let sheet = text_sheet(
            "Historical_Performance",
            &["Date", "Total_Return"],
            &[
                &["01/02/2024", "0.10"],
                &["01/03/2024", "0.20"],
                &["02/01/2024", "0.30"],
            ],
        );

        let ts = clean_time_series(&sheet).unwrap();
        let dates: Vec<String> = ts
            .points
            .iter()
            .map(|p| p.date.format("%Y-%m-%d").to_string())
            .collect();
        assert_eq!(dates, vec!["2024-01-02", "2024-01-03", "2024-02-01"]);
        assert_eq!(ts.latest().unwrap().values[0], Some(0.30));
    }

    #[test]
    fn test_blank_series_date_rows_are_skipped() {
        let sheet = text_sheet(
            "Risk_Metrics",
            &["Date", "Volatility"],
            &[
                &["2024-03-02", "0.12"],
                &["", "0.99"],
                &["2024-03-01", "0.11"],
            ],
        );

        let ts = clean_time_series(&sheet).unwrap();
        assert_eq!(ts.points.len(), 2);
        assert_eq!(ts.latest().unwrap().values[0], Some(0.12));
    }

    #[test]
    fn test_blank_last_updated_is_none() {
        let sheet = text_sheet(
            "Portfolio_Overview",
            &[
                "Fund_Name",
                "Total_AUM",
                "Base_Currency",
                "Target_Return",
                "Risk_Level",
                "Benchmark",
                "Inception_Date",
                "Last_Updated",
            ],
            &[&["Alpha Fund", "1000", "INR", "0.08", "Moderate", "NIFTY 50", "2015-04-01", ""]],
        );

        let overview = clean_overview(&sheet).unwrap();
        assert!(overview[0].last_updated.is_none());
        assert_eq!(
            overview[0].inception_date.format("%Y-%m-%d").to_string(),
            "2015-04-01"
        );
    }

    #[test]
    fn test_holdings_missing_column() {
        let sheet = text_sheet("Holdings_Detail", &["Asset_Name"], &[&["Acme"]]);
        match clean_holdings(&sheet) {
            Err(InsightError::MissingColumn { column, .. }) => assert_eq!(column, "Ticker_Symbol"),
            other => panic!("expected MissingColumn, got {:?}", other),
        }
    }

    #[test]
    fn test_holdings_coerce_and_optional_columns() {
        let sheet = text_sheet(
            "Holdings_Detail",
            &[
                "Asset_Name",
                "Ticker_Symbol",
                "Sector",
                "Market_Value",
                "Units_Held",
                "Average_Cost",
                "Current_Price",
                "Weight_Percent",
                "Dividend_Yield",
                "Purchase_Date",
                "ESG_Rating",
            ],
            &[&[
                "Acme Ltd", "ACME", "Energy", "1000", "10", "90", "100", "0.05", "bad",
                "2020-01-15", "",
            ]],
        );

        let holdings = clean_holdings(&sheet).unwrap();
        assert_eq!(holdings[0].market_value, Some(1000.0));
        assert_eq!(holdings[0].dividend_yield, None);
        assert_eq!(holdings[0].esg_rating, None);
        assert_eq!(holdings[0].country, None);
        assert_eq!(
            holdings[0].purchase_date.map(|d| d.format("%Y-%m-%d").to_string()),
            Some("2020-01-15".to_string())
        );
    }

    fn purchase_date_sheet(purchase_date: &str) -> Sheet {
        text_sheet(
            "Holdings_Detail",
            &[
                "Asset_Name",
                "Ticker_Symbol",
                "Sector",
                "Market_Value",
                "Units_Held",
                "Average_Cost",
                "Current_Price",
                "Weight_Percent",
                "Dividend_Yield",
                "Purchase_Date",
            ],
            &[&[
                "Cash", "CASH", "Cash", "500", "", "", "", "0.02", "", purchase_date,
            ]],
        )
    }

    #[test]
    fn test_blank_purchase_date_is_none() {
        let holdings = clean_holdings(&purchase_date_sheet("")).unwrap();
        assert_eq!(holdings.len(), 1);
        assert!(holdings[0].purchase_date.is_none());
    }

    #[test]
    fn test_unparseable_purchase_date_is_an_error() {
        match clean_holdings(&purchase_date_sheet("someday")) {
            Err(InsightError::InvalidCell { column, value, .. }) => {
                assert_eq!(column, "Purchase_Date");
                assert_eq!(value, "someday");
            }
            other => panic!("expected InvalidCell, got {:?}", other),
        }
    }
}
