#![allow(dead_code)]

use anyhow::Result;
use chrono::{Datelike, NaiveDate};
use rust_xlsxwriter::{ExcelDateTime, Format};
use std::io::Write;
use std::path::{Path, PathBuf};
use zip::write::{FileOptions, ZipWriter};

pub const SHEETS: [(&str, &str); 7] = [
    (
        "Portfolio_Overview",
        "Fund_Name,Total_AUM,Base_Currency,Target_Return,Risk_Level,Benchmark,Inception_Date,Last_Updated\n\
         Bharat Strategic Fund,\"12,500,000,000\",INR,8%,Moderate,NIFTY 50,04/01/2015,2024-03-31\n",
    ),
    (
        "Holdings_Detail",
        "Asset_Name,Ticker_Symbol,Sector,Market_Value,Units_Held,Average_Cost,Current_Price,Weight_Percent,Dividend_Yield,Purchase_Date,ESG_Rating,Region\n\
         Infosys,INFY,Technology,3000000000,2000000,1300,1500,0.24,0.025,2017-05-02,AA,India\n\
         State Bank of India,SBIN,Financials,2500000000,3500000,600,714,0.20,0.018,2018-02-14,BBB,India\n\
         Tata Steel,TATASTEEL,Materials,1500000000,10000000,110,150,0.12,0.02,2019-11-20,,India\n\
         Microsoft,MSFT,Technology,1250000000,3000,350000,416666,0.10,0.008,2021-03-08,AAA,United States\n",
    ),
    (
        "Historical_Performance",
        "Date,Portfolio_Value,Daily_Return,Cumulative_Return,Volatility,Sharpe_Ratio,Max_Drawdown,Active_Return,Note\n\
         2024-03-29,12400000000,0.001,0.09,0.14,0.95,-0.11,0.004,quarter end\n\
         2024-03-28,12380000000,-0.002,0.088,0.14,0.94,-0.11,0.003,\n\
         2024-04-01,12500000000,0.003,0.095,0.14,0.4,-0.11,0.005,\n",
    ),
    (
        "Benchmarks",
        "Date,NIFTY_50,SENSEX\n2024-03-28,22100,72900\n2024-03-29,22200,73100\n2024-04-01,22460,73650\n",
    ),
    (
        "Risk_Metrics",
        "Date,Portfolio_Beta,VaR_95,CVaR_95,Tracking_Error,Correlation_Benchmark,Concentration_Risk,Liquidity_Score\n\
         2024-04-01,1.05,-82000000,-110000000,0.042,0.88,0.32,7.5\n",
    ),
    (
        "Cash_Flows",
        "Date,Inflows,Outflows,Net_Flow\n2024-04-01,50000000,20000000,30000000\n",
    ),
    (
        "Market_Data",
        "Date,USD_INR,Gold_Price\n2024-04-01,83.3,2250\n",
    ),
];

/// Writes every sheet as `<name>.csv` into `dir`.
pub fn write_csv_directory(dir: &Path) -> Result<()> {
    for (name, content) in SHEETS {
        std::fs::write(dir.join(format!("{}.csv", name)), content)?;
    }
    Ok(())
}

/// Writes the sheets as a zip bundle and returns its path.
pub fn write_csv_bundle(dir: &Path, file_name: &str) -> Result<PathBuf> {
    let path = dir.join(file_name);
    let mut zip = ZipWriter::new(std::fs::File::create(&path)?);
    for (name, content) in SHEETS {
        zip.start_file::<_, ()>(format!("workbook/{}.csv", name), FileOptions::default())?;
        zip.write_all(content.as_bytes())?;
    }
    zip.finish()?;
    Ok(path)
}

fn fixture_date(text: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(text, "%m/%d/%Y"))
        .ok()
}

/// Writes the sheets into a real `.xlsx`; date columns become date-formatted cells
/// and `blank_row_after` inserts an empty row after that many data rows.
pub fn write_xlsx_workbook(dir: &Path, file_name: &str, blank_row_after: usize) -> Result<PathBuf> {
    let path = dir.join(file_name);
    let mut workbook = rust_xlsxwriter::Workbook::new();
    let date_format = Format::new().set_num_format("yyyy-mm-dd");

    for (name, content) in SHEETS {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(name)?;

        let mut reader = csv::Reader::from_reader(content.as_bytes());
        let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        for (col, header) in headers.iter().enumerate() {
            worksheet.write_string(0, col as u16, header)?;
        }

        let mut row = 1u32;
        for (idx, record) in reader.records().enumerate() {
            if idx == blank_row_after {
                row += 1;
            }
            for (col, value) in record?.iter().enumerate() {
                let col = col as u16;
                let is_date_column = headers[col as usize] == "Date"
                    || headers[col as usize].ends_with("_Date")
                    || headers[col as usize] == "Last_Updated";

                if value.is_empty() {
                    continue;
                } else if let Some(date) = fixture_date(value).filter(|_| is_date_column) {
                    let excel_date = ExcelDateTime::from_ymd(
                        date.year() as u16,
                        date.month() as u8,
                        date.day() as u8,
                    )?;
                    worksheet.write_datetime_with_format(row, col, &excel_date, &date_format)?;
                } else if let Ok(number) = value.parse::<f64>() {
                    worksheet.write_number(row, col, number)?;
                } else {
                    worksheet.write_string(row, col, value)?;
                }
            }
            row += 1;
        }
    }

    workbook.save(&path)?;
    Ok(path)
}
