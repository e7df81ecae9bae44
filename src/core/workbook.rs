use crate::core::cleaning::parse_datetime_text;
use crate::domain::model::{Cell, Sheet, Workbook, REQUIRED_SHEETS};
use crate::utils::error::{InsightError, Result};
use calamine::{open_workbook_auto, open_workbook_auto_from_rs, Data, Reader, Sheets};
use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use std::collections::BTreeMap;
use std::io::{Cursor, Read, Seek};
use std::path::Path;

const SPREADSHEET_EXTENSIONS: [&str; 5] = ["xlsx", "xlsm", "xlsb", "xls", "ods"];

/// File extensions accepted as a workbook (directories of CSV sheets aside).
pub const WORKBOOK_EXTENSIONS: [&str; 6] = ["xlsx", "xlsm", "xlsb", "xls", "ods", "zip"];

/// 依路徑載入活頁簿：試算表檔、CSV 壓縮包或 CSV 目錄
pub fn load_workbook<P: AsRef<Path>>(path: P) -> Result<Workbook> {
    let path = path.as_ref();
    let source = path.display().to_string();

    let workbook = if path.is_dir() {
        tracing::debug!("Reading CSV sheets from directory {}", source);
        read_csv_directory(path, &source)?
    } else {
        match extension_of(path).as_deref() {
            Some(ext) if SPREADSHEET_EXTENSIONS.contains(&ext) => {
                tracing::debug!("Opening spreadsheet {}", source);
                read_sheets(open_workbook_auto(path)?, &source)?
            }
            Some("zip") => {
                let bytes = std::fs::read(path)?;
                read_csv_bundle(&bytes, &source)?
            }
            _ => return Err(InsightError::UnsupportedFormat { path: source }),
        }
    };

    ensure_required_sheets(&workbook)?;
    tracing::info!(
        "Successfully loaded {} sheets from {}",
        workbook.sheets.len(),
        workbook.source
    );
    Ok(workbook)
}

/// Decode a workbook already read into memory; `name` only selects the format.
pub fn decode_workbook(name: &str, bytes: Vec<u8>) -> Result<Workbook> {
    let workbook = match extension_of(Path::new(name)).as_deref() {
        Some(ext) if SPREADSHEET_EXTENSIONS.contains(&ext) => {
            read_sheets(open_workbook_auto_from_rs(Cursor::new(bytes))?, name)?
        }
        Some("zip") => read_csv_bundle(&bytes, name)?,
        _ => {
            return Err(InsightError::UnsupportedFormat {
                path: name.to_string(),
            })
        }
    };

    ensure_required_sheets(&workbook)?;
    tracing::info!(
        "Successfully loaded {} sheets from {}",
        workbook.sheets.len(),
        workbook.source
    );
    Ok(workbook)
}

pub fn ensure_required_sheets(workbook: &Workbook) -> Result<()> {
    for sheet in REQUIRED_SHEETS {
        if !workbook.sheets.contains_key(sheet) {
            return Err(InsightError::MissingSheet {
                sheet: sheet.to_string(),
            });
        }
    }
    Ok(())
}

fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

fn read_sheets<RS: Read + Seek>(mut sheets: Sheets<RS>, source: &str) -> Result<Workbook> {
    let mut result = BTreeMap::new();

    for name in sheets.sheet_names() {
        let range = sheets.worksheet_range(&name)?;
        let mut rows = range.rows();

        let headers: Vec<String> = match rows.next() {
            Some(header_row) => header_row
                .iter()
                .map(|d| cell_from_data(d).to_text())
                .collect(),
            None => Vec::new(),
        };

        let data_rows: Vec<Vec<Cell>> = rows
            .map(|row| row.iter().map(cell_from_data).collect::<Vec<_>>())
            .filter(|row: &Vec<Cell>| row.iter().any(|c| !c.is_empty()))
            .collect();

        tracing::debug!("Sheet {}: {} columns, {} rows", name, headers.len(), data_rows.len());
        result.insert(name.clone(), Sheet::new(name, headers, data_rows));
    }

    Ok(Workbook {
        source: source.to_string(),
        sheets: result,
    })
}

pub(crate) fn cell_from_data(data: &Data) -> Cell {
    match data {
        Data::Int(i) => Cell::Number(*i as f64),
        Data::Float(f) => Cell::Number(*f),
        Data::String(s) if s.trim().is_empty() => Cell::Empty,
        Data::String(s) => Cell::Text(s.clone()),
        Data::Bool(b) => Cell::Bool(*b),
        Data::DateTime(dt) => {
            let serial = dt.as_f64();
            excel_serial_to_datetime(serial)
                .map(Cell::Date)
                .unwrap_or(Cell::Number(serial))
        }
        Data::DateTimeIso(s) => parse_datetime_text(s)
            .map(Cell::Date)
            .unwrap_or_else(|| Cell::Text(s.clone())),
        Data::DurationIso(s) => Cell::Text(s.clone()),
        _ => Cell::Empty,
    }
}

/// Excel stores dates as days since 1899-12-30 (the 1900 leap-year bug folded in).
pub fn excel_serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() || serial < 0.0 {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    let millis = (serial * 86_400_000.0).round() as i64;
    epoch.checked_add_signed(TimeDelta::try_milliseconds(millis)?)
}

fn read_csv_bundle(bytes: &[u8], source: &str) -> Result<Workbook> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))?;
    let mut sheets = BTreeMap::new();

    for i in 0..archive.len() {
        let mut file = archive.by_index(i)?;
        if file.is_dir() {
            continue;
        }

        let entry_name = file.name().to_string();
        if entry_name.starts_with("__MACOSX") {
            continue;
        }

        let Some(sheet_name) = csv_sheet_name(Path::new(&entry_name)) else {
            tracing::debug!("Skipping non-CSV entry {}", entry_name);
            continue;
        };

        let mut content = Vec::new();
        file.read_to_end(&mut content)?;
        let sheet = parse_csv_sheet(&sheet_name, content.as_slice())?;
        sheets.insert(sheet_name, sheet);
    }

    Ok(Workbook {
        source: source.to_string(),
        sheets,
    })
}

fn read_csv_directory(dir: &Path, source: &str) -> Result<Workbook> {
    let mut sheets = BTreeMap::new();

    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        if let Some(sheet_name) = csv_sheet_name(&path) {
            let file = std::fs::File::open(&path)?;
            let sheet = parse_csv_sheet(&sheet_name, file)?;
            sheets.insert(sheet_name, sheet);
        }
    }

    Ok(Workbook {
        source: source.to_string(),
        sheets,
    })
}

fn csv_sheet_name(path: &Path) -> Option<String> {
    match extension_of(path).as_deref() {
        Some("csv") => path
            .file_stem()
            .and_then(|s| s.to_str())
            .map(|s| s.to_string()),
        _ => None,
    }
}

fn parse_csv_sheet<R: Read>(name: &str, reader: R) -> Result<Sheet> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers: Vec<String> = rdr
        .headers()?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').to_string())
        .collect();

    let mut rows = Vec::new();
    for record in rdr.records() {
        let record = record?;
        let row: Vec<Cell> = record
            .iter()
            .map(|field| {
                if field.is_empty() {
                    Cell::Empty
                } else {
                    Cell::Text(field.to_string())
                }
            })
            .collect();
        if row.iter().any(|c| !c.is_empty()) {
            rows.push(row);
        }
    }

    Ok(Sheet::new(name, headers, rows))
}
