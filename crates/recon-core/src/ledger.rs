//! Ledger and override loading.
//!
//! A ledger is either a CSV file (one section, or a `section` column) or a
//! spreadsheet workbook with one worksheet per section. Column names are
//! matched loosely so that typical bookkeeping exports load without mapping.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use calamine::{Data, Reader, open_workbook_auto};
use chrono::{Duration, NaiveDate};
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use crate::error::{ReconError, Result};
use crate::models::{LedgerRow, Override};
use crate::normalize::{normalize_amount, normalize_date};

const ROW_ID_ALIASES: &[&str] = &["row_id", "pozycja_id", "id", "lp", "pozycja"];
const SECTION_ALIASES: &[&str] = &["section", "sekcja", "arkusz"];
const NUMBER_ALIASES: &[&str] = &[
    "numer_dokumentu",
    "numer_faktury",
    "nr_faktury",
    "invoice_number",
    "invoice_id",
    "number",
    "numer",
    "nr",
];
const DATE_ALIASES: &[&str] = &["data_dokumentu", "data_wystawienia", "issue_date", "date", "data"];
const AMOUNT_ALIASES: &[&str] = &[
    "wartosc_netto_dokumentu",
    "wartosc_netto",
    "kwota_netto",
    "net_amount",
    "total_net",
    "netto",
    "net",
];
const ATTACHMENT_ALIASES: &[&str] = &["zalacznik", "attachment", "plik", "filename", "file"];

/// One cell of a ledger table, independent of the file format.
#[derive(Debug, Clone, PartialEq)]
enum Cell {
    Empty,
    Text(String),
    Number(f64),
    Date(NaiveDate),
}

impl Cell {
    fn from_data(data: &Data) -> Self {
        match data {
            Data::Empty | Data::Error(_) => Cell::Empty,
            Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::text(s),
            Data::Float(n) => Cell::Number(*n),
            Data::Int(n) => Cell::Number(*n as f64),
            Data::Bool(b) => Cell::Text(b.to_string()),
            Data::DateTime(dt) => excel_serial_to_date(dt.as_f64()).map_or(Cell::Empty, Cell::Date),
        }
    }

    fn text(s: &str) -> Self {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            Cell::Empty
        } else {
            Cell::Text(trimmed.to_string())
        }
    }

    fn as_text(&self) -> Option<String> {
        match self {
            Cell::Empty => None,
            Cell::Text(s) => Some(s.clone()),
            Cell::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => Some(format!("{}", *n as i64)),
            Cell::Number(n) => Some(n.to_string()),
            Cell::Date(d) => Some(d.to_string()),
        }
    }

    fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Cell::Date(d) => Some(*d),
            Cell::Number(n) if (20_000.0..80_000.0).contains(n) => excel_serial_to_date(*n),
            Cell::Text(s) => normalize_date(s),
            _ => None,
        }
    }

    fn as_amount(&self) -> Option<Decimal> {
        match self {
            Cell::Number(n) => Decimal::try_from(*n).ok().map(|d| d.round_dp(2)),
            Cell::Text(s) => normalize_amount(s),
            _ => None,
        }
    }
}

/// Excel 1900 date system: serial 1 is 1900-01-01, with the phantom 1900-02-29.
fn excel_serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || serial < 1.0 {
        return None;
    }
    let base = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    base.checked_add_signed(Duration::days(serial.floor() as i64))
}

/// Canonical header key: lower-case ASCII, Polish letters folded, separators as `_`.
fn header_key(header: &str) -> String {
    let folded: String = header
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| match c {
            'ą' => 'a',
            'ć' => 'c',
            'ę' => 'e',
            'ł' => 'l',
            'ń' => 'n',
            'ó' => 'o',
            'ś' => 's',
            'ź' | 'ż' => 'z',
            c if c.is_ascii_alphanumeric() => c,
            _ => '_',
        })
        .collect();
    folded
        .split('_')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("_")
}

/// Column positions of the recognized fields.
#[derive(Debug, Default)]
struct ColumnMap {
    row_id: Option<usize>,
    section: Option<usize>,
    number: Option<usize>,
    date: Option<usize>,
    amount: Option<usize>,
    attachment: Option<usize>,
}

impl ColumnMap {
    fn from_headers(headers: &[String]) -> Self {
        let keys: Vec<String> = headers.iter().map(|h| header_key(h)).collect();
        let mut taken: HashSet<usize> = HashSet::new();

        let mut find = |aliases: &[&str], contains: Option<&str>| -> Option<usize> {
            let free = |idx: &usize| !taken.contains(idx);
            let exact = aliases.iter().find_map(|alias| {
                (0..keys.len()).filter(free).find(|&i| keys[i].as_str() == *alias)
            });
            let found = exact.or_else(|| {
                let needle = contains?;
                (0..keys.len()).filter(free).find(|&i| keys[i].contains(needle))
            });
            if let Some(idx) = found {
                taken.insert(idx);
            }
            found
        };

        Self {
            row_id: find(ROW_ID_ALIASES, None),
            section: find(SECTION_ALIASES, None),
            number: find(NUMBER_ALIASES, Some("numer")),
            amount: find(AMOUNT_ALIASES, Some("netto")),
            date: find(DATE_ALIASES, Some("data")),
            attachment: find(ATTACHMENT_ALIASES, Some("zalacznik")),
        }
    }

    fn is_usable(&self) -> bool {
        self.number.is_some() || self.date.is_some() || self.amount.is_some()
    }
}

/// A table of cells with its header row, as read from one sheet or CSV file.
struct Table {
    name: String,
    headers: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

/// Load all ledger rows from a CSV file or a spreadsheet workbook.
///
/// Rows come back in file order (sheet order, then row order).
pub fn load_ledger(path: &Path) -> Result<Vec<LedgerRow>> {
    if !path.is_file() {
        return Err(ReconError::InputNotFound(path.to_path_buf()));
    }

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();

    let tables = match extension.as_str() {
        "csv" | "txt" => vec![read_csv_table(path)?],
        "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => read_workbook_tables(path)?,
        other => {
            return Err(ReconError::Ledger(format!(
                "unsupported ledger format '{}': {}",
                other,
                path.display()
            )));
        }
    };

    let multi_section = tables.len() > 1;
    let mut rows = Vec::new();
    for table in tables {
        let columns = ColumnMap::from_headers(&table.headers);
        if !columns.is_usable() {
            warn!("Skipping sheet '{}': no number, date or amount column", table.name);
            continue;
        }
        debug!("Sheet '{}' columns: {:?}", table.name, columns);
        rows.extend(table_rows(&table, &columns, multi_section));
    }

    if rows.is_empty() {
        return Err(ReconError::Ledger(format!(
            "no ledger rows with a number, date or amount column in {}",
            path.display()
        )));
    }

    let mut seen = HashSet::new();
    for row in &rows {
        if !seen.insert(row.row_id.as_str()) {
            warn!("Duplicate row id '{}' in ledger", row.row_id);
        }
    }

    info!("Loaded {} ledger rows from {}", rows.len(), path.display());
    Ok(rows)
}

fn table_rows(table: &Table, columns: &ColumnMap, multi_section: bool) -> Vec<LedgerRow> {
    let cell = |row: &[Cell], idx: Option<usize>| -> Cell {
        idx.and_then(|i| row.get(i)).cloned().unwrap_or(Cell::Empty)
    };

    let mut rows = Vec::new();
    for (position, raw) in table.rows.iter().enumerate() {
        if raw.iter().all(|c| *c == Cell::Empty) {
            continue;
        }

        let section = cell(raw, columns.section)
            .as_text()
            .unwrap_or_else(|| table.name.clone());
        let row_id = cell(raw, columns.row_id).as_text().unwrap_or_else(|| {
            if multi_section {
                format!("{}/{}", table.name, position + 1)
            } else {
                (position + 1).to_string()
            }
        });

        rows.push(LedgerRow {
            section,
            row_id,
            expected_number: cell(raw, columns.number).as_text(),
            expected_date: cell(raw, columns.date).as_date(),
            expected_amount: cell(raw, columns.amount).as_amount(),
            attachment_hint: cell(raw, columns.attachment).as_text(),
        });
    }
    rows
}

fn read_csv_table(path: &Path) -> Result<Table> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_path(path)?;
    let headers: Vec<String> = reader.headers()?.iter().map(|h| h.trim_start_matches('\u{feff}').to_string()).collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(Cell::text).collect());
    }

    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "ledger".to_string());
    Ok(Table { name, headers, rows })
}

fn read_workbook_tables(path: &Path) -> Result<Vec<Table>> {
    let mut workbook = open_workbook_auto(path)?;
    let sheet_names: Vec<String> = workbook.sheet_names().to_vec();
    if sheet_names.is_empty() {
        return Err(ReconError::Ledger(format!("workbook has no sheets: {}", path.display())));
    }

    let mut tables = Vec::new();
    for sheet_name in sheet_names {
        let range = workbook.worksheet_range(&sheet_name)?;
        let mut rows = range.rows();
        let Some(header_row) = rows.next() else {
            debug!("Sheet '{}' is empty", sheet_name);
            continue;
        };

        let headers = header_row
            .iter()
            .map(|c| Cell::from_data(c).as_text().unwrap_or_default())
            .collect();
        let rows = rows
            .map(|r| r.iter().map(Cell::from_data).collect())
            .collect();

        tables.push(Table {
            name: sheet_name,
            headers,
            rows,
        });
    }
    Ok(tables)
}

/// Load the override CSV (`row_id, path` columns).
pub fn load_overrides(path: &Path) -> Result<Vec<Override>> {
    if !path.is_file() {
        return Err(ReconError::InputNotFound(path.to_path_buf()));
    }

    let mut reader = csv::ReaderBuilder::new().flexible(true).from_path(path)?;
    let keys: Vec<String> = reader.headers()?.iter().map(header_key).collect();
    let id_col = ROW_ID_ALIASES
        .iter()
        .find_map(|alias| keys.iter().position(|k| k.as_str() == *alias));
    let path_col = ["document_path", "path", "file", "plik", "sciezka"]
        .iter()
        .find_map(|alias| keys.iter().position(|k| k.as_str() == *alias));

    let (Some(id_col), Some(path_col)) = (id_col, path_col) else {
        return Err(ReconError::Ledger(format!(
            "override file needs row_id and path columns: {}",
            path.display()
        )));
    };

    let mut overrides = Vec::new();
    for record in reader.records() {
        let record = record?;
        let row_id = record.get(id_col).unwrap_or_default().trim();
        let document = record.get(path_col).unwrap_or_default().trim();
        if row_id.is_empty() || document.is_empty() {
            continue;
        }
        overrides.push(Override {
            row_id: row_id.to_string(),
            document_path: PathBuf::from(document),
        });
    }

    info!("Loaded {} overrides from {}", overrides.len(), path.display());
    Ok(overrides)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::str::FromStr;

    fn write(dir: &tempfile::TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_header_key() {
        assert_eq!(header_key("Wartość netto dokumentu"), "wartosc_netto_dokumentu");
        assert_eq!(header_key(" Załącznik "), "zalacznik");
        assert_eq!(header_key("Data-Dokumentu"), "data_dokumentu");
    }

    #[test]
    fn test_load_csv_ledger_with_aliases() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            &dir,
            "Koszty.csv",
            "Lp,Numer dokumentu,Data dokumentu,Wartość netto dokumentu,Załącznik\n\
             1,FV/12/2024,01.03.2024,\"1 000,00\",12\n\
             ,,,,\n\
             2,FV/13/2024,2024-03-05,250.5,\n",
        );

        let rows = load_ledger(&path).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(
            rows[0],
            LedgerRow::new("Koszty", "1")
                .with_number("FV/12/2024")
                .with_date(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap())
                .with_amount(Decimal::from_str("1000.00").unwrap())
                .with_attachment("12")
        );
        assert_eq!(rows[1].row_id, "2");
        assert_eq!(rows[1].expected_amount, Decimal::from_str("250.5").ok());
        assert_eq!(rows[1].attachment_hint, None);
    }

    #[test]
    fn test_row_id_falls_back_to_position() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "l.csv", "number,date,net\nA/1,2024-01-01,10\nA/2,2024-01-02,20\n");
        let rows = load_ledger(&path).unwrap();
        let ids: Vec<_> = rows.iter().map(|r| r.row_id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2"]);
    }

    #[test]
    fn test_unrecognized_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "l.csv", "foo,bar\n1,2\n");
        assert!(matches!(load_ledger(&path), Err(ReconError::Ledger(_))));
    }

    #[test]
    fn test_missing_ledger() {
        assert!(matches!(
            load_ledger(Path::new("/no/such/ledger.csv")),
            Err(ReconError::InputNotFound(_))
        ));
    }

    #[test]
    fn test_excel_serial_dates() {
        assert_eq!(excel_serial_to_date(45352.0), NaiveDate::from_ymd_opt(2024, 3, 1));
        assert_eq!(excel_serial_to_date(45352.75), NaiveDate::from_ymd_opt(2024, 3, 1));
        assert_eq!(excel_serial_to_date(0.0), None);
    }

    #[test]
    fn test_load_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "o.csv", "row_id,path\n1,docs/a.pdf\n2,\n");
        let overrides = load_overrides(&path).unwrap();
        assert_eq!(
            overrides,
            vec![Override {
                row_id: "1".to_string(),
                document_path: PathBuf::from("docs/a.pdf"),
            }]
        );
    }
}
