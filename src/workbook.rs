use crate::calendar::{BUCKETS, safe_sheet_name};
use crate::config;
use calamine::{Data, Reader, Xlsx, open_workbook};
use chrono::NaiveDate;
use regex::Regex;
use rust_xlsxwriter::{Color, Format, FormatPattern, Workbook, Worksheet, XlsxError};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::{debug, warn};

pub const GRID_SHEET: &str = "Grid";

pub const POSITIVE_COLOR: u32 = 0x22C55E;
pub const NEGATIVE_COLOR: u32 = 0xF87171;
pub const NEUTRAL_COLOR: u32 = 0x94A3B8;
const HIGHLIGHT_COLOR: u32 = 0x2563EB;

static FILE_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^Sheet__(\d{2})_(\d{2})_(\d{4})\.xlsx$").expect("valid workbook name regex")
});
static NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[-+]?\d+(?:\.\d+)?").expect("valid number regex"));
static PCT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(([+-]?\d+(?:\.\d+)?)%").expect("valid pct regex"));

#[derive(Debug, thiserror::Error)]
pub enum WorkbookError {
    #[error("failed to read workbook {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: calamine::XlsxError,
    },
    #[error("failed to write workbook {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: XlsxError,
    },
    #[error("workbook file operation failed for {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub enum CellValue {
    Empty,
    Text(String),
    Number(f64),
}

impl CellValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) if n.is_finite() => Some(*n),
            CellValue::Text(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    fn from_option(value: Option<f64>) -> Self {
        match value.filter(|v| v.is_finite()) {
            Some(v) => CellValue::Number(v),
            None => CellValue::Empty,
        }
    }
}

/// A whole sheet as rows of cells, starting at A1.
#[derive(Clone, Debug, PartialEq)]
pub struct SheetData {
    pub name: String,
    pub rows: Vec<Vec<CellValue>>,
}

/// One line of a bucket sheet.
#[derive(Clone, Debug, PartialEq)]
pub struct BucketRecord {
    pub ticker: String,
    pub price: Option<f64>,
    pub pct: Option<f64>,
}

pub fn workbook_file_name(day: NaiveDate) -> String {
    format!("Sheet__{}.xlsx", day.format("%m_%d_%Y"))
}

pub fn workbook_path(dir: &Path, day: NaiveDate) -> PathBuf {
    dir.join(workbook_file_name(day))
}

pub fn parse_workbook_date(file_name: &str) -> Option<NaiveDate> {
    let caps = FILE_NAME_RE.captures(file_name.trim())?;
    let month = caps[1].parse().ok()?;
    let day = caps[2].parse().ok()?;
    let year = caps[3].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Newest `Sheet__MM_DD_YYYY.xlsx` in `dir` dated strictly before `day`.
pub fn latest_workbook_before(dir: &Path, day: NaiveDate) -> Option<PathBuf> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            debug!("Cannot scan {} for workbooks: {}", dir.display(), e);
            return None;
        }
    };

    entries
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| {
            let name = entry.file_name();
            let date = parse_workbook_date(name.to_str()?)?;
            (date < day).then(|| (date, entry.path()))
        })
        .max_by_key(|(date, _)| *date)
        .map(|(_, path)| path)
}

/// Strips arrows and separators, then pulls `(price, pct)` out of a grid cell
/// such as `▲ 187.30  (+1.25%)`.
pub fn parse_price_pct(text: &str) -> (Option<f64>, Option<f64>) {
    let cleaned: String = text
        .chars()
        .filter(|c| !matches!(c, '▲' | '▼' | '•'))
        .map(|c| if c == '\u{a0}' { ' ' } else { c })
        .collect();
    let cleaned = cleaned.trim();

    let pct = PCT_RE
        .captures(cleaned)
        .and_then(|caps| caps[1].parse::<f64>().ok());
    let price_part = cleaned.split('(').next().unwrap_or_default();
    let price = NUMBER_RE
        .find(price_part)
        .and_then(|m| m.as_str().parse::<f64>().ok());
    (price, pct)
}

pub fn pct_color(pct: Option<f64>) -> u32 {
    match pct {
        Some(p) if p > 0.0 => POSITIVE_COLOR,
        Some(p) if p < 0.0 => NEGATIVE_COLOR,
        _ => NEUTRAL_COLOR,
    }
}

/// `3. AXP` -> `AXP`; a bare symbol is accepted as is.
pub fn ticker_from_label(label: &str) -> Option<String> {
    let label = label.trim();
    let ticker = match label.split_once(". ") {
        Some((number, rest)) if number.chars().all(|c| c.is_ascii_digit()) => rest.trim(),
        _ => label,
    };
    (!ticker.is_empty()).then(|| ticker.to_uppercase())
}

/// Grid sheet: header row of bucket labels, one display-text row per ticker.
pub fn grid_sheet(rows: &[(String, Vec<String>)]) -> SheetData {
    let mut out = Vec::with_capacity(rows.len() + 1);
    let mut header = vec![CellValue::Text("Ticker".to_string())];
    header.extend(BUCKETS.iter().map(|b| CellValue::Text(b.label.to_string())));
    out.push(header);

    for (label, cells) in rows {
        let mut row = vec![CellValue::Text(label.clone())];
        row.extend(cells.iter().map(|text| {
            if text.is_empty() {
                CellValue::Empty
            } else {
                CellValue::Text(text.clone())
            }
        }));
        out.push(row);
    }

    SheetData {
        name: GRID_SHEET.to_string(),
        rows: out,
    }
}

/// Bucket sheet: `Ticker | price | pct`, numeric cells blank when absent.
pub fn bucket_sheet(bucket: usize, rows: &[(String, Option<f64>, Option<f64>)]) -> SheetData {
    let mut out = Vec::with_capacity(rows.len() + 1);
    out.push(vec![
        CellValue::Text("Ticker".to_string()),
        CellValue::Text("price".to_string()),
        CellValue::Text("pct".to_string()),
    ]);
    for (label, price, pct) in rows {
        out.push(vec![
            CellValue::Text(label.clone()),
            CellValue::from_option(*price),
            CellValue::from_option(*pct),
        ]);
    }
    SheetData {
        name: BUCKETS[bucket].sheet_name(),
        rows: out,
    }
}

fn cell_value(data: &Data) -> CellValue {
    match data {
        Data::Empty => CellValue::Empty,
        Data::Float(f) => CellValue::Number(*f),
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::String(s) => CellValue::Text(s.clone()),
        other => CellValue::Text(other.to_string()),
    }
}

pub fn read_sheets(path: &Path) -> Result<Vec<SheetData>, WorkbookError> {
    let read_err = |source| WorkbookError::Read {
        path: path.to_path_buf(),
        source,
    };
    let mut workbook: Xlsx<_> = open_workbook(path).map_err(read_err)?;
    let names: Vec<String> = workbook.sheet_names().to_vec();

    let mut sheets = Vec::with_capacity(names.len());
    for name in names {
        let range = workbook.worksheet_range(&name).map_err(read_err)?;
        let (row0, col0) = range
            .start()
            .map(|(r, c)| (r as usize, c as usize))
            .unwrap_or((0, 0));
        let mut rows = vec![vec![CellValue::Empty; col0 + range.width()]; row0 + range.height()];
        for (r, c, data) in range.cells() {
            rows[row0 + r][col0 + c] = cell_value(data);
        }
        sheets.push(SheetData { name, rows });
    }
    Ok(sheets)
}

fn read_sheet(path: &Path, name: &str) -> Result<Option<SheetData>, WorkbookError> {
    Ok(read_sheets(path)?.into_iter().find(|sheet| sheet.name == name))
}

/// Ticker -> price from a bucket sheet. A workbook without that sheet yields
/// an empty map.
pub fn read_bucket_prices(path: &Path, label: &str) -> Result<HashMap<String, f64>, WorkbookError> {
    Ok(read_bucket_rows(path, label)?
        .into_iter()
        .filter_map(|record| record.price.map(|price| (record.ticker, price)))
        .collect())
}

pub fn read_bucket_rows(path: &Path, label: &str) -> Result<Vec<BucketRecord>, WorkbookError> {
    let Some(sheet) = read_sheet(path, &safe_sheet_name(label))? else {
        return Ok(Vec::new());
    };
    Ok(sheet
        .rows
        .iter()
        .skip(1)
        .filter_map(|row| {
            let ticker = ticker_from_label(row.first()?.as_text()?)?;
            Some(BucketRecord {
                ticker,
                price: row.get(1).and_then(CellValue::as_number),
                pct: row.get(2).and_then(CellValue::as_number),
            })
        })
        .collect())
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum SheetKind {
    Grid,
    Bucket,
    Other,
}

fn sheet_kind(name: &str) -> SheetKind {
    if name == GRID_SHEET {
        SheetKind::Grid
    } else if BUCKETS.iter().any(|b| b.sheet_name() == name) {
        SheetKind::Bucket
    } else {
        SheetKind::Other
    }
}

/// What a single cell is formatted as.
#[derive(Clone, Copy, Debug, PartialEq)]
enum CellStyle {
    Plain,
    Header,
    Ticker,
    HighlightedTicker,
    /// Solid background in this RGB color.
    Fill(u32),
}

/// Colors come from the content alone, so a sheet read back from disk gets
/// the same formatting it was written with.
fn cell_style(
    kind: SheetKind,
    row: usize,
    col: usize,
    value: &CellValue,
    row_pct: Option<f64>,
) -> CellStyle {
    match (kind, row, col) {
        (SheetKind::Other, _, _) => CellStyle::Plain,
        (_, 0, _) => CellStyle::Header,
        (_, _, 0) => match value.as_text().and_then(ticker_from_label) {
            Some(ticker) if config::is_highlighted(&ticker) => CellStyle::HighlightedTicker,
            _ => CellStyle::Ticker,
        },
        (SheetKind::Grid, _, _) => {
            let pct = value.as_text().and_then(|text| parse_price_pct(text).1);
            CellStyle::Fill(pct_color(pct))
        }
        (SheetKind::Bucket, _, _) => CellStyle::Fill(pct_color(row_pct)),
    }
}

struct Styles {
    header: Format,
    ticker: Format,
    ticker_highlight: Format,
}

impl Styles {
    fn new() -> Self {
        Self {
            header: Format::new().set_bold(),
            ticker: Format::new().set_bold(),
            ticker_highlight: Format::new()
                .set_bold()
                .set_font_color(Color::RGB(HIGHLIGHT_COLOR)),
        }
    }

    fn format(&self, style: CellStyle) -> Option<Format> {
        match style {
            CellStyle::Plain => None,
            CellStyle::Header => Some(self.header.clone()),
            CellStyle::Ticker => Some(self.ticker.clone()),
            CellStyle::HighlightedTicker => Some(self.ticker_highlight.clone()),
            CellStyle::Fill(rgb) => Some(
                Format::new()
                    .set_pattern(FormatPattern::Solid)
                    .set_background_color(Color::RGB(rgb)),
            ),
        }
    }
}

fn write_cell(
    worksheet: &mut Worksheet,
    row: u32,
    col: u16,
    value: &CellValue,
    format: Option<&Format>,
) -> Result<(), XlsxError> {
    match (value, format) {
        (CellValue::Empty, _) => {}
        (CellValue::Text(s), Some(f)) => {
            worksheet.write_string_with_format(row, col, s, f)?;
        }
        (CellValue::Text(s), None) => {
            worksheet.write_string(row, col, s)?;
        }
        (CellValue::Number(n), Some(f)) => {
            worksheet.write_number_with_format(row, col, *n, f)?;
        }
        (CellValue::Number(n), None) => {
            worksheet.write_number(row, col, *n)?;
        }
    }
    Ok(())
}

fn write_sheet(
    worksheet: &mut Worksheet,
    sheet: &SheetData,
    styles: &Styles,
) -> Result<(), XlsxError> {
    worksheet.set_name(&sheet.name)?;
    let kind = sheet_kind(&sheet.name);

    match kind {
        SheetKind::Grid => {
            worksheet.set_column_width(0, 12)?;
            for col in 1..=BUCKETS.len() as u16 {
                worksheet.set_column_width(col, 24)?;
            }
        }
        SheetKind::Bucket => {
            worksheet.set_column_width(0, 12)?;
        }
        SheetKind::Other => {}
    }

    for (r, row) in sheet.rows.iter().enumerate() {
        let row_pct = match kind {
            SheetKind::Bucket => row.get(2).and_then(CellValue::as_number),
            _ => None,
        };
        for (c, value) in row.iter().enumerate() {
            let format = styles.format(cell_style(kind, r, c, value, row_pct));
            write_cell(worksheet, r as u32, c as u16, value, format.as_ref())?;
        }
    }
    Ok(())
}

/// Overwrites the named sheets of the workbook at `path`, keeping every other
/// sheet. The file is replaced atomically via a temporary sibling.
pub fn write_sheets(path: &Path, replacements: Vec<SheetData>) -> Result<(), WorkbookError> {
    let mut sheets = if path.exists() { read_sheets(path)? } else { Vec::new() };

    for replacement in replacements {
        match sheets.iter_mut().find(|s| s.name == replacement.name) {
            Some(existing) => *existing = replacement,
            None => sheets.push(replacement),
        }
    }

    let write_err = |source| WorkbookError::Write {
        path: path.to_path_buf(),
        source,
    };
    let styles = Styles::new();
    let mut workbook = Workbook::new();
    for sheet in &sheets {
        let worksheet = workbook.add_worksheet();
        write_sheet(worksheet, sheet, &styles).map_err(write_err)?;
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| WorkbookError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    let tmp = path.with_extension("xlsx.tmp");
    workbook.save(&tmp).map_err(write_err)?;
    std::fs::rename(&tmp, path).map_err(|source| {
        let _ = std::fs::remove_file(&tmp);
        WorkbookError::Io {
            path: path.to_path_buf(),
            source,
        }
    })?;
    Ok(())
}

/// Reads the previous session's bucket from the newest earlier workbook,
/// caching each (file, label) pair until cleared.
#[derive(Default)]
pub struct PriorSessionLoader {
    cache: HashMap<(PathBuf, String), HashMap<String, f64>>,
}

impl PriorSessionLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.cache.clear();
    }

    /// Empty when there is no earlier workbook or it cannot be read.
    pub fn load(&mut self, dir: &Path, day: NaiveDate, label: &str) -> HashMap<String, f64> {
        let Some(path) = latest_workbook_before(dir, day) else {
            debug!("No workbook before {} in {}", day, dir.display());
            return HashMap::new();
        };
        self.load_from(&path, label)
    }

    pub fn load_from(&mut self, path: &Path, label: &str) -> HashMap<String, f64> {
        let key = (path.to_path_buf(), label.to_string());
        if let Some(hit) = self.cache.get(&key) {
            return hit.clone();
        }
        match read_bucket_prices(path, label) {
            Ok(prices) => {
                debug!(
                    "Loaded {} '{}' prices from {}",
                    prices.len(),
                    label,
                    path.display()
                );
                self.cache.insert(key, prices.clone());
                prices
            }
            Err(e) => {
                warn!("{}", e);
                HashMap::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::CLOSING_BUCKET;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_workbook_names() {
        assert_eq!(workbook_file_name(day(2024, 7, 1)), "Sheet__07_01_2024.xlsx");
        assert_eq!(parse_workbook_date("sheet__07_01_2024.XLSX"), Some(day(2024, 7, 1)));
        assert_eq!(parse_workbook_date("Sheet__13_01_2024.xlsx"), None);
        assert_eq!(parse_workbook_date("Sheet__07_01_2024.xlsx.tmp"), None);
        assert_eq!(parse_workbook_date("notes.txt"), None);
    }

    #[test]
    fn test_latest_workbook_before() {
        let dir = tempfile::tempdir().unwrap();
        for name in [
            "Sheet__06_27_2024.xlsx",
            "Sheet__06_28_2024.xlsx",
            "Sheet__07_01_2024.xlsx",
            "Sheet__12_31_2023.xlsx",
            "random.xlsx",
        ] {
            std::fs::write(dir.path().join(name), b"").unwrap();
        }
        let found = latest_workbook_before(dir.path(), day(2024, 7, 1)).unwrap();
        assert_eq!(found.file_name().unwrap(), "Sheet__06_28_2024.xlsx");
        assert!(latest_workbook_before(dir.path(), day(2023, 1, 1)).is_none());
        assert!(latest_workbook_before(&dir.path().join("missing"), day(2024, 7, 1)).is_none());
    }

    #[test]
    fn test_parse_price_pct() {
        assert_eq!(parse_price_pct("▲ 187.30  (+1.25%)"), (Some(187.30), Some(1.25)));
        assert_eq!(parse_price_pct("▼\u{a0}42.10 (-0.50%)"), (Some(42.10), Some(-0.50)));
        assert_eq!(parse_price_pct("• 10.00"), (Some(10.0), None));
        assert_eq!(parse_price_pct("--"), (None, None));
        assert_eq!(pct_color(Some(0.1)), POSITIVE_COLOR);
        assert_eq!(pct_color(Some(-0.1)), NEGATIVE_COLOR);
        assert_eq!(pct_color(Some(0.0)), NEUTRAL_COLOR);
        assert_eq!(pct_color(None), NEUTRAL_COLOR);
    }

    #[test]
    fn test_ticker_from_label() {
        assert_eq!(ticker_from_label("3. AXP").as_deref(), Some("AXP"));
        assert_eq!(ticker_from_label(" wba ").as_deref(), Some("WBA"));
        assert_eq!(ticker_from_label(""), None);
    }

    #[test]
    fn test_bucket_sheet_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = workbook_path(dir.path(), day(2024, 6, 28));
        let rows = vec![
            ("1. AAPL".to_string(), Some(210.5), Some(0.25)),
            ("2. AMGN".to_string(), None, None),
            ("31. INTC".to_string(), Some(30.0), Some(-1.5)),
        ];
        write_sheets(&path, vec![bucket_sheet(CLOSING_BUCKET, &rows)]).unwrap();

        let prices = read_bucket_prices(&path, BUCKETS[CLOSING_BUCKET].label).unwrap();
        assert_eq!(prices.len(), 2);
        assert_eq!(prices["AAPL"], 210.5);
        assert_eq!(prices["INTC"], 30.0);

        let records = read_bucket_rows(&path, "4:00 PM").unwrap();
        assert_eq!(records[2].pct, Some(-1.5));
        assert_eq!(records[1].price, None);

        assert!(read_bucket_prices(&path, "9:31 AM").unwrap().is_empty());
    }

    #[test]
    fn test_colors_follow_written_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = workbook_path(dir.path(), day(2024, 7, 1));
        let mut cells = vec![String::new(); BUCKETS.len()];
        cells[0] = "▲ 101.00  (+1.00%)".to_string();
        cells[1] = "▼ 99.00  (-1.98%)".to_string();
        cells[2] = "100.00".to_string();
        let grid = grid_sheet(&[
            ("1. AAPL".to_string(), cells),
            ("32. WBA".to_string(), vec![String::new(); BUCKETS.len()]),
        ]);
        let bucket = bucket_sheet(1, &[("1. AAPL".to_string(), Some(99.0), Some(-1.98))]);
        write_sheets(&path, vec![grid, bucket]).unwrap();

        let sheets = read_sheets(&path).unwrap();
        let grid = sheets.iter().find(|s| s.name == GRID_SHEET).unwrap();
        let style = |r: usize, c: usize| cell_style(SheetKind::Grid, r, c, &grid.rows[r][c], None);
        assert_eq!(style(0, 1), CellStyle::Header);
        assert_eq!(style(1, 0), CellStyle::Ticker);
        assert_eq!(style(2, 0), CellStyle::HighlightedTicker);
        assert_eq!(style(1, 1), CellStyle::Fill(POSITIVE_COLOR));
        assert_eq!(style(1, 2), CellStyle::Fill(NEGATIVE_COLOR));
        assert_eq!(style(1, 3), CellStyle::Fill(NEUTRAL_COLOR));

        let sheet = sheets.iter().find(|s| s.name == BUCKETS[1].sheet_name()).unwrap();
        let row = &sheet.rows[1];
        let pct = row[2].as_number();
        assert_eq!(pct, Some(-1.98));
        for col in 1..=2 {
            assert_eq!(
                cell_style(SheetKind::Bucket, 1, col, &row[col], pct),
                CellStyle::Fill(NEGATIVE_COLOR)
            );
        }

        let styles = Styles::new();
        assert_eq!(
            styles.format(CellStyle::Fill(POSITIVE_COLOR)),
            Some(
                Format::new()
                    .set_pattern(FormatPattern::Solid)
                    .set_background_color(Color::RGB(0x22C55E))
            )
        );
        assert_eq!(
            styles.format(CellStyle::HighlightedTicker),
            Some(Format::new().set_bold().set_font_color(Color::RGB(0x2563EB)))
        );
        assert_eq!(styles.format(CellStyle::Plain), None);
    }

    #[test]
    fn test_write_keeps_other_sheets() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Sheet__07_01_2024.xlsx");
        let first = vec![("1. AAPL".to_string(), Some(1.0), None)];
        write_sheets(&path, vec![bucket_sheet(0, &first)]).unwrap();

        let grid = grid_sheet(&[("1. AAPL".to_string(), vec!["2.00  (+100.00%)".to_string()])]);
        let second = vec![("1. AAPL".to_string(), Some(2.0), Some(100.0))];
        write_sheets(&path, vec![grid, bucket_sheet(1, &second)]).unwrap();

        let sheets = read_sheets(&path).unwrap();
        let names: Vec<&str> = sheets.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["9 31 AM", "Grid", "10 00 AM"]);
        assert_eq!(sheets[1].rows[1][1], CellValue::Text("2.00  (+100.00%)".to_string()));
        assert_eq!(read_bucket_prices(&path, "9:31 AM").unwrap()["AAPL"], 1.0);
        assert!(!dir.path().join("Sheet__07_01_2024.xlsx.tmp").exists());
    }

    #[test]
    fn test_prior_session_loader_caches_until_cleared() {
        let dir = tempfile::tempdir().unwrap();
        let path = workbook_path(dir.path(), day(2024, 6, 28));
        let rows = vec![("1. AAPL".to_string(), Some(200.0), None)];
        write_sheets(&path, vec![bucket_sheet(CLOSING_BUCKET, &rows)]).unwrap();

        let mut loader = PriorSessionLoader::new();
        let loaded = loader.load(dir.path(), day(2024, 7, 1), "4:00 PM");
        assert_eq!(loaded["AAPL"], 200.0);

        std::fs::remove_file(&path).unwrap();
        assert_eq!(loader.load_from(&path, "4:00 PM")["AAPL"], 200.0);

        loader.clear();
        assert!(loader.load(dir.path(), day(2024, 7, 1), "4:00 PM").is_empty());
    }
}
