//! Cell coercion primitives
//!
//! Every function here is total: malformed input degrades to `None`, `0`,
//! `""` or `"—"` and never panics. Human-maintained reports carry all kinds of
//! encodings for the same quantity and the ingestion layer has to survive them.

use crate::cell::Cell;
use chrono::{Days, NaiveDate};
use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;

/// Placeholder shown for a missing date.
pub const NO_DATE: &str = "—";

/// Default display format for dates (`DD.MM.YYYY`).
pub const DATE_FORMAT: &str = "%d.%m.%Y";

/// Bare numbers at or below this magnitude are read as fractions of one.
pub const FRACTION_THRESHOLD: f64 = 1.5;

// Excel's day zero once the phantom 29.02.1900 is accounted for
const EXCEL_EPOCH: (i32, u32, u32) = (1899, 12, 30);
// 31.12.9999
const MAX_EXCEL_SERIAL: f64 = 2_958_465.0;

lazy_static! {
    static ref NUMBER_PREFIX: Regex =
        Regex::new(r"^[+-]?(\d+(\.\d*)?|\.\d+)([eE][+-]?\d+)?").unwrap();
    static ref DOTTED_DATE: Regex = Regex::new(r"^(\d{1,2})[./](\d{1,2})[./](\d{4})").unwrap();
    static ref ISO_DATE: Regex = Regex::new(r"^(\d{4})-(\d{2})-(\d{2})").unwrap();
}

/// Parses a number out of any cell encoding
///
/// Text may use `,` as the decimal separator and spaces (including no-break
/// spaces) as thousands separators. Like a lenient float parser, trailing
/// garbage after the numeric prefix is ignored (`"12 шт"` is 12).
pub fn to_number(cell: &Cell) -> Option<f64> {
    match cell {
        Cell::Number(n) | Cell::Date(n) => n.is_finite().then_some(*n),
        Cell::Text(s) => parse_number_text(s),
        Cell::Empty | Cell::Bool(_) | Cell::Error(_) => None,
    }
}

/// [`to_number`] for fields that get summed: unknown counts as zero.
pub fn to_number_or_zero(cell: &Cell) -> f64 {
    to_number(cell).unwrap_or(0.0)
}

/// Normalizes a percentage to the 0..100 scale
///
/// Text carrying a literal `%` is taken at face value. Anything else whose
/// magnitude is at most [`FRACTION_THRESHOLD`] is a fraction and gets scaled
/// by 100; zero stays zero. Results are rounded to two decimals.
pub fn to_percentage(cell: &Cell) -> Option<f64> {
    match cell {
        Cell::Text(s) if s.contains('%') => parse_number_text(&s.replace('%', "")).map(round2),
        Cell::Text(_) | Cell::Number(_) => to_number(cell).map(scale_fraction),
        Cell::Empty | Cell::Bool(_) | Cell::Date(_) | Cell::Error(_) => None,
    }
}

/// Applies the fraction heuristic to a bare number.
pub fn scale_fraction(value: f64) -> f64 {
    if value != 0.0 && value.abs() <= FRACTION_THRESHOLD {
        round2(value * 100.0)
    } else {
        round2(value)
    }
}

/// Formats a date cell as `DD.MM.YYYY`, or `"—"` when there is nothing to show.
pub fn to_date_string(cell: &Cell) -> String {
    to_date_string_with(cell, DATE_FORMAT)
}

/// Formats a date cell with a chrono format string
///
/// Serial numbers use the 1900 date system. Text that already looks like a
/// dotted or ISO date is re-rendered; any other text is returned trimmed.
pub fn to_date_string_with(cell: &Cell, format: &str) -> String {
    match cell {
        Cell::Empty => NO_DATE.to_string(),
        Cell::Number(serial) | Cell::Date(serial) => excel_serial_to_date(*serial)
            .map_or_else(|| NO_DATE.to_string(), |d| d.format(format).to_string()),
        Cell::Text(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return NO_DATE.to_string();
            }
            parse_date_text(trimmed)
                .map_or_else(|| trimmed.to_string(), |d| d.format(format).to_string())
        }
        Cell::Bool(_) | Cell::Error(_) => NO_DATE.to_string(),
    }
}

/// Converts an Excel 1900-system serial into a calendar date.
pub fn excel_serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || serial < 1.0 || serial > MAX_EXCEL_SERIAL {
        return None;
    }
    let (y, m, d) = EXCEL_EPOCH;
    NaiveDate::from_ymd_opt(y, m, d)?.checked_add_days(Days::new(serial.floor() as u64))
}

/// Parses `DD.MM.YYYY`, `DD/MM/YYYY` or `YYYY-MM-DD` (anything after the date is ignored).
pub fn parse_date_text(text: &str) -> Option<NaiveDate> {
    if let Some(caps) = DOTTED_DATE.captures(text) {
        let day = caps[1].parse().ok()?;
        let month = caps[2].parse().ok()?;
        let year = caps[3].parse().ok()?;
        return NaiveDate::from_ymd_opt(year, month, day);
    }
    if let Some(caps) = ISO_DATE.captures(text) {
        let year = caps[1].parse().ok()?;
        let month = caps[2].parse().ok()?;
        let day = caps[3].parse().ok()?;
        return NaiveDate::from_ymd_opt(year, month, day);
    }
    None
}

/// Stringifies and trims; blank for empty cells.
pub fn to_trimmed_string(cell: &Cell) -> String {
    match cell {
        Cell::Empty => String::new(),
        Cell::Text(s) => s.trim().to_string(),
        Cell::Number(n) | Cell::Date(n) => format_number(*n),
        Cell::Bool(b) => b.to_string(),
        Cell::Error(e) => e.trim().to_string(),
    }
}

/// [`to_trimmed_string`] that keeps "unknown" distinct from an empty string.
pub fn to_optional_string(cell: &Cell) -> Option<String> {
    let s = to_trimmed_string(cell);
    (!s.is_empty()).then_some(s)
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

// integral values print without a fractional part, like a JS number would
fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

fn parse_number_text(text: &str) -> Option<f64> {
    let compact: String = text
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '\u{a0}' && *c != '\u{202f}')
        .map(|c| if c == ',' { '.' } else { c })
        .collect();
    let prefix = NUMBER_PREFIX.find(&compact)?;
    prefix
        .as_str()
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
}

/// Counters for input that hit a fallback path while parsing one file
///
/// Coercion stays silent; this is the only trace that a workbook was
/// systematically malformed.
#[derive(Clone, Copy, Debug, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostics {
    /// Non-blank cells that could not be coerced to the expected type
    pub coercion_fallbacks: u32,
    /// Rows dropped because their name column was blank or held a totals sentinel
    pub sentinel_rows: u32,
    /// Rows dropped because they were entirely blank
    pub empty_rows: u32,
}

impl Diagnostics {
    pub fn merge(&mut self, other: Diagnostics) {
        self.coercion_fallbacks += other.coercion_fallbacks;
        self.sentinel_rows += other.sentinel_rows;
        self.empty_rows += other.empty_rows;
    }
}

/// Reads typed values out of one data row, counting fallbacks as it goes.
pub struct RowReader<'a> {
    cells: &'a [Cell],
    diag: &'a mut Diagnostics,
}

static EMPTY: Cell = Cell::Empty;

impl<'a> RowReader<'a> {
    pub fn new(cells: &'a [Cell], diag: &'a mut Diagnostics) -> Self {
        RowReader { cells, diag }
    }

    pub fn cell(&self, col: usize) -> &'a Cell {
        self.cells.get(col).unwrap_or(&EMPTY)
    }

    pub fn number(&mut self, col: usize) -> Option<f64> {
        let cell = self.cell(col);
        let value = to_number(cell);
        self.track(cell, value.is_some());
        value
    }

    /// Counts a fallback for a non-numeric cell without converting it.
    pub fn track_number(&mut self, col: usize) {
        let cell = self.cell(col);
        self.track(cell, to_number(cell).is_some());
    }

    pub fn number_or_zero(&mut self, col: usize) -> f64 {
        self.number(col).unwrap_or(0.0)
    }

    pub fn percent(&mut self, col: usize) -> Option<f64> {
        let cell = self.cell(col);
        let value = to_percentage(cell);
        self.track(cell, value.is_some());
        value
    }

    pub fn date(&mut self, col: usize) -> String {
        let cell = self.cell(col);
        let ok = match cell {
            Cell::Number(n) | Cell::Date(n) => excel_serial_to_date(*n).is_some(),
            Cell::Bool(_) | Cell::Error(_) => false,
            Cell::Empty | Cell::Text(_) => true,
        };
        self.track(cell, ok);
        to_date_string(cell)
    }

    pub fn text(&self, col: usize) -> String {
        to_trimmed_string(self.cell(col))
    }

    pub fn opt_text(&self, col: usize) -> Option<String> {
        to_optional_string(self.cell(col))
    }

    fn track(&mut self, cell: &Cell, ok: bool) {
        if !ok && !cell.is_blank() {
            self.diag.coercion_fallbacks += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracking_a_number_only_counts_junk() {
        let cells = vec![Cell::from(12.0), Cell::from("н/д"), Cell::Empty, Cell::from("1 200")];
        let mut diag = Diagnostics::default();
        let mut r = RowReader::new(&cells, &mut diag);
        for col in 0..5 {
            r.track_number(col);
        }
        assert_eq!(diag.coercion_fallbacks, 1);
    }

    #[test]
    fn number_prefix_parsing() {
        assert_eq!(parse_number_text("1 234,5"), Some(1234.5));
        assert_eq!(parse_number_text("12 шт"), Some(12.0));
        assert_eq!(parse_number_text("-0,5"), Some(-0.5));
        assert_eq!(parse_number_text("шт"), None);
        assert_eq!(parse_number_text(""), None);
    }

    #[test]
    fn format_number_drops_integral_fraction() {
        assert_eq!(format_number(101.0), "101");
        assert_eq!(format_number(1.25), "1.25");
    }

    #[test]
    fn reader_counts_fallbacks() {
        let mut diag = Diagnostics::default();
        let cells = vec![Cell::from("abc"), Cell::Empty, Cell::from(3.0), Cell::Bool(true)];
        let mut r = RowReader::new(&cells, &mut diag);
        assert_eq!(r.number(0), None);
        assert_eq!(r.number(1), None);
        assert_eq!(r.number_or_zero(2), 3.0);
        assert_eq!(r.date(3), NO_DATE);
        assert_eq!(r.percent(99), None);
        assert_eq!(diag.coercion_fallbacks, 2);
    }
}
