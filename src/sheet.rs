use crate::cell::Cell;
use serde::{Deserialize, Serialize};

static EMPTY: Cell = Cell::Empty;

/// A zero-indexed grid of raw cells read from one worksheet
///
/// Rows may be ragged; reads past the end of a row or of the sheet yield
/// [`Cell::Empty`] instead of failing, so parsers can index templates freely.
#[derive(Clone, Serialize, Deserialize, Debug, Default)]
pub struct RawSheet {
    pub name: String,
    rows: Vec<Vec<Cell>>,
}

impl RawSheet {
    pub fn from_rows(name: impl Into<String>, rows: Vec<Vec<Cell>>) -> Self {
        RawSheet {
            name: name.into(),
            rows,
        }
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }

    pub fn row(&self, row: usize) -> &[Cell] {
        self.rows.get(row).map_or(&[], Vec::as_slice)
    }

    pub fn rows(&self) -> impl Iterator<Item = &[Cell]> {
        self.rows.iter().map(Vec::as_slice)
    }

    pub fn get(&self, row: usize, col: usize) -> &Cell {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&EMPTY)
    }

    /// Looks up a cell by its spreadsheet address, e.g. `"B3"`.
    pub fn cell_at(&self, address: &str) -> &Cell {
        match Self::parse_cell_name(address) {
            Some((row, col)) => self.get(row, col),
            None => &EMPTY,
        }
    }

    pub fn col_to_letter(col: usize) -> String {
        let mut col = col + 1;
        let mut result = String::new();
        while col > 0 {
            col -= 1;
            result.push(((col % 26) as u8 + b'A') as char);
            col /= 26;
        }
        result.chars().rev().collect()
    }

    pub fn letter_to_col(letters: &str) -> Option<usize> {
        if letters.is_empty() {
            return None;
        }
        let n = letters.chars().try_fold(0usize, |acc, c| {
            let c = c.to_ascii_uppercase();
            if !c.is_ascii_uppercase() {
                return None;
            }
            acc.checked_mul(26)?.checked_add(c as usize - 'A' as usize + 1)
        })?;
        Some(n - 1)
    }

    pub fn get_cell_name(row: usize, col: usize) -> String {
        format!("{}{}", Self::col_to_letter(col), row + 1)
    }

    /// Parses `"AB12"` into zero-based `(row, col)`.
    pub fn parse_cell_name(cell_name: &str) -> Option<(usize, usize)> {
        let mut letters = String::new();
        let mut digits = String::new();
        let mut found_digit = false;

        for c in cell_name.trim().chars() {
            if c.is_ascii_alphabetic() {
                if found_digit {
                    return None;
                }
                letters.push(c);
            } else if c.is_ascii_digit() {
                found_digit = true;
                digits.push(c);
            } else {
                return None;
            }
        }

        let col = Self::letter_to_col(&letters)?;
        let row = digits.parse::<usize>().ok()?;
        if row == 0 {
            return None;
        }
        Some((row - 1, col))
    }
}
