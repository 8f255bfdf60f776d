use crate::cell::Cell;
use crate::error::{IngestError, Result};
use crate::sheet::RawSheet;
use calamine::{Data, Range, Reader, open_workbook_auto_from_rs};
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};

/// Extensions the loader will pick up when scanning a directory.
pub const WORKBOOK_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xls", "xlsb"];

/// One file handed over by the user, still as raw bytes
#[derive(Clone, Debug)]
pub struct UploadedFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        UploadedFile {
            name: name.into(),
            bytes,
        }
    }
}

/// An opened workbook: every sheet read eagerly into a [`RawSheet`]
///
/// This is the only place that talks to the spreadsheet reader. Parsers only
/// ever see sheet names and cell grids.
#[derive(Clone, Debug, Default)]
pub struct Workbook {
    sheets: Vec<RawSheet>,
}

impl Workbook {
    pub fn from_sheets(sheets: Vec<RawSheet>) -> Self {
        Workbook { sheets }
    }

    /// Opens workbook bytes of any format calamine understands (xlsx, xlsm, xlsb, xls, ods).
    ///
    /// Sheets that fail to read are logged and left out; a workbook with no
    /// readable sheet at all is an error.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))?;
        let names = workbook.sheet_names();
        let mut sheets = Vec::with_capacity(names.len());

        for name in names {
            match workbook.worksheet_range(&name) {
                Ok(range) => sheets.push(range_to_sheet(&name, &range)),
                Err(e) => log::warn!("sheet '{name}' could not be read: {e}"),
            }
        }

        if sheets.is_empty() {
            return Err(IngestError::EmptyWorkbook);
        }
        Ok(Workbook { sheets })
    }

    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.iter().map(|s| s.name.as_str()).collect()
    }

    /// Finds a sheet by name, ignoring case, surrounding spaces and `ё`/`е`.
    pub fn sheet(&self, name: &str) -> Option<&RawSheet> {
        let wanted = normalize_name(name);
        self.sheets.iter().find(|s| normalize_name(&s.name) == wanted)
    }

    /// First sheet matching any of the given names, in order of preference.
    pub fn first_sheet(&self, names: &[&str]) -> Option<&RawSheet> {
        names.iter().find_map(|name| self.sheet(name))
    }

    /// All sheets whose normalized name starts with `prefix`, in workbook order.
    pub fn sheets_with_prefix(&self, prefix: &str) -> Vec<&RawSheet> {
        let prefix = normalize_name(prefix);
        self.sheets
            .iter()
            .filter(|s| normalize_name(&s.name).starts_with(&prefix))
            .collect()
    }
}

/// Lowercases, trims and folds `ё` into `е`; used for sheet names and filenames.
pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase().replace('ё', "е")
}

// calamine ranges start at the first used cell; re-anchor so row 0 / col 0 is A1
fn range_to_sheet(name: &str, range: &Range<Data>) -> RawSheet {
    let (row_offset, col_offset) = range
        .start()
        .map_or((0, 0), |(r, c)| (r as usize, c as usize));

    let mut rows: Vec<Vec<Cell>> = vec![Vec::new(); row_offset];
    for source_row in range.rows() {
        let mut row = vec![Cell::Empty; col_offset];
        row.extend(source_row.iter().map(Cell::from));
        rows.push(row);
    }
    RawSheet::from_rows(name, rows)
}

/// Reads a file from disk into an [`UploadedFile`].
pub fn read_file(path: &Path) -> Result<UploadedFile> {
    let bytes = fs::read(path)?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string());
    Ok(UploadedFile::new(name, bytes))
}

/// Expands the given paths into workbook files
///
/// Files are taken as given; directories are scanned one level deep for known
/// workbook extensions and sorted by name. Lock files left by Excel (`~$...`)
/// are ignored.
pub fn collect_paths(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            let mut found = Vec::new();
            for entry in fs::read_dir(path)? {
                let entry_path = entry?.path();
                if entry_path.is_file() && is_workbook_path(&entry_path) {
                    found.push(entry_path);
                }
            }
            found.sort();
            files.extend(found);
        } else {
            files.push(path.clone());
        }
    }
    Ok(files)
}

fn is_workbook_path(path: &Path) -> bool {
    let is_lock_file = path
        .file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with("~$"));
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase());

    !is_lock_file
        && extension
            .as_deref()
            .is_some_and(|ext| WORKBOOK_EXTENSIONS.contains(&ext))
}
