#[macro_use]
mod common;

use common::*;
use kari_dashboard::loader::{collect_paths, read_file};
use kari_dashboard::{Cell, IngestError, Workbook};
use std::fs;
use std::path::PathBuf;

#[test]
fn xlsx_bytes_open_with_every_sheet() {
    let bytes = xlsx(&[
        ("Отчет", vec![text_row(&["Регион", "Магазин"]), cells!["МСК", "Магазин 1"]]),
        ("Детализация", vec![text_row(&["Регион"])]),
    ]);
    let wb = Workbook::from_bytes(&bytes).unwrap();

    assert_eq!(wb.sheet_names(), vec!["Отчет", "Детализация"]);
    let sheet = wb.sheet("отчет").unwrap();
    assert_eq!(sheet.get(1, 1), &Cell::from("Магазин 1"));
}

#[test]
fn ranges_are_re_anchored_at_a1() {
    let rows = vec![
        vec![],
        vec![],
        vec![Cell::Empty, Cell::from("Регион")],
        vec![Cell::Empty, Cell::from(45366.0), Cell::Bool(true)],
    ];
    let wb = Workbook::from_bytes(&xlsx(&[("Лист1", rows)])).unwrap();
    let sheet = wb.sheet("Лист1").unwrap();

    assert_eq!(sheet.height(), 4);
    assert_eq!(sheet.cell_at("B3"), &Cell::from("Регион"));
    assert_eq!(sheet.get(3, 1), &Cell::Number(45366.0));
    assert_eq!(sheet.get(3, 2), &Cell::Bool(true));
    assert_eq!(sheet.get(0, 0), &Cell::Empty);
}

#[test]
fn garbage_bytes_are_an_error() {
    let err = Workbook::from_bytes(b"PK but not really").unwrap_err();
    assert!(!matches!(err, IngestError::EmptyWorkbook), "{err}");
}

#[test]
fn directories_expand_to_sorted_workbooks() {
    let dir = tempfile::tempdir().unwrap();
    for name in ["Б отгрузки.xlsx", "А сканирование.xlsx", "~$А сканирование.xlsx", "notes.txt"] {
        fs::write(dir.path().join(name), b"").unwrap();
    }
    let single = dir.path().join("notes.txt");

    let paths = collect_paths(&[dir.path().to_path_buf(), single.clone()]).unwrap();
    let names: Vec<String> = paths
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
        .collect();
    assert_eq!(names, vec!["А сканирование.xlsx", "Б отгрузки.xlsx", "notes.txt"]);
}

#[test]
fn read_file_keeps_the_bare_file_name() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("Отгрузки неделя 10.xlsx");
    let bytes = xlsx(&[("Отчет", shipment_summary_rows())]);
    fs::write(&path, &bytes).unwrap();

    let file = read_file(&path).unwrap();
    assert_eq!(file.name, "Отгрузки неделя 10.xlsx");
    assert_eq!(file.bytes, bytes);
    assert!(Workbook::from_bytes(&file.bytes).is_ok());

    let missing = read_file(&PathBuf::from("/definitely/not/here.xlsx"));
    assert!(missing.is_err());
}
