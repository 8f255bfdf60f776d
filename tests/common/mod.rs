#![allow(dead_code)]

use kari_dashboard::{Cell, RawSheet, UploadedFile, Workbook};

/// Builds a row of cells, converting every value with `Cell::from`.
#[macro_export]
macro_rules! cells {
    ($($value:expr),* $(,)?) => {
        vec![$(kari_dashboard::Cell::from($value)),*]
    };
}

pub const SHIPMENT_HEADER: [&str; 10] = [
    "Регион",
    "Подразделение",
    "Магазин",
    "Заказано",
    "Отгружено",
    "% отгрузки",
    "Принято",
    "% приемки",
    "В пути",
    "Просрочено",
];

pub fn text_row(values: &[&str]) -> Vec<Cell> {
    values
        .iter()
        .map(|v| if v.is_empty() { Cell::Empty } else { Cell::from(*v) })
        .collect()
}

pub fn sheet(name: &str, rows: Vec<Vec<Cell>>) -> RawSheet {
    RawSheet::from_rows(name, rows)
}

pub fn workbook(sheets: Vec<RawSheet>) -> Workbook {
    Workbook::from_sheets(sheets)
}

pub fn shipment_row(region: &str, subdivision: &str, store: &str, ordered: f64, shipped: f64, accepted: f64) -> Vec<Cell> {
    cells![
        region,
        subdivision,
        store,
        ordered,
        shipped,
        shipped / ordered,
        accepted,
        accepted / shipped,
        shipped - accepted,
        0.0,
    ]
}

/// Title, period line, header, two stores and a totals row.
pub fn shipment_summary_rows() -> Vec<Vec<Cell>> {
    vec![
        text_row(&["Отчет по отгрузкам"]),
        text_row(&["Период: 01.03.2024 - 07.03.2024"]),
        text_row(&SHIPMENT_HEADER),
        shipment_row("МСК", "Центр", "Магазин 1", 100.0, 80.0, 60.0),
        shipment_row("МСК", "Центр", "Магазин 2", 50.0, 50.0, 25.0),
        cells!["", "", "ИТОГО МСК", 150.0, 130.0, 0.8667, 85.0, 0.6538, 45.0, 0.0],
    ]
}

/// Real `.xlsx` bytes written with rust_xlsxwriter.
pub fn xlsx(sheets: &[(&str, Vec<Vec<Cell>>)]) -> Vec<u8> {
    use rust_xlsxwriter::{Workbook, Worksheet};

    let mut workbook = Workbook::new();
    for (name, rows) in sheets {
        let mut worksheet = Worksheet::new();
        worksheet.set_name(*name).unwrap();
        for (r, row) in rows.iter().enumerate() {
            for (c, cell) in row.iter().enumerate() {
                let (r, c) = (r as u32, c as u16);
                match cell {
                    Cell::Text(s) => {
                        worksheet.write_string(r, c, s.as_str()).unwrap();
                    }
                    Cell::Number(n) | Cell::Date(n) => {
                        worksheet.write_number(r, c, *n).unwrap();
                    }
                    Cell::Bool(b) => {
                        worksheet.write_boolean(r, c, *b).unwrap();
                    }
                    Cell::Empty | Cell::Error(_) => {}
                }
            }
        }
        workbook.push_worksheet(worksheet);
    }
    workbook.save_to_buffer().unwrap()
}

pub fn upload(name: &str, sheets: &[(&str, Vec<Vec<Cell>>)]) -> UploadedFile {
    UploadedFile::new(name, xlsx(sheets))
}
