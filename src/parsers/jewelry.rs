//! Jewelry summary (`Итоги`) and unexposed items (`Невыставленные`)
//!
//! Two summary layouts are in circulation. The current one has `Магазин` right
//! after `Регион` and carries stock in roubles; the legacy one has a
//! `Подразделение` column there, no roubles, and the percentage before the
//! unexposed count. Both are still uploaded, so both are parsed.

use super::{LocatedSheet, REGION_MARKER, non_empty};
use crate::cell::Cell;
use crate::coerce::{Diagnostics, RowReader};
use crate::loader::Workbook;
use crate::locator::{MarkerSpec, RowFilter};
use crate::tags::{FileMeta, HasMeta, Tagged, detect_region};
use serde::Serialize;
use std::collections::HashMap;

pub const SUMMARY_SHEET: &str = "Итоги";
pub const ITEMS_SHEET: &str = "Невыставленные";

const STORE_HEADER: &str = "Магазин";
const ITEMS_MARKER: MarkerSpec<'static> = MarkerSpec::new(0, &[STORE_HEADER]);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JewelryLayout {
    Current,
    Legacy,
}

impl JewelryLayout {
    /// Decided by the header cell right after `Регион`.
    pub fn detect(header: &[Cell]) -> Self {
        if header.get(1).is_some_and(|c| c.text_eq(STORE_HEADER)) {
            JewelryLayout::Current
        } else {
            JewelryLayout::Legacy
        }
    }

    fn columns(self) -> SummaryColumns {
        match self {
            JewelryLayout::Current => SummaryColumns {
                region: 0,
                subdivision: None,
                store: 1,
                stock_qty: 2,
                stock_rub: Some(3),
                exposed_qty: 4,
                unexposed_qty: 5,
                exposed_pct: 6,
            },
            JewelryLayout::Legacy => SummaryColumns {
                region: 0,
                subdivision: Some(1),
                store: 2,
                stock_qty: 3,
                stock_rub: None,
                exposed_qty: 4,
                exposed_pct: 5,
                unexposed_qty: 6,
            },
        }
    }
}

struct SummaryColumns {
    region: usize,
    subdivision: Option<usize>,
    store: usize,
    stock_qty: usize,
    stock_rub: Option<usize>,
    exposed_qty: usize,
    unexposed_qty: usize,
    exposed_pct: usize,
}

mod item_col {
    pub const STORE: usize = 0;
    pub const ARTICLE: usize = 1;
    pub const NAME: usize = 2;
    pub const ASSAY: usize = 3;
    pub const WEIGHT: usize = 4;
    pub const PRICE: usize = 5;
    pub const RECEIVED_ON: usize = 6;
    pub const DAYS_UNEXPOSED: usize = 7;
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JewelrySummaryRow {
    pub region: String,
    pub subdivision: Option<String>,
    pub store: String,
    pub stock_qty: f64,
    pub stock_rub: Option<f64>,
    pub exposed_qty: f64,
    pub unexposed_qty: f64,
    pub exposed_pct: Option<f64>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnexposedItem {
    pub store: String,
    /// Looked up from the summary sheet; `None` if the store is not listed there
    pub region: Option<String>,
    pub article: Option<String>,
    pub name: String,
    pub assay: String,
    pub weight: Option<f64>,
    pub price: Option<f64>,
    pub received_on: String,
    pub days_unexposed: Option<f64>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JewelryFile {
    pub meta: FileMeta,
    pub layout: JewelryLayout,
    pub summary: Vec<Tagged<JewelrySummaryRow>>,
    pub unexposed: Vec<Tagged<UnexposedItem>>,
}

impl HasMeta for JewelryFile {
    fn meta(&self) -> &FileMeta {
        &self.meta
    }

    fn row_count(&self) -> usize {
        self.summary.len() + self.unexposed.len()
    }
}

pub fn parse(workbook: &Workbook, file_name: &str) -> Option<JewelryFile> {
    let Some(sheet) = workbook.sheet(SUMMARY_SHEET) else {
        log::warn!("'{file_name}': sheet '{SUMMARY_SHEET}' not found");
        return None;
    };

    let mut diag = Diagnostics::default();
    let located = LocatedSheet::locate(sheet, &REGION_MARKER);
    let layout = located
        .sections
        .first()
        .map_or(JewelryLayout::Current, |s| JewelryLayout::detect(s.header(sheet)));
    log::debug!("'{file_name}': jewelry layout {layout:?}");

    let cols = layout.columns();
    let filter = RowFilter::kari(cols.store);
    let mut summary = Vec::new();
    for section in &located.sections {
        for cells in section.rows(sheet, &filter, &mut diag) {
            let mut r = RowReader::new(cells, &mut diag);
            summary.push(JewelrySummaryRow {
                region: r.text(cols.region),
                subdivision: cols.subdivision.and_then(|c| non_empty(r.text(c))),
                store: r.text(cols.store),
                stock_qty: r.number_or_zero(cols.stock_qty),
                stock_rub: cols.stock_rub.and_then(|c| r.number(c)),
                exposed_qty: r.number_or_zero(cols.exposed_qty),
                unexposed_qty: r.number_or_zero(cols.unexposed_qty),
                exposed_pct: r.percent(cols.exposed_pct),
            });
        }
    }

    let store_regions: HashMap<&str, &str> = summary
        .iter()
        .map(|row| (row.store.as_str(), row.region.as_str()))
        .collect();
    let unexposed = match workbook.sheet(ITEMS_SHEET) {
        Some(items) => read_items(items, &store_regions, &mut diag),
        None => Vec::new(),
    };

    let region = detect_region(summary.iter().map(|r| r.region.as_str()));
    let meta = FileMeta::new(file_name, region, located.period(file_name), diag);

    Some(JewelryFile {
        layout,
        summary: meta.tag(summary),
        unexposed: meta.tag(unexposed),
        meta,
    })
}

fn read_items(
    sheet: &crate::sheet::RawSheet,
    store_regions: &HashMap<&str, &str>,
    diag: &mut Diagnostics,
) -> Vec<UnexposedItem> {
    let located = LocatedSheet::locate(sheet, &ITEMS_MARKER);
    let filter = RowFilter::kari(item_col::STORE);
    let mut items = Vec::new();
    for section in &located.sections {
        for cells in section.rows(sheet, &filter, diag) {
            let mut r = RowReader::new(cells, diag);
            let store = r.text(item_col::STORE);
            items.push(UnexposedItem {
                region: store_regions.get(store.as_str()).map(|s| s.to_string()),
                store,
                article: r.opt_text(item_col::ARTICLE),
                name: r.text(item_col::NAME),
                assay: r.text(item_col::ASSAY),
                weight: r.number(item_col::WEIGHT),
                price: r.number(item_col::PRICE),
                received_on: r.date(item_col::RECEIVED_ON),
                days_unexposed: r.number(item_col::DAYS_UNEXPOSED),
            });
        }
    }
    items
}
