//! Capsule audit (`Капсулы`): planned vs assembled capsules and article availability per store.

use super::{LocatedSheet, REGION_MARKER};
use crate::coerce::{Diagnostics, RowReader};
use crate::loader::Workbook;
use crate::locator::RowFilter;
use crate::tags::{FileMeta, HasMeta, Tagged, detect_region};
use crate::views::percent_of;
use serde::Serialize;

pub const SHEET: &str = "Капсулы";

mod col {
    pub const REGION: usize = 0;
    pub const SUBDIVISION: usize = 1;
    pub const STORE: usize = 2;
    pub const PLANNED: usize = 3;
    pub const ASSEMBLED: usize = 4;
    pub const ASSEMBLED_PCT: usize = 5;
    pub const MATRIX_ARTICLES: usize = 6;
    pub const AVAILABLE_ARTICLES: usize = 7;
    pub const AVAILABILITY_PCT: usize = 8;
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CapsuleRow {
    pub region: String,
    pub subdivision: String,
    pub store: String,
    pub planned: f64,
    pub assembled: f64,
    pub assembled_pct: Option<f64>,
    pub matrix_articles: f64,
    pub available_articles: f64,
    pub availability_pct: Option<f64>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CapsuleFile {
    pub meta: FileMeta,
    pub stores: Vec<Tagged<CapsuleRow>>,
}

impl HasMeta for CapsuleFile {
    fn meta(&self) -> &FileMeta {
        &self.meta
    }

    fn row_count(&self) -> usize {
        self.stores.len()
    }
}

pub fn parse(workbook: &Workbook, file_name: &str) -> Option<CapsuleFile> {
    let Some(sheet) = workbook.sheet(SHEET) else {
        log::warn!("'{file_name}': sheet '{SHEET}' not found");
        return None;
    };

    let mut diag = Diagnostics::default();
    let located = LocatedSheet::locate(sheet, &REGION_MARKER);
    let filter = RowFilter::kari(col::STORE);

    let mut stores = Vec::new();
    for section in &located.sections {
        for cells in section.rows(sheet, &filter, &mut diag) {
            let mut r = RowReader::new(cells, &mut diag);
            let planned = r.number_or_zero(col::PLANNED);
            let assembled = r.number_or_zero(col::ASSEMBLED);
            let matrix_articles = r.number_or_zero(col::MATRIX_ARTICLES);
            let available_articles = r.number_or_zero(col::AVAILABLE_ARTICLES);
            stores.push(CapsuleRow {
                region: r.text(col::REGION),
                subdivision: r.text(col::SUBDIVISION),
                store: r.text(col::STORE),
                planned,
                assembled,
                // blank percentage cells are recomputed from their parts
                assembled_pct: r
                    .percent(col::ASSEMBLED_PCT)
                    .or_else(|| percent_of(assembled, planned)),
                matrix_articles,
                available_articles,
                availability_pct: r
                    .percent(col::AVAILABILITY_PCT)
                    .or_else(|| percent_of(available_articles, matrix_articles)),
            });
        }
    }

    let region = detect_region(stores.iter().map(|r| r.region.as_str()));
    let meta = FileMeta::new(file_name, region, located.period(file_name), diag);

    Some(CapsuleFile {
        stores: meta.tag(stores),
        meta,
    })
}
