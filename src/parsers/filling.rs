//! Store filling (`Наполненность`) with optional per-season breakdown
//!
//! The season sheet is keyed by store code. Codes come through as numbers in
//! one sheet and text in the other often enough that the join goes through
//! the trimmed string form.

use super::{LocatedSheet, REGION_MARKER};
use crate::coerce::{Diagnostics, RowReader, to_trimmed_string};
use crate::loader::Workbook;
use crate::locator::{MarkerSpec, RowFilter};
use crate::sheet::RawSheet;
use crate::tags::{FileMeta, HasMeta, Tagged, detect_region};
use serde::Serialize;
use std::collections::{HashMap, HashSet};

pub const SHEET: &str = "Наполненность";
pub const SEASONS_SHEET: &str = "Наполненность по сезонам";

const SEASONS_MARKER: MarkerSpec<'static> = MarkerSpec::new(0, &["Код магазина"]);

mod col {
    pub const REGION: usize = 0;
    pub const STORE_CODE: usize = 1;
    pub const STORE: usize = 2;
    pub const CAPACITY: usize = 3;
    pub const STOCK: usize = 4;
    pub const FILL_PCT: usize = 5;
    pub const IN_TRANSIT: usize = 6;
}

mod season_col {
    pub const STORE_CODE: usize = 0;
    pub const STORE: usize = 1;
    pub const SEASON: usize = 2;
    pub const CAPACITY: usize = 3;
    pub const STOCK: usize = 4;
    pub const FILL_PCT: usize = 5;
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeasonFill {
    pub store: String,
    pub season: String,
    pub capacity: f64,
    pub stock: f64,
    pub fill_pct: Option<f64>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FillingStoreRow {
    pub region: String,
    pub store_code: String,
    pub store: String,
    pub capacity: f64,
    pub stock: f64,
    pub fill_pct: Option<f64>,
    pub in_transit: f64,
    /// `None` when the season sheet is absent or does not list this store
    pub seasons: Option<Vec<SeasonFill>>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FillingFile {
    pub meta: FileMeta,
    pub stores: Vec<Tagged<FillingStoreRow>>,
}

impl HasMeta for FillingFile {
    fn meta(&self) -> &FileMeta {
        &self.meta
    }

    fn row_count(&self) -> usize {
        self.stores.len()
    }
}

pub fn parse(workbook: &Workbook, file_name: &str) -> Option<FillingFile> {
    let Some(sheet) = workbook.sheet(SHEET) else {
        log::warn!("'{file_name}': sheet '{SHEET}' not found");
        return None;
    };

    let mut diag = Diagnostics::default();
    let seasons = match workbook.sheet(SEASONS_SHEET) {
        Some(season_sheet) => read_seasons(season_sheet, &mut diag),
        None => HashMap::new(),
    };

    let located = LocatedSheet::locate(sheet, &REGION_MARKER);
    let filter = RowFilter::kari(col::STORE);
    let mut stores = Vec::new();
    let mut matched = HashSet::new();
    for section in &located.sections {
        for cells in section.rows(sheet, &filter, &mut diag) {
            let mut r = RowReader::new(cells, &mut diag);
            let store_code = r.text(col::STORE_CODE);
            // a store code can repeat across region blocks; each row gets its seasons
            let store_seasons = seasons.get(&store_code).cloned();
            if store_seasons.is_some() {
                matched.insert(store_code.clone());
            }
            stores.push(FillingStoreRow {
                region: r.text(col::REGION),
                store: r.text(col::STORE),
                capacity: r.number_or_zero(col::CAPACITY),
                stock: r.number_or_zero(col::STOCK),
                fill_pct: r.percent(col::FILL_PCT),
                in_transit: r.number_or_zero(col::IN_TRANSIT),
                seasons: store_seasons,
                store_code,
            });
        }
    }
    let unmatched = seasons.keys().filter(|code| !matched.contains(*code)).count();
    if unmatched > 0 {
        log::debug!("'{file_name}': {unmatched} store code(s) on '{SEASONS_SHEET}' have no row on '{SHEET}'");
    }

    let region = detect_region(stores.iter().map(|r| r.region.as_str()));
    let meta = FileMeta::new(file_name, region, located.period(file_name), diag);

    Some(FillingFile {
        stores: meta.tag(stores),
        meta,
    })
}

fn read_seasons(sheet: &RawSheet, diag: &mut Diagnostics) -> HashMap<String, Vec<SeasonFill>> {
    let located = LocatedSheet::locate(sheet, &SEASONS_MARKER);
    let filter = RowFilter::kari(season_col::STORE_CODE);
    let mut by_code: HashMap<String, Vec<SeasonFill>> = HashMap::new();
    for section in &located.sections {
        for cells in section.rows(sheet, &filter, diag) {
            let code = cells
                .get(season_col::STORE_CODE)
                .map(to_trimmed_string)
                .unwrap_or_default();
            let mut r = RowReader::new(cells, diag);
            by_code.entry(code).or_default().push(SeasonFill {
                store: r.text(season_col::STORE),
                season: r.text(season_col::SEASON),
                capacity: r.number_or_zero(season_col::CAPACITY),
                stock: r.number_or_zero(season_col::STOCK),
                fill_pct: r.percent(season_col::FILL_PCT),
            });
        }
    }
    by_code
}
