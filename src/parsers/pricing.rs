//! Price-tag audit (`Аудит цен`)
//!
//! Store and region blocks both start with `Регион` in column 0, so column 1
//! tells them apart. That makes this the one family whose section roles come
//! from the marker itself instead of the arity table.

use crate::coerce::{Diagnostics, RowReader};
use crate::loader::Workbook;
use crate::locator::{self, HeaderMarker, MarkerSpec, RowFilter, SectionRole};
use crate::tags::{FileMeta, HasMeta, Tagged, detect_period, detect_region};
use serde::Serialize;

pub const SHEET: &str = "Аудит цен";

const MARKERS: [MarkerSpec<'static>; 2] = [
    MarkerSpec::with_columns(0, super::REGION_HEADER, &[(1, &["Магазин"])]),
    MarkerSpec::with_columns(0, super::REGION_HEADER, &[(1, &["Проверено ценников"])]),
];
const STORE_SPEC: usize = 0;

mod store_col {
    pub const REGION: usize = 0;
    pub const STORE: usize = 1;
    pub const CHECKED: usize = 2;
    pub const ERRORS: usize = 3;
    pub const ERROR_PCT: usize = 4;
    pub const MISSING_TAGS: usize = 5;
    pub const AUDITED_ON: usize = 6;
}

mod region_col {
    pub const REGION: usize = 0;
    pub const CHECKED: usize = 1;
    pub const ERRORS: usize = 2;
    pub const ERROR_PCT: usize = 3;
    pub const MISSING_TAGS: usize = 4;
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingStoreRow {
    pub region: String,
    pub store: String,
    pub checked: f64,
    pub errors: f64,
    pub error_pct: Option<f64>,
    pub missing_tags: f64,
    pub audited_on: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingRegionRow {
    pub region: String,
    pub checked: f64,
    pub errors: f64,
    pub error_pct: Option<f64>,
    pub missing_tags: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingFile {
    pub meta: FileMeta,
    pub stores: Vec<Tagged<PricingStoreRow>>,
    pub regions: Vec<Tagged<PricingRegionRow>>,
}

impl HasMeta for PricingFile {
    fn meta(&self) -> &FileMeta {
        &self.meta
    }

    fn row_count(&self) -> usize {
        self.stores.len() + self.regions.len()
    }
}

pub fn parse(workbook: &Workbook, file_name: &str) -> Option<PricingFile> {
    let Some(sheet) = workbook.sheet(SHEET) else {
        log::warn!("'{file_name}': sheet '{SHEET}' not found");
        return None;
    };

    let found = locator::locate_any(sheet, &MARKERS);
    let markers: Vec<HeaderMarker> = found.iter().map(|(_, m)| m.clone()).collect();
    let sections = locator::split_sections(sheet, &markers);
    let roles = found.iter().map(|(spec, _)| {
        if *spec == STORE_SPEC {
            SectionRole::Stores
        } else {
            SectionRole::Regions
        }
    });
    log::debug!("sheet '{}': {} pricing block(s)", sheet.name, markers.len());

    let mut diag = Diagnostics::default();
    let mut stores = Vec::new();
    let mut regions = Vec::new();
    for (role, section) in roles.zip(&sections) {
        match role {
            SectionRole::Stores => {
                let filter = RowFilter::kari(store_col::STORE);
                for cells in section.rows(sheet, &filter, &mut diag) {
                    let mut r = RowReader::new(cells, &mut diag);
                    stores.push(PricingStoreRow {
                        region: r.text(store_col::REGION),
                        store: r.text(store_col::STORE),
                        checked: r.number_or_zero(store_col::CHECKED),
                        errors: r.number_or_zero(store_col::ERRORS),
                        error_pct: r.percent(store_col::ERROR_PCT),
                        missing_tags: r.number_or_zero(store_col::MISSING_TAGS),
                        audited_on: r.date(store_col::AUDITED_ON),
                    });
                }
            }
            _ => {
                let filter = RowFilter::kari(region_col::REGION);
                for cells in section.rows(sheet, &filter, &mut diag) {
                    let mut r = RowReader::new(cells, &mut diag);
                    regions.push(PricingRegionRow {
                        region: r.text(region_col::REGION),
                        checked: r.number_or_zero(region_col::CHECKED),
                        errors: r.number_or_zero(region_col::ERRORS),
                        error_pct: r.percent(region_col::ERROR_PCT),
                        missing_tags: r.number_or_zero(region_col::MISSING_TAGS),
                    });
                }
            }
        }
    }

    let region = detect_region(
        stores
            .iter()
            .map(|r| r.region.as_str())
            .chain(regions.iter().map(|r| r.region.as_str())),
    );
    let period = detect_period(&locator::preamble(sheet, &markers), file_name);
    let meta = FileMeta::new(file_name, region, period, diag);

    Some(PricingFile {
        stores: meta.tag(stores),
        regions: meta.tag(regions),
        meta,
    })
}
