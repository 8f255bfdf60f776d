//! Scanning/acceptance audit
//!
//! One sheet, `Сканирование`, split into one to three blocks by repeated
//! `Регион` header rows. Which block is stores and which is regions depends on
//! how many blocks the file has (see [`crate::locator::STORE_FIRST_ARITY`]).

use super::{LocatedSheet, REGION_MARKER, non_empty};
use crate::cell::Cell;
use crate::coerce::{Diagnostics, RowReader};
use crate::loader::Workbook;
use crate::locator::SectionRole;
use crate::tags::{FileMeta, HasMeta, Tagged, detect_region};
use serde::Serialize;

pub const SHEET: &str = "Сканирование";

mod col {
    pub const REGION: usize = 0;
    pub const SUBDIVISION: usize = 1;
    pub const STORE: usize = 2;
    pub const BOXES_TOTAL: usize = 3;
    pub const SCANNED: usize = 4;
    pub const SCANNED_PCT: usize = 5;
    pub const ON_TIME: usize = 6;
    pub const ON_TIME_PCT: usize = 7;
    pub const NOT_ACCEPTED: usize = 8;
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanningRow {
    pub level: SectionRole,
    pub region: String,
    pub subdivision: Option<String>,
    pub store: Option<String>,
    pub boxes_total: f64,
    pub scanned: f64,
    pub scanned_pct: Option<f64>,
    pub accepted_on_time: f64,
    pub on_time_pct: Option<f64>,
    pub not_accepted: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanningFile {
    pub meta: FileMeta,
    pub stores: Vec<Tagged<ScanningRow>>,
    pub subdivisions: Vec<Tagged<ScanningRow>>,
    pub regions: Vec<Tagged<ScanningRow>>,
}

impl HasMeta for ScanningFile {
    fn meta(&self) -> &FileMeta {
        &self.meta
    }

    fn row_count(&self) -> usize {
        self.stores.len() + self.subdivisions.len() + self.regions.len()
    }
}

pub fn parse(workbook: &Workbook, file_name: &str) -> Option<ScanningFile> {
    let Some(sheet) = workbook.sheet(SHEET) else {
        log::warn!("'{file_name}': sheet '{SHEET}' not found");
        return None;
    };

    let mut diag = Diagnostics::default();
    let located = LocatedSheet::locate(sheet, &REGION_MARKER);

    let mut stores = Vec::new();
    let mut subdivisions = Vec::new();
    let mut regions = Vec::new();
    for (role, rows) in located.rows_by_role(&mut diag) {
        let target = match role {
            SectionRole::Stores => &mut stores,
            SectionRole::Subdivisions => &mut subdivisions,
            SectionRole::Regions => &mut regions,
        };
        target.extend(rows.into_iter().map(|cells| read_row(role, cells, &mut diag)));
    }

    let region = detect_region(
        stores
            .iter()
            .chain(&subdivisions)
            .chain(&regions)
            .map(|r: &ScanningRow| r.region.as_str()),
    );
    let meta = FileMeta::new(file_name, region, located.period(file_name), diag);

    Some(ScanningFile {
        stores: meta.tag(stores),
        subdivisions: meta.tag(subdivisions),
        regions: meta.tag(regions),
        meta,
    })
}

fn read_row(level: SectionRole, cells: &[Cell], diag: &mut Diagnostics) -> ScanningRow {
    let mut r = RowReader::new(cells, diag);
    ScanningRow {
        level,
        region: r.text(col::REGION),
        subdivision: non_empty(r.text(col::SUBDIVISION)),
        store: non_empty(r.text(col::STORE)),
        boxes_total: r.number_or_zero(col::BOXES_TOTAL),
        scanned: r.number_or_zero(col::SCANNED),
        scanned_pct: r.percent(col::SCANNED_PCT),
        accepted_on_time: r.number_or_zero(col::ON_TIME),
        on_time_pct: r.percent(col::ON_TIME_PCT),
        not_accepted: r.number_or_zero(col::NOT_ACCEPTED),
    }
}
