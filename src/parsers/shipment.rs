//! Shipment/control report
//!
//! The base report family. A workbook carries one or more summary sheets
//! (`Отчет`, `Отчет Обувь`, ...) and detail sheets (`Детализация ...`); all
//! variants are merged. Rows whose store cell reads `ИТОГО ...` are kept
//! apart as region totals.

use super::{LocatedSheet, REGION_MARKER, non_empty};
use crate::cell::Cell;
use crate::coerce::{Diagnostics, RowReader, to_trimmed_string};
use crate::loader::Workbook;
use crate::locator::RowFilter;
use crate::sheet::RawSheet;
use crate::tags::{FileMeta, HasMeta, Region, Tagged, detect_region};
use serde::Serialize;

pub const SUMMARY_PREFIX: &str = "Отчет";
pub const DETAIL_PREFIX: &str = "Детализация";

const TOTAL: &str = "ИТОГО";

mod summary_col {
    pub const REGION: usize = 0;
    pub const SUBDIVISION: usize = 1;
    pub const STORE: usize = 2;
    pub const ORDERED: usize = 3;
    pub const SHIPPED: usize = 4;
    pub const SHIPPED_PCT: usize = 5;
    pub const ACCEPTED: usize = 6;
    pub const ACCEPTED_PCT: usize = 7;
    pub const IN_TRANSIT: usize = 8;
    pub const OVERDUE: usize = 9;
}

mod detail_col {
    pub const REGION: usize = 0;
    pub const SUBDIVISION: usize = 1;
    pub const STORE: usize = 2;
    pub const SHIPMENT_ID: usize = 3;
    pub const SHIPPED_ON: usize = 4;
    pub const ACCEPTED_ON: usize = 5;
    pub const BOXES: usize = 6;
    pub const PAIRS: usize = 7;
    pub const STATUS: usize = 8;
}

/// Quantities shared by store rows and region totals.
#[derive(Clone, Copy, Debug, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShipmentFigures {
    pub ordered: f64,
    pub shipped: f64,
    pub shipped_pct: Option<f64>,
    pub accepted: f64,
    pub accepted_pct: Option<f64>,
    pub in_transit: f64,
    pub overdue: f64,
}

impl ShipmentFigures {
    fn read(r: &mut RowReader<'_>) -> Self {
        ShipmentFigures {
            ordered: r.number_or_zero(summary_col::ORDERED),
            shipped: r.number_or_zero(summary_col::SHIPPED),
            shipped_pct: r.percent(summary_col::SHIPPED_PCT),
            accepted: r.number_or_zero(summary_col::ACCEPTED),
            accepted_pct: r.percent(summary_col::ACCEPTED_PCT),
            in_transit: r.number_or_zero(summary_col::IN_TRANSIT),
            overdue: r.number_or_zero(summary_col::OVERDUE),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShipmentSummaryRow {
    pub region: String,
    pub subdivision: String,
    pub store: String,
    /// Sheet-name suffix, e.g. `Обувь` for a sheet called `Отчет Обувь`
    pub sub_group: Option<String>,
    #[serde(flatten)]
    pub figures: ShipmentFigures,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionTotalRow {
    pub region: String,
    pub region_code: Region,
    pub sub_group: Option<String>,
    #[serde(flatten)]
    pub figures: ShipmentFigures,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShipmentDetailRow {
    pub region: String,
    pub subdivision: String,
    pub store: String,
    pub sub_group: Option<String>,
    pub shipment_id: Option<String>,
    pub shipped_on: String,
    pub accepted_on: String,
    pub boxes: f64,
    pub pairs: f64,
    pub status: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShipmentFile {
    pub meta: FileMeta,
    pub summary: Vec<Tagged<ShipmentSummaryRow>>,
    pub detail: Vec<Tagged<ShipmentDetailRow>>,
    pub region_totals: Vec<Tagged<RegionTotalRow>>,
}

impl HasMeta for ShipmentFile {
    fn meta(&self) -> &FileMeta {
        &self.meta
    }

    fn row_count(&self) -> usize {
        self.summary.len() + self.detail.len() + self.region_totals.len()
    }
}

pub fn parse(workbook: &Workbook, file_name: &str) -> Option<ShipmentFile> {
    let summary_sheets = workbook.sheets_with_prefix(SUMMARY_PREFIX);
    let detail_sheets = workbook.sheets_with_prefix(DETAIL_PREFIX);
    if summary_sheets.is_empty() && detail_sheets.is_empty() {
        log::warn!("'{file_name}': no '{SUMMARY_PREFIX}' or '{DETAIL_PREFIX}' sheet");
        return None;
    }

    let mut diag = Diagnostics::default();
    let mut summary = Vec::new();
    let mut totals = Vec::new();
    let mut detail = Vec::new();
    let mut period = None;

    for sheet in &summary_sheets {
        let located = LocatedSheet::locate(sheet, &REGION_MARKER);
        period = period.or_else(|| located.period(file_name));
        read_summary(&located, sub_group(sheet, SUMMARY_PREFIX), &mut summary, &mut totals, &mut diag);
    }
    for sheet in &detail_sheets {
        let located = LocatedSheet::locate(sheet, &REGION_MARKER);
        period = period.or_else(|| located.period(file_name));
        read_detail(&located, sub_group(sheet, DETAIL_PREFIX), &mut detail, &mut diag);
    }
    log::debug!(
        "'{file_name}': merged {} summary and {} detail sheet(s)",
        summary_sheets.len(),
        detail_sheets.len()
    );

    let region = detect_region(
        summary
            .iter()
            .map(|r: &ShipmentSummaryRow| r.region.as_str())
            .chain(detail.iter().map(|r: &ShipmentDetailRow| r.region.as_str())),
    );
    let meta = FileMeta::new(file_name, region, period, diag);

    Some(ShipmentFile {
        summary: meta.tag(summary),
        detail: meta.tag(detail),
        region_totals: meta.tag(totals),
        meta,
    })
}

fn sub_group(sheet: &RawSheet, prefix: &str) -> Option<String> {
    // sheet names were matched case- and ё-insensitively, which keeps char counts
    let suffix: String = sheet.name.trim().chars().skip(prefix.chars().count()).collect();
    non_empty(suffix.trim().to_string())
}

fn read_summary(
    located: &LocatedSheet<'_>,
    sub_group: Option<String>,
    summary: &mut Vec<ShipmentSummaryRow>,
    totals: &mut Vec<RegionTotalRow>,
    diag: &mut Diagnostics,
) {
    let filter = RowFilter::kari(summary_col::STORE);
    for section in &located.sections {
        for cells in section.non_empty_rows(located.sheet, diag) {
            let store = cells
                .get(summary_col::STORE)
                .map(to_trimmed_string)
                .unwrap_or_default();
            if let Some(total) = region_total(cells, &store, &sub_group, diag) {
                totals.push(total);
                continue;
            }
            if !filter.keeps(cells) {
                diag.sentinel_rows += 1;
                continue;
            }

            let mut r = RowReader::new(cells, diag);
            summary.push(ShipmentSummaryRow {
                region: r.text(summary_col::REGION),
                subdivision: r.text(summary_col::SUBDIVISION),
                store,
                sub_group: sub_group.clone(),
                figures: ShipmentFigures::read(&mut r),
            });
        }
    }
}

// `ИТОГО` or `ИТОГО <region>` in the store column
fn region_total(
    cells: &[Cell],
    store: &str,
    sub_group: &Option<String>,
    diag: &mut Diagnostics,
) -> Option<RegionTotalRow> {
    let named = store.strip_prefix(TOTAL)?;
    if !named.is_empty() && !named.starts_with(' ') {
        return None;
    }

    let mut r = RowReader::new(cells, diag);
    let region = non_empty(r.text(summary_col::REGION)).unwrap_or_else(|| named.trim().to_string());
    Some(RegionTotalRow {
        region_code: Region::mentioned_in(&region).unwrap_or(Region::All),
        region,
        sub_group: sub_group.clone(),
        figures: ShipmentFigures::read(&mut r),
    })
}

fn read_detail(
    located: &LocatedSheet<'_>,
    sub_group: Option<String>,
    detail: &mut Vec<ShipmentDetailRow>,
    diag: &mut Diagnostics,
) {
    let filter = RowFilter::kari(detail_col::STORE);
    for section in &located.sections {
        for cells in section.rows(located.sheet, &filter, diag) {
            let mut r = RowReader::new(cells, diag);
            detail.push(ShipmentDetailRow {
                region: r.text(detail_col::REGION),
                subdivision: r.text(detail_col::SUBDIVISION),
                store: r.text(detail_col::STORE),
                sub_group: sub_group.clone(),
                shipment_id: r.opt_text(detail_col::SHIPMENT_ID),
                shipped_on: r.date(detail_col::SHIPPED_ON),
                accepted_on: r.date(detail_col::ACCEPTED_ON),
                boxes: r.number_or_zero(detail_col::BOXES),
                pairs: r.number_or_zero(detail_col::PAIRS),
                status: r.text(detail_col::STATUS),
            });
        }
    }
}
