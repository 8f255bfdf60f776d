//! Address orders (IZ): customer orders shipped to a store for pickup.

use super::{LocatedSheet, REGION_MARKER};
use crate::coerce::{Diagnostics, RowReader};
use crate::loader::Workbook;
use crate::locator::RowFilter;
use crate::tags::{FileMeta, HasMeta, Tagged, detect_region};
use serde::Serialize;

/// Accepted sheet names, most specific first.
pub const SHEETS: &[&str] = &["Адресные заказы", "Заказы"];

mod col {
    pub const REGION: usize = 0;
    pub const STORE: usize = 1;
    pub const ORDER_ID: usize = 2;
    pub const ORDERED_ON: usize = 3;
    pub const ARRIVED_ON: usize = 4;
    pub const ISSUED_ON: usize = 5;
    pub const STATUS: usize = 6;
    pub const AMOUNT: usize = 7;
    pub const DAYS_STORED: usize = 8;
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressOrderRow {
    pub region: String,
    pub store: String,
    pub order_id: Option<String>,
    pub ordered_on: String,
    pub arrived_on: String,
    pub issued_on: String,
    pub status: String,
    pub amount: f64,
    pub days_stored: Option<f64>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressOrderFile {
    pub meta: FileMeta,
    pub orders: Vec<Tagged<AddressOrderRow>>,
}

impl HasMeta for AddressOrderFile {
    fn meta(&self) -> &FileMeta {
        &self.meta
    }

    fn row_count(&self) -> usize {
        self.orders.len()
    }
}

pub fn parse(workbook: &Workbook, file_name: &str) -> Option<AddressOrderFile> {
    let Some(sheet) = workbook.first_sheet(SHEETS) else {
        log::warn!("'{file_name}': none of the sheets {SHEETS:?} found");
        return None;
    };

    let mut diag = Diagnostics::default();
    let located = LocatedSheet::locate(sheet, &REGION_MARKER);
    let filter = RowFilter::kari(col::STORE);

    let mut orders = Vec::new();
    for section in &located.sections {
        for cells in section.rows(sheet, &filter, &mut diag) {
            let mut r = RowReader::new(cells, &mut diag);
            orders.push(AddressOrderRow {
                region: r.text(col::REGION),
                store: r.text(col::STORE),
                order_id: r.opt_text(col::ORDER_ID),
                ordered_on: r.date(col::ORDERED_ON),
                arrived_on: r.date(col::ARRIVED_ON),
                issued_on: r.date(col::ISSUED_ON),
                status: r.text(col::STATUS),
                amount: r.number_or_zero(col::AMOUNT),
                days_stored: r.number(col::DAYS_STORED),
            });
        }
    }

    let region = detect_region(orders.iter().map(|r| r.region.as_str()));
    let meta = FileMeta::new(file_name, region, located.period(file_name), diag);

    Some(AddressOrderFile {
        orders: meta.tag(orders),
        meta,
    })
}
