//! Sales (`Продажи`) and jewelry sales (`Продажи ЮИ`)
//!
//! Both sheets share the `Регион | Подразделение | Магазин` prefix followed by
//! a report-specific run of metric columns. Metrics are not given names here:
//! each is kept under its column index with both the coerced display value and
//! the raw number, and a [`ColumnProfile`] says which way its colour scale runs.

use super::{LocatedSheet, REGION_MARKER, non_empty};
use crate::cell::Cell;
use crate::coerce::{Diagnostics, RowReader, to_number, to_percentage, to_trimmed_string};
use crate::loader::Workbook;
use crate::locator::SectionRole;
use crate::tags::{FileMeta, HasMeta, Tagged, detect_region};
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use std::collections::BTreeMap;

/// First column that holds a metric rather than a name.
pub const FIRST_METRIC_COLUMN: usize = 3;

mod col {
    pub const REGION: usize = 0;
    pub const SUBDIVISION: usize = 1;
    pub const STORE: usize = 2;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SalesKind {
    Sales,
    Jewelry,
}

impl SalesKind {
    pub fn sheet(self) -> &'static str {
        match self {
            SalesKind::Sales => "Продажи",
            SalesKind::Jewelry => "Продажи ЮИ",
        }
    }

    pub fn profile(self) -> &'static ColumnProfile {
        match self {
            SalesKind::Sales => &SALES_PROFILE,
            SalesKind::Jewelry => &SALES_JEWELRY_PROFILE,
        }
    }
}

/// Direction of the colour scale for a metric column
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Gradient {
    HigherIsBetter,
    HigherIsWorse,
    Neutral,
}

/// Fixed per-report lookup of column semantics
#[derive(Debug)]
pub struct ColumnProfile {
    pub better: &'static [usize],
    pub worse: &'static [usize],
    pub percent: &'static [usize],
}

/// Выручка, План, % плана, Выручка ПГ, LFL %, Чеков, Средний чек, UPT,
/// Конверсия %, Возвраты, % возвратов, Скидка %
pub const SALES_PROFILE: ColumnProfile = ColumnProfile {
    better: &[3, 5, 7, 8, 9, 10, 11],
    worse: &[12, 13, 14],
    percent: &[5, 7, 11, 13, 14],
};

/// Выручка, Штук, Средняя цена, % плана, Доля ЮИ %, Возвраты шт, % возвратов, Скидка %
pub const SALES_JEWELRY_PROFILE: ColumnProfile = ColumnProfile {
    better: &[3, 4, 5, 6, 7],
    worse: &[8, 9, 10],
    percent: &[6, 7, 9, 10],
};

impl ColumnProfile {
    pub fn gradient(&self, index: usize) -> Gradient {
        if self.better.contains(&index) {
            Gradient::HigherIsBetter
        } else if self.worse.contains(&index) {
            Gradient::HigherIsWorse
        } else {
            Gradient::Neutral
        }
    }

    pub fn is_percent(&self, index: usize) -> bool {
        self.percent.contains(&index)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SalesColumn {
    pub index: usize,
    pub header: String,
    pub gradient: Gradient,
    pub percent: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MetricValue {
    Number(f64),
    Text(String),
}

/// One metric cell: what to display and what the colour scale is computed from.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct MetricCell {
    pub raw: Option<f64>,
    pub value: Option<MetricValue>,
}

impl MetricCell {
    fn read(cell: &Cell, percent: bool) -> Self {
        let raw = to_number(cell);
        let value = if percent {
            to_percentage(cell).map(MetricValue::Number)
        } else {
            raw.map(MetricValue::Number)
        }
        .or_else(|| non_empty(to_trimmed_string(cell)).map(MetricValue::Text));
        MetricCell { raw, value }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct SalesRow {
    pub level: SectionRole,
    pub region: String,
    pub subdivision: Option<String>,
    pub store: Option<String>,
    pub metrics: BTreeMap<usize, MetricCell>,
}

impl SalesRow {
    pub fn metric(&self, index: usize) -> Option<&MetricCell> {
        self.metrics.get(&index)
    }
}

// Metrics go out flat as `c{i}` (display) and `_c{i}` (raw) keys.
impl Serialize for SalesRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(4 + 2 * self.metrics.len()))?;
        map.serialize_entry("level", &self.level)?;
        map.serialize_entry("region", &self.region)?;
        map.serialize_entry("subdivision", &self.subdivision)?;
        map.serialize_entry("store", &self.store)?;
        for (index, cell) in &self.metrics {
            map.serialize_entry(&format!("c{index}"), &cell.value)?;
            map.serialize_entry(&format!("_c{index}"), &cell.raw)?;
        }
        map.end()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SalesFile {
    pub meta: FileMeta,
    pub kind: SalesKind,
    pub columns: Vec<SalesColumn>,
    pub stores: Vec<Tagged<SalesRow>>,
    pub subdivisions: Vec<Tagged<SalesRow>>,
    pub regions: Vec<Tagged<SalesRow>>,
}

impl HasMeta for SalesFile {
    fn meta(&self) -> &FileMeta {
        &self.meta
    }

    fn row_count(&self) -> usize {
        self.stores.len() + self.subdivisions.len() + self.regions.len()
    }
}

pub fn parse_sales(workbook: &Workbook, file_name: &str) -> Option<SalesFile> {
    parse(workbook, file_name, SalesKind::Sales)
}

pub fn parse_sales_jewelry(workbook: &Workbook, file_name: &str) -> Option<SalesFile> {
    parse(workbook, file_name, SalesKind::Jewelry)
}

pub fn parse(workbook: &Workbook, file_name: &str, kind: SalesKind) -> Option<SalesFile> {
    let Some(sheet) = workbook.sheet(kind.sheet()) else {
        log::warn!("'{file_name}': sheet '{}' not found", kind.sheet());
        return None;
    };

    let located = LocatedSheet::locate(sheet, &REGION_MARKER);
    let profile = kind.profile();
    let columns = located
        .sections
        .first()
        .map(|s| metric_columns(s.header(sheet), profile))
        .unwrap_or_default();

    let mut diag = Diagnostics::default();
    let mut stores = Vec::new();
    let mut subdivisions = Vec::new();
    let mut regions = Vec::new();
    for (role, rows) in located.rows_by_role(&mut diag) {
        let target = match role {
            SectionRole::Stores => &mut stores,
            SectionRole::Subdivisions => &mut subdivisions,
            SectionRole::Regions => &mut regions,
        };
        for cells in rows {
            target.push(read_row(role, cells, &columns, &mut diag));
        }
    }

    let region = detect_region(
        stores
            .iter()
            .chain(&subdivisions)
            .chain(&regions)
            .map(|r: &SalesRow| r.region.as_str()),
    );
    let meta = FileMeta::new(file_name, region, located.period(file_name), diag);

    Some(SalesFile {
        kind,
        columns,
        stores: meta.tag(stores),
        subdivisions: meta.tag(subdivisions),
        regions: meta.tag(regions),
        meta,
    })
}

/// Every column from [`FIRST_METRIC_COLUMN`] on whose header cell is filled in.
pub fn metric_columns(header: &[Cell], profile: &ColumnProfile) -> Vec<SalesColumn> {
    header
        .iter()
        .enumerate()
        .skip(FIRST_METRIC_COLUMN)
        .filter_map(|(index, cell)| {
            let text = cell.as_text().filter(|t| !t.is_empty())?;
            Some(SalesColumn {
                index,
                header: text.to_string(),
                gradient: profile.gradient(index),
                percent: profile.is_percent(index),
            })
        })
        .collect()
}

fn read_row(
    level: SectionRole,
    cells: &[Cell],
    columns: &[SalesColumn],
    diag: &mut Diagnostics,
) -> SalesRow {
    let mut r = RowReader::new(cells, diag);
    let metrics = columns
        .iter()
        .map(|column| {
            let cell = r.cell(column.index);
            r.track_number(column.index);
            (column.index, MetricCell::read(cell, column.percent))
        })
        .collect();
    SalesRow {
        level,
        region: r.text(col::REGION),
        subdivision: non_empty(r.text(col::SUBDIVISION)),
        store: non_empty(r.text(col::STORE)),
        metrics,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gradient_lookup() {
        assert_eq!(SALES_PROFILE.gradient(3), Gradient::HigherIsBetter);
        assert_eq!(SALES_PROFILE.gradient(13), Gradient::HigherIsWorse);
        assert_eq!(SALES_PROFILE.gradient(4), Gradient::Neutral);
        assert!(SALES_JEWELRY_PROFILE.is_percent(9));
        assert!(!SALES_JEWELRY_PROFILE.is_percent(8));
    }

    #[test]
    fn metric_cell_keeps_raw_and_display() {
        let pct = MetricCell::read(&Cell::Number(0.5), true);
        assert_eq!(pct.raw, Some(0.5));
        assert_eq!(pct.value, Some(MetricValue::Number(50.0)));

        let text = MetricCell::read(&Cell::from("н/д"), false);
        assert_eq!(text.raw, None);
        assert_eq!(text.value, Some(MetricValue::Text("н/д".into())));

        assert_eq!(MetricCell::read(&Cell::Empty, false), MetricCell::default());
    }

    #[test]
    fn row_serializes_indexed_keys() {
        let mut metrics = BTreeMap::new();
        metrics.insert(
            5,
            MetricCell {
                raw: Some(0.97),
                value: Some(MetricValue::Number(97.0)),
            },
        );
        let row = SalesRow {
            level: SectionRole::Stores,
            region: "МСК".into(),
            subdivision: None,
            store: Some("Магазин 1".into()),
            metrics,
        };
        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(json["c5"], 97.0);
        assert_eq!(json["_c5"], 0.97);
        assert_eq!(json["level"], "stores");
    }
}
