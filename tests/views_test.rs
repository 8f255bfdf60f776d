#[macro_use]
mod common;

use common::*;
use kari_dashboard::parsers::{capsule, iz, scanning, shipment};
use kari_dashboard::tags::Region;
use kari_dashboard::views::{
    RollupLevel, capsule_by_subdivision, files_for_region, orders_by_store, region_total_for, rows_for_region,
    scanning_rollup, shipment_rollup,
};

fn combined_shipment() -> shipment::ShipmentFile {
    let rows = vec![
        text_row(&SHIPMENT_HEADER),
        shipment_row("МСК", "Центр", "Магазин 1", 100.0, 80.0, 60.0),
        shipment_row("МСК", "Юг", "Магазин 2", 50.0, 50.0, 25.0),
        shipment_row("СПБ", "Север", "Магазин 7", 10.0, 10.0, 10.0),
        cells!["МСК", "", "ИТОГО", 150.0, 130.0, 0.8667, 85.0, 0.6538, 45.0, 0.0],
        cells!["СПБ", "", "ИТОГО", 10.0, 10.0, 1.0, 10.0, 1.0, 0.0, 0.0],
        cells!["", "", "ИТОГО", 160.0, 140.0, 0.875, 95.0, 0.6786, 45.0, 0.0],
    ];
    let wb = workbook(vec![sheet("Отчет", rows)]);
    shipment::parse(&wb, "Отгрузки.xlsx").unwrap()
}

#[test]
fn shipment_rollup_recomputes_percentages_from_sums() {
    let file = combined_shipment();
    let by_region = shipment_rollup(file.summary.iter().map(|t| &t.row), RollupLevel::Region);

    assert_eq!(by_region.len(), 2);
    let msk = &by_region[0];
    assert_eq!(msk.key, "МСК");
    assert_eq!(msk.stores, 2);
    assert_eq!(msk.ordered, 150.0);
    assert_eq!(msk.shipped, 130.0);
    // 130 / 150, not the mean of 80% and 100%
    assert_eq!(msk.shipped_pct, Some(86.67));
    assert_eq!(msk.accepted_pct, Some(65.38));
    assert_eq!(msk.in_transit, 45.0);
    assert_eq!(by_region[1].shipped_pct, Some(100.0));

    let by_subdivision = shipment_rollup(file.summary.iter().map(|t| &t.row), RollupLevel::Subdivision);
    let keys: Vec<&str> = by_subdivision.iter().map(|r| r.key.as_str()).collect();
    assert_eq!(keys, vec!["Центр", "Юг", "Север"]);
}

#[test]
fn region_totals_fall_back_to_unlabelled_rows() {
    let file = combined_shipment();
    assert_eq!(file.region_totals.len(), 3);

    let msk = region_total_for(&file.region_totals, Region::Msk);
    assert_eq!(msk.len(), 1);
    assert_eq!(msk[0].figures.shipped, 130.0);

    let all = region_total_for(&file.region_totals, Region::All);
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].figures.ordered, 160.0);

    let only_unlabelled = vec![file.region_totals[2].clone()];
    let spb = region_total_for(&only_unlabelled, Region::Spb);
    assert_eq!(spb.len(), 1);
    assert_eq!(spb[0].region_code, Region::All);
}

#[test]
fn region_filters_include_combined_files() {
    let msk_rows = vec![text_row(&SHIPMENT_HEADER), shipment_row("МСК", "Центр", "Магазин 1", 1.0, 1.0, 1.0)];
    let spb_rows = vec![text_row(&SHIPMENT_HEADER), shipment_row("СПБ", "Север", "Магазин 7", 1.0, 1.0, 1.0)];
    let files = vec![
        shipment::parse(&workbook(vec![sheet("Отчет", msk_rows)]), "Отгрузки МСК.xlsx").unwrap(),
        shipment::parse(&workbook(vec![sheet("Отчет", spb_rows)]), "Отгрузки СПБ.xlsx").unwrap(),
        combined_shipment(),
    ];

    let names = |region| -> Vec<String> {
        files_for_region(&files, region)
            .into_iter()
            .map(|f| f.meta.file_name.clone())
            .collect()
    };
    assert_eq!(names(Region::Msk), vec!["Отгрузки МСК.xlsx", "Отгрузки.xlsx"]);
    assert_eq!(names(Region::Spb), vec!["Отгрузки СПБ.xlsx", "Отгрузки.xlsx"]);
    assert_eq!(names(Region::All).len(), 3);

    assert_eq!(rows_for_region(&files[0].summary, Region::Spb).len(), 0);
    assert_eq!(rows_for_region(&files[2].summary, Region::Spb).len(), 3);
}

#[test]
fn scanning_rollup_by_subdivision() {
    let rows = vec![
        text_row(&["Регион", "Подразделение", "Магазин"]),
        cells!["МСК", "Центр", "Магазин 1", 10.0, 5.0, 0.5, 5.0, 0.5, 5.0],
        cells!["МСК", "Центр", "Магазин 2", 30.0, 30.0, 1.0, 15.0, 0.5, 0.0],
    ];
    let file = scanning::parse(&workbook(vec![sheet("Сканирование", rows)]), "Сканирование.xlsx").unwrap();
    let rollup = scanning_rollup(file.stores.iter().map(|t| &t.row), RollupLevel::Subdivision);

    assert_eq!(rollup.len(), 1);
    assert_eq!(rollup[0].key, "Центр");
    assert_eq!(rollup[0].boxes_total, 40.0);
    assert_eq!(rollup[0].scanned_pct, Some(87.5));
    assert_eq!(rollup[0].on_time_pct, Some(50.0));
    assert_eq!(rollup[0].not_accepted, 5.0);
}

#[test]
fn capsule_rollup_skips_empty_denominators() {
    let rows = vec![
        text_row(&["Регион", "Подразделение", "Магазин"]),
        cells!["МСК", "Центр", "Магазин 1", 4.0, 3.0, 0.75, 0.0, 0.0, ""],
        cells!["МСК", "Центр", "Магазин 2", 4.0, 4.0, 1.0, 0.0, 0.0, ""],
    ];
    let file = capsule::parse(&workbook(vec![sheet("Капсулы", rows)]), "Капсулы.xlsx").unwrap();
    let rollup = capsule_by_subdivision(file.stores.iter().map(|t| &t.row));

    assert_eq!(rollup.len(), 1);
    assert_eq!(rollup[0].stores, 2);
    assert_eq!(rollup[0].assembled_pct, Some(87.5));
    assert_eq!(rollup[0].availability_pct, None);
}

#[test]
fn orders_grouped_per_store() {
    let rows = vec![
        text_row(&["Регион", "Магазин"]),
        cells!["МСК", "Магазин 1", 1.0, "", "", "", "Выдан", 1000.0, 2.0],
        cells!["МСК", "Магазин 1", 2.0, "", "", "", "Ожидает", 500.0, ""],
        cells!["МСК", "Магазин 3", 3.0, "", "", "", "Ожидает", 250.0, 5.0],
        cells!["МСК", "Магазин 1", 4.0, "", "", "", "Выдан", 500.0, 3.0],
    ];
    let file = iz::parse(&workbook(vec![sheet("Адресные заказы", rows)]), "Адресные заказы.xlsx").unwrap();
    let stores = orders_by_store(file.orders.iter().map(|t| &t.row));

    assert_eq!(stores.len(), 2);
    assert_eq!(stores[0].store, "Магазин 1");
    assert_eq!(stores[0].orders, 3);
    assert_eq!(stores[0].amount, 2000.0);
    assert_eq!(stores[0].avg_days_stored, Some(2.5));
    assert_eq!(stores[1].avg_days_stored, Some(5.0));
}
