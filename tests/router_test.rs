#[macro_use]
mod common;

use common::*;
use kari_dashboard::router::{LoadStatus, ParsedBatch};
use kari_dashboard::tags::Region;
use kari_dashboard::{DashboardState, ReportFamily, UploadedFile, classify};

fn scanning_upload(name: &str, store: &str) -> UploadedFile {
    upload(
        name,
        &[(
            "Сканирование",
            vec![
                text_row(&["Регион", "Подразделение", "Магазин", "Коробов всего", "Отсканировано", "% сканирования"]),
                cells!["СПБ", "Север", store, 10.0, 9.0, 0.9],
            ],
        )],
    )
}

fn shipment_upload(name: &str) -> UploadedFile {
    upload(name, &[("Отчет", shipment_summary_rows())])
}

#[test]
fn classification_follows_priority() {
    let cases = [
        ("Сканирование МСК.xlsx", ReportFamily::Scanning),
        ("Приёмка коробов.xlsx", ReportFamily::Scanning),
        ("Ювелирка итоги.xlsx", ReportFamily::Jewelry),
        ("Капсулы март.xlsx", ReportFamily::Capsule),
        ("Аудит ценников.xlsx", ReportFamily::Pricing),
        ("НАПОЛНЕННОСТЬ.xlsx", ReportFamily::Filling),
        ("Адресные заказы.xlsx", ReportFamily::AddressOrders),
        ("Продажи ЮИ неделя.xlsx", ReportFamily::SalesJewelry),
        ("Продажи неделя.xlsx", ReportFamily::Sales),
        ("Отгрузки детские неделя 10.xlsx", ReportFamily::Shipment),
        ("report.xlsx", ReportFamily::Shipment),
    ];
    for (name, family) in cases {
        assert_eq!(classify(name), family, "{name}");
    }
}

#[test]
fn multi_keyword_names_resolve_to_the_earliest_family() {
    // scanning outranks capsule, capsule outranks sales
    assert_eq!(classify("Сканирование капсул.xlsx"), ReportFamily::Scanning);
    assert_eq!(classify("Продажи капсул.xlsx"), ReportFamily::Capsule);
    for _ in 0..3 {
        assert_eq!(classify("Продажи капсул.xlsx"), ReportFamily::Capsule);
    }
}

#[test]
fn shipment_appends_other_families_replace() {
    let mut state = DashboardState::new();

    state.load_files(&[shipment_upload("Отгрузки неделя 10.xlsx"), scanning_upload("Сканирование 1.xlsx", "Магазин 5")]);
    state.load_files(&[shipment_upload("Отгрузки неделя 11.xlsx"), scanning_upload("Сканирование 2.xlsx", "Магазин 6")]);

    assert_eq!(state.shipment_files.len(), 2);
    assert_eq!(state.summary_data().len(), 4);
    assert_eq!(state.region_totals().len(), 2);

    assert_eq!(state.scanning_files.len(), 1);
    assert_eq!(state.scanning_files[0].meta.file_name, "Сканирование 2.xlsx");
    assert_eq!(state.scanning_files[0].stores[0].store.as_deref(), Some("Магазин 6"));
}

#[test]
fn same_batch_files_of_one_family_are_all_kept() {
    let mut state = DashboardState::new();
    let report = state.load_files(&[
        scanning_upload("Сканирование МСК.xlsx", "Магазин 1"),
        scanning_upload("Сканирование СПБ.xlsx", "Магазин 2"),
    ]);
    assert_eq!(report.loaded(), 2);
    assert_eq!(state.scanning_files.len(), 2);
}

#[test]
fn broken_file_does_not_take_siblings_down() {
    let mut state = DashboardState::new();
    let report = state.load_files(&[
        UploadedFile::new("Отгрузки сломанные.xlsx", b"definitely not a workbook".to_vec()),
        shipment_upload("Отгрузки.xlsx"),
        scanning_upload("Сканирование.xlsx", "Магазин 5"),
    ]);

    assert_eq!(report.failed(), 1);
    assert_eq!(report.loaded(), 2);
    assert!(matches!(
        report.outcome("Отгрузки сломанные.xlsx").map(|o| &o.status),
        Some(LoadStatus::Failed { .. })
    ));
    assert_eq!(state.shipment_files.len(), 1);
    assert_eq!(state.scanning_files.len(), 1);
    assert!(report.kept_previous.is_empty());
}

#[test]
fn family_with_no_successful_file_keeps_previous_data() {
    let mut state = DashboardState::new();
    state.load_files(&[scanning_upload("Сканирование 1.xlsx", "Магазин 5")]);

    let wrong_sheet = upload("Сканирование 2.xlsx", &[("Лист1", vec![text_row(&["Регион"])])]);
    let report = state.load_files(&[wrong_sheet]);

    assert_eq!(report.skipped(), 1);
    assert_eq!(report.kept_previous, vec![ReportFamily::Scanning]);
    assert_eq!(state.scanning_files.len(), 1);
    assert_eq!(state.scanning_files[0].meta.file_name, "Сканирование 1.xlsx");
}

#[test]
fn outcomes_report_rows_and_region() {
    let batch = ParsedBatch::parse(&[shipment_upload("Отгрузки.xlsx")]);
    let outcome = batch.report.outcome("Отгрузки.xlsx").unwrap();
    assert_eq!(outcome.family, ReportFamily::Shipment);
    assert_eq!(
        outcome.status,
        LoadStatus::Loaded {
            rows: 3,
            region: Region::Msk
        }
    );

    let json = serde_json::to_value(outcome).unwrap();
    assert_eq!(json["fileName"], "Отгрузки.xlsx");
    assert_eq!(json["family"], "shipment");
    assert_eq!(json["status"], "loaded");
    assert_eq!(json["rows"], 3);
    assert_eq!(json["region"], "MSK");
}

#[test]
fn staged_batch_leaves_state_untouched_until_commit() {
    let mut state = DashboardState::new();
    let batch = ParsedBatch::parse(&[shipment_upload("Отгрузки.xlsx")]);
    assert!(state.shipment_files.is_empty());

    let report = state.commit(batch);
    assert_eq!(report.loaded(), 1);
    assert_eq!(state.shipment_files.len(), 1);
}

#[test]
fn state_serializes_under_family_keys() {
    let mut state = DashboardState::new();
    state.load_files(&[shipment_upload("Отгрузки.xlsx")]);

    let json = serde_json::to_value(&state).unwrap();
    for family in ReportFamily::PRIORITY {
        assert!(json.get(family.state_key()).is_some(), "{family}");
    }
    assert_eq!(json["shipmentFiles"][0]["summary"][0]["_file"], "Отгрузки.xlsx");
    assert_eq!(state.family_json(ReportFamily::AddressOrders).unwrap(), serde_json::json!([]));

    let overview = state.overview();
    assert_eq!(overview.summary_rows, 2);
    assert_eq!(overview.region_totals, 1);
    let shipment = overview
        .families
        .iter()
        .find(|f| f.family == ReportFamily::Shipment)
        .unwrap();
    assert_eq!(shipment.files, vec!["Отгрузки.xlsx".to_string()]);
    assert_eq!(shipment.regions, vec![Region::Msk]);

    state.clear();
    assert!(state.shipment_files.is_empty());
}

#[test]
fn uploaded_xlsx_cells_survive_the_reader() {
    let mut state = DashboardState::new();
    state.load_files(&[shipment_upload("Отгрузки.xlsx")]);
    let row = state.summary_data()[0];
    assert_eq!(row.store, "Магазин 1");
    assert_eq!(row.figures.shipped_pct, Some(80.0));
    assert_eq!(row.region, "МСК");
    assert_eq!(row.figures.ordered, 100.0);
}
