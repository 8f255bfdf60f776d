//! File router and dashboard state
//!
//! Classification is by filename only. Families are tried in a fixed order
//! and the first one whose keywords appear wins; anything unmatched is a
//! shipment report. A batch is parsed in full before any of it touches
//! [`DashboardState`], and each family's slice is swapped in one step.

use crate::error::IngestError;
use crate::loader::{UploadedFile, Workbook, normalize_name};
use crate::parsers::capsule::{self, CapsuleFile};
use crate::parsers::filling::{self, FillingFile};
use crate::parsers::iz::{self, AddressOrderFile};
use crate::parsers::jewelry::{self, JewelryFile};
use crate::parsers::pricing::{self, PricingFile};
use crate::parsers::sales::{self, SalesFile};
use crate::parsers::scanning::{self, ScanningFile};
use crate::parsers::shipment::{self, RegionTotalRow, ShipmentDetailRow, ShipmentFile, ShipmentSummaryRow};
use crate::tags::{HasMeta, Region, Tagged};
use crate::views::group_by;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::str::FromStr;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ReportFamily {
    Scanning,
    Jewelry,
    Capsule,
    Pricing,
    Filling,
    AddressOrders,
    SalesJewelry,
    Sales,
    Shipment,
}

impl ReportFamily {
    /// Classification order. `SalesJewelry` sits ahead of `Sales` because
    /// every jewelry sales filename also says `продаж`.
    pub const PRIORITY: [ReportFamily; 9] = [
        ReportFamily::Scanning,
        ReportFamily::Jewelry,
        ReportFamily::Capsule,
        ReportFamily::Pricing,
        ReportFamily::Filling,
        ReportFamily::AddressOrders,
        ReportFamily::SalesJewelry,
        ReportFamily::Sales,
        ReportFamily::Shipment,
    ];

    /// Keyword groups: the family matches if every keyword of any one group
    /// occurs in the normalized filename. An empty list matches everything.
    fn keywords(self) -> &'static [&'static [&'static str]] {
        match self {
            ReportFamily::Scanning => &[&["сканир"], &["приемк"]],
            ReportFamily::Jewelry => &[&["ювелир"]],
            ReportFamily::Capsule => &[&["капсул"]],
            ReportFamily::Pricing => &[&["ценник"], &["аудит цен"]],
            ReportFamily::Filling => &[&["наполнен"]],
            ReportFamily::AddressOrders => &[&["адресн"]],
            ReportFamily::SalesJewelry => &[&["продаж", "юи"]],
            ReportFamily::Sales => &[&["продаж"]],
            ReportFamily::Shipment => &[],
        }
    }

    fn matches(self, normalized_name: &str) -> bool {
        let groups = self.keywords();
        groups.is_empty()
            || groups
                .iter()
                .any(|group| group.iter().all(|k| normalized_name.contains(k)))
    }

    /// Name of the state slice this family lands in.
    pub fn state_key(self) -> &'static str {
        match self {
            ReportFamily::Scanning => "scanningFiles",
            ReportFamily::Jewelry => "jewelryItogi",
            ReportFamily::Capsule => "capsuleFiles",
            ReportFamily::Pricing => "pricingFiles",
            ReportFamily::Filling => "fillingFiles",
            ReportFamily::AddressOrders => "izFiles",
            ReportFamily::SalesJewelry => "salesYuiFiles",
            ReportFamily::Sales => "salesFiles",
            ReportFamily::Shipment => "shipmentFiles",
        }
    }

    /// Shipment reports accumulate across uploads; every other family is replaced.
    pub fn appends(self) -> bool {
        self == ReportFamily::Shipment
    }
}

impl fmt::Display for ReportFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.state_key())
    }
}

impl FromStr for ReportFamily {
    type Err = String;

    /// Accepts either the state key (`izFiles`) or the family name (`addressOrders`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        ReportFamily::PRIORITY
            .into_iter()
            .find(|f| {
                f.state_key().eq_ignore_ascii_case(wanted)
                    || format!("{f:?}").eq_ignore_ascii_case(wanted)
            })
            .ok_or_else(|| format!("unknown report family '{wanted}'"))
    }
}

/// First family in [`ReportFamily::PRIORITY`] whose keywords match the filename.
pub fn classify(file_name: &str) -> ReportFamily {
    let name = normalize_name(file_name);
    ReportFamily::PRIORITY
        .into_iter()
        .find(|family| family.matches(&name))
        .unwrap_or(ReportFamily::Shipment)
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum LoadStatus {
    Loaded { rows: usize, region: Region },
    /// The parser found none of the sheets it needs.
    Skipped,
    Failed { reason: String },
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileOutcome {
    pub file_name: String,
    pub family: ReportFamily,
    #[serde(flatten)]
    pub status: LoadStatus,
}

/// What happened to every file of one batch, in processing order
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadReport {
    pub files: Vec<FileOutcome>,
    /// Families whose slice was left untouched because no file parsed
    pub kept_previous: Vec<ReportFamily>,
}

impl LoadReport {
    pub fn loaded(&self) -> usize {
        self.count(|s| matches!(s, LoadStatus::Loaded { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|s| matches!(s, LoadStatus::Skipped))
    }

    pub fn failed(&self) -> usize {
        self.count(|s| matches!(s, LoadStatus::Failed { .. }))
    }

    fn count(&self, pred: impl Fn(&LoadStatus) -> bool) -> usize {
        self.files.iter().filter(|f| pred(&f.status)).count()
    }

    pub fn outcome(&self, file_name: &str) -> Option<&FileOutcome> {
        self.files.iter().find(|f| f.file_name == file_name)
    }
}

/// Results of one batch, staged before they are committed to state.
/// `None` means the family had no successful file in this batch.
#[derive(Debug, Default)]
pub struct ParsedBatch {
    pub shipment: Option<Vec<ShipmentFile>>,
    pub scanning: Option<Vec<ScanningFile>>,
    pub jewelry: Option<Vec<JewelryFile>>,
    pub capsule: Option<Vec<CapsuleFile>>,
    pub pricing: Option<Vec<PricingFile>>,
    pub filling: Option<Vec<FillingFile>>,
    pub address_orders: Option<Vec<AddressOrderFile>>,
    pub sales: Option<Vec<SalesFile>>,
    pub sales_jewelry: Option<Vec<SalesFile>>,
    pub report: LoadReport,
}

impl ParsedBatch {
    /// Groups files by family and parses each group in turn, one file at a time.
    pub fn parse(files: &[UploadedFile]) -> Self {
        let mut batch = ParsedBatch::default();
        for (family, group) in group_by(files, |f| classify(&f.name)) {
            log::debug!("{family}: {} file(s) in batch", group.len());
            let outcomes = &mut batch.report.files;
            match family {
                ReportFamily::Shipment => batch.shipment = run_family(family, &group, shipment::parse, outcomes),
                ReportFamily::Scanning => batch.scanning = run_family(family, &group, scanning::parse, outcomes),
                ReportFamily::Jewelry => batch.jewelry = run_family(family, &group, jewelry::parse, outcomes),
                ReportFamily::Capsule => batch.capsule = run_family(family, &group, capsule::parse, outcomes),
                ReportFamily::Pricing => batch.pricing = run_family(family, &group, pricing::parse, outcomes),
                ReportFamily::Filling => batch.filling = run_family(family, &group, filling::parse, outcomes),
                ReportFamily::AddressOrders => batch.address_orders = run_family(family, &group, iz::parse, outcomes),
                ReportFamily::Sales => batch.sales = run_family(family, &group, sales::parse_sales, outcomes),
                ReportFamily::SalesJewelry => {
                    batch.sales_jewelry = run_family(family, &group, sales::parse_sales_jewelry, outcomes)
                }
            }
        }
        batch
    }
}

fn run_family<T: HasMeta>(
    family: ReportFamily,
    files: &[&UploadedFile],
    parse: fn(&Workbook, &str) -> Option<T>,
    outcomes: &mut Vec<FileOutcome>,
) -> Option<Vec<T>> {
    let mut parsed = Vec::new();
    for file in files {
        let status = match parse_one(file, parse) {
            Ok(Some(result)) => {
                let meta = result.meta();
                log::info!(
                    "{family}: parsed '{}' ({} rows, region {}, period {})",
                    file.name,
                    result.row_count(),
                    meta.region,
                    meta.period.as_deref().unwrap_or("-")
                );
                let status = LoadStatus::Loaded {
                    rows: result.row_count(),
                    region: meta.region,
                };
                parsed.push(result);
                status
            }
            Ok(None) => LoadStatus::Skipped,
            Err(err) => LoadStatus::Failed {
                reason: err.to_string(),
            },
        };
        outcomes.push(FileOutcome {
            file_name: file.name.clone(),
            family,
            status,
        });
    }

    if parsed.is_empty() {
        log::warn!("{family}: none of {} file(s) could be parsed, keeping previous data", files.len());
        return None;
    }
    Some(parsed)
}

/// Opens and parses one file. A panic inside the parser is caught here so it
/// only costs this file.
fn parse_one<T>(
    file: &UploadedFile,
    parse: fn(&Workbook, &str) -> Option<T>,
) -> crate::error::Result<Option<T>> {
    let workbook = Workbook::from_bytes(&file.bytes).inspect_err(|err| {
        log::error!("'{}': cannot open workbook: {err}", file.name);
    })?;

    panic::catch_unwind(AssertUnwindSafe(|| parse(&workbook, &file.name))).map_err(|payload| {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string());
        log::warn!("'{}': parser panicked: {message}", file.name);
        IngestError::Parse {
            file: file.name.clone(),
            message,
        }
    })
}

/// Everything parsed so far in this session
#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardState {
    pub shipment_files: Vec<ShipmentFile>,
    pub scanning_files: Vec<ScanningFile>,
    pub jewelry_itogi: Vec<JewelryFile>,
    pub capsule_files: Vec<CapsuleFile>,
    pub pricing_files: Vec<PricingFile>,
    pub filling_files: Vec<FillingFile>,
    pub iz_files: Vec<AddressOrderFile>,
    pub sales_files: Vec<SalesFile>,
    pub sales_yui_files: Vec<SalesFile>,
}

impl DashboardState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses and commits one upload batch.
    pub fn load_files(&mut self, files: &[UploadedFile]) -> LoadReport {
        self.commit(ParsedBatch::parse(files))
    }

    /// Applies a staged batch: shipment files are appended, other families
    /// replace their slice. Families absent from the batch are untouched.
    pub fn commit(&mut self, batch: ParsedBatch) -> LoadReport {
        let mut report = batch.report;
        let attempted: Vec<ReportFamily> = group_by(report.files.iter(), |f| f.family)
            .into_iter()
            .map(|(family, _)| family)
            .collect();

        stage(ReportFamily::Shipment, &mut self.shipment_files, batch.shipment);
        stage(ReportFamily::Scanning, &mut self.scanning_files, batch.scanning);
        stage(ReportFamily::Jewelry, &mut self.jewelry_itogi, batch.jewelry);
        stage(ReportFamily::Capsule, &mut self.capsule_files, batch.capsule);
        stage(ReportFamily::Pricing, &mut self.pricing_files, batch.pricing);
        stage(ReportFamily::Filling, &mut self.filling_files, batch.filling);
        stage(ReportFamily::AddressOrders, &mut self.iz_files, batch.address_orders);
        stage(ReportFamily::Sales, &mut self.sales_files, batch.sales);
        stage(ReportFamily::SalesJewelry, &mut self.sales_yui_files, batch.sales_jewelry);

        report.kept_previous = attempted
            .into_iter()
            .filter(|family| {
                !report
                    .files
                    .iter()
                    .any(|f| f.family == *family && matches!(f.status, LoadStatus::Loaded { .. }))
            })
            .collect();
        report
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Store-level shipment rows of every loaded shipment file.
    pub fn summary_data(&self) -> Vec<&Tagged<ShipmentSummaryRow>> {
        self.shipment_files.iter().flat_map(|f| &f.summary).collect()
    }

    pub fn detail_data(&self) -> Vec<&Tagged<ShipmentDetailRow>> {
        self.shipment_files.iter().flat_map(|f| &f.detail).collect()
    }

    pub fn region_totals(&self) -> Vec<Tagged<RegionTotalRow>> {
        self.shipment_files
            .iter()
            .flat_map(|f| f.region_totals.iter().cloned())
            .collect()
    }

    /// One family's slice as JSON.
    pub fn family_json(&self, family: ReportFamily) -> serde_json::Result<serde_json::Value> {
        match family {
            ReportFamily::Shipment => serde_json::to_value(&self.shipment_files),
            ReportFamily::Scanning => serde_json::to_value(&self.scanning_files),
            ReportFamily::Jewelry => serde_json::to_value(&self.jewelry_itogi),
            ReportFamily::Capsule => serde_json::to_value(&self.capsule_files),
            ReportFamily::Pricing => serde_json::to_value(&self.pricing_files),
            ReportFamily::Filling => serde_json::to_value(&self.filling_files),
            ReportFamily::AddressOrders => serde_json::to_value(&self.iz_files),
            ReportFamily::Sales => serde_json::to_value(&self.sales_files),
            ReportFamily::SalesJewelry => serde_json::to_value(&self.sales_yui_files),
        }
    }

    pub fn overview(&self) -> StateOverview {
        StateOverview {
            families: vec![
                FamilyOverview::of(ReportFamily::Shipment, &self.shipment_files),
                FamilyOverview::of(ReportFamily::Scanning, &self.scanning_files),
                FamilyOverview::of(ReportFamily::Jewelry, &self.jewelry_itogi),
                FamilyOverview::of(ReportFamily::Capsule, &self.capsule_files),
                FamilyOverview::of(ReportFamily::Pricing, &self.pricing_files),
                FamilyOverview::of(ReportFamily::Filling, &self.filling_files),
                FamilyOverview::of(ReportFamily::AddressOrders, &self.iz_files),
                FamilyOverview::of(ReportFamily::Sales, &self.sales_files),
                FamilyOverview::of(ReportFamily::SalesJewelry, &self.sales_yui_files),
            ],
            summary_rows: self.summary_data().len(),
            detail_rows: self.detail_data().len(),
            region_totals: self.shipment_files.iter().map(|f| f.region_totals.len()).sum(),
        }
    }
}

/// Nothing staged leaves the slot as it was.
fn stage<T>(family: ReportFamily, slot: &mut Vec<T>, staged: Option<Vec<T>>) {
    let Some(files) = staged else { return };
    if family.appends() {
        slot.extend(files);
    } else {
        *slot = files;
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FamilyOverview {
    pub family: ReportFamily,
    pub state_key: &'static str,
    pub files: Vec<String>,
    pub rows: usize,
    pub regions: Vec<Region>,
}

impl FamilyOverview {
    fn of<T: HasMeta>(family: ReportFamily, files: &[T]) -> Self {
        let mut regions: Vec<Region> = files.iter().map(|f| f.meta().region).collect();
        regions.sort();
        regions.dedup();
        FamilyOverview {
            family,
            state_key: family.state_key(),
            files: files.iter().map(|f| f.meta().file_name.clone()).collect(),
            rows: files.iter().map(|f| f.row_count()).sum(),
            regions,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StateOverview {
    pub families: Vec<FamilyOverview>,
    pub summary_rows: usize,
    pub detail_rows: usize,
    pub region_totals: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn family_names_round_trip() {
        for family in ReportFamily::PRIORITY {
            assert_eq!(family.state_key().parse::<ReportFamily>(), Ok(family));
        }
        assert_eq!("addressOrders".parse::<ReportFamily>(), Ok(ReportFamily::AddressOrders));
        assert!("nope".parse::<ReportFamily>().is_err());
    }

    #[test]
    fn only_shipment_appends() {
        let appending: Vec<_> = ReportFamily::PRIORITY.into_iter().filter(|f| f.appends()).collect();
        assert_eq!(appending, vec![ReportFamily::Shipment]);
    }

    #[test]
    fn staging_honours_the_merge_policy() {
        let mut slot = vec![1, 2];
        stage(ReportFamily::Shipment, &mut slot, Some(vec![3]));
        assert_eq!(slot, vec![1, 2, 3]);
        stage(ReportFamily::Capsule, &mut slot, Some(vec![4]));
        assert_eq!(slot, vec![4]);
        stage(ReportFamily::Capsule, &mut slot, None);
        assert_eq!(slot, vec![4]);
    }

    fn scanning_bytes(store: &str) -> Vec<u8> {
        let mut workbook = rust_xlsxwriter::Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.set_name("Сканирование").unwrap();
        for (c, title) in ["Регион", "Подразделение", "Магазин", "Коробов всего"].iter().enumerate() {
            sheet.write_string(0, c as u16, *title).unwrap();
        }
        sheet.write_string(1, 0, "МСК").unwrap();
        sheet.write_string(1, 1, "Центр").unwrap();
        sheet.write_string(1, 2, store).unwrap();
        sheet.write_number(1, 3, 10.0).unwrap();
        workbook.save_to_buffer().unwrap()
    }

    fn exploding(_: &Workbook, _: &str) -> Option<ScanningFile> {
        panic!("boom")
    }

    fn explodes_on_broken_names(workbook: &Workbook, file_name: &str) -> Option<ScanningFile> {
        if file_name.contains("сломан") {
            panic!("row index out of range in {file_name}");
        }
        scanning::parse(workbook, file_name)
    }

    #[test]
    fn panicking_parser_fails_its_file() {
        let file = UploadedFile::new("Сканирование.xlsx", scanning_bytes("Магазин 1"));
        let mut outcomes = Vec::new();

        let parsed = run_family(ReportFamily::Scanning, &[&file], exploding, &mut outcomes);

        assert!(parsed.is_none());
        assert_eq!(outcomes.len(), 1);
        match &outcomes[0].status {
            LoadStatus::Failed { reason } => assert!(reason.contains("boom"), "{reason}"),
            other => panic!("expected a failure, got {other:?}"),
        }
    }

    #[test]
    fn panicking_parser_spares_siblings() {
        let broken = UploadedFile::new("Сканирование сломанное.xlsx", scanning_bytes("Магазин 1"));
        let healthy = UploadedFile::new("Сканирование.xlsx", scanning_bytes("Магазин 2"));
        let mut outcomes = Vec::new();

        let parsed = run_family(ReportFamily::Scanning, &[&broken, &healthy], explodes_on_broken_names, &mut outcomes);

        let parsed = parsed.unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].meta.file_name, "Сканирование.xlsx");
        assert!(matches!(outcomes[0].status, LoadStatus::Failed { .. }));
        assert!(matches!(outcomes[1].status, LoadStatus::Loaded { rows: 1, .. }));
    }
}
