/*!
# Kari Dashboard Ingestion

Reads the Excel reports the retail network's logistics, audit and sales teams
send around, and turns them into typed, provenance-tagged rows that the
dashboard's tables, KPI cards and charts are drawn from.

## Overview

None of these reports follow a schema. Header rows sit wherever the author put
them, are repeated at the top of every aggregation block, and share sheets with
totals rows that must not be counted. Percentages arrive as fractions, as
`"82,3%"` strings or as already-scaled numbers; dates arrive as Excel serials
or as text. The library finds the blocks by header text, coerces every cell
into one canonical encoding and tags each row with where it came from.

## Architecture

### Reading
- **loader**: workbook bytes → [`loader::Workbook`] via calamine, one [`sheet::RawSheet`] per tab
- **cell** / **sheet**: the raw cell model and zero-based grid access

### Normalizing
- **coerce**: total conversion functions (number, percentage, date string, trimmed text)
  and the [`coerce::Diagnostics`] counter that records every fallback
- **locator**: header markers, sections, row exclusion and the section-role arity table
- **tags**: region, product group, period type and period detection
- **parsers**: one module per report family

### Serving
- **router**: filename classification, per-file failure containment and the session state
- **views**: roll-ups and region filters computed from normalized rows
- **config**: defaults / environment / command-line settings
- **app** (feature `web`): axum upload service

## Report families

| Family | Sheet(s) | Levels |
|---|---|---|
| Shipment | `Отчет*`, `Детализация*` | stores, region totals, shipment detail |
| Scanning | `Сканирование` | stores, subdivisions, regions |
| Jewelry | `Итоги`, `Невыставленные` | stores, unexposed items |
| Capsule | `Капсулы` | stores |
| Pricing | `Аудит цен` | stores, regions |
| Filling | `Наполненность`, `Наполненность по сезонам` | stores with nested seasons |
| Address orders | `Адресные заказы` / `Заказы` | orders |
| Sales | `Продажи` | stores, subdivisions, regions |
| Sales (jewelry) | `Продажи ЮИ` | stores, subdivisions, regions |

## Usage

```no_run
use kari_dashboard::loader::UploadedFile;
use kari_dashboard::router::DashboardState;

let bytes = std::fs::read("Отгрузки неделя 10.xlsx").unwrap();
let mut state = DashboardState::new();
let report = state.load_files(&[UploadedFile::new("Отгрузки неделя 10.xlsx", bytes)]);
println!("{} loaded, {} summary rows", report.loaded(), state.summary_data().len());
```
*/

pub mod cell;
pub mod coerce;
pub mod config;
pub mod error;
pub mod loader;
pub mod locator;
pub mod parsers;
pub mod router;
pub mod sheet;
pub mod tags;
pub mod views;

#[cfg(feature = "web")]
pub mod app;

pub use cell::Cell;
pub use error::{IngestError, Result};
pub use loader::{UploadedFile, Workbook};
pub use router::{DashboardState, LoadReport, ReportFamily, classify};
pub use sheet::RawSheet;
pub use tags::Region;
