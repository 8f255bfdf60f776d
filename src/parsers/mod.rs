//! One parser per report family
//!
//! Every parser has the same shape: `parse(&Workbook, file_name) -> Option<File>`.
//! `None` means the workbook lacks the sheet the parser needs, which is how a
//! misclassified file gets skipped without an error.

pub mod capsule;
pub mod filling;
pub mod iz;
pub mod jewelry;
pub mod pricing;
pub mod sales;
pub mod scanning;
pub mod shipment;

use crate::cell::Cell;
use crate::coerce::Diagnostics;
use crate::locator::{self, HeaderMarker, MarkerSpec, Section, SectionRole};
use crate::sheet::RawSheet;

/// Header text that opens nearly every block in these reports.
pub const REGION_HEADER: &[&str] = &["Регион"];

/// `Регион` in column 0.
pub const REGION_MARKER: MarkerSpec<'static> = MarkerSpec::new(0, REGION_HEADER);

/// A sheet with its header markers already located.
pub(crate) struct LocatedSheet<'s> {
    pub sheet: &'s RawSheet,
    pub markers: Vec<HeaderMarker>,
    pub sections: Vec<Section>,
}

impl<'s> LocatedSheet<'s> {
    pub fn locate(sheet: &'s RawSheet, spec: &MarkerSpec<'_>) -> Self {
        let markers = locator::locate_markers(sheet, spec);
        let sections = locator::split_sections(sheet, &markers);
        log::debug!(
            "sheet '{}': {} header marker(s) at rows {:?}",
            sheet.name,
            markers.len(),
            markers.iter().map(|m| m.row).collect::<Vec<_>>()
        );
        LocatedSheet {
            sheet,
            markers,
            sections,
        }
    }

    pub fn preamble(&self) -> Vec<&'s [Cell]> {
        locator::preamble(self.sheet, &self.markers)
    }

    pub fn period(&self, file_name: &str) -> Option<String> {
        crate::tags::detect_period(&self.preamble(), file_name)
    }

    /// Data rows of every section, each under the role the arity table gives it.
    pub fn rows_by_role(&self, diag: &mut Diagnostics) -> Vec<(SectionRole, Vec<&'s [Cell]>)> {
        let assigned = locator::STORE_FIRST_ARITY.assign(self.sections.clone());
        log::debug!(
            "sheet '{}': section roles {:?}",
            self.sheet.name,
            assigned.iter().map(|(role, _)| *role).collect::<Vec<_>>()
        );
        assigned
            .into_iter()
            .map(|(role, section)| {
                let filter = locator::RowFilter::kari(role.name_column());
                (role, section.rows(self.sheet, &filter, diag))
            })
            .collect()
    }
}

/// Empty text becomes `None`, anything else is kept as-is.
pub(crate) fn non_empty(text: String) -> Option<String> {
    (!text.is_empty()).then_some(text)
}
