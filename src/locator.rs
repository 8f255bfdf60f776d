//! Header/section locator
//!
//! Reports in this domain have no schema. A sheet is a sequence of blocks, each
//! opened by a repeated header row, and the only way to find the blocks is to
//! look for the header text. [`MarkerSpec`] says what a header row looks like,
//! [`locate_markers`] finds all of them, [`split_sections`] turns them into row
//! ranges and [`ArityTable`] decides which aggregation level each range holds.

use crate::cell::Cell;
use crate::coerce::Diagnostics;
use crate::sheet::RawSheet;
use serde::Serialize;

/// Names that mark totals or repeated header rows in Kari reports.
pub const KARI_SENTINELS: &[&str] = &["ИТОГО", "Kari", "КОМПАНИЯ", "РЕГИОН", "ИМ"];
pub const KARI_SENTINEL_PREFIXES: &[&str] = &["ИТОГО "];

/// Declarative description of a header row
///
/// A row matches when the cell in `column` equals one of `values` and every
/// `(column, values)` pair in `also` matches as well. Comparison is exact after
/// trimming.
#[derive(Clone, Copy, Debug)]
pub struct MarkerSpec<'a> {
    pub column: usize,
    pub values: &'a [&'a str],
    pub also: &'a [(usize, &'a [&'a str])],
}

impl<'a> MarkerSpec<'a> {
    pub const fn new(column: usize, values: &'a [&'a str]) -> Self {
        MarkerSpec {
            column,
            values,
            also: &[],
        }
    }

    pub const fn with_columns(
        column: usize,
        values: &'a [&'a str],
        also: &'a [(usize, &'a [&'a str])],
    ) -> Self {
        MarkerSpec {
            column,
            values,
            also,
        }
    }

    /// The matched marker text if `row` is a header row.
    pub fn matches(&self, row: &[Cell]) -> Option<&'a str> {
        let matched = cell_matches(row, self.column, self.values)?;
        self.also
            .iter()
            .all(|(col, values)| cell_matches(row, *col, values).is_some())
            .then_some(matched)
    }
}

fn cell_matches<'a>(row: &[Cell], column: usize, values: &'a [&'a str]) -> Option<&'a str> {
    let text = row.get(column)?.as_text()?;
    values.iter().copied().find(|v| *v == text)
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HeaderMarker {
    pub row: usize,
    pub column: usize,
    pub matched: String,
}

/// Every header row in the sheet, top to bottom. The scan never stops early.
pub fn locate_markers(sheet: &RawSheet, spec: &MarkerSpec<'_>) -> Vec<HeaderMarker> {
    sheet
        .rows()
        .enumerate()
        .filter_map(|(row, cells)| {
            spec.matches(cells).map(|matched| HeaderMarker {
                row,
                column: spec.column,
                matched: matched.to_string(),
            })
        })
        .collect()
}

/// Header rows for several specs at once, tagged with the index of the spec
/// that matched. A row matching more than one spec is claimed by the first.
pub fn locate_any(sheet: &RawSheet, specs: &[MarkerSpec<'_>]) -> Vec<(usize, HeaderMarker)> {
    sheet
        .rows()
        .enumerate()
        .filter_map(|(row, cells)| {
            specs.iter().enumerate().find_map(|(idx, spec)| {
                spec.matches(cells).map(|matched| {
                    (
                        idx,
                        HeaderMarker {
                            row,
                            column: spec.column,
                            matched: matched.to_string(),
                        },
                    )
                })
            })
        })
        .collect()
}

/// Data rows that follow one header row: `start..end`, `end` exclusive
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Section {
    pub header_row: usize,
    pub start: usize,
    pub end: usize,
}

impl Section {
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn header<'s>(&self, sheet: &'s RawSheet) -> &'s [Cell] {
        sheet.row(self.header_row)
    }

    /// Rows of the section that are not entirely blank.
    pub fn non_empty_rows<'s>(&self, sheet: &'s RawSheet, diag: &mut Diagnostics) -> Vec<&'s [Cell]> {
        (self.start..self.end)
            .map(|r| sheet.row(r))
            .filter(|row| {
                let blank = row.iter().all(Cell::is_blank);
                if blank {
                    diag.empty_rows += 1;
                }
                !blank
            })
            .collect()
    }

    /// Rows that survive the row-exclusion rule for this report family.
    pub fn rows<'s>(
        &self,
        sheet: &'s RawSheet,
        filter: &RowFilter<'_>,
        diag: &mut Diagnostics,
    ) -> Vec<&'s [Cell]> {
        self.non_empty_rows(sheet, diag)
            .into_iter()
            .filter(|row| {
                let keep = filter.keeps(row);
                if !keep {
                    diag.sentinel_rows += 1;
                }
                keep
            })
            .collect()
    }
}

/// Splits a sheet into one section per marker; the last runs to the end of the sheet.
pub fn split_sections(sheet: &RawSheet, markers: &[HeaderMarker]) -> Vec<Section> {
    markers
        .iter()
        .enumerate()
        .map(|(i, marker)| Section {
            header_row: marker.row,
            start: marker.row + 1,
            end: markers.get(i + 1).map_or(sheet.height(), |next| next.row),
        })
        .collect()
}

/// Rows above the first marker (report title, period, filters).
pub fn preamble<'s>(sheet: &'s RawSheet, markers: &[HeaderMarker]) -> Vec<&'s [Cell]> {
    let end = markers.first().map_or(0, |m| m.row);
    sheet.rows().take(end).collect()
}

/// Row-exclusion rule: which column names the entity and which names are not entities
#[derive(Clone, Copy, Debug)]
pub struct RowFilter<'a> {
    pub name_column: usize,
    pub sentinels: &'a [&'a str],
    pub sentinel_prefixes: &'a [&'a str],
}

impl RowFilter<'static> {
    pub const fn kari(name_column: usize) -> Self {
        RowFilter {
            name_column,
            sentinels: KARI_SENTINELS,
            sentinel_prefixes: KARI_SENTINEL_PREFIXES,
        }
    }
}

impl RowFilter<'_> {
    /// Case-sensitive sentinel check on one name.
    pub fn is_sentinel(&self, name: &str) -> bool {
        self.sentinels.contains(&name) || self.sentinel_prefixes.iter().any(|p| name.starts_with(p))
    }

    /// A row is kept when its name column holds a non-sentinel value.
    pub fn keeps(&self, row: &[Cell]) -> bool {
        let name = row
            .get(self.name_column)
            .map(crate::coerce::to_trimmed_string)
            .unwrap_or_default();
        !name.is_empty() && !self.is_sentinel(&name)
    }
}

/// Aggregation level a section holds
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SectionRole {
    Stores,
    Subdivisions,
    Regions,
}

impl SectionRole {
    /// Name column in the common `Регион | Подразделение | Магазин` layout.
    pub fn name_column(self) -> usize {
        match self {
            SectionRole::Stores => 2,
            SectionRole::Subdivisions => 1,
            SectionRole::Regions => 0,
        }
    }
}

/// Maps the number of sections found to the role of each, in sheet order
#[derive(Clone, Copy, Debug)]
pub struct ArityTable(pub &'static [&'static [SectionRole]]);

/// Stores only; stores then regions; stores, subdivisions, regions.
pub const STORE_FIRST_ARITY: ArityTable = ArityTable(&[
    &[SectionRole::Stores],
    &[SectionRole::Stores, SectionRole::Regions],
    &[
        SectionRole::Stores,
        SectionRole::Subdivisions,
        SectionRole::Regions,
    ],
]);

impl ArityTable {
    /// Roles for `count` sections; beyond the table the largest mapping is used.
    pub fn roles(&self, count: usize) -> &'static [SectionRole] {
        if count == 0 {
            return &[];
        }
        match self.0.get(count - 1) {
            Some(roles) => roles,
            None => {
                log::warn!(
                    "{count} header blocks found, only {} have a known meaning",
                    self.0.len()
                );
                self.0.last().copied().unwrap_or(&[])
            }
        }
    }

    /// Pairs each section with its role; sections without a role are dropped.
    pub fn assign(&self, sections: Vec<Section>) -> Vec<(SectionRole, Section)> {
        let roles = self.roles(sections.len());
        roles.iter().copied().zip(sections).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multi_column_spec_needs_all_columns() {
        const STORE: MarkerSpec<'static> =
            MarkerSpec::with_columns(0, &["Регион"], &[(1, &["Магазин"])]);
        let yes = vec![Cell::from("Регион"), Cell::from("Магазин")];
        let no = vec![Cell::from("Регион"), Cell::from("Проверено ценников")];
        assert_eq!(STORE.matches(&yes), Some("Регион"));
        assert_eq!(STORE.matches(&no), None);
    }

    #[test]
    fn sentinel_rules() {
        let f = RowFilter::kari(0);
        assert!(f.is_sentinel("ИТОГО"));
        assert!(f.is_sentinel("ИТОГО МСК"));
        assert!(f.is_sentinel("Kari"));
        assert!(!f.is_sentinel("итого"));
        assert!(!f.is_sentinel("ИТОГОВЫЙ"));
        assert!(!f.keeps(&[Cell::Empty, Cell::from("x")]));
    }

    #[test]
    fn arity_beyond_table_uses_largest() {
        assert_eq!(STORE_FIRST_ARITY.roles(0).len(), 0);
        assert_eq!(STORE_FIRST_ARITY.roles(2), &[SectionRole::Stores, SectionRole::Regions]);
        assert_eq!(STORE_FIRST_ARITY.roles(5).len(), 3);
    }
}
