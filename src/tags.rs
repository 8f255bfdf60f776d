//! Provenance tags attached to every parsed file and row.

use crate::coerce::Diagnostics;
use crate::loader::normalize_name;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

lazy_static! {
    static ref PERIOD_RANGE: Regex =
        Regex::new(r"(\d{2}\.\d{2}\.\d{4})\s*(?:-|–|—|по)\s*(\d{2}\.\d{2}\.\d{4})").unwrap();
    static ref SINGLE_DATE: Regex = Regex::new(r"\d{2}\.\d{2}\.\d{4}").unwrap();
}

/// Operating region a file or row belongs to
///
/// `All` covers combined files as well as files that mention no known region;
/// views treat it as applicable to either region. An alias only counts at the
/// start of a word, so `ТОМСК` or `ОМСК` never reads as Moscow.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Region {
    #[serde(rename = "MSK")]
    Msk,
    #[serde(rename = "SPB")]
    Spb,
    #[serde(rename = "ALL")]
    All,
}

impl Region {
    /// Uppercase substrings that identify a region in free text.
    pub fn aliases(self) -> &'static [&'static str] {
        match self {
            Region::Msk => &["МСК", "МОСКВ", "MSK"],
            Region::Spb => &["СПБ", "ПЕТЕРБУРГ", "SPB"],
            Region::All => &[],
        }
    }

    /// Whether an upper-cased text has a word starting with one of the aliases.
    fn is_named_in(self, upper: &str) -> bool {
        upper
            .split(|c: char| !c.is_alphanumeric())
            .any(|word| self.aliases().iter().any(|alias| word.starts_with(alias)))
    }

    pub fn code(self) -> &'static str {
        match self {
            Region::Msk => "MSK",
            Region::Spb => "SPB",
            Region::All => "ALL",
        }
    }

    /// Whether data tagged `self` should show up in the view for `view`.
    pub fn applies_to(self, view: Region) -> bool {
        self == view || self == Region::All || view == Region::All
    }

    /// The specific region a single text mentions, if exactly one.
    pub fn mentioned_in(text: &str) -> Option<Region> {
        let upper = text.to_uppercase();
        let msk = Region::Msk.is_named_in(&upper);
        let spb = Region::Spb.is_named_in(&upper);
        match (msk, spb) {
            (true, false) => Some(Region::Msk),
            (false, true) => Some(Region::Spb),
            _ => None,
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Region {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "MSK" | "МСК" => Ok(Region::Msk),
            "SPB" | "СПБ" => Ok(Region::Spb),
            "ALL" | "" => Ok(Region::All),
            other => Err(format!("unknown region '{other}'")),
        }
    }
}

/// Tags a whole file from the region-like values of its rows
///
/// A file whose rows mention only one region gets that region; a combined
/// file, or one that mentions none, gets [`Region::All`].
pub fn detect_region<'a, I>(values: I) -> Region
where
    I: IntoIterator<Item = &'a str>,
{
    let mut msk = false;
    let mut spb = false;
    for value in values {
        let upper = value.to_uppercase();
        msk |= Region::Msk.is_named_in(&upper);
        spb |= Region::Spb.is_named_in(&upper);
        if msk && spb {
            break;
        }
    }
    match (msk, spb) {
        (true, false) => Region::Msk,
        (false, true) => Region::Spb,
        _ => Region::All,
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProductGroup {
    #[default]
    Main,
    Kids,
}

const KIDS_KEYWORDS: &[&str] = &["детск", "дети", "kids"];

impl ProductGroup {
    pub fn from_file_name(file_name: &str) -> Self {
        let name = normalize_name(file_name);
        if KIDS_KEYWORDS.iter().any(|k| name.contains(k)) {
            ProductGroup::Kids
        } else {
            ProductGroup::Main
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PeriodType {
    Daily,
    Weekly,
    Monthly,
    #[default]
    Unknown,
}

impl PeriodType {
    pub fn from_file_name(file_name: &str) -> Self {
        let name = normalize_name(file_name);
        let has = |keys: &[&str]| keys.iter().any(|k| name.contains(k));
        if has(&["недел", "week"]) {
            PeriodType::Weekly
        } else if has(&["месяц", "month"]) {
            PeriodType::Monthly
        } else if has(&["день", "дневн", "daily"]) {
            PeriodType::Daily
        } else {
            PeriodType::Unknown
        }
    }
}

/// Finds a reporting period like `01.03.2024 - 07.03.2024` in free text.
pub fn find_period(text: &str) -> Option<String> {
    if let Some(caps) = PERIOD_RANGE.captures(text) {
        return Some(format!("{} - {}", &caps[1], &caps[2]));
    }
    SINGLE_DATE.find(text).map(|m| m.as_str().to_string())
}

/// Period from the rows above the first header (title block), then from the filename.
pub fn detect_period(preamble: &[&[crate::cell::Cell]], file_name: &str) -> Option<String> {
    preamble
        .iter()
        .flat_map(|row| row.iter())
        .filter_map(|cell| cell.as_text())
        .find_map(find_period)
        .or_else(|| find_period(file_name))
}

/// Row-level provenance, serialized next to the row's own fields
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Provenance {
    #[serde(rename = "_file")]
    pub file_name: String,
    #[serde(rename = "_productGroup")]
    pub product_group: ProductGroup,
    #[serde(rename = "_reportType")]
    pub report_type: PeriodType,
    #[serde(rename = "_region")]
    pub region: Region,
}

/// A normalized row plus its provenance
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Tagged<T> {
    #[serde(flatten)]
    pub row: T,
    #[serde(flatten)]
    pub tags: Provenance,
}

impl<T> std::ops::Deref for Tagged<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.row
    }
}

/// Per-file metadata common to every report family
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileMeta {
    pub file_name: String,
    pub region: Region,
    pub period: Option<String>,
    pub report_type: PeriodType,
    pub product_group: ProductGroup,
    pub diagnostics: Diagnostics,
}

impl FileMeta {
    pub fn new(file_name: &str, region: Region, period: Option<String>, diagnostics: Diagnostics) -> Self {
        FileMeta {
            file_name: file_name.to_string(),
            region,
            period,
            report_type: PeriodType::from_file_name(file_name),
            product_group: ProductGroup::from_file_name(file_name),
            diagnostics,
        }
    }

    pub fn provenance(&self) -> Provenance {
        Provenance {
            file_name: self.file_name.clone(),
            product_group: self.product_group,
            report_type: self.report_type,
            region: self.region,
        }
    }

    /// Wraps rows with this file's provenance.
    pub fn tag<T>(&self, rows: Vec<T>) -> Vec<Tagged<T>> {
        let tags = self.provenance();
        rows.into_iter()
            .map(|row| Tagged {
                row,
                tags: tags.clone(),
            })
            .collect()
    }
}

/// Implemented by every parsed-file type so views can filter files generically.
pub trait HasMeta {
    fn meta(&self) -> &FileMeta;

    /// Normalized rows across all aggregation levels of the file.
    fn row_count(&self) -> usize;
}
