//! Derived views over normalized rows
//!
//! Everything here is a pure function of already-parsed data. Percentages in
//! roll-ups are recomputed from summed parts, never averaged.

use crate::coerce::round2;
use crate::parsers::capsule::CapsuleRow;
use crate::parsers::iz::AddressOrderRow;
use crate::parsers::scanning::ScanningRow;
use crate::parsers::shipment::{RegionTotalRow, ShipmentSummaryRow};
use crate::tags::{HasMeta, Region, Tagged};
use serde::Serialize;
use std::collections::HashMap;
use std::hash::Hash;
use std::str::FromStr;

/// Groups items by key, keeping groups in order of first appearance and
/// items in input order within each group.
pub fn group_by<T, K, F>(items: impl IntoIterator<Item = T>, key: F) -> Vec<(K, Vec<T>)>
where
    K: Eq + Hash + Clone,
    F: Fn(&T) -> K,
{
    let mut index: HashMap<K, usize> = HashMap::new();
    let mut groups: Vec<(K, Vec<T>)> = Vec::new();
    for item in items {
        let k = key(&item);
        match index.get(&k) {
            Some(&i) => groups[i].1.push(item),
            None => {
                index.insert(k.clone(), groups.len());
                groups.push((k, vec![item]));
            }
        }
    }
    groups
}

/// `numerator / denominator` as a percentage; `None` when the denominator is zero.
pub fn percent_of(numerator: f64, denominator: f64) -> Option<f64> {
    (denominator != 0.0).then(|| round2(numerator / denominator * 100.0))
}

/// Running numerator/denominator pair
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Ratio {
    pub numerator: f64,
    pub denominator: f64,
}

impl Ratio {
    pub fn add(&mut self, numerator: f64, denominator: f64) {
        self.numerator += numerator;
        self.denominator += denominator;
    }

    pub fn percent(&self) -> Option<f64> {
        percent_of(self.numerator, self.denominator)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RollupLevel {
    Region,
    Subdivision,
}

impl FromStr for RollupLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "region" | "regions" => Ok(RollupLevel::Region),
            "subdivision" | "subdivisions" => Ok(RollupLevel::Subdivision),
            other => Err(format!("unknown roll-up level '{other}'")),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShipmentRollup {
    pub key: String,
    pub stores: usize,
    pub ordered: f64,
    pub shipped: f64,
    pub shipped_pct: Option<f64>,
    pub accepted: f64,
    pub accepted_pct: Option<f64>,
    pub in_transit: f64,
    pub overdue: f64,
}

pub fn shipment_rollup<'a, I>(rows: I, level: RollupLevel) -> Vec<ShipmentRollup>
where
    I: IntoIterator<Item = &'a ShipmentSummaryRow>,
{
    group_by(rows, |r| match level {
        RollupLevel::Region => r.region.clone(),
        RollupLevel::Subdivision => r.subdivision.clone(),
    })
    .into_iter()
    .map(|(key, group)| {
        let mut shipped = Ratio::default();
        let mut accepted = Ratio::default();
        let (mut in_transit, mut overdue) = (0.0, 0.0);
        for row in &group {
            let f = &row.figures;
            shipped.add(f.shipped, f.ordered);
            accepted.add(f.accepted, f.shipped);
            in_transit += f.in_transit;
            overdue += f.overdue;
        }
        ShipmentRollup {
            key,
            stores: group.len(),
            ordered: shipped.denominator,
            shipped: shipped.numerator,
            shipped_pct: shipped.percent(),
            accepted: accepted.numerator,
            accepted_pct: accepted.percent(),
            in_transit,
            overdue,
        }
    })
    .collect()
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanningRollup {
    pub key: String,
    pub stores: usize,
    pub boxes_total: f64,
    pub scanned: f64,
    pub scanned_pct: Option<f64>,
    pub accepted_on_time: f64,
    pub on_time_pct: Option<f64>,
    pub not_accepted: f64,
}

pub fn scanning_rollup<'a, I>(rows: I, level: RollupLevel) -> Vec<ScanningRollup>
where
    I: IntoIterator<Item = &'a ScanningRow>,
{
    group_by(rows, |r| match level {
        RollupLevel::Region => r.region.clone(),
        RollupLevel::Subdivision => r.subdivision.clone().unwrap_or_default(),
    })
    .into_iter()
    .map(|(key, group)| {
        let mut scanned = Ratio::default();
        let mut on_time = Ratio::default();
        let mut not_accepted = 0.0;
        for row in &group {
            scanned.add(row.scanned, row.boxes_total);
            on_time.add(row.accepted_on_time, row.boxes_total);
            not_accepted += row.not_accepted;
        }
        ScanningRollup {
            key,
            stores: group.len(),
            boxes_total: scanned.denominator,
            scanned: scanned.numerator,
            scanned_pct: scanned.percent(),
            accepted_on_time: on_time.numerator,
            on_time_pct: on_time.percent(),
            not_accepted,
        }
    })
    .collect()
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CapsuleRollup {
    pub subdivision: String,
    pub stores: usize,
    pub planned: f64,
    pub assembled: f64,
    pub assembled_pct: Option<f64>,
    pub availability_pct: Option<f64>,
}

pub fn capsule_by_subdivision<'a, I>(rows: I) -> Vec<CapsuleRollup>
where
    I: IntoIterator<Item = &'a CapsuleRow>,
{
    group_by(rows, |r| r.subdivision.clone())
        .into_iter()
        .map(|(subdivision, group)| {
            let mut assembled = Ratio::default();
            let mut available = Ratio::default();
            for row in &group {
                assembled.add(row.assembled, row.planned);
                available.add(row.available_articles, row.matrix_articles);
            }
            CapsuleRollup {
                subdivision,
                stores: group.len(),
                planned: assembled.denominator,
                assembled: assembled.numerator,
                assembled_pct: assembled.percent(),
                availability_pct: available.percent(),
            }
        })
        .collect()
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreOrders {
    pub store: String,
    pub region: String,
    pub orders: usize,
    pub amount: f64,
    /// Mean over orders that carry a storage duration
    pub avg_days_stored: Option<f64>,
}

pub fn orders_by_store<'a, I>(rows: I) -> Vec<StoreOrders>
where
    I: IntoIterator<Item = &'a AddressOrderRow>,
{
    group_by(rows, |r| r.store.clone())
        .into_iter()
        .map(|(store, group)| {
            let days: Vec<f64> = group.iter().filter_map(|r| r.days_stored).collect();
            StoreOrders {
                region: group.first().map(|r| r.region.clone()).unwrap_or_default(),
                orders: group.len(),
                amount: group.iter().map(|r| r.amount).sum(),
                avg_days_stored: (!days.is_empty())
                    .then(|| round2(days.iter().sum::<f64>() / days.len() as f64)),
                store,
            }
        })
        .collect()
}

/// Region totals for `region`: exact matches if any, otherwise totals that
/// name no specific region.
pub fn region_total_for(totals: &[Tagged<RegionTotalRow>], region: Region) -> Vec<&Tagged<RegionTotalRow>> {
    let exact: Vec<_> = totals.iter().filter(|t| t.region_code == region).collect();
    if !exact.is_empty() {
        return exact;
    }
    totals.iter().filter(|t| t.region_code == Region::All).collect()
}

/// Files tagged with `region` or with [`Region::All`].
pub fn files_for_region<T: HasMeta>(files: &[T], region: Region) -> Vec<&T> {
    files
        .iter()
        .filter(|f| f.meta().region.applies_to(region))
        .collect()
}

/// Rows whose provenance applies to `region`.
pub fn rows_for_region<T>(rows: &[Tagged<T>], region: Region) -> Vec<&Tagged<T>> {
    rows.iter().filter(|r| r.tags.region.applies_to(region)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_by_keeps_first_appearance_order() {
        let groups = group_by(vec![("b", 1), ("a", 2), ("b", 3)], |(k, _)| *k);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].0, "b");
        assert_eq!(groups[0].1, vec![("b", 1), ("b", 3)]);
        assert_eq!(groups[1].1, vec![("a", 2)]);
    }

    #[test]
    fn ratio_handles_zero_denominator() {
        let mut r = Ratio::default();
        assert_eq!(r.percent(), None);
        r.add(1.0, 3.0);
        assert_eq!(r.percent(), Some(33.33));
    }

    #[test]
    fn rollup_level_parses() {
        assert_eq!("Region".parse::<RollupLevel>(), Ok(RollupLevel::Region));
        assert_eq!("subdivisions".parse::<RollupLevel>(), Ok(RollupLevel::Subdivision));
        assert!("store".parse::<RollupLevel>().is_err());
    }
}
