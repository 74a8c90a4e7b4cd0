//! Commodity grouping.
//!
//! A commodity is the set of vehicles sharing a destination dealer and a due
//! day; it is the unit the sequential solver works through. The processing
//! order is a documented knob: earlier-due commodities grab shared truck
//! capacity first, which is why ascending order is the default.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use vlt_core::{Day, Location, Vehicle};

/// Canonical commodity key: due day, then dealer code.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CommodityKey {
    pub due: Day,
    pub dealer: String,
}

impl std::fmt::Display for CommodityKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}_{}", self.due, self.dealer)
    }
}

/// One commodity: its key, the full destination location and its vehicles.
#[derive(Debug, Clone)]
pub struct Commodity {
    pub key: CommodityKey,
    pub destination: Location,
    /// Vehicle ids, ascending.
    pub vehicle_ids: Vec<usize>,
}

/// Iteration order for the sequential per-commodity sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupOrder {
    /// First-appearance order of the vehicles; stable for a given input but
    /// not canonical across input permutations.
    Unspecified,
    /// Ascending (due day, dealer code). The default: serving earlier due
    /// dates first reduces avoidable delay under the greedy decomposition.
    #[default]
    Ascending,
    Descending,
}

/// Partitions vehicles into commodities in the requested order.
pub fn group_commodities(vehicles: &[Vehicle], order: GroupOrder) -> Vec<Commodity> {
    let mut first_seen: Vec<CommodityKey> = Vec::new();
    let mut groups: BTreeMap<CommodityKey, Commodity> = BTreeMap::new();
    for vehicle in vehicles {
        let key = CommodityKey {
            due: vehicle.due,
            dealer: vehicle.destination.code.clone(),
        };
        let commodity = groups.entry(key.clone()).or_insert_with(|| {
            first_seen.push(key.clone());
            Commodity {
                key,
                destination: vehicle.destination.clone(),
                vehicle_ids: Vec::new(),
            }
        });
        commodity.vehicle_ids.push(vehicle.id);
    }
    for commodity in groups.values_mut() {
        commodity.vehicle_ids.sort_unstable();
    }
    match order {
        GroupOrder::Unspecified => first_seen
            .into_iter()
            .filter_map(|key| groups.remove(&key))
            .collect(),
        GroupOrder::Ascending => groups.into_values().collect(),
        GroupOrder::Descending => {
            let mut commodities: Vec<Commodity> = groups.into_values().collect();
            commodities.reverse();
            commodities
        }
    }
}
