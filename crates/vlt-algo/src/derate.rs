//! History-driven capacity derating.
//!
//! Realised truck capacities routinely fall short of the planned
//! announcements, and the same physical slot (weekday, segment, ordinal)
//! tends to fall short in the same way. This module groups historical
//! observations into those buckets, computes mean / sample stddev /
//! empirical quantiles per bucket, and pre-shrinks the planned capacities
//! before the network is built so the planner leaves slack where history
//! says it should.
//!
//! Derating runs once, before graph construction, and touches only the
//! planned capacity fields. With q = 0 (or a zero stddev factor) the
//! planned values pass through untouched. Stddev subtraction only ever
//! shrinks; quantile replacement substitutes the bucket quantile outright.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use vlt_core::{CapacityObservation, Location, Truck, TruckId, VltError, VltResult, Weekday};

/// History bucket: same weekday, same segment, same ordinal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HistoryKey {
    pub weekday: Weekday,
    pub start: Location,
    pub end: Location,
    pub ordinal: u32,
}

impl HistoryKey {
    pub fn for_truck(truck: &Truck) -> VltResult<Self> {
        Ok(HistoryKey {
            weekday: truck.departure.weekday()?,
            start: truck.start.clone(),
            end: truck.end.clone(),
            ordinal: truck.ordinal,
        })
    }

    pub fn for_observation(observation: &CapacityObservation) -> VltResult<Self> {
        Ok(HistoryKey {
            weekday: observation.departure.weekday()?,
            start: observation.start.clone(),
            end: observation.end.clone(),
            ordinal: observation.ordinal,
        })
    }
}

/// Observed capacities per bucket, ready for statistics.
#[derive(Debug, Clone, Default)]
pub struct CapacityHistory {
    buckets: HashMap<HistoryKey, Vec<u32>>,
}

impl CapacityHistory {
    pub fn from_observations(observations: &[CapacityObservation]) -> VltResult<Self> {
        let mut history = CapacityHistory::default();
        for observation in observations {
            history
                .buckets
                .entry(HistoryKey::for_observation(observation)?)
                .or_default()
                .push(observation.capacity);
        }
        for capacities in history.buckets.values_mut() {
            capacities.sort_unstable();
        }
        Ok(history)
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Arithmetic mean of the bucket's observed capacities.
    pub fn mean(&self, key: &HistoryKey) -> Option<f64> {
        let capacities = self.buckets.get(key)?;
        Some(capacities.iter().map(|&c| c as f64).sum::<f64>() / capacities.len() as f64)
    }

    /// Sample standard deviation; 0 for a single observation.
    pub fn stddev(&self, key: &HistoryKey) -> Option<f64> {
        let capacities = self.buckets.get(key)?;
        if capacities.len() < 2 {
            return Some(0.0);
        }
        let mean = self.mean(key)?;
        let variance = capacities
            .iter()
            .map(|&c| (c as f64 - mean).powi(2))
            .sum::<f64>()
            / (capacities.len() - 1) as f64;
        Some(variance.sqrt())
    }

    /// Capacity such that a fraction `1 - q` of observations lie at or
    /// below it: the empirical quantile at level `1 - q`, linearly
    /// interpolated between order statistics. q = 1 yields the bucket
    /// minimum, q = 0 the maximum.
    pub fn quantile(&self, key: &HistoryKey, q: f64) -> Option<f64> {
        let capacities = self.buckets.get(key)?;
        Some(interpolated_quantile(capacities, 1.0 - q))
    }
}

/// Linear-interpolation quantile over an ascending-sorted slice.
fn interpolated_quantile(sorted: &[u32], level: f64) -> f64 {
    debug_assert!(!sorted.is_empty());
    if sorted.len() == 1 {
        return sorted[0] as f64;
    }
    let position = level.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let below = position.floor() as usize;
    let above = position.ceil() as usize;
    let fraction = position - below as f64;
    sorted[below] as f64 + fraction * (sorted[above] as f64 - sorted[below] as f64)
}

/// How to shrink planned capacities from history.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeratePolicy {
    /// `capacity = max(0, planned - ceil(factor * sigma))` per bucket.
    StddevSubtraction { factor: f64 },
    /// `capacity = quantile(history, 1 - q)` per bucket; q = 0 trusts the
    /// planned value and leaves it untouched.
    QuantileReplacement { quantile: f64 },
}

/// Applies the policy to every planned truck with a history bucket.
/// Trucks without history keep their planned capacity.
pub fn derate_planned_capacities(
    trucks_planned: &mut std::collections::BTreeMap<TruckId, Truck>,
    history: &CapacityHistory,
    policy: DeratePolicy,
) -> VltResult<()> {
    match policy {
        DeratePolicy::StddevSubtraction { factor } => {
            if factor < 0.0 {
                return Err(VltError::Config(format!(
                    "stddev factor must be non-negative, got {factor}"
                )));
            }
            if factor == 0.0 {
                return Ok(());
            }
            for truck in trucks_planned.values_mut() {
                let key = HistoryKey::for_truck(truck)?;
                if let Some(sigma) = history.stddev(&key) {
                    let cut = (factor * sigma).ceil() as u32;
                    truck.capacity = truck.capacity.saturating_sub(cut);
                }
            }
        }
        DeratePolicy::QuantileReplacement { quantile } => {
            if !(0.0..=1.0).contains(&quantile) {
                return Err(VltError::Config(format!(
                    "quantile must lie in [0, 1], got {quantile}"
                )));
            }
            if quantile == 0.0 {
                return Ok(());
            }
            for truck in trucks_planned.values_mut() {
                let key = HistoryKey::for_truck(truck)?;
                if let Some(value) = history.quantile(&key, quantile) {
                    truck.capacity = value.floor() as u32;
                }
            }
        }
    }
    Ok(())
}
