//! # vlt-core: Finished-Vehicle Logistics Core
//!
//! Fundamental data structures for planning the transport of finished
//! vehicles from plants through terminals to dealers over a daily horizon.
//!
//! ## Design Philosophy
//!
//! The model mirrors the shape of the input datasets:
//! - **Locations** are small immutable values (5-char code + kind) used as
//!   map keys throughout.
//! - **Trucks** are pre-announced transport opportunities on a fixed segment
//!   with a departure/arrival day, a capacity and a booking price. Parallel
//!   trucks on the same segment and day are told apart by an ordinal
//!   (trains occupy a disjoint ordinal range).
//! - **Vehicles** are demand: available at a plant on one day, due at a
//!   dealer on another.
//! - **Assignments** are the solution encoding shared by every solver:
//!   a truck sequence per vehicle plus a load list per truck, with delay
//!   bookkeeping on the vehicle side.
//!
//! Solvers live in `vlt-algo`; dataset ingestion and artifact persistence in
//! `vlt-io`. This crate only defines the contract they meet, the objective
//! ([`evaluate`]), and the invariant checker ([`verify`]).
//!
//! ## Modules
//!
//! - [`day`] - Ordinal calendar days with O(1) arithmetic
//! - [`diagnostics`] - Issue collection for verification/import reports
//! - [`error`] - The error currency of the workspace
//! - [`evaluate`] - Objective function, metrics, horizon trimming
//! - [`verify`] - Solution invariant checking

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

pub mod day;
pub mod diagnostics;
pub mod error;
pub mod evaluate;
pub mod verify;

pub use day::{Day, Weekday};
pub use diagnostics::{Diagnostics, Issue, Severity};
pub use error::{VltError, VltResult};

/// Kind of a physical location in the logistics network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum LocationKind {
    Plant,
    Terminal,
    Dealer,
}

impl LocationKind {
    /// The token used for this kind in the dataset location codes.
    pub fn token(self) -> &'static str {
        match self {
            LocationKind::Plant => "PLANT",
            LocationKind::Terminal => "TERM",
            LocationKind::Dealer => "DEAL",
        }
    }

    pub fn from_token(token: &str) -> VltResult<Self> {
        match token {
            "PLANT" => Ok(LocationKind::Plant),
            "TERM" => Ok(LocationKind::Terminal),
            "DEAL" => Ok(LocationKind::Dealer),
            other => Err(VltError::Parse(format!("invalid location kind '{other}'"))),
        }
    }
}

impl fmt::Display for LocationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// A physical location: production plant, intermediate terminal or dealer.
///
/// Equality is field-wise; locations are used as map keys and inside
/// [`TruckId`]. The `code` is the 5-character site code from the datasets
/// (e.g. `GER01`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Location {
    pub code: String,
    pub kind: LocationKind,
}

impl Location {
    pub fn new(code: impl Into<String>, kind: LocationKind) -> Self {
        Self {
            code: code.into(),
            kind,
        }
    }

    pub fn is_dealer(&self) -> bool {
        self.kind == LocationKind::Dealer
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.code, self.kind.token())
    }
}

/// Uniquely identifies one truck departure.
///
/// Two announcements (e.g. planned vs realised) describing the same physical
/// trip share an identifier: same segment, same ordinal, same departure day.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TruckId {
    pub start: Location,
    pub end: Location,
    /// Distinguishes parallel trucks on the same segment and day. Road
    /// trucks and trains draw from disjoint ranges (trains are offset by
    /// [`TRAIN_ORDINAL_OFFSET`]); 0 is reserved for non-truck arcs in the
    /// flow network.
    pub ordinal: u32,
    pub departure: Day,
}

impl fmt::Display for TruckId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}->{} #{} @ {}",
            self.start.code, self.end.code, self.ordinal, self.departure
        )
    }
}

/// Ordinal offset applied to trains so they never collide with road trucks
/// on the same segment and day.
pub const TRAIN_ORDINAL_OFFSET: u32 = 10;

/// A capacitated transport opportunity between two locations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Truck {
    pub start: Location,
    pub end: Location,
    pub departure: Day,
    pub arrival: Day,
    /// See [`TruckId::ordinal`].
    pub ordinal: u32,
    /// Maximum number of vehicles the truck can carry.
    pub capacity: u32,
    /// Booking cost, incurred once if the truck carries any load; the
    /// objective charges it prorated by load / capacity.
    pub price: u32,
}

impl Truck {
    pub fn id(&self) -> TruckId {
        TruckId {
            start: self.start.clone(),
            end: self.end.clone(),
            ordinal: self.ordinal,
            departure: self.departure,
        }
    }
}

/// A vehicle to be transported.
///
/// Ids are dense and 0-based after ingestion, so `vehicles[v.id]` is the
/// vehicle itself everywhere in the planner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vehicle {
    pub id: usize,
    pub origin: Location,
    pub destination: Location,
    pub available: Day,
    pub due: Day,
}

/// The solution record for one vehicle: its truck sequence and delay status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VehicleAssignment {
    pub id: usize,
    /// Trucks in travel order. Contiguous in space and monotone in time
    /// (with the one-day rest at non-dealer endpoints); may be empty or end
    /// short of the destination when the horizon ran out.
    pub path: Vec<TruckId>,
    /// True iff the delay was announced at least the notice period before
    /// the due day. Sticky once set.
    pub planned_delayed: bool,
    /// Days late at the destination, 0 when on time.
    pub delayed_by: u32,
}

impl VehicleAssignment {
    pub fn new(id: usize) -> Self {
        Self {
            id,
            path: Vec::new(),
            planned_delayed: false,
            delayed_by: 0,
        }
    }
}

/// The solution record for one truck: the vehicles it carries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TruckAssignment {
    pub load: Vec<usize>,
}

impl TruckAssignment {
    /// Seats still free on `truck` given the current load.
    pub fn remaining_capacity(&self, truck: &Truck) -> u32 {
        debug_assert!(
            self.load.len() <= truck.capacity as usize,
            "truck {} overloaded: {} > {}",
            truck.id(),
            self.load.len(),
            truck.capacity
        );
        truck.capacity.saturating_sub(self.load.len() as u32)
    }
}

/// One historical record of how a truck slot actually ran: the segment and
/// ordinal identify the slot, the departure day supplies the weekday bucket.
/// Arrival days are not recorded in the history data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapacityObservation {
    pub start: Location,
    pub end: Location,
    pub ordinal: u32,
    pub departure: Day,
    pub capacity: u32,
    pub price: u32,
}

/// Delay-penalty constants and the planned-delay notice threshold.
///
/// These are configuration, not globals: the network builder and the
/// evaluator both take them as a parameter so a run can price delays
/// differently without recompiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostConfig {
    /// One-off cost of a delay announced in advance.
    pub fixed_planned_delay: u32,
    /// One-off cost of a delay that was not announced in time.
    pub fixed_unplanned_delay: u32,
    /// Per-day cost on top of the planned fixed cost.
    pub per_planned_delay_day: u32,
    /// Per-day cost on top of the unplanned fixed cost.
    pub per_unplanned_delay_day: u32,
    /// Minimum days of advance notice for a delay to count as planned.
    pub notice_days: i32,
}

impl Default for CostConfig {
    fn default() -> Self {
        Self {
            fixed_planned_delay: 200,
            fixed_unplanned_delay: 500,
            per_planned_delay_day: 50,
            per_unplanned_delay_day: 100,
            notice_days: 7,
        }
    }
}

/// Builds the truck-side view of a solution from the vehicle-side view.
///
/// Every truck in `trucks` gets an entry, empty when unused; evaluators rely
/// on the full key set to tell "unused" from "unknown".
pub fn truck_assignments_from_vehicle_assignments(
    vehicle_assignments: &[VehicleAssignment],
    trucks: &BTreeMap<TruckId, Truck>,
) -> BTreeMap<TruckId, TruckAssignment> {
    let mut truck_assignments: BTreeMap<TruckId, TruckAssignment> = BTreeMap::new();
    for assignment in vehicle_assignments {
        for truck_id in &assignment.path {
            truck_assignments
                .entry(truck_id.clone())
                .or_default()
                .load
                .push(assignment.id);
        }
    }
    for truck_id in trucks.keys() {
        truck_assignments.entry(truck_id.clone()).or_default();
    }
    truck_assignments
}

/// Groups trucks by departure day, for the rolling scheduler's per-day
/// realised-truck lookups.
pub fn trucks_by_departure_day(
    trucks: &BTreeMap<TruckId, Truck>,
) -> BTreeMap<Day, BTreeMap<TruckId, Truck>> {
    let mut by_day: BTreeMap<Day, BTreeMap<TruckId, Truck>> = BTreeMap::new();
    for (truck_id, truck) in trucks {
        by_day
            .entry(truck.departure)
            .or_default()
            .insert(truck_id.clone(), truck.clone());
    }
    by_day
}

/// First and last day of the planning horizon (inclusive).
///
/// The horizon starts when the first vehicle becomes available or the first
/// truck departs, and ends seven days after the last due date or truck
/// arrival so that late-running trucks still fit in the network.
pub fn planning_horizon(
    vehicles: &[Vehicle],
    trucks: &BTreeMap<TruckId, Truck>,
) -> VltResult<(Day, Day)> {
    let first_vehicle = vehicles.iter().map(|v| v.available).min();
    let first_truck = trucks.values().map(|t| t.departure).min();
    let last_vehicle = vehicles.iter().map(|v| v.due).max();
    let last_truck = trucks.values().map(|t| t.arrival).max();

    let first = [first_vehicle, first_truck]
        .into_iter()
        .flatten()
        .min()
        .ok_or_else(|| VltError::Validation("horizon needs at least one vehicle or truck".into()))?;
    let last = [last_vehicle, last_truck]
        .into_iter()
        .flatten()
        .max()
        .ok_or_else(|| VltError::Validation("horizon needs at least one vehicle or truck".into()))?;
    Ok((first, last + 7))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plant() -> Location {
        Location::new("GER01", LocationKind::Plant)
    }

    fn dealer() -> Location {
        Location::new("ITA01", LocationKind::Dealer)
    }

    fn truck(ordinal: u32, departure: Day, arrival: Day) -> Truck {
        Truck {
            start: plant(),
            end: dealer(),
            departure,
            arrival,
            ordinal,
            capacity: 4,
            price: 100,
        }
    }

    #[test]
    fn test_location_display() {
        assert_eq!(plant().to_string(), "GER01PLANT");
        assert_eq!(dealer().to_string(), "ITA01DEAL");
        assert!(dealer().is_dealer());
    }

    #[test]
    fn test_truck_identifier() {
        let d = Day::from_ymd(2025, 1, 2).unwrap();
        let t = truck(3, d, d + 2);
        let id = t.id();
        assert_eq!(id.ordinal, 3);
        assert_eq!(id.departure, d);
        // Same identifier regardless of capacity/price differences
        let mut realised = t.clone();
        realised.capacity = 2;
        realised.price = 50;
        assert_eq!(realised.id(), id);
    }

    #[test]
    fn test_remaining_capacity() {
        let d = Day::from_ymd(2025, 1, 2).unwrap();
        let t = truck(1, d, d + 1);
        let mut assignment = TruckAssignment::default();
        assert_eq!(assignment.remaining_capacity(&t), 4);
        assignment.load.extend([0, 1, 2]);
        assert_eq!(assignment.remaining_capacity(&t), 1);
    }

    #[test]
    fn test_truck_assignments_cover_all_trucks() {
        let d = Day::from_ymd(2025, 1, 2).unwrap();
        let used = truck(1, d, d + 1);
        let unused = truck(2, d, d + 1);
        let trucks: BTreeMap<TruckId, Truck> = [(used.id(), used.clone()), (unused.id(), unused)]
            .into_iter()
            .collect();

        let mut va = VehicleAssignment::new(0);
        va.path.push(used.id());
        let truck_assignments = truck_assignments_from_vehicle_assignments(&[va], &trucks);

        assert_eq!(truck_assignments.len(), 2);
        assert_eq!(truck_assignments[&used.id()].load, vec![0]);
        assert!(truck_assignments
            .values()
            .any(|assignment| assignment.load.is_empty()));
    }

    #[test]
    fn test_planning_horizon() {
        let vehicles = vec![Vehicle {
            id: 0,
            origin: plant(),
            destination: dealer(),
            available: Day::from_ymd(2025, 1, 3).unwrap(),
            due: Day::from_ymd(2025, 1, 10).unwrap(),
        }];
        let t = truck(1, Day::from_ymd(2025, 1, 1).unwrap(), Day::from_ymd(2025, 1, 12).unwrap());
        let trucks: BTreeMap<TruckId, Truck> = [(t.id(), t)].into_iter().collect();

        let (first, last) = planning_horizon(&vehicles, &trucks).unwrap();
        assert_eq!(first, Day::from_ymd(2025, 1, 1).unwrap());
        assert_eq!(last, Day::from_ymd(2025, 1, 19).unwrap()); // last arrival + 7
    }

    #[test]
    fn test_planning_horizon_empty() {
        assert!(planning_horizon(&[], &BTreeMap::new()).is_err());
    }

    #[test]
    fn test_trucks_by_departure_day() {
        let d1 = Day::from_ymd(2025, 1, 2).unwrap();
        let d2 = Day::from_ymd(2025, 1, 3).unwrap();
        let a = truck(1, d1, d1 + 1);
        let b = truck(2, d1, d1 + 2);
        let c = truck(1, d2, d2 + 1);
        let trucks: BTreeMap<TruckId, Truck> =
            [(a.id(), a), (b.id(), b), (c.id(), c)].into_iter().collect();

        let by_day = trucks_by_departure_day(&trucks);
        assert_eq!(by_day[&d1].len(), 2);
        assert_eq!(by_day[&d2].len(), 1);
    }
}
