//! Solution invariant checking.
//!
//! The planner must never emit an invalid solution; this module is the
//! independent check. It validates, per vehicle, that the truck sequence is
//! contiguous in space and monotone in time (including the one-day rest at
//! non-dealer endpoints), starts at the origin no earlier than availability
//! and carries consistent delay bookkeeping; and per truck, that the load
//! fits the capacity and mirrors the vehicle paths.
//!
//! A vehicle whose path ends short of its destination is not an error: the
//! rolling scheduler can legitimately run out of horizon. Those vehicles are
//! counted separately in [`VerificationReport::non_arrived`].

use crate::{
    Diagnostics, LocationKind, Truck, TruckAssignment, TruckId, Vehicle, VehicleAssignment,
};
use std::collections::BTreeMap;

/// Outcome of verifying one solution.
#[derive(Debug, Clone, Default)]
pub struct VerificationReport {
    pub diagnostics: Diagnostics,
    /// Vehicles with a valid but incomplete path (never reached the dealer).
    pub non_arrived: usize,
}

impl VerificationReport {
    pub fn is_valid(&self) -> bool {
        !self.diagnostics.has_errors()
    }
}

/// Arrival day of a truck as seen by a following truck: one day is added at
/// non-dealer endpoints for unloading/reloading rest.
pub fn effective_arrival(truck: &Truck) -> crate::Day {
    if truck.end.kind == LocationKind::Dealer {
        truck.arrival
    } else {
        truck.arrival + 1
    }
}

/// Verifies a full solution; collects all issues rather than stopping at the
/// first one.
pub fn verify_solution(
    vehicles: &[Vehicle],
    vehicle_assignments: &[VehicleAssignment],
    trucks: &BTreeMap<TruckId, Truck>,
    truck_assignments: &BTreeMap<TruckId, TruckAssignment>,
) -> VerificationReport {
    let mut report = VerificationReport::default();

    for assignment in vehicle_assignments {
        verify_vehicle_path(assignment, vehicles, trucks, truck_assignments, &mut report);
    }
    for (truck_id, truck) in trucks {
        match truck_assignments.get(truck_id) {
            None => report.diagnostics.add_warning_with_entity(
                "coverage",
                "truck has no assignment entry",
                truck_id.to_string(),
            ),
            Some(assignment) => {
                verify_truck_load(truck, assignment, vehicle_assignments, &mut report)
            }
        }
    }
    report
}

fn verify_vehicle_path(
    assignment: &VehicleAssignment,
    vehicles: &[Vehicle],
    trucks: &BTreeMap<TruckId, Truck>,
    truck_assignments: &BTreeMap<TruckId, TruckAssignment>,
    report: &mut VerificationReport,
) {
    let entity = format!("vehicle {}", assignment.id);
    let Some(vehicle) = vehicles.get(assignment.id) else {
        report
            .diagnostics
            .add_error_with_entity("reference", "assignment for unknown vehicle id", entity);
        return;
    };

    if assignment.path.is_empty() {
        report
            .diagnostics
            .add_warning_with_entity("path", "vehicle has no trucks assigned", entity);
        report.non_arrived += 1;
        return;
    }

    // Resolve every truck id up front; a dangling reference invalidates the path.
    let mut legs: Vec<&Truck> = Vec::with_capacity(assignment.path.len());
    for truck_id in &assignment.path {
        match trucks.get(truck_id) {
            Some(truck) => legs.push(truck),
            None => {
                report.diagnostics.add_error_with_entity(
                    "reference",
                    format!("path references unknown truck {truck_id}"),
                    entity,
                );
                return;
            }
        }
    }

    let first = legs[0];
    if first.start != vehicle.origin {
        report.diagnostics.add_error_with_entity(
            "path",
            format!("first truck starts at {}, not the origin", first.start),
            entity.clone(),
        );
    }
    if first.departure < vehicle.available {
        report.diagnostics.add_error_with_entity(
            "path",
            "first truck departs before the vehicle is available",
            entity.clone(),
        );
    }

    for pair in legs.windows(2) {
        let (previous, next) = (pair[0], pair[1]);
        if next.start != previous.end {
            report.diagnostics.add_error_with_entity(
                "path",
                format!(
                    "truck {} does not start where {} ends",
                    next.id(),
                    previous.id()
                ),
                entity.clone(),
            );
        }
        if next.departure < effective_arrival(previous) {
            report.diagnostics.add_error_with_entity(
                "path",
                format!("truck {} departs before the previous leg settles", next.id()),
                entity.clone(),
            );
        }
    }

    // Every truck on the path must list the vehicle in its load.
    for truck_id in &assignment.path {
        let loaded = truck_assignments
            .get(truck_id)
            .is_some_and(|ta| ta.load.contains(&assignment.id));
        if !loaded {
            report.diagnostics.add_error_with_entity(
                "consistency",
                format!("vehicle missing from load of truck {truck_id}"),
                entity.clone(),
            );
        }
    }

    let last = legs[legs.len() - 1];
    if last.end != vehicle.destination {
        report.diagnostics.add_warning_with_entity(
            "path",
            format!("path ends at {}, short of the destination", last.end),
            entity,
        );
        report.non_arrived += 1;
        return;
    }

    let expected_delay = (last.arrival - vehicle.due).max(0) as u32;
    if assignment.delayed_by != expected_delay {
        report.diagnostics.add_error_with_entity(
            "delay",
            format!(
                "delayed_by is {} but arrival implies {}",
                assignment.delayed_by, expected_delay
            ),
            entity,
        );
    }
}

fn verify_truck_load(
    truck: &Truck,
    assignment: &TruckAssignment,
    vehicle_assignments: &[VehicleAssignment],
    report: &mut VerificationReport,
) {
    let truck_id = truck.id();
    if assignment.load.len() > truck.capacity as usize {
        report.diagnostics.add_error_with_entity(
            "capacity",
            format!(
                "load {} exceeds capacity {}",
                assignment.load.len(),
                truck.capacity
            ),
            truck_id.to_string(),
        );
    }
    for vehicle_id in &assignment.load {
        let uses_truck = vehicle_assignments
            .iter()
            .find(|va| va.id == *vehicle_id)
            .is_some_and(|va| va.path.contains(&truck_id));
        if !uses_truck {
            report.diagnostics.add_error_with_entity(
                "consistency",
                format!("vehicle {vehicle_id} is loaded but does not use the truck"),
                truck_id.to_string(),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{truck_assignments_from_vehicle_assignments, Day, Location};

    fn plant() -> Location {
        Location::new("GER01", LocationKind::Plant)
    }

    fn terminal() -> Location {
        Location::new("FRA01", LocationKind::Terminal)
    }

    fn dealer() -> Location {
        Location::new("ITA01", LocationKind::Dealer)
    }

    fn vehicle() -> Vehicle {
        Vehicle {
            id: 0,
            origin: plant(),
            destination: dealer(),
            available: Day::from_ymd(2025, 1, 1).unwrap(),
            due: Day::from_ymd(2025, 1, 10).unwrap(),
        }
    }

    fn two_leg_solution() -> (
        Vec<Vehicle>,
        Vec<VehicleAssignment>,
        BTreeMap<TruckId, Truck>,
        BTreeMap<TruckId, TruckAssignment>,
    ) {
        let leg1 = Truck {
            start: plant(),
            end: terminal(),
            departure: Day::from_ymd(2025, 1, 2).unwrap(),
            arrival: Day::from_ymd(2025, 1, 3).unwrap(),
            ordinal: 1,
            capacity: 2,
            price: 100,
        };
        // Departs on the 4th: the terminal rest day after arriving on the 3rd.
        let leg2 = Truck {
            start: terminal(),
            end: dealer(),
            departure: Day::from_ymd(2025, 1, 4).unwrap(),
            arrival: Day::from_ymd(2025, 1, 6).unwrap(),
            ordinal: 1,
            capacity: 2,
            price: 100,
        };
        let trucks: BTreeMap<TruckId, Truck> =
            [(leg1.id(), leg1.clone()), (leg2.id(), leg2.clone())]
                .into_iter()
                .collect();
        let mut va = VehicleAssignment::new(0);
        va.path = vec![leg1.id(), leg2.id()];
        let vas = vec![va];
        let tas = truck_assignments_from_vehicle_assignments(&vas, &trucks);
        (vec![vehicle()], vas, trucks, tas)
    }

    #[test]
    fn test_valid_two_leg_path() {
        let (vehicles, vas, trucks, tas) = two_leg_solution();
        let report = verify_solution(&vehicles, &vas, &trucks, &tas);
        assert!(report.is_valid(), "{:?}", report.diagnostics);
        assert_eq!(report.non_arrived, 0);
    }

    #[test]
    fn test_rest_day_violation() {
        let (vehicles, mut vas, mut trucks, _) = two_leg_solution();
        // Move the second leg's departure onto the terminal arrival day:
        // legal only at dealers, so the verifier must object.
        let old_id = vas[0].path[1].clone();
        let mut leg2 = trucks[&old_id].clone();
        trucks.remove(&old_id);
        leg2.departure = Day::from_ymd(2025, 1, 3).unwrap();
        vas[0].path[1] = leg2.id();
        trucks.insert(leg2.id(), leg2);
        let tas = truck_assignments_from_vehicle_assignments(&vas, &trucks);

        let report = verify_solution(&vehicles, &vas, &trucks, &tas);
        assert!(!report.is_valid());
        assert!(report
            .diagnostics
            .errors()
            .any(|issue| issue.message.contains("settles")));
    }

    #[test]
    fn test_overloaded_truck() {
        let (mut vehicles, mut vas, trucks, _) = two_leg_solution();
        for id in 1..3 {
            let mut v = vehicle();
            v.id = id;
            vehicles.push(v);
            let mut va = vas[0].clone();
            va.id = id;
            vas.push(va);
        }
        let tas = truck_assignments_from_vehicle_assignments(&vas, &trucks);
        let report = verify_solution(&vehicles, &vas, &trucks, &tas);
        assert!(report
            .diagnostics
            .errors()
            .any(|issue| issue.category == "capacity"));
    }

    #[test]
    fn test_inconsistent_delay() {
        let (vehicles, mut vas, trucks, tas) = two_leg_solution();
        vas[0].delayed_by = 2; // arrival on the 6th, due the 10th: no delay
        let report = verify_solution(&vehicles, &vas, &trucks, &tas);
        assert!(report
            .diagnostics
            .errors()
            .any(|issue| issue.category == "delay"));
    }

    #[test]
    fn test_empty_path_is_non_arrival() {
        let (vehicles, _, trucks, _) = two_leg_solution();
        let vas = vec![VehicleAssignment::new(0)];
        let tas = truck_assignments_from_vehicle_assignments(&vas, &trucks);
        let report = verify_solution(&vehicles, &vas, &trucks, &tas);
        assert!(report.is_valid());
        assert_eq!(report.non_arrived, 1);
    }

    #[test]
    fn test_load_without_path_entry() {
        let (vehicles, vas, trucks, mut tas) = two_leg_solution();
        // Sneak a vehicle id into a load without touching its path.
        tas.values_mut().next().unwrap().load.push(99);
        let report = verify_solution(&vehicles, &vas, &trucks, &tas);
        assert!(report
            .diagnostics
            .errors()
            .any(|issue| issue.category == "consistency"));
    }
}
