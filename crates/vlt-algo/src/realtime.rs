//! Rolling-horizon real-time planning.
//!
//! Each simulated day:
//!
//! 1. **Replan** the whole remaining future on the planned network: one
//!    single-commodity min-cost flow per commodity in order, against
//!    capacities snapshotted at day start, each commodity consuming the
//!    residuals of its predecessors. The flows only produce each vehicle's
//!    *planned next move*; nothing is committed yet.
//! 2. **Commit** today's departures against the trucks that actually
//!    materialised. A planned truck that arrived smaller than announced (or
//!    not at all) spills its overflow vehicles into a bounded local repair:
//!    other realised trucks leaving the same location today, cheapest
//!    first, accepted only when the remaining planned network can still
//!    carry the vehicle to its dealer within a week of its due day.
//!    Vehicles that find no seat simply wait; they are replanned tomorrow.
//! 3. **Announce** planned delays while the due day is still far enough out
//!    for the cheap penalty regime; the flag is sticky once set.
//! 4. **Advance**: planned trucks that departed today stop being a future
//!    resource and the delay-regime boundary moves one day out.
//!
//! Infeasibility of a commodity is not fatal here: its vehicles sit out the
//! day and are retried tomorrow, accruing delay until the horizon ends.

use crate::commodity::{group_commodities, CommodityKey, GroupOrder};
use crate::deterministic::commodity_demands;
use crate::extract::{extract_planned_assignments, PlannedAssignment};
use crate::mincost::solve_commodity_flow;
use crate::network::{FlowNetwork, NodeId};
use std::collections::{BTreeMap, HashMap};
use vlt_core::verify::effective_arrival;
use vlt_core::{
    planning_horizon, truck_assignments_from_vehicle_assignments, CostConfig, Day, Location,
    Truck, TruckAssignment, TruckId, Vehicle, VehicleAssignment, VltResult,
};

/// Days of slack granted to the commit-time repair when probing whether a
/// substitute truck still leads to an acceptable arrival.
const REASSIGNMENT_SLACK_DAYS: i32 = 7;

/// Result of a real-time run: the solution pair plus the operational log of
/// commodities that could not be planned on particular days.
#[derive(Debug)]
pub struct RealtimeOutcome {
    pub vehicle_assignments: Vec<VehicleAssignment>,
    pub truck_assignments: BTreeMap<TruckId, TruckAssignment>,
    /// Days on which a commodity had no feasible flow, with the commodity.
    pub infeasible: Vec<(Day, CommodityKey)>,
}

struct VehicleState {
    assignment: VehicleAssignment,
    /// Where the vehicle sits (or will sit, when in transit): the node of
    /// its last committed arrival, or its availability node before the
    /// first leg.
    current: NodeId,
    delivered: bool,
}

/// Simulates day-by-day planning against realised capacities.
pub fn solve_in_real_time(
    vehicles: &[Vehicle],
    trucks_planned: &BTreeMap<TruckId, Truck>,
    trucks_realised: &BTreeMap<TruckId, Truck>,
    locations: &[Location],
    costs: CostConfig,
    order: GroupOrder,
) -> VltResult<RealtimeOutcome> {
    let mut all_trucks = trucks_planned.clone();
    for (truck_id, truck) in trucks_realised {
        all_trucks.entry(truck_id.clone()).or_insert_with(|| truck.clone());
    }

    if vehicles.is_empty() {
        return Ok(RealtimeOutcome {
            vehicle_assignments: Vec::new(),
            truck_assignments: truck_assignments_from_vehicle_assignments(&[], &all_trucks),
            infeasible: Vec::new(),
        });
    }
    crate::deterministic::validate_vehicles(vehicles)?;

    let (first_day, last_day) = planning_horizon(vehicles, &all_trucks)?;
    let mut network = FlowNetwork::build_bounded(
        vehicles,
        trucks_planned,
        locations,
        costs,
        first_day,
        last_day,
    )?;

    let commodities = group_commodities(vehicles, order);
    let realised_by_day = vlt_core::trucks_by_departure_day(trucks_realised);
    let planned_by_day = vlt_core::trucks_by_departure_day(trucks_planned);

    let mut states: Vec<VehicleState> = vehicles
        .iter()
        .map(|vehicle| VehicleState {
            assignment: VehicleAssignment::new(vehicle.id),
            current: NodeId::normal(vehicle.available, vehicle.origin.clone()),
            delivered: false,
        })
        .collect();
    let mut loads: BTreeMap<TruckId, TruckAssignment> = BTreeMap::new();
    let mut infeasible: Vec<(Day, CommodityKey)> = Vec::new();

    for now in first_day.range_inclusive(last_day) {
        let snapshot = network.snapshot_capacities();
        let mut planned: HashMap<usize, PlannedAssignment> = HashMap::new();
        let mut announce: Vec<usize> = Vec::new();

        for commodity in &commodities {
            let undelivered: Vec<usize> = commodity
                .vehicle_ids
                .iter()
                .copied()
                .filter(|&id| !states[id].delivered)
                .collect();
            if undelivered.is_empty() {
                continue;
            }
            let current_nodes: HashMap<usize, NodeId> = undelivered
                .iter()
                .map(|&id| (id, states[id].current.clone()))
                .collect();
            let flow = commodity_demands(&network, vehicles, &undelivered, |vehicle| {
                current_nodes[&vehicle.id].clone()
            })
            .and_then(|demands| solve_commodity_flow(&network, &demands));
            match flow {
                Ok(mut flow) => {
                    extract_planned_assignments(
                        &mut network,
                        &mut flow,
                        &undelivered,
                        vehicles,
                        now,
                        &current_nodes,
                        &mut planned,
                        &mut announce,
                    );
                }
                Err(_) => {
                    infeasible.push((now, commodity.key.clone()));
                    for id in undelivered {
                        planned.insert(id, PlannedAssignment::Infeasible);
                    }
                }
            }
        }

        network.restore_capacities(&snapshot);

        // Commit today's moves against the trucks that actually showed up.
        let no_trucks = BTreeMap::new();
        let realised_today = realised_by_day.get(&now).unwrap_or(&no_trucks);
        for commodity in &commodities {
            for &vehicle_id in &commodity.vehicle_ids {
                if states[vehicle_id].delivered {
                    continue;
                }
                let Some(PlannedAssignment::Today(truck_id)) = planned.get(&vehicle_id) else {
                    continue;
                };
                let planned_truck = realised_today
                    .get(truck_id)
                    .filter(|truck| seats_left(truck, &loads) > 0)
                    .cloned();
                let boarding = planned_truck.or_else(|| {
                    reassign_today(
                        &network,
                        realised_today,
                        &loads,
                        &vehicles[vehicle_id],
                        &states[vehicle_id].current,
                    )
                });
                if let Some(truck) = boarding {
                    commit_move(&mut states[vehicle_id], &mut loads, &vehicles[vehicle_id], &truck);
                }
            }
        }

        for vehicle_id in announce {
            states[vehicle_id].assignment.planned_delayed = true;
        }

        let departing: Vec<TruckId> = planned_by_day
            .get(&now)
            .map(|trucks| trucks.keys().cloned().collect())
            .unwrap_or_default();
        network.advance_day(departing.into_iter());
    }

    // Whatever never arrived accrues delay to the end of the horizon.
    let mut vehicle_assignments: Vec<VehicleAssignment> = states
        .into_iter()
        .map(|state| {
            let mut assignment = state.assignment;
            if !state.delivered {
                let due = vehicles[assignment.id].due;
                assignment.delayed_by = (last_day - due).max(0) as u32;
            }
            assignment
        })
        .collect();
    vehicle_assignments.sort_by_key(|a| a.id);
    let truck_assignments =
        truck_assignments_from_vehicle_assignments(&vehicle_assignments, &all_trucks);

    Ok(RealtimeOutcome {
        vehicle_assignments,
        truck_assignments,
        infeasible,
    })
}

fn seats_left(truck: &Truck, loads: &BTreeMap<TruckId, TruckAssignment>) -> u32 {
    let occupied = loads
        .get(&truck.id())
        .map(|assignment| assignment.load.len() as u32)
        .unwrap_or(0);
    truck.capacity.saturating_sub(occupied)
}

/// Bounded local repair when the planned truck is absent or full: realised
/// trucks leaving the vehicle's location today, by ascending price then
/// ordinal, first one whose endpoint still reaches the destination by
/// `due + slack` over the remaining planned network.
fn reassign_today(
    network: &FlowNetwork,
    realised_today: &BTreeMap<TruckId, Truck>,
    loads: &BTreeMap<TruckId, TruckAssignment>,
    vehicle: &Vehicle,
    current: &NodeId,
) -> Option<Truck> {
    let mut candidates: Vec<&Truck> = realised_today
        .values()
        .filter(|truck| truck.start == current.location && seats_left(truck, loads) > 0)
        .collect();
    candidates.sort_by_key(|truck| (truck.price, truck.ordinal));
    let deadline = vehicle.due + REASSIGNMENT_SLACK_DAYS;
    for truck in candidates {
        let (_, end_node) = FlowNetwork::truck_endpoints(truck);
        if let Some(arrival) = network.earliest_arrival(&end_node, &vehicle.destination) {
            if arrival <= deadline {
                return Some(truck.clone());
            }
        }
    }
    None
}

fn commit_move(
    state: &mut VehicleState,
    loads: &mut BTreeMap<TruckId, TruckAssignment>,
    vehicle: &Vehicle,
    truck: &Truck,
) {
    let truck_id = truck.id();
    state.assignment.path.push(truck_id.clone());
    loads.entry(truck_id).or_default().load.push(vehicle.id);
    state.current = NodeId::normal(effective_arrival(truck), truck.end.clone());
    if truck.end == vehicle.destination {
        state.delivered = true;
        state.assignment.delayed_by = (truck.arrival - vehicle.due).max(0) as u32;
    }
}
