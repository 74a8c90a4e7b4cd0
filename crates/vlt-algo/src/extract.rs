//! Flow-to-assignment extraction.
//!
//! A commodity's integer flow says how many units traverse each arc, not
//! which vehicle is which unit. The extractor decomposes the flow into
//! per-vehicle truck sequences by walking each vehicle greedily along arcs
//! with remaining flow, always taking the arc whose head has the earliest
//! day (ties broken by lowest ordinal), and waiting a day when no arc moves
//! the vehicle somewhere else. Every unit walked consumes one unit of flow
//! and one unit of the shared residual capacity, which is how the
//! sequential solver keeps later commodities honest.
//!
//! Vehicle order within a commodity does not change the committed truck
//! loads (the flow is fixed), only the vehicle-to-seat mapping, which is
//! stabilised by the final sort on vehicle id.

use crate::mincost::CommodityFlow;
use crate::network::{FlowNetwork, NodeId, WAITING_ORDINAL};
use petgraph::visit::EdgeRef;
use std::collections::HashMap;
use vlt_core::{Day, TruckId, Vehicle, VehicleAssignment};

/// What the current day's plan means for one vehicle, in real-time mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlannedAssignment {
    /// The plan puts the vehicle on this truck today.
    Today(TruckId),
    /// The plan's next truck for this vehicle departs on a later day.
    Later(TruckId),
    /// The vehicle's commodity had no feasible flow today.
    Infeasible,
}

/// Takes the best outgoing flow arc at `cur` that changes location,
/// consuming one unit of flow and residual capacity. Returns the head node
/// and the arc ordinal, or `None` when the vehicle should wait.
fn take_next_arc(
    network: &mut FlowNetwork,
    flow: &mut CommodityFlow,
    cur: &NodeId,
) -> Option<(NodeId, u32)> {
    let cur_index = network.node_index(cur)?;
    let mut best: Option<(Day, u32, petgraph::stable_graph::EdgeIndex, NodeId)> = None;
    for edge in network.graph().edges(cur_index) {
        if flow.flow.get(&edge.id()).copied().unwrap_or(0) == 0 {
            continue;
        }
        let head = network.node_id(edge.target());
        if head.location == cur.location {
            continue;
        }
        let key = (head.day, edge.weight().ordinal);
        if best
            .as_ref()
            .map_or(true, |(day, ordinal, _, _)| key < (*day, *ordinal))
        {
            best = Some((key.0, key.1, edge.id(), head.clone()));
        }
    }
    let (_, ordinal, edge, head) = best?;
    match flow.flow.get_mut(&edge) {
        Some(units) if *units > 1 => *units -= 1,
        _ => {
            flow.flow.remove(&edge);
        }
    }
    network.decrement_capacity(edge);
    Some((head, ordinal))
}

/// Classifies a dealer arrival against the due day and the current day.
fn classify_delay(arrival: Day, due: Day, now: Day, notice_days: i32) -> (bool, u32) {
    let delayed_by = (arrival - due).max(0) as u32;
    let planned = delayed_by > 0 && (due - now) > notice_days;
    (planned, delayed_by)
}

/// Extracts final assignments for one commodity (deterministic mode).
///
/// Each vehicle starts at its availability node; the walk ends at the
/// destination dealer, where the delay is classified against `now`.
pub fn extract_final_assignments(
    network: &mut FlowNetwork,
    flow: &mut CommodityFlow,
    commodity_vehicle_ids: &[usize],
    vehicles: &[Vehicle],
    now: Day,
    assignments: &mut Vec<VehicleAssignment>,
) {
    let last_day = network.last_day();
    let notice_days = network.costs().notice_days;
    for &vehicle_id in commodity_vehicle_ids {
        let vehicle = &vehicles[vehicle_id];
        let mut cur = NodeId::normal(vehicle.available, vehicle.origin.clone());
        let mut assignment = VehicleAssignment::new(vehicle_id);

        while cur.location != vehicle.destination && cur.day <= last_day {
            match take_next_arc(network, flow, &cur) {
                Some((head, ordinal)) => {
                    if ordinal != WAITING_ORDINAL {
                        assignment.path.push(TruckId {
                            start: cur.location.clone(),
                            end: head.location.clone(),
                            ordinal,
                            departure: cur.day,
                        });
                    }
                    cur = head;
                }
                None => cur.day = cur.day.succ(),
            }
        }

        if cur.location == vehicle.destination {
            let (planned, delayed_by) =
                classify_delay(cur.day, vehicle.due, now, notice_days);
            assignment.planned_delayed = planned;
            assignment.delayed_by = delayed_by;
        }
        assignments.push(assignment);
    }
}

/// Extracts the planned next move per vehicle for one commodity (real-time
/// mode), consuming flow and residual capacity exactly like the final
/// extractor so later commodities see the day's residuals.
///
/// The walk starts at each vehicle's current node. The first truck arc on
/// the walk becomes [`PlannedAssignment::Today`] when it departs on `now`,
/// [`PlannedAssignment::Later`] otherwise. Vehicles whose planned arrival
/// runs past their due day while the due day is still more than the notice
/// period away are appended to `announce` so the caller can set the sticky
/// planned-delay flag.
pub fn extract_planned_assignments(
    network: &mut FlowNetwork,
    flow: &mut CommodityFlow,
    commodity_vehicle_ids: &[usize],
    vehicles: &[Vehicle],
    now: Day,
    current_nodes: &HashMap<usize, NodeId>,
    planned: &mut HashMap<usize, PlannedAssignment>,
    announce: &mut Vec<usize>,
) {
    let last_day = network.last_day();
    let notice_days = network.costs().notice_days;
    for &vehicle_id in commodity_vehicle_ids {
        let vehicle = &vehicles[vehicle_id];
        let Some(start) = current_nodes.get(&vehicle_id) else {
            continue;
        };
        let mut cur = start.clone();
        let mut first_leg_seen = false;

        while cur.location != vehicle.destination && cur.day <= last_day {
            match take_next_arc(network, flow, &cur) {
                Some((head, ordinal)) => {
                    if ordinal != WAITING_ORDINAL && !first_leg_seen {
                        debug_assert!(cur.day >= now, "plan uses a departed truck");
                        let truck_id = TruckId {
                            start: cur.location.clone(),
                            end: head.location.clone(),
                            ordinal,
                            departure: cur.day,
                        };
                        let entry = if cur.day == now {
                            PlannedAssignment::Today(truck_id)
                        } else {
                            PlannedAssignment::Later(truck_id)
                        };
                        planned.insert(vehicle_id, entry);
                        first_leg_seen = true;
                    }
                    cur = head;
                }
                None => cur.day = cur.day.succ(),
            }
        }

        if cur.location == vehicle.destination
            && cur.day > vehicle.due
            && (vehicle.due - now) > notice_days
        {
            announce.push(vehicle_id);
        }
    }
}
