//! Deterministic (full-information) planning.
//!
//! One network build, one sweep: commodities are processed in the
//! configured order, each solved as a single-commodity integer min-cost
//! flow over the residual capacities left by its predecessors, then
//! extracted into vehicle assignments. The decomposition is a heuristic,
//! not guaranteed to reach the joint multi-commodity optimum, but it
//! is fast, integral and deterministic. An infeasible commodity is fatal
//! here; only the rolling scheduler can carry unserved demand forward.

use crate::commodity::{group_commodities, GroupOrder};
use crate::extract::extract_final_assignments;
use crate::mincost::solve_commodity_flow;
use crate::network::{FlowNetwork, NodeId};
use petgraph::stable_graph::NodeIndex;
use std::collections::BTreeMap;
use vlt_core::{
    truck_assignments_from_vehicle_assignments, CostConfig, Truck, TruckAssignment, TruckId,
    Vehicle, VehicleAssignment, VltError, VltResult,
};

/// Input checks shared by the solvers: ids must be dense (the planners
/// index vehicles by id) and no vehicle may be due before it exists.
pub(crate) fn validate_vehicles(vehicles: &[Vehicle]) -> VltResult<()> {
    for (index, vehicle) in vehicles.iter().enumerate() {
        if vehicle.id != index {
            return Err(VltError::Validation(format!(
                "vehicle ids must be dense and sorted: expected {index}, found {}",
                vehicle.id
            )));
        }
        if vehicle.due < vehicle.available {
            return Err(VltError::Validation(format!(
                "vehicle {} is due before it becomes available",
                vehicle.id
            )));
        }
    }
    Ok(())
}

/// Demand vector of one commodity: each vehicle supplies one unit at its
/// source node; the sink collects them at the commodity's due-day dealer
/// node.
pub(crate) fn commodity_demands(
    network: &FlowNetwork,
    vehicles: &[Vehicle],
    vehicle_ids: &[usize],
    source_node: impl Fn(&Vehicle) -> NodeId,
) -> VltResult<BTreeMap<NodeIndex, i64>> {
    let mut demands: BTreeMap<NodeIndex, i64> = BTreeMap::new();
    for &vehicle_id in vehicle_ids {
        let vehicle = &vehicles[vehicle_id];
        let source = source_node(vehicle);
        let sink = NodeId::normal(vehicle.due, vehicle.destination.clone());
        let source_index = network.node_index(&source).ok_or_else(|| {
            VltError::Validation(format!(
                "vehicle {} source node {} {} outside the horizon",
                vehicle_id, source.day, source.location
            ))
        })?;
        let sink_index = network.node_index(&sink).ok_or_else(|| {
            VltError::Validation(format!(
                "vehicle {} due-day node {} {} outside the horizon",
                vehicle_id, sink.day, sink.location
            ))
        })?;
        *demands.entry(source_index).or_default() -= 1;
        *demands.entry(sink_index).or_default() += 1;
    }
    // A vehicle already sitting on its sink node contributes zero net
    // demand; drop such entries so the solver sees a clean vector.
    demands.retain(|_, demand| *demand != 0);
    Ok(demands)
}

/// Plans all vehicles against one fixed set of trucks.
///
/// In the usual evaluation setup `trucks` holds the realised capacities, so
/// the result is the with-hindsight plan the rolling scheduler is compared
/// against.
pub fn solve_deterministically(
    vehicles: &[Vehicle],
    trucks: &BTreeMap<TruckId, Truck>,
    locations: &[vlt_core::Location],
    costs: CostConfig,
    order: GroupOrder,
) -> VltResult<(Vec<VehicleAssignment>, BTreeMap<TruckId, TruckAssignment>)> {
    if vehicles.is_empty() {
        return Ok((
            Vec::new(),
            truck_assignments_from_vehicle_assignments(&[], trucks),
        ));
    }
    validate_vehicles(vehicles)?;

    let mut network = FlowNetwork::build(vehicles, trucks, locations, costs)?;
    let now = network.first_day();
    let commodities = group_commodities(vehicles, order);

    let mut assignments: Vec<VehicleAssignment> = Vec::with_capacity(vehicles.len());
    for commodity in &commodities {
        if commodity.vehicle_ids.is_empty() {
            continue;
        }
        let demands = commodity_demands(&network, vehicles, &commodity.vehicle_ids, |v| {
            NodeId::normal(v.available, v.origin.clone())
        })?;
        let mut flow = solve_commodity_flow(&network, &demands).map_err(|err| {
            VltError::Solver(format!("commodity {} infeasible: {err}", commodity.key))
        })?;
        extract_final_assignments(
            &mut network,
            &mut flow,
            &commodity.vehicle_ids,
            vehicles,
            now,
            &mut assignments,
        );
    }

    assignments.sort_by_key(|a| a.id);
    let truck_assignments = truck_assignments_from_vehicle_assignments(&assignments, trucks);
    Ok((assignments, truck_assignments))
}
