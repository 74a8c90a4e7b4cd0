//! Global multi-commodity integer program (validation mode).
//!
//! The sequential per-commodity decomposition is a heuristic; this module
//! formulates the same time-expanded network as one integer program with
//! per-commodity flow conservation, shared capacity per arc and the network
//! weights as the objective, and hands it to an integer-capable LP backend
//! (HiGHS via `good_lp`). Solving the joint program gives the ground-truth
//! optimum the heuristic can be compared against.
//!
//! Graph construction, commodity grouping and flow extraction are all
//! shared with the sequential solver; only the flow computation differs.
//! This is an offline validation path, not a production mode: the model
//! has one integer variable per (commodity, arc) pair and grows quickly.

use crate::commodity::{group_commodities, GroupOrder};
use crate::deterministic::commodity_demands;
use crate::extract::extract_final_assignments;
use crate::mincost::CommodityFlow;
use crate::network::{FlowNetwork, NodeId};
use good_lp::solvers::highs::highs;
use good_lp::{constraint, variable, variables, Expression, Solution, SolverModel, Variable};
use petgraph::stable_graph::EdgeIndex;
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use std::collections::{BTreeMap, HashMap};
use vlt_core::{
    truck_assignments_from_vehicle_assignments, CostConfig, Location, Truck, TruckAssignment,
    TruckId, Vehicle, VehicleAssignment, VltError, VltResult,
};

/// Plans all vehicles by solving the joint multi-commodity integer program
/// to optimality. Shares inputs and outputs with
/// [`crate::deterministic::solve_deterministically`].
pub fn solve_as_mip(
    vehicles: &[Vehicle],
    trucks: &BTreeMap<TruckId, Truck>,
    locations: &[Location],
    costs: CostConfig,
    order: GroupOrder,
) -> VltResult<(Vec<VehicleAssignment>, BTreeMap<TruckId, TruckAssignment>)> {
    if vehicles.is_empty() {
        return Ok((
            Vec::new(),
            truck_assignments_from_vehicle_assignments(&[], trucks),
        ));
    }

    let mut network = FlowNetwork::build(vehicles, trucks, locations, costs)?;
    let commodities = group_commodities(vehicles, order);
    let demands: Vec<_> = commodities
        .iter()
        .map(|commodity| {
            commodity_demands(&network, vehicles, &commodity.vehicle_ids, |v| {
                NodeId::normal(v.available, v.origin.clone())
            })
        })
        .collect::<VltResult<_>>()?;

    // One integer variable per (commodity, capacitated arc).
    let mut problem = variables!();
    let mut flow_vars: Vec<HashMap<EdgeIndex, Variable>> = Vec::with_capacity(commodities.len());
    let mut objective = Expression::from(0.0);
    for _ in &commodities {
        let mut per_edge: HashMap<EdgeIndex, Variable> = HashMap::new();
        for edge in network.graph().edge_references() {
            let arc = edge.weight();
            if arc.capacity == 0 {
                continue;
            }
            let var = problem.add(variable().integer().min(0).max(arc.capacity as f64));
            objective += Expression::from(var) * (arc.weight as f64);
            per_edge.insert(edge.id(), var);
        }
        flow_vars.push(per_edge);
    }

    let mut model = problem.minimise(objective).using(highs);

    // Shared capacity: the commodities together stay within each arc.
    for edge in network.graph().edge_references() {
        let arc = edge.weight();
        if arc.capacity == 0 {
            continue;
        }
        let mut total = Expression::from(0.0);
        for per_edge in &flow_vars {
            total += Expression::from(per_edge[&edge.id()]);
        }
        model = model.with(constraint!(total <= arc.capacity as f64));
    }

    // Per-commodity conservation: inflow minus outflow equals the node's
    // demand (positive at the sink, negative at sources, zero elsewhere).
    for (commodity_index, per_edge) in flow_vars.iter().enumerate() {
        for node in network.graph().node_indices() {
            let mut balance = Expression::from(0.0);
            for edge in network.graph().edges_directed(node, Direction::Incoming) {
                if let Some(var) = per_edge.get(&edge.id()) {
                    balance += Expression::from(*var);
                }
            }
            for edge in network.graph().edges_directed(node, Direction::Outgoing) {
                if let Some(var) = per_edge.get(&edge.id()) {
                    balance -= Expression::from(*var);
                }
            }
            let demand = demands[commodity_index]
                .get(&node)
                .copied()
                .unwrap_or(0);
            model = model.with(constraint!(balance == demand as f64));
        }
    }

    let solution = model
        .solve()
        .map_err(|err| VltError::Solver(format!("integer program failed: {err}")))?;

    // Read the joint optimum back as per-commodity flows and reuse the
    // standard extractor.
    let mut assignments: Vec<VehicleAssignment> = Vec::with_capacity(vehicles.len());
    let now = network.first_day();
    for (commodity, per_edge) in commodities.iter().zip(flow_vars.iter()) {
        let mut flow = CommodityFlow::default();
        for (&edge, &var) in per_edge {
            let units = solution.value(var).round() as i64;
            if units > 0 {
                flow.flow.insert(edge, units as u32);
            }
        }
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

#[cfg(test)]
mod tests {
    use super::*;
    use vlt_core::{Day, LocationKind};

    #[test]
    fn test_mip_matches_heuristic_on_simple_case() {
        let plant = Location::new("GER01", LocationKind::Plant);
        let dealer = Location::new("ITA01", LocationKind::Dealer);
        let d = Day::from_ymd(2025, 1, 1).unwrap();
        let truck = Truck {
            start: plant.clone(),
            end: dealer.clone(),
            departure: d + 1,
            arrival: d + 3,
            ordinal: 1,
            capacity: 2,
            price: 100,
        };
        let trucks: BTreeMap<TruckId, Truck> = [(truck.id(), truck.clone())].into_iter().collect();
        let vehicles: Vec<Vehicle> = (0..2)
            .map(|id| Vehicle {
                id,
                origin: plant.clone(),
                destination: dealer.clone(),
                available: d,
                due: d + 5,
            })
            .collect();

        let (mip_vas, _) = solve_as_mip(
            &vehicles,
            &trucks,
            &[plant.clone(), dealer.clone()],
            CostConfig::default(),
            GroupOrder::Ascending,
        )
        .unwrap();
        let (seq_vas, _) = crate::deterministic::solve_deterministically(
            &vehicles,
            &trucks,
            &[plant, dealer],
            CostConfig::default(),
            GroupOrder::Ascending,
        )
        .unwrap();

        assert_eq!(mip_vas, seq_vas);
    }
}
