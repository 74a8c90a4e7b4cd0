//! Integer min-cost flow for a single commodity.
//!
//! Successive shortest augmenting paths with node potentials: every arc
//! weight in the time-expanded network is non-negative by construction, so
//! Dijkstra with reduced costs works from the first iteration (no
//! Bellman-Ford seed needed). Capacities and augmentation amounts are
//! integers throughout, so the resulting flow is integral; the extraction
//! step depends on that.
//!
//! The commodity's demand vector has one sink (positive entry) and any
//! number of sources (negative entries); sources hang off a synthetic super
//! source so one search serves them all.

use crate::network::FlowNetwork;
use petgraph::stable_graph::{EdgeIndex, NodeIndex};
use petgraph::visit::{EdgeRef, IntoEdgeReferences};
use std::cmp::Reverse;
use std::collections::{BTreeMap, BinaryHeap, HashMap};
use vlt_core::{VltError, VltResult};

/// Integral flow of one commodity, keyed by network arc.
#[derive(Debug, Clone, Default)]
pub struct CommodityFlow {
    /// Positive flow per arc; arcs without flow are absent.
    pub flow: HashMap<EdgeIndex, u32>,
    /// Total cost under the network weights (includes the symbolic
    /// free-truck bias, so this is a solver quantity, not the objective).
    pub cost: u64,
}

const INFINITY: i64 = i64::MAX / 4;

struct ResidualArc {
    to: usize,
    capacity: i64,
    cost: i64,
    /// The network arc this residual forward arc mirrors; `None` for super
    /// source arcs and all backward arcs.
    edge: Option<EdgeIndex>,
}

/// Solves the single-commodity integer min-cost flow over the network's
/// current residual capacities.
///
/// `demands` holds negative entries for sources and one positive entry for
/// the sink; entries must sum to zero. Returns [`VltError::Solver`] when the
/// demand cannot be routed.
pub fn solve_commodity_flow(
    network: &FlowNetwork,
    demands: &BTreeMap<NodeIndex, i64>,
) -> VltResult<CommodityFlow> {
    let supply: i64 = demands.values().filter(|&&d| d < 0).map(|d| -d).sum();
    let demand: i64 = demands.values().filter(|&&d| d > 0).sum();
    if supply != demand {
        return Err(VltError::Solver(format!(
            "commodity demand vector is unbalanced: supply {supply}, demand {demand}"
        )));
    }
    if demand == 0 {
        return Ok(CommodityFlow::default());
    }
    let sinks: Vec<NodeIndex> = demands
        .iter()
        .filter(|(_, &d)| d > 0)
        .map(|(&node, _)| node)
        .collect();
    if sinks.len() != 1 {
        return Err(VltError::Solver(format!(
            "commodity must have exactly one sink, found {}",
            sinks.len()
        )));
    }
    let sink_node = sinks[0];

    // Dense node numbering; the super source takes the last slot.
    let graph = network.graph();
    let mut dense: HashMap<NodeIndex, usize> = HashMap::with_capacity(graph.node_count());
    for node in graph.node_indices() {
        let next = dense.len();
        dense.insert(node, next);
    }
    let source = dense.len();
    let node_count = dense.len() + 1;

    let mut arcs: Vec<ResidualArc> = Vec::with_capacity(2 * graph.edge_count());
    let mut outgoing: Vec<Vec<usize>> = vec![Vec::new(); node_count];
    let push_arc = |arcs: &mut Vec<ResidualArc>,
                        outgoing: &mut Vec<Vec<usize>>,
                        from: usize,
                        to: usize,
                        capacity: i64,
                        cost: i64,
                        edge: Option<EdgeIndex>| {
        outgoing[from].push(arcs.len());
        arcs.push(ResidualArc {
            to,
            capacity,
            cost,
            edge,
        });
        outgoing[to].push(arcs.len());
        arcs.push(ResidualArc {
            to: from,
            capacity: 0,
            cost: -cost,
            edge: None,
        });
    };

    for edge in graph.edge_references() {
        let arc = edge.weight();
        if arc.capacity == 0 {
            continue;
        }
        push_arc(
            &mut arcs,
            &mut outgoing,
            dense[&edge.source()],
            dense[&edge.target()],
            arc.capacity as i64,
            arc.weight as i64,
            Some(edge.id()),
        );
    }
    for (&node, &node_demand) in demands {
        if node_demand < 0 {
            push_arc(
                &mut arcs,
                &mut outgoing,
                source,
                dense[&node],
                -node_demand,
                0,
                None,
            );
        }
    }
    let sink = dense[&sink_node];

    let mut potential = vec![0i64; node_count];
    let mut remaining = demand;
    let mut total_cost: i64 = 0;

    while remaining > 0 {
        // Dijkstra over reduced costs.
        let mut dist = vec![INFINITY; node_count];
        let mut previous_arc = vec![usize::MAX; node_count];
        let mut heap: BinaryHeap<Reverse<(i64, usize)>> = BinaryHeap::new();
        dist[source] = 0;
        heap.push(Reverse((0, source)));
        while let Some(Reverse((d, u))) = heap.pop() {
            if d > dist[u] {
                continue;
            }
            for &arc_index in &outgoing[u] {
                let arc = &arcs[arc_index];
                if arc.capacity <= 0 {
                    continue;
                }
                let reduced = d + arc.cost + potential[u] - potential[arc.to];
                if reduced < dist[arc.to] {
                    dist[arc.to] = reduced;
                    previous_arc[arc.to] = arc_index;
                    heap.push(Reverse((reduced, arc.to)));
                }
            }
        }
        if dist[sink] >= INFINITY {
            return Err(VltError::Solver(format!(
                "insufficient residual capacity: {remaining} of {demand} units unroutable"
            )));
        }
        // Capping at the sink distance keeps every residual arc's reduced
        // cost non-negative for the next round.
        let sink_dist = dist[sink];
        for v in 0..node_count {
            potential[v] += dist[v].min(sink_dist);
        }

        // Bottleneck along the augmenting path, capped by what is left.
        let mut bottleneck = remaining;
        let mut v = sink;
        while v != source {
            let arc_index = previous_arc[v];
            bottleneck = bottleneck.min(arcs[arc_index].capacity);
            v = arcs[arc_index ^ 1].to;
        }
        let mut v = sink;
        while v != source {
            let arc_index = previous_arc[v];
            arcs[arc_index].capacity -= bottleneck;
            arcs[arc_index ^ 1].capacity += bottleneck;
            total_cost += bottleneck * arcs[arc_index].cost;
            v = arcs[arc_index ^ 1].to;
        }
        remaining -= bottleneck;
    }

    // Net flow per network arc is what the backward residual accumulated.
    let mut result = CommodityFlow {
        flow: HashMap::new(),
        cost: total_cost as u64,
    };
    for (arc_index, arc) in arcs.iter().enumerate() {
        if let Some(edge) = arc.edge {
            let used = arcs[arc_index ^ 1].capacity;
            if used > 0 {
                result.flow.insert(edge, used as u32);
            }
        }
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::NodeId;
    use vlt_core::{CostConfig, Day, Location, LocationKind, Truck, TruckId, Vehicle};

    fn plant() -> Location {
        Location::new("GER01", LocationKind::Plant)
    }

    fn dealer() -> Location {
        Location::new("ITA01", LocationKind::Dealer)
    }

    fn vehicle(id: usize, available: Day, due: Day) -> Vehicle {
        Vehicle {
            id,
            origin: plant(),
            destination: dealer(),
            available,
            due,
        }
    }

    fn demands_for(
        network: &FlowNetwork,
        vehicles: &[Vehicle],
    ) -> BTreeMap<NodeIndex, i64> {
        let mut demands: BTreeMap<NodeIndex, i64> = BTreeMap::new();
        for v in vehicles {
            let source = network
                .node_index(&NodeId::normal(v.available, v.origin.clone()))
                .unwrap();
            let sink = network
                .node_index(&NodeId::normal(v.due, v.destination.clone()))
                .unwrap();
            *demands.entry(source).or_default() -= 1;
            *demands.entry(sink).or_default() += 1;
        }
        demands
    }

    fn solve_case(
        vehicles: Vec<Vehicle>,
        trucks: Vec<Truck>,
    ) -> VltResult<(CommodityFlow, FlowNetwork)> {
        let trucks: BTreeMap<TruckId, Truck> =
            trucks.into_iter().map(|t| (t.id(), t)).collect();
        let locations = vec![plant(), dealer()];
        let network =
            FlowNetwork::build(&vehicles, &trucks, &locations, CostConfig::default()).unwrap();
        let demands = demands_for(&network, &vehicles);
        let flow = solve_commodity_flow(&network, &demands)?;
        Ok((flow, network))
    }

    #[test]
    fn test_single_truck_exact_fit() {
        let d = Day::from_ymd(2025, 1, 1).unwrap();
        let truck = Truck {
            start: plant(),
            end: dealer(),
            departure: d + 1,
            arrival: d + 3,
            ordinal: 1,
            capacity: 1,
            price: 0,
        };
        let (flow, network) = solve_case(vec![vehicle(0, d, d + 4)], vec![truck]).unwrap();
        // The only route uses the truck arc; its symbolic cost is 3 days.
        let used: u32 = flow
            .flow
            .iter()
            .filter(|(&edge, _)| network.graph()[edge].ordinal != 0)
            .map(|(_, &f)| f)
            .sum();
        assert_eq!(used, 1);
        assert_eq!(flow.cost, 3);
    }

    #[test]
    fn test_unplanned_delay_cost_in_flow() {
        // Due two days before the only truck arrives: the flow must route
        // through the unplanned delay track (500 fixed + 100 per day).
        let d = Day::from_ymd(2025, 1, 1).unwrap();
        let truck = Truck {
            start: plant(),
            end: dealer(),
            departure: d + 1,
            arrival: d + 3,
            ordinal: 1,
            capacity: 1,
            price: 0,
        };
        let (flow, _) = solve_case(vec![vehicle(0, d, d + 2)], vec![truck]).unwrap();
        assert_eq!(flow.cost, 3 + 500 + 100);
    }

    #[test]
    fn test_planned_delay_preferred_when_cheaper() {
        // Due day 19 days out, truck arrives 2 days late: the planned track
        // (200 + 2 * 50) beats the unplanned one (500 + ...).
        let d = Day::from_ymd(2025, 1, 1).unwrap();
        let truck = Truck {
            start: plant(),
            end: dealer(),
            departure: d + 1,
            arrival: d + 21,
            ordinal: 1,
            capacity: 1,
            price: 0,
        };
        let (flow, _) = solve_case(vec![vehicle(0, d, d + 19)], vec![truck]).unwrap();
        assert_eq!(flow.cost, 21 + 200 + 2 * 50);
    }

    #[test]
    fn test_infeasible_without_trucks() {
        // A truck on an unrelated day keeps the horizon well-formed but
        // cannot carry the vehicle to its dealer in any direction.
        let d = Day::from_ymd(2025, 1, 1).unwrap();
        let unrelated = Truck {
            start: dealer(),
            end: plant(),
            departure: d + 1,
            arrival: d + 2,
            ordinal: 1,
            capacity: 1,
            price: 0,
        };
        let result = solve_case(vec![vehicle(0, d, d + 4)], vec![unrelated]);
        assert!(matches!(result, Err(VltError::Solver(_))));
    }

    #[test]
    fn test_capacity_split_across_parallel_trucks() {
        let d = Day::from_ymd(2025, 1, 1).unwrap();
        let cheap = Truck {
            start: plant(),
            end: dealer(),
            departure: d + 1,
            arrival: d + 2,
            ordinal: 1,
            capacity: 1,
            price: 10,
        };
        let pricey = Truck {
            start: plant(),
            end: dealer(),
            departure: d + 1,
            arrival: d + 2,
            ordinal: 2,
            capacity: 5,
            price: 400,
        };
        let vehicles = vec![vehicle(0, d, d + 5), vehicle(1, d, d + 5)];
        let (flow, network) = solve_case(vehicles, vec![cheap, pricey]).unwrap();
        let mut by_ordinal: Vec<(u32, u32)> = flow
            .flow
            .iter()
            .filter(|(&edge, _)| network.graph()[edge].ordinal != 0)
            .map(|(&edge, &f)| (network.graph()[edge].ordinal, f))
            .collect();
        by_ordinal.sort_unstable();
        // One unit on the cheap truck, the overflow unit on the pricey one.
        assert_eq!(by_ordinal, vec![(1, 1), (2, 1)]);
        assert_eq!(flow.cost, 10 + 400);
    }

    #[test]
    fn test_zero_demand() {
        let flow = {
            let d = Day::from_ymd(2025, 1, 1).unwrap();
            let truck = Truck {
                start: plant(),
                end: dealer(),
                departure: d + 1,
                arrival: d + 2,
                ordinal: 1,
                capacity: 1,
                price: 0,
            };
            let trucks: BTreeMap<TruckId, Truck> = [(truck.id(), truck)].into_iter().collect();
            let vehicles = vec![vehicle(0, d, d + 4)];
            let network = FlowNetwork::build(
                &vehicles,
                &trucks,
                &[plant(), dealer()],
                CostConfig::default(),
            )
            .unwrap();
            solve_commodity_flow(&network, &BTreeMap::new()).unwrap()
        };
        assert!(flow.flow.is_empty());
        assert_eq!(flow.cost, 0);
    }
}
