//! The time-expanded flow network.
//!
//! Nodes are `(day, location, role)` triples over the inclusive planning
//! horizon. Arcs encode the three ways a vehicle can spend a day:
//!
//! - **Waiting arcs** `(d, loc) -> (d+1, loc)`: free, effectively
//!   uncapacitated (capacity = vehicle count).
//! - **Truck arcs**: one parallel arc per truck, keyed by the truck ordinal,
//!   from the departure node to the arrival node. Arrival at a non-dealer
//!   location lands one day late (the mandatory rest day). A free truck
//!   carries a symbolic day-proportional cost so the solver still prefers
//!   moving early when prices tie at zero.
//! - **Dealer delay tracks**: auxiliary nodes per dealer and day that let
//!   late flow walk backwards to its due day while paying the delay
//!   penalty. Days closer than the notice period to `now` only have the
//!   unplanned track; later days carry a planned track (cheap, announced in
//!   advance) and an unplanned track side by side, merging at the boundary
//!   day `now + notice`.
//!
//! The min-cost solver therefore chooses, per unit of late demand, between
//! announcing a planned delay and paying the cheaper per-day rate, or
//! keeping quiet and paying the unplanned rate. All weights are
//! non-negative by construction.
//!
//! Residual capacities on arcs are shared across commodities and mutate
//! monotonically downward during a plan; the rolling scheduler snapshots
//! and restores them around each day's sweep.

use petgraph::stable_graph::{EdgeIndex, NodeIndex, StableDiGraph};
use petgraph::visit::EdgeRef;
use std::collections::{BTreeMap, BinaryHeap, HashMap};
use vlt_core::{
    planning_horizon, CostConfig, Day, Location, LocationKind, Truck, TruckId, Vehicle, VltError,
    VltResult,
};

/// Arc key reserved for waiting and delay arcs; truck ordinals start at 1.
pub const WAITING_ORDINAL: u32 = 0;

/// Cost per horizon day charged to zero-priced truck arcs, so that among
/// otherwise free plans the solver deterministically prefers earlier trucks.
/// Ignored by the objective; it only breaks ties inside the solver.
const FREE_TRUCK_DAY_COST: u64 = 1;

/// Role of a node in the time expansion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum NodeRole {
    /// A real place on a real day.
    Normal,
    /// Delay track entered by announced (planned) late arrivals; doubles as
    /// the only track within the notice window, where every delay is
    /// unplanned by definition.
    DelayFixed,
    /// Delay track for unannounced late arrivals beyond the notice window.
    DelayVariable,
}

/// Identity of a node: day, location and role.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId {
    pub day: Day,
    pub location: Location,
    pub role: NodeRole,
}

impl NodeId {
    pub fn normal(day: Day, location: Location) -> Self {
        NodeId {
            day,
            location,
            role: NodeRole::Normal,
        }
    }
}

/// Arc payload: residual capacity, unit cost and the parallel-arc key.
#[derive(Debug, Clone)]
pub struct Arc {
    pub capacity: u32,
    pub weight: u64,
    /// Truck ordinal for truck arcs, [`WAITING_ORDINAL`] otherwise.
    pub ordinal: u32,
}

/// Saved residual capacities, restorable onto the same network.
#[derive(Debug, Clone)]
pub struct CapacitySnapshot(Vec<(EdgeIndex, u32)>);

/// The time-expanded multigraph a plan runs on.
///
/// One planner instance owns one network; instances never share graph state.
pub struct FlowNetwork {
    graph: StableDiGraph<NodeId, Arc>,
    nodes: HashMap<NodeId, NodeIndex>,
    truck_edges: HashMap<TruckId, EdgeIndex>,
    first_day: Day,
    last_day: Day,
    /// Current simulated day; anchors the delay-regime boundary.
    now: Day,
    /// Stand-in for "unbounded" capacity on waiting and delay arcs.
    unbounded: u32,
    costs: CostConfig,
    locations: Vec<Location>,
}

impl FlowNetwork {
    /// Builds the network for the given demand and transport supply.
    ///
    /// `now` starts at the first horizon day; the rolling scheduler advances
    /// it with [`FlowNetwork::advance_day`].
    pub fn build(
        vehicles: &[Vehicle],
        trucks: &BTreeMap<TruckId, Truck>,
        locations: &[Location],
        costs: CostConfig,
    ) -> VltResult<Self> {
        let (first_day, last_day) = planning_horizon(vehicles, trucks)?;
        Self::build_bounded(vehicles, trucks, locations, costs, first_day, last_day)
    }

    /// Like [`FlowNetwork::build`] with an explicitly chosen horizon.
    ///
    /// The rolling scheduler sizes the horizon over planned *and* realised
    /// trucks (a realised truck may run later than anything planned) while
    /// only installing the planned ones as arcs.
    pub fn build_bounded(
        vehicles: &[Vehicle],
        trucks: &BTreeMap<TruckId, Truck>,
        locations: &[Location],
        costs: CostConfig,
        first_day: Day,
        last_day: Day,
    ) -> VltResult<Self> {
        let mut network = FlowNetwork {
            graph: StableDiGraph::new(),
            nodes: HashMap::new(),
            truck_edges: HashMap::new(),
            first_day,
            last_day,
            now: first_day,
            unbounded: vehicles.len() as u32,
            costs,
            locations: locations.to_vec(),
        };

        let location_list = network.locations.clone();
        for day in first_day.range_inclusive(last_day) {
            for location in &location_list {
                network.add_node(NodeId::normal(day, location.clone()));
            }
        }

        // Waiting arcs: stay put for a day, free of charge.
        let unbounded = network.unbounded;
        for day in first_day.range_inclusive(last_day) {
            if day == last_day {
                break;
            }
            for location in &location_list {
                let from = NodeId::normal(day, location.clone());
                let to = NodeId::normal(day.succ(), location.clone());
                network.add_arc(&from, &to, unbounded, 0, WAITING_ORDINAL);
            }
        }

        for truck in trucks.values() {
            network.install_truck(truck, truck.capacity)?;
        }

        // Dealer delay tracks, built day by day so each day can link back to
        // the previous one.
        for day in first_day.range_inclusive(last_day) {
            for location in &location_list {
                if location.is_dealer() {
                    network.build_delay_track(day, location.clone());
                }
            }
        }

        Ok(network)
    }

    fn add_node(&mut self, id: NodeId) -> NodeIndex {
        if let Some(&index) = self.nodes.get(&id) {
            return index;
        }
        let index = self.graph.add_node(id.clone());
        self.nodes.insert(id, index);
        index
    }

    fn add_arc(&mut self, from: &NodeId, to: &NodeId, capacity: u32, weight: u64, ordinal: u32) {
        let from_index = self.nodes[from];
        let to_index = self.nodes[to];
        self.graph.add_edge(
            from_index,
            to_index,
            Arc {
                capacity,
                weight,
                ordinal,
            },
        );
    }

    /// Start and end nodes of a truck arc. Arrival at a non-dealer location
    /// is shifted one day for the mandatory rest.
    pub fn truck_endpoints(truck: &Truck) -> (NodeId, NodeId) {
        let arrival = if truck.end.kind == LocationKind::Dealer {
            truck.arrival
        } else {
            truck.arrival + 1
        };
        (
            NodeId::normal(truck.departure, truck.start.clone()),
            NodeId::normal(arrival, truck.end.clone()),
        )
    }

    /// Adds a truck arc with the given capacity (planned or realised).
    pub fn install_truck(&mut self, truck: &Truck, capacity: u32) -> VltResult<()> {
        let (start, end) = Self::truck_endpoints(truck);
        if !self.nodes.contains_key(&start) || !self.nodes.contains_key(&end) {
            return Err(VltError::Validation(format!(
                "truck {} falls outside the planning horizon",
                truck.id()
            )));
        }
        let weight = if truck.price != 0 {
            truck.price as u64
        } else {
            (truck.arrival - self.first_day).max(0) as u64 * FREE_TRUCK_DAY_COST
        };
        let from_index = self.nodes[&start];
        let to_index = self.nodes[&end];
        let edge = self.graph.add_edge(
            from_index,
            to_index,
            Arc {
                capacity,
                weight,
                ordinal: truck.ordinal,
            },
        );
        self.truck_edges.insert(truck.id(), edge);
        Ok(())
    }

    /// Removes the arc of one truck, if present.
    pub fn remove_truck(&mut self, truck_id: &TruckId) {
        if let Some(edge) = self.truck_edges.remove(truck_id) {
            self.graph.remove_edge(edge);
        }
    }

    fn build_delay_track(&mut self, day: Day, dealer: Location) {
        let unbounded = self.unbounded;
        let costs = self.costs;
        let boundary = self.now + costs.notice_days;
        let normal = NodeId::normal(day, dealer.clone());
        let fixed = NodeId {
            day,
            location: dealer.clone(),
            role: NodeRole::DelayFixed,
        };
        self.add_node(fixed.clone());

        if day < boundary {
            // Inside the notice window every delay is unplanned.
            self.add_arc(
                &normal,
                &fixed,
                unbounded,
                costs.fixed_unplanned_delay as u64,
                WAITING_ORDINAL,
            );
            self.add_arc(&fixed, &normal, unbounded, 0, WAITING_ORDINAL);
            if day != self.first_day {
                let previous_fixed = NodeId {
                    day: day.pred(),
                    location: dealer,
                    role: NodeRole::DelayFixed,
                };
                self.add_arc(
                    &fixed,
                    &previous_fixed,
                    unbounded,
                    costs.per_unplanned_delay_day as u64,
                    WAITING_ORDINAL,
                );
            }
        } else {
            // Beyond the notice window: planned track (fixed) next to the
            // unplanned track (variable).
            self.add_arc(
                &normal,
                &fixed,
                unbounded,
                costs.fixed_planned_delay as u64,
                WAITING_ORDINAL,
            );
            self.add_arc(&fixed, &normal, unbounded, 0, WAITING_ORDINAL);

            let variable = NodeId {
                day,
                location: dealer.clone(),
                role: NodeRole::DelayVariable,
            };
            self.add_node(variable.clone());
            self.add_arc(
                &normal,
                &variable,
                unbounded,
                costs.fixed_unplanned_delay as u64,
                WAITING_ORDINAL,
            );

            let previous_fixed = NodeId {
                day: day.pred(),
                location: dealer.clone(),
                role: NodeRole::DelayFixed,
            };
            if day != boundary {
                let previous_variable = NodeId {
                    day: day.pred(),
                    location: dealer,
                    role: NodeRole::DelayVariable,
                };
                self.add_arc(
                    &fixed,
                    &previous_fixed,
                    unbounded,
                    costs.per_planned_delay_day as u64,
                    WAITING_ORDINAL,
                );
                self.add_arc(
                    &variable,
                    &previous_variable,
                    unbounded,
                    costs.per_unplanned_delay_day as u64,
                    WAITING_ORDINAL,
                );
            } else {
                // Boundary day: the unplanned track drains into the fixed
                // chain of the notice window; the planned track stops here.
                self.add_arc(
                    &variable,
                    &previous_fixed,
                    unbounded,
                    costs.per_unplanned_delay_day as u64,
                    WAITING_ORDINAL,
                );
            }
        }
    }

    /// Converts the delay track of day `now + notice` to the unplanned
    /// regime, called when the simulated day advances past `now`.
    fn rewire_delay_boundary(&mut self) {
        let day = self.now + self.costs.notice_days;
        if day > self.last_day {
            return;
        }
        let unbounded = self.unbounded;
        let costs = self.costs;
        for dealer in self.locations.clone() {
            if !dealer.is_dealer() {
                continue;
            }
            let normal = NodeId::normal(day, dealer.clone());
            let fixed = NodeId {
                day,
                location: dealer.clone(),
                role: NodeRole::DelayFixed,
            };
            let variable = NodeId {
                day,
                location: dealer.clone(),
                role: NodeRole::DelayVariable,
            };

            // Drop the variable node along with all its arcs.
            if let Some(index) = self.nodes.remove(&variable) {
                self.graph.remove_node(index);
            }

            let fixed_index = self.nodes[&fixed];

            // The next day keeps its planned track but may no longer walk
            // into a day that is now inside the notice window.
            let next_fixed = NodeId {
                day: day.succ(),
                location: dealer.clone(),
                role: NodeRole::DelayFixed,
            };
            if let Some(&next_index) = self.nodes.get(&next_fixed) {
                if let Some(edge) = self.graph.find_edge(next_index, fixed_index) {
                    self.graph.remove_edge(edge);
                }
            }

            // Entering this day's track now costs the unplanned rate.
            let normal_index = self.nodes[&normal];
            if let Some(edge) = self.graph.find_edge(normal_index, fixed_index) {
                if let Some(arc) = self.graph.edge_weight_mut(edge) {
                    arc.weight = costs.fixed_unplanned_delay as u64;
                }
            }

            // Continue the unplanned chain backwards.
            let previous_fixed = NodeId {
                day: day.pred(),
                location: dealer.clone(),
                role: NodeRole::DelayFixed,
            };
            if self.nodes.contains_key(&previous_fixed) {
                self.add_arc(
                    &fixed,
                    &previous_fixed,
                    unbounded,
                    costs.per_unplanned_delay_day as u64,
                    WAITING_ORDINAL,
                );
            }

            // The following day becomes the new boundary: its unplanned
            // track drains into this day's fixed chain.
            let next_variable = NodeId {
                day: day.succ(),
                location: dealer,
                role: NodeRole::DelayVariable,
            };
            if self.nodes.contains_key(&next_variable) {
                self.add_arc(
                    &next_variable,
                    &fixed,
                    unbounded,
                    costs.per_unplanned_delay_day as u64,
                    WAITING_ORDINAL,
                );
            }
        }
    }

    /// Ends the simulated day: planned trucks that departed today stop being
    /// a future resource, and the delay-regime boundary moves one day out.
    ///
    /// Departed trucks live on only in the commit bookkeeping (vehicle
    /// positions and final loads); re-installing them here would let later
    /// replans route flow through trucks that already left.
    pub fn advance_day(&mut self, planned_departing_today: impl Iterator<Item = TruckId>) {
        for truck_id in planned_departing_today {
            self.remove_truck(&truck_id);
        }
        self.rewire_delay_boundary();
        self.now = self.now.succ();
    }

    /// Earliest day a vehicle standing at `from` can reach `destination`
    /// using trucks with residual capacity, ignoring seat competition.
    /// Used by the commit-time reassignment probe.
    pub fn earliest_arrival(&self, from: &NodeId, destination: &Location) -> Option<Day> {
        if &from.location == destination {
            return Some(from.day);
        }
        let start = *self.nodes.get(from)?;
        // All candidate arcs move forward in time, so a day-ordered frontier
        // pops each node at its earliest reachable day.
        let mut best: HashMap<NodeIndex, Day> = HashMap::new();
        let mut heap: BinaryHeap<std::cmp::Reverse<(Day, NodeIndex)>> = BinaryHeap::new();
        best.insert(start, from.day);
        heap.push(std::cmp::Reverse((from.day, start)));
        while let Some(std::cmp::Reverse((day, index))) = heap.pop() {
            let node = &self.graph[index];
            if &node.location == destination {
                return Some(day);
            }
            if best.get(&index).is_some_and(|&d| d < day) {
                continue;
            }
            for edge in self.graph.edges(index) {
                let arc = edge.weight();
                let target = edge.target();
                let target_node = &self.graph[target];
                if target_node.role != NodeRole::Normal {
                    continue;
                }
                let is_waiting = arc.ordinal == WAITING_ORDINAL;
                if !is_waiting && arc.capacity == 0 {
                    continue;
                }
                let arrival = target_node.day;
                if best.get(&target).map_or(true, |&d| arrival < d) {
                    best.insert(target, arrival);
                    heap.push(std::cmp::Reverse((arrival, target)));
                }
            }
        }
        None
    }

    pub fn snapshot_capacities(&self) -> CapacitySnapshot {
        CapacitySnapshot(
            self.graph
                .edge_indices()
                .map(|edge| (edge, self.graph[edge].capacity))
                .collect(),
        )
    }

    pub fn restore_capacities(&mut self, snapshot: &CapacitySnapshot) {
        for &(edge, capacity) in &snapshot.0 {
            if let Some(arc) = self.graph.edge_weight_mut(edge) {
                arc.capacity = capacity;
            }
        }
    }

    pub fn decrement_capacity(&mut self, edge: EdgeIndex) {
        if let Some(arc) = self.graph.edge_weight_mut(edge) {
            arc.capacity = arc.capacity.saturating_sub(1);
        }
    }

    pub fn graph(&self) -> &StableDiGraph<NodeId, Arc> {
        &self.graph
    }

    pub fn node_index(&self, id: &NodeId) -> Option<NodeIndex> {
        self.nodes.get(id).copied()
    }

    pub fn node_id(&self, index: NodeIndex) -> &NodeId {
        &self.graph[index]
    }

    pub fn first_day(&self) -> Day {
        self.first_day
    }

    pub fn last_day(&self) -> Day {
        self.last_day
    }

    pub fn now(&self) -> Day {
        self.now
    }

    pub fn costs(&self) -> &CostConfig {
        &self.costs
    }

    pub fn locations(&self) -> &[Location] {
        &self.locations
    }
}
