//! # vlt-algo: Time-Expanded Flow Planner
//!
//! The planning core: a time-expanded multi-commodity integer min-cost-flow
//! heuristic with a rolling-horizon real-time wrapper.
//!
//! ## How a plan is made
//!
//! 1. [`derate`] (optional) shrinks planned truck capacities from
//!    historical realisations so the plan leaves slack.
//! 2. [`network`] expands days x locations into a directed multigraph:
//!    truck arcs, waiting arcs, and dealer-side delay tracks that price
//!    late arrivals piecewise-linearly.
//! 3. [`commodity`] partitions vehicles by (due day, dealer).
//! 4. For each commodity in order, [`mincost`] solves a single-commodity
//!    integer min-cost flow over the capacities its predecessors left, and
//!    [`extract`] decomposes the flow into per-vehicle truck sequences.
//! 5. [`deterministic`] runs that sweep once with full information;
//!    [`realtime`] reruns it every simulated day, commits only the current
//!    day's departures against realised trucks and carries spillover
//!    forward.
//!
//! The sequential decomposition is deliberately heuristic. The optional
//! [`mip`] module (feature `mip`) solves the joint integer program for
//! ground-truth comparison.

pub mod commodity;
pub mod derate;
pub mod deterministic;
pub mod extract;
pub mod mincost;
#[cfg(feature = "mip")]
pub mod mip;
pub mod network;
pub mod realtime;

pub use commodity::{group_commodities, Commodity, CommodityKey, GroupOrder};
pub use derate::{derate_planned_capacities, CapacityHistory, DeratePolicy, HistoryKey};
pub use deterministic::solve_deterministically;
pub use extract::PlannedAssignment;
pub use mincost::{solve_commodity_flow, CommodityFlow};
#[cfg(feature = "mip")]
pub use mip::solve_as_mip;
pub use network::{Arc, CapacitySnapshot, FlowNetwork, NodeId, NodeRole, WAITING_ORDINAL};
pub use realtime::{solve_in_real_time, RealtimeOutcome};
