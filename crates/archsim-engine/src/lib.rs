//! Simulation algorithms over an architecture graph snapshot.
//!
//! Every entry point is a pure function of its arguments: nothing here
//! holds state between calls or mutates the graph. Randomized algorithms
//! take the RNG as a parameter so callers control seeding.

pub mod blast;
pub mod chaos;
pub mod flow;
pub mod partition;
pub mod rng;
pub mod union_find;

pub use blast::{compute_blast_radius, BlastRadius, CascadeLevel};
pub use chaos::select_random_targets;
pub use flow::{trace_flow_path, BranchLevel, BranchStep, FlowStep, FlowTrace};
pub use partition::{compute_partition, PartitionResult};
