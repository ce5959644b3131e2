//! Simulation session driver for architecture diagrams.
//!
//! [`SimulationOrchestrator`] sits between a diagram editor and the engine
//! algorithms. It owns the session state machine, the chaos repeat and the
//! round history; everything it exposes is committed, immutable data.

pub mod config;
pub mod orchestrator;
pub mod outcome;
pub mod scheduler;
pub mod session;
pub mod stats;

pub use config::{ChaosConfig, ChaosSubMode, ConfigError, SimulationConfig};
pub use orchestrator::SimulationOrchestrator;
pub use outcome::{NoOpReason, TransitionOutcome};
pub use scheduler::{ChaosTick, ManualScheduler, SessionToken, TickScheduler, TokioTickScheduler};
pub use session::{ChaosRoundRecord, Mode, SessionSnapshot, SessionState};
pub use stats::{round_intervals, FlowStats, ImpactStats, PartitionStats};
