//! Session state machine.
//!
//! The session is an explicit tagged state: one payload per mode, plus the
//! stepping flag that outlives mode switches. All changes go through
//! [`SessionState::apply`], which consumes the state and returns the next
//! one together with a [`TransitionOutcome`]. A rejected event returns the
//! state unchanged.
//!
//! The reducer never computes anything itself. Algorithm results arrive
//! already finished inside the event, so a committed state only ever holds
//! complete results.

use std::collections::{BTreeSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use archsim_engine::{BlastRadius, FlowTrace, PartitionResult};
use serde::Serialize;

use crate::config::ChaosSubMode;
use crate::outcome::{NoOpReason, TransitionOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    Idle,
    Flow,
    Failure,
    Chaos,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Playback {
    Running,
    #[default]
    Paused,
}

#[derive(Debug, Clone, Default)]
pub struct FlowSession {
    pub source_node_id: Option<String>,
    pub trace: Option<Arc<FlowTrace>>,
    pub playback: Playback,
    /// Index into `trace.levels`, moved by the step controls.
    pub cursor: usize,
}

#[derive(Debug, Clone, Default)]
pub struct FailureSession {
    pub failed_node_ids: BTreeSet<String>,
    pub blast: Option<Arc<BlastRadius>>,
    pub playback: Playback,
}

#[derive(Debug, Clone, Default)]
pub struct ChaosSession {
    pub auto_running: bool,
    /// Rounds committed since chaos mode was entered. Also the index the
    /// next round will carry.
    pub round: u64,
    /// Nodes failed by the latest random-failure round.
    pub failed_node_ids: BTreeSet<String>,
    pub blast: Option<Arc<BlastRadius>>,
    pub partition: Option<Arc<PartitionResult>>,
    pub history: VecDeque<ChaosRoundRecord>,
}

/// Summary of one committed chaos round.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChaosRoundRecord {
    /// Zero-based round index.
    pub round: u64,
    pub sub_mode: ChaosSubMode,
    pub failed_node_ids: Vec<String>,
    pub affected_count: usize,
    pub severed_count: usize,
    /// Time since the chaos run started.
    pub elapsed_ms: u64,
}

/// The finished product of one chaos round.
#[derive(Debug, Clone)]
pub enum ChaosRoundResult {
    Failures {
        failed_node_ids: BTreeSet<String>,
        blast: BlastRadius,
    },
    Partition(PartitionResult),
}

#[derive(Debug, Clone)]
pub enum SessionEvent {
    SetMode(Mode),
    SelectSource(String),
    FlowComputed {
        source_node_id: String,
        trace: FlowTrace,
    },
    ToggleFailed(String),
    ClearFailed,
    FailureComputed(BlastRadius),
    ChaosStarted,
    RoundCommitted {
        result: ChaosRoundResult,
        elapsed: Duration,
        history_limit: usize,
    },
    SetStepping(bool),
    Pause,
    Resume,
    StepForward,
    StepBackward,
    Stop,
}

#[derive(Debug, Clone, Default)]
pub enum ModeState {
    #[default]
    Idle,
    Flow(FlowSession),
    Failure(FailureSession),
    Chaos(ChaosSession),
}

impl ModeState {
    fn enter(mode: Mode) -> Self {
        match mode {
            Mode::Idle => ModeState::Idle,
            Mode::Flow => ModeState::Flow(FlowSession::default()),
            Mode::Failure => ModeState::Failure(FailureSession::default()),
            Mode::Chaos => ModeState::Chaos(ChaosSession::default()),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SessionState {
    pub stepping: bool,
    pub mode: ModeState,
}

/// What the rendering and stats layers poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub mode: Mode,
    pub running: bool,
    pub stepping: bool,
    pub round: u64,
    pub cursor: usize,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> Mode {
        match &self.mode {
            ModeState::Idle => Mode::Idle,
            ModeState::Flow(_) => Mode::Flow,
            ModeState::Failure(_) => Mode::Failure,
            ModeState::Chaos(_) => Mode::Chaos,
        }
    }

    pub fn is_running(&self) -> bool {
        match &self.mode {
            ModeState::Idle => false,
            ModeState::Flow(f) => f.trace.is_some() && f.playback == Playback::Running,
            ModeState::Failure(f) => f.blast.is_some() && f.playback == Playback::Running,
            ModeState::Chaos(c) => c.auto_running,
        }
    }

    /// True while a repeating chaos run should be armed.
    pub fn wants_repeat(&self) -> bool {
        matches!(&self.mode, ModeState::Chaos(c) if c.auto_running)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let (round, cursor) = match &self.mode {
            ModeState::Flow(f) => (0, f.cursor),
            ModeState::Chaos(c) => (c.round, 0),
            _ => (0, 0),
        };
        SessionSnapshot {
            mode: self.mode(),
            running: self.is_running(),
            stepping: self.stepping,
            round,
            cursor,
        }
    }

    pub fn source_node_id(&self) -> Option<&str> {
        match &self.mode {
            ModeState::Flow(f) => f.source_node_id.as_deref(),
            _ => None,
        }
    }

    pub fn flow_trace(&self) -> Option<&Arc<FlowTrace>> {
        match &self.mode {
            ModeState::Flow(f) => f.trace.as_ref(),
            _ => None,
        }
    }

    /// Marked nodes in failure mode, or the latest round's victims in chaos.
    pub fn failed_node_ids(&self) -> Option<&BTreeSet<String>> {
        match &self.mode {
            ModeState::Failure(f) => Some(&f.failed_node_ids),
            ModeState::Chaos(c) => Some(&c.failed_node_ids),
            _ => None,
        }
    }

    pub fn blast_radius(&self) -> Option<&Arc<BlastRadius>> {
        match &self.mode {
            ModeState::Failure(f) => f.blast.as_ref(),
            ModeState::Chaos(c) => c.blast.as_ref(),
            _ => None,
        }
    }

    pub fn partition(&self) -> Option<&Arc<PartitionResult>> {
        match &self.mode {
            ModeState::Chaos(c) => c.partition.as_ref(),
            _ => None,
        }
    }

    pub fn chaos_history(&self) -> Option<&VecDeque<ChaosRoundRecord>> {
        match &self.mode {
            ModeState::Chaos(c) => Some(&c.history),
            _ => None,
        }
    }

    /// Apply one event, returning the next state.
    pub fn apply(mut self, event: SessionEvent) -> (Self, TransitionOutcome) {
        let outcome = self.reduce(event).into();
        (self, outcome)
    }

    // Every arm validates before it writes, so an `Err` leaves `self` as it was.
    fn reduce(&mut self, event: SessionEvent) -> Result<(), NoOpReason> {
        match event {
            SessionEvent::SetMode(mode) => {
                if self.mode() != mode {
                    self.mode = ModeState::enter(mode);
                }
                Ok(())
            }

            SessionEvent::SelectSource(id) => {
                let flow = self.flow_mut()?;
                flow.source_node_id = Some(id);
                flow.trace = None;
                flow.cursor = 0;
                flow.playback = Playback::Paused;
                Ok(())
            }

            SessionEvent::FlowComputed {
                source_node_id,
                trace,
            } => {
                let stepping = self.stepping;
                let flow = self.flow_mut()?;
                flow.source_node_id = Some(source_node_id);
                flow.trace = Some(Arc::new(trace));
                flow.cursor = 0;
                flow.playback = if stepping {
                    Playback::Paused
                } else {
                    Playback::Running
                };
                Ok(())
            }

            SessionEvent::ToggleFailed(id) => {
                let failure = self.failure_mut()?;
                if !failure.failed_node_ids.remove(&id) {
                    failure.failed_node_ids.insert(id);
                }
                failure.blast = None;
                failure.playback = Playback::Paused;
                Ok(())
            }

            SessionEvent::ClearFailed => {
                let failure = self.failure_mut()?;
                failure.failed_node_ids.clear();
                failure.blast = None;
                failure.playback = Playback::Paused;
                Ok(())
            }

            SessionEvent::FailureComputed(blast) => {
                let failure = self.failure_mut()?;
                if failure.failed_node_ids.is_empty() {
                    return Err(NoOpReason::EmptyFailureSet);
                }
                failure.blast = Some(Arc::new(blast));
                failure.playback = Playback::Running;
                Ok(())
            }

            SessionEvent::ChaosStarted => {
                // A new run starts from round 0 with an empty history.
                *self.chaos_mut()? = ChaosSession {
                    auto_running: true,
                    ..ChaosSession::default()
                };
                Ok(())
            }

            SessionEvent::RoundCommitted {
                result,
                elapsed,
                history_limit,
            } => {
                let chaos = self.chaos_mut()?;
                let index = chaos.round;
                chaos.round += 1;
                let record = match result {
                    ChaosRoundResult::Failures {
                        failed_node_ids,
                        blast,
                    } => {
                        let record = ChaosRoundRecord {
                            round: index,
                            sub_mode: ChaosSubMode::RandomFailure,
                            failed_node_ids: failed_node_ids.iter().cloned().collect(),
                            affected_count: blast.affected_node_ids.len(),
                            severed_count: 0,
                            elapsed_ms: elapsed.as_millis() as u64,
                        };
                        chaos.failed_node_ids = failed_node_ids;
                        chaos.blast = Some(Arc::new(blast));
                        chaos.partition = None;
                        record
                    }
                    ChaosRoundResult::Partition(partition) => {
                        let record = ChaosRoundRecord {
                            round: index,
                            sub_mode: ChaosSubMode::NetworkPartition,
                            failed_node_ids: Vec::new(),
                            affected_count: 0,
                            severed_count: partition.severed_edge_ids.len(),
                            elapsed_ms: elapsed.as_millis() as u64,
                        };
                        chaos.failed_node_ids.clear();
                        chaos.blast = None;
                        chaos.partition = Some(Arc::new(partition));
                        record
                    }
                };
                chaos.history.push_back(record);
                while chaos.history.len() > history_limit.max(1) {
                    chaos.history.pop_front();
                }
                Ok(())
            }

            SessionEvent::SetStepping(on) => {
                self.stepping = on;
                if let ModeState::Flow(flow) = &mut self.mode {
                    if on && flow.trace.is_some() {
                        flow.playback = Playback::Paused;
                    }
                }
                Ok(())
            }

            SessionEvent::Pause => match &mut self.mode {
                ModeState::Flow(f) if f.trace.is_some() && f.playback == Playback::Running => {
                    f.playback = Playback::Paused;
                    Ok(())
                }
                ModeState::Failure(f) if f.blast.is_some() && f.playback == Playback::Running => {
                    f.playback = Playback::Paused;
                    Ok(())
                }
                ModeState::Chaos(c) if c.auto_running => {
                    c.auto_running = false;
                    Ok(())
                }
                _ => Err(NoOpReason::NothingToResume),
            },

            SessionEvent::Resume => match &mut self.mode {
                ModeState::Flow(f) if f.trace.is_some() && f.playback == Playback::Paused => {
                    f.playback = Playback::Running;
                    Ok(())
                }
                ModeState::Failure(f) if f.blast.is_some() && f.playback == Playback::Paused => {
                    f.playback = Playback::Running;
                    Ok(())
                }
                ModeState::Chaos(c) if !c.auto_running && c.round > 0 => {
                    c.auto_running = true;
                    Ok(())
                }
                _ => Err(NoOpReason::NothingToResume),
            },

            SessionEvent::StepForward => {
                let stepping = self.stepping;
                let flow = self.flow_mut()?;
                let levels = match (&flow.trace, stepping) {
                    (Some(trace), true) => trace.level_count(),
                    _ => return Err(NoOpReason::NothingToResume),
                };
                flow.cursor = (flow.cursor + 1).min(levels.saturating_sub(1));
                Ok(())
            }

            SessionEvent::StepBackward => {
                let stepping = self.stepping;
                let flow = self.flow_mut()?;
                if flow.trace.is_none() || !stepping {
                    return Err(NoOpReason::NothingToResume);
                }
                flow.cursor = flow.cursor.saturating_sub(1);
                Ok(())
            }

            SessionEvent::Stop => {
                self.mode = ModeState::Idle;
                Ok(())
            }
        }
    }

    fn flow_mut(&mut self) -> Result<&mut FlowSession, NoOpReason> {
        match &mut self.mode {
            ModeState::Flow(f) => Ok(f),
            _ => Err(NoOpReason::WrongMode),
        }
    }

    fn failure_mut(&mut self) -> Result<&mut FailureSession, NoOpReason> {
        match &mut self.mode {
            ModeState::Failure(f) => Ok(f),
            _ => Err(NoOpReason::WrongMode),
        }
    }

    fn chaos_mut(&mut self) -> Result<&mut ChaosSession, NoOpReason> {
        match &mut self.mode {
            ModeState::Chaos(c) => Ok(c),
            _ => Err(NoOpReason::WrongMode),
        }
    }
}
