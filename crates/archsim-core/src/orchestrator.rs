//! The simulation orchestrator.
//!
//! Owns the [`SessionState`], pulls a fresh graph snapshot for every
//! operation, runs the engine algorithms and commits their finished results.
//! Every public operation returns a [`TransitionOutcome`]; a request that
//! makes no sense in the current state is ignored and logged, never raised.
//!
//! The chaos repeat is driven through a [`TickScheduler`]. Each arm uses a
//! fresh [`SessionToken`], and [`SimulationOrchestrator::handle_tick`]
//! discards any tick whose token is not the one currently armed.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use archsim_engine::rng::{round_rng, session_seed};
use archsim_engine::{
    compute_blast_radius, compute_partition, select_random_targets, trace_flow_path, BlastRadius,
    FlowTrace, PartitionResult,
};
use archsim_graph::{GraphAccessor, GraphSnapshot};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::config::{ChaosConfig, ChaosSubMode, SimulationConfig};
use crate::outcome::{NoOpReason, TransitionOutcome};
use crate::scheduler::{ChaosTick, SessionToken, TickScheduler, TokioTickScheduler};
use crate::session::{
    ChaosRoundRecord, ChaosRoundResult, Mode, SessionEvent, SessionSnapshot, SessionState,
};

pub struct SimulationOrchestrator<A, S = TokioTickScheduler> {
    accessor: A,
    scheduler: S,
    config: SimulationConfig,
    /// Live chaos settings; starts as `config.chaos`, restored on reset.
    chaos: ChaosConfig,
    seed: u64,
    state: SessionState,
    token: SessionToken,
    armed: Option<(SessionToken, Duration)>,
    chaos_started_at: Option<Instant>,
}

impl<A: GraphAccessor> SimulationOrchestrator<A, TokioTickScheduler> {
    /// Orchestrator driven by a tokio interval task. Ticks arrive on the
    /// returned receiver and must be passed to [`Self::handle_tick`].
    pub fn with_tokio(
        accessor: A,
        config: SimulationConfig,
    ) -> (Self, mpsc::UnboundedReceiver<ChaosTick>) {
        let (scheduler, ticks) = TokioTickScheduler::new();
        (Self::new(accessor, scheduler, config), ticks)
    }
}

impl<A: GraphAccessor, S: TickScheduler> SimulationOrchestrator<A, S> {
    pub fn new(accessor: A, scheduler: S, config: SimulationConfig) -> Self {
        let chaos = config.chaos.clone().normalized();
        let seed = session_seed(config.seed);
        debug!(seed, "orchestrator created");
        Self {
            accessor,
            scheduler,
            config,
            chaos,
            seed,
            state: SessionState::new(),
            token: SessionToken::default(),
            armed: None,
            chaos_started_at: None,
        }
    }

    // ── Read side ────────────────────────────────────────────────────

    pub fn snapshot(&self) -> SessionSnapshot {
        self.state.snapshot()
    }

    pub fn mode(&self) -> Mode {
        self.state.mode()
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn chaos_config(&self) -> &ChaosConfig {
        &self.chaos
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    /// Token of the currently armed chaos run, if one is armed.
    pub fn armed_token(&self) -> Option<SessionToken> {
        self.armed.map(|(token, _)| token)
    }

    pub fn flow_trace(&self) -> Option<Arc<FlowTrace>> {
        self.state.flow_trace().cloned()
    }

    pub fn blast_radius(&self) -> Option<Arc<BlastRadius>> {
        self.state.blast_radius().cloned()
    }

    pub fn partition(&self) -> Option<Arc<PartitionResult>> {
        self.state.partition().cloned()
    }

    /// Oldest first. Empty outside chaos mode.
    pub fn chaos_history(&self) -> Vec<ChaosRoundRecord> {
        self.state
            .chaos_history()
            .map(|history| history.iter().cloned().collect())
            .unwrap_or_default()
    }

    // ── Mode and selections ──────────────────────────────────────────

    /// Switch modes. Leaving a mode drops its selections and results, and
    /// leaving chaos cancels the repeat.
    pub fn set_mode(&mut self, mode: Mode) -> TransitionOutcome {
        self.transition("set_mode", |this| {
            let from = this.state.mode();
            this.commit(SessionEvent::SetMode(mode))?;
            if from != mode {
                // Round timing belongs to the chaos session just left or entered.
                this.chaos_started_at = None;
                info!(?from, to = ?mode, "mode switched");
            }
            Ok(())
        })
    }

    pub fn select_source(&mut self, node_id: &str) -> TransitionOutcome {
        self.transition("select_source", |this| {
            this.require_mode(Mode::Flow)?;
            if !this.accessor.snapshot().is_architecture_node(node_id) {
                return Err(NoOpReason::InvalidSource);
            }
            this.commit(SessionEvent::SelectSource(node_id.to_string()))
        })
    }

    pub fn toggle_failed(&mut self, node_id: &str) -> TransitionOutcome {
        self.transition("toggle_failed", |this| {
            this.require_mode(Mode::Failure)?;
            if !this.accessor.snapshot().is_architecture_node(node_id) {
                return Err(NoOpReason::UnknownNode);
            }
            this.commit(SessionEvent::ToggleFailed(node_id.to_string()))
        })
    }

    pub fn clear_failed(&mut self) -> TransitionOutcome {
        self.transition("clear_failed", |this| this.commit(SessionEvent::ClearFailed))
    }

    /// Toggle chaos protection for a node. Allowed in any mode; takes effect
    /// from the next chaos round.
    pub fn toggle_protected(&mut self, node_id: &str) -> TransitionOutcome {
        self.transition("toggle_protected", |this| {
            if !this.accessor.snapshot().is_architecture_node(node_id) {
                return Err(NoOpReason::UnknownNode);
            }
            let protected = &mut this.chaos.protected_node_ids;
            if !protected.remove(node_id) {
                protected.insert(node_id.to_string());
            }
            Ok(())
        })
    }

    pub fn set_stepping(&mut self, stepping: bool) -> TransitionOutcome {
        self.transition("set_stepping", |this| {
            this.commit(SessionEvent::SetStepping(stepping))
        })
    }

    /// Replace the live chaos settings. Out-of-range values are clamped. A
    /// running repeat picks up a changed interval immediately.
    pub fn set_chaos_config(&mut self, config: ChaosConfig) -> TransitionOutcome {
        self.transition("set_chaos_config", |this| {
            this.chaos = config.normalized();
            debug!(
                interval_ms = this.chaos.interval_ms,
                sub_mode = ?this.chaos.sub_mode,
                "chaos config updated"
            );
            Ok(())
        })
    }

    // ── Simulations ──────────────────────────────────────────────────

    /// Trace a request flow from `source_node_id`.
    pub fn start_flow(&mut self, source_node_id: &str) -> TransitionOutcome {
        self.transition("start_flow", |this| {
            this.require_mode(Mode::Flow)?;
            let graph = this.accessor.snapshot();
            if !graph.is_architecture_node(source_node_id) {
                return Err(NoOpReason::InvalidSource);
            }
            let trace = trace_flow_path(&graph.architecture_edges(), source_node_id);
            info!(
                source = source_node_id,
                hops = trace.hop_count(),
                levels = trace.level_count(),
                "flow started"
            );
            this.commit(SessionEvent::FlowComputed {
                source_node_id: source_node_id.to_string(),
                trace,
            })
        })
    }

    /// Trace from the source chosen with [`Self::select_source`].
    pub fn start_selected_flow(&mut self) -> TransitionOutcome {
        match self.state.source_node_id().map(str::to_string) {
            Some(source) => self.start_flow(&source),
            None => self.transition("start_flow", |_| Err(NoOpReason::InvalidSource)),
        }
    }

    /// Compute the blast radius of the marked nodes.
    pub fn start_failure(&mut self) -> TransitionOutcome {
        self.transition("start_failure", |this| {
            this.require_mode(Mode::Failure)?;
            let graph = this.accessor.snapshot();
            // Marked nodes may have been deleted from the diagram since.
            let failed: BTreeSet<String> = this
                .state
                .failed_node_ids()
                .into_iter()
                .flatten()
                .filter(|id| graph.is_architecture_node(id))
                .cloned()
                .collect();
            if failed.is_empty() {
                return Err(NoOpReason::EmptyFailureSet);
            }
            let blast = compute_blast_radius(&graph.architecture_edges(), &failed);
            info!(
                failed = failed.len(),
                affected = blast.affected_node_ids.len(),
                broken = blast.broken_edge_ids.len(),
                "failure started"
            );
            this.commit(SessionEvent::FailureComputed(blast))
        })
    }

    /// Start a repeating chaos run: round 0 now, then one per interval.
    /// A previous run, paused or not, is replaced along with its rounds and
    /// history.
    pub fn start_chaos(&mut self) -> TransitionOutcome {
        self.transition("start_chaos", |this| {
            this.require_mode(Mode::Chaos)?;
            let graph = this.accessor.snapshot();
            if graph.architecture_node_ids().is_empty() {
                return Err(NoOpReason::DegenerateGraph);
            }
            this.disarm();
            this.commit(SessionEvent::ChaosStarted)?;
            this.chaos_started_at = Some(Instant::now());
            info!(
                interval_ms = this.chaos.interval_ms,
                sub_mode = ?this.chaos.sub_mode,
                "chaos started"
            );
            this.run_round(&graph)
        })
    }

    /// Run exactly one chaos round without arming the repeat.
    pub fn chaos_step(&mut self) -> TransitionOutcome {
        self.transition("chaos_step", |this| {
            this.require_mode(Mode::Chaos)?;
            let graph = this.accessor.snapshot();
            if graph.architecture_node_ids().is_empty() {
                return Err(NoOpReason::DegenerateGraph);
            }
            this.chaos_started_at.get_or_insert_with(Instant::now);
            this.run_round(&graph)
        })
    }

    /// Deliver a scheduler tick. Ticks from a stopped, paused or replaced
    /// run are discarded.
    pub fn handle_tick(&mut self, tick: ChaosTick) -> TransitionOutcome {
        self.transition("handle_tick", |this| {
            if this.armed_token() != Some(tick.token) || !this.state.wants_repeat() {
                return Err(NoOpReason::StaleTimer);
            }
            let graph = this.accessor.snapshot();
            this.run_round(&graph)
        })
    }

    // ── Playback ─────────────────────────────────────────────────────

    pub fn pause(&mut self) -> TransitionOutcome {
        self.transition("pause", |this| this.commit(SessionEvent::Pause))
    }

    pub fn resume(&mut self) -> TransitionOutcome {
        self.transition("resume", |this| this.commit(SessionEvent::Resume))
    }

    pub fn step_forward(&mut self) -> TransitionOutcome {
        self.transition("step_forward", |this| this.commit(SessionEvent::StepForward))
    }

    pub fn step_backward(&mut self) -> TransitionOutcome {
        self.transition("step_backward", |this| this.commit(SessionEvent::StepBackward))
    }

    /// Cancel any repeat and return to idle. Always applies.
    pub fn stop(&mut self) -> TransitionOutcome {
        self.transition("stop", |this| {
            let from = this.state.mode();
            this.commit(SessionEvent::Stop)?;
            this.chaos_started_at = None;
            if from != Mode::Idle {
                info!(?from, "simulation stopped");
            }
            Ok(())
        })
    }

    /// Stop, then restore the configured chaos settings and clear stepping.
    pub fn reset(&mut self) -> TransitionOutcome {
        self.stop();
        self.transition("reset", |this| {
            this.chaos = this.config.chaos.clone().normalized();
            this.commit(SessionEvent::SetStepping(false))
        })
    }

    // ── Internals ────────────────────────────────────────────────────

    fn transition<F>(&mut self, operation: &'static str, f: F) -> TransitionOutcome
    where
        F: FnOnce(&mut Self) -> Result<(), NoOpReason>,
    {
        let result = f(self);
        if let Err(reason) = result {
            debug!(operation, %reason, mode = ?self.state.mode(), "transition ignored");
        }
        self.sync_timer();
        result.into()
    }

    fn commit(&mut self, event: SessionEvent) -> Result<(), NoOpReason> {
        let (next, outcome) = std::mem::take(&mut self.state).apply(event);
        self.state = next;
        match outcome.reason() {
            None => Ok(()),
            Some(reason) => Err(reason),
        }
    }

    fn require_mode(&self, mode: Mode) -> Result<(), NoOpReason> {
        if self.state.mode() == mode {
            Ok(())
        } else {
            Err(NoOpReason::WrongMode)
        }
    }

    /// Compute one full chaos round, then commit it.
    fn run_round(&mut self, graph: &GraphSnapshot) -> Result<(), NoOpReason> {
        let round = self.state.snapshot().round;
        let mut rng = round_rng(self.seed, round);
        let nodes = graph.architecture_node_ids();
        let edges = graph.architecture_edges();
        let protected = &self.chaos.protected_node_ids;

        let result = match self.chaos.sub_mode {
            ChaosSubMode::RandomFailure => {
                // The previous round's failures are replaced, not accumulated.
                let picked = select_random_targets(
                    &mut rng,
                    &nodes,
                    self.chaos.failure_probability,
                    self.chaos.max_failures_per_round,
                    protected,
                    &BTreeSet::new(),
                );
                let failed_node_ids: BTreeSet<String> = picked.into_iter().collect();
                let blast = compute_blast_radius(&edges, &failed_node_ids);
                info!(
                    round,
                    failed = failed_node_ids.len(),
                    affected = blast.affected_node_ids.len(),
                    "chaos round: random failure"
                );
                ChaosRoundResult::Failures {
                    failed_node_ids,
                    blast,
                }
            }
            ChaosSubMode::NetworkPartition => {
                let partition = compute_partition(&mut rng, &nodes, &edges, protected);
                if !partition.is_split() {
                    debug!(round, reason = %NoOpReason::DegenerateGraph, "partition round unsplit");
                }
                info!(
                    round,
                    severed = partition.severed_edge_ids.len(),
                    group_a = partition.group_a.len(),
                    group_b = partition.group_b.len(),
                    "chaos round: network partition"
                );
                ChaosRoundResult::Partition(partition)
            }
        };

        let elapsed = self
            .chaos_started_at
            .map(|started| started.elapsed())
            .unwrap_or_default();
        self.commit(SessionEvent::RoundCommitted {
            result,
            elapsed,
            history_limit: self.config.history_limit,
        })
    }

    /// Make the scheduler match the session: armed with the live interval
    /// while chaos auto-runs, disarmed otherwise.
    fn sync_timer(&mut self) {
        let wanted = self
            .state
            .wants_repeat()
            .then(|| self.chaos.interval());
        match (wanted, self.armed) {
            (Some(period), Some((_, armed))) if period == armed => {}
            (Some(period), _) => {
                self.token = self.token.next();
                self.scheduler.arm(self.token, period);
                self.armed = Some((self.token, period));
                debug!(
                    token = self.token.value(),
                    period_ms = period.as_millis() as u64,
                    "chaos repeat armed"
                );
            }
            (None, Some(_)) => self.disarm(),
            (None, None) => {}
        }
    }

    fn disarm(&mut self) {
        if self.armed.take().is_some() {
            self.token = self.token.next();
            self.scheduler.disarm();
            debug!(token = self.token.value(), "chaos repeat disarmed");
        }
    }
}
