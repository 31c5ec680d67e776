//! The consumer side: drain candidates, keep the best, shut the ring down.

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};

use fas_core::FasSlot;
use fas_shm::{PopOutcome, RingConsumer};

use crate::config::SupervisorConfig;
use crate::error::EngineError;

// ── SolutionTracker ──────────────────────────────────────────────

/// How a popped slot affected the best known solution.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Observation {
    /// The slot proves the graph acyclic. Terminal.
    Acyclic,
    /// The slot is strictly smaller than the previous best.
    Improved,
    /// The slot is no better, or an acyclicity proof was already seen.
    Discarded,
}

/// Best feedback arc set seen so far.
///
/// Once an acyclicity proof has been observed every later slot is
/// discarded, whatever its size.
#[derive(Clone, Debug, Default)]
pub struct SolutionTracker {
    best: Option<FasSlot>,
    acyclic: bool,
}

impl SolutionTracker {
    /// Fold one slot into the best known solution.
    pub fn observe(&mut self, slot: &FasSlot) -> Observation {
        if self.acyclic {
            return Observation::Discarded;
        }
        if slot.is_acyclic_proof() {
            self.acyclic = true;
            self.best = Some(*slot);
            return Observation::Acyclic;
        }
        match &self.best {
            Some(best) if slot.len() >= best.len() => Observation::Discarded,
            _ => {
                self.best = Some(*slot);
                Observation::Improved
            }
        }
    }

    /// Size of the best solution, if any slot has been observed.
    pub fn best_size(&self) -> Option<usize> {
        self.best.as_ref().map(FasSlot::len)
    }

    /// The search result so far.
    pub fn outcome(&self) -> SearchOutcome {
        match self.best {
            _ if self.acyclic => SearchOutcome::Acyclic,
            Some(best) => SearchOutcome::Best(best),
            None => SearchOutcome::NoSolution,
        }
    }
}

// ── SupervisorReport ─────────────────────────────────────────────

/// Why the drain loop ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopReason {
    /// An empty feedback arc set was popped.
    AcyclicProof,
    /// SIGINT or SIGTERM (or the caller's stop flag).
    Interrupted,
    /// The configured number of slots was read.
    SolutionLimit,
}

/// Final result of the search.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SearchOutcome {
    /// The graph has no cycle.
    Acyclic,
    /// Smallest feedback arc set found.
    Best(FasSlot),
    /// No slot was read before the stop.
    NoSolution,
}

/// Report returned by [`Supervisor::run`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SupervisorReport {
    /// Final result.
    pub outcome: SearchOutcome,
    /// Why the loop ended.
    pub stop_reason: StopReason,
    /// Slots popped from the ring.
    pub slots_read: u64,
    /// Times the best solution got smaller (the first solution counts).
    pub improvements: u64,
    /// Dead producers recovered from.
    pub recoveries: u64,
}

// ── SupervisorState ──────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SupervisorState {
    Running,
    Stopping,
    Stopped,
}

// ── Supervisor ───────────────────────────────────────────────────

/// Owner of the ring and sole consumer of candidate sets.
///
/// Shutdown always runs, on success, error or drop: `active` is cleared,
/// blocked producers are woken, and all four system objects are removed.
pub struct Supervisor {
    ring: Option<RingConsumer>,
    config: SupervisorConfig,
    state: SupervisorState,
    tracker: SolutionTracker,
    slots_read: u64,
    improvements: u64,
    recoveries: u64,
}

impl Supervisor {
    /// Validate `config` and create the ring.
    pub fn new(config: SupervisorConfig) -> Result<Self, EngineError> {
        config.validate()?;
        let mut ring = RingConsumer::create(&config.ring)?;
        ring.set_poll_interval(Some(config.poll_interval));
        Ok(Self {
            ring: Some(ring),
            config,
            state: SupervisorState::Running,
            tracker: SolutionTracker::default(),
            slots_read: 0,
            improvements: 0,
            recoveries: 0,
        })
    }

    /// Drain the ring until an acyclicity proof, the solution limit, or
    /// `stop` is set; then shut down.
    ///
    /// Each improvement is written to `out` as it happens, and the best
    /// solution once more at the end.
    pub fn run<W: Write>(
        &mut self,
        stop: &AtomicBool,
        out: &mut W,
    ) -> Result<SupervisorReport, EngineError> {
        let drained = self.drain(stop, out);
        let shutdown = self.shutdown();
        let stop_reason = drained?;
        shutdown?;

        if let SearchOutcome::Best(best) = self.tracker.outcome() {
            writeln!(
                out,
                "[supervisor] Best solution with {} edges: {best}",
                best.len()
            )?;
        }
        tracing::info!(
            ?stop_reason,
            slots_read = self.slots_read,
            improvements = self.improvements,
            best = ?self.tracker.best_size(),
            "search finished"
        );
        Ok(self.report(stop_reason))
    }

    fn drain<W: Write>(&mut self, stop: &AtomicBool, out: &mut W) -> Result<StopReason, EngineError> {
        let Some(ring) = self.ring.as_ref() else {
            return Ok(StopReason::Interrupted);
        };
        loop {
            if stop.load(Ordering::Acquire) {
                return Ok(StopReason::Interrupted);
            }
            let slot = match ring.pop()? {
                PopOutcome::Slot(slot) => slot,
                PopOutcome::Interrupted => continue,
                PopOutcome::TimedOut => {
                    if ring.recover_stalled_writer()?.is_some() {
                        self.recoveries += 1;
                    }
                    continue;
                }
            };

            self.slots_read += 1;
            match self.tracker.observe(&slot) {
                Observation::Acyclic => {
                    writeln!(out, "[supervisor] The graph is acyclic!")?;
                    return Ok(StopReason::AcyclicProof);
                }
                Observation::Improved => {
                    self.improvements += 1;
                    writeln!(
                        out,
                        "[supervisor] Solution with {} edges: {slot}",
                        slot.len()
                    )?;
                    tracing::info!(size = slot.len(), "new best solution");
                }
                Observation::Discarded => {}
            }
            if self
                .config
                .solution_limit
                .is_some_and(|limit| self.slots_read >= limit)
            {
                return Ok(StopReason::SolutionLimit);
            }
        }
    }

    /// Clear `active`, wake blocked producers and remove the ring.
    ///
    /// Idempotent. Called by [`run`](Self::run) and on drop.
    pub fn shutdown(&mut self) -> Result<(), EngineError> {
        if self.state == SupervisorState::Stopped {
            return Ok(());
        }
        self.state = SupervisorState::Stopping;
        let Some(ring) = self.ring.take() else {
            self.state = SupervisorState::Stopped;
            return Ok(());
        };

        let signalled = ring.begin_shutdown();
        let destroyed = ring.destroy();
        self.state = SupervisorState::Stopped;
        tracing::info!("ring shut down");
        signalled?;
        destroyed?;
        Ok(())
    }

    /// The best solution tracker.
    pub fn tracker(&self) -> &SolutionTracker {
        &self.tracker
    }

    fn report(&self, stop_reason: StopReason) -> SupervisorReport {
        SupervisorReport {
            outcome: self.tracker.outcome(),
            stop_reason,
            slots_read: self.slots_read,
            improvements: self.improvements,
            recoveries: self.recoveries,
        }
    }
}

impl Drop for Supervisor {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            tracing::warn!(error = %e, "shutdown on drop failed");
        }
    }
}
