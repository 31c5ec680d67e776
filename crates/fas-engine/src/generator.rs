//! The producer side: search the graph and push candidates into the ring.

use std::sync::atomic::{AtomicBool, Ordering};

use fas_core::FasSlot;
use fas_graph::{FasSearcher, Graph};
use fas_shm::{PushOutcome, RingProducer};

use crate::config::GeneratorConfig;
use crate::error::EngineError;

/// Why a generator stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GeneratorStop {
    /// The supervisor cleared `active`.
    Shutdown,
    /// The caller's stop flag was set.
    Interrupted,
    /// `max_iterations` candidates were generated.
    IterationLimit,
}

/// Report returned by [`Generator::run`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GeneratorReport {
    /// Seed of the vertex shuffles; rerun with it to reproduce.
    pub seed: u64,
    /// Candidates generated.
    pub iterations: u64,
    /// Candidates published to the ring.
    pub pushed: u64,
    /// Candidates too large for a slot, dropped without touching the ring.
    pub discarded: u64,
    /// Why the loop ended.
    pub stop: GeneratorStop,
}

/// A producer process's search loop.
#[derive(Debug)]
pub struct Generator {
    producer: RingProducer,
    searcher: FasSearcher,
    max_iterations: Option<u64>,
}

impl Generator {
    /// Validate `config` and attach to a running supervisor's ring.
    pub fn new(config: GeneratorConfig, graph: Graph) -> Result<Self, EngineError> {
        config.validate()?;
        let producer = RingProducer::attach(&config.names)?;
        let searcher = match config.seed {
            Some(seed) => FasSearcher::new(graph, seed),
            None => FasSearcher::from_entropy(graph),
        };
        tracing::info!(
            seed = searcher.seed(),
            vertices = searcher.graph().vertex_count(),
            edges = searcher.graph().edge_count(),
            "generator attached"
        );
        Ok(Self {
            producer,
            searcher,
            max_iterations: config.max_iterations,
        })
    }

    /// Generate and push candidates until the supervisor shuts down, `stop`
    /// is set, or the iteration limit is reached. Detaches on the way out.
    pub fn run(mut self, stop: &AtomicBool) -> Result<GeneratorReport, EngineError> {
        let mut report = GeneratorReport {
            seed: self.searcher.seed(),
            iterations: 0,
            pushed: 0,
            discarded: 0,
            stop: GeneratorStop::Interrupted,
        };
        let searched = self.search(stop, &mut report);
        let detached = self.producer.detach();
        report.stop = searched?;
        detached?;
        tracing::info!(
            iterations = report.iterations,
            pushed = report.pushed,
            discarded = report.discarded,
            stop = ?report.stop,
            "generator finished"
        );
        Ok(report)
    }

    fn search(
        &mut self,
        stop: &AtomicBool,
        report: &mut GeneratorReport,
    ) -> Result<GeneratorStop, EngineError> {
        loop {
            if stop.load(Ordering::Acquire) {
                return Ok(GeneratorStop::Interrupted);
            }
            if self
                .max_iterations
                .is_some_and(|max| report.iterations >= max)
            {
                return Ok(GeneratorStop::IterationLimit);
            }
            if !self.producer.is_active() {
                return Ok(GeneratorStop::Shutdown);
            }

            let candidate = self.searcher.next_candidate();
            report.iterations += 1;
            let slot = match FasSlot::from_edges(&candidate) {
                Ok(slot) => slot,
                Err(e) => {
                    report.discarded += 1;
                    tracing::debug!(error = %e, "candidate discarded");
                    continue;
                }
            };

            match self.producer.push(&slot)? {
                PushOutcome::Committed { index } => {
                    report.pushed += 1;
                    tracing::debug!(index, size = slot.len(), fas = %slot, "candidate pushed");
                }
                PushOutcome::Shutdown => return Ok(GeneratorStop::Shutdown),
                PushOutcome::Interrupted => {}
            }
        }
    }
}
