use crate::checker::{StateChecker, snapshot_all, states_differ};
use crate::driver::{DriverError, DriverFactory};
use crate::enumerate::{ActionEnumerator, BrowserActions};
use crate::equivalence::EquivalenceSet;
use crate::filter::SequenceFilter;
use crate::generator::ActionGenerator;
use crate::oracle::OracleSet;
use crate::prioritizer::SequencePrioritizer;
use crate::queue::{Frontier, Partition, QueueError};
use crate::runner::{RunObserver, RunResult, SequenceRunner, WaitSet};
use crate::selector::SelectorRegistry;
use crate::session::Session;
use crate::state_graph::{GraphError, StateGraph};
use crate::testcase::{TestCase, TestCaseError, TestCaseSink};
use crate::wait::WaitSettings;
use async_trait::async_trait;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info, warn};
use wtx_common::{Action, ActionSequence, State};

pub const DEFAULT_MAX_LENGTH: usize = 3;

#[derive(Debug, Error)]
pub enum ExplorerError {
    #[error(transparent)]
    Queue(#[from] QueueError),
    #[error(transparent)]
    Graph(#[from] GraphError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExplorerPhase {
    Initializing,
    RunningSequence,
    ExtendingFrontier,
    Checkpointing,
    Done,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ExplorationStats {
    /// Sequences that ran to completion.
    pub run: usize,
    /// Completed sequences with at least one oracle failure.
    pub failed: usize,
    /// Sequences that exhausted their retries, or whose test case could not
    /// be written.
    pub errored: usize,
    /// Test cases handed to the writers.
    pub emitted: usize,
}

/// Everything an exploration run is configured with.
pub struct ExplorerConfig {
    pub url: String,
    /// Maximum number of non-setup actions in an explored sequence.
    pub max_length: usize,
    pub num_retries: usize,
    pub wait: WaitSettings,
    pub selectors: Arc<SelectorRegistry>,
    pub browser_actions: BrowserActions,
    pub generator: ActionGenerator,
    pub equivalence: Vec<EquivalenceSet>,
    pub filters: Vec<Box<dyn SequenceFilter>>,
    pub prioritizer: Option<Box<dyn SequencePrioritizer>>,
    /// Setup sequences; each seeds the frontier from the state it reaches.
    pub initial_sequences: Vec<ActionSequence>,
    /// Suffixes that end every explored path.
    pub final_sequences: Vec<ActionSequence>,
    pub checkers: Vec<StateChecker>,
    pub oracles: OracleSet,
    pub waits: WaitSet,
    pub oracle_profile: Option<String>,
    pub wait_profile: Option<String>,
    pub partition: Option<Partition>,
    pub queue_file: Option<PathBuf>,
    pub state_file: Option<PathBuf>,
    /// Continue from `queue_file` (and `state_file`) when they exist.
    pub resume: bool,
    /// Track a state graph and stop extending paths that reach known states.
    pub graph_mode: bool,
    /// Capture a screenshot after every action of every run.
    pub screenshots: bool,
}

impl ExplorerConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_length: DEFAULT_MAX_LENGTH,
            num_retries: crate::runner::DEFAULT_RETRIES,
            wait: WaitSettings::default(),
            selectors: Arc::new(SelectorRegistry::default()),
            browser_actions: BrowserActions::default(),
            generator: ActionGenerator::new(),
            equivalence: Vec::new(),
            filters: Vec::new(),
            prioritizer: None,
            initial_sequences: Vec::new(),
            final_sequences: Vec::new(),
            checkers: Vec::new(),
            oracles: OracleSet::new(),
            waits: WaitSet::new(),
            oracle_profile: None,
            wait_profile: None,
            partition: None,
            queue_file: None,
            state_file: None,
            resume: false,
            graph_mode: false,
            screenshots: false,
        }
    }
}

/// What an exploration run saw in the session.
#[derive(Default)]
struct Observed {
    before: Option<Vec<State>>,
    after: Option<Vec<State>>,
    actions: Vec<Action>,
}

struct ExplorationObserver<'a> {
    checkers: &'a [StateChecker],
    enumerator: Option<ActionEnumerator<'a>>,
    snapshot_before: Option<usize>,
    observed: Observed,
}

#[async_trait]
impl<'a> RunObserver for ExplorationObserver<'a> {
    async fn attempt_started(&mut self, _attempt: usize) {
        self.observed = Observed::default();
    }

    async fn before_action(
        &mut self,
        session: &mut Session,
        index: usize,
        _action: &Action,
    ) -> Result<(), DriverError> {
        if self.snapshot_before == Some(index) {
            self.observed.before = Some(snapshot_all(self.checkers, session).await?);
        }
        Ok(())
    }

    async fn after_sequence(&mut self, session: &mut Session) -> Result<(), DriverError> {
        self.observed.after = Some(snapshot_all(self.checkers, session).await?);
        if let Some(enumerator) = &self.enumerator {
            self.observed.actions = enumerator.available_actions(session).await?;
        }
        Ok(())
    }
}

/// Depth-first search of the application through action sequences.
pub struct Explorer {
    config: ExplorerConfig,
    runner: SequenceRunner,
    frontier: Frontier,
    graph: Option<StateGraph>,
    sink: TestCaseSink,
    stats: ExplorationStats,
    phase: ExplorerPhase,
    case_counter: usize,
}

impl Explorer {
    pub fn new(config: ExplorerConfig, factory: Arc<dyn DriverFactory>, sink: TestCaseSink) -> Self {
        let runner = SequenceRunner::new(factory, config.selectors.clone())
            .with_retries(config.num_retries)
            .with_wait_settings(config.wait)
            .with_screenshots(config.screenshots);
        let graph = config.graph_mode.then(StateGraph::new);
        Self {
            config,
            runner,
            frontier: Frontier::new(),
            graph,
            sink,
            stats: ExplorationStats::default(),
            phase: ExplorerPhase::Initializing,
            case_counter: 0,
        }
    }

    pub fn phase(&self) -> ExplorerPhase {
        self.phase
    }

    pub fn stats(&self) -> ExplorationStats {
        self.stats
    }

    pub fn frontier(&self) -> &Frontier {
        &self.frontier
    }

    pub fn graph(&self) -> Option<&StateGraph> {
        self.graph.as_ref()
    }

    /// Explores until the frontier is empty.
    pub async fn run(&mut self) -> Result<ExplorationStats, ExplorerError> {
        if !self.resume().await? {
            self.initialize().await?;
        }
        self.checkpoint().await?;
        while self.step().await? {}
        info!(
            "Exploration done: {} run, {} failed, {} errored, {} test cases",
            self.stats.run, self.stats.failed, self.stats.errored, self.stats.emitted
        );
        Ok(self.stats)
    }

    async fn resume(&mut self) -> Result<bool, ExplorerError> {
        if !self.config.resume {
            return Ok(false);
        }
        let Some(queue_file) = &self.config.queue_file else {
            return Ok(false);
        };
        if !queue_file.exists() {
            return Ok(false);
        }
        self.frontier = Frontier::load(queue_file).await?;
        if self.graph.is_some()
            && let Some(state_file) = &self.config.state_file
            && state_file.exists()
        {
            self.graph = Some(StateGraph::load(state_file).await?);
        }
        info!(
            "Resumed {} queued sequences from {}",
            self.frontier.len(),
            queue_file.display()
        );
        Ok(true)
    }

    /// Runs the setup sequences and seeds the frontier from the states they reach.
    pub async fn initialize(&mut self) -> Result<(), ExplorerError> {
        self.phase = ExplorerPhase::Initializing;
        let bases: Vec<ActionSequence> = if self.config.initial_sequences.is_empty() {
            vec![ActionSequence::new()]
        } else {
            self.config
                .initial_sequences
                .iter()
                .map(ActionSequence::as_initial)
                .collect()
        };

        for base in bases {
            let mut observer = ExplorationObserver {
                checkers: &self.config.checkers,
                enumerator: Some(ActionEnumerator {
                    generator: &self.config.generator,
                    equivalence: &self.config.equivalence,
                    browser: self.config.browser_actions,
                }),
                snapshot_before: None,
                observed: Observed::default(),
            };
            let outcome = self
                .runner
                .run(
                    &self.config.url,
                    &base,
                    &mut self.config.oracles,
                    &mut self.config.waits,
                    &mut observer,
                )
                .await;
            let observed = observer.observed;
            if let Err(e) = outcome {
                error!("Initial sequence {} failed: {}", base, e);
                self.stats.errored += 1;
                continue;
            }
            if let (Some(graph), Some(after)) = (&mut self.graph, observed.after) {
                graph.insert(after, observed.actions.clone());
            }
            for action in observed.actions {
                self.queue_candidates(&base, action);
            }
        }

        if let Some(partition) = self.config.partition {
            let seeded = self.frontier.len();
            self.frontier.partition(partition);
            info!(
                "Partition {}/{} keeps {} of {} seed sequences",
                partition.number,
                partition.count,
                self.frontier.len(),
                seeded
            );
        }
        self.prioritize();
        info!("Seeded frontier with {} sequences", self.frontier.len());
        Ok(())
    }

    /// Pops and explores one sequence. Returns false once the frontier is empty.
    pub async fn step(&mut self) -> Result<bool, ExplorerError> {
        let Some(sequence) = self.frontier.pop() else {
            self.phase = ExplorerPhase::Done;
            return Ok(false);
        };
        self.phase = ExplorerPhase::RunningSequence;
        let explored = self.explored_prefix(&sequence);
        let extend = explored.length() < self.config.max_length;
        info!(
            "Running {} (frontier {}, run {}, failed {}, errored {})",
            sequence,
            self.frontier.len(),
            self.stats.run,
            self.stats.failed,
            self.stats.errored
        );

        let mut observer = ExplorationObserver {
            checkers: &self.config.checkers,
            enumerator: (extend || self.graph.is_some()).then_some(ActionEnumerator {
                generator: &self.config.generator,
                equivalence: &self.config.equivalence,
                browser: self.config.browser_actions,
            }),
            snapshot_before: explored.total_len().checked_sub(1),
            observed: Observed::default(),
        };
        let outcome = self
            .runner
            .run(
                &self.config.url,
                &sequence,
                &mut self.config.oracles,
                &mut self.config.waits,
                &mut observer,
            )
            .await;
        let observed = observer.observed;

        match outcome {
            Err(e) => {
                error!("Giving up on {}: {}", sequence, e);
                self.stats.errored += 1;
            }
            Ok(result) => {
                self.stats.run += 1;
                if !result.passed() {
                    self.stats.failed += 1;
                }
                let after = observed.after.unwrap_or_default();
                let changed = observed
                    .before
                    .as_ref()
                    .is_some_and(|before| states_differ(before, &after));
                if explored.length() >= 1 && (changed || !result.passed()) {
                    if let Err(e) = self.emit(&sequence, after.clone(), &result).await {
                        warn!("Could not write test case for {}: {}", sequence, e);
                        self.stats.errored += 1;
                    }
                } else {
                    debug!("No state change for {}", sequence);
                }

                let mut reached_new_state = true;
                if let Some(graph) = &mut self.graph {
                    let (to, is_new) = graph.insert(after, observed.actions.clone());
                    if let (Some(before), Some(last)) = (&observed.before, explored.last_action())
                        && let Some(from) = graph.find_by_states(before)
                    {
                        graph.add_edge(from, last.clone(), to);
                    }
                    reached_new_state = is_new;
                }

                self.phase = ExplorerPhase::ExtendingFrontier;
                if extend && reached_new_state {
                    for action in observed.actions {
                        self.queue_candidates(&explored, action);
                    }
                    self.prioritize();
                }
            }
        }

        self.checkpoint().await?;
        Ok(true)
    }

    /// `sequence` without the final sequence it ends with, if any.
    fn explored_prefix(&self, sequence: &ActionSequence) -> ActionSequence {
        let actions = sequence.actions();
        for suffix in &self.config.final_sequences {
            let n = suffix.total_len();
            if n > 0 && n <= actions.len() && actions[actions.len() - n..] == *suffix.actions() {
                return ActionSequence::from_actions(actions[..actions.len() - n].to_vec());
            }
        }
        sequence.clone()
    }

    fn queue_candidates(&mut self, base: &ActionSequence, action: Action) {
        let extended = base.extended(action);
        let candidates: Vec<ActionSequence> = if self.config.final_sequences.is_empty() {
            vec![extended]
        } else {
            self.config
                .final_sequences
                .iter()
                .map(|suffix| extended.with_suffix(suffix))
                .collect()
        };
        for candidate in candidates {
            if self
                .config
                .filters
                .iter()
                .all(|f| f.should_explore(&candidate, &self.frontier))
            {
                self.frontier.push(candidate);
            } else {
                debug!("Filtered {}", candidate);
            }
        }
    }

    fn prioritize(&mut self) {
        if let Some(prioritizer) = &self.config.prioritizer {
            prioritizer.prioritize(&mut self.frontier);
        }
    }

    async fn emit(
        &mut self,
        sequence: &ActionSequence,
        final_states: Vec<State>,
        result: &RunResult,
    ) -> Result<(), TestCaseError> {
        self.case_counter += 1;
        let name = match self.config.partition {
            Some(p) if p.count > 0 => format!("p{}-case-{:05}", p.number, self.case_counter),
            _ => format!("case-{:05}", self.case_counter),
        };
        let case = TestCase {
            name,
            url: self.config.url.clone(),
            sequence: sequence.clone(),
            final_states,
            oracle_profile: self.config.oracle_profile.clone(),
            wait_profile: self.config.wait_profile.clone(),
            selectors: self.config.selectors.as_ref().clone(),
            failures: result.failures.clone(),
        };
        if self.sink.emit(&case, result).await? {
            self.stats.emitted += 1;
        }
        Ok(())
    }

    async fn checkpoint(&mut self) -> Result<(), ExplorerError> {
        self.phase = ExplorerPhase::Checkpointing;
        if let Some(path) = &self.config.queue_file {
            self.frontier.save(path).await?;
        }
        if let (Some(graph), Some(path)) = (&self.graph, &self.config.state_file) {
            graph.save(path).await?;
        }
        Ok(())
    }
}
