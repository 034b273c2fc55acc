//! Compiling declarative settings into a runnable `ExplorerConfig`.

use super::loader::ConfigError;
use super::schema::{
    ExplorationSettings, FilterSpec, OracleProfile, OracleSpec, PrioritizerSpec, RuleSpec,
    WaitProfile, WaitSpec,
};
use crate::checker::StateChecker;
use crate::explorer::ExplorerConfig;
use crate::filter::{MaxRepeatedActionFilter, OrderInsensitiveFilter, SequenceFilter};
use crate::generator::rules::{ActionRule, full_match};
use crate::generator::{
    ActionGenerator, CompositeRule, Criteria, IdentifierRule, JavascriptAnchorRule,
    MultiCriterionRule, RelativeAnchorRule, XpathRule,
};
use crate::oracle::{
    HttpStatusOracle, Oracle, OracleSet, ScriptErrorOracle, ServerLogOracle, TimingOracle,
};
use crate::prioritizer::{SequencePrioritizer, ShortestFirst};
use crate::registry::FactoryRegistry;
use crate::runner::WaitSet;
use crate::testcase::{PrettyWriter, ReplayableWriter, ScreenshotWriter, TestCaseSink};
use crate::wait::{
    RequestResponseCondition, ScriptCondition, TimedCondition, WaitCondition, WaitSettings,
};
use regex::Regex;
use std::sync::Arc;
use std::time::Duration;
use wtx_common::CheckerSpec;

impl OracleSpec {
    pub fn build(&self) -> Box<dyn Oracle> {
        match self {
            OracleSpec::HttpStatus {
                allowed,
                disallowed,
            } => Box::new(HttpStatusOracle::new(
                allowed.iter().copied(),
                disallowed.iter().copied(),
            )),
            OracleSpec::ScriptError => Box::new(ScriptErrorOracle::new()),
            OracleSpec::ServerLog {
                reset_url,
                fetch_url,
            } => Box::new(ServerLogOracle::new(reset_url, fetch_url)),
            OracleSpec::Timing { deadline_ms } => {
                Box::new(TimingOracle::new(Duration::from_millis(*deadline_ms)))
            }
        }
    }
}

impl OracleProfile {
    pub fn build(&self) -> OracleSet {
        OracleSet {
            after_action: self.after_action.iter().map(OracleSpec::build).collect(),
            final_checks: self.final_checks.iter().map(OracleSpec::build).collect(),
        }
    }
}

impl WaitSpec {
    pub fn build(&self) -> Box<dyn WaitCondition> {
        match self {
            WaitSpec::Timed { duration_ms } => {
                Box::new(TimedCondition::new(Duration::from_millis(*duration_ms)))
            }
            WaitSpec::RequestResponse => Box::new(RequestResponseCondition::new()),
            WaitSpec::Script { expression } => Box::new(ScriptCondition::new(expression)),
        }
    }
}

impl WaitProfile {
    pub fn build(&self) -> WaitSet {
        WaitSet {
            initial: self.initial.iter().map(WaitSpec::build).collect(),
            after_action: self.after_action.iter().map(WaitSpec::build).collect(),
        }
    }
}

fn pattern(value: &Option<String>) -> Result<Option<Regex>, ConfigError> {
    value
        .as_deref()
        .map(|p| {
            full_match(p).map_err(|source| ConfigError::InvalidPattern {
                pattern: p.to_string(),
                source,
            })
        })
        .transpose()
}

impl RuleSpec {
    pub fn build(&self) -> Result<Box<dyn ActionRule>, ConfigError> {
        Ok(match self {
            RuleSpec::MultiCriterion {
                tag,
                id,
                name,
                class,
                text,
                input_type,
                actions,
            } => {
                let criteria = Criteria {
                    tag: pattern(tag)?,
                    id: pattern(id)?,
                    name: pattern(name)?,
                    class: pattern(class)?,
                    text: pattern(text)?,
                    input_type: pattern(input_type)?,
                };
                Box::new(MultiCriterionRule::new(criteria, actions.clone()))
            }
            RuleSpec::JavascriptAnchor { actions } => {
                Box::new(JavascriptAnchorRule::with_actions(actions.clone()))
            }
            RuleSpec::RelativeAnchor { actions } => {
                Box::new(RelativeAnchorRule::with_actions(actions.clone()))
            }
            RuleSpec::Identifier {
                identifier,
                actions,
            } => Box::new(IdentifierRule::new(identifier.clone(), actions.clone())),
            RuleSpec::Xpath { xpath, actions } => {
                Box::new(XpathRule::new(xpath.clone(), actions.clone()))
            }
            RuleSpec::Composite { rules } => Box::new(CompositeRule::new(
                rules
                    .iter()
                    .map(RuleSpec::build)
                    .collect::<Result<Vec<_>, _>>()?,
            )),
        })
    }
}

impl FilterSpec {
    pub fn build(&self) -> Box<dyn SequenceFilter> {
        match self {
            FilterSpec::MaxRepeated { max } => Box::new(MaxRepeatedActionFilter::new(*max)),
            FilterSpec::OrderInsensitive { actions } => {
                Box::new(OrderInsensitiveFilter::new(actions.iter().cloned()))
            }
        }
    }
}

impl PrioritizerSpec {
    pub fn build(&self) -> Box<dyn SequencePrioritizer> {
        match self {
            PrioritizerSpec::Shortest => Box::new(ShortestFirst),
        }
    }
}

impl ExplorationSettings {
    /// Registers every named oracle and wait profile.
    pub fn register_profiles(&self, registry: &mut FactoryRegistry) {
        for (key, profile) in &self.oracle_profiles {
            let profile = profile.clone();
            registry.register_oracles(key.clone(), move || profile.build());
        }
        for (key, profile) in &self.wait_profiles {
            let profile = profile.clone();
            registry.register_waits(key.clone(), move || profile.build());
        }
    }

    pub fn wait_settings(&self) -> WaitSettings {
        WaitSettings {
            interval: Duration::from_millis(self.wait.interval_ms),
            timeout: Duration::from_millis(self.wait.timeout_ms),
        }
    }

    /// Checks everything that would otherwise fail mid-run.
    pub fn validate(&self, registry: &FactoryRegistry) -> Result<(), ConfigError> {
        if self.url.trim().is_empty() {
            return Err(ConfigError::MissingUrl);
        }
        url::Url::parse(&self.url).map_err(|source| ConfigError::InvalidUrl {
            url: self.url.clone(),
            source,
        })?;

        self.selectors.actionable.validate()?;
        self.selectors.stateful.validate()?;
        for selector in self.selectors.named.values() {
            selector.validate()?;
        }
        for set in &self.equivalence {
            set.selector.validate()?;
        }
        for state in &self.states {
            match state {
                CheckerSpec::SelectedElements { selector } if self.selectors.get(selector).is_none() => {
                    return Err(ConfigError::UnknownSelector(selector.clone()));
                }
                CheckerSpec::CustomizedProperties { selector, .. } => selector.validate()?,
                _ => {}
            }
        }

        if let Some(partition) = self.partition
            && partition.count > 0
            && partition.number >= partition.count
        {
            return Err(ConfigError::InvalidPartition {
                number: partition.number,
                count: partition.count,
            });
        }
        if let Some(key) = &self.oracle_profile {
            registry.oracles(key)?;
        }
        if let Some(key) = &self.wait_profile {
            registry.waits(key)?;
        }
        Ok(())
    }

    /// Validates and compiles the settings. No browser is touched.
    pub fn build(&self, registry: &FactoryRegistry) -> Result<ExplorerConfig, ConfigError> {
        self.validate(registry)?;

        let mut generator = ActionGenerator::new();
        if let Some(text) = &self.input_text {
            generator = generator.with_input_text(text.clone());
        }
        for rule in &self.rules {
            generator.push_rule(rule.build()?);
        }

        let oracles = match &self.oracle_profile {
            Some(key) => registry.oracles(key)?,
            None => OracleSet::new(),
        };
        let waits = match &self.wait_profile {
            Some(key) => registry.waits(key)?,
            None => WaitSet::new(),
        };

        let mut config = ExplorerConfig::new(self.url.clone());
        config.max_length = self.max_length;
        config.num_retries = self.num_retries;
        config.wait = self.wait_settings();
        config.selectors = Arc::new(self.selectors.clone());
        config.browser_actions = self.browser_actions;
        config.generator = generator;
        config.equivalence = self.equivalence.clone();
        config.filters = self.filters.iter().map(FilterSpec::build).collect();
        config.prioritizer = self.prioritizer.map(|p| p.build());
        config.initial_sequences = self.initial_sequences.clone();
        config.final_sequences = self.final_sequences.clone();
        config.checkers = self.states.iter().cloned().map(StateChecker::new).collect();
        config.oracles = oracles;
        config.waits = waits;
        config.oracle_profile = self.oracle_profile.clone();
        config.wait_profile = self.wait_profile.clone();
        config.partition = self.partition;
        config.queue_file = self.queue_file.clone();
        config.state_file = self.state_file.clone();
        config.resume = self.resume;
        config.graph_mode = self.graph_mode;
        config.screenshots = self.writers.screenshots;
        Ok(config)
    }

    /// Writers for emitted test cases, rooted at `output_dir`.
    pub fn sink(&self) -> TestCaseSink {
        let mut sink = TestCaseSink::new().failures_only(self.writers.failures_only);
        if self.writers.replayable {
            sink = sink.with_writer(Box::new(ReplayableWriter::new(&self.output_dir)));
        }
        if self.writers.pretty {
            sink = sink.with_writer(Box::new(PrettyWriter::new(&self.output_dir)));
        }
        if self.writers.screenshots {
            sink = sink.with_writer(Box::new(ScreenshotWriter::new(&self.output_dir)));
        }
        sink
    }
}
