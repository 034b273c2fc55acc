use crate::enumerate::BrowserActions;
use crate::equivalence::EquivalenceSet;
use crate::generator::ActionTemplate;
use crate::queue::Partition;
use crate::selector::SelectorRegistry;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use wtx_common::{Action, ActionSequence, CheckerSpec, ElementIdentifier};

/// Declarative exploration settings, as read from YAML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExplorationSettings {
    #[serde(default)]
    pub url: String,
    #[serde(default = "default_max_length")]
    pub max_length: usize,
    #[serde(default = "default_num_retries")]
    pub num_retries: usize,
    #[serde(default)]
    pub wait: WaitTiming,
    #[serde(default)]
    pub queue_file: Option<PathBuf>,
    #[serde(default)]
    pub state_file: Option<PathBuf>,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default)]
    pub partition: Option<Partition>,
    #[serde(default)]
    pub resume: bool,
    #[serde(default)]
    pub graph_mode: bool,
    #[serde(default)]
    pub browser_actions: BrowserActions,
    /// Text typed into inputs by the built-in rules.
    #[serde(default)]
    pub input_text: Option<String>,
    #[serde(default)]
    pub selectors: SelectorRegistry,
    /// Consulted in order; the first match decides an element's actions.
    #[serde(default)]
    pub rules: Vec<RuleSpec>,
    #[serde(default)]
    pub equivalence: Vec<EquivalenceSet>,
    #[serde(default)]
    pub filters: Vec<FilterSpec>,
    #[serde(default)]
    pub prioritizer: Option<PrioritizerSpec>,
    #[serde(default)]
    pub initial_sequences: Vec<ActionSequence>,
    #[serde(default)]
    pub final_sequences: Vec<ActionSequence>,
    #[serde(default = "default_states")]
    pub states: Vec<CheckerSpec>,
    #[serde(default)]
    pub oracle_profiles: BTreeMap<String, OracleProfile>,
    #[serde(default)]
    pub wait_profiles: BTreeMap<String, WaitProfile>,
    /// Profile the explorer runs with; recorded in every test case.
    #[serde(default)]
    pub oracle_profile: Option<String>,
    #[serde(default)]
    pub wait_profile: Option<String>,
    #[serde(default)]
    pub writers: WriterSettings,
}

fn default_max_length() -> usize {
    crate::explorer::DEFAULT_MAX_LENGTH
}

fn default_num_retries() -> usize {
    crate::runner::DEFAULT_RETRIES
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("testcases")
}

fn default_states() -> Vec<CheckerSpec> {
    vec![CheckerSpec::VisibleElements {
        properties: Vec::new(),
    }]
}

impl Default for ExplorationSettings {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_length: default_max_length(),
            num_retries: default_num_retries(),
            wait: WaitTiming::default(),
            queue_file: None,
            state_file: None,
            output_dir: default_output_dir(),
            partition: None,
            resume: false,
            graph_mode: false,
            browser_actions: BrowserActions::default(),
            input_text: None,
            selectors: SelectorRegistry::default(),
            rules: Vec::new(),
            equivalence: Vec::new(),
            filters: Vec::new(),
            prioritizer: None,
            initial_sequences: Vec::new(),
            final_sequences: Vec::new(),
            states: default_states(),
            oracle_profiles: BTreeMap::new(),
            wait_profiles: BTreeMap::new(),
            oracle_profile: None,
            wait_profile: None,
            writers: WriterSettings::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaitTiming {
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_interval_ms() -> u64 {
    crate::wait::DEFAULT_INTERVAL.as_millis() as u64
}

fn default_timeout_ms() -> u64 {
    crate::wait::DEFAULT_TIMEOUT.as_millis() as u64
}

impl Default for WaitTiming {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

fn default_click() -> Vec<ActionTemplate> {
    vec![ActionTemplate::Click]
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum RuleSpec {
    /// Regular expressions that must each match the whole property value.
    MultiCriterion {
        #[serde(default)]
        tag: Option<String>,
        #[serde(default)]
        id: Option<String>,
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        class: Option<String>,
        #[serde(default)]
        text: Option<String>,
        #[serde(default, rename = "type")]
        input_type: Option<String>,
        #[serde(default = "default_click")]
        actions: Vec<ActionTemplate>,
    },
    JavascriptAnchor {
        #[serde(default = "default_click")]
        actions: Vec<ActionTemplate>,
    },
    RelativeAnchor {
        #[serde(default = "default_click")]
        actions: Vec<ActionTemplate>,
    },
    Identifier {
        identifier: ElementIdentifier,
        #[serde(default = "default_click")]
        actions: Vec<ActionTemplate>,
    },
    Xpath {
        xpath: String,
        #[serde(default = "default_click")]
        actions: Vec<ActionTemplate>,
    },
    Composite {
        rules: Vec<RuleSpec>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "filter", rename_all = "snake_case")]
pub enum FilterSpec {
    MaxRepeated { max: usize },
    OrderInsensitive { actions: Vec<Action> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrioritizerSpec {
    Shortest,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "oracle", rename_all = "snake_case")]
pub enum OracleSpec {
    HttpStatus {
        #[serde(default)]
        allowed: Vec<u16>,
        #[serde(default)]
        disallowed: Vec<u16>,
    },
    ScriptError,
    ServerLog {
        reset_url: String,
        fetch_url: String,
    },
    Timing {
        deadline_ms: u64,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OracleProfile {
    #[serde(default)]
    pub after_action: Vec<OracleSpec>,
    #[serde(default, rename = "final")]
    pub final_checks: Vec<OracleSpec>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "wait", rename_all = "snake_case")]
pub enum WaitSpec {
    Timed { duration_ms: u64 },
    RequestResponse,
    Script { expression: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaitProfile {
    #[serde(default)]
    pub initial: Vec<WaitSpec>,
    #[serde(default)]
    pub after_action: Vec<WaitSpec>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriterSettings {
    #[serde(default = "enabled")]
    pub replayable: bool,
    #[serde(default = "enabled")]
    pub pretty: bool,
    #[serde(default)]
    pub failures_only: bool,
    /// Capture a PNG after every action and write them next to each case.
    #[serde(default)]
    pub screenshots: bool,
}

fn enabled() -> bool {
    true
}

impl Default for WriterSettings {
    fn default() -> Self {
        Self {
            replayable: true,
            pretty: true,
            failures_only: false,
            screenshots: false,
        }
    }
}
