//! Scripted scenarios for the `ij` binary
//!
//! A scenario is a YAML list of steps run against a fresh `Injector<String>`.
//! The runner records what happened (events, fired targets, pending waiters)
//! as a trace.
//!
//! ```yaml
//! steps:
//!   - op: when
//!     keys: [db, cache]
//!     label: app
//!   - op: set
//!     key: db
//!     value: conn1
//!   - op: unfulfilled
//!   - op: set
//!     key: cache
//!     value: redis
//!   - op: settle
//! ```

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;

use crate::capture::Capture;
use crate::config::InjectorConfig;
use crate::error::InjectResult;
use crate::events::ServiceEvent;
use crate::injector::Injector;
use crate::keys::Keys;
use crate::store::Unfulfilled;

/// One key or a list of keys
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum KeySpec {
    One(String),
    Many(Vec<String>),
}

impl From<&KeySpec> for Keys {
    fn from(spec: &KeySpec) -> Self {
        match spec {
            KeySpec::One(key) => Keys::from(key),
            KeySpec::Many(keys) => Keys::from(keys),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    /// Publish a value
    Set { key: String, value: String },
    /// Wait for keys; records `label` when the target fires
    When { keys: KeySpec, label: String },
    /// Inject now, optionally forgiving missing keys
    Inject {
        keys: KeySpec,
        label: String,
        #[serde(default)]
        forgive: bool,
    },
    /// Start a capture named `label`
    Capture { keys: KeySpec, label: String },
    /// Register a replay target on capture `label`
    Replay {
        label: String,
        #[serde(default)]
        tag: Option<String>,
    },
    /// Apply capture `label` now
    Apply {
        label: String,
        #[serde(default)]
        forgive: bool,
    },
    /// Run deferred turns
    Settle,
    /// Snapshot keys with outstanding waiters
    Unfulfilled,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub description: Option<String>,
    pub steps: Vec<Step>,
}

impl Scenario {
    pub fn load(path: &Path) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).context(format!("Failed to read scenario: {}", path.display()))?;
        Self::parse(&content).context(format!("Failed to parse scenario: {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }
}

/// Something observed while running a scenario
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TraceEntry {
    Event {
        event: String,
        name: String,
        value: String,
    },
    Fired {
        label: String,
        values: Vec<Option<String>>,
    },
    Skipped {
        label: String,
    },
    Settled {
        turns: usize,
    },
    Unfulfilled {
        pending: Option<Vec<Unfulfilled>>,
    },
    Rejected {
        step: usize,
        error: String,
    },
}

type Trace = Arc<Mutex<Vec<TraceEntry>>>;

fn record(trace: &Trace, entry: TraceEntry) {
    trace.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).push(entry);
}

fn fired(trace: &Trace, label: &str, values: Vec<Option<String>>) {
    record(
        trace,
        TraceEntry::Fired {
            label: label.to_string(),
            values,
        },
    );
}

/// Runs scenario steps against a private injector
pub struct ScenarioRunner {
    injector: Injector<String>,
    events: broadcast::Receiver<ServiceEvent<String>>,
    captures: HashMap<String, Capture<String>>,
    trace: Trace,
}

impl ScenarioRunner {
    pub fn new(config: InjectorConfig) -> InjectResult<Self> {
        let injector = Injector::with_config(config)?;
        let events = injector.subscribe();
        Ok(Self {
            injector,
            events,
            captures: HashMap::new(),
            trace: Arc::new(Mutex::new(Vec::new())),
        })
    }

    /// Run every step, settle, and return the trace
    pub fn run(mut self, scenario: &Scenario) -> Vec<TraceEntry> {
        for (index, step) in scenario.steps.iter().enumerate() {
            debug!(index, ?step, "ScenarioRunner::run: step");
            if let Err(error) = self.step(step) {
                record(&self.trace, TraceEntry::Rejected { step: index, error });
            }
            self.collect_events();
        }

        let turns = self.injector.settle();
        if turns > 0 {
            record(&self.trace, TraceEntry::Settled { turns });
        }
        self.collect_events();
        record(
            &self.trace,
            TraceEntry::Unfulfilled {
                pending: self.injector.list_unfulfilled(),
            },
        );

        let mut trace = self.trace.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        std::mem::take(&mut *trace)
    }

    fn step(&mut self, step: &Step) -> Result<(), String> {
        match step {
            Step::Set { key, value } => {
                self.injector.set(key, value.clone());
            }
            Step::When { keys, label } => {
                let (trace, label) = (self.trace.clone(), label.clone());
                self.injector.when(keys, move |values| {
                    fired(&trace, &label, values.into_iter().map(Some).collect())
                });
            }
            Step::Inject { keys, label, forgive } => {
                let forgive = *forgive;
                let done = self
                    .injector
                    .inject_with(keys, |values| fired(&self.trace, label, values), |_| forgive);
                if !done {
                    record(&self.trace, TraceEntry::Skipped { label: label.clone() });
                }
            }
            Step::Capture { keys, label } => {
                let capture = self.injector.capture(keys);
                self.captures.insert(label.clone(), capture);
            }
            Step::Replay { label, tag } => {
                let capture = self.capture(label)?;
                let (trace, tag) = (self.trace.clone(), tag.clone().unwrap_or_else(|| label.clone()));
                capture.when(move |values| fired(&trace, &tag, values.into_iter().map(Some).collect()));
            }
            Step::Apply { label, forgive } => {
                let capture = self.capture(label)?;
                let forgive = *forgive;
                if !capture.apply_with(|values| fired(&self.trace, label, values), |_| forgive) {
                    record(&self.trace, TraceEntry::Skipped { label: label.clone() });
                }
            }
            Step::Settle => {
                let turns = self.injector.settle();
                record(&self.trace, TraceEntry::Settled { turns });
            }
            Step::Unfulfilled => {
                record(
                    &self.trace,
                    TraceEntry::Unfulfilled {
                        pending: self.injector.list_unfulfilled(),
                    },
                );
            }
        }
        Ok(())
    }

    fn capture(&self, label: &str) -> Result<Capture<String>, String> {
        self.captures
            .get(label)
            .cloned()
            .ok_or_else(|| format!("Unknown capture: {}", label))
    }

    fn collect_events(&mut self) {
        while let Ok(event) = self.events.try_recv() {
            record(
                &self.trace,
                TraceEntry::Event {
                    event: event.event,
                    name: event.name,
                    value: event.value,
                },
            );
        }
    }
}
