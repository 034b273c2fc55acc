use crate::difference::StateDifference;
use crate::identifier::ElementIdentifier;
use crate::selector::Selector;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

/// Observed properties of one element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementSnapshot {
    pub identifier: ElementIdentifier,
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
}

impl ElementSnapshot {
    pub fn new(identifier: ElementIdentifier) -> Self {
        Self {
            identifier,
            properties: BTreeMap::new(),
        }
    }

    pub fn with(mut self, property: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(property.into(), value.into());
        self
    }

    fn summary(&self) -> String {
        self.properties
            .get("tag")
            .cloned()
            .unwrap_or_else(|| self.identifier.to_string())
    }
}

/// Recipe for taking a snapshot. Every `State` can reproduce its checker so a
/// replay observes the same kind of state the explorer recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "checker", rename_all = "snake_case")]
pub enum CheckerSpec {
    CountOfElements,
    VisibleElements {
        #[serde(default)]
        properties: Vec<String>,
    },
    CustomizedProperties {
        selector: Selector,
        properties: Vec<String>,
    },
    SelectedElements {
        selector: String,
    },
    JsonObject {
        script: String,
    },
    Null,
}

/// A snapshot of what the application currently looks like.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum State {
    CountOfElements {
        count: usize,
    },
    VisibleElements {
        #[serde(default)]
        properties: Vec<String>,
        elements: Vec<ElementSnapshot>,
    },
    CustomizedProperties {
        selector: Selector,
        properties: Vec<String>,
        elements: Vec<ElementSnapshot>,
    },
    SelectedElements {
        selector: String,
        identifiers: Vec<ElementIdentifier>,
    },
    JsonObject {
        script: String,
        value: Value,
    },
    Null,
}

impl State {
    pub fn kind(&self) -> &'static str {
        match self {
            State::CountOfElements { .. } => "CountOfElements",
            State::VisibleElements { .. } => "VisibleElements",
            State::CustomizedProperties { .. } => "CustomizedProperties",
            State::SelectedElements { .. } => "SelectedElements",
            State::JsonObject { .. } => "JsonObject",
            State::Null => "Null",
        }
    }

    pub fn checker_spec(&self) -> CheckerSpec {
        match self {
            State::CountOfElements { .. } => CheckerSpec::CountOfElements,
            State::VisibleElements { properties, .. } => CheckerSpec::VisibleElements {
                properties: properties.clone(),
            },
            State::CustomizedProperties {
                selector,
                properties,
                ..
            } => CheckerSpec::CustomizedProperties {
                selector: selector.clone(),
                properties: properties.clone(),
            },
            State::SelectedElements { selector, .. } => CheckerSpec::SelectedElements {
                selector: selector.clone(),
            },
            State::JsonObject { script, .. } => CheckerSpec::JsonObject {
                script: script.clone(),
            },
            State::Null => CheckerSpec::Null,
        }
    }

    /// Differences between `self` (first) and `other` (second). Empty means equivalent.
    pub fn diff(&self, other: &State) -> Vec<StateDifference> {
        match (self, other) {
            (State::CountOfElements { count: a }, State::CountOfElements { count: b }) => {
                if a == b {
                    Vec::new()
                } else {
                    vec![StateDifference::property_value(
                        None,
                        "numElements",
                        Some(a.to_string()),
                        Some(b.to_string()),
                    )]
                }
            }
            (
                State::VisibleElements { elements: a, .. },
                State::VisibleElements { elements: b, .. },
            )
            | (
                State::CustomizedProperties { elements: a, .. },
                State::CustomizedProperties { elements: b, .. },
            ) => diff_elements(a, b),
            (
                State::SelectedElements {
                    identifiers: a, ..
                },
                State::SelectedElements {
                    identifiers: b, ..
                },
            ) => diff_selected(a, b),
            (State::JsonObject { value: a, .. }, State::JsonObject { value: b, .. }) => {
                let mut diffs = Vec::new();
                diff_json("", a, b, &mut diffs);
                diffs
            }
            (State::Null, State::Null) => Vec::new(),
            (a, b) => vec![StateDifference::property_value(
                None,
                "kind",
                Some(a.kind().to_string()),
                Some(b.kind().to_string()),
            )],
        }
    }

    /// A stable string for hashing equivalent states to the same bucket.
    /// Element property values are lowercased to agree with `diff`.
    pub fn canonical_key(&self) -> String {
        let normalized = match self {
            State::VisibleElements { elements, .. } | State::CustomizedProperties { elements, .. } => {
                let mut rows: Vec<(String, BTreeMap<String, String>)> = elements
                    .iter()
                    .map(|e| {
                        (
                            serde_json::to_string(&e.identifier).unwrap_or_default(),
                            e.properties
                                .iter()
                                .map(|(k, v)| (k.clone(), v.to_lowercase()))
                                .collect(),
                        )
                    })
                    .collect();
                rows.sort();
                serde_json::json!({ "kind": self.kind(), "elements": rows })
            }
            State::SelectedElements { identifiers, .. } => {
                let set: BTreeSet<&ElementIdentifier> = identifiers.iter().collect();
                serde_json::json!({ "kind": self.kind(), "identifiers": set })
            }
            State::CountOfElements { count } => {
                serde_json::json!({ "kind": self.kind(), "count": count })
            }
            State::JsonObject { value, .. } => {
                serde_json::json!({ "kind": self.kind(), "value": value })
            }
            State::Null => serde_json::json!({ "kind": self.kind() }),
        };
        normalized.to_string()
    }
}

impl PartialEq for State {
    fn eq(&self, other: &Self) -> bool {
        self.diff(other).is_empty()
    }
}

fn diff_elements(first: &[ElementSnapshot], second: &[ElementSnapshot]) -> Vec<StateDifference> {
    let by_id: BTreeMap<&ElementIdentifier, &ElementSnapshot> =
        second.iter().map(|e| (&e.identifier, e)).collect();
    let mut diffs = Vec::new();

    for element in first {
        let Some(other) = by_id.get(&element.identifier) else {
            diffs.push(StateDifference::MissingElement {
                identifier: element.identifier.clone(),
                first: Some(element.summary()),
                second: None,
            });
            continue;
        };
        let names: BTreeSet<&String> = element
            .properties
            .keys()
            .chain(other.properties.keys())
            .collect();
        for name in names {
            let a = element.properties.get(name);
            let b = other.properties.get(name);
            let same = match (a, b) {
                (Some(a), Some(b)) => a.to_lowercase() == b.to_lowercase(),
                (None, None) => true,
                _ => false,
            };
            if !same {
                diffs.push(StateDifference::property_value(
                    Some(element.identifier.clone()),
                    name.clone(),
                    a.cloned(),
                    b.cloned(),
                ));
            }
        }
    }

    let first_ids: BTreeSet<&ElementIdentifier> = first.iter().map(|e| &e.identifier).collect();
    for element in second {
        if !first_ids.contains(&element.identifier) {
            diffs.push(StateDifference::MissingElement {
                identifier: element.identifier.clone(),
                first: None,
                second: Some(element.summary()),
            });
        }
    }
    diffs
}

fn diff_selected(first: &[ElementIdentifier], second: &[ElementIdentifier]) -> Vec<StateDifference> {
    let a: BTreeSet<&ElementIdentifier> = first.iter().collect();
    let b: BTreeSet<&ElementIdentifier> = second.iter().collect();
    let mut diffs = Vec::new();
    for id in first.iter().filter(|id| !b.contains(id)) {
        diffs.push(StateDifference::MissingElement {
            identifier: id.clone(),
            first: Some(id.to_string()),
            second: None,
        });
    }
    for id in second.iter().filter(|id| !a.contains(id)) {
        diffs.push(StateDifference::MissingElement {
            identifier: id.clone(),
            first: None,
            second: Some(id.to_string()),
        });
    }
    diffs
}

fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn child_path(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", path, key)
    }
}

fn diff_json(path: &str, first: &Value, second: &Value, out: &mut Vec<StateDifference>) {
    match (first, second) {
        (Value::Object(a), Value::Object(b)) => {
            for (key, va) in a {
                let p = child_path(path, key);
                match b.get(key) {
                    Some(vb) => diff_json(&p, va, vb, out),
                    None => out.push(StateDifference::MissingProperty {
                        property: p,
                        first: Some(render(va)),
                        second: None,
                    }),
                }
            }
            for (key, vb) in b {
                if !a.contains_key(key) {
                    out.push(StateDifference::MissingProperty {
                        property: child_path(path, key),
                        first: None,
                        second: Some(render(vb)),
                    });
                }
            }
        }
        (Value::Array(a), Value::Array(b)) => {
            for i in 0..a.len().max(b.len()) {
                let p = format!("{}[{}]", path, i);
                match (a.get(i), b.get(i)) {
                    (Some(va), Some(vb)) => diff_json(&p, va, vb, out),
                    (va, vb) => out.push(StateDifference::MissingProperty {
                        property: p,
                        first: va.map(render),
                        second: vb.map(render),
                    }),
                }
            }
        }
        (a, b) if a == b => {}
        (a, b) => out.push(StateDifference::property_value(
            None,
            if path.is_empty() { "value" } else { path },
            Some(render(a)),
            Some(render(b)),
        )),
    }
}
