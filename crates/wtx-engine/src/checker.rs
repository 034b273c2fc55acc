use crate::driver::{DriverError, ScriptArg};
use crate::identify;
use crate::session::Session;
use serde_json::Value;
use wtx_common::{CheckerSpec, ElementIdentifier, ElementSnapshot, IndexBasis, State};

const ELEMENT_PROPERTIES_SCRIPT: &str = r#"
var el = arguments[0], names = arguments[1], props = {};
function pathOf(node) {
  var steps = [];
  for (; node && node.nodeType === 1; node = node.parentNode) {
    var position = 1;
    for (var s = node.previousSibling; s; s = s.previousSibling) {
      if (s.nodeType === 1 && s.nodeName === node.nodeName) position++;
    }
    steps.unshift(node.nodeName.toLowerCase() + '[' + position + ']');
  }
  return '/' + steps.join('/');
}
for (var i = 0; i < names.length; i++) {
  var v = el[names[i]];
  if (v === undefined || v === null || typeof v === 'object' || typeof v === 'function') {
    v = el.getAttribute(names[i]);
  }
  if (v !== undefined && v !== null) props[names[i]] = String(v);
}
return { xpath: pathOf(el), properties: props };
"#;

/// Takes snapshots of one kind of state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateChecker {
    spec: CheckerSpec,
}

impl StateChecker {
    pub fn new(spec: CheckerSpec) -> Self {
        Self { spec }
    }

    pub fn for_state(state: &State) -> Self {
        Self::new(state.checker_spec())
    }

    pub fn spec(&self) -> &CheckerSpec {
        &self.spec
    }

    pub async fn snapshot(&self, session: &mut Session) -> Result<State, DriverError> {
        match &self.spec {
            CheckerSpec::CountOfElements => Ok(State::CountOfElements {
                count: session.list(IndexBasis::Stateful).await?.len(),
            }),
            CheckerSpec::VisibleElements { properties } => {
                let listing = session.list(IndexBasis::Stateful).await?;
                let mut elements = Vec::new();
                for element in &listing {
                    if !session.driver().is_displayed(&element.handle).await? {
                        continue;
                    }
                    let identifier =
                        identify::identify(session, element, IndexBasis::Stateful).await?;
                    let text = session.driver().text(&element.handle).await?;
                    let mut snapshot = ElementSnapshot::new(identifier)
                        .with("tag", element.tag.clone())
                        .with("text", text.trim());
                    for name in properties {
                        if let Some(value) = session.driver().attribute(&element.handle, name).await? {
                            snapshot = snapshot.with(name.clone(), value);
                        }
                    }
                    elements.push(snapshot);
                }
                Ok(State::VisibleElements {
                    properties: properties.clone(),
                    elements,
                })
            }
            CheckerSpec::CustomizedProperties {
                selector,
                properties,
            } => {
                let names = Value::from(properties.clone());
                let mut elements = Vec::new();
                for element in session.select(selector).await? {
                    let value = session
                        .driver()
                        .evaluate_script(
                            ELEMENT_PROPERTIES_SCRIPT,
                            vec![
                                ScriptArg::Element(element.handle.clone()),
                                ScriptArg::Value(names.clone()),
                            ],
                        )
                        .await?;
                    let xpath = value["xpath"].as_str().unwrap_or_default().to_string();
                    let mut snapshot =
                        ElementSnapshot::new(ElementIdentifier::xpath(xpath).in_frame(element.frame));
                    if let Some(map) = value["properties"].as_object() {
                        for (name, v) in map {
                            if let Some(v) = v.as_str() {
                                snapshot = snapshot.with(name.clone(), v);
                            }
                        }
                    }
                    elements.push(snapshot);
                }
                Ok(State::CustomizedProperties {
                    selector: selector.clone(),
                    properties: properties.clone(),
                    elements,
                })
            }
            CheckerSpec::SelectedElements { selector } => {
                let mut identifiers = Vec::new();
                for element in session.select_named(selector).await? {
                    identifiers
                        .push(identify::identify(session, &element, IndexBasis::Stateful).await?);
                }
                Ok(State::SelectedElements {
                    selector: selector.clone(),
                    identifiers,
                })
            }
            CheckerSpec::JsonObject { script } => {
                let value = session.driver().evaluate_script(script, Vec::new()).await?;
                Ok(State::JsonObject {
                    script: script.clone(),
                    value,
                })
            }
            CheckerSpec::Null => Ok(State::Null),
        }
    }
}

/// One snapshot per checker, in checker order.
pub async fn snapshot_all(
    checkers: &[StateChecker],
    session: &mut Session,
) -> Result<Vec<State>, DriverError> {
    let mut states = Vec::with_capacity(checkers.len());
    for checker in checkers {
        states.push(checker.snapshot(session).await?);
    }
    Ok(states)
}

/// True when any pair of corresponding states differs.
pub fn states_differ(before: &[State], after: &[State]) -> bool {
    before.len() != after.len()
        || before
            .iter()
            .zip(after)
            .any(|(b, a)| !b.diff(a).is_empty())
}
