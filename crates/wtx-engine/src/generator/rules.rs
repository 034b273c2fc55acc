use crate::driver::{DriverError, ElementHandle, Locator};
use crate::session::Session;
use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use wtx_common::{Action, ElementIdentifier};

/// An action to build for whichever element a rule matched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActionTemplate {
    Click,
    SetText { value: String },
    Select { option_index: usize },
    Hover { delay_ms: u64 },
}

impl ActionTemplate {
    pub fn instantiate(&self, target: &ElementIdentifier) -> Action {
        match self {
            ActionTemplate::Click => Action::click(target.clone()),
            ActionTemplate::SetText { value } => Action::set_text(target.clone(), value.clone()),
            ActionTemplate::Select { option_index } => Action::select(target.clone(), *option_index),
            ActionTemplate::Hover { delay_ms } => Action::hover(target.clone(), *delay_ms),
        }
    }
}

fn instantiate_all(templates: &[ActionTemplate], target: &ElementIdentifier) -> Vec<Action> {
    templates.iter().map(|t| t.instantiate(target)).collect()
}

/// A per-element customization of action generation.
///
/// The first rule that matches an element and is active decides that
/// element's actions outright; built-in defaults apply only when no rule matches.
#[async_trait]
pub trait ActionRule: Send + Sync {
    async fn matches(
        &self,
        session: &mut Session,
        element: &ElementHandle,
        identifier: &ElementIdentifier,
    ) -> Result<bool, DriverError>;

    async fn is_active(&self, _session: &mut Session) -> Result<bool, DriverError> {
        Ok(true)
    }

    async fn generate(
        &self,
        session: &mut Session,
        element: &ElementHandle,
        identifier: &ElementIdentifier,
    ) -> Result<Vec<Action>, DriverError>;
}

/// Element properties a `MultiCriterionRule` can constrain.
#[derive(Debug, Default)]
pub struct Criteria {
    pub tag: Option<Regex>,
    pub id: Option<Regex>,
    pub name: Option<Regex>,
    pub class: Option<Regex>,
    pub text: Option<Regex>,
    pub input_type: Option<Regex>,
}

/// Compiles `pattern` so that it must match the whole value.
pub fn full_match(pattern: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!("^(?:{})$", pattern))
}

/// Matches when every configured criterion fully matches the element.
/// A criterion on an absent or empty property never matches.
pub struct MultiCriterionRule {
    criteria: Criteria,
    actions: Vec<ActionTemplate>,
}

impl MultiCriterionRule {
    pub fn new(criteria: Criteria, actions: Vec<ActionTemplate>) -> Self {
        Self { criteria, actions }
    }

    async fn property(
        session: &mut Session,
        element: &ElementHandle,
        which: &str,
    ) -> Result<Option<String>, DriverError> {
        let driver = session.driver();
        let value = match which {
            "tag" => Some(driver.tag_name(element).await?),
            "text" => Some(driver.text(element).await?),
            attribute => driver.attribute(element, attribute).await?,
        };
        Ok(value.filter(|v| !v.is_empty()))
    }
}

#[async_trait]
impl ActionRule for MultiCriterionRule {
    async fn matches(
        &self,
        session: &mut Session,
        element: &ElementHandle,
        _identifier: &ElementIdentifier,
    ) -> Result<bool, DriverError> {
        let checks = [
            ("tag", &self.criteria.tag),
            ("id", &self.criteria.id),
            ("name", &self.criteria.name),
            ("class", &self.criteria.class),
            ("text", &self.criteria.text),
            ("type", &self.criteria.input_type),
        ];
        for (which, pattern) in checks {
            let Some(pattern) = pattern else {
                continue;
            };
            match Self::property(session, element, which).await? {
                Some(value) if pattern.is_match(&value) => {}
                _ => return Ok(false),
            }
        }
        Ok(true)
    }

    async fn generate(
        &self,
        _session: &mut Session,
        _element: &ElementHandle,
        identifier: &ElementIdentifier,
    ) -> Result<Vec<Action>, DriverError> {
        Ok(instantiate_all(&self.actions, identifier))
    }
}

async fn anchor_href(
    session: &mut Session,
    element: &ElementHandle,
) -> Result<Option<String>, DriverError> {
    let driver = session.driver();
    if driver.tag_name(element).await?.to_lowercase() != "a" {
        return Ok(None);
    }
    driver.attribute(element, "href").await
}

/// Clicks anchors whose `href` is a `javascript:` URL.
pub struct JavascriptAnchorRule {
    actions: Vec<ActionTemplate>,
}

impl JavascriptAnchorRule {
    pub fn new() -> Self {
        Self {
            actions: vec![ActionTemplate::Click],
        }
    }

    pub fn with_actions(actions: Vec<ActionTemplate>) -> Self {
        Self { actions }
    }
}

impl Default for JavascriptAnchorRule {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ActionRule for JavascriptAnchorRule {
    async fn matches(
        &self,
        session: &mut Session,
        element: &ElementHandle,
        _identifier: &ElementIdentifier,
    ) -> Result<bool, DriverError> {
        Ok(anchor_href(session, element)
            .await?
            .is_some_and(|href| href.trim_start().to_lowercase().starts_with("javascript:")))
    }

    async fn generate(
        &self,
        _session: &mut Session,
        _element: &ElementHandle,
        identifier: &ElementIdentifier,
    ) -> Result<Vec<Action>, DriverError> {
        Ok(instantiate_all(&self.actions, identifier))
    }
}

/// An `href` with no scheme of its own, resolved against the current page.
fn is_relative(href: &str) -> bool {
    url::Url::parse(href.trim()).is_err_and(|e| e == url::ParseError::RelativeUrlWithoutBase)
}

/// Clicks anchors that stay on the current site (`href` without a scheme).
pub struct RelativeAnchorRule {
    actions: Vec<ActionTemplate>,
}

impl RelativeAnchorRule {
    pub fn new() -> Self {
        Self {
            actions: vec![ActionTemplate::Click],
        }
    }

    pub fn with_actions(actions: Vec<ActionTemplate>) -> Self {
        Self { actions }
    }
}

impl Default for RelativeAnchorRule {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ActionRule for RelativeAnchorRule {
    async fn matches(
        &self,
        session: &mut Session,
        element: &ElementHandle,
        _identifier: &ElementIdentifier,
    ) -> Result<bool, DriverError> {
        Ok(anchor_href(session, element)
            .await?
            .is_some_and(|href| is_relative(&href)))
    }

    async fn generate(
        &self,
        _session: &mut Session,
        _element: &ElementHandle,
        identifier: &ElementIdentifier,
    ) -> Result<Vec<Action>, DriverError> {
        Ok(instantiate_all(&self.actions, identifier))
    }
}

/// Matches exactly one identifier.
pub struct IdentifierRule {
    identifier: ElementIdentifier,
    actions: Vec<ActionTemplate>,
}

impl IdentifierRule {
    pub fn new(identifier: ElementIdentifier, actions: Vec<ActionTemplate>) -> Self {
        Self {
            identifier,
            actions,
        }
    }
}

#[async_trait]
impl ActionRule for IdentifierRule {
    async fn matches(
        &self,
        _session: &mut Session,
        _element: &ElementHandle,
        identifier: &ElementIdentifier,
    ) -> Result<bool, DriverError> {
        Ok(*identifier == self.identifier)
    }

    async fn generate(
        &self,
        _session: &mut Session,
        _element: &ElementHandle,
        identifier: &ElementIdentifier,
    ) -> Result<Vec<Action>, DriverError> {
        Ok(instantiate_all(&self.actions, identifier))
    }
}

/// Matches elements returned by an absolute xpath query.
pub struct XpathRule {
    xpath: String,
    actions: Vec<ActionTemplate>,
}

impl XpathRule {
    pub fn new(xpath: impl Into<String>, actions: Vec<ActionTemplate>) -> Self {
        Self {
            xpath: xpath.into(),
            actions,
        }
    }
}

#[async_trait]
impl ActionRule for XpathRule {
    async fn matches(
        &self,
        session: &mut Session,
        element: &ElementHandle,
        identifier: &ElementIdentifier,
    ) -> Result<bool, DriverError> {
        let found = session
            .driver()
            .find_elements(&Locator::Xpath(self.xpath.clone()), identifier.frame())
            .await?;
        Ok(found.contains(element))
    }

    async fn generate(
        &self,
        _session: &mut Session,
        _element: &ElementHandle,
        identifier: &ElementIdentifier,
    ) -> Result<Vec<Action>, DriverError> {
        Ok(instantiate_all(&self.actions, identifier))
    }
}

/// AND of its children: matches when all match, generates the union of their actions.
pub struct CompositeRule {
    rules: Vec<Box<dyn ActionRule>>,
}

impl CompositeRule {
    pub fn new(rules: Vec<Box<dyn ActionRule>>) -> Self {
        Self { rules }
    }
}

#[async_trait]
impl ActionRule for CompositeRule {
    async fn matches(
        &self,
        session: &mut Session,
        element: &ElementHandle,
        identifier: &ElementIdentifier,
    ) -> Result<bool, DriverError> {
        for rule in &self.rules {
            if !rule.matches(session, element, identifier).await? {
                return Ok(false);
            }
        }
        Ok(!self.rules.is_empty())
    }

    async fn is_active(&self, session: &mut Session) -> Result<bool, DriverError> {
        for rule in &self.rules {
            if !rule.is_active(session).await? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    async fn generate(
        &self,
        session: &mut Session,
        element: &ElementHandle,
        identifier: &ElementIdentifier,
    ) -> Result<Vec<Action>, DriverError> {
        let mut actions: Vec<Action> = Vec::new();
        for rule in &self.rules {
            for action in rule.generate(session, element, identifier).await? {
                if !actions.contains(&action) {
                    actions.push(action);
                }
            }
        }
        Ok(actions)
    }
}
