pub mod rules;

use crate::driver::{DriverError, ElementHandle};
use crate::session::Session;
use rules::ActionRule;
use wtx_common::{Action, ElementIdentifier};

pub use rules::{
    ActionTemplate, CompositeRule, Criteria, IdentifierRule, JavascriptAnchorRule,
    MultiCriterionRule, RelativeAnchorRule, XpathRule,
};

/// Text typed into free-text inputs by the built-in rules.
pub const DEFAULT_INPUT_TEXT: &str = "TESTING";

/// Produces the candidate actions for a live element.
pub struct ActionGenerator {
    rules: Vec<Box<dyn ActionRule>>,
    input_text: String,
}

impl ActionGenerator {
    pub fn new() -> Self {
        Self {
            rules: Vec::new(),
            input_text: DEFAULT_INPUT_TEXT.to_string(),
        }
    }

    /// Rules are consulted in the order they are added.
    pub fn with_rule(mut self, rule: Box<dyn ActionRule>) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn push_rule(&mut self, rule: Box<dyn ActionRule>) {
        self.rules.push(rule);
    }

    pub fn with_input_text(mut self, text: impl Into<String>) -> Self {
        self.input_text = text.into();
        self
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    pub async fn generate(
        &self,
        session: &mut Session,
        element: &ElementHandle,
        identifier: &ElementIdentifier,
    ) -> Result<Vec<Action>, DriverError> {
        {
            let driver = session.driver();
            if !driver.is_displayed(element).await? || !driver.is_enabled(element).await? {
                return Ok(Vec::new());
            }
        }

        for rule in &self.rules {
            if rule.matches(session, element, identifier).await?
                && rule.is_active(session).await?
            {
                return rule.generate(session, element, identifier).await;
            }
        }

        self.default_actions(session, element, identifier).await
    }

    async fn default_actions(
        &self,
        session: &mut Session,
        element: &ElementHandle,
        identifier: &ElementIdentifier,
    ) -> Result<Vec<Action>, DriverError> {
        let tag = session.driver().tag_name(element).await?.to_lowercase();
        let click = || vec![Action::click(identifier.clone())];
        let set_text = || vec![Action::set_text(identifier.clone(), self.input_text.clone())];

        let actions = match tag.as_str() {
            "input" => {
                let input_type = session
                    .driver()
                    .attribute(element, "type")
                    .await?
                    .map(|t| t.to_lowercase())
                    .unwrap_or_else(|| "text".to_string());
                match input_type.as_str() {
                    "submit" | "checkbox" | "radio" => click(),
                    "text" | "password" => set_text(),
                    _ => Vec::new(),
                }
            }
            "textarea" => set_text(),
            "a" => click(),
            "button" => {
                if Self::aria_disabled(session, element).await? {
                    Vec::new()
                } else {
                    click()
                }
            }
            "select" => {
                let options = session.option_count(element).await?;
                (0..options.min(2))
                    .map(|i| Action::select(identifier.clone(), i))
                    .collect()
            }
            _ => {
                let role = session.driver().attribute(element, "role").await?;
                if role.as_deref() == Some("button") && !Self::aria_disabled(session, element).await? {
                    click()
                } else {
                    Vec::new()
                }
            }
        };
        Ok(actions)
    }

    async fn aria_disabled(session: &mut Session, element: &ElementHandle) -> Result<bool, DriverError> {
        let value = session.driver().attribute(element, "aria-disabled").await?;
        Ok(value.is_some_and(|v| !v.eq_ignore_ascii_case("false")))
    }
}

impl Default for ActionGenerator {
    fn default() -> Self {
        Self::new()
    }
}
