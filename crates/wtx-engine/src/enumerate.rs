use crate::driver::DriverError;
use crate::equivalence::{EquivalenceRound, EquivalenceSet};
use crate::generator::ActionGenerator;
use crate::identify;
use crate::session::Session;
use serde::{Deserialize, Serialize};
use tracing::debug;
use wtx_common::{Action, IndexBasis};

/// Which browser-chrome actions are offered in every state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrowserActions {
    #[serde(default)]
    pub back: bool,
    #[serde(default)]
    pub forward: bool,
    #[serde(default)]
    pub refresh: bool,
}

impl BrowserActions {
    pub fn actions(&self) -> Vec<Action> {
        let mut actions = Vec::new();
        if self.back {
            actions.push(Action::back());
        }
        if self.forward {
            actions.push(Action::forward());
        }
        if self.refresh {
            actions.push(Action::refresh());
        }
        actions
    }
}

/// Lists every action available in the current page.
pub struct ActionEnumerator<'a> {
    pub generator: &'a ActionGenerator,
    pub equivalence: &'a [EquivalenceSet],
    pub browser: BrowserActions,
}

impl ActionEnumerator<'_> {
    /// Browser actions first, then element actions in listing order.
    ///
    /// Elements that cannot be identified or went stale are skipped; they
    /// simply produce no actions.
    pub async fn available_actions(&self, session: &mut Session) -> Result<Vec<Action>, DriverError> {
        let mut actions = self.browser.actions();
        let mut round = EquivalenceRound::evaluate(self.equivalence, session).await?;

        for element in session.list(IndexBasis::Actionable).await? {
            if round.should_skip(&element.handle) {
                continue;
            }
            let identifier =
                match identify::identify(session, &element, IndexBasis::Actionable).await {
                    Ok(identifier) => identifier,
                    Err(e) if e.is_resolution_miss() => {
                        debug!("Could not identify <{}>: {}", element.tag, e);
                        continue;
                    }
                    Err(e) => return Err(e),
                };
            let generated = match self
                .generator
                .generate(session, &element.handle, &identifier)
                .await
            {
                Ok(generated) => generated,
                Err(e) if e.is_resolution_miss() => {
                    debug!("No actions for {}: {}", identifier, e);
                    continue;
                }
                Err(e) => return Err(e),
            };
            if generated.is_empty() {
                continue;
            }
            round.consume(&element.handle);
            for action in generated {
                if !actions.contains(&action) {
                    actions.push(action);
                }
            }
        }
        Ok(actions)
    }
}
