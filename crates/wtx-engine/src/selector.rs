use crate::driver::{Driver, DriverError, ElementHandle, Locator};
use async_recursion::async_recursion;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use wtx_common::{CompositeMode, IndexBasis, Selector};

/// The selectors a run is configured with.
///
/// `actionable` lists the elements actions are generated for, `stateful`
/// the elements states are observed on. Named selectors are referenced by
/// key from `SelectedElements` states and equivalence sets. The registry
/// travels with every test case so replays see the same listings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectorRegistry {
    #[serde(default)]
    pub actionable: Selector,
    #[serde(default)]
    pub stateful: Selector,
    #[serde(default)]
    pub named: BTreeMap<String, Selector>,
}

impl SelectorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, key: impl Into<String>, selector: Selector) {
        self.named.insert(key.into(), selector);
    }

    pub fn get(&self, key: &str) -> Option<&Selector> {
        self.named.get(key)
    }

    pub fn listing(&self, basis: IndexBasis) -> &Selector {
        match basis {
            IndexBasis::Actionable => &self.actionable,
            IndexBasis::Stateful => &self.stateful,
        }
    }
}

async fn displayed_only(
    driver: &mut dyn Driver,
    handles: Vec<ElementHandle>,
) -> Result<Vec<ElementHandle>, DriverError> {
    let mut visible = Vec::with_capacity(handles.len());
    for handle in handles {
        match driver.is_displayed(&handle).await {
            Ok(true) => visible.push(handle),
            Ok(false) => {}
            Err(e) if e.is_resolution_miss() => {}
            Err(e) => return Err(e),
        }
    }
    Ok(visible)
}

/// Evaluates `selector` against the document in `frame`.
///
/// Composites compare handles, so they rely on the driver returning the same
/// handle for an element however it was found.
#[async_recursion]
pub async fn evaluate(
    driver: &mut dyn Driver,
    selector: &Selector,
    frame: Option<&str>,
) -> Result<Vec<ElementHandle>, DriverError> {
    if let Some(xpath) = selector.as_xpath() {
        return driver.find_elements(&Locator::Xpath(xpath), frame).await;
    }
    match selector {
        Selector::Css { css } => {
            driver
                .find_elements(&Locator::Css(css.clone()), frame)
                .await
        }
        Selector::Property {
            property,
            contains,
            visible_only,
            max,
        } => {
            let xpath = Selector::property_xpath(property, *contains);
            let mut found = driver.find_elements(&Locator::Xpath(xpath), frame).await?;
            if *visible_only {
                found = displayed_only(&mut *driver, found).await?;
            }
            if let Some(max) = max {
                found.truncate(*max);
            }
            Ok(found)
        }
        Selector::First { inner } => {
            let mut found = evaluate(&mut *driver, inner, frame).await?;
            found.truncate(1);
            Ok(found)
        }
        Selector::Visible { inner } => {
            let found = evaluate(&mut *driver, inner, frame).await?;
            displayed_only(driver, found).await
        }
        Selector::Composite { mode, selectors } => {
            let mut results = Vec::with_capacity(selectors.len());
            for child in selectors {
                results.push(evaluate(&mut *driver, child, frame).await?);
            }
            Ok(combine(*mode, results))
        }
        // Empty tag lists; everything else has an xpath form.
        _ => Ok(Vec::new()),
    }
}

fn combine(mode: CompositeMode, results: Vec<Vec<ElementHandle>>) -> Vec<ElementHandle> {
    match mode {
        CompositeMode::Union => {
            let mut seen = HashSet::new();
            results
                .into_iter()
                .flatten()
                .filter(|h| seen.insert(h.clone()))
                .collect()
        }
        CompositeMode::Intersect => {
            let mut iter = results.into_iter();
            let Some(first) = iter.next() else {
                return Vec::new();
            };
            let others: Vec<HashSet<ElementHandle>> =
                iter.map(|r| r.into_iter().collect()).collect();
            let mut seen = HashSet::new();
            first
                .into_iter()
                .filter(|h| others.iter().all(|o| o.contains(h)))
                .filter(|h| seen.insert(h.clone()))
                .collect()
        }
    }
}
