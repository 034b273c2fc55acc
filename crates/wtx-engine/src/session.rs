use crate::driver::{Driver, DriverError, DriverFactory, ElementHandle, Locator, ScriptArg};
use crate::identify;
use crate::selector::{self, SelectorRegistry};
use async_recursion::async_recursion;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use wtx_common::{Action, ActionKind, IndexBasis, Selector};

/// Tags never offered as actionable or stateful elements.
pub const SKIPPED_TAGS: &[&str] = &[
    "meta", "script", "noscript", "title", "style", "html", "head", "body",
];

const FRAME_XPATH: &str = "//frame | //iframe";

/// An element found by a listing, with the frame it lives in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListedElement {
    pub handle: ElementHandle,
    pub frame: Option<String>,
    pub tag: String,
}

/// One live browser session plus the per-page caches built on top of it.
///
/// Element listings and the frame tree are cached until the next action;
/// `invalidate_cache` must be called whenever the page may have changed.
pub struct Session {
    driver: Box<dyn Driver>,
    selectors: Arc<SelectorRegistry>,
    listings: HashMap<IndexBasis, Vec<ListedElement>>,
    frames: Option<Vec<Option<String>>>,
}

impl Session {
    pub fn new(driver: Box<dyn Driver>, selectors: Arc<SelectorRegistry>) -> Self {
        Self {
            driver,
            selectors,
            listings: HashMap::new(),
            frames: None,
        }
    }

    pub async fn open(
        factory: &dyn DriverFactory,
        selectors: Arc<SelectorRegistry>,
    ) -> Result<Self, DriverError> {
        let driver = factory.open().await?;
        Ok(Self::new(driver, selectors))
    }

    pub fn driver(&mut self) -> &mut dyn Driver {
        self.driver.as_mut()
    }

    pub fn selectors(&self) -> &SelectorRegistry {
        &self.selectors
    }

    pub async fn load(&mut self, url: &str) -> Result<(), DriverError> {
        self.invalidate_cache();
        self.driver.load_url(url).await
    }

    pub fn invalidate_cache(&mut self) {
        self.listings.clear();
        self.frames = None;
    }

    /// The top document followed by every reachable named frame, breadth first.
    pub async fn frames(&mut self) -> Result<Vec<Option<String>>, DriverError> {
        if let Some(frames) = &self.frames {
            return Ok(frames.clone());
        }
        let mut frames: Vec<Option<String>> = vec![None];
        let mut work: VecDeque<Option<String>> = VecDeque::from([None]);
        while let Some(parent) = work.pop_front() {
            let found = self
                .driver
                .find_elements(&Locator::Xpath(FRAME_XPATH.into()), parent.as_deref())
                .await?;
            for handle in found {
                let Some(name) = self.frame_name(&handle).await? else {
                    debug!("Skipping anonymous frame in {:?}", parent);
                    continue;
                };
                let path = match &parent {
                    Some(p) => format!("{}/{}", p, name),
                    None => name,
                };
                let path = Some(path);
                if !frames.contains(&path) {
                    frames.push(path.clone());
                    work.push_back(path);
                }
            }
        }
        self.frames = Some(frames.clone());
        Ok(frames)
    }

    async fn frame_name(&mut self, handle: &ElementHandle) -> Result<Option<String>, DriverError> {
        for attribute in ["name", "id"] {
            if let Some(value) = self.driver.attribute(handle, attribute).await?
                && !value.is_empty()
            {
                return Ok(Some(value));
            }
        }
        Ok(None)
    }

    /// Evaluates `selector` in every frame, dropping skipped tags.
    pub async fn select(&mut self, selector: &Selector) -> Result<Vec<ListedElement>, DriverError> {
        let mut listed = Vec::new();
        for frame in self.frames().await? {
            let handles =
                selector::evaluate(self.driver.as_mut(), selector, frame.as_deref()).await?;
            for handle in handles {
                let tag = match self.driver.tag_name(&handle).await {
                    Ok(tag) => tag.to_lowercase(),
                    Err(e) if e.is_resolution_miss() => continue,
                    Err(e) => return Err(e),
                };
                if SKIPPED_TAGS.contains(&tag.as_str()) {
                    continue;
                }
                listed.push(ListedElement {
                    handle,
                    frame: frame.clone(),
                    tag,
                });
            }
        }
        Ok(listed)
    }

    /// The actionable or stateful listing of the current page.
    pub async fn list(&mut self, basis: IndexBasis) -> Result<Vec<ListedElement>, DriverError> {
        if let Some(listing) = self.listings.get(&basis) {
            return Ok(listing.clone());
        }
        let selector = self.selectors.listing(basis).clone();
        let listing = self.select(&selector).await?;
        self.listings.insert(basis, listing.clone());
        Ok(listing)
    }

    /// Elements of the named selector `key`.
    pub async fn select_named(&mut self, key: &str) -> Result<Vec<ListedElement>, DriverError> {
        let selector = self
            .selectors
            .get(key)
            .cloned()
            .ok_or_else(|| DriverError::NotFound(format!("selector '{}'", key)))?;
        self.select(&selector).await
    }

    pub async fn option_count(&mut self, handle: &ElementHandle) -> Result<usize, DriverError> {
        let value = self
            .driver
            .evaluate_script(
                "return arguments[0].options ? arguments[0].options.length : 0;",
                vec![ScriptArg::Element(handle.clone())],
            )
            .await?;
        Ok(value.as_u64().unwrap_or(0) as usize)
    }

    /// Performs `action`, resolving its target against the current page.
    #[async_recursion]
    pub async fn perform(&mut self, action: &Action) -> Result<(), DriverError> {
        match &action.kind {
            ActionKind::Click { target } => {
                let handle = identify::resolve(self, target).await?;
                self.driver.click(&handle).await
            }
            ActionKind::SetText { target, value } => {
                let handle = identify::resolve(self, target).await?;
                self.driver.clear(&handle).await?;
                self.driver.send_keys(&handle, value).await
            }
            ActionKind::Select {
                target,
                option_index,
            } => {
                let handle = identify::resolve(self, target).await?;
                self.driver.select_option(&handle, *option_index).await
            }
            ActionKind::Hover { target, delay_ms } => {
                let handle = identify::resolve(self, target).await?;
                self.driver.hover(&handle).await?;
                tokio::time::sleep(Duration::from_millis(*delay_ms)).await;
                Ok(())
            }
            ActionKind::Wait { duration_ms } => {
                tokio::time::sleep(Duration::from_millis(*duration_ms)).await;
                Ok(())
            }
            ActionKind::Back => self.driver.back().await,
            ActionKind::Forward => self.driver.forward().await,
            ActionKind::Refresh => self.driver.refresh().await,
            ActionKind::Composite { actions } => {
                for child in actions {
                    self.perform(child).await?;
                    self.invalidate_cache();
                }
                Ok(())
            }
        }
    }

    pub async fn close(mut self) -> Result<(), DriverError> {
        self.driver.close().await
    }
}
