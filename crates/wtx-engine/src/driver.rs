use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Opaque reference to a live element, valid only within the session that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementHandle(pub String);

impl ElementHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Hands out one stable `ElementHandle` per element reference.
///
/// `reference` is whatever the transport uses to name an element (a
/// WebDriver element id, for instance). Registering the same reference twice
/// returns the first handle, so repeated lookups agree on identity. Cleared
/// on navigation.
#[derive(Debug, Clone)]
pub struct HandleTable<T> {
    by_reference: HashMap<String, ElementHandle>,
    entries: HashMap<ElementHandle, T>,
    next: usize,
}

impl<T> Default for HandleTable<T> {
    fn default() -> Self {
        Self {
            by_reference: HashMap::new(),
            entries: HashMap::new(),
            next: 0,
        }
    }
}

impl<T> HandleTable<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, reference: impl Into<String>, value: T) -> ElementHandle {
        let reference = reference.into();
        if let Some(handle) = self.by_reference.get(&reference) {
            return handle.clone();
        }
        self.next += 1;
        let handle = ElementHandle::new(format!("e{}", self.next));
        self.by_reference.insert(reference, handle.clone());
        self.entries.insert(handle.clone(), value);
        handle
    }

    pub fn get(&self, handle: &ElementHandle) -> Option<&T> {
        self.entries.get(handle)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Forgets every handle; later lookups of old handles miss.
    pub fn clear(&mut self) {
        self.by_reference.clear();
        self.entries.clear();
    }
}

/// How to look elements up.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Locator {
    Id(String),
    Name(String),
    Xpath(String),
    Css(String),
    TagName(String),
}

/// A value passed to `Driver::evaluate_script`.
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptArg {
    Element(ElementHandle),
    Value(serde_json::Value),
}

/// An HTTP response observed by the browser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpResponseRecord {
    pub uri: String,
    pub status: u16,
}

/// An uncaught script error reported by the page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptErrorRecord {
    pub source: String,
    pub line: u32,
    pub message: String,
}

/// Counts of requests the page issued and responses it received.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NetworkActivity {
    pub requests: u64,
    pub responses: u64,
}

#[derive(Debug, Error)]
pub enum DriverError {
    #[error("Driver not ready")]
    NotReady,
    #[error("Operation not supported: {0}")]
    NotSupported(String),
    #[error("Element not found: {0}")]
    NotFound(String),
    #[error("Stale element reference: {0}")]
    StaleElement(String),
    #[error("Navigation failed: {0}")]
    Navigation(String),
    #[error("Script failed: {0}")]
    Script(String),
    #[error("Timeout")]
    Timeout,
    #[error("Other: {0}")]
    Other(String),
}

impl DriverError {
    /// Misses are treated as "nothing to do" during action enumeration.
    pub fn is_resolution_miss(&self) -> bool {
        matches!(self, DriverError::NotFound(_) | DriverError::StaleElement(_))
    }
}

/// Primitive browser automation operations the explorer builds on.
///
/// Calls block on the browser and carry no implied retry. Frames are named
/// by a `/`-separated path of frame names or ids from the top document;
/// `None` is the top document.
#[async_trait]
pub trait Driver: Send + Sync {
    /// Navigate the current window to `url`.
    async fn load_url(&mut self, url: &str) -> Result<(), DriverError>;

    /// All elements matching `locator` in `frame`, in document order.
    ///
    /// Until the next navigation, finding an element again must return the
    /// handle it was first given: listings, selectors and equivalence sets
    /// compare handles to tell elements apart.
    async fn find_elements(
        &mut self,
        locator: &Locator,
        frame: Option<&str>,
    ) -> Result<Vec<ElementHandle>, DriverError>;

    /// First element matching `locator` in `frame`.
    async fn find_element(
        &mut self,
        locator: &Locator,
        frame: Option<&str>,
    ) -> Result<ElementHandle, DriverError> {
        self.find_elements(locator, frame)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| DriverError::NotFound(format!("{:?}", locator)))
    }

    async fn click(&mut self, element: &ElementHandle) -> Result<(), DriverError>;

    async fn send_keys(&mut self, element: &ElementHandle, text: &str)
    -> Result<(), DriverError>;

    async fn clear(&mut self, element: &ElementHandle) -> Result<(), DriverError>;

    /// Select the option at `index` of a `<select>` element.
    async fn select_option(
        &mut self,
        element: &ElementHandle,
        index: usize,
    ) -> Result<(), DriverError>;

    /// Move the pointer over the element.
    async fn hover(&mut self, _element: &ElementHandle) -> Result<(), DriverError> {
        Err(DriverError::NotSupported("hover".into()))
    }

    async fn is_displayed(&mut self, element: &ElementHandle) -> Result<bool, DriverError>;

    async fn is_enabled(&mut self, element: &ElementHandle) -> Result<bool, DriverError>;

    /// Lowercase tag name.
    async fn tag_name(&mut self, element: &ElementHandle) -> Result<String, DriverError>;

    /// Attribute value as written in the markup, `None` when absent.
    async fn attribute(
        &mut self,
        element: &ElementHandle,
        name: &str,
    ) -> Result<Option<String>, DriverError>;

    /// Rendered text content.
    async fn text(&mut self, element: &ElementHandle) -> Result<String, DriverError>;

    /// Run `script` as a function body; `arguments[i]` are `args`.
    async fn evaluate_script(
        &mut self,
        script: &str,
        args: Vec<ScriptArg>,
    ) -> Result<serde_json::Value, DriverError>;

    async fn back(&mut self) -> Result<(), DriverError> {
        Err(DriverError::NotSupported("back".into()))
    }

    async fn forward(&mut self) -> Result<(), DriverError> {
        Err(DriverError::NotSupported("forward".into()))
    }

    async fn refresh(&mut self) -> Result<(), DriverError> {
        Err(DriverError::NotSupported("refresh".into()))
    }

    async fn current_url(&mut self) -> Result<String, DriverError> {
        Err(DriverError::NotSupported("current_url".into()))
    }

    /// HTTP responses observed since the previous call.
    async fn take_http_responses(&mut self) -> Result<Vec<HttpResponseRecord>, DriverError> {
        Ok(Vec::new())
    }

    /// Script errors reported since the previous call.
    async fn take_script_errors(&mut self) -> Result<Vec<ScriptErrorRecord>, DriverError> {
        Ok(Vec::new())
    }

    /// Cumulative request/response counts for the current page.
    async fn network_activity(&mut self) -> Result<NetworkActivity, DriverError> {
        Ok(NetworkActivity::default())
    }

    /// Release the browser session.
    /// PNG capture of the current viewport.
    async fn screenshot(&mut self) -> Result<Vec<u8>, DriverError> {
        Err(DriverError::NotSupported("screenshot".into()))
    }

    async fn close(&mut self) -> Result<(), DriverError>;
}

/// Opens fresh, independent browser sessions.
#[async_trait]
pub trait DriverFactory: Send + Sync {
    async fn open(&self) -> Result<Box<dyn Driver>, DriverError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_reference_keeps_its_handle() {
        let mut table = HandleTable::new();
        let first = table.register("ref-a", "button");
        let again = table.register("ref-a", "button");
        let other = table.register("ref-b", "a");
        assert_eq!(first, again);
        assert_ne!(first, other);
        assert_eq!(table.len(), 2);
        assert_eq!(table.get(&first), Some(&"button"));

        table.clear();
        assert!(table.get(&first).is_none());
        assert_ne!(table.register("ref-a", "button"), first);
    }
}
