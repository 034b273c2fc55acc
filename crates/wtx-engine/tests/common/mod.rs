#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::{Value, json};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex};
use wtx_engine::driver::{
    Driver, DriverError, DriverFactory, ElementHandle, HandleTable, HttpResponseRecord, Locator,
    NetworkActivity, ScriptArg, ScriptErrorRecord,
};

#[derive(Debug, Clone)]
pub struct FakeElement {
    pub key: String,
    pub tag: String,
    pub attrs: BTreeMap<String, String>,
    pub text: String,
    pub displayed: bool,
    pub enabled: bool,
    pub frame: Option<String>,
    pub options: usize,
}

impl FakeElement {
    pub fn new(key: &str, tag: &str) -> Self {
        Self {
            key: key.to_string(),
            tag: tag.to_string(),
            attrs: BTreeMap::new(),
            text: String::new(),
            displayed: true,
            enabled: true,
            frame: None,
            options: 0,
        }
    }

    pub fn attr(mut self, name: &str, value: &str) -> Self {
        self.attrs.insert(name.to_string(), value.to_string());
        self
    }

    pub fn id(self, id: &str) -> Self {
        self.attr("id", id)
    }

    pub fn text(mut self, text: &str) -> Self {
        self.text = text.to_string();
        self
    }

    pub fn hidden(mut self) -> Self {
        self.displayed = false;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn in_frame(mut self, frame: &str) -> Self {
        self.frame = Some(frame.to_string());
        self
    }

    pub fn options(mut self, count: usize) -> Self {
        self.options = count;
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct FakePage {
    pub elements: Vec<FakeElement>,
    pub json: Value,
    pub responses: Vec<HttpResponseRecord>,
    pub script_errors: Vec<ScriptErrorRecord>,
}

impl FakePage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn element(mut self, element: FakeElement) -> Self {
        self.elements.push(element);
        self
    }

    pub fn json(mut self, value: Value) -> Self {
        self.json = value;
        self
    }

    pub fn response(mut self, uri: &str, status: u16) -> Self {
        self.responses.push(HttpResponseRecord {
            uri: uri.to_string(),
            status,
        });
        self
    }

    pub fn script_error(mut self, source: &str, line: u32, message: &str) -> Self {
        self.script_errors.push(ScriptErrorRecord {
            source: source.to_string(),
            line,
            message: message.to_string(),
        });
        self
    }
}

/// Pages plus the clicks that move between them.
#[derive(Debug, Clone, Default)]
pub struct FakeApp {
    pages: HashMap<String, FakePage>,
    start: String,
    transitions: HashMap<(String, String), String>,
    broken: HashSet<String>,
}

impl FakeApp {
    pub fn new(start: &str) -> Self {
        Self {
            start: start.to_string(),
            ..Self::default()
        }
    }

    pub fn page(mut self, name: &str, page: FakePage) -> Self {
        self.pages.insert(name.to_string(), page);
        self
    }

    pub fn on_click(mut self, page: &str, key: &str, target: &str) -> Self {
        self.transitions
            .insert((page.to_string(), key.to_string()), target.to_string());
        self
    }

    /// Every interaction with `key` fails.
    pub fn broken(mut self, key: &str) -> Self {
        self.broken.insert(key.to_string());
        self
    }
}

/// A small shop: a search form leading to results, and an about page.
pub fn shop() -> FakeApp {
    FakeApp::new("home")
        .page(
            "home",
            FakePage::new()
                .element(FakeElement::new("search", "input").id("search").attr("type", "text"))
                .element(FakeElement::new("go", "button").id("go").text("Go"))
                .element(
                    FakeElement::new("nav", "a")
                        .attr("class", "nav")
                        .attr("href", "/about")
                        .text("About"),
                )
                .element(FakeElement::new("welcome", "div").text("Welcome")),
        )
        .page(
            "results",
            FakePage::new()
                .element(FakeElement::new("count", "div").id("count").text("3 results"))
                .element(FakeElement::new("home", "a").id("home").attr("href", "/").text("Home")),
        )
        .page(
            "about",
            FakePage::new().element(FakeElement::new("about", "p").text("About us")),
        )
        .on_click("home", "go", "results")
        .on_click("home", "nav", "about")
        .on_click("results", "home", "home")
}

/// What every session opened by a factory did.
#[derive(Debug, Default)]
pub struct Journal {
    pub opened: usize,
    pub closed: usize,
    pub loads: usize,
    pub clicks: Vec<String>,
    pub typed: Vec<(String, String)>,
    pub selected: Vec<(String, usize)>,
    /// Remaining page loads that fail.
    pub failing_loads: usize,
    /// Remaining failing clicks per element key.
    pub flaky: HashMap<String, usize>,
}

pub struct FakeFactory {
    app: Arc<FakeApp>,
    journal: Arc<Mutex<Journal>>,
    opaque_handles: bool,
}

impl FakeFactory {
    pub fn new(app: FakeApp) -> Self {
        Self {
            app: Arc::new(app),
            journal: Arc::new(Mutex::new(Journal::default())),
            opaque_handles: false,
        }
    }

    /// Drivers hand out `e{n}` handles through a `HandleTable`, the way the
    /// WebDriver backend does, instead of handles that spell out the element.
    pub fn opaque_handles(mut self) -> Self {
        self.opaque_handles = true;
        self
    }

    pub fn fail_first_loads(self, count: usize) -> Self {
        self.journal.lock().unwrap().failing_loads = count;
        self
    }

    pub fn flaky_click(self, key: &str, failures: usize) -> Self {
        self.journal
            .lock()
            .unwrap()
            .flaky
            .insert(key.to_string(), failures);
        self
    }

    pub fn journal(&self) -> std::sync::MutexGuard<'_, Journal> {
        self.journal.lock().unwrap()
    }

    pub fn driver(&self) -> FakeDriver {
        FakeDriver {
            app: self.app.clone(),
            journal: self.journal.clone(),
            page: None,
            history: Vec::new(),
            forward: Vec::new(),
            generation: 0,
            values: HashMap::new(),
            responses: Vec::new(),
            script_errors: Vec::new(),
            handles: self.opaque_handles.then(HandleTable::new),
        }
    }
}

#[async_trait]
impl DriverFactory for FakeFactory {
    async fn open(&self) -> Result<Box<dyn Driver>, DriverError> {
        self.journal.lock().unwrap().opened += 1;
        Ok(Box::new(self.driver()))
    }
}

/// Handles are `generation:page:key`, or table handles in opaque mode; any
/// navigation makes earlier handles stale.
pub struct FakeDriver {
    app: Arc<FakeApp>,
    journal: Arc<Mutex<Journal>>,
    page: Option<String>,
    history: Vec<String>,
    forward: Vec<String>,
    generation: usize,
    values: HashMap<String, String>,
    responses: Vec<HttpResponseRecord>,
    script_errors: Vec<ScriptErrorRecord>,
    /// Element keys by handle in opaque mode.
    handles: Option<HandleTable<String>>,
}

fn literal(value: &str) -> String {
    value
        .trim()
        .trim_matches(|c| c == '\'' || c == '"')
        .to_string()
}

fn matches_step(element: &FakeElement, step: &str) -> Result<bool, DriverError> {
    let step = step.trim();
    let (name, predicate) = match step.split_once('[') {
        Some((name, rest)) => (name, rest.strip_suffix(']')),
        None => (step, None),
    };
    if name != "*" && name != element.tag {
        return Ok(false);
    }
    let Some(predicate) = predicate else {
        return Ok(true);
    };
    if let Some(inner) = predicate
        .strip_prefix("contains(@")
        .and_then(|p| p.strip_suffix(')'))
    {
        let (attribute, value) = inner
            .split_once(',')
            .ok_or_else(|| DriverError::NotSupported(predicate.to_string()))?;
        return Ok(element
            .attrs
            .get(attribute.trim())
            .is_some_and(|v| v.contains(&literal(value))));
    }
    if let Some(inner) = predicate.strip_prefix('@') {
        let (attribute, value) = inner
            .split_once('=')
            .ok_or_else(|| DriverError::NotSupported(predicate.to_string()))?;
        return Ok(element.attrs.get(attribute.trim()) == Some(&literal(value)));
    }
    Err(DriverError::NotSupported(predicate.to_string()))
}

fn matches_xpath(element: &FakeElement, xpath: &str) -> Result<bool, DriverError> {
    for part in xpath.split(" | ") {
        let step = part
            .trim()
            .strip_prefix("//")
            .ok_or_else(|| DriverError::NotSupported(xpath.to_string()))?;
        if matches_step(element, step)? {
            return Ok(true);
        }
    }
    Ok(false)
}

fn matches_css(element: &FakeElement, css: &str) -> bool {
    if let Some(id) = css.strip_prefix('#') {
        return element.attrs.get("id").map(String::as_str) == Some(id);
    }
    let (tag, class) = match css.split_once('.') {
        Some((tag, class)) => (tag, Some(class)),
        None => (css, None),
    };
    (tag.is_empty() || tag == element.tag)
        && class.is_none_or(|c| {
            element
                .attrs
                .get("class")
                .is_some_and(|v| v.split_whitespace().any(|w| w == c))
        })
}

impl FakeDriver {
    fn current(&self) -> Result<&FakePage, DriverError> {
        let name = self.page.as_ref().ok_or(DriverError::NotReady)?;
        self.app
            .pages
            .get(name)
            .ok_or_else(|| DriverError::Navigation(format!("no page {}", name)))
    }

    fn handle_for(&mut self, key: &str) -> ElementHandle {
        let page = self.page.clone().unwrap_or_default();
        let reference = format!("{}:{}:{}", self.generation, page, key);
        match &mut self.handles {
            Some(table) => table.register(reference, key.to_string()),
            None => ElementHandle::new(reference),
        }
    }

    fn element(&self, handle: &ElementHandle) -> Result<&FakeElement, DriverError> {
        let stale = || DriverError::StaleElement(handle.as_str().to_string());
        let key = match &self.handles {
            Some(table) => table.get(handle).ok_or_else(stale)?.as_str(),
            None => {
                let mut parts = handle.as_str().splitn(3, ':');
                let generation = parts.next().unwrap_or_default();
                let _page = parts.next();
                if generation != self.generation.to_string() {
                    return Err(stale());
                }
                parts.next().unwrap_or_default()
            }
        };
        self.current()?
            .elements
            .iter()
            .find(|e| e.key == key)
            .ok_or_else(|| DriverError::StaleElement(handle.as_str().to_string()))
    }

    fn enter(&mut self, page: String) -> Result<(), DriverError> {
        let target = self
            .app
            .pages
            .get(&page)
            .ok_or_else(|| DriverError::Navigation(format!("no page {}", page)))?;
        self.responses.extend(target.responses.iter().cloned());
        self.script_errors.extend(target.script_errors.iter().cloned());
        self.page = Some(page);
        self.generation += 1;
        self.values.clear();
        if let Some(table) = &mut self.handles {
            table.clear();
        }
        Ok(())
    }

    fn navigate(&mut self, page: String) -> Result<(), DriverError> {
        if let Some(current) = self.page.take() {
            self.history.push(current);
        }
        self.forward.clear();
        self.enter(page)
    }

    fn element_properties(&self, element: &FakeElement, names: &[Value]) -> Value {
        let position = self
            .current()
            .map(|page| {
                page.elements
                    .iter()
                    .take_while(|e| e.key != element.key)
                    .filter(|e| e.tag == element.tag)
                    .count()
            })
            .unwrap_or_default();
        let mut properties = serde_json::Map::new();
        for name in names.iter().filter_map(Value::as_str) {
            let value = match name {
                "value" => self.values.get(&element.key).or(element.attrs.get(name)),
                _ => element.attrs.get(name),
            };
            if let Some(value) = value {
                properties.insert(name.to_string(), Value::String(value.clone()));
            }
        }
        json!({
            "xpath": format!("/html[1]/body[1]/{}[{}]", element.tag, position + 1),
            "properties": properties,
        })
    }
}

#[async_trait]
impl Driver for FakeDriver {
    async fn load_url(&mut self, _url: &str) -> Result<(), DriverError> {
        {
            let mut journal = self.journal.lock().unwrap();
            journal.loads += 1;
            if journal.failing_loads > 0 {
                journal.failing_loads -= 1;
                return Err(DriverError::Navigation("connection refused".into()));
            }
        }
        self.history.clear();
        self.forward.clear();
        self.page = None;
        let start = self.app.start.clone();
        self.enter(start)
    }

    async fn find_elements(
        &mut self,
        locator: &Locator,
        frame: Option<&str>,
    ) -> Result<Vec<ElementHandle>, DriverError> {
        let mut keys = Vec::new();
        for element in &self.current()?.elements {
            if element.frame.as_deref() != frame {
                continue;
            }
            let hit = match locator {
                Locator::Id(id) => element.attrs.get("id") == Some(id),
                Locator::Name(name) => element.attrs.get("name") == Some(name),
                Locator::TagName(tag) => element.tag == *tag,
                Locator::Css(css) => matches_css(element, css),
                Locator::Xpath(xpath) => matches_xpath(element, xpath)?,
            };
            if hit {
                keys.push(element.key.clone());
            }
        }
        Ok(keys.iter().map(|key| self.handle_for(key)).collect())
    }

    async fn click(&mut self, element: &ElementHandle) -> Result<(), DriverError> {
        let key = self.element(element)?.key.clone();
        if self.app.broken.contains(&key) {
            return Err(DriverError::Other(format!("{} is not interactable", key)));
        }
        {
            let mut journal = self.journal.lock().unwrap();
            if let Some(remaining) = journal.flaky.get_mut(&key)
                && *remaining > 0
            {
                *remaining -= 1;
                return Err(DriverError::Other(format!("{} did not respond", key)));
            }
            journal.clicks.push(key.clone());
        }
        let page = self.page.clone().unwrap_or_default();
        if let Some(target) = self.app.transitions.get(&(page, key)).cloned() {
            self.navigate(target)?;
        }
        Ok(())
    }

    async fn send_keys(&mut self, element: &ElementHandle, text: &str) -> Result<(), DriverError> {
        let key = self.element(element)?.key.clone();
        if self.app.broken.contains(&key) {
            return Err(DriverError::Other(format!("{} is not interactable", key)));
        }
        self.values.entry(key.clone()).or_default().push_str(text);
        self.journal
            .lock()
            .unwrap()
            .typed
            .push((key, text.to_string()));
        Ok(())
    }

    async fn clear(&mut self, element: &ElementHandle) -> Result<(), DriverError> {
        let key = self.element(element)?.key.clone();
        self.values.remove(&key);
        Ok(())
    }

    async fn select_option(
        &mut self,
        element: &ElementHandle,
        index: usize,
    ) -> Result<(), DriverError> {
        let element = self.element(element)?;
        if index >= element.options {
            return Err(DriverError::NotFound(format!("option {}", index)));
        }
        let key = element.key.clone();
        self.journal.lock().unwrap().selected.push((key, index));
        Ok(())
    }

    async fn hover(&mut self, element: &ElementHandle) -> Result<(), DriverError> {
        self.element(element).map(|_| ())
    }

    async fn is_displayed(&mut self, element: &ElementHandle) -> Result<bool, DriverError> {
        Ok(self.element(element)?.displayed)
    }

    async fn is_enabled(&mut self, element: &ElementHandle) -> Result<bool, DriverError> {
        Ok(self.element(element)?.enabled)
    }

    async fn tag_name(&mut self, element: &ElementHandle) -> Result<String, DriverError> {
        Ok(self.element(element)?.tag.clone())
    }

    async fn attribute(
        &mut self,
        element: &ElementHandle,
        name: &str,
    ) -> Result<Option<String>, DriverError> {
        let element = self.element(element)?;
        if name == "value"
            && let Some(value) = self.values.get(&element.key)
        {
            return Ok(Some(value.clone()));
        }
        Ok(element.attrs.get(name).cloned())
    }

    async fn text(&mut self, element: &ElementHandle) -> Result<String, DriverError> {
        Ok(self.element(element)?.text.clone())
    }

    async fn evaluate_script(
        &mut self,
        script: &str,
        args: Vec<ScriptArg>,
    ) -> Result<Value, DriverError> {
        let target = match args.first() {
            Some(ScriptArg::Element(handle)) => Some(self.element(handle)?.clone()),
            _ => None,
        };
        if script.contains("options.length") {
            return Ok(json!(target.map(|e| e.options).unwrap_or_default()));
        }
        if script.contains("pathOf") {
            let element =
                target.ok_or_else(|| DriverError::Script("missing element argument".into()))?;
            let names = match args.get(1) {
                Some(ScriptArg::Value(Value::Array(names))) => names.clone(),
                _ => Vec::new(),
            };
            return Ok(self.element_properties(&element, &names));
        }
        if script.starts_with("return !!(") {
            return Ok(Value::Bool(true));
        }
        Ok(self.current()?.json.clone())
    }

    async fn back(&mut self) -> Result<(), DriverError> {
        let Some(previous) = self.history.pop() else {
            return Ok(());
        };
        if let Some(current) = self.page.take() {
            self.forward.push(current);
        }
        self.enter(previous)
    }

    async fn forward(&mut self) -> Result<(), DriverError> {
        let Some(next) = self.forward.pop() else {
            return Ok(());
        };
        if let Some(current) = self.page.take() {
            self.history.push(current);
        }
        self.enter(next)
    }

    async fn refresh(&mut self) -> Result<(), DriverError> {
        let current = self.page.clone().ok_or(DriverError::NotReady)?;
        self.enter(current)
    }

    async fn current_url(&mut self) -> Result<String, DriverError> {
        Ok(format!("http://shop.test/{}", self.page.as_deref().unwrap_or_default()))
    }

    async fn take_http_responses(&mut self) -> Result<Vec<HttpResponseRecord>, DriverError> {
        Ok(std::mem::take(&mut self.responses))
    }

    async fn take_script_errors(&mut self) -> Result<Vec<ScriptErrorRecord>, DriverError> {
        Ok(std::mem::take(&mut self.script_errors))
    }

    async fn network_activity(&mut self) -> Result<NetworkActivity, DriverError> {
        let count = self.responses.len() as u64;
        Ok(NetworkActivity {
            requests: count,
            responses: count,
        })
    }

    async fn screenshot(&mut self) -> Result<Vec<u8>, DriverError> {
        let page = self.page.as_deref().ok_or(DriverError::NotReady)?;
        Ok(format!("png:{}", page).into_bytes())
    }

    async fn close(&mut self) -> Result<(), DriverError> {
        self.journal.lock().unwrap().closed += 1;
        Ok(())
    }
}
