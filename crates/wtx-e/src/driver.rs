use crate::scripts;
use crate::webdriver::WebDriverClient;
use async_trait::async_trait;
use fantoccini::error::CmdError;
use fantoccini::{Client, Locator as WdLocator, elements::Element};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};
use wtx_engine::driver::{
    Driver, DriverError, ElementHandle, HandleTable, HttpResponseRecord, Locator, NetworkActivity,
    ScriptArg, ScriptErrorRecord,
};

fn map_error(e: CmdError) -> DriverError {
    classify(&e.to_string())
}

fn classify(message: &str) -> DriverError {
    let lower = message.to_lowercase();
    if lower.contains("stale element") || lower.contains("not attached to the page document") {
        DriverError::StaleElement(message.to_string())
    } else if lower.contains("no such element") || lower.contains("no such frame") {
        DriverError::NotFound(message.to_string())
    } else if lower.contains("javascript error") {
        DriverError::Script(message.to_string())
    } else if lower.contains("timeout") {
        DriverError::Timeout
    } else {
        DriverError::Other(message.to_string())
    }
}

/// Table key for a WebDriver element reference found in `frame`.
fn element_reference(frame: Option<&str>, id: &str) -> String {
    format!("{}#{}", frame.unwrap_or_default(), id)
}

#[derive(Deserialize)]
struct Activity {
    requests: u64,
    responses: u64,
}

/// A `Driver` over a WebDriver session.
///
/// Handles map to fantoccini elements together with the frame they were
/// found in; the session switches frames on demand before touching one.
/// An element found twice keeps its handle, keyed by its WebDriver reference.
pub struct FantocciniDriver {
    client: Option<WebDriverClient>,
    elements: HandleTable<(Element, Option<String>)>,
    current_frame: Option<String>,
}

impl FantocciniDriver {
    pub fn new(client: WebDriverClient) -> Self {
        Self {
            client: Some(client),
            elements: HandleTable::new(),
            current_frame: None,
        }
    }

    fn client(&self) -> Result<&Client, DriverError> {
        self.client
            .as_ref()
            .map(|c| &c.client)
            .ok_or(DriverError::NotReady)
    }

    async fn switch_to(&mut self, frame: Option<&str>) -> Result<(), DriverError> {
        if self.current_frame.as_deref() == frame {
            return Ok(());
        }
        let client = self.client()?.clone();
        client.enter_frame(None).await.map_err(map_error)?;
        self.current_frame = None;
        if let Some(path) = frame {
            for name in path.split('/') {
                let element = client
                    .find(WdLocator::XPath(&scripts::frame_xpath(name)))
                    .await
                    .map_err(map_error)?;
                element.enter_frame().await.map_err(map_error)?;
            }
            self.current_frame = Some(path.to_string());
        }
        Ok(())
    }

    /// The element behind `handle`, with its frame selected.
    async fn element(&mut self, handle: &ElementHandle) -> Result<Element, DriverError> {
        let (element, frame) = self.lookup(handle)?;
        self.switch_to(frame.as_deref()).await?;
        Ok(element)
    }

    fn lookup(&self, handle: &ElementHandle) -> Result<(Element, Option<String>), DriverError> {
        self.elements
            .get(handle)
            .cloned()
            .ok_or_else(|| DriverError::StaleElement(handle.as_str().to_string()))
    }

    fn register(&mut self, element: Element, frame: Option<&str>) -> ElementHandle {
        let reference = element_reference(frame, &element.element_id().to_string());
        self.elements
            .register(reference, (element, frame.map(str::to_string)))
    }

    async fn install_collector(&mut self) -> Result<(), DriverError> {
        self.switch_to(None).await?;
        let installed = self
            .client()?
            .execute(scripts::INSTALL_COLLECTOR, Vec::new())
            .await
            .map_err(map_error)?;
        if installed.as_bool() == Some(true) {
            debug!("Installed page collector");
        }
        Ok(())
    }

    async fn collect(&mut self, script: &str) -> Result<Value, DriverError> {
        self.install_collector().await?;
        self.client()?
            .execute(script, Vec::new())
            .await
            .map_err(map_error)
    }

    fn forget_page(&mut self) {
        self.elements.clear();
        self.current_frame = None;
    }
}

#[async_trait]
impl Driver for FantocciniDriver {
    async fn load_url(&mut self, url: &str) -> Result<(), DriverError> {
        info!("Navigating to: {}", url);
        self.forget_page();
        self.client()?
            .goto(url)
            .await
            .map_err(|e| DriverError::Navigation(e.to_string()))?;
        self.install_collector().await
    }

    async fn find_elements(
        &mut self,
        locator: &Locator,
        frame: Option<&str>,
    ) -> Result<Vec<ElementHandle>, DriverError> {
        self.switch_to(frame).await?;
        let css;
        let wd = match locator {
            Locator::Id(id) => WdLocator::Id(id),
            Locator::Xpath(xpath) => WdLocator::XPath(xpath),
            Locator::Css(selector) => WdLocator::Css(selector),
            Locator::Name(name) => {
                css = format!("[name=\"{}\"]", name.replace('"', "\\\""));
                WdLocator::Css(&css)
            }
            Locator::TagName(tag) => WdLocator::Css(tag),
        };
        let found = self.client()?.find_all(wd).await.map_err(map_error)?;
        Ok(found
            .into_iter()
            .map(|element| self.register(element, frame))
            .collect())
    }

    async fn click(&mut self, element: &ElementHandle) -> Result<(), DriverError> {
        self.element(element).await?.click().await.map_err(map_error)
    }

    async fn send_keys(&mut self, element: &ElementHandle, text: &str) -> Result<(), DriverError> {
        self.element(element)
            .await?
            .send_keys(text)
            .await
            .map_err(map_error)
    }

    async fn clear(&mut self, element: &ElementHandle) -> Result<(), DriverError> {
        self.element(element).await?.clear().await.map_err(map_error)
    }

    async fn select_option(
        &mut self,
        element: &ElementHandle,
        index: usize,
    ) -> Result<(), DriverError> {
        self.element(element)
            .await?
            .select_by_index(index)
            .await
            .map_err(map_error)
    }

    async fn hover(&mut self, element: &ElementHandle) -> Result<(), DriverError> {
        let target = self.element(element).await?;
        let arg = serde_json::to_value(&target).map_err(|e| DriverError::Other(e.to_string()))?;
        self.client()?
            .execute(scripts::HOVER, vec![arg])
            .await
            .map_err(map_error)?;
        Ok(())
    }

    async fn is_displayed(&mut self, element: &ElementHandle) -> Result<bool, DriverError> {
        self.element(element)
            .await?
            .is_displayed()
            .await
            .map_err(map_error)
    }

    async fn is_enabled(&mut self, element: &ElementHandle) -> Result<bool, DriverError> {
        self.element(element)
            .await?
            .is_enabled()
            .await
            .map_err(map_error)
    }

    async fn tag_name(&mut self, element: &ElementHandle) -> Result<String, DriverError> {
        Ok(self
            .element(element)
            .await?
            .tag_name()
            .await
            .map_err(map_error)?
            .to_lowercase())
    }

    async fn attribute(
        &mut self,
        element: &ElementHandle,
        name: &str,
    ) -> Result<Option<String>, DriverError> {
        self.element(element)
            .await?
            .attr(name)
            .await
            .map_err(map_error)
    }

    async fn text(&mut self, element: &ElementHandle) -> Result<String, DriverError> {
        self.element(element).await?.text().await.map_err(map_error)
    }

    async fn evaluate_script(
        &mut self,
        script: &str,
        args: Vec<ScriptArg>,
    ) -> Result<Value, DriverError> {
        let mut values = Vec::with_capacity(args.len());
        let mut frame = None;
        for arg in args {
            match arg {
                ScriptArg::Element(handle) => {
                    let (element, element_frame) = self.lookup(&handle)?;
                    frame = element_frame;
                    values.push(
                        serde_json::to_value(&element)
                            .map_err(|e| DriverError::Other(e.to_string()))?,
                    );
                }
                ScriptArg::Value(value) => values.push(value),
            }
        }
        self.switch_to(frame.as_deref()).await?;
        self.client()?.execute(script, values).await.map_err(map_error)
    }

    async fn back(&mut self) -> Result<(), DriverError> {
        self.forget_page();
        self.client()?
            .back()
            .await
            .map_err(|e| DriverError::Navigation(format!("back failed: {}", e)))
    }

    async fn forward(&mut self) -> Result<(), DriverError> {
        self.forget_page();
        self.client()?
            .forward()
            .await
            .map_err(|e| DriverError::Navigation(format!("forward failed: {}", e)))
    }

    async fn refresh(&mut self) -> Result<(), DriverError> {
        self.forget_page();
        self.client()?
            .refresh()
            .await
            .map_err(|e| DriverError::Navigation(format!("refresh failed: {}", e)))
    }

    async fn current_url(&mut self) -> Result<String, DriverError> {
        self.client()?
            .current_url()
            .await
            .map(|u| u.to_string())
            .map_err(map_error)
    }

    async fn take_http_responses(&mut self) -> Result<Vec<HttpResponseRecord>, DriverError> {
        let value = self.collect(scripts::TAKE_HTTP_RESPONSES).await?;
        serde_json::from_value(value).map_err(|e| DriverError::Script(e.to_string()))
    }

    async fn take_script_errors(&mut self) -> Result<Vec<ScriptErrorRecord>, DriverError> {
        let value = self.collect(scripts::TAKE_SCRIPT_ERRORS).await?;
        serde_json::from_value(value).map_err(|e| DriverError::Script(e.to_string()))
    }

    async fn network_activity(&mut self) -> Result<NetworkActivity, DriverError> {
        let value = self.collect(scripts::NETWORK_ACTIVITY).await?;
        let activity: Activity =
            serde_json::from_value(value).map_err(|e| DriverError::Script(e.to_string()))?;
        Ok(NetworkActivity {
            requests: activity.requests,
            responses: activity.responses,
        })
    }

    async fn screenshot(&mut self) -> Result<Vec<u8>, DriverError> {
        self.switch_to(None).await?;
        self.client()?
            .screenshot()
            .await
            .map_err(|e| DriverError::Other(format!("Screenshot failed: {}", e)))
    }

    async fn close(&mut self) -> Result<(), DriverError> {
        self.forget_page();
        if let Some(client) = self.client.take() {
            client.close().await?;
        } else {
            warn!("Session already closed");
        }
        Ok(())
    }
}
