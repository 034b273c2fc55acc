use crate::driver::FantocciniDriver;
use async_trait::async_trait;
use fantoccini::{Client, ClientBuilder};
use tracing::info;
use wtx_engine::driver::{Driver, DriverError, DriverFactory};

pub type Capabilities = serde_json::Map<String, serde_json::Value>;

pub struct WebDriverClient {
    pub client: Client,
}

impl WebDriverClient {
    pub async fn connect(
        url: &str,
        capabilities: Option<Capabilities>,
    ) -> Result<Self, DriverError> {
        let client = ClientBuilder::native()
            .capabilities(capabilities.unwrap_or_default())
            .connect(url)
            .await
            .map_err(|e| DriverError::Other(format!("No WebDriver session at {}: {}", url, e)))?;
        Ok(Self { client })
    }

    /// Ends the WebDriver session; the browser window goes with it.
    pub async fn close(self) -> Result<(), DriverError> {
        self.client
            .close()
            .await
            .map_err(|e| DriverError::Other(format!("Closing session failed: {}", e)))
    }
}

/// Opens one WebDriver session per call.
#[derive(Debug, Clone)]
pub struct WebDriverFactory {
    webdriver_url: String,
    capabilities: Option<Capabilities>,
}

impl WebDriverFactory {
    pub fn new(webdriver_url: impl Into<String>) -> Self {
        Self {
            webdriver_url: webdriver_url.into(),
            capabilities: None,
        }
    }

    pub fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = Some(capabilities);
        self
    }

    /// Capabilities for a headless Chrome or Firefox, whichever the server speaks.
    pub fn headless() -> Capabilities {
        let mut caps = serde_json::Map::new();
        caps.insert(
            "goog:chromeOptions".into(),
            serde_json::json!({ "args": ["--headless=new", "--disable-gpu"] }),
        );
        caps.insert(
            "moz:firefoxOptions".into(),
            serde_json::json!({ "args": ["-headless"] }),
        );
        caps
    }
}

#[async_trait]
impl DriverFactory for WebDriverFactory {
    async fn open(&self) -> Result<Box<dyn Driver>, DriverError> {
        info!("Opening WebDriver session at {}", self.webdriver_url);
        let client = WebDriverClient::connect(&self.webdriver_url, self.capabilities.clone()).await?;
        Ok(Box::new(FantocciniDriver::new(client)))
    }
}
