use crate::driver::DriverError;
use crate::session::Session;
use async_trait::async_trait;
use std::time::Duration;
use tokio::time::Instant;
use tracing::warn;

pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(1000);
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(30000);

/// Polling parameters shared by every wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitSettings {
    pub interval: Duration,
    pub timeout: Duration,
}

impl Default for WaitSettings {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Something the runner waits for after loading a page or performing an action.
#[async_trait]
pub trait WaitCondition: Send + Sync {
    fn name(&self) -> &str;

    async fn reset(&mut self, _session: &mut Session) -> Result<(), DriverError> {
        Ok(())
    }

    async fn can_continue(&mut self, session: &mut Session) -> Result<bool, DriverError>;
}

/// Waits a fixed amount of time after reset.
pub struct TimedCondition {
    duration: Duration,
    started: Instant,
}

impl TimedCondition {
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            started: Instant::now(),
        }
    }
}

#[async_trait]
impl WaitCondition for TimedCondition {
    fn name(&self) -> &str {
        "timed"
    }

    async fn reset(&mut self, _session: &mut Session) -> Result<(), DriverError> {
        self.started = Instant::now();
        Ok(())
    }

    async fn can_continue(&mut self, _session: &mut Session) -> Result<bool, DriverError> {
        Ok(self.started.elapsed() >= self.duration)
    }
}

/// Waits until every request the page issued has received a response.
#[derive(Default)]
pub struct RequestResponseCondition;

impl RequestResponseCondition {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl WaitCondition for RequestResponseCondition {
    fn name(&self) -> &str {
        "request_response"
    }

    async fn can_continue(&mut self, session: &mut Session) -> Result<bool, DriverError> {
        let activity = session.driver().network_activity().await?;
        Ok(activity.responses >= activity.requests)
    }
}

/// Waits until a script expression evaluates truthy.
pub struct ScriptCondition {
    expression: String,
}

impl ScriptCondition {
    pub fn new(expression: impl Into<String>) -> Self {
        Self {
            expression: expression.into(),
        }
    }
}

#[async_trait]
impl WaitCondition for ScriptCondition {
    fn name(&self) -> &str {
        "script"
    }

    async fn can_continue(&mut self, session: &mut Session) -> Result<bool, DriverError> {
        let script = format!("return !!({});", self.expression);
        let value = session.driver().evaluate_script(&script, Vec::new()).await?;
        Ok(value.as_bool().unwrap_or(false))
    }
}

/// Resets every condition, then polls until all of them allow continuing.
///
/// A timeout is not an error: it is logged and the run carries on.
pub async fn wait_on_conditions(
    session: &mut Session,
    conditions: &mut [Box<dyn WaitCondition>],
    settings: WaitSettings,
) -> Result<(), DriverError> {
    if conditions.is_empty() {
        return Ok(());
    }
    for condition in conditions.iter_mut() {
        condition.reset(session).await?;
    }
    let started = Instant::now();
    loop {
        let mut ready = true;
        for condition in conditions.iter_mut() {
            if !condition.can_continue(session).await? {
                ready = false;
                break;
            }
        }
        if ready {
            return Ok(());
        }
        if started.elapsed() >= settings.timeout {
            let names: Vec<&str> = conditions.iter().map(|c| c.name()).collect();
            warn!(
                "Wait conditions {:?} not met after {}ms, continuing",
                names,
                settings.timeout.as_millis()
            );
            return Ok(());
        }
        tokio::time::sleep(settings.interval).await;
    }
}
