//! The seam between the capture engine and a concrete browser.
//!
//! Every call blocks the run until the remote end answers; WebDriver's own
//! timeouts apply and surface as ordinary errors.
use crate::browser::driver::ClassgrabDriver;
use anyhow::Result;
use async_trait::async_trait;
use classgrab_common::BackendKind;
use classgrab_config::BackendConfig;
use serde_json::Value;

/// One controllable browser instance, exclusively owned by a capture run.
#[async_trait]
pub trait BrowserSession: Send {
    /// Backend this session was opened on.
    fn backend(&self) -> BackendKind;

    async fn navigate(&mut self, url: &str) -> Result<()>;

    /// Liveness probe: number of open windows. An error means the browser is gone.
    async fn window_count(&mut self) -> Result<usize>;

    /// Evaluate `script` in the current document.
    async fn execute(&mut self, script: &str) -> Result<Value>;

    async fn source(&mut self) -> Result<String>;

    async fn title(&mut self) -> Result<String>;

    async fn current_url(&mut self) -> Result<String>;

    /// Close the browser and release everything the session holds.
    async fn quit(self: Box<Self>) -> Result<()>;
}

/// Instantiates sessions for configured backends.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, backend: &BackendConfig) -> Result<Box<dyn BrowserSession>>;
}

/// Production connector backed by real WebDriver servers.
#[derive(Debug, Default, Clone, Copy)]
pub struct WebDriverConnector;

#[async_trait]
impl Connector for WebDriverConnector {
    async fn connect(&self, backend: &BackendConfig) -> Result<Box<dyn BrowserSession>> {
        let driver = ClassgrabDriver::connect(backend).await?;
        Ok(Box::new(driver))
    }
}

#[async_trait]
impl BrowserSession for ClassgrabDriver {
    fn backend(&self) -> BackendKind {
        self.kind
    }

    async fn navigate(&mut self, url: &str) -> Result<()> {
        self.goto(url).await
    }

    async fn window_count(&mut self) -> Result<usize> {
        ClassgrabDriver::window_count(self).await
    }

    async fn execute(&mut self, script: &str) -> Result<Value> {
        ClassgrabDriver::execute(self, script).await
    }

    async fn source(&mut self) -> Result<String> {
        self.get_content().await
    }

    async fn title(&mut self) -> Result<String> {
        self.get_title().await
    }

    async fn current_url(&mut self) -> Result<String> {
        self.get_url().await
    }

    async fn quit(self: Box<Self>) -> Result<()> {
        self.close().await
    }
}
