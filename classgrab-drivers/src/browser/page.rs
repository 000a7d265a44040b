use crate::browser::driver::ClassgrabDriver;
use anyhow::Result;
use serde_json::Value;

impl ClassgrabDriver {
    /// Navigate the current window to `url`.
    pub async fn goto(&self, url: &str) -> Result<()> {
        self.client.goto(url).await.map_err(anyhow::Error::from)
    }

    /// Return the number of open top-level windows.
    ///
    /// Errors once the browser has been closed from outside.
    pub async fn window_count(&self) -> Result<usize> {
        let handles = self.client.windows().await?;
        Ok(handles.len())
    }

    /// Run `script` in the current document and return its result.
    pub async fn execute(&self, script: &str) -> Result<Value> {
        self.client
            .execute(script, vec![])
            .await
            .map_err(anyhow::Error::from)
    }

    /// Return the full page HTML source.
    pub async fn get_content(&self) -> Result<String> {
        self.client.source().await.map_err(anyhow::Error::msg)
    }

    /// Return the page title.
    pub async fn get_title(&self) -> Result<String> {
        self.client.title().await.map_err(anyhow::Error::msg)
    }

    /// Return the current page URL.
    pub async fn get_url(&self) -> Result<String> {
        self.client
            .current_url()
            .await
            .map(|url| url.to_string())
            .map_err(anyhow::Error::msg)
    }
}
