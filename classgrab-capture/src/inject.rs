use classgrab_drivers::BrowserSession;
use classgrab_drivers::browser::trigger::TriggerScripts;
use serde_json::Value;
use tracing::trace;

/// Keeps the capture control present and reads its signal.
///
/// Both operations are best-effort: a page mid-navigation routinely rejects
/// scripts, and the next poll simply tries again.
#[derive(Debug, Clone)]
pub struct ControlInjector {
    scripts: TriggerScripts,
}

impl ControlInjector {
    pub fn new(label: &str, ack_label: &str) -> Self {
        Self {
            scripts: TriggerScripts::new(label, ack_label),
        }
    }

    /// Ensure exactly one control exists in the current document.
    pub async fn inject(&self, session: &mut dyn BrowserSession) {
        match session.execute(self.scripts.inject()).await {
            Ok(result) => trace!(target: "classgrab::inject", ?result, "inject"),
            Err(err) => trace!(target: "classgrab::inject", error = %err, "inject skipped"),
        }
    }

    /// Whether the user has clicked the control in the current page.
    ///
    /// Read failures and non-boolean results count as "not yet".
    pub async fn signalled(&self, session: &mut dyn BrowserSession) -> bool {
        match session.execute(self.scripts.read_signal()).await {
            Ok(Value::Bool(flag)) => flag,
            Ok(_) => false,
            Err(err) => {
                trace!(target: "classgrab::inject", error = %err, "signal read failed");
                false
            }
        }
    }
}
