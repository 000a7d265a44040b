use classgrab_common::{BackendFailure, CaptureError};
use classgrab_config::BackendConfig;
use classgrab_drivers::{BrowserSession, Connector};
use tracing::{debug, info};

/// Open a session on the first backend in `preference` that starts.
///
/// Individual failures are only logged; if every enabled backend fails they
/// are collapsed into one [`CaptureError::DriverUnavailable`]. Disabled
/// entries are skipped without counting as attempts.
pub async fn acquire(
    connector: &dyn Connector,
    preference: &[BackendConfig],
) -> Result<Box<dyn BrowserSession>, CaptureError> {
    let mut attempts = Vec::new();

    for backend in preference.iter().filter(|b| b.enabled) {
        match connector.connect(backend).await {
            Ok(session) => {
                info!(target: "classgrab::acquire", backend = %backend.kind, "browser session opened");
                return Ok(session);
            }
            Err(err) => {
                debug!(
                    target: "classgrab::acquire",
                    backend = %backend.kind,
                    error = %format!("{err:#}"),
                    "backend unavailable; trying next"
                );
                attempts.push(BackendFailure {
                    backend: backend.kind.to_string(),
                    reason: format!("{err:#}"),
                });
            }
        }
    }

    Err(CaptureError::DriverUnavailable { attempts })
}
