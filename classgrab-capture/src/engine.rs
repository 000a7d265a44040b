use crate::acquire::acquire;
use crate::inject::ControlInjector;
use crate::persist::{CaptureReport, Classifier, write_artifact};
use crate::ticker::Ticker;
use classgrab_common::{CaptureError, Classification, PROGRESS_TARGET, RunState};
use classgrab_config::{BackendConfig, ClassgrabConfig};
use classgrab_drivers::{BrowserSession, Connector};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{Instrument, debug, info, info_span, warn};
use uuid::Uuid;

/// Everything a run needs, resolved from configuration up front.
#[derive(Debug, Clone)]
pub struct CaptureSettings {
    pub portal_url: String,
    pub artifact: PathBuf,
    pub poll_interval: Duration,
    pub backends: Vec<BackendConfig>,
    pub classifier: Classifier,
    pub trigger_label: String,
    pub trigger_ack_label: String,
}

impl CaptureSettings {
    pub fn from_config(cfg: &ClassgrabConfig) -> Self {
        Self {
            portal_url: cfg.portal.url.to_string(),
            artifact: cfg.capture.artifact.clone(),
            poll_interval: cfg.capture.poll_interval(),
            backends: cfg.backend_preference(),
            classifier: Classifier::new(&cfg.capture.marker, &cfg.capture.title_keyword),
            trigger_label: cfg.capture.trigger_label.clone(),
            trigger_ack_label: cfg.capture.trigger_ack_label.clone(),
        }
    }
}

/// How a run that did not fail ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// The user triggered a capture and the page was written.
    Captured(CaptureReport),
    /// The browser went away before the user triggered a capture.
    BrowserClosed,
}

/// One capture run: `ACQUIRING → NAVIGATING → WAITING → CAPTURING → DONE`,
/// or `ABORTED` from any of them.
///
/// The engine owns the browser session for the whole run. The session is
/// quit explicitly once the page is captured; on abort it is dropped, which
/// tears down whatever driver process it still holds.
pub struct CaptureEngine<C, T> {
    settings: CaptureSettings,
    connector: C,
    ticker: T,
    injector: ControlInjector,
    run_id: Uuid,
    state: RunState,
    history: Vec<RunState>,
}

impl<C: Connector, T: Ticker> CaptureEngine<C, T> {
    pub fn new(settings: CaptureSettings, connector: C, ticker: T) -> Self {
        let injector = ControlInjector::new(&settings.trigger_label, &settings.trigger_ack_label);
        Self {
            settings,
            connector,
            ticker,
            injector,
            run_id: Uuid::new_v4(),
            state: RunState::Acquiring,
            history: vec![RunState::Acquiring],
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// Every state the run has been in, in order.
    pub fn history(&self) -> &[RunState] {
        &self.history
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Drive the run to a terminal state.
    ///
    /// Only a missing browser, a page that vanished mid-capture, and artifact
    /// write failures are errors; a closed browser is a normal outcome.
    pub async fn run(&mut self) -> Result<RunOutcome, CaptureError> {
        let span = info_span!("capture_run", run_id = %self.run_id);
        self.drive().instrument(span).await
    }

    async fn drive(&mut self) -> Result<RunOutcome, CaptureError> {
        info!(target: PROGRESS_TARGET, "Starting a browser...");
        let mut session = match acquire(&self.connector, &self.settings.backends).await {
            Ok(session) => session,
            Err(err) => {
                self.transition(RunState::Aborted);
                return Err(err);
            }
        };

        self.transition(RunState::Navigating);
        if let Err(err) = session.navigate(&self.settings.portal_url).await {
            warn!(
                target: "classgrab::run",
                url = %self.settings.portal_url,
                error = %format!("{err:#}"),
                "navigation failed; waiting anyway"
            );
            info!(
                target: PROGRESS_TARGET,
                "Could not open {} automatically ({err}); continue in the browser window.",
                self.settings.portal_url
            );
        }
        print_guidance();

        self.transition(RunState::Waiting);
        if !self.wait_for_signal(session.as_mut()).await {
            info!(target: PROGRESS_TARGET, "Browser closed.");
            self.transition(RunState::Aborted);
            return Ok(RunOutcome::BrowserClosed);
        }

        info!(target: PROGRESS_TARGET, "Capture signal received, reading the page...");
        self.transition(RunState::Capturing);
        let report = match self.capture(session.as_mut()).await {
            Ok(report) => report,
            Err(err) => {
                if let Err(quit_err) = session.quit().await {
                    debug!(target: "classgrab::run", error = %quit_err, "quit after failed capture");
                }
                self.transition(RunState::Aborted);
                return Err(err);
            }
        };

        match report.classification {
            Classification::Confirmed => info!(
                target: PROGRESS_TARGET,
                "Timetable saved to {}.",
                report.path.display()
            ),
            Classification::Uncertain => info!(
                target: PROGRESS_TARGET,
                "This may not be the timetable page; the source was saved to {} anyway.",
                report.path.display()
            ),
        }

        info!(target: PROGRESS_TARGET, "Capture complete, closing the browser...");
        if let Err(err) = session.quit().await {
            warn!(target: "classgrab::run", error = %format!("{err:#}"), "browser did not close cleanly");
        }
        self.transition(RunState::Done);
        Ok(RunOutcome::Captured(report))
    }

    /// Poll until the control is clicked (`true`) or the browser is gone (`false`).
    async fn wait_for_signal(&self, session: &mut dyn BrowserSession) -> bool {
        let mut ticks: u64 = 0;
        loop {
            match session.window_count().await {
                Ok(0) => {
                    debug!(target: "classgrab::run", ticks, "no windows left");
                    return false;
                }
                Err(err) => {
                    debug!(target: "classgrab::run", ticks, error = %err, "liveness probe failed");
                    return false;
                }
                Ok(_) => {}
            }

            self.injector.inject(session).await;

            if self.injector.signalled(session).await {
                debug!(target: "classgrab::run", ticks, "capture signal observed");
                return true;
            }

            ticks += 1;
            self.ticker.sleep(self.settings.poll_interval).await;
        }
    }

    async fn capture(&self, session: &mut dyn BrowserSession) -> Result<CaptureReport, CaptureError> {
        let content = session
            .source()
            .await
            .map_err(|err| CaptureError::PageUnavailable(format!("{err:#}")))?;
        let title = session.title().await.unwrap_or_else(|err| {
            debug!(target: "classgrab::run", error = %err, "title unavailable");
            String::new()
        });
        if let Ok(url) = session.current_url().await {
            debug!(target: "classgrab::run", %url, "capturing page");
        }

        let classification = self.settings.classifier.classify(&content, &title);
        write_artifact(&self.settings.artifact, &content).await?;

        info!(
            target: "classgrab::run",
            path = %self.settings.artifact.display(),
            bytes = content.len(),
            ?classification,
            %title,
            "artifact written"
        );

        Ok(CaptureReport {
            path: self.settings.artifact.clone(),
            classification,
            title,
            bytes: content.len(),
        })
    }

    fn transition(&mut self, next: RunState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "illegal transition {} -> {}",
            self.state,
            next
        );
        info!(target: "classgrab::run", from = %self.state, to = %next, "state transition");
        self.state = next;
        self.history.push(next);
    }
}

fn print_guidance() {
    let rule = "=".repeat(60);
    info!(target: PROGRESS_TARGET, "{rule}");
    info!(target: PROGRESS_TARGET, "1. Log in manually in the browser window that just opened.");
    info!(
        target: PROGRESS_TARGET,
        "2. Open your timetable, then click the blue capture button in the top-left corner."
    );
    info!(target: PROGRESS_TARGET, "3. The page is saved as soon as the click is detected.");
    info!(target: PROGRESS_TARGET, "{rule}");
}
