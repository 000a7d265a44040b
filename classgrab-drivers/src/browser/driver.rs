use crate::browser::backend::{build_capabilities, driver_arguments};
use anyhow::{anyhow, bail, Context, Result};
use classgrab_common::BackendKind;
use classgrab_config::BackendConfig;
use fantoccini::{Client, ClientBuilder};
use std::process::Stdio;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::process::{Child, Command};
use tokio::time::{sleep, Instant};
use tracing::debug;
use url::Url;

const READINESS_PROBE_INTERVAL: Duration = Duration::from_millis(100);

/// A live WebDriver session plus the driver server it was opened against.
///
/// When this crate spawned the server, the child process is killed on drop,
/// so the browser is released on every exit path even if [`close`](Self::close)
/// is never reached.
pub struct ClassgrabDriver {
    pub client: Client,
    pub kind: BackendKind,
    driver_process: Option<Child>,
}

impl ClassgrabDriver {
    /// Open a session for `backend`.
    ///
    /// With `webdriver_url` set the existing server is used as-is; otherwise
    /// the backend's driver executable is spawned on its port and polled until
    /// it accepts connections.
    pub async fn connect(backend: &BackendConfig) -> Result<Self> {
        let (endpoint, driver_process) = match &backend.webdriver_url {
            Some(url) => (url.clone(), None),
            None => {
                let mut child = spawn_driver(backend)?;
                wait_until_listening(backend, &mut child).await?;
                let url = Url::parse(&format!("http://127.0.0.1:{}", backend.port()))?;
                (url, Some(child))
            }
        };

        debug!(
            target: "browser.driver",
            backend = %backend.kind,
            %endpoint,
            "opening webdriver session"
        );

        let client = ClientBuilder::native()
            .capabilities(build_capabilities(backend))
            .connect(endpoint.as_str())
            .await
            .with_context(|| format!("{} refused a new session", backend.driver()))?;

        Ok(Self {
            client,
            kind: backend.kind,
            driver_process,
        })
    }

    /// Close the browser session, then stop the driver server.
    pub async fn close(self) -> Result<()> {
        let Self {
            client,
            driver_process,
            ..
        } = self;
        let closed = client.close().await;
        if let Some(mut child) = driver_process {
            let _ = child.kill().await;
        }
        closed.map_err(anyhow::Error::from)
    }
}

fn spawn_driver(backend: &BackendConfig) -> Result<Child> {
    let mut cmd = Command::new(backend.driver());
    cmd.args(driver_arguments(backend))
        .stdin(Stdio::null())
        .kill_on_drop(true);
    if backend.quiet {
        cmd.stdout(Stdio::null()).stderr(Stdio::null());
    }
    cmd.spawn()
        .with_context(|| format!("failed to launch {}", backend.driver()))
}

async fn wait_until_listening(backend: &BackendConfig, child: &mut Child) -> Result<()> {
    let deadline = Instant::now() + backend.startup_timeout();
    let addr = ("127.0.0.1", backend.port());

    loop {
        if TcpStream::connect(addr).await.is_ok() {
            return Ok(());
        }
        if let Some(status) = child.try_wait()? {
            bail!("{} exited during startup ({status})", backend.driver());
        }
        if Instant::now() >= deadline {
            return Err(anyhow!(
                "{} did not listen on port {} within {:?}",
                backend.driver(),
                backend.port(),
                backend.startup_timeout()
            ));
        }
        sleep(READINESS_PROBE_INTERVAL).await;
    }
}
