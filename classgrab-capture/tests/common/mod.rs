#![allow(dead_code)]

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use classgrab_capture::Ticker;
use classgrab_common::BackendKind;
use classgrab_common::observability::{LogConfig, init_logging};
use classgrab_config::BackendConfig;
use classgrab_drivers::browser::trigger::{
    INJECT_CREATED, INJECT_PRESENT, SIGNAL_VARIABLE, TRIGGER_ELEMENT_ID,
};
use classgrab_drivers::{BrowserSession, Connector};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;

static INIT_PATH: OnceLock<std::path::PathBuf> = OnceLock::new();

pub fn init_test_tracing() {
    let _ = INIT_PATH.get_or_init(|| {
        let config = LogConfig {
            app_name: "classgrab-tests",
            log_dir: Some(std::env::temp_dir().join("classgrab-tests")),
            progress: false,
            default_filter: "debug".to_string(),
            ..LogConfig::default()
        };
        init_logging(config)
            .ok()
            .and_then(|init| init.log_file)
            .unwrap_or_default()
    });
}

/// Scripted browser state shared between a fake session and the test.
#[derive(Debug, Default)]
pub struct FakeBrowser {
    /// Liveness probes that succeed before the window disappears.
    pub closes_after_probes: Option<u32>,
    /// Probe number on which the user clicks the control.
    pub click_on_probe: Option<u32>,
    /// Inject attempts that fail before the page accepts scripts.
    pub failing_injections: u32,
    pub navigate_fails: bool,
    pub source_fails: bool,
    pub source: String,
    pub title: String,

    pub probes: u32,
    pub controls: usize,
    pub signal: bool,
    pub inject_calls: u32,
    pub navigated_to: Option<String>,
    pub quit_called: bool,
}

impl FakeBrowser {
    pub fn shared(self) -> Arc<Mutex<FakeBrowser>> {
        Arc::new(Mutex::new(self))
    }

    /// Simulate a navigation: a fresh document has no control and no flag.
    pub fn reload(&mut self) {
        self.controls = 0;
        self.signal = false;
    }
}

pub struct FakeSession {
    pub kind: BackendKind,
    pub browser: Arc<Mutex<FakeBrowser>>,
}

#[async_trait]
impl BrowserSession for FakeSession {
    fn backend(&self) -> BackendKind {
        self.kind
    }

    async fn navigate(&mut self, url: &str) -> Result<()> {
        let mut b = self.browser.lock().unwrap();
        if b.navigate_fails {
            return Err(anyhow!("net::ERR_NAME_NOT_RESOLVED"));
        }
        b.reload();
        b.navigated_to = Some(url.to_string());
        Ok(())
    }

    async fn window_count(&mut self) -> Result<usize> {
        let mut b = self.browser.lock().unwrap();
        b.probes += 1;
        if let Some(limit) = b.closes_after_probes {
            if b.probes > limit {
                return Err(anyhow!("no such window: target window already closed"));
            }
        }
        if b.click_on_probe == Some(b.probes) && b.controls > 0 {
            b.signal = true;
        }
        Ok(1)
    }

    async fn execute(&mut self, script: &str) -> Result<Value> {
        let mut b = self.browser.lock().unwrap();
        if script.contains("createElement") && script.contains(TRIGGER_ELEMENT_ID) {
            b.inject_calls += 1;
            if b.failing_injections > 0 {
                b.failing_injections -= 1;
                return Err(anyhow!("javascript error: document unloaded while waiting for result"));
            }
            if b.controls == 0 {
                b.controls = 1;
                return Ok(Value::from(INJECT_CREATED));
            }
            return Ok(Value::from(INJECT_PRESENT));
        }
        if script.contains(SIGNAL_VARIABLE) {
            return Ok(Value::Bool(b.signal));
        }
        Err(anyhow!("unexpected script"))
    }

    async fn source(&mut self) -> Result<String> {
        let b = self.browser.lock().unwrap();
        if b.source_fails {
            return Err(anyhow!("invalid session id"));
        }
        Ok(b.source.clone())
    }

    async fn title(&mut self) -> Result<String> {
        Ok(self.browser.lock().unwrap().title.clone())
    }

    async fn current_url(&mut self) -> Result<String> {
        let b = self.browser.lock().unwrap();
        Ok(b.navigated_to.clone().unwrap_or_else(|| "about:blank".into()))
    }

    async fn quit(self: Box<Self>) -> Result<()> {
        self.browser.lock().unwrap().quit_called = true;
        Ok(())
    }
}

/// Connector whose backends are either a scripted browser or unavailable.
#[derive(Clone, Default)]
pub struct FakeConnector {
    pub available: HashMap<BackendKind, Arc<Mutex<FakeBrowser>>>,
    pub attempts: Arc<Mutex<Vec<BackendKind>>>,
}

impl FakeConnector {
    pub fn with(mut self, kind: BackendKind, browser: Arc<Mutex<FakeBrowser>>) -> Self {
        self.available.insert(kind, browser);
        self
    }

    pub fn attempts(&self) -> Vec<BackendKind> {
        self.attempts.lock().unwrap().clone()
    }
}

#[async_trait]
impl Connector for FakeConnector {
    async fn connect(&self, backend: &BackendConfig) -> Result<Box<dyn BrowserSession>> {
        self.attempts.lock().unwrap().push(backend.kind);
        match self.available.get(&backend.kind) {
            Some(browser) => Ok(Box::new(FakeSession {
                kind: backend.kind,
                browser: browser.clone(),
            })),
            None => Err(anyhow!("failed to launch {}", backend.driver())),
        }
    }
}

/// Ticker that returns immediately and counts sleeps.
#[derive(Clone, Default)]
pub struct CountingTicker {
    pub sleeps: Arc<AtomicU64>,
}

impl CountingTicker {
    pub fn count(&self) -> u64 {
        self.sleeps.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Ticker for CountingTicker {
    async fn sleep(&self, _interval: Duration) {
        self.sleeps.fetch_add(1, Ordering::SeqCst);
    }
}

pub fn timetable_page() -> String {
    r#"<html><head><title>我的课表</title></head><body><div class="kbappTimetableDayColumn">高等数学</div></body></html>"#
        .to_string()
}

pub fn login_page() -> String {
    "<html><head><title>统一身份认证</title></head><body><form id=\"login\"></form></body></html>"
        .to_string()
}
