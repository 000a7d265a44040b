use classgrab_common::BackendKind;
use classgrab_config::BackendConfig;
use serde_json::{json, Map, Value};
use webdriver::capabilities::Capabilities;

/// `goto` answers once navigation has started, not when the document completes.
pub const PAGE_LOAD_STRATEGY: &str = "none";

/// Capability key carrying vendor options for `kind`.
pub fn options_key(kind: BackendKind) -> &'static str {
    match kind {
        BackendKind::Edge => "ms:edgeOptions",
        BackendKind::Chrome => "goog:chromeOptions",
        BackendKind::Firefox => "moz:firefoxOptions",
    }
}

/// W3C `browserName` for `kind`.
pub fn browser_name(kind: BackendKind) -> &'static str {
    match kind {
        BackendKind::Edge => "MicrosoftEdge",
        BackendKind::Chrome => "chrome",
        BackendKind::Firefox => "firefox",
    }
}

/// Construct session capabilities for one backend.
///
/// The browser always runs with a visible window; a person has to log in.
/// `quiet` only trims native log output.
pub fn build_capabilities(backend: &BackendConfig) -> Capabilities {
    let mut caps = Capabilities::new();
    let mut opts = Map::new();

    if backend.kind.is_chromium() {
        if backend.quiet {
            opts.insert("excludeSwitches".into(), json!(["enable-logging"]));
        }
    } else if backend.quiet {
        opts.insert("log".into(), json!({ "level": "fatal" }));
    }

    if let Some(binary) = &backend.binary {
        opts.insert("binary".into(), json!(binary.to_string_lossy()));
    }

    caps.insert("browserName".into(), json!(browser_name(backend.kind)));
    caps.insert("pageLoadStrategy".into(), json!(PAGE_LOAD_STRATEGY));
    caps.insert(options_key(backend.kind).into(), Value::Object(opts));
    caps
}

/// Command-line arguments for the WebDriver server process.
pub fn driver_arguments(backend: &BackendConfig) -> Vec<String> {
    let port = backend.port();
    match backend.kind {
        BackendKind::Edge | BackendKind::Chrome => {
            let mut args = vec![format!("--port={port}")];
            if backend.quiet {
                args.push("--silent".into());
            }
            args
        }
        BackendKind::Firefox => {
            let mut args = vec!["--port".into(), port.to_string()];
            if backend.quiet {
                args.push("--log".into());
                args.push("fatal".into());
            }
            args
        }
    }
}
