//! Loader for classgrab configuration with YAML + environment overlays.
//!
//! Sources are merged in this order, later ones winning:
//!
//! 1. built-in defaults (every field has one, so no file is required)
//! 2. an optional YAML/TOML/JSON file (format inferred from the suffix)
//! 3. inline YAML snippets (tests, CLI)
//! 4. `CLASSGRAB__SECTION__KEY` environment variables
//!
//! String values may reference other environment variables as `${VAR}`; they
//! are expanded after merging.
use classgrab_common::BackendKind;
use classgrab_common::observability::LogFormat;
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

const MAXIMUM_ENV_EXPANSION_DEPTH: usize = 8;

/// File name looked up in the working directory when no `--config` is given.
pub const LOCAL_CONFIG_FILE: &str = "classgrab.yaml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassgrabConfig {
    pub version: Option<String>,
    pub portal: PortalConfig,
    pub capture: CaptureConfig,
    pub backends: Vec<BackendConfig>,
    pub converter: ConverterConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PortalConfig {
    /// Login page the browser is sent to.
    pub url: Url,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            url: Url::parse("https://jwxt.neu.edu.cn").expect("static url"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Where the captured page is written, relative to the working directory.
    pub artifact: PathBuf,
    pub poll_interval_ms: u64,
    /// Structural marker present in the timetable view markup.
    pub marker: String,
    /// Keyword expected in the timetable page title.
    pub title_keyword: String,
    pub trigger_label: String,
    pub trigger_ack_label: String,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            artifact: PathBuf::from("exp.html"),
            poll_interval_ms: 1000,
            marker: "kbappTimetableDayColumn".into(),
            title_keyword: "课表".into(),
            trigger_label: "点击抓取课表数据".into(),
            trigger_ack_label: "正在抓取...".into(),
        }
    }
}

impl CaptureConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// One entry of the browser preference list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    pub kind: BackendKind,
    /// WebDriver server executable; defaults per backend kind.
    #[serde(default)]
    pub driver: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
    /// Connect to an already-running WebDriver server instead of spawning one.
    #[serde(default)]
    pub webdriver_url: Option<Url>,
    /// Browser executable override passed through capabilities.
    #[serde(default)]
    pub binary: Option<PathBuf>,
    /// Suppress native driver/browser log noise.
    #[serde(default = "default_true")]
    pub quiet: bool,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_startup_timeout_ms")]
    pub startup_timeout_ms: u64,
}

impl BackendConfig {
    pub fn new(kind: BackendKind) -> Self {
        Self {
            kind,
            driver: None,
            port: None,
            webdriver_url: None,
            binary: None,
            quiet: true,
            enabled: true,
            startup_timeout_ms: default_startup_timeout_ms(),
        }
    }

    pub fn driver(&self) -> &str {
        self.driver
            .as_deref()
            .unwrap_or_else(|| self.kind.default_driver())
    }

    pub fn port(&self) -> u16 {
        self.port.unwrap_or_else(|| self.kind.default_port())
    }

    pub fn startup_timeout(&self) -> Duration {
        Duration::from_millis(self.startup_timeout_ms)
    }
}

/// The external timetable-to-calendar program.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConverterConfig {
    pub program: String,
    /// Directories searched, relative to the launcher, before falling back to `PATH`.
    pub search_dirs: Vec<PathBuf>,
    /// Calendar file the converter emits in the working directory.
    pub calendar: PathBuf,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            program: "NeuCourseTabel".into(),
            search_dirs: vec![
                PathBuf::from("."),
                PathBuf::from("../build/bin"),
                PathBuf::from("bin"),
            ],
            calendar: PathBuf::from("schedule.ics"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub dir: Option<PathBuf>,
    pub format: LogFormat,
    pub filter: String,
    pub stderr: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: None,
            format: LogFormat::Text,
            filter: "info".into(),
            stderr: false,
        }
    }
}

fn default_true() -> bool {
    true
}
fn default_startup_timeout_ms() -> u64 {
    5_000
}

impl ClassgrabConfig {
    /// Backends to try, in order. An absent list means the default preference.
    pub fn backend_preference(&self) -> Vec<BackendConfig> {
        if self.backends.is_empty() {
            return BackendKind::PREFERENCE
                .into_iter()
                .map(BackendConfig::new)
                .collect();
        }
        self.backends.clone()
    }

    /// Reject values the capture run cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !matches!(self.portal.url.scheme(), "http" | "https") {
            return Err(ConfigError::Message(format!(
                "portal.url must be http(s), got {}",
                self.portal.url
            )));
        }
        if self.capture.poll_interval_ms == 0 {
            return Err(ConfigError::Message(
                "capture.poll_interval_ms must be greater than zero".into(),
            ));
        }
        if self.capture.artifact.as_os_str().is_empty() {
            return Err(ConfigError::Message("capture.artifact must not be empty".into()));
        }
        if self.converter.program.trim().is_empty() {
            return Err(ConfigError::Message("converter.program must not be empty".into()));
        }
        Ok(())
    }

    /// Render the effective configuration as YAML.
    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        serde_yaml::to_string(self).map_err(|e| ConfigError::Message(e.to_string()))
    }
}

fn expand_env_in_value(v: &mut Value) {
    match v {
        Value::String(s) => {
            if s.contains('$') {
                let mut cur = std::mem::take(s);
                for _ in 0..MAXIMUM_ENV_EXPANSION_DEPTH {
                    let expanded = match shellexpand::env(&cur) {
                        Ok(cow) => cow.into_owned(),
                        Err(_) => cur.clone(),
                    };
                    if expanded == cur {
                        break;
                    }
                    cur = expanded;
                }
                *s = cur;
            }
        }
        Value::Array(arr) => arr.iter_mut().for_each(expand_env_in_value),
        Value::Object(obj) => obj.values_mut().for_each(expand_env_in_value),
        _ => {}
    }
}

/// Candidate config files when none is given explicitly, most specific first.
pub fn default_config_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from(LOCAL_CONFIG_FILE)];
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join("classgrab").join("config.yaml"));
    }
    paths
}

/// Builder hides the `config` crate wiring (YAML + env overrides).
pub struct ClassgrabConfigLoader {
    builder: config::ConfigBuilder<config::builder::DefaultState>,
    env_prefix: String,
}

impl Default for ClassgrabConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ClassgrabConfigLoader {
    /// Start with built-in defaults and `CLASSGRAB__` env overrides.
    ///
    /// ```
    /// use classgrab_config::ClassgrabConfigLoader;
    ///
    /// let config = ClassgrabConfigLoader::new()
    ///     .with_yaml_str("version: '1'")
    ///     .load()
    ///     .expect("valid config");
    ///
    /// assert_eq!(config.version.as_deref(), Some("1"));
    /// assert_eq!(config.capture.poll_interval_ms, 1000);
    /// assert_eq!(config.backend_preference().len(), 3);
    /// ```
    pub fn new() -> Self {
        Self::with_env_prefix("CLASSGRAB")
    }

    /// Same as [`new`](Self::new) but reading `<PREFIX>__…` variables.
    pub fn with_env_prefix(prefix: &str) -> Self {
        Self {
            builder: Config::builder(),
            env_prefix: prefix.to_string(),
        }
    }

    /// Attach a required file; the `config` crate infers format by suffix.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(true));
        self
    }

    /// Attach a file that is silently skipped when missing.
    pub fn with_optional_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(false));
        self
    }

    /// Use `explicit` when given, otherwise the first existing default location.
    pub fn discover(self, explicit: Option<&Path>) -> Self {
        match explicit {
            Some(path) => self.with_file(path),
            None => match default_config_paths().into_iter().find(|p| p.exists()) {
                Some(found) => self.with_optional_file(found),
                None => self,
            },
        }
    }

    /// Allow tests/CLI to merge inline YAML snippets.
    ///
    /// ```
    /// use classgrab_common::BackendKind;
    /// use classgrab_config::ClassgrabConfigLoader;
    ///
    /// let cfg = ClassgrabConfigLoader::new()
    ///     .with_yaml_str(
    ///         r#"
    /// backends:
    ///   - kind: firefox
    ///     port: 4455
    ///   - kind: chrome
    ///     quiet: false
    /// "#,
    ///     )
    ///     .load()
    ///     .unwrap();
    ///
    /// let prefs = cfg.backend_preference();
    /// assert_eq!(prefs[0].kind, BackendKind::Firefox);
    /// assert_eq!(prefs[0].port(), 4455);
    /// assert_eq!(prefs[1].driver(), "chromedriver");
    /// assert!(!prefs[1].quiet);
    /// ```
    pub fn with_yaml_str(mut self, yaml: &str) -> Self {
        self.builder = self
            .builder
            .add_source(File::from_str(yaml, config::FileFormat::Yaml));
        self
    }

    /// Consume the builder and deserialize the merged sources into strongly typed config.
    ///
    /// Environment variables are layered last so they override files, then
    /// `${VAR}` placeholders are expanded and the result is validated.
    ///
    /// ```
    /// use classgrab_config::ClassgrabConfigLoader;
    ///
    /// unsafe { std::env::set_var("PORTAL_HOST", "portal.example.edu"); }
    ///
    /// let config = ClassgrabConfigLoader::new()
    ///     .with_yaml_str(r#"
    /// portal:
    ///   url: "https://${PORTAL_HOST}/login"
    /// "#)
    ///     .load()
    ///     .expect("valid configuration");
    ///
    /// assert_eq!(config.portal.url.as_str(), "https://portal.example.edu/login");
    ///
    /// unsafe { std::env::remove_var("PORTAL_HOST"); }
    /// ```
    pub fn load(self) -> Result<ClassgrabConfig, ConfigError> {
        let cfg = self
            .builder
            .add_source(Environment::with_prefix(&self.env_prefix).separator("__"))
            .build()?;

        // Expand on an untyped tree, then let `config` coerce env strings.
        let mut v: Value = cfg.try_deserialize()?;
        expand_env_in_value(&mut v);

        let typed: ClassgrabConfig = Config::try_from(&v)?.try_deserialize()?;
        typed.validate()?;

        Ok(typed)
    }
}
