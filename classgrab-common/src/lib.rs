//! Common types and utilities shared across classgrab crates.
//!
//! This crate defines the run state machine positions, the capture
//! classification, observability helpers, and the shared error type used
//! throughout the classgrab workspace. It is intentionally lightweight so that
//! every crate can depend on it without introducing heavy transitive costs.
//!
//! # Overview
//!
//! - [`RunState`]: position of a capture run in its state machine
//! - [`BackendKind`]: browser backends in fallback order
//! - [`Classification`]: advisory verdict on captured content
//! - [`observability`]: Centralised tracing/logging initialisation
//! - [`CaptureError`] and [`Result`]: Shared error handling
//!
//! # Examples
//!
//! ```rust
//! use classgrab_common::RunState;
//!
//! assert!(RunState::Done.is_terminal());
//! assert!(RunState::Aborted.is_terminal());
//! assert!(!RunState::Waiting.is_terminal());
//! ```
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub mod observability;

/// Tracing target for human-readable progress lines printed to stdout.
pub const PROGRESS_TARGET: &str = "progress";

/// Position of a capture run in its state machine.
///
/// `Acquiring → Navigating → Waiting → Capturing → Done`, with `Aborted`
/// reachable from any non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Acquiring,
    Navigating,
    Waiting,
    Capturing,
    Done,
    Aborted,
}

impl RunState {
    /// `Done` and `Aborted` absorb; nothing leaves them.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Aborted)
    }

    /// Whether `self → next` is an edge of the run state machine.
    pub fn can_transition_to(self, next: RunState) -> bool {
        use RunState::*;
        match (self, next) {
            (Done | Aborted, _) => false,
            (_, Aborted) => true,
            (Acquiring, Navigating)
            | (Navigating, Waiting)
            | (Waiting, Capturing)
            | (Capturing, Done) => true,
            _ => false,
        }
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Acquiring => "ACQUIRING",
            Self::Navigating => "NAVIGATING",
            Self::Waiting => "WAITING",
            Self::Capturing => "CAPTURING",
            Self::Done => "DONE",
            Self::Aborted => "ABORTED",
        };
        f.write_str(s)
    }
}

/// Browser remote-control implementations, in default preference order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Edge,
    Chrome,
    Firefox,
}

impl BackendKind {
    /// Default fallback order: Edge, then Chrome, then Firefox.
    pub const PREFERENCE: [BackendKind; 3] = [Self::Edge, Self::Chrome, Self::Firefox];

    /// WebDriver server executable for this backend.
    pub fn default_driver(self) -> &'static str {
        match self {
            Self::Edge => "msedgedriver",
            Self::Chrome => "chromedriver",
            Self::Firefox => "geckodriver",
        }
    }

    /// Port the spawned WebDriver server listens on.
    pub fn default_port(self) -> u16 {
        match self {
            Self::Edge => 9516,
            Self::Chrome => 9515,
            Self::Firefox => 4444,
        }
    }

    /// Whether the backend speaks Chromium's capability dialect.
    pub fn is_chromium(self) -> bool {
        matches!(self, Self::Edge | Self::Chrome)
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Edge => "edge",
            Self::Chrome => "chrome",
            Self::Firefox => "firefox",
        };
        f.write_str(s)
    }
}

/// Advisory verdict on whether captured content is the timetable view.
///
/// Never gates persistence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    Confirmed,
    Uncertain,
}

/// One backend that could not be instantiated, kept for the aggregate report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendFailure {
    pub backend: String,
    pub reason: String,
}

impl fmt::Display for BackendFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.backend, self.reason)
    }
}

/// Error types surfaced to the user by a capture run.
///
/// Everything else (navigation failures, injection churn, a closed browser)
/// is absorbed by the polling loop.
#[derive(thiserror::Error, Debug)]
pub enum CaptureError {
    /// No configured browser backend could be instantiated.
    #[error("no supported browser could be started ({})", summarize(.attempts))]
    DriverUnavailable { attempts: Vec<BackendFailure> },

    /// The page could not be read after the capture was triggered.
    #[error("the page could not be read: {0}")]
    PageUnavailable(String),

    /// The captured page could not be written to the artifact path.
    #[error("failed to write artifact {}: {source}", .path.display())]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

fn summarize(attempts: &[BackendFailure]) -> String {
    if attempts.is_empty() {
        return "no backends enabled".to_string();
    }
    attempts
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Convenient alias for results that use [`CaptureError`].
pub type Result<T> = std::result::Result<T, CaptureError>;
