//! Orchestration of a human-in-the-loop page capture.
//!
//! A run acquires a browser from the configured backend preference list,
//! opens the portal, keeps a capture control injected into whatever page is
//! showing, and waits for the user to click it (or close the browser). The
//! page is then classified and written to the artifact path.
//!
//! - [`acquire`]: ordered backend fallback
//! - [`inject`]: the capture control and its signal
//! - [`persist`]: classification and durable write
//! - [`engine::CaptureEngine`]: the run state machine
pub mod acquire;
pub mod engine;
pub mod inject;
pub mod persist;
pub mod ticker;

pub use engine::{CaptureEngine, CaptureSettings, RunOutcome};
pub use persist::{CaptureReport, Classifier};
pub use ticker::{Ticker, TokioTicker};
