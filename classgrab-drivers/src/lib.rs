//! Driver layer for browser automation.
//!
//! This crate starts WebDriver servers for the supported browsers, opens
//! sessions against them, and exposes the narrow [`BrowserSession`] surface the
//! capture engine drives.
//!
//! - [`browser::backend`]: per-backend capabilities and driver arguments
//! - [`browser::driver::ClassgrabDriver`]: `fantoccini` client plus the driver process it owns
//! - [`browser::session`]: the [`BrowserSession`] and [`Connector`] seams
//! - [`browser::trigger`]: scripts for the injected capture control
pub mod browser;

pub use browser::session::{BrowserSession, Connector, WebDriverConnector};
