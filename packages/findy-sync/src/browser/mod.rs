//! Production browser driver.

pub mod chromium;

pub use chromium::{BrowserSession, ChromiumPage};
