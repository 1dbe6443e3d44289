//! Chromium automation backend for the mapscout extraction engines.
//!
//! [`ChromiumLauncher`] starts a browser per run and hands out a
//! [`ChromiumPage`], which resolves semantic roles through the configured
//! [`LocatorMap`](mapscout_core::LocatorMap) over the DevTools protocol.

mod error;
pub mod launcher;
pub mod page;
pub mod scripts;

pub use launcher::{ChromiumLauncher, LaunchSettings};
pub use page::{ChromiumElement, ChromiumPage};
