//! # mix-client
//!
//! Realtime messaging layer for the recipe mix client. A mix is a shared
//! session where participants chat and submit recipe URLs that the backend
//! parses and broadcasts back to everyone.
//!
//! `net` holds the connection lifecycle, event dispatch, identity handshake
//! and outbound commands. `state` holds the UI-side models that consume
//! those events. The crate builds for the browser (`hydrate`) and for
//! native hosts (`native`).

pub mod config;
pub mod net;
pub mod state;
pub mod util;

/// Route `log` records to the browser console and panics to `console.error`.
///
/// Safe to call more than once; later calls keep the first logger.
#[cfg(feature = "hydrate")]
pub fn init_browser_logging() {
    console_error_panic_hook::set_once();
    let _ = console_log::init_with_level(log::Level::Debug);
}
