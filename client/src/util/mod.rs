//! Utility helpers shared across client modules.
//!
//! SYSTEM CONTEXT
//! ==============
//! Utility modules isolate browser/environment concerns (clock, route,
//! storage) from messaging and state logic to improve reuse and testability.

pub mod clock;
pub mod route;
pub mod storage;
