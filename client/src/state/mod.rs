//! UI-side models fed by the messaging layer.
//!
//! SYSTEM CONTEXT
//! ==============
//! These are plain structs; the view layer owns them and decides how to
//! make them reactive.

pub mod chat;
pub mod identity;
pub mod mix;
pub mod recipes;
