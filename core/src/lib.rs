//! Core library for the insync and music status-bar modules
//!
//! The status-bar host polls each module for `{full_text, color,
//! cached_until}` and forwards clicks on the music segment. Everything is
//! exposed via a C FFI so the host can link this as a static library.

mod config;
mod duration;
mod format;
mod insync;
mod module;
mod monitor;
mod mpris;
mod music;
mod response;
mod telemetry;
mod ffi;

pub use ffi::*;
