// src/lib.rs

//! Core-media library crate.
//!
//! Event queue, video mode negotiation and joystick polling behind a
//! single `Platform` value.

pub mod config;
pub mod error;
pub mod event;
pub mod joystick;
pub mod keys;
pub mod pixel_format;
pub mod platform;
pub mod surface;
pub mod video;

pub use error::{Error, Result};
pub use event::Event;
pub use platform::{InitFlags, Platform};
