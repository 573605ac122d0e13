// src/video/drivers/mod.rs
//! Video driver implementations.

pub mod headless;

pub use headless::{HeadlessHandle, HeadlessVideoDriver};
