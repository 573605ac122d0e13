// src/video/mod.rs
//! Message-based video system.
//!
//! - VideoDriver: backend primitives (surface creation, present, events)
//! - VideoNegotiator: attribute/mode negotiation and screen ownership
//! - Messages: request/response protocol between the two

pub mod attributes;
pub mod driver;
pub mod drivers;
pub mod messages;
pub mod negotiator;

pub use attributes::{AttributeRequest, AttributeRequests, GlAttr, GrantedAttributes, Requirement};
pub use driver::VideoDriver;
pub use drivers::{HeadlessHandle, HeadlessVideoDriver};
pub use messages::{BlitCapabilities, DriverError, DriverRequest, DriverResponse, ModeRequest, VideoInfo};
pub use negotiator::{CursorToggle, NegotiatorState, VideoNegotiator, VALID_MODE_DEPTHS};
