// src/video/messages.rs
//! Message types for communication between the negotiator and a video driver.
//!
//! Every driver operation is a request/response pair. Surfaces travel as
//! handles; the driver hands over a fresh surface with a count of 1 and the
//! negotiator owns that reference from then on.

use crate::error::{Error, Subsystem};
use crate::event::Event;
use crate::pixel_format::PixelFormat;
use crate::surface::{Surface, SurfaceFlags};
use crate::video::attributes::{AttributeRequests, GrantedAttributes};
use bitflags::bitflags;
use std::fmt;

bitflags! {
    /// Accelerated operations a display offers.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct BlitCapabilities: u16 {
        const HW = 0x0001;
        const HW_COLORKEY = 0x0002;
        const HW_ALPHA = 0x0004;
        const SW = 0x0008;
        const SW_COLORKEY = 0x0010;
        const SW_ALPHA = 0x0020;
        const FILL = 0x0040;
    }
}

/// What the display can do, discovered at driver init.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoInfo {
    pub hw_available: bool,
    pub wm_available: bool,
    pub blit: BlitCapabilities,
    /// Video memory in KiB.
    pub video_mem_kb: u32,
    /// Format of the current display mode.
    pub format: PixelFormat,
    pub current_w: u32,
    pub current_h: u32,
}

/// Everything a driver needs to build a screen surface.
#[derive(Debug, Clone, PartialEq)]
pub struct ModeRequest {
    pub width: u32,
    pub height: u32,
    /// Always a concrete depth; 0 is resolved before the request is sent.
    pub bits_per_pixel: u8,
    pub flags: SurfaceFlags,
    pub attributes: AttributeRequests,
}

impl ModeRequest {
    /// A rendering context is created for GL modes and whenever GL
    /// attributes were requested.
    pub fn wants_context(&self) -> bool {
        self.flags.contains(SurfaceFlags::OPENGL) || !self.attributes.is_empty()
    }
}

/// Requests sent from the negotiator to a video driver.
#[derive(Debug, Clone)]
pub enum DriverRequest {
    /// Discover display capabilities. Responds with `InitComplete`.
    Init,

    /// Fetch pending native events. Responds with `Events`.
    PollEvents,

    /// Create a screen surface. Responds with `Surface`.
    RequestSurface(ModeRequest),

    /// Show a surface's contents. Responds with `Presented`.
    Present(Surface),

    SetCaption { title: String, icon: String },

    /// Move the pointer. The driver does not post a motion event itself.
    WarpPointer { x: u16, y: u16 },

    SetCursorVisible(bool),
}

/// Responses sent from a video driver to the negotiator.
#[derive(Debug)]
pub enum DriverResponse {
    InitComplete { info: VideoInfo },

    /// Native events in arrival order.
    Events(Vec<Event>),

    /// A new screen surface with the attributes actually provisioned.
    Surface {
        surface: Surface,
        granted: GrantedAttributes,
    },

    Presented,

    CaptionSet,

    PointerWarped,

    CursorVisibilitySet,
}

impl DriverResponse {
    pub fn kind(&self) -> &'static str {
        match self {
            DriverResponse::InitComplete { .. } => "InitComplete",
            DriverResponse::Events(_) => "Events",
            DriverResponse::Surface { .. } => "Surface",
            DriverResponse::Presented => "Presented",
            DriverResponse::CaptionSet => "CaptionSet",
            DriverResponse::PointerWarped => "PointerWarped",
            DriverResponse::CursorVisibilitySet => "CursorVisibilitySet",
        }
    }
}

/// Driver-level failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverError {
    /// A request arrived before `Init`.
    NotInitialized,
    /// The display cannot show the requested geometry or depth.
    UnsupportedMode(String),
    /// No framebuffer configuration meets the required attributes.
    NoMatchingConfig(String),
    /// The driver replied with the wrong response kind.
    UnexpectedResponse {
        expected: &'static str,
        got: &'static str,
    },
    Failed(String),
}

impl fmt::Display for DriverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DriverError::NotInitialized => write!(f, "video driver not initialized"),
            DriverError::UnsupportedMode(reason) => write!(f, "unsupported mode: {}", reason),
            DriverError::NoMatchingConfig(reason) => {
                write!(f, "no framebuffer configuration matches: {}", reason)
            }
            DriverError::UnexpectedResponse { expected, got } => {
                write!(f, "expected {} response, got {}", expected, got)
            }
            DriverError::Failed(reason) => write!(f, "{}", reason),
        }
    }
}

impl std::error::Error for DriverError {}

impl From<DriverError> for Error {
    fn from(err: DriverError) -> Self {
        match err {
            DriverError::NotInitialized => Error::SubsystemNotInitialized(Subsystem::Video),
            other => Error::ModeSetFailed(other.to_string()),
        }
    }
}
