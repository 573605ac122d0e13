// src/video/driver.rs
//! VideoDriver trait - the primitive interface a windowing/GL backend offers.
//!
//! All policy (state machine, required-attribute checks, screen ownership)
//! lives in `VideoNegotiator`; a driver only answers requests.
//!
//! ## Request/Response Pairs
//! - `Init` → `InitComplete`
//! - `PollEvents` → `Events`
//! - `RequestSurface(mode)` → `Surface { surface, granted }`
//! - `Present(surface)` → `Presented`
//! - `SetCaption { .. }` → `CaptionSet`
//! - `WarpPointer { .. }` → `PointerWarped`
//! - `SetCursorVisible(b)` → `CursorVisibilitySet`
//!
//! Drivers must be called from the thread that owns the rendering context.

use crate::video::messages::{DriverError, DriverRequest, DriverResponse};

pub trait VideoDriver: Send {
    /// Short identifier used in logs.
    fn name(&self) -> &'static str;

    /// Handle one request. A failed `RequestSurface` must not leave a
    /// surface behind.
    fn handle_request(&mut self, request: DriverRequest) -> Result<DriverResponse, DriverError>;
}
